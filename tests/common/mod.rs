#![allow(dead_code)]

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::routing::put;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Put {
        key: String,
        expires_after: Option<String>,
    },
    Delete {
        key: String,
    },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

async fn record_put(
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(log): State<CallLog>,
) {
    log.lock().unwrap().push(Call::Put {
        key,
        expires_after: params.get("expires-after").cloned(),
    });
}

async fn record_delete(Path(key): Path<String>, State(log): State<CallLog>) {
    log.lock().unwrap().push(Call::Delete { key });
}

/// In-process stand-in for the discovery service, recording every PUT and
/// DELETE in arrival order.
pub async fn spawn_discovery() -> Result<(SocketAddr, CallLog)> {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/:key", put(record_put).delete(record_delete))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((addr, log))
}

pub fn puts(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, Call::Put { .. }))
        .count()
}

pub fn deletes(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, Call::Delete { .. }))
        .count()
}
