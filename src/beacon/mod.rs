//! Best-effort announcements to the discovery service.

use crate::config::BeaconConfig;
use crate::identity::BeaconKey;
use reqwest::{Client, RequestBuilder, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BeaconError {
    #[error("Invalid beacon URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP client bound to one beacon record on the discovery service.
///
/// The URL is built once at startup and never changes. Announce and withdraw
/// are fire-and-forget with a bounded timeout: the announcement channel must
/// never break the supervisor, so every failure is logged and swallowed. The
/// next scheduled heartbeat is the only retry. Only the first failure after
/// a success is worth a warning; repeats go to debug so a flapping discovery
/// service cannot spam the log once per tick.
pub struct BeaconClient {
    client: Client,
    url: Url,
    expires_after_secs: Option<u64>,
    failing: AtomicBool,
}

impl BeaconClient {
    pub fn new(config: &BeaconConfig, key: &BeaconKey) -> Result<Self, BeaconError> {
        let full = format!("{}/{}", config.beacon_url.trim_end_matches('/'), key);
        let url = Url::parse(&full).map_err(|e| BeaconError::InvalidUrl {
            url: config.beacon_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            url,
            expires_after_secs: config.expires_after.map(|d| d.as_secs()),
            failing: AtomicBool::new(false),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Announce liveness with a PUT, carrying the expiry hint when configured.
    pub async fn announce(&self) {
        let mut request = self.client.put(self.url.clone());
        if let Some(secs) = self.expires_after_secs {
            request = request.query(&[("expires-after", secs)]);
        }
        self.send("Heartbeat", request).await;
    }

    /// Remove the beacon record with a DELETE.
    pub async fn withdraw(&self) {
        self.send("Deregistration", self.client.delete(self.url.clone()))
            .await;
    }

    async fn send(&self, what: &str, request: RequestBuilder) {
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                self.note_success();
                debug!("{} accepted: {}", what, response.status());
            }
            Ok(response) => {
                let status = response.status();
                if self.note_failure() {
                    warn!("{} rejected by discovery service: {}", what, status);
                } else {
                    debug!("{} rejected by discovery service: {}", what, status);
                }
            }
            Err(e) => {
                if self.note_failure() {
                    warn!("{} failed: {}", what, e);
                } else {
                    debug!("{} failed: {}", what, e);
                }
            }
        }
    }

    /// True only for the first failure since the last success.
    fn note_failure(&self) -> bool {
        !self.failing.swap(true, Ordering::Relaxed)
    }

    fn note_success(&self) {
        self.failing.store(false, Ordering::Relaxed);
    }
}
