use crate::cli::Cli;
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Scope override, reused across restarts of the same install.
pub const SCOPE_ENV: &str = "BEACOND_SCOPE";
/// Discovery service base URL override.
pub const URL_ENV: &str = "BEACOND_URL";

fn default_beacon_url() -> String {
    "http://localhost:8400".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_propagate_exit() -> bool {
    true
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

// YAML structure for loading configuration from a file
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigFile {
    #[serde(default = "default_beacon_url")]
    pub beacon_url: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub expires_after_secs: Option<u64>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_propagate_exit")]
    pub propagate_exit: bool,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            beacon_url: default_beacon_url(),
            interval_secs: default_interval_secs(),
            expires_after_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            propagate_exit: default_propagate_exit(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            scope: None,
        }
    }
}

/// Environment overrides, captured once at startup so nothing reads ambient
/// process state after configuration is resolved.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub scope: Option<String>,
    pub beacon_url: Option<String>,
}

impl EnvOverrides {
    pub fn capture() -> Self {
        Self {
            scope: non_empty_var(SCOPE_ENV),
            beacon_url: non_empty_var(URL_ENV),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Resolved supervisor configuration.
#[derive(Debug, Clone)]
pub struct BeaconConfig {
    pub beacon_url: String,
    pub interval: Duration,
    pub expires_after: Option<Duration>,
    pub request_timeout: Duration,
    pub propagate_exit: bool,
    pub shutdown_grace: Duration,
    pub scope: Option<String>,
}

impl BeaconConfig {
    /// Load configuration: defaults, then the optional YAML file, then
    /// environment variables, then CLI flags. Later sources win.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, EnvOverrides::capture(), cli)
    }

    pub fn resolve(file: ConfigFile, env: EnvOverrides, cli: &Cli) -> Result<Self> {
        let interval_secs = cli.interval.unwrap_or(file.interval_secs);
        ensure!(
            interval_secs > 0,
            "Heartbeat interval must be at least 1 second"
        );
        ensure!(
            file.request_timeout_secs > 0,
            "Request timeout must be at least 1 second"
        );

        let beacon_url = cli
            .beacon_url
            .clone()
            .or(env.beacon_url)
            .unwrap_or(file.beacon_url);
        let scope = cli
            .scope
            .clone()
            .or(env.scope)
            .or(file.scope)
            .filter(|scope| !scope.is_empty());
        let expires_after = cli
            .expires_after
            .or(file.expires_after_secs)
            .map(Duration::from_secs);
        let shutdown_grace =
            Duration::from_secs(cli.shutdown_grace.unwrap_or(file.shutdown_grace_secs));

        Ok(Self {
            beacon_url,
            interval: Duration::from_secs(interval_secs),
            expires_after,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            propagate_exit: !cli.no_propagate_exit && file.propagate_exit,
            shutdown_grace,
            scope,
        })
    }
}

/// Load configuration from a YAML file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content).with_context(|| "Failed to parse YAML config file")
}
