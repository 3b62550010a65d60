use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scope identifier grouping restarts of the same install (fresh per run if omitted)
    #[arg(long)]
    pub scope: Option<String>,

    /// Base URL of the discovery service
    #[arg(long)]
    pub beacon_url: Option<String>,

    /// Seconds between heartbeats
    #[arg(long)]
    pub interval: Option<u64>,

    /// Ask the discovery service to expire the beacon this many seconds after the last heartbeat
    #[arg(long)]
    pub expires_after: Option<u64>,

    /// Seconds to wait for the agent to die after a forwarded signal before giving up
    #[arg(long)]
    pub shutdown_grace: Option<u64>,

    /// Always exit 0 instead of mirroring the agent's exit status
    #[arg(long)]
    pub no_propagate_exit: bool,

    /// Enable debug logging for internal details
    #[arg(short, long)]
    pub debug: bool,

    /// Agent command and arguments, forwarded verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}
