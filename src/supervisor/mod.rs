//! Agent process lifecycle and the heartbeat loop.

use crate::beacon::BeaconClient;
use crate::config::BeaconConfig;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::signal::unix::{signal as signal_stream, Signal as SignalStream, SignalKind};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Empty agent command")]
    EmptyCommand,
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[source] std::io::Error),
    #[error("Failed to launch agent '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Drives one agent run: Launch, then Announcing until the agent exits or a
/// termination signal arrives, then a single Deregistering step.
pub struct Supervisor {
    config: BeaconConfig,
    client: BeaconClient,
}

impl Supervisor {
    pub fn new(config: BeaconConfig, client: BeaconClient) -> Self {
        Self { config, client }
    }

    /// Run the agent to completion and return the exit code the supervisor
    /// should report. A launch failure is fatal and issues no beacon calls;
    /// after a successful launch the deregistration DELETE fires on every
    /// exit path, exactly once.
    pub async fn run(&self, command: &[String]) -> Result<i32, SupervisorError> {
        let (program, args) = command.split_first().ok_or(SupervisorError::EmptyCommand)?;

        // Install handlers before launch so no early signal is lost
        let mut sigint =
            signal_stream(SignalKind::interrupt()).map_err(SupervisorError::SignalHandler)?;
        let mut sigterm =
            signal_stream(SignalKind::terminate()).map_err(SupervisorError::SignalHandler)?;

        info!("Launching agent: {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|e| SupervisorError::Spawn {
                command: program.clone(),
                source: e,
            })?;

        let status = self
            .announce_until_exit(&mut child, &mut sigint, &mut sigterm)
            .await;

        self.client.withdraw().await;

        Ok(self.exit_code(status))
    }

    /// Heartbeat loop: PUT once per interval while the agent is alive. The
    /// first heartbeat goes out after one full interval, not at launch.
    async fn announce_until_exit(
        &self,
        child: &mut Child,
        sigint: &mut SignalStream,
        sigterm: &mut SignalStream,
    ) -> Option<ExitStatus> {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.reset();

        loop {
            tokio::select! {
                status = child.wait() => {
                    return match status {
                        Ok(status) => {
                            info!("Agent exited: {}", status);
                            Some(status)
                        }
                        Err(e) => {
                            warn!("Failed to wait on agent: {}", e);
                            None
                        }
                    };
                }
                _ = ticker.tick() => {
                    debug!("Heartbeat tick");
                    self.client.announce().await;
                }
                _ = sigint.recv() => {
                    return self.forward_and_reap(child, Signal::SIGINT, sigint, sigterm).await;
                }
                _ = sigterm.recv() => {
                    return self.forward_and_reap(child, Signal::SIGTERM, sigint, sigterm).await;
                }
            }
        }
    }

    /// Forward a received signal to the agent and wait for it to die, at
    /// most for the shutdown grace period. Further signals delivered while
    /// waiting are forwarded as well. An agent that ignores the signal must
    /// not keep the supervisor alive, so on expiry we give up on reaping and
    /// proceed to deregistration anyway.
    async fn forward_and_reap(
        &self,
        child: &mut Child,
        sig: Signal,
        sigint: &mut SignalStream,
        sigterm: &mut SignalStream,
    ) -> Option<ExitStatus> {
        self.forward(child, sig);

        let deadline = sleep(self.config.shutdown_grace);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                status = child.wait() => {
                    return match status {
                        Ok(status) => {
                            info!("Agent exited after {}: {}", sig, status);
                            Some(status)
                        }
                        Err(e) => {
                            warn!("Failed to wait on agent after {}: {}", sig, e);
                            None
                        }
                    };
                }
                _ = &mut deadline => {
                    warn!(
                        "Agent still alive {:?} after {}, abandoning it",
                        self.config.shutdown_grace, sig
                    );
                    return None;
                }
                _ = sigint.recv() => self.forward(child, Signal::SIGINT),
                _ = sigterm.recv() => self.forward(child, Signal::SIGTERM),
            }
        }
    }

    fn forward(&self, child: &Child, sig: Signal) {
        match child.id() {
            Some(pid) => {
                info!("Forwarding {} to agent (pid {})", sig, pid);
                if let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig) {
                    warn!("Failed to forward {} to agent: {}", sig, e);
                }
            }
            None => debug!("Agent already reaped, not forwarding {}", sig),
        }
    }

    fn exit_code(&self, status: Option<ExitStatus>) -> i32 {
        if !self.config.propagate_exit {
            return 0;
        }

        match status {
            Some(status) => status
                .code()
                .unwrap_or_else(|| 128 + status.signal().unwrap_or(0)),
            None => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::BeaconKey;
    use std::time::Duration;

    fn supervisor(propagate_exit: bool) -> Supervisor {
        let config = BeaconConfig {
            beacon_url: "http://localhost:8400".to_string(),
            interval: Duration::from_secs(5),
            expires_after: None,
            request_timeout: Duration::from_secs(1),
            propagate_exit,
            shutdown_grace: Duration::from_secs(1),
            scope: None,
        };
        let client = BeaconClient::new(&config, &BeaconKey::new(None)).unwrap();
        Supervisor::new(config, client)
    }

    #[test]
    fn exit_code_mirrors_agent_exit() {
        let supervisor = supervisor(true);
        // wait(2) encoding: exit code in the high byte
        assert_eq!(supervisor.exit_code(Some(ExitStatus::from_raw(7 << 8))), 7);
        assert_eq!(supervisor.exit_code(Some(ExitStatus::from_raw(0))), 0);
    }

    #[test]
    fn signal_death_maps_to_128_plus_signo() {
        let supervisor = supervisor(true);
        // wait(2) encoding: terminating signal in the low byte
        assert_eq!(supervisor.exit_code(Some(ExitStatus::from_raw(15))), 143);
        assert_eq!(supervisor.exit_code(Some(ExitStatus::from_raw(2))), 130);
    }

    #[test]
    fn transparency_off_always_exits_zero() {
        let supervisor = supervisor(false);
        assert_eq!(supervisor.exit_code(Some(ExitStatus::from_raw(7 << 8))), 0);
        assert_eq!(supervisor.exit_code(None), 0);
    }

    #[test]
    fn unknown_status_reports_failure() {
        let supervisor = supervisor(true);
        assert_eq!(supervisor.exit_code(None), 1);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let supervisor = supervisor(true);
        let result = supervisor.run(&[]).await;
        assert!(matches!(result, Err(SupervisorError::EmptyCommand)));
    }
}
