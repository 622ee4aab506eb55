//! Linux ProcessHost implementation

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use safeplay_host_api::{HostError, HostResult, ProcessHost};
use safeplay_util::GameId;
use tracing::{debug, info, warn};

use crate::scan;

/// Host adapter backed by /proc and SIGTERM
pub struct LinuxProcessHost {
    markers: Vec<String>,
}

impl LinuxProcessHost {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

#[async_trait]
impl ProcessHost for LinuxProcessHost {
    async fn list_candidates(&self) -> HostResult<Vec<GameId>> {
        let markers = self.markers.clone();
        // The /proc walk is synchronous filesystem IO; keep it off the
        // runtime threads.
        let found = tokio::task::spawn_blocking(move || scan::scan_candidates(&markers))
            .await
            .map_err(|e| HostError::Internal(format!("scan task failed: {e}")))?
            .map_err(|e| HostError::Enumeration(e.to_string()))?;

        debug!(count = found.len(), "Process snapshot taken");
        Ok(found)
    }

    async fn terminate(&self, game: &GameId) -> HostResult<()> {
        let markers = self.markers.clone();
        let target = game.clone();
        let pids = tokio::task::spawn_blocking(move || scan::pids_for(&target, &markers))
            .await
            .map_err(|e| HostError::Internal(format!("scan task failed: {e}")))?
            .map_err(|e| HostError::Enumeration(e.to_string()))?;

        if pids.is_empty() {
            // Already gone; treat as terminated.
            debug!(game = %game, "No matching processes to terminate");
            return Ok(());
        }

        for pid in pids {
            match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) => info!(game = %game, pid, "Sent SIGTERM"),
                Err(Errno::ESRCH) => {
                    // Exited between scan and signal
                    debug!(game = %game, pid, "Process gone before SIGTERM");
                }
                Err(e) => {
                    warn!(game = %game, pid, error = %e, "SIGTERM failed");
                    return Err(HostError::Termination(format!(
                        "SIGTERM to pid {pid} failed: {e}"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn terminate_unknown_game_is_ok() {
        let host = LinuxProcessHost::new(vec!["no-such-library-fragment".to_string()]);
        host.terminate(&GameId::new("NotRunning")).await.unwrap();
    }

    #[tokio::test]
    async fn list_with_unmatched_marker_is_empty() {
        let host = LinuxProcessHost::new(vec!["no-such-library-fragment".to_string()]);
        let found = host.list_candidates().await.unwrap();
        assert!(found.is_empty());
    }
}
