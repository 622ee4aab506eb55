//! Host interface traits

use async_trait::async_trait;
use safeplay_util::GameId;
use thiserror::Error;

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    /// The process snapshot could not be taken. Transient: the pass is
    /// skipped and the next poll tick retries.
    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    /// The termination request failed; the process may still be alive.
    #[error("Termination failed: {0}")]
    Termination(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Platform-specific process enumeration and termination.
///
/// `list_candidates` returns the identities of processes believed to belong
/// to the monitored game library; the classification is a heuristic and the
/// engine trusts it. `terminate` requests a kill of every process matching
/// the identity and reports only whether the request was issued - whether
/// the process actually died is resolved by later snapshots.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    async fn list_candidates(&self) -> HostResult<Vec<GameId>>;

    async fn terminate(&self, game: &GameId) -> HostResult<()>;
}
