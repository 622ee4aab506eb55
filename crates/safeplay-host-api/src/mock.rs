//! Mock process host for testing

use async_trait::async_trait;
use safeplay_util::GameId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::{HostError, HostResult, ProcessHost};

/// Scripted host for unit/integration testing.
///
/// Snapshots are served from a queue; when the queue drains, the last
/// snapshot repeats (a steady process table). Termination calls are logged
/// and succeed unless `fail_terminate` is set; by default a successful
/// terminate also removes the identity from the repeating snapshot, so the
/// next poll observes the kill.
pub struct MockProcessHost {
    snapshots: Arc<Mutex<VecDeque<Vec<GameId>>>>,
    current: Arc<Mutex<Vec<GameId>>>,

    /// Log of terminate calls, in order
    pub terminated: Arc<Mutex<Vec<GameId>>>,

    /// Configure enumeration to fail
    pub fail_enumeration: Arc<Mutex<bool>>,

    /// Configure termination to fail
    pub fail_terminate: Arc<Mutex<bool>>,

    /// When false, a successful terminate leaves the process in the
    /// snapshot (simulates slow OS kill confirmation)
    pub kill_removes_process: Arc<Mutex<bool>>,
}

impl MockProcessHost {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(VecDeque::new())),
            current: Arc::new(Mutex::new(Vec::new())),
            terminated: Arc::new(Mutex::new(Vec::new())),
            fail_enumeration: Arc::new(Mutex::new(false)),
            fail_terminate: Arc::new(Mutex::new(false)),
            kill_removes_process: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue one snapshot to be served by the next enumeration
    pub fn push_snapshot(&self, games: Vec<GameId>) {
        self.snapshots.lock().unwrap().push_back(games);
    }

    /// Replace the steady-state snapshot served once the queue drains
    pub fn set_running(&self, games: Vec<GameId>) {
        *self.current.lock().unwrap() = games;
    }

    pub fn terminate_calls(&self) -> Vec<GameId> {
        self.terminated.lock().unwrap().clone()
    }
}

impl Default for MockProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessHost for MockProcessHost {
    async fn list_candidates(&self) -> HostResult<Vec<GameId>> {
        if *self.fail_enumeration.lock().unwrap() {
            return Err(HostError::Enumeration("mock enumeration failure".into()));
        }

        if let Some(next) = self.snapshots.lock().unwrap().pop_front() {
            *self.current.lock().unwrap() = next.clone();
            return Ok(next);
        }

        Ok(self.current.lock().unwrap().clone())
    }

    async fn terminate(&self, game: &GameId) -> HostResult<()> {
        self.terminated.lock().unwrap().push(game.clone());

        if *self.fail_terminate.lock().unwrap() {
            return Err(HostError::Termination("mock termination failure".into()));
        }

        if *self.kill_removes_process.lock().unwrap() {
            self.current.lock().unwrap().retain(|g| g != game);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshots_drain_then_repeat() {
        let host = MockProcessHost::new();
        host.push_snapshot(vec![GameId::new("a")]);
        host.push_snapshot(vec![GameId::new("a"), GameId::new("b")]);

        assert_eq!(host.list_candidates().await.unwrap().len(), 1);
        assert_eq!(host.list_candidates().await.unwrap().len(), 2);
        // Queue drained: last snapshot repeats
        assert_eq!(host.list_candidates().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn terminate_removes_from_snapshot() {
        let host = MockProcessHost::new();
        host.set_running(vec![GameId::new("a"), GameId::new("b")]);

        host.terminate(&GameId::new("a")).await.unwrap();

        assert_eq!(host.terminate_calls(), vec![GameId::new("a")]);
        assert_eq!(host.list_candidates().await.unwrap(), vec![GameId::new("b")]);
    }

    #[tokio::test]
    async fn forced_failures() {
        let host = MockProcessHost::new();
        *host.fail_enumeration.lock().unwrap() = true;
        assert!(matches!(
            host.list_candidates().await,
            Err(HostError::Enumeration(_))
        ));

        *host.fail_terminate.lock().unwrap() = true;
        assert!(matches!(
            host.terminate(&GameId::new("a")).await,
            Err(HostError::Termination(_))
        ));
    }
}
