//! End-to-end tests over the control socket
//!
//! Run a full service against a scripted host and talk to it the way the
//! supervisor UI does: an `IpcClient` sending NDJSON commands and an
//! `EventStream` consuming broadcasts.

use safeplay_api::{Command, EventPayload, ResponsePayload, ResponseResult};
use safeplay_config::Settings;
use safeplay_host_api::MockProcessHost;
use safeplay_ipc::IpcClient;
use safeplay_util::GameId;
use safeplayd::Service;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

fn celeste() -> GameId {
    GameId::new("Celeste")
}

struct RunningDaemon {
    _dir: TempDir,
    socket: PathBuf,
    host: Arc<MockProcessHost>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl RunningDaemon {
    async fn start(running: Vec<GameId>) -> Self {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("safeplayd.sock");

        let host = Arc::new(MockProcessHost::new());
        host.set_running(running);

        let service = Service::new(Settings::default(), &socket, host.clone())
            .await
            .unwrap();
        let task = tokio::spawn(service.run());

        Self {
            _dir: dir,
            socket,
            host,
            task,
        }
    }

    async fn connect(&self) -> IpcClient {
        IpcClient::connect(&self.socket).await.unwrap()
    }

    /// Poll GetState until the predicate holds or a few seconds pass
    async fn wait_for_state(
        &self,
        client: &mut IpcClient,
        pred: impl Fn(&safeplay_api::StateSnapshot) -> bool,
    ) {
        for _ in 0..100 {
            let response = client.send(Command::GetState).await.unwrap();
            if let ResponseResult::Ok(ResponsePayload::State(state)) = response.result {
                if pred(&state) {
                    return;
                }
            }
            sleep(Duration::from_millis(50)).await;
        }
        panic!("daemon state never converged");
    }
}

impl Drop for RunningDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[tokio::test]
async fn daemon_answers_commands_over_the_socket() {
    let daemon = RunningDaemon::start(vec![celeste()]).await;
    let mut client = daemon.connect().await;

    let response = client.send(Command::Ping).await.unwrap();
    assert!(matches!(
        response.result,
        ResponseResult::Ok(ResponsePayload::Pong)
    ));

    // The poller picks the game up shortly after startup
    daemon
        .wait_for_state(&mut client, |state| {
            state.sessions.iter().any(|s| s.game == celeste())
        })
        .await;

    let response = client.send(Command::GetHealth).await.unwrap();
    match response.result {
        ResponseResult::Ok(ResponsePayload::Health(health)) => {
            assert!(health.live);
            assert!(health.monitoring_active);
            assert_eq!(health.tracked_sessions, 1);
        }
        other => panic!("unexpected health response: {other:?}"),
    }
}

#[tokio::test]
async fn session_list_reaches_late_subscribers() {
    let daemon = RunningDaemon::start(vec![celeste()]).await;

    // Let the first pass register the game before anyone subscribes
    let mut client = daemon.connect().await;
    daemon
        .wait_for_state(&mut client, |state| !state.sessions.is_empty())
        .await;

    // A subscriber connecting after the start event still converges,
    // because every completed pass republishes the list.
    let subscriber = daemon.connect().await;
    let mut events = subscriber.subscribe().await.unwrap();

    let seen = timeout(Duration::from_secs(5), async {
        loop {
            let event = events.next().await.unwrap();
            if let EventPayload::SessionListUpdated { sessions } = event.payload {
                if sessions.iter().any(|s| s.game == celeste()) {
                    return true;
                }
            }
        }
    })
    .await
    .unwrap();
    assert!(seen);
}

#[tokio::test]
async fn block_over_the_socket_terminates_and_clears() {
    let daemon = RunningDaemon::start(vec![celeste()]).await;
    let mut client = daemon.connect().await;

    daemon
        .wait_for_state(&mut client, |state| !state.sessions.is_empty())
        .await;

    let response = client
        .send(Command::Block { game: celeste() })
        .await
        .unwrap();
    match response.result {
        ResponseResult::Ok(ResponsePayload::Blocked(result)) => {
            assert!(result.success);
        }
        other => panic!("unexpected block response: {other:?}"),
    }

    assert_eq!(daemon.host.terminate_calls(), vec![celeste()]);

    let response = client.send(Command::GetState).await.unwrap();
    match response.result {
        ResponseResult::Ok(ResponsePayload::State(state)) => {
            assert!(state.sessions.is_empty());
        }
        other => panic!("unexpected state response: {other:?}"),
    }
}
