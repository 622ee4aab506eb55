//! Daemon event loop: snapshot scheduling, enforcement, and IPC dispatch.

use anyhow::{Context, Result};
use safeplay_api::{
    CloseReason, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, OverlayEvent,
    OverlayVariant, Response, ResponsePayload, StateSnapshot, API_VERSION,
};
use safeplay_config::Settings;
use safeplay_core::{Engine, EngineEvent};
use safeplay_host_api::ProcessHost;
use safeplay_ipc::{IpcServer, ServerMessage};
use safeplay_util::{format_duration, ClientId, GameId, MonotonicInstant, RateLimiter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

// Overlay display durations, matched to the reference UI
const OVERLAY_INFO: Duration = Duration::from_millis(4000);
const OVERLAY_TIME_UP: Duration = Duration::from_millis(6000);
const OVERLAY_SUCCESS: Duration = Duration::from_millis(4500);
const OVERLAY_ERROR: Duration = Duration::from_millis(5000);
const OVERLAY_UNBLOCK: Duration = Duration::from_millis(3500);

/// Mutable daemon state driven from the event loop
struct DaemonState {
    engine: Engine,
    /// Poll gate: snapshots are only taken while this is open
    monitoring_active: bool,
}

/// Main service state
pub struct Service {
    state: Arc<Mutex<DaemonState>>,
    host: Arc<dyn ProcessHost>,
    ipc: Arc<IpcServer>,
    rate_limiter: RateLimiter,
}

impl Service {
    /// Bind the control socket and assemble the service around the given
    /// host. The caller picks the host so tests can script one.
    pub async fn new(
        settings: Settings,
        socket_path: &Path,
        host: Arc<dyn ProcessHost>,
    ) -> Result<Self> {
        let engine = Engine::new(settings.monitor.clone());

        let mut ipc = IpcServer::new(socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        // 30 requests per second per client
        let rate_limiter = RateLimiter::new(30, Duration::from_secs(1));

        Ok(Self {
            state: Arc::new(Mutex::new(DaemonState {
                engine,
                monitoring_active: true,
            })),
            host,
            ipc: Arc::new(ipc),
            rate_limiter,
        })
    }

    pub async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("Message receiver should be available")?;

        let state = self.state.clone();
        let rate_limiter = Arc::new(Mutex::new(self.rate_limiter));
        let host = self.host.clone();

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        // Main event loop. The tick is much faster than any poll cadence so
        // the adaptive poller decides the actual snapshot rate.
        let tick_interval = Duration::from_millis(100);
        let mut tick_timer = tokio::time::interval(tick_interval);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                _ = tick_timer.tick() => {
                    Self::on_tick(&state, &host, &ipc_ref).await;
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&state, &host, &ipc_ref, &rate_limiter, msg).await;
                }
            }
        }

        info!("Shutting down safeplayd");
        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));
        ipc_ref.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    /// One scheduler pass: take a snapshot if one is due, then check timer
    /// deadlines. The snapshot is awaited inline so reconciliation passes
    /// never interleave.
    async fn on_tick(
        state: &Arc<Mutex<DaemonState>>,
        host: &Arc<dyn ProcessHost>,
        ipc: &Arc<IpcServer>,
    ) {
        let now = safeplay_util::now();
        let now_mono = MonotonicInstant::now();

        let snapshot_due = {
            let mut st = state.lock().await;
            st.monitoring_active && st.engine.poll_due(now_mono)
        };

        if snapshot_due {
            match host.list_candidates().await {
                Ok(snapshot) => {
                    let events = {
                        let mut st = state.lock().await;
                        st.engine.mark_polled(now_mono);
                        st.engine.reconcile(&snapshot, now, now_mono)
                    };

                    for event in events {
                        Self::handle_engine_event(state, host, ipc, event, now_mono).await;
                    }

                    // Every completed pass republishes the list, so a
                    // subscriber that missed earlier traffic converges.
                    Self::broadcast_session_list(state, ipc).await;
                }
                Err(e) => {
                    // Stale registry state is kept as-is; the next snapshot
                    // will catch up.
                    warn!(error = %e, "Process enumeration failed, skipping pass");
                    let mut st = state.lock().await;
                    st.engine.mark_polled(now_mono);
                }
            }
        }

        let due = {
            let mut st = state.lock().await;
            st.engine.tick(now_mono)
        };

        for event in due {
            Self::handle_engine_event(state, host, ipc, event, now_mono).await;
        }
    }

    async fn handle_engine_event(
        state: &Arc<Mutex<DaemonState>>,
        host: &Arc<dyn ProcessHost>,
        ipc: &Arc<IpcServer>,
        event: EngineEvent,
        now_mono: MonotonicInstant,
    ) {
        match event {
            EngineEvent::Started { game, started_at } => {
                info!(game = %game, "Game started");
                ipc.broadcast_event(Event::new(EventPayload::GameStarted {
                    game: game.clone(),
                    started_at,
                }));
                let overlay = OverlayEvent::new(
                    OverlayVariant::Info,
                    "Game started",
                    game.display_name(),
                    OVERLAY_INFO,
                );
                Self::broadcast_overlay(state, ipc, overlay, now_mono).await;
            }

            EngineEvent::StartedSilently { game } => {
                // Session list broadcast is enough; no notification inside
                // the start cooldown.
                debug!(game = %game, "Game restarted within cooldown");
            }

            EngineEvent::Closed {
                game,
                enforced,
                duration,
            } => {
                info!(game = %game, enforced, duration_secs = duration.as_secs(), "Game closed");
                let reason = if enforced {
                    CloseReason::Enforcement
                } else {
                    CloseReason::User
                };
                ipc.broadcast_event(Event::new(EventPayload::GameClosed {
                    game,
                    reason,
                    duration,
                }));
            }

            EngineEvent::WarningDue { game, remaining } => {
                info!(game = %game, remaining_secs = remaining.as_secs(), "Warning issued");
                let overlay = OverlayEvent::new(
                    OverlayVariant::Warn,
                    "Time almost up",
                    format!(
                        "{} will close in {}",
                        game.display_name(),
                        format_duration(remaining)
                    ),
                    remaining,
                )
                .with_countdown(remaining);
                Self::broadcast_overlay(state, ipc, overlay, now_mono).await;
            }

            EngineEvent::EnforceDue { game } => {
                info!(game = %game, "Playtime limit expired, terminating");
                ipc.broadcast_event(Event::new(EventPayload::TimeExpired {
                    game: game.clone(),
                }));

                Self::enforce(state, host, ipc, &game, true).await;
            }

            EngineEvent::LimitSet { game, minutes } => {
                ipc.broadcast_event(Event::new(EventPayload::LimitSet {
                    game: game.clone(),
                    minutes,
                }));
                let overlay = OverlayEvent::new(
                    OverlayVariant::Info,
                    "Playtime limit set",
                    format!("{} minutes for {}", minutes, game.display_name()),
                    OVERLAY_INFO,
                );
                Self::broadcast_overlay(state, ipc, overlay, now_mono).await;
            }

            EngineEvent::Unblocked { game } => {
                ipc.broadcast_event(Event::new(EventPayload::Unblocked {
                    game: game.clone(),
                }));
                let overlay = OverlayEvent::new(
                    OverlayVariant::Info,
                    "Game unblocked",
                    format!("{} can be played again", game.display_name()),
                    OVERLAY_UNBLOCK,
                );
                Self::broadcast_overlay(state, ipc, overlay, now_mono).await;
            }
        }
    }

    /// Terminate a game and fold the outcome back into engine state.
    /// `expired` selects the time-up overlay wording over the block wording.
    async fn enforce(
        state: &Arc<Mutex<DaemonState>>,
        host: &Arc<dyn ProcessHost>,
        ipc: &Arc<IpcServer>,
        game: &GameId,
        expired: bool,
    ) -> safeplay_api::EnforcementResult {
        let success = match host.terminate(game).await {
            Ok(()) => true,
            Err(e) => {
                error!(game = %game, error = %e, "Termination failed");
                false
            }
        };

        let now_mono = MonotonicInstant::now();
        let result = {
            let mut st = state.lock().await;
            st.engine.apply_enforcement(game, success, now_mono)
        };

        ipc.broadcast_event(Event::new(EventPayload::EnforcementResult(result.clone())));

        let overlay = if result.success {
            if expired {
                OverlayEvent::new(
                    OverlayVariant::Success,
                    "Time's up",
                    result.message.clone(),
                    OVERLAY_TIME_UP,
                )
            } else {
                OverlayEvent::new(
                    OverlayVariant::Success,
                    "Game blocked",
                    result.message.clone(),
                    OVERLAY_SUCCESS,
                )
            }
        } else {
            OverlayEvent::new(
                OverlayVariant::Error,
                "Enforcement failed",
                result.message.clone(),
                OVERLAY_ERROR,
            )
        };
        Self::broadcast_overlay(state, ipc, overlay, now_mono).await;

        if result.success {
            Self::broadcast_session_list(state, ipc).await;
        }

        result
    }

    /// Push an overlay payload through the dedup gate before broadcasting
    async fn broadcast_overlay(
        state: &Arc<Mutex<DaemonState>>,
        ipc: &Arc<IpcServer>,
        overlay: OverlayEvent,
        now_mono: MonotonicInstant,
    ) {
        let admitted = {
            let mut st = state.lock().await;
            st.engine.admit_overlay(&overlay, now_mono)
        };
        if admitted {
            ipc.broadcast_event(Event::new(EventPayload::Overlay(overlay)));
        }
    }

    async fn broadcast_session_list(state: &Arc<Mutex<DaemonState>>, ipc: &Arc<IpcServer>) {
        let sessions = {
            let st = state.lock().await;
            st.engine.sessions()
        };
        ipc.broadcast_event(Event::new(EventPayload::SessionListUpdated { sessions }));
    }

    async fn handle_ipc_message(
        state: &Arc<Mutex<DaemonState>>,
        host: &Arc<dyn ProcessHost>,
        ipc: &Arc<IpcServer>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                let response = Self::handle_command(
                    state,
                    host,
                    ipc,
                    &client_id,
                    request.request_id,
                    request.command,
                )
                .await;

                let _ = ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
                let mut limiter = rate_limiter.lock().await;
                limiter.remove_client(&client_id);
            }
        }
    }

    async fn handle_command(
        state: &Arc<Mutex<DaemonState>>,
        host: &Arc<dyn ProcessHost>,
        ipc: &Arc<IpcServer>,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Response {
        let now = safeplay_util::now();
        let now_mono = MonotonicInstant::now();

        match command {
            Command::GetState => {
                let st = state.lock().await;
                let snapshot = StateSnapshot {
                    api_version: API_VERSION,
                    monitoring_active: st.monitoring_active,
                    sessions: st.engine.sessions(),
                };
                Response::success(request_id, ResponsePayload::State(snapshot))
            }

            Command::Block { game } => {
                if let Some(denied) = Self::require_enforcer(ipc, client_id, request_id).await {
                    return denied;
                }

                info!(game = %game, "Block requested");
                {
                    let mut st = state.lock().await;
                    st.engine.prepare_block(&game, now_mono);
                }
                Self::broadcast_session_list(state, ipc).await;

                let result = Self::enforce(state, host, ipc, &game, false).await;
                Response::success(request_id, ResponsePayload::Blocked(result))
            }

            Command::SetLimit { game, minutes } => {
                if let Some(denied) = Self::require_enforcer(ipc, client_id, request_id).await {
                    return denied;
                }

                let events = {
                    let mut st = state.lock().await;
                    st.engine.set_limit(&game, minutes, now, now_mono)
                };
                for event in events {
                    Self::handle_engine_event(state, host, ipc, event, now_mono).await;
                }
                Self::broadcast_session_list(state, ipc).await;

                Response::success(request_id, ResponsePayload::LimitSet { game, minutes })
            }

            Command::Unblock { game } => {
                if let Some(denied) = Self::require_enforcer(ipc, client_id, request_id).await {
                    return denied;
                }

                let events = {
                    let mut st = state.lock().await;
                    st.engine.unblock(&game, now, now_mono)
                };
                for event in events {
                    Self::handle_engine_event(state, host, ipc, event, now_mono).await;
                }
                Self::broadcast_session_list(state, ipc).await;

                Response::success(request_id, ResponsePayload::Unblocked { game })
            }

            Command::SetMonitoring { active } => {
                match ipc.get_client_info(client_id).await {
                    Some(info) if info.role.can_toggle_monitoring() => {}
                    _ => {
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::PermissionDenied, "Supervisor role required"),
                        );
                    }
                }

                {
                    let mut st = state.lock().await;
                    st.monitoring_active = active;
                }
                info!(active, "Monitoring gate changed");
                ipc.broadcast_event(Event::new(EventPayload::MonitoringChanged { active }));

                Response::success(request_id, ResponsePayload::MonitoringSet { active })
            }

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::GetHealth => {
                let st = state.lock().await;
                let health = HealthStatus {
                    live: true,
                    monitoring_active: st.monitoring_active,
                    tracked_sessions: st.engine.session_count(),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }

    /// Deny enforcement commands from non-supervisor peers
    async fn require_enforcer(
        ipc: &Arc<IpcServer>,
        client_id: &ClientId,
        request_id: u64,
    ) -> Option<Response> {
        match ipc.get_client_info(client_id).await {
            Some(info) if info.role.can_enforce() => None,
            _ => Some(Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Supervisor role required"),
            )),
        }
    }
}
