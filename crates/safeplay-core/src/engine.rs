//! The enforcement engine
//!
//! Owns the registry, timers, poller, and overlay gate. Pure state machine:
//! the daemon feeds it process snapshots and the monotonic clock, and acts
//! on the events it returns. Termination results flow back in through
//! [`Engine::apply_enforcement`].

use crate::{
    AdaptivePoller, EngineEvent, LifecycleEvent, OverlayGate, RecencyMarkers, SessionRegistry,
    TimerEvent, TimerManager,
};
use chrono::{DateTime, Local};
use safeplay_api::{EnforcementResult, OverlayEvent, SessionView};
use safeplay_config::MonitorSettings;
use safeplay_util::{GameId, MonotonicInstant};
use std::time::Duration;
use tracing::{info, warn};

pub struct Engine {
    settings: MonitorSettings,
    registry: SessionRegistry,
    markers: RecencyMarkers,
    timers: TimerManager,
    poller: AdaptivePoller,
    gate: OverlayGate,
}

impl Engine {
    pub fn new(settings: MonitorSettings) -> Self {
        let poller = AdaptivePoller::new(
            settings.base_poll,
            settings.burst_poll,
            settings.burst_window,
        );
        let gate = OverlayGate::new(settings.notify_debounce);
        Self {
            settings,
            registry: SessionRegistry::default(),
            markers: RecencyMarkers::default(),
            timers: TimerManager::default(),
            poller,
            gate,
        }
    }

    /// Whether a process snapshot is due at `now`
    pub fn poll_due(&mut self, now: MonotonicInstant) -> bool {
        self.poller.poll_due(now)
    }

    pub fn mark_polled(&mut self, now: MonotonicInstant) {
        self.poller.mark_polled(now);
    }

    pub fn is_bursting(&self, now: MonotonicInstant) -> bool {
        self.poller.is_bursting(now)
    }

    /// Feed a fresh process snapshot into the registry.
    ///
    /// Any lifecycle change opens a burst window. A close cancels the
    /// game's timer pair, so a limit armed on a vanished game never fires.
    pub fn reconcile(
        &mut self,
        snapshot: &[GameId],
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<EngineEvent> {
        let lifecycle =
            self.registry
                .reconcile(&mut self.markers, snapshot, now, now_mono, &self.settings);

        let mut events = Vec::new();
        for change in lifecycle {
            self.poller.trigger_burst(now_mono);
            match change {
                LifecycleEvent::Started(game) => {
                    let started_at = self
                        .registry
                        .get(&game)
                        .map(|s| s.started_at)
                        .unwrap_or(now);
                    events.push(EngineEvent::Started { game, started_at });
                }
                LifecycleEvent::StartedSilently(game) => {
                    events.push(EngineEvent::StartedSilently { game });
                }
                LifecycleEvent::ClosedByUser { game, duration } => {
                    self.timers.cancel(&game);
                    events.push(EngineEvent::Closed {
                        game,
                        enforced: false,
                        duration,
                    });
                }
                LifecycleEvent::ClosedByEnforcement { game, duration } => {
                    self.timers.cancel(&game);
                    events.push(EngineEvent::Closed {
                        game,
                        enforced: true,
                        duration,
                    });
                }
            }
        }
        events
    }

    /// Check timer deadlines. Kill deadlines for games no longer tracked
    /// are dropped; their close already cancelled enforcement.
    pub fn tick(&mut self, now_mono: MonotonicInstant) -> Vec<EngineEvent> {
        self.timers
            .due(now_mono)
            .into_iter()
            .filter_map(|event| match event {
                TimerEvent::WarnDue { game, remaining } => {
                    if self.registry.contains(&game) {
                        Some(EngineEvent::WarningDue { game, remaining })
                    } else {
                        None
                    }
                }
                TimerEvent::KillDue { game } => {
                    if self.registry.contains(&game) {
                        Some(EngineEvent::EnforceDue { game })
                    } else {
                        warn!(game = %game, "Kill deadline fired for untracked game, dropping");
                        None
                    }
                }
            })
            .collect()
    }

    /// Arm a play limit for a game. Session accounting restarts from `now`
    /// and the game is tracked even if it has not been seen yet.
    pub fn set_limit(
        &mut self,
        game: &GameId,
        minutes: u64,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<EngineEvent> {
        let limit = Duration::from_secs(minutes * 60);
        self.registry.touch_start(game, now, now_mono);
        self.timers
            .arm(game, limit, self.settings.warn_lead, now_mono);
        self.poller.trigger_burst(now_mono);
        info!(game = %game, minutes, "Play limit armed");

        vec![EngineEvent::LimitSet {
            game: game.clone(),
            minutes,
        }]
    }

    /// Clear a game's state ahead of an immediate block: cancel its timer
    /// pair and drop the session before the termination attempt, so no
    /// limit-expired path can fire afterwards and the session is gone even
    /// if the kill fails. The kill marker keeps a lingering process from
    /// re-registering while it dies.
    pub fn prepare_block(&mut self, game: &GameId, now_mono: MonotonicInstant) {
        self.timers.cancel(game);
        self.registry.remove(game);
        self.markers.record_kill(game, now_mono);
        self.poller.trigger_burst(now_mono);
        info!(game = %game, "Block requested");
    }

    /// Lift a block. Session accounting restarts so a relaunch counts from
    /// zero.
    pub fn unblock(
        &mut self,
        game: &GameId,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<EngineEvent> {
        self.timers.cancel(game);
        self.markers.clear_kill(game);
        self.registry.touch_start(game, now, now_mono);
        self.poller.trigger_burst(now_mono);
        info!(game = %game, "Block lifted");

        vec![EngineEvent::Unblocked { game: game.clone() }]
    }

    /// Fold a termination attempt's outcome back into engine state.
    ///
    /// Success records a kill marker (so the upcoming disappearance is
    /// classified as enforced), drops the session, and opens a burst
    /// window. Failure leaves the session tracked for retry or manual
    /// intervention.
    pub fn apply_enforcement(
        &mut self,
        game: &GameId,
        success: bool,
        now_mono: MonotonicInstant,
    ) -> EnforcementResult {
        let name = game.display_name().to_string();

        if success {
            self.markers.record_kill(game, now_mono);
            self.timers.cancel(game);
            self.registry.remove(game);
            self.poller.trigger_burst(now_mono);
            info!(game = %game, "Termination succeeded");
            EnforcementResult {
                game: game.clone(),
                success: true,
                message: format!("Game closed: {name}"),
            }
        } else {
            warn!(game = %game, "Termination failed, session kept");
            EnforcementResult {
                game: game.clone(),
                success: false,
                message: format!("Could not close {name}."),
            }
        }
    }

    /// Deduplicate an overlay payload. Returns true if it should be shown.
    pub fn admit_overlay(&mut self, event: &OverlayEvent, now_mono: MonotonicInstant) -> bool {
        self.gate.admit(event, now_mono)
    }

    pub fn sessions(&self) -> Vec<SessionView> {
        self.registry.views()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_tracked(&self, game: &GameId) -> bool {
        self.registry.contains(game)
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }
}
