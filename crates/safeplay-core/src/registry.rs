//! Session registry and snapshot reconciliation
//!
//! The registry is the sole source of truth for "is this game currently
//! tracked as running". Reconciliation diffs it against a fresh process
//! snapshot and produces lifecycle events; the recency markers disambiguate
//! enforcement closes from manual closes and suppress duplicate start
//! notifications.

use chrono::{DateTime, Local};
use safeplay_api::{SessionStatus, SessionView};
use safeplay_config::MonitorSettings;
use safeplay_util::{GameId, MonotonicInstant};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// A tracked play session
#[derive(Debug, Clone)]
pub struct Session {
    pub game: GameId,

    /// Wall-clock start (for display)
    pub started_at: DateTime<Local>,

    /// Monotonic start (for duration accounting)
    pub started_at_mono: MonotonicInstant,

    pub status: SessionStatus,

    /// When the identity first went missing from a snapshot
    first_missed_at: Option<MonotonicInstant>,
}

impl Session {
    fn new(game: GameId, now: DateTime<Local>, now_mono: MonotonicInstant) -> Self {
        Self {
            game,
            started_at: now,
            started_at_mono: now_mono,
            status: SessionStatus::Running,
            first_missed_at: None,
        }
    }

    pub fn duration_so_far(&self, now_mono: MonotonicInstant) -> Duration {
        now_mono.duration_since(self.started_at_mono)
    }

    pub fn to_view(&self) -> SessionView {
        SessionView {
            game: self.game.clone(),
            display_name: self.game.display_name().to_string(),
            started_at: self.started_at,
            status: self.status,
        }
    }
}

/// Lifecycle events produced by one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Started(GameId),
    /// Started suppressed by the start cooldown; session created silently
    StartedSilently(GameId),
    ClosedByUser {
        game: GameId,
        duration: Duration,
    },
    /// Already reported at kill time; no notification is due
    ClosedByEnforcement {
        game: GameId,
        duration: Duration,
    },
}

/// Transient per-game markers guarding notification correctness.
///
/// Kill markers classify a disappearance as an enforcement close within the
/// grace window after a kill request was issued (whether or not the OS
/// confirmed it). Start markers suppress duplicate "game started"
/// notifications within the cooldown window.
#[derive(Debug, Default)]
pub struct RecencyMarkers {
    kills: HashMap<GameId, MonotonicInstant>,
    starts: HashMap<GameId, MonotonicInstant>,
}

impl RecencyMarkers {
    pub fn record_kill(&mut self, game: &GameId, now: MonotonicInstant) {
        self.kills.insert(game.clone(), now);
    }

    pub fn record_start(&mut self, game: &GameId, now: MonotonicInstant) {
        self.starts.insert(game.clone(), now);
    }

    /// A kill marker still within the enforcement grace window
    pub fn kill_live(&self, game: &GameId, now: MonotonicInstant, grace: Duration) -> bool {
        self.kills
            .get(game)
            .is_some_and(|t| now.duration_since(*t) <= grace)
    }

    pub fn clear_kill(&mut self, game: &GameId) {
        self.kills.remove(game);
    }

    /// A start marker still within the cooldown window
    pub fn start_live(&self, game: &GameId, now: MonotonicInstant, cooldown: Duration) -> bool {
        self.starts
            .get(game)
            .is_some_and(|t| now.duration_since(*t) <= cooldown)
    }

    /// Drop kill markers older than the retention window and start markers
    /// older than the cooldown
    pub fn prune(&mut self, now: MonotonicInstant, kill_retention: Duration, cooldown: Duration) {
        self.kills
            .retain(|_, t| now.duration_since(*t) <= kill_retention);
        self.starts.retain(|_, t| now.duration_since(*t) <= cooldown);
    }

    #[cfg(test)]
    pub(crate) fn kill_count(&self) -> usize {
        self.kills.len()
    }
}

/// In-memory mapping from game identity to session state
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<GameId, Session>,
}

impl SessionRegistry {
    pub fn get(&self, game: &GameId) -> Option<&Session> {
        self.sessions.get(game)
    }

    pub fn contains(&self, game: &GameId) -> bool {
        self.sessions.contains_key(game)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove a session outright (manual block, confirmed kill).
    /// Returns the removed session, or None if it was not tracked.
    pub fn remove(&mut self, game: &GameId) -> Option<Session> {
        self.sessions.remove(game)
    }

    /// Reset session accounting for a game, creating the session if absent.
    /// Used when a limit is armed or a block is lifted.
    pub fn touch_start(&mut self, game: &GameId, now: DateTime<Local>, now_mono: MonotonicInstant) {
        let session = self
            .sessions
            .entry(game.clone())
            .or_insert_with(|| Session::new(game.clone(), now, now_mono));
        session.started_at = now;
        session.started_at_mono = now_mono;
        session.status = SessionStatus::Running;
        session.first_missed_at = None;
    }

    /// Current registry snapshot for UI display
    pub fn views(&self) -> Vec<SessionView> {
        let mut views: Vec<SessionView> = self.sessions.values().map(Session::to_view).collect();
        views.sort_by(|a, b| a.game.as_str().cmp(b.game.as_str()));
        views
    }

    /// Reconcile the registry against a fresh process snapshot.
    ///
    /// Sessions missing from one snapshot flip to PendingClose; they are
    /// removed only after staying missing past the close grace window, so a
    /// single flaky enumeration never tears a session down. A live kill
    /// marker classifies the removal as an enforcement close (silent - it
    /// was reported at kill time) and is consumed; otherwise the close is
    /// attributed to the user.
    pub fn reconcile(
        &mut self,
        markers: &mut RecencyMarkers,
        snapshot: &[GameId],
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
        settings: &MonitorSettings,
    ) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();

        // Departures first: close-then-start ordering for an identity that
        // vanishes and reappears across passes.
        let missing: Vec<GameId> = self
            .sessions
            .keys()
            .filter(|g| !snapshot.contains(g))
            .cloned()
            .collect();

        for game in missing {
            let Some(session) = self.sessions.get_mut(&game) else {
                continue;
            };

            match session.first_missed_at {
                None => {
                    session.status = SessionStatus::PendingClose;
                    session.first_missed_at = Some(now_mono);
                    debug!(game = %game, "Session missing from snapshot, pending close");
                }
                Some(first) if now_mono.duration_since(first) >= settings.close_grace => {
                    let duration = session.duration_so_far(now_mono);
                    self.sessions.remove(&game);

                    if markers.kill_live(&game, now_mono, settings.kill_grace) {
                        markers.clear_kill(&game);
                        debug!(game = %game, "Enforcement close confirmed by snapshot");
                        events.push(LifecycleEvent::ClosedByEnforcement { game, duration });
                    } else {
                        debug!(game = %game, duration_secs = duration.as_secs(), "Session closed by user");
                        events.push(LifecycleEvent::ClosedByUser { game, duration });
                    }
                }
                Some(_) => {
                    // Still inside the grace window; keep waiting.
                }
            }
        }

        // Arrivals. The snapshot provider already collapses same-install
        // processes to one identity, but guard against duplicates anyway.
        let mut seen: Vec<&GameId> = Vec::new();
        for game in snapshot {
            if seen.contains(&game) {
                continue;
            }
            seen.push(game);

            match self.sessions.get_mut(game) {
                Some(session) => {
                    if session.status == SessionStatus::PendingClose {
                        // It never actually closed; keep started_at.
                        session.status = SessionStatus::Running;
                        session.first_missed_at = None;
                    }
                }
                None => {
                    // A process lingering after a kill request must not
                    // resurrect the session inside the grace window.
                    if markers.kill_live(game, now_mono, settings.kill_grace) {
                        debug!(game = %game, "Ignoring recently killed game still in snapshot");
                        continue;
                    }

                    self.sessions
                        .insert(game.clone(), Session::new(game.clone(), now, now_mono));

                    if markers.start_live(game, now_mono, settings.start_cooldown) {
                        debug!(game = %game, "Start notification suppressed by cooldown");
                        events.push(LifecycleEvent::StartedSilently(game.clone()));
                    } else {
                        debug!(game = %game, "Session started");
                        events.push(LifecycleEvent::Started(game.clone()));
                    }
                    markers.record_start(game, now_mono);
                }
            }
        }

        markers.prune(
            now_mono,
            settings.kill_marker_retention(),
            settings.start_cooldown,
        );

        events
    }
}
