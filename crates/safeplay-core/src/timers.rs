//! Per-game warn/kill timer pairs
//!
//! Each limited game carries exactly one pair of deadlines: a warning at
//! `limit - warn_lead` and a kill at `limit`. Pairs are checked against the
//! monotonic clock on every tick rather than spawned as tasks; a generation
//! counter per identity makes cancellation logical, so a deadline surviving
//! a re-arm by interleaving can never fire.

use safeplay_util::{GameId, MonotonicInstant};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Timer deadlines that have come due
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// The warning lead has been reached; `remaining` until the kill
    WarnDue { game: GameId, remaining: Duration },
    /// The limit has been reached; termination should be attempted
    KillDue { game: GameId },
}

#[derive(Debug)]
struct TimerPair {
    warn_at: Option<MonotonicInstant>,
    kill_at: MonotonicInstant,
    /// Generation this pair was armed under
    generation: u64,
}

/// Owns every armed timer pair, keyed by game identity.
///
/// Arming a game always cancels its previous pair first, so at most one
/// pair exists per identity at any time.
#[derive(Debug, Default)]
pub struct TimerManager {
    pairs: HashMap<GameId, TimerPair>,
    generations: HashMap<GameId, u64>,
}

impl TimerManager {
    /// Arm (or re-arm) the warn/kill pair for a game.
    ///
    /// The kill fires `limit` after `now`; the warning fires `warn_lead`
    /// before the kill, or is skipped when the limit is shorter than the
    /// lead. Any previously armed pair for this game is invalidated.
    pub fn arm(
        &mut self,
        game: &GameId,
        limit: Duration,
        warn_lead: Duration,
        now: MonotonicInstant,
    ) {
        let generation = self.bump(game);

        let kill_at = now + limit;
        let warn_at = if limit > warn_lead {
            Some(now + (limit - warn_lead))
        } else {
            None
        };

        debug!(
            game = %game,
            limit_secs = limit.as_secs(),
            warn = warn_at.is_some(),
            "Armed timer pair"
        );

        self.pairs.insert(
            game.clone(),
            TimerPair {
                warn_at,
                kill_at,
                generation,
            },
        );
    }

    /// Cancel any armed pair for a game. Idempotent. The generation entry
    /// goes with the pair; a later re-arm starts a fresh line of
    /// generations, which is safe because no pair from the old line can
    /// still exist.
    pub fn cancel(&mut self, game: &GameId) {
        if self.pairs.remove(game).is_some() {
            debug!(game = %game, "Cancelled timer pair");
        }
        self.generations.remove(game);
    }

    pub fn is_armed(&self, game: &GameId) -> bool {
        self.pairs.contains_key(game)
    }

    /// Remaining time until the kill deadline, if a pair is armed
    pub fn remaining(&self, game: &GameId, now: MonotonicInstant) -> Option<Duration> {
        self.pairs
            .get(game)
            .map(|p| p.kill_at.saturating_duration_until(now))
    }

    /// Collect deadlines that have come due.
    ///
    /// A warning fires at most once per pair (its slot is cleared). A kill
    /// removes the whole pair, so a fired limit never fires again without
    /// an explicit re-arm. Both may fire on the same tick for a limit
    /// shorter than the warning lead; the warning is emitted first.
    pub fn due(&mut self, now: MonotonicInstant) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        let mut killed = Vec::new();
        for (game, pair) in &mut self.pairs {
            if pair.generation != self.generations.get(game).copied().unwrap_or(0) {
                // Stale pair; a concurrent cancel/arm superseded it.
                killed.push(game.clone());
                continue;
            }

            if let Some(warn_at) = pair.warn_at {
                if now >= warn_at {
                    pair.warn_at = None;
                    events.push(TimerEvent::WarnDue {
                        game: game.clone(),
                        remaining: pair.kill_at.saturating_duration_until(now),
                    });
                }
            }

            if now >= pair.kill_at {
                events.push(TimerEvent::KillDue { game: game.clone() });
                killed.push(game.clone());
            }
        }

        for game in killed {
            self.pairs.remove(&game);
            self.generations.remove(&game);
        }

        events
    }

    fn bump(&mut self, game: &GameId) -> u64 {
        let slot = self.generations.entry(game.clone()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Number of games with any bookkeeping still held
    #[cfg(test)]
    pub(crate) fn bookkeeping_len(&self) -> usize {
        self.pairs.len().max(self.generations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameId {
        GameId::new("Celeste")
    }

    const LEAD: Duration = Duration::from_secs(30);

    #[test]
    fn warn_then_kill_in_order() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();
        timers.arm(&game(), Duration::from_secs(60), LEAD, t0);

        assert!(timers.due(t0 + Duration::from_secs(29)).is_empty());

        let events = timers.due(t0 + Duration::from_secs(30));
        assert_eq!(
            events,
            vec![TimerEvent::WarnDue {
                game: game(),
                remaining: Duration::from_secs(30),
            }]
        );

        // Warning does not repeat
        assert!(timers.due(t0 + Duration::from_secs(45)).is_empty());

        let events = timers.due(t0 + Duration::from_secs(60));
        assert_eq!(events, vec![TimerEvent::KillDue { game: game() }]);

        // Kill removed the pair
        assert!(!timers.is_armed(&game()));
        assert!(timers.due(t0 + Duration::from_secs(90)).is_empty());
    }

    #[test]
    fn limit_shorter_than_lead_skips_warning() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();
        timers.arm(&game(), Duration::from_secs(10), LEAD, t0);

        let events = timers.due(t0 + Duration::from_secs(10));
        assert_eq!(events, vec![TimerEvent::KillDue { game: game() }]);
    }

    #[test]
    fn rearm_yields_single_kill_at_new_deadline() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();

        timers.arm(&game(), Duration::from_secs(60), LEAD, t0);
        // Re-armed before anything fired
        timers.arm(
            &game(),
            Duration::from_secs(120),
            LEAD,
            t0 + Duration::from_secs(10),
        );

        // Old deadlines never fire
        assert!(timers.due(t0 + Duration::from_secs(60)).is_empty());

        let events = timers.due(t0 + Duration::from_secs(100));
        assert_eq!(
            events,
            vec![TimerEvent::WarnDue {
                game: game(),
                remaining: Duration::from_secs(30),
            }]
        );

        let events = timers.due(t0 + Duration::from_secs(130));
        assert_eq!(events, vec![TimerEvent::KillDue { game: game() }]);
        assert!(timers.due(t0 + Duration::from_secs(300)).is_empty());
    }

    #[test]
    fn cancel_is_idempotent_and_final() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();

        timers.arm(&game(), Duration::from_secs(60), LEAD, t0);
        timers.cancel(&game());
        timers.cancel(&game());

        assert!(!timers.is_armed(&game()));
        assert!(timers.due(t0 + Duration::from_secs(120)).is_empty());
    }

    #[test]
    fn bookkeeping_is_dropped_with_the_pair() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();

        // Kill removes everything for the game
        timers.arm(&game(), Duration::from_secs(10), LEAD, t0);
        timers.due(t0 + Duration::from_secs(10));
        assert_eq!(timers.bookkeeping_len(), 0);

        // So does cancel, even repeated ones
        timers.arm(&game(), Duration::from_secs(60), LEAD, t0);
        timers.cancel(&game());
        timers.cancel(&game());
        assert_eq!(timers.bookkeeping_len(), 0);

        // Arm-cancel cycles over many games leave nothing behind
        for i in 0..100 {
            let g = GameId::new(format!("Game{i}"));
            timers.arm(&g, Duration::from_secs(60), LEAD, t0);
            timers.cancel(&g);
        }
        assert_eq!(timers.bookkeeping_len(), 0);
    }

    #[test]
    fn warn_and_kill_same_tick_keeps_order() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();
        timers.arm(&game(), Duration::from_secs(60), LEAD, t0);

        // One very late tick sees both deadlines at once
        let events = timers.due(t0 + Duration::from_secs(90));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TimerEvent::WarnDue { .. }));
        assert!(matches!(events[1], TimerEvent::KillDue { .. }));
    }

    #[test]
    fn remaining_tracks_kill_deadline() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();
        timers.arm(&game(), Duration::from_secs(60), LEAD, t0);

        assert_eq!(
            timers.remaining(&game(), t0 + Duration::from_secs(20)),
            Some(Duration::from_secs(40))
        );
        assert_eq!(timers.remaining(&GameId::new("Hades"), t0), None);
    }

    #[test]
    fn timers_are_independent_per_game() {
        let t0 = MonotonicInstant::now();
        let mut timers = TimerManager::default();
        timers.arm(&GameId::new("Celeste"), Duration::from_secs(40), LEAD, t0);
        timers.arm(&GameId::new("Hades"), Duration::from_secs(80), LEAD, t0);

        timers.cancel(&GameId::new("Celeste"));

        let events = timers.due(t0 + Duration::from_secs(80));
        assert!(events
            .iter()
            .all(|e| !matches!(e, TimerEvent::KillDue { game } if game.as_str() == "Celeste")));
        assert!(events
            .iter()
            .any(|e| matches!(e, TimerEvent::KillDue { game } if game.as_str() == "Hades")));
    }
}
