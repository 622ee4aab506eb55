//! Adaptive poll cadence
//!
//! Steady state polls at the base cadence. Any state change opens a burst
//! window during which polls run at the faster burst cadence; overlapping
//! triggers extend the window to whichever deadline is later, never
//! shorten it.

use safeplay_util::MonotonicInstant;
use std::time::Duration;
use tracing::trace;

#[derive(Debug)]
pub struct AdaptivePoller {
    base: Duration,
    burst: Duration,
    burst_window: Duration,
    burst_until: Option<MonotonicInstant>,
    last_poll: Option<MonotonicInstant>,
}

impl AdaptivePoller {
    pub fn new(base: Duration, burst: Duration, burst_window: Duration) -> Self {
        Self {
            base,
            burst,
            burst_window,
            burst_until: None,
            last_poll: None,
        }
    }

    /// Open (or extend) the burst window from `now`.
    pub fn trigger_burst(&mut self, now: MonotonicInstant) {
        let candidate = now + self.burst_window;
        let extended = match self.burst_until {
            Some(current) if current >= candidate => current,
            _ => candidate,
        };
        if self.burst_until != Some(extended) {
            trace!("Burst window extended");
        }
        self.burst_until = Some(extended);
    }

    pub fn is_bursting(&self, now: MonotonicInstant) -> bool {
        self.burst_until.is_some_and(|until| now < until)
    }

    /// Current effective cadence
    pub fn interval(&self, now: MonotonicInstant) -> Duration {
        if self.is_bursting(now) {
            self.burst
        } else {
            self.base
        }
    }

    /// Whether a snapshot is due at `now`. The first call after startup is
    /// always due.
    pub fn poll_due(&mut self, now: MonotonicInstant) -> bool {
        // Expire a lapsed window so state stays tidy.
        if self.burst_until.is_some_and(|until| now >= until) {
            self.burst_until = None;
        }

        match self.last_poll {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval(now),
        }
    }

    /// Record that a snapshot was taken at `now`.
    pub fn mark_polled(&mut self, now: MonotonicInstant) {
        self.last_poll = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poller() -> AdaptivePoller {
        AdaptivePoller::new(
            Duration::from_millis(1000),
            Duration::from_millis(500),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn first_poll_is_immediate() {
        let t0 = MonotonicInstant::now();
        let mut p = poller();
        assert!(p.poll_due(t0));
    }

    #[test]
    fn steady_state_uses_base_cadence() {
        let t0 = MonotonicInstant::now();
        let mut p = poller();
        p.mark_polled(t0);

        assert!(!p.poll_due(t0 + Duration::from_millis(600)));
        assert!(p.poll_due(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn burst_halves_the_interval() {
        let t0 = MonotonicInstant::now();
        let mut p = poller();
        p.mark_polled(t0);
        p.trigger_burst(t0);

        assert!(p.is_bursting(t0 + Duration::from_millis(100)));
        assert!(p.poll_due(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn burst_expires_back_to_base() {
        let t0 = MonotonicInstant::now();
        let mut p = poller();
        p.trigger_burst(t0);

        let after = t0 + Duration::from_millis(5500);
        p.mark_polled(after);
        assert!(!p.is_bursting(after));
        assert!(!p.poll_due(after + Duration::from_millis(600)));
        assert!(p.poll_due(after + Duration::from_millis(1000)));
    }

    #[test]
    fn overlapping_bursts_extend_never_shorten() {
        let t0 = MonotonicInstant::now();
        let mut p = poller();

        p.trigger_burst(t0 + Duration::from_secs(2));
        // An earlier-deadline trigger must not pull the window back
        p.trigger_burst(t0);

        // 6s in: the t0 window would have lapsed, the t0+2 one has not
        assert!(p.is_bursting(t0 + Duration::from_secs(6)));
        assert!(!p.is_bursting(t0 + Duration::from_secs(7)));
    }

    #[test]
    fn burst_window_is_continuous_across_triggers() {
        let t0 = MonotonicInstant::now();
        let mut p = poller();

        p.trigger_burst(t0);
        p.trigger_burst(t0 + Duration::from_secs(3));

        // No gap anywhere between t0 and t0+8s
        for secs in 0..8 {
            assert!(
                p.is_bursting(t0 + Duration::from_secs(secs)),
                "gap at {secs}s"
            );
        }
        assert!(!p.is_bursting(t0 + Duration::from_secs(8)));
    }
}
