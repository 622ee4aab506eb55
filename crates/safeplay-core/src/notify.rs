//! Notification deduplication
//!
//! Rapid state flapping can produce the same overlay payload several times
//! in quick succession. The gate admits a payload only if it differs from
//! the last admitted one or arrived outside the debounce window.

use safeplay_api::{OverlayEvent, OverlayVariant};
use safeplay_util::MonotonicInstant;
use std::time::Duration;
use tracing::debug;

/// Identity of an overlay payload for dedup purposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationKey {
    variant: OverlayVariant,
    title: String,
    body: String,
}

impl NotificationKey {
    pub fn of(event: &OverlayEvent) -> Self {
        Self {
            variant: event.variant,
            title: event.title.clone(),
            body: event.body.clone(),
        }
    }
}

/// Suppresses identical overlay payloads inside the debounce window
#[derive(Debug)]
pub struct OverlayGate {
    window: Duration,
    last: Option<(NotificationKey, MonotonicInstant)>,
}

impl OverlayGate {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns true if the event should be shown. Admitted events become
    /// the new dedup reference; suppressed ones do not refresh it, so a
    /// steady stream of duplicates still surfaces once per window.
    pub fn admit(&mut self, event: &OverlayEvent, now: MonotonicInstant) -> bool {
        let key = NotificationKey::of(event);

        if let Some((last_key, at)) = &self.last {
            if *last_key == key && now.duration_since(*at) < self.window {
                debug!(title = %event.title, "Duplicate overlay suppressed");
                return false;
            }
        }

        self.last = Some((key, now));
        true
    }
}
