use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::session::model::Session;

/// Watches for idle gaps and holds a replacement session until the next
/// slot advance.
#[derive(Clone, Debug)]
pub struct RefreshMonitor {
    stale_after: Duration,
    in_flight: Option<u64>,
    pending: Option<Session>,
}

impl RefreshMonitor {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            in_flight: None,
            pending: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn should_refresh(&self, session_active: bool, last_activity: Instant, now: Instant) -> bool {
        session_active
            && self.in_flight.is_none()
            && self.pending.is_none()
            && now.saturating_duration_since(last_activity) > self.stale_after
    }

    pub fn begin(&mut self, generation: u64) {
        self.in_flight = Some(generation);
    }

    /// Returns true when the fetched session was kept as pending.
    pub fn on_loaded(&mut self, generation: u64, result: Result<Session, String>) -> bool {
        if self.in_flight != Some(generation) {
            debug!("dropping refresh for superseded session generation {generation}");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(session) if !session.is_empty() => {
                info!("background refresh ready: {} items held until next advance", session.items.len());
                self.pending = Some(session);
                true
            }
            Ok(_) => {
                debug!("background refresh returned an empty session");
                false
            }
            Err(err) => {
                warn!("background refresh failed: {err}");
                false
            }
        }
    }

    pub fn take_pending(&mut self) -> Option<Session> {
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.in_flight = None;
        self.pending = None;
    }
}
