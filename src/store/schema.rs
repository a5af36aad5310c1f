use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::model::{ReviewMode, Session};
use crate::session::summary::SessionSummary;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionHistoryData {
    pub schema_version: u32,
    pub sessions: Vec<SessionSummary>,
}

impl Default for SessionHistoryData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sessions: Vec::new(),
        }
    }
}

impl SessionHistoryData {
    /// Append and keep only the newest `limit` entries.
    pub fn push(&mut self, summary: SessionSummary, limit: usize) {
        self.sessions.push(summary);
        if self.sessions.len() > limit {
            let excess = self.sessions.len() - limit;
            self.sessions.drain(..excess);
        }
    }
}

/// Last session fetched for a mode, served when the server is unreachable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedSession {
    pub schema_version: u32,
    pub mode: ReviewMode,
    pub fetched_at: DateTime<Utc>,
    pub session: Session,
}

impl CachedSession {
    pub fn new(mode: ReviewMode, session: Session) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            mode,
            fetched_at: Utc::now(),
            session,
        }
    }

    /// Check if loaded data has a stale schema version or has aged out.
    pub fn is_usable(&self, max_age: chrono::Duration) -> bool {
        self.schema_version == SCHEMA_VERSION && Utc::now() - self.fetched_at <= max_age
    }
}
