pub mod cache;
#[cfg(feature = "network")]
pub mod http;
pub mod worker;

use thiserror::Error;

use crate::session::ledger::ReviewPayload;
use crate::session::model::{LemmaId, LookupResult, ReviewMode, Session, WrapUpCard};
use crate::session::undo::UndoPayload;

#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "network")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("offline: no review server configured")]
    Offline,
}

/// Blocking collaborator calls. Implementations run on worker threads,
/// never on the event loop.
pub trait ReviewBackend: Send + Sync {
    fn fetch_session(&self, mode: ReviewMode) -> Result<Session, BackendError>;

    /// Same as `fetch_session` but bypasses any local cache.
    fn fetch_fresh_session(&self, mode: ReviewMode) -> Result<Session, BackendError>;

    fn submit_review(&self, payload: &ReviewPayload, client_id: &str) -> Result<(), BackendError>;

    fn undo_review(&self, payload: &UndoPayload) -> Result<(), BackendError>;

    fn lookup_word(&self, lemma_id: LemmaId) -> Result<LookupResult, BackendError>;

    fn introduce_word(&self, lemma_id: LemmaId) -> Result<(), BackendError>;

    fn suspend_word(&self, lemma_id: LemmaId) -> Result<(), BackendError>;

    fn fetch_wrap_up_cards(
        &self,
        seen: &[LemmaId],
        failed: &[LemmaId],
        session_id: Option<&str>,
    ) -> Result<Vec<WrapUpCard>, BackendError>;
}

/// Used when the crate is built without the `network` feature.
pub struct OfflineBackend;

impl ReviewBackend for OfflineBackend {
    fn fetch_session(&self, _mode: ReviewMode) -> Result<Session, BackendError> {
        Err(BackendError::Offline)
    }

    fn fetch_fresh_session(&self, _mode: ReviewMode) -> Result<Session, BackendError> {
        Err(BackendError::Offline)
    }

    fn submit_review(&self, _payload: &ReviewPayload, _client_id: &str) -> Result<(), BackendError> {
        Err(BackendError::Offline)
    }

    fn undo_review(&self, _payload: &UndoPayload) -> Result<(), BackendError> {
        Err(BackendError::Offline)
    }

    fn lookup_word(&self, _lemma_id: LemmaId) -> Result<LookupResult, BackendError> {
        Err(BackendError::Offline)
    }

    fn introduce_word(&self, _lemma_id: LemmaId) -> Result<(), BackendError> {
        Err(BackendError::Offline)
    }

    fn suspend_word(&self, _lemma_id: LemmaId) -> Result<(), BackendError> {
        Err(BackendError::Offline)
    }

    fn fetch_wrap_up_cards(
        &self,
        _seen: &[LemmaId],
        _failed: &[LemmaId],
        _session_id: Option<&str>,
    ) -> Result<Vec<WrapUpCard>, BackendError> {
        Err(BackendError::Offline)
    }
}

/// Outbound work emitted by the orchestrator. The driver drains these after
/// every event.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    FetchSession {
        generation: u64,
        mode: ReviewMode,
        fresh: bool,
    },
    FetchRefresh {
        generation: u64,
        mode: ReviewMode,
    },
    Lookup {
        token: u64,
        word_index: usize,
        lemma_id: LemmaId,
    },
    Submit {
        client_id: String,
        payload: ReviewPayload,
    },
    Undo {
        payload: UndoPayload,
    },
    Introduce {
        lemma_id: LemmaId,
    },
    Suspend {
        lemma_id: LemmaId,
    },
    FetchWrapUp {
        generation: u64,
        seen: Vec<LemmaId>,
        failed: Vec<LemmaId>,
        session_id: Option<String>,
    },
    PlayAudio {
        url: Option<String>,
    },
    StopAudio,
}

impl Request {
    pub fn is_audio(&self) -> bool {
        matches!(self, Request::PlayAudio { .. } | Request::StopAudio)
    }
}

/// Completed collaborator call, posted back to the event loop.
#[derive(Debug)]
pub enum Response {
    SessionLoaded {
        generation: u64,
        result: Result<Session, BackendError>,
    },
    RefreshLoaded {
        generation: u64,
        result: Result<Session, BackendError>,
    },
    LookupResolved {
        token: u64,
        word_index: usize,
        result: Result<LookupResult, BackendError>,
    },
    WrapUpLoaded {
        generation: u64,
        result: Result<Vec<WrapUpCard>, BackendError>,
    },
    Acknowledged {
        action: &'static str,
        result: Result<(), BackendError>,
    },
}
