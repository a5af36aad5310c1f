use log::{info, warn};

use crate::backend::{BackendError, ReviewBackend};
use crate::session::ledger::ReviewPayload;
use crate::session::model::{LemmaId, LookupResult, ReviewMode, Session, WrapUpCard};
use crate::session::undo::UndoPayload;
use crate::store::json_store::JsonStore;
use crate::store::schema::CachedSession;

const CACHE_MAX_AGE_HOURS: i64 = 12;

/// Keeps the last fetched session per mode on disk and serves it when the
/// inner backend cannot be reached. Fresh fetches never read the cache.
pub struct CachingBackend<B: ReviewBackend> {
    inner: B,
    store: Option<JsonStore>,
}

impl<B: ReviewBackend> CachingBackend<B> {
    pub fn new(inner: B, store: Option<JsonStore>) -> Self {
        Self { inner, store }
    }

    fn remember(&self, mode: ReviewMode, session: &Session) {
        let Some(ref store) = self.store else {
            return;
        };
        if session.is_empty() {
            store.clear_cached_session(mode);
            return;
        }
        if let Err(err) = store.save_cached_session(&CachedSession::new(mode, session.clone())) {
            warn!("could not cache {} session: {err}", mode.as_str());
        }
    }

    fn cached(&self, mode: ReviewMode) -> Option<Session> {
        let cached = self.store.as_ref()?.load_cached_session(mode)?;
        if cached.is_usable(chrono::Duration::hours(CACHE_MAX_AGE_HOURS)) {
            Some(cached.session)
        } else {
            None
        }
    }
}

impl<B: ReviewBackend> ReviewBackend for CachingBackend<B> {
    fn fetch_session(&self, mode: ReviewMode) -> Result<Session, BackendError> {
        match self.inner.fetch_session(mode) {
            Ok(session) => {
                self.remember(mode, &session);
                Ok(session)
            }
            Err(err) => match self.cached(mode) {
                Some(session) => {
                    info!("serving cached {} session after fetch failure: {err}", mode.as_str());
                    Ok(session)
                }
                None => Err(err),
            },
        }
    }

    fn fetch_fresh_session(&self, mode: ReviewMode) -> Result<Session, BackendError> {
        let session = self.inner.fetch_fresh_session(mode)?;
        self.remember(mode, &session);
        Ok(session)
    }

    fn submit_review(&self, payload: &ReviewPayload, client_id: &str) -> Result<(), BackendError> {
        self.inner.submit_review(payload, client_id)
    }

    fn undo_review(&self, payload: &UndoPayload) -> Result<(), BackendError> {
        self.inner.undo_review(payload)
    }

    fn lookup_word(&self, lemma_id: LemmaId) -> Result<LookupResult, BackendError> {
        self.inner.lookup_word(lemma_id)
    }

    fn introduce_word(&self, lemma_id: LemmaId) -> Result<(), BackendError> {
        self.inner.introduce_word(lemma_id)
    }

    fn suspend_word(&self, lemma_id: LemmaId) -> Result<(), BackendError> {
        self.inner.suspend_word(lemma_id)
    }

    fn fetch_wrap_up_cards(
        &self,
        seen: &[LemmaId],
        failed: &[LemmaId],
        session_id: Option<&str>,
    ) -> Result<Vec<WrapUpCard>, BackendError> {
        self.inner.fetch_wrap_up_cards(seen, failed, session_id)
    }
}
