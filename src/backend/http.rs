use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, ReviewBackend};
use crate::session::ledger::ReviewPayload;
use crate::session::model::{LemmaId, LookupResult, ReviewMode, Session, WrapUpCard};
use crate::session::undo::UndoPayload;

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    #[serde(flatten)]
    payload: &'a ReviewPayload,
    client_review_id: &'a str,
}

#[derive(Serialize)]
struct WrapUpBody<'a> {
    seen_lemma_ids: &'a [LemmaId],
    missed_lemma_ids: &'a [LemmaId],
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct WrapUpResponse {
    #[serde(default)]
    cards: Vec<WrapUpCard>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, BackendError> {
        let response = self.client.get(self.url(path)).query(query).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, BackendError> {
        let response = self.client.post(self.url(path)).json(body).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }

    fn post_empty(&self, path: &str) -> Result<(), BackendError> {
        let response = self.client.post(self.url(path)).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl ReviewBackend for HttpBackend {
    fn fetch_session(&self, mode: ReviewMode) -> Result<Session, BackendError> {
        self.get_json("/api/review/session", &[("mode", mode.as_str())])
    }

    fn fetch_fresh_session(&self, mode: ReviewMode) -> Result<Session, BackendError> {
        self.get_json(
            "/api/review/session",
            &[("mode", mode.as_str()), ("fresh", "true")],
        )
    }

    fn submit_review(&self, payload: &ReviewPayload, client_id: &str) -> Result<(), BackendError> {
        let body = SubmitBody {
            payload,
            client_review_id: client_id,
        };
        self.post_json("/api/review/submit", &body).map(|_| ())
    }

    fn undo_review(&self, payload: &UndoPayload) -> Result<(), BackendError> {
        self.post_json("/api/review/undo", payload).map(|_| ())
    }

    fn lookup_word(&self, lemma_id: LemmaId) -> Result<LookupResult, BackendError> {
        self.get_json(&format!("/api/words/{lemma_id}/lookup"), &[])
    }

    fn introduce_word(&self, lemma_id: LemmaId) -> Result<(), BackendError> {
        self.post_empty(&format!("/api/words/{lemma_id}/introduce"))
    }

    fn suspend_word(&self, lemma_id: LemmaId) -> Result<(), BackendError> {
        self.post_empty(&format!("/api/words/{lemma_id}/suspend"))
    }

    fn fetch_wrap_up_cards(
        &self,
        seen: &[LemmaId],
        failed: &[LemmaId],
        session_id: Option<&str>,
    ) -> Result<Vec<WrapUpCard>, BackendError> {
        let body = WrapUpBody {
            seen_lemma_ids: seen,
            missed_lemma_ids: failed,
            session_id,
        };
        let text = self.post_json("/api/review/wrap-up", &body)?;
        let parsed: WrapUpResponse = serde_json::from_str(&text)?;
        Ok(parsed.cards)
    }
}
