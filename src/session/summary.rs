use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::ledger::{OutcomeLedger, SessionResults};
use crate::session::model::{LemmaId, ReviewMode};
use crate::session::wrap_up::WrapUp;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Option<String>,
    #[serde(default)]
    pub mode: ReviewMode,
    pub finished_at: DateTime<Utc>,
    pub results: SessionResults,
    pub slot_count: usize,
    pub seen_lemmas: usize,
    #[serde(default)]
    pub failed_lemma_ids: Vec<LemmaId>,
    #[serde(default)]
    pub wrap_up_answered: usize,
    #[serde(default)]
    pub wrap_up_got_it: usize,
}

impl SessionSummary {
    pub fn build(
        session_id: Option<String>,
        mode: ReviewMode,
        results: SessionResults,
        slot_count: usize,
        ledger: &OutcomeLedger,
        wrap_up: Option<&WrapUp>,
    ) -> Self {
        Self {
            session_id,
            mode,
            finished_at: Utc::now(),
            results,
            slot_count,
            seen_lemmas: ledger.len(),
            failed_lemma_ids: ledger.failed_lemma_ids(),
            wrap_up_answered: wrap_up.map_or(0, |w| w.answered),
            wrap_up_got_it: wrap_up.map_or(0, |w| w.got_it),
        }
    }

    /// Share of graded cards answered got-it, in percent.
    pub fn accuracy(&self) -> f64 {
        let graded = self.results.got_it + self.results.missed + self.results.no_idea;
        if graded == 0 {
            return 100.0;
        }
        self.results.got_it as f64 / graded as f64 * 100.0
    }
}
