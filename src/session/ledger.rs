use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::marks::MarkSet;
use crate::session::model::{
    ComprehensionSignal, KnowledgeState, LemmaId, ReviewItem, ReviewMode,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResults {
    pub total: usize,
    pub got_it: usize,
    pub missed: usize,
    pub no_idea: usize,
}

impl SessionResults {
    pub fn record(&mut self, signal: ComprehensionSignal) {
        self.total += 1;
        match signal {
            ComprehensionSignal::Understood | ComprehensionSignal::GrammarConfused => {
                self.got_it += 1
            }
            ComprehensionSignal::Partial => self.missed += 1,
            ComprehensionSignal::NoIdea => self.no_idea += 1,
        }
    }

    /// Exact inverse of `record` for the same signal.
    pub fn revert(&mut self, signal: ComprehensionSignal) {
        self.total = self.total.saturating_sub(1);
        match signal {
            ComprehensionSignal::Understood | ComprehensionSignal::GrammarConfused => {
                self.got_it = self.got_it.saturating_sub(1)
            }
            ComprehensionSignal::Partial => self.missed = self.missed.saturating_sub(1),
            ComprehensionSignal::NoIdea => self.no_idea = self.no_idea.saturating_sub(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub arabic: String,
    pub english: String,
    pub failed: bool,
    pub prev_knowledge_state: KnowledgeState,
}

/// Per-lemma pass/fail record for the whole session. `failed` only ever
/// goes from false to true.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutcomeLedger {
    entries: BTreeMap<LemmaId, LedgerEntry>,
}

impl OutcomeLedger {
    pub fn get(&self, lemma_id: LemmaId) -> Option<&LedgerEntry> {
        self.entries.get(&lemma_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn seen_lemma_ids(&self) -> Vec<LemmaId> {
        self.entries.keys().copied().collect()
    }

    pub fn failed_lemma_ids(&self) -> Vec<LemmaId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.failed)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn record(&mut self, item: &ReviewItem, signal: ComprehensionSignal, outcome: &ReviewOutcome) {
        for word in item.ledger_words() {
            let Some(lemma_id) = word.lemma_id else {
                continue;
            };
            let failed = match signal {
                ComprehensionSignal::NoIdea => true,
                ComprehensionSignal::Partial => outcome.touches(lemma_id),
                _ => false,
            };
            self.entries
                .entry(lemma_id)
                .and_modify(|e| e.failed |= failed)
                .or_insert_with(|| LedgerEntry {
                    arabic: word.surface_form.clone(),
                    english: word.gloss_en.clone().unwrap_or_default(),
                    failed,
                    prev_knowledge_state: word.knowledge_state,
                });
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub missed_lemma_ids: Vec<LemmaId>,
    pub confused_lemma_ids: Vec<LemmaId>,
}

impl ReviewOutcome {
    fn touches(&self, lemma_id: LemmaId) -> bool {
        self.missed_lemma_ids.contains(&lemma_id) || self.confused_lemma_ids.contains(&lemma_id)
    }
}

/// Turn the slot's marks and the user's signal into lemma id lists.
pub fn derive_outcome(item: &ReviewItem, marks: &MarkSet, signal: ComprehensionSignal) -> ReviewOutcome {
    let mut missed = lemma_ids_for(item, marks.missed.iter().copied());
    let confused = lemma_ids_for(item, marks.confused.iter().copied());

    // Word-only cards have no tap surface; "partial" there means missed.
    if item.is_word_only()
        && signal == ComprehensionSignal::Partial
        && marks.is_empty()
        && !missed.contains(&item.primary_lemma_id)
    {
        missed.push(item.primary_lemma_id);
    }

    if signal == ComprehensionSignal::NoIdea && !missed.contains(&item.primary_lemma_id) {
        missed.push(item.primary_lemma_id);
    }

    ReviewOutcome {
        missed_lemma_ids: missed,
        confused_lemma_ids: confused,
    }
}

fn lemma_ids_for(item: &ReviewItem, indices: impl Iterator<Item = usize>) -> Vec<LemmaId> {
    let mut ids = Vec::new();
    for index in indices {
        if let Some(lemma_id) = item.words.get(index).and_then(|w| w.lemma_id)
            && !ids.contains(&lemma_id)
        {
            ids.push(lemma_id);
        }
    }
    ids
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub sentence_id: Option<i64>,
    pub primary_lemma_id: LemmaId,
    pub comprehension_signal: ComprehensionSignal,
    pub missed_lemma_ids: Vec<LemmaId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confused_lemma_ids: Vec<LemmaId>,
    pub response_ms: u64,
    pub session_id: Option<String>,
    pub review_mode: ReviewMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_play_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_count: Option<u32>,
}
