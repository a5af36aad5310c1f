use serde::{Deserialize, Serialize};

use crate::session::ledger::OutcomeLedger;
use crate::session::marks::MarkSet;
use crate::session::model::{ComprehensionSignal, LemmaId, ReviewMode};
use crate::session::slots::Slot;

/// State captured right before a submission mutates anything.
#[derive(Clone, Debug, PartialEq)]
pub struct CardSnapshot {
    pub marks: MarkSet,
    pub signal: ComprehensionSignal,
    pub sentence_id: Option<i64>,
    pub primary_lemma_id: LemmaId,
    pub ledger_before: OutcomeLedger,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedCard {
    pub snapshot: CardSnapshot,
    pub client_id: String,
}

/// One optional snapshot per slot position.
#[derive(Clone, Debug, Default)]
pub struct UndoLog {
    entries: Vec<Option<SubmittedCard>>,
}

impl UndoLog {
    pub fn new(slot_count: usize) -> Self {
        Self {
            entries: vec![None; slot_count],
        }
    }

    pub fn record(&mut self, slot_index: usize, snapshot: CardSnapshot, client_id: String) {
        if let Some(entry) = self.entries.get_mut(slot_index) {
            *entry = Some(SubmittedCard {
                snapshot,
                client_id,
            });
        }
    }

    /// Slot that an undo would return to: the nearest sentence slot before
    /// `pointer`, skipping intro slots, provided it still has a snapshot.
    pub fn target(&self, pointer: usize, slots: &[Slot]) -> Option<usize> {
        let upper = pointer.min(slots.len());
        let index = (0..upper).rev().find(|&i| slots[i].is_sentence())?;
        self.entries.get(index)?.as_ref().map(|_| index)
    }

    pub fn take(&mut self, slot_index: usize) -> Option<SubmittedCard> {
        self.entries.get_mut(slot_index)?.take()
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UndoPayload {
    pub client_review_id: String,
    pub session_id: Option<String>,
    pub sentence_id: Option<i64>,
    pub primary_lemma_id: LemmaId,
    pub review_mode: ReviewMode,
}
