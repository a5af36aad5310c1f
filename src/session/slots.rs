use crate::session::model::IntroCandidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Sentence { item_index: usize },
    Intro { candidate_index: usize },
}

impl Slot {
    pub fn is_sentence(self) -> bool {
        matches!(self, Slot::Sentence { .. })
    }
}

/// Interleave intro candidates into the base item sequence.
///
/// Candidates are spliced from last to first so every `insert_at` stays
/// relative to the original item order.
pub fn build_slots(item_count: usize, candidates: &[IntroCandidate], interleave: bool) -> Vec<Slot> {
    let mut slots: Vec<Slot> = (0..item_count)
        .map(|item_index| Slot::Sentence { item_index })
        .collect();

    if !interleave {
        return slots;
    }

    for (candidate_index, candidate) in candidates.iter().enumerate().rev() {
        let at = candidate.insert_at.min(slots.len());
        slots.insert(at, Slot::Intro { candidate_index });
    }

    slots
}
