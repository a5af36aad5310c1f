use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarkState {
    #[default]
    Unmarked,
    Missed,
    Confused,
}

impl MarkState {
    pub fn next(self) -> Self {
        match self {
            MarkState::Unmarked => MarkState::Missed,
            MarkState::Missed => MarkState::Confused,
            MarkState::Confused => MarkState::Unmarked,
        }
    }
}

/// Word marks for the current slot. `missed` and `confused` never overlap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkSet {
    pub missed: BTreeSet<usize>,
    pub confused: BTreeSet<usize>,
}

impl MarkSet {
    pub fn state(&self, word_index: usize) -> MarkState {
        if self.missed.contains(&word_index) {
            MarkState::Missed
        } else if self.confused.contains(&word_index) {
            MarkState::Confused
        } else {
            MarkState::Unmarked
        }
    }

    /// Advance the word one step through unmarked -> missed -> confused.
    pub fn cycle(&mut self, word_index: usize) -> MarkState {
        let next = self.state(word_index).next();
        self.missed.remove(&word_index);
        self.confused.remove(&word_index);
        match next {
            MarkState::Missed => {
                self.missed.insert(word_index);
            }
            MarkState::Confused => {
                self.confused.insert(word_index);
            }
            MarkState::Unmarked => {}
        }
        next
    }

    pub fn is_empty(&self) -> bool {
        self.missed.is_empty() && self.confused.is_empty()
    }

    pub fn clear(&mut self) {
        self.missed.clear();
        self.confused.clear();
    }
}
