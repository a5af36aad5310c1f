use crate::session::model::WrapUpCard;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizPhase {
    Prompt,
    Revealed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WrapUpState {
    Loading,
    Active {
        cards: Vec<WrapUpCard>,
        index: usize,
        phase: QuizPhase,
    },
    Done,
}

/// Short quiz appended after the main pass.
#[derive(Clone, Debug)]
pub struct WrapUp {
    pub state: WrapUpState,
    pub answered: usize,
    pub got_it: usize,
}

impl WrapUp {
    pub fn new() -> Self {
        Self {
            state: WrapUpState::Loading,
            answered: 0,
            got_it: 0,
        }
    }

    /// Failed lemmas go first; otherwise the server's order is kept.
    pub fn on_loaded(&mut self, mut cards: Vec<WrapUpCard>) {
        if self.state != WrapUpState::Loading {
            return;
        }
        if cards.is_empty() {
            self.state = WrapUpState::Done;
            return;
        }
        cards.sort_by_key(|c| !c.is_failed);
        self.state = WrapUpState::Active {
            cards,
            index: 0,
            phase: QuizPhase::Prompt,
        };
    }

    pub fn is_loading(&self) -> bool {
        self.state == WrapUpState::Loading
    }

    pub fn is_done(&self) -> bool {
        self.state == WrapUpState::Done
    }

    pub fn current(&self) -> Option<(&WrapUpCard, QuizPhase)> {
        match &self.state {
            WrapUpState::Active {
                cards,
                index,
                phase,
            } => cards.get(*index).map(|c| (c, *phase)),
            _ => None,
        }
    }

    pub fn remaining(&self) -> usize {
        match &self.state {
            WrapUpState::Active { cards, index, .. } => cards.len() - index,
            _ => 0,
        }
    }

    pub fn reveal(&mut self) -> bool {
        match &mut self.state {
            WrapUpState::Active { phase, .. } if *phase == QuizPhase::Prompt => {
                *phase = QuizPhase::Revealed;
                true
            }
            _ => false,
        }
    }

    /// Grade the revealed card and move on. Returns the answered card.
    pub fn answer(&mut self, got_it: bool) -> Option<WrapUpCard> {
        let WrapUpState::Active {
            cards,
            index,
            phase,
        } = &mut self.state
        else {
            return None;
        };
        if *phase != QuizPhase::Revealed {
            return None;
        }

        let card = cards.get(*index).cloned()?;
        self.answered += 1;
        if got_it {
            self.got_it += 1;
        }

        *index += 1;
        *phase = QuizPhase::Prompt;
        if *index >= cards.len() {
            self.state = WrapUpState::Done;
        }
        Some(card)
    }
}

impl Default for WrapUp {
    fn default() -> Self {
        Self::new()
    }
}
