use std::time::{Duration, Instant};

use crate::session::model::ReviewMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardPhase {
    Front,
    Back,
    Audio,
    Arabic,
    Answer,
}

impl CardPhase {
    pub fn initial(mode: ReviewMode) -> Self {
        match mode {
            ReviewMode::Listening => CardPhase::Audio,
            _ => CardPhase::Front,
        }
    }

    /// Next phase on reveal; `None` once the card is fully revealed.
    pub fn next(self) -> Option<Self> {
        match self {
            CardPhase::Front => Some(CardPhase::Back),
            CardPhase::Audio => Some(CardPhase::Arabic),
            CardPhase::Arabic => Some(CardPhase::Answer),
            CardPhase::Back | CardPhase::Answer => None,
        }
    }

    pub fn is_revealed(self) -> bool {
        self.next().is_none()
    }
}

/// Presentation state of the card under the slot pointer.
#[derive(Clone, Debug)]
pub struct CardState {
    pub mode: ReviewMode,
    pub phase: CardPhase,
    pub started_at: Instant,
    pub audio_play_count: u32,
    pub lookup_count: u32,
}

impl CardState {
    pub fn new(mode: ReviewMode, now: Instant) -> Self {
        Self {
            mode,
            phase: CardPhase::initial(mode),
            started_at: now,
            audio_play_count: 0,
            lookup_count: 0,
        }
    }

    /// Re-enter the initial phase for a new slot and restart the timer.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(self.mode, now);
    }

    pub fn reveal(&mut self) -> bool {
        match self.phase.next() {
            Some(next) => {
                self.phase = next;
                true
            }
            None => false,
        }
    }

    pub fn enters_audio(&self) -> bool {
        self.phase == CardPhase::Audio
    }

    pub fn response_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}
