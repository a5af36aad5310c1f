use std::collections::HashMap;

use log::debug;

use crate::session::marks::MarkState;
use crate::session::model::{LemmaId, LookupResult, SentenceWord};

#[derive(Clone, Debug, PartialEq)]
pub struct LookupEntry {
    pub surface_form: String,
    pub lemma_id: LemmaId,
    pub result: LookupResult,
    pub mark_state: MarkState,
    pub show_meaning: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingLookup {
    pub token: u64,
    pub word_index: usize,
    pub lemma_id: LemmaId,
}

/// Lookup cache and tapped history for the current slot.
///
/// Every lookup, clear and reset bumps `token`; a resolution is applied only
/// when it carries the current token, so the last tap always wins no matter
/// how responses are reordered.
#[derive(Clone, Debug)]
pub struct LookupState {
    token: u64,
    pending: Option<PendingLookup>,
    cache: HashMap<usize, LookupEntry>,
    history: Vec<usize>,
    cursor: Option<usize>,
    known_sibling_threshold: usize,
}

impl LookupState {
    pub fn new(known_sibling_threshold: usize) -> Self {
        Self {
            token: 0,
            pending: None,
            cache: HashMap::new(),
            history: Vec::new(),
            cursor: None,
            known_sibling_threshold,
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn pending(&self) -> Option<PendingLookup> {
        self.pending
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn cached(&self, word_index: usize) -> Option<&LookupEntry> {
        self.cache.get(&word_index)
    }

    /// The entry under the history cursor, if any.
    pub fn current(&self) -> Option<&LookupEntry> {
        let word_index = self.history.get(self.cursor?)?;
        self.cache.get(word_index)
    }

    /// Start a lookup for a tapped word. Returns the token to send with a
    /// network request, or `None` when the cached entry was shown instead or
    /// the same word is already being fetched.
    pub fn request(&mut self, word_index: usize, lemma_id: LemmaId, mark: MarkState) -> Option<u64> {
        if self.pending.is_some_and(|p| p.word_index == word_index) {
            return None;
        }

        self.token += 1;
        self.pending = None;

        if let Some(entry) = self.cache.get_mut(&word_index) {
            entry.mark_state = mark;
            self.focus(word_index);
            return None;
        }

        self.pending = Some(PendingLookup {
            token: self.token,
            word_index,
            lemma_id,
        });
        Some(self.token)
    }

    /// Apply a resolved lookup. Stale tokens are discarded and `false` is
    /// returned. Failures degrade to a result built from `word`.
    pub fn resolve(
        &mut self,
        token: u64,
        word_index: usize,
        outcome: Result<LookupResult, String>,
        word: &SentenceWord,
        mark: MarkState,
    ) -> bool {
        if token != self.token {
            debug!("discarding stale lookup for word {word_index} (token {token}, current {})", self.token);
            return false;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                debug!("lookup for word {word_index} failed, using fallback: {err}");
                fallback_result(word)
            }
        };

        let show_meaning = self.show_meaning_for(&result);
        let entry = LookupEntry {
            surface_form: word.surface_form.clone(),
            lemma_id: word.lemma_id.unwrap_or(result.lemma_id),
            result,
            mark_state: mark,
            show_meaning,
        };
        self.cache.insert(word_index, entry);
        self.pending = None;
        self.focus(word_index);
        true
    }

    /// Hide the displayed entry and invalidate in-flight lookups. Cache and
    /// history stay available for prev/next.
    pub fn clear(&mut self) {
        self.token += 1;
        self.pending = None;
        self.cursor = None;
    }

    /// Drop everything; used on slot advance, undo and session reload.
    pub fn reset(&mut self) {
        self.token += 1;
        self.pending = None;
        self.cache.clear();
        self.history.clear();
        self.cursor = None;
    }

    pub fn prev(&mut self) -> bool {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                true
            }
            None if !self.history.is_empty() => {
                self.cursor = Some(self.history.len() - 1);
                true
            }
            _ => false,
        }
    }

    pub fn next(&mut self) -> bool {
        match self.cursor {
            Some(c) if c + 1 < self.history.len() => {
                self.cursor = Some(c + 1);
                true
            }
            None if !self.history.is_empty() => {
                self.cursor = Some(0);
                true
            }
            _ => false,
        }
    }

    pub fn reveal_meaning(&mut self) -> bool {
        let Some(word_index) = self.cursor.and_then(|c| self.history.get(c).copied()) else {
            return false;
        };
        match self.cache.get_mut(&word_index) {
            Some(entry) if !entry.show_meaning => {
                entry.show_meaning = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_mark_state(&mut self, word_index: usize, mark: MarkState) {
        if let Some(entry) = self.cache.get_mut(&word_index) {
            entry.mark_state = mark;
        }
    }

    fn focus(&mut self, word_index: usize) {
        match self.history.iter().position(|&w| w == word_index) {
            Some(pos) => self.cursor = Some(pos),
            None => {
                self.history.push(word_index);
                self.cursor = Some(self.history.len() - 1);
            }
        }
    }

    /// Knowing enough root siblings turns the gloss into a prediction prompt.
    fn show_meaning_for(&self, result: &LookupResult) -> bool {
        result.is_fallback || result.known_sibling_count() < self.known_sibling_threshold
    }
}

pub fn fallback_result(word: &SentenceWord) -> LookupResult {
    LookupResult {
        lemma_id: word.lemma_id.unwrap_or_default(),
        lemma_ar: word.surface_form.clone(),
        gloss_en: word.gloss_en.clone(),
        root: word.root.clone(),
        frequency_rank: word.frequency_rank,
        is_fallback: true,
        ..LookupResult::default()
    }
}
