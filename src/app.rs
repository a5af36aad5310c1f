use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{Request, Response};
use crate::config::Config;
use crate::session::card::{CardPhase, CardState};
use crate::session::ledger::{OutcomeLedger, ReviewPayload, SessionResults, derive_outcome};
use crate::session::lookup::{LookupEntry, LookupState};
use crate::session::marks::{MarkSet, MarkState};
use crate::session::model::{
    ComprehensionSignal, IntroCandidate, LemmaId, ReintroCard, ReviewItem, ReviewMode, Session,
};
use crate::session::refresh::RefreshMonitor;
use crate::session::slots::{Slot, build_slots};
use crate::session::summary::SessionSummary;
use crate::session::undo::{CardSnapshot, UndoLog, UndoPayload};
use crate::session::wrap_up::WrapUp;

pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Empty { offline: bool },
    Reviewing,
    WrapUp,
    Finished,
}

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub stale_after: Duration,
    pub known_sibling_threshold: usize,
    pub intro_interleaving: bool,
    pub auto_wrap_up: bool,
    pub wrap_up_min_submissions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            stale_after: config.stale_after(),
            known_sibling_threshold: config.known_sibling_threshold,
            intro_interleaving: config.intro_interleaving,
            auto_wrap_up: config.auto_wrap_up,
            wrap_up_min_submissions: config.wrap_up_min_submissions,
        }
    }
}

/// The review session orchestrator.
///
/// All state lives here and is only mutated by the methods below, on the
/// event loop thread. Network work is queued as `Request`s and comes back
/// through `handle_response`.
pub struct ReviewSession {
    mode: ReviewMode,
    settings: SessionSettings,
    clock: Box<dyn Clock>,
    phase: SessionPhase,
    generation: u64,
    session: Option<Session>,
    slots: Vec<Slot>,
    pointer: usize,
    marks: MarkSet,
    gloss_only: BTreeSet<usize>,
    card: CardState,
    lookup: LookupState,
    ledger: OutcomeLedger,
    results: SessionResults,
    undo_log: UndoLog,
    refresh: RefreshMonitor,
    wrap_up: Option<WrapUp>,
    pending_reintro: Vec<ReintroCard>,
    reintro_started_at: Instant,
    last_activity: Instant,
    outbox: Vec<Request>,
    summary: Option<SessionSummary>,
}

impl ReviewSession {
    pub fn new(mode: ReviewMode, settings: SessionSettings, clock: Box<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            mode,
            card: CardState::new(mode, now),
            lookup: LookupState::new(settings.known_sibling_threshold),
            refresh: RefreshMonitor::new(settings.stale_after),
            settings,
            clock,
            phase: SessionPhase::Idle,
            generation: 0,
            session: None,
            slots: Vec::new(),
            pointer: 0,
            marks: MarkSet::default(),
            gloss_only: BTreeSet::new(),
            ledger: OutcomeLedger::default(),
            results: SessionResults::default(),
            undo_log: UndoLog::default(),
            wrap_up: None,
            pending_reintro: Vec::new(),
            reintro_started_at: now,
            last_activity: now,
            outbox: Vec::new(),
            summary: None,
        }
    }

    pub fn with_config(mode: ReviewMode, config: &Config) -> Self {
        Self::new(mode, SessionSettings::from(config), Box::new(SystemClock))
    }

    // --- presentation surface ---

    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_index(&self) -> usize {
        self.pointer
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_some() && self.pointer >= self.slots.len()
    }

    /// What the summary screen checks to decide the session is done.
    pub fn summary_done(&self) -> bool {
        self.session.is_some() && self.results.total >= self.slots.len()
    }

    pub fn current_slot(&self) -> Option<Slot> {
        if self.phase != SessionPhase::Reviewing {
            return None;
        }
        self.slots.get(self.pointer).copied()
    }

    pub fn current_item(&self) -> Option<&ReviewItem> {
        match self.current_slot()? {
            Slot::Sentence { item_index } => self.session.as_ref()?.items.get(item_index),
            Slot::Intro { .. } => None,
        }
    }

    pub fn current_intro(&self) -> Option<&IntroCandidate> {
        match self.current_slot()? {
            Slot::Intro { candidate_index } => {
                self.session.as_ref()?.intro_candidates.get(candidate_index)
            }
            Slot::Sentence { .. } => None,
        }
    }

    pub fn card_phase(&self) -> CardPhase {
        self.card.phase
    }

    pub fn card(&self) -> &CardState {
        &self.card
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn mark_state(&self, word_index: usize) -> MarkState {
        self.marks.state(word_index)
    }

    pub fn gloss_only(&self) -> &BTreeSet<usize> {
        &self.gloss_only
    }

    pub fn current_lookup(&self) -> Option<&LookupEntry> {
        self.lookup.current()
    }

    pub fn lookup(&self) -> &LookupState {
        &self.lookup
    }

    pub fn lookup_loading(&self) -> bool {
        self.lookup.is_loading()
    }

    pub fn results(&self) -> SessionResults {
        self.results
    }

    pub fn ledger(&self) -> &OutcomeLedger {
        &self.ledger
    }

    pub fn wrap_up(&self) -> Option<&WrapUp> {
        self.wrap_up.as_ref()
    }

    pub fn pending_reintro(&self) -> &[ReintroCard] {
        &self.pending_reintro
    }

    pub fn grammar_features(&self) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.grammar_features.as_slice())
            .unwrap_or(&[])
    }

    pub fn pending_refresh(&self) -> bool {
        self.refresh.has_pending()
    }

    pub fn live_snapshots(&self) -> usize {
        self.undo_log.live_count()
    }

    pub fn can_undo(&self) -> bool {
        self.phase == SessionPhase::Reviewing
            && self.undo_log.target(self.pointer, &self.slots).is_some()
    }

    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_summary(&mut self) -> Option<SessionSummary> {
        self.summary.take()
    }

    // --- loading ---

    pub fn load(&mut self) {
        self.start_load(false);
    }

    pub fn reload_fresh(&mut self) {
        self.start_load(true);
    }

    fn start_load(&mut self, fresh: bool) {
        self.generation += 1;
        self.refresh.cancel();
        self.lookup.reset();
        self.wrap_up = None;
        self.summary = None;
        self.phase = SessionPhase::Loading;
        self.outbox.push(Request::StopAudio);
        self.outbox.push(Request::FetchSession {
            generation: self.generation,
            mode: self.mode,
            fresh,
        });
    }

    pub fn handle_response(&mut self, response: Response) {
        match response {
            Response::SessionLoaded { generation, result } => {
                if generation != self.generation || self.phase != SessionPhase::Loading {
                    debug!("dropping session load for generation {generation}");
                    return;
                }
                match result {
                    Ok(session) if !session.is_empty() => self.apply_session(session, false),
                    Ok(_) => {
                        info!("no {} reviews due", self.mode.as_str());
                        self.clear_session();
                        self.phase = SessionPhase::Empty { offline: false };
                    }
                    Err(err) => {
                        warn!("session load failed: {err}");
                        self.clear_session();
                        self.phase = SessionPhase::Empty { offline: true };
                    }
                }
            }
            Response::RefreshLoaded { generation, result } => {
                self.refresh
                    .on_loaded(generation, result.map_err(|e| e.to_string()));
            }
            Response::LookupResolved {
                token,
                word_index,
                result,
            } => {
                let Some(word) = self
                    .current_item()
                    .and_then(|item| item.words.get(word_index))
                    .cloned()
                else {
                    debug!("dropping lookup for word {word_index}: not on current card");
                    return;
                };
                let mark = self.marks.state(word_index);
                self.lookup
                    .resolve(token, word_index, result.map_err(|e| e.to_string()), &word, mark);
            }
            Response::WrapUpLoaded { generation, result } => {
                if generation != self.generation || self.phase != SessionPhase::WrapUp {
                    debug!("dropping wrap-up deck for generation {generation}");
                    return;
                }
                let cards = result.unwrap_or_else(|err| {
                    warn!("wrap-up fetch failed: {err}");
                    Vec::new()
                });
                let now = self.clock.now();
                if let Some(ref mut wrap_up) = self.wrap_up {
                    wrap_up.on_loaded(cards);
                }
                self.card.reset(now);
                if self.wrap_up.as_ref().is_none_or(|w| w.is_done()) {
                    self.finish();
                }
            }
            Response::Acknowledged { action, result } => {
                if let Err(err) = result {
                    warn!("{action} failed: {err}");
                }
            }
        }
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.slots.clear();
        self.pointer = 0;
        self.marks.clear();
        self.gloss_only.clear();
        self.undo_log = UndoLog::default();
        self.pending_reintro.clear();
    }

    /// Install a session. A background swap keeps results and ledger.
    fn apply_session(&mut self, session: Session, keep_progress: bool) {
        let interleave = self.settings.intro_interleaving && self.mode == ReviewMode::Reading;
        self.slots = build_slots(session.items.len(), &session.intro_candidates, interleave);
        self.pointer = 0;
        self.undo_log = UndoLog::new(self.slots.len());
        self.pending_reintro = session.reintro_cards.clone();
        if !keep_progress {
            self.results = SessionResults::default();
            self.ledger = OutcomeLedger::default();
        }
        info!(
            "session {} ready: {} items, {} slots",
            session.session_id.as_deref().unwrap_or("-"),
            session.items.len(),
            self.slots.len()
        );
        self.session = Some(session);
        self.wrap_up = None;
        self.summary = None;
        self.phase = SessionPhase::Reviewing;
        self.last_activity = self.clock.now();
        self.reintro_started_at = self.last_activity;
        self.enter_slot();
    }

    /// Bring the card under the pointer to its initial state.
    fn enter_slot(&mut self) {
        let now = self.clock.now();
        self.card.reset(now);
        self.marks.clear();
        self.gloss_only.clear();
        self.lookup.reset();
        if self.mode == ReviewMode::Listening && self.current_item().is_some() {
            self.play_current_audio();
        }
    }

    fn play_current_audio(&mut self) {
        let url = self.current_item().and_then(|item| item.audio_url.clone());
        if url.is_none() {
            debug!("card has no audio, showing muted placeholder");
        }
        self.card.audio_play_count += 1;
        self.outbox.push(Request::StopAudio);
        self.outbox.push(Request::PlayAudio { url });
    }

    // --- card actions ---

    pub fn reveal(&mut self) -> bool {
        if self.current_item().is_none() {
            return false;
        }
        self.card.reveal()
    }

    pub fn replay_audio(&mut self) -> bool {
        if self.mode != ReviewMode::Listening || self.current_item().is_none() {
            return false;
        }
        self.play_current_audio();
        true
    }

    pub fn tap_word(&mut self, word_index: usize) -> bool {
        if self.card.enters_audio() {
            return false;
        }
        let Some(word) = self
            .current_item()
            .and_then(|item| item.words.get(word_index))
            .cloned()
        else {
            return false;
        };

        let Some(lemma_id) = word.lemma_id.filter(|_| word.is_markable()) else {
            if !self.gloss_only.remove(&word_index) {
                self.gloss_only.insert(word_index);
            }
            return true;
        };

        let mark = self.marks.cycle(word_index);
        if mark == MarkState::Unmarked {
            self.lookup.set_mark_state(word_index, mark);
            self.lookup.clear();
            return true;
        }

        if let Some(token) = self.lookup.request(word_index, lemma_id, mark) {
            self.card.lookup_count += 1;
            self.outbox.push(Request::Lookup {
                token,
                word_index,
                lemma_id,
            });
        }
        true
    }

    pub fn clear_lookup(&mut self) {
        self.lookup.clear();
    }

    pub fn lookup_prev(&mut self) -> bool {
        self.lookup.prev()
    }

    pub fn lookup_next(&mut self) -> bool {
        self.lookup.next()
    }

    pub fn reveal_meaning(&mut self) -> bool {
        self.lookup.reveal_meaning()
    }

    pub fn suspend_looked_up_word(&mut self) -> bool {
        let Some(lemma_id) = self.lookup.current().map(|e| e.lemma_id) else {
            return false;
        };
        self.outbox.push(Request::Suspend { lemma_id });
        true
    }

    // --- submission ---

    pub fn submit(&mut self, signal: ComprehensionSignal) -> bool {
        let Some(item) = self.current_item().cloned() else {
            return false;
        };
        let now = self.clock.now();

        let outcome = derive_outcome(&item, &self.marks, signal);
        let snapshot = CardSnapshot {
            marks: self.marks.clone(),
            signal,
            sentence_id: item.sentence_id,
            primary_lemma_id: item.primary_lemma_id,
            ledger_before: self.ledger.clone(),
        };

        self.ledger.record(&item, signal, &outcome);
        self.results.record(signal);

        let client_id = Uuid::new_v4().to_string();
        self.undo_log.record(self.pointer, snapshot, client_id.clone());

        let payload = ReviewPayload {
            sentence_id: item.sentence_id,
            primary_lemma_id: item.primary_lemma_id,
            comprehension_signal: signal,
            missed_lemma_ids: outcome.missed_lemma_ids,
            confused_lemma_ids: outcome.confused_lemma_ids,
            response_ms: self.card.response_time(now).as_millis() as u64,
            session_id: self.session_id(),
            review_mode: self.mode,
            audio_play_count: (self.mode == ReviewMode::Listening)
                .then_some(self.card.audio_play_count),
            lookup_count: Some(self.card.lookup_count),
        };
        self.outbox.push(Request::Submit { client_id, payload });

        self.last_activity = now;
        self.advance();
        true
    }

    pub fn learn_intro(&mut self) -> bool {
        let Some(lemma_id) = self.current_intro().map(|c| c.lemma_id) else {
            return false;
        };
        self.outbox.push(Request::Introduce { lemma_id });
        self.advance();
        true
    }

    pub fn skip_intro(&mut self) -> bool {
        if self.current_intro().is_none() {
            return false;
        }
        self.advance();
        true
    }

    fn advance(&mut self) {
        if let Some(next) = self.refresh.take_pending() {
            info!("swapping in refreshed session at slot {}", self.pointer);
            self.generation += 1;
            self.apply_session(next, true);
            return;
        }

        self.pointer += 1;
        if self.pointer >= self.slots.len() {
            self.pointer = self.slots.len();
            self.end_main_pass();
        } else {
            self.enter_slot();
        }
    }

    fn end_main_pass(&mut self) {
        self.marks.clear();
        self.gloss_only.clear();
        self.lookup.reset();
        self.outbox.push(Request::StopAudio);
        if self.settings.auto_wrap_up && !self.ledger.is_empty() {
            self.begin_wrap_up();
        } else {
            self.finish();
        }
    }

    // --- undo ---

    pub fn undo(&mut self) -> bool {
        if self.phase != SessionPhase::Reviewing {
            return false;
        }
        let Some(target) = self.undo_log.target(self.pointer, &self.slots) else {
            return false;
        };
        let Some(entry) = self.undo_log.take(target) else {
            return false;
        };
        let snapshot = entry.snapshot;

        self.outbox.push(Request::Undo {
            payload: UndoPayload {
                client_review_id: entry.client_id,
                session_id: self.session_id(),
                sentence_id: snapshot.sentence_id,
                primary_lemma_id: snapshot.primary_lemma_id,
                review_mode: self.mode,
            },
        });

        self.ledger = snapshot.ledger_before;
        self.results.revert(snapshot.signal);
        self.pointer = target;
        self.enter_slot();
        self.marks = snapshot.marks;
        debug!("undid {} at slot {target}", snapshot.signal.as_str());
        true
    }

    // --- reintro ---

    pub fn resolve_reintro(&mut self, lemma_id: LemmaId, remembered: bool) -> bool {
        let Some(pos) = self.pending_reintro.iter().position(|c| c.lemma_id == lemma_id) else {
            return false;
        };
        self.pending_reintro.remove(pos);
        let signal = if remembered {
            ComprehensionSignal::Understood
        } else {
            ComprehensionSignal::NoIdea
        };
        // Reintro cards sit beside the sentence card; its timer and counts stay untouched.
        let now = self.clock.now();
        let response_ms = now.saturating_duration_since(self.reintro_started_at).as_millis() as u64;
        self.reintro_started_at = now;
        self.send_single_lemma_review(lemma_id, signal, ReviewMode::Reintro, response_ms);
        true
    }

    fn send_single_lemma_review(
        &mut self,
        lemma_id: LemmaId,
        signal: ComprehensionSignal,
        mode: ReviewMode,
        response_ms: u64,
    ) {
        let missed = if signal == ComprehensionSignal::NoIdea {
            vec![lemma_id]
        } else {
            Vec::new()
        };
        let payload = ReviewPayload {
            sentence_id: None,
            primary_lemma_id: lemma_id,
            comprehension_signal: signal,
            missed_lemma_ids: missed,
            confused_lemma_ids: Vec::new(),
            response_ms,
            session_id: self.session_id(),
            review_mode: mode,
            audio_play_count: None,
            lookup_count: None,
        };
        self.outbox.push(Request::Submit {
            client_id: Uuid::new_v4().to_string(),
            payload,
        });
    }

    // --- wrap-up ---

    pub fn start_wrap_up(&mut self) -> bool {
        if self.phase != SessionPhase::Reviewing
            || self.results.total < self.settings.wrap_up_min_submissions
        {
            return false;
        }
        self.outbox.push(Request::StopAudio);
        self.begin_wrap_up();
        true
    }

    fn begin_wrap_up(&mut self) {
        self.marks.clear();
        self.gloss_only.clear();
        self.lookup.reset();
        self.refresh.cancel();
        self.wrap_up = Some(WrapUp::new());
        self.phase = SessionPhase::WrapUp;
        let failed = self.ledger.failed_lemma_ids();
        info!(
            "starting wrap-up over {} lemmas ({} failed)",
            self.ledger.len(),
            failed.len()
        );
        self.outbox.push(Request::FetchWrapUp {
            generation: self.generation,
            seen: self.ledger.seen_lemma_ids(),
            failed,
            session_id: self.session_id(),
        });
    }

    pub fn reveal_quiz(&mut self) -> bool {
        match self.wrap_up {
            Some(ref mut wrap_up) if self.phase == SessionPhase::WrapUp => wrap_up.reveal(),
            _ => false,
        }
    }

    pub fn answer_quiz(&mut self, got_it: bool) -> bool {
        if self.phase != SessionPhase::WrapUp {
            return false;
        }
        let Some(card) = self.wrap_up.as_mut().and_then(|w| w.answer(got_it)) else {
            return false;
        };
        let signal = if got_it {
            ComprehensionSignal::Understood
        } else {
            ComprehensionSignal::NoIdea
        };
        let now = self.clock.now();
        let response_ms = self.card.response_time(now).as_millis() as u64;
        self.send_single_lemma_review(card.lemma_id, signal, ReviewMode::Quiz, response_ms);
        self.card.reset(now);
        if self.wrap_up.as_ref().is_some_and(|w| w.is_done()) {
            self.finish();
        }
        true
    }

    /// Intro slots and early wrap-ups never submit, so the total is lifted to
    /// the slot count for the done check.
    fn finish(&mut self) {
        self.results.total = self.results.total.max(self.slots.len());
        self.phase = SessionPhase::Finished;
        self.summary = Some(SessionSummary::build(
            self.session_id(),
            self.mode,
            self.results,
            self.slots.len(),
            &self.ledger,
            self.wrap_up.as_ref(),
        ));
        info!(
            "session finished: {} total, {} got it, {} missed, {} no idea",
            self.results.total, self.results.got_it, self.results.missed, self.results.no_idea
        );
    }

    // --- background refresh ---

    /// Called when the app comes back to the foreground.
    pub fn on_foreground(&mut self) -> bool {
        let now = self.clock.now();
        let active = self.phase == SessionPhase::Reviewing && !self.is_complete();
        if !self.refresh.should_refresh(active, self.last_activity, now) {
            return false;
        }
        info!("session idle past threshold, refreshing in background");
        self.refresh.begin(self.generation);
        self.outbox.push(Request::FetchRefresh {
            generation: self.generation,
            mode: self.mode,
        });
        true
    }

    fn session_id(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.session_id.clone())
    }
}
