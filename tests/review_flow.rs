use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use alif::app::{Clock, ReviewSession, SessionPhase, SessionSettings};
use alif::backend::{BackendError, Request, Response};
use alif::session::card::CardPhase;
use alif::session::ledger::{ReviewPayload, SessionResults};
use alif::session::marks::MarkState;
use alif::session::model::{
    ComprehensionSignal, IntroCandidate, LemmaId, LookupResult, ReintroCard, ReviewItem,
    ReviewMode, SentenceWord, Session, WrapUpCard,
};

#[derive(Clone)]
struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

fn word(lemma_id: LemmaId, surface: &str) -> SentenceWord {
    SentenceWord {
        lemma_id: Some(lemma_id),
        surface_form: surface.to_string(),
        gloss_en: Some(format!("{surface}-en")),
        ..SentenceWord::default()
    }
}

fn sentence(sentence_id: i64, lemmas: &[LemmaId]) -> ReviewItem {
    ReviewItem {
        sentence_id: Some(sentence_id),
        primary_lemma_id: lemmas[0],
        primary_arabic: format!("s{sentence_id}"),
        primary_gloss: format!("sentence {sentence_id}"),
        words: lemmas.iter().map(|&l| word(l, &format!("w{l}"))).collect(),
        audio_url: Some(format!("https://audio/{sentence_id}.mp3")),
    }
}

fn session(id: &str, items: Vec<ReviewItem>) -> Session {
    Session {
        session_id: Some(id.to_string()),
        items,
        ..Session::default()
    }
}

fn two_sentences() -> Session {
    session("s1", vec![sentence(1, &[10, 11]), sentence(2, &[20, 21])])
}

fn settings(auto_wrap_up: bool) -> SessionSettings {
    SessionSettings {
        auto_wrap_up,
        ..SessionSettings::default()
    }
}

fn fetch_generation(requests: &[Request]) -> u64 {
    requests
        .iter()
        .find_map(|r| match r {
            Request::FetchSession { generation, .. } => Some(*generation),
            _ => None,
        })
        .expect("no session fetch queued")
}

fn start(mode: ReviewMode, settings: SessionSettings, s: Session) -> (ManualClock, ReviewSession) {
    let clock = ManualClock::new();
    let mut review = ReviewSession::new(mode, settings, Box::new(clock.clone()));
    review.load();
    let generation = fetch_generation(&review.take_requests());
    review.handle_response(Response::SessionLoaded {
        generation,
        result: Ok(s),
    });
    (clock, review)
}

fn submitted(requests: &[Request]) -> Vec<(String, ReviewPayload)> {
    requests
        .iter()
        .filter_map(|r| match r {
            Request::Submit { client_id, payload } => Some((client_id.clone(), payload.clone())),
            _ => None,
        })
        .collect()
}

fn lookup_result(lemma_id: LemmaId) -> LookupResult {
    LookupResult {
        lemma_id,
        lemma_ar: format!("lemma{lemma_id}"),
        gloss_en: Some(format!("gloss{lemma_id}")),
        ..LookupResult::default()
    }
}

#[test]
fn test_two_sentence_session_end_to_end() {
    let (_, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    assert_eq!(review.phase(), SessionPhase::Reviewing);
    assert_eq!(review.slot_count(), 2);

    assert!(review.submit(ComprehensionSignal::Understood));
    assert_eq!(review.slot_index(), 1);

    assert!(review.tap_word(1));
    assert_eq!(review.mark_state(1), MarkState::Missed);
    assert!(review.submit(ComprehensionSignal::Partial));

    assert_eq!(
        review.results(),
        SessionResults {
            total: 2,
            got_it: 1,
            missed: 1,
            no_idea: 0,
        }
    );
    assert!(review.is_complete());
    assert!(review.summary_done());
    assert_eq!(review.phase(), SessionPhase::Finished);

    assert!(review.ledger().get(21).unwrap().failed);
    assert!(!review.ledger().get(20).unwrap().failed);
    assert!(!review.ledger().get(10).unwrap().failed);
    assert_eq!(review.ledger().failed_lemma_ids(), vec![21]);

    let requests = review.take_requests();
    let submits = submitted(&requests);
    assert_eq!(submits.len(), 2);
    assert_eq!(submits[1].1.missed_lemma_ids, vec![21]);
    assert_ne!(submits[0].0, submits[1].0);

    let summary = review.take_summary().unwrap();
    assert_eq!(summary.results.total, 2);
    assert_eq!(summary.seen_lemmas, 4);
    assert!(review.take_summary().is_none());
}

#[test]
fn test_lookup_race_last_tap_wins() {
    let (_, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    review.take_requests();

    review.tap_word(0);
    review.tap_word(1);
    let lookups: Vec<(u64, usize)> = review
        .take_requests()
        .into_iter()
        .filter_map(|r| match r {
            Request::Lookup {
                token, word_index, ..
            } => Some((token, word_index)),
            _ => None,
        })
        .collect();
    assert_eq!(lookups.len(), 2);
    let (token_x, _) = lookups[0];
    let (token_y, _) = lookups[1];

    review.handle_response(Response::LookupResolved {
        token: token_y,
        word_index: 1,
        result: Ok(lookup_result(11)),
    });
    review.handle_response(Response::LookupResolved {
        token: token_x,
        word_index: 0,
        result: Ok(lookup_result(10)),
    });

    let shown = review.current_lookup().unwrap();
    assert_eq!(shown.lemma_id, 11);
    assert_eq!(shown.result.gloss_en.as_deref(), Some("gloss11"));
    assert!(!review.lookup_loading());
}

#[test]
fn test_lookup_arriving_after_advance_is_dropped() {
    let (_, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    review.take_requests();
    review.tap_word(0);
    let token = match review.take_requests().pop() {
        Some(Request::Lookup { token, .. }) => token,
        other => panic!("expected lookup, got {other:?}"),
    };
    review.submit(ComprehensionSignal::Partial);
    review.handle_response(Response::LookupResolved {
        token,
        word_index: 0,
        result: Ok(lookup_result(10)),
    });
    assert!(review.current_lookup().is_none());
}

#[test]
fn test_submit_then_undo_restores_state() {
    let (_, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    review.take_requests();

    review.tap_word(0);
    review.submit(ComprehensionSignal::Partial);
    assert!(review.ledger().get(10).unwrap().failed);
    assert!(review.can_undo());

    let submits = submitted(&review.take_requests());
    let client_id = submits[0].0.clone();

    assert!(review.undo());
    assert_eq!(review.results(), SessionResults::default());
    assert!(review.ledger().is_empty());
    assert_eq!(review.slot_index(), 0);
    assert_eq!(review.mark_state(0), MarkState::Missed);
    assert_eq!(review.card_phase(), CardPhase::Front);
    assert!(review.current_lookup().is_none());
    assert!(!review.can_undo());
    assert_eq!(review.live_snapshots(), 0);

    let undo = review
        .take_requests()
        .into_iter()
        .find_map(|r| match r {
            Request::Undo { payload } => Some(payload),
            _ => None,
        })
        .unwrap();
    assert_eq!(undo.client_review_id, client_id);
    assert_eq!(undo.sentence_id, Some(1));
    assert_eq!(undo.session_id.as_deref(), Some("s1"));
}

#[test]
fn test_undo_keeps_earlier_failed_flag() {
    let s = session(
        "s1",
        vec![
            sentence(1, &[10, 11]),
            sentence(2, &[10, 20]),
            sentence(3, &[30]),
        ],
    );
    let (_, mut review) = start(ReviewMode::Reading, settings(false), s);
    review.submit(ComprehensionSignal::NoIdea);
    review.submit(ComprehensionSignal::Understood);
    assert!(review.ledger().get(10).unwrap().failed);
    assert!(review.undo());
    assert!(review.ledger().get(10).unwrap().failed);
    assert!(review.ledger().get(20).is_none());
}

#[test]
fn test_undo_unavailable_at_first_slot() {
    let (_, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    assert!(!review.can_undo());
    assert!(!review.undo());
    assert_eq!(review.slot_index(), 0);
}

#[test]
fn test_undo_unavailable_when_only_intro_precedes() {
    let mut s = two_sentences();
    s.intro_candidates = vec![IntroCandidate {
        lemma_id: 99,
        lemma_ar: "جديد".to_string(),
        gloss_en: "new".to_string(),
        insert_at: 0,
        ..IntroCandidate::default()
    }];
    let (_, mut review) = start(ReviewMode::Reading, settings(false), s);
    assert_eq!(review.slot_count(), 3);
    assert_eq!(review.current_intro().unwrap().lemma_id, 99);

    assert!(review.learn_intro());
    assert_eq!(review.slot_index(), 1);
    assert!(review.take_requests().contains(&Request::Introduce { lemma_id: 99 }));
    assert!(!review.can_undo());
    assert!(!review.undo());
    assert_eq!(review.results().total, 0);
}

#[test]
fn test_undo_skips_intro_slot() {
    let mut s = two_sentences();
    s.intro_candidates = vec![IntroCandidate {
        lemma_id: 99,
        insert_at: 1,
        ..IntroCandidate::default()
    }];
    let (_, mut review) = start(ReviewMode::Reading, settings(false), s);
    review.submit(ComprehensionSignal::Understood);
    assert!(review.current_intro().is_some());
    assert!(review.skip_intro());
    assert_eq!(review.slot_index(), 2);
    assert!(review.undo());
    assert_eq!(review.slot_index(), 0);
}

#[test]
fn test_listening_mode_skips_intro_interleaving() {
    let mut s = two_sentences();
    s.intro_candidates = vec![IntroCandidate {
        lemma_id: 99,
        insert_at: 1,
        ..IntroCandidate::default()
    }];
    let (_, review) = start(ReviewMode::Listening, settings(false), s);
    assert_eq!(review.slot_count(), 2);
}

#[test]
fn test_word_only_partial_marks_primary_missed() {
    let item = ReviewItem {
        sentence_id: None,
        primary_lemma_id: 7,
        primary_arabic: "قلم".to_string(),
        primary_gloss: "pen".to_string(),
        ..ReviewItem::default()
    };
    let (_, mut review) = start(ReviewMode::Reading, settings(false), session("w", vec![item]));
    review.take_requests();
    review.submit(ComprehensionSignal::Partial);

    let submits = submitted(&review.take_requests());
    assert_eq!(submits[0].1.missed_lemma_ids, vec![7]);
    assert_eq!(submits[0].1.sentence_id, None);
    let entry = review.ledger().get(7).unwrap();
    assert!(entry.failed);
    assert_eq!(entry.arabic, "قلم");
}

#[test]
fn test_no_idea_adds_primary_even_with_confused_marks() {
    let (_, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    review.take_requests();
    review.tap_word(1);
    review.tap_word(1);
    assert_eq!(review.mark_state(1), MarkState::Confused);
    review.submit(ComprehensionSignal::NoIdea);

    let submits = submitted(&review.take_requests());
    let payload = &submits[0].1;
    assert_eq!(payload.missed_lemma_ids, vec![10]);
    assert_eq!(payload.confused_lemma_ids, vec![11]);
    assert_eq!(review.results().no_idea, 1);
    assert!(review.ledger().get(10).unwrap().failed);
}

#[test]
fn test_background_refresh_swaps_on_last_slot() {
    let (clock, mut review) = start(ReviewMode::Reading, settings(true), two_sentences());
    review.submit(ComprehensionSignal::Understood);
    review.take_requests();

    clock.advance(Duration::from_secs(10 * 60));
    assert!(!review.on_foreground());
    clock.advance(Duration::from_secs(6 * 60));
    assert!(review.on_foreground());
    // Only one refresh in flight.
    assert!(!review.on_foreground());

    let generation = review
        .take_requests()
        .into_iter()
        .find_map(|r| match r {
            Request::FetchRefresh { generation, .. } => Some(generation),
            _ => None,
        })
        .unwrap();
    let fresh = session(
        "s2",
        vec![sentence(3, &[30]), sentence(4, &[40]), sentence(5, &[50])],
    );
    review.handle_response(Response::RefreshLoaded {
        generation,
        result: Ok(fresh),
    });
    assert!(review.pending_refresh());
    // Not applied until the next advance.
    assert_eq!(review.slot_index(), 1);
    assert_eq!(review.current_item().unwrap().sentence_id, Some(2));

    review.submit(ComprehensionSignal::Understood);
    assert_eq!(review.phase(), SessionPhase::Reviewing);
    assert!(!review.pending_refresh());
    assert_eq!(review.slot_index(), 0);
    assert_eq!(review.slot_count(), 3);
    assert_eq!(review.current_item().unwrap().sentence_id, Some(3));
    assert_eq!(review.results().total, 2);
    assert_eq!(review.ledger().len(), 4);
    assert!(!review.can_undo());
}

#[test]
fn test_refresh_not_started_when_recently_active() {
    let (clock, mut review) = start(ReviewMode::Reading, settings(false), two_sentences());
    clock.advance(Duration::from_secs(14 * 60));
    review.submit(ComprehensionSignal::Understood);
    clock.advance(Duration::from_secs(14 * 60));
    assert!(!review.on_foreground());
}

#[test]
fn test_auto_wrap_up_quiz_flow() {
    let (_, mut review) = start(ReviewMode::Reading, settings(true), two_sentences());
    review.submit(ComprehensionSignal::Understood);
    review.tap_word(0);
    review.submit(ComprehensionSignal::Partial);
    assert_eq!(review.phase(), SessionPhase::WrapUp);
    assert!(!review.undo());

    let (generation, seen, failed) = review
        .take_requests()
        .into_iter()
        .find_map(|r| match r {
            Request::FetchWrapUp {
                generation,
                seen,
                failed,
                ..
            } => Some((generation, seen, failed)),
            _ => None,
        })
        .unwrap();
    assert_eq!(seen, vec![10, 11, 20, 21]);
    assert_eq!(failed, vec![20]);

    let card = |lemma_id, is_failed| WrapUpCard {
        lemma_id,
        lemma_ar: format!("l{lemma_id}"),
        gloss_en: format!("g{lemma_id}"),
        is_failed,
    };
    review.handle_response(Response::WrapUpLoaded {
        generation,
        result: Ok(vec![card(10, false), card(20, true)]),
    });

    let wrap_up = review.wrap_up().unwrap();
    assert_eq!(wrap_up.current().unwrap().0.lemma_id, 20);
    assert!(!review.answer_quiz(true));

    assert!(review.reveal_quiz());
    assert!(review.answer_quiz(false));
    assert!(review.reveal_quiz());
    assert!(review.answer_quiz(true));
    assert_eq!(review.phase(), SessionPhase::Finished);

    let submits = submitted(&review.take_requests());
    assert_eq!(submits.len(), 2);
    assert_eq!(submits[0].1.review_mode, ReviewMode::Quiz);
    assert_eq!(submits[0].1.primary_lemma_id, 20);
    assert_eq!(submits[0].1.comprehension_signal, ComprehensionSignal::NoIdea);
    assert_eq!(submits[0].1.missed_lemma_ids, vec![20]);
    assert_eq!(submits[1].1.comprehension_signal, ComprehensionSignal::Understood);

    let summary = review.take_summary().unwrap();
    assert_eq!(summary.wrap_up_answered, 2);
    assert_eq!(summary.wrap_up_got_it, 1);
}

#[test]
fn test_early_wrap_up_marks_session_done() {
    let s = session(
        "s1",
        vec![sentence(1, &[10]), sentence(2, &[20]), sentence(3, &[30])],
    );
    let (_, mut review) = start(ReviewMode::Reading, settings(false), s);
    review.submit(ComprehensionSignal::Understood);
    assert!(!review.start_wrap_up());
    review.submit(ComprehensionSignal::Understood);
    assert!(!review.summary_done());
    assert!(review.start_wrap_up());

    let generation = review
        .take_requests()
        .into_iter()
        .find_map(|r| match r {
            Request::FetchWrapUp { generation, .. } => Some(generation),
            _ => None,
        })
        .unwrap();
    review.handle_response(Response::WrapUpLoaded {
        generation,
        result: Err(BackendError::Status(500)),
    });

    assert_eq!(review.phase(), SessionPhase::Finished);
    assert_eq!(review.results().total, 3);
    assert_eq!(review.results().got_it, 2);
    assert!(review.summary_done());
}

#[test]
fn test_stale_session_load_is_ignored() {
    let clock = ManualClock::new();
    let mut review = ReviewSession::new(ReviewMode::Reading, settings(false), Box::new(clock));
    review.load();
    let first = fetch_generation(&review.take_requests());
    review.reload_fresh();
    let requests = review.take_requests();
    let second = fetch_generation(&requests);
    assert!(requests.iter().any(|r| matches!(r, Request::FetchSession { fresh: true, .. })));

    review.handle_response(Response::SessionLoaded {
        generation: first,
        result: Ok(session("old", vec![sentence(9, &[90])])),
    });
    assert_eq!(review.phase(), SessionPhase::Loading);

    review.handle_response(Response::SessionLoaded {
        generation: second,
        result: Ok(two_sentences()),
    });
    assert_eq!(review.phase(), SessionPhase::Reviewing);
    assert_eq!(review.session().unwrap().session_id.as_deref(), Some("s1"));
}

#[test]
fn test_failed_load_shows_offline_empty_state() {
    let clock = ManualClock::new();
    let mut review = ReviewSession::new(ReviewMode::Reading, settings(false), Box::new(clock));
    review.load();
    let generation = fetch_generation(&review.take_requests());
    review.handle_response(Response::SessionLoaded {
        generation,
        result: Err(BackendError::Status(502)),
    });
    assert_eq!(review.phase(), SessionPhase::Empty { offline: true });
    assert!(review.current_item().is_none());

    review.load();
    let generation = fetch_generation(&review.take_requests());
    review.handle_response(Response::SessionLoaded {
        generation,
        result: Ok(Session::default()),
    });
    assert_eq!(review.phase(), SessionPhase::Empty { offline: false });
}

#[test]
fn test_listening_mode_plays_audio_on_each_slot() {
    let (_, mut review) = start(ReviewMode::Listening, settings(false), two_sentences());
    let requests = review.take_requests();
    assert_eq!(
        requests,
        vec![
            Request::StopAudio,
            Request::PlayAudio {
                url: Some("https://audio/1.mp3".to_string())
            },
        ]
    );
    assert_eq!(review.card_phase(), CardPhase::Audio);
    assert!(!review.tap_word(0));

    assert!(review.replay_audio());
    assert!(review.reveal());
    assert!(review.reveal());
    assert_eq!(review.card_phase(), CardPhase::Answer);
    assert!(!review.reveal());
    review.take_requests();

    review.submit(ComprehensionSignal::Understood);
    let requests = review.take_requests();
    let submits = submitted(&requests);
    assert_eq!(submits[0].1.audio_play_count, Some(2));
    assert_eq!(submits[0].1.review_mode, ReviewMode::Listening);
    assert!(requests.contains(&Request::PlayAudio {
        url: Some("https://audio/2.mp3".to_string())
    }));
    assert_eq!(review.card_phase(), CardPhase::Audio);
}

#[test]
fn test_reintro_cards_submit_in_reintro_mode() {
    let mut s = two_sentences();
    s.reintro_cards = vec![ReintroCard {
        lemma_id: 55,
        lemma_ar: "باب".to_string(),
        gloss_en: "door".to_string(),
        times_seen: 4,
    }];
    let (_, mut review) = start(ReviewMode::Reading, settings(false), s);
    review.take_requests();
    assert_eq!(review.pending_reintro().len(), 1);
    assert!(!review.resolve_reintro(56, true));
    assert!(review.resolve_reintro(55, false));
    assert!(review.pending_reintro().is_empty());

    let submits = submitted(&review.take_requests());
    assert_eq!(submits[0].1.review_mode, ReviewMode::Reintro);
    assert_eq!(submits[0].1.missed_lemma_ids, vec![55]);
    assert_eq!(review.results().total, 0);
}

#[test]
fn test_reintro_leaves_live_sentence_card_alone() {
    let mut s = two_sentences();
    s.reintro_cards = vec![ReintroCard {
        lemma_id: 99,
        lemma_ar: "نافذة".to_string(),
        gloss_en: "window".to_string(),
        times_seen: 2,
    }];
    let (clock, mut review) = start(ReviewMode::Listening, settings(false), s);
    assert!(review.replay_audio());
    assert!(review.reveal());
    assert!(review.tap_word(0));
    assert!(review.reveal());
    assert_eq!(review.card_phase(), CardPhase::Answer);
    review.take_requests();

    clock.advance(Duration::from_secs(7));
    assert!(review.resolve_reintro(99, true));
    let requests = review.take_requests();
    assert!(!requests.iter().any(Request::is_audio));
    let submits = submitted(&requests);
    assert_eq!(submits.len(), 1);
    assert_eq!(submits[0].1.review_mode, ReviewMode::Reintro);
    assert_eq!(submits[0].1.response_ms, 7000);

    assert_eq!(review.card_phase(), CardPhase::Answer);
    assert_eq!(review.card().audio_play_count, 2);
    assert_eq!(review.card().lookup_count, 1);

    clock.advance(Duration::from_millis(500));
    review.submit(ComprehensionSignal::Understood);
    let submits = submitted(&review.take_requests());
    let payload = &submits[0].1;
    assert_eq!(payload.review_mode, ReviewMode::Listening);
    assert_eq!(payload.response_ms, 7500);
    assert_eq!(payload.audio_play_count, Some(2));
    assert_eq!(payload.lookup_count, Some(1));
}

#[test]
fn test_intro_session_without_wrap_up_reads_done() {
    let mut s = session("s1", vec![sentence(1, &[10])]);
    s.intro_candidates = vec![IntroCandidate {
        lemma_id: 99,
        insert_at: 0,
        ..IntroCandidate::default()
    }];
    let (_, mut review) = start(ReviewMode::Reading, settings(false), s);
    assert_eq!(review.slot_count(), 2);

    assert!(review.learn_intro());
    assert!(review.submit(ComprehensionSignal::Understood));

    assert_eq!(review.phase(), SessionPhase::Finished);
    assert!(review.is_complete());
    assert!(review.summary_done());
    assert_eq!(review.results().got_it, 1);

    let summary = review.take_summary().unwrap();
    assert_eq!(summary.slot_count, 2);
    assert_eq!(summary.results.total, 2);
}
