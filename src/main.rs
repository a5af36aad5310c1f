use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use alif::app::{ReviewSession, SessionPhase};
use alif::backend::cache::CachingBackend;
use alif::backend::worker::Worker;
use alif::backend::{Request, ReviewBackend};
use alif::config::Config;
use alif::event::{AppEvent, EventHandler};
use alif::session::card::CardPhase;
use alif::session::marks::MarkState;
use alif::session::model::{ComprehensionSignal, ReviewMode};
use alif::session::wrap_up::QuizPhase;
use alif::store::json_store::JsonStore;

#[derive(Parser)]
#[command(name = "alif", version, about = "Arabic sentence review sessions")]
struct Cli {
    #[arg(short, long, help = "Review mode (reading, listening)")]
    mode: Option<String>,

    #[arg(short, long, help = "Base URL of the review server")]
    api: Option<String>,

    #[arg(short, long, help = "Path to config.toml")]
    config: Option<PathBuf>,

    #[arg(long, help = "Write the effective config to the default location and exit")]
    write_config: bool,
}

enum Command {
    Tap(usize),
    Reveal,
    Meaning,
    Prev,
    Next,
    Clear,
    Submit(ComprehensionSignal),
    Undo,
    Learn,
    Skip,
    Suspend,
    Reintro(i64, bool),
    WrapUp,
    QuizReveal,
    QuizAnswer(bool),
    Replay,
    Reload,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let arg = parts.next();
    let command = match cmd {
        "tap" | "t" => Command::Tap(arg?.parse().ok()?),
        "reveal" | "r" => Command::Reveal,
        "meaning" => Command::Meaning,
        "prev" => Command::Prev,
        "next" => Command::Next,
        "clear" => Command::Clear,
        "submit" | "s" => Command::Submit(ComprehensionSignal::from_name(arg?)?),
        "undo" | "u" => Command::Undo,
        "learn" => Command::Learn,
        "skip" => Command::Skip,
        "suspend" => Command::Suspend,
        "reintro" => {
            let lemma_id = arg?.parse().ok()?;
            let remembered = match parts.next()? {
                "yes" | "y" => true,
                "no" | "n" => false,
                _ => return None,
            };
            Command::Reintro(lemma_id, remembered)
        }
        "wrapup" => Command::WrapUp,
        "quiz-reveal" | "qr" => Command::QuizReveal,
        "got" => Command::QuizAnswer(true),
        "missed" => Command::QuizAnswer(false),
        "replay" => Command::Replay,
        "reload" => Command::Reload,
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(api) = cli.api {
        config.api_base_url = api;
    }
    if cli.write_config {
        config.save()?;
        println!("wrote {}", Config::config_path().display());
        return Ok(());
    }

    let mode = match cli.mode.as_deref() {
        Some(name) => ReviewMode::from_name(name)
            .filter(|m| m.is_session_mode())
            .ok_or_else(|| anyhow::anyhow!("unknown review mode: {name}"))?,
        None => config.review_mode(),
    };

    let store = match JsonStore::new() {
        Ok(store) => Some(store),
        Err(err) => {
            warn!("local storage unavailable: {err}");
            None
        }
    };

    let backend = build_backend(&config, store.clone())?;
    let events = EventHandler::new();
    let worker = Worker::new(backend, events.sender());

    let mut review = ReviewSession::with_config(mode, &config);
    info!("starting {} session against {}", mode.as_str(), config.api_base_url);
    review.load();
    flush(&mut review, &worker, store.as_ref(), &config);
    print_help();

    loop {
        match events.next()? {
            AppEvent::Input(line) => {
                // A typed command is the terminal's stand-in for the app
                // returning to the foreground; the idle check runs first.
                review.on_foreground();
                match parse_command(line.trim()) {
                    Some(Command::Quit) => break,
                    Some(command) => apply(&mut review, command),
                    None if line.trim().is_empty() => {}
                    None => println!("unrecognised command, type `help`"),
                }
            }
            AppEvent::Response(response) => review.handle_response(response),
            AppEvent::InputClosed => break,
        }
        flush(&mut review, &worker, store.as_ref(), &config);
        render(&review);
    }

    Ok(())
}

#[cfg(feature = "network")]
fn build_backend(config: &Config, store: Option<JsonStore>) -> Result<Arc<dyn ReviewBackend>> {
    let http = alif::backend::http::HttpBackend::new(&config.api_base_url, config.request_timeout())?;
    let store = store.filter(|_| config.session_cache_enabled);
    Ok(Arc::new(CachingBackend::new(http, store)))
}

#[cfg(not(feature = "network"))]
fn build_backend(config: &Config, store: Option<JsonStore>) -> Result<Arc<dyn ReviewBackend>> {
    let store = store.filter(|_| config.session_cache_enabled);
    Ok(Arc::new(CachingBackend::new(alif::backend::OfflineBackend, store)))
}

fn apply(review: &mut ReviewSession, command: Command) {
    let accepted = match command {
        Command::Tap(index) => review.tap_word(index),
        Command::Reveal => review.reveal(),
        Command::Meaning => review.reveal_meaning(),
        Command::Prev => review.lookup_prev(),
        Command::Next => review.lookup_next(),
        Command::Clear => {
            review.clear_lookup();
            true
        }
        Command::Submit(signal) => review.submit(signal),
        Command::Undo => review.undo(),
        Command::Learn => review.learn_intro(),
        Command::Skip => review.skip_intro(),
        Command::Suspend => review.suspend_looked_up_word(),
        Command::Reintro(lemma_id, remembered) => review.resolve_reintro(lemma_id, remembered),
        Command::WrapUp => review.start_wrap_up(),
        Command::QuizReveal => review.reveal_quiz(),
        Command::QuizAnswer(got_it) => review.answer_quiz(got_it),
        Command::Replay => review.replay_audio(),
        Command::Reload => {
            review.reload_fresh();
            true
        }
        Command::Help => {
            print_help();
            true
        }
        Command::Quit => true,
    };
    if !accepted {
        println!("(nothing to do)");
    }
}

/// Drain queued requests to the worker and persist a finished session.
fn flush<B: ReviewBackend + ?Sized + 'static>(
    review: &mut ReviewSession,
    worker: &Worker<B>,
    store: Option<&JsonStore>,
    config: &Config,
) {
    for request in review.take_requests() {
        match request {
            Request::PlayAudio { ref url } => match url {
                Some(url) => println!("[audio] playing {url}"),
                None => println!("[audio] no recording for this card"),
            },
            Request::StopAudio => {}
            request => worker.dispatch(request),
        }
    }

    if let Some(summary) = review.take_summary()
        && let Some(store) = store
        && let Err(err) = store.append_summary(summary, config.history_limit)
    {
        warn!("could not save session history: {err}");
    }
}

fn render(review: &ReviewSession) {
    match review.phase() {
        SessionPhase::Idle => {}
        SessionPhase::Loading => println!("loading..."),
        SessionPhase::Empty { offline: true } => {
            println!("could not reach the review server; `reload` to retry")
        }
        SessionPhase::Empty { offline: false } => println!("nothing due right now"),
        SessionPhase::Reviewing => render_card(review),
        SessionPhase::WrapUp => render_wrap_up(review),
        SessionPhase::Finished => {
            let r = review.results();
            println!(
                "done: {} cards, {} got it, {} missed, {} no idea",
                r.total, r.got_it, r.missed, r.no_idea
            );
            for lemma_id in review.ledger().failed_lemma_ids() {
                if let Some(entry) = review.ledger().get(lemma_id) {
                    println!("  to revisit: {} ({})", entry.arabic, entry.english);
                }
            }
        }
    }
}

fn render_card(review: &ReviewSession) {
    println!(
        "-- {}/{} ({}) --",
        review.slot_index() + 1,
        review.slot_count(),
        review.mode().as_str()
    );

    for card in review.pending_reintro() {
        println!("reintro {}: {} ({})", card.lemma_id, card.lemma_ar, card.gloss_en);
    }

    if let Some(intro) = review.current_intro() {
        println!("new word: {}  {}", intro.lemma_ar, intro.gloss_en);
        println!("`learn` or `skip`");
        return;
    }

    let Some(item) = review.current_item() else {
        return;
    };

    if review.card_phase() == CardPhase::Audio {
        println!("(listening) `reveal` to see the sentence, `replay` to hear it again");
        return;
    }

    for (index, word) in item.words.iter().enumerate() {
        let mark = match review.mark_state(index) {
            MarkState::Unmarked => "",
            MarkState::Missed => " [missed]",
            MarkState::Confused => " [confused]",
        };
        let gloss = if review.gloss_only().contains(&index) {
            format!(" = {}", word.gloss_en.as_deref().unwrap_or("?"))
        } else {
            String::new()
        };
        println!("  {index}: {}{mark}{gloss}", word.surface_form);
    }
    if item.words.is_empty() {
        println!("  {}", item.primary_arabic);
    }

    if review.card_phase().is_revealed() {
        println!("meaning: {}", item.primary_gloss);
    }

    if review.lookup_loading() {
        println!("looking up...");
    } else if let Some(entry) = review.current_lookup() {
        let meaning = if entry.show_meaning {
            entry.result.gloss_en.as_deref().unwrap_or("?")
        } else {
            "(guess from the root, `meaning` to reveal)"
        };
        println!(
            "lookup {}: {} {}",
            entry.surface_form, entry.result.lemma_ar, meaning
        );
        if let Some(ref root) = entry.result.root {
            println!("  root {root}, {} known siblings", entry.result.known_sibling_count());
        }
    }
    if review.can_undo() {
        println!("(`undo` available)");
    }
}

fn render_wrap_up(review: &ReviewSession) {
    let Some(wrap_up) = review.wrap_up() else {
        return;
    };
    if wrap_up.is_loading() {
        println!("preparing wrap-up quiz...");
        return;
    }
    if let Some((card, phase)) = wrap_up.current() {
        println!("quiz ({} left): {}", wrap_up.remaining(), card.lemma_ar);
        match phase {
            QuizPhase::Prompt => println!("`qr` to reveal"),
            QuizPhase::Revealed => println!("{}  -> `got` or `missed`", card.gloss_en),
        }
    }
}

fn print_help() {
    println!(
        "commands: tap N, reveal, meaning, prev, next, clear, submit <understood|partial|no_idea|grammar_confused>,\n\
         undo, learn, skip, suspend, reintro ID yes|no, wrapup, qr, got, missed, replay, reload, quit"
    );
}
