use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::words::{WordRequest, WordSet};

static DECK_DIR: Dir = include_dir!("src/decks");

const FALLBACK_LANGUAGE: &str = "english";

/// Why a word could not be produced. Every variant is treated as transient
/// by the turn engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("invalid guess word")]
    InvalidGuess,
    #[error("expected 5 taboo words, got {0}")]
    TabooCount(usize),
    #[error("invalid response format: {0}")]
    Malformed(String),
    #[error("no unused words left: {0}")]
    Exhausted(String),
    #[error("{0} was already used this game")]
    Repeated(String),
    #[error("word service unavailable: {0}")]
    Unavailable(String),
    #[error("no answer within {0:?}")]
    TimedOut(Duration),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Io(err.to_string())
    }
}

/// Source of new words. Called off the engine thread, so it may block.
pub trait WordProvider: Send + Sync + 'static {
    fn request_word(&self, request: &WordRequest) -> Result<WordSet, ProviderError>;
}

#[derive(Deserialize, Clone, Debug)]
pub struct Card {
    pub guess: String,
    pub taboo: Vec<String>,
    pub category: String,
    pub difficulty: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Deck {
    pub language: String,
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Cards that suit the request, ignoring difficulty when nothing matches it
    fn candidates(&self, request: &WordRequest) -> Vec<&Card> {
        let in_category = |card: &&Card| {
            request.category == "general" || card.category.eq_ignore_ascii_case(&request.category)
        };
        let unused = |card: &&Card| !request.excludes(&card.guess);

        let exact = self
            .cards
            .iter()
            .filter(in_category)
            .filter(unused)
            .filter(|card| card.difficulty.eq_ignore_ascii_case(&request.difficulty))
            .collect::<Vec<&Card>>();

        if !exact.is_empty() {
            return exact;
        }

        self.cards
            .iter()
            .filter(in_category)
            .filter(unused)
            .collect()
    }
}

fn read_builtin_deck(language: &str) -> Option<Deck> {
    let file = DECK_DIR.get_file(format!("{language}.json"))?;
    let contents = file.contents_utf8()?;
    match Deck::from_json(contents) {
        Ok(deck) => Some(deck),
        Err(err) => {
            warn!(language, error = %err, "built-in deck is unreadable");
            None
        }
    }
}

/// Offline provider drawing cards from a JSON deck
#[derive(Debug, Clone, Default)]
pub struct DeckProvider {
    custom: Option<Deck>,
}

impl DeckProvider {
    /// Use the decks compiled into the binary, picked by request language
    pub fn builtin() -> Self {
        Self { custom: None }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProviderError> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::with_deck(Deck::from_json(&json)?))
    }

    pub fn with_deck(deck: Deck) -> Self {
        Self { custom: Some(deck) }
    }

    fn deck_for(&self, language: &str) -> Result<Deck, ProviderError> {
        if let Some(deck) = &self.custom {
            return Ok(deck.clone());
        }

        read_builtin_deck(&language.to_lowercase())
            .or_else(|| {
                debug!(language, "no built-in deck, falling back to {FALLBACK_LANGUAGE}");
                read_builtin_deck(FALLBACK_LANGUAGE)
            })
            .ok_or_else(|| ProviderError::Unavailable("no word deck available".into()))
    }
}

impl WordProvider for DeckProvider {
    fn request_word(&self, request: &WordRequest) -> Result<WordSet, ProviderError> {
        let deck = self.deck_for(&request.language)?;
        let candidates = deck.candidates(request);

        let card = candidates
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| {
                ProviderError::Exhausted(format!(
                    "{} deck, category {}",
                    deck.language, request.category
                ))
            })?;

        WordSet::new(&card.guess, &card.taboo)
    }
}

/// Provider that delegates to an external program.
///
/// The request is written to the program's stdin as JSON and its stdout is
/// read as a word payload (see [`WordSet::parse`]). A program still running
/// after `timeout` is killed.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

const COMMAND_TIMEOUT: Duration = Duration::from_secs(20);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Split a shell-like command line on whitespace. No quoting support.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl WordProvider for CommandProvider {
    fn request_word(&self, request: &WordRequest) -> Result<WordSet, ProviderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let body = serde_json::to_vec(request)?;
            stdin.write_all(&body)?;
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = self.wait(&mut child)?;

        // the pipes close once the child is gone
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(ProviderError::Unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        WordSet::parse(&String::from_utf8_lossy(&stdout))
    }
}

impl CommandProvider {
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ProviderError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(program = %self.program, timeout = ?self.timeout, "killing word command");
                child.kill()?;
                child.wait()?;
                return Err(ProviderError::TimedOut(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}
