use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::provider::ProviderError;
use crate::session::{Session, Skips, DEFAULT_SECONDS_PER_TURN, DEFAULT_TOTAL_ROUNDS};
use crate::store::{SessionObserver, SessionStore, SessionUpdate};
use crate::words::{WordHistory, WordRequest, WordSet};

/// Name given to players who left their name blank
pub const ANONYMOUS: &str = "Anonymous";

/// Where the engine sends its timed and asynchronous work.
///
/// Implementations report back by feeding [`EngineEvent`]s into
/// [`TurnEngine::on_event`] on the engine's own thread.
pub trait Scheduler {
    /// Begin emitting `TimerTick { generation }` once per second
    fn start_timer(&mut self, generation: u64);
    fn stop_timer(&mut self);
    /// Fetch one word; answer with exactly one `WordFetched { ticket, .. }`.
    /// A fetch that never completes must be answered with
    /// [`ProviderError::TimedOut`].
    fn request_word(&mut self, ticket: u64, request: WordRequest);
    /// Answer with `RetryDue { ticket }` once `delay` has passed
    fn schedule_retry(&mut self, ticket: u64, delay: Duration);
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TimerTick {
        generation: u64,
    },
    WordFetched {
        ticket: u64,
        result: Result<WordSet, ProviderError>,
    },
    RetryDue {
        ticket: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Ready,
    AwaitingWord,
    Active,
    Paused,
    WordUnavailable,
    RoundEnded,
    GameEnded,
}

impl Phase {
    pub fn of(session: &Session) -> Phase {
        if session.finished {
            Phase::GameEnded
        } else if !session.game_active {
            Phase::Idle
        } else if session.current_round == 0 {
            Phase::Ready
        } else if session.round_ended {
            Phase::RoundEnded
        } else if session.is_paused {
            Phase::Paused
        } else if session.is_generating_word {
            Phase::AwaitingWord
        } else if session.word_error.is_some() {
            Phase::WordUnavailable
        } else {
            Phase::Active
        }
    }
}

/// A command refused at the action boundary. The session is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("at least one player is needed")]
    NoPlayers,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("settings and players can only change before a game starts")]
    NotIdle,
    #[error("no game in progress")]
    NotPlaying,
    #[error("a word is still being generated")]
    WordPending,
    #[error("there is no word on screen")]
    NoWord,
    #[error("a word is already on screen")]
    WordShown,
    #[error("the game is paused")]
    Paused,
    #[error("the round is over")]
    RoundOver,
    #[error("the round is still being played")]
    RoundInProgress,
    #[error("no skips left")]
    NoSkipsLeft,
    #[error("the game has not finished yet")]
    NotFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Warning,
    Error,
}

impl FeedbackKind {
    /// How long a message of this kind stays on screen
    pub fn ttl(&self) -> Duration {
        match self {
            FeedbackKind::Error => Duration::from_secs(3),
            FeedbackKind::Success | FeedbackKind::Warning => Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

/// Backoff for failed word fetches.
///
/// The n-th consecutive failure waits `base_delay * 2^(n-1)`, capped at
/// `max_delay`. With `max_attempts: None` the engine retries forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            max_attempts: Some(5),
        }
    }
}

impl RetryPolicy {
    /// Fixed delay, no ceiling
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            max_delay: delay,
            max_attempts: None,
        }
    }

    pub fn delay_after(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay)
    }

    pub fn gives_up_after(&self, failures: u32) -> bool {
        matches!(self.max_attempts, Some(max) if failures >= max)
    }
}

/// Settings chosen before the first round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub total_rounds: u32,
    pub seconds_per_turn: u32,
    pub skips_per_turn: Skips,
    pub category: String,
    pub difficulty: String,
    pub language: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            seconds_per_turn: DEFAULT_SECONDS_PER_TURN,
            skips_per_turn: Skips::default(),
            category: "general".to_string(),
            difficulty: "medium".to_string(),
            language: "english".to_string(),
        }
    }
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.total_rounds == 0 {
            return Err(CommandError::InvalidSettings(
                "at least one round is needed".into(),
            ));
        }
        if self.seconds_per_turn == 0 {
            return Err(CommandError::InvalidSettings(
                "turns must last at least one second".into(),
            ));
        }
        for (name, value) in [
            ("category", &self.category),
            ("difficulty", &self.difficulty),
            ("language", &self.language),
        ] {
            if value.trim().is_empty() {
                return Err(CommandError::InvalidSettings(format!("{name} is empty")));
            }
        }
        Ok(())
    }

    /// A fresh, idle session carrying these settings
    pub fn to_session(&self) -> Session {
        Session {
            total_rounds: self.total_rounds,
            total_time: self.seconds_per_turn,
            time_left: self.seconds_per_turn,
            skips_per_round: self.skips_per_turn,
            current_skips: self.skips_per_turn,
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            language: self.language.clone(),
            ..Default::default()
        }
    }
}

/// Drives turns, rounds and the timer, and owns the session store.
///
/// All mutation goes through the commands below or [`TurnEngine::on_event`],
/// which the caller invokes from a single thread. Timer ticks carry a
/// generation and word responses carry a ticket; anything that does not match
/// the current one is dropped. Every fetch attempt, retries included, gets a
/// ticket of its own.
pub struct TurnEngine<S: Scheduler> {
    store: SessionStore,
    scheduler: S,
    retry: RetryPolicy,
    settings: GameSettings,
    timer_generation: u64,
    timer_running: bool,
    fetch_ticket: u64,
    failures: u32,
    feedback: Vec<Feedback>,
}

impl<S: Scheduler> TurnEngine<S> {
    pub fn new(scheduler: S, retry: RetryPolicy) -> Self {
        let settings = GameSettings::default();
        Self {
            store: SessionStore::new(settings.to_session()),
            scheduler,
            retry,
            settings,
            timer_generation: 0,
            timer_running: false,
            fetch_ticket: 0,
            failures: 0,
            feedback: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        self.store.session()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn phase(&self) -> Phase {
        Phase::of(self.store.session())
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn timer_generation(&self) -> u64 {
        self.timer_generation
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn fetch_ticket(&self) -> u64 {
        self.fetch_ticket
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.store.subscribe(observer);
    }

    pub fn drain_feedback(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.feedback)
    }

    pub fn apply_settings(&mut self, settings: GameSettings) -> Result<(), CommandError> {
        if self.phase() != Phase::Idle {
            return Err(CommandError::NotIdle);
        }
        settings.validate()?;

        self.store.apply(SessionUpdate {
            total_rounds: Some(settings.total_rounds),
            total_time: Some(settings.seconds_per_turn),
            time_left: Some(settings.seconds_per_turn),
            skips_per_round: Some(settings.skips_per_turn),
            current_skips: Some(settings.skips_per_turn),
            category: Some(settings.category.clone()),
            difficulty: Some(settings.difficulty.clone()),
            language: Some(settings.language.clone()),
            ..Default::default()
        });
        info!(
            rounds = settings.total_rounds,
            seconds = settings.seconds_per_turn,
            skips = %settings.skips_per_turn,
            category = %settings.category,
            difficulty = %settings.difficulty,
            language = %settings.language,
            "settings applied"
        );
        self.settings = settings;
        Ok(())
    }

    pub fn start_game<I, N>(&mut self, players: I) -> Result<(), CommandError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        if self.phase() != Phase::Idle {
            return Err(CommandError::NotIdle);
        }

        let players = players
            .into_iter()
            .map(|name| match name.as_ref().trim() {
                "" => ANONYMOUS.to_string(),
                trimmed => trimmed.to_string(),
            })
            .collect::<Vec<String>>();
        if players.is_empty() {
            return Err(CommandError::NoPlayers);
        }

        info!(players = ?players, "game started");
        self.store.apply(SessionUpdate {
            scores: Some(vec![0; players.len()]),
            players: Some(players),
            game_active: Some(true),
            finished: Some(false),
            current_round: Some(0),
            current_player_index: Some(None),
            current_turn: Some(0),
            words_used: Some(WordHistory::default()),
            current_word: Some(None),
            taboo_words: Some(Vec::new()),
            round_ended: Some(false),
            is_paused: Some(false),
            word_error: Some(None),
            ..Default::default()
        });
        Ok(())
    }

    /// "Next round": starts the first round from `Ready`, the following one
    /// from `RoundEnded`, or ends the game after the last round.
    pub fn advance_round(&mut self) -> Result<(), CommandError> {
        match self.phase() {
            Phase::Idle | Phase::GameEnded => return Err(CommandError::NotPlaying),
            Phase::Ready | Phase::RoundEnded => {}
            _ => return Err(CommandError::RoundInProgress),
        }

        let next_round = self.store.session().current_round + 1;
        if next_round > self.store.session().total_rounds {
            self.finish();
            return Ok(());
        }

        self.store.apply(SessionUpdate {
            current_round: Some(next_round),
            current_player_index: Some(Some(0)),
            current_turn: Some(0),
            round_ended: Some(false),
            ..Default::default()
        });
        info!(round = next_round, "round started");
        self.start_turn();
        Ok(())
    }

    pub fn correct_guess(&mut self) -> Result<(), CommandError> {
        self.ensure_word_on_screen()?;

        let session = self.store.session();
        let idx = session
            .current_player_index
            .ok_or(CommandError::NotPlaying)?;
        let mut scores = session.scores.clone();
        if let Some(score) = scores.get_mut(idx) {
            *score += 1;
        }
        debug!(player = idx, word = ?session.current_word, "correct guess");

        self.store.apply(SessionUpdate {
            scores: Some(scores),
            ..Default::default()
        });
        self.push_feedback(FeedbackKind::Success, "Correct!");
        self.generate_word();
        Ok(())
    }

    pub fn pass_word(&mut self) -> Result<(), CommandError> {
        self.ensure_word_on_screen()?;

        let Some(remaining) = self.store.session().current_skips.consume() else {
            self.push_feedback(FeedbackKind::Warning, "No skips left!");
            return Err(CommandError::NoSkipsLeft);
        };
        debug!(remaining = %remaining, "word passed");

        self.store.apply(SessionUpdate {
            current_skips: Some(remaining),
            ..Default::default()
        });
        self.push_feedback(FeedbackKind::Warning, "Passed");
        self.generate_word();
        Ok(())
    }

    /// Pause or resume play. Only a round in progress can be paused.
    pub fn toggle_pause(&mut self) -> Result<(), CommandError> {
        match self.phase() {
            Phase::Idle | Phase::Ready | Phase::GameEnded => return Err(CommandError::NotPlaying),
            Phase::RoundEnded => return Err(CommandError::RoundOver),
            Phase::AwaitingWord | Phase::Active | Phase::Paused | Phase::WordUnavailable => {}
        }

        let paused = !self.store.session().is_paused;
        self.store.apply(SessionUpdate {
            is_paused: Some(paused),
            ..Default::default()
        });

        if paused {
            self.stop_timer();
            info!("game paused");
        } else {
            self.resume_timer();
            info!("game resumed");
        }
        Ok(())
    }

    /// Ask again for a word after the retry ceiling was hit
    pub fn retry_word(&mut self) -> Result<(), CommandError> {
        match self.phase() {
            Phase::WordUnavailable => {
                self.generate_word();
                Ok(())
            }
            Phase::Idle | Phase::Ready | Phase::GameEnded => Err(CommandError::NotPlaying),
            Phase::AwaitingWord => Err(CommandError::WordPending),
            Phase::Paused => Err(CommandError::Paused),
            Phase::RoundEnded => Err(CommandError::RoundOver),
            Phase::Active => Err(CommandError::WordShown),
        }
    }

    /// Quit from anywhere in a game. Outstanding fetches and ticks are orphaned.
    pub fn end_game(&mut self) -> Result<(), CommandError> {
        match self.phase() {
            Phase::Idle | Phase::GameEnded => Err(CommandError::NotPlaying),
            _ => {
                self.finish();
                Ok(())
            }
        }
    }

    /// Same players and settings, clean slate
    pub fn play_again(&mut self) -> Result<(), CommandError> {
        if self.phase() != Phase::GameEnded {
            return Err(CommandError::NotFinished);
        }

        let session = self.store.session();
        let player_count = session.players.len();
        let total_time = session.total_time;
        let skips = session.skips_per_round;
        info!(players = ?session.players, "playing again");

        self.store.apply(SessionUpdate {
            scores: Some(vec![0; player_count]),
            current_round: Some(0),
            current_player_index: Some(None),
            current_turn: Some(0),
            words_used: Some(WordHistory::default()),
            current_word: Some(None),
            taboo_words: Some(Vec::new()),
            time_left: Some(total_time),
            current_skips: Some(skips),
            game_active: Some(true),
            finished: Some(false),
            round_ended: Some(false),
            is_paused: Some(false),
            is_generating_word: Some(false),
            word_error: Some(None),
            ..Default::default()
        });
        Ok(())
    }

    /// Throw the session away, keeping only the last applied settings
    pub fn new_game(&mut self) {
        self.stop_timer();
        self.fetch_ticket += 1;
        self.failures = 0;
        self.feedback.clear();
        self.store.reset(self.settings.to_session());
        info!("new game");
    }

    pub fn on_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::TimerTick { generation } => self.timer_tick(generation),
            EngineEvent::WordFetched { ticket, result } => self.word_fetched(ticket, result),
            EngineEvent::RetryDue { ticket } => self.retry_due(ticket),
        }
    }

    fn ensure_word_on_screen(&self) -> Result<(), CommandError> {
        match self.phase() {
            Phase::Active => Ok(()),
            Phase::AwaitingWord => Err(CommandError::WordPending),
            Phase::Paused => Err(CommandError::Paused),
            Phase::RoundEnded => Err(CommandError::RoundOver),
            Phase::WordUnavailable => Err(CommandError::NoWord),
            Phase::Idle | Phase::Ready | Phase::GameEnded => Err(CommandError::NotPlaying),
        }
    }

    fn start_turn(&mut self) {
        let session = self.store.session();
        if !session.game_active || session.round_ended {
            return;
        }
        let skips = session.skips_per_round;
        let total_time = session.total_time;
        info!(
            player = session.current_player().unwrap_or("-"),
            round = session.current_round,
            turn = session.current_turn,
            "turn started"
        );

        self.stop_timer();
        self.store.apply(SessionUpdate {
            current_skips: Some(skips),
            round_ended: Some(false),
            time_left: Some(total_time),
            is_generating_word: Some(false),
            word_error: Some(None),
            ..Default::default()
        });
        self.generate_word();
    }

    fn generate_word(&mut self) {
        self.stop_timer();
        self.fetch_ticket += 1;
        self.failures = 0;
        self.store.apply(SessionUpdate {
            is_generating_word: Some(true),
            word_error: Some(None),
            ..Default::default()
        });

        let request = self.word_request();
        debug!(ticket = self.fetch_ticket, "requesting word");
        self.scheduler.request_word(self.fetch_ticket, request);
    }

    fn word_request(&self) -> WordRequest {
        let session = self.store.session();
        WordRequest {
            category: session.category.clone(),
            difficulty: session.difficulty.clone(),
            language: session.language.clone(),
            exclude_words: session.words_used.to_vec(),
        }
    }

    fn awaits(&self, ticket: u64) -> bool {
        let session = self.store.session();
        ticket == self.fetch_ticket && session.game_active && session.is_generating_word
    }

    fn word_fetched(&mut self, ticket: u64, result: Result<WordSet, ProviderError>) {
        if !self.awaits(ticket) {
            debug!(ticket, current = self.fetch_ticket, "discarding stale word");
            return;
        }

        let used = &self.store.session().words_used;
        let result = result.and_then(|set| {
            if used.contains(set.guess()) {
                Err(ProviderError::Repeated(set.guess().to_string()))
            } else {
                Ok(set)
            }
        });

        match result {
            Ok(set) => self.accept_word(set),
            Err(err) => self.word_failed(err),
        }
    }

    fn accept_word(&mut self, set: WordSet) {
        let mut words_used = self.store.session().words_used.clone();
        words_used.insert(set.guess());
        let (guess, taboo) = set.into_parts();
        info!(ticket = self.fetch_ticket, word = %guess, "word ready");

        self.failures = 0;
        self.store.apply(SessionUpdate {
            current_word: Some(Some(guess)),
            taboo_words: Some(taboo),
            words_used: Some(words_used),
            is_generating_word: Some(false),
            word_error: Some(None),
            ..Default::default()
        });
        self.resume_timer();
    }

    fn word_failed(&mut self, err: ProviderError) {
        self.failures += 1;
        warn!(
            ticket = self.fetch_ticket,
            attempt = self.failures,
            error = %err,
            "word generation failed"
        );
        // whatever else arrives for the failed attempt is stale
        self.fetch_ticket += 1;
        self.push_feedback(
            FeedbackKind::Error,
            format!("Failed to generate word: {err}"),
        );

        if self.retry.gives_up_after(self.failures) {
            warn!(attempts = self.failures, "giving up on word generation");
            self.store.apply(SessionUpdate {
                is_generating_word: Some(false),
                word_error: Some(Some(err.to_string())),
                ..Default::default()
            });
            return;
        }

        let delay = self.retry.delay_after(self.failures);
        self.scheduler.schedule_retry(self.fetch_ticket, delay);
    }

    fn retry_due(&mut self, ticket: u64) {
        if !self.awaits(ticket) {
            debug!(ticket, "dropping stale retry");
            return;
        }
        let request = self.word_request();
        debug!(ticket, attempt = self.failures + 1, "retrying word request");
        self.scheduler.request_word(ticket, request);
    }

    fn timer_tick(&mut self, generation: u64) {
        if !self.timer_running || generation != self.timer_generation {
            debug!(generation, current = self.timer_generation, "stale tick");
            return;
        }

        let session = self.store.session();
        if !session.game_active
            || session.is_paused
            || session.is_generating_word
            || session.round_ended
            || session.word_error.is_some()
        {
            return;
        }

        let time_left = session.time_left.saturating_sub(1);
        self.store.apply(SessionUpdate {
            time_left: Some(time_left),
            ..Default::default()
        });

        if time_left == 0 {
            self.stop_timer();
            self.end_turn();
        }
    }

    fn end_turn(&mut self) {
        self.stop_timer();

        let session = self.store.session();
        let player_count = session.players.len();
        let next_turn = session.current_turn + 1;
        info!(player = session.current_player().unwrap_or("-"), "turn ended");

        if next_turn >= player_count {
            self.end_round();
            return;
        }

        let next_index = session
            .current_player_index
            .map_or(0, |idx| (idx + 1) % player_count);
        self.store.apply(SessionUpdate {
            current_player_index: Some(Some(next_index)),
            current_turn: Some(next_turn),
            ..Default::default()
        });
        self.start_turn();
    }

    fn end_round(&mut self) {
        self.stop_timer();
        self.fetch_ticket += 1;

        let session = self.store.session();
        let round = session.current_round;
        let player_count = session.players.len();
        self.store.apply(SessionUpdate {
            round_ended: Some(true),
            current_turn: Some(player_count),
            is_generating_word: Some(false),
            ..Default::default()
        });
        self.push_feedback(FeedbackKind::Warning, "Round complete!");
        info!(round, "round complete");
    }

    fn finish(&mut self) {
        self.stop_timer();
        self.fetch_ticket += 1;
        self.failures = 0;

        self.store.apply(SessionUpdate {
            game_active: Some(false),
            finished: Some(true),
            is_generating_word: Some(false),
            is_paused: Some(false),
            round_ended: Some(false),
            word_error: Some(None),
            ..Default::default()
        });
        info!(standings = ?self.store.session().standings(), "game over");
    }

    fn resume_timer(&mut self) {
        let session = self.store.session();
        if session.game_active
            && !session.is_paused
            && !session.round_ended
            && !session.is_generating_word
            && session.word_error.is_none()
        {
            self.start_timer();
        }
    }

    fn start_timer(&mut self) {
        self.stop_timer();
        self.timer_generation += 1;
        self.timer_running = true;
        self.scheduler.start_timer(self.timer_generation);
    }

    fn stop_timer(&mut self) {
        if self.timer_running {
            self.timer_running = false;
            self.timer_generation += 1;
            self.scheduler.stop_timer();
        }
    }

    fn push_feedback(&mut self, kind: FeedbackKind, message: impl Into<String>) {
        self.feedback.push(Feedback {
            kind,
            message: message.into(),
        });
    }
}
