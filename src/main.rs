mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    cell::Cell,
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    rc::Rc,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info};

use taboo::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    engine::{
        CommandError, Feedback, FeedbackKind, GameSettings, Phase, RetryPolicy, Scheduler,
        TurnEngine,
    },
    logging,
    provider::{CommandProvider, DeckProvider, ProviderError, WordProvider},
    runtime::{
        AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, ThreadScheduler,
    },
    session::{Session, Skips},
};

const TICK_RATE_MS: u64 = 100;

/// taboo-style party word game for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A taboo-style party word game for the terminal. Teams take timed turns describing a word without saying any of its five forbidden words."
)]
pub struct Cli {
    /// player name, repeat once per player in turn order
    #[clap(short = 'p', long = "player")]
    players: Vec<String>,

    /// number of rounds to play
    #[clap(short = 'r', long)]
    rounds: Option<u32>,

    /// seconds per turn
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// skips allowed per turn, a number or "unlimited"
    #[clap(short = 'k', long)]
    skips: Option<Skips>,

    /// word category (general draws from every category)
    #[clap(short = 'c', long)]
    category: Option<String>,

    /// word difficulty: easy, medium or hard
    #[clap(short = 'd', long)]
    difficulty: Option<String>,

    /// language of the words
    #[clap(short = 'l', long)]
    language: Option<String>,

    /// JSON deck to draw words from instead of the built-in decks
    #[clap(long)]
    deck: Option<PathBuf>,

    /// program that prints a word as JSON, fed the request on stdin
    #[clap(long)]
    word_command: Option<String>,

    /// give up on a word after this many failed fetches (0 keeps retrying)
    #[clap(long)]
    max_attempts: Option<u32>,

    /// remember these settings as the new defaults
    #[clap(long)]
    save: bool,
}

impl Cli {
    /// Layer the command line over the stored configuration
    fn apply_to(&self, mut cfg: Config) -> Config {
        if !self.players.is_empty() {
            cfg.players = self.players.clone();
        }
        if let Some(rounds) = self.rounds {
            cfg.total_rounds = rounds;
        }
        if let Some(seconds) = self.seconds {
            cfg.seconds_per_turn = seconds;
        }
        if let Some(skips) = self.skips {
            cfg.skips_per_turn = skips;
        }
        if let Some(category) = &self.category {
            cfg.category = category.clone();
        }
        if let Some(difficulty) = &self.difficulty {
            cfg.difficulty = difficulty.clone();
        }
        if let Some(language) = &self.language {
            cfg.language = language.clone();
        }
        if let Some(deck) = &self.deck {
            cfg.deck_path = Some(deck.clone());
        }
        if let Some(command) = &self.word_command {
            cfg.word_command = Some(command.clone());
        }
        if let Some(max) = self.max_attempts {
            cfg.max_fetch_attempts = (max > 0).then_some(max);
        }
        cfg
    }
}

fn build_provider(cfg: &Config) -> Result<Arc<dyn WordProvider>, ProviderError> {
    if let Some(line) = &cfg.word_command {
        let provider = CommandProvider::from_command_line(line)
            .ok_or_else(|| ProviderError::Unavailable("word command is empty".into()))?
            .with_timeout(cfg.fetch_timeout());
        return Ok(Arc::new(provider));
    }
    match &cfg.deck_path {
        Some(path) => Ok(Arc::new(DeckProvider::from_path(path)?)),
        None => Ok(Arc::new(DeckProvider::builtin())),
    }
}

/// A feedback message and when it went up
#[derive(Debug, Clone)]
pub struct Toast {
    pub feedback: Feedback,
    pub shown_at: Instant,
}

impl Toast {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= self.feedback.kind.ttl()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitType {
    New,
    Quit,
}

pub struct App<S: Scheduler> {
    pub engine: TurnEngine<S>,
    pub players: Vec<String>,
    pub settings: GameSettings,
    pub toast: Option<Toast>,
    dirty: Rc<Cell<bool>>,
}

impl<S: Scheduler> App<S> {
    pub fn new(scheduler: S, cfg: &Config) -> Result<Self, CommandError> {
        let mut engine = TurnEngine::new(scheduler, RetryPolicy::from(cfg));

        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        engine.subscribe(Box::new(move |_: &Session, _: u64| flag.set(true)));

        let mut app = Self {
            engine,
            players: cfg.players.clone(),
            settings: GameSettings::from(cfg),
            toast: None,
            dirty,
        };
        app.setup()?;
        Ok(app)
    }

    fn setup(&mut self) -> Result<(), CommandError> {
        self.engine.apply_settings(self.settings.clone())?;
        self.engine.start_game(&self.players)
    }

    /// Fresh session with the configured players, waiting for round one
    pub fn new_game(&mut self) -> Result<(), CommandError> {
        self.engine.new_game();
        self.toast = None;
        self.setup()
    }

    /// True when something on screen changed since the last call
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    fn on_event(&mut self, event: AppEvent) -> Option<ExitType> {
        let exit = match event {
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::Engine(event) => {
                self.engine.on_event(event);
                None
            }
            AppEvent::Resize => {
                self.dirty.set(true);
                None
            }
            AppEvent::Tick => None,
        };
        self.refresh_toast(Instant::now());
        exit
    }

    fn on_key(&mut self, key: KeyEvent) -> Option<ExitType> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Some(ExitType::Quit);
        }

        let result = match (self.engine.phase(), key.code) {
            (Phase::GameEnded, KeyCode::Char('r')) => self.engine.play_again(),
            (Phase::GameEnded, KeyCode::Char('n')) => return Some(ExitType::New),
            (Phase::GameEnded, KeyCode::Char('q')) => return Some(ExitType::Quit),
            (Phase::WordUnavailable, KeyCode::Char('r')) => self.engine.retry_word(),
            (Phase::Ready | Phase::RoundEnded, KeyCode::Char('n') | KeyCode::Enter) => {
                self.engine.advance_round()
            }
            (
                Phase::Ready | Phase::RoundEnded | Phase::Paused | Phase::WordUnavailable,
                KeyCode::Char('e'),
            ) => self.engine.end_game(),
            (_, KeyCode::Char('c') | KeyCode::Enter) => self.engine.correct_guess(),
            (_, KeyCode::Char('s') | KeyCode::Tab) => self.engine.pass_word(),
            (_, KeyCode::Char(' ') | KeyCode::Char('p')) => self.engine.toggle_pause(),
            _ => return None,
        };

        if let Err(err) = result {
            self.reject(err);
        }
        None
    }

    fn reject(&mut self, err: CommandError) {
        debug!(error = %err, phase = %self.engine.phase(), "command rejected");
        // the engine already queued its own message for this one
        if err == CommandError::NoSkipsLeft {
            return;
        }
        self.show(Feedback {
            kind: FeedbackKind::Warning,
            message: err.to_string(),
        });
    }

    fn show(&mut self, feedback: Feedback) {
        self.toast = Some(Toast {
            feedback,
            shown_at: Instant::now(),
        });
        self.dirty.set(true);
    }

    fn refresh_toast(&mut self, now: Instant) {
        if let Some(latest) = self.engine.drain_feedback().pop() {
            self.show(latest);
        } else if self.toast.as_ref().is_some_and(|toast| toast.expired(now)) {
            self.toast = None;
            self.dirty.set(true);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        logging::init_file(&path)?;
    }

    let store = FileConfigStore::new();
    let cfg = cli.apply_to(store.load());
    if cli.save {
        store.save(&cfg)?;
        info!(path = %store.path().display(), "settings saved");
    }

    let provider = build_provider(&cfg)?;
    let events = CrosstermEventSource::new();
    let scheduler = ThreadScheduler::new(events.sender(), provider)
        .with_fetch_timeout(cfg.fetch_timeout());
    let mut app = match App::new(scheduler, &cfg) {
        Ok(app) => app,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, err).exit();
        }
    };
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, S: Scheduler>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
    runner: &Runner<E, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    loop {
        let mut exit_type = ExitType::Quit;
        terminal.draw(|f| ui(app, f))?;

        loop {
            if let Some(exit) = app.on_event(runner.step()) {
                exit_type = exit;
                break;
            }
            if app.take_dirty() {
                terminal.draw(|f| ui(app, f))?;
            }
        }

        match exit_type {
            ExitType::New => app.new_game()?,
            ExitType::Quit => break,
        }
    }

    Ok(())
}

fn ui<S: Scheduler>(app: &App<S>, f: &mut Frame) {
    f.render_widget(app, f.area());
}
