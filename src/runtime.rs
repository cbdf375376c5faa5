use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::{debug, warn};

use crate::engine::{EngineEvent, Scheduler};
use crate::provider::{ProviderError, WordProvider};
use crate::words::WordRequest;

/// Unified event type consumed by the app runner
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Engine(EngineEvent),
}

/// Source of application events (keyboard, resize, engine completions)
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source: crossterm input plus anything sent through
/// [`CrosstermEventSource::sender`]
pub struct CrosstermEventSource {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if input_tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if input_tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<AppEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl AppEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: AppEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: AppEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

/// Scheduler backed by short-lived threads that report into the app channel.
///
/// Each timer generation gets its own ticker thread which exits as soon as a
/// newer generation (or none) is live. Fetches and retry delays each run on
/// their own thread. A fetch that has not answered within `fetch_timeout` is
/// reported as [`ProviderError::TimedOut`] and its late answer is discarded,
/// so every ticket gets exactly one `WordFetched`.
pub struct ThreadScheduler {
    tx: Sender<AppEvent>,
    provider: Arc<dyn WordProvider>,
    period: Duration,
    fetch_timeout: Duration,
    live_timer: Arc<AtomicU64>,
}

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

impl ThreadScheduler {
    pub fn new(tx: Sender<AppEvent>, provider: Arc<dyn WordProvider>) -> Self {
        Self::with_period(tx, provider, Duration::from_secs(1))
    }

    /// Same as `new` with a custom timer period, so tests need not wait whole seconds
    pub fn with_period(
        tx: Sender<AppEvent>,
        provider: Arc<dyn WordProvider>,
        period: Duration,
    ) -> Self {
        Self {
            tx,
            provider,
            period,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            live_timer: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl Scheduler for ThreadScheduler {
    fn start_timer(&mut self, generation: u64) {
        self.live_timer.store(generation, Ordering::SeqCst);

        let tx = self.tx.clone();
        let live = Arc::clone(&self.live_timer);
        let period = self.period;
        thread::spawn(move || loop {
            thread::sleep(period);
            if live.load(Ordering::SeqCst) != generation {
                break;
            }
            if tx
                .send(AppEvent::Engine(EngineEvent::TimerTick { generation }))
                .is_err()
            {
                break;
            }
        });
    }

    fn stop_timer(&mut self) {
        self.live_timer.store(0, Ordering::SeqCst);
    }

    fn request_word(&mut self, ticket: u64, request: WordRequest) {
        let tx = self.tx.clone();
        let provider = Arc::clone(&self.provider);
        let timeout = self.fetch_timeout;
        thread::spawn(move || {
            let (answer_tx, answer_rx) = mpsc::channel();
            thread::spawn(move || {
                // nobody listens any more once the deadline passed
                let _ = answer_tx.send(provider.request_word(&request));
            });

            let result = match answer_rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(ticket, ?timeout, "word fetch timed out");
                    Err(ProviderError::TimedOut(timeout))
                }
                Err(RecvTimeoutError::Disconnected) => Err(ProviderError::Unavailable(
                    "word provider stopped without answering".into(),
                )),
            };
            if tx
                .send(AppEvent::Engine(EngineEvent::WordFetched { ticket, result }))
                .is_err()
            {
                debug!(ticket, "app gone before word arrived");
            }
        });
    }

    fn schedule_retry(&mut self, ticket: u64, delay: Duration) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(AppEvent::Engine(EngineEvent::RetryDue { ticket }));
        });
    }
}

/// Scheduler that only records what it was asked to do. Tests answer by
/// calling `TurnEngine::on_event` themselves.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pub running_timer: Option<u64>,
    pub timer_starts: usize,
    pub requests: Vec<(u64, WordRequest)>,
    pub retries: Vec<(u64, Duration)>,
}

impl ManualScheduler {
    pub fn last_request(&self) -> Option<&(u64, WordRequest)> {
        self.requests.last()
    }
}

impl Scheduler for ManualScheduler {
    fn start_timer(&mut self, generation: u64) {
        self.running_timer = Some(generation);
        self.timer_starts += 1;
    }

    fn stop_timer(&mut self) {
        self.running_timer = None;
    }

    fn request_word(&mut self, ticket: u64, request: WordRequest) {
        self.requests.push((ticket, request));
    }

    fn schedule_retry(&mut self, ticket: u64, delay: Duration) {
        self.retries.push((ticket, delay));
    }
}
