use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;

use crate::capture::{CaptureOutcome, FragmentMonitor};
use crate::config::{AppConfig, SelectionMode};
use crate::dictionary::{Dictionary, DictionaryError};
use crate::executor::{ExecutionOutcome, Executor, RoundIo};
use crate::interfaces::{FragmentCapture, Sleeper, TextInjector, TurnDetector};
use crate::model::{PlanKind, RoundPlan, StepKind};
use crate::planner::RoundPlanner;
use crate::positions::Positions;
use crate::selector::{Selector, UsageState};
use crate::trace::{flags_label, plan_console_trace, print_trace_line};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub rounds: u64,
    pub submissions: u64,
    pub consecutive_successes: u32,
    pub deliberate_misses: u32,
    pub turn_losses: u32,
    pub fallbacks: u32,
    pub fast_paths: u32,
    pub capture_failures: u32,
    pub failed_rounds: u32,
}

#[derive(Debug)]
struct SessionInner {
    config: AppConfig,
    mode: SelectionMode,
    usage: UsageState,
    history: Vec<String>,
    stats: SessionStats,
    numbers_remaining: u32,
}

/// State shared between the worker loop and whatever drives it.
///
/// Configuration changes take effect at the next round; a round in progress keeps the
/// snapshot it started with.
#[derive(Debug)]
pub struct SessionState {
    running: AtomicBool,
    inner: Mutex<SessionInner>,
    dictionary: RwLock<Arc<Dictionary>>,
}

impl SessionState {
    pub fn new(config: AppConfig) -> Self {
        let inner = SessionInner {
            mode: config.mode,
            usage: UsageState::new(config.repeat_cooldown),
            history: Vec::new(),
            stats: SessionStats::default(),
            numbers_remaining: config.humanize.number_rounds,
            config,
        };
        Self {
            running: AtomicBool::new(false),
            inner: Mutex::new(inner),
            dictionary: RwLock::new(Arc::new(Dictionary::new())),
        }
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns `false` if the session was already running.
    pub fn start(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn config(&self) -> AppConfig {
        self.inner().config.clone()
    }

    /// Replace the live configuration. Resets the numbers budget and resizes the recent window.
    pub fn set_config(&self, config: AppConfig) {
        let mut inner = self.inner();
        inner.usage.set_cooldown(config.repeat_cooldown);
        inner.numbers_remaining = config.humanize.number_rounds;
        inner.config = config;
    }

    pub fn mode(&self) -> SelectionMode {
        self.inner().mode
    }

    pub fn set_mode(&self, mode: SelectionMode) {
        self.inner().mode = mode;
        tracing::info!(mode = mode.as_str(), "mode selected");
    }

    pub fn usage(&self) -> UsageState {
        self.inner().usage.clone()
    }

    pub fn history(&self) -> Vec<String> {
        self.inner().history.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner().stats.clone()
    }

    pub fn numbers_remaining(&self) -> u32 {
        self.inner().numbers_remaining
    }

    /// Snapshot of the current pool. A reload never disturbs a snapshot already taken.
    pub fn dictionary(&self) -> Arc<Dictionary> {
        self.dictionary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn install_dictionary(&self, dictionary: Dictionary) {
        *self
            .dictionary
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(dictionary);
    }

    /// Load the configured word list and blacklist into a fresh pool and swap it in.
    ///
    /// On failure the previous pool stays installed.
    pub fn reload_dictionary(&self) -> Result<usize, DictionaryError> {
        let cfg = self.config();
        let mut dictionary = Dictionary::new();
        let words = dictionary.load(&cfg.dictionary_path)?;
        let blacklisted = dictionary.load_blacklist(&cfg.blacklist_path)?;
        tracing::info!(words, blacklisted, "dictionary loaded");
        self.install_dictionary(dictionary);
        Ok(words)
    }

    fn numbers_allowed(&self) -> bool {
        let inner = self.inner();
        inner.config.humanize.numbers_allowed(inner.numbers_remaining)
    }

    fn record_plan(&self, plan: &RoundPlan) {
        let mut inner = self.inner();
        inner.stats.rounds += 1;
        match plan.kind {
            PlanKind::Fallback => inner.stats.fallbacks += 1,
            PlanKind::FastPath => inner.stats.fast_paths += 1,
            PlanKind::Normal => {}
        }
    }

    /// Apply a fully executed plan: usage, history, counters and the numbers budget,
    /// all under one lock.
    fn record_completed(&self, plan: &RoundPlan) {
        let mut guard = self.inner();
        let inner = &mut *guard;
        inner.stats.submissions += 1;

        if plan.is_deliberate_miss() {
            inner.stats.deliberate_misses += 1;
            inner.stats.consecutive_successes = 0;
            return;
        }

        let Some(word) = plan.word.as_deref().filter(|_| plan.registers_use()) else {
            return;
        };

        Selector::from_config(&inner.config).register_use(&mut inner.usage, word, plan.mode);
        inner.history.push(word.to_string());
        inner.stats.consecutive_successes += 1;

        if plan.numbers && inner.numbers_remaining > 0 {
            inner.numbers_remaining -= 1;
            if inner.numbers_remaining == 0 {
                inner.config.humanize.insert_numbers = false;
                tracing::info!("number rounds used up; numeric insertion disabled");
            }
        }
    }

    fn record_turn_lost(&self) {
        self.inner().stats.turn_losses += 1;
    }

    fn record_capture_failure(&self) {
        self.inner().stats.capture_failures += 1;
    }

    fn record_failure(&self) {
        self.inner().stats.failed_rounds += 1;
    }
}

/// The external collaborators one worker drives.
pub struct Collaborators {
    pub turns: Box<dyn TurnDetector>,
    pub capture: Box<dyn FragmentCapture>,
    pub injector: Box<dyn TextInjector>,
    pub sleeper: Box<dyn Sleeper>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundReport {
    NotMyTurn,
    CaptureEmpty {
        consecutive_failures: u32,
        warn: bool,
    },
    /// Every step of the plan ran.
    Completed(RoundPlan),
    /// Test mode: the plan was logged instead of typed.
    DryRun(RoundPlan),
    TurnLost {
        plan: RoundPlan,
        step: StepKind,
    },
    /// A collaborator failed; the loop carries on.
    Failed(String),
}

impl RoundReport {
    pub fn plan(&self) -> Option<&RoundPlan> {
        match self {
            RoundReport::Completed(plan)
            | RoundReport::DryRun(plan)
            | RoundReport::TurnLost { plan, .. } => Some(plan),
            _ => None,
        }
    }
}

fn log_plan(plan: &RoundPlan, round_time_limit_s: f64) {
    if plan.kind == PlanKind::Fallback {
        tracing::warn!("no word found for \"{}\"; sending fallback phrase", plan.fragment);
        return;
    }

    let top: Vec<&str> = plan.top.iter().map(|o| o.word.as_str()).collect();
    tracing::info!("top options: {}", top.join(", "));
    if let Some(word) = &plan.word {
        tracing::info!("chosen: {word}");
    }

    tracing::info!(
        "round estimate ~{:.2}s | flags: {} | breakdown: {}",
        plan.estimate_s,
        flags_label(plan),
        plan.breakdown.describe()
    );

    if plan.is_fast_path() {
        tracing::info!(
            "fast path: {:.2}s > limit {:.2}s; submitting the word directly",
            plan.estimate_s,
            round_time_limit_s
        );
    }
}

/// The worker: one round at a time, strictly sequential.
pub struct Bot<R> {
    state: Arc<SessionState>,
    io: Collaborators,
    positions: Positions,
    monitor: FragmentMonitor,
    rng: R,
    trace: bool,
}

impl<R: Rng> Bot<R> {
    pub fn new(state: Arc<SessionState>, io: Collaborators, positions: Positions, rng: R) -> Self {
        let limit = state.config().capture_failure_limit;
        Self {
            state,
            io,
            positions,
            monitor: FragmentMonitor::new(limit),
            rng,
            trace: false,
        }
    }

    /// Print plan trace lines to stderr before executing them.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    fn my_turn(&mut self) -> Result<bool> {
        self.io
            .turns
            .refresh_reference()
            .context("failed to refresh turn reference")?;
        self.io.turns.is_my_turn().context("turn check failed")
    }

    /// Detect, decide, act. Never panics on collaborator errors; they become `Failed`.
    pub fn run_round(&mut self) -> RoundReport {
        let cfg = self.state.config();
        let mode = self.state.mode();
        self.monitor.set_limit(cfg.capture_failure_limit);

        match self.my_turn() {
            Ok(true) => {}
            Ok(false) => return RoundReport::NotMyTurn,
            Err(err) => {
                tracing::error!("{err:#}");
                self.state.record_failure();
                return RoundReport::Failed(format!("{err:#}"));
            }
        }

        let fragment = match self.monitor.capture(self.io.capture.as_mut()) {
            CaptureOutcome::Fragment(fragment) => fragment,
            CaptureOutcome::Empty {
                consecutive_failures,
                warn,
            } => {
                self.state.record_capture_failure();
                return RoundReport::CaptureEmpty {
                    consecutive_failures,
                    warn,
                };
            }
        };
        tracing::info!("letters detected: {fragment}");

        let dictionary = self.state.dictionary();
        let usage = self.state.usage();
        let numbers = self.state.numbers_allowed();

        let plan = RoundPlanner::from_config(&cfg).plan_round(
            &dictionary,
            &usage,
            mode,
            &fragment,
            numbers,
            &mut self.rng,
        );
        self.state.record_plan(&plan);
        log_plan(&plan, cfg.round_time_limit_s);

        if self.trace {
            for event in plan_console_trace(&plan) {
                print_trace_line(&event.line);
            }
        }

        if cfg.test_mode {
            for step in &plan.steps {
                if let Some(text) = step.submitted_text() {
                    tracing::info!("[test] -> {text}");
                }
            }
            self.state.record_completed(&plan);
            return RoundReport::DryRun(plan);
        }

        let executor = Executor::from_config(&cfg, self.positions.chatbox);
        let mut io = RoundIo {
            injector: self.io.injector.as_mut(),
            turns: self.io.turns.as_mut(),
            sleeper: self.io.sleeper.as_mut(),
        };

        match executor.execute(&plan, &mut io, &mut self.rng) {
            Ok(ExecutionOutcome::Completed) => {
                self.state.record_completed(&plan);
                RoundReport::Completed(plan)
            }
            Ok(ExecutionOutcome::TurnLost { step }) => {
                tracing::warn!(step = %step, "round ended before Enter; usage not recorded");
                self.state.record_turn_lost();
                RoundReport::TurnLost { plan, step }
            }
            Err(err) => {
                tracing::error!("typing failed: {err:#}");
                self.state.record_failure();
                RoundReport::Failed(format!("{err:#}"))
            }
        }
    }

    fn cycle_pause(&mut self) {
        let ms = self.state.config().cycle_delay_ms;
        self.io.sleeper.sleep(Duration::from_millis(ms));
    }

    /// Run exactly `rounds` cycles regardless of the running flag.
    pub fn run_rounds(&mut self, rounds: usize) -> Vec<RoundReport> {
        (0..rounds)
            .map(|_| {
                let report = self.run_round();
                self.cycle_pause();
                report
            })
            .collect()
    }

    /// Loop until the running flag is cleared.
    ///
    /// Loads the dictionary first if none is installed; a load failure stops the session
    /// before the first round.
    pub fn run(mut self) -> Result<()> {
        tracing::info!(mode = self.state.mode().as_str(), "starting");

        if self.state.dictionary().is_empty() {
            if let Err(err) = self.state.reload_dictionary() {
                tracing::error!("{err}");
                self.state.stop();
                return Err(err.into());
            }
        }

        while self.state.is_running() {
            let report = self.run_round();
            tracing::debug!(?report, "round finished");
            self.cycle_pause();
        }

        tracing::info!("stopped");
        Ok(())
    }
}

impl<R: Rng + Send + 'static> Bot<R> {
    /// Run the loop on a dedicated worker thread, starting the session if the caller
    /// has not already.
    pub fn spawn(self) -> Result<JoinHandle<Result<()>>> {
        self.state.start();
        std::thread::Builder::new()
            .name("wordbomb-worker".to_string())
            .spawn(move || self.run())
            .context("failed to spawn worker thread")
    }
}
