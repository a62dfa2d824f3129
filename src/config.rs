use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Scoring rule used by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Longer words score higher.
    Long,
    /// Shorter words score higher.
    Short,
    /// Flat score; only bonuses and penalties matter.
    #[default]
    Any,
    /// Reward words that introduce letters not used yet in the current alphabet cycle.
    Alphabet,
}

impl SelectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMode::Long => "long",
            SelectionMode::Short => "short",
            SelectionMode::Any => "any",
            SelectionMode::Alphabet => "alphabet",
        }
    }
}

/// Per-character pacing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedProfile {
    None,
    Fast,
    #[default]
    Random,
    /// Starts quick and slows down towards the end of the word.
    Gradual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizationConfig {
    /// Chance per letter of typing a wrong key and backspacing it.
    pub error_chance: f64,
    /// Upper bound of the uniform extra delay added to every character.
    pub max_extra_jitter_s: f64,
    pub insert_numbers: bool,
    /// How many successful rounds still insert stray digits.
    pub number_rounds: u32,
    pub enter_hesitation_min_s: f64,
    pub enter_hesitation_max_s: f64,
    /// Take a short breath every N characters.
    pub pause_every: u32,
    pub pause_min_s: f64,
    pub pause_max_s: f64,
    pub speed_profile: SpeedProfile,
    pub letter_delay_ms: u64,

    pub deliberate_wrong_word_chance: f64,
    pub wrong_then_correct_chance: f64,
    pub filler_phrase_chance: f64,
    pub rehearsal_chance: f64,
    pub think_after_three: bool,
    pub think_after_three_ms: u64,
    pub custom_phrases: Vec<String>,
}

impl Default for HumanizationConfig {
    fn default() -> Self {
        Self {
            error_chance: 0.06,
            max_extra_jitter_s: 0.010,
            insert_numbers: false,
            number_rounds: 0,
            enter_hesitation_min_s: 0.06,
            enter_hesitation_max_s: 0.18,
            pause_every: 4,
            pause_min_s: 0.015,
            pause_max_s: 0.06,
            speed_profile: SpeedProfile::Random,
            letter_delay_ms: 6,
            deliberate_wrong_word_chance: 0.0,
            wrong_then_correct_chance: 0.0,
            filler_phrase_chance: 0.20,
            rehearsal_chance: 0.25,
            think_after_three: true,
            think_after_three_ms: 500,
            custom_phrases: Vec::new(),
        }
    }
}

impl HumanizationConfig {
    /// Whether digits may be inserted with `rounds_left` numbered rounds still in the budget.
    pub fn numbers_allowed(&self, rounds_left: u32) -> bool {
        self.insert_numbers && rounds_left > 0
    }

    /// No humanized behaviors, no typos, no pauses. Handy for tests and dry runs.
    pub fn disabled() -> Self {
        Self {
            error_chance: 0.0,
            max_extra_jitter_s: 0.0,
            insert_numbers: false,
            number_rounds: 0,
            enter_hesitation_min_s: 0.0,
            enter_hesitation_max_s: 0.0,
            pause_every: 0,
            pause_min_s: 0.0,
            pause_max_s: 0.0,
            speed_profile: SpeedProfile::None,
            letter_delay_ms: 0,
            deliberate_wrong_word_chance: 0.0,
            wrong_then_correct_chance: 0.0,
            filler_phrase_chance: 0.0,
            rehearsal_chance: 0.0,
            think_after_three: false,
            think_after_three_ms: 0,
            custom_phrases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cycle_delay_ms: u64,
    pub post_copy_delay_ms: u64,
    pub pre_typing_delay_ms: u64,

    pub dictionary_path: PathBuf,
    pub blacklist_path: PathBuf,

    pub turn_bar_threshold: f64,

    pub mode: SelectionMode,

    pub penalize_repeats: bool,
    pub repeat_penalty: f64,
    pub repeat_cooldown: usize,

    pub show_top: usize,

    pub test_mode: bool,
    pub save_log: bool,
    pub log_path: PathBuf,

    /// Estimated rounds above this budget fall back to a plain, fast submission.
    pub round_time_limit_s: f64,
    pub capture_failure_limit: u32,

    pub humanize: HumanizationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cycle_delay_ms: 200,
            post_copy_delay_ms: 300,
            pre_typing_delay_ms: 200,
            dictionary_path: PathBuf::from("acento.txt"),
            blacklist_path: PathBuf::from("blacklist.txt"),
            turn_bar_threshold: 0.85,
            mode: SelectionMode::Any,
            penalize_repeats: true,
            repeat_penalty: 0.85,
            repeat_cooldown: 5,
            show_top: 5,
            test_mode: false,
            save_log: false,
            log_path: PathBuf::from("log.txt"),
            round_time_limit_s: 4.5,
            capture_failure_limit: 5,
            humanize: HumanizationConfig::default(),
        }
    }
}

fn ensure_probability(value: f64, name: &str) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "{name} must be between 0.0 and 1.0"
    );
    Ok(())
}

fn ensure_seconds(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be finite and >= 0"
    );
    Ok(())
}

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let h = &cfg.humanize;

    ensure_probability(h.error_chance, "error_chance")?;
    ensure_probability(h.deliberate_wrong_word_chance, "deliberate_wrong_word_chance")?;
    ensure_probability(h.wrong_then_correct_chance, "wrong_then_correct_chance")?;
    ensure_probability(h.filler_phrase_chance, "filler_phrase_chance")?;
    ensure_probability(h.rehearsal_chance, "rehearsal_chance")?;
    ensure_probability(cfg.turn_bar_threshold, "turn_bar_threshold")?;

    ensure_seconds(h.max_extra_jitter_s, "max_extra_jitter_s")?;
    ensure_seconds(h.enter_hesitation_min_s, "enter_hesitation_min_s")?;
    ensure_seconds(h.enter_hesitation_max_s, "enter_hesitation_max_s")?;
    ensure_seconds(h.pause_min_s, "pause_min_s")?;
    ensure_seconds(h.pause_max_s, "pause_max_s")?;
    ensure_seconds(cfg.round_time_limit_s, "round_time_limit_s")?;

    ensure!(
        h.enter_hesitation_min_s <= h.enter_hesitation_max_s,
        "enter_hesitation_min_s must be <= enter_hesitation_max_s"
    );
    ensure!(
        h.pause_min_s <= h.pause_max_s,
        "pause_min_s must be <= pause_max_s"
    );

    ensure!(
        cfg.repeat_penalty.is_finite() && cfg.repeat_penalty > 0.0,
        "repeat_penalty must be finite and > 0"
    );

    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Strict load: missing file is `Ok(None)`, anything else that goes wrong is an error.
pub fn try_load(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: AppConfig = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&cfg).map_err(|err| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })?;

    Ok(Some(cfg))
}

/// Load the persisted configuration, treating a malformed file as absent.
///
/// The error is handed back instead of logged so callers can report it once logging is up.
pub fn load_or_default(path: &Path) -> (AppConfig, Option<ConfigError>) {
    match try_load(path) {
        Ok(Some(cfg)) => (cfg, None),
        Ok(None) => (AppConfig::default(), None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

pub fn report_fallback(err: &ConfigError) {
    tracing::warn!("{err}; using default configuration");
}

/// [`load_or_default`], logging any fallback straight away.
pub fn load(path: &Path) -> AppConfig {
    let (cfg, err) = load_or_default(path);
    if let Some(err) = err {
        report_fallback(&err);
    }
    cfg
}

pub fn save(path: &Path, cfg: &AppConfig) -> Result<()> {
    crate::persist::write_json(path, cfg)
}
