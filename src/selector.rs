use std::collections::{BTreeSet, HashMap, VecDeque};

use rand::distributions::WeightedIndex;
use rand::Rng;
use serde::Serialize;

use crate::config::{AppConfig, SelectionMode};

pub const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Letters that rarely appear in the dictionary and never count towards an alphabet cycle.
pub const IGNORED_LETTERS: [char; 3] = ['y', 'k', 'w'];

/// Distinct letters needed to complete an alphabet cycle.
pub const ALPHABET_COMPLETION_THRESHOLD: usize = ALPHABET.len() - IGNORED_LETTERS.len();

const SHORT_EPSILON: f64 = 1e-3;
const PREFIX_BONUS: f64 = 1.25;
const RECENT_PENALTY: f64 = 0.5;
const ALPHABET_LENGTH_WEIGHT: f64 = 0.05;
const MIN_WEIGHT: f64 = 1e-3;

/// Accented Latin letters count as their base letter; anything outside `ALPHABET` is dropped.
fn base_letter(c: char) -> Option<char> {
    let base = match c.to_lowercase().next().unwrap_or(c) {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    };
    ALPHABET.contains(base).then_some(base)
}

fn counted_letter(c: char) -> Option<char> {
    base_letter(c).filter(|c| !IGNORED_LETTERS.contains(c))
}

fn counted_letters(word: &str) -> BTreeSet<char> {
    word.chars().filter_map(counted_letter).collect()
}

/// Everything the selector remembers between rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageState {
    frequency_by_word: HashMap<String, u32>,
    recent_words: VecDeque<String>,
    used_letters: BTreeSet<char>,
    alphabet_completions: u32,
    cooldown: usize,
}

impl UsageState {
    pub fn new(cooldown: usize) -> Self {
        Self {
            cooldown,
            ..Default::default()
        }
    }

    pub fn frequency(&self, word: &str) -> u32 {
        self.frequency_by_word.get(word).copied().unwrap_or(0)
    }

    pub fn is_recent(&self, word: &str) -> bool {
        self.recent_words.iter().any(|w| w == word)
    }

    /// Oldest first.
    pub fn recent_words(&self) -> impl Iterator<Item = &str> {
        self.recent_words.iter().map(String::as_str)
    }

    pub fn used_letters(&self) -> &BTreeSet<char> {
        &self.used_letters
    }

    pub fn alphabet_completions(&self) -> u32 {
        self.alphabet_completions
    }

    pub fn cooldown(&self) -> usize {
        self.cooldown
    }

    /// Resize the recent-use window, evicting the oldest entries if it shrinks.
    pub fn set_cooldown(&mut self, cooldown: usize) {
        self.cooldown = cooldown;
        while self.recent_words.len() > cooldown {
            self.recent_words.pop_front();
        }
    }

    /// Seed the alphabet cycle, e.g. when resuming a session.
    pub fn with_used_letters(mut self, letters: impl IntoIterator<Item = char>) -> Self {
        self.used_letters = letters.into_iter().filter_map(counted_letter).collect();
        self
    }

    fn register_use(&mut self, word: &str, mode: SelectionMode) {
        // Compute the alphabet update first so the state is never left half-applied.
        let letters_update = (mode == SelectionMode::Alphabet).then(|| {
            let mut letters = self.used_letters.clone();
            letters.extend(counted_letters(word));
            if letters.len() >= ALPHABET_COMPLETION_THRESHOLD {
                (BTreeSet::new(), self.alphabet_completions + 1)
            } else {
                (letters, self.alphabet_completions)
            }
        });

        *self.frequency_by_word.entry(word.to_string()).or_insert(0) += 1;

        self.recent_words.push_back(word.to_string());
        while self.recent_words.len() > self.cooldown {
            self.recent_words.pop_front();
        }

        if let Some((letters, completions)) = letters_update {
            self.used_letters = letters;
            self.alphabet_completions = completions;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredWord<'a> {
    pub word: &'a str,
    pub score: f64,
}

/// Scores candidate words and draws one from the best few.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selector {
    pub penalize_repeats: bool,
    pub repeat_penalty: f64,
    pub show_top: usize,
}

impl Default for Selector {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl Selector {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            penalize_repeats: cfg.penalize_repeats,
            repeat_penalty: cfg.repeat_penalty,
            show_top: cfg.show_top,
        }
    }

    fn base_score(
        &self,
        word: &str,
        mode: SelectionMode,
        fragment: &str,
        usage: &UsageState,
    ) -> f64 {
        let len = word.chars().count() as f64;
        let mut score = match mode {
            SelectionMode::Short => 1.0 / (len + SHORT_EPSILON),
            SelectionMode::Long => len,
            SelectionMode::Any | SelectionMode::Alphabet => 1.0,
        };

        if word.starts_with(fragment) {
            score *= PREFIX_BONUS;
        }

        if self.penalize_repeats {
            let freq = usage.frequency(word);
            if freq > 0 {
                score *= self.repeat_penalty.powi(freq.min(i32::MAX as u32) as i32);
            }
            if usage.is_recent(word) {
                score *= RECENT_PENALTY;
            }
        }

        score
    }

    fn alphabet_score(word: &str, usage: &UsageState) -> f64 {
        let new_letters = counted_letters(word)
            .iter()
            .filter(|c| !usage.used_letters.contains(c))
            .count();
        new_letters as f64 + word.chars().count() as f64 * ALPHABET_LENGTH_WEIGHT
    }

    pub fn score(
        &self,
        word: &str,
        mode: SelectionMode,
        fragment: &str,
        usage: &UsageState,
    ) -> f64 {
        match mode {
            SelectionMode::Alphabet => Self::alphabet_score(word, usage),
            _ => self.base_score(word, mode, &fragment.to_lowercase(), usage),
        }
    }

    /// Candidates sorted by descending score; equal scores keep their input order.
    pub fn rank<'a>(
        &self,
        candidates: &[&'a str],
        mode: SelectionMode,
        fragment: &str,
        usage: &UsageState,
    ) -> Vec<ScoredWord<'a>> {
        let mut scored: Vec<ScoredWord<'a>> = candidates
            .iter()
            .map(|&word| ScoredWord {
                word,
                score: self.score(word, mode, fragment, usage),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    fn top_n(&self, available: usize) -> usize {
        self.show_top.max(1).min(available)
    }

    /// The best `show_top` candidates, as offered to the weighted draw.
    pub fn top<'a>(
        &self,
        candidates: &[&'a str],
        mode: SelectionMode,
        fragment: &str,
        usage: &UsageState,
    ) -> Vec<ScoredWord<'a>> {
        let mut ranked = self.rank(candidates, mode, fragment, usage);
        ranked.truncate(self.top_n(ranked.len()));
        ranked
    }

    /// Weighted-random pick among the top candidates. `None` only when `candidates` is empty.
    pub fn choose<'a>(
        &self,
        candidates: &[&'a str],
        mode: SelectionMode,
        fragment: &str,
        usage: &UsageState,
        rng: &mut impl Rng,
    ) -> Option<&'a str> {
        let top = self.top(candidates, mode, fragment, usage);
        let first = top.first()?.word;

        let weights: Vec<f64> = top
            .iter()
            .map(|s| {
                if s.score.is_finite() {
                    s.score.max(MIN_WEIGHT)
                } else {
                    MIN_WEIGHT
                }
            })
            .collect();

        match WeightedIndex::new(&weights) {
            Ok(dist) => Some(top[rng.sample(&dist)].word),
            Err(_) => Some(first),
        }
    }

    pub fn register_use(&self, usage: &mut UsageState, word: &str, mode: SelectionMode) {
        usage.register_use(word, mode);
    }
}
