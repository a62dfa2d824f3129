//! Expected wall-clock cost of a round, computed without typing anything.
//!
//! Every figure here is an expectation over the random draws the executor makes, so
//! the numbers line up with `executor` on average rather than per round.

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, HumanizationConfig, SpeedProfile};

/// Cost of one simulated keystroke.
pub const KEYPRESS_S: f64 = 0.0015;
/// Cost of one backspace used to undo a slipped key.
pub const BACKSPACE_S: f64 = 0.02;
/// Select-all plus backspace after a filler phrase or rehearsal.
pub const FAST_ERASE_S: f64 = 0.08;
/// Chance per character of a stray digit while numeric insertion is on.
pub const NUMBER_INSERT_CHANCE: f64 = 0.12;

/// Focus delay used by the plain fast submission.
pub const QUICK_FOCUS_S: f64 = 0.05;
/// Per-character delay used by the plain fast submission.
pub const QUICK_CHAR_DELAY_S: f64 = 0.001;

const MIN_LETTER_DELAY_S: f64 = 0.0005;
const MAX_LETTER_DELAY_S: f64 = 0.2;

/// Configured per-letter delay, clamped to sane bounds.
pub(crate) fn clamped_letter_delay_s(h: &HumanizationConfig) -> f64 {
    (h.letter_delay_ms as f64 / 1000.0).clamp(MIN_LETTER_DELAY_S, MAX_LETTER_DELAY_S)
}

/// One contiguous stretch of typing into the chat box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypingBlock {
    pub chars: usize,
    /// Whether the block ends by pressing Enter.
    pub submits: bool,
    /// Pause after the third letter, in milliseconds.
    pub think_ms: Option<u64>,
    pub numbers: bool,
}

impl TypingBlock {
    pub fn draft(chars: usize) -> Self {
        Self {
            chars,
            submits: false,
            think_ms: None,
            numbers: false,
        }
    }

    pub fn submission(chars: usize, numbers: bool) -> Self {
        Self {
            chars,
            submits: true,
            think_ms: None,
            numbers,
        }
    }

    pub fn with_think(mut self, think_ms: Option<u64>) -> Self {
        self.think_ms = think_ms;
        self
    }
}

/// Terminal part of a round: exactly one of these is executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminalProposal {
    /// Type and submit a misspelled word of `chars` characters; the round ends there.
    DeliberateWrongWord { chars: usize },
    /// Submit a misspelled word, then the right one.
    WrongThenCorrect { wrong_chars: usize, correct_chars: usize },
    Normal { chars: usize, think_ms: Option<u64> },
}

/// Everything the estimator needs to know about a proposed round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundProposal {
    pub filler_chars: Option<usize>,
    pub rehearsal_chars: Option<usize>,
    pub terminal: TerminalProposal,
    pub numbers: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub filler_s: f64,
    pub rehearsal_s: f64,
    pub wrong_word_s: f64,
    pub wrong_then_correct_s: f64,
    pub typing_s: f64,
}

impl Breakdown {
    pub fn total(&self) -> f64 {
        self.filler_s + self.rehearsal_s + self.wrong_word_s + self.wrong_then_correct_s + self.typing_s
    }

    /// `name=1.23s` pairs for the non-zero parts, for logging.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = [
            ("filler", self.filler_s),
            ("rehearsal", self.rehearsal_s),
            ("wrong-word", self.wrong_word_s),
            ("wrong-then-correct", self.wrong_then_correct_s),
            ("typing", self.typing_s),
        ]
        .iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(name, v)| format!("{name}={v:.2}s"))
        .collect();

        if parts.is_empty() {
            "typing=0.00s".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundTimeEstimator {
    pre_typing_s: f64,
    humanize: HumanizationConfig,
}

impl RoundTimeEstimator {
    pub fn new(pre_typing_delay_ms: u64, humanize: HumanizationConfig) -> Self {
        Self {
            pre_typing_s: pre_typing_delay_ms as f64 / 1000.0,
            humanize,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.pre_typing_delay_ms, cfg.humanize.clone())
    }

    /// Expected delay after each character, before the keystroke cost.
    pub fn per_char_delay_s(&self) -> f64 {
        let h = &self.humanize;
        let base = clamped_letter_delay_s(h);
        let factor = match h.speed_profile {
            SpeedProfile::Fast => 0.6,
            // Mean of U(0.65, 1.35).
            SpeedProfile::Random => 1.0,
            // Mean of the 0.6 -> 1.0 ramp.
            SpeedProfile::Gradual => 0.8,
            SpeedProfile::None => 1.0,
        };
        base * factor + h.max_extra_jitter_s * 0.5
    }

    fn micro_pause_s(&self, chars: usize) -> f64 {
        let h = &self.humanize;
        if h.pause_every == 0 || chars <= 1 {
            return 0.0;
        }
        let pauses = (chars - 1) / h.pause_every as usize;
        pauses as f64 * (h.pause_min_s + h.pause_max_s) / 2.0
    }

    fn mistakes_s(&self, chars: usize, per_char_delay: f64) -> f64 {
        chars as f64 * self.humanize.error_chance * (KEYPRESS_S + per_char_delay + BACKSPACE_S)
    }

    fn numbers_s(chars: usize, numbers: bool) -> f64 {
        if !numbers {
            return 0.0;
        }
        NUMBER_INSERT_CHANCE * chars as f64 * KEYPRESS_S
    }

    pub fn enter_hesitation_avg_s(&self) -> f64 {
        (self.humanize.enter_hesitation_min_s + self.humanize.enter_hesitation_max_s) / 2.0
    }

    pub fn typing_block_s(&self, block: TypingBlock) -> f64 {
        let per_char = self.per_char_delay_s();

        let mut t = self.pre_typing_s;
        t += block.chars as f64 * (per_char + KEYPRESS_S);
        t += self.micro_pause_s(block.chars);
        t += self.mistakes_s(block.chars, per_char);
        t += Self::numbers_s(block.chars, block.numbers);

        if let Some(think_ms) = block.think_ms {
            if block.chars >= 3 {
                t += think_ms as f64 / 1000.0;
            }
        }

        if block.submits {
            t += self.enter_hesitation_avg_s();
        }

        t
    }

    /// Cost of the no-frills submission used by the fast path and the fallback phrase.
    pub fn quick_submission_s(chars: usize) -> f64 {
        QUICK_FOCUS_S + chars as f64 * (QUICK_CHAR_DELAY_S + KEYPRESS_S)
    }

    pub fn estimate(&self, proposal: &RoundProposal) -> Breakdown {
        let mut out = Breakdown::default();

        if let Some(chars) = proposal.filler_chars {
            out.filler_s = self.typing_block_s(TypingBlock::draft(chars)) + FAST_ERASE_S;
        }
        if let Some(chars) = proposal.rehearsal_chars {
            out.rehearsal_s = self.typing_block_s(TypingBlock::draft(chars)) + FAST_ERASE_S;
        }

        match proposal.terminal {
            TerminalProposal::DeliberateWrongWord { chars } => {
                out.wrong_word_s =
                    self.typing_block_s(TypingBlock::submission(chars, proposal.numbers));
            }
            TerminalProposal::WrongThenCorrect {
                wrong_chars,
                correct_chars,
            } => {
                out.wrong_then_correct_s = self
                    .typing_block_s(TypingBlock::submission(wrong_chars, proposal.numbers))
                    + self.typing_block_s(TypingBlock::submission(correct_chars, proposal.numbers));
            }
            TerminalProposal::Normal { chars, think_ms } => {
                out.typing_s = self.typing_block_s(
                    TypingBlock::submission(chars, proposal.numbers).with_think(think_ms),
                );
            }
        }

        out
    }
}
