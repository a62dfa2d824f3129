use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorFlags;
use crate::config::SelectionMode;
use crate::estimator::Breakdown;

/// Typed when the fragment matches nothing in the dictionary.
pub const FALLBACK_PHRASE: &str = "nem sei essa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Humanized plan within the time budget.
    Normal,
    /// Budget exceeded: plain submission of the chosen word.
    FastPath,
    /// No candidates: submit `FALLBACK_PHRASE`.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Filler,
    Rehearsal,
    WrongWord,
    WrongThenCorrect,
    /// Second half of `WrongThenCorrect`.
    Correction,
    Submit,
    QuickSubmit,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Filler => "filler",
            StepKind::Rehearsal => "rehearsal",
            StepKind::WrongWord => "wrong-word",
            StepKind::WrongThenCorrect => "wrong-then-correct",
            StepKind::Correction => "correction",
            StepKind::Submit => "submit",
            StepKind::QuickSubmit => "quick-submit",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Type a phrase and erase it.
    Filler { text: String, estimated_s: f64 },
    /// Type a partial scribble of the word and erase it.
    Rehearsal { text: String, estimated_s: f64 },
    /// Submit a misspelling and end the round there.
    WrongWord {
        text: String,
        numbers: bool,
        estimated_s: f64,
    },
    WrongThenCorrect {
        wrong: String,
        correct: String,
        numbers: bool,
        estimated_s: f64,
    },
    Submit {
        text: String,
        /// Pause after the third letter, in milliseconds.
        think_ms: Option<u64>,
        numbers: bool,
        estimated_s: f64,
    },
    /// Minimal-latency submission: no jitter, no mistakes.
    QuickSubmit { text: String, estimated_s: f64 },
}

impl PlanStep {
    pub fn kind(&self) -> StepKind {
        match self {
            PlanStep::Filler { .. } => StepKind::Filler,
            PlanStep::Rehearsal { .. } => StepKind::Rehearsal,
            PlanStep::WrongWord { .. } => StepKind::WrongWord,
            PlanStep::WrongThenCorrect { .. } => StepKind::WrongThenCorrect,
            PlanStep::Submit { .. } => StepKind::Submit,
            PlanStep::QuickSubmit { .. } => StepKind::QuickSubmit,
        }
    }

    pub fn estimated_s(&self) -> f64 {
        match self {
            PlanStep::Filler { estimated_s, .. }
            | PlanStep::Rehearsal { estimated_s, .. }
            | PlanStep::WrongWord { estimated_s, .. }
            | PlanStep::WrongThenCorrect { estimated_s, .. }
            | PlanStep::Submit { estimated_s, .. }
            | PlanStep::QuickSubmit { estimated_s, .. } => *estimated_s,
        }
    }

    /// Whether this step presses Enter.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PlanStep::Filler { .. } | PlanStep::Rehearsal { .. })
    }

    /// The text this step leaves submitted (the last one for `WrongThenCorrect`).
    pub fn submitted_text(&self) -> Option<&str> {
        match self {
            PlanStep::Filler { .. } | PlanStep::Rehearsal { .. } => None,
            PlanStep::WrongWord { text, .. }
            | PlanStep::Submit { text, .. }
            | PlanStep::QuickSubmit { text, .. } => Some(text),
            PlanStep::WrongThenCorrect { correct, .. } => Some(correct),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOption {
    pub word: String,
    pub score: f64,
}

/// One round's decisions. Built fresh each round and dropped after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundPlan {
    pub fragment: String,
    pub mode: SelectionMode,
    pub kind: PlanKind,
    /// Chosen dictionary word; `None` for the fallback phrase.
    pub word: Option<String>,
    pub top: Vec<RankedOption>,
    /// Behaviors drawn for the round, before the fast-path rule.
    pub proposed: BehaviorFlags,
    /// Behaviors that survived into `steps`.
    pub flags: BehaviorFlags,
    pub think_after_three: bool,
    pub numbers: bool,
    /// Estimate of the humanized plan, used for the fast-path decision.
    pub estimate_s: f64,
    pub breakdown: Breakdown,
    /// Optional steps first, then exactly one terminal step.
    pub steps: Vec<PlanStep>,
}

impl RoundPlan {
    pub fn is_fast_path(&self) -> bool {
        self.kind == PlanKind::FastPath
    }

    pub fn terminal(&self) -> Option<&PlanStep> {
        self.steps.last().filter(|s| s.is_terminal())
    }

    /// Whether a completed run should be recorded against the chosen word.
    pub fn registers_use(&self) -> bool {
        self.word.is_some()
            && matches!(
                self.terminal(),
                Some(
                    PlanStep::Submit { .. }
                        | PlanStep::QuickSubmit { .. }
                        | PlanStep::WrongThenCorrect { .. }
                )
            )
    }

    pub fn is_deliberate_miss(&self) -> bool {
        matches!(self.terminal(), Some(PlanStep::WrongWord { .. }))
    }

    /// Sum of the finalized steps' estimates.
    pub fn steps_estimate_s(&self) -> f64 {
        self.steps.iter().map(PlanStep::estimated_s).sum()
    }
}
