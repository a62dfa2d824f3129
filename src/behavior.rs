use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::HumanizationConfig;

/// The (at most one) behavior that submits something other than the right word first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrongWordBehavior {
    /// Submit a misspelled word and give up on the round.
    DeliberateWrongWord,
    /// Submit a misspelled word, then the correct one.
    WrongThenCorrect,
}

/// Optional behaviors proposed for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorFlags {
    pub filler: bool,
    pub rehearsal: bool,
    pub wrong_word: Option<WrongWordBehavior>,
}

impl BehaviorFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.filler && !self.rehearsal && self.wrong_word.is_none()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.filler {
            out.push("filler");
        }
        if self.rehearsal {
            out.push("rehearsal");
        }
        match self.wrong_word {
            Some(WrongWordBehavior::DeliberateWrongWord) => out.push("wrong-word"),
            Some(WrongWordBehavior::WrongThenCorrect) => out.push("wrong-then-correct"),
            None => {}
        }
        out
    }
}

pub(crate) fn roll(rng: &mut impl Rng, probability: f64) -> bool {
    probability > 0.0 && rng.gen::<f64>() < probability
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorSelector {
    pub filler_phrase_chance: f64,
    pub rehearsal_chance: f64,
    pub deliberate_wrong_word_chance: f64,
    pub wrong_then_correct_chance: f64,
}

impl BehaviorSelector {
    pub fn from_config(h: &HumanizationConfig) -> Self {
        Self {
            filler_phrase_chance: h.filler_phrase_chance,
            rehearsal_chance: h.rehearsal_chance,
            deliberate_wrong_word_chance: h.deliberate_wrong_word_chance,
            wrong_then_correct_chance: h.wrong_then_correct_chance,
        }
    }

    pub fn select(&self, rng: &mut impl Rng) -> BehaviorFlags {
        // The second wrong-word draw only happens when the first one fails.
        let wrong_word = if roll(rng, self.deliberate_wrong_word_chance) {
            Some(WrongWordBehavior::DeliberateWrongWord)
        } else if roll(rng, self.wrong_then_correct_chance) {
            Some(WrongWordBehavior::WrongThenCorrect)
        } else {
            None
        };

        BehaviorFlags {
            filler: roll(rng, self.filler_phrase_chance),
            rehearsal: roll(rng, self.rehearsal_chance),
            wrong_word,
        }
    }
}
