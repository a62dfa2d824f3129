use rand::Rng;

use crate::behavior::{BehaviorFlags, BehaviorSelector, WrongWordBehavior};
use crate::config::{AppConfig, SelectionMode};
use crate::dictionary::Dictionary;
use crate::estimator::{Breakdown, RoundProposal, RoundTimeEstimator, TerminalProposal};
use crate::model::{PlanKind, PlanStep, RankedOption, RoundPlan, FALLBACK_PHRASE};
use crate::selector::{Selector, UsageState, ALPHABET};

pub const DEFAULT_FILLER_PHRASES: &[&str] = &[
    "pera ai 🤔",
    "hmmm acho que é isso...",
    "calma, quase lá",
    "deixa eu pensar rapidinho",
    "ops, escrevi errado",
    "é isso? acho que sim",
];

const THINK_PREFIX_LEN: usize = 3;
const REHEARSAL_ENDINGS: [&str; 3] = ["..", "...", "!"];

fn random_letter_except(rng: &mut impl Rng, except: Option<char>) -> char {
    let pool: Vec<char> = ALPHABET.chars().filter(|c| Some(*c) != except).collect();
    pool[rng.gen_range(0..pool.len())]
}

/// Misspell `word`: words longer than `threshold` characters get one letter swapped for a
/// different one, shorter words get a random letter appended.
pub fn misspell(word: &str, threshold: usize, rng: &mut impl Rng) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    if chars.len() > threshold {
        let idx = rng.gen_range(0..chars.len());
        chars[idx] = random_letter_except(rng, Some(chars[idx]));
    } else {
        chars.push(random_letter_except(rng, None));
    }
    chars.into_iter().collect()
}

/// A half-typed draft of `word`, like someone trying it out before committing.
pub fn rehearsal_scribble(word: &str, rng: &mut impl Rng) -> String {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= 3 {
        let head: String = chars.iter().take(2).collect();
        return format!("{head}...");
    }

    let k = rng.gen_range(2..=(chars.len() - 1).min(5));
    let head: String = chars[..k].iter().collect();
    let ending = REHEARSAL_ENDINGS[rng.gen_range(0..REHEARSAL_ENDINGS.len())];
    format!("{head}{ending}")
}

/// Draw a filler phrase from the custom list and the built-in ones.
pub fn pick_filler(custom: &[String], rng: &mut impl Rng) -> String {
    let pool: Vec<&str> = custom
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .chain(DEFAULT_FILLER_PHRASES.iter().copied())
        .collect();
    pool[rng.gen_range(0..pool.len())].to_string()
}

fn three_letter_prefix(fragment: &str) -> Option<String> {
    if fragment.chars().count() < THINK_PREFIX_LEN {
        return None;
    }
    Some(fragment.chars().take(THINK_PREFIX_LEN).collect())
}

#[derive(Debug, Clone)]
pub struct RoundPlanner {
    pub selector: Selector,
    pub behaviors: BehaviorSelector,
    pub estimator: RoundTimeEstimator,
    pub round_time_limit_s: f64,
    pub think_after_three: bool,
    pub think_after_three_ms: u64,
    pub custom_phrases: Vec<String>,
}

impl RoundPlanner {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            selector: Selector::from_config(cfg),
            behaviors: BehaviorSelector::from_config(&cfg.humanize),
            estimator: RoundTimeEstimator::from_config(cfg),
            round_time_limit_s: cfg.round_time_limit_s,
            think_after_three: cfg.humanize.think_after_three,
            think_after_three_ms: cfg.humanize.think_after_three_ms,
            custom_phrases: cfg.humanize.custom_phrases.clone(),
        }
    }

    fn fallback(&self, fragment: String, mode: SelectionMode) -> RoundPlan {
        let estimate = RoundTimeEstimator::quick_submission_s(FALLBACK_PHRASE.chars().count());
        RoundPlan {
            fragment,
            mode,
            kind: PlanKind::Fallback,
            word: None,
            top: Vec::new(),
            proposed: BehaviorFlags::none(),
            flags: BehaviorFlags::none(),
            think_after_three: false,
            numbers: false,
            estimate_s: estimate,
            breakdown: Breakdown {
                typing_s: estimate,
                ..Breakdown::default()
            },
            steps: vec![PlanStep::QuickSubmit {
                text: FALLBACK_PHRASE.to_string(),
                estimated_s: estimate,
            }],
        }
    }

    /// Decide everything about one round. Pure apart from the draws on `rng`.
    ///
    /// `numbers` says whether stray digits are allowed this round; the fast path turns
    /// them off again.
    pub fn plan_round(
        &self,
        dictionary: &Dictionary,
        usage: &UsageState,
        mode: SelectionMode,
        fragment: &str,
        numbers: bool,
        rng: &mut impl Rng,
    ) -> RoundPlan {
        let fragment = fragment.trim().to_lowercase();

        let mut candidates = dictionary.filter(&fragment);
        if candidates.is_empty() {
            return self.fallback(fragment, mode);
        }

        let mut think = false;
        if self.think_after_three {
            if let Some(prefix) = three_letter_prefix(&fragment) {
                let narrowed: Vec<&str> = candidates
                    .iter()
                    .copied()
                    .filter(|w| w.starts_with(prefix.as_str()))
                    .collect();
                if !narrowed.is_empty() {
                    candidates = narrowed;
                    think = true;
                }
            }
        }

        let top: Vec<RankedOption> = self
            .selector
            .top(&candidates, mode, &fragment, usage)
            .into_iter()
            .map(|s| RankedOption {
                word: s.word.to_string(),
                score: s.score,
            })
            .collect();

        let Some(word) = self
            .selector
            .choose(&candidates, mode, &fragment, usage, rng)
        else {
            return self.fallback(fragment, mode);
        };
        let word = word.to_string();
        let word_len = word.chars().count();

        let proposed = self.behaviors.select(rng);

        let filler = proposed
            .filler
            .then(|| pick_filler(&self.custom_phrases, rng));
        let rehearsal = proposed
            .rehearsal
            .then(|| rehearsal_scribble(&word, rng));
        let wrong = proposed.wrong_word.map(|behavior| match behavior {
            WrongWordBehavior::DeliberateWrongWord => misspell(&word, 3, rng),
            WrongWordBehavior::WrongThenCorrect => misspell(&word, 1, rng),
        });

        let think_ms = think.then_some(self.think_after_three_ms);
        let terminal = match (proposed.wrong_word, &wrong) {
            (Some(WrongWordBehavior::DeliberateWrongWord), Some(w)) => {
                TerminalProposal::DeliberateWrongWord {
                    chars: w.chars().count(),
                }
            }
            (Some(WrongWordBehavior::WrongThenCorrect), Some(w)) => {
                TerminalProposal::WrongThenCorrect {
                    wrong_chars: w.chars().count(),
                    correct_chars: word_len,
                }
            }
            _ => TerminalProposal::Normal {
                chars: word_len,
                think_ms,
            },
        };

        let breakdown = self.estimator.estimate(&RoundProposal {
            filler_chars: filler.as_ref().map(|t| t.chars().count()),
            rehearsal_chars: rehearsal.as_ref().map(|t| t.chars().count()),
            terminal,
            numbers,
        });
        let estimate_s = breakdown.total();

        if estimate_s > self.round_time_limit_s {
            return RoundPlan {
                fragment,
                mode,
                kind: PlanKind::FastPath,
                top,
                proposed,
                flags: BehaviorFlags::none(),
                think_after_three: false,
                numbers: false,
                estimate_s,
                breakdown,
                steps: vec![PlanStep::QuickSubmit {
                    text: word.clone(),
                    estimated_s: RoundTimeEstimator::quick_submission_s(word_len),
                }],
                word: Some(word),
            };
        }

        let mut steps = Vec::with_capacity(3);
        if let Some(text) = filler {
            steps.push(PlanStep::Filler {
                text,
                estimated_s: breakdown.filler_s,
            });
        }
        if let Some(text) = rehearsal {
            steps.push(PlanStep::Rehearsal {
                text,
                estimated_s: breakdown.rehearsal_s,
            });
        }
        // The think pause only belongs to the plain submission.
        let think_after_three = think && matches!(terminal, TerminalProposal::Normal { .. });
        steps.push(match (proposed.wrong_word, wrong) {
            (Some(WrongWordBehavior::DeliberateWrongWord), Some(text)) => PlanStep::WrongWord {
                text,
                numbers,
                estimated_s: breakdown.wrong_word_s,
            },
            (Some(WrongWordBehavior::WrongThenCorrect), Some(wrong)) => {
                PlanStep::WrongThenCorrect {
                    wrong,
                    correct: word.clone(),
                    numbers,
                    estimated_s: breakdown.wrong_then_correct_s,
                }
            }
            _ => PlanStep::Submit {
                text: word.clone(),
                think_ms: think_after_three.then_some(self.think_after_three_ms),
                numbers,
                estimated_s: breakdown.typing_s,
            },
        });

        RoundPlan {
            fragment,
            mode,
            kind: PlanKind::Normal,
            word: Some(word),
            top,
            proposed,
            flags: proposed,
            think_after_three,
            numbers,
            estimate_s,
            breakdown,
            steps,
        }
    }
}
