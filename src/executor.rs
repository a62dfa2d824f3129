use std::time::Duration;

use anyhow::Result;
use rand::Rng;

use crate::behavior::roll;
use crate::config::{AppConfig, HumanizationConfig, SpeedProfile};
use crate::estimator::{
    clamped_letter_delay_s, NUMBER_INSERT_CHANCE, QUICK_CHAR_DELAY_S, QUICK_FOCUS_S,
};
use crate::interfaces::{secs, Sleeper, TextInjector, TurnDetector};
use crate::keyboard::typo_for;
use crate::model::{PlanStep, RoundPlan, StepKind};
use crate::positions::Point;

const SELECT_ALL_SETTLE: Duration = Duration::from_millis(30);
const ERASE_SETTLE: Duration = Duration::from_millis(20);
/// Index of the letter after which the think pause happens.
const THINK_AFTER_INDEX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every step ran and every Enter was pressed.
    Completed,
    /// The turn check before an Enter failed. Text already typed stays where it is.
    TurnLost { step: StepKind },
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed)
    }
}

/// Everything the executor drives during a round.
pub struct RoundIo<'a> {
    pub injector: &'a mut dyn TextInjector,
    pub turns: &'a mut dyn TurnDetector,
    pub sleeper: &'a mut dyn Sleeper,
}

#[derive(Debug, Clone, Copy)]
struct TypingOptions {
    submit: bool,
    numbers: bool,
    think_ms: Option<u64>,
}

impl TypingOptions {
    fn draft() -> Self {
        Self {
            submit: false,
            numbers: false,
            think_ms: None,
        }
    }

    fn submission(numbers: bool) -> Self {
        Self {
            submit: true,
            numbers,
            think_ms: None,
        }
    }
}

fn uniform(rng: &mut impl Rng, lo: f64, hi: f64) -> f64 {
    if lo >= hi {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}

/// Types plans into the chat box, one step at a time.
#[derive(Debug, Clone)]
pub struct Executor {
    humanize: HumanizationConfig,
    pre_typing: Duration,
    chatbox: Point,
}

impl Executor {
    pub fn new(humanize: HumanizationConfig, pre_typing_delay_ms: u64, chatbox: Point) -> Self {
        Self {
            humanize,
            pre_typing: Duration::from_millis(pre_typing_delay_ms),
            chatbox,
        }
    }

    pub fn from_config(cfg: &AppConfig, chatbox: Point) -> Self {
        Self::new(cfg.humanize.clone(), cfg.pre_typing_delay_ms, chatbox)
    }

    fn letter_delay(&self, idx: usize, total: usize, io: &mut RoundIo<'_>, rng: &mut impl Rng) {
        let h = &self.humanize;
        let base = clamped_letter_delay_s(h);

        let mut d = match h.speed_profile {
            SpeedProfile::Gradual => {
                let span = total.saturating_sub(1).max(1) as f64;
                base * (0.6 + 0.4 * (idx as f64 / span))
            }
            SpeedProfile::Fast => base * 0.6,
            SpeedProfile::Random => base * uniform(rng, 0.65, 1.35),
            SpeedProfile::None => base,
        };
        d += uniform(rng, 0.0, h.max_extra_jitter_s);
        io.sleeper.sleep(secs(d));

        let every = h.pause_every as usize;
        if every > 0 && (idx + 1) % every == 0 && idx + 1 < total {
            io.sleeper
                .sleep(secs(uniform(rng, h.pause_min_s, h.pause_max_s)));
        }
    }

    /// Single turn check right before Enter.
    fn try_enter(&self, step: StepKind, io: &mut RoundIo<'_>) -> Result<bool> {
        if !io.turns.is_my_turn()? {
            tracing::warn!(step = %step, "submission cancelled: no longer our turn at Enter");
            return Ok(false);
        }
        io.injector.press_enter()?;
        Ok(true)
    }

    fn type_text(
        &self,
        text: &str,
        step: StepKind,
        opts: TypingOptions,
        io: &mut RoundIo<'_>,
        rng: &mut impl Rng,
    ) -> Result<bool> {
        io.injector.focus(self.chatbox)?;
        io.sleeper.sleep(self.pre_typing);

        let h = &self.humanize;
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let think_at = opts
            .think_ms
            .filter(|_| n >= 3)
            .map(|ms| (THINK_AFTER_INDEX, Duration::from_millis(ms)));

        for (i, &ch) in chars.iter().enumerate() {
            if ch.is_alphabetic() && roll(rng, h.error_chance) {
                let slip = typo_for(ch, rng);
                io.injector.type_char(slip)?;
                self.letter_delay(i, n, io, rng);
                io.injector.press_backspace()?;
            }

            io.injector.type_char(ch)?;

            if opts.numbers && roll(rng, NUMBER_INSERT_CHANCE) {
                let digit = char::from(b'0' + rng.gen_range(0..10u8));
                io.injector.type_char(digit)?;
            }

            if let Some((at, pause)) = think_at {
                if i == at {
                    io.sleeper.sleep(pause);
                }
            }

            self.letter_delay(i, n, io, rng);
        }

        if !opts.submit {
            return Ok(true);
        }

        io.sleeper.sleep(secs(uniform(
            rng,
            h.enter_hesitation_min_s,
            h.enter_hesitation_max_s,
        )));
        self.try_enter(step, io)
    }

    fn erase_all(&self, io: &mut RoundIo<'_>) -> Result<()> {
        io.injector.focus(self.chatbox)?;
        io.injector.select_all()?;
        io.sleeper.sleep(SELECT_ALL_SETTLE);
        io.injector.press_backspace()?;
        io.sleeper.sleep(ERASE_SETTLE);
        Ok(())
    }

    fn type_quick(&self, text: &str, step: StepKind, io: &mut RoundIo<'_>) -> Result<bool> {
        io.injector.focus(self.chatbox)?;
        io.sleeper.sleep(secs(QUICK_FOCUS_S));
        for ch in text.chars() {
            io.injector.type_char(ch)?;
            io.sleeper.sleep(secs(QUICK_CHAR_DELAY_S));
        }
        self.try_enter(step, io)
    }

    /// Run one step, returning the step whose Enter was cancelled, if any.
    fn execute_step(
        &self,
        step: &PlanStep,
        io: &mut RoundIo<'_>,
        rng: &mut impl Rng,
    ) -> Result<Option<StepKind>> {
        let kind = step.kind();
        let lost = |ok: bool, at: StepKind| (!ok).then_some(at);

        match step {
            PlanStep::Filler { text, .. } | PlanStep::Rehearsal { text, .. } => {
                tracing::info!(step = %kind, "typing and erasing: {text}");
                self.type_text(text, kind, TypingOptions::draft(), io, rng)?;
                self.erase_all(io)?;
                Ok(None)
            }
            PlanStep::WrongWord { text, numbers, .. } => {
                let ok = self.type_text(text, kind, TypingOptions::submission(*numbers), io, rng)?;
                if ok {
                    tracing::info!("deliberate miss submitted: {text}");
                }
                Ok(lost(ok, kind))
            }
            PlanStep::WrongThenCorrect {
                wrong,
                correct,
                numbers,
                ..
            } => {
                tracing::info!("submitting {wrong} before correcting to {correct}");
                let opts = TypingOptions::submission(*numbers);
                if !self.type_text(wrong, kind, opts, io, rng)? {
                    return Ok(Some(kind));
                }
                let ok = self.type_text(correct, StepKind::Correction, opts, io, rng)?;
                Ok(lost(ok, StepKind::Correction))
            }
            PlanStep::Submit {
                text,
                think_ms,
                numbers,
                ..
            } => {
                if let Some(ms) = think_ms {
                    tracing::info!("thinking after three letters: {ms} ms");
                }
                let opts = TypingOptions {
                    submit: true,
                    numbers: *numbers,
                    think_ms: *think_ms,
                };
                let ok = self.type_text(text, kind, opts, io, rng)?;
                Ok(lost(ok, kind))
            }
            PlanStep::QuickSubmit { text, .. } => {
                let ok = self.type_quick(text, kind, io)?;
                Ok(lost(ok, kind))
            }
        }
    }

    /// Run the plan's steps in order, stopping at the first lost turn.
    pub fn execute(
        &self,
        plan: &RoundPlan,
        io: &mut RoundIo<'_>,
        rng: &mut impl Rng,
    ) -> Result<ExecutionOutcome> {
        for step in &plan.steps {
            if let Some(step) = self.execute_step(step, io, rng)? {
                return Ok(ExecutionOutcome::TurnLost { step });
            }
        }
        Ok(ExecutionOutcome::Completed)
    }
}
