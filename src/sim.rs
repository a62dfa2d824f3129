//! In-memory collaborators for tests and the `simulate` command.
//!
//! Every type here is a cheap handle: clone it before boxing it into
//! `Collaborators` and keep the clone to inspect what happened.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;

use crate::interfaces::{FragmentCapture, Sleeper, TextInjector, TurnDetector};
use crate::model::{PlanStep, RoundPlan};
use crate::positions::Point;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanStats {
    pub steps: usize,
    /// Enter presses the plan asks for.
    pub submissions: usize,
    pub typed_chars: usize,
    pub estimated_s: f64,
}

pub fn stats(plan: &RoundPlan) -> PlanStats {
    let mut out = PlanStats {
        steps: plan.steps.len(),
        estimated_s: plan.steps_estimate_s(),
        ..Default::default()
    };

    for step in &plan.steps {
        match step {
            PlanStep::Filler { text, .. } | PlanStep::Rehearsal { text, .. } => {
                out.typed_chars += text.chars().count();
            }
            PlanStep::WrongWord { text, .. }
            | PlanStep::Submit { text, .. }
            | PlanStep::QuickSubmit { text, .. } => {
                out.typed_chars += text.chars().count();
                out.submissions += 1;
            }
            PlanStep::WrongThenCorrect { wrong, correct, .. } => {
                out.typed_chars += wrong.chars().count() + correct.chars().count();
                out.submissions += 2;
            }
        }
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Focus(Point),
    Char(char),
    Backspace,
    SelectAll,
    Enter,
}

#[derive(Debug, Default)]
struct ChatState {
    buffer: Vec<char>,
    selected: bool,
    submitted: Vec<String>,
    events: Vec<ChatEvent>,
}

/// A chat box that behaves like a single-line text input.
#[derive(Debug, Clone, Default)]
pub struct SimChat {
    state: Arc<Mutex<ChatState>>,
}

impl SimChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current, unsubmitted contents.
    pub fn buffer(&self) -> String {
        lock(&self.state).buffer.iter().collect()
    }

    pub fn submitted(&self) -> Vec<String> {
        lock(&self.state).submitted.clone()
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        lock(&self.state).events.clone()
    }

    pub fn enter_count(&self) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|e| **e == ChatEvent::Enter)
            .count()
    }
}

impl TextInjector for SimChat {
    fn focus(&mut self, at: Point) -> Result<()> {
        lock(&self.state).events.push(ChatEvent::Focus(at));
        Ok(())
    }

    fn type_char(&mut self, c: char) -> Result<()> {
        let mut st = lock(&self.state);
        if st.selected {
            st.buffer.clear();
            st.selected = false;
        }
        st.buffer.push(c);
        st.events.push(ChatEvent::Char(c));
        Ok(())
    }

    fn press_backspace(&mut self) -> Result<()> {
        let mut st = lock(&self.state);
        if st.selected {
            st.buffer.clear();
            st.selected = false;
        } else {
            st.buffer.pop();
        }
        st.events.push(ChatEvent::Backspace);
        Ok(())
    }

    fn press_enter(&mut self) -> Result<()> {
        let mut st = lock(&self.state);
        let line: String = st.buffer.drain(..).collect();
        st.selected = false;
        st.submitted.push(line);
        st.events.push(ChatEvent::Enter);
        Ok(())
    }

    fn select_all(&mut self) -> Result<()> {
        let mut st = lock(&self.state);
        st.selected = true;
        st.events.push(ChatEvent::SelectAll);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TurnScript {
    answers: VecDeque<bool>,
    otherwise: bool,
    checks: usize,
    refreshes: usize,
}

/// Answers turn checks from a script, then a fixed answer once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedTurns {
    script: Arc<Mutex<TurnScript>>,
}

impl ScriptedTurns {
    pub fn new(answers: impl IntoIterator<Item = bool>, otherwise: bool) -> Self {
        Self {
            script: Arc::new(Mutex::new(TurnScript {
                answers: answers.into_iter().collect(),
                otherwise,
                ..Default::default()
            })),
        }
    }

    /// Always my turn.
    pub fn always() -> Self {
        Self::new([], true)
    }

    pub fn checks(&self) -> usize {
        lock(&self.script).checks
    }

    pub fn refreshes(&self) -> usize {
        lock(&self.script).refreshes
    }
}

impl TurnDetector for ScriptedTurns {
    fn is_my_turn(&mut self) -> Result<bool> {
        let mut script = lock(&self.script);
        script.checks += 1;
        let otherwise = script.otherwise;
        Ok(script.answers.pop_front().unwrap_or(otherwise))
    }

    fn refresh_reference(&mut self) -> Result<()> {
        lock(&self.script).refreshes += 1;
        Ok(())
    }
}

/// Hands out captured fragments in order; empty once the list runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFragments {
    queue: Arc<Mutex<VecDeque<String>>>,
}

impl ScriptedFragments {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Arc::new(Mutex::new(fragments.into_iter().map(Into::into).collect())),
        }
    }

    /// Same fragments over and over, `rounds` times.
    pub fn cycle(fragments: &[String], rounds: usize) -> Self {
        if fragments.is_empty() {
            return Self::default();
        }
        Self::new(fragments.iter().cycle().take(rounds).cloned())
    }

    pub fn remaining(&self) -> usize {
        lock(&self.queue).len()
    }
}

impl FragmentCapture for ScriptedFragments {
    fn capture_fragment(&mut self) -> Result<String> {
        Ok(lock(&self.queue).pop_front().unwrap_or_default())
    }
}

/// Records requested sleeps without sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        lock(&self.sleeps).iter().sum()
    }

    pub fn count(&self) -> usize {
        lock(&self.sleeps).len()
    }

    pub fn contains(&self, duration: Duration) -> bool {
        lock(&self.sleeps).contains(&duration)
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        lock(&self.sleeps).push(duration);
    }
}
