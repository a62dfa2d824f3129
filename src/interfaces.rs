//! Seams between the decision engine and the outside world.
//!
//! The planner, selector and estimator never touch these; only the executor and the
//! session loop do.

use std::time::Duration;

use anyhow::Result;

use crate::positions::Point;

pub trait TurnDetector: Send {
    /// Whether input may still be submitted for the current round.
    fn is_my_turn(&mut self) -> Result<bool>;
    /// Re-capture whatever the detector compares against.
    fn refresh_reference(&mut self) -> Result<()>;
}

pub trait FragmentCapture: Send {
    /// Raw text of the round's required letters; empty when nothing could be read.
    fn capture_fragment(&mut self) -> Result<String>;
}

pub trait TextInjector: Send {
    fn focus(&mut self, at: Point) -> Result<()>;
    fn type_char(&mut self, c: char) -> Result<()>;
    fn press_backspace(&mut self) -> Result<()>;
    fn press_enter(&mut self) -> Result<()>;
    fn select_all(&mut self) -> Result<()>;
}

pub trait Sleeper: Send {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Seconds to a `Duration`, treating negative or non-finite values as zero.
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or_default()
}
