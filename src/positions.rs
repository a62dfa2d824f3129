use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POSITIONS_PATH: &str = "posicoes.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Learned screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Positions {
    /// Where the round's letters are shown (double-clicked to copy them).
    pub letters: Point,
    /// The chat input box.
    pub chatbox: Point,
    /// Region that changes when the turn passes to someone else.
    pub turn_bar: Rect,
}

impl Default for Positions {
    fn default() -> Self {
        Self {
            letters: Point::new(692, 594),
            chatbox: Point::new(838, 953),
            turn_bar: Rect {
                x: 600,
                y: 1010,
                width: 240,
                height: 32,
            },
        }
    }
}

fn read_positions(path: &Path) -> Result<Positions> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load saved positions; a missing or malformed file yields the defaults.
pub fn load(path: &Path) -> Positions {
    if !path.exists() {
        return Positions::default();
    }

    match read_positions(path) {
        Ok(positions) => positions,
        Err(err) => {
            tracing::warn!("{err:#}; using default positions");
            Positions::default()
        }
    }
}

pub fn save(path: &Path, positions: &Positions) -> Result<()> {
    crate::persist::write_json(path, positions)
}
