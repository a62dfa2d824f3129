use crate::interfaces::FragmentCapture;

/// Keep only letters (accents included), lowercased.
pub fn clean_fragment(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Fragment(String),
    /// Nothing usable was captured. `warn` is set once failures pass the configured limit.
    Empty { consecutive_failures: u32, warn: bool },
}

/// Counts consecutive empty captures.
#[derive(Debug, Clone)]
pub struct FragmentMonitor {
    limit: u32,
    consecutive_failures: u32,
}

impl FragmentMonitor {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    /// Classify one raw capture and update the failure streak.
    pub fn record(&mut self, raw: &str) -> CaptureOutcome {
        let fragment = clean_fragment(raw);
        if !fragment.is_empty() {
            self.consecutive_failures = 0;
            return CaptureOutcome::Fragment(fragment);
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let warn = self.consecutive_failures > self.limit;
        if warn {
            tracing::warn!(
                failures = self.consecutive_failures,
                "repeated capture failures; check positions, window and game"
            );
        } else {
            tracing::info!("empty capture; retrying");
        }

        CaptureOutcome::Empty {
            consecutive_failures: self.consecutive_failures,
            warn,
        }
    }

    /// Capture through `source`. A collaborator error counts as an empty capture.
    pub fn capture(&mut self, source: &mut dyn FragmentCapture) -> CaptureOutcome {
        match source.capture_fragment() {
            Ok(raw) => self.record(&raw),
            Err(err) => {
                tracing::debug!("fragment capture failed: {err:#}");
                self.record("")
            }
        }
    }
}
