use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber: stderr always, plus an appending plain-text mirror at
/// `log_file` when given. `RUST_LOG` overrides the default `info` filter.
///
/// Calling it twice is harmless; the first subscriber wins.
pub fn init(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let mirror = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(err) => {
                eprintln!(
                    "failed to open log file {}: {err}; logging to stderr only",
                    path.display()
                );
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(mirror)
        .try_init();
}
