mod common;

use std::fs;
use std::io;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use common::scratch_dir;

use wordbomb::config::{self, AppConfig, ConfigError, SelectionMode, SpeedProfile};
use wordbomb::positions::{self, Point, Positions, Rect};

#[test]
fn config_round_trips_through_disk() {
    let dir = scratch_dir("config_round_trips_through_disk");
    let path = dir.join("nested").join("config.json");

    let mut cfg = AppConfig::default();
    cfg.mode = SelectionMode::Alphabet;
    cfg.repeat_cooldown = 9;
    cfg.humanize.speed_profile = SpeedProfile::Gradual;
    cfg.humanize.custom_phrases = vec!["deixa comigo".to_string()];

    config::save(&path, &cfg).unwrap();

    assert_eq!(config::load(&path), cfg);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = scratch_dir("partial_file_fills_in_defaults");
    let path = dir.join("config.json");
    fs::write(&path, r#"{ "mode": "short", "humanize": { "rehearsal_chance": 0.5 } }"#).unwrap();

    let cfg = config::load(&path);

    assert_eq!(cfg.mode, SelectionMode::Short);
    assert_eq!(cfg.humanize.rehearsal_chance, 0.5);
    assert_eq!(cfg.show_top, AppConfig::default().show_top);
    assert_eq!(
        cfg.humanize.filler_phrase_chance,
        AppConfig::default().humanize.filler_phrase_chance
    );
}

#[test]
fn malformed_or_invalid_files_fall_back_to_defaults() {
    let dir = scratch_dir("malformed_or_invalid_files_fall_back_to_defaults");

    let garbage = dir.join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(
        config::try_load(&garbage),
        Err(ConfigError::Parse { .. })
    ));
    assert_eq!(config::load(&garbage), AppConfig::default());

    let invalid = dir.join("invalid.json");
    fs::write(&invalid, r#"{ "humanize": { "error_chance": 3.0 } }"#).unwrap();
    let err = config::try_load(&invalid).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert!(err.to_string().contains("error_chance"));
    assert_eq!(config::load(&invalid), AppConfig::default());
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_captured_log<T>(f: impl FnOnce() -> T) -> (T, String) {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, log.text())
}

#[test]
fn malformed_config_error_is_held_until_reported() {
    let dir = scratch_dir("malformed_config_error_is_held_until_reported");
    let garbage = dir.join("config.json");
    fs::write(&garbage, "{ not json").unwrap();

    let ((cfg, err), quiet) = with_captured_log(|| config::load_or_default(&garbage));
    assert_eq!(cfg, AppConfig::default());
    assert!(quiet.is_empty());
    let err = err.expect("parse error is returned");
    assert!(matches!(err, ConfigError::Parse { .. }));

    let ((), reported) = with_captured_log(|| config::report_fallback(&err));
    assert!(reported.contains("WARN"));
    assert!(reported.contains("failed to parse"));
    assert!(reported.contains("using default configuration"));
}

#[test]
fn lenient_loads_log_their_fallbacks() {
    let dir = scratch_dir("lenient_loads_log_their_fallbacks");
    let garbage = dir.join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();

    let (cfg, log) = with_captured_log(|| config::load(&garbage));
    assert_eq!(cfg, AppConfig::default());
    assert!(log.contains("using default configuration"));

    let (pos, log) = with_captured_log(|| positions::load(&garbage));
    assert_eq!(pos, Positions::default());
    assert!(log.contains("using default positions"));

    let absent = dir.join("absent.json");
    let ((cfg, err), log) = with_captured_log(|| config::load_or_default(&absent));
    assert_eq!(cfg, AppConfig::default());
    assert!(err.is_none());
    assert!(log.is_empty());
}

#[test]
fn missing_config_is_none_then_defaults() {
    let dir = scratch_dir("missing_config_is_none_then_defaults");
    let path = dir.join("absent.json");

    assert!(config::try_load(&path).unwrap().is_none());
    assert_eq!(config::load(&path), AppConfig::default());
}

#[test]
fn positions_round_trip_and_default_on_garbage() {
    let dir = scratch_dir("positions_round_trip_and_default_on_garbage");
    let path = dir.join("posicoes.json");

    let saved = Positions {
        letters: Point::new(10, 20),
        chatbox: Point::new(30, 40),
        turn_bar: Rect {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
        },
    };
    positions::save(&path, &saved).unwrap();
    assert_eq!(positions::load(&path), saved);

    fs::write(&path, "[]").unwrap();
    assert_eq!(positions::load(&path), Positions::default());
}
