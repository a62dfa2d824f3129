pub mod backends;
pub mod util;

use anyhow::{anyhow, Result};

use crate::config::AppConfig;
use crate::positions::Positions;
use crate::session::Collaborators;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    X11,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> PlaybackBackend {
    // Game windows under Wayland still run through Xwayland, so DISPLAY is what matters.
    if env_is_set("DISPLAY") {
        return PlaybackBackend::X11;
    }
    PlaybackBackend::Auto
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();
    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected DISPLAY for X11 or Xwayland).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn require_supported_backend(
    #[allow(unused_variables)] selected: PlaybackBackend,
    resolved: PlaybackBackend,
) -> Result<()> {
    match resolved {
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(())
            }

            #[cfg(not(feature = "x11"))]
            {
                let how = match selected {
                    PlaybackBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {details}",
                    details = backend_unavailable_message()
                ))
            }
        }
        PlaybackBackend::Auto => {
            let hint = if cfg!(feature = "x11") {
                "Try `--backend x11` with DISPLAY pointing at the game's X server."
            } else {
                "This build has no playback backends enabled."
            };
            Err(anyhow!(
                "No supported playback backend detected. {details}\n{hint}",
                details = backend_unavailable_message(),
            ))
        }
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let resolved = match requested {
        PlaybackBackend::Auto => auto_backend(),
        other => other,
    };

    require_supported_backend(requested, resolved)?;
    Ok(resolved)
}

/// Similarity of two grey-level grabs of the same region: 1 minus the mean absolute
/// difference over 255, clamped to [0, 1]. Grabs of different sizes never match.
pub fn grey_similarity(reference: &[u8], current: &[u8]) -> f64 {
    if reference.len() != current.len() {
        return 0.0;
    }
    if reference.is_empty() {
        return 1.0;
    }

    let total: u64 = reference
        .iter()
        .zip(current)
        .map(|(a, b)| u64::from(a.abs_diff(*b)))
        .sum();
    let mean = total as f64 / reference.len() as f64;
    (1.0 - mean / 255.0).clamp(0.0, 1.0)
}

/// Connect the real collaborators for `backend`.
pub fn connect_collaborators(
    backend: PlaybackBackend,
    cfg: &AppConfig,
    positions: &Positions,
) -> Result<Collaborators> {
    #[cfg(not(feature = "x11"))]
    let _ = (cfg, positions);

    match resolve_backend(backend)? {
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                backends::x11::connect(cfg, positions)
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}
