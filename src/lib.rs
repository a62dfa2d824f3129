pub mod behavior;
pub mod capture;
pub mod config;
pub mod dictionary;
pub mod estimator;
pub mod executor;
pub mod interfaces;
pub mod keyboard;
pub mod logging;
pub mod model;
mod persist;
pub mod planner;
pub mod playback;
pub mod positions;
pub mod selector;
pub mod session;
pub mod sim;
pub mod trace;
