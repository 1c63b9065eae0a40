//! Core application setup and session wiring.
//!
//! Builds the Bevy app, installs the AR session plugin and holds the
//! session configuration.

/// Application setup: default plugins, lighting, camera and simulated surfaces.
pub mod app_setup;

/// Plugin registering the placement core's resources, events and systems.
pub mod ar_session;

/// Session tunables built from the constants crate and the environment.
pub mod session;

/// Native window configuration.
pub mod window_config;
