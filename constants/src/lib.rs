//! Shared tuning constants for the spacecraft AR session.
//!
//! Values were determined empirically against the authored models and the
//! tracking behaviour of handheld devices.

/// Per-model scale factors and fallback geometry.
pub mod models;

/// ISS orbit projection and the remote position store.
pub mod orbit;

/// Reticle look, anchor bounds and timing.
pub mod reticle;
