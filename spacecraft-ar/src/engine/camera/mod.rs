//! Desktop stand-in for a handheld AR camera.
//!
//! On a device the tracker moves the camera; on desktop the user does, with
//! right-drag look and WASD/QE movement, so the reticle can be swept across
//! the simulated planes.

/// Fly camera resource and controller system.
pub mod desktop_camera;
