/// Radius of the sphere mesh the reticle disc is squashed from.
pub const RETICLE_RADIUS: f32 = 0.1;

/// Non-uniform scale flattening the reticle sphere into a disc.
pub const RETICLE_SCALE: [f32; 3] = [1.0, 0.1, 1.0];

/// sRGBA of the reticle (94, 111, 186) at 60% opacity.
pub const RETICLE_COLOUR: [f32; 4] = [94.0 / 255.0, 111.0 / 255.0, 186.0 / 255.0, 0.6];

/// Minimum plane extent (x, z metres) the reticle anchor accepts.
pub const RETICLE_MIN_PLANE_BOUNDS: [f32; 2] = [0.2, 0.2];

/// Seconds between forced re-anchors of the reticle.
pub const REANCHOR_INTERVAL_SECS: f64 = 1.0;
