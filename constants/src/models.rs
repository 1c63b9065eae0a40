/// Lunar roving vehicle is authored at real-world scale.
pub const LUNAR_ROVER_SCALE: f32 = 1.0;

/// Apollo lunar module.
pub const LUNAR_LANDER_SCALE: f32 = 0.1;

/// Earth globe when placed as part of the ISS composite.
pub const EARTH_COMPOSITE_SCALE: f32 = 0.0007;

/// Space station orbiting the composite Earth.
pub const ISS_COMPOSITE_SCALE: f32 = 0.00007;

/// Space station placed on its own.
pub const ISS_STANDALONE_SCALE: f32 = 0.001;

pub const SATURN_V_SCALE: f32 = 0.1;
pub const JWST_SCALE: f32 = 0.1;
pub const ICESAT_SCALE: f32 = 0.1;

/// Edge length (metres) of the cube substituted for a model that failed to load.
pub const FALLBACK_CUBE_SIZE: f32 = 0.1;

/// Linear RGBA of the fallback cube.
pub const FALLBACK_CUBE_COLOUR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Base colour applied to models with the white metallic override.
pub const WHITE_METALLIC_COLOUR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Catalog manifest path relative to the asset root.
pub const MODEL_CATALOG_PATH: &str = "models/catalog.json";
