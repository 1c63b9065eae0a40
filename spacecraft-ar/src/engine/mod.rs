pub mod assets;
pub mod camera;
pub mod core;
pub mod reticle;
pub mod scene;
pub mod scene_graph;
pub mod spatial;
pub mod tracking;
