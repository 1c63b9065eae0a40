use crate::engine::scene_graph::Visual;
use bevy::prelude::*;
use constants::models::MODEL_CATALOG_PATH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned bounds in model-local units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsData {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl BoundsData {
    pub fn size(&self) -> Vec3 {
        Vec3::new(
            (self.max_x - self.min_x) as f32,
            (self.max_y - self.min_y) as f32,
            (self.max_z - self.min_z) as f32,
        )
    }
}

/// One placeable model: logical key, glTF path and authored bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub key: String,
    pub display_name: String,
    pub path: String, // Relative to the asset root.
    pub local_bounds: BoundsData,
}

/// Manifest of placeable models, loaded from JSON as a Bevy asset and
/// promoted to a resource once ready.
#[derive(Asset, Debug, Clone, Serialize, Deserialize, TypePath, Resource)]
pub struct ModelCatalog {
    pub models: Vec<ModelDefinition>,
}

impl ModelCatalog {
    pub fn get(&self, key: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.key == key)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("model catalog has not finished loading")]
    CatalogNotLoaded,
}

/// Result of a successful synchronous load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub name: String,
    pub visual: Visual,
    pub local_extent: Vec3,
}

/// Resolves a logical model key to something that can be shown.
/// Failing loads have no side effects. A resolved scene can still fail to
/// decode later; that surfaces through the asset server's load state.
pub trait AssetLoader {
    fn load(&self, key: &str) -> Result<LoadedModel, AssetError>;
}

/// Resolves keys against the catalog. The extent is the authored bounds until
/// the spawned scene has been measured.
pub struct CatalogAssetLoader<'a> {
    catalog: Option<&'a ModelCatalog>,
}

impl<'a> CatalogAssetLoader<'a> {
    pub fn new(catalog: Option<&'a ModelCatalog>) -> Self {
        Self { catalog }
    }
}

impl AssetLoader for CatalogAssetLoader<'_> {
    fn load(&self, key: &str) -> Result<LoadedModel, AssetError> {
        let catalog = self.catalog.ok_or(AssetError::CatalogNotLoaded)?;
        let definition = catalog
            .get(key)
            .ok_or_else(|| AssetError::UnknownModel(key.to_string()))?;

        Ok(LoadedModel {
            name: definition.display_name.clone(),
            visual: Visual::Scene {
                path: definition.path.clone(),
            },
            local_extent: definition.local_bounds.size(),
        })
    }
}

#[derive(Resource, Default)]
pub struct CatalogLoader {
    handle: Option<Handle<ModelCatalog>>,
    loaded: bool,
}

pub fn start_catalog_loading(mut loader: ResMut<CatalogLoader>, asset_server: Res<AssetServer>) {
    loader.handle = Some(asset_server.load(MODEL_CATALOG_PATH));
}

/// Promote the catalog asset to a resource once it is available.
pub fn load_catalog_system(
    mut loader: ResMut<CatalogLoader>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    catalogs: Res<Assets<ModelCatalog>>,
) {
    if loader.loaded {
        return;
    }

    let Some(handle) = loader.handle.clone() else {
        return;
    };

    if let Some(catalog) = catalogs.get(&handle) {
        info!("Model catalog loaded ({} models)", catalog.models.len());
        commands.insert_resource(catalog.clone());
        loader.loaded = true;
    } else if asset_server.load_state(&handle).is_failed() {
        warn!(
            "Model catalog {} failed to load; placements will use fallback cubes",
            MODEL_CATALOG_PATH
        );
        loader.loaded = true;
    }
}
