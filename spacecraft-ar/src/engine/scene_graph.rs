//! Anchor store for placed content.
//!
//! Anchors live in a `Vec` arena in insertion order. [`AnchorId`]s increase
//! monotonically and anchors are only ever removed all at once, so an id maps
//! to its slot by subtracting the id of the first live anchor. The most
//! recently placed anchor is cached
//! as the active manipulation target. The reticle's anchor is owned by the
//! reticle tracker and never enters this store, which is what lets
//! [`SceneGraph::remove_all_except_reticle`] clear the whole arena.

use crate::engine::spatial::Pose;
use bevy::prelude::*;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// What gets drawn for a content entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// glTF scene path relative to the asset root.
    Scene { path: String },
    /// Substitute shown when a model could not be loaded.
    FallbackCube { size: f32, colour: [f32; 4] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub enum MaterialOverride {
    WhiteMetallic,
}

/// A loaded model placed under an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntity {
    id: EntityId,
    pub name: String,
    pub visual: Visual,
    /// Size of the model's local bounding box before `transform.scale`.
    pub local_extent: Vec3,
    pub transform: Transform,
    pub material: Option<MaterialOverride>,
}

impl ModelEntity {
    pub fn new(id: EntityId, name: impl Into<String>, visual: Visual, local_extent: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            visual,
            local_extent,
            transform: Transform::IDENTITY,
            material: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Bounding box size after scale, relative to the parent anchor.
    pub fn visual_extent(&self) -> Vec3 {
        self.local_extent * self.transform.scale.abs()
    }
}

/// A world-space root owning one primary content entity. Composite placements
/// carry extra satellite entities beside the primary one.
#[derive(Debug, Clone)]
pub struct Anchor {
    id: AnchorId,
    pose: Pose,
    primary: ModelEntity,
    satellites: Vec<ModelEntity>,
}

impl Anchor {
    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn primary(&self) -> &ModelEntity {
        &self.primary
    }

    pub fn satellites(&self) -> &[ModelEntity] {
        &self.satellites
    }

    pub fn entities(&self) -> impl Iterator<Item = &ModelEntity> {
        std::iter::once(&self.primary).chain(self.satellites.iter())
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut ModelEntity> {
        if self.primary.id == id {
            return Some(&mut self.primary);
        }
        self.satellites.iter_mut().find(|e| e.id == id)
    }
}

#[derive(Resource, Debug, Default)]
pub struct SceneGraph {
    anchors: Vec<Anchor>,
    /// Id of `anchors[0]`.
    first_anchor: u64,
    entity_index: HashMap<EntityId, AnchorId>,
    active_target: Option<AnchorId>,
    next_anchor: u64,
    next_entity: u64,
    revision: u64,
}

impl SceneGraph {
    /// Reserve an id for an entity about to be placed.
    pub fn allocate_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Create an anchor at `pose` owning `entity` and make it the active target.
    pub fn add_anchor(&mut self, pose: Pose, entity: ModelEntity) -> AnchorId {
        self.add_composite_anchor(pose, entity, Vec::new())
    }

    pub fn add_composite_anchor(
        &mut self,
        pose: Pose,
        primary: ModelEntity,
        satellites: Vec<ModelEntity>,
    ) -> AnchorId {
        let id = AnchorId(self.next_anchor);
        self.next_anchor += 1;

        self.entity_index.insert(primary.id, id);
        for satellite in &satellites {
            self.entity_index.insert(satellite.id, id);
        }

        self.anchors.push(Anchor {
            id,
            pose,
            primary,
            satellites,
        });
        self.active_target = Some(id);
        self.revision += 1;
        id
    }

    /// Drop every placed anchor. The reticle anchor is not stored here, so it
    /// is untouched. Returns how many anchors were removed.
    pub fn remove_all_except_reticle(&mut self) -> usize {
        let removed = self.anchors.len();
        if removed > 0 {
            self.anchors.clear();
            self.first_anchor = self.next_anchor;
            self.entity_index.clear();
            self.active_target = None;
            self.revision += 1;
        }
        removed
    }

    /// Primary entity of the most recently placed anchor.
    pub fn last_placed_entity(&self) -> Option<&ModelEntity> {
        self.active_target
            .and_then(|id| self.anchor(id))
            .map(Anchor::primary)
    }

    /// Bumped on every structural or transform change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(self.slot(id)?)
    }

    fn slot(&self, id: AnchorId) -> Option<usize> {
        let offset = id.0.checked_sub(self.first_anchor)?;
        usize::try_from(offset).ok()
    }

    /// Anchors in placement order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entity_index.contains_key(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&ModelEntity> {
        let anchor = self.anchor(*self.entity_index.get(&id)?)?;
        anchor.entities().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut ModelEntity> {
        let slot = self.slot(*self.entity_index.get(&id)?)?;
        let entity = self.anchors.get_mut(slot)?.entity_mut(id)?;
        self.revision += 1;
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(graph: &mut SceneGraph, name: &str) -> ModelEntity {
        let id = graph.allocate_entity_id();
        ModelEntity::new(
            id,
            name,
            Visual::Scene {
                path: format!("models/{name}.glb"),
            },
            Vec3::ONE,
        )
    }

    #[test]
    fn test_last_placed_tracks_newest_anchor() {
        let mut graph = SceneGraph::default();
        assert!(graph.last_placed_entity().is_none());

        let rover = model(&mut graph, "rover");
        graph.add_anchor(Pose::IDENTITY, rover);
        let jwst = model(&mut graph, "jwst");
        let jwst_id = jwst.id();
        let anchor = graph.add_anchor(Pose::from_translation(Vec3::X), jwst);

        assert_eq!(graph.anchors().last().map(Anchor::id), Some(anchor));
        assert_eq!(graph.last_placed_entity().map(ModelEntity::id), Some(jwst_id));
    }

    #[test]
    fn test_anchor_ids_follow_insertion_order() {
        let mut graph = SceneGraph::default();
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let m = model(&mut graph, name);
            ids.push(graph.add_anchor(Pose::IDENTITY, m));
        }
        let listed: Vec<_> = graph.anchors().map(Anchor::id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_remove_all_is_idempotent() {
        let mut graph = SceneGraph::default();
        for name in ["a", "b", "c"] {
            let m = model(&mut graph, name);
            graph.add_anchor(Pose::IDENTITY, m);
        }

        assert_eq!(graph.remove_all_except_reticle(), 3);
        assert_eq!(graph.anchor_count(), 0);
        assert!(graph.last_placed_entity().is_none());

        let revision = graph.revision();
        assert_eq!(graph.remove_all_except_reticle(), 0);
        assert_eq!(graph.anchor_count(), 0);
        assert_eq!(graph.revision(), revision);
    }

    #[test]
    fn test_ids_stay_valid_across_clear() {
        let mut graph = SceneGraph::default();
        let before = model(&mut graph, "rover");
        let stale = graph.add_anchor(Pose::IDENTITY, before);
        graph.remove_all_except_reticle();

        let after = model(&mut graph, "jwst");
        let fresh = graph.add_anchor(Pose::from_translation(Vec3::Y), after);
        assert_ne!(stale, fresh);
        assert!(graph.anchor(stale).is_none());
        assert_eq!(graph.anchor(fresh).map(|a| a.pose().translation), Some(Vec3::Y));
        assert_eq!(graph.last_placed_entity().map(|e| e.name.as_str()), Some("jwst"));
    }

    #[test]
    fn test_entity_lookup_covers_satellites() {
        let mut graph = SceneGraph::default();
        let earth = model(&mut graph, "earth");
        let iss = model(&mut graph, "iss");
        let iss_id = iss.id();
        graph.add_composite_anchor(Pose::IDENTITY, earth, vec![iss]);

        assert!(graph.contains_entity(iss_id));
        graph
            .entity_mut(iss_id)
            .expect("satellite registered")
            .transform
            .translation = Vec3::Z;
        assert_eq!(graph.entity(iss_id).map(|e| e.transform.translation), Some(Vec3::Z));

        graph.remove_all_except_reticle();
        assert!(graph.entity(iss_id).is_none());
        assert!(graph.entity_mut(iss_id).is_none());
    }

    #[test]
    fn test_visual_extent_applies_scale() {
        let mut graph = SceneGraph::default();
        let mut earth = model(&mut graph, "earth");
        earth.local_extent = Vec3::splat(400.0);
        earth.transform.scale = Vec3::splat(0.001);
        assert!((earth.visual_extent().x - 0.4).abs() < 1e-6);
    }
}
