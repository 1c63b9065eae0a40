use crate::engine::reticle::{ReticleAnchorId, ReticleTracker};
use crate::engine::scene_graph::{AnchorId, EntityId, MaterialOverride, ModelEntity, SceneGraph, Visual};
use crate::tools::placement::degrade_to_fallback;
use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::math::primitives::{Cuboid, Sphere};
use bevy::prelude::*;
use bevy::render::alpha::AlphaMode;
use bevy::render::primitives::Aabb;
use constants::models::WHITE_METALLIC_COLOUR;
use constants::reticle::{RETICLE_COLOUR, RETICLE_RADIUS, RETICLE_SCALE};
use std::collections::HashSet;

/// World-space root mirroring one placed anchor.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRoot(pub AnchorId);

/// Child of an [`AnchorRoot`] mirroring one model entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentNode(pub EntityId);

/// Current reticle anchor. Replaced whenever the tracker re-anchors.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReticleRoot(pub ReticleAnchorId);

/// The reticle disc mesh; survives re-anchoring.
#[derive(Component)]
pub struct ReticleMarker;

/// Set on a content node once its spawned scene has been measured.
#[derive(Component)]
pub struct MeasuredBounds;

fn colour(c: [f32; 4]) -> Color {
    Color::srgba(c[0], c[1], c[2], c[3])
}

pub fn spawn_reticle(
    mut commands: Commands,
    tracker: Res<ReticleTracker>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let material = materials.add(StandardMaterial {
        base_color: colour(RETICLE_COLOUR),
        alpha_mode: AlphaMode::Blend,
        metallic: 0.0,
        perceptual_roughness: 1.0,
        ..default()
    });

    commands
        .spawn((
            ReticleRoot(tracker.anchor()),
            Transform::default(),
            Visibility::Hidden,
            Name::new("reticle_anchor"),
        ))
        .with_children(|parent| {
            parent.spawn((
                ReticleMarker,
                Mesh3d(meshes.add(Sphere::new(RETICLE_RADIUS))),
                MeshMaterial3d(material),
                Transform::from_scale(Vec3::from(RETICLE_SCALE)),
                Name::new("reticle"),
            ));
        });
}

/// Move the reticle, toggle its visibility and swap in a fresh anchor
/// when the tracker has re-anchored.
pub fn sync_reticle(
    mut commands: Commands,
    tracker: Res<ReticleTracker>,
    mut roots: Query<(Entity, &ReticleRoot, &mut Transform, &mut Visibility)>,
    markers: Query<Entity, With<ReticleMarker>>,
) {
    let Ok((root, tag, mut transform, mut visibility)) = roots.single_mut() else {
        return;
    };

    let reticle = tracker.reticle();
    let pose = reticle.pose().to_transform();
    let shown = if reticle.is_enabled() {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };

    if tag.0 != tracker.anchor() {
        let new_root = commands
            .spawn((
                ReticleRoot(tracker.anchor()),
                pose,
                shown,
                Name::new("reticle_anchor"),
            ))
            .id();
        for marker in &markers {
            commands.entity(new_root).add_child(marker);
        }
        commands.entity(root).despawn();
        return;
    }

    *transform = pose;
    *visibility = shown;
}

fn spawn_content(
    parent: &mut ChildSpawnerCommands,
    entity: &ModelEntity,
    asset_server: &AssetServer,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let mut node = parent.spawn((
        ContentNode(entity.id()),
        entity.transform,
        Visibility::default(),
        Name::new(entity.name.clone()),
    ));

    match &entity.visual {
        Visual::Scene { path } => {
            node.insert(SceneRoot(
                asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.clone())),
            ));
        }
        Visual::FallbackCube { size, colour: c } => {
            node.insert(fallback_cube_bundle(*size, *c, meshes, materials));
        }
    }

    if let Some(material) = entity.material {
        node.insert(material);
    }
}

fn fallback_cube_bundle(
    size: f32,
    c: [f32; 4],
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> (Mesh3d, MeshMaterial3d<StandardMaterial>) {
    (
        Mesh3d(meshes.add(Cuboid::from_length(size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: colour(c),
            metallic: 1.0,
            ..default()
        })),
    )
}

/// Mirror the scene graph into Bevy entities: spawn new anchors, despawn
/// cleared ones and copy entity transforms. Runs only when the graph's
/// revision moved.
pub fn sync_scene_graph(
    mut commands: Commands,
    graph: Res<SceneGraph>,
    mut last_revision: Local<Option<u64>>,
    roots: Query<(Entity, &AnchorRoot)>,
    mut nodes: Query<(&ContentNode, &mut Transform)>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if *last_revision == Some(graph.revision()) {
        return;
    }
    *last_revision = Some(graph.revision());

    let mut spawned = HashSet::new();
    for (root, AnchorRoot(id)) in &roots {
        if graph.anchor(*id).is_some() {
            spawned.insert(*id);
        } else {
            commands.entity(root).despawn();
        }
    }

    for (ContentNode(id), mut transform) in &mut nodes {
        if let Some(entity) = graph.entity(*id) {
            if *transform != entity.transform {
                *transform = entity.transform;
            }
        }
    }

    for anchor in graph.anchors().filter(|a| !spawned.contains(&a.id())) {
        debug!("Spawning {} ({})", anchor.id(), anchor.primary().name);
        commands
            .spawn((
                AnchorRoot(anchor.id()),
                anchor.pose().to_transform(),
                Visibility::default(),
                Name::new(anchor.id().to_string()),
            ))
            .with_children(|parent| {
                for entity in anchor.entities() {
                    spawn_content(parent, entity, &asset_server, &mut meshes, &mut materials);
                }
            });
    }
}

/// Swap glTF scenes that failed to load for the fallback cube, in the graph
/// and on screen.
pub fn replace_failed_scenes(
    mut commands: Commands,
    nodes: Query<(Entity, &ContentNode, &SceneRoot)>,
    asset_server: Res<AssetServer>,
    mut graph: ResMut<SceneGraph>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (node, ContentNode(id), scene) in &nodes {
        if !asset_server.load_state(&scene.0).is_failed() {
            continue;
        }

        let Some(entity) = graph.entity_mut(*id) else {
            continue;
        };
        warn!("{} failed to load; substituting fallback cube", entity.name);
        degrade_to_fallback(entity);

        let Visual::FallbackCube { size, colour: c } = entity.visual else {
            continue;
        };
        commands
            .entity(node)
            .remove::<(SceneRoot, MaterialOverride)>()
            .insert(fallback_cube_bundle(size, c, &mut meshes, &mut materials));
    }
}

/// Size of the box around `meshes`, in the space of `node` before its own
/// scale. `None` while no mesh has bounds yet.
pub fn scene_extent<'a>(
    node: &GlobalTransform,
    meshes: impl IntoIterator<Item = (&'a Aabb, &'a GlobalTransform)>,
) -> Option<Vec3> {
    let to_node = node.affine().inverse();
    let mut min = Vec3::MAX;
    let mut max = Vec3::MIN;
    let mut any = false;

    for (aabb, mesh) in meshes {
        let centre = Vec3::from(aabb.center);
        let half = Vec3::from(aabb.half_extents);
        for corner in 0..8u8 {
            let sign = Vec3::new(
                if corner & 1 == 0 { -1.0 } else { 1.0 },
                if corner & 2 == 0 { -1.0 } else { 1.0 },
                if corner & 4 == 0 { -1.0 } else { 1.0 },
            );
            let point = to_node.transform_point3(mesh.transform_point(centre + half * sign));
            min = min.min(point);
            max = max.max(point);
            any = true;
        }
    }

    any.then(|| max - min)
}

/// Replace the authored extent of each loaded scene with the bounds of the
/// meshes it actually spawned.
pub fn measure_scene_bounds(
    mut commands: Commands,
    nodes: Query<(Entity, &ContentNode, &GlobalTransform), (With<SceneRoot>, Without<MeasuredBounds>)>,
    children: Query<&Children>,
    meshes: Query<(&Aabb, &GlobalTransform)>,
    mut graph: ResMut<SceneGraph>,
) {
    for (node, ContentNode(id), node_xf) in &nodes {
        let bounds = children
            .iter_descendants(node)
            .filter_map(|descendant| meshes.get(descendant).ok());
        let Some(extent) = scene_extent(node_xf, bounds) else {
            continue;
        };

        commands.entity(node).insert(MeasuredBounds);
        if let Some(entity) = graph.entity_mut(*id) {
            debug!("Measured {} at {extent:?} (authored {:?})", entity.name, entity.local_extent);
            entity.local_extent = extent;
        }
    }
}

/// Give every mesh under a content node with a material override the
/// override's material. Scene meshes appear a few frames after the node,
/// so this watches for newly added materials.
pub fn apply_material_overrides(
    mut commands: Commands,
    added: Query<Entity, Added<MeshMaterial3d<StandardMaterial>>>,
    parents: Query<&ChildOf>,
    overrides: Query<&MaterialOverride>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut white_metallic: Local<Option<Handle<StandardMaterial>>>,
) {
    for mesh in &added {
        let Some(material) = parents
            .iter_ancestors(mesh)
            .find_map(|ancestor| overrides.get(ancestor).ok())
        else {
            continue;
        };

        let handle = match material {
            MaterialOverride::WhiteMetallic => white_metallic
                .get_or_insert_with(|| {
                    materials.add(StandardMaterial {
                        base_color: colour(WHITE_METALLIC_COLOUR),
                        metallic: 1.0,
                        perceptual_roughness: 0.3,
                        ..default()
                    })
                })
                .clone(),
        };
        commands.entity(mesh).insert(MeshMaterial3d(handle));
    }
}
