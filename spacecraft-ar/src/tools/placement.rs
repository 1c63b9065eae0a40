//! Turns bus actions into placed content.
//!
//! The controller subscribes to the [`ActionBus`] for the whole session; the
//! handler only forwards into a channel that a main-schedule system drains,
//! so all scene mutation happens on the main thread. Place actions need an
//! enabled reticle and are dropped otherwise.
//!
//! The ISS composite (Earth plus an orbiting station) is the one placement
//! with live data: after it is placed the station's offset is driven by the
//! remote position service, first immediately and then on a fixed refresh.
//! Position results can arrive after the composite was cleared or out of
//! order, so every fix is checked against the graph and the newest applied
//! sequence before it touches anything. The orbit radius is read from the
//! Earth's current extent on every fix, so it follows the measured scene
//! bounds and a swap to the fallback cube.

use crate::engine::assets::model_catalog::{AssetLoader, CatalogAssetLoader, ModelCatalog};
use crate::engine::core::session::SessionConfig;
use crate::engine::reticle::ReticleTracker;
use crate::engine::scene_graph::{AnchorId, EntityId, MaterialOverride, ModelEntity, SceneGraph, Visual};
use crate::engine::spatial::{Pose, geo_to_cartesian, orbit_radius};
use crate::services::position::{GeoPosition, PositionServiceHandle, PositionTask};
use crate::tools::action_bus::{ActionBus, ActionEvent, Subscription};
use bevy::prelude::*;
use constants::models::*;
use crossbeam_channel::{Receiver, unbounded};
use std::collections::HashMap;

/// Fixed presentation for one catalog model.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ModelPolicy {
    key: &'static str,
    scale: f32,
    material: Option<MaterialOverride>,
}

impl ModelPolicy {
    const fn new(key: &'static str, scale: f32) -> Self {
        Self {
            key,
            scale,
            material: None,
        }
    }
}

const LUNAR_ROVER: ModelPolicy = ModelPolicy::new("lunar_rover", LUNAR_ROVER_SCALE);
const LUNAR_LANDER: ModelPolicy = ModelPolicy {
    key: "apollo_lunar_module",
    scale: LUNAR_LANDER_SCALE,
    material: Some(MaterialOverride::WhiteMetallic),
};
const COMPOSITE_EARTH: ModelPolicy = ModelPolicy::new("earth", EARTH_COMPOSITE_SCALE);
const COMPOSITE_ISS: ModelPolicy = ModelPolicy::new("iss", ISS_COMPOSITE_SCALE);
const STANDALONE_ISS: ModelPolicy = ModelPolicy::new("iss", ISS_STANDALONE_SCALE);
const SATURN_V: ModelPolicy = ModelPolicy::new("saturn_v", SATURN_V_SCALE);
const JWST: ModelPolicy = ModelPolicy::new("jwst", JWST_SCALE);
const ICESAT: ModelPolicy = ModelPolicy::new("icesat_2", ICESAT_SCALE);

enum Placement {
    Single(ModelPolicy),
    IssComposite,
}

fn placement_for(event: ActionEvent) -> Option<Placement> {
    match event {
        ActionEvent::RemoveAllAnchors => None,
        ActionEvent::PlaceLunarRover => Some(Placement::Single(LUNAR_ROVER)),
        ActionEvent::PlaceLunarLander => Some(Placement::Single(LUNAR_LANDER)),
        ActionEvent::PlaceIss => Some(Placement::IssComposite),
        ActionEvent::PlaceEarth => Some(Placement::Single(STANDALONE_ISS)),
        ActionEvent::PlaceSaturnV => Some(Placement::Single(SATURN_V)),
        ActionEvent::PlaceJwst => Some(Placement::Single(JWST)),
        ActionEvent::PlaceIceSat => Some(Placement::Single(ICESAT)),
    }
}

/// Satellite whose local offset follows live coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitTarget {
    pub anchor: AnchorId,
    /// Body the satellite circles.
    pub centre: EntityId,
    pub satellite: EntityId,
    pub radius_factor: f32,
}

impl OrbitTarget {
    pub fn radius(&self, graph: &SceneGraph) -> Option<f32> {
        centre_radius(graph, self.centre, self.radius_factor)
    }
}

fn centre_radius(graph: &SceneGraph, centre: EntityId, factor: f32) -> Option<f32> {
    graph
        .entity(centre)
        .map(|body| orbit_radius(body.visual_extent().x, factor))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementOutcome {
    Placed {
        anchor: AnchorId,
        orbit: Option<OrbitTarget>,
    },
    /// Place requested with no surface under the reticle.
    Dropped,
    Cleared(usize),
}

#[derive(Resource)]
pub struct PlacementController {
    inbox: Receiver<ActionEvent>,
    _subscription: Subscription,
    orbit_radius_factor: f32,
}

impl PlacementController {
    pub fn subscribe(bus: &ActionBus, config: &SessionConfig) -> Self {
        let (tx, rx) = unbounded();
        let subscription = bus.subscribe(move |event| {
            // Receiver lives as long as the subscription.
            let _ = tx.send(*event);
        });

        Self {
            inbox: rx,
            _subscription: subscription,
            orbit_radius_factor: config.orbit_radius_factor,
        }
    }

    /// Actions published since the last drain, in publish order.
    pub fn drain(&self) -> impl Iterator<Item = ActionEvent> + '_ {
        self.inbox.try_iter()
    }

    pub fn handle(
        &self,
        event: ActionEvent,
        tracker: &ReticleTracker,
        graph: &mut SceneGraph,
        loader: &dyn AssetLoader,
    ) -> PlacementOutcome {
        let Some(placement) = placement_for(event) else {
            return PlacementOutcome::Cleared(graph.remove_all_except_reticle());
        };

        let Some(pose) = tracker.placement_pose() else {
            debug!("{event:?} dropped: no surface under the reticle");
            return PlacementOutcome::Dropped;
        };

        match placement {
            Placement::Single(policy) => {
                let entity = load_entity(graph, loader, policy);
                info!("Placed {} at {:?}", entity.name, pose.translation);
                let anchor = graph.add_anchor(pose, entity);
                PlacementOutcome::Placed {
                    anchor,
                    orbit: None,
                }
            }
            Placement::IssComposite => self.place_iss_composite(pose, graph, loader),
        }
    }

    fn place_iss_composite(
        &self,
        pose: Pose,
        graph: &mut SceneGraph,
        loader: &dyn AssetLoader,
    ) -> PlacementOutcome {
        let earth = load_entity(graph, loader, COMPOSITE_EARTH);
        let iss = load_entity(graph, loader, COMPOSITE_ISS);

        let radius = orbit_radius(earth.visual_extent().x, self.orbit_radius_factor);
        let centre = earth.id();
        let satellite = iss.id();
        let anchor = graph.add_composite_anchor(pose, earth, vec![iss]);
        info!("Placed ISS composite at {:?}, orbit radius {radius:.4}", pose.translation);

        PlacementOutcome::Placed {
            anchor,
            orbit: Some(OrbitTarget {
                anchor,
                centre,
                satellite,
                radius_factor: self.orbit_radius_factor,
            }),
        }
    }
}

/// Load `policy.key` and apply its presentation. Any load failure yields the
/// fallback cube so placement always shows something.
fn load_entity(graph: &mut SceneGraph, loader: &dyn AssetLoader, policy: ModelPolicy) -> ModelEntity {
    let id = graph.allocate_entity_id();

    match loader.load(policy.key) {
        Ok(model) => {
            let mut entity = ModelEntity::new(id, model.name, model.visual, model.local_extent);
            entity.transform.scale = Vec3::splat(policy.scale);
            entity.material = policy.material;
            entity
        }
        Err(err) => {
            warn!("{}: {err}; substituting fallback cube", policy.key);
            fallback_cube(id, policy.key)
        }
    }
}

pub fn fallback_cube(id: EntityId, name: &str) -> ModelEntity {
    let visual = Visual::Scene {
        path: String::new(),
    };
    let mut entity = ModelEntity::new(id, name, visual, Vec3::ONE);
    degrade_to_fallback(&mut entity);
    entity
}

/// Turn `entity` into the fallback cube in place. Position and orientation
/// are kept; the model's scale and material policy no longer apply.
pub fn degrade_to_fallback(entity: &mut ModelEntity) {
    entity.visual = Visual::FallbackCube {
        size: FALLBACK_CUBE_SIZE,
        colour: FALLBACK_CUBE_COLOUR,
    };
    entity.local_extent = Vec3::splat(FALLBACK_CUBE_SIZE);
    entity.transform.scale = Vec3::ONE;
    entity.material = None;
}

/// Ticket for one position request against one satellite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixRequest {
    pub satellite: EntityId,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub request: FixRequest,
    pub position: GeoPosition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    Applied(Vec3),
    /// A newer fix has already been applied.
    Stale,
    /// The satellite was removed while the request was in flight.
    TargetGone,
}

#[derive(Debug, Clone, Copy)]
struct OrbitSlot {
    centre: EntityId,
    radius_factor: f32,
    last_requested_secs: f64,
    applied_sequence: Option<u64>,
    last_fix: Option<GeoPosition>,
    /// Radius the satellite was last placed at.
    fitted_radius: f32,
}

/// Live-positioned satellites and their request bookkeeping.
#[derive(Resource, Debug, Default)]
pub struct OrbitRegistry {
    slots: HashMap<EntityId, OrbitSlot>,
    next_sequence: u64,
}

impl OrbitRegistry {
    /// Track `target` and issue its first request.
    pub fn register(&mut self, target: OrbitTarget, now_secs: f64) -> FixRequest {
        self.slots.insert(
            target.satellite,
            OrbitSlot {
                centre: target.centre,
                radius_factor: target.radius_factor,
                last_requested_secs: now_secs,
                applied_sequence: None,
                last_fix: None,
                fitted_radius: 0.0,
            },
        );
        self.issue(target.satellite)
    }

    /// Requests for satellites whose refresh interval has elapsed.
    pub fn due_refreshes(&mut self, now_secs: f64, interval_secs: f64) -> Vec<FixRequest> {
        let mut due: Vec<EntityId> = self
            .slots
            .iter_mut()
            .filter(|(_, slot)| now_secs - slot.last_requested_secs >= interval_secs)
            .map(|(id, slot)| {
                slot.last_requested_secs = now_secs;
                *id
            })
            .collect();
        due.sort();
        due.into_iter().map(|id| self.issue(id)).collect()
    }

    /// Forget satellites no longer in the graph.
    pub fn prune(&mut self, graph: &SceneGraph) -> usize {
        let before = self.slots.len();
        self.slots.retain(|id, _| graph.contains_entity(*id));
        before - self.slots.len()
    }

    pub fn apply(&mut self, fix: PositionFix, graph: &mut SceneGraph) -> FixOutcome {
        let satellite = fix.request.satellite;
        let Some(slot) = self.slots.get(&satellite).copied() else {
            return FixOutcome::TargetGone;
        };
        let radius = match centre_radius(graph, slot.centre, slot.radius_factor) {
            Some(radius) if graph.contains_entity(satellite) => radius,
            _ => {
                self.slots.remove(&satellite);
                return FixOutcome::TargetGone;
            }
        };
        if slot
            .applied_sequence
            .is_some_and(|applied| applied >= fix.request.sequence)
        {
            return FixOutcome::Stale;
        }

        let offset = geo_to_cartesian(fix.position.latitude, fix.position.longitude, radius);
        let Some(entity) = graph.entity_mut(satellite) else {
            return FixOutcome::TargetGone;
        };
        entity.transform.translation = offset;
        self.slots.insert(
            satellite,
            OrbitSlot {
                applied_sequence: Some(fix.request.sequence),
                last_fix: Some(fix.position),
                fitted_radius: radius,
                ..slot
            },
        );
        FixOutcome::Applied(offset)
    }

    /// Move satellites whose centre body changed size since their last fix
    /// back onto the orbit for its new extent. Returns how many moved.
    pub fn refit(&mut self, graph: &mut SceneGraph) -> usize {
        let mut moved = 0;
        for (satellite, slot) in &mut self.slots {
            let Some(position) = slot.last_fix else {
                continue;
            };
            let Some(radius) = centre_radius(graph, slot.centre, slot.radius_factor) else {
                continue;
            };
            if (radius - slot.fitted_radius).abs() < 1e-6 {
                continue;
            }
            if let Some(entity) = graph.entity_mut(*satellite) {
                entity.transform.translation =
                    geo_to_cartesian(position.latitude, position.longitude, radius);
                slot.fitted_radius = radius;
                moved += 1;
            }
        }
        moved
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn issue(&mut self, satellite: EntityId) -> FixRequest {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        FixRequest {
            satellite,
            sequence,
        }
    }
}

/// Position requests still in flight.
#[derive(Resource, Default)]
pub struct PendingPositionFixes {
    tasks: Vec<(FixRequest, PositionTask)>,
}

impl PendingPositionFixes {
    pub fn request(&mut self, request: FixRequest, service: &PositionServiceHandle) {
        debug!("Requesting position for {} (#{})", request.satellite, request.sequence);
        self.tasks.push((request, service.spawn_fetch()));
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

pub fn apply_placement_actions(
    controller: Res<PlacementController>,
    tracker: Res<ReticleTracker>,
    catalog: Option<Res<ModelCatalog>>,
    time: Res<Time>,
    service: Res<PositionServiceHandle>,
    mut graph: ResMut<SceneGraph>,
    mut orbits: ResMut<OrbitRegistry>,
    mut pending: ResMut<PendingPositionFixes>,
) {
    let loader = CatalogAssetLoader::new(catalog.as_deref());

    for event in controller.drain() {
        match controller.handle(event, &tracker, &mut graph, &loader) {
            PlacementOutcome::Placed {
                orbit: Some(target),
                ..
            } => {
                let request = orbits.register(target, time.elapsed_secs_f64());
                pending.request(request, &service);
            }
            PlacementOutcome::Cleared(removed) => {
                let stopped = orbits.prune(&graph);
                info!("Cleared {removed} placed anchor(s), stopped {stopped} live orbit(s)");
            }
            PlacementOutcome::Placed { orbit: None, .. } | PlacementOutcome::Dropped => {}
        }
    }
}

pub fn refresh_orbit_positions(
    time: Res<Time>,
    config: Res<SessionConfig>,
    service: Res<PositionServiceHandle>,
    mut graph: ResMut<SceneGraph>,
    mut orbits: ResMut<OrbitRegistry>,
    mut pending: ResMut<PendingPositionFixes>,
) {
    if orbits.is_empty() {
        return;
    }
    orbits.prune(&graph);
    let moved = orbits.refit(&mut graph);
    if moved > 0 {
        debug!("Refitted {moved} orbit(s) to the centre body's new extent");
    }
    for request in orbits.due_refreshes(time.elapsed_secs_f64(), config.iss_refresh_secs) {
        pending.request(request, &service);
    }
}

pub fn poll_position_fixes(
    mut pending: ResMut<PendingPositionFixes>,
    mut orbits: ResMut<OrbitRegistry>,
    mut graph: ResMut<SceneGraph>,
) {
    if pending.is_empty() {
        return;
    }

    let mut still_pending = Vec::with_capacity(pending.tasks.len());
    for (request, mut task) in pending.tasks.drain(..) {
        let Some(result) = task.poll() else {
            still_pending.push((request, task));
            continue;
        };

        match result {
            Ok(position) => {
                let fix = PositionFix { request, position };
                match orbits.apply(fix, &mut graph) {
                    FixOutcome::Applied(offset) => info!(
                        "ISS at lat {:.2}, lon {:.2} -> {offset:?}",
                        position.latitude, position.longitude
                    ),
                    FixOutcome::Stale => debug!("Discarded stale fix #{}", request.sequence),
                    FixOutcome::TargetGone => {
                        debug!("Discarded fix #{}: {} was removed", request.sequence, request.satellite)
                    }
                }
            }
            Err(err) => warn!("ISS position unavailable: {err}"),
        }
    }
    pending.tasks = still_pending;
}
