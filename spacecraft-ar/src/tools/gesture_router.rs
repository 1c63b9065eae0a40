//! Pinch and rotation handling for the most recently placed model.
//!
//! Each gesture kind runs its own Idle/Active machine. Begin snapshots the
//! target's current scale or rotation; every change is applied relative to
//! that snapshot, so a gesture never accumulates drift. End refreshes the
//! snapshot to the final value and returns to Idle; a change that arrives
//! without a fresh begin resumes from that refreshed snapshot.

use crate::engine::scene_graph::{EntityId, ModelEntity, SceneGraph};
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Pinch,
    Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GesturePhase {
    Began,
    /// Pinch: cumulative scale factor since begin. Rotation: cumulative
    /// angle in radians about +Y since begin.
    Changed(f32),
    Ended,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GestureInput {
    pub kind: GestureKind,
    pub phase: GesturePhase,
}

impl GestureInput {
    pub fn new(kind: GestureKind, phase: GesturePhase) -> Self {
        Self { kind, phase }
    }
}

/// The transform component one gesture kind drives.
trait TransformChannel: Copy {
    fn read(entity: &ModelEntity) -> Self;
    fn write(entity: &mut ModelEntity, value: Self);
    fn apply(initial: Self, amount: f32) -> Self;
}

impl TransformChannel for Vec3 {
    fn read(entity: &ModelEntity) -> Self {
        entity.transform.scale
    }

    fn write(entity: &mut ModelEntity, value: Self) {
        entity.transform.scale = value;
    }

    fn apply(initial: Self, factor: f32) -> Self {
        initial * factor
    }
}

impl TransformChannel for Quat {
    fn read(entity: &ModelEntity) -> Self {
        entity.transform.rotation
    }

    fn write(entity: &mut ModelEntity, value: Self) {
        entity.transform.rotation = value;
    }

    fn apply(initial: Self, angle: f32) -> Self {
        initial * Quat::from_axis_angle(Vec3::Y, angle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GestureSession<T> {
    target: EntityId,
    initial: T,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GestureTrack<T> {
    active: bool,
    session: Option<GestureSession<T>>,
}

impl<T> Default for GestureTrack<T> {
    fn default() -> Self {
        Self {
            active: false,
            session: None,
        }
    }
}

impl<T: TransformChannel> GestureTrack<T> {
    fn begin(&mut self, graph: &SceneGraph) {
        let Some(entity) = graph.last_placed_entity() else {
            self.active = false;
            self.session = None;
            return;
        };
        self.active = true;
        self.session = Some(GestureSession {
            target: entity.id(),
            initial: T::read(entity),
        });
    }

    fn change(&mut self, amount: f32, graph: &mut SceneGraph) {
        let Some(session) = self.session else {
            return;
        };
        if !self.active {
            if !graph.contains_entity(session.target) {
                self.session = None;
                return;
            }
            self.active = true;
        }
        // Target may have been cleared mid-gesture.
        if let Some(entity) = graph.entity_mut(session.target) {
            T::write(entity, T::apply(session.initial, amount));
        }
    }

    fn end(&mut self, graph: &SceneGraph) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(session) = self.session.as_mut() {
            match graph.entity(session.target) {
                Some(entity) => session.initial = T::read(entity),
                None => self.session = None,
            }
        }
    }
}

#[derive(Resource, Debug, Default)]
pub struct GestureRouter {
    pinch: GestureTrack<Vec3>,
    rotation: GestureTrack<Quat>,
}

impl GestureRouter {
    pub fn handle(&mut self, input: GestureInput, graph: &mut SceneGraph) {
        match (input.kind, input.phase) {
            (GestureKind::Pinch, GesturePhase::Began) => self.pinch.begin(graph),
            (GestureKind::Pinch, GesturePhase::Changed(factor)) => self.pinch.change(factor, graph),
            (GestureKind::Pinch, GesturePhase::Ended) => self.pinch.end(graph),
            (GestureKind::Rotation, GesturePhase::Began) => self.rotation.begin(graph),
            (GestureKind::Rotation, GesturePhase::Changed(angle)) => {
                self.rotation.change(angle, graph)
            }
            (GestureKind::Rotation, GesturePhase::Ended) => self.rotation.end(graph),
        }
    }

    pub fn is_active(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pinch => self.pinch.active,
            GestureKind::Rotation => self.rotation.active,
        }
    }
}

pub fn route_gestures(
    mut inputs: EventReader<GestureInput>,
    mut router: ResMut<GestureRouter>,
    mut graph: ResMut<SceneGraph>,
) {
    for input in inputs.read() {
        let was_active = router.is_active(input.kind);
        router.handle(*input, &mut graph);
        match (was_active, router.is_active(input.kind)) {
            (false, true) => debug!("{:?} gesture started", input.kind),
            (true, false) => debug!("{:?} gesture ended", input.kind),
            _ => {}
        }
    }
}
