//! Camera / tracking session surface consumed by the placement core.
//!
//! The device tracker reports detected planes; the core only asks one
//! question of them: where does a ray from the screen centre land on a
//! plane of a given alignment. [`TrackedPlanes`] is the session-side store
//! the platform layer keeps up to date (the desktop build seeds it with a
//! simulated floor).

use crate::engine::spatial::ray_hits_plane_rect;
use bevy::prelude::*;
use constants::reticle::RETICLE_MIN_PLANE_BOUNDS;

/// Marker for the camera whose view drives the reticle.
#[derive(Component)]
pub struct ArCamera;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneAlignment {
    Horizontal,
    Vertical,
}

/// Which plane orientations the tracker is asked to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneDetection {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Default for PlaneDetection {
    fn default() -> Self {
        Self {
            horizontal: true,
            vertical: true,
        }
    }
}

impl PlaneDetection {
    pub fn allows(&self, alignment: PlaneAlignment) -> bool {
        match alignment {
            PlaneAlignment::Horizontal => self.horizontal,
            PlaneAlignment::Vertical => self.vertical,
        }
    }
}

/// A plane estimate reported by the tracker. The plane spans the local XZ
/// rectangle of `transform` (local +Y is the surface normal).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPlane {
    pub id: u64,
    pub alignment: PlaneAlignment,
    pub transform: Transform,
    pub extent: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHit {
    pub point: Vec3,
    pub distance: f32,
    pub plane_id: u64,
}

/// Ray-vs-estimated-plane hit testing.
pub trait PlaneHitTester {
    fn raycast(&self, ray: Ray3d, alignment: PlaneAlignment) -> Option<PlaneHit>;
}

#[derive(Resource, Debug, Clone)]
pub struct TrackedPlanes {
    detection: PlaneDetection,
    min_bounds: Vec2,
    planes: Vec<DetectedPlane>,
}

impl Default for TrackedPlanes {
    fn default() -> Self {
        Self::new(PlaneDetection::default(), Vec2::from(RETICLE_MIN_PLANE_BOUNDS))
    }
}

impl TrackedPlanes {
    pub fn new(detection: PlaneDetection, min_bounds: Vec2) -> Self {
        Self {
            detection,
            min_bounds,
            planes: Vec::new(),
        }
    }

    pub fn detection(&self) -> PlaneDetection {
        self.detection
    }

    /// Insert a new plane estimate or refine an existing one with the same id.
    pub fn upsert_plane(&mut self, plane: DetectedPlane) {
        if let Some(existing) = self.planes.iter_mut().find(|p| p.id == plane.id) {
            *existing = plane;
        } else {
            self.planes.push(plane);
        }
    }

    pub fn planes(&self) -> &[DetectedPlane] {
        &self.planes
    }

    fn is_eligible(&self, plane: &DetectedPlane, alignment: PlaneAlignment) -> bool {
        plane.alignment == alignment
            && self.detection.allows(alignment)
            && plane.extent.x >= self.min_bounds.x
            && plane.extent.y >= self.min_bounds.y
    }
}

impl PlaneHitTester for TrackedPlanes {
    fn raycast(&self, ray: Ray3d, alignment: PlaneAlignment) -> Option<PlaneHit> {
        let dir = ray.direction.as_vec3();

        self.planes
            .iter()
            .filter(|plane| self.is_eligible(plane, alignment))
            .filter_map(|plane| {
                ray_hits_plane_rect(ray.origin, dir, &plane.transform, plane.extent).map(|t| {
                    PlaneHit {
                        point: ray.origin + dir * t,
                        distance: t,
                        plane_id: plane.id,
                    }
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Ray through the centre of the camera's viewport.
pub fn screen_centre_ray(camera: &Camera, camera_transform: &GlobalTransform) -> Option<Ray3d> {
    let size = camera.logical_viewport_size()?;
    camera.viewport_to_world(camera_transform, size * 0.5).ok()
}
