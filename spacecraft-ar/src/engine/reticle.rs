//! Screen-centre reticle: follows the nearest horizontal surface under the
//! view centre and marks where the next model will be placed.

use crate::engine::spatial::{Pose, reticle_orientation};
use crate::engine::tracking::{
    ArCamera, PlaneAlignment, PlaneHitTester, TrackedPlanes, screen_centre_ray,
};
use bevy::prelude::*;
use std::time::{SystemTime, UNIX_EPOCH};

/// Clock readings for one tick. Session time drives re-anchoring, wall time
/// drives the spin animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub session_secs: f64,
    pub wall_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reticle {
    pose: Pose,
    enabled: bool,
}

impl Reticle {
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for Reticle {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            enabled: false,
        }
    }
}

/// Generation of the reticle's anchor. A new id means the old anchor was torn
/// down and a fresh one created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReticleAnchorId(u64);

#[derive(Resource, Debug, Clone)]
pub struct ReticleTracker {
    reticle: Reticle,
    anchor: ReticleAnchorId,
    last_reanchor_secs: f64,
    reanchor_interval_secs: f64,
}

impl Default for ReticleTracker {
    fn default() -> Self {
        Self::new(0.0, constants::reticle::REANCHOR_INTERVAL_SECS)
    }
}

impl ReticleTracker {
    pub fn new(start_secs: f64, reanchor_interval_secs: f64) -> Self {
        Self {
            reticle: Reticle::default(),
            anchor: ReticleAnchorId(0),
            last_reanchor_secs: start_secs,
            reanchor_interval_secs,
        }
    }

    pub fn reticle(&self) -> &Reticle {
        &self.reticle
    }

    pub fn anchor(&self) -> ReticleAnchorId {
        self.anchor
    }

    /// Advance one frame with the current horizontal hit (if any).
    /// Returns true when the reticle anchor was recreated this tick.
    pub fn tick(&mut self, hit: Option<Vec3>, time: FrameTime) -> bool {
        let reanchored = time.session_secs - self.last_reanchor_secs >= self.reanchor_interval_secs;
        if reanchored {
            self.anchor = ReticleAnchorId(self.anchor.0 + 1);
            self.last_reanchor_secs = time.session_secs;
        }

        match hit {
            Some(point) => {
                self.reticle.enabled = true;
                self.reticle.pose = Pose::new(point, reticle_orientation(time.wall_secs));
            }
            None => {
                self.reticle.enabled = false;
            }
        }

        reanchored
    }

    /// Where new content goes: the reticle position with identity orientation.
    /// `None` while no surface is under the screen centre.
    pub fn placement_pose(&self) -> Option<Pose> {
        self.reticle
            .enabled
            .then(|| Pose::from_translation(self.reticle.pose.translation))
    }
}

fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

pub fn update_reticle(
    time: Res<Time>,
    planes: Res<TrackedPlanes>,
    cameras: Query<(&Camera, &GlobalTransform), With<ArCamera>>,
    mut tracker: ResMut<ReticleTracker>,
) {
    let hit = cameras.single().ok().and_then(|(camera, camera_xf)| {
        let ray = screen_centre_ray(camera, camera_xf)?;
        planes
            .raycast(ray, PlaneAlignment::Horizontal)
            .map(|hit| hit.point)
    });

    let was_enabled = tracker.reticle().is_enabled();
    let frame = FrameTime {
        session_secs: time.elapsed_secs_f64(),
        wall_secs: wall_clock_secs(),
    };

    if tracker.tick(hit, frame) {
        debug!("Reticle re-anchored ({:?})", tracker.anchor());
    }
    if was_enabled != tracker.reticle().is_enabled() {
        debug!(
            "Reticle {}",
            if tracker.reticle().is_enabled() { "acquired surface" } else { "lost surface" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(session_secs: f64) -> FrameTime {
        FrameTime {
            session_secs,
            wall_secs: session_secs,
        }
    }

    #[test]
    fn test_enabled_tracks_latest_hit() {
        let mut tracker = ReticleTracker::new(0.0, 1.0);
        assert!(!tracker.reticle().is_enabled());

        tracker.tick(Some(Vec3::new(0.2, 0.0, -0.5)), at(0.1));
        assert!(tracker.reticle().is_enabled());
        assert_eq!(tracker.reticle().pose().translation, Vec3::new(0.2, 0.0, -0.5));

        tracker.tick(None, at(0.2));
        assert!(!tracker.reticle().is_enabled());
        assert!(tracker.placement_pose().is_none());

        tracker.tick(Some(Vec3::ZERO), at(0.3));
        assert!(tracker.reticle().is_enabled());
    }

    #[test]
    fn test_reanchor_boundary() {
        let mut tracker = ReticleTracker::new(0.0, 1.0);
        let first = tracker.anchor();

        assert!(!tracker.tick(None, at(0.999)));
        assert_eq!(tracker.anchor(), first);

        assert!(tracker.tick(None, at(1.0)));
        let second = tracker.anchor();
        assert_ne!(second, first);

        // Interval counts from the previous re-anchor.
        assert!(!tracker.tick(None, at(1.5)));
        assert!(tracker.tick(None, at(2.001)));
        assert_ne!(tracker.anchor(), second);
    }

    #[test]
    fn test_reanchor_keeps_reticle_state() {
        let mut tracker = ReticleTracker::new(0.0, 1.0);
        tracker.tick(Some(Vec3::X), at(0.5));
        assert!(tracker.tick(Some(Vec3::X), at(1.2)));
        assert!(tracker.reticle().is_enabled());
        assert_eq!(tracker.reticle().pose().translation, Vec3::X);
    }

    #[test]
    fn test_placement_pose_has_identity_orientation() {
        let mut tracker = ReticleTracker::new(0.0, 1.0);
        tracker.tick(Some(Vec3::new(1.0, 0.0, 2.0)), at(2.5));
        let yaw = tracker.reticle().pose().rotation * Vec3::Z;
        assert!((yaw - Vec3::new(2.5f32.sin(), 0.0, 2.5f32.cos())).length() < 1e-5);

        let pose = tracker.placement_pose().expect("enabled reticle");
        assert_eq!(pose.translation, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(pose.rotation, Quat::IDENTITY);
    }
}
