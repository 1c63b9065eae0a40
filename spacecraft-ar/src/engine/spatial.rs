use bevy::prelude::*;
use std::f64::consts::TAU;

/// World-space position and orientation snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    pub fn to_transform(self) -> Transform {
        Transform::from_translation(self.translation).with_rotation(self.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Orientation of something lying flat on a horizontal plane. Roll and pitch
/// reported by the tracker are discarded.
pub fn horizontal_alignment() -> Quat {
    Quat::from_axis_angle(Vec3::Y, 0.0)
}

/// Reticle yaw: wall-clock seconds wrapped into `[0, 2π)`.
///
/// Wrapping happens in f64 so epoch-sized inputs keep sub-second precision.
pub fn spin_angle(wall_secs: f64) -> f32 {
    wall_secs.rem_euclid(TAU) as f32
}

pub fn reticle_orientation(wall_secs: f64) -> Quat {
    horizontal_alignment() * Quat::from_axis_angle(Vec3::Y, spin_angle(wall_secs))
}

/// Orbit radius around a globe whose visual bounding box spans `globe_extent_x`.
pub fn orbit_radius(globe_extent_x: f32, factor: f32) -> f32 {
    globe_extent_x * 0.5 * factor
}

/// Spherical (degrees) to Cartesian offset. Latitude 0, longitude 0 lies on +Z,
/// the north pole on +Y.
pub fn geo_to_cartesian(latitude_deg: f64, longitude_deg: f64, radius: f32) -> Vec3 {
    let lat = (latitude_deg as f32).to_radians();
    let lon = (longitude_deg as f32).to_radians();

    Vec3::new(
        radius * lat.cos() * lon.sin(),
        radius * lat.sin(),
        radius * lat.cos() * lon.cos(),
    )
}

/// Ray against a bounded plane rectangle. The rectangle lies in the local XZ
/// plane of `xf` with half-sizes taken from `extent`; local +Y is its normal.
/// Returns the distance along `dir` to the hit.
pub fn ray_hits_plane_rect(origin: Vec3, dir: Vec3, xf: &Transform, extent: Vec2) -> Option<f32> {
    let inv = xf.compute_matrix().inverse();
    let o_local = inv.transform_point3(origin);
    let d_local = inv.transform_vector3(dir);

    let t_local = ray_plane_hit_t(o_local, d_local, Vec3::ZERO, Vec3::Y)?;
    let hit_local = o_local + d_local * t_local;

    let he = extent * 0.5;
    if hit_local.x.abs() > he.x || hit_local.z.abs() > he.y {
        return None;
    }

    let hit_world = xf.transform_point(hit_local);
    let len = dir.length();
    if len <= f32::EPSILON {
        return None;
    }
    Some((hit_world - origin).dot(dir) / (len * len))
}

/// Ray against an infinite plane. `None` when parallel or behind the origin.
pub fn ray_plane_hit_t(
    ray_origin: Vec3,
    ray_direction: Vec3,
    plane_point: Vec3,
    plane_normal: Vec3,
) -> Option<f32> {
    let denom = plane_normal.dot(ray_direction);
    if denom.abs() < 1e-6 {
        return None;
    }

    let t = (plane_point - ray_origin).dot(plane_normal) / denom;
    if t < 0.0 { None } else { Some(t) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_equator_prime_meridian_is_forward() {
        let offset = geo_to_cartesian(0.0, 0.0, 2.5);
        assert!(approx(offset, Vec3::new(0.0, 0.0, 2.5)));
    }

    #[test]
    fn test_north_pole_is_up() {
        let offset = geo_to_cartesian(90.0, 45.0, 1.0);
        assert!(approx(offset, Vec3::Y));
    }

    #[test]
    fn test_east_longitude_is_positive_x() {
        let offset = geo_to_cartesian(0.0, 90.0, 1.0);
        assert!(approx(offset, Vec3::X));
    }

    #[test]
    fn test_orbit_radius_from_extent() {
        assert!((orbit_radius(0.4, 1.7) - 0.34).abs() < 1e-6);
    }

    #[test]
    fn test_spin_angle_wraps() {
        let angle = spin_angle(std::f64::consts::TAU + 1.0);
        assert!((angle - 1.0).abs() < 1e-5);
        assert!(spin_angle(1_727_000_000.25) < std::f32::consts::TAU);
    }

    #[test]
    fn test_reticle_orientation_is_pure_yaw() {
        let q = reticle_orientation(FRAC_PI_2 as f64);
        let up = q * Vec3::Y;
        assert!(approx(up, Vec3::Y));
        assert!(approx(q * Vec3::Z, Vec3::X));
    }

    #[test]
    fn test_ray_hits_floor_rect() {
        let floor = Transform::IDENTITY;
        let t = ray_hits_plane_rect(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, &floor, Vec2::splat(1.0));
        assert_eq!(t, Some(2.0));
    }

    #[test]
    fn test_ray_misses_outside_rect() {
        let floor = Transform::from_xyz(5.0, 0.0, 0.0);
        let t = ray_hits_plane_rect(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, &floor, Vec2::splat(1.0));
        assert_eq!(t, None);
    }

    #[test]
    fn test_ray_parallel_to_plane() {
        assert_eq!(ray_plane_hit_t(Vec3::Y, Vec3::X, Vec3::ZERO, Vec3::Y), None);
    }

    #[test]
    fn test_ray_pointing_away() {
        assert_eq!(ray_plane_hit_t(Vec3::Y, Vec3::Y, Vec3::ZERO, Vec3::Y), None);
    }
}
