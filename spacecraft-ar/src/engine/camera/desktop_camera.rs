use crate::engine::tracking::ArCamera;
use bevy::input::mouse::MouseMotion;
use bevy::math::EulerRot;
use bevy::prelude::*;

/// Starting eye position, roughly a handheld device held at chest height.
const EYE_START: Vec3 = Vec3::new(0.0, 1.4, 1.2);
const LOOK_AT_START: Vec3 = Vec3::new(0.0, 0.0, -0.4);

#[derive(Resource, Debug, Clone)]
pub struct DesktopCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub move_speed: f32, // Metres per second.
}

impl Default for DesktopCamera {
    fn default() -> Self {
        let start = Transform::from_translation(EYE_START).looking_at(LOOK_AT_START, Vec3::Y);
        let (yaw, pitch, _) = start.rotation.to_euler(EulerRot::YXZ);
        Self {
            position: EYE_START,
            yaw,
            pitch,
            move_speed: 1.5,
        }
    }
}

impl DesktopCamera {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).with_rotation(self.rotation())
    }
}

pub fn spawn_ar_camera(mut commands: Commands, camera: Res<DesktopCamera>) {
    commands.spawn((
        Camera3d::default(),
        camera.transform(),
        ArCamera,
        Name::new("ArCamera"),
    ));
}

pub fn camera_controller(
    mut camera_query: Query<&mut Transform, With<ArCamera>>,
    mut camera: ResMut<DesktopCamera>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
) {
    let Ok(mut transform) = camera_query.single_mut() else { return; };

    // Right drag looks around
    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    if mouse_button.pressed(MouseButton::Right) && mouse_delta != Vec2::ZERO {
        let yaw_sens = 0.0035;
        let pitch_sens = 0.0030;
        camera.yaw -= mouse_delta.x * yaw_sens;
        camera.pitch -= mouse_delta.y * pitch_sens;
        camera.pitch = camera.pitch.clamp(-1.55, 1.55);
    }

    let mut move_input = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) { move_input.z -= 1.0; }
    if keyboard.pressed(KeyCode::KeyS) { move_input.z += 1.0; }
    if keyboard.pressed(KeyCode::KeyD) { move_input.x += 1.0; }
    if keyboard.pressed(KeyCode::KeyA) { move_input.x -= 1.0; }
    if keyboard.pressed(KeyCode::KeyE) { move_input.y += 1.0; }
    if keyboard.pressed(KeyCode::KeyQ) { move_input.y -= 1.0; }

    if move_input != Vec3::ZERO {
        let rotation = camera.rotation();
        let forward = rotation * Vec3::Z;
        let right = rotation * Vec3::X;
        let world_delta = right * move_input.x + Vec3::Y * move_input.y + forward * move_input.z;

        let mut speed = camera.move_speed;
        if keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) { speed *= 3.0; }
        camera.position += world_delta.normalize() * speed * time.delta_secs();
    }

    *transform = camera.transform();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_at_floor() {
        let camera = DesktopCamera::default();
        let forward = camera.rotation() * Vec3::NEG_Z;
        assert!(forward.y < 0.0);
        assert!(forward.z < 0.0);
        assert_eq!(camera.transform().translation, EYE_START);
    }
}
