use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
// Crate engine modules
use crate::engine::camera::desktop_camera::{DesktopCamera, camera_controller, spawn_ar_camera};
use crate::engine::core::ar_session::ArSessionPlugin;
use crate::engine::core::session::SessionConfig;
use crate::engine::core::window_config::create_window_config;
use crate::engine::tracking::{DetectedPlane, PlaneAlignment, TrackedPlanes};

/// Simulated tracker output for desktop runs: a floor and a wall.
const SIMULATED_FLOOR_EXTENT: Vec2 = Vec2::new(4.0, 4.0);
const SIMULATED_WALL_EXTENT: Vec2 = Vec2::new(4.0, 2.5);
const SIMULATED_WALL_DISTANCE: f32 = 2.0;

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .insert_resource(SessionConfig::from_env())
        .add_plugins(ArSessionPlugin)
        .init_resource::<DesktopCamera>();

    app.add_systems(Startup, (setup, spawn_ar_camera, seed_simulated_planes))
        .add_systems(Update, camera_controller);

    app
}

fn spawn_lighting(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

// Startup system that only handles basic initialisation
fn setup(mut commands: Commands) {
    spawn_lighting(&mut commands);
}

/// Stand in for the device tracker: report a floor and a wall and draw them.
fn seed_simulated_planes(
    mut commands: Commands,
    mut planes: ResMut<TrackedPlanes>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let floor = DetectedPlane {
        id: 0,
        alignment: PlaneAlignment::Horizontal,
        transform: Transform::IDENTITY,
        extent: SIMULATED_FLOOR_EXTENT,
    };
    // Local +Y of a plane is its normal, so the wall faces +Z.
    let wall = DetectedPlane {
        id: 1,
        alignment: PlaneAlignment::Vertical,
        transform: Transform::from_xyz(0.0, SIMULATED_WALL_EXTENT.y * 0.5, -SIMULATED_WALL_DISTANCE)
            .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)),
        extent: SIMULATED_WALL_EXTENT,
    };

    for plane in [floor, wall] {
        if !planes.detection().allows(plane.alignment) {
            continue;
        }
        commands.spawn((
            Mesh3d(meshes.add(Plane3d::default().mesh().size(plane.extent.x, plane.extent.y))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.22, 0.24, 0.28),
                perceptual_roughness: 1.0,
                ..default()
            })),
            plane.transform,
            Name::new(format!("simulated_plane_{}", plane.id)),
        ));
        planes.upsert_plane(plane);
    }
    info!("Simulated tracker reporting {} plane(s)", planes.planes().len());
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
