use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use constants::reticle::RETICLE_MIN_PLANE_BOUNDS;

use crate::engine::assets::model_catalog::{
    CatalogLoader, ModelCatalog, load_catalog_system, start_catalog_loading,
};
use crate::engine::core::session::SessionConfig;
use crate::engine::reticle::{ReticleTracker, update_reticle};
use crate::engine::scene::sync::{
    apply_material_overrides, measure_scene_bounds, replace_failed_scenes, spawn_reticle,
    sync_reticle, sync_scene_graph,
};
use crate::engine::scene_graph::SceneGraph;
use crate::engine::tracking::TrackedPlanes;
use crate::services::position::install_position_service;
use crate::tools::action_bus::ActionBus;
use crate::tools::gesture_input::{
    TouchGestureRecognizer, TrackpadGestureAccumulator, accumulate_trackpad_gestures,
    recognise_touch_gestures,
};
use crate::tools::gesture_router::{GestureInput, GestureRouter, route_gestures};
use crate::tools::placement::{
    OrbitRegistry, PendingPositionFixes, PlacementController, apply_placement_actions,
    poll_position_fixes, refresh_orbit_positions,
};
use crate::tools::ui::{action_button_interaction, handle_action_shortcuts, spawn_action_bar};

/// Registers the placement core: bus, tracker, scene graph, gestures,
/// placement and the live ISS position feed.
///
/// Uses an existing [`SessionConfig`] resource if one was inserted before
/// the plugin, otherwise reads it from the environment.
pub struct ArSessionPlugin;

impl Plugin for ArSessionPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<SessionConfig>()
            .cloned()
            .unwrap_or_else(SessionConfig::from_env);

        let bus = ActionBus::new();
        let controller = PlacementController::subscribe(&bus, &config);
        debug!("Action bus ready with {} subscriber(s)", bus.subscriber_count());

        app.insert_resource(ReticleTracker::new(0.0, config.reanchor_interval_secs))
            .insert_resource(TrackedPlanes::new(
                config.plane_detection,
                Vec2::from(RETICLE_MIN_PLANE_BOUNDS),
            ))
            .insert_resource(controller)
            .insert_resource(bus)
            .insert_resource(config)
            .init_resource::<SceneGraph>()
            .init_resource::<GestureRouter>()
            .init_resource::<TouchGestureRecognizer>()
            .init_resource::<TrackpadGestureAccumulator>()
            .init_resource::<OrbitRegistry>()
            .init_resource::<PendingPositionFixes>()
            .init_resource::<CatalogLoader>()
            .add_event::<GestureInput>()
            // Registers ModelCatalog as a loadable asset type from *.catalog.json files.
            .add_plugins(JsonAssetPlugin::<ModelCatalog>::new(&["catalog.json"]));

        app.add_systems(
            Startup,
            (
                install_position_service,
                start_catalog_loading,
                spawn_reticle,
                spawn_action_bar,
            ),
        );

        // One ordered pass per frame: input, then scene mutation, then mirroring.
        app.add_systems(
            Update,
            (
                load_catalog_system,
                update_reticle,
                (
                    recognise_touch_gestures,
                    accumulate_trackpad_gestures,
                    route_gestures,
                )
                    .chain(),
                (action_button_interaction, handle_action_shortcuts),
                apply_placement_actions,
                refresh_orbit_positions,
                poll_position_fixes,
                replace_failed_scenes,
                measure_scene_bounds,
                sync_scene_graph,
                sync_reticle,
                apply_material_overrides,
            )
                .chain(),
        );
    }
}
