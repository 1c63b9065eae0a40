//! User-facing side of the placement core.
//!
//! Actions flow from the UI (buttons and keyboard shortcuts) over the
//! [`action_bus::ActionBus`] to the placement controller. Gestures flow from
//! raw input through the recognisers into the gesture router.
//!
//! ```text
//! Button / key
//!   └─> ActionBus::publish(ActionEvent)
//!       └─> PlacementController inbox
//!           └─> apply_placement_actions()
//!               ├─> SceneGraph::add_anchor / add_composite_anchor
//!               ├─> SceneGraph::remove_all_except_reticle
//!               └─> OrbitRegistry + position request (ISS composite)
//!
//! Touches / trackpad
//!   └─> GestureInput events
//!       └─> route_gestures()
//!           └─> scale / rotation of the last placed entity
//! ```

/// Explicitly constructed broadcast channel for user actions.
pub mod action_bus;

/// Touch and trackpad recognisers producing gesture events.
pub mod gesture_input;

/// Pinch and rotation state machines acting on the last placed entity.
pub mod gesture_router;

/// Action handling: model loading, anchoring and the live ISS composite.
pub mod placement;

/// Bottom action bar and keyboard shortcuts.
pub mod ui;
