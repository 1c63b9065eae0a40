//! Raw input to [`GestureInput`] events.
//!
//! Two sources feed the router: a two-finger touch recogniser for touch
//! screens and an accumulator for the trackpad pinch/rotate events winit
//! reports on desktop.

use crate::tools::gesture_router::{GestureInput, GestureKind, GesturePhase};
use bevy::input::gestures::{PinchGesture, RotationGesture};
use bevy::input::touch::Touches;
use bevy::prelude::*;
use std::f32::consts::{PI, TAU};

/// Below this finger separation (logical px) a pinch ratio is meaningless.
const MIN_PINCH_START_DISTANCE: f32 = 1.0;

/// Lower bound for an accumulated trackpad scale; a delta of -1 or less
/// would otherwise collapse or mirror the model.
const MIN_TRACKPAD_SCALE: f32 = 0.05;

/// Trackpad gestures carry no end marker; a quiet period ends them.
const TRACKPAD_IDLE_SECS: f64 = 0.25;

fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TwoFingerSession {
    ids: (u64, u64),
    start_distance: f32,
    last_angle: f32,
    rotation: f32,
    scale: f32,
}

/// Turns the set of active touches into pinch and rotation gestures. Both
/// gestures begin when a second finger lands and end when either lifts.
#[derive(Resource, Debug, Default)]
pub struct TouchGestureRecognizer {
    session: Option<TwoFingerSession>,
}

impl TouchGestureRecognizer {
    /// `touches` is every finger currently down, as `(id, position)`.
    pub fn update(&mut self, touches: &[(u64, Vec2)]) -> Vec<GestureInput> {
        let mut out = Vec::new();

        if let Some(mut session) = self.session {
            let a = touches.iter().find(|(id, _)| *id == session.ids.0);
            let b = touches.iter().find(|(id, _)| *id == session.ids.1);

            let (Some((_, a)), Some((_, b))) = (a, b) else {
                self.session = None;
                out.push(GestureInput::new(GestureKind::Pinch, GesturePhase::Ended));
                out.push(GestureInput::new(GestureKind::Rotation, GesturePhase::Ended));
                return out;
            };

            let scale = a.distance(*b) / session.start_distance;
            if (scale - session.scale).abs() > f32::EPSILON {
                session.scale = scale;
                out.push(GestureInput::new(
                    GestureKind::Pinch,
                    GesturePhase::Changed(scale),
                ));
            }

            let delta = *b - *a;
            let angle = delta.y.atan2(delta.x);
            let step = wrap_angle(angle - session.last_angle);
            if step.abs() > f32::EPSILON {
                session.last_angle = angle;
                session.rotation += step;
                out.push(GestureInput::new(
                    GestureKind::Rotation,
                    GesturePhase::Changed(session.rotation),
                ));
            }

            self.session = Some(session);
            return out;
        }

        if let [(id_a, a), (id_b, b), ..] = touches {
            let start_distance = a.distance(*b);
            if start_distance > MIN_PINCH_START_DISTANCE {
                let delta = *b - *a;
                self.session = Some(TwoFingerSession {
                    ids: (*id_a, *id_b),
                    start_distance,
                    last_angle: delta.y.atan2(delta.x),
                    rotation: 0.0,
                    scale: 1.0,
                });
                out.push(GestureInput::new(GestureKind::Pinch, GesturePhase::Began));
                out.push(GestureInput::new(GestureKind::Rotation, GesturePhase::Began));
            }
        }

        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Accumulated {
    value: f32,
    last_event_secs: f64,
}

/// Folds per-frame trackpad deltas into cumulative gesture values.
#[derive(Resource, Debug, Default)]
pub struct TrackpadGestureAccumulator {
    pinch: Option<Accumulated>,
    rotation: Option<Accumulated>,
}

impl TrackpadGestureAccumulator {
    /// `delta` is the magnification change reported by the trackpad.
    pub fn pinch(&mut self, delta: f32, now_secs: f64) -> Vec<GestureInput> {
        Self::step(
            &mut self.pinch,
            GestureKind::Pinch,
            1.0,
            |value| (value * (1.0 + delta)).max(MIN_TRACKPAD_SCALE),
            now_secs,
        )
    }

    /// `delta` is the rotation change in radians.
    pub fn rotate(&mut self, delta: f32, now_secs: f64) -> Vec<GestureInput> {
        Self::step(
            &mut self.rotation,
            GestureKind::Rotation,
            0.0,
            |value| value + delta,
            now_secs,
        )
    }

    /// End any gesture that has been quiet for longer than the idle window.
    pub fn flush(&mut self, now_secs: f64) -> Vec<GestureInput> {
        let mut out = Vec::new();
        for (slot, kind) in [
            (&mut self.pinch, GestureKind::Pinch),
            (&mut self.rotation, GestureKind::Rotation),
        ] {
            if slot.is_some_and(|acc| now_secs - acc.last_event_secs > TRACKPAD_IDLE_SECS) {
                *slot = None;
                out.push(GestureInput::new(kind, GesturePhase::Ended));
            }
        }
        out
    }

    fn step(
        slot: &mut Option<Accumulated>,
        kind: GestureKind,
        identity: f32,
        fold: impl FnOnce(f32) -> f32,
        now_secs: f64,
    ) -> Vec<GestureInput> {
        let mut out = Vec::new();
        let current = match slot {
            Some(acc) => acc.value,
            None => {
                out.push(GestureInput::new(kind, GesturePhase::Began));
                identity
            }
        };

        let value = fold(current);
        *slot = Some(Accumulated {
            value,
            last_event_secs: now_secs,
        });
        out.push(GestureInput::new(kind, GesturePhase::Changed(value)));
        out
    }
}

pub fn recognise_touch_gestures(
    touches: Res<Touches>,
    mut recognizer: ResMut<TouchGestureRecognizer>,
    mut gestures: EventWriter<GestureInput>,
) {
    let mut active: Vec<(u64, Vec2)> = touches.iter().map(|t| (t.id(), t.position())).collect();
    active.sort_by_key(|(id, _)| *id);

    for gesture in recognizer.update(&active) {
        gestures.write(gesture);
    }
}

pub fn accumulate_trackpad_gestures(
    time: Res<Time>,
    mut pinches: EventReader<PinchGesture>,
    mut rotations: EventReader<RotationGesture>,
    mut accumulator: ResMut<TrackpadGestureAccumulator>,
    mut gestures: EventWriter<GestureInput>,
) {
    let now = time.elapsed_secs_f64();

    for PinchGesture(delta) in pinches.read() {
        for gesture in accumulator.pinch(*delta, now) {
            gestures.write(gesture);
        }
    }
    // winit reports trackpad rotation in degrees.
    for RotationGesture(delta) in rotations.read() {
        for gesture in accumulator.rotate(delta.to_radians(), now) {
            gestures.write(gesture);
        }
    }
    for gesture in accumulator.flush(now) {
        gestures.write(gesture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases(inputs: &[GestureInput], kind: GestureKind) -> Vec<GesturePhase> {
        inputs
            .iter()
            .filter(|g| g.kind == kind)
            .map(|g| g.phase)
            .collect()
    }

    #[test]
    fn test_single_finger_is_not_a_gesture() {
        let mut recognizer = TouchGestureRecognizer::default();
        assert!(recognizer.update(&[(0, Vec2::ZERO)]).is_empty());
        assert!(recognizer.session.is_none());
    }

    #[test]
    fn test_touch_pinch_begin_change_end() {
        let mut recognizer = TouchGestureRecognizer::default();

        let began = recognizer.update(&[(0, Vec2::ZERO), (1, Vec2::new(100.0, 0.0))]);
        assert_eq!(phases(&began, GestureKind::Pinch), vec![GesturePhase::Began]);
        assert_eq!(phases(&began, GestureKind::Rotation), vec![GesturePhase::Began]);

        let spread = recognizer.update(&[(0, Vec2::ZERO), (1, Vec2::new(200.0, 0.0))]);
        assert_eq!(
            phases(&spread, GestureKind::Pinch),
            vec![GesturePhase::Changed(2.0)]
        );
        assert!(phases(&spread, GestureKind::Rotation).is_empty());

        let lifted = recognizer.update(&[(0, Vec2::ZERO)]);
        assert_eq!(phases(&lifted, GestureKind::Pinch), vec![GesturePhase::Ended]);
        assert_eq!(phases(&lifted, GestureKind::Rotation), vec![GesturePhase::Ended]);
        assert!(recognizer.session.is_none());
    }

    #[test]
    fn test_touch_rotation_is_cumulative() {
        let mut recognizer = TouchGestureRecognizer::default();
        recognizer.update(&[(0, Vec2::ZERO), (1, Vec2::new(100.0, 0.0))]);
        recognizer.update(&[(0, Vec2::ZERO), (1, Vec2::new(0.0, 100.0))]);
        let out = recognizer.update(&[(0, Vec2::ZERO), (1, Vec2::new(-100.0, 0.0))]);

        let Some(GesturePhase::Changed(angle)) = phases(&out, GestureKind::Rotation).pop() else {
            panic!("expected rotation change");
        };
        assert!((angle - PI).abs() < 1e-4);
    }

    #[test]
    fn test_coincident_fingers_do_not_start_pinch() {
        let mut recognizer = TouchGestureRecognizer::default();
        let out = recognizer.update(&[(0, Vec2::ONE), (1, Vec2::ONE)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_trackpad_pinch_accumulates_and_times_out() {
        let mut acc = TrackpadGestureAccumulator::default();

        let first = acc.pinch(0.5, 0.0);
        assert_eq!(
            first.iter().map(|g| g.phase).collect::<Vec<_>>(),
            vec![GesturePhase::Began, GesturePhase::Changed(1.5)]
        );
        let second = acc.pinch(1.0, 0.1);
        assert_eq!(second[0].phase, GesturePhase::Changed(3.0));

        assert!(acc.flush(0.2).is_empty());
        let ended = acc.flush(0.5);
        assert_eq!(ended, vec![GestureInput::new(GestureKind::Pinch, GesturePhase::Ended)]);
    }

    #[test]
    fn test_trackpad_pinch_never_mirrors() {
        let mut acc = TrackpadGestureAccumulator::default();
        acc.pinch(-1.0, 0.0);
        let out = acc.pinch(-3.0, 0.1);
        assert_eq!(out, vec![GestureInput::new(GestureKind::Pinch, GesturePhase::Changed(MIN_TRACKPAD_SCALE))]);

        let recovered = acc.pinch(1.0, 0.2);
        assert_eq!(recovered[0].phase, GesturePhase::Changed(MIN_TRACKPAD_SCALE * 2.0));
    }

    #[test]
    fn test_trackpad_rotation_events_arrive_in_radians() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_event::<RotationGesture>()
            .add_event::<PinchGesture>()
            .add_event::<GestureInput>()
            .init_resource::<TrackpadGestureAccumulator>()
            .add_systems(Update, accumulate_trackpad_gestures);

        app.world_mut().send_event(RotationGesture(90.0));
        app.update();

        let events = app.world().resource::<Events<GestureInput>>();
        let phases: Vec<_> = events
            .iter_current_update_events()
            .filter(|g| g.kind == GestureKind::Rotation)
            .map(|g| g.phase)
            .collect();
        let Some(GesturePhase::Changed(angle)) = phases.last().copied() else {
            panic!("expected a rotation change, got {phases:?}");
        };
        assert!((angle - PI / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
    }
}
