//! Multi-touch motion trigger handler — two-finger scale/angle samples to
//! pinch and rotate updates.
//!
//! Wraps a `MotionTriggerHandler`, which keeps handling plain motion and
//! provides the shared speed gate.

use tracing::debug;

use super::{HandlerConfig, MotionTriggerHandler, TriggerHandler};
use crate::gesture::{Gesture, TriggerType};
use crate::recognizer::{DirectionalUpdate, GestureRecognizer, TriggerUpdate};
use crate::stroke::Point;

/// Accumulated rotation (degrees) that classifies an episode as rotate.
const ROTATE_CLASSIFY_DEGREES: f64 = 10.0;

/// Scale deviation from 1.0 that classifies an episode as pinch.
const PINCH_CLASSIFY_SCALE: f64 = 0.2;

/// Classification of a two-finger episode, decided once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinchType {
    #[default]
    Unknown,
    Pinch,
    Rotate,
}

impl PinchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pinch => "pinch",
            Self::Rotate => "rotate",
        }
    }
}

#[derive(Debug)]
pub struct MultiTouchMotionTriggerHandler {
    motion: MotionTriggerHandler,
    previous_scale: f64,
    pinch_type: PinchType,
    accumulated_rotation: f64,
}

impl MultiTouchMotionTriggerHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            motion: MotionTriggerHandler::new(config),
            previous_scale: 1.0,
            pinch_type: PinchType::Unknown,
            accumulated_rotation: 0.0,
        }
    }

    pub fn motion(&self) -> &MotionTriggerHandler {
        &self.motion
    }

    pub fn pinch_type(&self) -> PinchType {
        self.pinch_type
    }

    pub fn motion_update(&mut self, recognizer: &mut GestureRecognizer, delta: Point) -> bool {
        self.motion.motion_update(recognizer, delta)
    }

    /// Handle one two-finger sample.  `scale` is absolute relative to the
    /// start of the episode, `angle_delta` is in degrees.
    pub fn pinch_update(
        &mut self,
        recognizer: &mut GestureRecognizer,
        scale: f64,
        angle_delta: f64,
        delta: Point,
    ) -> bool {
        if !recognizer.has_active(TriggerType::Pinch) && !recognizer.has_active(TriggerType::Rotate) {
            return false;
        }
        debug!(scale, angle_delta, dx = delta.x, dy = delta.y, "pinch event");

        let previous_scale = self.previous_scale;
        let scale_delta = scale - previous_scale;
        self.previous_scale = scale;
        self.accumulated_rotation += angle_delta.abs();

        if self.pinch_type == PinchType::Unknown {
            if self.accumulated_rotation >= ROTATE_CLASSIFY_DEGREES {
                self.pinch_type = PinchType::Rotate;
                self.cancel_triggers(recognizer, TriggerType::Pinch);
            } else if (1.0 - scale).abs() >= PINCH_CLASSIFY_SCALE {
                self.pinch_type = PinchType::Pinch;
                self.cancel_triggers(recognizer, TriggerType::Rotate);
            } else {
                debug!("pinch event processed, determining type");
                return true;
            }
            debug!(pinch_type = self.pinch_type.as_str(), "pinch type determined");
        }

        let config = self.motion.config();
        let (sample, fast_threshold) = match self.pinch_type {
            PinchType::Rotate => (angle_delta.abs(), config.rotate_fast_threshold),
            _ if scale < 1.0 => (scale_delta.abs(), config.pinch_in_fast_threshold),
            _ => (scale_delta.abs(), config.pinch_out_fast_threshold),
        };
        if !self.motion.determine_speed(sample, fast_threshold) {
            debug!("pinch event processed, determining speed");
            return true;
        }

        let speed = self.motion.speed();
        let update = match self.pinch_type {
            PinchType::Rotate => TriggerUpdate::Rotate(DirectionalUpdate::rotate(angle_delta).with_speed(speed)),
            _ => TriggerUpdate::Pinch(DirectionalUpdate::pinch(scale, previous_scale).with_speed(speed)),
        };
        let outcome = self.update_triggers(recognizer, &[update]);
        debug!(consumed = outcome.consumed, "pinch event processed");
        outcome.consumed
    }
}

impl TriggerHandler for MultiTouchMotionTriggerHandler {
    fn reset(&mut self) {
        self.motion.reset();
        self.previous_scale = 1.0;
        self.pinch_type = PinchType::Unknown;
        self.accumulated_rotation = 0.0;
    }

    fn trigger_activating(&mut self, gesture: &Gesture) {
        self.motion.trigger_activating(gesture);
    }

    fn end(&mut self, recognizer: &mut GestureRecognizer, trigger: TriggerType) -> bool {
        self.motion.end(recognizer, trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{Direction, GestureId, Speed};
    use crate::input::Modifiers;
    use crate::recognizer::GestureEvent;

    #[test]
    fn test_no_candidates_not_consumed() {
        let mut recognizer = GestureRecognizer::new();
        let mut handler = MultiTouchMotionTriggerHandler::new(HandlerConfig::default());
        assert!(!handler.pinch_update(&mut recognizer, 1.5, 0.0, Point::default()));
    }

    #[test]
    fn test_classifies_rotate() {
        let (mut recognizer, pinch, rotate) = pinch_and_rotate();
        let mut handler = begin_pinch(&mut recognizer);

        assert!(handler.pinch_update(&mut recognizer, 1.0, 4.0, Point::default()));
        assert!(handler.pinch_update(&mut recognizer, 1.0, 4.0, Point::default()));
        assert_eq!(handler.pinch_type(), PinchType::Unknown);
        assert!(recognizer.drain_events().is_empty());

        assert!(handler.pinch_update(&mut recognizer, 1.0, 4.0, Point::default()));
        assert_eq!(handler.pinch_type(), PinchType::Rotate);
        assert_eq!(
            recognizer.drain_events(),
            vec![
                GestureEvent::Cancelled { id: pinch },
                GestureEvent::Updated { id: rotate, progress: 4.0 },
            ]
        );
    }

    #[test]
    fn test_classifies_pinch() {
        let (mut recognizer, pinch, rotate) = pinch_and_rotate();
        let mut handler = begin_pinch(&mut recognizer);

        handler.pinch_update(&mut recognizer, 1.1, 0.0, Point::default());
        assert_eq!(handler.pinch_type(), PinchType::Unknown);
        handler.pinch_update(&mut recognizer, 1.25, 0.0, Point::default());
        assert_eq!(handler.pinch_type(), PinchType::Pinch);

        let events = recognizer.drain_events();
        assert_eq!(events[0], GestureEvent::Cancelled { id: rotate });
        match events[1] {
            GestureEvent::Updated { id, progress } => {
                assert_eq!(id, pinch);
                assert!((progress - 0.15).abs() < 1e-9, "progress = {progress}");
            }
            ref other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_classification_is_monotonic() {
        let (mut recognizer, _, rotate) = pinch_and_rotate();
        let mut handler = begin_pinch(&mut recognizer);
        handler.pinch_update(&mut recognizer, 1.0, 12.0, Point::default());
        assert_eq!(handler.pinch_type(), PinchType::Rotate);

        handler.pinch_update(&mut recognizer, 1.8, 1.0, Point::default());
        handler.pinch_update(&mut recognizer, 0.3, 1.0, Point::default());
        assert_eq!(handler.pinch_type(), PinchType::Rotate);
        assert_eq!(recognizer.active_gestures(TriggerType::Rotate), vec![rotate]);
        assert!(!recognizer.has_active(TriggerType::Pinch));
    }

    #[test]
    fn test_pinch_in_direction() {
        let mut recognizer = GestureRecognizer::new();
        let pinch_in = recognizer.register_gesture(
            Gesture::new("in", TriggerType::Pinch).with_direction(Direction::In),
        );
        let pinch_out = recognizer.register_gesture(
            Gesture::new("out", TriggerType::Pinch).with_direction(Direction::Out),
        );
        let mut handler = begin_pinch(&mut recognizer);
        assert!(handler.pinch_update(&mut recognizer, 0.75, 0.0, Point::default()));
        assert_eq!(recognizer.active_gestures(TriggerType::Pinch), vec![pinch_in]);
        assert!(recognizer
            .drain_events()
            .contains(&GestureEvent::Cancelled { id: pinch_out }));
    }

    #[test]
    fn test_rotate_speed_gate() {
        let mut recognizer = GestureRecognizer::new();
        let fast = recognizer.register_gesture(
            Gesture::new("fast", TriggerType::Rotate).with_speed(Speed::Fast),
        );
        let mut handler = begin_pinch(&mut recognizer);
        assert!(handler.motion().is_determining_speed());

        // The classifying sample is also the first speed sample.
        for _ in 0..3 {
            assert!(handler.pinch_update(&mut recognizer, 1.0, 12.0, Point::default()));
        }
        assert!(recognizer.drain_events().is_empty());

        assert!(handler.pinch_update(&mut recognizer, 1.0, 12.0, Point::default()));
        assert_eq!(handler.motion().speed(), Speed::Fast);
        assert_eq!(
            recognizer.drain_events(),
            vec![GestureEvent::Updated { id: fast, progress: 12.0 }]
        );
    }

    #[test]
    fn test_reset() {
        let (mut recognizer, _, _) = pinch_and_rotate();
        let mut handler = begin_pinch(&mut recognizer);
        handler.pinch_update(&mut recognizer, 1.5, 3.0, Point::default());
        handler.reset();
        assert_eq!(handler.pinch_type(), PinchType::Unknown);
        assert_eq!(handler.previous_scale, 1.0);
        assert_eq!(handler.accumulated_rotation, 0.0);
    }

    fn begin_pinch(recognizer: &mut GestureRecognizer) -> MultiTouchMotionTriggerHandler {
        let mut handler = MultiTouchMotionTriggerHandler::new(HandlerConfig::default());
        handler.begin_all(
            recognizer,
            &[TriggerType::Pinch, TriggerType::Rotate],
            2,
            &Modifiers::default(),
        );
        recognizer.drain_events();
        handler
    }

    fn pinch_and_rotate() -> (GestureRecognizer, GestureId, GestureId) {
        let mut recognizer = GestureRecognizer::new();
        let pinch = recognizer.register_gesture(Gesture::new("pinch", TriggerType::Pinch));
        let rotate = recognizer.register_gesture(Gesture::new("rotate", TriggerType::Rotate));
        (recognizer, pinch, rotate)
    }
}
