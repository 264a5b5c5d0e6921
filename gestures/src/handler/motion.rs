//! Motion trigger handler — pointer and multi-finger motion deltas to swipe
//! and stroke updates.

use tracing::debug;

use super::{HandlerConfig, TriggerHandler};
use crate::gesture::{Axis, Direction, Gesture, GestureId, Speed, TriggerType};
use crate::recognizer::{DirectionalUpdate, GestureRecognizer, MotionUpdate, TriggerUpdate};
use crate::stroke::{Point, Stroke, MIN_MATCHING_SCORE};

/// Running displacement along either axis that locks a swipe to it.
pub const AXIS_LOCK_THRESHOLD: f64 = 5.0;

#[derive(Debug)]
pub struct MotionTriggerHandler {
    config: HandlerConfig,
    axis: Axis,
    swipe_delta: Point,
    speed: Speed,
    determining_speed: bool,
    sampled_events: u32,
    sampled_delta: f64,
    stroke: Vec<Point>,
}

impl MotionTriggerHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            axis: Axis::None,
            swipe_delta: Point::default(),
            speed: Speed::Any,
            determining_speed: false,
            sampled_events: 0,
            sampled_delta: 0.0,
            stroke: Vec::new(),
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Axis the current swipe is locked to, `Axis::None` while provisional.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Classified speed of the current episode.
    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn is_determining_speed(&self) -> bool {
        self.determining_speed
    }

    /// Deltas buffered for stroke matching.
    pub fn stroke_deltas(&self) -> &[Point] {
        &self.stroke
    }

    /// Handle one motion delta.  Returns whether the event was consumed.
    pub fn motion_update(&mut self, recognizer: &mut GestureRecognizer, delta: Point) -> bool {
        if !recognizer.has_active(TriggerType::StrokeSwipe) {
            return false;
        }
        debug!(dx = delta.x, dy = delta.y, "motion event");

        let has_stroke = recognizer.has_active(TriggerType::Stroke);
        if has_stroke {
            self.stroke.push(delta);
        }

        let total = delta.hypot();
        if !self.determine_speed(total, self.config.swipe_fast_threshold) {
            debug!("motion event processed, determining speed");
            return true;
        }

        let mut updates = Vec::with_capacity(2);
        if recognizer.has_active(TriggerType::Swipe) {
            self.swipe_delta += delta;
            let axis = self.swipe_axis();
            updates.push(TriggerUpdate::Swipe(DirectionalUpdate {
                delta: axis.component(delta),
                direction: Direction::along(axis, axis.component(self.swipe_delta)),
                speed: self.speed,
                delta_scaled: self.swipe_delta * self.config.swipe_delta_multiplier,
            }));
        }
        if has_stroke {
            updates.push(TriggerUpdate::Stroke(MotionUpdate {
                delta: total,
                speed: self.speed,
            }));
        }

        let outcome = self.update_triggers(recognizer, &updates);
        debug!(consumed = outcome.consumed, "motion event processed");
        outcome.consumed
    }

    /// Current axis, locking it once the running vector is long enough.
    fn swipe_axis(&mut self) -> Axis {
        if self.axis != Axis::None {
            return self.axis;
        }
        let axis = Axis::dominant(self.swipe_delta);
        if self.swipe_delta.x.abs() >= AXIS_LOCK_THRESHOLD
            || self.swipe_delta.y.abs() >= AXIS_LOCK_THRESHOLD
        {
            debug!(?axis, "swipe axis locked");
            self.axis = axis;
        }
        axis
    }

    /// Speed gate.  Returns false while the sample is absorbed by sampling.
    pub(crate) fn determine_speed(&mut self, delta: f64, fast_threshold: f64) -> bool {
        if !self.determining_speed {
            return true;
        }

        if self.sampled_events != self.config.speed_samples {
            self.sampled_events += 1;
            self.sampled_delta += delta;
            debug!(
                event = self.sampled_events,
                samples = self.config.speed_samples,
                delta = self.sampled_delta,
                fast_threshold,
                "determining speed"
            );
            return false;
        }

        self.determining_speed = false;
        let mean = self.sampled_delta / f64::from(self.config.speed_samples.max(1));
        self.speed = if mean >= fast_threshold {
            Speed::Fast
        } else {
            Speed::Slow
        };
        debug!(speed = self.speed.as_str(), mean, "speed determined");
        true
    }

    /// Match the buffered stroke against active stroke gestures.
    ///
    /// The best template score above `MIN_MATCHING_SCORE` ends its gesture;
    /// every other stroke candidate is cancelled.
    fn end_stroke(&mut self, recognizer: &mut GestureRecognizer) -> bool {
        if self.stroke.is_empty() {
            recognizer.cancel(TriggerType::Stroke);
            return false;
        }

        let stroke = Stroke::from_deltas(&self.stroke);
        debug!(deltas = self.stroke.len(), points = stroke.points().len(), "stroke constructed");

        let mut best: Option<GestureId> = None;
        let mut best_score = 0.0;
        for id in recognizer.active_gestures(TriggerType::Stroke) {
            let Some(gesture) = recognizer.gesture(id) else {
                continue;
            };
            if !gesture.threshold_reached() {
                continue;
            }
            for template in &gesture.strokes {
                let score = stroke.compare(template);
                if score > best_score && score > MIN_MATCHING_SCORE {
                    best = Some(id);
                    best_score = score;
                }
            }
        }
        debug!(best_score, winner = ?best, "stroke compared");

        match best {
            Some(winner) => {
                for id in recognizer.active_gestures(TriggerType::Stroke) {
                    if id != winner {
                        self.cancel_triggers(recognizer, id);
                    }
                }
                recognizer.end_gesture(winner)
            }
            None => {
                self.cancel_triggers(recognizer, TriggerType::Stroke);
                false
            }
        }
    }
}

impl TriggerHandler for MotionTriggerHandler {
    fn reset(&mut self) {
        self.axis = Axis::None;
        self.swipe_delta = Point::default();
        self.speed = Speed::Any;
        self.determining_speed = false;
        self.sampled_events = 0;
        self.sampled_delta = 0.0;
        self.stroke.clear();
    }

    fn trigger_activating(&mut self, gesture: &Gesture) {
        if !self.determining_speed && self.speed == Speed::Any && gesture.speed != Speed::Any {
            debug!(gesture = %gesture.name, "gesture has speed filter");
            self.determining_speed = true;
        }
    }

    fn end(&mut self, recognizer: &mut GestureRecognizer, trigger: TriggerType) -> bool {
        let mut ended = false;
        if trigger.leaves().contains(&TriggerType::Stroke) {
            if recognizer.has_active(TriggerType::Stroke) {
                ended |= self.end_stroke(recognizer);
            }
            self.stroke.clear();
        }
        ended | recognizer.end(trigger)
    }
}
