//! Trigger handlers — classify raw episode samples into trigger updates.
//!
//! A handler owns only episode-transient classification state (axis lock,
//! speed sampling, stroke buffer, pinch type).  The recognizer it drives is
//! passed in by the caller on every call.

pub mod motion;
pub mod multitouch;

use crate::gesture::{Gesture, GestureId, TriggerType};
use crate::input::Modifiers;
use crate::recognizer::{GestureRecognizer, TriggerUpdate, UpdateOutcome};

pub use motion::MotionTriggerHandler;
pub use multitouch::{MultiTouchMotionTriggerHandler, PinchType};

// ── Config ─────────────────────────────────────────────────

/// Classification thresholds shared by the motion handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerConfig {
    /// Samples averaged before an episode's speed is classified.
    pub speed_samples: u32,
    /// Mean swipe delta (device units) at or above which a swipe is fast.
    pub swipe_fast_threshold: f64,
    /// Mean scale delta for a fast inward pinch.
    pub pinch_in_fast_threshold: f64,
    /// Mean scale delta for a fast outward pinch.
    pub pinch_out_fast_threshold: f64,
    /// Mean angle delta (degrees) for a fast rotation.
    pub rotate_fast_threshold: f64,
    /// Factor applied to the scaled swipe vector.
    pub swipe_delta_multiplier: f64,
    /// Idle time after which an unfinished stroke episode ends.
    pub stroke_timeout_ms: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            speed_samples: 3,
            swipe_fast_threshold: 20.0,
            pinch_in_fast_threshold: 0.04,
            pinch_out_fast_threshold: 0.08,
            rotate_fast_threshold: 5.0,
            swipe_delta_multiplier: 1.0,
            stroke_timeout_ms: 250,
        }
    }
}

impl HandlerConfig {
    pub fn config_sexp(&self) -> String {
        format!(
            "(:speed-samples {} :swipe-fast-threshold {} :pinch-in-fast-threshold {} :pinch-out-fast-threshold {} :rotate-fast-threshold {} :swipe-delta-multiplier {} :stroke-timeout-ms {})",
            self.speed_samples,
            self.swipe_fast_threshold,
            self.pinch_in_fast_threshold,
            self.pinch_out_fast_threshold,
            self.rotate_fast_threshold,
            self.swipe_delta_multiplier,
            self.stroke_timeout_ms,
        )
    }
}

// ── Handler trait ──────────────────────────────────────────

/// What `cancel_triggers` should drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTarget {
    Type(TriggerType),
    Gesture(GestureId),
}

impl From<TriggerType> for CancelTarget {
    fn from(trigger: TriggerType) -> Self {
        Self::Type(trigger)
    }
}

impl From<GestureId> for CancelTarget {
    fn from(id: GestureId) -> Self {
        Self::Gesture(id)
    }
}

/// Shared per-episode plumbing between an input source and the recognizer.
pub trait TriggerHandler {
    /// Clear all episode-transient state.
    fn reset(&mut self);

    /// Called for every gesture that becomes active in `begin`.
    fn trigger_activating(&mut self, _gesture: &Gesture) {}

    fn has_active_triggers(&self, recognizer: &GestureRecognizer, trigger: TriggerType) -> bool {
        recognizer.has_active(trigger)
    }

    fn active_triggers(&self, recognizer: &GestureRecognizer, trigger: TriggerType) -> Vec<GestureId> {
        recognizer.active_gestures(trigger)
    }

    fn cancel_triggers(&mut self, recognizer: &mut GestureRecognizer, target: impl Into<CancelTarget>)
    where
        Self: Sized,
    {
        match target.into() {
            CancelTarget::Type(trigger) => recognizer.cancel(trigger),
            CancelTarget::Gesture(id) => {
                recognizer.cancel_gesture(id);
            }
        }
    }

    /// Apply every update in order.  Consumed if any of them was.
    fn update_triggers(
        &mut self,
        recognizer: &mut GestureRecognizer,
        updates: &[TriggerUpdate],
    ) -> UpdateOutcome {
        updates
            .iter()
            .fold(UpdateOutcome::default(), |outcome, update| {
                outcome.merge(recognizer.update(update))
            })
    }

    /// Start an episode for one trigger type.
    fn begin(
        &mut self,
        recognizer: &mut GestureRecognizer,
        trigger: TriggerType,
        fingers: u8,
        modifiers: &Modifiers,
    ) -> Vec<GestureId> {
        self.begin_all(recognizer, &[trigger], fingers, modifiers)
    }

    /// Start an episode that may touch several trigger types.  Handler state
    /// resets only when none of them is active yet, so a repeated begin keeps
    /// the current classification.
    fn begin_all(
        &mut self,
        recognizer: &mut GestureRecognizer,
        triggers: &[TriggerType],
        fingers: u8,
        modifiers: &Modifiers,
    ) -> Vec<GestureId> {
        if !triggers.iter().any(|t| recognizer.has_active(*t)) {
            self.reset();
        }
        let mut started = Vec::new();
        for &trigger in triggers {
            started.extend(recognizer.begin(trigger, fingers, modifiers));
        }
        for id in &started {
            if let Some(gesture) = recognizer.gesture(*id) {
                self.trigger_activating(gesture);
            }
        }
        started
    }

    fn end(&mut self, recognizer: &mut GestureRecognizer, trigger: TriggerType) -> bool {
        recognizer.end(trigger)
    }

    fn cancel(&mut self, recognizer: &mut GestureRecognizer, trigger: TriggerType) {
        recognizer.cancel(trigger);
    }
}
