//! Gesture recognizer — registry, active sets, conflict resolution and
//! action dispatch.
//!
//! Trigger handlers classify raw input into `TriggerUpdate`s; the recognizer
//! applies them to the gestures that are active for the current episode,
//! drops candidates whose conditions fail, ends gestures whose threshold is
//! reached and executes their actions.  Every lifecycle change is recorded as
//! a `GestureEvent` that callers drain after each input event.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::gesture::{Direction, Gesture, GestureId, GesturePhase, Speed, TriggerType};
use crate::input::Modifiers;
use crate::sexp::{escape_string, format_event};
use crate::stroke::{Point, Stroke};

// ── Updates ────────────────────────────────────────────────

/// Update payload for directional triggers (swipe, pinch, rotate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalUpdate {
    /// Progress contributed by this sample.
    pub delta: f64,
    pub direction: Direction,
    pub speed: Speed,
    /// Accumulated motion scaled by the swipe delta multiplier.
    pub delta_scaled: Point,
}

impl DirectionalUpdate {
    /// Pinch update from the absolute scale of this and the previous sample.
    pub fn pinch(scale: f64, previous_scale: f64) -> Self {
        Self {
            delta: scale - previous_scale,
            direction: if scale < 1.0 { Direction::In } else { Direction::Out },
            speed: Speed::Any,
            delta_scaled: Point::default(),
        }
    }

    /// Rotate update from an angle delta in degrees.
    pub fn rotate(angle_delta: f64) -> Self {
        Self {
            delta: angle_delta,
            direction: if angle_delta > 0.0 {
                Direction::Clockwise
            } else {
                Direction::Counterclockwise
            },
            speed: Speed::Any,
            delta_scaled: Point::default(),
        }
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }
}

/// Update payload for non-directional motion (strokes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionUpdate {
    pub delta: f64,
    pub speed: Speed,
}

/// A classified input sample for one trigger type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerUpdate {
    Hold { delta_ms: f64 },
    Press { delta_ms: f64 },
    Swipe(DirectionalUpdate),
    Pinch(DirectionalUpdate),
    Rotate(DirectionalUpdate),
    Stroke(MotionUpdate),
}

impl TriggerUpdate {
    pub fn trigger(&self) -> TriggerType {
        match self {
            Self::Hold { .. } => TriggerType::Hold,
            Self::Press { .. } => TriggerType::Press,
            Self::Swipe(_) => TriggerType::Swipe,
            Self::Pinch(_) => TriggerType::Pinch,
            Self::Rotate(_) => TriggerType::Rotate,
            Self::Stroke(_) => TriggerType::Stroke,
        }
    }

    pub fn delta(&self) -> f64 {
        match self {
            Self::Hold { delta_ms } | Self::Press { delta_ms } => *delta_ms,
            Self::Swipe(u) | Self::Pinch(u) | Self::Rotate(u) => u.delta,
            Self::Stroke(u) => u.delta,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Swipe(u) | Self::Pinch(u) | Self::Rotate(u) => Some(u.direction),
            _ => None,
        }
    }

    pub fn speed(&self) -> Option<Speed> {
        match self {
            Self::Swipe(u) | Self::Pinch(u) | Self::Rotate(u) => Some(u.speed),
            Self::Stroke(u) => Some(u.speed),
            _ => None,
        }
    }
}

/// Result of applying one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// The raw input event should not propagate further.
    pub consumed: bool,
    /// At least one gesture ended because its threshold was reached.
    pub ended_prematurely: bool,
}

impl UpdateOutcome {
    pub fn merge(self, other: UpdateOutcome) -> UpdateOutcome {
        UpdateOutcome {
            consumed: self.consumed || other.consumed,
            ended_prematurely: self.ended_prematurely || other.ended_prematurely,
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// Lifecycle notifications, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    Started { id: GestureId },
    Updated { id: GestureId, progress: f64 },
    Ended { id: GestureId, premature: bool },
    Cancelled { id: GestureId },
    /// A stroke was captured by `GestureState::record_stroke`.
    StrokeRecorded(Stroke),
}

impl GestureEvent {
    pub fn id(&self) -> Option<GestureId> {
        match self {
            Self::Started { id }
            | Self::Updated { id, .. }
            | Self::Ended { id, .. }
            | Self::Cancelled { id } => Some(*id),
            Self::StrokeRecorded(_) => None,
        }
    }
}

// ── Recognizer ─────────────────────────────────────────────

/// Gestures of one trigger type taking part in the current episode.
#[derive(Debug, Default)]
struct ActiveSet {
    /// Insertion ordered, each id at most once.
    members: Vec<GestureId>,
    /// A blocking action fired; the rest may no longer trigger this episode.
    blocked: bool,
}

/// Owns every registered gesture and the per-type active sets.
#[derive(Debug, Default)]
pub struct GestureRecognizer {
    gestures: Vec<Gesture>,
    active: HashMap<TriggerType, ActiveSet>,
    events: Vec<GestureEvent>,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gesture.  Gestures are never deduplicated.
    pub fn register_gesture(&mut self, mut gesture: Gesture) -> GestureId {
        if gesture.trigger.is_composite() {
            warn!(
                gesture = %gesture.name,
                "composite trigger type {} cannot be registered, disabling",
                gesture.trigger.as_str()
            );
            gesture.enabled = false;
        }
        let id = GestureId(self.gestures.len());
        debug!(%id, gesture = %gesture.name, trigger = gesture.trigger.as_str(), "gesture registered");
        self.gestures.push(gesture);
        id
    }

    pub fn gesture(&self, id: GestureId) -> Option<&Gesture> {
        self.gestures.get(id.0)
    }

    pub fn gestures(&self) -> impl Iterator<Item = (GestureId, &Gesture)> {
        self.gestures
            .iter()
            .enumerate()
            .map(|(i, g)| (GestureId(i), g))
    }

    /// Active gestures for `trigger` (all leaves of a composite), in order.
    pub fn active_gestures(&self, trigger: TriggerType) -> Vec<GestureId> {
        trigger
            .leaves()
            .iter()
            .filter_map(|leaf| self.active.get(leaf))
            .flat_map(|set| set.members.iter().copied())
            .collect()
    }

    pub fn has_active(&self, trigger: TriggerType) -> bool {
        trigger
            .leaves()
            .iter()
            .any(|leaf| self.active.get(leaf).is_some_and(|set| !set.members.is_empty()))
    }

    pub fn is_active(&self, id: GestureId) -> bool {
        self.gesture(id)
            .and_then(|g| self.active.get(&g.trigger))
            .is_some_and(|set| set.members.contains(&id))
    }

    /// Take all pending lifecycle events.
    pub fn drain_events(&mut self) -> Vec<GestureEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: GestureEvent) {
        self.events.push(event);
    }

    /// Activate every gesture of `trigger` whose begin conditions hold.
    ///
    /// Returns the newly activated gestures.  Gestures that are already
    /// active are left alone and not reported again.
    pub fn begin(
        &mut self,
        trigger: TriggerType,
        fingers: u8,
        modifiers: &Modifiers,
    ) -> Vec<GestureId> {
        let mut started = Vec::new();
        for &leaf in trigger.leaves() {
            let set = self.active.entry(leaf).or_default();
            if set.members.is_empty() {
                set.blocked = false;
            }
            for (index, gesture) in self.gestures.iter_mut().enumerate() {
                let id = GestureId(index);
                if gesture.trigger != leaf
                    || set.members.contains(&id)
                    || !gesture.satisfies_begin(fingers, modifiers)
                {
                    continue;
                }
                gesture.activate();
                set.members.push(id);
                started.push(id);
                debug!(%id, gesture = %gesture.name, fingers, "gesture started");
            }
        }
        self.events
            .extend(started.iter().map(|&id| GestureEvent::Started { id }));
        started
    }

    /// Apply an update to every active gesture of its type.
    pub fn update(&mut self, update: &TriggerUpdate) -> UpdateOutcome {
        let trigger = update.trigger();
        let mut outcome = UpdateOutcome::default();

        let (blocked, snapshot) = match self.active.get(&trigger) {
            Some(set) if !set.members.is_empty() => (set.blocked, set.members.clone()),
            _ => return outcome,
        };
        if blocked {
            debug!(trigger = trigger.as_str(), "episode blocked, dropping remaining gestures");
            self.cancel(trigger);
            return outcome;
        }

        for id in snapshot {
            if !self.is_active(id) {
                continue;
            }

            let gesture = &mut self.gestures[id.0];
            if !gesture.satisfies_update(update) {
                debug!(%id, gesture = %gesture.name, "update conditions not satisfied");
                self.remove_active(trigger, id);
                self.finish_cancelled(id);
                continue;
            }

            gesture.advance(update.delta());
            let progress = gesture.progress();
            let ends_now = gesture.trigger_when_threshold_reached && gesture.threshold_reached();
            self.events.push(GestureEvent::Updated { id, progress });
            outcome.consumed = true;

            if ends_now {
                debug!(%id, progress, "threshold reached, ending gesture prematurely");
                let block = self.gestures[id.0].execute_actions();
                self.remove_active(trigger, id);
                self.finish_ended(id, true);
                outcome.ended_prematurely = true;
                if block {
                    if let Some(set) = self.active.get_mut(&trigger) {
                        set.blocked = true;
                    }
                    break;
                }
            }
        }
        outcome
    }

    /// Resolve the episode for `trigger`.
    ///
    /// The first active gesture whose threshold is reached wins and has its
    /// actions executed; all others are cancelled.  Returns `false` if
    /// nothing was active or no gesture won.
    pub fn end(&mut self, trigger: TriggerType) -> bool {
        let mut ended = false;
        for &leaf in trigger.leaves() {
            ended |= self.end_leaf(leaf);
        }
        ended
    }

    fn end_leaf(&mut self, trigger: TriggerType) -> bool {
        let set = match self.active.remove(&trigger) {
            Some(set) if !set.members.is_empty() => set,
            _ => return false,
        };

        let winner = if set.blocked {
            None
        } else {
            set.members
                .iter()
                .copied()
                .find(|id| self.gestures[id.0].threshold_reached())
        };

        for id in set.members {
            if Some(id) == winner {
                self.gestures[id.0].execute_actions();
                self.finish_ended(id, false);
            } else {
                self.finish_cancelled(id);
            }
        }
        winner.is_some()
    }

    /// End one specific active gesture, executing its actions.
    pub fn end_gesture(&mut self, id: GestureId) -> bool {
        let Some(trigger) = self.gesture(id).map(|g| g.trigger) else {
            return false;
        };
        if !self.remove_active(trigger, id) {
            return false;
        }
        self.gestures[id.0].execute_actions();
        self.finish_ended(id, false);
        true
    }

    /// Cancel every active gesture of `trigger`.  No-op when none are active.
    pub fn cancel(&mut self, trigger: TriggerType) {
        for &leaf in trigger.leaves() {
            if let Some(set) = self.active.remove(&leaf) {
                for id in set.members {
                    self.finish_cancelled(id);
                }
            }
        }
    }

    /// Cancel one specific active gesture.
    pub fn cancel_gesture(&mut self, id: GestureId) -> bool {
        let Some(trigger) = self.gesture(id).map(|g| g.trigger) else {
            return false;
        };
        if !self.remove_active(trigger, id) {
            return false;
        }
        self.finish_cancelled(id);
        true
    }

    fn remove_active(&mut self, trigger: TriggerType, id: GestureId) -> bool {
        let Some(set) = self.active.get_mut(&trigger) else {
            return false;
        };
        let before = set.members.len();
        set.members.retain(|member| *member != id);
        set.members.len() < before
    }

    fn finish_ended(&mut self, id: GestureId, premature: bool) {
        let gesture = &mut self.gestures[id.0];
        info!(%id, gesture = %gesture.name, premature, "gesture ended");
        gesture.finish(GesturePhase::Ended);
        self.events.push(GestureEvent::Ended { id, premature });
    }

    fn finish_cancelled(&mut self, id: GestureId) {
        self.gestures[id.0].finish(GesturePhase::Cancelled);
        self.events.push(GestureEvent::Cancelled { id });
    }

    /// Format a lifecycle event for output.
    pub fn event_sexp(&self, event: &GestureEvent) -> String {
        let name = |id: &GestureId| {
            let name = self.gesture(*id).map_or("", |g| g.name.as_str());
            format!("\"{}\"", escape_string(name))
        };
        match event {
            GestureEvent::Started { id } => format_event("gesture-started", &[("name", &name(id))]),
            GestureEvent::Updated { id, progress } => format_event(
                "gesture-updated",
                &[("name", &name(id)), ("progress", &format!("{:.3}", progress))],
            ),
            GestureEvent::Ended { id, premature } => format_event(
                "gesture-ended",
                &[
                    ("name", &name(id)),
                    ("premature", if *premature { "t" } else { "nil" }),
                ],
            ),
            GestureEvent::Cancelled { id } => {
                format_event("gesture-cancelled", &[("name", &name(id))])
            }
            GestureEvent::StrokeRecorded(stroke) => {
                format_event("stroke-recorded", &[("stroke", &stroke.to_sexp())])
            }
        }
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        let active: Vec<String> = TriggerType::LEAVES
            .iter()
            .map(|t| {
                let count = self.active.get(t).map_or(0, |set| set.members.len());
                format!(":{} {}", t.as_str(), count)
            })
            .collect();
        format!(
            "(:gestures {} :active ({}))",
            self.gestures.len(),
            active.join(" ")
        )
    }
}
