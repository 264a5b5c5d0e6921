//! Gesture entity model — trigger types, filters and per-episode lifecycle.
//!
//! A `Gesture` is constructed once (usually by the config loader), handed to
//! the `GestureRecognizer` and kept for the lifetime of the process.  Its
//! progress and phase are reset after every ended or cancelled episode so the
//! same value is reused for the next one.

use std::fmt;
use std::ops::RangeInclusive;

use tracing::debug;

use crate::action::Action;
use crate::input::Modifiers;
use crate::recognizer::TriggerUpdate;
use crate::stroke::{Point, Stroke};

// ── Trigger types ──────────────────────────────────────────

/// Kind of motion a gesture reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerType {
    /// Fingers resting on the touchpad.
    Hold,
    /// Straight multi-finger motion.
    Swipe,
    /// Two fingers moving apart or together.
    Pinch,
    /// Two fingers turning around each other.
    Rotate,
    /// A drawn shape matched against templates.
    Stroke,
    /// Composite: one swipe motion feeds both `Swipe` and `Stroke`.
    StrokeSwipe,
    /// A press held down, progress is elapsed time.
    Press,
}

impl TriggerType {
    /// Every type that owns an active set.
    pub const LEAVES: [TriggerType; 6] = [
        Self::Hold,
        Self::Swipe,
        Self::Pinch,
        Self::Rotate,
        Self::Stroke,
        Self::Press,
    ];

    /// Leaf types covered by this type.  Only `StrokeSwipe` is composite.
    pub fn leaves(self) -> &'static [TriggerType] {
        match self {
            Self::Hold => &[Self::Hold],
            Self::Swipe => &[Self::Swipe],
            Self::Pinch => &[Self::Pinch],
            Self::Rotate => &[Self::Rotate],
            Self::Stroke => &[Self::Stroke],
            Self::StrokeSwipe => &[Self::Swipe, Self::Stroke],
            Self::Press => &[Self::Press],
        }
    }

    pub fn is_composite(self) -> bool {
        self.leaves().len() > 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Swipe => "swipe",
            Self::Pinch => "pinch",
            Self::Rotate => "rotate",
            Self::Stroke => "stroke",
            Self::StrokeSwipe => "stroke-swipe",
            Self::Press => "press",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hold" => Some(Self::Hold),
            "swipe" => Some(Self::Swipe),
            "pinch" => Some(Self::Pinch),
            "rotate" => Some(Self::Rotate),
            "stroke" => Some(Self::Stroke),
            "stroke-swipe" => Some(Self::StrokeSwipe),
            "press" => Some(Self::Press),
            _ => None,
        }
    }
}

// ── Filters ────────────────────────────────────────────────

/// Direction filter of a gesture, or the measured direction of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Any,
    Left,
    Right,
    Up,
    Down,
    /// Left or right.
    Horizontal,
    /// Up or down.
    Vertical,
    In,
    Out,
    Clockwise,
    Counterclockwise,
}

impl Direction {
    /// Whether a measured direction passes this filter.
    pub fn matches(self, actual: Direction) -> bool {
        match self {
            Self::Any => true,
            Self::Horizontal => matches!(actual, Self::Left | Self::Right),
            Self::Vertical => matches!(actual, Self::Up | Self::Down),
            filter => filter == actual,
        }
    }

    /// Direction of `value` along a swipe axis.
    pub fn along(axis: Axis, value: f64) -> Direction {
        match axis {
            Axis::Horizontal if value < 0.0 => Self::Left,
            Axis::Horizontal => Self::Right,
            Axis::Vertical if value < 0.0 => Self::Up,
            Axis::Vertical => Self::Down,
            Axis::None => Self::Any,
        }
    }

    /// Whether this filter makes sense for the trigger type.
    pub fn applies_to(self, trigger: TriggerType) -> bool {
        match (self, trigger) {
            (Self::Any, _) => true,
            (
                Self::Left | Self::Right | Self::Up | Self::Down | Self::Horizontal | Self::Vertical,
                TriggerType::Swipe,
            ) => true,
            (Self::In | Self::Out, TriggerType::Pinch) => true,
            (Self::Clockwise | Self::Counterclockwise, TriggerType::Rotate) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::In => "in",
            Self::Out => "out",
            Self::Clockwise => "clockwise",
            Self::Counterclockwise => "counterclockwise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "horizontal" | "left-right" => Some(Self::Horizontal),
            "vertical" | "up-down" => Some(Self::Vertical),
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            "clockwise" => Some(Self::Clockwise),
            "counterclockwise" => Some(Self::Counterclockwise),
            _ => None,
        }
    }
}

/// Axis a swipe episode is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    None,
    Horizontal,
    Vertical,
}

impl Axis {
    /// The axis along which `delta` is larger.  Ties go horizontal.
    pub fn dominant(delta: Point) -> Axis {
        if delta.x.abs() >= delta.y.abs() {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }

    /// Component of `delta` along this axis.
    pub fn component(self, delta: Point) -> f64 {
        match self {
            Self::Vertical => delta.y,
            _ => delta.x,
        }
    }
}

/// Speed filter of a gesture, or the classified speed of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    Any,
    Slow,
    Fast,
}

impl Speed {
    pub fn matches(self, actual: Speed) -> bool {
        self == Self::Any || self == actual
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Slow => "slow",
            Self::Fast => "fast",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "slow" => Some(Self::Slow),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

// ── Lifecycle ──────────────────────────────────────────────

/// Where a gesture is in the current episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Active,
    Ended,
    Cancelled,
}

/// Stable identity of a registered gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureId(pub(crate) usize);

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Gesture ────────────────────────────────────────────────

/// A configured recognition unit.
#[derive(Debug)]
pub struct Gesture {
    pub name: String,
    pub trigger: TriggerType,
    /// Inclusive finger count range.
    pub fingers: RangeInclusive<u8>,
    pub direction: Direction,
    pub speed: Speed,
    /// Progress required before the gesture may end.  `None` means no minimum.
    pub threshold: Option<f64>,
    /// End as soon as the threshold is reached instead of at episode end.
    pub trigger_when_threshold_reached: bool,
    /// Required keyboard modifiers.  `None` accepts any.
    pub modifiers: Option<Modifiers>,
    /// Disabled gestures never begin.
    pub enabled: bool,
    /// Templates for `Stroke` gestures.
    pub strokes: Vec<Stroke>,
    pub actions: Vec<Box<dyn Action>>,
    phase: GesturePhase,
    progress: f64,
}

impl Gesture {
    pub fn new(name: impl Into<String>, trigger: TriggerType) -> Self {
        Self {
            name: name.into(),
            trigger,
            fingers: 1..=5,
            direction: Direction::Any,
            speed: Speed::Any,
            threshold: None,
            trigger_when_threshold_reached: false,
            modifiers: None,
            enabled: true,
            strokes: Vec::new(),
            actions: Vec::new(),
            phase: GesturePhase::Idle,
            progress: 0.0,
        }
    }

    pub fn with_fingers(mut self, min: u8, max: u8) -> Self {
        self.fingers = min..=max;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn trigger_on_threshold(mut self, enabled: bool) -> Self {
        self.trigger_when_threshold_reached = enabled;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.strokes.push(stroke);
        self
    }

    pub fn with_action(mut self, action: impl Action + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Static preconditions checked when an episode begins.
    pub fn satisfies_begin(&self, fingers: u8, modifiers: &Modifiers) -> bool {
        self.enabled
            && self.fingers.contains(&fingers)
            && self.modifiers.map_or(true, |required| required == *modifiers)
    }

    /// Direction and speed conditions checked on every update.
    pub fn satisfies_update(&self, update: &TriggerUpdate) -> bool {
        let speed_ok = update.speed().map_or(true, |speed| self.speed.matches(speed));
        let direction_ok = update
            .direction()
            .map_or(true, |direction| self.direction.matches(direction));
        speed_ok && direction_ok
    }

    pub fn threshold_reached(&self) -> bool {
        self.threshold.map_or(true, |threshold| self.progress >= threshold)
    }

    pub(crate) fn activate(&mut self) {
        self.phase = GesturePhase::Active;
        self.progress = 0.0;
    }

    pub(crate) fn advance(&mut self, delta: f64) {
        self.progress += delta.abs();
    }

    /// Run every bound action.  Returns whether any of them blocks others.
    pub(crate) fn execute_actions(&self) -> bool {
        let mut block = false;
        for action in &self.actions {
            action.execute();
            block |= action.block_other_actions();
        }
        block
    }

    /// Enter a terminal phase, then drop back to idle for the next episode.
    pub(crate) fn finish(&mut self, phase: GesturePhase) {
        debug!(gesture = %self.name, ?phase, progress = self.progress, "gesture finished");
        self.progress = 0.0;
        self.phase = GesturePhase::Idle;
    }

    /// S-expression description, in the shape the config loader reads.
    pub fn to_sexp(&self) -> String {
        let mut s = format!(
            "(:name \"{}\" :type {} :fingers ({} {}) :direction {} :speed {}",
            crate::sexp::escape_string(&self.name),
            self.trigger.as_str(),
            self.fingers.start(),
            self.fingers.end(),
            self.direction.as_str(),
            self.speed.as_str(),
        );
        if let Some(threshold) = self.threshold {
            s.push_str(&format!(" :threshold {}", threshold));
        }
        if self.trigger_when_threshold_reached {
            s.push_str(" :trigger-on-threshold t");
        }
        if let Some(modifiers) = self.modifiers {
            s.push_str(&format!(" :modifiers {}", modifiers.to_sexp()));
        }
        if !self.enabled {
            s.push_str(" :enabled nil");
        }
        if !self.strokes.is_empty() {
            let strokes: Vec<String> = self.strokes.iter().map(Stroke::to_sexp).collect();
            s.push_str(&format!(" :strokes ({})", strokes.join(" ")));
        }
        let actions: Vec<String> = self.actions.iter().map(|a| a.to_sexp()).collect();
        s.push_str(&format!(" :actions ({}))", actions.join(" ")));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{DirectionalUpdate, MotionUpdate};

    #[test]
    fn test_leaves() {
        assert_eq!(
            TriggerType::StrokeSwipe.leaves(),
            &[TriggerType::Swipe, TriggerType::Stroke]
        );
        assert_eq!(TriggerType::Pinch.leaves(), &[TriggerType::Pinch]);
        assert!(TriggerType::StrokeSwipe.is_composite());
        assert!(!TriggerType::Hold.is_composite());
    }

    #[test]
    fn test_trigger_type_round_trip_names() {
        for trigger in TriggerType::LEAVES {
            assert_eq!(TriggerType::parse(trigger.as_str()), Some(trigger));
        }
        assert_eq!(TriggerType::parse("wiggle"), None);
    }

    #[test]
    fn test_direction_matches() {
        assert!(Direction::Any.matches(Direction::In));
        assert!(Direction::Horizontal.matches(Direction::Left));
        assert!(Direction::Horizontal.matches(Direction::Right));
        assert!(!Direction::Horizontal.matches(Direction::Up));
        assert!(Direction::Vertical.matches(Direction::Down));
        assert!(!Direction::Vertical.matches(Direction::Right));
        assert!(Direction::In.matches(Direction::In));
        assert!(!Direction::In.matches(Direction::Out));
    }

    #[test]
    fn test_direction_along_axis() {
        assert_eq!(Direction::along(Axis::Horizontal, -1.0), Direction::Left);
        assert_eq!(Direction::along(Axis::Horizontal, 0.0), Direction::Right);
        assert_eq!(Direction::along(Axis::Vertical, -3.0), Direction::Up);
        assert_eq!(Direction::along(Axis::Vertical, 3.0), Direction::Down);
    }

    #[test]
    fn test_direction_applies_to() {
        assert!(Direction::Left.applies_to(TriggerType::Swipe));
        assert!(!Direction::Left.applies_to(TriggerType::Pinch));
        assert!(Direction::Out.applies_to(TriggerType::Pinch));
        assert!(Direction::Clockwise.applies_to(TriggerType::Rotate));
        assert!(Direction::Any.applies_to(TriggerType::Hold));
        assert!(!Direction::Up.applies_to(TriggerType::Stroke));
    }

    #[test]
    fn test_axis_dominant() {
        assert_eq!(Axis::dominant(Point::new(3.0, -2.0)), Axis::Horizontal);
        assert_eq!(Axis::dominant(Point::new(1.0, -2.0)), Axis::Vertical);
        assert_eq!(Axis::dominant(Point::new(2.0, 2.0)), Axis::Horizontal);
    }

    #[test]
    fn test_satisfies_begin() {
        let gesture = Gesture::new("g", TriggerType::Hold).with_fingers(2, 3);
        let none = Modifiers::default();
        assert!(!gesture.satisfies_begin(1, &none));
        assert!(gesture.satisfies_begin(2, &none));
        assert!(gesture.satisfies_begin(3, &none));
        assert!(!gesture.satisfies_begin(4, &none));
    }

    #[test]
    fn test_satisfies_begin_modifiers() {
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        let gesture = Gesture::new("g", TriggerType::Swipe).with_modifiers(ctrl);
        assert!(!gesture.satisfies_begin(3, &Modifiers::default()));
        assert!(gesture.satisfies_begin(3, &ctrl));
    }

    #[test]
    fn test_disabled_never_begins() {
        let mut gesture = Gesture::new("g", TriggerType::Hold);
        gesture.enabled = false;
        assert!(!gesture.satisfies_begin(3, &Modifiers::default()));
    }

    #[test]
    fn test_inverted_finger_range_never_begins() {
        let gesture = Gesture::new("g", TriggerType::Hold).with_fingers(4, 2);
        for fingers in 0..=6 {
            assert!(!gesture.satisfies_begin(fingers, &Modifiers::default()));
        }
    }

    #[test]
    fn test_satisfies_update_speed() {
        let gesture = Gesture::new("g", TriggerType::Stroke).with_speed(Speed::Fast);
        let fast = TriggerUpdate::Stroke(MotionUpdate {
            delta: 1.0,
            speed: Speed::Fast,
        });
        let slow = TriggerUpdate::Stroke(MotionUpdate {
            delta: 1.0,
            speed: Speed::Slow,
        });
        assert!(gesture.satisfies_update(&fast));
        assert!(!gesture.satisfies_update(&slow));
    }

    #[test]
    fn test_satisfies_update_direction() {
        let gesture = Gesture::new("g", TriggerType::Swipe).with_direction(Direction::Vertical);
        let up = swipe(Direction::Up, -4.0);
        let left = swipe(Direction::Left, -4.0);
        assert!(gesture.satisfies_update(&up));
        assert!(!gesture.satisfies_update(&left));
    }

    #[test]
    fn test_progress_and_finish() {
        let mut gesture = Gesture::new("g", TriggerType::Swipe).with_threshold(10.0);
        gesture.activate();
        assert_eq!(gesture.phase(), GesturePhase::Active);
        gesture.advance(-6.0);
        assert!(!gesture.threshold_reached());
        gesture.advance(4.0);
        assert!(gesture.threshold_reached());
        gesture.finish(GesturePhase::Ended);
        assert_eq!(gesture.phase(), GesturePhase::Idle);
        assert_eq!(gesture.progress(), 0.0);
    }

    #[test]
    fn test_no_threshold_is_always_reached() {
        let gesture = Gesture::new("g", TriggerType::Hold);
        assert!(gesture.threshold_reached());
    }

    #[test]
    fn test_to_sexp() {
        let gesture = Gesture::new("ws-left", TriggerType::Swipe)
            .with_fingers(3, 4)
            .with_direction(Direction::Left)
            .with_threshold(50.0)
            .trigger_on_threshold(true);
        let sexp = gesture.to_sexp();
        assert!(sexp.contains(":name \"ws-left\""));
        assert!(sexp.contains(":type swipe"));
        assert!(sexp.contains(":fingers (3 4)"));
        assert!(sexp.contains(":direction left"));
        assert!(sexp.contains(":threshold 50"));
        assert!(sexp.contains(":trigger-on-threshold t"));
    }

    fn swipe(direction: Direction, delta: f64) -> TriggerUpdate {
        TriggerUpdate::Swipe(DirectionalUpdate {
            delta,
            direction,
            speed: Speed::Any,
            delta_scaled: Point::default(),
        })
    }
}
