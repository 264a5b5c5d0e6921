//! Input boundary: gesture episodes and keyboard modifier tracking.
//!
//! Hosts translate their device events into `InputEvent`s and feed them to
//! `GestureState::handle_input`.  Keys only matter for modifier
//! preconditions; they are never consumed.

use tracing::trace;

use crate::gesture::TriggerType;
use crate::stroke::Point;

// evdev key codes (linux/input-event-codes.h)
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;
pub const KEY_LEFTMETA: u32 = 125;
pub const KEY_RIGHTMETA: u32 = 126;

/// One physical gesture as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Episode {
    Hold,
    /// Multi-finger or pointer motion, feeds swipe and stroke gestures.
    Swipe,
    /// Two-finger scale/rotate.
    Pinch,
    Press,
}

impl Episode {
    /// Leaf types this episode may touch.  Pinch episodes also carry rotate.
    pub fn triggers(self) -> &'static [TriggerType] {
        match self {
            Self::Hold => &[TriggerType::Hold],
            Self::Swipe => &[TriggerType::Swipe, TriggerType::Stroke],
            Self::Pinch => &[TriggerType::Pinch, TriggerType::Rotate],
            Self::Press => &[TriggerType::Press],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Swipe => "swipe",
            Self::Pinch => "pinch",
            Self::Press => "press",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hold" => Some(Self::Hold),
            "swipe" => Some(Self::Swipe),
            "pinch" => Some(Self::Pinch),
            "press" => Some(Self::Press),
            _ => None,
        }
    }
}

/// A sample within an episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    Motion { delta: Point },
    Pinch { scale: f64, angle_delta: f64, delta: Point },
    /// Elapsed time for hold and press episodes.
    Hold { delta_ms: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    GestureBegin { episode: Episode, fingers: u8 },
    GestureUpdate(GestureUpdate),
    GestureEnd { episode: Episode },
    GestureCancel { episode: Episode },
    KeyModifier { code: u32, pressed: bool },
}

// ── Modifiers ──────────────────────────────────────────────

/// Keyboard modifier state, left and right keys folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub logo: bool,
}

impl Modifiers {
    /// Parse one modifier name into `self`.  Returns false if unknown.
    pub fn set_named(&mut self, name: &str) -> bool {
        match name {
            "ctrl" | "control" => self.ctrl = true,
            "alt" | "meta" => self.alt = true,
            "shift" => self.shift = true,
            "logo" | "super" => self.logo = true,
            _ => return false,
        }
        true
    }

    pub fn to_sexp(&self) -> String {
        let mut names = Vec::new();
        if self.ctrl {
            names.push("ctrl");
        }
        if self.alt {
            names.push("alt");
        }
        if self.shift {
            names.push("shift");
        }
        if self.logo {
            names.push("logo");
        }
        format!("({})", names.join(" "))
    }
}

/// Tracks held modifier keys.
#[derive(Debug, Default)]
pub struct Keyboard {
    modifiers: Modifiers,
    // Per-side state so releasing one ctrl keeps the other held.
    left_right: [bool; 8],
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Update modifier state.  Non-modifier keys are ignored.
    pub fn handle_key(&mut self, code: u32, pressed: bool) {
        let slot = match code {
            KEY_LEFTCTRL => 0,
            KEY_RIGHTCTRL => 1,
            KEY_LEFTALT => 2,
            KEY_RIGHTALT => 3,
            KEY_LEFTSHIFT => 4,
            KEY_RIGHTSHIFT => 5,
            KEY_LEFTMETA => 6,
            KEY_RIGHTMETA => 7,
            _ => return,
        };
        self.left_right[slot] = pressed;
        let held = |a: usize| self.left_right[a] || self.left_right[a + 1];
        self.modifiers = Modifiers {
            ctrl: held(0),
            alt: held(2),
            shift: held(4),
            logo: held(6),
        };
        trace!(code, pressed, modifiers = %self.modifiers.to_sexp(), "modifier key");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_press_release() {
        let mut keyboard = Keyboard::new();
        keyboard.handle_key(KEY_LEFTCTRL, true);
        assert!(keyboard.modifiers().ctrl);
        keyboard.handle_key(KEY_LEFTCTRL, false);
        assert_eq!(keyboard.modifiers(), Modifiers::default());
    }

    #[test]
    fn test_both_sides_held() {
        let mut keyboard = Keyboard::new();
        keyboard.handle_key(KEY_LEFTSHIFT, true);
        keyboard.handle_key(KEY_RIGHTSHIFT, true);
        keyboard.handle_key(KEY_LEFTSHIFT, false);
        assert!(keyboard.modifiers().shift, "right shift still held");
    }

    #[test]
    fn test_non_modifier_ignored() {
        let mut keyboard = Keyboard::new();
        keyboard.handle_key(30, true);
        assert_eq!(keyboard.modifiers(), Modifiers::default());
    }

    #[test]
    fn test_modifiers_sexp() {
        let mut modifiers = Modifiers::default();
        assert!(modifiers.set_named("ctrl"));
        assert!(modifiers.set_named("super"));
        assert!(!modifiers.set_named("hyper"));
        assert_eq!(modifiers.to_sexp(), "(ctrl logo)");
        assert_eq!(Modifiers::default().to_sexp(), "()");
    }

    #[test]
    fn test_episode_triggers() {
        assert_eq!(
            Episode::Swipe.triggers(),
            &[TriggerType::Swipe, TriggerType::Stroke]
        );
        assert_eq!(
            Episode::Pinch.triggers(),
            &[TriggerType::Pinch, TriggerType::Rotate]
        );
        assert_eq!(Episode::parse("hold"), Some(Episode::Hold));
        assert_eq!(Episode::parse("tap"), None);
    }
}
