//! Recognition context — owns the recognizer, the touchpad handler, modifier
//! state and the stroke timeout timer, and routes input events between them.

use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::{debug, info, warn};

use crate::gesture::TriggerType;
use crate::handler::{HandlerConfig, MultiTouchMotionTriggerHandler, TriggerHandler};
use crate::input::{Episode, GestureUpdate, InputEvent, Keyboard};
use crate::recognizer::{GestureEvent, GestureRecognizer, TriggerUpdate};
use crate::stroke::{Point, Stroke};

/// Central recognition state.  One per input seat.
pub struct GestureState {
    pub recognizer: GestureRecognizer,
    pub touchpad: MultiTouchMotionTriggerHandler,
    pub keyboard: Keyboard,

    // Event loop used for the stroke timeout.  `None` disables the timer.
    loop_handle: Option<LoopHandle<'static, GestureState>>,
    stroke_timer: Option<RegistrationToken>,

    // The host reported a pinch begin that has not ended yet.
    pinch_active: bool,

    // Stroke recording
    recording_stroke: bool,
    recorded: Vec<Point>,
}

impl GestureState {
    pub fn new(config: HandlerConfig, loop_handle: Option<LoopHandle<'static, GestureState>>) -> Self {
        info!(
            timer = loop_handle.is_some(),
            "GestureState initialized {}",
            config.config_sexp()
        );
        Self {
            recognizer: GestureRecognizer::new(),
            touchpad: MultiTouchMotionTriggerHandler::new(config),
            keyboard: Keyboard::new(),
            loop_handle,
            stroke_timer: None,
            pinch_active: false,
            recording_stroke: false,
            recorded: Vec::new(),
        }
    }

    /// Feed one input event.  Returns whether it should be hidden from the
    /// rest of the host's input pipeline.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::KeyModifier { code, pressed } => {
                self.keyboard.handle_key(code, pressed);
                false
            }
            InputEvent::GestureBegin { episode, fingers } => self.begin_episode(episode, fingers),
            InputEvent::GestureUpdate(update) => self.update_episode(update),
            InputEvent::GestureEnd { episode } => self.end_episode(episode),
            InputEvent::GestureCancel { episode } => {
                self.cancel_episode(episode);
                false
            }
        }
    }

    /// Capture the next swipe episode as a stroke instead of recognizing it.
    pub fn record_stroke(&mut self) {
        info!("stroke recording started");
        self.recording_stroke = true;
        self.recorded.clear();
    }

    pub fn is_recording_stroke(&self) -> bool {
        self.recording_stroke
    }

    /// Take all pending lifecycle events.
    pub fn drain_events(&mut self) -> Vec<GestureEvent> {
        self.recognizer.drain_events()
    }

    fn begin_episode(&mut self, episode: Episode, fingers: u8) -> bool {
        if self.recording_stroke && episode == Episode::Swipe {
            return true;
        }
        if episode == Episode::Pinch {
            self.pinch_active = true;
        }
        debug!(episode = episode.as_str(), fingers, "gesture begin");
        let modifiers = self.keyboard.modifiers();
        self.touchpad
            .begin_all(&mut self.recognizer, episode.triggers(), fingers, &modifiers);
        false
    }

    fn update_episode(&mut self, update: GestureUpdate) -> bool {
        match update {
            GestureUpdate::Motion { delta } => {
                if self.recording_stroke {
                    self.recorded.push(delta);
                    self.arm_stroke_timer();
                    return true;
                }
                if self.recognizer.has_active(TriggerType::Stroke) {
                    self.arm_stroke_timer();
                }
                let consumed = self.touchpad.motion_update(&mut self.recognizer, delta);
                // The timeout only ends stroke episodes.
                if !self.recognizer.has_active(TriggerType::Stroke) {
                    self.disarm_stroke_timer();
                }
                consumed
            }
            GestureUpdate::Pinch {
                scale,
                angle_delta,
                delta,
            } => {
                // Two-finger pinches can start out reported as scrolling, in
                // which case no begin ever arrives.
                if !self.pinch_active {
                    debug!("pinch update without begin, synthesizing one");
                    self.begin_episode(Episode::Pinch, 2);
                }
                self.touchpad
                    .pinch_update(&mut self.recognizer, scale, angle_delta, delta)
            }
            GestureUpdate::Hold { delta_ms } => {
                let updates = [
                    TriggerUpdate::Hold { delta_ms },
                    TriggerUpdate::Press { delta_ms },
                ];
                self.touchpad
                    .update_triggers(&mut self.recognizer, &updates)
                    .consumed
            }
        }
    }

    fn end_episode(&mut self, episode: Episode) -> bool {
        if episode == Episode::Swipe {
            self.disarm_stroke_timer();
            if self.recording_stroke {
                self.finish_stroke_recording();
                return true;
            }
        }
        if episode == Episode::Pinch {
            self.pinch_active = false;
        }
        let mut ended = false;
        for &trigger in episode.triggers() {
            ended |= self.touchpad.end(&mut self.recognizer, trigger);
        }
        debug!(episode = episode.as_str(), ended, "gesture end");
        ended
    }

    fn cancel_episode(&mut self, episode: Episode) {
        match episode {
            Episode::Swipe => self.disarm_stroke_timer(),
            Episode::Pinch => self.pinch_active = false,
            _ => {}
        }
        for &trigger in episode.triggers() {
            self.touchpad.cancel(&mut self.recognizer, trigger);
        }
        debug!(episode = episode.as_str(), "gesture cancel");
    }

    fn finish_stroke_recording(&mut self) {
        self.recording_stroke = false;
        let stroke = Stroke::from_deltas(&self.recorded);
        self.recorded.clear();
        if stroke.is_empty() {
            warn!("stroke recording finished without motion");
            return;
        }
        info!("stroke recorded {}", stroke.to_sexp());
        self.recognizer.push_event(GestureEvent::StrokeRecorded(stroke));
    }

    // ── Stroke timeout ─────────────────────────────────────

    /// No motion arrived within the stroke timeout: treat the swipe episode
    /// as ended.  A swipe without stroke candidates is left running.
    pub fn stroke_timeout_elapsed(&mut self) {
        self.stroke_timer = None;
        if !self.recording_stroke && !self.recognizer.has_active(TriggerType::Stroke) {
            return;
        }
        debug!("stroke timed out, ending swipe episode");
        self.end_episode(Episode::Swipe);
    }

    fn arm_stroke_timer(&mut self) {
        let Some(handle) = self.loop_handle.clone() else {
            return;
        };
        if let Some(token) = self.stroke_timer.take() {
            handle.remove(token);
        }
        let timeout = Duration::from_millis(self.touchpad.motion().config().stroke_timeout_ms);
        match handle.insert_source(Timer::from_duration(timeout), |_, _, state| {
            state.stroke_timeout_elapsed();
            TimeoutAction::Drop
        }) {
            Ok(token) => self.stroke_timer = Some(token),
            Err(e) => warn!("failed to insert stroke timer: {}", e.error),
        }
    }

    fn disarm_stroke_timer(&mut self) {
        if let (Some(handle), Some(token)) = (&self.loop_handle, self.stroke_timer.take()) {
            handle.remove(token);
        }
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        let motion = self.touchpad.motion();
        format!(
            "(:recognizer {} :axis {} :speed {} :pinch-type {} :modifiers {} :recording {})",
            self.recognizer.status_sexp(),
            motion.axis().as_str(),
            motion.speed().as_str(),
            self.touchpad.pinch_type().as_str(),
            self.keyboard.modifiers().to_sexp(),
            if self.recording_stroke { "t" } else { "nil" },
        )
    }
}
