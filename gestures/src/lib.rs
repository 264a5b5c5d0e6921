//! EWWM gestures - touchpad and pointer gesture recognition.
//!
//! Host input events enter through [`state::GestureState::handle_input`],
//! are routed to the trigger handlers, and drive the lifecycle of the
//! configured gestures in [`recognizer::GestureRecognizer`].

pub mod action;
pub mod config;
pub mod gesture;
pub mod handler;
pub mod input;
pub mod recognizer;
pub mod sexp;
pub mod state;
pub mod stroke;
pub mod trace;
