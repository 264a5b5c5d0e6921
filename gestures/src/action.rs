//! Actions bound to gestures.
//!
//! What an action actually does is up to the embedder; the recognizer only
//! calls `execute()` when a gesture ends and reads `block_other_actions()`
//! before it moves on to sibling candidates.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::info;

/// Capability contract for anything a gesture can trigger.
pub trait Action: fmt::Debug {
    /// Perform the action.  Must not block.
    fn execute(&self);

    /// Whether executing this action stops other candidates of the same
    /// trigger type from being processed in the same tick.
    fn block_other_actions(&self) -> bool {
        false
    }

    /// S-expression description, in the shape the config loader reads.
    fn to_sexp(&self) -> String {
        format!(
            "(:block-other-actions {})",
            if self.block_other_actions() { "t" } else { "nil" }
        )
    }
}

impl<A: Action + ?Sized> Action for Rc<A> {
    fn execute(&self) {
        (**self).execute()
    }

    fn block_other_actions(&self) -> bool {
        (**self).block_other_actions()
    }

    fn to_sexp(&self) -> String {
        (**self).to_sexp()
    }
}

/// An action known only by name.  Logs and counts its executions.
///
/// This is what the config loader produces; hosts that want real effects
/// watch for `GestureEvent::Ended` or register their own `Action`s.
#[derive(Debug, Default)]
pub struct NamedAction {
    pub name: String,
    pub block_other_actions: bool,
    executions: Cell<u32>,
}

impl NamedAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn blocking(mut self, block: bool) -> Self {
        self.block_other_actions = block;
        self
    }

    /// How many times this action has run.
    pub fn executions(&self) -> u32 {
        self.executions.get()
    }
}

impl Action for NamedAction {
    fn execute(&self) {
        self.executions.set(self.executions.get() + 1);
        info!(action = %self.name, "action executed");
    }

    fn block_other_actions(&self) -> bool {
        self.block_other_actions
    }

    fn to_sexp(&self) -> String {
        format!(
            "(:name \"{}\" :block-other-actions {})",
            crate::sexp::escape_string(&self.name),
            if self.block_other_actions { "t" } else { "nil" },
        )
    }
}

/// Wraps a closure as an action.
pub struct FnAction<F> {
    callback: F,
    block_other_actions: bool,
}

impl<F: Fn()> FnAction<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            block_other_actions: false,
        }
    }

    pub fn blocking(callback: F) -> Self {
        Self {
            callback,
            block_other_actions: true,
        }
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("block_other_actions", &self.block_other_actions)
            .finish_non_exhaustive()
    }
}

impl<F: Fn()> Action for FnAction<F> {
    fn execute(&self) {
        (self.callback)()
    }

    fn block_other_actions(&self) -> bool {
        self.block_other_actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_action_counts() {
        let action = NamedAction::new("ws-left");
        assert_eq!(action.executions(), 0);
        action.execute();
        action.execute();
        assert_eq!(action.executions(), 2);
        assert!(!action.block_other_actions());
    }

    #[test]
    fn test_fn_action_runs_callback() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let action = FnAction::blocking(move || counter.set(counter.get() + 1));
        action.execute();
        assert_eq!(hits.get(), 1);
        assert!(action.block_other_actions());
    }

    #[test]
    fn test_shared_action_delegates() {
        let shared = Rc::new(NamedAction::new("lock").blocking(true));
        let bound: Box<dyn Action> = Box::new(shared.clone());
        bound.execute();
        assert_eq!(shared.executions(), 1);
        assert!(bound.block_other_actions());
    }

    #[test]
    fn test_named_action_sexp() {
        let action = NamedAction::new("say \"hi\"").blocking(true);
        assert_eq!(
            action.to_sexp(),
            "(:name \"say \\\"hi\\\"\" :block-other-actions t)"
        );
    }
}
