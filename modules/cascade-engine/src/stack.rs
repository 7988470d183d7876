//! Pending-work buffer with two insertion ends.

use std::collections::VecDeque;

use crate::action::Action;

/// Double-ended stack of pending actions.
///
/// `push` inserts at the processing end, so repeated pushes pop in reverse
/// order. `unshift` inserts at the far end, so repeated unshifts pop in call
/// order, after everything that sat at the processing end.
#[derive(Debug, Clone, Default)]
pub struct ActionStack {
    // back = processing end
    items: VecDeque<Action>,
}

impl ActionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the processing end: this action is popped next.
    pub fn push(&mut self, action: Action) {
        self.items.push_back(action);
    }

    /// Insert at the far end: this action is popped after everything else.
    pub fn unshift(&mut self, action: Action) {
        self.items.push_front(action);
    }

    /// Remove from the processing end.
    pub fn pop(&mut self) -> Option<Action> {
        self.items.pop_back()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Pending actions in the order they would be popped.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.items.iter().rev()
    }
}
