//! Per-user undo stacks.
//!
//! Each signed-in user gets their own [`SharedUndoStack`]. Login starts the
//! user on an empty stack; logout discards it.

use std::collections::HashMap;

use agency_core::undo::SharedUndoStack;
use parking_lot::Mutex;

pub struct UndoRegistry {
    capacity: usize,
    stacks: Mutex<HashMap<String, SharedUndoStack>>,
}

impl UndoRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            stacks: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The user's stack, created empty on first use.
    pub fn stack_for(&self, user_id: &str) -> SharedUndoStack {
        self.stacks
            .lock()
            .entry(user_id.to_string())
            .or_insert_with(|| SharedUndoStack::with_capacity(self.capacity))
            .clone()
    }

    /// Empty the user's stack, creating it if needed.
    pub fn reset(&self, user_id: &str) {
        self.stack_for(user_id).reset();
    }

    /// Empty and forget the user's stack.
    pub fn remove(&self, user_id: &str) {
        if let Some(stack) = self.stacks.lock().remove(user_id) {
            stack.reset();
        }
    }
}
