//! Bounded, most-recent-first stack of one-shot reversals.
//!
//! Any part of the back-office that performs a locally reversible mutation
//! registers a reversal with [`UndoStack::record`]; a single control calls
//! [`UndoStack::undo_most_recent`]. The stack holds at most `capacity`
//! actions and silently evicts the oldest one beyond that, after which that
//! mutation can no longer be reverted.
//!
//! Reversals are fallible. An action is removed from the stack *before* its
//! reversal runs, so a failing reversal is reported through
//! [`ReversalError`] and the action is not put back. Panics inside a reversal
//! are not caught.
//!
//! The stack is purely in memory and is meant to live for one user session;
//! [`UndoStack::reset`] is called at login and logout.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Number of actions kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Caller-supplied procedure that inverts one prior mutation.
pub type Reversal = Box<dyn FnOnce() -> Result<(), CoreError> + Send>;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// One reversible mutation.
pub struct UndoAction {
    id: Uuid,
    description: String,
    timestamp: Timestamp,
    reversal: Reversal,
}

impl UndoAction {
    pub fn new<F>(description: impl Into<String>, reversal: F) -> Self
    where
        F: FnOnce() -> Result<(), CoreError> + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            timestamp: Utc::now(),
            reversal: Box::new(reversal),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn summary(&self) -> UndoEntry {
        UndoEntry {
            id: self.id,
            description: self.description.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Run the reversal, consuming the action. Returns its description.
    pub fn invoke(self) -> Result<String, ReversalError> {
        match (self.reversal)() {
            Ok(()) => Ok(self.description),
            Err(source) => Err(ReversalError {
                description: self.description,
                source,
            }),
        }
    }
}

impl fmt::Debug for UndoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoAction")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// Serializable view of an action, used to render the undo control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndoEntry {
    pub id: Uuid,
    pub description: String,
    pub timestamp: Timestamp,
}

/// A reversal returned an error. The action has already left the stack.
#[derive(Debug, thiserror::Error)]
#[error("Undo of '{description}' failed: {source}")]
pub struct ReversalError {
    pub description: String,
    #[source]
    pub source: CoreError,
}

/// Observable state of the stack; drives whether the undo control is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoState {
    Empty,
    NonEmpty,
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// Most-recent-first stack of [`UndoAction`]s bounded at `capacity`.
#[derive(Debug)]
pub struct UndoStack {
    actions: VecDeque<UndoAction>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    /// A stack holding [`DEFAULT_CAPACITY`] actions.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A stack holding `capacity` actions (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            actions: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a new action at the front.
    ///
    /// Returns the summary of the oldest action when it had to be evicted to
    /// stay within capacity.
    pub fn record<F>(&mut self, description: impl Into<String>, reversal: F) -> Option<UndoEntry>
    where
        F: FnOnce() -> Result<(), CoreError> + Send + 'static,
    {
        self.push(UndoAction::new(description, reversal))
    }

    /// Push an already-built action at the front.
    pub fn push(&mut self, action: UndoAction) -> Option<UndoEntry> {
        self.actions.push_front(action);
        if self.actions.len() > self.capacity {
            self.actions.pop_back().map(|evicted| evicted.summary())
        } else {
            None
        }
    }

    /// Remove the most recent action without running it.
    pub fn pop_most_recent(&mut self) -> Option<UndoAction> {
        self.actions.pop_front()
    }

    /// Pop the most recent action and run its reversal.
    ///
    /// Returns `Ok(None)` with no side effect on an empty stack.
    pub fn undo_most_recent(&mut self) -> Result<Option<String>, ReversalError> {
        match self.pop_most_recent() {
            Some(action) => action.invoke().map(Some),
            None => Ok(None),
        }
    }

    /// Drop every action.
    pub fn reset(&mut self) {
        self.actions.clear();
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn state(&self) -> UndoState {
        if self.is_empty() {
            UndoState::Empty
        } else {
            UndoState::NonEmpty
        }
    }

    /// Summaries, most recent first.
    pub fn entries(&self) -> Vec<UndoEntry> {
        self.actions.iter().map(UndoAction::summary).collect()
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Cloneable handle to one session's [`UndoStack`].
///
/// `undo_most_recent` pops under the lock and runs the reversal after the
/// lock is released, so a reversal may itself record or inspect the stack.
#[derive(Debug, Clone, Default)]
pub struct SharedUndoStack {
    inner: Arc<Mutex<UndoStack>>,
}

impl SharedUndoStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(UndoStack::with_capacity(capacity))),
        }
    }

    pub fn record<F>(&self, description: impl Into<String>, reversal: F) -> Option<UndoEntry>
    where
        F: FnOnce() -> Result<(), CoreError> + Send + 'static,
    {
        self.inner.lock().record(description, reversal)
    }

    pub fn undo_most_recent(&self) -> Result<Option<String>, ReversalError> {
        let action = self.inner.lock().pop_most_recent();
        match action {
            Some(action) => action.invoke().map(Some),
            None => Ok(None),
        }
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn state(&self) -> UndoState {
        self.inner.lock().state()
    }

    pub fn entries(&self) -> Vec<UndoEntry> {
        self.inner.lock().entries()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
