#![forbid(unsafe_code)]

//! History stack for undo/redo over recorded operations.
//!
//! [`HistoryEngine`] maintains dual stacks with a depth limit and a
//! reentrancy guard:
//!
//! - **Depth limit**: the oldest undo entry is evicted past capacity
//! - **Branch handling**: committing clears the redo stack
//! - **Reentrancy guard**: engine calls made while a mutation is in
//!   flight are silently dropped
//! - **Notification**: a synchronous callback fires at the end of each
//!   successful commit/undo/redo
//!
//! # Invariants
//!
//! 1. `undo_stack.len() <= config.max_depth` (after any operation)
//! 2. Redo stack is cleared whenever a new operation is committed
//! 3. No-op operations never enter either stack
//! 4. The guard is instance state; independent engines never share it
//!
//! ```text
//! commit(op5)
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [op1, op2, op3, op4, op5]         │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [op1, op2, op3]                   │
//! │ Redo Stack: [op4, op5]                        │
//! └───────────────────────────────────────────────┘
//!
//! commit(op6)  <-- new branch, clears redo
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [op1, op2, op3, op6]              │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace, warn};

use fabula_model::{BlockId, Document};

use crate::operation::Operation;

/// Configuration for the history engine.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of operations to keep in undo history.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl HistoryConfig {
    /// Create a configuration with a custom depth limit.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create an unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// What an engine call just did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    /// A new operation entered the undo stack.
    Committed,
    /// An operation was reversed onto the redo stack.
    Undone,
    /// An undone operation was re-applied.
    Redone,
}

/// Notification payload delivered after each successful engine call.
///
/// The collaborator is expected to re-render the affected block's list
/// entry and, if it is the selected block, its detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEvent {
    /// Which transition happened.
    pub action: HistoryAction,
    /// The block the operation affects.
    pub block: BlockId,
    /// Human-readable operation description.
    pub label: &'static str,
}

/// Callback invoked synchronously at the end of each engine call.
pub type NotifyFn = Box<dyn FnMut(&Document, &HistoryEvent) + Send>;

/// Undo/redo engine over recorded [`Operation`]s.
///
/// The engine owns no document; every call takes the document it operates
/// on. Switching documents requires [`HistoryEngine::clear`] so history
/// recorded against one document never replays into another.
pub struct HistoryEngine {
    /// Operations available for undo (newest at back).
    undo_stack: VecDeque<Operation>,
    /// Operations available for redo (newest at back).
    redo_stack: VecDeque<Operation>,
    /// Depth limit configuration.
    config: HistoryConfig,
    /// Reentrancy guard: set while a commit/undo/redo is in flight, so a
    /// transform or notifier that calls back into the engine is dropped
    /// instead of corrupting the stacks.
    in_mutation: bool,
    /// Change notification callback.
    notifier: Option<NotifyFn>,
}

impl fmt::Debug for HistoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEngine")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("in_mutation", &self.in_mutation)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryEngine {
    /// Create a new engine with the given configuration.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
            in_mutation: false,
            notifier: None,
        }
    }

    /// Set the notification callback.
    pub fn set_notifier(
        &mut self,
        notifier: impl FnMut(&Document, &HistoryEvent) + Send + 'static,
    ) {
        self.notifier = Some(Box::new(notifier));
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Record an operation, applying its forward transform first unless the
    /// caller already mutated the document (`already_applied`).
    ///
    /// Returns `false` without touching either stack when the guard is
    /// held, when the operation is a no-op, or when a not-yet-applied
    /// forward transform has no effect (stale ids).
    pub fn commit(&mut self, doc: &mut Document, op: Operation, already_applied: bool) -> bool {
        if self.in_mutation {
            trace!(label = op.label(), "commit dropped: mutation in flight");
            return false;
        }
        if op.is_noop() {
            trace!(label = op.label(), "commit skipped: no-op");
            return false;
        }
        self.in_mutation = true;
        if !already_applied && !op.apply(doc) {
            warn!(label = op.label(), "commit dropped: forward transform had no effect");
            self.in_mutation = false;
            return false;
        }
        let event = HistoryEvent {
            action: HistoryAction::Committed,
            block: op.block_id(),
            label: op.label(),
        };
        self.undo_stack.push_back(op);
        while self.undo_stack.len() > self.config.max_depth {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        debug!(
            label = event.label,
            undo_depth = self.undo_stack.len(),
            "committed operation"
        );
        self.notify(doc, &event);
        self.in_mutation = false;
        true
    }

    /// Reverse the most recent operation.
    ///
    /// Returns `false` if there is nothing to undo or the guard is held.
    /// A reverse transform hitting a stale id still moves the operation to
    /// the redo stack; it is an expected condition, not an error.
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        if self.in_mutation {
            trace!("undo dropped: mutation in flight");
            return false;
        }
        let Some(op) = self.undo_stack.pop_back() else {
            return false;
        };
        self.in_mutation = true;
        if !op.revert(doc) {
            warn!(label = op.label(), "undo: reverse transform had no effect");
        }
        let event = HistoryEvent {
            action: HistoryAction::Undone,
            block: op.block_id(),
            label: op.label(),
        };
        self.redo_stack.push_back(op);
        debug!(label = event.label, "undid operation");
        self.notify(doc, &event);
        self.in_mutation = false;
        true
    }

    /// Re-apply the most recently undone operation.
    ///
    /// Returns `false` if there is nothing to redo or the guard is held.
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        if self.in_mutation {
            trace!("redo dropped: mutation in flight");
            return false;
        }
        let Some(op) = self.redo_stack.pop_back() else {
            return false;
        };
        self.in_mutation = true;
        if !op.apply(doc) {
            warn!(label = op.label(), "redo: forward transform had no effect");
        }
        let event = HistoryEvent {
            action: HistoryAction::Redone,
            block: op.block_id(),
            label: op.label(),
        };
        self.undo_stack.push_back(op);
        debug!(label = event.label, "redid operation");
        self.notify(doc, &event);
        self.in_mutation = false;
        true
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo stack depth.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Description of the next operation undo would reverse.
    #[must_use]
    pub fn next_undo_label(&self) -> Option<&'static str> {
        self.undo_stack.back().map(Operation::label)
    }

    /// Description of the next operation redo would re-apply.
    #[must_use]
    pub fn next_redo_label(&self) -> Option<&'static str> {
        self.redo_stack.back().map(Operation::label)
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Empty both stacks. Required when switching to a different document,
    /// so operations scoped to one document never replay into another.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn notify(&mut self, doc: &Document, event: &HistoryEvent) {
        if let Some(notifier) = &mut self.notifier {
            notifier(doc, event);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_model::Schema;
    use std::sync::{Arc, Mutex};

    /// Append a block through the document and record the matching
    /// operation, the way a controller does it.
    fn add_block(doc: &mut Document, engine: &mut HistoryEngine, schema: &Schema) -> BlockId {
        let id = doc.add("narrative", schema).id;
        let op = Operation::add(doc, id).expect("block just added");
        assert!(engine.commit(doc, op, true));
        id
    }

    fn edit_block(doc: &mut Document, engine: &mut HistoryEngine, id: BlockId, text: &str) {
        let before = doc.get(id).expect("block present").content();
        doc.update(id, |c| c.text = Some(text.to_string()));
        let after = doc.get(id).expect("block present").content();
        assert!(engine.commit(doc, Operation::edit(id, before, after), true));
    }

    #[test]
    fn new_engine_is_empty() {
        let engine = HistoryEngine::default();
        assert!(!engine.can_undo());
        assert!(!engine.can_redo());
        assert_eq!(engine.undo_depth(), 0);
        assert_eq!(engine.redo_depth(), 0);
        assert_eq!(engine.next_undo_label(), None);
    }

    #[test]
    fn commit_enables_undo() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        add_block(&mut doc, &mut engine, &schema);

        assert!(engine.can_undo());
        assert!(!engine.can_redo());
        assert_eq!(engine.next_undo_label(), Some("Add block"));
    }

    #[test]
    fn undo_enables_redo() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        add_block(&mut doc, &mut engine, &schema);

        assert!(engine.undo(&mut doc));
        assert!(doc.is_empty());
        assert!(!engine.can_undo());
        assert!(engine.can_redo());
        assert_eq!(engine.next_redo_label(), Some("Add block"));
    }

    #[test]
    fn redo_moves_back_to_undo() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        add_block(&mut doc, &mut engine, &schema);
        engine.undo(&mut doc);

        assert!(engine.redo(&mut doc));
        assert_eq!(doc.len(), 1);
        assert!(engine.can_undo());
        assert!(!engine.can_redo());
    }

    #[test]
    fn commit_clears_redo() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        add_block(&mut doc, &mut engine, &schema);
        engine.undo(&mut doc);
        assert!(engine.can_redo());

        add_block(&mut doc, &mut engine, &schema);
        assert!(!engine.can_redo());
        assert_eq!(engine.redo_depth(), 0);
    }

    #[test]
    fn noop_edit_neither_pushes_nor_clears_redo() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        let id = add_block(&mut doc, &mut engine, &schema);
        edit_block(&mut doc, &mut engine, id, "draft");
        engine.undo(&mut doc);
        assert!(engine.can_redo());
        let depth = engine.undo_depth();

        let content = doc.get(id).unwrap().content();
        let noop = Operation::edit(id, content.clone(), content);
        assert!(!engine.commit(&mut doc, noop, true));

        assert_eq!(engine.undo_depth(), depth);
        assert!(engine.can_redo(), "no-op commit must not invalidate redo");
    }

    #[test]
    fn guarded_engine_drops_calls() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        let id = add_block(&mut doc, &mut engine, &schema);

        engine.in_mutation = true;
        let op = Operation::delete(&doc, id).unwrap();
        assert!(!engine.commit(&mut doc, op, true));
        assert!(!engine.undo(&mut doc));
        assert!(!engine.redo(&mut doc));
        assert_eq!(engine.undo_depth(), 1);
        engine.in_mutation = false;

        assert!(engine.undo(&mut doc));
    }

    #[test]
    fn commit_with_unapplied_stale_op_is_dropped() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        let id = add_block(&mut doc, &mut engine, &schema);
        let content = doc.get(id).unwrap().content();
        let mut changed = content.clone();
        changed.text = Some("x".into());
        doc.delete(id);

        let stale = Operation::edit(id, content, changed);
        assert!(!engine.commit(&mut doc, stale, false));
        assert_eq!(engine.undo_depth(), 1);
    }

    #[test]
    fn commit_applies_forward_transform_when_not_already_applied() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        let id = add_block(&mut doc, &mut engine, &schema);

        let before = doc.get(id).unwrap().content();
        let mut after = before.clone();
        after.text = Some("applied by the engine".into());
        assert!(engine.commit(&mut doc, Operation::edit(id, before, after), false));
        assert_eq!(
            doc.get(id).unwrap().text.as_deref(),
            Some("applied by the engine")
        );
    }

    #[test]
    fn depth_limit_evicts_oldest() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::new(HistoryConfig::new(3));
        for _ in 0..5 {
            add_block(&mut doc, &mut engine, &schema);
        }
        assert_eq!(engine.undo_depth(), 3);
    }

    #[test]
    fn bounded_stack_keeps_hundred_and_evicts_first() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        for _ in 0..101 {
            add_block(&mut doc, &mut engine, &schema);
        }
        assert_eq!(engine.undo_depth(), 100);

        while engine.undo(&mut doc) {}
        // The very first add was evicted, so one block survives full undo.
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn clear_empties_both_stacks() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        add_block(&mut doc, &mut engine, &schema);
        add_block(&mut doc, &mut engine, &schema);
        engine.undo(&mut doc);

        engine.clear();
        assert!(!engine.can_undo());
        assert!(!engine.can_redo());
    }

    #[test]
    fn notifier_sees_each_transition() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.set_notifier(move |_, event| {
            sink.lock().unwrap().push(event.action);
        });

        add_block(&mut doc, &mut engine, &schema);
        engine.undo(&mut doc);
        engine.redo(&mut doc);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                HistoryAction::Committed,
                HistoryAction::Undone,
                HistoryAction::Redone,
            ]
        );
    }

    #[test]
    fn notifier_not_called_for_dropped_commit() {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let mut engine = HistoryEngine::default();
        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        engine.set_notifier(move |_, _| *sink.lock().unwrap() += 1);

        let id = add_block(&mut doc, &mut engine, &schema);
        let content = doc.get(id).unwrap().content();
        let noop = Operation::edit(id, content.clone(), content);
        engine.commit(&mut doc, noop, true);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn debug_reports_depths() {
        let engine = HistoryEngine::default();
        let debug_str = format!("{:?}", engine);
        assert!(debug_str.contains("HistoryEngine"));
        assert!(debug_str.contains("undo_depth"));
    }
}
