#![forbid(unsafe_code)]

//! Reversible operations over the document model.
//!
//! An [`Operation`] is one unit of undoable change: a tagged variant over
//! add, delete, move, and edit, each carrying enough owned state to both
//! apply and reverse itself against a [`Document`].
//!
//! # Design Principles
//!
//! 1. **Deep copies only**: variants own snapshots of any block state they
//!    restore — never references into the live document — so later document
//!    mutation cannot corrupt a recorded operation.
//! 2. **Snapshot before mutation**: [`Operation::delete`] and
//!    [`Operation::reorder`] take the document *before* the caller mutates
//!    it, making the capture ordering a construction-order fact.
//! 3. **Stale ids are expected**: `apply`/`revert` report `false` on an id
//!    that no longer resolves instead of panicking; the engine logs and
//!    moves on.

use fabula_model::{Block, BlockId, ContentSnapshot, Document};

/// A reversible unit of change recorded for undo/redo.
#[derive(Debug, Clone)]
pub enum Operation {
    /// A block was inserted. The snapshot lets redo reinstate the block
    /// after an undo removed it; when the block is already present the
    /// forward transform is a no-op.
    Add {
        /// Deep copy of the block as inserted (its id is the recorded id).
        block: Block,
        /// Position the block was inserted at.
        index: usize,
    },
    /// A block was removed. Captured before the caller deletes.
    Delete {
        /// Id the block had when it was removed.
        id: BlockId,
        /// Position the block occupied.
        index: usize,
        /// Deep copy of the block as it was before removal.
        snapshot: Block,
        /// Whether the block was selected, so undo can re-select it.
        was_selected: bool,
    },
    /// A block was reordered relative to a target. Captured before the
    /// caller reorders.
    Move {
        /// Id of the dragged block, pre-move.
        dragged: BlockId,
        /// Id of the block it was dropped next to, pre-move.
        target: BlockId,
        /// Whether the drop landed after the target.
        insert_after: bool,
        /// Position the dragged block came from.
        original_index: usize,
    },
    /// A block's content changed. Full field-set snapshots, not diffs.
    Edit {
        /// Id of the edited block.
        id: BlockId,
        /// Mutable field set before the edit.
        before: ContentSnapshot,
        /// Mutable field set after the edit.
        after: ContentSnapshot,
    },
}

impl Operation {
    /// Record an insertion that the caller has already performed.
    ///
    /// Returns `None` if `id` does not resolve.
    #[must_use]
    pub fn add(doc: &Document, id: BlockId) -> Option<Self> {
        let index = doc.index_of(id)?;
        Some(Self::Add {
            block: doc.blocks()[index].clone(),
            index,
        })
    }

    /// Record a removal the caller is *about* to perform.
    ///
    /// Must be constructed before the block is deleted, since the snapshot
    /// has to reflect pre-delete state. Returns `None` if `id` does not
    /// resolve.
    #[must_use]
    pub fn delete(doc: &Document, id: BlockId) -> Option<Self> {
        let index = doc.index_of(id)?;
        Some(Self::Delete {
            id,
            index,
            snapshot: doc.blocks()[index].clone(),
            was_selected: doc.selected_id() == Some(id),
        })
    }

    /// Record a reorder the caller is *about* to perform.
    ///
    /// Returns `None` if either id does not resolve or they are equal (a
    /// reorder onto itself is a no-op, not an operation).
    #[must_use]
    pub fn reorder(
        doc: &Document,
        dragged: BlockId,
        target: BlockId,
        insert_after: bool,
    ) -> Option<Self> {
        if dragged == target {
            return None;
        }
        let original_index = doc.index_of(dragged)?;
        doc.index_of(target)?;
        Some(Self::Move {
            dragged,
            target,
            insert_after,
            original_index,
        })
    }

    /// Record a content edit from its before/after snapshots.
    #[must_use]
    pub fn edit(id: BlockId, before: ContentSnapshot, after: ContentSnapshot) -> Self {
        Self::Edit { id, before, after }
    }

    /// Apply the forward transform. Used when committing an operation the
    /// caller has not already applied, and for redo.
    ///
    /// Returns whether the document changed (or the effect was already in
    /// place, for [`Operation::Add`]).
    pub fn apply(&self, doc: &mut Document) -> bool {
        match self {
            Self::Add { block, index } => {
                // Already-inserted commit path: the live block at that id
                // is the very block this operation recorded.
                if doc.get(block.id) == Some(block) {
                    return true;
                }
                doc.restore_at(*index, block.clone(), false);
                true
            }
            Self::Delete { id, .. } => doc.delete(*id),
            Self::Move {
                dragged,
                target,
                insert_after,
                ..
            } => doc.reorder(*dragged, *target, *insert_after),
            Self::Edit { id, after, .. } => doc.apply_content(*id, after),
        }
    }

    /// Apply the reverse transform, restoring the state from before the
    /// forward transform ran.
    pub fn revert(&self, doc: &mut Document) -> bool {
        match self {
            Self::Add { block, .. } => doc.delete(block.id),
            Self::Delete {
                index,
                snapshot,
                was_selected,
                ..
            } => {
                doc.restore_at(*index, snapshot.clone(), *was_selected);
                true
            }
            Self::Move {
                target,
                insert_after,
                original_index,
                ..
            } => {
                // Ids are positional under the density invariant, so the
                // index the forward transform landed on is recomputable
                // from the captured pre-move fields.
                let Some(target_index) = (target.raw() as usize).checked_sub(1) else {
                    return false;
                };
                let shifted = if *original_index < target_index {
                    target_index - 1
                } else {
                    target_index
                };
                let landed = shifted + usize::from(*insert_after);
                doc.relocate(landed, *original_index)
            }
            Self::Edit { id, before, .. } => doc.apply_content(*id, before),
        }
    }

    /// Human-readable description for UI display.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "Add block",
            Self::Delete { .. } => "Delete block",
            Self::Move { .. } => "Move block",
            Self::Edit { .. } => "Edit block",
        }
    }

    /// The block this operation affects, for change notification.
    #[must_use]
    pub fn block_id(&self) -> BlockId {
        match self {
            Self::Add { block, .. } => block.id,
            Self::Delete { id, .. } => *id,
            Self::Move { dragged, .. } => *dragged,
            Self::Edit { id, .. } => *id,
        }
    }

    /// Whether this operation would change nothing: an edit whose before
    /// and after content are equal. Such operations never enter history.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Edit { before, after, .. } => before.same_content(after),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
