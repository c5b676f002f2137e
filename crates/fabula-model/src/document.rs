#![forbid(unsafe_code)]

//! Ordered block list with selection.
//!
//! [`Document`] owns the narrative order, identity assignment, and the
//! single optional selection pointer. It is exclusively owned by one
//! editing context; operations recorded against it hold copies, never
//! references, so document mutation can never invalidate recorded history.
//!
//! # Invariants
//!
//! 1. After any structural operation (add, delete, relocate, bulk replace)
//!    ids are reassigned to `1..=N` in document order.
//! 2. The selection, if set, always references a present block. It follows
//!    the selected *block* across renumbering, and is cleared when that
//!    block is removed.
//!
//! Violations of either invariant are programming errors, not data errors,
//! and are asserted rather than reported.
//!
//! # Failure Semantics
//!
//! Expected conditions — an unknown id, a reorder onto itself — report via
//! `bool`/`Option` returns. Nothing in this module panics on user input.

use tracing::{debug, trace, warn};

use crate::block::{Block, BlockId, ContentSnapshot};
use crate::schema::TypeRegistry;

/// Ordered, uniquely-identified collection of blocks with at most one
/// selected block.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Blocks in narrative order.
    blocks: Vec<Block>,
    /// Id of the selected block, if any.
    selected: Option<BlockId>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    /// Blocks in document order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the document has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by id.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.index_of(id).map(|index| &self.blocks[index])
    }

    /// Position of a block in document order.
    #[must_use]
    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    /// Id of the selected block, if any.
    #[must_use]
    pub fn selected_id(&self) -> Option<BlockId> {
        self.selected
    }

    /// The selected block, if any.
    #[must_use]
    pub fn selected_block(&self) -> Option<&Block> {
        self.selected.and_then(|id| self.get(id))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Create a default-valued block of `kind` and insert it immediately
    /// after the current selection, or at the end if nothing is selected.
    ///
    /// The fresh id is allocated as `max existing id + 1` rather than from
    /// the length, so a list whose id density was disturbed by external
    /// input still gets a unique id; renumbering then restores density.
    /// Always succeeds.
    pub fn add(&mut self, kind: &str, registry: &impl TypeRegistry) -> &Block {
        let next = self.blocks.iter().map(|b| b.id.raw()).max().unwrap_or(0) + 1;
        let mut block = Block::new(BlockId::new(next), kind);
        if registry.requires_text(kind) {
            block.text = Some(String::new());
        }
        Self::set_defaults(&mut block, registry);

        let index = self
            .selected
            .and_then(|id| self.index_of(id))
            .map_or(self.blocks.len(), |i| i + 1);
        self.blocks.insert(index, block);
        self.reassign_ids();
        debug!(kind, index, id = self.blocks[index].id.raw(), "added block");
        &self.blocks[index]
    }

    /// Remove the block with `id`.
    ///
    /// Clears the selection if the removed block was selected. Returns
    /// whether a removal occurred.
    pub fn delete(&mut self, id: BlockId) -> bool {
        let Some(index) = self.index_of(id) else {
            trace!(id = id.raw(), "delete: unknown block id");
            return false;
        };
        self.blocks.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.reassign_ids();
        debug!(id = id.raw(), index, "deleted block");
        true
    }

    /// Select the block with `id` and return it.
    ///
    /// An unknown id returns `None` and leaves the current selection
    /// untouched: a dangling selection would violate the selection
    /// invariant, so it is rejected rather than recorded.
    pub fn select(&mut self, id: BlockId) -> Option<&Block> {
        match self.index_of(id) {
            Some(index) => {
                self.selected = Some(id);
                Some(&self.blocks[index])
            }
            None => {
                warn!(id = id.raw(), "select: unknown block id, selection unchanged");
                None
            }
        }
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Mutate the content of the block with `id` through a snapshot,
    /// refreshing `updated_at` if anything actually changed.
    ///
    /// Returns whether the block was found.
    pub fn update(&mut self, id: BlockId, mutate: impl FnOnce(&mut ContentSnapshot)) -> bool {
        let Some(index) = self.index_of(id) else {
            trace!(id = id.raw(), "update: unknown block id");
            return false;
        };
        let block = &mut self.blocks[index];
        let before = block.content();
        let mut content = before.clone();
        mutate(&mut content);
        if !before.same_content(&content) {
            block.set_content(&content);
            block.touch();
        }
        true
    }

    /// Remove the dragged block and reinsert it adjacent to `target`.
    ///
    /// `insert_after = false` lands the block immediately before the
    /// target's position as it stands after the removal shift;
    /// `insert_after = true` lands one further. Returns `false` without
    /// mutating if either id is unknown or the ids are equal.
    pub fn reorder(&mut self, dragged: BlockId, target: BlockId, insert_after: bool) -> bool {
        if dragged == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.index_of(dragged), self.index_of(target)) else {
            trace!(
                dragged = dragged.raw(),
                target = target.raw(),
                "reorder: unknown block id"
            );
            return false;
        };
        // Removing the dragged block shifts every later index down by one
        // before the insertion offset is computed.
        let shifted = if from < to { to - 1 } else { to };
        let insert_at = shifted + usize::from(insert_after);
        let moved = self.relocate(from, insert_at);
        debug_assert!(moved, "indices resolved above must be in bounds");
        debug!(
            dragged = dragged.raw(),
            target = target.raw(),
            insert_after,
            from,
            insert_at,
            "reordered block"
        );
        moved
    }

    /// Splice the block at `from` out and reinsert it at `to` (clamped),
    /// renumbering afterwards. Pure reordering: `updated_at` is untouched.
    ///
    /// Returns `false` if `from` is out of bounds.
    pub fn relocate(&mut self, from: usize, to: usize) -> bool {
        if from >= self.blocks.len() {
            return false;
        }
        let block = self.blocks.remove(from);
        let to = to.min(self.blocks.len());
        self.blocks.insert(to, block);
        self.reassign_ids();
        true
    }

    /// Bulk-replace the block list, discarding incoming identities.
    ///
    /// Whatever ids the incoming blocks carry — importer placeholders,
    /// legacy identities mapped to zero at the persistence boundary — they
    /// are replaced by positional ids. The selection is cleared
    /// unconditionally.
    pub fn replace_all(&mut self, blocks: Vec<Block>) {
        debug!(count = blocks.len(), "replacing all blocks");
        self.blocks = blocks;
        self.selected = None;
        self.reassign_ids();
    }

    /// Fill every parameter the block is missing with the registry's
    /// declared default. Existing values are never overwritten.
    pub fn set_defaults(block: &mut Block, registry: &impl TypeRegistry) {
        for spec in registry.defaults(&block.kind) {
            if !block.params.contains_key(&spec.name) {
                block
                    .params
                    .insert(spec.name.clone(), spec.default_value());
            }
        }
    }

    // ========================================================================
    // Restore surface (used by recorded operations)
    // ========================================================================

    /// Reinsert a snapshot block at `index` (clamped), optionally selecting
    /// it after renumbering.
    pub fn restore_at(&mut self, index: usize, block: Block, select: bool) {
        let index = index.min(self.blocks.len());
        // The snapshot may reuse an id still present in the list, so the
        // selection index is fixed up here instead of re-found by id after
        // the insert.
        let selected_index = self
            .selected
            .and_then(|id| self.index_of(id))
            .map(|i| if i >= index { i + 1 } else { i });
        self.blocks.insert(index, block);
        self.renumber(selected_index);
        if select {
            self.selected = Some(self.blocks[index].id);
        }
        debug!(index, id = self.blocks[index].id.raw(), "restored block");
    }

    /// Overwrite the mutable fields of the block with `id` from a snapshot,
    /// verbatim — including its `updated_at`.
    ///
    /// Returns whether the block was found.
    pub fn apply_content(&mut self, id: BlockId, content: &ContentSnapshot) -> bool {
        let Some(index) = self.index_of(id) else {
            warn!(id = id.raw(), "apply_content: unknown block id");
            return false;
        };
        self.blocks[index].set_content(content);
        true
    }

    // ========================================================================
    // Identity maintenance
    // ========================================================================

    /// Renumber ids to `1..=N`, re-deriving the selection from the current
    /// position of the selected block. Only call on a list whose ids are
    /// still unique; paths that may introduce a duplicate id precompute the
    /// selection index and call [`Self::renumber`] directly.
    fn reassign_ids(&mut self) {
        let selected_index = self.selected.and_then(|id| self.index_of(id));
        self.renumber(selected_index);
    }

    fn renumber(&mut self, selected_index: Option<usize>) {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.id = BlockId::new(i as u64 + 1);
        }
        self.selected = selected_index.map(|i| self.blocks[i].id);
        self.debug_assert_invariants();
    }

    fn debug_assert_invariants(&self) {
        debug_assert!(
            self.blocks
                .iter()
                .enumerate()
                .all(|(i, b)| b.id.raw() == i as u64 + 1),
            "block ids must be dense 1..=N in document order"
        );
        debug_assert!(
            self.selected.is_none_or(|id| self.get(id).is_some()),
            "selection must reference a present block"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
