#![forbid(unsafe_code)]

//! Keystroke coalescing for free-text edits.
//!
//! Committing one operation per keystroke would make undo step backwards a
//! character at a time. Instead, the controller opens an [`EditCapture`]
//! when a block's editor gains focus (or on the first keystroke), lets any
//! number of live mutations happen against the document, and finishes the
//! capture on blur or once the idle window elapses. The capture compares
//! final against initial content and yields a single Edit operation — or
//! nothing at all when the round of typing ended where it began.

use std::time::{Duration, Instant};

use tracing::trace;

use fabula_model::{BlockId, ContentSnapshot, Document};

use crate::operation::Operation;

/// How long typing must pause before a capture is considered idle.
pub const IDLE_WINDOW: Duration = Duration::from_secs(2);

/// An open coalescing window over one block's content.
#[derive(Debug)]
pub struct EditCapture {
    /// Block under edit.
    id: BlockId,
    /// Content at the moment the capture opened.
    before: ContentSnapshot,
    /// Last keystroke, for the idle window.
    last_activity: Instant,
}

impl EditCapture {
    /// Open a capture over the block with `id`, snapshotting its current
    /// content. Returns `None` if the id does not resolve.
    #[must_use]
    pub fn begin(doc: &Document, id: BlockId) -> Option<Self> {
        let before = doc.get(id)?.content();
        Some(Self {
            id,
            before,
            last_activity: Instant::now(),
        })
    }

    /// The block this capture watches.
    #[must_use]
    pub fn block_id(&self) -> BlockId {
        self.id
    }

    /// Record keystroke activity, restarting the idle window.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last recorded activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Whether the given window has elapsed since the last activity.
    #[must_use]
    pub fn is_idle_after(&self, window: Duration) -> bool {
        self.idle_for() >= window
    }

    /// Whether the default idle window has elapsed.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.is_idle_after(IDLE_WINDOW)
    }

    /// Close the capture, yielding one Edit operation covering the whole
    /// round of typing — or `None` when the block is gone or its content
    /// ended up unchanged (nothing to commit, nothing to undo).
    #[must_use]
    pub fn finish(self, doc: &Document) -> Option<Operation> {
        let Some(block) = doc.get(self.id) else {
            trace!(id = self.id.raw(), "capture finished on a removed block");
            return None;
        };
        let after = block.content();
        if self.before.same_content(&after) {
            trace!(id = self.id.raw(), "capture finished without changes");
            return None;
        }
        Some(Operation::edit(self.id, self.before, after))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_model::Schema;

    fn one_block_doc() -> (Document, BlockId) {
        let schema = Schema::builtin();
        let mut doc = Document::new();
        let id = doc.add("narrative", &schema).id;
        doc.update(id, |c| c.text = Some("first draft".into()));
        (doc, id)
    }

    #[test]
    fn begin_on_unknown_id_returns_none() {
        let (doc, _) = one_block_doc();
        assert!(EditCapture::begin(&doc, BlockId::new(9)).is_none());
    }

    #[test]
    fn unchanged_capture_yields_nothing() {
        let (mut doc, id) = one_block_doc();
        let capture = EditCapture::begin(&doc, id).unwrap();
        // Type something, then type it back.
        doc.update(id, |c| c.text = Some("second draft".into()));
        doc.update(id, |c| c.text = Some("first draft".into()));
        assert!(capture.finish(&doc).is_none());
    }

    #[test]
    fn changed_capture_yields_single_edit() {
        let (mut doc, id) = one_block_doc();
        let capture = EditCapture::begin(&doc, id).unwrap();
        doc.update(id, |c| c.text = Some("f".into()));
        doc.update(id, |c| c.text = Some("fi".into()));
        doc.update(id, |c| c.text = Some("final draft".into()));

        let op = capture.finish(&doc).unwrap();
        assert_eq!(op.label(), "Edit block");

        // Reversing the single operation restores the pre-capture text.
        assert!(op.revert(&mut doc));
        assert_eq!(doc.get(id).unwrap().text.as_deref(), Some("first draft"));
        assert!(op.apply(&mut doc));
        assert_eq!(doc.get(id).unwrap().text.as_deref(), Some("final draft"));
    }

    #[test]
    fn capture_on_deleted_block_yields_nothing() {
        let (mut doc, id) = one_block_doc();
        let capture = EditCapture::begin(&doc, id).unwrap();
        doc.delete(id);
        assert!(capture.finish(&doc).is_none());
    }

    #[test]
    fn idle_window_tracks_activity() {
        let (doc, id) = one_block_doc();
        let mut capture = EditCapture::begin(&doc, id).unwrap();
        assert!(!capture.is_idle());
        assert!(capture.is_idle_after(Duration::ZERO));
        capture.touch();
        assert!(!capture.is_idle_after(Duration::from_secs(60)));
    }
}
