#![forbid(unsafe_code)]

//! Block identity, content, and snapshot types.
//!
//! A block is one addressable unit of narrative content (a dialogue line,
//! a stretch of narrative text, a command) in document order. Its `kind`
//! is a key into an externally supplied [`TypeRegistry`](crate::TypeRegistry)
//! which decides whether `text` is semantically required and which extra
//! parameters apply.
//!
//! # Invariants
//!
//! - Ids are dense: after any structural operation on the owning document
//!   they are exactly `1..=N` in document order. An id is therefore NOT a
//!   stable identity across reorders or deletes of other blocks.
//! - `updated_at` refreshes on every content mutation, never on pure
//!   reordering.
//! - [`ContentSnapshot`] values are produced by field-wise cloning and
//!   never alias live document state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a block within its containing document.
///
/// Always positive. Reassigned to `1..=N` in sequence order after every
/// structural operation, so holders of an id must re-resolve it after any
/// add, delete, move, or bulk replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    /// Create a new block id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A typed parameter value.
///
/// Type-specific block attributes are a mapping from parameter name to one
/// of these tagged values, validated against the type registry at the
/// boundary. Arbitrary attribute injection on the block record is not
/// possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    /// Free-form text.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// One choice out of a closed set declared by the registry.
    Choice(String),
}

impl ParamValue {
    /// Name of this value's shape, for validation messages.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Choice(_) => "choice",
        }
    }

    /// Check whether two values have the same shape.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// Borrow the inner text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered set of free-form labels attached to a block.
///
/// Order is preserved for display but irrelevant for equality.
pub type Tags = Vec<String>;

fn tag_set(tags: &[String]) -> BTreeSet<&str> {
    tags.iter().map(String::as_str).collect()
}

/// A single block of narrative content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Identity within the owning document. Dense, not stable.
    pub id: BlockId,
    /// Key into the external type registry.
    pub kind: String,
    /// Text content, if the kind carries any.
    pub text: Option<String>,
    /// Free-form labels, insertion-ordered.
    pub tags: Tags,
    /// Creation timestamp, set once.
    pub created_at: DateTime<Utc>,
    /// Last content mutation. Never refreshed by pure reordering.
    pub updated_at: DateTime<Utc>,
    /// Type-specific parameters, keyed by parameter name.
    pub params: BTreeMap<String, ParamValue>,
}

impl Block {
    /// Create a new block of the given kind with fresh timestamps and no
    /// content.
    #[must_use]
    pub fn new(id: BlockId, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind: kind.into(),
            text: None,
            tags: Tags::new(),
            created_at: now,
            updated_at: now,
            params: BTreeMap::new(),
        }
    }

    /// Set the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set a parameter value.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Capture a deep snapshot of the mutable field set.
    #[must_use]
    pub fn content(&self) -> ContentSnapshot {
        ContentSnapshot {
            kind: self.kind.clone(),
            text: self.text.clone(),
            tags: self.tags.clone(),
            params: self.params.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Overwrite the mutable field set from a snapshot, verbatim.
    ///
    /// `updated_at` is restored from the snapshot rather than refreshed, so
    /// that reversing an edit reproduces the pre-edit timestamp exactly.
    pub(crate) fn set_content(&mut self, content: &ContentSnapshot) {
        self.kind = content.kind.clone();
        self.text = content.text.clone();
        self.tags = content.tags.clone();
        self.params = content.params.clone();
        self.updated_at = content.updated_at;
    }

    /// Refresh the content-mutation timestamp.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Deep, independent copy of a block's mutable field set.
///
/// Operations hold these instead of references into the live document, so
/// later mutations of the document can never corrupt a recorded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    /// Key into the external type registry.
    pub kind: String,
    /// Text content.
    pub text: Option<String>,
    /// Free-form labels.
    pub tags: Tags,
    /// Type-specific parameters.
    pub params: BTreeMap<String, ParamValue>,
    /// Content-mutation timestamp at capture time.
    pub updated_at: DateTime<Utc>,
}

impl ContentSnapshot {
    /// Compare content, ignoring `updated_at` and tag order.
    ///
    /// This is the equality used for no-op detection: an edit whose before
    /// and after snapshots are `same_content` never reaches the history
    /// stacks.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.text == other.text
            && self.params == other.params
            && tag_set(&self.tags) == tag_set(&other.tags)
    }
}

// ============================================================================
// Tests
// ============================================================================
