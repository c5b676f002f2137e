#![forbid(unsafe_code)]

//! Free-form text to block importer.
//!
//! Turns raw prose into a finite, ordered list of ready-made blocks that
//! the document model consumes through
//! [`Document::replace_all`](fabula_model::Document::replace_all). The
//! classifier is a two-state line machine: it is either inside a dialogue
//! paragraph or it is not.
//!
//! - A line whose first non-space character is an opening quote starts a
//!   dialogue block, flushing any narrative accumulated so far.
//! - Dialogue runs until its closing quote is seen, on the same line or a
//!   later one.
//! - Blank lines terminate the current block either way.
//! - Everything else accumulates into narrative blocks.
//!
//! The emitted blocks carry positional ids, registry defaults, and fresh
//! timestamps; `replace_all` renumbers them regardless, so the ids here
//! are placeholders. The function is pure — importing the same text twice
//! yields the same block shapes — which is what makes the import
//! restartable.

use tracing::debug;

use fabula_model::{Block, BlockId, Document, TypeRegistry};

/// Block kind emitted for quoted paragraphs.
pub const DIALOGUE_KIND: &str = "dialogue";
/// Block kind emitted for everything else.
pub const NARRATIVE_KIND: &str = "narrative";

/// Quote characters that open a dialogue paragraph, with their closers.
/// A straight double quote closes by pairing parity.
const QUOTE_PAIRS: [(char, char); 3] = [('"', '"'), ('\u{201c}', '\u{201d}'), ('«', '»')];

/// Split raw text into dialogue and narrative blocks.
#[must_use]
pub fn blocks_from_text(text: &str, registry: &impl TypeRegistry) -> Vec<Block> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_dialogue = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut out, &mut current, in_dialogue, registry);
            in_dialogue = false;
            continue;
        }
        if !in_dialogue && opens_dialogue(trimmed) {
            flush(&mut out, &mut current, false, registry);
            in_dialogue = true;
        }
        current.push(trimmed);
        if in_dialogue && dialogue_closed(&current) {
            flush(&mut out, &mut current, true, registry);
            in_dialogue = false;
        }
    }
    flush(&mut out, &mut current, in_dialogue, registry);

    debug!(count = out.len(), "imported blocks from raw text");
    out
}

fn opens_dialogue(line: &str) -> bool {
    line.chars()
        .next()
        .is_some_and(|c| QUOTE_PAIRS.iter().any(|(open, _)| *open == c))
}

/// Whether the accumulated dialogue paragraph has seen its closing quote.
fn dialogue_closed(lines: &[&str]) -> bool {
    let Some(open) = lines.first().and_then(|line| line.chars().next()) else {
        return false;
    };
    let Some((_, close)) = QUOTE_PAIRS.iter().find(|(o, _)| *o == open) else {
        return false;
    };
    let count = lines
        .iter()
        .flat_map(|line| line.chars())
        .filter(|c| c == close)
        .count();
    if open == *close {
        // Straight quotes pair by parity: the opener counts too.
        count >= 2 && count % 2 == 0
    } else {
        count >= 1
    }
}

fn flush(
    out: &mut Vec<Block>,
    current: &mut Vec<&str>,
    as_dialogue: bool,
    registry: &impl TypeRegistry,
) {
    if current.is_empty() {
        return;
    }
    let kind = if as_dialogue {
        DIALOGUE_KIND
    } else {
        NARRATIVE_KIND
    };
    let mut block =
        Block::new(BlockId::new(out.len() as u64 + 1), kind).with_text(current.join(" "));
    Document::set_defaults(&mut block, registry);
    current.clear();
    out.push(block);
}

// ============================================================================
// Tests
// ============================================================================
