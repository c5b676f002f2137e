#![forbid(unsafe_code)]

//! Undo/redo command history for the Fabula document model.
//!
//! This crate records reversible [`Operation`]s against a
//! [`Document`](fabula_model::Document) and replays them through the
//! [`HistoryEngine`]'s bounded dual stacks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       HistoryEngine                          │
//! │  ┌──────────────────┐          ┌──────────────────┐          │
//! │  │   Undo Stack     │          │   Redo Stack     │          │
//! │  │  ┌────────────┐  │          │  ┌────────────┐  │          │
//! │  │  │ OperationN │  │  undo()  │  │ Operation1 │  │          │
//! │  │  ├────────────┤  │ ──────►  │  ├────────────┤  │          │
//! │  │  │ Operation2 │  │          │  │ Operation2 │  │          │
//! │  │  ├────────────┤  │  ◄────── │  ├────────────┤  │          │
//! │  │  │ Operation1 │  │  redo()  │  │ OperationN │  │          │
//! │  │  └────────────┘  │          │  └────────────┘  │          │
//! │  └──────────────────┘          └──────────────────┘          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use fabula_history::{HistoryEngine, Operation};
//! use fabula_model::{Document, Schema};
//!
//! let schema = Schema::builtin();
//! let mut doc = Document::new();
//! let mut history = HistoryEngine::default();
//!
//! // The controller mutates first, records second.
//! let id = doc.add("narrative", &schema).id;
//! let op = Operation::add(&doc, id).expect("block just added");
//! history.commit(&mut doc, op, true);
//!
//! assert!(history.undo(&mut doc));
//! assert!(doc.is_empty());
//! assert!(history.redo(&mut doc));
//! assert_eq!(doc.len(), 1);
//! ```
//!
//! # Design Notes
//!
//! ## Why `already_applied` exists
//!
//! Callers typically mutate the document first — so the UI reflects the
//! change immediately and synchronously — and only afterwards record the
//! operation. The flag keeps the engine from applying the forward
//! transform a second time. Delete and Move are captured *before* the
//! caller mutates (their constructors take the document), because their
//! snapshots must reflect pre-mutation state.
//!
//! ## Coalescing
//!
//! Keystroke-level edits collapse into one undoable step through
//! [`EditCapture`]: snapshot on focus-in, commit once on blur or after the
//! idle window, skip entirely when nothing changed. The engine additionally
//! rejects no-op edits on its own, so a caller that skips the helper still
//! cannot pollute history with empty steps.

pub mod capture;
pub mod engine;
pub mod operation;

pub use capture::{EditCapture, IDLE_WINDOW};
pub use engine::{HistoryAction, HistoryConfig, HistoryEngine, HistoryEvent, NotifyFn};
pub use operation::Operation;
