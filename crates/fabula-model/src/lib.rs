#![forbid(unsafe_code)]

//! Document model: blocks, identity, ordering, selection, and the
//! block-type registry boundary.
//!
//! # Role in Fabula
//! `fabula-model` is the state layer. It owns the ordered block list of one
//! scene, assigns and maintains dense block identities, and tracks the
//! single optional selection. The history engine (`fabula-history`) records
//! reversible operations against this model; the importer
//! (`fabula-import`) produces blocks for it.
//!
//! # Primary responsibilities
//! - **Block**: one addressable unit of narrative content with typed,
//!   registry-validated parameters.
//! - **Document**: narrative order, identity reassignment, selection.
//! - **Schema**: the externally supplied block-type registry, consumed
//!   through the [`TypeRegistry`] trait.
//!
//! # What it does not do
//! No rendering, no persistence I/O, no history. Everything here is
//! synchronous, in-memory data manipulation owned by a single editing
//! context.

pub mod block;
pub mod document;
pub mod schema;

pub use block::{Block, BlockId, ContentSnapshot, ParamValue, Tags};
pub use document::Document;
pub use schema::{KindSpec, ParamSpec, Schema, SchemaError, TypeRegistry};
