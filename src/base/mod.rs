//! Foundation types for the reactor.
//!
//! - [`SourceId`] - handle for a module or submodule in a build
//! - [`LineCol`], [`LineIndex`] - positions in source text
//! - [`SourceRef`] - where a statement was declared
//!
//! No dependencies on other crate modules.

mod source_id;
mod span;

pub use source_id::SourceId;
pub use span::{LineCol, LineIndex, SourceRef, TextSize};
