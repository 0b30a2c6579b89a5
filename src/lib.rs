//! # yang-reactor
//!
//! Cross-source statement reactor for YANG. Takes declared statement trees
//! for a set of modules and submodules and produces one resolved, immutable
//! effective schema model, or one failure explaining why it could not.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! reactor   → phases, linkage, inference actions, effective builder
//!   ↓
//! effective → frozen model: modules, statements, type chains
//!   ↓
//! syntax    → YANG text reader (logos lexer + recursive descent)
//!   ↓
//! stmt      → keywords, arguments, declared trees, statement grammar
//!   ↓
//! base      → Primitives (SourceId, positions, SourceRef)
//! ```
//!
//! ## Example
//!
//! ```
//! use yang_reactor::{Reactor, SourceRole, SourceSet};
//!
//! let mut sources = SourceSet::new();
//! sources
//!     .add_text(SourceRole::Main, "demo.yang", r#"
//!         module demo {
//!             namespace "urn:demo";
//!             prefix d;
//!             container system { leaf hostname { type string; } }
//!         }"#)
//!     .unwrap();
//!
//! let model = Reactor::default().build(&sources).unwrap();
//! let module = model.find_module_by_name("demo").unwrap();
//! assert!(module.find_data_child("system").is_some());
//! ```

/// Foundation types: SourceId, positions, SourceRef
pub mod base;

/// Statement vocabulary: keywords, arguments, declared trees
pub mod stmt;

/// YANG text reader producing declared trees
pub mod syntax;

/// Build failures and their causes
pub mod error;

/// The frozen effective model
pub mod effective;

/// Phased build of the effective model
pub mod reactor;

// Re-export the build surface
pub use effective::{EffectiveModel, EffectiveStatement, ModuleEffective, TypeDefinition};
pub use error::{BuildFailure, Cause, InferenceError, LinkageError, SourceError};
pub use reactor::{BuildOptions, ModelPhase, Reactor, SourceEntry, SourceRole, SourceSet};
pub use stmt::{DeclaredStatement, Keyword, QName, QNameModule, Revision};
