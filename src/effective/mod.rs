//! The frozen, immutable output of a build.
//!
//! - [`EffectiveModel`] - reported modules and cross-module lookups
//! - [`ModuleEffective`] - one module with its submodules folded in
//! - [`EffectiveStatement`] - shared, resolved statement nodes
//! - [`TypeDefinition`] - resolved type chains and their restrictions

mod model;
mod pattern;
mod statement;
mod types;

pub use model::{EffectiveModel, Import, ModuleEffective, SubmoduleEffective};
pub use pattern::{Pattern, PatternError};
pub use statement::{EffectiveStatement, Origin, Resolution};
pub use types::{
    BitMember, BuiltinType, EnumMember, Interval, Number, Restrictions, TypeDefinition, TypeKind,
};
