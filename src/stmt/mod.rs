//! Statement vocabulary shared by the reader, the reactor and the effective model.
//!
//! - [`Keyword`], [`StatementKind`] - what a statement is
//! - [`Argument`] and friends - what its argument means once parsed
//! - [`DeclaredStatement`] - immutable declared trees
//! - [`StatementSupport`], [`ExtensionTable`] - what may appear where
//!
//! This module depends only on [`crate::base`].

mod argument;
mod declared;
mod keyword;
mod qname;
mod support;

pub use argument::{
    Argument, ArgumentError, ArgumentShape, DeviateKind, IfFeatureExpr, OrderedBy, SchemaNodeId,
    Status, YangVersion,
};
pub use declared::DeclaredStatement;
pub use keyword::{Keyword, StatementKind};
pub use qname::{PrefixedName, QName, QNameModule, Revision, is_identifier};
pub use support::{
    Cardinality, ExtensionSupport, ExtensionTable, RuleLookup, StatementSupport,
    SubstatementRule, deviate_allows,
};
