//! Effective statements.

use std::sync::Arc;

use smol_str::SmolStr;

use super::types::TypeDefinition;
use crate::stmt::{
    Argument, DeclaredStatement, Keyword, PrefixedName, QName, StatementKind,
};

/// How a statement came to be in the effective tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Written in a source at this position.
    Declared,
    /// Synthesized by the reactor (`input`/`output`, shorthand `case`).
    Implicit,
    /// Instantiated from a grouping by `uses`.
    AddedByUses,
    /// Spliced in by a top-level `augment`.
    AddedByAugmentation,
    /// Spliced in by an `augment` nested in `uses`.
    AddedByUsesAugmentation,
    /// Added or replaced by a `deviate` instruction.
    AddedByDeviation,
}

/// Semantic results attached to a statement during Full-Declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The resolved definition of a `type` or `typedef`.
    Type(Arc<TypeDefinition>),
    /// The base identities of an `identity`, in declaration order.
    IdentityBases(Vec<QName>),
}

/// One node of the frozen effective tree.
///
/// Nodes are immutable and shared: statements whose content does not depend
/// on where they were instantiated are the same `Arc`.
#[derive(Debug)]
pub struct EffectiveStatement {
    pub(crate) kind: StatementKind,
    pub(crate) argument: Argument,
    pub(crate) raw_argument: Option<SmolStr>,
    pub(crate) qname: Option<QName>,
    pub(crate) declared: Option<Arc<DeclaredStatement>>,
    pub(crate) origin: Origin,
    pub(crate) substatements: Arc<[Arc<EffectiveStatement>]>,
    pub(crate) augmentations: Arc<[Arc<EffectiveStatement>]>,
    pub(crate) resolution: Option<Arc<Resolution>>,
}

impl EffectiveStatement {
    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn keyword(&self) -> Option<Keyword> {
        self.kind.keyword()
    }

    pub fn argument(&self) -> &Argument {
        &self.argument
    }

    pub fn raw_argument(&self) -> Option<&str> {
        self.raw_argument.as_deref()
    }

    /// Schema or definition name: set for data nodes, operations, groupings,
    /// typedefs, identities, features and extensions.
    pub fn qname(&self) -> Option<&QName> {
        self.qname.as_ref()
    }

    /// The statement this node was declared as. `None` when synthesized.
    pub fn declared(&self) -> Option<&Arc<DeclaredStatement>> {
        self.declared.as_ref()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn substatements(&self) -> &Arc<[Arc<EffectiveStatement>]> {
        &self.substatements
    }

    /// Schema tree children in effective order.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.substatements
            .iter()
            .filter(|s| s.keyword().is_some_and(Keyword::is_schema_tree))
    }

    pub fn find_child(&self, local: &str) -> Option<&Arc<EffectiveStatement>> {
        self.child_nodes()
            .find(|s| s.qname.as_ref().is_some_and(|q| q.local == local))
    }

    pub fn find_substatement(&self, keyword: Keyword) -> Option<&Arc<EffectiveStatement>> {
        self.substatements.iter().find(|s| s.kind.is(keyword))
    }

    pub fn find_substatements(&self, keyword: Keyword) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.substatements.iter().filter(move |s| s.kind.is(keyword))
    }

    /// Augments that spliced content into this node, in application order.
    pub fn available_augmentations(&self) -> &[Arc<EffectiveStatement>] {
        &self.augmentations
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_deref()
    }

    /// The resolved type of a `type`/`typedef` statement, or of the `type`
    /// child of a leaf or leaf-list.
    pub fn type_definition(&self) -> Option<&Arc<TypeDefinition>> {
        match self.resolution() {
            Some(Resolution::Type(def)) => Some(def),
            _ => match self.keyword() {
                Some(Keyword::Leaf | Keyword::LeafList) => self
                    .find_substatement(Keyword::Type)
                    .and_then(|t| t.type_definition()),
                _ => None,
            },
        }
    }

    pub fn identity_bases(&self) -> &[QName] {
        match self.resolution() {
            Some(Resolution::IdentityBases(bases)) => bases,
            _ => &[],
        }
    }

    /// Key leaf names of a list.
    pub fn key_definition(&self) -> &[PrefixedName] {
        self.find_substatement(Keyword::Key)
            .and_then(|key| key.argument.as_key_list())
            .unwrap_or(&[])
    }

    fn flag(&self, keyword: Keyword) -> Option<bool> {
        self.find_substatement(keyword).and_then(|s| s.argument.as_bool())
    }

    fn min_elements(&self) -> i64 {
        self.find_substatement(Keyword::MinElements)
            .and_then(|s| s.argument.as_integer())
            .unwrap_or(0)
    }

    /// Mandatory per RFC 7950 section 3: a mandatory leaf, choice or anydata,
    /// a list or leaf-list with `min-elements` > 0, or a non-presence
    /// container with a mandatory child.
    pub fn is_mandatory(&self) -> bool {
        match self.keyword() {
            Some(Keyword::Leaf | Keyword::Choice | Keyword::Anydata | Keyword::Anyxml) => {
                self.flag(Keyword::Mandatory) == Some(true)
            }
            Some(Keyword::List | Keyword::LeafList) => self.min_elements() > 0,
            Some(Keyword::Container) => {
                self.find_substatement(Keyword::Presence).is_none()
                    && self.child_nodes().any(|c| c.is_mandatory())
            }
            _ => false,
        }
    }

    pub fn is_augmenting(&self) -> bool {
        matches!(
            self.origin,
            Origin::AddedByAugmentation | Origin::AddedByUsesAugmentation
        )
    }

    pub fn is_added_by_uses(&self) -> bool {
        self.origin == Origin::AddedByUses
    }

    /// `config` value if declared on this node.
    pub fn config(&self) -> Option<bool> {
        self.flag(Keyword::Config)
    }
}
