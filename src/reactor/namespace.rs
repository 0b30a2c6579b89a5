//! Namespace registry.
//!
//! Groupings and typedefs are scoped: a nested definition is visible from its
//! parent statement downward, a top-level one from the whole module
//! (submodules included). Identities and features live in one flat
//! QName-keyed namespace per build.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::context::{BuildContext, StmtId};
use crate::base::SourceId;
use crate::error::InferenceError;
use crate::stmt::{PrefixedName, QName};

/// Where a scoped definition is visible from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Scope {
    /// Top level of a module or any of its submodules.
    Module(SourceId),
    /// Below a specific statement.
    Statement(StmtId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum DefinitionKind {
    Grouping,
    Typedef,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Grouping => "grouping",
            DefinitionKind::Typedef => "typedef",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Namespaces {
    scoped: FxHashMap<(DefinitionKind, Scope, SmolStr), StmtId>,
    pub identities: IndexMap<QName, StmtId>,
    pub features: FxHashMap<QName, StmtId>,
}

impl Namespaces {
    /// Register a scoped definition. Returns the earlier definition on a
    /// collision and keeps it.
    pub fn register(&mut self, kind: DefinitionKind, scope: Scope, name: SmolStr, id: StmtId) -> Option<StmtId> {
        match self.scoped.entry((kind, scope, name)) {
            std::collections::hash_map::Entry::Occupied(existing) => Some(*existing.get()),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(id);
                None
            }
        }
    }

    fn get(&self, kind: DefinitionKind, scope: Scope, name: &str) -> Option<StmtId> {
        self.scoped.get(&(kind, scope, SmolStr::new(name))).copied()
    }

    pub fn register_identity(&mut self, name: QName, id: StmtId) -> Option<StmtId> {
        match self.identities.get(&name) {
            Some(&existing) => Some(existing),
            None => {
                self.identities.insert(name, id);
                None
            }
        }
    }

    pub fn register_feature(&mut self, name: QName, id: StmtId) -> Option<StmtId> {
        match self.features.get(&name) {
            Some(&existing) => Some(existing),
            None => {
                self.features.insert(name, id);
                None
            }
        }
    }
}

impl BuildContext<'_> {
    /// Find a grouping or typedef from the lexical position of `at`.
    ///
    /// Unprefixed (or own-prefixed) names search enclosing statements first,
    /// then the module top level; prefixed names search the imported module's
    /// top level only.
    pub fn lookup_definition(
        &self,
        kind: DefinitionKind,
        at: StmtId,
        name: &PrefixedName,
    ) -> Result<StmtId, InferenceError> {
        let stmt = self.get(at);
        let target = self
            .module_for_prefix(stmt.source, name.prefix.as_deref())
            .ok_or_else(|| InferenceError::UnknownPrefix {
                at: stmt.source_ref.clone(),
                prefix: name.prefix.clone().unwrap_or_default(),
            })?;
        let own = self.linkage.get(stmt.source).module;

        let found = if target == own {
            std::iter::once(at)
                .chain(self.ancestors(at))
                .find_map(|scope| self.namespaces.get(kind, Scope::Statement(scope), &name.local))
                .or_else(|| self.namespaces.get(kind, Scope::Module(own), &name.local))
        } else {
            self.namespaces.get(kind, Scope::Module(target), &name.local)
        };
        found.ok_or_else(|| InferenceError::not_found(&stmt.source_ref, kind.as_str(), name.to_string()))
    }

    pub fn lookup_identity(&self, at: StmtId, name: &PrefixedName) -> Result<StmtId, InferenceError> {
        let qname = self.qname_for(at, name)?;
        self.namespaces
            .identities
            .get(&qname)
            .copied()
            .ok_or_else(|| InferenceError::not_found(&self.get(at).source_ref, "identity", name.to_string()))
    }

    pub fn lookup_feature(&self, at: StmtId, name: &PrefixedName) -> Result<StmtId, InferenceError> {
        let qname = self.qname_for(at, name)?;
        self.namespaces
            .features
            .get(&qname)
            .copied()
            .ok_or_else(|| InferenceError::not_found(&self.get(at).source_ref, "feature", name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_first() {
        let mut namespaces = Namespaces::default();
        let scope = Scope::Module(SourceId::new(0));
        let first = namespaces.register(DefinitionKind::Grouping, scope, "g".into(), StmtId::for_test(1));
        let second = namespaces.register(DefinitionKind::Grouping, scope, "g".into(), StmtId::for_test(2));
        assert_eq!(first, None);
        assert_eq!(second, Some(StmtId::for_test(1)));
        assert_eq!(namespaces.get(DefinitionKind::Grouping, scope, "g"), Some(StmtId::for_test(1)));
        assert_eq!(namespaces.get(DefinitionKind::Typedef, scope, "g"), None);
    }
}
