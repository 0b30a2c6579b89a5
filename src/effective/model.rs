//! The effective model: reported modules and cross-module lookups.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::statement::EffectiveStatement;
use crate::stmt::{Keyword, QName, QNameModule, Revision, YangVersion};

/// An import binding as seen from the importing module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub prefix: SmolStr,
    pub module_name: SmolStr,
    pub module: QNameModule,
}

#[derive(Clone, Debug)]
pub struct SubmoduleEffective {
    pub(crate) name: SmolStr,
    pub(crate) revision: Option<Revision>,
    pub(crate) statement: Arc<EffectiveStatement>,
}

impl SubmoduleEffective {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn statement(&self) -> &Arc<EffectiveStatement> {
        &self.statement
    }
}

/// One module of the effective model, with its submodules folded in.
#[derive(Clone, Debug)]
pub struct ModuleEffective {
    pub(crate) name: SmolStr,
    pub(crate) namespace: QNameModule,
    pub(crate) prefix: SmolStr,
    pub(crate) yang_version: YangVersion,
    pub(crate) imports: Vec<Import>,
    pub(crate) statement: Arc<EffectiveStatement>,
    pub(crate) submodules: Vec<SubmoduleEffective>,
}

impl ModuleEffective {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &QNameModule {
        &self.namespace
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.namespace.revision.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn yang_version(&self) -> YangVersion {
        self.yang_version
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// The module statement itself.
    pub fn statement(&self) -> &Arc<EffectiveStatement> {
        &self.statement
    }

    pub fn submodules(&self) -> &[SubmoduleEffective] {
        &self.submodules
    }

    /// Top-level statements of the module and every submodule.
    fn top_level(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.statement.substatements().iter().chain(
            self.submodules
                .iter()
                .flat_map(|s| s.statement.substatements().iter()),
        )
    }

    fn top_level_of(&self, keyword: Keyword) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level().filter(move |s| s.kind().is(keyword))
    }

    /// Top-level data nodes, module first, then submodules.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level()
            .filter(|s| s.keyword().is_some_and(Keyword::is_data_definition))
    }

    pub fn find_data_child(&self, local: &str) -> Option<&Arc<EffectiveStatement>> {
        self.child_nodes()
            .find(|s| s.qname().is_some_and(|q| q.local == local))
    }

    pub fn groupings(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Grouping)
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Typedef)
    }

    pub fn identities(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Identity)
    }

    pub fn features(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Feature)
    }

    pub fn rpcs(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Rpc)
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Notification)
    }

    pub fn augmentations(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Augment)
    }

    pub fn deviations(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Deviation)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.top_level_of(Keyword::Extension)
    }
}

/// The immutable result of a successful build.
#[derive(Clone, Debug, Default)]
pub struct EffectiveModel {
    pub(crate) modules: IndexMap<QNameModule, Arc<ModuleEffective>>,
    pub(crate) identities: FxHashMap<QName, Arc<EffectiveStatement>>,
    pub(crate) derived: FxHashMap<QName, Vec<QName>>,
}

impl EffectiveModel {
    /// Reported modules in supply order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleEffective>> {
        self.modules.values()
    }

    pub fn find_module(&self, namespace: &str, revision: Option<&Revision>) -> Option<&Arc<ModuleEffective>> {
        self.modules
            .get(&QNameModule::new(namespace, revision.cloned()))
    }

    pub fn find_modules_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<ModuleEffective>> + 'a {
        self.modules.values().filter(move |m| m.name() == name)
    }

    /// The latest revision of a module.
    pub fn find_module_by_name(&self, name: &str) -> Option<&Arc<ModuleEffective>> {
        self.modules
            .values()
            .filter(|m| m.name() == name)
            .max_by(|a, b| a.revision().cmp(&b.revision()))
    }

    pub fn find_identity(&self, qname: &QName) -> Option<&Arc<EffectiveStatement>> {
        self.identities.get(qname)
    }

    /// Identities naming `base` directly as one of their bases.
    pub fn derived_identities(&self, base: &QName) -> &[QName] {
        self.derived.get(base).map(Vec::as_slice).unwrap_or(&[])
    }
}
