//! The per-build statement arena.
//!
//! Statements are arena-allocated and addressed by [`StmtId`] while the build
//! mutates them (expansion, splicing, deviation). Nothing here outlives one
//! build; the effective builder freezes the arena into shared immutable nodes.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::input::BuildOptions;
use super::linkage::Linkage;
use super::namespace::Namespaces;
use crate::base::{SourceId, SourceRef};
use crate::effective::{Origin, Resolution};
use crate::error::{CauseCollector, InferenceError};
use crate::stmt::{
    Argument, DeclaredStatement, ExtensionTable, Keyword, PrefixedName, QName, QNameModule,
    StatementKind, YangVersion,
};

// ============================================================================
// IDS
// ============================================================================

/// Index of a statement in the build arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct StmtId(u32);

impl StmtId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub const fn for_test(raw: u32) -> Self {
        Self(raw)
    }
}

// ============================================================================
// STATEMENT CONTEXT
// ============================================================================

/// Mutable per-statement state during a build.
#[derive(Clone, Debug)]
pub(crate) struct StmtCtx {
    pub kind: StatementKind,
    pub raw: Option<SmolStr>,
    pub argument: Argument,
    pub source_ref: SourceRef,
    /// Source whose prefix bindings interpret this statement's arguments.
    pub source: SourceId,
    /// Namespace of the schema node this statement names.
    pub module: QNameModule,
    pub version: YangVersion,
    pub parent: Option<StmtId>,
    pub children: Vec<StmtId>,
    pub origin: Origin,
    /// The statement this one was copied from.
    pub prototype: Option<StmtId>,
    pub declared: Option<Arc<DeclaredStatement>>,
    /// Cleared by a false `if-feature` or `deviate not-supported`.
    pub supported: bool,
    /// Set once a `uses` has been expanded.
    pub applied: bool,
    /// Encounter order of the augment that added this node.
    pub augment_seq: Option<u32>,
    /// Augments spliced into this node.
    pub augmentations: Vec<StmtId>,
    pub resolution: Option<Arc<Resolution>>,
}

impl StmtCtx {
    pub fn keyword(&self) -> Option<Keyword> {
        self.kind.keyword()
    }

    pub fn is(&self, keyword: Keyword) -> bool {
        self.kind.is(keyword)
    }

    /// Argument text for messages.
    pub fn name(&self) -> SmolStr {
        self.raw
            .clone()
            .unwrap_or_else(|| SmolStr::new(self.kind.to_string()))
    }
}

// ============================================================================
// BUILD CONTEXT
// ============================================================================

/// Everything one build owns between Statement-Definition and freezing.
pub(crate) struct BuildContext<'a> {
    pub options: &'a BuildOptions,
    pub linkage: Linkage,
    pub stmts: Vec<StmtCtx>,
    /// Root statement of every linked source, indexed by `SourceId`.
    pub roots: Vec<StmtId>,
    pub namespaces: Namespaces,
    pub extensions: ExtensionTable,
    pub causes: CauseCollector,
    /// Statements on a reported cycle; anything depending on them gives up
    /// quietly.
    pub poisoned: FxHashSet<StmtId>,
    pub feature_memo: FxHashMap<StmtId, bool>,
    pub feature_stack: FxHashSet<StmtId>,
}

impl<'a> BuildContext<'a> {
    pub fn new(options: &'a BuildOptions, linkage: Linkage) -> Self {
        Self {
            options,
            linkage,
            stmts: Vec::new(),
            roots: Vec::new(),
            namespaces: Namespaces::default(),
            extensions: ExtensionTable::new(),
            causes: CauseCollector::new(),
            poisoned: FxHashSet::default(),
            feature_memo: FxHashMap::default(),
            feature_stack: FxHashSet::default(),
        }
    }

    #[inline]
    pub fn get(&self, id: StmtId) -> &StmtCtx {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: StmtId) -> &mut StmtCtx {
        &mut self.stmts[id.index()]
    }

    pub fn alloc(&mut self, stmt: StmtCtx) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn ids(&self) -> impl Iterator<Item = StmtId> + use<> {
        (0..self.stmts.len() as u32).map(StmtId)
    }

    pub fn root_of(&self, source: SourceId) -> StmtId {
        self.roots[source.as_usize()]
    }

    // ------------------------------------------------------------------------
    // Tree navigation
    // ------------------------------------------------------------------------

    pub fn keyword(&self, id: StmtId) -> Option<Keyword> {
        self.get(id).keyword()
    }

    pub fn children(&self, id: StmtId) -> &[StmtId] {
        &self.get(id).children
    }

    /// First supported child with the given keyword.
    pub fn child(&self, id: StmtId, keyword: Keyword) -> Option<StmtId> {
        self.children_with(id, keyword).next()
    }

    pub fn children_with(&self, id: StmtId, keyword: Keyword) -> impl Iterator<Item = StmtId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.get(c).supported && self.get(c).is(keyword))
    }

    /// Boolean argument of the first child with the given keyword.
    pub fn flag(&self, id: StmtId, keyword: Keyword) -> Option<bool> {
        self.child(id, keyword).and_then(|c| self.get(c).argument.as_bool())
    }

    /// Parent chain, nearest first, excluding `id`.
    pub fn ancestors(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        std::iter::successors(self.get(id).parent, move |&p| self.get(p).parent)
    }

    /// Whether `id` and every ancestor survive into the effective tree.
    pub fn is_effectively_supported(&self, id: StmtId) -> bool {
        self.get(id).supported && self.ancestors(id).all(|a| self.get(a).supported)
    }

    /// Every statement below `id`, preorder.
    pub fn descendants(&self, id: StmtId) -> Vec<StmtId> {
        let mut out = Vec::new();
        let mut stack: Vec<StmtId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Schema tree name of a node. `input`/`output` are named by keyword.
    pub fn schema_qname(&self, id: StmtId) -> Option<QName> {
        let stmt = self.get(id);
        let keyword = stmt.keyword()?;
        match keyword {
            Keyword::Input | Keyword::Output => {
                Some(QName::new(stmt.module.clone(), keyword.as_str()))
            }
            k if k.names_schema_node() => stmt
                .argument
                .as_identifier()
                .map(|local| QName::new(stmt.module.clone(), local.clone())),
            _ => None,
        }
    }

    /// Supported schema tree children of `id`.
    pub fn schema_children(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.children(id).iter().copied().filter(move |&c| {
            self.get(c).supported && self.keyword(c).is_some_and(Keyword::is_schema_tree)
        })
    }

    // ------------------------------------------------------------------------
    // Prefixes and names
    // ------------------------------------------------------------------------

    /// Module source bound to `prefix` in `source`; `None` prefix is the
    /// source's own module.
    pub fn module_for_prefix(&self, source: SourceId, prefix: Option<&str>) -> Option<SourceId> {
        let linked = self.linkage.get(source);
        match prefix {
            None => Some(linked.module),
            Some(prefix) => linked.prefixes.get(prefix).copied(),
        }
    }

    /// Resolve a prefixed name in the lexical context of `at`.
    pub fn qname_for(&self, at: StmtId, name: &PrefixedName) -> Result<QName, InferenceError> {
        let stmt = self.get(at);
        let module = self
            .module_for_prefix(stmt.source, name.prefix.as_deref())
            .ok_or_else(|| InferenceError::UnknownPrefix {
                at: stmt.source_ref.clone(),
                prefix: name.prefix.clone().unwrap_or_default(),
            })?;
        Ok(QName::new(self.linkage.qname_module(module), name.local.clone()))
    }

    /// Resolution of `id`, or of the statement it was copied from.
    pub fn resolution_of(&self, id: StmtId) -> Option<Arc<Resolution>> {
        let mut current = Some(id);
        while let Some(next) = current {
            let stmt = self.get(next);
            if let Some(resolution) = &stmt.resolution {
                return Some(resolution.clone());
            }
            current = stmt.prototype;
        }
        None
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Deep-copy `src` under `parent`. The copy is not inserted into the
    /// parent's child list; `keep` filters nested children.
    pub fn copy_subtree(
        &mut self,
        src: StmtId,
        parent: StmtId,
        origin: Origin,
        module: Option<&QNameModule>,
        keep: &impl Fn(&StmtCtx) -> bool,
    ) -> StmtId {
        let original = self.get(src).clone();
        let copy = self.alloc(StmtCtx {
            module: module.cloned().unwrap_or(original.module),
            parent: Some(parent),
            children: Vec::new(),
            origin,
            prototype: Some(src),
            applied: true,
            augment_seq: None,
            resolution: None,
            ..original
        });
        let mut children = Vec::with_capacity(original.children.len());
        for child in original.children {
            if keep(self.get(child)) {
                children.push(self.copy_subtree(child, copy, origin, module, keep));
            }
        }
        self.get_mut(copy).children = children;
        copy
    }

    pub fn insert_child(&mut self, parent: StmtId, index: usize, child: StmtId) {
        self.get_mut(child).parent = Some(parent);
        let children = &mut self.get_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    pub fn push_child(&mut self, parent: StmtId, child: StmtId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Remove `child` from its parent's child list.
    pub fn detach(&mut self, child: StmtId) {
        if let Some(parent) = self.get(child).parent {
            self.get_mut(parent).children.retain(|&c| c != child);
        }
    }

    /// Replace `old` with `new` at the same position.
    pub fn replace_child(&mut self, old: StmtId, new: StmtId) {
        let Some(parent) = self.get(old).parent else {
            return;
        };
        self.get_mut(new).parent = Some(parent);
        let children = &mut self.get_mut(parent).children;
        if let Some(slot) = children.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
    }

    /// Put `child` under a new `case` of the same name, owned by `parent`.
    /// The case is not inserted into the parent's child list.
    pub fn wrap_in_case(&mut self, child: StmtId, parent: StmtId, origin: Origin) -> StmtId {
        let template = self.get(child).clone();
        let name = template.argument.as_identifier().cloned().unwrap_or_default();
        let case = self.alloc(StmtCtx {
            kind: Keyword::Case.into(),
            raw: Some(name.clone()),
            argument: Argument::Identifier(name),
            parent: Some(parent),
            children: vec![child],
            origin,
            prototype: None,
            declared: None,
            supported: true,
            applied: true,
            augment_seq: None,
            augmentations: Vec::new(),
            resolution: None,
            ..template
        });
        self.get_mut(child).parent = Some(case);
        case
    }

    pub fn mark_unsupported(&mut self, id: StmtId) {
        self.get_mut(id).supported = false;
    }
}

/// Children carried over when a grouping or augment body is copied.
pub(crate) fn is_copied_nested(stmt: &StmtCtx) -> bool {
    stmt.supported
        && !matches!(
            stmt.keyword(),
            Some(Keyword::Uses | Keyword::Grouping | Keyword::Typedef)
        )
}
