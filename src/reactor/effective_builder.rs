//! Effective-Model: freeze the arena into shared, immutable statements.
//!
//! Freezing is bottom-up and hash-consed: two arena nodes whose frozen
//! content is identical (same declaration, name, origin, resolution and
//! frozen children) become the same `Arc`. Grouping copies that no refine or
//! augment touched therefore share structure across every `uses` site in the
//! same module, while patched copies get their own nodes.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::context::{BuildContext, StmtId};
use super::input::SourceRole;
use super::linkage::SourceKind;
use crate::effective::{
    EffectiveModel, EffectiveStatement, Import, ModuleEffective, Origin, SubmoduleEffective,
};
use crate::error::InferenceError;
use crate::stmt::{Keyword, QName, StatementKind};

type Slice = Arc<[Arc<EffectiveStatement>]>;

fn address<T: ?Sized>(ptr: &Arc<T>) -> usize {
    Arc::as_ptr(ptr) as *const () as usize
}

/// Everything that distinguishes one frozen node from another.
#[derive(PartialEq, Eq, Hash)]
struct NodeKey {
    kind: StatementKind,
    raw: Option<SmolStr>,
    qname: Option<QName>,
    origin: Origin,
    declared: Option<usize>,
    resolution: Option<usize>,
    substatements: usize,
    augmentations: usize,
}

struct Freezer<'c, 'a> {
    ctx: &'c BuildContext<'a>,
    memo: FxHashMap<StmtId, Arc<EffectiveStatement>>,
    nodes: FxHashMap<NodeKey, Arc<EffectiveStatement>>,
    slices: FxHashMap<Vec<usize>, Slice>,
}

impl<'c, 'a> Freezer<'c, 'a> {
    fn new(ctx: &'c BuildContext<'a>) -> Self {
        Self {
            ctx,
            memo: FxHashMap::default(),
            nodes: FxHashMap::default(),
            slices: FxHashMap::default(),
        }
    }

    fn intern_slice(&mut self, items: Vec<Arc<EffectiveStatement>>) -> Slice {
        let key: Vec<usize> = items.iter().map(address).collect();
        self.slices
            .entry(key)
            .or_insert_with(|| Arc::from(items))
            .clone()
    }

    /// Name carried by the frozen node.
    fn qname(&self, id: StmtId) -> Option<QName> {
        let stmt = self.ctx.get(id);
        match stmt.keyword()? {
            Keyword::Grouping
            | Keyword::Typedef
            | Keyword::Identity
            | Keyword::Feature
            | Keyword::Extension => stmt
                .argument
                .as_identifier()
                .map(|local| QName::new(stmt.module.clone(), local.clone())),
            _ => self.ctx.schema_qname(id),
        }
    }

    fn freeze(&mut self, id: StmtId) -> Arc<EffectiveStatement> {
        if let Some(done) = self.memo.get(&id) {
            return done.clone();
        }
        let ctx = self.ctx;
        let stmt = ctx.get(id);

        let children: Vec<Arc<EffectiveStatement>> = stmt
            .children
            .iter()
            .filter(|&&c| ctx.get(c).supported)
            .map(|&c| self.freeze(c))
            .collect();
        let substatements = self.intern_slice(children);
        let augments: Vec<Arc<EffectiveStatement>> = stmt
            .augmentations
            .iter()
            .filter(|&&a| ctx.is_effectively_supported(a))
            .map(|&a| self.freeze(a))
            .collect();
        let augmentations = self.intern_slice(augments);

        let resolution = match stmt.keyword() {
            Some(Keyword::Type | Keyword::Typedef | Keyword::Identity) => ctx.resolution_of(id),
            _ => None,
        };
        let qname = self.qname(id);
        let key = NodeKey {
            kind: stmt.kind.clone(),
            raw: stmt.raw.clone(),
            qname: qname.clone(),
            origin: stmt.origin,
            declared: stmt.declared.as_ref().map(address),
            resolution: resolution.as_ref().map(address),
            substatements: address(&substatements),
            augmentations: address(&augmentations),
        };
        let node = self
            .nodes
            .entry(key)
            .or_insert_with(|| {
                Arc::new(EffectiveStatement {
                    kind: stmt.kind.clone(),
                    argument: stmt.argument.clone(),
                    raw_argument: stmt.raw.clone(),
                    qname,
                    declared: stmt.declared.clone(),
                    origin: stmt.origin,
                    substatements,
                    augmentations,
                    resolution,
                })
            })
            .clone();
        self.memo.insert(id, node.clone());
        node
    }
}

// ============================================================================
// KEYS
// ============================================================================

/// Every key of a supported list must name a supported leaf child.
fn check_list_keys(ctx: &BuildContext<'_>) -> Vec<InferenceError> {
    let mut causes = Vec::new();
    for id in ctx.ids() {
        if !ctx.get(id).is(Keyword::List) || !ctx.is_effectively_supported(id) {
            continue;
        }
        let Some(key) = ctx.child(id, Keyword::Key) else {
            continue;
        };
        let Some(names) = ctx.get(key).argument.as_key_list() else {
            continue;
        };
        for name in names {
            let is_leaf = ctx
                .schema_children(id)
                .any(|c| ctx.get(c).is(Keyword::Leaf) && ctx.get(c).argument.as_identifier() == Some(&name.local));
            if !is_leaf {
                causes.push(InferenceError::InvalidKey {
                    at: ctx.get(key).source_ref.clone(),
                    list: ctx.get(id).name(),
                    key: name.local.clone(),
                });
            }
        }
    }
    causes
}

// ============================================================================
// MODEL
// ============================================================================

/// Build the effective model of every reported module: main modules and the
/// parents of main submodules.
pub(crate) fn build(ctx: &BuildContext<'_>) -> Result<EffectiveModel, Vec<InferenceError>> {
    let causes = check_list_keys(ctx);
    if !causes.is_empty() {
        return Err(causes);
    }

    let mut reported: Vec<_> = ctx
        .linkage
        .sources
        .iter()
        .filter(|s| s.info.role == SourceRole::Main)
        .map(|s| s.module)
        .collect();
    reported.sort();
    reported.dedup();

    let mut freezer = Freezer::new(ctx);
    let mut modules = IndexMap::new();
    for module_id in reported {
        let linked = ctx.linkage.get(module_id);
        if linked.info.kind != SourceKind::Module {
            continue;
        }
        let imports = linked
            .info
            .imports
            .iter()
            .zip(&linked.imports)
            .map(|(dependency, &target)| Import {
                prefix: dependency.prefix.clone().unwrap_or_default(),
                module_name: dependency.name.clone(),
                module: ctx.linkage.qname_module(target),
            })
            .collect();
        let submodules = ctx
            .linkage
            .submodules_of(module_id)
            .map(|sub| SubmoduleEffective {
                name: ctx.linkage.get(sub).info.name.clone(),
                revision: ctx.linkage.get(sub).info.revision.clone(),
                statement: freezer.freeze(ctx.root_of(sub)),
            })
            .collect();
        let namespace = ctx.linkage.qname_module(module_id);
        let module = ModuleEffective {
            name: linked.info.name.clone(),
            namespace: namespace.clone(),
            prefix: linked.info.prefix.clone(),
            yang_version: linked.info.version,
            imports,
            statement: freezer.freeze(ctx.root_of(module_id)),
            submodules,
        };
        modules.insert(namespace, Arc::new(module));
    }

    let mut identities = FxHashMap::default();
    let mut derived: FxHashMap<QName, Vec<QName>> = FxHashMap::default();
    for (qname, &id) in &ctx.namespaces.identities {
        if !ctx.is_effectively_supported(id) {
            continue;
        }
        let frozen = freezer.freeze(id);
        for base in frozen.identity_bases() {
            derived.entry(base.clone()).or_default().push(qname.clone());
        }
        identities.insert(qname.clone(), frozen);
    }

    tracing::debug!(
        modules = modules.len(),
        nodes = freezer.nodes.len(),
        statements = freezer.memo.len(),
        "effective model built"
    );
    Ok(EffectiveModel {
        modules,
        identities,
        derived,
    })
}
