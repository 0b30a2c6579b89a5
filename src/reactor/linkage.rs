//! Source pre-linkage and linkage.
//!
//! Pre-linkage reads each source's identity (name, namespace, revision, prefix,
//! version, belongs-to) and its raw import/include lists without resolving
//! anything. Linkage then binds every import and include to a supplied source,
//! enforcing revision matching, belongs-to consistency, unique prefixes and an
//! acyclic dependency graph. Library sources nothing depends on are dropped.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::cycles::DependencyGraph;
use super::input::{SourceEntry, SourceRole};
use crate::base::{SourceId, SourceRef};
use crate::error::{LinkageError, SourceError};
use crate::stmt::{
    Argument, ArgumentShape, DeclaredStatement, Keyword, QNameModule, Revision, YangVersion,
    is_identifier,
};

// ============================================================================
// PRE-LINKAGE
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SourceKind {
    Module,
    Submodule,
}

/// A raw `import` or `include` reference.
#[derive(Clone, Debug)]
pub(crate) struct Dependency {
    pub name: SmolStr,
    pub prefix: Option<SmolStr>,
    pub revision: Option<Revision>,
    pub at: SourceRef,
}

/// Identity and raw dependencies of one source.
#[derive(Clone, Debug)]
pub(crate) struct SourceInfo {
    pub role: SourceRole,
    pub statement: Arc<DeclaredStatement>,
    pub kind: SourceKind,
    pub name: SmolStr,
    pub namespace: Option<SmolStr>,
    /// Module prefix, or the belongs-to prefix of a submodule.
    pub prefix: SmolStr,
    /// Latest declared revision.
    pub revision: Option<Revision>,
    pub version: YangVersion,
    pub imports: Vec<Dependency>,
    pub includes: Vec<Dependency>,
    pub belongs_to: Option<SmolStr>,
}

impl SourceInfo {
    pub fn source_ref(&self) -> &SourceRef {
        self.statement.source_ref()
    }
}

fn missing(parent: &DeclaredStatement, child: Keyword) -> SourceError {
    SourceError::MissingStatement {
        at: parent.source_ref().clone(),
        parent: parent.kind().to_string().into(),
        child: child.as_str().into(),
    }
}

fn typed(stmt: &DeclaredStatement, shape: ArgumentShape) -> Result<Argument, SourceError> {
    Argument::parse(shape, stmt.raw_argument(), YangVersion::V1_1).map_err(|error| {
        SourceError::BadArgument {
            at: stmt.source_ref().clone(),
            statement: stmt.kind().to_string().into(),
            error,
        }
    })
}

fn identifier(stmt: &DeclaredStatement) -> Result<SmolStr, SourceError> {
    match stmt.raw_argument() {
        Some(raw) if is_identifier(raw) => Ok(SmolStr::new(raw)),
        raw => Err(SourceError::BadArgument {
            at: stmt.source_ref().clone(),
            statement: stmt.kind().to_string().into(),
            error: crate::stmt::ArgumentError::new("identifier", raw.unwrap_or("")),
        }),
    }
}

fn revision_of(stmt: &DeclaredStatement) -> Result<Revision, SourceError> {
    match typed(stmt, ArgumentShape::Revision)? {
        Argument::Revision(rev) => Ok(rev),
        _ => Err(missing(stmt, Keyword::Revision)),
    }
}

fn dependency(stmt: &DeclaredStatement, needs_prefix: bool) -> Result<Dependency, SourceError> {
    let name = identifier(stmt)?;
    let prefix = match stmt.find_first(Keyword::Prefix) {
        Some(prefix) => Some(identifier(prefix)?),
        None if needs_prefix => return Err(missing(stmt, Keyword::Prefix)),
        None => None,
    };
    let revision = stmt
        .find_first(Keyword::RevisionDate)
        .map(|r| revision_of(r))
        .transpose()?;
    Ok(Dependency {
        name,
        prefix,
        revision,
        at: stmt.source_ref().clone(),
    })
}

/// Read a source's identity. Pure per source, so it can run in parallel.
pub(crate) fn extract_source(entry: &SourceEntry) -> Result<SourceInfo, SourceError> {
    let root = &entry.statement;
    let kind = match root.keyword() {
        Some(Keyword::Module) => SourceKind::Module,
        Some(Keyword::Submodule) => SourceKind::Submodule,
        _ => {
            return Err(SourceError::NotASource {
                at: root.source_ref().clone(),
                found: root.kind().to_string().into(),
            });
        }
    };
    let name = identifier(root)?;

    let version = match root.find_first(Keyword::YangVersion) {
        Some(stmt) => match typed(stmt, ArgumentShape::YangVersion)? {
            Argument::YangVersion(version) => version,
            _ => YangVersion::V1,
        },
        None => YangVersion::V1,
    };

    let (namespace, prefix, belongs_to) = match kind {
        SourceKind::Module => {
            let namespace = root
                .first_argument(Keyword::Namespace)
                .ok_or_else(|| missing(root, Keyword::Namespace))?;
            let prefix = root
                .find_first(Keyword::Prefix)
                .ok_or_else(|| missing(root, Keyword::Prefix))?;
            (Some(SmolStr::new(namespace)), identifier(prefix)?, None)
        }
        SourceKind::Submodule => {
            let belongs = root
                .find_first(Keyword::BelongsTo)
                .ok_or_else(|| missing(root, Keyword::BelongsTo))?;
            let prefix = belongs
                .find_first(Keyword::Prefix)
                .ok_or_else(|| missing(belongs, Keyword::Prefix))?;
            (None, identifier(prefix)?, Some(identifier(belongs)?))
        }
    };

    let mut revision: Option<Revision> = None;
    for stmt in root.find_all(Keyword::Revision) {
        let rev = revision_of(stmt)?;
        if revision.as_ref().is_none_or(|latest| rev > *latest) {
            revision = Some(rev);
        }
    }

    let imports = root
        .find_all(Keyword::Import)
        .map(|s| dependency(s, true))
        .collect::<Result<Vec<_>, _>>()?;
    let includes = root
        .find_all(Keyword::Include)
        .map(|s| dependency(s, false))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SourceInfo {
        role: entry.role,
        statement: root.clone(),
        kind,
        name,
        namespace,
        prefix,
        revision,
        version,
        imports,
        includes,
        belongs_to,
    })
}

// ============================================================================
// LINKAGE
// ============================================================================

/// A source after linkage, with every reference bound.
#[derive(Clone, Debug)]
pub(crate) struct LinkedSource {
    pub id: SourceId,
    pub info: SourceInfo,
    /// The module this source contributes to: itself, or its belongs-to parent.
    pub module: SourceId,
    /// Prefix → module source, including the source's own prefix.
    pub prefixes: FxHashMap<SmolStr, SourceId>,
    pub imports: Vec<SourceId>,
    pub includes: Vec<SourceId>,
}

/// The linked source graph of one build.
#[derive(Clone, Debug, Default)]
pub(crate) struct Linkage {
    pub sources: Vec<LinkedSource>,
}

impl Linkage {
    pub fn get(&self, id: SourceId) -> &LinkedSource {
        &self.sources[id.as_usize()]
    }

    /// The QName namespace that definitions in `id` belong to.
    pub fn qname_module(&self, id: SourceId) -> QNameModule {
        let module = &self.get(self.get(id).module).info;
        QNameModule::new(module.namespace.clone().unwrap_or_default(), module.revision.clone())
    }

    /// Submodules belonging to a module source, in supply order.
    pub fn submodules_of(&self, module: SourceId) -> impl Iterator<Item = SourceId> + '_ {
        self.sources
            .iter()
            .filter(move |s| s.module == module && s.id != module)
            .map(|s| s.id)
    }

    /// Module sources, in supply order.
    pub fn modules(&self) -> impl Iterator<Item = &LinkedSource> + '_ {
        self.sources.iter().filter(|s| s.info.kind == SourceKind::Module)
    }
}

/// Name lookup over the candidate sources, latest revision first.
struct SourceIndex {
    modules: FxHashMap<SmolStr, Vec<usize>>,
    submodules: FxHashMap<SmolStr, Vec<usize>>,
}

impl SourceIndex {
    fn new(infos: &[SourceInfo]) -> Result<Self, LinkageError> {
        let mut index = Self {
            modules: FxHashMap::default(),
            submodules: FxHashMap::default(),
        };
        let mut namespaces: FxHashMap<&str, usize> = FxHashMap::default();

        for (i, info) in infos.iter().enumerate() {
            let bucket = match info.kind {
                SourceKind::Module => index.modules.entry(info.name.clone()).or_default(),
                SourceKind::Submodule => index.submodules.entry(info.name.clone()).or_default(),
            };
            if bucket.iter().any(|&j| infos[j].revision == info.revision) {
                return Err(LinkageError::DuplicateSource {
                    at: info.source_ref().clone(),
                    name: info.name.clone(),
                    revision: info.revision.clone(),
                });
            }
            bucket.push(i);

            if let Some(namespace) = info.namespace.as_deref() {
                match namespaces.get(namespace) {
                    Some(&j) if infos[j].name != info.name => {
                        return Err(LinkageError::DuplicateNamespace {
                            at: info.source_ref().clone(),
                            namespace: namespace.into(),
                            first: infos[j].name.clone(),
                            second: info.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        namespaces.insert(namespace, i);
                    }
                }
            }
        }

        for bucket in index.modules.values_mut().chain(index.submodules.values_mut()) {
            bucket.sort_by(|&a, &b| infos[b].revision.cmp(&infos[a].revision));
        }
        Ok(index)
    }

    /// Revision rules: an exact match wins; a required revision may also bind
    /// to a revisionless source; no required revision binds to the latest.
    fn select(candidates: Option<&Vec<usize>>, infos: &[SourceInfo], revision: Option<&Revision>) -> Option<usize> {
        let candidates = candidates?;
        match revision {
            Some(rev) => candidates
                .iter()
                .find(|&&i| infos[i].revision.as_ref() == Some(rev))
                .or_else(|| candidates.iter().find(|&&i| infos[i].revision.is_none()))
                .copied(),
            None => candidates.first().copied(),
        }
    }
}

/// Bind every import and include. Fails fast on the first broken reference;
/// a dependency cycle reports every edge on it.
pub(crate) fn link(infos: Vec<SourceInfo>) -> Result<Linkage, Vec<LinkageError>> {
    let main_names: FxHashSet<SmolStr> = infos
        .iter()
        .filter(|i| i.role == SourceRole::Main)
        .map(|i| i.name.clone())
        .collect();
    let infos: Vec<SourceInfo> = infos
        .into_iter()
        .filter(|info| {
            let shadowed = info.role == SourceRole::Library && main_names.contains(&info.name);
            if shadowed {
                tracing::debug!(source = %info.name, "library source shadowed by main source");
            }
            !shadowed
        })
        .collect();

    let index = SourceIndex::new(&infos).map_err(|e| vec![e])?;
    let count = infos.len();
    let mut prefixes: Vec<FxHashMap<SmolStr, usize>> = vec![FxHashMap::default(); count];
    let mut imports: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut includes: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut graph: DependencyGraph<usize, SourceRef> = DependencyGraph::new();
    let mut required: FxHashMap<usize, Revision> = FxHashMap::default();

    for (i, info) in infos.iter().enumerate() {
        graph.add_node(i);
        for import in &info.imports {
            let target = SourceIndex::select(index.modules.get(&import.name), &infos, import.revision.as_ref())
                .ok_or_else(|| {
                    vec![LinkageError::MissingImport {
                        at: import.at.clone(),
                        module: import.name.clone(),
                        revision: import.revision.clone(),
                    }]
                })?;
            if let Some(rev) = &import.revision {
                match required.get(&target) {
                    Some(first) if first != rev => {
                        return Err(vec![LinkageError::RevisionConflict {
                            at: import.at.clone(),
                            module: import.name.clone(),
                            first: first.clone(),
                            second: rev.clone(),
                        }]);
                    }
                    Some(_) => {}
                    None => {
                        required.insert(target, rev.clone());
                    }
                }
            }
            let prefix = import.prefix.clone().unwrap_or_else(|| import.name.clone());
            if prefix == info.prefix || prefixes[i].insert(prefix.clone(), target).is_some() {
                return Err(vec![LinkageError::DuplicatePrefix {
                    at: import.at.clone(),
                    prefix,
                }]);
            }
            imports[i].push(target);
            graph.add_edge(i, target, import.at.clone());
        }

        let module_name = info.belongs_to.as_ref().unwrap_or(&info.name);
        for include in &info.includes {
            let target = SourceIndex::select(index.submodules.get(&include.name), &infos, include.revision.as_ref())
                .ok_or_else(|| {
                    vec![LinkageError::MissingInclude {
                        at: include.at.clone(),
                        submodule: include.name.clone(),
                        revision: include.revision.clone(),
                    }]
                })?;
            let belongs_to = infos[target].belongs_to.clone().unwrap_or_default();
            if &belongs_to != module_name {
                return Err(vec![LinkageError::BelongsToMismatch {
                    at: include.at.clone(),
                    submodule: include.name.clone(),
                    belongs_to,
                    includer: module_name.clone(),
                }]);
            }
            includes[i].push(target);
            graph.add_edge(i, target, include.at.clone());
        }
    }

    let cycle_errors: Vec<LinkageError> = graph
        .cycle_edges()
        .into_iter()
        .map(|edge| LinkageError::Cycle {
            at: edge.data,
            from: infos[edge.from].name.clone(),
            to: infos[edge.to].name.clone(),
        })
        .collect();
    if !cycle_errors.is_empty() {
        return Err(cycle_errors);
    }

    // Parent module of every source; a submodule prefers a module that
    // actually includes it.
    let mut parent: Vec<usize> = (0..count).collect();
    for (i, info) in infos.iter().enumerate() {
        let Some(belongs_to) = &info.belongs_to else {
            continue;
        };
        let candidates = index.modules.get(belongs_to).cloned().unwrap_or_default();
        let chosen = candidates
            .iter()
            .copied()
            .find(|&m| includes[m].contains(&i))
            .or_else(|| candidates.first().copied());
        match chosen {
            Some(m) => parent[i] = m,
            None => {
                return Err(vec![LinkageError::MissingBelongsTo {
                    at: info.source_ref().clone(),
                    module: belongs_to.clone(),
                }]);
            }
        }
    }

    // Keep main sources and everything they reach.
    let mut reachable = vec![false; count];
    let mut queue: Vec<usize> = (0..count).filter(|&i| infos[i].role == SourceRole::Main).collect();
    while let Some(i) = queue.pop() {
        if std::mem::replace(&mut reachable[i], true) {
            continue;
        }
        queue.extend(imports[i].iter().chain(includes[i].iter()).copied());
        queue.push(parent[i]);
    }

    let mut renumber: Vec<Option<SourceId>> = vec![None; count];
    let mut next = 0u32;
    for i in 0..count {
        if reachable[i] {
            renumber[i] = Some(SourceId::new(next));
            next += 1;
        } else {
            tracing::debug!(source = %infos[i].name, "unreferenced library source omitted");
        }
    }
    let id_of = |i: usize| renumber[i].unwrap_or(SourceId::new(u32::MAX));

    let mut sources = Vec::with_capacity(next as usize);
    for (i, info) in infos.into_iter().enumerate() {
        let Some(id) = renumber[i] else {
            continue;
        };
        let mut bound: FxHashMap<SmolStr, SourceId> = prefixes[i]
            .iter()
            .map(|(prefix, &target)| (prefix.clone(), id_of(target)))
            .collect();
        bound.insert(info.prefix.clone(), id_of(parent[i]));
        sources.push(LinkedSource {
            id,
            module: id_of(parent[i]),
            prefixes: bound,
            imports: imports[i].iter().map(|&t| id_of(t)).collect(),
            includes: includes[i].iter().map(|&t| id_of(t)).collect(),
            info,
        });
    }

    tracing::debug!(sources = sources.len(), "sources linked");
    Ok(Linkage { sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    fn info(role: SourceRole, text: &str) -> SourceInfo {
        let entry = SourceEntry {
            role,
            statement: Arc::new(parse_source("t.yang", text).unwrap()),
        };
        extract_source(&entry).unwrap()
    }

    #[test]
    fn test_extract_module_identity() {
        let info = info(
            SourceRole::Main,
            r#"module foo {
                yang-version 1.1;
                namespace "urn:foo";
                prefix f;
                import bar { prefix b; revision-date 2020-01-01; }
                revision 2019-01-01;
                revision 2021-06-30;
            }"#,
        );
        assert_eq!(info.kind, SourceKind::Module);
        assert_eq!(info.version, YangVersion::V1_1);
        assert_eq!(info.revision.as_ref().map(|r| r.as_str()), Some("2021-06-30"));
        assert_eq!(info.imports.len(), 1);
        assert_eq!(info.imports[0].prefix.as_deref(), Some("b"));
    }

    #[test]
    fn test_extract_rejects_missing_namespace() {
        let entry = SourceEntry {
            role: SourceRole::Main,
            statement: Arc::new(parse_source("t.yang", "module foo { prefix f; }").unwrap()),
        };
        assert!(matches!(
            extract_source(&entry),
            Err(SourceError::MissingStatement { .. })
        ));
    }

    #[test]
    fn test_link_binds_prefixes() {
        let linkage = link(vec![
            info(SourceRole::Main, "module a { namespace urn:a; prefix a; import b { prefix bb; } }"),
            info(SourceRole::Library, "module b { namespace urn:b; prefix b; }"),
        ])
        .unwrap();
        let a = linkage.get(SourceId::new(0));
        assert_eq!(a.prefixes.get("bb"), Some(&SourceId::new(1)));
        assert_eq!(a.prefixes.get("a"), Some(&SourceId::new(0)));
    }

    #[test]
    fn test_link_drops_unreferenced_library() {
        let linkage = link(vec![
            info(SourceRole::Main, "module a { namespace urn:a; prefix a; }"),
            info(SourceRole::Library, "module b { namespace urn:b; prefix b; }"),
        ])
        .unwrap();
        assert_eq!(linkage.sources.len(), 1);
    }

    #[test]
    fn test_link_duplicate_prefix() {
        let result = link(vec![
            info(SourceRole::Main, "module a { namespace urn:a; prefix a; import b { prefix a; } }"),
            info(SourceRole::Library, "module b { namespace urn:b; prefix b; }"),
        ]);
        assert!(matches!(
            result.unwrap_err().as_slice(),
            [LinkageError::DuplicatePrefix { .. }]
        ));
    }

    #[test]
    fn test_link_submodule_parent() {
        let linkage = link(vec![
            info(SourceRole::Main, "module a { namespace urn:a; prefix a; include sub; }"),
            info(SourceRole::Library, "submodule sub { belongs-to a { prefix a; } }"),
        ])
        .unwrap();
        let sub = linkage.get(SourceId::new(1));
        assert_eq!(sub.module, SourceId::new(0));
        assert_eq!(linkage.qname_module(sub.id).namespace, "urn:a");
        assert_eq!(linkage.submodules_of(SourceId::new(0)).count(), 1);
    }
}
