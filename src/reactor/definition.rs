//! Statement-Definition phase.
//!
//! Checks every declared tree against the statement-support table, resolves
//! extension statements against the extension table, then loads the trees
//! into the build arena, adds context statements (`input`/`output`, shorthand
//! `case`), fills the namespace registry and registers Full-Declaration
//! actions.

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::action::{Action, ActionKind};
use super::context::{BuildContext, StmtCtx, StmtId};
use super::linkage::LinkedSource;
use super::namespace::{DefinitionKind, Scope};
use crate::base::SourceId;
use crate::effective::Origin;
use crate::error::{InferenceError, SourceError};
use crate::stmt::{
    Argument, DeclaredStatement, ExtensionSupport, Keyword, QName, QNameModule,
    RuleLookup, StatementKind, StatementSupport, YangVersion, deviate_allows,
};

// ============================================================================
// VALIDATION
// ============================================================================

fn bad_argument(stmt: &DeclaredStatement, error: crate::stmt::ArgumentError) -> SourceError {
    SourceError::BadArgument {
        at: stmt.source_ref().clone(),
        statement: stmt.kind().to_string().into(),
        error,
    }
}

/// Check one declared tree against the statement-support table.
pub(crate) fn validate_tree(stmt: &DeclaredStatement, version: YangVersion) -> Result<(), SourceError> {
    // Extension bodies are opaque.
    let Some(keyword) = stmt.keyword() else {
        return Ok(());
    };
    let support = StatementSupport::of(keyword);
    if support.since > version {
        return Err(SourceError::RequiresYang11 {
            at: stmt.source_ref().clone(),
            statement: keyword.as_str().into(),
        });
    }
    let argument = Argument::parse(support.argument, stmt.raw_argument(), version)
        .map_err(|e| bad_argument(stmt, e))?;
    let deviate = argument.as_deviate();

    let mut counts: FxHashMap<Keyword, usize> = FxHashMap::default();
    for child in stmt.substatements() {
        let Some(child_keyword) = child.keyword() else {
            continue;
        };
        if let Some(kind) = deviate {
            if !deviate_allows(kind, child_keyword) {
                return Err(SourceError::InvalidDeviateProperty {
                    at: child.source_ref().clone(),
                    kind: kind.to_string().into(),
                    child: child_keyword.as_str().into(),
                });
            }
        }
        match support.rule_for(child_keyword, version) {
            RuleLookup::NotAllowed => {
                return Err(SourceError::UnexpectedStatement {
                    at: child.source_ref().clone(),
                    parent: keyword.as_str().into(),
                    child: child_keyword.as_str().into(),
                });
            }
            RuleLookup::RequiresYang11 => {
                return Err(SourceError::RequiresYang11 {
                    at: child.source_ref().clone(),
                    statement: child_keyword.as_str().into(),
                });
            }
            RuleLookup::Allowed(cardinality) => {
                let count = counts.entry(child_keyword).or_default();
                *count += 1;
                if cardinality.max().is_some_and(|max| *count > max) {
                    return Err(SourceError::TooManyStatements {
                        at: child.source_ref().clone(),
                        parent: keyword.as_str().into(),
                        child: child_keyword.as_str().into(),
                    });
                }
            }
        }
    }

    if let Some(missing) = support.required(version).find(|k| !counts.contains_key(k)) {
        return Err(SourceError::MissingStatement {
            at: stmt.source_ref().clone(),
            parent: keyword.as_str().into(),
            child: missing.as_str().into(),
        });
    }

    if keyword == Keyword::Deviation {
        let deviates: Vec<_> = stmt.find_all(Keyword::Deviate).collect();
        let not_supported = deviates
            .iter()
            .any(|d| d.raw_argument() == Some("not-supported"));
        if not_supported && deviates.len() > 1 {
            return Err(SourceError::NotSupportedCombined {
                at: stmt.source_ref().clone(),
            });
        }
    }

    for child in stmt.substatements() {
        validate_tree(child, version)?;
    }
    Ok(())
}

// ============================================================================
// EXTENSIONS
// ============================================================================

fn register_extensions(ctx: &mut BuildContext<'_>) -> Result<(), SourceError> {
    for source in &ctx.linkage.sources {
        let module = ctx.linkage.qname_module(source.id);
        for extension in source.info.statement.find_all(Keyword::Extension) {
            let name = extension.raw_argument().unwrap_or_default();
            let argument = extension.find_first(Keyword::Argument);
            let support = ExtensionSupport {
                name: QName::new(module.clone(), name),
                argument: argument.and_then(|a| a.raw_argument()).map(SmolStr::new),
                yin_element: argument
                    .and_then(|a| a.first_argument(Keyword::YinElement))
                    .is_some_and(|v| v == "true"),
            };
            if ctx.extensions.register(support).is_some() {
                return Err(SourceError::Invalid {
                    at: extension.source_ref().clone(),
                    message: format!("extension '{}' is defined more than once", name),
                });
            }
        }
    }
    tracing::debug!(extensions = ctx.extensions.len(), "extensions registered");
    Ok(())
}

/// Resolve every extension statement in a source to a registered descriptor.
fn check_extension_uses(
    ctx: &BuildContext<'_>,
    source: &LinkedSource,
    stmt: &DeclaredStatement,
) -> Result<(), SourceError> {
    if let StatementKind::Extension(name) = stmt.kind() {
        let prefix = name.prefix.clone().unwrap_or_default();
        let module = source
            .prefixes
            .get(&prefix)
            .copied()
            .ok_or_else(|| SourceError::UnknownPrefix {
                at: stmt.source_ref().clone(),
                prefix: prefix.clone(),
            })?;
        let qname = QName::new(ctx.linkage.qname_module(module), name.local.clone());
        let support = ctx
            .extensions
            .get(&qname)
            .ok_or_else(|| SourceError::UnknownExtension {
                at: stmt.source_ref().clone(),
                name: name.to_string().into(),
            })?;
        match (support.argument.is_some(), stmt.raw_argument().is_some()) {
            (true, false) => {
                return Err(SourceError::ExtensionArgument {
                    at: stmt.source_ref().clone(),
                    name: name.to_string().into(),
                    detail: "requires an argument",
                });
            }
            (false, true) => {
                return Err(SourceError::ExtensionArgument {
                    at: stmt.source_ref().clone(),
                    name: name.to_string().into(),
                    detail: "does not take an argument",
                });
            }
            _ => {}
        }
    }
    for child in stmt.substatements() {
        check_extension_uses(ctx, source, child)?;
    }
    Ok(())
}

// ============================================================================
// ARENA
// ============================================================================

struct Loader {
    source: SourceId,
    module: QNameModule,
    version: YangVersion,
    augment_seq: u32,
}

impl Loader {
    fn load(
        &mut self,
        ctx: &mut BuildContext<'_>,
        decl: &Arc<DeclaredStatement>,
        parent: Option<StmtId>,
    ) -> Result<StmtId, SourceError> {
        let argument = match decl.keyword() {
            Some(keyword) => Argument::parse(
                StatementSupport::of(keyword).argument,
                decl.raw_argument(),
                self.version,
            )
            .map_err(|e| bad_argument(decl, e))?,
            None => decl
                .raw_argument()
                .map(|raw| Argument::String(raw.into()))
                .unwrap_or(Argument::None),
        };
        let augment_seq = decl.kind().is(Keyword::Augment).then(|| {
            self.augment_seq += 1;
            self.augment_seq
        });
        let id = ctx.alloc(StmtCtx {
            kind: decl.kind().clone(),
            raw: decl.raw_argument().map(SmolStr::new),
            argument,
            source_ref: decl.source_ref().clone(),
            source: self.source,
            module: self.module.clone(),
            version: self.version,
            parent,
            children: Vec::new(),
            origin: Origin::Declared,
            prototype: None,
            declared: Some(decl.clone()),
            supported: true,
            applied: false,
            augment_seq,
            augmentations: Vec::new(),
            resolution: None,
        });

        let in_choice = decl.kind().is(Keyword::Choice);
        let mut children = Vec::with_capacity(decl.substatements().len());
        for child in decl.substatements() {
            let child_id = self.load(ctx, child, Some(id))?;
            let shorthand = in_choice && child.keyword().is_some_and(Keyword::is_data_definition);
            children.push(if shorthand {
                ctx.wrap_in_case(child_id, id, Origin::Implicit)
            } else {
                child_id
            });
        }
        ctx.get_mut(id).children = children;

        if matches!(decl.keyword(), Some(Keyword::Rpc | Keyword::Action)) {
            for keyword in [Keyword::Input, Keyword::Output] {
                if decl.find_first(keyword).is_none() {
                    let template = ctx.get(id).clone();
                    let implicit = ctx.alloc(StmtCtx {
                        kind: keyword.into(),
                        raw: None,
                        argument: Argument::None,
                        declared: None,
                        origin: Origin::Implicit,
                        parent: Some(id),
                        children: Vec::new(),
                        augment_seq: None,
                        ..template
                    });
                    ctx.push_child(id, implicit);
                }
            }
        }
        Ok(id)
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

fn is_root(ctx: &BuildContext<'_>, id: StmtId) -> bool {
    matches!(ctx.keyword(id), Some(Keyword::Module | Keyword::Submodule))
}

fn register_definitions(ctx: &mut BuildContext<'_>) {
    for id in ctx.ids() {
        let stmt = ctx.get(id);
        let Some(keyword) = stmt.keyword() else {
            continue;
        };
        let Some(name) = stmt.argument.as_identifier().cloned() else {
            continue;
        };
        let at = stmt.source_ref.clone();
        let parent = stmt.parent;
        let top_level = parent.is_some_and(|p| is_root(ctx, p));
        let module_source = ctx.linkage.get(stmt.source).module;
        let qname = QName::new(stmt.module.clone(), name.clone());

        let collision = match keyword {
            Keyword::Grouping | Keyword::Typedef => {
                let kind = if keyword == Keyword::Grouping {
                    DefinitionKind::Grouping
                } else {
                    DefinitionKind::Typedef
                };
                let scope = match parent {
                    Some(p) if !top_level => Scope::Statement(p),
                    _ => Scope::Module(module_source),
                };
                ctx.namespaces
                    .register(kind, scope, name.clone(), id)
                    .map(|_| kind.as_str())
            }
            Keyword::Identity => ctx
                .namespaces
                .register_identity(qname, id)
                .map(|_| "identity"),
            Keyword::Feature => ctx
                .namespaces
                .register_feature(qname, id)
                .map(|_| "feature"),
            _ => None,
        };
        if let Some(namespace) = collision {
            ctx.causes.add(InferenceError::duplicate(&at, namespace, name));
        }
    }
}

fn register_actions(ctx: &BuildContext<'_>) -> Vec<Action> {
    let mut actions = Vec::new();
    for id in ctx.ids() {
        let stmt = ctx.get(id);
        // A refine's if-feature applies to its target.
        if !stmt.is(Keyword::Refine) && stmt.children.iter().any(|&c| ctx.get(c).is(Keyword::IfFeature)) {
            actions.push(Action::new(ActionKind::EvaluateFeatures, id));
        }
        let kind = match stmt.keyword() {
            Some(Keyword::Identity) => ActionKind::LinkIdentity,
            Some(Keyword::Type) => ActionKind::LinkType,
            Some(Keyword::Uses) => ActionKind::ExpandUses,
            Some(Keyword::Augment) if stmt.parent.is_some_and(|p| is_root(ctx, p)) => {
                ActionKind::SpliceAugment
            }
            Some(Keyword::Deviation) => ActionKind::ApplyDeviation,
            _ => continue,
        };
        actions.push(Action::new(kind, id));
    }
    actions
}

/// Run the Statement-Definition phase. Namespace collisions are recorded in
/// the build's cause collector and surface at Full-Declaration.
pub(crate) fn define(ctx: &mut BuildContext<'_>) -> Result<Vec<Action>, SourceError> {
    let trees: Vec<(Arc<DeclaredStatement>, YangVersion)> = ctx
        .linkage
        .sources
        .iter()
        .map(|s| (s.info.statement.clone(), s.info.version))
        .collect();
    let results: Vec<Result<(), SourceError>> = if ctx.options.parallel {
        trees.par_iter().map(|(tree, version)| validate_tree(tree, *version)).collect()
    } else {
        trees.iter().map(|(tree, version)| validate_tree(tree, *version)).collect()
    };
    results.into_iter().collect::<Result<Vec<()>, _>>()?;

    register_extensions(ctx)?;
    for source in &ctx.linkage.sources {
        check_extension_uses(ctx, source, &source.info.statement)?;
    }

    let mut augment_seq = 0;
    for index in 0..ctx.linkage.sources.len() {
        let source = &ctx.linkage.sources[index];
        let mut loader = Loader {
            source: source.id,
            module: ctx.linkage.qname_module(source.id),
            version: source.info.version,
            augment_seq,
        };
        let tree = source.info.statement.clone();
        let root = loader.load(ctx, &tree, None)?;
        augment_seq = loader.augment_seq;
        ctx.roots.push(root);
    }

    register_definitions(ctx);
    let actions = register_actions(ctx);
    tracing::debug!(
        statements = ctx.stmts.len(),
        actions = actions.len(),
        "statements defined"
    );
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    fn validate(text: &str, version: YangVersion) -> Result<(), SourceError> {
        validate_tree(&parse_source("t.yang", text).unwrap(), version)
    }

    #[test]
    fn test_validate_accepts_minimal_module() {
        assert!(validate("module a { namespace urn:a; prefix a; leaf x { type string; } }", YangVersion::V1).is_ok());
    }

    #[test]
    fn test_validate_rejects_unexpected_child() {
        let err = validate("module a { namespace urn:a; prefix a; leaf x { type string; key x; } }", YangVersion::V1)
            .unwrap_err();
        assert!(matches!(err, SourceError::UnexpectedStatement { .. }));
    }

    #[test]
    fn test_validate_rejects_duplicate_singleton() {
        let err = validate(
            "module a { namespace urn:a; prefix a; leaf x { type string; mandatory true; mandatory false; } }",
            YangVersion::V1,
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::TooManyStatements { .. }));
    }

    #[test]
    fn test_validate_rejects_missing_type() {
        let err = validate("module a { namespace urn:a; prefix a; leaf x; }", YangVersion::V1).unwrap_err();
        assert!(matches!(err, SourceError::MissingStatement { .. }));
    }

    #[test]
    fn test_validate_version_gated_statement() {
        let text = "module a { namespace urn:a; prefix a; anydata x; }";
        assert!(matches!(
            validate(text, YangVersion::V1).unwrap_err(),
            SourceError::RequiresYang11 { .. }
        ));
        assert!(validate(text, YangVersion::V1_1).is_ok());
    }

    #[test]
    fn test_validate_deviate_properties() {
        let text = "module a { namespace urn:a; prefix a; deviation /a:x { deviate delete { mandatory true; } } }";
        assert!(matches!(
            validate(text, YangVersion::V1).unwrap_err(),
            SourceError::InvalidDeviateProperty { .. }
        ));
        let combined = "module a { namespace urn:a; prefix a; deviation /a:x { deviate not-supported; deviate add { units m; } } }";
        assert!(matches!(
            validate(combined, YangVersion::V1).unwrap_err(),
            SourceError::NotSupportedCombined { .. }
        ));
    }
}
