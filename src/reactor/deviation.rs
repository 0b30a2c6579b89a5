//! Deviation application.
//!
//! Deviations patch the settled schema tree: `not-supported` removes the
//! target, `add`/`replace`/`delete` edit its properties. They run after every
//! structural action, so targets may live in expanded groupings or augments.

use super::action::{Outcome, Stop};
use super::context::{is_copied_nested, BuildContext, StmtId};
use super::path::PathTarget;
use crate::effective::Origin;
use crate::error::InferenceError;
use crate::stmt::{DeviateKind, Keyword};

pub(crate) fn apply(ctx: &mut BuildContext<'_>, deviation: StmtId) -> Outcome {
    match apply_deviates(ctx, deviation) {
        Ok(()) => Outcome::Applied,
        Err(stop) => stop.into(),
    }
}

fn apply_deviates(ctx: &mut BuildContext<'_>, deviation: StmtId) -> Result<(), Stop> {
    let Some(path) = ctx.get(deviation).argument.as_schema_node_id().cloned() else {
        return Ok(());
    };
    let at = ctx.get(deviation).source_ref.clone();
    let target = match ctx.resolve_absolute(deviation, &path)? {
        PathTarget::Found(target) => target,
        PathTarget::Unsupported(_) => return Ok(()),
        PathTarget::Missing => {
            return Err(Stop::Pending(InferenceError::DeviationTargetNotFound {
                at,
                target: path.to_string().into(),
            }));
        }
    };

    let target_module = ctx.get(target).module.clone();
    let deviating = ctx.get(deviation).module.clone();
    if target_module == deviating {
        return Err(Stop::Failed(InferenceError::SelfDeviation {
            at,
            target: path.to_string().into(),
        }));
    }
    if !ctx.options.is_deviation_permitted(&target_module, &deviating) {
        tracing::debug!(target = %path, by = %deviating, "deviation not permitted; skipped");
        return Ok(());
    }

    for deviate in ctx.children_with(deviation, Keyword::Deviate).collect::<Vec<_>>() {
        let Some(kind) = ctx.get(deviate).argument.as_deviate() else {
            continue;
        };
        let properties: Vec<StmtId> = ctx
            .children(deviate)
            .iter()
            .copied()
            .filter(|&p| ctx.get(p).supported && ctx.keyword(p).is_some())
            .collect();
        for property in properties {
            match kind {
                DeviateKind::NotSupported => {}
                DeviateKind::Add => deviate_add(ctx, property, target)?,
                DeviateKind::Replace => deviate_replace(ctx, property, target)?,
                DeviateKind::Delete => deviate_delete(ctx, property, target)?,
            }
        }
        if kind == DeviateKind::NotSupported {
            tracing::debug!(target = %path, "deviated to not-supported");
            ctx.mark_unsupported(target);
            return Ok(());
        }
    }
    Ok(())
}

// ============================================================================
// DEVIATE KINDS
// ============================================================================

fn property_applies(property: Keyword, target: Keyword) -> bool {
    use Keyword as K;
    match property {
        K::Config => target.is_data_definition(),
        K::Default => matches!(target, K::Leaf | K::LeafList | K::Choice),
        K::Mandatory => matches!(target, K::Leaf | K::Choice | K::Anydata | K::Anyxml),
        K::MinElements | K::MaxElements => matches!(target, K::List | K::LeafList),
        K::Must => matches!(
            target,
            K::Container | K::Leaf | K::LeafList | K::List | K::Anydata | K::Anyxml
        ),
        K::Unique => target == K::List,
        K::Units | K::Type => matches!(target, K::Leaf | K::LeafList),
        _ => false,
    }
}

/// Properties a node carries at most once.
fn is_singleton(property: Keyword, target: Keyword) -> bool {
    match property {
        Keyword::Must | Keyword::Unique => false,
        Keyword::Default => target != Keyword::LeafList,
        _ => true,
    }
}

fn check_applies(ctx: &BuildContext<'_>, kind: &str, property: StmtId, target: StmtId) -> Result<Keyword, Stop> {
    let stmt = ctx.get(property);
    let target_stmt = ctx.get(target);
    match (stmt.keyword(), target_stmt.keyword()) {
        (Some(keyword), Some(target_kind)) if property_applies(keyword, target_kind) => Ok(keyword),
        _ => Err(Stop::Failed(InferenceError::InvalidDeviate {
            at: stmt.source_ref.clone(),
            kind: kind.into(),
            property: stmt.kind.to_string().into(),
            target_kind: target_stmt.kind.to_string().into(),
            target: target_stmt.name(),
        })),
    }
}

fn deviate_add(ctx: &mut BuildContext<'_>, property: StmtId, target: StmtId) -> Result<(), Stop> {
    let keyword = check_applies(ctx, "add", property, target)?;
    let target_kind = ctx.get(target).keyword().unwrap_or(Keyword::Leaf);
    if is_singleton(keyword, target_kind) && ctx.child(target, keyword).is_some() {
        return Err(Stop::Failed(InferenceError::DeviateAddExisting {
            at: ctx.get(property).source_ref.clone(),
            property: keyword.as_str().into(),
            target: ctx.get(target).name(),
        }));
    }
    let copy = ctx.copy_subtree(property, target, Origin::AddedByDeviation, None, &is_copied_nested);
    ctx.push_child(target, copy);
    Ok(())
}

fn deviate_replace(ctx: &mut BuildContext<'_>, property: StmtId, target: StmtId) -> Result<(), Stop> {
    let keyword = check_applies(ctx, "replace", property, target)?;
    if keyword == Keyword::Default && ctx.get(target).is(Keyword::LeafList) {
        tracing::error!(
            target = %ctx.get(target).name(),
            "deviate replace cannot replace the defaults of a leaf-list"
        );
        return Err(Stop::Failed(InferenceError::InvalidDeviate {
            at: ctx.get(property).source_ref.clone(),
            kind: "replace".into(),
            property: keyword.as_str().into(),
            target_kind: Keyword::LeafList.as_str().into(),
            target: ctx.get(target).name(),
        }));
    }

    let existing = ctx.child(target, keyword);
    // These have implicit defaults, so replacing an absent one adds it.
    let implicit = matches!(
        keyword,
        Keyword::Config | Keyword::Mandatory | Keyword::MinElements | Keyword::MaxElements
    );
    if existing.is_none() && !implicit {
        return Err(Stop::Failed(InferenceError::DeviateReplaceMissing {
            at: ctx.get(property).source_ref.clone(),
            property: keyword.as_str().into(),
            target: ctx.get(target).name(),
        }));
    }
    let copy = ctx.copy_subtree(property, target, Origin::AddedByDeviation, None, &is_copied_nested);
    match existing {
        Some(old) => ctx.replace_child(old, copy),
        None => ctx.push_child(target, copy),
    }
    Ok(())
}

fn deviate_delete(ctx: &mut BuildContext<'_>, property: StmtId, target: StmtId) -> Result<(), Stop> {
    let keyword = check_applies(ctx, "delete", property, target)?;
    let value = ctx.get(property).raw.clone().unwrap_or_default();
    let found = ctx
        .children_with(target, keyword)
        .find(|&c| ctx.get(c).raw.as_deref() == Some(value.as_str()));
    match found {
        Some(old) => {
            ctx.detach(old);
            Ok(())
        }
        None => Err(Stop::Failed(InferenceError::DeviateDeleteMissing {
            at: ctx.get(property).source_ref.clone(),
            property: keyword.as_str().into(),
            value,
            target: ctx.get(target).name(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Keyword::Units, Keyword::Leaf, true)]
    #[case(Keyword::Units, Keyword::Container, false)]
    #[case(Keyword::Unique, Keyword::List, true)]
    #[case(Keyword::Type, Keyword::LeafList, true)]
    #[case(Keyword::Mandatory, Keyword::LeafList, false)]
    #[case(Keyword::Config, Keyword::Choice, true)]
    fn test_property_applies(#[case] property: Keyword, #[case] target: Keyword, #[case] expected: bool) {
        assert_eq!(property_applies(property, target), expected);
    }

    #[test]
    fn test_leaf_list_default_is_not_singleton() {
        assert!(is_singleton(Keyword::Default, Keyword::Leaf));
        assert!(!is_singleton(Keyword::Default, Keyword::LeafList));
        assert!(!is_singleton(Keyword::Must, Keyword::Leaf));
        assert!(is_singleton(Keyword::Units, Keyword::Leaf));
    }
}
