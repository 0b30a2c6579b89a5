//! `uses` expansion.
//!
//! A `uses` copies the supported schema content of its grouping into the
//! enclosing statement, right after itself, in the namespace of the module
//! where the `uses` appears. Refines then patch the copies and any
//! uses-augments splice into them. Nested `uses` (inside the grouping or the
//! uses-augments) expand first.

use super::action::{Outcome, Stop};
use super::augment;
use super::context::{is_copied_nested, BuildContext, StmtId};
use super::feature;
use super::namespace::DefinitionKind;
use super::path::PathTarget;
use crate::effective::Origin;
use crate::error::InferenceError;
use crate::stmt::Keyword;

pub(crate) fn expand(ctx: &mut BuildContext<'_>, uses: StmtId) -> Outcome {
    let outcome = match instantiate(ctx, uses) {
        Ok(()) => Outcome::Applied,
        Err(stop) => stop.into(),
    };
    if !matches!(outcome, Outcome::Pending(_)) {
        ctx.get_mut(uses).applied = true;
    }
    outcome
}

/// First `uses` below `root` that has not been expanded yet.
pub(crate) fn unexpanded_uses(ctx: &BuildContext<'_>, root: StmtId) -> Option<StmtId> {
    ctx.descendants(root)
        .into_iter()
        .find(|&d| ctx.get(d).is(Keyword::Uses) && !ctx.get(d).applied && !ctx.poisoned.contains(&d))
}

fn instantiate(ctx: &mut BuildContext<'_>, uses: StmtId) -> Result<(), Stop> {
    let Some(name) = ctx.get(uses).argument.as_prefixed_name().cloned() else {
        return Ok(());
    };
    let grouping = ctx.lookup_definition(DefinitionKind::Grouping, uses, &name)?;
    if ctx.poisoned.contains(&grouping) {
        return Err(Stop::Poisoned);
    }
    if let Some(blocker) = unexpanded_uses(ctx, grouping).or_else(|| unexpanded_uses(ctx, uses)) {
        return Err(Stop::Pending(InferenceError::UsesBlocked {
            at: ctx.get(uses).source_ref.clone(),
            grouping: name.to_string().into(),
            blocker: format!("nested uses '{}' is expanded", ctx.get(blocker).name()),
        }));
    }
    let Some(parent) = ctx.get(uses).parent else {
        return Ok(());
    };

    let module = ctx.get(uses).module.clone();
    let in_choice = ctx.get(parent).is(Keyword::Choice);
    let body: Vec<StmtId> = ctx
        .children(grouping)
        .iter()
        .copied()
        .filter(|&c| {
            ctx.get(c).supported && ctx.keyword(c).is_some_and(Keyword::is_copied_schema_content)
        })
        .collect();

    let mut copies = Vec::with_capacity(body.len());
    for child in body {
        let copy = ctx.copy_subtree(child, parent, Origin::AddedByUses, Some(&module), &is_copied_nested);
        let shorthand = in_choice && ctx.keyword(copy).is_some_and(Keyword::is_data_definition);
        copies.push(if shorthand {
            ctx.wrap_in_case(copy, parent, Origin::AddedByUses)
        } else {
            copy
        });
    }
    let position = ctx
        .children(parent)
        .iter()
        .position(|&c| c == uses)
        .map_or(ctx.children(parent).len(), |i| i + 1);
    for (offset, &copy) in copies.iter().enumerate() {
        ctx.insert_child(parent, position + offset, copy);
    }
    tracing::trace!(grouping = %name, nodes = copies.len(), "grouping instantiated");

    for refine in ctx.children_with(uses, Keyword::Refine).collect::<Vec<_>>() {
        apply_refine(ctx, refine, &copies)?;
    }

    for augment in ctx.children_with(uses, Keyword::Augment).collect::<Vec<_>>() {
        let Some(path) = ctx.get(augment).argument.as_schema_node_id().cloned() else {
            continue;
        };
        match ctx.resolve_descendant(augment, &copies, &path)? {
            PathTarget::Found(target) => {
                augment::splice_into(ctx, augment, target, Origin::AddedByUsesAugmentation, false)?;
            }
            PathTarget::Unsupported(_) => {}
            PathTarget::Missing => {
                return Err(Stop::Failed(InferenceError::AugmentTargetNotFound {
                    at: ctx.get(augment).source_ref.clone(),
                    target: path.to_string().into(),
                }));
            }
        }
    }
    Ok(())
}

// ============================================================================
// REFINE
// ============================================================================

fn refine_applies(property: Keyword, target: Keyword) -> bool {
    use Keyword as K;
    match property {
        K::Description | K::Reference => true,
        K::Config => target.is_data_definition(),
        K::Mandatory => matches!(target, K::Leaf | K::Choice | K::Anydata | K::Anyxml),
        K::Presence => target == K::Container,
        K::Default => matches!(target, K::Leaf | K::LeafList | K::Choice),
        K::MinElements | K::MaxElements => matches!(target, K::List | K::LeafList),
        K::Must => matches!(
            target,
            K::Container | K::Leaf | K::LeafList | K::List | K::Anydata | K::Anyxml
        ),
        K::IfFeature => target.is_data_definition() || target == K::Case,
        _ => false,
    }
}

/// Properties a refine replaces rather than appends.
fn replaces(property: Keyword, target: Keyword) -> bool {
    match property {
        Keyword::Default => target != Keyword::LeafList,
        Keyword::Must | Keyword::IfFeature => false,
        _ => true,
    }
}

fn apply_refine(ctx: &mut BuildContext<'_>, refine: StmtId, copies: &[StmtId]) -> Result<(), Stop> {
    let Some(path) = ctx.get(refine).argument.as_schema_node_id().cloned() else {
        return Ok(());
    };
    let target = match ctx.resolve_descendant(refine, copies, &path)? {
        PathTarget::Found(target) => target,
        PathTarget::Unsupported(_) => return Ok(()),
        PathTarget::Missing => {
            return Err(Stop::Failed(InferenceError::RefineTargetNotFound {
                at: ctx.get(refine).source_ref.clone(),
                target: path.to_string().into(),
            }));
        }
    };
    let Some(target_kind) = ctx.keyword(target) else {
        return Ok(());
    };

    let mut defaults_cleared = false;
    let mut conditional = false;
    for property in ctx.children(refine).to_vec() {
        let stmt = ctx.get(property);
        if !stmt.supported {
            continue;
        }
        let origin = stmt.origin;
        let Some(keyword) = stmt.keyword() else {
            // Extension instances are carried over as-is.
            let copy = ctx.copy_subtree(property, target, origin, None, &is_copied_nested);
            ctx.push_child(target, copy);
            continue;
        };
        if !refine_applies(keyword, target_kind) {
            return Err(Stop::Failed(InferenceError::InvalidRefine {
                at: stmt.source_ref.clone(),
                property: keyword.as_str().into(),
                kind: target_kind.as_str().into(),
                target: ctx.get(target).name(),
            }));
        }

        let copy = ctx.copy_subtree(property, target, origin, None, &is_copied_nested);
        if keyword == Keyword::Default && target_kind == Keyword::LeafList && !defaults_cleared {
            for old in ctx.children_with(target, Keyword::Default).collect::<Vec<_>>() {
                ctx.detach(old);
            }
            defaults_cleared = true;
        }
        match ctx.child(target, keyword) {
            Some(old) if replaces(keyword, target_kind) => ctx.replace_child(old, copy),
            _ => ctx.push_child(target, copy),
        }
        conditional |= keyword == Keyword::IfFeature;
    }

    if conditional && !feature::if_features_hold(ctx, target)? {
        tracing::trace!(target = %path, "refined node excluded by if-feature");
        ctx.mark_unsupported(target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Keyword::Presence, Keyword::Container, true)]
    #[case(Keyword::Presence, Keyword::Leaf, false)]
    #[case(Keyword::Mandatory, Keyword::Choice, true)]
    #[case(Keyword::Mandatory, Keyword::List, false)]
    #[case(Keyword::MinElements, Keyword::LeafList, true)]
    #[case(Keyword::Default, Keyword::Container, false)]
    #[case(Keyword::Type, Keyword::Leaf, false)]
    fn test_refine_applies(#[case] property: Keyword, #[case] target: Keyword, #[case] expected: bool) {
        assert_eq!(refine_applies(property, target), expected);
    }

    #[test]
    fn test_leaf_list_defaults_append() {
        assert!(replaces(Keyword::Default, Keyword::Leaf));
        assert!(!replaces(Keyword::Default, Keyword::LeafList));
        assert!(!replaces(Keyword::Must, Keyword::Container));
    }
}
