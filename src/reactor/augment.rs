//! Augment splicing.
//!
//! An augment copies its schema body into the target in the augmenting
//! module's namespace. Copies land before any node added by a later augment,
//! so the target's children end up in declaration order followed by augment
//! encounter order, whichever order the augments actually resolved in.

use smol_str::SmolStr;

use super::action::{Outcome, Stop};
use super::context::{is_copied_nested, BuildContext, StmtId};
use super::path::PathTarget;
use super::uses::unexpanded_uses;
use crate::effective::Origin;
use crate::error::InferenceError;
use crate::stmt::{Keyword, QName};

pub(crate) fn splice(ctx: &mut BuildContext<'_>, augment: StmtId) -> Outcome {
    match splice_top_level(ctx, augment) {
        Ok(()) => Outcome::Applied,
        Err(stop) => stop.into(),
    }
}

fn splice_top_level(ctx: &mut BuildContext<'_>, augment: StmtId) -> Result<(), Stop> {
    let Some(path) = ctx.get(augment).argument.as_schema_node_id().cloned() else {
        return Ok(());
    };
    let at = ctx.get(augment).source_ref.clone();
    let target = match ctx.resolve_absolute(augment, &path)? {
        PathTarget::Found(target) => target,
        PathTarget::Unsupported(_) => {
            tracing::debug!(target = %path, "augment target is not supported; skipped");
            return Ok(());
        }
        PathTarget::Missing => {
            return Err(Stop::Pending(InferenceError::AugmentTargetNotFound {
                at,
                target: path.to_string().into(),
            }));
        }
    };

    let blocker = unexpanded_uses(ctx, augment).or_else(|| {
        ctx.children_with(target, Keyword::Uses)
            .find(|&u| !ctx.get(u).applied && !ctx.poisoned.contains(&u))
    });
    if let Some(blocker) = blocker {
        return Err(Stop::Pending(InferenceError::AugmentBlocked {
            at,
            target: path.to_string().into(),
            blocker: format!("uses '{}' is expanded", ctx.get(blocker).name()),
        }));
    }

    let guarded = ctx.child(augment, Keyword::When).is_some();
    let check = !guarded && requires_mandatory_check(ctx, augment, target);
    splice_into(ctx, augment, target, Origin::AddedByAugmentation, check)
}

/// Copy the body of `augment` into `target`.
pub(crate) fn splice_into(
    ctx: &mut BuildContext<'_>,
    augment: StmtId,
    target: StmtId,
    origin: Origin,
    mandatory_check: bool,
) -> Result<(), Stop> {
    let target_kind = ctx.keyword(target);
    let valid = matches!(
        target_kind,
        Some(
            Keyword::Container
                | Keyword::List
                | Keyword::Choice
                | Keyword::Case
                | Keyword::Input
                | Keyword::Output
                | Keyword::Notification
                | Keyword::Action
        )
    );
    if !valid {
        return Err(Stop::Failed(InferenceError::InvalidAugmentTarget {
            at: ctx.get(augment).source_ref.clone(),
            target: ctx.get(target).name(),
            kind: SmolStr::new(ctx.get(target).kind.to_string()),
        }));
    }

    let module = ctx.get(augment).module.clone();
    let body: Vec<StmtId> = ctx
        .children(augment)
        .iter()
        .copied()
        .filter(|&c| {
            ctx.get(c).supported && ctx.keyword(c).is_some_and(Keyword::is_copied_schema_content)
        })
        .collect();

    let taken = names_in_use(ctx, target);
    for &node in &body {
        let stmt = ctx.get(node);
        let Some(local) = stmt.argument.as_identifier() else {
            continue;
        };
        if taken.contains(&QName::new(module.clone(), local.clone())) {
            return Err(Stop::Failed(InferenceError::AugmentCollision {
                at: stmt.source_ref.clone(),
                node: local.clone(),
            }));
        }
        if mandatory_check && is_mandatory(ctx, node) {
            return Err(Stop::Failed(InferenceError::MandatoryAugment {
                at: stmt.source_ref.clone(),
                node: local.clone(),
            }));
        }
    }

    let seq = ctx.get(augment).augment_seq;
    let into_choice = target_kind == Some(Keyword::Choice);
    let mut added = Vec::with_capacity(body.len());
    for node in body {
        let mut copy = ctx.copy_subtree(node, target, origin, Some(&module), &is_copied_nested);
        if into_choice && ctx.keyword(copy).is_some_and(Keyword::is_data_definition) {
            copy = ctx.wrap_in_case(copy, target, origin);
        }
        ctx.get_mut(copy).augment_seq = seq;
        added.push(copy);
    }

    let position = ctx
        .children(target)
        .iter()
        .position(|&c| ctx.get(c).augment_seq > seq)
        .unwrap_or(ctx.children(target).len());
    for (offset, &copy) in added.iter().enumerate() {
        ctx.insert_child(target, position + offset, copy);
    }
    let slot = ctx
        .get(target)
        .augmentations
        .iter()
        .position(|&a| ctx.get(a).augment_seq > seq)
        .unwrap_or(ctx.get(target).augmentations.len());
    ctx.get_mut(target).augmentations.insert(slot, augment);

    tracing::trace!(
        augment = %ctx.get(augment).name(),
        target = %ctx.get(target).name(),
        nodes = added.len(),
        "augment spliced"
    );
    Ok(())
}

/// Schema names already present in `target`. Under a choice, case members
/// share the choice's namespace.
fn names_in_use(ctx: &BuildContext<'_>, target: StmtId) -> Vec<QName> {
    let mut names = Vec::new();
    for child in ctx.schema_children(target) {
        names.extend(ctx.schema_qname(child));
        if ctx.get(target).is(Keyword::Choice) && ctx.get(child).is(Keyword::Case) {
            names.extend(ctx.schema_children(child).filter_map(|c| ctx.schema_qname(c)));
        }
    }
    names
}

// ============================================================================
// MANDATORY NODES
// ============================================================================

fn min_elements(ctx: &BuildContext<'_>, node: StmtId) -> i64 {
    ctx.child(node, Keyword::MinElements)
        .and_then(|c| ctx.get(c).argument.as_integer())
        .unwrap_or(0)
}

/// Whether adding `node` forces instance data to exist.
pub(crate) fn is_mandatory(ctx: &BuildContext<'_>, node: StmtId) -> bool {
    match ctx.keyword(node) {
        Some(Keyword::Leaf | Keyword::Choice | Keyword::Anydata | Keyword::Anyxml) => {
            ctx.flag(node, Keyword::Mandatory) == Some(true)
        }
        Some(Keyword::List | Keyword::LeafList) => min_elements(ctx, node) > 0,
        Some(Keyword::Container) if ctx.child(node, Keyword::Presence).is_none() => ctx
            .schema_children(node)
            .any(|c| is_mandatory(ctx, c)),
        _ => false,
    }
}

/// The augment whose body `node` was copied from, if any.
fn source_augment(ctx: &BuildContext<'_>, node: StmtId) -> Option<StmtId> {
    let stmt = ctx.get(node);
    let copied = match stmt.prototype {
        Some(_) => node,
        // An implicit case wraps the copied node.
        None => *stmt.children.first()?,
    };
    let original = ctx.get(copied).prototype?;
    let parent = ctx.get(original).parent?;
    ctx.get(parent).is(Keyword::Augment).then_some(parent)
}

/// Whether mandatory nodes added by `augment` to `target` must be rejected.
/// Walking up from the target, a node from another module requires the
/// check; a presence container, a non-mandatory choice or list, or a node
/// added by a conditional augment of the same module ends it.
fn requires_mandatory_check(ctx: &BuildContext<'_>, augment: StmtId, target: StmtId) -> bool {
    let module = &ctx.get(augment).module;
    let mut current = Some(target);
    while let Some(node) = current {
        let stmt = ctx.get(node);
        if stmt.parent.is_none() {
            break;
        }
        if stmt.module != *module {
            return true;
        }
        let optional = match stmt.keyword() {
            Some(Keyword::Container) => ctx.child(node, Keyword::Presence).is_some(),
            Some(Keyword::Choice) => ctx.flag(node, Keyword::Mandatory) != Some(true),
            Some(Keyword::List) => min_elements(ctx, node) == 0,
            _ => false,
        };
        if optional {
            return false;
        }
        if stmt.origin == Origin::AddedByAugmentation {
            if let Some(source) = source_augment(ctx, node) {
                if ctx.get(source).module == *module && ctx.child(source, Keyword::When).is_some() {
                    return false;
                }
            }
        }
        current = stmt.parent;
    }
    false
}
