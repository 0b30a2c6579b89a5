//! Feature evaluation.
//!
//! A feature is supported when the build options list it (or list nothing)
//! and its own `if-feature` conditions hold. A statement whose conditions do
//! not hold is dropped together with its subtree before any `uses`, `refine`
//! or `augment` can see it.

use super::action::Outcome;
use super::context::{BuildContext, StmtId};
use crate::error::InferenceError;
use crate::stmt::{IfFeatureExpr, Keyword, PrefixedName, QName};

pub(crate) fn evaluate(ctx: &mut BuildContext<'_>, owner: StmtId) -> Outcome {
    match if_features_hold(ctx, owner) {
        Ok(true) => Outcome::Applied,
        Ok(false) => {
            tracing::trace!(statement = %ctx.get(owner).name(), "excluded by if-feature");
            ctx.mark_unsupported(owner);
            Outcome::Applied
        }
        Err(cause) => Outcome::Failed(cause),
    }
}

/// Whether every `if-feature` on `id` is satisfied.
pub(crate) fn if_features_hold(ctx: &mut BuildContext<'_>, id: StmtId) -> Result<bool, InferenceError> {
    let conditions: Vec<(StmtId, IfFeatureExpr)> = ctx
        .children_with(id, Keyword::IfFeature)
        .filter_map(|c| ctx.get(c).argument.as_if_feature().cloned().map(|e| (c, e)))
        .collect();
    for (at, expr) in conditions {
        let mut oracle = |name: &PrefixedName| -> Result<bool, InferenceError> {
            let feature = ctx.lookup_feature(at, name)?;
            is_feature_supported(ctx, feature)
        };
        if !expr.evaluate(&mut oracle)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Memoized support of a `feature` statement. A feature on a reported
/// cycle is unsupported.
pub(crate) fn is_feature_supported(ctx: &mut BuildContext<'_>, feature: StmtId) -> Result<bool, InferenceError> {
    if let Some(&known) = ctx.feature_memo.get(&feature) {
        return Ok(known);
    }
    if ctx.poisoned.contains(&feature) || !ctx.feature_stack.insert(feature) {
        return Ok(false);
    }
    let stmt = ctx.get(feature);
    let qname = QName::new(stmt.module.clone(), stmt.argument.as_identifier().cloned().unwrap_or_default());
    let result = if ctx.options.is_feature_listed(&qname) {
        if_features_hold(ctx, feature)
    } else {
        Ok(false)
    };
    ctx.feature_stack.remove(&feature);
    let supported = result?;
    ctx.feature_memo.insert(feature, supported);
    Ok(supported)
}
