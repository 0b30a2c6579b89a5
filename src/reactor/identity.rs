//! Identity linking.
//!
//! An identity is linked once every `base` it names is linked, which makes
//! the identity graph resolve bottom-up from its roots.

use std::sync::Arc;

use super::action::Outcome;
use super::context::{BuildContext, StmtId};
use crate::effective::Resolution;
use crate::error::InferenceError;
use crate::stmt::{Keyword, PrefixedName};

pub(crate) fn link(ctx: &mut BuildContext<'_>, identity: StmtId) -> Outcome {
    let bases: Vec<(StmtId, PrefixedName)> = ctx
        .children_with(identity, Keyword::Base)
        .filter_map(|b| ctx.get(b).argument.as_prefixed_name().cloned().map(|n| (b, n)))
        .collect();

    let mut resolved = Vec::with_capacity(bases.len());
    for (at, name) in bases {
        let target = match ctx.lookup_identity(at, &name) {
            Ok(target) => target,
            Err(cause) => return Outcome::Failed(cause),
        };
        if ctx.poisoned.contains(&target) {
            ctx.poisoned.insert(identity);
            return Outcome::Applied;
        }
        if !ctx.is_effectively_supported(target) {
            return Outcome::Failed(InferenceError::not_found(
                &ctx.get(at).source_ref,
                "identity",
                name.to_string(),
            ));
        }
        if ctx.get(target).resolution.is_none() {
            return Outcome::Pending(InferenceError::not_found(
                &ctx.get(at).source_ref,
                "linked identity",
                name.to_string(),
            ));
        }
        match ctx.qname_for(at, &name) {
            Ok(qname) => resolved.push(qname),
            Err(cause) => return Outcome::Failed(cause),
        }
    }

    ctx.get_mut(identity).resolution = Some(Arc::new(Resolution::IdentityBases(resolved)));
    Outcome::Applied
}
