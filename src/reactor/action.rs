//! Full-Declaration: inference actions and the fixpoint engine.
//!
//! Every action is owned by one statement. Each round runs all pending
//! actions in priority order; an action either completes, fails for good, or
//! stays pending with the reason it could not proceed. Rounds repeat while
//! any action makes progress.
//!
//! Deviations patch settled structure, so they only run once no structural
//! action is pending, or once the structural actions have stalled.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::context::{BuildContext, StmtId};
use super::cycles::DependencyGraph;
use super::namespace::DefinitionKind;
use super::{augment, deviation, feature, identity, types, uses};
use crate::effective::BuiltinType;
use crate::error::InferenceError;
use crate::stmt::Keyword;

// ============================================================================
// ACTIONS
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ActionKind {
    EvaluateFeatures,
    LinkIdentity,
    LinkType,
    ExpandUses,
    SpliceAugment,
    ApplyDeviation,
}

impl ActionKind {
    /// Lower runs first within a round.
    pub fn priority(self) -> u8 {
        match self {
            ActionKind::EvaluateFeatures => 0,
            ActionKind::LinkIdentity | ActionKind::LinkType => 1,
            ActionKind::ExpandUses | ActionKind::SpliceAugment => 2,
            ActionKind::ApplyDeviation => 3,
        }
    }

    fn is_structural(self) -> bool {
        self.priority() < ActionKind::ApplyDeviation.priority()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Action {
    pub kind: ActionKind,
    pub owner: StmtId,
}

impl Action {
    pub fn new(kind: ActionKind, owner: StmtId) -> Self {
        Self { kind, owner }
    }

    fn run(self, ctx: &mut BuildContext<'_>) -> Outcome {
        if self.kind != ActionKind::EvaluateFeatures && !ctx.is_effectively_supported(self.owner) {
            ctx.get_mut(self.owner).applied = true;
            return Outcome::Applied;
        }
        match self.kind {
            ActionKind::EvaluateFeatures => feature::evaluate(ctx, self.owner),
            ActionKind::LinkIdentity => identity::link(ctx, self.owner),
            ActionKind::LinkType => types::link(ctx, self.owner),
            ActionKind::ExpandUses => uses::expand(ctx, self.owner),
            ActionKind::SpliceAugment => augment::splice(ctx, self.owner),
            ActionKind::ApplyDeviation => deviation::apply(ctx, self.owner),
        }
    }
}

/// Result of one attempt.
#[derive(Debug)]
pub(crate) enum Outcome {
    Applied,
    /// Not yet possible; the cause is reported if the build stalls.
    Pending(InferenceError),
    Failed(InferenceError),
}

/// Why an action stopped before completing. Lets action bodies use `?`.
pub(crate) enum Stop {
    Pending(InferenceError),
    Failed(InferenceError),
    /// Depends on a definition already reported as cyclic.
    Poisoned,
}

impl From<InferenceError> for Stop {
    fn from(cause: InferenceError) -> Self {
        Stop::Failed(cause)
    }
}

impl From<Stop> for Outcome {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::Pending(cause) => Outcome::Pending(cause),
            Stop::Failed(cause) => Outcome::Failed(cause),
            Stop::Poisoned => Outcome::Applied,
        }
    }
}

// ============================================================================
// CYCLE PRE-PASS
// ============================================================================

struct CycleScan {
    namespace: &'static str,
    graph: DependencyGraph<StmtId, StmtId>,
}

impl CycleScan {
    fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            graph: DependencyGraph::new(),
        }
    }
}

fn prefixed_argument(ctx: &BuildContext<'_>, id: StmtId) -> Option<crate::stmt::PrefixedName> {
    ctx.get(id).argument.as_prefixed_name().cloned()
}

/// Typedef references of one `type` statement, union members included.
fn typedef_edges(ctx: &BuildContext<'_>, from: StmtId, ty: StmtId, graph: &mut DependencyGraph<StmtId, StmtId>) {
    if let Some(name) = prefixed_argument(ctx, ty) {
        let builtin = name.prefix.is_none() && BuiltinType::from_name(&name.local).is_some();
        if !builtin {
            if let Ok(target) = ctx.lookup_definition(DefinitionKind::Typedef, ty, &name) {
                graph.add_edge(from, target, ty);
            }
        }
    }
    for member in ctx.children_with(ty, Keyword::Type).collect::<Vec<_>>() {
        typedef_edges(ctx, from, member, graph);
    }
}

/// Report every edge of every definition cycle and take the statements on
/// them out of the fixpoint.
fn report_cycles(ctx: &mut BuildContext<'_>, pending: &mut Vec<Action>) {
    let mut identities = CycleScan::new("identity");
    let mut typedefs = CycleScan::new("typedef");
    let mut groupings = CycleScan::new("grouping");
    let mut features = CycleScan::new("feature");

    for id in ctx.ids() {
        match ctx.keyword(id) {
            Some(Keyword::Identity) => {
                identities.graph.add_node(id);
                for base in ctx.children_with(id, Keyword::Base).collect::<Vec<_>>() {
                    let target = prefixed_argument(ctx, base).and_then(|n| ctx.lookup_identity(base, &n).ok());
                    if let Some(target) = target {
                        identities.graph.add_edge(id, target, base);
                    }
                }
            }
            Some(Keyword::Typedef) => {
                typedefs.graph.add_node(id);
                if let Some(ty) = ctx.child(id, Keyword::Type) {
                    typedef_edges(ctx, id, ty, &mut typedefs.graph);
                }
            }
            Some(Keyword::Grouping) => {
                groupings.graph.add_node(id);
                for node in ctx.descendants(id) {
                    if !ctx.get(node).is(Keyword::Uses) {
                        continue;
                    }
                    let target = prefixed_argument(ctx, node)
                        .and_then(|n| ctx.lookup_definition(DefinitionKind::Grouping, node, &n).ok());
                    if let Some(target) = target {
                        groupings.graph.add_edge(id, target, node);
                    }
                }
            }
            Some(Keyword::Feature) => {
                features.graph.add_node(id);
                for condition in ctx.children_with(id, Keyword::IfFeature).collect::<Vec<_>>() {
                    let Some(expr) = ctx.get(condition).argument.as_if_feature().cloned() else {
                        continue;
                    };
                    for name in expr.features() {
                        if let Ok(target) = ctx.lookup_feature(condition, name) {
                            features.graph.add_edge(id, target, condition);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    for scan in [identities, typedefs, groupings, features] {
        for edge in scan.graph.cycle_edges() {
            let name = |id: StmtId| -> SmolStr { ctx.get(id).name() };
            let cause = InferenceError::Cycle {
                at: ctx.get(edge.data).source_ref.clone(),
                namespace: scan.namespace,
                from: name(edge.from),
                to: name(edge.to),
            };
            ctx.causes.add(cause);
            ctx.poisoned.insert(edge.from);
            ctx.poisoned.insert(edge.data);
        }
    }

    if !ctx.poisoned.is_empty() {
        tracing::debug!(statements = ctx.poisoned.len(), "definition cycles found");
        let poisoned = &ctx.poisoned;
        pending.retain(|a| !poisoned.contains(&a.owner));
    }
}

// ============================================================================
// COLLISIONS
// ============================================================================

fn collect_duplicates(ctx: &BuildContext<'_>, members: &[StmtId], found: &mut Vec<InferenceError>) {
    let mut seen: FxHashMap<crate::stmt::QName, StmtId> = FxHashMap::default();
    for &member in members {
        let Some(qname) = ctx.schema_qname(member) else {
            continue;
        };
        if seen.insert(qname.clone(), member).is_some() {
            found.push(InferenceError::duplicate(&ctx.get(member).source_ref, "schema node", qname.local));
        }
    }
}

/// Schema tree names must be unique per scope. A module shares its top
/// level with every submodule; the nodes of all cases of a choice share
/// one scope.
fn check_schema_collisions(ctx: &mut BuildContext<'_>) {
    let mut found = Vec::new();
    for id in ctx.ids() {
        if ctx.children(id).is_empty() || !ctx.is_effectively_supported(id) {
            continue;
        }
        let stmt = ctx.get(id);
        let members: Vec<StmtId> = match stmt.keyword() {
            // Checked together with the module it belongs to.
            Some(Keyword::Submodule) => continue,
            Some(Keyword::Module) => {
                let mut members: Vec<StmtId> = ctx.schema_children(id).collect();
                for submodule in ctx.linkage.submodules_of(stmt.source) {
                    members.extend(ctx.schema_children(ctx.root_of(submodule)));
                }
                members
            }
            _ => ctx.schema_children(id).collect(),
        };
        collect_duplicates(ctx, &members, &mut found);

        if stmt.is(Keyword::Choice) {
            let case_members: Vec<StmtId> = ctx
                .schema_children(id)
                .filter(|&c| ctx.get(c).is(Keyword::Case))
                .flat_map(|c| ctx.schema_children(c))
                .collect();
            collect_duplicates(ctx, &case_members, &mut found);
        }
    }
    for cause in found {
        ctx.causes.add(cause);
    }
}

// ============================================================================
// FIXPOINT
// ============================================================================

/// Run all actions to a global fixpoint. Causes land in the build's
/// collector; the caller folds them into the phase failure.
pub(crate) fn run_to_fixpoint(ctx: &mut BuildContext<'_>, actions: Vec<Action>) {
    let mut pending = actions;
    report_cycles(ctx, &mut pending);

    let mut queue: Vec<(Action, Option<InferenceError>)> = pending.into_iter().map(|a| (a, None)).collect();
    let mut force_deviations = false;
    let mut round = 0usize;

    while !queue.is_empty() {
        round += 1;
        queue.sort_by_key(|(action, _)| action.kind.priority());

        let mut progress = false;
        let mut next: Vec<(Action, Option<InferenceError>)> = Vec::new();
        for (action, last) in queue {
            let structure_open = next.iter().any(|(a, _)| a.kind.is_structural());
            if action.kind == ActionKind::ApplyDeviation && structure_open && !force_deviations {
                next.push((action, last));
                continue;
            }
            match action.run(ctx) {
                Outcome::Applied => progress = true,
                Outcome::Pending(cause) => {
                    tracing::trace!(?action, %cause, "action pending");
                    next.push((action, Some(cause)));
                }
                Outcome::Failed(cause) => {
                    tracing::trace!(?action, %cause, "action failed");
                    ctx.causes.add(cause);
                    progress = true;
                }
            }
        }
        tracing::debug!(round, pending = next.len(), "fixpoint round finished");

        if !progress {
            let deferred = next
                .iter()
                .any(|(a, last)| a.kind == ActionKind::ApplyDeviation && last.is_none());
            if deferred && !force_deviations {
                force_deviations = true;
                queue = next;
                continue;
            }
            for (_, cause) in next {
                if let Some(cause) = cause {
                    ctx.causes.add_stalled(cause);
                }
            }
            break;
        }
        queue = next;
    }

    check_schema_collisions(ctx);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities() {
        assert!(ActionKind::EvaluateFeatures.priority() < ActionKind::LinkType.priority());
        assert!(ActionKind::LinkIdentity.priority() < ActionKind::ExpandUses.priority());
        assert!(ActionKind::SpliceAugment.is_structural());
        assert!(!ActionKind::ApplyDeviation.is_structural());
    }
}
