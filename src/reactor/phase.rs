//! Model processing phases.

use std::fmt;

/// The five phases of a build, in execution order.
///
/// Every phase runs over the whole source set before the next one starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelPhase {
    /// Extract source identity and raw import/include lists.
    SourcePreLinkage,
    /// Bind imports and includes into the source dependency graph.
    SourceLinkage,
    /// Resolve statement shapes: arguments, extensions, version grammar.
    StatementDefinition,
    /// Run every inference action to a global fixpoint.
    FullDeclaration,
    /// Freeze the resolved graph into the effective model.
    EffectiveModel,
}

impl ModelPhase {
    pub const ALL: [ModelPhase; 5] = [
        ModelPhase::SourcePreLinkage,
        ModelPhase::SourceLinkage,
        ModelPhase::StatementDefinition,
        ModelPhase::FullDeclaration,
        ModelPhase::EffectiveModel,
    ];

    /// The phase that runs after this one.
    pub fn next(self) -> Option<ModelPhase> {
        let index = Self::ALL.iter().position(|p| *p == self)?;
        Self::ALL.get(index + 1).copied()
    }
}

impl fmt::Display for ModelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
