//! The statement reactor.
//!
//! A build moves the whole source set through five phases in lockstep:
//!
//! ```text
//! SourcePreLinkage     → identity, imports, includes of every source
//!   ↓
//! SourceLinkage        → dependency graph, revision selection
//!   ↓
//! StatementDefinition  → arena, arguments, namespaces, actions
//!   ↓
//! FullDeclaration      → features, types, identities, uses, augments,
//!   ↓                    deviations to a global fixpoint
//! EffectiveModel       → frozen, shared effective statements
//! ```
//!
//! A phase that fails stops the build with one [`BuildFailure`] carrying every
//! cause that phase found.

mod action;
mod augment;
mod context;
mod cycles;
mod definition;
mod deviation;
mod effective_builder;
mod feature;
mod identity;
mod input;
mod linkage;
mod namespace;
mod path;
mod phase;
mod types;
mod uses;

pub use input::{BuildOptions, SourceEntry, SourceRole, SourceSet};
pub use phase::ModelPhase;

use rayon::prelude::*;

use crate::base::SourceRef;
use crate::effective::EffectiveModel;
use crate::error::{BuildFailure, Cause, CauseCollector, SourceError};
use context::BuildContext;
use linkage::SourceInfo;

/// Fold the causes one phase reported into its failure.
fn phase_failure<E: Into<Cause>>(phase: ModelPhase, errors: Vec<E>) -> BuildFailure {
    let mut causes = CauseCollector::new();
    for error in errors {
        causes.add(error);
    }
    causes.into_failure(phase).unwrap_or_else(|| {
        BuildFailure::new(
            phase,
            SourceError::Invalid {
                at: SourceRef::start_of("<build>"),
                message: format!("{} failed without a cause", phase),
            },
        )
    })
}

/// Builds effective models from declared source sets.
///
/// A reactor holds only options; every [`build`](Reactor::build) is
/// independent, and any number may run concurrently.
#[derive(Clone, Debug, Default)]
pub struct Reactor {
    options: BuildOptions,
}

impl Reactor {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Run every phase over `sources`.
    pub fn build(&self, sources: &SourceSet) -> Result<EffectiveModel, BuildFailure> {
        let infos = {
            let _span = tracing::debug_span!("phase", phase = %ModelPhase::SourcePreLinkage).entered();
            let entries: Vec<&SourceEntry> = sources.iter().collect();
            let extracted: Vec<Result<SourceInfo, SourceError>> = if self.options.parallel {
                entries.par_iter().map(|entry| linkage::extract_source(entry)).collect()
            } else {
                entries.iter().map(|entry| linkage::extract_source(entry)).collect()
            };
            extracted
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|error| BuildFailure::new(ModelPhase::SourcePreLinkage, error))?
        };

        let linkage = {
            let _span = tracing::debug_span!("phase", phase = %ModelPhase::SourceLinkage).entered();
            linkage::link(infos).map_err(|errors| phase_failure(ModelPhase::SourceLinkage, errors))?
        };

        let mut ctx = BuildContext::new(&self.options, linkage);
        let actions = {
            let _span = tracing::debug_span!("phase", phase = %ModelPhase::StatementDefinition).entered();
            definition::define(&mut ctx)
                .map_err(|error| BuildFailure::new(ModelPhase::StatementDefinition, error))?
        };

        {
            let _span = tracing::debug_span!("phase", phase = %ModelPhase::FullDeclaration).entered();
            action::run_to_fixpoint(&mut ctx, actions);
            if let Some(failure) = std::mem::take(&mut ctx.causes).into_failure(ModelPhase::FullDeclaration) {
                tracing::debug!(causes = failure.cause_count(), "full declaration failed");
                return Err(failure);
            }
        }

        let _span = tracing::debug_span!("phase", phase = %ModelPhase::EffectiveModel).entered();
        effective_builder::build(&ctx).map_err(|errors| phase_failure(ModelPhase::EffectiveModel, errors))
    }
}
