//! Build failures.
//!
//! Three families of causes, matching where in the build they arise:
//!
//! - [`SourceError`] - a declared tree is structurally invalid
//! - [`LinkageError`] - imports, includes and revisions do not line up
//! - [`InferenceError`] - a Full-Declaration action could not be resolved
//!
//! A failed build returns exactly one [`BuildFailure`], tagged with the phase
//! that failed, carrying a primary [`Cause`] and any number of suppressed ones.

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::SourceRef;
use crate::reactor::ModelPhase;
use crate::stmt::{ArgumentError, Revision};

// ============================================================================
// SOURCE ERRORS
// ============================================================================

/// A declared statement tree is structurally invalid. Never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{at}: source root must be 'module' or 'submodule', found '{found}'")]
    NotASource { at: SourceRef, found: SmolStr },

    #[error("{at}: '{statement}' has {error}")]
    BadArgument {
        at: SourceRef,
        statement: SmolStr,
        error: ArgumentError,
    },

    #[error("{at}: '{child}' is not allowed under '{parent}'")]
    UnexpectedStatement {
        at: SourceRef,
        parent: SmolStr,
        child: SmolStr,
    },

    #[error("{at}: '{parent}' requires a '{child}' substatement")]
    MissingStatement {
        at: SourceRef,
        parent: SmolStr,
        child: SmolStr,
    },

    #[error("{at}: '{parent}' allows at most one '{child}'")]
    TooManyStatements {
        at: SourceRef,
        parent: SmolStr,
        child: SmolStr,
    },

    #[error("{at}: '{statement}' requires YANG version 1.1")]
    RequiresYang11 { at: SourceRef, statement: SmolStr },

    #[error("{at}: extension '{name}' is not defined")]
    UnknownExtension { at: SourceRef, name: SmolStr },

    #[error("{at}: prefix '{prefix}' is not bound in this source")]
    UnknownPrefix { at: SourceRef, prefix: SmolStr },

    #[error("{at}: extension '{name}' {detail}")]
    ExtensionArgument {
        at: SourceRef,
        name: SmolStr,
        detail: &'static str,
    },

    #[error("{at}: deviate not-supported cannot be combined with other deviate statements")]
    NotSupportedCombined { at: SourceRef },

    #[error("{at}: deviate {kind} cannot carry '{child}'")]
    InvalidDeviateProperty {
        at: SourceRef,
        kind: SmolStr,
        child: SmolStr,
    },

    #[error("{at}: {message}")]
    Invalid { at: SourceRef, message: String },
}

impl SourceError {
    pub fn source_ref(&self) -> &SourceRef {
        match self {
            SourceError::NotASource { at, .. }
            | SourceError::BadArgument { at, .. }
            | SourceError::UnexpectedStatement { at, .. }
            | SourceError::MissingStatement { at, .. }
            | SourceError::TooManyStatements { at, .. }
            | SourceError::RequiresYang11 { at, .. }
            | SourceError::UnknownExtension { at, .. }
            | SourceError::UnknownPrefix { at, .. }
            | SourceError::ExtensionArgument { at, .. }
            | SourceError::NotSupportedCombined { at }
            | SourceError::InvalidDeviateProperty { at, .. }
            | SourceError::Invalid { at, .. } => at,
        }
    }
}

// ============================================================================
// LINKAGE ERRORS
// ============================================================================

fn revision_suffix(revision: &Option<Revision>) -> String {
    match revision {
        Some(rev) => format!("@{}", rev),
        None => String::new(),
    }
}

/// Sources do not link into a consistent dependency graph.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LinkageError {
    #[error("{at}: imported module {module}{} was not found", revision_suffix(.revision))]
    MissingImport {
        at: SourceRef,
        module: SmolStr,
        revision: Option<Revision>,
    },

    #[error("{at}: included submodule {submodule}{} was not found", revision_suffix(.revision))]
    MissingInclude {
        at: SourceRef,
        submodule: SmolStr,
        revision: Option<Revision>,
    },

    #[error("{at}: module {module} from belongs-to was not found")]
    MissingBelongsTo { at: SourceRef, module: SmolStr },

    #[error("{at}: submodule {submodule} belongs to {belongs_to}, not {includer}")]
    BelongsToMismatch {
        at: SourceRef,
        submodule: SmolStr,
        belongs_to: SmolStr,
        includer: SmolStr,
    },

    #[error("{at}: dependency cycle through {from} -> {to}")]
    Cycle {
        at: SourceRef,
        from: SmolStr,
        to: SmolStr,
    },

    #[error("{at}: {module} is required at revision {first} and at revision {second}")]
    RevisionConflict {
        at: SourceRef,
        module: SmolStr,
        first: Revision,
        second: Revision,
    },

    #[error("{at}: source {name}{} is supplied more than once", revision_suffix(.revision))]
    DuplicateSource {
        at: SourceRef,
        name: SmolStr,
        revision: Option<Revision>,
    },

    #[error("{at}: namespace {namespace} is claimed by both {first} and {second}")]
    DuplicateNamespace {
        at: SourceRef,
        namespace: SmolStr,
        first: SmolStr,
        second: SmolStr,
    },

    #[error("{at}: prefix '{prefix}' is bound more than once")]
    DuplicatePrefix { at: SourceRef, prefix: SmolStr },
}

impl LinkageError {
    pub fn source_ref(&self) -> &SourceRef {
        match self {
            LinkageError::MissingImport { at, .. }
            | LinkageError::MissingInclude { at, .. }
            | LinkageError::MissingBelongsTo { at, .. }
            | LinkageError::BelongsToMismatch { at, .. }
            | LinkageError::Cycle { at, .. }
            | LinkageError::RevisionConflict { at, .. }
            | LinkageError::DuplicateSource { at, .. }
            | LinkageError::DuplicateNamespace { at, .. }
            | LinkageError::DuplicatePrefix { at, .. } => at,
        }
    }
}

// ============================================================================
// INFERENCE ERRORS
// ============================================================================

/// A Full-Declaration (or Effective-Model) action could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("{at}: prefix '{prefix}' is not bound in this source")]
    UnknownPrefix { at: SourceRef, prefix: SmolStr },

    #[error("{at}: {namespace} '{name}' was not found")]
    NotFound {
        at: SourceRef,
        namespace: &'static str,
        name: SmolStr,
    },

    #[error("{at}: duplicate {namespace} '{name}'")]
    Duplicate {
        at: SourceRef,
        namespace: &'static str,
        name: SmolStr,
    },

    #[error("{at}: {namespace} '{from}' is part of a cycle through '{to}'")]
    Cycle {
        at: SourceRef,
        namespace: &'static str,
        from: SmolStr,
        to: SmolStr,
    },

    #[error("{at}: uses of grouping '{grouping}' cannot proceed until {blocker}")]
    UsesBlocked {
        at: SourceRef,
        grouping: SmolStr,
        blocker: String,
    },

    #[error("{at}: augment target '{target}' not found")]
    AugmentTargetNotFound { at: SourceRef, target: SmolStr },

    #[error("{at}: augment of '{target}' cannot proceed until {blocker}")]
    AugmentBlocked {
        at: SourceRef,
        target: SmolStr,
        blocker: String,
    },

    #[error("{at}: augment target '{target}' is a {kind}, which cannot be augmented")]
    InvalidAugmentTarget {
        at: SourceRef,
        target: SmolStr,
        kind: SmolStr,
    },

    #[error("{at}: an augment cannot add node named '{node}' because this name is already used in target")]
    AugmentCollision { at: SourceRef, node: SmolStr },

    #[error(
        "{at}: an augment cannot add node '{node}' because it is mandatory and in module different than target"
    )]
    MandatoryAugment { at: SourceRef, node: SmolStr },

    #[error("{at}: refine target '{target}' not found")]
    RefineTargetNotFound { at: SourceRef, target: SmolStr },

    #[error("{at}: refine cannot apply '{property}' to {kind} '{target}'")]
    InvalidRefine {
        at: SourceRef,
        property: SmolStr,
        kind: SmolStr,
        target: SmolStr,
    },

    #[error("{at}: deviation target '{target}' not found")]
    DeviationTargetNotFound { at: SourceRef, target: SmolStr },

    #[error("{at}: deviation target '{target}' is defined in the deviating module itself")]
    SelfDeviation { at: SourceRef, target: SmolStr },

    #[error("{at}: deviate add cannot add '{property}' to '{target}' because it already exists")]
    DeviateAddExisting {
        at: SourceRef,
        property: SmolStr,
        target: SmolStr,
    },

    #[error("{at}: deviate replace cannot replace '{property}' of '{target}' because it does not exist")]
    DeviateReplaceMissing {
        at: SourceRef,
        property: SmolStr,
        target: SmolStr,
    },

    #[error("{at}: deviate delete cannot remove '{property} {value}' from '{target}' because it does not exist")]
    DeviateDeleteMissing {
        at: SourceRef,
        property: SmolStr,
        value: SmolStr,
        target: SmolStr,
    },

    #[error("{at}: deviate {kind} cannot apply '{property}' to {target_kind} '{target}'")]
    InvalidDeviate {
        at: SourceRef,
        kind: SmolStr,
        property: SmolStr,
        target_kind: SmolStr,
        target: SmolStr,
    },

    #[error("{at}: type '{type_name}': {message}")]
    InvalidType {
        at: SourceRef,
        type_name: SmolStr,
        message: String,
    },

    #[error("{at}: list '{list}' key '{key}' is not a leaf of the list")]
    InvalidKey {
        at: SourceRef,
        list: SmolStr,
        key: SmolStr,
    },
}

impl InferenceError {
    pub fn source_ref(&self) -> &SourceRef {
        match self {
            InferenceError::UnknownPrefix { at, .. }
            | InferenceError::NotFound { at, .. }
            | InferenceError::Duplicate { at, .. }
            | InferenceError::Cycle { at, .. }
            | InferenceError::UsesBlocked { at, .. }
            | InferenceError::AugmentTargetNotFound { at, .. }
            | InferenceError::AugmentBlocked { at, .. }
            | InferenceError::InvalidAugmentTarget { at, .. }
            | InferenceError::AugmentCollision { at, .. }
            | InferenceError::MandatoryAugment { at, .. }
            | InferenceError::RefineTargetNotFound { at, .. }
            | InferenceError::InvalidRefine { at, .. }
            | InferenceError::DeviationTargetNotFound { at, .. }
            | InferenceError::SelfDeviation { at, .. }
            | InferenceError::DeviateAddExisting { at, .. }
            | InferenceError::DeviateReplaceMissing { at, .. }
            | InferenceError::DeviateDeleteMissing { at, .. }
            | InferenceError::InvalidDeviate { at, .. }
            | InferenceError::InvalidType { at, .. }
            | InferenceError::InvalidKey { at, .. } => at,
        }
    }

    /// Creates a not-found error for a named namespace entry.
    pub fn not_found(at: &SourceRef, namespace: &'static str, name: impl Into<SmolStr>) -> Self {
        Self::NotFound {
            at: at.clone(),
            namespace,
            name: name.into(),
        }
    }

    /// Creates a duplicate-key error for a named namespace entry.
    pub fn duplicate(at: &SourceRef, namespace: &'static str, name: impl Into<SmolStr>) -> Self {
        Self::Duplicate {
            at: at.clone(),
            namespace,
            name: name.into(),
        }
    }

    /// Creates an invalid-type error.
    pub fn invalid_type(
        at: &SourceRef,
        type_name: impl Into<SmolStr>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            at: at.clone(),
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// CAUSE & BUILD FAILURE
// ============================================================================

/// One reason a build failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Cause {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Linkage(#[from] LinkageError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl Cause {
    pub fn source_ref(&self) -> &SourceRef {
        match self {
            Cause::Source(e) => e.source_ref(),
            Cause::Linkage(e) => e.source_ref(),
            Cause::Inference(e) => e.source_ref(),
        }
    }

    /// Deterministic ordering key: where, then what.
    fn sort_key(&self) -> (SourceRef, String) {
        (self.source_ref().clone(), self.to_string())
    }
}

/// The single error a failed build returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildFailure {
    pub phase: ModelPhase,
    pub cause: Cause,
    pub suppressed: Vec<Cause>,
}

impl BuildFailure {
    pub fn new(phase: ModelPhase, cause: impl Into<Cause>) -> Self {
        Self {
            phase,
            cause: cause.into(),
            suppressed: Vec::new(),
        }
    }

    /// Primary cause followed by every suppressed cause.
    pub fn causes(&self) -> impl Iterator<Item = &Cause> {
        std::iter::once(&self.cause).chain(self.suppressed.iter())
    }

    pub fn cause_count(&self) -> usize {
        1 + self.suppressed.len()
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} phase failed: {}", self.phase, self.cause)?;
        if !self.suppressed.is_empty() {
            write!(f, " (and {} more)", self.suppressed.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Collects causes during a phase and folds them into one [`BuildFailure`].
///
/// Definite failures outrank causes of actions that merely stalled; within each
/// group causes are sorted by source position, then message.
#[derive(Debug, Default)]
pub(crate) struct CauseCollector {
    definite: Vec<Cause>,
    stalled: Vec<Cause>,
}

impl CauseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cause that is final.
    pub fn add(&mut self, cause: impl Into<Cause>) {
        self.definite.push(cause.into());
    }

    /// Record the last known cause of an action that never completed.
    pub fn add_stalled(&mut self, cause: impl Into<Cause>) {
        self.stalled.push(cause.into());
    }

    pub fn is_empty(&self) -> bool {
        self.definite.is_empty() && self.stalled.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definite.len() + self.stalled.len()
    }

    /// Fold into a failure, or `None` if nothing was collected.
    pub fn into_failure(self, phase: ModelPhase) -> Option<BuildFailure> {
        let mut definite = self.definite;
        let mut stalled = self.stalled;
        definite.sort_by_cached_key(Cause::sort_key);
        definite.dedup();
        stalled.sort_by_cached_key(Cause::sort_key);
        stalled.dedup();

        let mut all = definite.into_iter().chain(stalled);
        let cause = all.next()?;
        let mut suppressed: Vec<Cause> = all.collect();
        suppressed.sort_by_cached_key(Cause::sort_key);
        Some(BuildFailure {
            phase,
            cause,
            suppressed,
        })
    }
}
