//! Schema node identifier resolution over the live arena.

use super::context::{BuildContext, StmtId};
use crate::error::InferenceError;
use crate::stmt::{PrefixedName, SchemaNodeId};

/// Outcome of walking a schema node identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PathTarget {
    Found(StmtId),
    /// The node exists but it, or a node on the way, was removed by
    /// `if-feature` or `deviate not-supported`.
    Unsupported(StmtId),
    Missing,
}

impl BuildContext<'_> {
    /// Resolve an absolute identifier. Prefixes are read in the lexical
    /// context of `at`; the first step is searched in the top level of the
    /// module it names, submodules included.
    pub fn resolve_absolute(&self, at: StmtId, path: &SchemaNodeId) -> Result<PathTarget, InferenceError> {
        let Some(first) = path.steps.first() else {
            return Ok(PathTarget::Missing);
        };
        let stmt = self.get(at);
        let module = self
            .module_for_prefix(stmt.source, first.prefix.as_deref())
            .ok_or_else(|| InferenceError::UnknownPrefix {
                at: stmt.source_ref.clone(),
                prefix: first.prefix.clone().unwrap_or_default(),
            })?;
        let mut candidates: Vec<StmtId> = self.children(self.root_of(module)).to_vec();
        for submodule in self.linkage.submodules_of(module) {
            candidates.extend_from_slice(self.children(self.root_of(submodule)));
        }
        self.walk(at, candidates, &path.steps)
    }

    /// Resolve a descendant identifier whose first step is one of
    /// `candidates`.
    pub fn resolve_descendant(
        &self,
        at: StmtId,
        candidates: &[StmtId],
        path: &SchemaNodeId,
    ) -> Result<PathTarget, InferenceError> {
        self.walk(at, candidates.to_vec(), &path.steps)
    }

    fn walk(&self, at: StmtId, candidates: Vec<StmtId>, steps: &[PrefixedName]) -> Result<PathTarget, InferenceError> {
        let mut pool = candidates;
        let mut current = None;
        let mut unsupported = false;
        for step in steps {
            let qname = self.qname_for(at, step)?;
            let matching: Vec<StmtId> = pool
                .iter()
                .copied()
                .filter(|&c| self.schema_qname(c).as_ref() == Some(&qname))
                .collect();
            let next = matching
                .iter()
                .copied()
                .find(|&c| self.get(c).supported)
                .or_else(|| matching.first().copied());
            let Some(next) = next else {
                return Ok(PathTarget::Missing);
            };
            unsupported |= !self.get(next).supported;
            current = Some(next);
            pool = self.children(next).to_vec();
        }
        Ok(match current {
            None => PathTarget::Missing,
            Some(node) if unsupported => PathTarget::Unsupported(node),
            Some(node) => PathTarget::Found(node),
        })
    }
}
