//! Build inputs: the declared trees handed to the reactor and their options.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::stmt::{DeclaredStatement, QName, QNameModule};
use crate::syntax::{SyntaxError, parse_source};

/// Whether a source counts toward the reported model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceRole {
    /// Reported in the effective model.
    Main,
    /// Only available as an import/include target.
    Library,
}

/// One declared tree plus its role.
#[derive(Clone, Debug)]
pub struct SourceEntry {
    pub role: SourceRole,
    pub statement: Arc<DeclaredStatement>,
}

/// The set of declared trees for one build, in supply order.
///
/// Supply order is the encounter order used to break ties (augment ordering,
/// failure sorting within one source).
#[derive(Clone, Debug, Default)]
pub struct SourceSet {
    entries: Vec<SourceEntry>,
}

impl SourceSet {
    /// Create a new empty source set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declared tree.
    pub fn add(&mut self, role: SourceRole, statement: impl Into<Arc<DeclaredStatement>>) -> &mut Self {
        self.entries.push(SourceEntry {
            role,
            statement: statement.into(),
        });
        self
    }

    pub fn add_main(&mut self, statement: impl Into<Arc<DeclaredStatement>>) -> &mut Self {
        self.add(SourceRole::Main, statement)
    }

    pub fn add_library(&mut self, statement: impl Into<Arc<DeclaredStatement>>) -> &mut Self {
        self.add(SourceRole::Library, statement)
    }

    /// Read YANG text and add it.
    pub fn add_text(&mut self, role: SourceRole, name: &str, text: &str) -> Result<&mut Self, SyntaxError> {
        let statement = parse_source(name, text)?;
        Ok(self.add(role, statement))
    }

    /// Iterate over all entries in supply order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceEntry> + '_ {
        self.entries.iter()
    }

    /// Get the number of sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the source set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Optional build parameters. The default accepts everything.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Features considered supported. `None` means every declared feature.
    pub supported_features: Option<FxHashSet<QName>>,
    /// Target module → modules permitted to deviate it. `None` applies all
    /// deviations.
    pub supported_deviations: Option<FxHashMap<QNameModule, FxHashSet<QNameModule>>>,
    /// Shard per-source work across the rayon pool.
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            supported_features: None,
            supported_deviations: None,
            parallel: true,
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict supported features to the given set.
    pub fn with_supported_features(mut self, features: impl IntoIterator<Item = QName>) -> Self {
        self.supported_features = Some(features.into_iter().collect());
        self
    }

    /// Permit `deviating` modules to deviate `target`. Once called, only
    /// listed pairs apply.
    pub fn with_supported_deviations(
        mut self,
        target: QNameModule,
        deviating: impl IntoIterator<Item = QNameModule>,
    ) -> Self {
        self.supported_deviations
            .get_or_insert_with(FxHashMap::default)
            .entry(target)
            .or_default()
            .extend(deviating);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub(crate) fn is_feature_listed(&self, feature: &QName) -> bool {
        self.supported_features
            .as_ref()
            .is_none_or(|set| set.contains(feature))
    }

    pub(crate) fn is_deviation_permitted(&self, target: &QNameModule, deviating: &QNameModule) -> bool {
        match &self.supported_deviations {
            None => true,
            Some(map) => map.get(target).is_some_and(|set| set.contains(deviating)),
        }
    }
}
