//! Declared statement trees.
//!
//! A [`DeclaredStatement`] is exactly what a source says: keyword, raw argument
//! string and ordered substatements. Trees are immutable and shared through
//! `Arc` so effective statements can point back at the node that declared them.

use std::sync::Arc;

use smol_str::SmolStr;

use super::keyword::{Keyword, StatementKind};
use crate::base::SourceRef;

/// One statement as written in a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredStatement {
    kind: StatementKind,
    raw_argument: Option<SmolStr>,
    substatements: Vec<Arc<DeclaredStatement>>,
    source_ref: SourceRef,
}

impl DeclaredStatement {
    pub fn new(
        kind: StatementKind,
        raw_argument: Option<SmolStr>,
        substatements: Vec<Arc<DeclaredStatement>>,
        source_ref: SourceRef,
    ) -> Self {
        Self {
            kind,
            raw_argument,
            substatements,
            source_ref,
        }
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    /// The core keyword, `None` for extension statements.
    pub fn keyword(&self) -> Option<Keyword> {
        self.kind.keyword()
    }

    pub fn raw_argument(&self) -> Option<&str> {
        self.raw_argument.as_deref()
    }

    /// Substatements in declaration order.
    pub fn substatements(&self) -> &[Arc<DeclaredStatement>] {
        &self.substatements
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.source_ref
    }

    /// First substatement with the given keyword.
    pub fn find_first(&self, keyword: Keyword) -> Option<&Arc<DeclaredStatement>> {
        self.substatements.iter().find(|s| s.kind.is(keyword))
    }

    /// All substatements with the given keyword, in order.
    pub fn find_all(&self, keyword: Keyword) -> impl Iterator<Item = &Arc<DeclaredStatement>> {
        self.substatements.iter().filter(move |s| s.kind.is(keyword))
    }

    /// Raw argument of the first substatement with the given keyword.
    pub fn first_argument(&self, keyword: Keyword) -> Option<&str> {
        self.find_first(keyword).and_then(|s| s.raw_argument())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(keyword: Keyword, arg: Option<&str>, subs: Vec<DeclaredStatement>) -> DeclaredStatement {
        DeclaredStatement::new(
            keyword.into(),
            arg.map(SmolStr::new),
            subs.into_iter().map(Arc::new).collect(),
            SourceRef::start_of("test.yang"),
        )
    }

    #[test]
    fn test_find_helpers() {
        let module = stmt(
            Keyword::Module,
            Some("m"),
            vec![
                stmt(Keyword::Namespace, Some("urn:m"), vec![]),
                stmt(Keyword::Prefix, Some("m"), vec![]),
                stmt(Keyword::Revision, Some("2020-01-01"), vec![]),
                stmt(Keyword::Revision, Some("2019-01-01"), vec![]),
            ],
        );

        assert_eq!(module.keyword(), Some(Keyword::Module));
        assert_eq!(module.first_argument(Keyword::Prefix), Some("m"));
        assert_eq!(module.find_all(Keyword::Revision).count(), 2);
        assert!(module.find_first(Keyword::Import).is_none());
    }
}
