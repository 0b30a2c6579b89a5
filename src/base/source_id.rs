//! Source identifiers for tracking modules and submodules in a build.

use std::fmt;

/// An identifier for one source (module or submodule) handed to the reactor.
///
/// Assigned after linkage in supply order, so a lower id was supplied first.
/// Indexes the per-source tables of a build.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SourceId(pub u32);

impl SourceId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_orders_by_encounter() {
        let mut ids = vec![SourceId::new(3), SourceId::new(0), SourceId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![SourceId::new(0), SourceId::new(2), SourceId::new(3)]);
    }

    #[test]
    fn test_source_id_display() {
        assert_eq!(SourceId::new(7).to_string(), "source#7");
        assert_eq!(SourceId::new(7).as_usize(), 7);
    }
}
