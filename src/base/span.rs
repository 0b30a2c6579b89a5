//! Source positions and statement source references.

use std::fmt;
use std::sync::Arc;

pub use text_size::TextSize;

/// Zero-based line and byte column inside a source. Displays one-based.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct LineCol {
    pub line: u32,
    /// Byte column, not characters.
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Line start offsets of one source text, for turning token offsets into
/// [`LineCol`] positions while reading.
#[derive(Clone, Debug)]
pub struct LineIndex {
    starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(TextSize::from(0))
            .chain(
                text.match_indices('\n')
                    .map(|(offset, _)| TextSize::from(offset as u32 + 1)),
            )
            .collect();
        Self { starts }
    }

    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let line = self.starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let col = offset - self.starts[line];
        LineCol::new(line as u32, col.into())
    }

    /// Number of lines, counting a trailing partial line.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// Where a statement was written: the source name plus a position inside it.
///
/// Statements created by the reactor itself (implicit `input`, implicit `case`)
/// inherit the reference of the statement that caused them.
///
/// Ordering is by source name, then position, which is what makes aggregated
/// failures deterministic.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SourceRef {
    source: Arc<str>,
    position: LineCol,
}

impl SourceRef {
    pub fn new(source: impl Into<Arc<str>>, position: LineCol) -> Self {
        Self {
            source: source.into(),
            position,
        }
    }

    /// A reference to the start of a named source.
    pub fn start_of(source: impl Into<Arc<str>>) -> Self {
        Self::new(source, LineCol::default())
    }

    /// The source name (usually a file name).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn position(&self) -> LineCol {
        self.position
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.position)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_displays_one_based() {
        assert_eq!(LineCol::new(0, 0).to_string(), "1:1");
        assert_eq!(LineCol::new(5, 10).to_string(), "6:11");
    }

    #[test]
    fn test_line_index_positions() {
        let index = LineIndex::new("module a {\n  prefix a;\n}");

        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(0, 0));
        assert_eq!(index.line_col(TextSize::from(13)), LineCol::new(1, 2));
        assert_eq!(index.line_col(TextSize::from(23)), LineCol::new(2, 0));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_source_ref_orders_by_source_then_position() {
        let a = SourceRef::new("a.yang", LineCol::new(9, 0));
        let b = SourceRef::new("b.yang", LineCol::new(0, 0));
        let a_early = SourceRef::new("a.yang", LineCol::new(1, 4));

        let mut refs = vec![b.clone(), a.clone(), a_early.clone()];
        refs.sort();
        assert_eq!(refs, vec![a_early, a, b]);
    }

    #[test]
    fn test_source_ref_display() {
        let r = SourceRef::new("foo.yang", LineCol::new(2, 4));
        assert_eq!(r.to_string(), "foo.yang:3:5");
        assert_eq!(SourceRef::start_of("x").to_string(), "x:1:1");
    }
}
