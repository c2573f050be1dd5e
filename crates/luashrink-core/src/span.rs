/// A half-open `[start, end)` byte range into the original source, plus the
/// 1-based line the range starts on. Lines matter only for comment
/// re-attachment; every other consumer works on byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Span { start, end, line }
    }

    /// The recovery span used when a node is missing position information.
    pub fn empty() -> Self {
        Span {
            start: 0,
            end: 0,
            line: 0,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn combine(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: if self.line == 0 {
                other.line
            } else if other.line == 0 {
                self.line
            } else {
                self.line.min(other.line)
            },
        }
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
