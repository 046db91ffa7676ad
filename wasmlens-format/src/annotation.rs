//! Labeled byte ranges recorded while a buffer is decoded.
//!
//! The decoder brackets every field it reads with [`AnnotationIndex::open`]
//! and [`AnnotationIndex::close`]. Ranges follow stack discipline: they nest
//! or are disjoint, never partially overlap. Viewers later ask which ranges
//! cover a byte with [`AnnotationIndex::query`].

use core::fmt;

/// One labeled byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// First byte of the range
    pub start: usize,
    /// Number of bytes covered
    pub len: usize,
    /// What the range is, e.g. `Section` or `count`
    pub label: Option<String>,
    /// Decoded value rendered as text
    pub value: Option<String>,
    /// Nesting depth at the time the range was opened (0 = top level)
    pub depth: usize,
    /// Set when decoding failed before the range could be closed normally
    pub incomplete: bool,
    closed: bool,
}

impl Annotation {
    /// Last byte of the range, inclusive. `None` for an empty range.
    pub fn end(&self) -> Option<usize> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }

    /// Whether `offset` falls inside `[start, end]`
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset - self.start < self.len
    }

    /// Whether the range has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = format!("{}:", self.label.as_deref().unwrap_or("?"));
        write!(f, "{label:<12} {}", self.value.as_deref().unwrap_or(""))?;
        if self.incomplete {
            write!(f, " (incomplete)")?;
        }
        Ok(())
    }
}

/// Ticket for an open range, consumed by [`AnnotationIndex::close`]
#[must_use = "an opened range must be closed"]
#[derive(Debug, PartialEq, Eq)]
pub struct RangeHandle(usize);

/// Stack-discipline range recorder
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    ranges: Vec<Annotation>,
    open: Vec<usize>,
}

impl AnnotationIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a range at `pos`
    pub fn open(&mut self, pos: usize, label: Option<&str>) -> RangeHandle {
        let index = self.ranges.len();
        self.ranges.push(Annotation {
            start: pos,
            len: 0,
            label: label.map(str::to_owned),
            value: None,
            depth: self.open.len(),
            incomplete: false,
            closed: false,
        });
        self.open.push(index);
        RangeHandle(index)
    }

    /// Close the most recently opened range. `pos` is the position just past
    /// the last byte the range covers. `value` and `label` only fill fields
    /// that are still empty.
    pub fn close(&mut self, handle: RangeHandle, pos: usize, value: Option<String>, label: Option<&str>) {
        debug_assert_eq!(
            self.open.last(),
            Some(&handle.0),
            "annotation ranges must be closed in reverse order of opening"
        );
        if let Some(at) = self.open.iter().rposition(|&i| i == handle.0) {
            self.open.remove(at);
        }
        let Some(range) = self.ranges.get_mut(handle.0) else {
            return;
        };
        range.len = pos.saturating_sub(range.start);
        range.closed = true;
        if range.value.is_none() {
            range.value = value;
        }
        if range.label.is_none() {
            range.label = label.map(str::to_owned);
        }
    }

    /// Record a range that is already fully known
    pub fn mark(&mut self, start: usize, end: usize, label: &str, value: Option<String>) {
        let handle = self.open(start, Some(label));
        self.close(handle, end, value, None);
    }

    /// Close every open range at `end` and flag it incomplete.
    ///
    /// Called after a failed decode so the faulty region stays inspectable.
    pub fn abandon_open(&mut self, end: usize) {
        while let Some(index) = self.open.pop() {
            if let Some(range) = self.ranges.get_mut(index) {
                range.len = end.saturating_sub(range.start);
                range.closed = true;
                range.incomplete = true;
            }
        }
    }

    /// Every closed range containing `offset`, outermost first
    pub fn query(&self, offset: usize) -> Vec<&Annotation> {
        self.ranges.iter().filter(|r| r.closed && r.contains(offset)).collect()
    }

    /// The shortest closed range containing `offset`
    pub fn innermost(&self, offset: usize) -> Option<&Annotation> {
        self.query(offset).into_iter().min_by_key(|r| r.len)
    }

    /// Closed ranges opened at depth 0
    pub fn top_level(&self) -> impl Iterator<Item = &Annotation> {
        self.ranges.iter().filter(|r| r.closed && r.depth == 0)
    }

    /// Every range in open order, open ones included
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.ranges.iter()
    }

    /// Number of ranges recorded
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// True when no range is left open
    pub fn is_balanced(&self) -> bool {
        self.open.is_empty()
    }

    /// Drop every range
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.open.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_ranges_query_in_open_order() {
        let mut index = AnnotationIndex::new();
        let outer = index.open(8, Some("Section"));
        let inner = index.open(9, Some("length"));
        index.close(inner, 10, Some("5".into()), None);
        index.close(outer, 15, Some("Type".into()), None);

        let hits = index.query(9);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].label.as_deref(), Some("Section"));
        assert_eq!(hits[1].label.as_deref(), Some("length"));
        assert_eq!(index.innermost(9).unwrap().label.as_deref(), Some("length"));
        assert_eq!(index.query(14).len(), 1);
        assert!(index.query(15).is_empty());
        assert!(index.is_balanced());
    }

    #[test]
    fn test_close_does_not_overwrite_label() {
        let mut index = AnnotationIndex::new();
        let handle = index.open(0, Some("magic"));
        index.close(handle, 4, Some("\\0asm".into()), Some("other"));
        let range = &index.query(0)[0];
        assert_eq!(range.label.as_deref(), Some("magic"));
        assert_eq!(range.end(), Some(3));
    }

    #[test]
    fn test_empty_range_covers_nothing() {
        let mut index = AnnotationIndex::new();
        let handle = index.open(4, Some("payload"));
        index.close(handle, 4, None, None);
        assert_eq!(index.iter().next().unwrap().end(), None);
        assert!(index.query(4).is_empty());
    }

    #[test]
    fn test_abandon_open_flags_incomplete() {
        let mut index = AnnotationIndex::new();
        let _section = index.open(8, Some("Section"));
        let _count = index.open(10, Some("count"));
        index.abandon_open(12);
        assert!(index.is_balanced());
        assert!(index.iter().all(|r| r.incomplete));
        assert_eq!(index.query(11).len(), 2);
    }

    #[test]
    fn test_display_pads_label() {
        let mut index = AnnotationIndex::new();
        index.mark(0, 4, "magic", Some("\\0asm".into()));
        assert_eq!(index.iter().next().unwrap().to_string(), "magic:       \\0asm");
    }
}
