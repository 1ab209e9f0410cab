use std::fmt;

use crate::error::{MapError, MapResult};

/// Marker written in place of an elided region when `add_ellipsis` is set.
pub const ELLIPSIS: &str = "...";

/// A half-open byte interval `[start, end)` to remove from one source buffer.
///
/// `prefix` is emitted before the optional ellipsis; it lets a language put
/// a replacement in place of the removed bytes (e.g. `{}` for an arrow body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutRange {
    pub start: usize,
    pub end: usize,
    pub add_ellipsis: bool,
    pub prefix: String,
}

impl CutRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            add_ellipsis: false,
            prefix: String::new(),
        }
    }

    pub fn with_ellipsis(start: usize, end: usize) -> Self {
        Self {
            add_ellipsis: true,
            ..Self::new(start, end)
        }
    }

    pub fn prefixed(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn contains(&self, other: &CutRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    fn partially_overlaps(&self, other: &CutRange) -> bool {
        let intersects = self.start < other.end && other.start < self.end;
        intersects && !self.contains(other) && !other.contains(self)
    }
}

impl fmt::Display for CutRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Drop every range nested inside another and reject partial overlaps.
///
/// The survivors are disjoint and returned in ascending `start` order.
/// Identical ranges collapse to a single survivor.
///
/// Sorting by `(start asc, end desc)` means every range is visited after all
/// ranges that could contain it, so a stack of still-open ranges is enough to
/// detect both nesting and partial overlap in `O(n log n)`.
pub fn collapse(ranges: &[CutRange]) -> MapResult<Vec<CutRange>> {
    let mut order: Vec<&CutRange> = ranges.iter().collect();
    order.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut open: Vec<&CutRange> = Vec::new();
    let mut kept: Vec<CutRange> = Vec::new();

    for r in order {
        while open.last().is_some_and(|top| top.end <= r.start && top.start < r.start) {
            open.pop();
        }

        match open.last() {
            Some(top) if top.contains(r) => {}
            Some(top) if top.partially_overlaps(r) => {
                return Err(MapError::Overlap {
                    first: (*top).clone(),
                    second: r.clone(),
                });
            }
            _ => kept.push(r.clone()),
        }
        open.push(r);
    }

    Ok(kept)
}

/// Rewrite `source` with already-collapsed ranges applied in ascending order.
///
/// Zero ranges returns the source unchanged.
pub fn apply_cuts(source: &[u8], ranges: &[CutRange]) -> Vec<u8> {
    if ranges.is_empty() {
        return source.to_vec();
    }

    let mut out = Vec::with_capacity(source.len());
    let mut last = 0usize;
    for r in ranges {
        let start = r.start.min(source.len());
        let end = r.end.min(source.len());
        if start < last {
            continue;
        }
        out.extend_from_slice(&source[last..start]);
        out.extend_from_slice(r.prefix.as_bytes());
        if r.add_ellipsis {
            out.extend_from_slice(ELLIPSIS.as_bytes());
        }
        last = end;
    }
    out.extend_from_slice(&source[last..]);
    out
}

/// `collapse` followed by `apply_cuts`.
pub fn cut(source: &[u8], ranges: &[CutRange]) -> MapResult<Vec<u8>> {
    let kept = collapse(ranges)?;
    Ok(apply_cuts(source, &kept))
}
