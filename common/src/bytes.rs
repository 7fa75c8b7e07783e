//! Byte utilities for ordered keys and range queries.

use bytes::{Bytes, BytesMut};
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::ops::{Bound, RangeBounds};

/// Computes the lexicographic successor of a byte sequence.
///
/// Returns the smallest byte sequence that is strictly greater than every
/// sequence starting with `data`, or `None` if no such sequence exists
/// (empty input or all `0xFF` bytes).
///
/// - `[0x61]` ("a") → `Some([0x62])` ("b")
/// - `[0x61, 0xFF]` → `Some([0x62])`
/// - `[0xFF]` → `None`
pub(crate) fn lex_increment(data: &[u8]) -> Option<Bytes> {
    if data.is_empty() {
        return None;
    }

    let mut result = BytesMut::from(data);

    while let Some(last) = result.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(result.freeze());
        }
        result.truncate(result.len() - 1);
    }

    None
}

/// A range over byte sequences, used for key range queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesRange {
    pub start: Bound<Bytes>,
    pub end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// Creates a range that includes all keys with the given prefix.
    pub fn prefix(prefix: Bytes) -> Self {
        if prefix.is_empty() {
            return Self::unbounded();
        }
        let end = Self::prefix_end(&prefix);
        Self {
            start: Included(prefix),
            end,
        }
    }

    /// Keys carrying `prefix` that sort strictly after `key`.
    ///
    /// `key` is expected to start with `prefix`; the result is what a cursor
    /// seeked to `key` and advanced past it would still see.
    pub fn prefix_after(prefix: Bytes, key: Bytes) -> Self {
        debug_assert!(key.starts_with(&prefix));
        Self {
            start: Excluded(key),
            end: Self::prefix_end(&prefix),
        }
    }

    /// Keys carrying `prefix` that sort strictly before `key`.
    pub fn prefix_before(prefix: Bytes, key: Bytes) -> Self {
        debug_assert!(key.starts_with(&prefix));
        let start = if prefix.is_empty() {
            Unbounded
        } else {
            Included(prefix)
        };
        Self {
            start,
            end: Excluded(key),
        }
    }

    fn prefix_end(prefix: &[u8]) -> Bound<Bytes> {
        match lex_increment(prefix) {
            Some(end) => Excluded(end),
            None => Unbounded,
        }
    }

    /// Whether no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Included(s), Included(e)) => s > e,
            (Included(s), Excluded(e)) | (Excluded(s), Included(e)) | (Excluded(s), Excluded(e)) => {
                s >= e
            }
            _ => false,
        }
    }

    pub fn contains(&self, k: &[u8]) -> bool {
        (match &self.start {
            Included(s) => k >= s,
            Excluded(s) => k > s,
            Unbounded => true,
        }) && (match &self.end {
            Included(e) => k <= e,
            Excluded(e) => k < e,
            Unbounded => true,
        })
    }

    /// Creates a range that scans everything.
    pub fn unbounded() -> Self {
        Self {
            start: Unbounded,
            end: Unbounded,
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }
    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}
