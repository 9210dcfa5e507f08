//! Circular buffer access split into contiguous segments
//!
//! Reading or writing `count` samples starting at `start` in a loop of
//! `loop_len` samples touches at most two contiguous ranges: one up to the
//! loop end and, if the access crosses it, one from the loop start. Callers
//! copy each range with slice operations instead of taking a modulo per
//! sample.

use std::ops::Range;

/// Up to two contiguous ranges covering a wrapped access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapSegments {
    /// From `start` toward the loop end
    pub head: Range<usize>,
    /// Wrapped remainder from the loop start (empty if no wrap)
    pub tail: Range<usize>,
}

impl WrapSegments {
    /// Total samples covered
    #[inline]
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position following the last covered sample
    #[inline]
    pub fn end_position(&self, loop_len: usize) -> usize {
        if self.tail.is_empty() {
            self.head.end % loop_len.max(1)
        } else {
            self.tail.end
        }
    }
}

/// Split an access of `count` samples at `start` within a loop of `loop_len`
///
/// `start` is reduced modulo `loop_len` and `count` is clamped to one loop,
/// so the result always fits inside `0..loop_len`. A zero-length loop yields
/// empty segments.
pub fn segments(start: usize, count: usize, loop_len: usize) -> WrapSegments {
    if loop_len == 0 {
        return WrapSegments { head: 0..0, tail: 0..0 };
    }

    let start = start % loop_len;
    let count = count.min(loop_len);
    let to_end = loop_len - start;

    if count <= to_end {
        WrapSegments {
            head: start..start + count,
            tail: 0..0,
        }
    } else {
        WrapSegments {
            head: start..loop_len,
            tail: 0..count - to_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_wrap() {
        let seg = segments(10, 20, 100);
        assert_eq!(seg.head, 10..30);
        assert!(seg.tail.is_empty());
        assert_eq!(seg.end_position(100), 30);
    }

    #[test]
    fn test_wrap_splits_at_loop_end() {
        let seg = segments(90, 20, 100);
        assert_eq!(seg.head, 90..100);
        assert_eq!(seg.tail, 0..10);
        assert_eq!(seg.len(), 20);
        assert_eq!(seg.end_position(100), 10);
    }

    #[test]
    fn test_exact_loop_end() {
        let seg = segments(80, 20, 100);
        assert_eq!(seg.head, 80..100);
        assert!(seg.tail.is_empty());
        assert_eq!(seg.end_position(100), 0);
    }

    #[test]
    fn test_start_and_count_are_normalised() {
        let seg = segments(250, 500, 100);
        assert_eq!(seg.head, 50..100);
        assert_eq!(seg.tail, 0..50);
        assert_eq!(seg.len(), 100);
    }

    #[test]
    fn test_zero_length_loop() {
        assert!(segments(5, 10, 0).is_empty());
    }
}
