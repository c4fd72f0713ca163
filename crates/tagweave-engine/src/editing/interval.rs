use serde::{Deserialize, Serialize};

use crate::editing::AnnotationId;
use crate::error::{AnnotationError, Result};

/// Half-open `[start, end)` range of UTF-16 offsets within one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    /// Build an interval, rejecting zero-width and reversed ranges.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(AnnotationError::DegenerateInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when this interval spans all of `[start, end)`.
    pub fn covers(&self, start: usize, end: usize) -> bool {
        self.start <= start && self.end >= end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The parts of `self` that lie outside `other` (zero, one or two pieces).
    pub fn subtract(&self, other: &Interval) -> Vec<Interval> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if self.start < other.start {
            pieces.push(Interval {
                start: self.start,
                end: other.start,
            });
        }
        if other.end < self.end {
            pieces.push(Interval {
                start: other.end,
                end: self.end,
            });
        }
        pieces
    }
}

/// An annotation attached to a range of one block.
///
/// A block's attachments may overlap between a naive application and the
/// following merge; once a block has been merged they are sorted and
/// pairwise disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub interval: Interval,
    pub annotation: AnnotationId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_rejects_zero_width() {
        assert_eq!(
            Interval::new(4, 4),
            Err(AnnotationError::DegenerateInterval { start: 4, end: 4 })
        );
        assert!(Interval::new(5, 2).is_err());
        assert_eq!(Interval::new(2, 5).map(|i| i.len()), Ok(3));
    }

    #[rstest]
    #[case(0, 9, 4, 9, true)]
    #[case(0, 9, 0, 9, true)]
    #[case(4, 15, 0, 4, false)]
    #[case(4, 15, 9, 16, false)]
    fn test_covers(
        #[case] start: usize,
        #[case] end: usize,
        #[case] seg_start: usize,
        #[case] seg_end: usize,
        #[case] expected: bool,
    ) {
        let interval = Interval { start, end };
        assert_eq!(interval.covers(seg_start, seg_end), expected);
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let left = Interval { start: 0, end: 4 };
        let right = Interval { start: 4, end: 9 };

        assert!(!left.overlaps(&right));
        assert!(!right.overlaps(&left));
    }

    #[test]
    fn test_subtract_splits_around_hole() {
        let whole = Interval { start: 0, end: 10 };
        let hole = Interval { start: 3, end: 6 };

        assert_eq!(
            whole.subtract(&hole),
            vec![Interval { start: 0, end: 3 }, Interval { start: 6, end: 10 }]
        );
    }

    #[test]
    fn test_subtract_fully_covered_is_empty() {
        let inner = Interval { start: 3, end: 6 };
        let outer = Interval { start: 0, end: 10 };

        assert!(inner.subtract(&outer).is_empty());
    }

    #[test]
    fn test_subtract_disjoint_keeps_original() {
        let a = Interval { start: 0, end: 3 };
        let b = Interval { start: 5, end: 8 };

        assert_eq!(a.subtract(&b), vec![a]);
    }
}
