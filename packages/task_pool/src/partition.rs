use std::num::NonZero;
use std::ops::Range;

/// A strategy for splitting an index range into contiguous sub-ranges.
///
/// Used by the parallel algorithms to decide how many independent sub-tasks
/// an input is decomposed into. Two sizing policies exist:
///
/// * [`fixed_step()`][Self::fixed_step] - every partition spans `step`
///   indexes, except the final one, which absorbs whatever remains.
/// * [`equal_count()`][Self::equal_count] - the range is divided into the
///   requested number of partitions of near-equal size, with the remainder
///   distributed one-per-partition onto the final partitions (so partition
///   sizes differ by at most one).
///
/// Splitting covers the input exactly once and yields nothing for an empty
/// range.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use task_pool::Partitioner;
///
/// let partitions: Vec<_> = Partitioner::fixed_step(nz!(4)).split(10).collect();
/// assert_eq!(partitions, vec![0..4, 4..8, 8..10]);
///
/// let partitions: Vec<_> = Partitioner::equal_count(nz!(4)).split(10).collect();
/// assert_eq!(partitions, vec![0..2, 2..4, 4..7, 7..10]);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Partitioner {
    kind: Kind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    FixedStep(NonZero<usize>),
    EqualCount(NonZero<usize>),
}

impl Partitioner {
    /// Creates a partitioner producing partitions of `step` indexes each.
    #[must_use]
    pub fn fixed_step(step: NonZero<usize>) -> Self {
        Self {
            kind: Kind::FixedStep(step),
        }
    }

    /// Creates a partitioner dividing the range into `count` near-equal
    /// partitions.
    ///
    /// When the range is shorter than `count`, one single-index partition is
    /// produced per element instead.
    #[must_use]
    pub fn equal_count(count: NonZero<usize>) -> Self {
        Self {
            kind: Kind::EqualCount(count),
        }
    }

    /// Returns how many partitions splitting a range of `len` indexes
    /// produces.
    #[must_use]
    pub fn count_for(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }

        match self.kind {
            Kind::FixedStep(step) => len.div_ceil(step.get()),
            Kind::EqualCount(count) => count.get().min(len),
        }
    }

    /// Splits `0..len` into a lazy, forward-only sequence of contiguous
    /// sub-ranges.
    #[must_use]
    pub fn split(&self, len: usize) -> Partitions {
        let mode = match self.kind {
            Kind::FixedStep(step) => Mode::Step(step.get()),
            Kind::EqualCount(count) => {
                let count = count.get().min(len).max(1);

                Mode::Counted {
                    base: len / count,
                    remainder: len % count,
                    produced: 0,
                    count,
                }
            }
        };

        Partitions {
            next_start: 0,
            len,
            mode,
        }
    }
}

/// Iterator over the sub-ranges produced by a [`Partitioner`].
#[derive(Debug)]
pub struct Partitions {
    next_start: usize,
    len: usize,
    mode: Mode,
}

#[derive(Debug)]
enum Mode {
    Step(usize),
    Counted {
        base: usize,
        remainder: usize,
        produced: usize,
        count: usize,
    },
}

impl Iterator for Partitions {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.len {
            return None;
        }

        let size = match &mut self.mode {
            Mode::Step(step) => (*step).min(self.len - self.next_start),
            Mode::Counted {
                base,
                remainder,
                produced,
                count,
            } => {
                // The last `remainder` partitions absorb one extra index each.
                let size = *base + usize::from(*count - *produced <= *remainder);
                *produced += 1;
                size
            }
        };

        let start = self.next_start;
        self.next_start = start + size;

        Some(start..self.next_start)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use new_zealand::nz;

    use super::*;

    fn covers_exactly(partitions: &[Range<usize>], len: usize) {
        assert_eq!(partitions.first().map_or(0, |range| range.start), 0);
        assert_eq!(partitions.last().map_or(0, |range| range.end), len);

        for (previous, current) in partitions.iter().tuple_windows() {
            assert_eq!(previous.end, current.start);
            assert!(!current.is_empty());
        }
    }

    #[test]
    fn fixed_step_last_partition_absorbs_remainder() {
        let partitions: Vec<_> = Partitioner::fixed_step(nz!(4)).split(10).collect();

        assert_eq!(partitions, vec![0..4, 4..8, 8..10]);
        covers_exactly(&partitions, 10);
    }

    #[test]
    fn fixed_step_exact_division() {
        let partitions: Vec<_> = Partitioner::fixed_step(nz!(5)).split(10).collect();

        assert_eq!(partitions, vec![0..5, 5..10]);
    }

    #[test]
    fn fixed_step_larger_than_range() {
        let partitions: Vec<_> = Partitioner::fixed_step(nz!(100)).split(10).collect();

        assert_eq!(partitions, vec![0..10]);
    }

    #[test]
    fn equal_count_distributes_remainder_onto_final_partitions() {
        let partitions: Vec<_> = Partitioner::equal_count(nz!(4)).split(10).collect();

        assert_eq!(partitions, vec![0..2, 2..4, 4..7, 7..10]);
        covers_exactly(&partitions, 10);
    }

    #[test]
    fn equal_count_exact_division() {
        let partitions: Vec<_> = Partitioner::equal_count(nz!(4)).split(12).collect();

        let sizes: Vec<_> = partitions.iter().map(|range| range.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 3]);
        covers_exactly(&partitions, 12);
    }

    #[test]
    fn equal_count_with_more_partitions_than_elements() {
        let partitions: Vec<_> = Partitioner::equal_count(nz!(8)).split(3).collect();

        assert_eq!(partitions, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn empty_range_produces_no_partitions() {
        assert_eq!(Partitioner::fixed_step(nz!(4)).split(0).count(), 0);
        assert_eq!(Partitioner::equal_count(nz!(4)).split(0).count(), 0);
    }

    #[test]
    fn count_for_matches_split() {
        for len in [0, 1, 7, 16, 100, 1013] {
            for partitioner in [
                Partitioner::fixed_step(nz!(7)),
                Partitioner::equal_count(nz!(16)),
            ] {
                assert_eq!(
                    partitioner.count_for(len),
                    partitioner.split(len).count(),
                    "len {len}"
                );
            }
        }
    }

    #[test]
    fn partition_sizes_differ_by_at_most_one() {
        let partitions: Vec<_> = Partitioner::equal_count(nz!(7)).split(1000).collect();

        let (min, max) = partitions
            .iter()
            .map(|range| range.len())
            .minmax()
            .into_option()
            .unwrap();

        assert!(max - min <= 1);
    }
}
