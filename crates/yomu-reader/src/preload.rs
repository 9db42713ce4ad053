//! Preload Window Calculator
//!
//! Decides which page images must have their source attached right now.
//! Callers diff consecutive results to find what to start loading and what
//! to release.

use std::collections::BTreeSet;

use crate::mode::ReadingMode;
use crate::page::ChapterContext;
use crate::page_index::PageUnit;

/// Which chapter context a page set is mounted as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountFlags {
    pub is_current: bool,
    pub is_previous: bool,
    pub is_next: bool,
}

impl MountFlags {
    pub fn of(context: ChapterContext) -> Self {
        Self {
            is_current: context.is_current(),
            is_previous: context.is_previous(),
            is_next: context.is_next(),
        }
    }
}

/// Page indices of `units` that should be loaded.
///
/// `current` and `previous_rendered` are unit positions. A page set whose
/// context is not mounted, or that the mode never mounts, yields nothing.
pub fn indexes_to_load(
    current: usize,
    units: &[PageUnit],
    previous_rendered: Option<usize>,
    preload_amount: usize,
    mode: ReadingMode,
    flags: MountFlags,
) -> BTreeSet<usize> {
    let len = units.len();
    let range = if flags.is_current {
        if current >= len {
            return BTreeSet::new();
        }
        current_window(current, len, previous_rendered, preload_amount, mode)
    } else if flags.is_previous && mode.can_mount_previous() {
        // Mounted above: the pages closest to the current chapter are its last
        len.saturating_sub(preload_amount)..len
    } else if flags.is_next && mode.can_mount_next() {
        0..preload_amount.min(len)
    } else {
        return BTreeSet::new();
    };

    units[range]
        .iter()
        .flat_map(PageUnit::page_indices)
        .collect()
}

fn current_window(
    current: usize,
    len: usize,
    previous_rendered: Option<usize>,
    preload_amount: usize,
    mode: ReadingMode,
) -> std::ops::Range<usize> {
    let (behind, ahead) = if mode.is_continuous() {
        (preload_amount, preload_amount)
    } else {
        // Paged modes look ahead in the travel direction and keep one unit
        // on the other side for a quick turn back.
        let opposite = preload_amount.min(1);
        match previous_rendered {
            Some(previous) if previous > current => (preload_amount, opposite),
            _ => (opposite, preload_amount),
        }
    };

    let start = current.saturating_sub(behind);
    let end = current.saturating_add(ahead).saturating_add(1).min(len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use crate::page_index::{PageUnits, PairingOptions};

    fn units(n: usize, mode: ReadingMode) -> PageUnits {
        let pages: Vec<_> = (0..n).map(|i| Page::new(i, format!("{i}.jpg"))).collect();
        PageUnits::build(&pages, mode, PairingOptions::default())
    }

    fn current() -> MountFlags {
        MountFlags::of(ChapterContext::Current)
    }

    #[test]
    fn test_continuous_window() {
        let mode = ReadingMode::ContinuousVertical;
        let units = units(20, mode);
        let set = indexes_to_load(10, units.as_slice(), None, 2, mode, current());
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_window_is_clipped() {
        let mode = ReadingMode::Webtoon;
        let units = units(4, mode);
        let set = indexes_to_load(0, units.as_slice(), None, 5, mode, current());
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_monotonic_in_amount() {
        for mode in ReadingMode::ALL {
            let units = units(30, mode);
            for context in [
                ChapterContext::Current,
                ChapterContext::Previous,
                ChapterContext::Next,
            ] {
                for previous in [None, Some(3), Some(7)] {
                    let mut last = BTreeSet::new();
                    for amount in 0..12 {
                        let set = indexes_to_load(
                            5,
                            units.as_slice(),
                            previous,
                            amount,
                            mode,
                            MountFlags::of(context),
                        );
                        assert!(set.is_superset(&last), "{mode:?} {context:?} {amount}");
                        last = set;
                    }
                }
            }
        }
    }

    #[test]
    fn test_unmounted_context_is_excluded() {
        let units = units(20, ReadingMode::ContinuousVertical);
        let set = indexes_to_load(
            10,
            units.as_slice(),
            None,
            2,
            ReadingMode::ContinuousVertical,
            MountFlags::default(),
        );
        assert!(set.is_empty());

        // Paged modes never mount adjacent chapters
        let units = units_paged();
        let set = indexes_to_load(
            0,
            units.as_slice(),
            None,
            3,
            ReadingMode::SinglePageLtr,
            MountFlags::of(ChapterContext::Next),
        );
        assert!(set.is_empty());
    }

    fn units_paged() -> PageUnits {
        units(10, ReadingMode::SinglePageLtr)
    }

    #[test]
    fn test_adjacent_chapters_load_their_near_edge() {
        let mode = ReadingMode::Webtoon;
        let units = units(10, mode);
        let previous = indexes_to_load(
            0,
            units.as_slice(),
            None,
            3,
            mode,
            MountFlags::of(ChapterContext::Previous),
        );
        assert_eq!(previous.into_iter().collect::<Vec<_>>(), vec![7, 8, 9]);

        let next = indexes_to_load(
            9,
            units.as_slice(),
            None,
            3,
            mode,
            MountFlags::of(ChapterContext::Next),
        );
        assert_eq!(next.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_paged_follows_travel_direction() {
        let mode = ReadingMode::SinglePageLtr;
        let units = units_paged();

        let forward = indexes_to_load(5, units.as_slice(), Some(4), 2, mode, current());
        assert_eq!(forward.into_iter().collect::<Vec<_>>(), vec![4, 5, 6, 7]);

        let backward = indexes_to_load(5, units.as_slice(), Some(6), 2, mode, current());
        assert_eq!(backward.into_iter().collect::<Vec<_>>(), vec![3, 4, 5, 6]);

        let alone = indexes_to_load(5, units.as_slice(), None, 0, mode, current());
        assert_eq!(alone.into_iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_double_page_units_contribute_both_pages() {
        let mode = ReadingMode::DoublePageLtr;
        let units = units(10, mode);
        let set = indexes_to_load(1, units.as_slice(), None, 1, mode, current());
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }
}
