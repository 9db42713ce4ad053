//! Page Index Resolver
//!
//! Maps the linear position of a rendered step (`pages_index`) to the page
//! or page pair shown at that step. Pairing follows document order; which
//! visual slot each page of a pair lands in is decided separately by
//! [`VisualSlots::assign`].

use crate::mode::{ReadingDirection, ReadingMode, TextDirection};
use crate::page::Page;

/// One navigable step: a page, or two pages side by side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUnit {
    /// Position of the unit in the rendered sequence
    pub pages_index: usize,
    pub primary: Page,
    pub secondary: Option<Page>,
}

impl PageUnit {
    /// Page indices shown by this unit, in document order
    pub fn page_indices(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.primary.index).chain(self.secondary.as_ref().map(|p| p.index))
    }

    pub fn is_spread(&self) -> bool {
        self.secondary.is_some()
    }
}

/// Pairing options for double-page modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingOptions {
    /// Render the first page (the cover) alone and pair the rest
    pub offset_first_page: bool,
}

/// Page positions (primary, secondary) for unit `unit`
fn unit_bounds(
    unit: usize,
    page_count: usize,
    mode: ReadingMode,
    options: PairingOptions,
) -> Option<(usize, Option<usize>)> {
    if !mode.is_double_page() {
        return (unit < page_count).then_some((unit, None));
    }

    let primary = if options.offset_first_page {
        if unit == 0 {
            return (page_count > 0).then_some((0, None));
        }
        unit * 2 - 1
    } else {
        unit * 2
    };

    if primary >= page_count {
        return None;
    }
    let secondary = primary + 1;
    Some((primary, (secondary < page_count).then_some(secondary)))
}

fn unit_count(page_count: usize, mode: ReadingMode, options: PairingOptions) -> usize {
    if !mode.is_double_page() || page_count == 0 {
        return page_count;
    }
    if options.offset_first_page {
        1 + (page_count - 1).div_ceil(2)
    } else {
        page_count.div_ceil(2)
    }
}

fn build_unit(
    pages_index: usize,
    pages: &[Page],
    mode: ReadingMode,
    options: PairingOptions,
) -> Option<PageUnit> {
    let (primary, secondary) = unit_bounds(pages_index, pages.len(), mode, options)?;
    Some(PageUnit {
        pages_index,
        primary: pages[primary].clone(),
        secondary: secondary.map(|i| pages[i].clone()),
    })
}

/// Unit rendered at `pages_index`, or `None` outside `[0, units)`.
///
/// Pure: identical inputs always give structurally equal output.
pub fn unit_at(pages_index: usize, pages: &[Page], mode: ReadingMode) -> Option<PageUnit> {
    build_unit(pages_index, pages, mode, PairingOptions::default())
}

/// The rendered sequence of one chapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUnits {
    units: Vec<PageUnit>,
}

impl PageUnits {
    pub fn build(pages: &[Page], mode: ReadingMode, options: PairingOptions) -> Self {
        let count = unit_count(pages.len(), mode, options);
        let units = (0..count)
            .filter_map(|i| build_unit(i, pages, mode, options))
            .collect();
        Self { units }
    }

    pub fn get(&self, pages_index: usize) -> Option<&PageUnit> {
        self.units.get(pages_index)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageUnit> {
        self.units.iter()
    }

    pub fn as_slice(&self) -> &[PageUnit] {
        &self.units
    }

    pub fn first(&self) -> Option<&PageUnit> {
        self.units.first()
    }

    pub fn last(&self) -> Option<&PageUnit> {
        self.units.last()
    }

    /// Unit showing page `page_index`
    pub fn unit_index_of_page(&self, page_index: usize) -> Option<usize> {
        self.units
            .iter()
            .position(|unit| unit.page_indices().any(|i| i == page_index))
    }
}

impl<'a> IntoIterator for &'a PageUnits {
    type Item = &'a PageUnit;
    type IntoIter = std::slice::Iter<'a, PageUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

/// Navigation direction between units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Previous,
    Next,
}

/// Neighbouring unit index, `None` at either end
pub fn neighbor_index(direction: NeighborDirection, from: usize, len: usize) -> Option<usize> {
    if from >= len {
        return None;
    }
    match direction {
        NeighborDirection::Previous => from.checked_sub(1),
        NeighborDirection::Next => (from + 1 < len).then_some(from + 1),
    }
}

/// Side of the screen a tap landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenSide {
    Left,
    Right,
}

/// Unit reached by tapping `side`. In right-to-left modes the left side
/// turns forward.
pub fn neighbor_for_side(
    side: ScreenSide,
    from: usize,
    len: usize,
    mode: ReadingMode,
) -> Option<usize> {
    let direction = match (mode.direction(), side) {
        (ReadingDirection::Ltr, ScreenSide::Left) | (ReadingDirection::Rtl, ScreenSide::Right) => {
            NeighborDirection::Previous
        }
        (ReadingDirection::Ltr, ScreenSide::Right) | (ReadingDirection::Rtl, ScreenSide::Left) => {
            NeighborDirection::Next
        }
    };
    neighbor_index(direction, from, len)
}

/// Visual slot of a spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualSlot {
    Left,
    Right,
}

impl VisualSlot {
    pub fn opposite(self) -> Self {
        match self {
            VisualSlot::Left => VisualSlot::Right,
            VisualSlot::Right => VisualSlot::Left,
        }
    }

    /// Slot of the primary page for a UI text direction and reading direction
    pub fn primary(text: TextDirection, reading: ReadingDirection) -> Self {
        match (text, reading) {
            (TextDirection::Ltr, ReadingDirection::Ltr) => VisualSlot::Right,
            (TextDirection::Ltr, ReadingDirection::Rtl) => VisualSlot::Left,
            (TextDirection::Rtl, ReadingDirection::Ltr) => VisualSlot::Left,
            (TextDirection::Rtl, ReadingDirection::Rtl) => VisualSlot::Right,
        }
    }
}

/// Pages placed into the left and right slots of a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSlots<'a> {
    pub left: Option<&'a Page>,
    pub right: Option<&'a Page>,
}

impl<'a> VisualSlots<'a> {
    pub fn assign(unit: &'a PageUnit, text: TextDirection, reading: ReadingDirection) -> Self {
        let primary_slot = VisualSlot::primary(text, reading);
        let mut slots = Self {
            left: None,
            right: None,
        };
        *slots.slot_mut(primary_slot) = Some(&unit.primary);
        *slots.slot_mut(primary_slot.opposite()) = unit.secondary.as_ref();
        slots
    }

    pub fn get(&self, slot: VisualSlot) -> Option<&'a Page> {
        match slot {
            VisualSlot::Left => self.left,
            VisualSlot::Right => self.right,
        }
    }

    fn slot_mut(&mut self, slot: VisualSlot) -> &mut Option<&'a Page> {
        match slot {
            VisualSlot::Left => &mut self.left,
            VisualSlot::Right => &mut self.right,
        }
    }
}
