//! Reading modes and directions

use serde::{Deserialize, Serialize};
use yomu_dom::LayoutAxis;

/// Reading mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingMode {
    SinglePageLtr,
    SinglePageRtl,
    DoublePageLtr,
    DoublePageRtl,
    #[default]
    ContinuousVertical,
    ContinuousHorizontalLtr,
    ContinuousHorizontalRtl,
    Webtoon,
}

/// Direction pages advance in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingDirection {
    #[default]
    Ltr,
    Rtl,
}

/// UI text direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Scroll axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAxis {
    X,
    Y,
    XY,
}

impl ScrollAxis {
    pub fn has_x(self) -> bool {
        matches!(self, ScrollAxis::X | ScrollAxis::XY)
    }

    pub fn has_y(self) -> bool {
        matches!(self, ScrollAxis::Y | ScrollAxis::XY)
    }
}

impl ReadingMode {
    pub const ALL: [ReadingMode; 8] = [
        ReadingMode::SinglePageLtr,
        ReadingMode::SinglePageRtl,
        ReadingMode::DoublePageLtr,
        ReadingMode::DoublePageRtl,
        ReadingMode::ContinuousVertical,
        ReadingMode::ContinuousHorizontalLtr,
        ReadingMode::ContinuousHorizontalRtl,
        ReadingMode::Webtoon,
    ];

    /// Pages (and adjacent chapters) live in one scrollable strip
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            ReadingMode::ContinuousVertical
                | ReadingMode::ContinuousHorizontalLtr
                | ReadingMode::ContinuousHorizontalRtl
                | ReadingMode::Webtoon
        )
    }

    /// Pages are paired into two-page spreads
    pub fn is_double_page(self) -> bool {
        matches!(self, ReadingMode::DoublePageLtr | ReadingMode::DoublePageRtl)
    }

    pub fn direction(self) -> ReadingDirection {
        match self {
            ReadingMode::SinglePageRtl
            | ReadingMode::DoublePageRtl
            | ReadingMode::ContinuousHorizontalRtl => ReadingDirection::Rtl,
            _ => ReadingDirection::Ltr,
        }
    }

    /// Axis boundary detection and position preservation work on
    pub fn scroll_axis(self) -> ScrollAxis {
        match self {
            ReadingMode::ContinuousVertical | ReadingMode::Webtoon => ScrollAxis::Y,
            ReadingMode::ContinuousHorizontalLtr | ReadingMode::ContinuousHorizontalRtl => {
                ScrollAxis::X
            }
            // A zoomed page can overflow either way
            _ => ScrollAxis::XY,
        }
    }

    /// How the page strip is laid out
    pub fn layout_axis(self) -> LayoutAxis {
        match self {
            ReadingMode::ContinuousHorizontalLtr => LayoutAxis::HorizontalLtr,
            ReadingMode::ContinuousHorizontalRtl => LayoutAxis::HorizontalRtl,
            _ => LayoutAxis::Vertical,
        }
    }

    /// Whether the previous chapter may be mounted next to the current one
    pub fn can_mount_previous(self) -> bool {
        self.is_continuous()
    }

    /// Whether the next chapter may be mounted next to the current one
    pub fn can_mount_next(self) -> bool {
        self.is_continuous()
    }

    /// Horizontal content flow for auto-scroll sign handling
    pub fn horizontal_flow(self, text_direction: TextDirection) -> TextDirection {
        match self {
            ReadingMode::ContinuousHorizontalRtl => TextDirection::Rtl,
            ReadingMode::ContinuousHorizontalLtr => TextDirection::Ltr,
            _ => text_direction,
        }
    }
}
