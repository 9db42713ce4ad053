//! Yomu Reader
//!
//! Pagination and continuous-scroll engine for a chapter-based image
//! reader. Decides which pages to mount and preload, keeps the page under
//! the reader's eyes still while images load and the viewport resizes, and
//! detects chapter boundary crossings in continuous reading modes.
//!
//! # Components
//! - [`page_index`]: page units and neighbour lookup
//! - [`preload`]: which page images should be attached right now
//! - [`input_classifier`]: wheel vs trackpad-like input heuristic
//! - [`auto_scroll`]: timer-driven programmatic scrolling
//! - [`scroll_anchor`]: scroll-position preservation across layout shifts
//! - [`chapter_boundary`]: chapter transitions in continuous modes
//! - [`session`]: the owned aggregate wiring all of the above together
//!
//! # Example
//! ```rust,ignore
//! use yomu_dom::{LayoutAxis, ScrollContainer};
//! use yomu_reader::{ChapterContext, ChapterMount, ReaderConfig, ReaderSession, ReadingMode};
//!
//! let mut container = ScrollContainer::new(LayoutAxis::Vertical, 800.0, 600.0);
//! let mut session = ReaderSession::new(ReaderConfig::default(), ReadingMode::Webtoon)?;
//! session.mount(&mut container);
//! session.mount_chapter(mount, &mut container);
//! let requests = session.flush(&mut container, 0.0);
//! ```

pub mod auto_scroll;
pub mod chapter_boundary;
pub mod config;
pub mod input_classifier;
pub mod mode;
pub mod page;
pub mod page_index;
pub mod preload;
pub mod scroll_anchor;
pub mod session;

pub use auto_scroll::{AutoScrollController, AutoScrollState, AutoScrollStatus, ScrollDirection};
pub use chapter_boundary::{
    AdjacentChapter, BoundaryChapter, ChapterBoundaryDetector, NavigationAction,
    NavigationRequest,
};
pub use config::{
    AnchorConfig, AutoScrollConfig, BoundaryConfig, ClassifierConfig, ConfigError, ReaderConfig,
};
pub use input_classifier::{PointerClassifier, WheelEvent};
pub use mode::{ReadingDirection, ReadingMode, ScrollAxis, TextDirection};
pub use page::{
    ChapterContext, ChapterId, LoadAck, LoadOutcome, Page, PageLoadState, PageLoadStates,
    RetryKey,
};
pub use page_index::{
    neighbor_for_side, neighbor_index, unit_at, NeighborDirection, PageUnit, PageUnits,
    PairingOptions, ScreenSide, VisualSlot, VisualSlots,
};
pub use preload::{indexes_to_load, MountFlags};
pub use scroll_anchor::{ScrollAnchor, ScrollPreservation};
pub use session::{ChapterMount, ReaderSession};

/// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
