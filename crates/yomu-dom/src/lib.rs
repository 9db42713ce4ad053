//! Yomu DOM - Document model for the reader engine
//!
//! The reader core reacts to a handful of browser facilities: element
//! geometry, a scrollable container and the intersection / resize / mutation
//! observers. This crate models exactly those, deterministically, so the
//! engine can be driven (and tested) without a real browser.

pub mod container;
pub mod geometry;
pub mod observer;
pub mod scroll;

pub use container::{LayoutAxis, ScrollContainer};
pub use geometry::DOMRect;
pub use observer::{
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverOptions,
    MutationObserver, MutationObserverInit, MutationRecord, ResizeObserver,
    ResizeObserverEntry, ResizeObserverSize,
};
pub use scroll::{
    Headless, ScrollBehavior, ScrollOptions, ScrollPosition, ScrollRequest, ScrollSink,
};

/// Node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Build an id from its raw value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
