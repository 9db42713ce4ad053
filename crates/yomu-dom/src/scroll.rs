//! Scroll Behavior
//!
//! Scroll positions, scroll requests and the sink they are issued against.

use serde::{Deserialize, Serialize};

/// Scroll behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
    Instant,
}

/// Scroll position (scrollLeft / scrollTop)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

impl ScrollPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Absolute scroll options
#[derive(Debug, Clone, Default)]
pub struct ScrollOptions {
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub behavior: ScrollBehavior,
}

/// Relative scroll request (`scrollBy`)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollRequest {
    pub dx: f64,
    pub dy: f64,
    pub behavior: ScrollBehavior,
}

impl ScrollRequest {
    pub const fn instant(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            behavior: ScrollBehavior::Instant,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Anything a relative scroll can be issued against.
///
/// Implemented by [`crate::ScrollContainer`] and by [`Headless`], which
/// forwards requests to a callback for hosts that drive their own scrolling.
pub trait ScrollSink {
    fn scroll_by(&mut self, request: ScrollRequest);
}

/// Callback-backed scroll sink
pub struct Headless<F>(pub F);

impl<F> ScrollSink for Headless<F>
where
    F: FnMut(ScrollRequest),
{
    fn scroll_by(&mut self, request: ScrollRequest) {
        (self.0)(request)
    }
}

/// In-flight smooth scroll
#[derive(Debug, Clone, Copy)]
pub(crate) struct SmoothScroll {
    pub from: ScrollPosition,
    pub to: ScrollPosition,
    pub progress: f64,
}

/// Duration of a smooth scroll animation
pub(crate) const SMOOTH_SCROLL_MS: f64 = 300.0;

impl SmoothScroll {
    /// Advance the animation, returning the new position and whether it ended
    pub fn step(&mut self, delta_ms: f64) -> (ScrollPosition, bool) {
        self.progress += delta_ms / SMOOTH_SCROLL_MS;
        if self.progress >= 1.0 {
            return (self.to, true);
        }

        // Ease-out interpolation
        let t = 1.0 - (1.0 - self.progress).powi(3);
        let position = ScrollPosition::new(
            self.from.x + (self.to.x - self.from.x) * t,
            self.from.y + (self.to.y - self.from.y) * t,
        );
        (position, false)
    }

    /// Move the whole animation by a relative offset
    pub fn shift(&mut self, dx: f64, dy: f64) {
        self.from.x += dx;
        self.from.y += dy;
        self.to.x += dx;
        self.to.y += dy;
    }
}
