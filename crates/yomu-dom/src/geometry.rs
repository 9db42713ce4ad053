//! Geometry
//!
//! DOMRect and the rectangle math the observers need.

use serde::{Deserialize, Serialize};

/// DOMRect - rectangle geometry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    /// Create with dimensions
    pub const fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Top edge (same as y)
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Right edge
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Left edge (same as x)
    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Same rect moved by (dx, dy)
    pub fn translate(&self, dx: f64, dy: f64) -> DOMRect {
        DOMRect::from_xywh(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Check if rects touch or overlap (edge-adjacent counts, like the
    /// browser's intersection algorithm)
    pub fn intersects(&self, other: &DOMRect) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    /// Get intersection rect
    pub fn intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        if !self.intersects(other) {
            return None;
        }

        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        Some(DOMRect::from_xywh(x, y, right - x, bottom - y))
    }

    /// Fraction of `self` visible inside `root`, in `[0, 1]`.
    ///
    /// Zero-area targets (an image that has not loaded yet) count as fully
    /// visible while they touch the root.
    pub fn visible_ratio(&self, root: &DOMRect) -> f64 {
        let Some(visible) = self.intersection(root) else {
            return 0.0;
        };
        let area = self.area();
        if area <= 0.0 {
            return 1.0;
        }
        (visible.area() / area).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = DOMRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let b = DOMRect::from_xywh(50.0, 50.0, 100.0, 100.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, DOMRect::from_xywh(50.0, 50.0, 50.0, 50.0));

        let far = DOMRect::from_xywh(500.0, 500.0, 10.0, 10.0);
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_visible_ratio() {
        let root = DOMRect::from_xywh(0.0, 0.0, 800.0, 600.0);
        let half = DOMRect::from_xywh(0.0, 500.0, 800.0, 200.0);
        assert_eq!(half.visible_ratio(&root), 0.5);

        let outside = DOMRect::from_xywh(0.0, 700.0, 800.0, 200.0);
        assert_eq!(outside.visible_ratio(&root), 0.0);

        let collapsed = DOMRect::from_xywh(0.0, 100.0, 800.0, 0.0);
        assert_eq!(collapsed.visible_ratio(&root), 1.0);
    }
}
