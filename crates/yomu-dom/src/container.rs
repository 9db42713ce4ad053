//! Scroll Container
//!
//! A scrollable element whose children are laid out one after another along
//! a single axis, the way a reader's page strip is. Geometry follows the
//! browser's conventions: `offset_rect` is relative to the scrolled content,
//! `bounding_client_rect` is relative to the container's viewport.
//!
//! Layout changes never touch the scroll offset (other than clamping it into
//! range), so content growing above the viewport shifts what the user sees.
//! Compensating for that is the reader's job, not the container's.

use std::collections::HashMap;

use crate::geometry::DOMRect;
use crate::observer::MutationRecord;
use crate::scroll::{
    ScrollBehavior, ScrollOptions, ScrollPosition, ScrollRequest, ScrollSink, SmoothScroll,
};
use crate::NodeId;

/// Direction children are stacked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutAxis {
    /// Top to bottom
    #[default]
    Vertical,
    /// Left to right
    HorizontalLtr,
    /// Right to left; the first child sits at the right end of the content
    HorizontalRtl,
}

impl LayoutAxis {
    pub fn is_horizontal(self) -> bool {
        !matches!(self, LayoutAxis::Vertical)
    }
}

#[derive(Debug, Clone)]
struct ChildBox {
    node: NodeId,
    width: f64,
    height: f64,
    offset: DOMRect,
}

/// Scroll container
#[derive(Debug)]
pub struct ScrollContainer {
    id: NodeId,
    content_id: NodeId,
    axis: LayoutAxis,
    client_width: f64,
    client_height: f64,
    content_width: f64,
    content_height: f64,
    scroll: ScrollPosition,
    smooth: Option<SmoothScroll>,
    children: Vec<ChildBox>,
    next_node: u32,
    pending_mutations: Vec<MutationRecord>,
}

impl ScrollContainer {
    pub fn new(axis: LayoutAxis, client_width: f64, client_height: f64) -> Self {
        Self {
            id: NodeId(1),
            content_id: NodeId(2),
            axis,
            client_width,
            client_height,
            content_width: client_width,
            content_height: client_height,
            scroll: ScrollPosition::default(),
            smooth: None,
            children: Vec::new(),
            next_node: 3,
            pending_mutations: Vec::new(),
        }
    }

    /// The container element itself
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The wrapper holding the laid-out children
    pub fn content_id(&self) -> NodeId {
        self.content_id
    }

    pub fn axis(&self) -> LayoutAxis {
        self.axis
    }

    pub fn set_axis(&mut self, axis: LayoutAxis) {
        if self.axis != axis {
            self.axis = axis;
            self.relayout();
        }
    }

    pub fn client_size(&self) -> (f64, f64) {
        (self.client_width, self.client_height)
    }

    /// Resize the viewport (window resize)
    pub fn set_client_size(&mut self, width: f64, height: f64) {
        self.client_width = width.max(0.0);
        self.client_height = height.max(0.0);
        self.relayout();
    }

    pub fn content_size(&self) -> (f64, f64) {
        (self.content_width, self.content_height)
    }

    pub fn scroll_position(&self) -> ScrollPosition {
        self.scroll
    }

    /// The viewport in client coordinates
    pub fn viewport_rect(&self) -> DOMRect {
        DOMRect::from_xywh(0.0, 0.0, self.client_width, self.client_height)
    }

    pub fn max_scroll(&self) -> ScrollPosition {
        ScrollPosition::new(
            (self.content_width - self.client_width).max(0.0),
            (self.content_height - self.client_height).max(0.0),
        )
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Children in document order
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|c| c.node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.position_of(node).is_some()
    }

    pub fn append_child(&mut self, width: f64, height: f64) -> NodeId {
        self.insert_child(self.children.len(), width, height)
    }

    pub fn prepend_child(&mut self, width: f64, height: f64) -> NodeId {
        self.insert_child(0, width, height)
    }

    /// Insert a new child at `index` (clamped to the child count)
    pub fn insert_child(&mut self, index: usize, width: f64, height: f64) -> NodeId {
        let node = NodeId(self.next_node);
        self.next_node += 1;

        let index = index.min(self.children.len());
        self.children.insert(
            index,
            ChildBox {
                node,
                width: width.max(0.0),
                height: height.max(0.0),
                offset: DOMRect::default(),
            },
        );
        self.relayout();

        let previous_sibling = index.checked_sub(1).map(|i| self.children[i].node);
        let next_sibling = self.children.get(index + 1).map(|c| c.node);
        self.push_child_list(vec![node], Vec::new(), previous_sibling, next_sibling);
        node
    }

    /// Remove a child; unknown nodes are ignored
    pub fn remove_child(&mut self, node: NodeId) -> bool {
        let Some(index) = self.position_of(node) else {
            return false;
        };
        let previous_sibling = index.checked_sub(1).map(|i| self.children[i].node);
        let next_sibling = self.children.get(index + 1).map(|c| c.node);

        self.children.remove(index);
        self.relayout();
        self.push_child_list(Vec::new(), vec![node], previous_sibling, next_sibling);
        true
    }

    /// Change a child's box size (an image finished loading)
    pub fn set_child_size(&mut self, node: NodeId, width: f64, height: f64) -> bool {
        let Some(index) = self.position_of(node) else {
            return false;
        };
        let child = &mut self.children[index];
        child.width = width.max(0.0);
        child.height = height.max(0.0);
        self.relayout();
        true
    }

    /// offsetLeft / offsetTop / size relative to the scrolled content
    pub fn offset_rect(&self, node: NodeId) -> Option<DOMRect> {
        self.position_of(node).map(|i| self.children[i].offset)
    }

    /// getBoundingClientRect relative to the container viewport
    pub fn bounding_client_rect(&self, node: NodeId) -> Option<DOMRect> {
        self.offset_rect(node)
            .map(|rect| rect.translate(-self.scroll.x, -self.scroll.y))
    }

    /// Client rects of every child, for the intersection observers
    pub fn client_rects(&self) -> HashMap<NodeId, DOMRect> {
        self.children
            .iter()
            .map(|c| (c.node, c.offset.translate(-self.scroll.x, -self.scroll.y)))
            .collect()
    }

    /// Sizes for resize observers: the container's client box and the
    /// content wrapper's box
    pub fn observed_sizes(&self) -> HashMap<NodeId, (f64, f64)> {
        let mut sizes = HashMap::with_capacity(2);
        sizes.insert(self.id, (self.client_width, self.client_height));
        sizes.insert(self.content_id, (self.content_width, self.content_height));
        sizes
    }

    /// Drain queued child-list mutations
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending_mutations)
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    /// Scroll to an absolute position
    pub fn scroll_to(&mut self, options: ScrollOptions) {
        let target = self.clamp(ScrollPosition::new(
            options.left.unwrap_or(self.scroll.x),
            options.top.unwrap_or(self.scroll.y),
        ));

        match options.behavior {
            ScrollBehavior::Instant | ScrollBehavior::Auto => {
                self.scroll = target;
                self.smooth = None;
            }
            ScrollBehavior::Smooth => {
                self.smooth = Some(SmoothScroll {
                    from: self.scroll,
                    to: target,
                    progress: 0.0,
                });
            }
        }
    }

    /// Scroll to where reading starts (the right end for RTL strips)
    pub fn scroll_to_start(&mut self) {
        let left = match self.axis {
            LayoutAxis::HorizontalRtl => self.max_scroll().x,
            _ => 0.0,
        };
        self.scroll_to(ScrollOptions {
            left: Some(left),
            top: Some(0.0),
            behavior: ScrollBehavior::Instant,
        });
    }

    /// Advance a smooth scroll animation
    pub fn update(&mut self, delta_ms: f64) -> bool {
        let Some(mut anim) = self.smooth.take() else {
            return false;
        };
        let (position, done) = anim.step(delta_ms);
        self.scroll = self.clamp(position);
        if !done {
            self.smooth = Some(anim);
        }
        true
    }

    pub fn is_scrolling(&self) -> bool {
        self.smooth.is_some()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn position_of(&self, node: NodeId) -> Option<usize> {
        self.children.iter().position(|c| c.node == node)
    }

    fn clamp(&self, position: ScrollPosition) -> ScrollPosition {
        let max = self.max_scroll();
        ScrollPosition::new(position.x.clamp(0.0, max.x), position.y.clamp(0.0, max.y))
    }

    fn push_child_list(
        &mut self,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) {
        self.pending_mutations.push(MutationRecord {
            target: self.content_id,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
        });
    }

    fn relayout(&mut self) {
        match self.axis {
            LayoutAxis::Vertical => {
                let mut y = 0.0;
                let mut widest: f64 = 0.0;
                for child in &mut self.children {
                    child.offset = DOMRect::from_xywh(0.0, y, child.width, child.height);
                    y += child.height;
                    widest = widest.max(child.width);
                }
                self.content_width = widest.max(self.client_width);
                self.content_height = y.max(self.client_height);
            }
            LayoutAxis::HorizontalLtr => {
                let mut x = 0.0;
                let mut tallest: f64 = 0.0;
                for child in &mut self.children {
                    child.offset = DOMRect::from_xywh(x, 0.0, child.width, child.height);
                    x += child.width;
                    tallest = tallest.max(child.height);
                }
                self.content_width = x.max(self.client_width);
                self.content_height = tallest.max(self.client_height);
            }
            LayoutAxis::HorizontalRtl => {
                let total: f64 = self.children.iter().map(|c| c.width).sum();
                let tallest = self.children.iter().map(|c| c.height).fold(0.0, f64::max);
                self.content_width = total.max(self.client_width);
                self.content_height = tallest.max(self.client_height);

                let mut right = self.content_width;
                for child in &mut self.children {
                    right -= child.width;
                    child.offset = DOMRect::from_xywh(right, 0.0, child.width, child.height);
                }
            }
        }

        self.scroll = self.clamp(self.scroll);
        tracing::trace!(
            "relayout {:?}: content {}x{} client {}x{}",
            self.axis,
            self.content_width,
            self.content_height,
            self.client_width,
            self.client_height
        );
    }
}

impl ScrollSink for ScrollContainer {
    fn scroll_by(&mut self, request: ScrollRequest) {
        match request.behavior {
            ScrollBehavior::Smooth => {
                let base = self.smooth.map(|anim| anim.to).unwrap_or(self.scroll);
                let target = self.clamp(ScrollPosition::new(
                    base.x + request.dx,
                    base.y + request.dy,
                ));
                self.smooth = Some(SmoothScroll {
                    from: self.scroll,
                    to: target,
                    progress: 0.0,
                });
            }
            ScrollBehavior::Instant | ScrollBehavior::Auto => {
                self.scroll = self.clamp(ScrollPosition::new(
                    self.scroll.x + request.dx,
                    self.scroll.y + request.dy,
                ));
                if let Some(mut anim) = self.smooth.take() {
                    anim.shift(request.dx, request.dy);
                    anim.to = self.clamp(anim.to);
                    self.smooth = Some(anim);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(heights: &[f64]) -> (ScrollContainer, Vec<NodeId>) {
        let mut container = ScrollContainer::new(LayoutAxis::Vertical, 800.0, 600.0);
        let nodes = heights
            .iter()
            .map(|&h| container.append_child(800.0, h))
            .collect();
        (container, nodes)
    }

    #[test]
    fn test_vertical_layout() {
        let (container, nodes) = strip(&[100.0, 200.0, 300.0, 400.0]);
        assert_eq!(container.offset_rect(nodes[2]).unwrap().y, 300.0);
        assert_eq!(container.content_size(), (800.0, 1000.0));
        assert_eq!(container.max_scroll().y, 400.0);
    }

    #[test]
    fn test_rtl_layout_starts_at_right() {
        let mut container = ScrollContainer::new(LayoutAxis::HorizontalRtl, 500.0, 700.0);
        let first = container.append_child(500.0, 700.0);
        let second = container.append_child(500.0, 700.0);

        assert_eq!(container.offset_rect(first).unwrap().x, 500.0);
        assert_eq!(container.offset_rect(second).unwrap().x, 0.0);

        container.scroll_to_start();
        assert_eq!(container.scroll_position().x, 500.0);
        assert_eq!(container.bounding_client_rect(first).unwrap().x, 0.0);
    }

    #[test]
    fn test_growth_above_viewport_shifts_content() {
        let (mut container, nodes) = strip(&[100.0, 100.0, 1000.0, 1000.0]);
        container.scroll_by(ScrollRequest::instant(0.0, 250.0));
        let before = container.bounding_client_rect(nodes[2]).unwrap().y;

        container.set_child_size(nodes[0], 800.0, 500.0);
        let after = container.bounding_client_rect(nodes[2]).unwrap().y;

        assert_eq!(after - before, 400.0);
        assert_eq!(container.scroll_position().y, 250.0);
    }

    #[test]
    fn test_child_list_mutations() {
        let (mut container, nodes) = strip(&[100.0, 100.0]);
        let records = container.take_mutations();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].added_nodes, vec![nodes[1]]);
        assert_eq!(records[1].previous_sibling, Some(nodes[0]));

        assert!(container.remove_child(nodes[0]));
        assert!(!container.remove_child(nodes[0]));
        let records = container.take_mutations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].removed_nodes, vec![nodes[0]]);
        assert!(container.take_mutations().is_empty());
    }

    #[test]
    fn test_scroll_is_clamped() {
        let (mut container, _) = strip(&[300.0, 300.0, 300.0]);
        container.scroll_by(ScrollRequest::instant(0.0, 10_000.0));
        assert_eq!(container.scroll_position().y, 300.0);
        container.scroll_by(ScrollRequest::instant(0.0, -10_000.0));
        assert_eq!(container.scroll_position().y, 0.0);
    }

    #[test]
    fn test_instant_scroll_composes_with_smooth_scroll() {
        let (mut container, _) = strip(&[2000.0, 2000.0]);
        container.scroll_by(ScrollRequest {
            dx: 0.0,
            dy: 300.0,
            behavior: ScrollBehavior::Smooth,
        });
        container.update(100.0);
        container.scroll_by(ScrollRequest::instant(0.0, 50.0));

        for _ in 0..30 {
            container.update(16.0);
        }

        assert!(!container.is_scrolling());
        assert_eq!(container.scroll_position().y, 350.0);
    }
}
