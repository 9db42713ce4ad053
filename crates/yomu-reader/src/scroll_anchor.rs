//! Scroll-Position Preservation
//!
//! Keeps the page the reader is looking at still while the content around
//! it changes size. An intersection observer over the page nodes picks an
//! anchor; whenever children are added or removed, or the content or the
//! viewport is resized, the anchor's offset is compared with the offset
//! recorded when it was picked and the difference is scrolled away.
//!
//! Corrections are relative, instant `scroll_by` requests so they compose
//! with a smooth scroll or auto-scroll already in flight.

use std::collections::HashMap;

use yomu_dom::{
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverOptions,
    MutationObserver, MutationObserverInit, MutationRecord, NodeId, ResizeObserver,
    ScrollContainer, ScrollRequest, ScrollSink,
};

use crate::config::AnchorConfig;
use crate::mode::{ReadingMode, ScrollAxis};

/// Intersection steps used to track how visible each page is
const VISIBILITY_STEPS: u32 = 20;

/// The element kept visually still
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    /// Relation only; the node may have left the document since
    pub node: NodeId,
    pub offset_left: f64,
    pub offset_top: f64,
    pub scroll_left: f64,
    pub scroll_top: f64,
}

/// Scroll-position preservation engine for one container
#[derive(Debug)]
pub struct ScrollPreservation {
    config: AnchorConfig,
    mode: ReadingMode,
    attached: bool,
    intersection: IntersectionObserver,
    resize: ResizeObserver,
    mutation: MutationObserver,
    /// Latest visibility of intersecting nodes
    ratios: HashMap<NodeId, f64>,
    anchor: Option<ScrollAnchor>,
}

impl ScrollPreservation {
    pub fn new(config: AnchorConfig, mode: ReadingMode) -> Self {
        Self {
            config,
            mode,
            attached: false,
            intersection: IntersectionObserver::new(IntersectionObserverOptions::with_steps(
                VISIBILITY_STEPS,
            )),
            resize: ResizeObserver::new(),
            mutation: MutationObserver::new(),
            ratios: HashMap::new(),
            anchor: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn anchor(&self) -> Option<&ScrollAnchor> {
        self.anchor.as_ref()
    }

    /// Start observing `container` and every page already in it
    pub fn attach(&mut self, container: &ScrollContainer) {
        if self.attached {
            self.detach();
        }

        for node in container.children() {
            self.intersection.observe(node);
        }
        self.resize.observe(container.id());
        self.resize.observe(container.content_id());
        self.mutation.observe(
            container.content_id(),
            MutationObserverInit {
                child_list: true,
            },
        );

        // The first size report is the baseline, not a change
        self.resize.check_sizes(&container.observed_sizes());
        self.resize.take_entries();

        self.attached = true;
        tracing::debug!(
            "scroll preservation attached to {} ({} pages)",
            container.id(),
            container.child_count()
        );
    }

    /// Drop every observation and the anchor
    pub fn detach(&mut self) {
        self.intersection.disconnect();
        self.resize.disconnect();
        self.mutation.disconnect();
        self.ratios.clear();
        self.anchor = None;
        self.attached = false;
    }

    pub fn set_mode(&mut self, mode: ReadingMode) {
        self.mode = mode;
        if !mode.is_continuous() {
            self.anchor = None;
        }
    }

    /// Child-list mutations under the container.
    ///
    /// New pages are observed, removed ones forgotten, then the layout shift
    /// the mutation caused is corrected before anything else runs.
    pub fn handle_mutations(
        &mut self,
        records: &[MutationRecord],
        container: &mut ScrollContainer,
    ) -> Option<ScrollRequest> {
        if !self.attached {
            return None;
        }
        for record in records {
            self.mutation.record(record);
        }

        let records = self.mutation.take_records();
        if records.is_empty() {
            return None;
        }

        for record in &records {
            for &node in &record.added_nodes {
                self.intersection.observe(node);
            }
            for &node in &record.removed_nodes {
                self.intersection.unobserve(node);
                self.ratios.remove(&node);
                if self.anchor.is_some_and(|a| a.node == node) {
                    tracing::debug!("anchor {} removed", node);
                    self.anchor = None;
                }
            }
        }

        self.correct(container)
    }

    /// Content or viewport size changes
    pub fn handle_resize(&mut self, container: &mut ScrollContainer) -> Option<ScrollRequest> {
        if !self.attached {
            return None;
        }
        self.resize.check_sizes(&container.observed_sizes());
        let resized = self
            .resize
            .take_entries()
            .iter()
            .any(|entry| entry.previous_size.is_some());

        if resized { self.correct(container) } else { None }
    }

    /// Re-run intersection and pick the anchor: the first page in document
    /// order that is visible enough.
    pub fn update_anchor(&mut self, container: &ScrollContainer, time: f64) {
        if !self.attached {
            return;
        }
        self.intersection.check_intersections(
            container.viewport_rect(),
            &container.client_rects(),
            time,
        );
        let entries = self.intersection.take_entries();
        if entries.is_empty() {
            return;
        }
        self.record_entries(&entries);

        if !self.mode.is_continuous() {
            return;
        }

        let threshold = self.config.intersection_threshold;
        let candidate = container.children().find(|node| {
            self.ratios
                .get(node)
                .is_some_and(|&ratio| ratio > 0.0 && ratio >= threshold)
        });

        let Some(node) = candidate else {
            return;
        };
        let Some(offset) = container.offset_rect(node) else {
            return;
        };
        let scroll = container.scroll_position();

        if self.anchor.is_none_or(|a| a.node != node) {
            tracing::trace!("anchor -> {} at ({}, {})", node, offset.x, offset.y);
        }
        self.anchor = Some(ScrollAnchor {
            node,
            offset_left: offset.x,
            offset_top: offset.y,
            scroll_left: scroll.x,
            scroll_top: scroll.y,
        });
    }

    fn record_entries(&mut self, entries: &[IntersectionObserverEntry]) {
        for entry in entries {
            if entry.is_intersecting {
                self.ratios.insert(entry.target, entry.intersection_ratio);
            } else {
                self.ratios.remove(&entry.target);
            }
        }
    }

    /// Scroll by however far the anchor moved since its offset was last
    /// recorded, then record the new offset. Running it again without a
    /// layout change in between does nothing.
    pub fn correct(&mut self, container: &mut ScrollContainer) -> Option<ScrollRequest> {
        if !self.mode.is_continuous() {
            return None;
        }
        let anchor = self.anchor.as_mut()?;
        let Some(offset) = container.offset_rect(anchor.node) else {
            // Left the document without a mutation record reaching us yet
            self.anchor = None;
            return None;
        };

        let axis = self.mode.scroll_axis();
        let dx = if axis.has_x() { offset.x - anchor.offset_left } else { 0.0 };
        let dy = if axis.has_y() { offset.y - anchor.offset_top } else { 0.0 };
        let request = ScrollRequest::instant(dx, dy);

        if !request.is_noop() {
            container.scroll_by(request);
            tracing::debug!(
                "preserved scroll position: anchor {} moved by ({}, {})",
                anchor.node,
                dx,
                dy
            );
        }

        let scroll = container.scroll_position();
        anchor.offset_left = offset.x;
        anchor.offset_top = offset.y;
        anchor.scroll_left = scroll.x;
        anchor.scroll_top = scroll.y;

        (!request.is_noop()).then_some(request)
    }

    /// The axis corrections apply to
    pub fn axis(&self) -> ScrollAxis {
        self.mode.scroll_axis()
    }
}
