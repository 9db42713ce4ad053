//! DOM Observers
//!
//! IntersectionObserver, ResizeObserver and MutationObserver as explicit
//! state machines. Nothing here calls back into user code: the host runs a
//! check (`check_intersections`, `check_sizes`, `record`) and the owner
//! drains the queued entries, which keeps teardown and ordering in the
//! owner's hands.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::DOMRect;
use crate::NodeId;

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

fn next_observer_id() -> u64 {
    NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Intersection
// ============================================================================

/// Intersection observer options
#[derive(Debug, Clone)]
pub struct IntersectionObserverOptions {
    /// Root margin in pixels, grows the root on every side
    pub root_margin: f64,
    /// Thresholds to trigger callback
    pub thresholds: Vec<f64>,
}

impl Default for IntersectionObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: 0.0,
            thresholds: vec![0.0],
        }
    }
}

impl IntersectionObserverOptions {
    /// Options firing at every `1 / steps` of visibility
    pub fn with_steps(steps: u32) -> Self {
        let steps = steps.max(1);
        Self {
            thresholds: (0..=steps).map(|i| i as f64 / steps as f64).collect(),
            ..Self::default()
        }
    }
}

/// Intersection observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionObserverEntry {
    pub target: NodeId,
    pub bounding_client_rect: DOMRect,
    pub intersection_rect: DOMRect,
    pub root_bounds: Option<DOMRect>,
    pub intersection_ratio: f64,
    pub is_intersecting: bool,
    pub time: f64,
}

#[derive(Debug, Clone, Copy)]
struct ObservedTarget {
    node: NodeId,
    /// Index of the highest threshold reached, -1 when not intersecting
    last_threshold: Option<i32>,
}

/// Intersection observer
#[derive(Debug)]
pub struct IntersectionObserver {
    id: u64,
    options: IntersectionObserverOptions,
    observed: Vec<ObservedTarget>,
    pending_entries: Vec<IntersectionObserverEntry>,
}

impl IntersectionObserver {
    pub fn new(mut options: IntersectionObserverOptions) -> Self {
        if options.thresholds.is_empty() {
            options.thresholds.push(0.0);
        }
        options.thresholds.sort_by(f64::total_cmp);
        Self {
            id: next_observer_id(),
            options,
            observed: Vec::new(),
            pending_entries: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.options.thresholds
    }

    /// Observe an element. The next check always reports it once.
    pub fn observe(&mut self, target: NodeId) {
        if self.observed.iter().any(|t| t.node == target) {
            return;
        }
        self.observed.push(ObservedTarget {
            node: target,
            last_threshold: None,
        });
    }

    /// Stop observing
    pub fn unobserve(&mut self, target: NodeId) {
        self.observed.retain(|t| t.node != target);
        self.pending_entries.retain(|e| e.target != target);
    }

    /// Disconnect all
    pub fn disconnect(&mut self) {
        self.observed.clear();
        self.pending_entries.clear();
    }

    pub fn is_observing(&self) -> bool {
        !self.observed.is_empty()
    }

    /// Observed targets in observation order
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.observed.iter().map(|t| t.node)
    }

    /// Check intersections. Targets missing from `element_rects` (not in the
    /// document) are skipped.
    pub fn check_intersections(
        &mut self,
        viewport: DOMRect,
        element_rects: &HashMap<NodeId, DOMRect>,
        time: f64,
    ) {
        let margin = self.options.root_margin;
        let root = DOMRect::from_xywh(
            viewport.x - margin,
            viewport.y - margin,
            viewport.width + margin * 2.0,
            viewport.height + margin * 2.0,
        );

        for target in &mut self.observed {
            let Some(rect) = element_rects.get(&target.node) else {
                continue;
            };

            let intersection = rect.intersection(&root);
            let is_intersecting = intersection.is_some();
            let ratio = if is_intersecting { rect.visible_ratio(&root) } else { 0.0 };
            let threshold = if is_intersecting {
                self.options
                    .thresholds
                    .iter()
                    .filter(|&&t| ratio >= t)
                    .count() as i32
                    - 1
            } else {
                -1
            };

            if target.last_threshold == Some(threshold) {
                continue;
            }
            target.last_threshold = Some(threshold);

            self.pending_entries.push(IntersectionObserverEntry {
                target: target.node,
                bounding_client_rect: *rect,
                intersection_rect: intersection.unwrap_or_default(),
                root_bounds: Some(root),
                intersection_ratio: ratio,
                is_intersecting,
                time,
            });
        }
    }

    /// Take pending entries
    pub fn take_entries(&mut self) -> Vec<IntersectionObserverEntry> {
        std::mem::take(&mut self.pending_entries)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_entries.is_empty()
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Observed element size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeObserverSize {
    pub inline_size: f64,
    pub block_size: f64,
}

/// Resize observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeObserverEntry {
    pub target: NodeId,
    pub content_rect: DOMRect,
    pub content_box_size: ResizeObserverSize,
    /// Size reported by the previous entry for this target, if any
    pub previous_size: Option<ResizeObserverSize>,
}

/// Resize observer
#[derive(Debug)]
pub struct ResizeObserver {
    id: u64,
    observed: HashMap<NodeId, Option<(f64, f64)>>,
    pending_entries: Vec<ResizeObserverEntry>,
}

impl Default for ResizeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResizeObserver {
    pub fn new() -> Self {
        Self {
            id: next_observer_id(),
            observed: HashMap::new(),
            pending_entries: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Observe an element
    pub fn observe(&mut self, target: NodeId) {
        self.observed.entry(target).or_insert(None);
    }

    /// Stop observing an element
    pub fn unobserve(&mut self, target: NodeId) {
        self.observed.remove(&target);
    }

    /// Disconnect all observations
    pub fn disconnect(&mut self) {
        self.observed.clear();
        self.pending_entries.clear();
    }

    pub fn is_observing(&self) -> bool {
        !self.observed.is_empty()
    }

    /// Check for size changes
    pub fn check_sizes(&mut self, sizes: &HashMap<NodeId, (f64, f64)>) {
        for (node, last_size) in &mut self.observed {
            let Some(&(width, height)) = sizes.get(node) else {
                continue;
            };

            let changed = match *last_size {
                Some((lw, lh)) => (lw - width).abs() > 0.01 || (lh - height).abs() > 0.01,
                None => true,
            };
            if !changed {
                continue;
            }

            let previous_size = last_size.map(|(w, h)| ResizeObserverSize {
                inline_size: w,
                block_size: h,
            });
            *last_size = Some((width, height));

            self.pending_entries.push(ResizeObserverEntry {
                target: *node,
                content_rect: DOMRect::from_xywh(0.0, 0.0, width, height),
                content_box_size: ResizeObserverSize {
                    inline_size: width,
                    block_size: height,
                },
                previous_size,
            });
        }
    }

    /// Get pending entries and clear
    pub fn take_entries(&mut self) -> Vec<ResizeObserverEntry> {
        std::mem::take(&mut self.pending_entries)
    }

    /// Check if has pending entries
    pub fn has_pending(&self) -> bool {
        !self.pending_entries.is_empty()
    }
}

// ============================================================================
// Mutation
// ============================================================================

/// Child-list mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
}

/// Mutation observer
#[derive(Debug)]
pub struct MutationObserver {
    id: u64,
    observations: HashMap<NodeId, MutationObserverInit>,
    pending_records: Vec<MutationRecord>,
}

impl Default for MutationObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationObserver {
    pub fn new() -> Self {
        Self {
            id: next_observer_id(),
            observations: HashMap::new(),
            pending_records: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Observe a target
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) {
        self.observations.insert(target, options);
    }

    /// Stop observing everything and drop queued records
    pub fn disconnect(&mut self) {
        self.observations.clear();
        self.pending_records.clear();
    }

    /// Take pending records
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending_records)
    }

    /// Check if observing node
    pub fn is_observing(&self, node: NodeId) -> bool {
        self.observations.contains_key(&node)
    }

    /// Record a mutation if it matches an observation
    pub fn record(&mut self, mutation: &MutationRecord) {
        let Some(options) = self.observations.get(&mutation.target) else {
            return;
        };

        if options.child_list {
            self.pending_records.push(mutation.clone());
        }
    }

    /// Has pending records
    pub fn has_pending(&self) -> bool {
        !self.pending_records.is_empty()
    }
}
