//! Chapter-Boundary Transition Detector
//!
//! Watches the first and last page unit of one chapter in a continuous
//! reading mode and turns boundary crossings into navigation requests.
//!
//! The initial report for each watched node only establishes where the node
//! is; it never represents reader motion. Every later report is compared
//! with the previous one to tell which way the reader is going.
//!
//! Once a chapter switch was requested the detector stays silent until it
//! is pointed at a different chapter.

use yomu_dom::{
    DOMRect, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverOptions,
    LayoutAxis, NodeId, ScrollContainer,
};

use crate::config::BoundaryConfig;
use crate::mode::ReadingMode;
use crate::page::{ChapterContext, ChapterId};

/// Which neighbouring chapter a request is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjacentChapter {
    Previous,
    Next,
}

/// What the host should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationAction {
    /// Make the chapter current, mounting it first if needed
    OpenChapter,
    /// Mount the chapter next to the current one without promoting it
    MountChapter,
}

/// Navigation side effect emitted by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavigationRequest {
    pub action: NavigationAction,
    pub target: AdjacentChapter,
    pub chapter_id: ChapterId,
}

/// The chapter a detector watches
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryChapter {
    pub chapter_id: ChapterId,
    pub context: ChapterContext,
    pub previous_chapter_id: Option<ChapterId>,
    pub next_chapter_id: Option<ChapterId>,
    /// Node of the first page unit
    pub first_node: NodeId,
    /// Node of the last page unit
    pub last_node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy)]
struct WatchedEdge {
    node: NodeId,
    /// Rect from the previous report; `None` until the initial report
    last_rect: Option<DOMRect>,
}

impl WatchedEdge {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            last_rect: None,
        }
    }
}

/// Boundary detector for one chapter
#[derive(Debug)]
pub struct ChapterBoundaryDetector {
    config: BoundaryConfig,
    mode: ReadingMode,
    chapter: Option<BoundaryChapter>,
    observer: IntersectionObserver,
    first: Option<WatchedEdge>,
    last: Option<WatchedEdge>,
    previous_mounted: bool,
    /// A chapter switch was requested
    triggered: bool,
    /// The previous chapter was asked to mount
    mount_requested: bool,
}

impl ChapterBoundaryDetector {
    pub fn new(config: BoundaryConfig, mode: ReadingMode) -> Self {
        let observer = Self::create_observer(&config);
        Self {
            config,
            mode,
            chapter: None,
            observer,
            first: None,
            last: None,
            previous_mounted: false,
            triggered: false,
            mount_requested: false,
        }
    }

    fn create_observer(config: &BoundaryConfig) -> IntersectionObserver {
        IntersectionObserver::new(IntersectionObserverOptions {
            thresholds: vec![0.0, config.intersection_threshold, 0.5, 1.0],
            ..Default::default()
        })
    }

    pub fn chapter(&self) -> Option<&BoundaryChapter> {
        self.chapter.as_ref()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn is_watching(&self) -> bool {
        self.chapter.is_some()
    }

    /// Watch `chapter`.
    ///
    /// A different chapter id re-creates the observation session and clears
    /// the guard. The same chapter keeps it, only picking up new edge nodes
    /// or a new context.
    pub fn watch(&mut self, chapter: BoundaryChapter) {
        let same_chapter = self
            .chapter
            .as_ref()
            .is_some_and(|c| c.chapter_id == chapter.chapter_id);

        if !same_chapter {
            self.observer.disconnect();
            self.observer = Self::create_observer(&self.config);
            self.first = None;
            self.last = None;
            self.triggered = false;
            self.mount_requested = false;
            tracing::debug!(
                "boundary detector {} watching {} ({:?})",
                self.observer.id(),
                chapter.chapter_id,
                chapter.context
            );
        }

        let first = self
            .first
            .filter(|e| e.node == chapter.first_node)
            .unwrap_or_else(|| WatchedEdge::new(chapter.first_node));
        let last = self
            .last
            .filter(|e| e.node == chapter.last_node)
            .unwrap_or_else(|| WatchedEdge::new(chapter.last_node));

        for old in [self.first, self.last].into_iter().flatten() {
            if old.node != first.node && old.node != last.node {
                self.observer.unobserve(old.node);
            }
        }
        self.observer.observe(first.node);
        self.observer.observe(last.node);

        self.first = Some(first);
        self.last = Some(last);
        self.chapter = Some(chapter);
    }

    pub fn set_context(&mut self, context: ChapterContext) {
        if let Some(chapter) = self.chapter.as_mut() {
            chapter.context = context;
        }
    }

    pub fn set_previous_mounted(&mut self, mounted: bool) {
        self.previous_mounted = mounted;
    }

    pub fn set_mode(&mut self, mode: ReadingMode) {
        self.mode = mode;
    }

    /// Stop watching
    pub fn detach(&mut self) {
        self.observer.disconnect();
        self.chapter = None;
        self.first = None;
        self.last = None;
    }

    /// Run intersection against `container` and evaluate what changed
    pub fn observe(&mut self, container: &ScrollContainer, time: f64) -> Option<NavigationRequest> {
        if !self.mode.is_continuous() || self.chapter.is_none() {
            return None;
        }
        self.observer.check_intersections(
            container.viewport_rect(),
            &container.client_rects(),
            time,
        );
        let entries = self.observer.take_entries();
        self.handle_entries(&entries)
    }

    /// Evaluate intersection reports for the watched edges. At most one
    /// request comes out per call.
    pub fn handle_entries(
        &mut self,
        entries: &[IntersectionObserverEntry],
    ) -> Option<NavigationRequest> {
        if !self.mode.is_continuous() {
            return None;
        }

        let mut request = None;
        for entry in entries {
            for edge in [Edge::First, Edge::Last] {
                let Some(motion) = self.track(edge, entry) else {
                    continue;
                };
                if request.is_none() {
                    request = self.decide(edge, motion, entry);
                }
            }
        }
        request
    }

    /// Record the report for `edge` and tell which way it moved
    fn track(&mut self, edge: Edge, entry: &IntersectionObserverEntry) -> Option<Motion> {
        let watched = match edge {
            Edge::First => self.first.as_mut()?,
            Edge::Last => self.last.as_mut()?,
        };
        if watched.node != entry.target {
            return None;
        }

        let rect = entry.bounding_client_rect;
        let previous = watched.last_rect.replace(rect)?;
        motion(self.mode, &previous, &rect, entry.root_bounds.as_ref())
    }

    fn decide(
        &mut self,
        edge: Edge,
        motion: Motion,
        entry: &IntersectionObserverEntry,
    ) -> Option<NavigationRequest> {
        let chapter = self.chapter.as_ref()?;
        let scrolled_out = entry.intersection_ratio < self.config.intersection_threshold
            && is_behind(self.mode, motion, entry);

        match (edge, motion) {
            (Edge::First, Motion::Backward) => {
                if !self.previous_mounted {
                    if self.mount_requested || !self.mode.can_mount_previous() {
                        return None;
                    }
                    let chapter_id = chapter.previous_chapter_id?;
                    self.mount_requested = true;
                    return Some(self.emit(
                        NavigationAction::MountChapter,
                        AdjacentChapter::Previous,
                        chapter_id,
                    ));
                }

                if self.triggered || !chapter.context.is_current() || !scrolled_out {
                    return None;
                }
                let chapter_id = chapter.previous_chapter_id?;
                self.triggered = true;
                Some(self.emit(
                    NavigationAction::OpenChapter,
                    AdjacentChapter::Previous,
                    chapter_id,
                ))
            }
            (Edge::Last, Motion::Forward) => {
                if self.triggered {
                    return None;
                }
                if chapter.context.is_current() && !scrolled_out {
                    return None;
                }
                let chapter_id = chapter.next_chapter_id?;
                self.triggered = true;
                Some(self.emit(
                    NavigationAction::OpenChapter,
                    AdjacentChapter::Next,
                    chapter_id,
                ))
            }
            _ => None,
        }
    }

    fn emit(
        &self,
        action: NavigationAction,
        target: AdjacentChapter,
        chapter_id: ChapterId,
    ) -> NavigationRequest {
        tracing::info!(
            "chapter boundary: {:?} {:?} -> {}",
            action,
            target,
            chapter_id
        );
        NavigationRequest {
            action,
            target,
            chapter_id,
        }
    }
}

/// Reader motion between two reports of the same node. Content moves
/// against the reading direction when the reader goes forward.
fn motion(
    mode: ReadingMode,
    previous: &DOMRect,
    current: &DOMRect,
    root: Option<&DOMRect>,
) -> Option<Motion> {
    let forward_shift = match mode.layout_axis() {
        LayoutAxis::Vertical => previous.y - current.y,
        LayoutAxis::HorizontalLtr => previous.x - current.x,
        LayoutAxis::HorizontalRtl => current.x - previous.x,
    };
    if forward_shift > 0.0 {
        return Some(Motion::Forward);
    }
    if forward_shift < 0.0 {
        return Some(Motion::Backward);
    }

    // Did not move (a relayout); guess from where the node sits
    let root = root?;
    let ahead = match mode.layout_axis() {
        LayoutAxis::Vertical => current.center_y() - root.center_y(),
        LayoutAxis::HorizontalLtr => current.center_x() - root.center_x(),
        LayoutAxis::HorizontalRtl => root.center_x() - current.center_x(),
    };
    if ahead < 0.0 {
        Some(Motion::Forward)
    } else if ahead > 0.0 {
        Some(Motion::Backward)
    } else {
        None
    }
}

/// The node sits on the side of the viewport `motion` carries content out
/// through, so a low ratio means it is leaving rather than arriving.
fn is_behind(mode: ReadingMode, motion: Motion, entry: &IntersectionObserverEntry) -> bool {
    let Some(root) = entry.root_bounds else {
        return true;
    };
    let rect = entry.bounding_client_rect;
    let ahead = match mode.layout_axis() {
        LayoutAxis::Vertical => rect.center_y() - root.center_y(),
        LayoutAxis::HorizontalLtr => rect.center_x() - root.center_x(),
        LayoutAxis::HorizontalRtl => root.center_x() - rect.center_x(),
    };
    match motion {
        Motion::Forward => ahead < 0.0,
        Motion::Backward => ahead > 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: DOMRect = DOMRect::from_xywh(0.0, 0.0, 800.0, 600.0);

    fn first() -> NodeId {
        NodeId::from_raw(10)
    }

    fn last() -> NodeId {
        NodeId::from_raw(20)
    }

    fn chapter(context: ChapterContext) -> BoundaryChapter {
        BoundaryChapter {
            chapter_id: ChapterId(5),
            context,
            previous_chapter_id: Some(ChapterId(4)),
            next_chapter_id: Some(ChapterId(6)),
            first_node: first(),
            last_node: last(),
        }
    }

    fn detector(context: ChapterContext) -> ChapterBoundaryDetector {
        let mut detector =
            ChapterBoundaryDetector::new(BoundaryConfig::default(), ReadingMode::Webtoon);
        detector.watch(chapter(context));
        detector
    }

    /// Report for `target` with its top at `top` (600px tall page)
    fn entry(target: NodeId, top: f64) -> IntersectionObserverEntry {
        let rect = DOMRect::from_xywh(0.0, top, 800.0, 600.0);
        let visible = rect.intersection(&VIEWPORT);
        IntersectionObserverEntry {
            target,
            bounding_client_rect: rect,
            intersection_rect: visible.unwrap_or_default(),
            root_bounds: Some(VIEWPORT),
            intersection_ratio: rect.visible_ratio(&VIEWPORT),
            is_intersecting: visible.is_some(),
            time: 0.0,
        }
    }

    #[test]
    fn test_initial_report_is_discarded() {
        let mut detector = detector(ChapterContext::Current);
        // Already scrolled past when observation starts
        assert!(detector.handle_entries(&[entry(last(), -700.0)]).is_none());
        assert!(!detector.is_triggered());
    }

    #[test]
    fn test_forward_sweep_opens_next_once() {
        let mut detector = detector(ChapterContext::Current);
        let mut requests = Vec::new();

        let mut top = 0.0;
        detector.handle_entries(&[entry(last(), top)]);
        while top > -700.0 {
            top -= 15.0;
            requests.extend(detector.handle_entries(&[entry(last(), top)]));
        }

        assert_eq!(
            requests,
            vec![NavigationRequest {
                action: NavigationAction::OpenChapter,
                target: AdjacentChapter::Next,
                chapter_id: ChapterId(6),
            }]
        );
        assert!(detector.is_triggered());
    }

    #[test]
    fn test_arriving_last_page_does_not_trigger() {
        let mut detector = detector(ChapterContext::Current);
        detector.handle_entries(&[entry(last(), 700.0)]);
        // Peeking in at the bottom with a tiny ratio
        assert!(detector.handle_entries(&[entry(last(), 580.0)]).is_none());
        assert!(detector.handle_entries(&[entry(last(), 100.0)]).is_none());
    }

    #[test]
    fn test_backward_requests_previous_mount_once() {
        let mut detector = detector(ChapterContext::Current);
        detector.handle_entries(&[entry(first(), 0.0)]);

        let request = detector.handle_entries(&[entry(first(), 50.0)]).unwrap();
        assert_eq!(request.action, NavigationAction::MountChapter);
        assert_eq!(request.target, AdjacentChapter::Previous);
        assert_eq!(request.chapter_id, ChapterId(4));

        assert!(detector.handle_entries(&[entry(first(), 80.0)]).is_none());
        // Mounting is not a chapter switch
        assert!(!detector.is_triggered());
    }

    #[test]
    fn test_backward_past_first_page_opens_previous() {
        let mut detector = detector(ChapterContext::Current);
        detector.set_previous_mounted(true);
        detector.handle_entries(&[entry(first(), 0.0)]);

        assert!(detector.handle_entries(&[entry(first(), 300.0)]).is_none());
        let request = detector.handle_entries(&[entry(first(), 560.0)]).unwrap();
        assert_eq!(request.action, NavigationAction::OpenChapter);
        assert_eq!(request.target, AdjacentChapter::Previous);
        assert!(detector.handle_entries(&[entry(first(), 700.0)]).is_none());
    }

    #[test]
    fn test_non_current_chapter_promotes_next() {
        let mut detector = detector(ChapterContext::Previous);
        detector.handle_entries(&[entry(last(), 0.0)]);
        let request = detector.handle_entries(&[entry(last(), -10.0)]).unwrap();
        assert_eq!(request.action, NavigationAction::OpenChapter);
        assert_eq!(request.target, AdjacentChapter::Next);
    }

    #[test]
    fn test_guard_resets_on_new_chapter_only() {
        let mut detector = detector(ChapterContext::Previous);
        detector.handle_entries(&[entry(last(), 0.0)]);
        detector.handle_entries(&[entry(last(), -10.0)]).unwrap();

        // Same chapter, now current: still guarded
        detector.watch(chapter(ChapterContext::Current));
        assert!(detector.is_triggered());

        detector.watch(BoundaryChapter {
            chapter_id: ChapterId(6),
            previous_chapter_id: Some(ChapterId(5)),
            next_chapter_id: Some(ChapterId(7)),
            ..chapter(ChapterContext::Current)
        });
        assert!(!detector.is_triggered());
    }

    #[test]
    fn test_missing_neighbor_yields_nothing() {
        let mut detector =
            ChapterBoundaryDetector::new(BoundaryConfig::default(), ReadingMode::Webtoon);
        detector.watch(BoundaryChapter {
            next_chapter_id: None,
            ..chapter(ChapterContext::Current)
        });
        detector.handle_entries(&[entry(last(), -500.0)]);
        assert!(detector.handle_entries(&[entry(last(), -700.0)]).is_none());
        assert!(!detector.is_triggered());
    }

    #[test]
    fn test_paged_modes_are_ignored() {
        let mut detector =
            ChapterBoundaryDetector::new(BoundaryConfig::default(), ReadingMode::SinglePageLtr);
        detector.watch(chapter(ChapterContext::Current));
        detector.handle_entries(&[entry(last(), 0.0)]);
        assert!(detector.handle_entries(&[entry(last(), -700.0)]).is_none());
    }

    #[test]
    fn test_horizontal_rtl_direction() {
        let mut detector = ChapterBoundaryDetector::new(
            BoundaryConfig::default(),
            ReadingMode::ContinuousHorizontalRtl,
        );
        detector.watch(chapter(ChapterContext::Current));

        let at = |x: f64| {
            let rect = DOMRect::from_xywh(x, 0.0, 800.0, 600.0);
            IntersectionObserverEntry {
                target: last(),
                bounding_client_rect: rect,
                intersection_rect: rect.intersection(&VIEWPORT).unwrap_or_default(),
                root_bounds: Some(VIEWPORT),
                intersection_ratio: rect.visible_ratio(&VIEWPORT),
                is_intersecting: rect.intersects(&VIEWPORT),
                time: 0.0,
            }
        };

        // Reading right to left: the last page leaves through the right edge
        detector.handle_entries(&[at(0.0)]);
        assert!(detector.handle_entries(&[at(500.0)]).is_none());
        let request = detector.handle_entries(&[at(900.0)]).unwrap();
        assert_eq!(request.target, AdjacentChapter::Next);
    }

    #[test]
    fn test_observes_container() {
        use yomu_dom::{ScrollBehavior, ScrollOptions};

        let mut container = ScrollContainer::new(LayoutAxis::Vertical, 800.0, 600.0);
        let nodes: Vec<_> = (0..3).map(|_| container.append_child(800.0, 600.0)).collect();
        container.append_child(800.0, 600.0);

        let mut detector =
            ChapterBoundaryDetector::new(BoundaryConfig::default(), ReadingMode::Webtoon);
        detector.watch(BoundaryChapter {
            first_node: nodes[0],
            last_node: nodes[2],
            ..chapter(ChapterContext::Current)
        });
        detector.set_previous_mounted(true);
        assert!(detector.observe(&container, 0.0).is_none());

        let mut requests = Vec::new();
        for step in 1..=30 {
            container.scroll_to(ScrollOptions {
                top: Some(step as f64 * 40.0 + 600.0),
                left: None,
                behavior: ScrollBehavior::Instant,
            });
            requests.extend(detector.observe(&container, step as f64));
        }
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].chapter_id, ChapterId(6));
    }
}
