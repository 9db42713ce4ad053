//! Reader Session
//!
//! Owns every engine component for one mounted reader and drives them
//! against a [`ScrollContainer`]. The host reports DOM changes by calling
//! [`ReaderSession::flush`] and time by calling [`ReaderSession::advance`];
//! everything that must happen before the next paint happens inside those
//! two calls, in a fixed order:
//!
//! 1. child-list mutations, and the correction they require
//! 2. content and viewport resizes, and the correction they require
//! 3. a final correction for page resizes that cancel out in the content
//!    size
//! 4. anchor re-selection
//! 5. chapter boundary detection
//!
//! The container's scroll offset is only ever changed through relative
//! scroll requests, so corrections and auto-scroll compose.

use std::collections::BTreeSet;

use yomu_dom::{
    LayoutAxis, NodeId, ScrollBehavior, ScrollContainer, ScrollOptions, ScrollRequest,
    ScrollSink,
};

use crate::auto_scroll::AutoScrollController;
use crate::chapter_boundary::{
    AdjacentChapter, BoundaryChapter, ChapterBoundaryDetector, NavigationAction,
    NavigationRequest,
};
use crate::config::{ConfigError, ReaderConfig};
use crate::input_classifier::{PointerClassifier, WheelEvent};
use crate::mode::{ReadingMode, TextDirection};
use crate::page::{
    ChapterContext, ChapterId, LoadAck, Page, PageLoadState, PageLoadStates, RetryKey,
};
use crate::page_index::{PageUnit, PageUnits, PairingOptions, VisualSlots};
use crate::preload::{self, MountFlags};
use crate::scroll_anchor::ScrollPreservation;

/// A chapter's pages handed to the session for mounting
#[derive(Debug, Clone)]
pub struct ChapterMount {
    pub chapter_id: ChapterId,
    pub context: ChapterContext,
    pub pages: Vec<Page>,
    pub previous_chapter_id: Option<ChapterId>,
    pub next_chapter_id: Option<ChapterId>,
}

#[derive(Debug)]
struct MountedChapter {
    chapter_id: ChapterId,
    context: ChapterContext,
    previous_chapter_id: Option<ChapterId>,
    next_chapter_id: Option<ChapterId>,
    pages: Vec<Page>,
    units: PageUnits,
    /// One node per unit, same order
    nodes: Vec<NodeId>,
    load_states: PageLoadStates,
    /// Natural image sizes of loaded pages
    page_sizes: Vec<Option<(f64, f64)>>,
    current_unit: usize,
    previous_rendered: Option<usize>,
}

impl MountedChapter {
    fn unit_size(&self, unit: &PageUnit, placeholder: (f64, f64)) -> (f64, f64) {
        let sizes: Vec<(f64, f64)> = unit
            .page_indices()
            .filter_map(|page| self.page_sizes.get(page).copied().flatten())
            .collect();
        if sizes.is_empty() {
            return placeholder;
        }
        let width = sizes.iter().map(|s| s.0).sum();
        let height = sizes.iter().map(|s| s.1).fold(0.0, f64::max);
        (width, height)
    }

    fn boundary(&self) -> Option<BoundaryChapter> {
        Some(BoundaryChapter {
            chapter_id: self.chapter_id,
            context: self.context,
            previous_chapter_id: self.previous_chapter_id,
            next_chapter_id: self.next_chapter_id,
            first_node: *self.nodes.first()?,
            last_node: *self.nodes.last()?,
        })
    }
}

/// Document order of chapter contexts
fn order(context: ChapterContext) -> u8 {
    match context {
        ChapterContext::Previous => 0,
        ChapterContext::Current => 1,
        ChapterContext::Next => 2,
    }
}

/// Reader session
#[derive(Debug)]
pub struct ReaderSession {
    config: ReaderConfig,
    mode: ReadingMode,
    text_direction: TextDirection,
    mounted: bool,
    /// Mounted chapters in document order
    chapters: Vec<MountedChapter>,
    classifier: PointerClassifier,
    auto_scroll: AutoScrollController,
    preservation: ScrollPreservation,
    boundary: ChapterBoundaryDetector,
    clock_ms: f64,
}

impl ReaderSession {
    /// Create a session; the configuration is validated here
    pub fn new(config: ReaderConfig, mode: ReadingMode) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            classifier: PointerClassifier::new(config.classifier.clone()),
            auto_scroll: AutoScrollController::new(config.auto_scroll.clone(), mode)?,
            preservation: ScrollPreservation::new(config.anchor.clone(), mode),
            boundary: ChapterBoundaryDetector::new(config.boundary.clone(), mode),
            config,
            mode,
            text_direction: TextDirection::Ltr,
            mounted: false,
            chapters: Vec::new(),
            clock_ms: 0.0,
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn reading_mode(&self) -> ReadingMode {
        self.mode
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Attach to `container`
    pub fn mount(&mut self, container: &mut ScrollContainer) {
        container.set_axis(self.mode.layout_axis());
        self.preservation.set_mode(self.mode);
        self.preservation.attach(container);
        self.classifier.init();
        let (width, height) = container.client_size();
        self.auto_scroll.set_viewport(width, height);
        self.mounted = true;
        tracing::info!("reader mounted in {:?} mode", self.mode);
    }

    /// Tear everything down: observers, the auto-scroll timer, the
    /// classifier and every mounted chapter. The chapters' nodes leave
    /// `container`, so it can be mounted again.
    pub fn dispose(&mut self, container: &mut ScrollContainer) {
        self.auto_scroll.cancel();
        self.preservation.detach();
        self.boundary.detach();
        self.classifier.dispose();
        for chapter_id in self.chapter_ids() {
            self.unmount_chapter(chapter_id, container);
        }
        self.mounted = false;
        tracing::info!("reader disposed");
    }

    pub fn set_text_direction(&mut self, text_direction: TextDirection) {
        self.text_direction = text_direction;
        self.auto_scroll.set_text_direction(text_direction);
    }

    pub fn text_direction(&self) -> TextDirection {
        self.text_direction
    }

    /// Switch reading mode. Units are re-paired, adjacent chapters the new
    /// mode cannot show are unmounted and the current unit is scrolled back
    /// into view.
    pub fn set_reading_mode(&mut self, mode: ReadingMode, container: &mut ScrollContainer) {
        if mode == self.mode {
            return;
        }
        tracing::info!("reading mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        container.set_axis(mode.layout_axis());
        self.preservation.set_mode(mode);
        self.auto_scroll.set_mode(mode);
        self.boundary.set_mode(mode);

        let disallowed: Vec<ChapterId> = self
            .chapters
            .iter()
            .filter(|c| {
                (c.context.is_previous() && !mode.can_mount_previous())
                    || (c.context.is_next() && !mode.can_mount_next())
            })
            .map(|c| c.chapter_id)
            .collect();
        for chapter_id in disallowed {
            self.unmount_chapter(chapter_id, container);
        }

        let placeholder = container.client_size();
        let options = self.pairing_options();
        let mut node_index = 0;
        for chapter in &mut self.chapters {
            let current_page = chapter
                .units
                .get(chapter.current_unit)
                .map(|u| u.primary.index);

            for node in chapter.nodes.drain(..) {
                container.remove_child(node);
            }
            chapter.units = PageUnits::build(&chapter.pages, mode, options);
            chapter.current_unit = current_page
                .and_then(|page| chapter.units.unit_index_of_page(page))
                .unwrap_or(0);
            chapter.previous_rendered = None;

            for unit in chapter.units.iter() {
                let (width, height) = chapter.unit_size(unit, placeholder);
                chapter
                    .nodes
                    .push(container.insert_child(node_index, width, height));
                node_index += 1;
            }
        }

        if let Some((chapter_id, unit)) = self
            .current_chapter()
            .map(|c| (c.chapter_id, c.current_unit))
        {
            self.scroll_to_unit(chapter_id, unit, ScrollBehavior::Instant, container);
        }
    }

    fn pairing_options(&self) -> PairingOptions {
        PairingOptions {
            offset_first_page: self.config.offset_first_page,
        }
    }

    // ========================================================================
    // Chapters
    // ========================================================================

    fn chapter(&self, chapter_id: ChapterId) -> Option<&MountedChapter> {
        self.chapters.iter().find(|c| c.chapter_id == chapter_id)
    }

    fn chapter_mut(&mut self, chapter_id: ChapterId) -> Option<&mut MountedChapter> {
        self.chapters.iter_mut().find(|c| c.chapter_id == chapter_id)
    }

    fn with_context(&self, context: ChapterContext) -> Option<&MountedChapter> {
        self.chapters.iter().find(|c| c.context == context)
    }

    fn current_chapter(&self) -> Option<&MountedChapter> {
        self.with_context(ChapterContext::Current)
    }

    pub fn current_chapter_id(&self) -> Option<ChapterId> {
        self.current_chapter().map(|c| c.chapter_id)
    }

    pub fn chapter_id_with_context(&self, context: ChapterContext) -> Option<ChapterId> {
        self.with_context(context).map(|c| c.chapter_id)
    }

    pub fn chapter_context(&self, chapter_id: ChapterId) -> Option<ChapterContext> {
        self.chapter(chapter_id).map(|c| c.context)
    }

    /// Mounted chapter ids in document order
    pub fn chapter_ids(&self) -> Vec<ChapterId> {
        self.chapters.iter().map(|c| c.chapter_id).collect()
    }

    pub fn units(&self, chapter_id: ChapterId) -> Option<&PageUnits> {
        self.chapter(chapter_id).map(|c| &c.units)
    }

    /// Node rendering `unit` of a chapter
    pub fn unit_node(&self, chapter_id: ChapterId, unit: usize) -> Option<NodeId> {
        self.chapter(chapter_id)?.nodes.get(unit).copied()
    }

    /// Mount a chapter's pages into `container`.
    ///
    /// The previous chapter goes above the current one and the next chapter
    /// below it. A chapter already mounted in the same context is replaced.
    /// Returns `false` when the mode does not show that context or the
    /// chapter is already mounted elsewhere.
    pub fn mount_chapter(&mut self, mount: ChapterMount, container: &mut ScrollContainer) -> bool {
        let allowed = match mount.context {
            ChapterContext::Current => true,
            ChapterContext::Previous => self.mode.can_mount_previous(),
            ChapterContext::Next => self.mode.can_mount_next(),
        };
        if !allowed {
            tracing::warn!(
                "{} cannot be mounted as {:?} in {:?} mode",
                mount.chapter_id,
                mount.context,
                self.mode
            );
            return false;
        }
        if self
            .chapter(mount.chapter_id)
            .is_some_and(|c| c.context != mount.context)
        {
            tracing::warn!("{} is already mounted", mount.chapter_id);
            return false;
        }

        if let Some(existing) = self.with_context(mount.context).map(|c| c.chapter_id) {
            self.unmount_chapter(existing, container);
        }

        let position = self
            .chapters
            .iter()
            .position(|c| order(c.context) > order(mount.context))
            .unwrap_or(self.chapters.len());
        let mut node_index: usize = self.chapters[..position]
            .iter()
            .map(|c| c.nodes.len())
            .sum();

        let units = PageUnits::build(&mount.pages, self.mode, self.pairing_options());
        let placeholder = container.client_size();
        let mut chapter = MountedChapter {
            chapter_id: mount.chapter_id,
            context: mount.context,
            previous_chapter_id: mount.previous_chapter_id,
            next_chapter_id: mount.next_chapter_id,
            load_states: PageLoadStates::new(mount.chapter_id, &mount.pages),
            page_sizes: vec![None; mount.pages.len()],
            pages: mount.pages,
            units,
            nodes: Vec::new(),
            current_unit: 0,
            previous_rendered: None,
        };
        for unit in chapter.units.iter() {
            let (width, height) = chapter.unit_size(unit, placeholder);
            chapter
                .nodes
                .push(container.insert_child(node_index, width, height));
            node_index += 1;
        }

        tracing::info!(
            "mounted {} as {:?}: {} pages in {} units",
            chapter.chapter_id,
            chapter.context,
            chapter.pages.len(),
            chapter.units.len()
        );

        let starts_reading = chapter.context.is_current() && self.chapters.is_empty();
        self.chapters.insert(position, chapter);
        if starts_reading {
            container.scroll_to_start();
        }
        true
    }

    /// Remove a chapter's nodes from `container`
    pub fn unmount_chapter(&mut self, chapter_id: ChapterId, container: &mut ScrollContainer) -> bool {
        let Some(index) = self.chapters.iter().position(|c| c.chapter_id == chapter_id) else {
            return false;
        };
        let chapter = self.chapters.remove(index);
        for node in chapter.nodes {
            container.remove_child(node);
        }
        tracing::info!("unmounted {} ({:?})", chapter_id, chapter.context);
        true
    }

    /// Apply an `OpenChapter` request whose target is already mounted: the
    /// target becomes current, the chapter on the far side is unmounted and
    /// the old current chapter takes the target's place.
    ///
    /// Returns `false` when there is nothing to promote; the host then has
    /// to fetch and mount the chapter first.
    pub fn apply_navigation(
        &mut self,
        request: NavigationRequest,
        container: &mut ScrollContainer,
    ) -> bool {
        if request.action != NavigationAction::OpenChapter {
            return false;
        }
        let (from, far) = match request.target {
            AdjacentChapter::Next => (ChapterContext::Next, ChapterContext::Previous),
            AdjacentChapter::Previous => (ChapterContext::Previous, ChapterContext::Next),
        };
        if self
            .chapter(request.chapter_id)
            .is_none_or(|c| c.context != from)
        {
            tracing::debug!(
                "{} is not mounted as {:?}; nothing to promote",
                request.chapter_id,
                from
            );
            return false;
        }

        if let Some(stale) = self.with_context(far).map(|c| c.chapter_id) {
            self.unmount_chapter(stale, container);
        }
        for chapter in &mut self.chapters {
            if chapter.context.is_current() {
                chapter.context = far;
            } else if chapter.chapter_id == request.chapter_id {
                chapter.context = ChapterContext::Current;
            }
        }
        self.chapters.sort_by_key(|c| order(c.context));

        tracing::info!("{} is now the current chapter", request.chapter_id);
        true
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// Record the unit the reader is on
    pub fn set_current_unit(&mut self, chapter_id: ChapterId, unit: usize) -> bool {
        let Some(chapter) = self.chapter_mut(chapter_id) else {
            return false;
        };
        if unit >= chapter.units.len() {
            return false;
        }
        if chapter.current_unit != unit {
            chapter.previous_rendered = Some(chapter.current_unit);
            chapter.current_unit = unit;
        }
        true
    }

    pub fn current_unit(&self, chapter_id: ChapterId) -> Option<usize> {
        self.chapter(chapter_id).map(|c| c.current_unit)
    }

    /// Page indices of a chapter that should be loading right now
    pub fn indexes_to_load(&self, chapter_id: ChapterId) -> BTreeSet<usize> {
        let Some(chapter) = self.chapter(chapter_id) else {
            return BTreeSet::new();
        };
        preload::indexes_to_load(
            chapter.current_unit,
            chapter.units.as_slice(),
            chapter.previous_rendered,
            self.config.preload_amount,
            self.mode,
            MountFlags::of(chapter.context),
        )
    }

    /// Pages shown in the left and right slot of a unit
    pub fn visual_slots(&self, chapter_id: ChapterId, unit: usize) -> Option<VisualSlots<'_>> {
        let unit = self.chapter(chapter_id)?.units.get(unit)?;
        Some(VisualSlots::assign(
            unit,
            self.text_direction,
            self.mode.direction(),
        ))
    }

    pub fn load_state(&self, chapter_id: ChapterId, page_index: usize) -> Option<&PageLoadState> {
        self.chapter(chapter_id)?.load_states.get(page_index)
    }

    /// A page image loaded with its natural `size`; its unit node takes the
    /// real size. The layout shift is corrected on the next flush.
    pub fn page_loaded(
        &mut self,
        chapter_id: ChapterId,
        page_index: usize,
        key: Option<RetryKey>,
        size: (f64, f64),
        container: &mut ScrollContainer,
    ) -> Option<LoadAck> {
        let placeholder = container.client_size();
        let chapter = self.chapter_mut(chapter_id)?;
        let ack = chapter.load_states.mark_loaded(page_index, key)?;

        if let Some(slot) = chapter.page_sizes.get_mut(page_index) {
            *slot = Some(size);
        }
        if let Some(unit_index) = chapter.units.unit_index_of_page(page_index) {
            let unit = chapter.units.get(unit_index).cloned();
            if let (Some(unit), Some(&node)) = (unit, chapter.nodes.get(unit_index)) {
                let (width, height) = chapter.unit_size(&unit, placeholder);
                container.set_child_size(node, width, height);
            }
        }
        Some(ack)
    }

    pub fn page_failed(
        &mut self,
        chapter_id: ChapterId,
        page_index: usize,
        key: Option<RetryKey>,
    ) -> Option<LoadAck> {
        self.chapter_mut(chapter_id)?
            .load_states
            .mark_error(page_index, key)
    }

    /// Explicit retry of a failed page
    pub fn retry_page(&mut self, chapter_id: ChapterId, page_index: usize) -> Option<RetryKey> {
        self.chapter_mut(chapter_id)?.load_states.retry(page_index)
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn on_wheel(&mut self, event: WheelEvent, now_ms: f64) {
        self.classifier.record_wheel(event, now_ms);
    }

    pub fn is_trackpad_like(&self) -> bool {
        self.classifier.is_trackpad_like()
    }

    /// Scroll a wheel event should cause. Trackpad-like input keeps its
    /// native deltas; a notched wheel moves a share of the viewport per
    /// notch.
    pub fn wheel_scroll(&self, event: WheelEvent, container: &ScrollContainer) -> ScrollRequest {
        if self.classifier.is_trackpad_like() {
            return ScrollRequest::instant(event.delta_x, event.delta_y);
        }

        let (width, height) = container.client_size();
        let fraction = self.config.wheel_scroll_percentage / 100.0;
        let step = |delta: f64, extent: f64| {
            if delta == 0.0 {
                0.0
            } else {
                delta.signum() * extent * fraction
            }
        };
        ScrollRequest {
            dx: step(event.delta_x, width),
            dy: step(event.delta_y, height),
            behavior: ScrollBehavior::Smooth,
        }
    }

    // ========================================================================
    // Scrolling
    // ========================================================================

    pub fn auto_scroll(&self) -> &AutoScrollController {
        &self.auto_scroll
    }

    pub fn auto_scroll_mut(&mut self) -> &mut AutoScrollController {
        &mut self.auto_scroll
    }

    /// Bring a unit into view and make it the current one
    pub fn scroll_to_unit(
        &mut self,
        chapter_id: ChapterId,
        unit: usize,
        behavior: ScrollBehavior,
        container: &mut ScrollContainer,
    ) -> bool {
        let Some(node) = self.unit_node(chapter_id, unit) else {
            return false;
        };
        let Some(rect) = container.offset_rect(node) else {
            return false;
        };

        let (client_width, _) = container.client_size();
        let options = match self.mode.layout_axis() {
            LayoutAxis::Vertical => ScrollOptions {
                top: Some(rect.y),
                left: None,
                behavior,
            },
            LayoutAxis::HorizontalLtr => ScrollOptions {
                top: None,
                left: Some(rect.x),
                behavior,
            },
            LayoutAxis::HorizontalRtl => ScrollOptions {
                top: None,
                left: Some(rect.right() - client_width),
                behavior,
            },
        };
        container.scroll_to(options);
        self.set_current_unit(chapter_id, unit)
    }

    /// Advance time: classifier re-evaluation, smooth scrolling, the
    /// auto-scroll tick, then a flush.
    pub fn advance(
        &mut self,
        now_ms: f64,
        container: &mut ScrollContainer,
    ) -> Vec<NavigationRequest> {
        let delta = (now_ms - self.clock_ms).max(0.0);
        self.clock_ms = self.clock_ms.max(now_ms);

        self.classifier.tick(now_ms);
        container.update(delta);
        let (width, height) = container.client_size();
        self.auto_scroll.set_viewport(width, height);
        self.auto_scroll.advance(now_ms, container);

        self.flush(container, now_ms)
    }

    /// Advance time for a host that scrolls on its own: auto-scroll requests
    /// go to `sink`. Returns the number of requests issued.
    pub fn advance_headless(&mut self, now_ms: f64, sink: &mut dyn ScrollSink) -> usize {
        self.clock_ms = self.clock_ms.max(now_ms);
        self.classifier.tick(now_ms);
        self.auto_scroll.advance(now_ms, sink)
    }

    /// Process everything that changed in `container` since the last flush
    pub fn flush(&mut self, container: &mut ScrollContainer, time: f64) -> Vec<NavigationRequest> {
        if !self.mounted {
            return Vec::new();
        }

        let records = container.take_mutations();
        self.preservation.handle_mutations(&records, container);
        self.preservation.handle_resize(container);
        // Pages can resize without the content size changing
        self.preservation.correct(container);
        self.preservation.update_anchor(container, time);
        self.track_current_unit();

        self.boundary_requests(container, time)
    }

    /// The anchor decides which unit the reader is on
    fn track_current_unit(&mut self) {
        if !self.mode.is_continuous() {
            return;
        }
        let Some(node) = self.preservation.anchor().map(|a| a.node) else {
            return;
        };
        let found = self.chapters.iter().find_map(|chapter| {
            chapter
                .nodes
                .iter()
                .position(|&n| n == node)
                .map(|unit| (chapter.chapter_id, unit))
        });
        if let Some((chapter_id, unit)) = found {
            self.set_current_unit(chapter_id, unit);
        }
    }

    fn boundary_requests(
        &mut self,
        container: &ScrollContainer,
        time: f64,
    ) -> Vec<NavigationRequest> {
        if !self.mode.is_continuous() {
            return Vec::new();
        }
        match self.current_chapter().and_then(MountedChapter::boundary) {
            Some(chapter) => {
                let previous_mounted = self.with_context(ChapterContext::Previous).is_some();
                self.boundary.watch(chapter);
                self.boundary.set_previous_mounted(previous_mounted);
            }
            None => {
                self.boundary.detach();
                return Vec::new();
            }
        }
        self.boundary.observe(container, time).into_iter().collect()
    }
}
