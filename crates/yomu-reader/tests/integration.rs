//! Integration tests for yomu-reader
//!
//! Drives a full reader session against a simulated scroll container.

use yomu_dom::{
    Headless, LayoutAxis, NodeId, ScrollBehavior, ScrollContainer, ScrollOptions, ScrollRequest,
    ScrollSink,
};
use yomu_reader::*;

fn pages(chapter: u64, count: usize) -> Vec<Page> {
    (0..count)
        .map(|i| Page::new(i, format!("https://cdn.example/{chapter}/{i}.webp")))
        .collect()
}

fn chapter(id: u64, context: ChapterContext, count: usize) -> ChapterMount {
    ChapterMount {
        chapter_id: ChapterId(id),
        context,
        pages: pages(id, count),
        previous_chapter_id: Some(ChapterId(id - 1)),
        next_chapter_id: Some(ChapterId(id + 1)),
    }
}

fn reader(config: ReaderConfig, mode: ReadingMode) -> (ReaderSession, ScrollContainer) {
    let mut container = ScrollContainer::new(LayoutAxis::Vertical, 800.0, 600.0);
    let mut session = ReaderSession::new(config, mode).unwrap();
    session.mount(&mut container);
    (session, container)
}

fn scroll_to(container: &mut ScrollContainer, top: f64) {
    container.scroll_to(ScrollOptions {
        top: Some(top),
        left: None,
        behavior: ScrollBehavior::Instant,
    });
}

fn client_top(container: &ScrollContainer, node: NodeId) -> f64 {
    container.bounding_client_rect(node).unwrap().y
}

// ============================================================================
// SCROLL POSITION PRESERVATION
// ============================================================================

#[test]
fn test_image_load_above_viewport_is_invisible() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 10), &mut container);
    session.flush(&mut container, 0.0);

    session.scroll_to_unit(ChapterId(1), 5, ScrollBehavior::Instant, &mut container);
    session.flush(&mut container, 1.0);
    let reading = session.unit_node(ChapterId(1), 5).unwrap();
    assert_eq!(client_top(&container, reading), 0.0);

    // Page 2 turns out to be a tall strip
    let ack = session
        .page_loaded(ChapterId(1), 2, None, (800.0, 1400.0), &mut container)
        .unwrap();
    assert_eq!(ack.outcome, LoadOutcome::Loaded);
    session.flush(&mut container, 2.0);

    assert_eq!(client_top(&container, reading), 0.0);
    assert_eq!(container.scroll_position().y, 3800.0);
    assert_eq!(session.current_unit(ChapterId(1)), Some(5));
}

#[test]
fn test_image_load_below_viewport_needs_no_correction() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 10), &mut container);
    session.scroll_to_unit(ChapterId(1), 3, ScrollBehavior::Instant, &mut container);
    session.flush(&mut container, 0.0);

    session.page_loaded(ChapterId(1), 8, None, (800.0, 2000.0), &mut container);
    session.flush(&mut container, 1.0);
    assert_eq!(container.scroll_position().y, 1800.0);
}

#[test]
fn test_resizes_that_cancel_out_are_corrected() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 10), &mut container);
    session.scroll_to_unit(ChapterId(1), 5, ScrollBehavior::Instant, &mut container);
    session.flush(&mut container, 0.0);
    let reading = session.unit_node(ChapterId(1), 5).unwrap();
    let content = container.content_size();

    // One page above grows by what a separator below shrinks
    session.page_loaded(ChapterId(1), 2, None, (800.0, 1100.0), &mut container);
    session.page_loaded(ChapterId(1), 8, None, (800.0, 100.0), &mut container);
    assert_eq!(container.content_size(), content);
    session.flush(&mut container, 1.0);

    assert_eq!(client_top(&container, reading), 0.0);
    assert_eq!(container.scroll_position().y, 3500.0);
}

#[test]
fn test_flush_twice_is_stable() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 6), &mut container);
    scroll_to(&mut container, 1000.0);
    session.flush(&mut container, 0.0);

    session.page_loaded(ChapterId(1), 0, None, (800.0, 900.0), &mut container);
    session.flush(&mut container, 1.0);
    let position = container.scroll_position();

    session.flush(&mut container, 2.0);
    assert_eq!(container.scroll_position(), position);
}

// ============================================================================
// CHAPTER TRANSITIONS
// ============================================================================

#[test]
fn test_reading_forward_promotes_next_chapter_once() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 3), &mut container);
    session.mount_chapter(chapter(2, ChapterContext::Next, 3), &mut container);
    assert!(session.flush(&mut container, 0.0).is_empty());

    let mut requests = Vec::new();
    for step in 1..=60 {
        container.scroll_by(ScrollRequest::instant(0.0, 50.0));
        for request in session.flush(&mut container, step as f64) {
            assert!(session.apply_navigation(request, &mut container));
            requests.push(request);
        }
    }

    assert_eq!(
        requests,
        vec![NavigationRequest {
            action: NavigationAction::OpenChapter,
            target: AdjacentChapter::Next,
            chapter_id: ChapterId(2),
        }]
    );
    assert_eq!(session.current_chapter_id(), Some(ChapterId(2)));
    assert_eq!(
        session.chapter_id_with_context(ChapterContext::Previous),
        Some(ChapterId(1))
    );
}

#[test]
fn test_scrolling_back_mounts_then_opens_previous() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(5, ChapterContext::Current, 3), &mut container);
    scroll_to(&mut container, 400.0);
    session.flush(&mut container, 0.0);

    container.scroll_by(ScrollRequest::instant(0.0, -200.0));
    let requests = session.flush(&mut container, 1.0);
    assert_eq!(
        requests,
        vec![NavigationRequest {
            action: NavigationAction::MountChapter,
            target: AdjacentChapter::Previous,
            chapter_id: ChapterId(4),
        }]
    );

    // The host fetches chapter 4 and mounts it above; nothing moves
    let first = session.unit_node(ChapterId(5), 0).unwrap();
    let before = client_top(&container, first);
    session.mount_chapter(chapter(4, ChapterContext::Previous, 3), &mut container);
    assert!(session.flush(&mut container, 2.0).is_empty());
    assert_eq!(client_top(&container, first), before);
    assert_eq!(container.scroll_position().y, 2000.0);

    let mut requests = Vec::new();
    for step in 0..12 {
        container.scroll_by(ScrollRequest::instant(0.0, -100.0));
        for request in session.flush(&mut container, 3.0 + step as f64) {
            assert!(session.apply_navigation(request, &mut container));
            requests.push(request);
        }
    }
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, NavigationAction::OpenChapter);
    assert_eq!(requests[0].target, AdjacentChapter::Previous);
    assert_eq!(session.current_chapter_id(), Some(ChapterId(4)));
    assert_eq!(session.chapter_context(ChapterId(5)), Some(ChapterContext::Next));
}

#[test]
fn test_paged_mode_emits_no_transitions() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::SinglePageLtr);
    session.mount_chapter(chapter(1, ChapterContext::Current, 3), &mut container);
    session.flush(&mut container, 0.0);

    for step in 1..=40 {
        container.scroll_by(ScrollRequest::instant(0.0, 50.0));
        assert!(session.flush(&mut container, step as f64).is_empty());
    }
}

#[test]
fn test_promotion_drops_far_chapter_without_jump() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(2, ChapterContext::Current, 3), &mut container);
    session.mount_chapter(chapter(1, ChapterContext::Previous, 3), &mut container);
    session.mount_chapter(chapter(3, ChapterContext::Next, 6), &mut container);
    session.flush(&mut container, 0.0);

    let reading = session.unit_node(ChapterId(3), 0).unwrap();
    scroll_to(&mut container, 3700.0);
    session.flush(&mut container, 1.0);
    let before = client_top(&container, reading);

    let request = NavigationRequest {
        action: NavigationAction::OpenChapter,
        target: AdjacentChapter::Next,
        chapter_id: ChapterId(3),
    };
    assert!(session.apply_navigation(request, &mut container));
    session.flush(&mut container, 2.0);

    assert_eq!(session.chapter_ids(), vec![ChapterId(2), ChapterId(3)]);
    assert_eq!(client_top(&container, reading), before);
}

// ============================================================================
// AUTO-SCROLL
// ============================================================================

fn auto_scroll_config() -> ReaderConfig {
    ReaderConfig {
        auto_scroll: AutoScrollConfig {
            scroll_per_second: 10.0,
            scroll_amount_percentage: 10,
            smooth: false,
            ..AutoScrollConfig::default()
        },
        ..ReaderConfig::default()
    }
}

#[test]
fn test_auto_scroll_reads_into_next_chapter() {
    let (mut session, mut container) = reader(auto_scroll_config(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 3), &mut container);
    session.mount_chapter(chapter(2, ChapterContext::Next, 3), &mut container);
    session.flush(&mut container, 0.0);
    session.auto_scroll_mut().start();

    let mut requests = Vec::new();
    let mut t = 0.0;
    while t <= 4000.0 {
        requests.extend(session.advance(t, &mut container));
        t += 50.0;
    }

    // 40 ticks of 60px
    assert_eq!(container.scroll_position().y, 2400.0);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].chapter_id, ChapterId(2));
}

#[test]
fn test_auto_scroll_composes_with_correction() {
    let (mut session, mut container) = reader(auto_scroll_config(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 10), &mut container);
    scroll_to(&mut container, 1200.0);
    session.flush(&mut container, 0.0);
    session.auto_scroll_mut().start();

    session.advance(100.0, &mut container);
    assert_eq!(container.scroll_position().y, 1260.0);

    // An image above loads between two ticks
    session.page_loaded(ChapterId(1), 0, None, (800.0, 1000.0), &mut container);
    session.advance(150.0, &mut container);
    assert_eq!(container.scroll_position().y, 1660.0);

    session.advance(200.0, &mut container);
    assert_eq!(container.scroll_position().y, 1720.0);
}

#[test]
fn test_headless_auto_scroll() {
    let (mut session, _container) = reader(auto_scroll_config(), ReadingMode::ContinuousHorizontalRtl);
    session.auto_scroll_mut().start();

    let mut requests = Vec::new();
    let mut sink = Headless(|request: ScrollRequest| requests.push(request));
    let mut issued = 0;
    for t in (0..=500).step_by(50) {
        issued += session.advance_headless(t as f64, &mut sink);
    }
    drop(sink);

    assert_eq!(issued, 5);
    assert!(requests.iter().all(|r| r.dx == -80.0 && r.dy == 0.0));
}

#[test]
fn test_pause_and_resume_in_session() {
    let (mut session, mut container) = reader(auto_scroll_config(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 10), &mut container);
    session.flush(&mut container, 0.0);
    session.auto_scroll_mut().start();

    session.advance(100.0, &mut container);
    session.auto_scroll_mut().pause();
    session.advance(200.0, &mut container);
    assert_eq!(container.scroll_position().y, 60.0);

    session.auto_scroll_mut().resume();
    session.advance(300.0, &mut container);
    assert_eq!(container.scroll_position().y, 120.0);
    assert!(session.auto_scroll().state().is_active);
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_dispose_then_remount() {
    let (mut session, mut container) = reader(ReaderConfig::default(), ReadingMode::Webtoon);
    session.mount_chapter(chapter(1, ChapterContext::Current, 3), &mut container);
    session.flush(&mut container, 0.0);
    session.dispose(&mut container);
    assert!(!session.is_mounted());
    assert_eq!(container.child_count(), 0);

    session.mount(&mut container);
    assert!(session.mount_chapter(chapter(7, ChapterContext::Current, 2), &mut container));
    assert!(session.flush(&mut container, 1.0).is_empty());
    assert_eq!(session.current_chapter_id(), Some(ChapterId(7)));
    assert_eq!(container.child_count(), 2);

    // Only the new chapter's pages take part in preservation
    let reading = session.unit_node(ChapterId(7), 1).unwrap();
    scroll_to(&mut container, 600.0);
    session.flush(&mut container, 2.0);
    session.page_loaded(ChapterId(7), 0, None, (800.0, 900.0), &mut container);
    session.flush(&mut container, 3.0);
    assert_eq!(client_top(&container, reading), 0.0);
}

#[test]
fn test_config_from_json() {
    let config: ReaderConfig = serde_json::from_str(
        r#"{
            "preload_amount": 2,
            "boundary": { "intersection_threshold": 0.2 },
            "classifier": { "delta_threshold": 25.0 }
        }"#,
    )
    .unwrap();
    assert!(config.validate().is_ok());

    let session = ReaderSession::new(config, ReadingMode::ContinuousVertical).unwrap();
    assert_eq!(session.config().preload_amount, 2);
    assert_eq!(session.config().classifier.window_ms, 15_000);
}
