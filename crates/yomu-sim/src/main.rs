//! Yomu Sim - scripted reader session
//!
//! Reads a webtoon front to back against the simulated scroll container:
//! a few wheel notches first, then auto-scroll until the last chapter ends.
//! Page images "load" as they enter the preload window and every navigation
//! request the reader emits is acted on the way a host app would.
//!
//! ```text
//! yomu-sim [CONFIG.json] [CHAPTERS]
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;
use yomu_dom::{LayoutAxis, ScrollContainer, ScrollSink};
use yomu_reader::{
    AdjacentChapter, ChapterContext, ChapterId, ChapterMount, NavigationAction,
    NavigationRequest, Page, ReaderConfig, ReaderSession, ReadingMode, WheelEvent,
};

const VIEWPORT: (f64, f64) = (800.0, 600.0);
const PAGES_PER_CHAPTER: usize = 8;
const FRAME_MS: f64 = 16.0;
const WHEEL_NOTCHES: usize = 6;
const TIME_LIMIT_MS: f64 = 10.0 * 60.0 * 1000.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("yomu-reader v{}", yomu_reader::VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => ReaderConfig::default(),
    };
    let chapter_count = match args.next() {
        Some(count) => count
            .parse::<u64>()
            .with_context(|| format!("invalid chapter count {count:?}"))?,
        None => 3,
    };

    let mut sim = Simulation::new(config, chapter_count)?;
    sim.run()?;
    Ok(())
}

fn load_config(path: &Path) -> Result<ReaderConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: ReaderConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Natural size of a page image; every third page is a tall strip
fn image_size(chapter_id: ChapterId, page: usize) -> (f64, f64) {
    let height = if (chapter_id.0 as usize + page) % 3 == 0 { 1800.0 } else { 1100.0 };
    (VIEWPORT.0, height)
}

/// Pages whose first request fails
fn is_flaky(chapter_id: ChapterId, page: usize) -> bool {
    (chapter_id.0 as usize * PAGES_PER_CHAPTER + page) % 7 == 3
}

struct Simulation {
    session: ReaderSession,
    container: ScrollContainer,
    chapter_count: u64,
    now_ms: f64,
    opened: Vec<ChapterId>,
}

impl Simulation {
    fn new(config: ReaderConfig, chapter_count: u64) -> Result<Self> {
        if chapter_count == 0 {
            bail!("at least one chapter is needed");
        }

        let mut container = ScrollContainer::new(LayoutAxis::Vertical, VIEWPORT.0, VIEWPORT.1);
        let mut session = ReaderSession::new(config, ReadingMode::Webtoon)?;
        session.mount(&mut container);

        let mut sim = Self {
            session,
            container,
            chapter_count,
            now_ms: 0.0,
            opened: vec![ChapterId(1)],
        };
        sim.mount(ChapterId(1), ChapterContext::Current)?;
        if chapter_count > 1 {
            sim.mount(ChapterId(2), ChapterContext::Next)?;
        }
        sim.session.flush(&mut sim.container, 0.0);
        Ok(sim)
    }

    fn chapter(&self, chapter_id: ChapterId, context: ChapterContext) -> ChapterMount {
        let pages = (0..PAGES_PER_CHAPTER)
            .map(|i| Page::new(i, format!("https://cdn.yomu.app/{}/{i}.webp", chapter_id.0)))
            .collect();
        ChapterMount {
            chapter_id,
            context,
            pages,
            previous_chapter_id: (chapter_id.0 > 1).then(|| ChapterId(chapter_id.0 - 1)),
            next_chapter_id: (chapter_id.0 < self.chapter_count).then(|| ChapterId(chapter_id.0 + 1)),
        }
    }

    fn mount(&mut self, chapter_id: ChapterId, context: ChapterContext) -> Result<()> {
        let mount = self.chapter(chapter_id, context);
        if !self.session.mount_chapter(mount, &mut self.container) {
            bail!("could not mount {chapter_id} as {context:?}");
        }
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.wheel()?;

        self.session.auto_scroll_mut().start();
        while self.now_ms < TIME_LIMIT_MS {
            self.step(FRAME_MS)?;
            if self.at_end() {
                tracing::info!("reached the end of {}", ChapterId(self.chapter_count));
                break;
            }
        }
        self.session.auto_scroll_mut().cancel();

        let current = self.session.current_chapter_id();
        tracing::info!(
            "read {} chapters in {:.1}s; now on {:?} unit {:?} at {:.0}px",
            self.opened.len(),
            self.now_ms / 1000.0,
            current,
            current.and_then(|id| self.session.current_unit(id)),
            self.container.scroll_position().y
        );
        Ok(())
    }

    /// A few notches of a classic mouse wheel
    fn wheel(&mut self) -> Result<()> {
        for _ in 0..WHEEL_NOTCHES {
            let event = WheelEvent::new(0.0, 120.0);
            self.session.on_wheel(event, self.now_ms);
            let request = self.session.wheel_scroll(event, &self.container);
            self.container.scroll_by(request);

            // Let the smooth scroll play out
            for _ in 0..20 {
                self.step(FRAME_MS)?;
            }
        }
        tracing::info!(
            "wheel input is {}",
            if self.session.is_trackpad_like() { "trackpad-like" } else { "wheel-like" }
        );
        Ok(())
    }

    fn step(&mut self, delta_ms: f64) -> Result<()> {
        self.now_ms += delta_ms;
        self.load_pages();
        for request in self.session.advance(self.now_ms, &mut self.container) {
            self.navigate(request)?;
        }
        Ok(())
    }

    /// Answer every image request in the preload window. Flaky pages fail
    /// once and are retried with a fresh key.
    fn load_pages(&mut self) {
        for chapter_id in self.session.chapter_ids() {
            for page in self.session.indexes_to_load(chapter_id) {
                let Some(state) = self.session.load_state(chapter_id, page) else {
                    continue;
                };
                if state.loaded() {
                    continue;
                }
                let key = state.retry_key();
                tracing::trace!("loading {}", state.src());

                if state.error() {
                    if let Some(key) = self.session.retry_page(chapter_id, page) {
                        tracing::info!("retrying {} page {} ({:?})", chapter_id, page, key);
                    }
                } else if key.is_none() && is_flaky(chapter_id, page) {
                    tracing::warn!("{} page {} failed to load", chapter_id, page);
                    self.session.page_failed(chapter_id, page, None);
                } else {
                    self.session.page_loaded(
                        chapter_id,
                        page,
                        key,
                        image_size(chapter_id, page),
                        &mut self.container,
                    );
                }
            }
        }
    }

    fn navigate(&mut self, request: NavigationRequest) -> Result<()> {
        let context = match request.target {
            AdjacentChapter::Previous => ChapterContext::Previous,
            AdjacentChapter::Next => ChapterContext::Next,
        };

        match request.action {
            NavigationAction::MountChapter => self.mount(request.chapter_id, context)?,
            NavigationAction::OpenChapter => {
                if !self.session.apply_navigation(request, &mut self.container) {
                    self.mount(request.chapter_id, context)?;
                    if !self.session.apply_navigation(request, &mut self.container) {
                        bail!("could not open {}", request.chapter_id);
                    }
                }
                self.opened.push(request.chapter_id);

                let following = ChapterId(request.chapter_id.0 + 1);
                if request.target == AdjacentChapter::Next && following.0 <= self.chapter_count {
                    self.mount(following, ChapterContext::Next)?;
                }
            }
        }
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.session.current_chapter_id() == Some(ChapterId(self.chapter_count))
            && self.container.scroll_position().y >= self.container.max_scroll().y
    }
}
