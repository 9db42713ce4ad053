//! Auto-Scroll Controller
//!
//! Periodic programmatic scrolling. Time is virtual: the host reports the
//! clock through [`AutoScrollController::advance`] and the controller fires
//! every tick that became due since the last call.

use std::sync::atomic::{AtomicU32, Ordering};

use yomu_dom::{ScrollRequest, ScrollSink};

use crate::config::{AutoScrollConfig, ConfigError};
use crate::mode::{ReadingMode, ScrollAxis, TextDirection};

static TIMER_ID: AtomicU32 = AtomicU32::new(1);

/// One animation frame
const FRAME_MS: f64 = 16.0;

/// Smallest movement a tick may make (px)
const MIN_TICK_PX: f64 = 1.0;

/// Direction relative to reading order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    #[default]
    Forward,
    Backward,
}

impl ScrollDirection {
    pub fn reversed(self) -> Self {
        match self {
            ScrollDirection::Forward => ScrollDirection::Backward,
            ScrollDirection::Backward => ScrollDirection::Forward,
        }
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AutoScrollStatus {
    #[default]
    Inert,
    Active,
    Paused,
}

/// Snapshot of the controller state
#[derive(Debug, Clone, PartialEq)]
pub struct AutoScrollState {
    pub is_active: bool,
    pub is_paused: bool,
    pub direction: ScrollDirection,
    pub invert: bool,
    pub scroll_per_second: f64,
    pub scroll_amount_percentage: u8,
    pub smooth: bool,
}

/// Repeating virtual timer
#[derive(Debug, Clone, Copy)]
struct IntervalTimer {
    id: u32,
    period_ms: f64,
    next_due_ms: f64,
    last_fire_ms: Option<f64>,
}

impl IntervalTimer {
    fn new(period_ms: f64, now_ms: f64) -> Self {
        Self {
            id: TIMER_ID.fetch_add(1, Ordering::SeqCst),
            period_ms,
            next_due_ms: now_ms + period_ms,
            last_fire_ms: None,
        }
    }

    /// Same schedule origin, new period
    fn rescheduled(&self, period_ms: f64, now_ms: f64) -> Self {
        let origin = self.last_fire_ms.unwrap_or(self.next_due_ms - self.period_ms);
        Self {
            id: TIMER_ID.fetch_add(1, Ordering::SeqCst),
            period_ms,
            next_due_ms: (origin + period_ms).max(now_ms),
            last_fire_ms: self.last_fire_ms,
        }
    }

    /// Fire at most once, skipping periods that were missed entirely
    fn poll(&mut self, now_ms: f64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        let missed = ((now_ms - self.next_due_ms) / self.period_ms).floor();
        let fired_at = self.next_due_ms + missed * self.period_ms;
        self.last_fire_ms = Some(fired_at);
        self.next_due_ms = fired_at + self.period_ms;
        true
    }
}

/// Timer-driven programmatic scroller
#[derive(Debug)]
pub struct AutoScrollController {
    config: AutoScrollConfig,
    mode: ReadingMode,
    text_direction: TextDirection,
    viewport: (f64, f64),
    direction: ScrollDirection,
    status: AutoScrollStatus,
    timer: Option<IntervalTimer>,
    clock_ms: f64,
}

impl AutoScrollController {
    pub fn new(config: AutoScrollConfig, mode: ReadingMode) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            mode,
            text_direction: TextDirection::Ltr,
            viewport: (0.0, 0.0),
            direction: ScrollDirection::Forward,
            status: AutoScrollStatus::Inert,
            timer: None,
            clock_ms: 0.0,
        })
    }

    pub fn status(&self) -> AutoScrollStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status != AutoScrollStatus::Inert
    }

    pub fn is_paused(&self) -> bool {
        self.status == AutoScrollStatus::Paused
    }

    pub fn state(&self) -> AutoScrollState {
        AutoScrollState {
            is_active: self.is_active(),
            is_paused: self.is_paused(),
            direction: self.direction,
            invert: self.config.invert,
            scroll_per_second: self.config.scroll_per_second,
            scroll_amount_percentage: self.config.scroll_amount_percentage,
            smooth: self.config.smooth,
        }
    }

    pub fn config(&self) -> &AutoScrollConfig {
        &self.config
    }

    /// Current tick period, if running
    pub fn period_ms(&self) -> Option<f64> {
        self.timer.map(|t| t.period_ms)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Inert -> Active; the first tick is one period away
    pub fn start(&mut self) {
        if self.status != AutoScrollStatus::Inert {
            return;
        }
        let timer = IntervalTimer::new(self.period(), self.clock_ms);
        tracing::debug!(
            "auto-scroll started: timer {} every {:.1}ms",
            timer.id,
            timer.period_ms
        );
        self.timer = Some(timer);
        self.status = AutoScrollStatus::Active;
    }

    /// Any state -> Inert
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            tracing::debug!("auto-scroll cancelled: timer {}", timer.id);
        }
        self.status = AutoScrollStatus::Inert;
    }

    /// Keep the timer running but stop scrolling
    pub fn pause(&mut self) {
        if self.status == AutoScrollStatus::Active {
            self.status = AutoScrollStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == AutoScrollStatus::Paused {
            self.status = AutoScrollStatus::Active;
        }
    }

    /// Start when inert, otherwise cancel
    pub fn toggle(&mut self) {
        match self.status {
            AutoScrollStatus::Inert => self.start(),
            _ => self.cancel(),
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.status {
            AutoScrollStatus::Active => self.pause(),
            AutoScrollStatus::Paused => self.resume(),
            AutoScrollStatus::Inert => {}
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Change speed, amount, axis, invert or smoothness. The tick phase is
    /// kept.
    pub fn set_config(&mut self, config: AutoScrollConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.reschedule();
        Ok(())
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        self.reschedule();
    }

    pub fn set_mode(&mut self, mode: ReadingMode) {
        self.mode = mode;
        self.reschedule();
    }

    pub fn set_text_direction(&mut self, text_direction: TextDirection) {
        self.text_direction = text_direction;
    }

    pub fn set_direction(&mut self, direction: ScrollDirection) {
        self.direction = direction;
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    fn reschedule(&mut self) {
        let period = self.period();
        if let Some(timer) = self.timer.as_mut() {
            if timer.period_ms == period {
                return;
            }
            let next = timer.rescheduled(period, self.clock_ms);
            tracing::trace!(
                "auto-scroll timer {} -> {}: {:.1}ms",
                timer.id,
                next.id,
                period
            );
            *timer = next;
        }
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Advance the clock and fire the tick if one became due.
    ///
    /// Returns the number of scroll requests issued.
    pub fn advance(&mut self, now_ms: f64, sink: &mut dyn ScrollSink) -> usize {
        self.clock_ms = self.clock_ms.max(now_ms);
        let Some(timer) = self.timer.as_mut() else {
            return 0;
        };
        if !timer.poll(self.clock_ms) || self.status != AutoScrollStatus::Active {
            return 0;
        }

        let request = self.tick_request();
        if request.is_noop() {
            return 0;
        }
        sink.scroll_by(request);
        1
    }

    fn axis(&self) -> ScrollAxis {
        self.config.axis.unwrap_or_else(|| self.mode.scroll_axis())
    }

    /// Pixels per second on each axis
    fn speed(&self) -> (f64, f64) {
        let axis = self.axis();
        let fraction = f64::from(self.config.scroll_amount_percentage) / 100.0;
        let per_second = |extent: f64, enabled: bool| {
            if enabled {
                extent * fraction * self.config.scroll_per_second
            } else {
                0.0
            }
        };
        (
            per_second(self.viewport.0, axis.has_x()),
            per_second(self.viewport.1, axis.has_y()),
        )
    }

    /// Tick period, stretched so each tick moves at least one pixel
    fn period(&self) -> f64 {
        let base = if self.config.smooth {
            FRAME_MS
        } else {
            1000.0 / self.config.scroll_per_second
        };

        let (x, y) = self.speed();
        let slowest = [x, y]
            .into_iter()
            .filter(|v| *v > 0.0)
            .fold(f64::INFINITY, f64::min);
        if !slowest.is_finite() {
            return base;
        }

        if slowest * base / 1000.0 < MIN_TICK_PX {
            MIN_TICK_PX * 1000.0 / slowest
        } else {
            base
        }
    }

    fn tick_request(&self) -> ScrollRequest {
        let period_s = self.timer.map_or(0.0, |t| t.period_ms) / 1000.0;
        let (x, y) = self.speed();

        let mut sign = 1.0;
        if self.direction == ScrollDirection::Backward {
            sign = -sign;
        }
        if self.config.invert {
            sign = -sign;
        }
        let x_sign = match self.mode.horizontal_flow(self.text_direction) {
            TextDirection::Rtl => -sign,
            TextDirection::Ltr => sign,
        };

        ScrollRequest::instant(x * period_s * x_sign, y * period_s * sign)
    }
}
