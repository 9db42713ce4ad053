//! Pointer/Input Classifier
//!
//! Guesses whether wheel events come from a notched mouse wheel or from a
//! trackpad-like device with fine-grained deltas. The verdict only tunes
//! scroll amounts; nothing else depends on it.

use std::collections::VecDeque;

use crate::config::ClassifierConfig;

/// Wheel event deltas, in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelEvent {
    pub delta_x: f64,
    pub delta_y: f64,
}

impl WheelEvent {
    pub fn new(delta_x: f64, delta_y: f64) -> Self {
        Self { delta_x, delta_y }
    }

    fn is_empty(&self) -> bool {
        self.delta_x == 0.0 && self.delta_y == 0.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    time_ms: f64,
    dx: f64,
    dy: f64,
}

impl Sample {
    fn is_simultaneous(&self) -> bool {
        self.dx != 0.0 && self.dy != 0.0
    }
}

/// Wheel-versus-trackpad heuristic over a bounded sliding window
#[derive(Debug)]
pub struct PointerClassifier {
    config: ClassifierConfig,
    attached: bool,
    samples: VecDeque<Sample>,
    total_events: usize,
    last_evaluation_ms: Option<f64>,
    trackpad_like: bool,
}

impl PointerClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            samples: VecDeque::new(),
            config,
            attached: false,
            total_events: 0,
            last_evaluation_ms: None,
            trackpad_like: false,
        }
    }

    /// Start listening; called when the reader mounts
    pub fn init(&mut self) {
        if self.attached {
            return;
        }
        self.attached = true;
        tracing::debug!("pointer classifier attached");
    }

    /// Stop listening and forget everything recorded
    pub fn dispose(&mut self) {
        self.attached = false;
        self.samples.clear();
        self.total_events = 0;
        self.last_evaluation_ms = None;
        self.trackpad_like = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Last verdict. `false` until enough input was seen.
    pub fn is_trackpad_like(&self) -> bool {
        self.trackpad_like
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Record one wheel event
    pub fn record_wheel(&mut self, event: WheelEvent, now_ms: f64) {
        if !self.attached || event.is_empty() {
            return;
        }

        self.samples.push_back(Sample {
            time_ms: now_ms,
            dx: event.delta_x,
            dy: event.delta_y,
        });
        self.total_events += 1;
        self.prune(now_ms);

        if self.total_events == self.config.warmup_events || self.evaluation_due(now_ms) {
            self.evaluate(now_ms);
        }
    }

    /// Periodic re-evaluation
    pub fn tick(&mut self, now_ms: f64) {
        if self.attached && self.total_events > 0 && self.evaluation_due(now_ms) {
            self.evaluate(now_ms);
        }
    }

    fn evaluation_due(&self, now_ms: f64) -> bool {
        match self.last_evaluation_ms {
            Some(last) => now_ms - last >= self.config.evaluation_interval_ms as f64,
            None => self.total_events >= self.config.warmup_events,
        }
    }

    fn prune(&mut self, now_ms: f64) {
        let oldest = now_ms - self.config.window_ms as f64;
        while self.samples.front().is_some_and(|s| s.time_ms < oldest) {
            self.samples.pop_front();
        }
        while self.samples.len() > self.config.capacity {
            self.samples.pop_front();
        }
    }

    fn evaluate(&mut self, now_ms: f64) {
        self.prune(now_ms);
        self.last_evaluation_ms = Some(now_ms);

        let verdict = self.classify();
        if verdict != self.trackpad_like {
            tracing::info!(
                "input classified as {}",
                if verdict { "trackpad-like" } else { "wheel" }
            );
        }
        self.trackpad_like = verdict;
    }

    fn classify(&self) -> bool {
        if self.samples.is_empty() {
            return false;
        }

        let threshold = self.config.delta_threshold;
        let small_x = median_abs(self.samples.iter().map(|s| s.dx)).is_some_and(|m| m < threshold);
        let small_y = median_abs(self.samples.iter().map(|s| s.dy)).is_some_and(|m| m < threshold);
        if small_x || small_y {
            return true;
        }

        let simultaneous = self.samples.iter().filter(|s| s.is_simultaneous()).count();
        simultaneous as f64 * 2.0 >= self.expected_events()
    }

    /// Events expected over the window span, clamped to `[1, samples]`
    fn expected_events(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 1.0;
        };
        let span_s = (last.time_ms - first.time_ms) / 1000.0;
        let expected = span_s * self.config.expected_events_per_second;
        expected.clamp(1.0, self.samples.len().max(1) as f64)
    }
}

/// Median of the non-zero absolute values, `None` when all are zero
fn median_abs(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.filter(|v| *v != 0.0).map(f64::abs).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
