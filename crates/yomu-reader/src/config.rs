//! Reader Configuration
//!
//! Every heuristic constant the engine relies on lives here with its tuned
//! default. The settings layer persists this through serde; missing fields
//! fall back to the defaults.

use serde::{Deserialize, Serialize};

use crate::mode::ScrollAxis;

/// Upper bound for `ClassifierConfig::capacity`
pub const MAX_CLASSIFIER_CAPACITY: usize = 10_000;

/// Reader configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Page units preloaded ahead of / behind the current one
    pub preload_amount: usize,

    /// Show the first page alone in double-page modes
    pub offset_first_page: bool,

    /// Wheel step for wheel-like input, as a percentage of the viewport
    pub wheel_scroll_percentage: f64,

    pub auto_scroll: AutoScrollConfig,
    pub boundary: BoundaryConfig,
    pub classifier: ClassifierConfig,
    pub anchor: AnchorConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            preload_amount: 5,
            offset_first_page: false,
            wheel_scroll_percentage: 20.0,
            auto_scroll: AutoScrollConfig::default(),
            boundary: BoundaryConfig::default(),
            classifier: ClassifierConfig::default(),
            anchor: AnchorConfig::default(),
        }
    }
}

/// Auto-scroll settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScrollConfig {
    /// Scroll amounts per second
    pub scroll_per_second: f64,
    /// One scroll amount, as a percentage of the viewport (1..=100)
    pub scroll_amount_percentage: u8,
    /// Axis override; the reading mode decides when unset
    pub axis: Option<ScrollAxis>,
    /// Scroll against the reading direction
    pub invert: bool,
    /// Move a little every frame instead of jumping once per interval
    pub smooth: bool,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        Self {
            scroll_per_second: 0.1,
            scroll_amount_percentage: 100,
            axis: None,
            invert: false,
            smooth: true,
        }
    }
}

/// Chapter-boundary detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Visibility below which a boundary page counts as scrolled out
    pub intersection_threshold: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            intersection_threshold: 0.1,
        }
    }
}

/// Pointer/input classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Records older than this are ignored (ms)
    pub window_ms: u64,
    /// Records kept at most
    pub capacity: usize,
    /// Median deltas below this look like a trackpad (device pixels)
    pub delta_threshold: f64,
    /// Events after which the first classification happens
    pub warmup_events: usize,
    /// Minimum time between re-classifications (ms)
    pub evaluation_interval_ms: u64,
    /// Event rate used to normalize the simultaneous-axis count
    pub expected_events_per_second: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_ms: 15_000,
            capacity: 150,
            delta_threshold: 30.0,
            warmup_events: 5,
            evaluation_interval_ms: 3_000,
            expected_events_per_second: 10.0,
        }
    }
}

/// Scroll anchor selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Minimum visibility for an element to become the anchor
    pub intersection_threshold: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            intersection_threshold: 0.0,
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("scroll_per_second must be a positive number, got {0}")]
    ScrollPerSecond(f64),

    #[error("scroll_amount_percentage must be within 1..=100, got {0}")]
    ScrollAmountPercentage(u8),

    #[error("{name} must be within 0..=1, got {value}")]
    Threshold { name: &'static str, value: f64 },

    #[error("invalid classifier setting: {0}")]
    Classifier(&'static str),

    #[error("wheel_scroll_percentage must be within (0, 100], got {0}")]
    WheelScrollPercentage(f64),
}

impl ReaderConfig {
    /// Check every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auto_scroll.validate()?;

        check_threshold(
            "boundary.intersection_threshold",
            self.boundary.intersection_threshold,
        )?;
        check_threshold(
            "anchor.intersection_threshold",
            self.anchor.intersection_threshold,
        )?;

        let classifier = &self.classifier;
        if classifier.window_ms == 0 {
            return Err(ConfigError::Classifier("window_ms must be positive"));
        }
        if classifier.capacity == 0 || classifier.capacity > MAX_CLASSIFIER_CAPACITY {
            return Err(ConfigError::Classifier("capacity must be within 1..=10000"));
        }
        if !is_positive(classifier.delta_threshold) {
            return Err(ConfigError::Classifier("delta_threshold must be positive"));
        }
        if !is_positive(classifier.expected_events_per_second) {
            return Err(ConfigError::Classifier(
                "expected_events_per_second must be positive",
            ));
        }

        if !is_positive(self.wheel_scroll_percentage) || self.wheel_scroll_percentage > 100.0 {
            return Err(ConfigError::WheelScrollPercentage(self.wheel_scroll_percentage));
        }

        Ok(())
    }
}

impl AutoScrollConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.scroll_per_second) {
            return Err(ConfigError::ScrollPerSecond(self.scroll_per_second));
        }
        if !(1..=100).contains(&self.scroll_amount_percentage) {
            return Err(ConfigError::ScrollAmountPercentage(
                self.scroll_amount_percentage,
            ));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Threshold { name, value })
    }
}
