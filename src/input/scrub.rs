//! Touch-scrub recognition: a horizontal drag across a slide seeks through
//! the clip, while vertical motion stays with the feed's snap scroll.
//!
//! Timestamps are passed in by the caller so the state machine is testable
//! without a clock.

use std::time::{Duration, Instant};

/// Pointer movement below this many pixels is too small to classify.
const DEFAULT_ARM_THRESHOLD_PX: f64 = 8.0;

/// How long after a scrub ends the terminating tap keeps being swallowed.
const DEFAULT_CLICK_GUARD_MS: u64 = 250;

#[derive(Debug, Clone, Copy)]
pub struct ScrubConfig {
    pub arm_threshold_px: f64,
    pub click_guard: Duration,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            arm_threshold_px: DEFAULT_ARM_THRESHOLD_PX,
            click_guard: Duration::from_millis(DEFAULT_CLICK_GUARD_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    /// Pointer down, direction not yet decided.
    Pending { start_x: f64, start_y: f64 },
    /// Horizontal drag owns the pointer; every motion seeks.
    Scrubbing,
    /// Movement was vertical; the native scroll owns this gesture until
    /// release.
    Ceded,
}

pub struct ScrubGesture {
    config: ScrubConfig,
    phase: Phase,
    /// Playback position when the pointer went down.
    start_position: f64,
    /// When the last scrub ended, for the click guard.
    last_scrub_end: Option<Instant>,
}

impl ScrubGesture {
    pub fn new(config: ScrubConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            start_position: 0.0,
            last_scrub_end: None,
        }
    }

    /// Pointer down: record the starting coordinates and the playback
    /// position at that moment.
    pub fn begin(&mut self, x: f64, y: f64, position: f64) {
        self.phase = Phase::Pending {
            start_x: x,
            start_y: y,
        };
        self.start_position = position;
    }

    /// Pointer motion. Returns the position fraction (0 at the slide's left
    /// edge, 1 at its right) to seek to, once the gesture has armed as a
    /// scrub; `None` otherwise.
    pub fn motion(&mut self, x: f64, y: f64, width: f64) -> Option<f64> {
        match self.phase {
            Phase::Pending { start_x, start_y } => {
                let dx = (x - start_x).abs();
                let dy = (y - start_y).abs();
                if dx >= self.config.arm_threshold_px && dx > dy {
                    self.phase = Phase::Scrubbing;
                    Some(fraction_of(x, width))
                } else {
                    if dy >= self.config.arm_threshold_px && dy >= dx {
                        self.phase = Phase::Ceded;
                    }
                    None
                }
            }
            Phase::Scrubbing => Some(fraction_of(x, width)),
            Phase::Idle | Phase::Ceded => None,
        }
    }

    /// Pointer up. Starts the click-guard window when a scrub just ended.
    pub fn end(&mut self, at: Instant) {
        if self.phase == Phase::Scrubbing {
            self.last_scrub_end = Some(at);
        }
        self.phase = Phase::Idle;
    }

    pub fn is_scrubbing(&self) -> bool {
        self.phase == Phase::Scrubbing
    }

    /// Playback position recorded at pointer down.
    pub fn start_position(&self) -> f64 {
        self.start_position
    }

    /// Whether a click arriving at `at` is the tail of a scrub and must not
    /// be treated as a play/pause toggle.
    pub fn suppresses_click(&self, at: Instant) -> bool {
        if self.phase == Phase::Scrubbing {
            return true;
        }
        match self.last_scrub_end {
            Some(end) => at.saturating_duration_since(end) <= self.config.click_guard,
            None => false,
        }
    }
}

impl Default for ScrubGesture {
    fn default() -> Self {
        Self::new(ScrubConfig::default())
    }
}

fn fraction_of(x: f64, width: f64) -> f64 {
    if width <= 0.0 || !width.is_finite() {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0)
}
