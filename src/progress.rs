//! Load progress estimation
//!
//! Until the engine reports real progress, the host shows a synthetic,
//! ease-out estimate capped at 95. Real progress takes over permanently for
//! the session. Only a completed load reaches 100.

use std::time::{Duration, Instant};

/// Ceiling for any value before the load completes.
pub const PROGRESS_CEILING: u8 = 95;

/// Timing of the synthetic estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTiming {
    /// Delay between the session going busy and the first tick.
    pub start_delay: Duration,
    pub tick: Duration,
    /// Time for the eased curve to reach the ceiling.
    pub ease: Duration,
}

impl Default for ProgressTiming {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(250),
            tick: Duration::from_millis(100),
            ease: Duration::from_millis(2800),
        }
    }
}

/// Result of one synthetic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// The value changed to this.
    pub value: Option<u8>,
    /// Schedule another tick.
    pub again: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    value: u8,
    has_real: bool,
    started_at: Option<Instant>,
    ticking: bool,
    timing: ProgressTiming,
}

impl ProgressEstimator {
    pub fn new(timing: ProgressTiming) -> Self {
        Self {
            value: 0,
            has_real: false,
            started_at: None,
            ticking: false,
            timing,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn has_real_progress(&self) -> bool {
        self.has_real
    }

    pub fn timing(&self) -> ProgressTiming {
        self.timing
    }

    /// Start a new session at 0. The synthetic curve is measured from `now`.
    pub fn begin(&mut self, now: Instant) {
        self.value = 0;
        self.has_real = false;
        self.started_at = Some(now);
        self.ticking = false;
    }

    /// The start delay lapsed. Returns false when synthetic ticks should not
    /// run at all.
    pub fn start_ticking(&mut self) -> bool {
        if self.has_real || self.started_at.is_none() || self.value >= PROGRESS_CEILING {
            return false;
        }
        self.ticking = true;
        true
    }

    pub fn synthetic_tick(&mut self, now: Instant) -> Tick {
        let Some(started) = self.started_at.filter(|_| self.ticking && !self.has_real) else {
            return Tick { value: None, again: false };
        };
        let target = eased(now.saturating_duration_since(started), self.timing.ease);
        let changed = self.raise(target);
        let again = target < PROGRESS_CEILING && self.value < PROGRESS_CEILING;
        if !again {
            self.ticking = false;
        }
        Tick { value: changed, again }
    }

    /// Real progress from the engine. Ignored when `total` is absent or not
    /// positive. Disables synthetic ticks for the rest of the session even
    /// when the mapped value does not raise the displayed one.
    pub fn real(&mut self, loaded: f64, total: Option<f64>) -> Option<u8> {
        let total = total.filter(|t| t.is_finite() && *t > 0.0)?;
        if !loaded.is_finite() {
            return None;
        }
        self.has_real = true;
        self.ticking = false;
        let ratio = (loaded / total).clamp(0.0, 1.0);
        let pct = ((ratio * f64::from(PROGRESS_CEILING)).round() as u8).min(PROGRESS_CEILING);
        self.raise(pct)
    }

    /// The document loaded.
    pub fn complete(&mut self) -> Option<u8> {
        self.ticking = false;
        self.raise(100)
    }

    /// Stop synthetic ticks. The value is kept.
    pub fn stop(&mut self) {
        self.ticking = false;
        self.started_at = None;
    }

    fn raise(&mut self, next: u8) -> Option<u8> {
        if next > self.value {
            self.value = next;
            Some(next)
        } else {
            None
        }
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(ProgressTiming::default())
    }
}

fn eased(elapsed: Duration, ease: Duration) -> u8 {
    if ease.is_zero() {
        return PROGRESS_CEILING;
    }
    let t = (elapsed.as_secs_f64() / ease.as_secs_f64()).min(1.0);
    let curve = 1.0 - (1.0 - t).powi(3);
    (curve * f64::from(PROGRESS_CEILING)).round() as u8
}
