//! Engine readiness handshake
//!
//! The engine boots independently of the host frame, usually later. Once
//! the frame is up the host probes with `ping` on a fixed interval until the
//! engine answers `ready` or the attempt budget runs out.

use serde::Serialize;
use std::time::Duration;

/// Default interval between probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(1000);

/// Default number of probes per engine context.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 10;

/// Engine readiness. Only moves forward within one engine context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Unknown,
    Handshaking,
    Ready,
}

/// What the caller should do after a handshake step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStep {
    /// Send a `ping` now.
    pub send_ping: bool,
    /// Schedule the next probe after this delay, tagged with `epoch`.
    pub next: Option<Duration>,
    pub epoch: u64,
}

#[derive(Debug, Clone)]
pub struct Handshake {
    readiness: Readiness,
    attempts: u32,
    max_attempts: u32,
    interval: Duration,
    /// Bumped whenever probing stops or restarts so that late probe timers
    /// can be recognized and ignored.
    epoch: u64,
}

impl Handshake {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            readiness: Readiness::Unknown,
            attempts: 0,
            max_attempts,
            interval,
            epoch: 0,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The host frame finished loading. Starts probing unless the engine is
    /// already ready; the first probe goes out immediately.
    pub fn on_frame_loaded(&mut self) -> Option<ProbeStep> {
        if self.readiness == Readiness::Ready {
            return None;
        }
        self.readiness = Readiness::Handshaking;
        self.attempts = 0;
        self.epoch += 1;
        Some(self.probe())
    }

    /// A probe timer fired. Timers from an earlier epoch are ignored.
    pub fn on_probe_timer(&mut self, epoch: u64) -> Option<ProbeStep> {
        if epoch != self.epoch
            || self.readiness != Readiness::Handshaking
            || self.attempts >= self.max_attempts
        {
            return None;
        }
        Some(self.probe())
    }

    /// The engine answered. Returns true on the first transition to ready.
    pub fn on_ready(&mut self) -> bool {
        if self.readiness == Readiness::Ready {
            return false;
        }
        self.readiness = Readiness::Ready;
        self.epoch += 1;
        true
    }

    /// A new engine context: back to `Unknown`, outstanding probes dropped.
    pub fn reset(&mut self) {
        self.readiness = Readiness::Unknown;
        self.attempts = 0;
        self.epoch += 1;
    }

    fn probe(&mut self) -> ProbeStep {
        self.attempts += 1;
        let next = (self.attempts < self.max_attempts).then_some(self.interval);
        ProbeStep {
            send_ping: true,
            next,
            epoch: self.epoch,
        }
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_ATTEMPTS)
    }
}
