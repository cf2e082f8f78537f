//! Load session record and observable state

use crate::classify::LoadFailure;
use crate::handshake::Readiness;
use crate::progress::ProgressEstimator;
use crate::session::{CorrelationId, LoadToken};
use crate::transfer::DocumentFile;
use serde::Serialize;

/// Where a load attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingReady,
    Transferring,
    Loaded,
    Cancelled,
    Errored,
}

impl Phase {
    /// A load is in flight: the host shows it as busy and timeouts run.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::AwaitingReady | Self::Transferring)
    }
}

/// The one record describing the current load attempt.
#[derive(Debug)]
pub struct LoadSession {
    pub token: LoadToken,
    pub load_id: CorrelationId,
    pub file: DocumentFile,
    pub phase: Phase,
    pub progress: ProgressEstimator,
    /// Token the host cancelled itself, until the engine acknowledges it.
    pub manual_cancel: Option<LoadToken>,
    pub transfer_started: bool,
    pub load_posted: bool,
    pub fallback_used: bool,
    pub page_count: Option<u32>,
    pub rendered: bool,
    pub failure: Option<LoadFailure>,
}

impl LoadSession {
    pub fn new(
        token: LoadToken,
        load_id: CorrelationId,
        file: DocumentFile,
        progress: ProgressEstimator,
    ) -> Self {
        Self {
            token,
            load_id,
            file,
            phase: Phase::AwaitingReady,
            progress,
            manual_cancel: None,
            transfer_started: false,
            load_posted: false,
            fallback_used: false,
            page_count: None,
            rendered: false,
            failure: None,
        }
    }
}

/// Point-in-time view of the host state, published after every event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSnapshot {
    pub phase: Phase,
    pub token: Option<LoadToken>,
    pub file_name: Option<String>,
    pub busy: bool,
    pub progress: u8,
    pub error: Option<String>,
    pub external_warning: Option<String>,
    pub cancelled: bool,
    pub page_count: Option<u32>,
    pub rendered: bool,
    pub readiness: Readiness,
    pub frame_loaded: bool,
    pub dirty: bool,
    pub fallback_used: bool,
}

impl Default for LoadSnapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            token: None,
            file_name: None,
            busy: false,
            progress: 0,
            error: None,
            external_warning: None,
            cancelled: false,
            page_count: None,
            rendered: false,
            readiness: Readiness::Unknown,
            frame_loaded: false,
            dirty: false,
            fallback_used: false,
        }
    }
}
