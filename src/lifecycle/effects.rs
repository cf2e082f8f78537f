//! Effects requested by the lifecycle and events it publishes
//!
//! The lifecycle never performs I/O. Each handler returns the effects the
//! runtime must carry out; completions come back as new inputs.

use crate::classify::LoadFailure;
use crate::protocol::HostCommand;
use crate::session::LoadToken;
use crate::transfer::{DocumentFile, PendingTransfer, WriteBackOutcome};
use bytes::Bytes;
use std::time::Duration;

/// One-shot timers the lifecycle schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    FrameLoad,
    Fallback,
    EngineReady,
    LoadDeadline,
    ProgressStart,
    ProgressTick,
    Probe,
}

impl TimerKind {
    /// Timers that belong to a load session and die with it.
    pub const SESSION: [TimerKind; 6] = [
        Self::FrameLoad,
        Self::Fallback,
        Self::EngineReady,
        Self::LoadDeadline,
        Self::ProgressStart,
        Self::ProgressTick,
    ];
}

/// A scheduled timer. `generation` is the session token value, or the
/// handshake epoch for probes; a firing whose generation is no longer
/// current is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug)]
pub enum Effect {
    /// Encode and post a command to the engine.
    Post(HostCommand),
    /// Materialize the inline bytes, then report back with
    /// `payload_ready(token, payload)`.
    Materialize {
        token: LoadToken,
        transfer: PendingTransfer,
    },
    /// Start (or restart) a timer; replaces any running timer of the same kind.
    Schedule { timer: Timer, after: Duration },
    CancelTimer(TimerKind),
    Notify(LoadEvent),
    /// Write the loaded document to the cache after the configured delay.
    ScheduleWriteBack { token: LoadToken, file: DocumentFile },
    CancelWriteBack,
    /// Store a downloaded document in the cache.
    StoreOutput { name: String, bytes: Bytes },
}

/// Notifications for observers of the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Accepted { token: LoadToken, file_name: String },
    EngineReady,
    Progress { token: LoadToken, value: u8 },
    Loaded { token: LoadToken, page_count: Option<u32> },
    Rendered { token: LoadToken },
    /// Terminal failure of a load attempt.
    Failed {
        token: LoadToken,
        failure: LoadFailure,
        message: String,
    },
    Cancelled { token: LoadToken },
    /// A user-facing error notice, already deduplicated.
    ErrorNotice { message: String },
    Warning { message: String },
    OpenTool { tool: String },
    Downloaded { file_name: String, bytes: Bytes },
    SaveProgress { phase: Option<String> },
    DirtyChanged { dirty: bool },
    InputCached { token: LoadToken },
    /// The write-back ran but stored nothing.
    InputCacheSkipped {
        token: LoadToken,
        outcome: WriteBackOutcome,
    },
    InputCacheFailed { token: LoadToken, message: String },
}
