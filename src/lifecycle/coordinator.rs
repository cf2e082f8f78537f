//! The load lifecycle state machine
//!
//! `LoadCoordinator` owns every piece of mutable load state: the token
//! ledger, correlation cache, handshake, transfer strategy and the current
//! session record. Handlers are synchronous; each returns the effects the
//! runtime has to perform. Any input addressed to a token that is no longer
//! active is dropped before it can change anything.

use super::effects::{Effect, LoadEvent, Timer, TimerKind};
use super::state::{LoadSession, LoadSnapshot, Phase};
use crate::classify::{
    classify_engine_error, classify_host_error, external_content_message, ErrorNotifier,
    LoadFailure, Severity,
};
use crate::config::BridgeConfig;
use crate::handshake::{Handshake, ProbeStep};
use crate::progress::ProgressEstimator;
use crate::protocol::{EngineMessage, HostCommand, SessionTag, TokenClaim, TransferPayload};
use crate::session::{CorrelationCache, CorrelationId, LoadToken, TokenLedger};
use crate::transfer::{
    DocumentFile, PendingTransfer, ReferenceRegistry, TransferStrategy, WriteBackOutcome,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// File name used for downloads when no document was ever opened.
const DEFAULT_OUTPUT_NAME: &str = "document.pdf";

pub struct LoadCoordinator {
    config: BridgeConfig,
    ledger: TokenLedger,
    correlation: CorrelationCache,
    handshake: Handshake,
    transfer: TransferStrategy,
    notifier: ErrorNotifier,
    session: Option<LoadSession>,
    next_load_id: i64,
    frame_loaded: bool,
    /// The engine has shown signs of life (ready, progress or a load).
    booted: bool,
    /// Highest external-content count already warned about in this context.
    blocked_count: f64,
    external_warning: Option<String>,
    error: Option<String>,
    dirty: bool,
    effects: Vec<Effect>,
}

impl LoadCoordinator {
    pub fn new(config: BridgeConfig, registry: Arc<dyn ReferenceRegistry>) -> Self {
        Self {
            ledger: TokenLedger::new(),
            correlation: CorrelationCache::new(config.correlation_capacity),
            handshake: Handshake::new(config.probe_interval(), config.probe_attempts),
            transfer: TransferStrategy::new(config.transfer_threshold, registry),
            notifier: ErrorNotifier::new(config.error_dedupe_window()),
            session: None,
            next_load_id: 1,
            frame_loaded: false,
            booted: false,
            blocked_count: 0.0,
            external_warning: None,
            error: None,
            dirty: false,
            effects: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn active_token(&self) -> Option<LoadToken> {
        self.ledger.active()
    }

    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        let session = self.session.as_ref();
        let phase = self.phase();
        LoadSnapshot {
            phase,
            token: self.ledger.active(),
            file_name: session.map(|s| s.file.name().to_string()),
            busy: phase.is_busy(),
            progress: session.map_or(0, |s| s.progress.value()),
            error: self.error.clone(),
            external_warning: self.external_warning.clone(),
            cancelled: phase == Phase::Cancelled,
            page_count: session.and_then(|s| s.page_count),
            rendered: session.is_some_and(|s| s.rendered),
            readiness: self.handshake.readiness(),
            frame_loaded: self.frame_loaded,
            dirty: self.dirty,
            fallback_used: session.is_some_and(|s| s.fallback_used),
        }
    }

    /// Accept a new file. Always mints a new token, superseding whatever
    /// load was in flight.
    pub fn open(&mut self, file: DocumentFile, now: Instant) -> Vec<Effect> {
        self.clear_session_timers();
        self.emit(Effect::CancelWriteBack);

        let token = self.ledger.next();
        let load_id = CorrelationId::new(self.next_load_id);
        self.next_load_id += 1;
        self.correlation.remember(load_id, token);
        let strategy = self.transfer.prepare(&file);

        let mut progress = ProgressEstimator::new(self.config.progress_timing());
        progress.begin(now);
        info!(token = %token, file = %file.name(), size = file.size(), ?strategy, "accepted file");

        self.error = None;
        self.emit(Effect::Notify(LoadEvent::Accepted {
            token,
            file_name: file.name().to_string(),
        }));
        self.session = Some(LoadSession::new(token, load_id, file, progress));

        self.schedule(TimerKind::LoadDeadline, token.value(), self.config.load_timeout());
        self.schedule(
            TimerKind::ProgressStart,
            token.value(),
            self.config.progress_timing().start_delay,
        );

        if self.frame_loaded {
            self.start_handoff(true);
        } else {
            self.schedule(
                TimerKind::FrameLoad,
                token.value(),
                self.config.frame_load_timeout(),
            );
        }
        self.take_effects()
    }

    /// The host frame that embeds the engine finished loading.
    pub fn frame_loaded(&mut self) -> Vec<Effect> {
        self.frame_loaded = true;
        self.emit(Effect::CancelTimer(TimerKind::FrameLoad));
        if let Some(step) = self.handshake.on_frame_loaded() {
            self.apply_probe(step);
        }
        if self.phase() == Phase::AwaitingReady && self.active_session().is_some() {
            self.start_handoff(false);
        }
        self.take_effects()
    }

    /// The engine context was replaced (the frame reloaded). Readiness and
    /// per-context state start over; a load that was already handed over is
    /// handed over again once the new context is ready.
    pub fn reload_context(&mut self) -> Vec<Effect> {
        info!("engine context reloaded");
        self.handshake.reset();
        self.frame_loaded = false;
        self.booted = false;
        self.blocked_count = 0.0;
        self.correlation.reset();
        self.emit(Effect::CancelTimer(TimerKind::Probe));
        self.emit(Effect::CancelTimer(TimerKind::Fallback));
        self.emit(Effect::CancelTimer(TimerKind::EngineReady));

        let frame_timeout = self.config.frame_load_timeout();
        let mut frame_timer = None;
        if let Some(session) = self.session.as_mut() {
            if session.phase.is_busy() && self.ledger.is_active(session.token) {
                self.correlation.remember(session.load_id, session.token);
                session.phase = Phase::AwaitingReady;
                session.transfer_started = false;
                session.load_posted = false;
                frame_timer = Some(session.token.value());
            }
        }
        if let Some(generation) = frame_timer {
            self.schedule(TimerKind::FrameLoad, generation, frame_timeout);
        }
        self.take_effects()
    }

    /// Handle a decoded engine message.
    pub fn receive(&mut self, message: EngineMessage, now: Instant) -> Vec<Effect> {
        debug!(kind = message.message_type(), "engine message");
        match message {
            EngineMessage::Ready => self.on_ready(),
            EngineMessage::OpenTool { tool } => {
                if let Some(tool) = tool.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
                    self.emit(Effect::Notify(LoadEvent::OpenTool { tool }));
                }
            }
            EngineMessage::Download { blob } => self.on_download(blob),
            EngineMessage::SaveProgress { phase } => {
                self.emit(Effect::Notify(LoadEvent::SaveProgress { phase }));
            }
            EngineMessage::DirtyState { dirty } => {
                if self.dirty != dirty {
                    self.dirty = dirty;
                    self.emit(Effect::Notify(LoadEvent::DirtyChanged { dirty }));
                }
            }
            EngineMessage::HealthAck => debug!("engine health check acknowledged"),
            EngineMessage::LoadCancelled { tag } => self.on_load_cancelled(tag, now),
            scoped => {
                let Some(tag) = scoped.session_tag().copied() else {
                    return self.take_effects();
                };
                if self.admit(&tag, scoped.message_type()).is_some() {
                    self.on_session_message(scoped, now);
                }
            }
        }
        self.take_effects()
    }

    /// Inline bytes for `token` are ready.
    pub fn payload_ready(&mut self, token: LoadToken, payload: TransferPayload) -> Vec<Effect> {
        match self.active_session() {
            Some(session) if session.token == token && session.phase == Phase::Transferring => {
                self.post_load(payload);
            }
            _ => debug!(token = %token, "dropping payload for superseded load"),
        }
        self.take_effects()
    }

    /// Host-initiated cancel of the in-flight load.
    pub fn cancel(&mut self, now: Instant) -> Vec<Effect> {
        let in_flight = self.active_session().is_some_and(|s| s.phase.is_busy());
        if !in_flight {
            debug!("cancel ignored, no load in flight");
            return self.take_effects();
        }
        self.fail(LoadFailure::ManualCancel, now);
        self.take_effects()
    }

    /// A timer scheduled by an earlier effect fired.
    pub fn timer_fired(&mut self, timer: Timer, now: Instant) -> Vec<Effect> {
        if timer.kind == TimerKind::Probe {
            if let Some(step) = self.handshake.on_probe_timer(timer.generation) {
                self.apply_probe(step);
            }
            return self.take_effects();
        }

        let current = self
            .active_session()
            .filter(|s| s.token.value() == timer.generation && s.phase.is_busy())
            .map(|s| (s.phase, s.transfer_started));
        let Some((phase, transfer_started)) = current else {
            debug!(kind = ?timer.kind, generation = timer.generation, "stale timer");
            return self.take_effects();
        };

        match timer.kind {
            TimerKind::FrameLoad => {
                if !self.frame_loaded {
                    warn!("host frame did not load in time");
                    self.fail(LoadFailure::FrameLoadTimeout, now);
                }
            }
            TimerKind::Fallback => {
                if phase == Phase::AwaitingReady
                    && !transfer_started
                    && !self.handshake.is_ready()
                {
                    info!("engine silent, forcing transfer");
                    if let Some(session) = self.session.as_mut() {
                        session.fallback_used = true;
                    }
                    self.begin_transfer();
                }
            }
            TimerKind::EngineReady => {
                if !self.handshake.is_ready() && !self.booted {
                    warn!("engine never became ready");
                    self.fail(LoadFailure::EngineReadyTimeout, now);
                }
            }
            TimerKind::LoadDeadline => {
                warn!("load exceeded deadline");
                self.fail(LoadFailure::LoadTimeout, now);
            }
            TimerKind::ProgressStart => {
                let started = self
                    .session
                    .as_mut()
                    .is_some_and(|s| s.progress.start_ticking());
                if started {
                    self.tick_progress(timer.generation, now);
                }
            }
            TimerKind::ProgressTick => self.tick_progress(timer.generation, now),
            TimerKind::Probe => {}
        }
        self.take_effects()
    }

    /// An error raised by the hosting environment rather than the engine.
    pub fn report_host_error(&mut self, text: &str, now: Instant) -> Vec<Effect> {
        let text = text.trim();
        if text.is_empty() {
            return self.take_effects();
        }
        match classify_host_error(text, self.frame_loaded) {
            Severity::Informational => {
                self.external_warning = Some(text.to_string());
                self.emit(Effect::Notify(LoadEvent::Warning {
                    message: text.to_string(),
                }));
            }
            Severity::SessionFatal | Severity::UserInitiated => {
                let in_flight = self
                    .active_session()
                    .is_some_and(|s| s.phase.is_busy());
                if in_flight {
                    self.fail(LoadFailure::Host(text.to_string()), now);
                } else {
                    self.error = Some(text.to_string());
                    self.notice(text, now);
                }
            }
        }
        self.take_effects()
    }

    pub fn set_tool(&mut self, tool: &str) -> Vec<Effect> {
        let tool = tool.trim();
        if !tool.is_empty() {
            self.emit(Effect::Post(HostCommand::SetTool {
                tool: tool.to_string(),
            }));
        }
        self.take_effects()
    }

    pub fn request_download(&mut self) -> Vec<Effect> {
        self.emit(Effect::Post(HostCommand::Download));
        self.take_effects()
    }

    pub fn health_check(&mut self) -> Vec<Effect> {
        self.emit(Effect::Post(HostCommand::HealthCheck));
        self.take_effects()
    }

    /// The deferred cache write for `token` ended, one way or another.
    pub fn write_back_finished(
        &mut self,
        token: LoadToken,
        outcome: Result<WriteBackOutcome, String>,
    ) -> Vec<Effect> {
        if !self.session.as_ref().is_some_and(|s| s.token == token) {
            debug!(token = %token, "write-back for superseded load");
            return self.take_effects();
        }
        let event = match outcome {
            Ok(WriteBackOutcome::Written) => LoadEvent::InputCached { token },
            Ok(outcome) => LoadEvent::InputCacheSkipped { token, outcome },
            Err(message) => {
                warn!(token = %token, %message, "failed to cache loaded document");
                LoadEvent::InputCacheFailed { token, message }
            }
        };
        self.emit(Effect::Notify(event));
        self.take_effects()
    }

    /// The host is going away. Everything in flight becomes stale and the
    /// current reference handle is released.
    pub fn teardown(&mut self) -> Vec<Effect> {
        if let Some(token) = self.ledger.invalidate() {
            debug!(token = %token, "teardown retired active token");
        }
        for kind in TimerKind::SESSION {
            self.emit(Effect::CancelTimer(kind));
        }
        self.emit(Effect::CancelTimer(TimerKind::Probe));
        self.emit(Effect::CancelWriteBack);
        if let Some(session) = self.session.as_mut() {
            session.progress.stop();
        }
        self.transfer.release();
        self.take_effects()
    }

    fn on_ready(&mut self) {
        self.booted = true;
        if self.handshake.on_ready() {
            info!("engine ready");
            self.emit(Effect::CancelTimer(TimerKind::Probe));
            self.emit(Effect::Notify(LoadEvent::EngineReady));
        }
        self.emit(Effect::CancelTimer(TimerKind::Fallback));
        self.emit(Effect::CancelTimer(TimerKind::EngineReady));
        if !self.frame_loaded {
            // An answering engine implies its frame is up.
            self.frame_loaded = true;
            self.emit(Effect::CancelTimer(TimerKind::FrameLoad));
        }

        let pending = self
            .active_session()
            .is_some_and(|s| s.phase == Phase::AwaitingReady && !s.transfer_started);
        if pending {
            self.begin_transfer();
        }
    }

    fn on_session_message(&mut self, message: EngineMessage, now: Instant) {
        match message {
            EngineMessage::Loaded { page_count, .. } => self.on_loaded(page_count),
            EngineMessage::RenderComplete { .. } => {
                if self.phase().is_busy() {
                    self.on_loaded(None);
                }
                if let Some(session) = self.session.as_mut() {
                    if session.phase == Phase::Loaded && !session.rendered {
                        session.rendered = true;
                        let token = session.token;
                        self.emit(Effect::Notify(LoadEvent::Rendered { token }));
                    }
                }
            }
            EngineMessage::Progress { loaded, total, .. } => self.on_progress(loaded, total),
            EngineMessage::PasswordError { .. } => {
                self.engine_failure(LoadFailure::PasswordProtected, now);
            }
            EngineMessage::Error { message, .. } => {
                let fault = classify_engine_error(message.as_deref());
                if let Some(raw) = message.as_deref().map(str::trim) {
                    if raw != fault.message() {
                        warn!(raw, "engine runtime error");
                    }
                }
                self.engine_failure(LoadFailure::Engine(fault), now);
            }
            EngineMessage::ExternalContentBlocked { count, origins, .. } => {
                let count = count.unwrap_or(0.0);
                if count <= self.blocked_count {
                    return;
                }
                self.blocked_count = count;
                let message = external_content_message(&origins);
                self.external_warning = Some(message.clone());
                self.emit(Effect::Notify(LoadEvent::Warning { message }));
            }
            _ => {}
        }
    }

    fn on_loaded(&mut self, page_count: Option<u32>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.phase.is_busy() {
            return;
        }
        let token = session.token;
        session.phase = Phase::Loaded;
        session.page_count = page_count;
        session.failure = None;
        let progress = session.progress.complete();
        let file = session.file.clone();
        self.error = None;
        self.booted = true;
        info!(token = %token, ?page_count, "document loaded");

        if self.handshake.on_ready() {
            self.emit(Effect::CancelTimer(TimerKind::Probe));
        }
        self.clear_session_timers();
        if let Some(value) = progress {
            self.emit(Effect::Notify(LoadEvent::Progress { token, value }));
        }
        self.emit(Effect::Notify(LoadEvent::Loaded { token, page_count }));
        self.emit(Effect::ScheduleWriteBack { token, file });
    }

    fn on_progress(&mut self, loaded: f64, total: Option<f64>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.phase.is_busy() {
            return;
        }
        let token = session.token;
        let had_real = session.progress.has_real_progress();
        let raised = session.progress.real(loaded, total);
        if !session.progress.has_real_progress() {
            return;
        }
        self.booted = true;
        if !had_real {
            self.emit(Effect::CancelTimer(TimerKind::ProgressStart));
            self.emit(Effect::CancelTimer(TimerKind::ProgressTick));
        }
        if let Some(value) = raised {
            self.emit(Effect::Notify(LoadEvent::Progress { token, value }));
        }
    }

    fn on_load_cancelled(&mut self, tag: SessionTag, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // Acknowledgement of a cancel the host asked for.
        if let Some(manual) = session.manual_cancel {
            let acknowledges = match tag.token {
                TokenClaim::Absent => true,
                TokenClaim::Issued(t) => t == manual,
                TokenClaim::Unrecognized => false,
            };
            if acknowledges {
                debug!(token = %manual, "engine acknowledged cancel");
                session.manual_cancel = None;
                return;
            }
        }
        if self.admit(&tag, "pdf-load-cancelled").is_none() {
            return;
        }
        let live = self
            .session
            .as_ref()
            .is_some_and(|s| matches!(s.phase, Phase::AwaitingReady | Phase::Transferring | Phase::Loaded));
        if live {
            warn!("engine cancelled a load the host did not cancel");
            self.fail(LoadFailure::UnexpectedCancellation, now);
        }
    }

    fn on_download(&mut self, blob: Bytes) {
        let file_name = self
            .session
            .as_ref()
            .map_or_else(|| DEFAULT_OUTPUT_NAME.to_string(), |s| edited_name(s.file.name()));
        info!(file = %file_name, bytes = blob.len(), "download received");
        self.emit(Effect::StoreOutput {
            name: file_name.clone(),
            bytes: blob.clone(),
        });
        self.emit(Effect::Notify(LoadEvent::Downloaded {
            file_name,
            bytes: blob,
        }));
    }

    /// Engine-reported failure. Once loaded, the document stays usable and
    /// only the error is recorded.
    fn engine_failure(&mut self, failure: LoadFailure, now: Instant) {
        let message = failure.message();
        if self.phase() == Phase::Loaded {
            self.error = Some(message.clone());
            if let Some(session) = self.session.as_mut() {
                session.failure = Some(failure);
            }
            self.notice(&message, now);
            return;
        }
        self.notice(&message, now);
        self.fail(failure, now);
    }

    /// End the current session. A user-initiated failure leaves it
    /// `Cancelled` and expects the engine to acknowledge; anything else
    /// leaves it `Errored`.
    fn fail(&mut self, failure: LoadFailure, now: Instant) {
        let severity = failure.severity();
        if severity == Severity::Informational {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let token = session.token;
        self.ledger.invalidate();
        session.progress.stop();

        if severity == Severity::UserInitiated {
            session.phase = Phase::Cancelled;
            session.manual_cancel = Some(token);
            self.error = None;
            info!(token = %token, "load cancelled by host");

            self.clear_session_timers();
            self.emit(Effect::Post(HostCommand::Cancel { token }));
            self.emit(Effect::Notify(LoadEvent::Cancelled { token }));
            return;
        }

        let message = failure.message();
        let tell_engine = self.frame_loaded
            && (failure.is_timeout() || matches!(failure, LoadFailure::Host(_)));
        session.phase = Phase::Errored;
        session.manual_cancel = None;
        session.failure = Some(failure.clone());
        self.error = Some(message.clone());
        warn!(token = %token, %message, "load failed");

        self.clear_session_timers();
        if tell_engine {
            self.emit(Effect::Post(HostCommand::Cancel { token }));
        }
        if matches!(failure, LoadFailure::Host(_)) {
            self.notice(&message, now);
        }
        self.emit(Effect::Notify(LoadEvent::Failed {
            token,
            failure,
            message,
        }));
    }

    fn notice(&mut self, text: &str, now: Instant) {
        if let Some(message) = self.notifier.admit(text, now) {
            self.emit(Effect::Notify(LoadEvent::ErrorNotice { message }));
        }
    }

    /// Frame is up and a session is waiting: name the file, then either
    /// transfer or wait for the handshake with fallback and ready timers.
    fn start_handoff(&mut self, fresh: bool) {
        let Some((token, name)) = self
            .active_session()
            .map(|s| (s.token, s.file.name().to_string()))
        else {
            return;
        };
        self.emit(Effect::Post(HostCommand::SetFileName { name }));
        if self.handshake.is_ready() {
            self.begin_transfer();
            return;
        }
        if fresh {
            self.emit(Effect::Post(HostCommand::Ping));
        }
        self.schedule(
            TimerKind::EngineReady,
            token.value(),
            self.config.engine_ready_timeout(),
        );
        if self.config.legacy_fallback {
            self.schedule(TimerKind::Fallback, token.value(), self.config.fallback_delay());
        }
    }

    fn begin_transfer(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.transfer_started || !self.ledger.is_active(session.token) {
            return;
        }
        session.phase = Phase::Transferring;
        session.transfer_started = true;
        let token = session.token;
        let file = session.file.clone();
        self.emit(Effect::CancelTimer(TimerKind::Fallback));

        match self.transfer.begin(&file) {
            PendingTransfer::Ready(payload) => self.post_load(payload),
            pending => self.emit(Effect::Materialize {
                token,
                transfer: pending,
            }),
        }
    }

    fn post_load(&mut self, payload: TransferPayload) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.load_posted {
            return;
        }
        session.load_posted = true;
        debug!(token = %session.token, kind = payload.kind(), "posting load");
        let command = HostCommand::Load {
            token: session.token,
            load_id: session.load_id,
            file: session.file.descriptor(),
            payload,
        };
        self.emit(Effect::Post(command));
    }

    fn tick_progress(&mut self, generation: u64, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let token = session.token;
        let tick = session.progress.synthetic_tick(now);
        if let Some(value) = tick.value {
            self.emit(Effect::Notify(LoadEvent::Progress { token, value }));
        }
        if tick.again {
            self.schedule(
                TimerKind::ProgressTick,
                generation,
                self.config.progress_timing().tick,
            );
        }
    }

    fn apply_probe(&mut self, step: ProbeStep) {
        if step.send_ping {
            self.emit(Effect::Post(HostCommand::Ping));
        }
        if let Some(after) = step.next {
            self.emit(Effect::Schedule {
                timer: Timer {
                    kind: TimerKind::Probe,
                    generation: step.epoch,
                },
                after,
            });
        }
    }

    /// Decide whether a session-scoped message belongs to the active load.
    fn admit(&mut self, tag: &SessionTag, kind: &str) -> Option<LoadToken> {
        let active = self.ledger.active();
        let accepted = match tag.token {
            TokenClaim::Issued(token) => active.filter(|a| *a == token),
            TokenClaim::Unrecognized => None,
            TokenClaim::Absent => match self.correlation.resolve(tag.load_id, active) {
                Some(token) if Some(token) == active => Some(token),
                _ => None,
            },
        };
        if accepted.is_none() {
            debug!(kind, claim = ?tag.token, "dropping stale message");
        }
        accepted
    }

    fn active_session(&self) -> Option<&LoadSession> {
        self.session
            .as_ref()
            .filter(|s| self.ledger.is_active(s.token))
    }

    fn schedule(&mut self, kind: TimerKind, generation: u64, after: Duration) {
        self.emit(Effect::Schedule {
            timer: Timer { kind, generation },
            after,
        });
    }

    fn clear_session_timers(&mut self) {
        for kind in TimerKind::SESSION {
            self.emit(Effect::CancelTimer(kind));
        }
    }

    fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}

/// Name for an edited copy: `report.pdf` becomes `report-edited.pdf`.
fn edited_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    format!("{stem}-edited.pdf")
}

impl std::fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
