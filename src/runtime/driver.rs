//! Bridge driver
//!
//! One tokio task owns the `LoadCoordinator` and processes one input at a
//! time: host commands from `BridgeHandle`, and completions of work it
//! started itself (timers, byte reads, cache writes). Effects are carried out
//! in the order the coordinator returned them.

use super::channel::EngineChannel;
use crate::cache::{CacheKey, CachedDocument, DocumentCache};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::lifecycle::{Effect, LoadCoordinator, LoadEvent, LoadSnapshot, Timer, TimerKind};
use crate::protocol::{EngineMessage, InboundEnvelope, TransferPayload};
use crate::session::LoadToken;
use crate::transfer::{
    write_back, BlobRegistry, DocumentFile, ReferenceRegistry, WriteBackOutcome, WriteBackTicket,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 256;

enum Command {
    Open(DocumentFile),
    FrameLoaded,
    Deliver(InboundEnvelope),
    Cancel,
    SetTool(String),
    Download,
    HealthCheck,
    HostError(String),
    ReloadContext,
    Shutdown(oneshot::Sender<()>),
}

enum Completion {
    TimerFired(Timer),
    PayloadReady {
        token: LoadToken,
        payload: TransferPayload,
    },
    WriteBackFinished {
        token: LoadToken,
        outcome: Result<WriteBackOutcome, String>,
    },
}

/// Cloneable handle to a running bridge driver.
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<LoadEvent>,
    snapshot: watch::Receiver<LoadSnapshot>,
}

impl BridgeHandle {
    fn send(&self, command: Command) -> BridgeResult<()> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::DriverStopped)
    }

    /// Load a new document, superseding any load in flight.
    pub fn open(&self, file: DocumentFile) -> BridgeResult<()> {
        self.send(Command::Open(file))
    }

    pub fn frame_loaded(&self) -> BridgeResult<()> {
        self.send(Command::FrameLoaded)
    }

    /// Feed a raw inbound payload from the engine.
    pub fn deliver(&self, envelope: impl Into<InboundEnvelope>) -> BridgeResult<()> {
        self.send(Command::Deliver(envelope.into()))
    }

    pub fn cancel(&self) -> BridgeResult<()> {
        self.send(Command::Cancel)
    }

    pub fn set_tool(&self, tool: impl Into<String>) -> BridgeResult<()> {
        self.send(Command::SetTool(tool.into()))
    }

    pub fn download(&self) -> BridgeResult<()> {
        self.send(Command::Download)
    }

    pub fn health_check(&self) -> BridgeResult<()> {
        self.send(Command::HealthCheck)
    }

    pub fn report_host_error(&self, text: impl Into<String>) -> BridgeResult<()> {
        self.send(Command::HostError(text.into()))
    }

    pub fn reload_context(&self) -> BridgeResult<()> {
        self.send(Command::ReloadContext)
    }

    /// Tear down and stop the driver. Resolves once teardown ran.
    pub async fn shutdown(&self) -> BridgeResult<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Shutdown(ack))?;
        done.await.map_err(|_| BridgeError::DriverStopped)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> watch::Receiver<LoadSnapshot> {
        self.snapshot.clone()
    }

    /// The latest published snapshot.
    pub fn current(&self) -> LoadSnapshot {
        self.snapshot.borrow().clone()
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("snapshot", &*self.snapshot.borrow())
            .finish()
    }
}

/// Owner of the coordinator task.
pub struct BridgeDriver {
    coordinator: LoadCoordinator,
    channel: Arc<dyn EngineChannel>,
    cache: Option<Arc<dyn DocumentCache>>,
    config: BridgeConfig,
    timers: HashMap<TimerKind, JoinHandle<()>>,
    write_back: Option<WriteBackTicket>,
    completions: mpsc::UnboundedSender<Completion>,
    events: broadcast::Sender<LoadEvent>,
    snapshot: watch::Sender<LoadSnapshot>,
}

impl BridgeDriver {
    /// Spawn a driver on the current tokio runtime with an in-process
    /// reference registry.
    pub fn spawn(
        config: BridgeConfig,
        channel: Arc<dyn EngineChannel>,
        cache: Option<Arc<dyn DocumentCache>>,
    ) -> BridgeHandle {
        Self::spawn_with_registry(config, channel, cache, Arc::new(BlobRegistry::new()))
    }

    pub fn spawn_with_registry(
        config: BridgeConfig,
        channel: Arc<dyn EngineChannel>,
        cache: Option<Arc<dyn DocumentCache>>,
        registry: Arc<dyn ReferenceRegistry>,
    ) -> BridgeHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let coordinator = LoadCoordinator::new(config.clone(), registry);
        let (snapshot_tx, snapshot_rx) = watch::channel(coordinator.snapshot());

        let driver = Self {
            coordinator,
            channel,
            cache,
            config,
            timers: HashMap::new(),
            write_back: None,
            completions: completion_tx,
            events: events.clone(),
            snapshot: snapshot_tx,
        };
        tokio::spawn(driver.run(command_rx, completion_rx));

        BridgeHandle {
            commands: command_tx,
            events,
            snapshot: snapshot_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        self.shutdown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(completion) = completions.recv() => self.on_completion(completion).await,
            }
            self.snapshot.send_replace(self.coordinator.snapshot());
        }
        debug!("bridge driver stopped");
    }

    async fn on_command(&mut self, command: Command) {
        let now = now();
        let effects = match command {
            Command::Open(file) => self.coordinator.open(file, now),
            Command::FrameLoaded => self.coordinator.frame_loaded(),
            Command::Deliver(envelope) => match EngineMessage::decode(&envelope) {
                Some(message) => self.coordinator.receive(message, now),
                None => {
                    debug!("ignoring unrecognized engine payload");
                    Vec::new()
                }
            },
            Command::Cancel => self.coordinator.cancel(now),
            Command::SetTool(tool) => self.coordinator.set_tool(&tool),
            Command::Download => self.coordinator.request_download(),
            Command::HealthCheck => self.coordinator.health_check(),
            Command::HostError(text) => self.coordinator.report_host_error(&text, now),
            Command::ReloadContext => self.coordinator.reload_context(),
            Command::Shutdown(_) => Vec::new(),
        };
        self.apply(effects).await;
    }

    async fn on_completion(&mut self, completion: Completion) {
        let effects = match completion {
            Completion::TimerFired(timer) => self.coordinator.timer_fired(timer, now()),
            Completion::PayloadReady { token, payload } => {
                self.coordinator.payload_ready(token, payload)
            }
            Completion::WriteBackFinished { token, outcome } => {
                self.coordinator.write_back_finished(token, outcome)
            }
        };
        self.apply(effects).await;
    }

    async fn shutdown(&mut self) {
        let effects = self.coordinator.teardown();
        self.apply(effects).await;
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        self.snapshot.send_replace(self.coordinator.snapshot());
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Post(command) => {
                    let kind = command.message_type();
                    if let Err(e) = self.channel.post(command.encode()).await {
                        warn!(kind, error = %e, "failed to post to engine");
                    }
                }
                Effect::Materialize { token, transfer } => {
                    let completions = self.completions.clone();
                    tokio::spawn(async move {
                        let payload = transfer.resolve().await;
                        let _ = completions.send(Completion::PayloadReady { token, payload });
                    });
                }
                Effect::Schedule { timer, after } => {
                    let completions = self.completions.clone();
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = completions.send(Completion::TimerFired(timer));
                    });
                    if let Some(previous) = self.timers.insert(timer.kind, task) {
                        previous.abort();
                    }
                }
                Effect::CancelTimer(kind) => {
                    if let Some(timer) = self.timers.remove(&kind) {
                        timer.abort();
                    }
                }
                Effect::Notify(event) => {
                    // No subscribers is fine.
                    let _ = self.events.send(event);
                }
                Effect::ScheduleWriteBack { token, file } => self.schedule_write_back(token, file),
                Effect::CancelWriteBack => {
                    if let Some(ticket) = self.write_back.take() {
                        ticket.cancel();
                    }
                }
                Effect::StoreOutput { name, bytes } => {
                    let Some(cache) = self.cache.clone() else {
                        continue;
                    };
                    tokio::spawn(async move {
                        let record = CachedDocument::new(name, "application/pdf", bytes);
                        let stored =
                            tokio::task::spawn_blocking(move || cache.save(CacheKey::Output, &record))
                                .await;
                        match stored {
                            Ok(Ok(())) => debug!("stored downloaded document"),
                            Ok(Err(e)) => warn!(error = %e, "failed to cache download"),
                            Err(e) => warn!(error = %e, "cache task failed"),
                        }
                    });
                }
            }
        }
    }

    fn schedule_write_back(&mut self, token: LoadToken, file: DocumentFile) {
        if let Some(previous) = self.write_back.take() {
            previous.cancel();
        }
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let (ticket, signal) = WriteBackTicket::issue();
        self.write_back = Some(ticket);
        let delay = self.config.cache_write_delay();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = write_back(cache, CacheKey::Input, file, delay, signal)
                .await
                .map_err(|e| e.to_string());
            debug!(?outcome, "write-back finished");
            let _ = completions.send(Completion::WriteBackFinished { token, outcome });
        });
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CacheResult, MemoryDocumentCache};
    use crate::lifecycle::Phase;
    use crate::runtime::MemoryChannel;
    use serde_json::json;
    use std::time::Duration;

    struct FailingCache;

    impl DocumentCache for FailingCache {
        fn save(&self, _key: CacheKey, _document: &CachedDocument) -> CacheResult<()> {
            Err(CacheError::Io(std::io::Error::other("disk full")))
        }

        fn load(&self, _key: CacheKey) -> CacheResult<Option<CachedDocument>> {
            Ok(None)
        }

        fn remove(&self, _key: CacheKey) -> CacheResult<bool> {
            Ok(false)
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn inline_load_round_trip() {
        let (channel, mut posted) = MemoryChannel::new();
        let cache = Arc::new(MemoryDocumentCache::new());
        let handle = BridgeDriver::spawn(
            BridgeConfig::default(),
            Arc::new(channel),
            Some(cache.clone()),
        );
        let mut events = handle.subscribe();

        handle.frame_loaded().unwrap();
        handle.deliver(json!({ "type": "pdf-editor-ready" })).unwrap();
        handle
            .open(DocumentFile::from_bytes("a.pdf", vec![1u8, 2, 3]))
            .unwrap();

        let load = loop {
            let message = posted.recv().await.unwrap();
            if message.message_type() == Some("load-pdf") {
                break message;
            }
        };
        assert_eq!(load.transfer.as_deref(), Some(&[1u8, 2, 3][..]));
        let token = load.load_token().unwrap();

        handle
            .deliver(json!({ "type": "pdf-loaded", "loadToken": token.value() }))
            .unwrap();

        loop {
            if let LoadEvent::InputCached { token: cached } = events.recv().await.unwrap() {
                assert_eq!(cached, token);
                break;
            }
        }
        assert_eq!(handle.current().phase, Phase::Loaded);
        assert_eq!(cache.load(CacheKey::Input).unwrap().unwrap().name, "a.pdf");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn load_deadline_fails_session() {
        let (channel, _posted) = MemoryChannel::new();
        let config = BridgeConfig {
            load_timeout_ms: 5_000,
            ..BridgeConfig::default()
        };
        let handle = BridgeDriver::spawn(config, Arc::new(channel), None);
        let mut events = handle.subscribe();

        handle.frame_loaded().unwrap();
        handle.deliver(json!({ "type": "pdf-editor-ready" })).unwrap();
        handle
            .open(DocumentFile::from_bytes("a.pdf", vec![1u8]))
            .unwrap();

        let failure = loop {
            if let LoadEvent::Failed { message, .. } = events.recv().await.unwrap() {
                break message;
            }
        };
        assert_eq!(failure, crate::classify::LOAD_TIMEOUT_MESSAGE);
        let snapshot = handle.current();
        assert_eq!(snapshot.phase, Phase::Errored);
        assert!(!snapshot.busy);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_write_back_is_cancelled() {
        let (channel, mut posted) = MemoryChannel::new();
        let cache = Arc::new(MemoryDocumentCache::new());
        let handle = BridgeDriver::spawn(
            BridgeConfig::default(),
            Arc::new(channel),
            Some(cache.clone()),
        );

        handle.frame_loaded().unwrap();
        handle.deliver(json!({ "type": "pdf-editor-ready" })).unwrap();
        handle
            .open(DocumentFile::from_bytes("a.pdf", vec![1u8]))
            .unwrap();
        handle.deliver(json!({ "type": "pdf-loaded", "loadToken": 1 })).unwrap();
        settle().await;
        handle
            .open(DocumentFile::from_bytes("b.pdf", vec![2u8]))
            .unwrap();
        settle().await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(cache.load(CacheKey::Input).unwrap().is_none());
        assert!(posted.try_recv().is_ok());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_back_is_reported_after_load() {
        let (channel, _posted) = MemoryChannel::new();
        let handle = BridgeDriver::spawn(
            BridgeConfig::default(),
            Arc::new(channel),
            Some(Arc::new(FailingCache)),
        );
        let mut events = handle.subscribe();

        handle.frame_loaded().unwrap();
        handle.deliver(json!({ "type": "pdf-editor-ready" })).unwrap();
        handle
            .open(DocumentFile::from_bytes("a.pdf", vec![1u8]))
            .unwrap();
        handle.deliver(json!({ "type": "pdf-loaded", "loadToken": 1 })).unwrap();

        let mut loaded = false;
        let message = loop {
            match events.recv().await.unwrap() {
                LoadEvent::Loaded { .. } => loaded = true,
                LoadEvent::InputCacheFailed { token, message } => {
                    assert_eq!(token, LoadToken::new(1));
                    break message;
                }
                _ => {}
            }
        };
        assert!(loaded);
        assert!(message.contains("disk full"));
        assert_eq!(handle.current().phase, Phase::Loaded);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn handle_reports_stopped_driver() {
        let (channel, _posted) = MemoryChannel::new();
        let handle = BridgeDriver::spawn(BridgeConfig::default(), Arc::new(channel), None);
        handle.shutdown().await.unwrap();
        settle().await;
        assert!(matches!(handle.cancel(), Err(BridgeError::DriverStopped)));
    }
}
