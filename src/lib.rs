//! pdf-bridge: load coordination for an embedded document engine
//!
//! The host and the engine exchange structured messages over a channel
//! with no ordering or delivery guarantees. This crate keeps the host side
//! of a document load consistent anyway:
//!
//! - **Tokens**: every load gets a fresh token; late replies from
//!   superseded loads are recognized and dropped
//! - **Handshake**: the engine is probed until it reports ready, with a
//!   fallback path for engines that never do
//! - **Transfer**: small documents travel inline, large ones by reference
//! - **Failures**: engine and host errors are classified into user-facing
//!   messages; timeouts guard every wait
//!
//! # Example
//!
//! ```
//! use pdf_bridge::{BridgeConfig, LoadCoordinator, Phase, BlobRegistry, DocumentFile};
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let mut coordinator = LoadCoordinator::new(BridgeConfig::default(), Arc::new(BlobRegistry::new()));
//! let effects = coordinator.open(DocumentFile::from_bytes("a.pdf", vec![1u8, 2, 3]), Instant::now());
//! assert!(!effects.is_empty());
//! assert_eq!(coordinator.phase(), Phase::AwaitingReady);
//! ```

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod handshake;
pub mod lifecycle;
pub mod progress;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod transfer;

pub use cache::{CacheError, CacheKey, CachedDocument, DocumentCache, OpenCache, SqliteDocumentCache};
pub use classify::{LoadFailure, Severity};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use handshake::Readiness;
pub use lifecycle::{Effect, LoadCoordinator, LoadEvent, LoadSnapshot, Phase};
pub use protocol::{EngineMessage, HostCommand, InboundEnvelope};
pub use runtime::{BridgeDriver, BridgeHandle, EngineChannel};
pub use session::LoadToken;
pub use transfer::{BlobRegistry, DocumentFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
