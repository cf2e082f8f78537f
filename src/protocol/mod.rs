//! Message envelope codec
//!
//! Everything exchanged with the engine is a plain structured object with a
//! `type` field. Session-scoped messages carry `loadToken`.

mod inbound;
mod outbound;

pub use inbound::{EngineMessage, InboundEnvelope, SessionTag, TokenClaim};
pub use outbound::{EncodedMessage, HostCommand, TransferPayload};
