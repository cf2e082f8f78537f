//! Session identity: load tokens and correlation ids

mod correlation;
mod token;

pub use correlation::{CorrelationCache, CorrelationId, DEFAULT_CORRELATION_CAPACITY};
pub use token::{LoadToken, TokenLedger};
