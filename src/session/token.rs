//! Load tokens and the ledger that issues them
//!
//! Every load attempt gets a token. Anything tagged with a token other than
//! the active one is stale and must be discarded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one load attempt. Strictly increasing across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadToken(u64);

impl LoadToken {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Read a token from a wire number.
    ///
    /// Only finite, non-negative integral numbers can name a token the
    /// ledger issued; everything else yields `None`.
    pub fn from_wire(value: &serde_json::Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return Some(Self(n));
        }
        let n = value.as_f64()?;
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
            Some(Self(n as u64))
        } else {
            None
        }
    }
}

impl fmt::Display for LoadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LoadToken> for u64 {
    fn from(token: LoadToken) -> Self {
        token.0
    }
}

/// Issues load tokens and remembers which one is active.
///
/// At most one token is active. `invalidate()` retires it without issuing a
/// replacement, which stales every in-flight response for that load.
#[derive(Debug, Default)]
pub struct TokenLedger {
    issued: u64,
    active: Option<u64>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token strictly greater than every previous one and make it active.
    pub fn next(&mut self) -> LoadToken {
        self.issued += 1;
        self.active = Some(self.issued);
        LoadToken(self.issued)
    }

    /// The active token, if a load is current.
    pub fn active(&self) -> Option<LoadToken> {
        self.active.map(LoadToken)
    }

    pub fn is_active(&self, token: LoadToken) -> bool {
        self.active == Some(token.0)
    }

    /// Retire the active token without starting a new load.
    ///
    /// Returns the retired token, if one was active.
    pub fn invalidate(&mut self) -> Option<LoadToken> {
        self.active.take().map(LoadToken)
    }
}
