//! Correlation cache: correlation id → load token
//!
//! Some engine signals carry the engine's own correlation id instead of a
//! reliable token. The cache recovers the token that was active when the id
//! was issued. Plain insertion-order FIFO; resolving never refreshes recency.

use super::token::LoadToken;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Default number of correlation entries kept.
pub const DEFAULT_CORRELATION_CAPACITY: usize = 24;

/// An externally supplied numeric correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(i64);

impl CorrelationId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Read a correlation id from a wire number. Non-numeric, non-finite
    /// and fractional values yield `None`.
    pub fn from_wire(value: &serde_json::Value) -> Option<Self> {
        if let Some(n) = value.as_i64() {
            return Some(Self(n));
        }
        let n = value.as_f64()?;
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
            Some(Self(n as i64))
        } else {
            None
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capacity-bounded correlation id → token map with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct CorrelationCache {
    capacity: usize,
    entries: HashMap<CorrelationId, LoadToken>,
    order: VecDeque<CorrelationId>,
}

impl CorrelationCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A zero capacity falls back to [`DEFAULT_CORRELATION_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CORRELATION_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `id → token`. Overwriting keeps the id's original position.
    pub fn remember(&mut self, id: CorrelationId, token: LoadToken) {
        if self.entries.insert(id, token).is_none() {
            self.order.push_back(id);
        }
        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Look up the token for `id`.
    ///
    /// An unknown id is backfilled with `fallback` when one is given, so a
    /// later resolution of the same id stays pinned to it. An absent id
    /// returns `fallback` unchanged.
    pub fn resolve(
        &mut self,
        id: Option<CorrelationId>,
        fallback: Option<LoadToken>,
    ) -> Option<LoadToken> {
        let Some(id) = id else {
            return fallback;
        };
        if let Some(token) = self.entries.get(&id) {
            return Some(*token);
        }
        if let Some(token) = fallback {
            self.remember(id, token);
        }
        fallback
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

impl Default for CorrelationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_CAPACITY)
    }
}
