//! Task tokens and their generator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identifier for one submitted task.
///
/// Tokens are allocated strictly monotonically by a [`TokenGenerator`], so
/// numeric ordering is submission ordering. Zero is reserved as
/// "invalid/unset" and is never handed out; tokens are never reused within a
/// manager's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskToken(u64);

impl TaskToken {
    /// The reserved "no task" token.
    pub const INVALID: TaskToken = TaskToken(0);

    /// Raw numeric value, for logging and diagnostics.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Whether this token could have come from a generator.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe allocator of fresh task tokens. One per manager.
#[derive(Debug)]
pub struct TokenGenerator {
    next: AtomicU64,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next token. Strictly increasing, never [`TaskToken::INVALID`],
    /// callable concurrently from any thread.
    pub fn new_token(&self) -> TaskToken {
        TaskToken(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}
