//! Values that travel through the load balancer.
//!
//! Kept apart from `dispatch` so the kernel's event types can name them
//! without depending on the balancer itself.

use serde::Serialize;

// ── Gate ──────────────────────────────────────────────────────────────

/// One of the dispatcher's two outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Gate {
    Out0,
    Out1,
}

impl Gate {
    /// Gate number, 0 or 1.
    pub fn index(self) -> usize {
        match self {
            Gate::Out0 => 0,
            Gate::Out1 => 1,
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "out[{}]", self.index())
    }
}

// ── Message ───────────────────────────────────────────────────────────

/// An opaque message passed through the balancer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Message {
    pub id: u64,
    pub body: String,
}

impl Message {
    pub fn new(id: u64, body: impl Into<String>) -> Self {
        Message {
            id,
            body: body.into(),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}({})", self.id, self.body)
    }
}
