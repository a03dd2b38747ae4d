/// Event system for the deterministic simulation kernel.
///
/// Every effect in a clocklab simulation is modeled as an `Event`. Events
/// are immutable records placed on the scheduler's priority queue and
/// dispatched in deterministic order.

use std::cmp::Ordering;

use crate::message::{Gate, Message};
use crate::time::{ClockReading, VirtualTime};

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly increasing event identifier.
///
/// Two events scheduled at the same `VirtualTime` are ordered by their
/// `EventId`, which corresponds to creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

/// Deterministic event-ID generator. Each `Scheduler` owns one.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Event Type ────────────────────────────────────────────────────────

/// The payload of an event.
///
/// The Cristian exchange threads its partial sample through the events
/// themselves, so the handler keeps no per-round bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    /// A no-op event used for testing.
    Noop,

    /// The client sends a time request to the server.
    ClientRequest { round: u32 },

    /// The request reached the server, which answers with its clock.
    ServerReply { round: u32, request: ClockReading },

    /// The server's answer reached the client.
    ClientReceive {
        round: u32,
        request: ClockReading,
        server: ClockReading,
    },

    /// A message arrives at the load balancer's input.
    MessageArrival { message: Message },

    /// A message was forwarded out of one of the balancer's gates.
    GateDelivery { gate: Gate, message: Message },
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Noop => write!(f, "Noop"),
            EventType::ClientRequest { round } => write!(f, "Request(#{})", round),
            EventType::ServerReply { round, request } => {
                write!(f, "Reply(#{}, T0={})", round, request)
            }
            EventType::ClientReceive { round, server, .. } => {
                write!(f, "Receive(#{}, Ts={})", round, server)
            }
            EventType::MessageArrival { message } => write!(f, "Arrive({})", message),
            EventType::GateDelivery { gate, message } => {
                write!(f, "Deliver({} → {})", message, gate)
            }
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single simulation event, ordered by `(scheduled_at, id)`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub scheduled_at: VirtualTime,
    pub payload: EventType,
}

impl Event {
    pub fn new(id: EventId, scheduled_at: VirtualTime, payload: EventType) -> Self {
        Event {
            id,
            scheduled_at,
            payload,
        }
    }
}

/// Reversed so that `BinaryHeap` pops the smallest `(scheduled_at, id)`.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
