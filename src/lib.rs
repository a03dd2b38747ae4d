//! # clocklab — Deterministic Clock-Synchronization Exercises
//!
//! Classroom distributed-systems algorithms as pure, seeded, testable
//! computations:
//!
//! - [`berkeley`]: master/participant offset averaging.
//! - [`cristian`]: single round-trip time estimation.
//! - [`dispatch`]: uniform random two-way routing.
//!
//! Nothing here sleeps or reads the wall clock. Network delay is virtual
//! time on a small discrete-event kernel, and every random draw comes
//! from a generator the caller passes in.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ CristianExchange LoadBalancer│ ← EventHandlers
//! │  ┌────────────────────────┐  │
//! │  │       Simulation        │  │ ← execution loop
//! │  │  ┌──────────────────┐  │  │
//! │  │  │    Scheduler     │  │  │ ← deterministic min-heap
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```

pub mod berkeley;
pub mod config;
pub mod cristian;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod message;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod time;

pub use berkeley::{BerkeleyOutcome, BerkeleyScenario, RoundingPolicy};
pub use config::LabConfig;
pub use cristian::{CristianEstimate, RoundTripSample};
pub use dispatch::Dispatcher;
pub use error::{ErrorKind, SyncError, SyncResult};
pub use event::{Event, EventId, EventType};
pub use message::{Gate, Message};
pub use rng::DeterministicRng;
pub use simulation::{EventHandler, Simulation, SimulationContext};
pub use time::{ClockReading, VirtualTime};
