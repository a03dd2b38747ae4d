/// Simulation execution loop.
///
/// Pops events, advances virtual time and hands each event to a
/// handler. Synchronous and single-threaded; the Cristian exchange and
/// the load balancer both run on top of it instead of sleeping.

use tracing::trace;

use crate::event::{Event, EventId, EventType};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

// ── Handler trait ─────────────────────────────────────────────────────

/// Reacts to dispatched events, scheduling follow-ups through the context.
pub trait EventHandler {
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event);
}

impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext, &Event),
{
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) {
        (self)(ctx, event);
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// Mutable context passed to the handler on every dispatch.
///
/// Borrows the scheduler, so a handler can only affect ordering through
/// the schedule API.
pub struct SimulationContext<'a> {
    scheduler: &'a mut Scheduler,
    now: VirtualTime,
}

impl SimulationContext<'_> {
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Schedule an event at an absolute virtual time.
    ///
    /// # Panics
    /// Panics if `at` is before the current time.
    pub fn schedule_at(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        assert!(
            at >= self.now,
            "Cannot schedule event in the past: now={}, at={}",
            self.now,
            at
        );
        self.scheduler.schedule(at, payload)
    }

    /// Schedule an event `delay` ticks after now.
    ///
    /// # Panics
    /// Panics on virtual time overflow.
    pub fn schedule_after(&mut self, delay: u64, payload: EventType) -> EventId {
        let at = self
            .now
            .plus(delay)
            .expect("VirtualTime overflow when scheduling");
        self.scheduler.schedule(at, payload)
    }

    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    scheduler: Scheduler,
    current_time: VirtualTime,
    events_processed: u64,
}

impl Simulation {
    /// Create a new simulation starting at time zero.
    pub fn new() -> Self {
        Simulation {
            scheduler: Scheduler::new(),
            current_time: VirtualTime::ZERO,
            events_processed: 0,
        }
    }

    pub fn current_time(&self) -> VirtualTime {
        self.current_time
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Seed an event before (or between) runs.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        self.scheduler.schedule(at, payload)
    }

    /// Pop one event, advance time, dispatch. `None` when the queue is empty.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> Option<Event> {
        let event = self.scheduler.pop_next()?;

        assert!(
            event.scheduled_at >= self.current_time,
            "Time went backward! current={}, event={}",
            self.current_time,
            event.scheduled_at
        );
        self.current_time = event.scheduled_at;
        self.events_processed += 1;
        trace!(id = %event.id, at = %event.scheduled_at, event = %event.payload, "dispatch");

        let mut ctx = SimulationContext {
            scheduler: &mut self.scheduler,
            now: self.current_time,
        };
        handler.handle(&mut ctx, &event);

        Some(event)
    }

    /// Run until the queue is empty. Returns events processed in this call.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> u64 {
        let start = self.events_processed;
        while self.step(handler).is_some() {}
        self.events_processed - start
    }

    /// Run until the queue is empty or `max_steps` events were dispatched.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler) -> u64 {
        let start = self.events_processed;
        let mut steps = 0u64;
        while steps < max_steps && self.step(handler).is_some() {
            steps += 1;
        }
        self.events_processed - start
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new();

        sim.schedule(VirtualTime::new(10), EventType::ClientRequest { round: 0 });
        sim.schedule(VirtualTime::new(20), EventType::ClientRequest { round: 1 });
        sim.schedule(VirtualTime::new(30), EventType::ClientRequest { round: 2 });

        let mut seen: Vec<u32> = Vec::new();
        let processed = sim.run(&mut |_ctx: &mut SimulationContext, event: &Event| {
            if let EventType::ClientRequest { round } = event.payload {
                seen.push(round);
            }
        });

        assert_eq!(processed, 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(sim.current_time(), VirtualTime::new(30));
    }

    #[test]
    fn test_handler_schedules_followup() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::new(0), EventType::Noop);

        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| {
            times.push(ctx.now().ticks());
            if ctx.now().ticks() < 30 {
                ctx.schedule_after(10, EventType::Noop);
            }
        });

        assert_eq!(times, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new();
        for i in 0..100 {
            sim.schedule(VirtualTime::new(i), EventType::Noop);
        }

        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        assert_eq!(sim.run_for(10, &mut noop), 10);
        assert_eq!(sim.events_processed(), 10);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_time_monotonicity() {
        let mut sim = Simulation::new();
        for t in [100, 50, 75, 10] {
            sim.schedule(VirtualTime::new(t), EventType::Noop);
        }

        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| {
            times.push(ctx.now().ticks());
        });
        assert_eq!(times, vec![10, 50, 75, 100]);
    }

    #[test]
    #[should_panic(expected = "Cannot schedule event in the past")]
    fn test_non_causal_schedule_panics() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::new(10), EventType::Noop);
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| {
            ctx.schedule_at(VirtualTime::new(5), EventType::Noop);
        });
    }

    #[test]
    fn test_empty_simulation() {
        let mut sim = Simulation::new();
        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        assert_eq!(sim.run(&mut noop), 0);
        assert!(sim.is_finished());
    }
}
