/// Deterministic event scheduler.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(scheduled_at, event_id)`. Event IDs are strictly
/// increasing, so two runs with the same inputs dispatch in the same order.

use std::collections::BinaryHeap;

use crate::event::{Event, EventId, EventIdGen, EventType};
use crate::time::VirtualTime;

/// Owns the event queue and the ID generator.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Event>,
    id_gen: EventIdGen,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule a new event at the given virtual time.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.push(Event::new(id, at, payload));
        id
    }

    /// Pop the next event (earliest time, lowest ID).
    pub fn pop_next(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    pub fn peek_next(&self) -> Option<&Event> {
        self.queue.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drain all events in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.queue.len());
        while let Some(e) = self.queue.pop() {
            events.push(e);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_at_same_time() {
        let mut sched = Scheduler::new();

        for round in 0..3 {
            sched.schedule(VirtualTime::new(10), EventType::ClientRequest { round });
        }

        let rounds: Vec<EventType> = sched.drain_ordered().into_iter().map(|e| e.payload).collect();
        assert_eq!(
            rounds,
            vec![
                EventType::ClientRequest { round: 0 },
                EventType::ClientRequest { round: 1 },
                EventType::ClientRequest { round: 2 },
            ]
        );
    }

    #[test]
    fn test_time_ordering() {
        let mut sched = Scheduler::new();

        sched.schedule(VirtualTime::new(30), EventType::Noop);
        sched.schedule(VirtualTime::new(10), EventType::Noop);
        sched.schedule(VirtualTime::new(20), EventType::Noop);

        assert_eq!(sched.peek_next().unwrap().scheduled_at, VirtualTime::new(10));
        let times: Vec<u64> = sched
            .drain_ordered()
            .iter()
            .map(|e| e.scheduled_at.ticks())
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn test_mixed_ordering() {
        let mut sched = Scheduler::new();
        for t in [50, 10, 10, 30, 10] {
            sched.schedule(VirtualTime::new(t), EventType::Noop);
        }

        let events = sched.drain_ordered();
        for window in events.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                (a.scheduled_at, a.id) <= (b.scheduled_at, b.id),
                "Events out of order: {:?} vs {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_empty_scheduler() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.len(), 0);
        assert!(sched.pop_next().is_none());
    }
}
