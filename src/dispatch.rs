//! Random two-way dispatch.
//!
//! [`route`] picks one of two output gates uniformly at random without
//! looking at the message. [`LoadBalancer`] wraps it as a simulation
//! handler: every arriving message is forwarded, unchanged and with no
//! delay, out of the chosen gate.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DispatchConfig;
use crate::event::{Event, EventType};
use crate::message::{Gate, Message};
use crate::simulation::{EventHandler, Simulation, SimulationContext};
use crate::time::VirtualTime;

// ── Routing ───────────────────────────────────────────────────────────

/// Choose a gate uniformly at random. The message is not inspected.
pub fn route<R: Rng + ?Sized, M: ?Sized>(rng: &mut R, _message: &M) -> Gate {
    if rng.gen_range(0..=1) == 0 {
        Gate::Out0
    } else {
        Gate::Out1
    }
}

/// A router that owns its randomness source.
#[derive(Debug, Clone)]
pub struct Dispatcher<R> {
    rng: R,
}

impl<R: Rng> Dispatcher<R> {
    pub fn new(rng: R) -> Self {
        Dispatcher { rng }
    }

    pub fn route<M: ?Sized>(&mut self, message: &M) -> Gate {
        route(&mut self.rng, message)
    }

    pub fn into_rng(self) -> R {
        self.rng
    }
}

// ── Load balancer ─────────────────────────────────────────────────────

/// Per-gate delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub out0: usize,
    pub out1: usize,
}

impl GateStats {
    pub fn total(&self) -> usize {
        self.out0 + self.out1
    }
}

/// Simulation handler that routes `MessageArrival`s to two sinks.
pub struct LoadBalancer<'r, R: ?Sized> {
    rng: &'r mut R,
    sinks: [Vec<(VirtualTime, Message)>; 2],
}

impl<'r, R: Rng + ?Sized> LoadBalancer<'r, R> {
    pub fn new(rng: &'r mut R) -> Self {
        LoadBalancer {
            rng,
            sinks: [Vec::new(), Vec::new()],
        }
    }

    /// Messages delivered out of `gate`, with their delivery time.
    pub fn delivered(&self, gate: Gate) -> &[(VirtualTime, Message)] {
        &self.sinks[gate.index()]
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            out0: self.sinks[0].len(),
            out1: self.sinks[1].len(),
        }
    }
}

impl<R: Rng + ?Sized> EventHandler for LoadBalancer<'_, R> {
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) {
        match &event.payload {
            EventType::MessageArrival { message } => {
                let gate = route(&mut *self.rng, message);
                debug!(%message, %gate, "dispatch: routed");
                ctx.schedule_after(
                    0,
                    EventType::GateDelivery {
                        gate,
                        message: message.clone(),
                    },
                );
            }
            EventType::GateDelivery { gate, message } => {
                self.sinks[gate.index()].push((ctx.now(), message.clone()));
            }
            _ => {}
        }
    }
}

/// Outcome of a load-balancer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// `(message, gate)` in delivery order.
    pub deliveries: Vec<(Message, Gate)>,
    pub stats: GateStats,
}

/// Inject `config.messages` arrivals, `config.interval` ticks apart, and
/// run the balancer until every message has been delivered.
pub fn run_load_balancer<R: Rng + ?Sized>(config: &DispatchConfig, rng: &mut R) -> DispatchReport {
    let mut sim = Simulation::new();
    for id in 0..config.messages {
        let at = VirtualTime::new(id.saturating_mul(config.interval));
        sim.schedule(
            at,
            EventType::MessageArrival {
                message: Message::new(id, format!("msg-{}", id)),
            },
        );
    }

    let mut balancer = LoadBalancer::new(rng);
    sim.run(&mut balancer);

    let stats = balancer.stats();
    let mut deliveries: Vec<(VirtualTime, Message, Gate)> = [Gate::Out0, Gate::Out1]
        .into_iter()
        .flat_map(|gate| {
            balancer
                .delivered(gate)
                .iter()
                .map(move |(at, m)| (*at, m.clone(), gate))
        })
        .collect();
    deliveries.sort_by_key(|(at, m, _)| (*at, m.id));

    info!(out0 = stats.out0, out1 = stats.out1, "dispatch: run complete");

    DispatchReport {
        deliveries: deliveries.into_iter().map(|(_, m, g)| (m, g)).collect(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    #[test]
    fn test_route_is_deterministic_per_seed() {
        let msg = Message::new(0, "x");
        let run = |seed| {
            let mut d = Dispatcher::new(DeterministicRng::new(seed));
            (0..64).map(|_| d.route(&msg)).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_dispatcher_matches_free_route() {
        let mut d = Dispatcher::new(DeterministicRng::new(5));
        for id in 0..3 {
            d.route(&Message::new(id, "x"));
        }
        let mut reference = DeterministicRng::new(5);
        for _ in 0..3 {
            route(&mut reference, &());
        }
        assert_eq!(d.into_rng().state(), reference.state());
    }

    #[test]
    fn test_route_uses_both_gates_roughly_evenly() {
        let mut rng = DeterministicRng::new(7);
        let out1 = (0..1000)
            .filter(|_| route(&mut rng, &()) == Gate::Out1)
            .count();
        assert!(
            (400..600).contains(&out1),
            "out1 count {} is far from uniform",
            out1
        );
    }

    #[test]
    fn test_load_balancer_forwards_every_message_unchanged() {
        let config = DispatchConfig {
            messages: 25,
            interval: 3,
        };
        let report = run_load_balancer(&config, &mut DeterministicRng::new(11));

        assert_eq!(report.stats.total(), 25);
        let ids: Vec<u64> = report.deliveries.iter().map(|(m, _)| m.id).collect();
        assert_eq!(ids, (0..25).collect::<Vec<_>>());
        for (m, _) in &report.deliveries {
            assert_eq!(m.body, format!("msg-{}", m.id));
        }
    }

    #[test]
    fn test_delivery_has_no_delay() {
        let mut sim = Simulation::new();
        sim.schedule(
            VirtualTime::new(9),
            EventType::MessageArrival {
                message: Message::new(1, "hi"),
            },
        );

        let mut rng = DeterministicRng::new(3);
        let mut balancer = LoadBalancer::new(&mut rng);
        sim.run(&mut balancer);

        let stats = balancer.stats();
        assert_eq!(stats.total(), 1);
        let gate = if stats.out0 == 1 { Gate::Out0 } else { Gate::Out1 };
        assert_eq!(
            balancer.delivered(gate),
            &[(VirtualTime::new(9), Message::new(1, "hi"))]
        );
    }

    #[test]
    fn test_empty_run() {
        let config = DispatchConfig {
            messages: 0,
            interval: 1,
        };
        let report = run_load_balancer(&config, &mut DeterministicRng::new(0));
        assert_eq!(report.stats, GateStats::default());
        assert!(report.deliveries.is_empty());
    }
}
