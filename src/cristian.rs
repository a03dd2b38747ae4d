//! Cristian's clock synchronization.
//!
//! The client notes when it sends a request (T0), the server answers with
//! its own clock (Ts), and the client notes when the answer arrives (T1).
//! Assuming both legs took equally long, the server's clock read
//! `Ts + (T1 − T0) / 2` at the moment the answer arrived.
//!
//! [`estimate`] is the pure computation. [`CristianExchange`] produces
//! samples by running the exchange on the simulation kernel, with the
//! network legs as virtual-time delays.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CristianConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::{Event, EventType};
use crate::simulation::{EventHandler, Simulation, SimulationContext};
use crate::time::{ClockReading, VirtualTime};

/// One request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundTripSample {
    /// T0: client clock when the request left.
    pub request: ClockReading,
    /// Ts: the time the server reported.
    pub server: ClockReading,
    /// T1: client clock when the response arrived.
    pub response: ClockReading,
}

impl RoundTripSample {
    pub fn new(request: i64, server: i64, response: i64) -> Self {
        RoundTripSample {
            request: ClockReading::new(request),
            server: ClockReading::new(server),
            response: ClockReading::new(response),
        }
    }

    /// `T1 − T0`, rejecting responses that precede their request.
    pub fn rtt(&self) -> SyncResult<i64> {
        match self.response.checked_diff(self.request) {
            Some(rtt) if rtt >= 0 => Ok(rtt),
            Some(_) => Err(SyncError::NegativeRoundTrip {
                request: self.request,
                response: self.response,
            }),
            None => Err(SyncError::ReadingOutOfRange {
                what: "round trip",
            }),
        }
    }
}

/// The client's estimate of the server clock at T1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CristianEstimate {
    pub rtt: i64,
    /// `rtt / 2`, truncated.
    pub one_way_delay: i64,
    pub synchronized: ClockReading,
    /// T1 as the client saw it before correcting.
    pub client_time: ClockReading,
}

impl CristianEstimate {
    /// How far the client clock must move: `synchronized − T1`.
    pub fn correction(&self) -> Option<i64> {
        self.synchronized.checked_diff(self.client_time)
    }
}

/// Estimate the synchronized client time from one sample.
///
/// # Errors
/// [`SyncError::NegativeRoundTrip`] if `T1 < T0`.
pub fn estimate(sample: &RoundTripSample) -> SyncResult<CristianEstimate> {
    let rtt = sample.rtt().inspect_err(|err| {
        warn!(%err, "cristian: rejecting sample");
    })?;
    let one_way_delay = rtt / 2;
    let synchronized =
        sample
            .server
            .checked_shift(one_way_delay)
            .ok_or(SyncError::ReadingOutOfRange {
                what: "synchronized time",
            })?;

    info!(rtt, one_way_delay, %synchronized, "cristian: estimated");

    Ok(CristianEstimate {
        rtt,
        one_way_delay,
        synchronized,
        client_time: sample.response,
    })
}

/// Estimate from the sample with the smallest non-negative RTT. The
/// asymmetry error is at most half the RTT. Samples with a negative RTT
/// are skipped.
///
/// # Errors
/// [`SyncError::NoSamples`] when no usable sample remains.
pub fn best_estimate(samples: &[RoundTripSample]) -> SyncResult<CristianEstimate> {
    let best = samples
        .iter()
        .filter_map(|s| s.rtt().ok().map(|rtt| (rtt, s)))
        .min_by_key(|(rtt, _)| *rtt)
        .map(|(_, s)| s)
        .ok_or(SyncError::NoSamples)?;
    estimate(best)
}

// ── Simulated exchange ────────────────────────────────────────────────

/// Event handler that plays both client and server.
///
/// The client clock follows virtual time; the server clock runs
/// `server_offset` units ahead of it.
pub struct CristianExchange<'r, R: Rng + ?Sized> {
    request_delay: u64,
    response_delay: u64,
    jitter: u64,
    server_offset: i64,
    rng: &'r mut R,
    samples: Vec<RoundTripSample>,
    failure: Option<SyncError>,
}

impl<'r, R: Rng + ?Sized> CristianExchange<'r, R> {
    pub fn new(config: &CristianConfig, rng: &'r mut R) -> Self {
        CristianExchange {
            request_delay: config.request_delay,
            response_delay: config.response_delay,
            jitter: config.jitter,
            server_offset: config.server_offset,
            rng,
            samples: Vec::new(),
            failure: None,
        }
    }

    /// Completed samples, in completion order.
    pub fn samples(&self) -> &[RoundTripSample] {
        &self.samples
    }

    /// The samples, or the error that stopped the exchange.
    pub fn into_samples(self) -> SyncResult<Vec<RoundTripSample>> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.samples),
        }
    }

    fn leg_delay(&mut self, base: u64) -> u64 {
        if self.jitter == 0 {
            base
        } else {
            base.saturating_add(self.rng.gen_range(0..=self.jitter))
        }
    }

    fn client_clock(now: VirtualTime) -> ClockReading {
        ClockReading::from_virtual(now)
    }

    fn server_clock(&self, now: VirtualTime) -> SyncResult<ClockReading> {
        Self::client_clock(now)
            .checked_shift(self.server_offset)
            .ok_or(SyncError::ReadingOutOfRange {
                what: "server clock",
            })
    }
}

impl<R: Rng + ?Sized> EventHandler for CristianExchange<'_, R> {
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) {
        match event.payload {
            EventType::ClientRequest { round } => {
                let request = Self::client_clock(ctx.now());
                let delay = self.leg_delay(self.request_delay);
                debug!(round, %request, delay, "cristian: request sent");
                ctx.schedule_after(delay, EventType::ServerReply { round, request });
            }
            EventType::ServerReply { round, request } => {
                let server = match self.server_clock(ctx.now()) {
                    Ok(server) => server,
                    Err(err) => {
                        warn!(round, %err, "cristian: server clock unreadable");
                        self.failure = Some(err);
                        return;
                    }
                };
                let delay = self.leg_delay(self.response_delay);
                debug!(round, %server, delay, "cristian: server replied");
                ctx.schedule_after(
                    delay,
                    EventType::ClientReceive {
                        round,
                        request,
                        server,
                    },
                );
            }
            EventType::ClientReceive {
                round,
                request,
                server,
            } => {
                let response = Self::client_clock(ctx.now());
                debug!(round, %response, "cristian: response received");
                self.samples.push(RoundTripSample {
                    request,
                    server,
                    response,
                });
            }
            _ => {}
        }
    }
}

/// Run `config.rounds` sequential exchanges and return their samples.
///
/// Each round starts once the previous one has completed.
pub fn run_exchange<R: Rng + ?Sized>(
    config: &CristianConfig,
    rng: &mut R,
) -> SyncResult<Vec<RoundTripSample>> {
    config.check()?;

    let mut sim = Simulation::new();
    let mut exchange = CristianExchange::new(config, rng);
    let mut next_start = VirtualTime::new(config.start);

    for round in 0..config.rounds {
        sim.schedule(next_start, EventType::ClientRequest { round });
        sim.run(&mut exchange);
        if exchange.failure.is_some() {
            break;
        }
        next_start = sim.current_time();
    }

    exchange.into_samples()
}
