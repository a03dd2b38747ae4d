//! Scenario configuration.
//!
//! A [`LabConfig`] describes the synthetic inputs for all three demos. It
//! deserializes from JSON; every field has a default matching the
//! classroom scenario (six participants within ±5 units, two 100-unit
//! network legs, fair two-way dispatch).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::berkeley::RoundingPolicy;
use crate::error::{SyncError, SyncResult};
use crate::time::ClockReading;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Seed for every random draw in a run.
    pub seed: u64,
    pub berkeley: BerkeleyConfig,
    pub cristian: CristianConfig,
    pub dispatch: DispatchConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        LabConfig {
            seed: 42,
            berkeley: BerkeleyConfig::default(),
            cristian: CristianConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl LabConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: LabConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &Path) -> SyncResult<Self> {
        debug!(path = %path.display(), "loading config");
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values no scenario can run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.berkeley.participants == 0 {
            return Err(SyncError::Config(
                "berkeley.participants must be at least 1".into(),
            ));
        }
        if self.berkeley.max_skew < 0 {
            return Err(SyncError::Config(
                "berkeley.max_skew must not be negative".into(),
            ));
        }
        self.cristian.check()
    }
}

/// Inputs for the Berkeley scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BerkeleyConfig {
    /// Master clock reading. `None` means "now" at the CLI edge.
    pub reference: Option<i64>,
    /// Number of participant clocks.
    pub participants: usize,
    /// Participants are skewed uniformly within `[-max_skew, max_skew]`.
    pub max_skew: i64,
    pub rounding: RoundingPolicy,
}

impl Default for BerkeleyConfig {
    fn default() -> Self {
        BerkeleyConfig {
            reference: None,
            participants: 6,
            max_skew: 5,
            rounding: RoundingPolicy::Truncate,
        }
    }
}

/// Inputs for the simulated Cristian exchange. Delays are virtual ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CristianConfig {
    /// Virtual time of the first request.
    pub start: u64,
    /// Client → server transit.
    pub request_delay: u64,
    /// Server → client transit.
    pub response_delay: u64,
    /// Extra per-leg delay drawn from `[0, jitter]`.
    pub jitter: u64,
    /// How far the server clock runs ahead of the client clock.
    pub server_offset: i64,
    pub rounds: u32,
}

impl CristianConfig {
    /// Latest virtual time the exchange can reach, with every leg taking
    /// its full jitter.
    pub fn worst_case_end(&self) -> SyncResult<u64> {
        let overflow = || SyncError::Config("cristian timeline overflows virtual time".into());
        let leg = |base: u64| base.checked_add(self.jitter);
        let round = leg(self.request_delay)
            .zip(leg(self.response_delay))
            .and_then(|(to_server, to_client)| to_server.checked_add(to_client))
            .ok_or_else(overflow)?;
        round
            .checked_mul(u64::from(self.rounds))
            .and_then(|total| total.checked_add(self.start))
            .ok_or_else(overflow)
    }

    /// Reject exchanges whose client or server clock cannot be read over
    /// the whole timeline.
    pub fn check(&self) -> SyncResult<()> {
        if self.rounds == 0 {
            return Err(SyncError::Config("cristian.rounds must be at least 1".into()));
        }

        let end = self.worst_case_end()?;
        let client_range = [self.start, end].map(|t| {
            i64::try_from(t)
                .map(ClockReading::new)
                .map_err(|_| SyncError::ReadingOutOfRange {
                    what: "client clock",
                })
        });
        for client in client_range {
            // Shifting is monotonic, so both ends in range means every
            // reading in between is too.
            client?
                .checked_shift(self.server_offset)
                .ok_or(SyncError::ReadingOutOfRange {
                    what: "server clock",
                })?;
        }
        Ok(())
    }
}

impl Default for CristianConfig {
    fn default() -> Self {
        CristianConfig {
            start: 0,
            request_delay: 100,
            response_delay: 100,
            jitter: 0,
            server_offset: 0,
            rounds: 1,
        }
    }
}

/// Inputs for the load-balancer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub messages: u64,
    /// Ticks between consecutive arrivals.
    pub interval: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            messages: 10,
            interval: 1,
        }
    }
}
