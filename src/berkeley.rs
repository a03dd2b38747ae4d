//! Berkeley clock synchronization.
//!
//! A master polls every participant, computes each participant's offset
//! from its own reading, averages the offsets and shifts itself and every
//! participant by that average. Afterwards all clocks have moved by the
//! same amount, so their relative offsets are preserved and the master
//! sits at the centre of the group.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BerkeleyConfig;
use crate::error::{SyncError, SyncResult};
use crate::time::ClockReading;

/// How the average offset is reduced to a whole number of units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingPolicy {
    /// Integer division, truncating toward zero. Bit-compatible with the
    /// classroom program; biases negative averages up toward zero.
    #[default]
    Truncate,
    /// Round to nearest, halves away from zero.
    Nearest,
}

impl RoundingPolicy {
    fn divide(self, sum: i128, n: i128) -> i128 {
        let quotient = sum / n;
        match self {
            RoundingPolicy::Truncate => quotient,
            RoundingPolicy::Nearest => {
                let remainder = sum % n;
                if 2 * remainder.abs() >= n {
                    quotient + sum.signum()
                } else {
                    quotient
                }
            }
        }
    }
}

/// Result of one Berkeley round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BerkeleyOutcome {
    /// `reference − participant_i`, in input order.
    pub offsets: Vec<i64>,
    pub average_offset: i64,
    pub corrected_reference: ClockReading,
    /// `participant_i + average_offset`, in input order.
    pub corrected_participants: Vec<ClockReading>,
}

/// Run Berkeley averaging with truncating division.
///
/// # Errors
/// [`SyncError::EmptyParticipants`] for an empty participant set, and
/// [`SyncError::ReadingOutOfRange`] if an offset or corrected reading
/// overflows.
pub fn synchronize(
    reference: ClockReading,
    participants: &[ClockReading],
) -> SyncResult<BerkeleyOutcome> {
    synchronize_with(reference, participants, RoundingPolicy::Truncate)
}

/// Run Berkeley averaging with an explicit rounding policy.
pub fn synchronize_with(
    reference: ClockReading,
    participants: &[ClockReading],
    rounding: RoundingPolicy,
) -> SyncResult<BerkeleyOutcome> {
    if participants.is_empty() {
        warn!("berkeley: rejecting empty participant set");
        return Err(SyncError::EmptyParticipants);
    }

    let offsets = participants
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let offset = reference
                .checked_diff(p)
                .ok_or(SyncError::ReadingOutOfRange { what: "offset" })?;
            debug!(participant = i + 1, reading = %p, offset, "berkeley: offset");
            Ok(offset)
        })
        .collect::<SyncResult<Vec<i64>>>()?;

    // i128 holds the sum of any number of i64 offsets we could allocate.
    let sum: i128 = offsets.iter().map(|&o| i128::from(o)).sum();
    let average = rounding.divide(sum, participants.len() as i128);
    let average_offset = i64::try_from(average)
        .map_err(|_| SyncError::ReadingOutOfRange { what: "average offset" })?;

    let corrected_reference = reference
        .checked_shift(average_offset)
        .ok_or(SyncError::ReadingOutOfRange {
            what: "corrected reference",
        })?;
    let corrected_participants = participants
        .iter()
        .map(|p| {
            p.checked_shift(average_offset)
                .ok_or(SyncError::ReadingOutOfRange {
                    what: "corrected participant",
                })
        })
        .collect::<SyncResult<Vec<_>>>()?;

    info!(
        participants = participants.len(),
        average_offset,
        %corrected_reference,
        "berkeley: synchronized"
    );

    Ok(BerkeleyOutcome {
        offsets,
        average_offset,
        corrected_reference,
        corrected_participants,
    })
}

// ── Scenario ──────────────────────────────────────────────────────────

/// A master reading plus a set of participants skewed around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BerkeleyScenario {
    pub reference: ClockReading,
    pub participants: Vec<ClockReading>,
}

impl BerkeleyScenario {
    /// Skew `config.participants` clocks uniformly within
    /// `[-max_skew, max_skew]` of `reference`, drawing from `rng`.
    pub fn generate<R: Rng + ?Sized>(
        reference: ClockReading,
        config: &BerkeleyConfig,
        rng: &mut R,
    ) -> SyncResult<Self> {
        if config.max_skew < 0 {
            return Err(SyncError::Config(
                "berkeley.max_skew must not be negative".into(),
            ));
        }

        let participants = (0..config.participants)
            .map(|_| {
                let skew = rng.gen_range(-config.max_skew..=config.max_skew);
                reference
                    .checked_shift(skew)
                    .ok_or(SyncError::ReadingOutOfRange {
                        what: "participant",
                    })
            })
            .collect::<SyncResult<Vec<_>>>()?;

        Ok(BerkeleyScenario {
            reference,
            participants,
        })
    }

    /// Synchronize this scenario's clocks.
    pub fn synchronize(&self, rounding: RoundingPolicy) -> SyncResult<BerkeleyOutcome> {
        synchronize_with(self.reference, &self.participants, rounding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    fn readings(values: &[i64]) -> Vec<ClockReading> {
        values.iter().copied().map(ClockReading::new).collect()
    }

    #[test]
    fn test_balanced_offsets_leave_clocks_unchanged() {
        let participants = readings(&[98, 102, 99, 101, 97, 103]);
        let outcome = synchronize(ClockReading::new(100), &participants).unwrap();

        assert_eq!(outcome.offsets, vec![2, -2, 1, -1, 3, -3]);
        assert_eq!(outcome.average_offset, 0);
        assert_eq!(outcome.corrected_reference, ClockReading::new(100));
        assert_eq!(outcome.corrected_participants, participants);
    }

    #[test]
    fn test_constant_offset() {
        for k in [-7i64, 0, 4, 1_000] {
            let reference = ClockReading::new(500);
            let participants = readings(&[500 - k; 4]);
            let outcome = synchronize(reference, &participants).unwrap();

            assert_eq!(outcome.average_offset, k);
            assert_eq!(outcome.corrected_reference, ClockReading::new(500 + k));
            assert!(outcome.offsets.iter().all(|&o| o == k));
            // Every participant lands on the original master reading.
            assert!(outcome
                .corrected_participants
                .iter()
                .all(|&p| p == reference));
        }
    }

    #[test]
    fn test_relative_offsets_preserved() {
        let reference = ClockReading::new(1_000);
        let participants = readings(&[990, 1_004, 1_013, 997]);
        let outcome = synchronize(reference, &participants).unwrap();

        for (before, after) in participants.iter().zip(&outcome.corrected_participants) {
            assert_eq!(
                outcome.corrected_reference.checked_diff(*after),
                reference.checked_diff(*before)
            );
        }
    }

    #[test]
    fn test_single_participant() {
        let outcome = synchronize(ClockReading::new(10), &readings(&[4])).unwrap();
        assert_eq!(outcome.average_offset, 6);
        assert_eq!(outcome.corrected_reference, ClockReading::new(16));
        assert_eq!(outcome.corrected_participants, readings(&[10]));
    }

    #[test]
    fn test_empty_participants_rejected() {
        let err = synchronize(ClockReading::new(100), &[]).unwrap_err();
        assert!(matches!(err, SyncError::EmptyParticipants));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_truncates_toward_zero() {
        // offsets [-1, -1, 0] → sum −2, −2/3 truncates to 0.
        let outcome = synchronize(ClockReading::new(0), &readings(&[1, 1, 0])).unwrap();
        assert_eq!(outcome.average_offset, 0);

        // offsets [3, 2] → 5/2 truncates to 2.
        let outcome = synchronize(ClockReading::new(5), &readings(&[2, 3])).unwrap();
        assert_eq!(outcome.average_offset, 2);
    }

    #[test]
    fn test_nearest_rounding() {
        let nearest = RoundingPolicy::Nearest;
        let outcome =
            synchronize_with(ClockReading::new(0), &readings(&[1, 1, 0]), nearest).unwrap();
        assert_eq!(outcome.average_offset, -1);

        let outcome = synchronize_with(ClockReading::new(5), &readings(&[2, 3]), nearest).unwrap();
        assert_eq!(outcome.average_offset, 3);

        let outcome = synchronize_with(ClockReading::new(0), &readings(&[2, 3]), nearest).unwrap();
        assert_eq!(outcome.average_offset, -3);

        let outcome =
            synchronize_with(ClockReading::new(0), &readings(&[-1, 0, 0]), nearest).unwrap();
        assert_eq!(outcome.average_offset, 0);
    }

    #[test]
    fn test_large_offsets_do_not_overflow_the_sum() {
        let reference = ClockReading::new(0);
        let participants = readings(&[-(i64::MAX), -(i64::MAX), -(i64::MAX)]);
        let outcome = synchronize(reference, &participants).unwrap();
        assert_eq!(outcome.average_offset, i64::MAX);
        assert_eq!(outcome.corrected_reference, ClockReading::new(i64::MAX));
    }

    #[test]
    fn test_unrepresentable_offset_rejected() {
        let err = synchronize(ClockReading::new(i64::MAX), &readings(&[-1])).unwrap_err();
        assert!(matches!(err, SyncError::ReadingOutOfRange { what: "offset" }));
    }

    #[test]
    fn test_scenario_is_seeded() {
        let config = BerkeleyConfig::default();
        let reference = ClockReading::new(1_700_000_000);

        let a = BerkeleyScenario::generate(reference, &config, &mut DeterministicRng::new(42))
            .unwrap();
        let b = BerkeleyScenario::generate(reference, &config, &mut DeterministicRng::new(42))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.participants.len(), 6);
        for p in &a.participants {
            let skew = p.checked_diff(reference).unwrap();
            assert!((-5..=5).contains(&skew), "skew {} out of bounds", skew);
        }
    }

    #[test]
    fn test_scenario_zero_skew() {
        let config = BerkeleyConfig {
            max_skew: 0,
            ..BerkeleyConfig::default()
        };
        let reference = ClockReading::new(77);
        let scenario =
            BerkeleyScenario::generate(reference, &config, &mut DeterministicRng::new(1)).unwrap();
        let outcome = scenario.synchronize(RoundingPolicy::Truncate).unwrap();
        assert_eq!(outcome.average_offset, 0);
        assert!(outcome.corrected_participants.iter().all(|&p| p == reference));
    }
}
