//! Deterministic randomness.
//!
//! Everything random in clocklab (participant skew, exchange jitter,
//! dispatcher gate choice) draws from a generator passed in by the
//! caller. [`DeterministicRng`] is the default: a SplitMix64 generator
//! that plugs into `rand` through `RngCore` and `SeedableRng`, so the
//! usual `Rng::gen_range` helpers work on it.

use rand::{RngCore, SeedableRng};

/// SplitMix64, a fast deterministic PRNG.
///
/// Produces identical sequences for a given seed on every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    /// Create a new RNG from a seed.
    pub fn new(seed: u64) -> Self {
        DeterministicRng { state: seed }
    }

    /// Current internal state (useful for snapshotting).
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for DeterministicRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        DeterministicRng::new(u64::from_le_bytes(seed))
    }

    // The raw seed is the state; skip rand's PCG expansion so that
    // `seed_from_u64(s)` and `new(s)` agree.
    fn seed_from_u64(state: u64) -> Self {
        DeterministicRng::new(state)
    }
}
