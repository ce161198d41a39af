// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use phasebridge::{EncodeOptions, PayloadMode, PhaseDtype, PolicyConfig};

/// Alphabet sizes the round-trip contract is exercised on.
pub const ALPHABETS: [u64; 6] = [2, 3, 256, 65_536, 70_000, 1 << 32];

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Zero seeds are replaced with 1.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

/// Both ends of the alphabet, the midpoint, and a seeded spread in between.
pub fn symbols_for(m: u64, count: usize) -> Vec<u64> {
    let mut out = vec![0, 1 % m, m / 2, m - 2, m - 1];
    let mut rng = XorShift64::new(m);
    out.extend((0..count).map(|_| rng.next_u64() % m));
    out
}

/// Every (mode, policy) pair whose dtype is policy-valid for `m`.
pub fn option_grid(m: u64) -> Vec<(EncodeOptions, PhaseDtype)> {
    let mut grid = Vec::new();
    for mode in [PayloadMode::Eager, PayloadMode::Lazy] {
        let wide = EncodeOptions {
            mode,
            ..EncodeOptions::default()
        };
        grid.push((wide, PhaseDtype::Wide));
        let narrow = EncodeOptions {
            mode,
            policy: PolicyConfig::narrow(),
            ..EncodeOptions::default()
        };
        let dtype = PolicyConfig::narrow().resolve(m).dtype;
        grid.push((narrow, dtype));
    }
    grid
}
