// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Worker-private Gaussian deviate streams.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Seeded stream of independent standard normal pairs.
#[derive(Clone, Debug)]
pub struct DeviateSource {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeviateSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Real and imaginary parts of one complex deviate, each `N(0, 1)`.
    #[inline]
    pub fn gaussian_pair(&mut self) -> (f64, f64) {
        let re: f64 = self.rng.sample(StandardNormal);
        let im: f64 = self.rng.sample(StandardNormal);
        (re, im)
    }
}
