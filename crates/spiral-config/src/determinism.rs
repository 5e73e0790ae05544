// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Seeding and worker-count configuration for the field synthesisers.
//!
//! Every worker draws from its own stream seeded with `base_seed + worker`.
//! Output is therefore reproducible for a fixed `(base_seed, workers)` pair but
//! changes when the worker count changes, since a different ordinal ends up
//! seeding each block of rows.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Seed used when `FLATSKY_SEED` is not set.
pub const DEFAULT_BASE_SEED: u64 = 42;

/// Unified synthesis runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Base seed used to derive per-worker seeds.
    pub base_seed: u64,
    /// Explicit worker count. `None` defers to the rayon global pool size.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_seed: DEFAULT_BASE_SEED,
            workers: None,
        }
    }
}

impl SynthesisConfig {
    /// Builds a configuration snapshot from environment variables.
    pub fn from_env() -> Self {
        let base_seed = std::env::var("FLATSKY_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_BASE_SEED);

        let workers = std::env::var("FLATSKY_WORKERS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0);

        Self { base_seed, workers }
    }
}

/// Per-worker seed rule shared by every synthesiser.
#[inline]
pub fn worker_seed(base_seed: u64, worker: usize) -> u64 {
    base_seed.wrapping_add(worker as u64)
}

static CONFIG: OnceLock<SynthesisConfig> = OnceLock::new();

/// Returns the lazily initialised synthesis configuration.
pub fn config() -> &'static SynthesisConfig {
    CONFIG.get_or_init(SynthesisConfig::from_env)
}

/// Overrides the synthesis configuration. Intended for tests; has no effect
/// once [`config`] has been read.
pub fn configure(cfg: SynthesisConfig) -> &'static SynthesisConfig {
    CONFIG.get_or_init(|| cfg)
}
