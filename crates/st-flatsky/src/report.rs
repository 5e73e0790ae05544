// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::decompose::RootStats;
use serde::{Deserialize, Serialize};

/// Telemetry gathered while synthesising a set of harmonic grids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// Workers that took part.
    pub workers: usize,
    /// Grid rows processed.
    pub rows: usize,
    /// Modes for which coefficients were drawn.
    pub modes: usize,
    /// Modes whose covariance had at least one eigenvalue `≤ 0`.
    pub clamped_modes: usize,
    /// Modes zeroed because the covariance was non-finite or the eigen solver failed.
    pub failed_modes: usize,
    /// Modes zeroed because `|k|` was undefined.
    pub skipped_modes: usize,
    /// Smallest covariance eigenvalue encountered.
    pub min_eigenvalue: f64,
}

impl Default for SynthesisReport {
    fn default() -> Self {
        Self {
            workers: 0,
            rows: 0,
            modes: 0,
            clamped_modes: 0,
            failed_modes: 0,
            skipped_modes: 0,
            min_eigenvalue: f64::INFINITY,
        }
    }
}

impl SynthesisReport {
    pub(crate) fn record_root(&mut self, stats: &RootStats) {
        self.modes += 1;
        if stats.failed {
            self.failed_modes += 1;
            return;
        }
        if stats.clamped > 0 {
            self.clamped_modes += 1;
        }
        self.min_eigenvalue = self.min_eigenvalue.min(stats.min_eigenvalue);
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped_modes += 1;
    }

    /// Folds another worker's report into this one.
    pub fn merge(&mut self, other: &SynthesisReport) {
        self.workers += other.workers;
        self.rows += other.rows;
        self.modes += other.modes;
        self.clamped_modes += other.clamped_modes;
        self.failed_modes += other.failed_modes;
        self.skipped_modes += other.skipped_modes;
        self.min_eigenvalue = self.min_eigenvalue.min(other.min_eigenvalue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_counts_and_tracks_minimum() {
        let mut total = SynthesisReport::default();
        let mut a = SynthesisReport {
            workers: 1,
            ..SynthesisReport::default()
        };
        a.record_root(&RootStats {
            clamped: 1,
            min_eigenvalue: -0.25,
            failed: false,
        });
        let mut b = SynthesisReport {
            workers: 1,
            ..SynthesisReport::default()
        };
        b.record_root(&RootStats {
            clamped: 0,
            min_eigenvalue: 3.0,
            failed: false,
        });
        b.record_root(&RootStats {
            clamped: 0,
            min_eigenvalue: f64::INFINITY,
            failed: true,
        });
        total.merge(&a);
        total.merge(&b);
        assert_eq!(total.workers, 2);
        assert_eq!(total.modes, 3);
        assert_eq!(total.clamped_modes, 1);
        assert_eq!(total.failed_modes, 1);
        assert_eq!(total.min_eigenvalue, -0.25);
    }
}
