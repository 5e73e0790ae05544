// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Per-mode channel covariance.

use crate::evaluator::SpectrumEvaluator;
use crate::geometry::FlatSkyGeometry;
use nalgebra::DMatrix;

/// Fills the `nmaps × nmaps` covariance of one frequency mode.
///
/// Entry `(i, j)` is `0.5 / (Δkx·Δky) · C_ij(|k|)`: each of the real and
/// imaginary parts of a coefficient carries half the power of a frequency cell.
#[derive(Clone, Copy, Debug)]
pub struct CovarianceBuilder {
    nmaps: usize,
    scale: f64,
}

impl CovarianceBuilder {
    pub fn new(geometry: &FlatSkyGeometry, nmaps: usize) -> Self {
        Self {
            nmaps,
            scale: 0.5 * geometry.inv_dk_volume(),
        }
    }

    pub fn nmaps(&self) -> usize {
        self.nmaps
    }

    /// Normalisation applied to every spectrum value.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Writes the covariance at `kmod` into `out`, which must be `nmaps × nmaps`.
    pub fn fill<S: SpectrumEvaluator>(
        &self,
        spectra: &S,
        kmod: f64,
        cache: &mut S::Cache,
        out: &mut DMatrix<f64>,
    ) {
        debug_assert_eq!(out.shape(), (self.nmaps, self.nmaps));
        let mut pair = 0;
        for i in 0..self.nmaps {
            for j in i..self.nmaps {
                let value = self.scale * spectra.evaluate(pair, kmod, cache);
                out[(i, j)] = value;
                if i != j {
                    out[(j, i)] = value;
                }
                pair += 1;
            }
        }
    }

    /// Allocating variant of [`Self::fill`].
    pub fn build<S: SpectrumEvaluator>(
        &self,
        spectra: &S,
        kmod: f64,
        cache: &mut S::Cache,
    ) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(self.nmaps, self.nmaps);
        self.fill(spectra, kmod, cache, &mut out);
        out
    }
}
