// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Symmetric square root of a mode covariance.
//!
//! The root is `S = V·diag(√max(λ, 0))`, so `S·Sᵀ` reproduces the covariance
//! whenever it is positive semi-definite. Eigen-directions with `λ ≤ 0` receive
//! no power at all; slightly inconsistent cross-spectra are regularised here
//! rather than rejected. If the covariance holds a non-finite entry, the eigen
//! solver fails to converge, or it returns a non-finite eigenpair, the whole
//! root is zero and the mode is reported as failed.

use nalgebra::{DMatrix, SymmetricEigen};

const MAX_SWEEPS: usize = 1_000;

/// Outcome of one decomposition.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RootStats {
    /// Eigenvalues that were `≤ 0` and clamped to zero.
    pub clamped: usize,
    /// Smallest eigenvalue before clamping (`+∞` when the solver failed).
    pub min_eigenvalue: f64,
    /// Whether the covariance was non-finite or the eigen solver gave no usable result.
    pub failed: bool,
}

/// Eigendecomposition-based square root with a reusable output buffer.
#[derive(Clone, Debug)]
pub struct SpectralDecomposer {
    root: DMatrix<f64>,
}

impl SpectralDecomposer {
    pub fn new(nmaps: usize) -> Self {
        Self {
            root: DMatrix::zeros(nmaps, nmaps),
        }
    }

    /// Computes the root of `covariance`; the result is available via [`Self::root`].
    pub fn decompose(&mut self, covariance: &DMatrix<f64>) -> RootStats {
        if !covariance.iter().all(|v| v.is_finite()) {
            return self.fail();
        }
        let eigen = match SymmetricEigen::try_new(covariance.clone(), f64::EPSILON, MAX_SWEEPS) {
            Some(eigen) => eigen,
            None => return self.fail(),
        };
        if !eigen.eigenvalues.iter().all(|v| v.is_finite())
            || !eigen.eigenvectors.iter().all(|v| v.is_finite())
        {
            return self.fail();
        }

        let mut stats = RootStats {
            clamped: 0,
            min_eigenvalue: f64::INFINITY,
            failed: false,
        };
        self.root.copy_from(&eigen.eigenvectors);
        for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
            stats.min_eigenvalue = stats.min_eigenvalue.min(lambda);
            let amplitude = if lambda > 0.0 {
                lambda.sqrt()
            } else {
                stats.clamped += 1;
                0.0
            };
            for value in self.root.column_mut(k).iter_mut() {
                *value *= amplitude;
            }
        }
        stats
    }

    fn fail(&mut self) -> RootStats {
        self.root.fill(0.0);
        RootStats {
            clamped: 0,
            min_eigenvalue: f64::INFINITY,
            failed: true,
        }
    }

    /// Square root produced by the last call to [`Self::decompose`].
    pub fn root(&self) -> &DMatrix<f64> {
        &self.root
    }
}
