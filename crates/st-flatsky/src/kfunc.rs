// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Tabulated functions of the wavenumber magnitude.
//!
//! Power spectra and beam transfer functions arrive as samples on a multipole
//! grid. [`KFunction`] interpolates them (natural cubic spline by default) and
//! returns fixed values outside the table: `below` for `k < k₀` and `above` for
//! `k ≥ k_last`. Lookups take a [`KCursor`] that remembers the last bracket, so
//! a worker sweeping a row of modes rarely falls back to a binary search.

use crate::error::{FlatSkyError, FlatSkyResult};

/// Interpolation scheme used inside the table domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    #[default]
    CubicSpline,
}

/// Cached bracket index for repeated lookups into one table.
#[derive(Clone, Copy, Debug, Default)]
pub struct KCursor {
    bracket: usize,
}

#[derive(Clone, Debug)]
enum Table {
    Constant(f64),
    Sampled {
        k: Vec<f64>,
        f: Vec<f64>,
        // Second derivatives of the natural spline; empty for linear tables.
        curvature: Vec<f64>,
        below: f64,
        above: f64,
    },
}

/// Interpolated function `f(k)` over a strictly increasing table.
#[derive(Clone, Debug)]
pub struct KFunction {
    table: Table,
}

impl KFunction {
    /// Cubic-spline table returning `f[0]` below the domain and zero above it.
    pub fn new(k: Vec<f64>, f: Vec<f64>) -> FlatSkyResult<Self> {
        Self::with_interpolation(k, f, Interpolation::CubicSpline)
    }

    /// Table with an explicit interpolation scheme and default extrapolation.
    pub fn with_interpolation(
        k: Vec<f64>,
        f: Vec<f64>,
        interpolation: Interpolation,
    ) -> FlatSkyResult<Self> {
        let below = f.first().copied().unwrap_or(0.0);
        Self::with_extrapolation(k, f, interpolation, below, 0.0)
    }

    /// Table with explicit values outside the sampled domain.
    pub fn with_extrapolation(
        k: Vec<f64>,
        f: Vec<f64>,
        interpolation: Interpolation,
        below: f64,
        above: f64,
    ) -> FlatSkyResult<Self> {
        if k.len() != f.len() {
            return Err(FlatSkyError::TableLengthMismatch {
                k: k.len(),
                f: f.len(),
            });
        }
        if k.len() < 2 {
            return Err(FlatSkyError::TableTooShort { len: k.len() });
        }
        for (index, (kv, fv)) in k.iter().zip(f.iter()).enumerate() {
            if !(kv.is_finite() && fv.is_finite()) {
                return Err(FlatSkyError::TableNonFinite { index });
            }
        }
        if let Some(index) = k.windows(2).position(|w| w[1] <= w[0]) {
            return Err(FlatSkyError::TableNotIncreasing { index: index + 1 });
        }

        let curvature = match interpolation {
            Interpolation::CubicSpline if k.len() > 2 => natural_spline_curvature(&k, &f),
            _ => Vec::new(),
        };
        Ok(Self {
            table: Table::Sampled {
                k,
                f,
                curvature,
                below,
                above,
            },
        })
    }

    /// Function returning `value` everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            table: Table::Constant(value),
        }
    }

    /// Builds a table on integer multipoles `0..values.len()`.
    pub fn from_multipoles(values: Vec<f64>) -> FlatSkyResult<Self> {
        let k = (0..values.len()).map(|l| l as f64).collect();
        Self::new(k, values)
    }

    /// Evaluates the function at `k`, reusing `cursor` to locate the bracket.
    pub fn eval(&self, k: f64, cursor: &mut KCursor) -> f64 {
        match &self.table {
            Table::Constant(value) => *value,
            Table::Sampled {
                k: ks,
                f,
                curvature,
                below,
                above,
            } => {
                let last = ks.len() - 1;
                if k < ks[0] {
                    return *below;
                }
                if k >= ks[last] {
                    return *above;
                }
                let i = locate(ks, k, cursor);
                let h = ks[i + 1] - ks[i];
                let a = (ks[i + 1] - k) / h;
                let b = (k - ks[i]) / h;
                let linear = a * f[i] + b * f[i + 1];
                if curvature.is_empty() {
                    linear
                } else {
                    linear
                        + ((a * a * a - a) * curvature[i] + (b * b * b - b) * curvature[i + 1])
                            * h
                            * h
                            / 6.0
                }
            }
        }
    }

    /// Evaluates without a persistent cursor.
    pub fn eval_once(&self, k: f64) -> f64 {
        self.eval(k, &mut KCursor::default())
    }
}

fn locate(ks: &[f64], k: f64, cursor: &mut KCursor) -> usize {
    let cached = cursor.bracket;
    if cached + 1 < ks.len() && ks[cached] <= k && k < ks[cached + 1] {
        return cached;
    }
    if cached + 2 < ks.len() && ks[cached + 1] <= k && k < ks[cached + 2] {
        cursor.bracket = cached + 1;
        return cached + 1;
    }
    // First index with ks[idx] > k, minus one, clamped into the bracket range.
    let idx = ks.partition_point(|&v| v <= k).saturating_sub(1);
    let idx = idx.min(ks.len() - 2);
    cursor.bracket = idx;
    idx
}

/// Second derivatives for a natural cubic spline (zero curvature at both ends).
fn natural_spline_curvature(k: &[f64], f: &[f64]) -> Vec<f64> {
    let n = k.len();
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (k[i] - k[i - 1]) / (k[i + 1] - k[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope = (f[i + 1] - f[i]) / (k[i + 1] - k[i]) - (f[i] - f[i - 1]) / (k[i] - k[i - 1]);
        u[i] = (6.0 * slope / (k[i + 1] - k[i - 1]) - sig * u[i - 1]) / p;
    }
    y2[n - 1] = 0.0;
    for i in (0..n - 1).rev() {
        y2[i] = y2[i] * y2[i + 1] + u[i];
    }
    y2
}
