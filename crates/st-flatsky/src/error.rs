// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the flat-sky crate.
pub type FlatSkyResult<T> = Result<T, FlatSkyError>;

/// Contract violations detected before synthesis starts.
///
/// Numerical trouble inside a mode (indefinite covariance, an eigen solver that
/// fails to converge) is never reported here; it is regularised and surfaced
/// through [`crate::SynthesisReport`] instead.
#[derive(Debug, Error)]
pub enum FlatSkyError {
    #[error("grid dimensions must be non-zero (nx={nx}, ny={ny})")]
    InvalidDimensions { nx: usize, ny: usize },
    #[error("map extent must be finite and positive (lx={lx}, ly={ly})")]
    InvalidExtent { lx: f64, ly: f64 },
    #[error("at least one channel is required")]
    NoChannels,
    #[error("expected {expected} cross-spectra for {nmaps} channels, got {got}")]
    SpectrumCount {
        nmaps: usize,
        expected: usize,
        got: usize,
    },
    #[error("expected {expected} beams, got {got}")]
    BeamCount { expected: usize, got: usize },
    #[error("expected {expected} harmonic grids, got {got}")]
    GridCount { expected: usize, got: usize },
    #[error("grid {channel} holds {got} coefficients, expected {expected}")]
    GridLength {
        channel: usize,
        expected: usize,
        got: usize,
    },
    #[error("map {index} holds {got} pixels, expected {expected}")]
    MapLength {
        index: usize,
        expected: usize,
        got: usize,
    },
    #[error("k-function table needs at least two samples, got {len}")]
    TableTooShort { len: usize },
    #[error("k-function abscissae ({k}) and values ({f}) differ in length")]
    TableLengthMismatch { k: usize, f: usize },
    #[error("k-function abscissae must be strictly increasing (index {index})")]
    TableNotIncreasing { index: usize },
    #[error("k-function sample {index} is not finite")]
    TableNonFinite { index: usize },
    #[error("spin-{spin} field expects {expected} harmonic grids, got {got}")]
    SpinChannels {
        spin: u32,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
