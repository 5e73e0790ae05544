// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Correlated Gaussian random fields on a flat-sky patch.
//!
//! At every point of the half-plane Fourier lattice the channel cross-spectra
//! form a covariance matrix. Its eigen square root correlates a pair of white
//! Gaussian vectors, the beam attenuates the result, and Hermitian symmetry
//! along `ix = 0` keeps the real-space fields real. Rows are split across a
//! rayon pool, one deterministic stream per worker.
//!
//! ```no_run
//! use st_flatsky::{synfast_flat, FlatSkyGeometry, FlatSkyRequest, KFunction, SynthesisOptions};
//!
//! # fn main() -> st_flatsky::FlatSkyResult<()> {
//! let geometry = FlatSkyGeometry::from_degrees(64, 64, 10.0, 10.0)?;
//! let request = FlatSkyRequest::new(geometry)
//!     .with_field(0, KFunction::constant(1.0))
//!     .with_cells(vec![KFunction::constant(1.0)]);
//! let out = synfast_flat(request, SynthesisOptions::new(42))?;
//! assert_eq!(out.maps[0].len(), 64 * 64);
//! # Ok(())
//! # }
//! ```

pub mod covariance;
pub mod decompose;
pub mod deviates;
pub mod error;
pub mod evaluator;
pub mod geometry;
pub mod grid;
pub mod kfunc;
pub mod layout;
pub mod noise;
pub mod report;
pub mod scheduler;
pub mod synfast;
pub mod synth;
pub mod telemetry;
pub mod transform;

pub use covariance::CovarianceBuilder;
pub use decompose::{RootStats, SpectralDecomposer};
pub use deviates::DeviateSource;
pub use error::{FlatSkyError, FlatSkyResult};
pub use evaluator::{Analytic, BeamEvaluator, KFunctionSet, SpectrumEvaluator};
pub use geometry::{FlatSkyGeometry, FrequencyMode};
pub use grid::HarmonicGrid;
pub use kfunc::{Interpolation, KCursor, KFunction};
pub use layout::{pair_count, pair_index, FieldBeams, FieldLayout};
pub use report::SynthesisReport;
pub use scheduler::{GridSynthesizer, SynthesisOptions};
pub use synfast::{synalm_flat, synfast_flat, FlatSkyMaps, FlatSkyRequest};
pub use synth::{edge_rule, EdgeRule, ModeSynthesizer};
pub use transform::{alm2map, alm2map_spin, MapTransformer};
