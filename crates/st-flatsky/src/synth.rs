// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Per-mode draw, correlation, beam and Hermitian placement.
//!
//! Only columns `0..=nx/2` are stored, so for `ix > 0` every coefficient is
//! independent. Column `ix = 0` is its own conjugate partner under `iy → ny - iy`:
//! one draw fills both `(0, iy)` and `(0, ny - iy)`, and the self-conjugate
//! points (DC and, for even `ny`, the Nyquist row) are forced real with a `√2`
//! boost so their variance matches the other modes.

use crate::covariance::CovarianceBuilder;
use crate::decompose::SpectralDecomposer;
use crate::deviates::DeviateSource;
use crate::evaluator::{BeamEvaluator, SpectrumEvaluator};
use crate::geometry::{FlatSkyGeometry, FrequencyMode};
use crate::report::SynthesisReport;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use std::f64::consts::SQRT_2;

/// Placement of a mode's coefficient inside the half-plane grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeRule {
    /// `ix > 0`: store as drawn.
    Direct,
    /// Self-conjugate point: store `√2·re` with zero imaginary part.
    SelfConjugate,
    /// Store at `(0, iy)` and the conjugate at `(0, ny - iy)`.
    Mirrored,
    /// Already filled by the mirror write of row `ny - iy`.
    Skip,
}

/// Placement rule for `(ix, iy)` on a grid with `ny` rows.
#[inline]
pub fn edge_rule(ix: usize, iy: usize, ny: usize) -> EdgeRule {
    if ix > 0 {
        EdgeRule::Direct
    } else if iy == 0 || 2 * iy == ny {
        EdgeRule::SelfConjugate
    } else if 2 * iy < ny {
        EdgeRule::Mirrored
    } else {
        EdgeRule::Skip
    }
}

/// Worker-owned state for synthesising modes one at a time.
///
/// All scratch buffers are sized once for `nmaps` and reused for every mode.
pub struct ModeSynthesizer<'a, S: SpectrumEvaluator, B: BeamEvaluator> {
    geometry: FlatSkyGeometry,
    spectra: &'a S,
    beams: &'a B,
    builder: CovarianceBuilder,
    decomposer: SpectralDecomposer,
    stream: DeviateSource,
    covariance: DMatrix<f64>,
    white_re: DVector<f64>,
    white_im: DVector<f64>,
    corr_re: DVector<f64>,
    corr_im: DVector<f64>,
    amplitudes: Vec<Complex64>,
    spectrum_cache: S::Cache,
    beam_cache: B::Cache,
    report: SynthesisReport,
}

impl<'a, S: SpectrumEvaluator, B: BeamEvaluator> ModeSynthesizer<'a, S, B> {
    pub fn new(
        geometry: FlatSkyGeometry,
        nmaps: usize,
        spectra: &'a S,
        beams: &'a B,
        stream: DeviateSource,
    ) -> Self {
        Self {
            geometry,
            spectra,
            beams,
            builder: CovarianceBuilder::new(&geometry, nmaps),
            decomposer: SpectralDecomposer::new(nmaps),
            stream,
            covariance: DMatrix::zeros(nmaps, nmaps),
            white_re: DVector::zeros(nmaps),
            white_im: DVector::zeros(nmaps),
            corr_re: DVector::zeros(nmaps),
            corr_im: DVector::zeros(nmaps),
            amplitudes: vec![Complex64::new(0.0, 0.0); nmaps],
            spectrum_cache: S::Cache::default(),
            beam_cache: B::Cache::default(),
            report: SynthesisReport::default(),
        }
    }

    pub fn nmaps(&self) -> usize {
        self.amplitudes.len()
    }

    /// Draws the beam-weighted coefficients of every channel at `mode`.
    pub fn synthesize(&mut self, mode: &FrequencyMode) -> &[Complex64] {
        let kmod = mode.kmod;
        if kmod.is_nan() || kmod < 0.0 {
            self.amplitudes.fill(Complex64::new(0.0, 0.0));
            self.report.record_skip();
            return &self.amplitudes;
        }

        self.builder
            .fill(self.spectra, kmod, &mut self.spectrum_cache, &mut self.covariance);
        let stats = self.decomposer.decompose(&self.covariance);
        self.report.record_root(&stats);

        for c in 0..self.amplitudes.len() {
            let (re, im) = self.stream.gaussian_pair();
            self.white_re[c] = re;
            self.white_im[c] = im;
        }

        let root = self.decomposer.root();
        self.corr_re.gemv(1.0, root, &self.white_re, 0.0);
        self.corr_im.gemv(1.0, root, &self.white_im, 0.0);

        for (c, amplitude) in self.amplitudes.iter_mut().enumerate() {
            let beam = self.beams.evaluate(c, kmod, &mut self.beam_cache);
            *amplitude = Complex64::new(beam * self.corr_re[c], beam * self.corr_im[c]);
        }
        &self.amplitudes
    }

    /// Fills row `iy` of every channel.
    ///
    /// `row[c]` is row `iy` of channel `c`. `mirror[c]` is row `ny - iy` and is
    /// required whenever column zero of this row is mirrored.
    pub fn fill_row(
        &mut self,
        iy: usize,
        row: &mut [&mut [Complex64]],
        mut mirror: Option<&mut [&mut [Complex64]]>,
    ) {
        let ny = self.geometry.ny();
        for ix in 0..self.geometry.half_nx() {
            let rule = edge_rule(ix, iy, ny);
            if rule == EdgeRule::Skip {
                continue;
            }
            let mode = self.geometry.mode(ix, iy);
            self.synthesize(&mode);
            store_mode(&self.amplitudes, rule, ix, row, mirror.as_deref_mut());
        }
        self.report.rows += 1;
    }

    /// Telemetry accumulated so far.
    pub fn report(&self) -> &SynthesisReport {
        &self.report
    }

    pub fn into_report(self) -> SynthesisReport {
        self.report
    }
}

/// Writes one mode's amplitudes according to `rule`.
pub fn store_mode(
    amplitudes: &[Complex64],
    rule: EdgeRule,
    ix: usize,
    row: &mut [&mut [Complex64]],
    mirror: Option<&mut [&mut [Complex64]]>,
) {
    match rule {
        EdgeRule::Skip => {}
        EdgeRule::Direct => {
            for (dst, a) in row.iter_mut().zip(amplitudes) {
                dst[ix] = *a;
            }
        }
        EdgeRule::SelfConjugate => {
            for (dst, a) in row.iter_mut().zip(amplitudes) {
                dst[ix] = Complex64::new(SQRT_2 * a.re, 0.0);
            }
        }
        EdgeRule::Mirrored => {
            for (dst, a) in row.iter_mut().zip(amplitudes) {
                dst[ix] = *a;
            }
            if let Some(mirror) = mirror {
                for (dst, a) in mirror.iter_mut().zip(amplitudes) {
                    dst[ix] = a.conj();
                }
            }
        }
    }
}
