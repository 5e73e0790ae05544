// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Gaussian beams and beam-deconvolved white detector noise on a multipole grid.

use crate::error::FlatSkyResult;
use crate::kfunc::KFunction;
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};

/// One arcminute in radians.
pub const ARCMIN: f64 = PI / 180.0 / 60.0;

/// CMB monopole temperature in µK.
pub const T_CMB_UK: f64 = 2.72548e6;

/// Which spectrum the noise level refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseKind {
    #[default]
    Temperature,
    /// Q/U noise, `√2` above the temperature level.
    Polarization,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseUnits {
    #[default]
    MicroKelvin,
    /// Divided through by [`T_CMB_UK`].
    Dimensionless,
}

/// Highest multipole worth tabulating for a beam of `fwhm_arcmin`.
///
/// With `factor = 3` the deconvolved noise has grown by roughly seven orders of
/// magnitude at the cut.
pub fn max_multipole(fwhm_arcmin: f64, factor: f64) -> f64 {
    180.0 * 60.0 * factor / fwhm_arcmin
}

/// Beam variance `σ_b²` in rad² for a Gaussian of the given FWHM.
#[inline]
fn beam_variance(fwhm_arcmin: f64) -> f64 {
    let fwhm = fwhm_arcmin * ARCMIN;
    fwhm * fwhm / (8.0 * LN_2)
}

/// Map-level transfer function `b_l = exp(-l(l+1)σ_b²/2)` for `l ∈ 0..=lmax`.
pub fn gaussian_beam(fwhm_arcmin: f64, lmax: usize) -> Vec<f64> {
    let sigma2 = beam_variance(fwhm_arcmin);
    (0..=lmax)
        .map(|l| {
            let l = l as f64;
            (-0.5 * l * (l + 1.0) * sigma2).exp()
        })
        .collect()
}

/// Beam-deconvolved white noise `N_l = (σ·arcmin)²·exp(l(l+1)σ_b²)` for `l ∈ 0..=lmax`.
pub fn white_noise_spectrum(
    noise_uk_arcmin: f64,
    fwhm_arcmin: f64,
    lmax: usize,
    kind: NoiseKind,
    units: NoiseUnits,
) -> Vec<f64> {
    let mut level = noise_uk_arcmin;
    if kind == NoiseKind::Polarization {
        level *= std::f64::consts::SQRT_2;
    }
    if units == NoiseUnits::Dimensionless {
        level /= T_CMB_UK;
    }
    let white = (level * ARCMIN).powi(2);
    let sigma2 = beam_variance(fwhm_arcmin);
    (0..=lmax)
        .map(|l| {
            let l = l as f64;
            white * (l * (l + 1.0) * sigma2).exp()
        })
        .collect()
}

/// [`gaussian_beam`] as an interpolated function of `|k|`.
pub fn gaussian_beam_function(fwhm_arcmin: f64, lmax: usize) -> FlatSkyResult<KFunction> {
    KFunction::from_multipoles(gaussian_beam(fwhm_arcmin, lmax))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn max_multipole_scales_inversely_with_beam() {
        assert_relative_eq!(max_multipole(5.0, 3.0), 6480.0);
        assert_relative_eq!(max_multipole(10.0, 2.0), 2160.0);
    }

    #[test]
    fn white_noise_is_flat_after_reconvolving_the_beam() {
        let noise = white_noise_spectrum(10.0, 4.0, 500, NoiseKind::Temperature, NoiseUnits::MicroKelvin);
        let beam = gaussian_beam(4.0, 500);
        let flat = (10.0 * ARCMIN).powi(2);
        assert_relative_eq!(noise[0], flat, max_relative = 1e-12);
        for (n, b) in noise.iter().zip(&beam) {
            assert_relative_eq!(n * b * b, flat, max_relative = 1e-9);
        }
        assert!(beam.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn polarization_and_units_rescale_the_level() {
        let t = white_noise_spectrum(5.0, 1.0, 10, NoiseKind::Temperature, NoiseUnits::MicroKelvin);
        let p = white_noise_spectrum(5.0, 1.0, 10, NoiseKind::Polarization, NoiseUnits::MicroKelvin);
        let d = white_noise_spectrum(5.0, 1.0, 10, NoiseKind::Temperature, NoiseUnits::Dimensionless);
        for l in 0..=10 {
            assert_relative_eq!(p[l], 2.0 * t[l], max_relative = 1e-12);
            assert_relative_eq!(d[l] * T_CMB_UK * T_CMB_UK, t[l], max_relative = 1e-12);
        }
    }

    #[test]
    fn beam_function_interpolates_between_multipoles() {
        let beam = gaussian_beam_function(30.0, 200).unwrap();
        let table = gaussian_beam(30.0, 200);
        assert_relative_eq!(beam.eval_once(100.0), table[100], max_relative = 1e-9);
        let mid = beam.eval_once(100.5);
        assert!(mid < table[100] && mid > table[101]);
        assert_eq!(beam.eval_once(500.0), 0.0);
    }
}
