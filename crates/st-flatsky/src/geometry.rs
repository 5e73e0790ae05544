// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Flat-sky patch geometry and its half-plane Fourier lattice.
//!
//! A real `ny × nx` map transforms into `ny × (nx/2 + 1)` non-redundant complex
//! coefficients. Row `iy` carries `ky = iy·Δky` for `2·iy ≤ ny` and the negative
//! frequency `-(ny - iy)·Δky` above that; column `ix` always carries the
//! non-negative `kx = ix·Δkx`.

use crate::error::{FlatSkyError, FlatSkyResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Pixel counts and angular extent (radians) of a rectangular patch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatSkyGeometry {
    nx: usize,
    ny: usize,
    lx: f64,
    ly: f64,
}

/// One point of the half-plane frequency lattice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyMode {
    pub ix: usize,
    pub iy: usize,
    pub kx: f64,
    pub ky: f64,
    pub kmod: f64,
}

impl FlatSkyGeometry {
    /// Creates a geometry with the extent given in radians.
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> FlatSkyResult<Self> {
        if nx == 0 || ny == 0 {
            return Err(FlatSkyError::InvalidDimensions { nx, ny });
        }
        if !(lx.is_finite() && lx > 0.0 && ly.is_finite() && ly > 0.0) {
            return Err(FlatSkyError::InvalidExtent { lx, ly });
        }
        Ok(Self { nx, ny, lx, ly })
    }

    /// Creates a geometry with the extent given in degrees.
    pub fn from_degrees(nx: usize, ny: usize, lx_deg: f64, ly_deg: f64) -> FlatSkyResult<Self> {
        Self::new(nx, ny, lx_deg.to_radians(), ly_deg.to_radians())
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Extent along x in radians.
    pub fn lx(&self) -> f64 {
        self.lx
    }

    /// Extent along y in radians.
    pub fn ly(&self) -> f64 {
        self.ly
    }

    /// Number of complex columns in the half-plane representation.
    #[inline]
    pub fn half_nx(&self) -> usize {
        self.nx / 2 + 1
    }

    /// Coefficients per harmonic grid.
    #[inline]
    pub fn grid_len(&self) -> usize {
        self.ny * self.half_nx()
    }

    /// Pixels per real-space map.
    #[inline]
    pub fn map_len(&self) -> usize {
        self.nx * self.ny
    }

    #[inline]
    pub fn dkx(&self) -> f64 {
        2.0 * PI / self.lx
    }

    #[inline]
    pub fn dky(&self) -> f64 {
        2.0 * PI / self.ly
    }

    /// Inverse area of one frequency cell, `1 / (Δkx·Δky)`.
    #[inline]
    pub fn inv_dk_volume(&self) -> f64 {
        1.0 / (self.dkx() * self.dky())
    }

    /// Flat offset of `(ix, iy)` inside a harmonic grid.
    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        ix + self.half_nx() * iy
    }

    /// Signed frequency carried by row `iy`.
    #[inline]
    pub fn ky(&self, iy: usize) -> f64 {
        if 2 * iy <= self.ny {
            iy as f64 * self.dky()
        } else {
            -((self.ny - iy) as f64) * self.dky()
        }
    }

    #[inline]
    pub fn kx(&self, ix: usize) -> f64 {
        ix as f64 * self.dkx()
    }

    /// Builds the lattice point `(ix, iy)`.
    #[inline]
    pub fn mode(&self, ix: usize, iy: usize) -> FrequencyMode {
        let kx = self.kx(ix);
        let ky = self.ky(iy);
        FrequencyMode {
            ix,
            iy,
            kx,
            ky,
            kmod: (kx * kx + ky * ky).sqrt(),
        }
    }

    /// Row holding the conjugate partner of `(0, iy)`.
    #[inline]
    pub fn mirror_row(&self, iy: usize) -> usize {
        (self.ny - iy) % self.ny
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_degenerate_geometry() {
        assert!(matches!(
            FlatSkyGeometry::new(0, 4, 1.0, 1.0),
            Err(FlatSkyError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            FlatSkyGeometry::new(4, 4, -1.0, 1.0),
            Err(FlatSkyError::InvalidExtent { .. })
        ));
        assert!(matches!(
            FlatSkyGeometry::new(4, 4, 1.0, f64::NAN),
            Err(FlatSkyError::InvalidExtent { .. })
        ));
    }

    #[test]
    fn frequencies_wrap_to_negative_above_nyquist() {
        let geo = FlatSkyGeometry::new(6, 5, 2.0 * PI, 2.0 * PI).unwrap();
        assert_eq!(geo.half_nx(), 4);
        assert_eq!(geo.grid_len(), 20);
        assert_relative_eq!(geo.ky(0), 0.0);
        assert_relative_eq!(geo.ky(2), 2.0);
        assert_relative_eq!(geo.ky(3), -2.0);
        assert_relative_eq!(geo.ky(4), -1.0);
        let mode = geo.mode(3, 4);
        assert_relative_eq!(mode.kmod, 10f64.sqrt(), max_relative = 1e-12);
        assert_eq!(geo.index(3, 4), 19);
    }

    #[test]
    fn degrees_are_converted_to_radians() {
        let geo = FlatSkyGeometry::from_degrees(4, 4, 360.0, 180.0).unwrap();
        assert_relative_eq!(geo.lx(), 2.0 * PI, max_relative = 1e-12);
        assert_relative_eq!(geo.dkx(), 1.0, max_relative = 1e-12);
        assert_relative_eq!(geo.dky(), 2.0, max_relative = 1e-12);
        assert_relative_eq!(geo.inv_dk_volume(), 0.5, max_relative = 1e-12);
    }

    #[test]
    fn mirror_rows_pair_up() {
        let geo = FlatSkyGeometry::new(4, 4, 1.0, 1.0).unwrap();
        assert_eq!(geo.mirror_row(0), 0);
        assert_eq!(geo.mirror_row(1), 3);
        assert_eq!(geo.mirror_row(2), 2);
    }
}
