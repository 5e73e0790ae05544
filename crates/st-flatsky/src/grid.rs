// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::geometry::FlatSkyGeometry;
use num_complex::Complex64;

/// Owned half-plane coefficient grid, `ny` rows of `nx/2 + 1` columns.
#[derive(Clone, Debug, PartialEq)]
pub struct HarmonicGrid {
    geometry: FlatSkyGeometry,
    data: Vec<Complex64>,
}

impl HarmonicGrid {
    pub fn zeros(geometry: FlatSkyGeometry) -> Self {
        Self {
            geometry,
            data: vec![Complex64::new(0.0, 0.0); geometry.grid_len()],
        }
    }

    /// Allocates `count` zeroed grids.
    pub fn zeros_many(geometry: FlatSkyGeometry, count: usize) -> Vec<Self> {
        (0..count).map(|_| Self::zeros(geometry)).collect()
    }

    pub fn geometry(&self) -> &FlatSkyGeometry {
        &self.geometry
    }

    #[inline]
    pub fn get(&self, ix: usize, iy: usize) -> Complex64 {
        self.data[self.geometry.index(ix, iy)]
    }

    pub fn row(&self, iy: usize) -> &[Complex64] {
        let width = self.geometry.half_nx();
        &self.data[iy * width..(iy + 1) * width]
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Complex64> {
        self.data
    }
}
