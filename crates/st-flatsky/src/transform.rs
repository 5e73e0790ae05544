// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Half-plane harmonic grids to real pixel maps.
//!
//! The inverse transform runs the `ny`-point column transforms first, for the
//! stored columns `0..=nx/2` only. Each row is then completed to `nx` points with
//! `H[nx - ix] = conj(H[ix])` before the row transform, and the real part is kept.
//! Maps are row-major `ny × nx` and carry the `1/(lx·ly)` factor that turns the
//! lattice sum into `∫ d²k / (2π)²`. Both passes use `rustfft` plans built once
//! per geometry, so any `nx` and `ny` run in `O(n log n)` per line.

use crate::error::{FlatSkyError, FlatSkyResult};
use crate::geometry::FlatSkyGeometry;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Inverse plans and reusable buffers for repeated grid-to-map transforms on one geometry.
#[derive(Clone)]
pub struct MapTransformer {
    geometry: FlatSkyGeometry,
    column_fft: Arc<dyn Fft<f64>>,
    row_fft: Arc<dyn Fft<f64>>,
    // Staged half-plane input, `ny × (nx/2 + 1)` row-major.
    work: Vec<Complex64>,
    // Column-major copy of `work`, one contiguous `ny`-point line per column.
    columns: Vec<Complex64>,
    // Hermitian-completed rows, `ny × nx`.
    rows: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for MapTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapTransformer")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

impl MapTransformer {
    pub fn new(geometry: FlatSkyGeometry) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let column_fft = planner.plan_fft_inverse(geometry.ny());
        let row_fft = planner.plan_fft_inverse(geometry.nx());
        let scratch_len = column_fft
            .get_inplace_scratch_len()
            .max(row_fft.get_inplace_scratch_len());
        let zero = Complex64::new(0.0, 0.0);
        Self {
            geometry,
            column_fft,
            row_fft,
            work: Vec::with_capacity(geometry.grid_len()),
            columns: vec![zero; geometry.grid_len()],
            rows: vec![zero; geometry.map_len()],
            scratch: vec![zero; scratch_len],
        }
    }

    pub fn geometry(&self) -> &FlatSkyGeometry {
        &self.geometry
    }

    /// Scalar transform of one grid into `map`.
    pub fn alm2map(&mut self, grid: &[Complex64], map: &mut [f64]) -> FlatSkyResult<()> {
        self.check_grid(0, grid)?;
        self.check_map(0, map)?;
        self.work.clear();
        self.work.extend_from_slice(grid);
        self.inverse_into(map);
        Ok(())
    }

    /// Spin-`spin` transform of an `(E, B)` grid pair into `(Q, U)` maps.
    pub fn alm2map_spin(
        &mut self,
        spin: u32,
        e: &[Complex64],
        b: &[Complex64],
        q: &mut [f64],
        u: &mut [f64],
    ) -> FlatSkyResult<()> {
        self.check_grid(0, e)?;
        self.check_grid(1, b)?;
        self.check_map(0, q)?;
        self.check_map(1, u)?;

        self.load_rotated(spin, e, b, |e, b, cos, sin| -(e * cos - b * sin));
        self.inverse_into(q);
        self.load_rotated(spin, e, b, |e, b, cos, sin| -(e * sin + b * cos));
        self.inverse_into(u);
        Ok(())
    }

    /// Transforms the grids of one field: one map for spin 0, `(Q, U)` otherwise.
    pub fn field_maps(&mut self, spin: u32, grids: &[&[Complex64]]) -> FlatSkyResult<Vec<Vec<f64>>> {
        let expected = if spin == 0 { 1 } else { 2 };
        if grids.len() != expected {
            return Err(FlatSkyError::SpinChannels {
                spin,
                expected,
                got: grids.len(),
            });
        }
        let len = self.geometry.map_len();
        if spin == 0 {
            let mut map = vec![0.0; len];
            self.alm2map(grids[0], &mut map)?;
            Ok(vec![map])
        } else {
            let mut q = vec![0.0; len];
            let mut u = vec![0.0; len];
            self.alm2map_spin(spin, grids[0], grids[1], &mut q, &mut u)?;
            Ok(vec![q, u])
        }
    }

    fn load_rotated<F>(&mut self, spin: u32, e: &[Complex64], b: &[Complex64], combine: F)
    where
        F: Fn(Complex64, Complex64, f64, f64) -> Complex64,
    {
        let width = self.geometry.half_nx();
        self.work.clear();
        for (iy, (e_row, b_row)) in e.chunks(width).zip(b.chunks(width)).enumerate() {
            for (ix, (&e, &b)) in e_row.iter().zip(b_row).enumerate() {
                let (cos, sin) = spin_rotation(&self.geometry, spin, ix, iy);
                self.work.push(combine(e, b, cos, sin));
            }
        }
    }

    /// Inverse transforms the staged `work` grid into `map`.
    fn inverse_into(&mut self, map: &mut [f64]) {
        let nx = self.geometry.nx();
        let ny = self.geometry.ny();
        let width = self.geometry.half_nx();
        let norm = 1.0 / (self.geometry.lx() * self.geometry.ly());

        for (iy, row) in self.work.chunks(width).enumerate() {
            for (ix, value) in row.iter().enumerate() {
                self.columns[ix * ny + iy] = *value;
            }
        }
        // The buffer holds `width` back-to-back lines of length `ny`.
        self.column_fft
            .process_with_scratch(&mut self.columns, &mut self.scratch);

        for (iy, line) in self.rows.chunks_mut(nx).enumerate() {
            for (ix, slot) in line.iter_mut().enumerate() {
                *slot = if ix < width {
                    self.columns[ix * ny + iy]
                } else {
                    self.columns[(nx - ix) * ny + iy].conj()
                };
            }
        }
        self.row_fft.process_with_scratch(&mut self.rows, &mut self.scratch);

        for (pixel, value) in map.iter_mut().zip(&self.rows) {
            *pixel = value.re * norm;
        }
    }

    fn check_grid(&self, channel: usize, grid: &[Complex64]) -> FlatSkyResult<()> {
        let expected = self.geometry.grid_len();
        if grid.len() != expected {
            return Err(FlatSkyError::GridLength {
                channel,
                expected,
                got: grid.len(),
            });
        }
        Ok(())
    }

    fn check_map(&self, index: usize, map: &[f64]) -> FlatSkyResult<()> {
        let expected = self.geometry.map_len();
        if map.len() != expected {
            return Err(FlatSkyError::MapLength {
                index,
                expected,
                got: map.len(),
            });
        }
        Ok(())
    }
}

/// `(cos sφ, sin sφ)` for the lattice point `(ix, iy)`; `φ = 0` at `k = 0`.
#[inline]
pub fn spin_rotation(geometry: &FlatSkyGeometry, spin: u32, ix: usize, iy: usize) -> (f64, f64) {
    let kx = geometry.kx(ix);
    let ky = geometry.ky(iy);
    let phi = if kx == 0.0 && ky == 0.0 {
        0.0
    } else {
        ky.atan2(kx)
    };
    let angle = spin as f64 * phi;
    (angle.cos(), angle.sin())
}

/// One-shot scalar transform.
pub fn alm2map(geometry: FlatSkyGeometry, grid: &[Complex64]) -> FlatSkyResult<Vec<f64>> {
    let mut map = vec![0.0; geometry.map_len()];
    MapTransformer::new(geometry).alm2map(grid, &mut map)?;
    Ok(map)
}

/// One-shot spin transform returning `(Q, U)`.
pub fn alm2map_spin(
    geometry: FlatSkyGeometry,
    spin: u32,
    e: &[Complex64],
    b: &[Complex64],
) -> FlatSkyResult<(Vec<f64>, Vec<f64>)> {
    let mut q = vec![0.0; geometry.map_len()];
    let mut u = vec![0.0; geometry.map_len()];
    MapTransformer::new(geometry).alm2map_spin(spin, e, b, &mut q, &mut u)?;
    Ok((q, u))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn geometry() -> FlatSkyGeometry {
        FlatSkyGeometry::new(4, 4, 2.0 * PI, 2.0 * PI).unwrap()
    }

    #[test]
    fn dc_coefficient_gives_constant_map() {
        let geo = geometry();
        let mut grid = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
        grid[geo.index(0, 0)] = Complex64::new(3.0, 0.0);
        let map = alm2map(geo, &grid).unwrap();
        let expected = 3.0 / (4.0 * PI * PI);
        for pixel in map {
            assert_relative_eq!(pixel, expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn single_x_mode_is_a_cosine_along_rows() {
        let geo = geometry();
        let mut grid = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
        grid[geo.index(1, 0)] = Complex64::new(1.0, 0.0);
        let map = alm2map(geo, &grid).unwrap();
        let norm = 1.0 / (4.0 * PI * PI);
        for y in 0..4 {
            for x in 0..4 {
                let want = 2.0 * norm * (2.0 * PI * x as f64 / 4.0).cos();
                assert_relative_eq!(map[y * 4 + x], want, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn non_power_of_two_grid_gives_oblique_cosine() {
        let geo = FlatSkyGeometry::new(12, 10, 2.0 * PI, 2.0 * PI).unwrap();
        let mut grid = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
        grid[geo.index(2, 3)] = Complex64::new(1.0, 0.0);
        let map = alm2map(geo, &grid).unwrap();
        let norm = 1.0 / (4.0 * PI * PI);
        for y in 0..10 {
            for x in 0..12 {
                let phase = 2.0 * PI * (2.0 * x as f64 / 12.0 + 3.0 * y as f64 / 10.0);
                assert_relative_eq!(map[y * 12 + x], 2.0 * norm * phase.cos(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn transformer_is_reusable_across_calls() {
        let geo = FlatSkyGeometry::new(6, 9, 2.0 * PI, 2.0 * PI).unwrap();
        let mut transformer = MapTransformer::new(geo);
        let mut grid = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
        grid[geo.index(1, 2)] = Complex64::new(0.5, -0.25);
        let mut first = vec![0.0; geo.map_len()];
        let mut second = vec![0.0; geo.map_len()];
        transformer.alm2map(&grid, &mut first).unwrap();
        transformer.alm2map(&grid, &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, alm2map(geo, &grid).unwrap());
    }

    #[test]
    fn e_mode_along_y_rotates_into_positive_q() {
        let geo = geometry();
        let zero = Complex64::new(0.0, 0.0);
        let mut e = vec![zero; geo.grid_len()];
        let b = vec![zero; geo.grid_len()];
        e[geo.index(0, 1)] = Complex64::new(1.0, 0.0);
        e[geo.index(0, 3)] = Complex64::new(1.0, 0.0);
        let (q, u) = alm2map_spin(geo, 2, &e, &b).unwrap();
        let norm = 1.0 / (4.0 * PI * PI);
        for y in 0..4 {
            for x in 0..4 {
                let want = 2.0 * norm * (2.0 * PI * y as f64 / 4.0).cos();
                assert_relative_eq!(q[y * 4 + x], want, epsilon = 1e-12);
                assert_relative_eq!(u[y * 4 + x], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn rotation_is_identity_at_origin() {
        let geo = geometry();
        assert_eq!(spin_rotation(&geo, 2, 0, 0), (1.0, 0.0));
        let (cos, sin) = spin_rotation(&geo, 2, 0, 1);
        assert_relative_eq!(cos, -1.0, epsilon = 1e-12);
        assert_relative_eq!(sin, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn field_maps_checks_grid_count() {
        let geo = geometry();
        let grid = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
        let mut transformer = MapTransformer::new(geo);
        assert!(matches!(
            transformer.field_maps(2, &[grid.as_slice()]),
            Err(FlatSkyError::SpinChannels {
                spin: 2,
                expected: 2,
                got: 1
            })
        ));
        let mut short = vec![0.0; 3];
        assert!(matches!(
            transformer.alm2map(&grid, &mut short),
            Err(FlatSkyError::MapLength { got: 3, .. })
        ));
    }
}
