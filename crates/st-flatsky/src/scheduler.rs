// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Row-parallel synthesis of full coefficient grids.
//!
//! The unit of work is a row pair `(iy, ny - iy)` for `iy ∈ 0..=ny/2`: the
//! mirror write at `ix = 0` never leaves its pair, so each worker can hold plain
//! `&mut` slices into the caller's grids. Pairs are split into contiguous blocks,
//! one per worker, before the pool starts; worker `w` seeds its stream with
//! `base_seed + w`. The same `(seed, workers)` therefore reproduces the grids bit
//! for bit, while changing `workers` reshuffles which stream feeds which rows.

use crate::deviates::DeviateSource;
use crate::error::{FlatSkyError, FlatSkyResult};
use crate::evaluator::{BeamEvaluator, SpectrumEvaluator};
use crate::geometry::FlatSkyGeometry;
use crate::grid::HarmonicGrid;
use crate::layout::pair_count;
use crate::report::SynthesisReport;
use crate::synth::ModeSynthesizer;
use num_complex::Complex64;
use rayon::prelude::*;
use spiral_config::determinism::{worker_seed, SynthesisConfig};
use tracing::{debug, info, info_span, warn};

/// Seed and pool size for one synthesis run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub seed: u64,
    /// `None` uses the size of the current rayon pool.
    pub workers: Option<usize>,
}

impl SynthesisOptions {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            workers: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Options taken from the process-wide configuration.
    pub fn from_env() -> Self {
        Self::from(spiral_config::config())
    }

    fn resolved_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(rayon::current_num_threads)
            .max(1)
    }
}

impl From<&SynthesisConfig> for SynthesisOptions {
    fn from(cfg: &SynthesisConfig) -> Self {
        Self {
            seed: cfg.base_seed,
            workers: cfg.workers,
        }
    }
}

type RowSlices<'g> = Vec<&'g mut [Complex64]>;

struct RowPair<'g> {
    iy: usize,
    lower: RowSlices<'g>,
    // Row `ny - iy`; absent for the self-paired DC and Nyquist rows.
    upper: Option<(usize, RowSlices<'g>)>,
}

/// Drives [`ModeSynthesizer`] over every mode of a grid set.
pub struct GridSynthesizer<'a, S, B> {
    geometry: FlatSkyGeometry,
    nmaps: usize,
    spectra: &'a S,
    beams: &'a B,
}

impl<'a, S: SpectrumEvaluator, B: BeamEvaluator> GridSynthesizer<'a, S, B> {
    /// Checks that the evaluators match `nmaps` channels.
    pub fn new(
        geometry: FlatSkyGeometry,
        nmaps: usize,
        spectra: &'a S,
        beams: &'a B,
    ) -> FlatSkyResult<Self> {
        if nmaps == 0 {
            return Err(FlatSkyError::NoChannels);
        }
        let expected = pair_count(nmaps);
        if spectra.pair_count() != expected {
            return Err(FlatSkyError::SpectrumCount {
                nmaps,
                expected,
                got: spectra.pair_count(),
            });
        }
        if beams.channel_count() != nmaps {
            return Err(FlatSkyError::BeamCount {
                expected: nmaps,
                got: beams.channel_count(),
            });
        }
        Ok(Self {
            geometry,
            nmaps,
            spectra,
            beams,
        })
    }

    pub fn geometry(&self) -> &FlatSkyGeometry {
        &self.geometry
    }

    pub fn nmaps(&self) -> usize {
        self.nmaps
    }

    /// Allocates fresh grids and fills them.
    pub fn synthesize(
        &self,
        options: SynthesisOptions,
    ) -> FlatSkyResult<(Vec<HarmonicGrid>, SynthesisReport)> {
        let mut grids = HarmonicGrid::zeros_many(self.geometry, self.nmaps);
        let report = {
            let mut views: Vec<&mut [Complex64]> =
                grids.iter_mut().map(HarmonicGrid::as_mut_slice).collect();
            self.synthesize_into(&mut views, options)?
        };
        Ok((grids, report))
    }

    /// Fills caller-owned grids in place, one `ny × (nx/2 + 1)` slice per channel.
    pub fn synthesize_into(
        &self,
        grids: &mut [&mut [Complex64]],
        options: SynthesisOptions,
    ) -> FlatSkyResult<SynthesisReport> {
        if grids.len() != self.nmaps {
            return Err(FlatSkyError::GridCount {
                expected: self.nmaps,
                got: grids.len(),
            });
        }
        let expected = self.geometry.grid_len();
        for (channel, grid) in grids.iter().enumerate() {
            if grid.len() != expected {
                return Err(FlatSkyError::GridLength {
                    channel,
                    expected,
                    got: grid.len(),
                });
            }
        }

        let pairs = self.row_pairs(grids);
        let workers = options.resolved_workers().min(pairs.len()).max(1);
        let span = info_span!(
            "synalm",
            nx = self.geometry.nx(),
            ny = self.geometry.ny(),
            nmaps = self.nmaps,
            workers,
            seed = options.seed
        );
        let _guard = span.enter();
        info!("synthesising correlated harmonic coefficients");

        let blocks = partition(pairs, workers);
        let reports: Vec<SynthesisReport> = if workers == 1 {
            blocks
                .into_iter()
                .enumerate()
                .map(|(worker, block)| self.run_worker(worker, options.seed, block))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|idx| format!("flatsky-synalm-{idx}"))
                .build()?;
            pool.install(|| {
                blocks
                    .into_par_iter()
                    .enumerate()
                    .map(|(worker, block)| self.run_worker(worker, options.seed, block))
                    .collect()
            })
        };

        let mut report = SynthesisReport::default();
        for worker_report in &reports {
            report.merge(worker_report);
        }
        if report.clamped_modes > 0 {
            warn!(
                clamped_modes = report.clamped_modes,
                min_eigenvalue = report.min_eigenvalue,
                "covariance not positive semi-definite at some modes; eigenvalues clamped to zero"
            );
        }
        if report.failed_modes > 0 {
            warn!(
                failed_modes = report.failed_modes,
                "eigen solver did not converge; affected modes left at zero amplitude"
            );
        }
        info!(
            modes = report.modes,
            rows = report.rows,
            "harmonic synthesis complete"
        );
        Ok(report)
    }

    fn run_worker(&self, worker: usize, base_seed: u64, block: Vec<RowPair<'_>>) -> SynthesisReport {
        let seed = worker_seed(base_seed, worker);
        let mut synth = ModeSynthesizer::new(
            self.geometry,
            self.nmaps,
            self.spectra,
            self.beams,
            DeviateSource::new(seed),
        );
        for mut pair in block {
            match pair.upper.as_mut() {
                Some((_, upper)) => {
                    synth.fill_row(pair.iy, &mut pair.lower, Some(upper.as_mut_slice()))
                }
                None => synth.fill_row(pair.iy, &mut pair.lower, None),
            }
            if let Some((iy_upper, mut upper)) = pair.upper {
                synth.fill_row(iy_upper, &mut upper, None);
            }
        }
        let mut report = synth.into_report();
        report.workers = 1;
        debug!(
            worker,
            seed,
            rows = report.rows,
            modes = report.modes,
            clamped = report.clamped_modes,
            failed = report.failed_modes,
            "worker finished"
        );
        report
    }

    fn row_pairs<'g>(&self, grids: &'g mut [&mut [Complex64]]) -> Vec<RowPair<'g>> {
        let ny = self.geometry.ny();
        let width = self.geometry.half_nx();
        let mut rows: Vec<Option<RowSlices<'g>>> = (0..ny)
            .map(|_| Some(Vec::with_capacity(self.nmaps)))
            .collect();
        for grid in grids.iter_mut() {
            for (iy, row) in grid.chunks_mut(width).enumerate() {
                if let Some(slot) = rows[iy].as_mut() {
                    slot.push(row);
                }
            }
        }

        let mut pairs = Vec::with_capacity(ny / 2 + 1);
        for iy in 0..=ny / 2 {
            let Some(lower) = rows[iy].take() else {
                continue;
            };
            let mirror = self.geometry.mirror_row(iy);
            let upper = if mirror != iy {
                rows[mirror].take().map(|slices| (mirror, slices))
            } else {
                None
            };
            pairs.push(RowPair { iy, lower, upper });
        }
        pairs
    }
}

/// Splits `pairs` into `workers` contiguous blocks whose sizes differ by at most one.
fn partition<T>(pairs: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let total = pairs.len();
    let base = total / workers;
    let extra = total % workers;
    let mut blocks = Vec::with_capacity(workers);
    let mut iter = pairs.into_iter();
    for worker in 0..workers {
        let take = base + usize::from(worker < extra);
        blocks.push(iter.by_ref().take(take).collect());
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Analytic;

    #[test]
    fn partition_is_contiguous_and_balanced() {
        let blocks = partition((0..7).collect::<Vec<_>>(), 3);
        assert_eq!(blocks, vec![vec![0, 1, 2], vec![3, 4], vec![5, 6]]);
        let blocks = partition(vec![1], 1);
        assert_eq!(blocks, vec![vec![1]]);
    }

    #[test]
    fn options_follow_process_config() {
        let cfg = SynthesisConfig {
            base_seed: 7,
            workers: Some(2),
        };
        assert_eq!(
            SynthesisOptions::from(&cfg),
            SynthesisOptions::new(7).with_workers(2)
        );
        assert_eq!(SynthesisOptions::new(1).with_workers(0).workers, Some(1));
        assert_eq!(SynthesisOptions::new(1).with_workers(3).resolved_workers(), 3);
        assert!(SynthesisOptions::new(1).resolved_workers() >= 1);
    }

    #[test]
    fn row_pairs_cover_every_row_once() {
        for ny in [1usize, 2, 5, 6] {
            let geo = FlatSkyGeometry::new(4, ny, 1.0, 1.0).unwrap();
            let spectra = Analytic::new(1, |_, _| 1.0);
            let beams = Analytic::unit(1);
            let synth = GridSynthesizer::new(geo, 1, &spectra, &beams).unwrap();
            let mut data = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
            let mut grids = [data.as_mut_slice()];
            let pairs = synth.row_pairs(&mut grids);
            let mut seen = vec![0usize; ny];
            for pair in &pairs {
                seen[pair.iy] += 1;
                if let Some((upper, _)) = &pair.upper {
                    assert_eq!(*upper, ny - pair.iy);
                    seen[*upper] += 1;
                }
            }
            assert!(seen.iter().all(|&count| count == 1), "ny={ny}: {seen:?}");
        }
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let geo = FlatSkyGeometry::new(4, 4, 1.0, 1.0).unwrap();
        let spectra = Analytic::new(2, |_, _| 1.0);
        let beams = Analytic::unit(2);
        assert!(matches!(
            GridSynthesizer::new(geo, 2, &spectra, &beams),
            Err(FlatSkyError::SpectrumCount { expected: 3, .. })
        ));
        assert!(matches!(
            GridSynthesizer::new(geo, 0, &spectra, &beams),
            Err(FlatSkyError::NoChannels)
        ));

        let spectra = Analytic::new(3, |_, _| 1.0);
        let synth = GridSynthesizer::new(geo, 2, &spectra, &beams).unwrap();
        let mut short = vec![Complex64::new(0.0, 0.0); 3];
        let mut full = vec![Complex64::new(0.0, 0.0); geo.grid_len()];
        let mut grids = [full.as_mut_slice(), short.as_mut_slice()];
        assert!(matches!(
            synth.synthesize_into(&mut grids, SynthesisOptions::new(1)),
            Err(FlatSkyError::GridLength { channel: 1, .. })
        ));
        let mut grids = [full.as_mut_slice()];
        assert!(matches!(
            synth.synthesize_into(&mut grids, SynthesisOptions::new(1)),
            Err(FlatSkyError::GridCount { .. })
        ));
    }
}
