// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Spectra in, correlated pixel maps out.
//!
//! [`synfast_flat`] expands the field list into channels, draws the harmonic
//! grids with [`GridSynthesizer`] and transforms each field back to real space.
//! Scalar fields yield one map; spin fields yield `(Q, U)`.

use crate::error::{FlatSkyError, FlatSkyResult};
use crate::evaluator::KFunctionSet;
use crate::geometry::FlatSkyGeometry;
use crate::grid::HarmonicGrid;
use crate::kfunc::KFunction;
use crate::layout::{FieldBeams, FieldLayout};
use crate::report::SynthesisReport;
use crate::scheduler::{GridSynthesizer, SynthesisOptions};
use crate::transform::MapTransformer;
use tracing::{debug, info, info_span};

/// Everything needed to simulate a set of correlated fields on one patch.
#[derive(Clone, Debug)]
pub struct FlatSkyRequest {
    pub geometry: FlatSkyGeometry,
    /// Spin of each field, `0` for scalars.
    pub spins: Vec<u32>,
    /// One beam per field, shared by both channels of a spin field.
    pub beams: Vec<KFunction>,
    /// Channel cross-spectra in upper-triangular row order.
    pub cells: Vec<KFunction>,
}

impl FlatSkyRequest {
    pub fn new(geometry: FlatSkyGeometry) -> Self {
        Self {
            geometry,
            spins: Vec::new(),
            beams: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Appends a field with its beam.
    pub fn with_field(mut self, spin: u32, beam: KFunction) -> Self {
        self.spins.push(spin);
        self.beams.push(beam);
        self
    }

    pub fn with_cells(mut self, cells: Vec<KFunction>) -> Self {
        self.cells = cells;
        self
    }

    pub fn layout(&self) -> FieldLayout {
        FieldLayout::new(self.spins.clone())
    }
}

/// Output of [`synfast_flat`].
#[derive(Clone, Debug)]
pub struct FlatSkyMaps {
    /// Row-major `ny × nx` maps in field order; spin fields contribute `Q` then `U`.
    pub maps: Vec<Vec<f64>>,
    /// The harmonic grids the maps were built from, one per channel.
    pub alms: Vec<HarmonicGrid>,
    pub report: SynthesisReport,
}

/// Draws one harmonic grid per channel for `request`.
pub fn synalm_flat(
    request: FlatSkyRequest,
    options: SynthesisOptions,
) -> FlatSkyResult<(Vec<HarmonicGrid>, SynthesisReport)> {
    let layout = request.layout();
    if layout.field_count() == 0 {
        return Err(FlatSkyError::NoChannels);
    }
    let beams = FieldBeams::new(&layout, request.beams)?;
    let spectra = KFunctionSet::new(request.cells);
    let synth = GridSynthesizer::new(request.geometry, layout.nmaps(), &spectra, &beams)?;
    synth.synthesize(options)
}

/// Simulates correlated real-space maps for `request`.
pub fn synfast_flat(
    request: FlatSkyRequest,
    options: SynthesisOptions,
) -> FlatSkyResult<FlatSkyMaps> {
    let geometry = request.geometry;
    let layout = request.layout();
    let span = info_span!(
        "synfast_flat",
        fields = layout.field_count(),
        nmaps = layout.nmaps()
    );
    let _guard = span.enter();

    let (alms, report) = synalm_flat(request, options)?;

    let mut transformer = MapTransformer::new(geometry);
    let mut maps = Vec::with_capacity(layout.nmaps());
    for field in 0..layout.field_count() {
        let spin = layout.spin(field);
        let grids: Vec<_> = alms[layout.channels(field)]
            .iter()
            .map(HarmonicGrid::as_slice)
            .collect();
        let field_maps = transformer.field_maps(spin, &grids)?;
        debug!(field, spin, maps = field_maps.len(), "field transformed");
        maps.extend(field_maps);
    }
    info!(maps = maps.len(), "pixel maps ready");

    Ok(FlatSkyMaps { maps, alms, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FlatSkyRequest {
        let geo = FlatSkyGeometry::from_degrees(8, 8, 10.0, 10.0).unwrap();
        FlatSkyRequest::new(geo)
            .with_field(0, KFunction::constant(1.0))
            .with_field(2, KFunction::constant(1.0))
    }

    #[test]
    fn spin_fields_produce_two_maps() {
        let mut cells = vec![KFunction::constant(0.0); 6];
        cells[0] = KFunction::constant(1.0);
        cells[3] = KFunction::constant(1.0);
        cells[5] = KFunction::constant(1.0);
        let out = synfast_flat(
            request().with_cells(cells),
            SynthesisOptions::new(7).with_workers(1),
        )
        .unwrap();
        assert_eq!(out.maps.len(), 3);
        assert_eq!(out.alms.len(), 3);
        assert!(out.maps.iter().all(|m| m.len() == 64));
        assert!(out.maps.iter().all(|m| m.iter().any(|&v| v != 0.0)));
        assert_eq!(out.report.rows, 8);
    }

    #[test]
    fn rejects_wrong_cell_and_beam_counts() {
        let short = vec![KFunction::constant(1.0); 3];
        assert!(matches!(
            synalm_flat(request().with_cells(short), SynthesisOptions::new(1)),
            Err(FlatSkyError::SpectrumCount {
                nmaps: 3,
                expected: 6,
                got: 3
            })
        ));

        let mut bad = request().with_cells(vec![KFunction::constant(1.0); 6]);
        bad.beams.pop();
        assert!(matches!(
            synalm_flat(bad, SynthesisOptions::new(1)),
            Err(FlatSkyError::BeamCount {
                expected: 2,
                got: 1
            })
        ));

        let empty = FlatSkyRequest::new(request().geometry);
        assert!(matches!(
            synalm_flat(empty, SynthesisOptions::new(1)),
            Err(FlatSkyError::NoChannels)
        ));
    }
}
