// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Field-to-channel bookkeeping.
//!
//! A scalar field occupies one harmonic channel; any field with non-zero spin
//! occupies two (E and B). Cross-spectra between channels are stored in
//! upper-triangular row order.

use crate::error::{FlatSkyError, FlatSkyResult};
use crate::evaluator::BeamEvaluator;
use crate::kfunc::{KCursor, KFunction};

/// Number of distinct channel pairs for `nmaps` channels.
#[inline]
pub const fn pair_count(nmaps: usize) -> usize {
    nmaps * (nmaps + 1) / 2
}

/// Position of the pair `(i, j)` in `(0,0), (0,1), …, (0,n-1), (1,1), …`.
/// The order of `i` and `j` does not matter.
#[inline]
pub fn pair_index(i: usize, j: usize, nmaps: usize) -> usize {
    let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
    lo * (2 * nmaps + 1 - lo) / 2 + hi - lo
}

/// Spin assignment and channel offsets for an ordered list of fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    spins: Vec<u32>,
    offsets: Vec<usize>,
    nmaps: usize,
}

impl FieldLayout {
    pub fn new(spins: Vec<u32>) -> Self {
        let mut offsets = Vec::with_capacity(spins.len());
        let mut nmaps = 0;
        for &spin in &spins {
            offsets.push(nmaps);
            nmaps += channels_for_spin(spin);
        }
        Self {
            spins,
            offsets,
            nmaps,
        }
    }

    pub fn field_count(&self) -> usize {
        self.spins.len()
    }

    /// Total number of harmonic channels.
    pub fn nmaps(&self) -> usize {
        self.nmaps
    }

    pub fn pair_count(&self) -> usize {
        pair_count(self.nmaps)
    }

    pub fn spin(&self, field: usize) -> u32 {
        self.spins[field]
    }

    /// Channel range occupied by `field`.
    pub fn channels(&self, field: usize) -> std::ops::Range<usize> {
        let start = self.offsets[field];
        start..start + channels_for_spin(self.spins[field])
    }

    /// Field owning `channel`.
    pub fn field_of(&self, channel: usize) -> Option<usize> {
        (0..self.spins.len()).find(|&field| self.channels(field).contains(&channel))
    }
}

#[inline]
fn channels_for_spin(spin: u32) -> usize {
    if spin == 0 {
        1
    } else {
        2
    }
}

/// Per-field beams exposed per channel: both channels of a spin field share one beam.
#[derive(Clone, Debug)]
pub struct FieldBeams {
    beams: Vec<KFunction>,
    channel_field: Vec<usize>,
}

impl FieldBeams {
    /// One beam per field of `layout`, in field order.
    pub fn new(layout: &FieldLayout, beams: Vec<KFunction>) -> FlatSkyResult<Self> {
        if beams.len() != layout.field_count() {
            return Err(FlatSkyError::BeamCount {
                expected: layout.field_count(),
                got: beams.len(),
            });
        }
        let channel_field = (0..layout.nmaps())
            .map(|channel| layout.field_of(channel).unwrap_or(0))
            .collect();
        Ok(Self {
            beams,
            channel_field,
        })
    }
}

impl BeamEvaluator for FieldBeams {
    type Cache = Vec<KCursor>;

    fn channel_count(&self) -> usize {
        self.channel_field.len()
    }

    fn evaluate(&self, channel: usize, kmod: f64, cache: &mut Self::Cache) -> f64 {
        if cache.len() < self.beams.len() {
            cache.resize(self.beams.len(), KCursor::default());
        }
        let field = self.channel_field[channel];
        self.beams[field].eval(kmod, &mut cache[field])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_index_follows_row_order() {
        let n = 3;
        let mut expected = 0;
        for i in 0..n {
            for j in i..n {
                assert_eq!(pair_index(i, j, n), expected, "pair ({i},{j})");
                assert_eq!(pair_index(j, i, n), expected);
                expected += 1;
            }
        }
        assert_eq!(expected, pair_count(n));
    }

    #[test]
    fn spin_fields_take_two_channels() {
        let layout = FieldLayout::new(vec![0, 2, 0]);
        assert_eq!(layout.nmaps(), 4);
        assert_eq!(layout.pair_count(), 10);
        assert_eq!(layout.channels(1), 1..3);
        assert_eq!(layout.channels(2), 3..4);
        assert_eq!(layout.field_of(2), Some(1));
        assert_eq!(layout.field_of(4), None);
    }

    #[test]
    fn field_beams_are_shared_across_spin_channels() {
        let layout = FieldLayout::new(vec![2, 0]);
        let beams = FieldBeams::new(
            &layout,
            vec![KFunction::constant(0.5), KFunction::constant(0.25)],
        )
        .unwrap();
        let mut cache = Vec::new();
        assert_eq!(beams.channel_count(), 3);
        assert_eq!(beams.evaluate(0, 1.0, &mut cache), 0.5);
        assert_eq!(beams.evaluate(1, 1.0, &mut cache), 0.5);
        assert_eq!(beams.evaluate(2, 1.0, &mut cache), 0.25);
    }

    #[test]
    fn field_beams_need_one_beam_per_field() {
        let layout = FieldLayout::new(vec![2, 0]);
        assert!(matches!(
            FieldBeams::new(&layout, vec![KFunction::constant(1.0)]),
            Err(FlatSkyError::BeamCount {
                expected: 2,
                got: 1
            })
        ));
        assert!(FieldBeams::new(&layout, vec![KFunction::constant(1.0); 3]).is_err());
    }
}
