// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Spectrum and beam lookups consumed by the synthesiser.
//!
//! Both traits are shared read-only across workers; each worker owns a
//! `Cache` so interpolation state never crosses threads.

use crate::kfunc::{KCursor, KFunction};

/// Cross-spectra indexed by channel pair in upper-triangular row order
/// `(0,0), (0,1), …, (0,n-1), (1,1), …` (see [`crate::layout::pair_index`]).
pub trait SpectrumEvaluator: Sync {
    type Cache: Default + Send;

    /// Number of pairs this evaluator provides.
    fn pair_count(&self) -> usize;

    fn evaluate(&self, pair: usize, kmod: f64, cache: &mut Self::Cache) -> f64;
}

/// Per-channel beam transfer functions.
pub trait BeamEvaluator: Sync {
    type Cache: Default + Send;

    /// Number of channels this evaluator provides.
    fn channel_count(&self) -> usize;

    fn evaluate(&self, channel: usize, kmod: f64, cache: &mut Self::Cache) -> f64;
}

/// Ordered collection of tabulated functions, one per pair or channel.
#[derive(Clone, Debug, Default)]
pub struct KFunctionSet {
    functions: Vec<KFunction>,
}

impl KFunctionSet {
    pub fn new(functions: Vec<KFunction>) -> Self {
        Self { functions }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn functions(&self) -> &[KFunction] {
        &self.functions
    }

    fn eval_cached(&self, index: usize, kmod: f64, cache: &mut Vec<KCursor>) -> f64 {
        if cache.len() < self.functions.len() {
            cache.resize(self.functions.len(), KCursor::default());
        }
        self.functions[index].eval(kmod, &mut cache[index])
    }
}

impl From<Vec<KFunction>> for KFunctionSet {
    fn from(functions: Vec<KFunction>) -> Self {
        Self::new(functions)
    }
}

impl SpectrumEvaluator for KFunctionSet {
    type Cache = Vec<KCursor>;

    fn pair_count(&self) -> usize {
        self.functions.len()
    }

    fn evaluate(&self, pair: usize, kmod: f64, cache: &mut Self::Cache) -> f64 {
        self.eval_cached(pair, kmod, cache)
    }
}

impl BeamEvaluator for KFunctionSet {
    type Cache = Vec<KCursor>;

    fn channel_count(&self) -> usize {
        self.functions.len()
    }

    fn evaluate(&self, channel: usize, kmod: f64, cache: &mut Self::Cache) -> f64 {
        self.eval_cached(channel, kmod, cache)
    }
}

/// Closure-backed evaluator `f(index, kmod)` for analytic spectra and beams.
#[derive(Clone, Copy, Debug)]
pub struct Analytic<F> {
    count: usize,
    func: F,
}

impl<F> Analytic<F>
where
    F: Fn(usize, f64) -> f64 + Sync,
{
    pub fn new(count: usize, func: F) -> Self {
        Self { count, func }
    }
}

impl Analytic<fn(usize, f64) -> f64> {
    /// Unit response for `count` entries.
    pub fn unit(count: usize) -> Self {
        fn one(_: usize, _: f64) -> f64 {
            1.0
        }
        Self::new(count, one as fn(usize, f64) -> f64)
    }
}

impl<F> SpectrumEvaluator for Analytic<F>
where
    F: Fn(usize, f64) -> f64 + Sync,
{
    type Cache = ();

    fn pair_count(&self) -> usize {
        self.count
    }

    fn evaluate(&self, pair: usize, kmod: f64, _cache: &mut ()) -> f64 {
        (self.func)(pair, kmod)
    }
}

impl<F> BeamEvaluator for Analytic<F>
where
    F: Fn(usize, f64) -> f64 + Sync,
{
    type Cache = ();

    fn channel_count(&self) -> usize {
        self.count
    }

    fn evaluate(&self, channel: usize, kmod: f64, _cache: &mut ()) -> f64 {
        (self.func)(channel, kmod)
    }
}
