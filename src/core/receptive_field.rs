//! Receptive-field propagation.
//!
//! For every neuron in every layer this computes a 28×28 grid describing which
//! input pixels the neuron responds to:
//!
//! - Layer 0: the neuron's own 784 weights, read row-major as the grid.
//! - Layer `l > 0`: `Σ_p w[n][p] * grid(l-1, p)`, a linear combination of the
//!   previous layer's (already normalized) grids.
//!
//! Each grid is then divided by its own max absolute value, so entries land in
//! `[-1, 1]`; a grid whose raw max is 0 stays all zeros. Magnitudes are
//! therefore only comparable within one grid, never across neurons or layers.
//!
//! The whole structure is rebuilt on every weights update in one
//! layer-ascending pass. A neuron whose weights are unusable (wrong fan-in,
//! non-finite entries) gets a zero grid and a [`GridFault`]; its neighbours are
//! unaffected.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "simd")]
use wide::f32x4;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thiserror::Error;
use tracing::{debug, warn};

use crate::tensor::{NeuronHandle, Weight, WeightTensor, INPUT_PIXELS, INPUT_SIDE};

/// Execution tier for grid propagation.
///
/// - `Scalar`: single-threaded, no SIMD (WASM, baseline)
/// - `Simd`: single-threaded `f32x4` accumulation (requires `simd` feature)
/// - `Parallel`: neurons of a layer spread over rayon (requires `parallel` feature)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExecutionTier {
    #[default]
    Scalar,
    Simd,
    Parallel,
}

impl ExecutionTier {
    /// The tier that will actually run, accounting for compiled features.
    pub fn effective(self) -> ExecutionTier {
        match self {
            ExecutionTier::Scalar => ExecutionTier::Scalar,
            ExecutionTier::Simd => {
                #[cfg(feature = "simd")]
                {
                    ExecutionTier::Simd
                }
                #[cfg(not(feature = "simd"))]
                {
                    ExecutionTier::Scalar
                }
            }
            ExecutionTier::Parallel => {
                #[cfg(feature = "parallel")]
                {
                    ExecutionTier::Parallel
                }
                #[cfg(not(feature = "parallel"))]
                {
                    ExecutionTier::Scalar
                }
            }
        }
    }

    /// Best tier compiled into this build.
    pub fn auto() -> ExecutionTier {
        #[cfg(feature = "parallel")]
        {
            ExecutionTier::Parallel
        }

        #[cfg(all(not(feature = "parallel"), feature = "simd"))]
        {
            ExecutionTier::Simd
        }

        #[cfg(all(not(feature = "parallel"), not(feature = "simd")))]
        {
            ExecutionTier::Scalar
        }
    }
}

/// Why a neuron's receptive field could not be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeuronFault {
    #[error("fan-in mismatch: expected {expected} weights, found {actual}")]
    FanInMismatch { expected: usize, actual: usize },
    #[error("non-finite weight at index {index}")]
    NonFiniteWeight { index: usize },
    #[error("receptive field overflowed to a non-finite value")]
    NonFiniteField,
}

/// A neuron that was replaced by a zero grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFault {
    pub handle: NeuronHandle,
    pub fault: NeuronFault,
}

/// One neuron's normalized 28×28 sensitivity map, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceptiveFieldGrid {
    values: Vec<f32>,
}

impl ReceptiveFieldGrid {
    pub fn zeros() -> Self {
        Self {
            values: vec![0.0; INPUT_PIXELS],
        }
    }

    /// Normalize a raw 784-entry field by its own max absolute value.
    fn normalized(mut values: Vec<f32>) -> Result<Self, NeuronFault> {
        debug_assert_eq!(values.len(), INPUT_PIXELS);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(NeuronFault::NonFiniteField);
        }
        let max_abs = max_abs(&values);
        if max_abs > 0.0 {
            for v in values.iter_mut() {
                *v /= max_abs;
            }
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at `(row, col)`; `None` outside the 28×28 raster.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= INPUT_SIDE || col >= INPUT_SIDE {
            return None;
        }
        self.values.get(row * INPUT_SIDE + col).copied()
    }

    pub fn max_abs(&self) -> f32 {
        max_abs(&self.values)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Index and value of the first cell with the largest magnitude, or `None`
    /// for an all-zero grid.
    pub fn peak(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            if v == 0.0 {
                continue;
            }
            match best {
                Some((_, b)) if b.abs() >= v.abs() => {}
                _ => best = Some((i, v)),
            }
        }
        best
    }
}

fn max_abs(values: &[f32]) -> f32 {
    values.iter().fold(0.0f32, |m, v| m.max(v.abs()))
}

/// Receptive fields for every neuron of one weights update.
///
/// Built once and never mutated; the next update produces a new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerGrids {
    layers: Vec<Vec<ReceptiveFieldGrid>>,
    faults: Vec<GridFault>,
}

impl LayerGrids {
    pub fn get(&self, handle: NeuronHandle) -> Option<&ReceptiveFieldGrid> {
        self.layers.get(handle.layer)?.get(handle.neuron)
    }

    pub fn layer(&self, index: usize) -> Option<&[ReceptiveFieldGrid]> {
        self.layers.get(index).map(Vec::as_slice)
    }

    pub fn layers(&self) -> &[Vec<ReceptiveFieldGrid>] {
        &self.layers
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn neuron_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Neurons that were replaced by zero grids, in layer/neuron order.
    pub fn faults(&self) -> &[GridFault] {
        &self.faults
    }
}

/// Compute every layer's receptive fields on the scalar tier.
pub fn compute_layer_grids(weights: &WeightTensor) -> LayerGrids {
    compute_layer_grids_with(weights, ExecutionTier::Scalar)
}

/// Compute every layer's receptive fields on the requested tier.
pub fn compute_layer_grids_with(weights: &WeightTensor, tier: ExecutionTier) -> LayerGrids {
    let tier = tier.effective();
    let mut layers: Vec<Vec<ReceptiveFieldGrid>> = Vec::with_capacity(weights.len());
    let mut faults = Vec::new();

    for (l, layer) in weights.layers().iter().enumerate() {
        let prev = if l == 0 {
            None
        } else {
            layers.last().map(Vec::as_slice)
        };
        let results = compute_layer(layer, weights.expected_fan_in(l), prev, tier);

        let mut grids = Vec::with_capacity(results.len());
        for (n, result) in results.into_iter().enumerate() {
            match result {
                Ok(grid) => grids.push(grid),
                Err(fault) => {
                    warn!(layer = l, neuron = n, %fault, "receptive field replaced by zero grid");
                    faults.push(GridFault {
                        handle: NeuronHandle::new(l, n),
                        fault,
                    });
                    grids.push(ReceptiveFieldGrid::zeros());
                }
            }
        }
        layers.push(grids);
    }

    debug!(
        layers = layers.len(),
        neurons = weights.neuron_count(),
        faults = faults.len(),
        ?tier,
        "layer grids computed"
    );

    LayerGrids { layers, faults }
}

fn compute_layer(
    layer: &[Vec<Weight>],
    fan_in: usize,
    prev: Option<&[ReceptiveFieldGrid]>,
    tier: ExecutionTier,
) -> Vec<Result<ReceptiveFieldGrid, NeuronFault>> {
    match tier {
        #[cfg(feature = "parallel")]
        ExecutionTier::Parallel => layer
            .par_iter()
            .map(|w| neuron_field(w, fan_in, prev, ExecutionTier::Scalar))
            .collect(),
        _ => layer
            .iter()
            .map(|w| neuron_field(w, fan_in, prev, tier))
            .collect(),
    }
}

/// `expected` comes from [`WeightTensor::expected_fan_in`]; for `l > 0` it
/// equals `prev.len()` because every neuron of the previous layer has a grid.
fn neuron_field(
    weights: &[Weight],
    expected: usize,
    prev: Option<&[ReceptiveFieldGrid]>,
    tier: ExecutionTier,
) -> Result<ReceptiveFieldGrid, NeuronFault> {
    if weights.len() != expected {
        return Err(NeuronFault::FanInMismatch {
            expected,
            actual: weights.len(),
        });
    }
    if let Some(index) = weights.iter().position(|w| !w.is_finite()) {
        return Err(NeuronFault::NonFiniteWeight { index });
    }

    let raw = match prev {
        None => weights.to_vec(),
        Some(prev) => {
            let mut acc = vec![0.0f32; INPUT_PIXELS];
            for (&w, grid) in weights.iter().zip(prev) {
                if w != 0.0 {
                    accumulate(&mut acc, w, grid.values(), tier);
                }
            }
            acc
        }
    };
    ReceptiveFieldGrid::normalized(raw)
}

/// `acc += weight * grid`
#[inline]
fn accumulate(acc: &mut [f32], weight: f32, grid: &[f32], tier: ExecutionTier) {
    match tier {
        #[cfg(feature = "simd")]
        ExecutionTier::Simd => accumulate_simd(acc, weight, grid),
        _ => accumulate_scalar(acc, weight, grid),
    }
}

#[inline]
fn accumulate_scalar(acc: &mut [f32], weight: f32, grid: &[f32]) {
    for (a, &g) in acc.iter_mut().zip(grid) {
        *a += g * weight;
    }
}

#[cfg(feature = "simd")]
fn accumulate_simd(acc: &mut [f32], weight: f32, grid: &[f32]) {
    let n = acc.len().min(grid.len());
    let w = f32x4::splat(weight);

    // Process 4 cells at a time.
    let simd_end = n - (n % 4);
    for i in (0..simd_end).step_by(4) {
        let a = f32x4::from([acc[i], acc[i + 1], acc[i + 2], acc[i + 3]]);
        let g = f32x4::from([grid[i], grid[i + 1], grid[i + 2], grid[i + 3]]);
        let out = a + g * w;
        acc[i..(i + 4)].copy_from_slice(&out.to_array());
    }

    // Handle remainder (tail elements).
    for i in simd_end..n {
        acc[i] += grid[i] * weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(index: usize) -> Vec<f32> {
        let mut v = vec![0.0; INPUT_PIXELS];
        v[index] = 1.0;
        v
    }

    /// xorshift32 weights in [-1, 1).
    fn noisy(seed: u32, len: usize) -> Vec<f32> {
        let mut s = seed.max(1);
        (0..len)
            .map(|_| {
                s ^= s << 13;
                s ^= s >> 17;
                s ^= s << 5;
                (s as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    fn mlp(widths: &[usize], seed: u32) -> WeightTensor {
        let mut layers = Vec::new();
        let mut fan_in = INPUT_PIXELS;
        for (l, &width) in widths.iter().enumerate() {
            let layer = (0..width)
                .map(|n| noisy(seed + (l * 1000 + n) as u32, fan_in))
                .collect();
            layers.push(layer);
            fan_in = width;
        }
        WeightTensor::new(layers)
    }

    #[test]
    fn shape_matches_tensor() {
        let w = mlp(&[16, 8, 10], 7);
        let g = compute_layer_grids(&w);
        assert_eq!(g.len(), w.len());
        for l in 0..w.len() {
            assert_eq!(g.layer(l).unwrap().len(), w.layer(l).unwrap().len());
        }
        assert!(g.faults().is_empty());
    }

    #[test]
    fn entries_are_normalized() {
        let w = mlp(&[12, 6, 3], 99);
        let g = compute_layer_grids(&w);
        for layer in g.layers() {
            for grid in layer {
                assert_eq!(grid.values().len(), INPUT_PIXELS);
                assert!(grid.values().iter().all(|v| (-1.0..=1.0).contains(v)));
                let m = grid.max_abs();
                assert!(m == 0.0 || (m - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn layer_zero_is_identity_on_one_hot() {
        let w = WeightTensor::new(vec![vec![one_hot(0)]]);
        let g = compute_layer_grids(&w);
        let grid = g.get(NeuronHandle::new(0, 0)).unwrap();
        assert_eq!(grid.values()[0], 1.0);
        assert!(grid.values()[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn layer_zero_reads_row_major() {
        let mut weights = vec![0.0; INPUT_PIXELS];
        weights[3 * INPUT_SIDE + 5] = -2.0;
        weights[0] = 1.0;
        let g = compute_layer_grids(&WeightTensor::new(vec![vec![weights]]));
        let grid = g.get(NeuronHandle::new(0, 0)).unwrap();
        assert_eq!(grid.get(3, 5), Some(-1.0));
        assert_eq!(grid.get(0, 0), Some(0.5));
        assert_eq!(grid.get(28, 0), None);
    }

    #[test]
    fn unit_weight_propagates_unchanged() {
        let base = noisy(3, INPUT_PIXELS);
        let w = WeightTensor::new(vec![vec![base], vec![vec![1.0]]]);
        let g = compute_layer_grids(&w);
        let l0 = g.get(NeuronHandle::new(0, 0)).unwrap();
        let l1 = g.get(NeuronHandle::new(1, 0)).unwrap();
        for (a, b) in l0.values().iter().zip(l1.values()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn hidden_layer_combines_previous_fields() {
        let w = WeightTensor::new(vec![
            vec![one_hot(0), one_hot(1)],
            vec![vec![0.5, -0.25]],
        ]);
        let g = compute_layer_grids(&w);
        let grid = g.get(NeuronHandle::new(1, 0)).unwrap();
        assert_eq!(grid.values()[0], 1.0);
        assert_eq!(grid.values()[1], -0.5);
        assert_eq!(grid.peak(), Some((0, 1.0)));
    }

    #[test]
    fn zero_weights_give_zero_grid_without_fault() {
        let w = WeightTensor::new(vec![vec![vec![0.0; INPUT_PIXELS]], vec![vec![0.0]]]);
        let g = compute_layer_grids(&w);
        assert!(g.get(NeuronHandle::new(0, 0)).unwrap().is_zero());
        assert!(g.get(NeuronHandle::new(1, 0)).unwrap().is_zero());
        assert_eq!(g.get(NeuronHandle::new(1, 0)).unwrap().peak(), None);
        assert!(g.faults().is_empty());
    }

    #[test]
    fn ragged_neuron_is_isolated() {
        let w = WeightTensor::new(vec![
            vec![one_hot(4), vec![1.0; 10], one_hot(9)],
            vec![vec![1.0, 1.0, 1.0], vec![1.0]],
        ]);
        let g = compute_layer_grids(&w);

        assert_eq!(g.layer(0).unwrap().len(), 3);
        assert!(g.get(NeuronHandle::new(0, 1)).unwrap().is_zero());
        assert_eq!(g.get(NeuronHandle::new(0, 0)).unwrap().values()[4], 1.0);
        assert_eq!(g.get(NeuronHandle::new(0, 2)).unwrap().values()[9], 1.0);

        // The zero grid contributes nothing downstream.
        let h = g.get(NeuronHandle::new(1, 0)).unwrap();
        assert_eq!(h.values()[4], 1.0);
        assert_eq!(h.values()[9], 1.0);
        assert_eq!(h.values().iter().filter(|&&v| v != 0.0).count(), 2);

        assert!(g.get(NeuronHandle::new(1, 1)).unwrap().is_zero());
        assert_eq!(
            g.faults(),
            &[
                GridFault {
                    handle: NeuronHandle::new(0, 1),
                    fault: NeuronFault::FanInMismatch {
                        expected: INPUT_PIXELS,
                        actual: 10
                    },
                },
                GridFault {
                    handle: NeuronHandle::new(1, 1),
                    fault: NeuronFault::FanInMismatch {
                        expected: 3,
                        actual: 1
                    },
                },
            ]
        );
    }

    #[test]
    fn fan_in_faults_report_tensor_fan_in() {
        let w = WeightTensor::new(vec![
            vec![vec![0.5; 3], one_hot(1)],
            vec![vec![1.0; 5], vec![1.0; 2]],
            vec![vec![1.0; 4]],
        ]);
        let g = compute_layer_grids(&w);
        assert_eq!(g.faults().len(), 3);
        for f in g.faults() {
            match f.fault {
                NeuronFault::FanInMismatch { expected, actual } => {
                    assert_eq!(expected, w.expected_fan_in(f.handle.layer));
                    assert_eq!(actual, w.neuron(f.handle).unwrap().len());
                }
                ref other => panic!("unexpected fault {other:?}"),
            }
        }
    }

    #[test]
    fn non_finite_weight_is_isolated() {
        let mut bad = one_hot(0);
        bad[17] = f32::NAN;
        let w = WeightTensor::new(vec![vec![bad, one_hot(2)]]);
        let g = compute_layer_grids(&w);
        assert!(g.get(NeuronHandle::new(0, 0)).unwrap().is_zero());
        assert_eq!(g.get(NeuronHandle::new(0, 1)).unwrap().values()[2], 1.0);
        assert_eq!(
            g.faults()[0].fault,
            NeuronFault::NonFiniteWeight { index: 17 }
        );
    }

    #[test]
    fn overflowing_field_is_isolated() {
        let w = WeightTensor::new(vec![
            vec![one_hot(0), one_hot(0)],
            vec![vec![f32::MAX, f32::MAX], vec![1.0, 0.0]],
        ]);
        let g = compute_layer_grids(&w);
        assert!(g.get(NeuronHandle::new(1, 0)).unwrap().is_zero());
        assert_eq!(g.faults()[0].fault, NeuronFault::NonFiniteField);
        assert_eq!(g.get(NeuronHandle::new(1, 1)).unwrap().values()[0], 1.0);
    }

    #[test]
    fn empty_tensor_gives_empty_grids() {
        let g = compute_layer_grids(&WeightTensor::default());
        assert!(g.is_empty());
        assert_eq!(g.neuron_count(), 0);
    }

    #[test]
    fn tiers_agree() {
        let w = mlp(&[10, 7, 4], 1234);
        let scalar = compute_layer_grids_with(&w, ExecutionTier::Scalar);
        for tier in [ExecutionTier::Simd, ExecutionTier::Parallel, ExecutionTier::auto()] {
            let other = compute_layer_grids_with(&w, tier);
            assert_eq!(other.len(), scalar.len());
            for (a_layer, b_layer) in scalar.layers().iter().zip(other.layers()) {
                for (a, b) in a_layer.iter().zip(b_layer) {
                    for (x, y) in a.values().iter().zip(b.values()) {
                        assert!((x - y).abs() < 1e-5, "{tier:?} diverged");
                    }
                }
            }
        }
    }

    #[test]
    fn effective_tier_falls_back_without_features() {
        assert_eq!(ExecutionTier::Scalar.effective(), ExecutionTier::Scalar);
        #[cfg(not(feature = "simd"))]
        assert_eq!(ExecutionTier::Simd.effective(), ExecutionTier::Scalar);
        #[cfg(not(feature = "parallel"))]
        assert_eq!(ExecutionTier::Parallel.effective(), ExecutionTier::Scalar);
    }
}
