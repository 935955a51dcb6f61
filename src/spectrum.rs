//! Cosine-transform reduction of connected correlators into the six
//! independent spectrum components.
//!
//! For momentum index `k` on an `N`-site lattice
//!
//! ```text
//! F_ab(k) = Re Σ_r Σ_i C_ab(r)[i] · cos(2πkr/N) · cos(2πki/N) / 3N
//! ```
//!
//! with the off-diagonal components symmetrised (`C_ab + C_ba`).

use std::f64::consts::PI;
use std::ops::Add;

use log::info;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::data::model::{
    Axis, AxisPair, ConnectedCorrelationSet, CorrelationTensor, SpectrumRow,
};
use crate::data::{Result, SpectrumError};

const XX: AxisPair = AxisPair::new(Axis::X, Axis::X);
const YY: AxisPair = AxisPair::new(Axis::Y, Axis::Y);
const ZZ: AxisPair = AxisPair::new(Axis::Z, Axis::Z);
const XY: AxisPair = AxisPair::new(Axis::X, Axis::Y);
const YX: AxisPair = AxisPair::new(Axis::Y, Axis::X);
const YZ: AxisPair = AxisPair::new(Axis::Y, Axis::Z);
const ZY: AxisPair = AxisPair::new(Axis::Z, Axis::Y);
const ZX: AxisPair = AxisPair::new(Axis::Z, Axis::X);
const XZ: AxisPair = AxisPair::new(Axis::X, Axis::Z);

// ---------------------------------------------------------------------------
// Cosine basis
// ---------------------------------------------------------------------------

/// `cos(2πm/N)` for `m = 0..N`, shared by every momentum index.
#[derive(Debug, Clone)]
pub struct CosineBasis {
    table: Vec<f64>,
}

impl CosineBasis {
    pub fn new(sites: usize) -> Self {
        let n = sites as f64;
        CosineBasis {
            table: (0..sites).map(|m| (2.0 * PI * m as f64 / n).cos()).collect(),
        }
    }

    pub fn sites(&self) -> usize {
        self.table.len()
    }

    /// `cos(2πkr/N)`, using the periodicity of the cosine in `kr`.
    pub fn weight(&self, k: usize, r: usize) -> f64 {
        self.table[(k * r) % self.table.len()]
    }

    /// Weights for every site at momentum `k`.
    pub fn weights(&self, k: usize) -> Vec<f64> {
        (0..self.sites()).map(|r| self.weight(k, r)).collect()
    }
}

// ---------------------------------------------------------------------------
// Accumulation
// ---------------------------------------------------------------------------

/// Complex running sums of the six components. The real part is taken only
/// once the whole double sum is done.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    xx: Complex64,
    yy: Complex64,
    zz: Complex64,
    xy: Complex64,
    yz: Complex64,
    zx: Complex64,
}

impl Accumulator {
    /// Inner sum over target sites `i` of one tensor, weighted by `w[i]`.
    fn over_targets(tensor: &CorrelationTensor, weights: &[f64]) -> Self {
        let (xx, yy, zz) = (tensor.get(XX), tensor.get(YY), tensor.get(ZZ));
        let (xy, yx) = (tensor.get(XY), tensor.get(YX));
        let (yz, zy) = (tensor.get(YZ), tensor.get(ZY));
        let (zx, xz) = (tensor.get(ZX), tensor.get(XZ));

        let mut acc = Accumulator::default();
        for (i, &w) in weights.iter().enumerate() {
            acc.xx += xx[i] * w;
            acc.yy += yy[i] * w;
            acc.zz += zz[i] * w;
            acc.xy += (xy[i] + yx[i]) * w;
            acc.yz += (yz[i] + zy[i]) * w;
            acc.zx += (zx[i] + xz[i]) * w;
        }
        acc
    }

    fn scale(self, w: f64) -> Self {
        Accumulator {
            xx: self.xx * w,
            yy: self.yy * w,
            zz: self.zz * w,
            xy: self.xy * w,
            yz: self.yz * w,
            zx: self.zx * w,
        }
    }

    fn finish(self, k: usize, sites: usize) -> SpectrumRow {
        let norm = 3.0 * sites as f64;
        SpectrumRow {
            k,
            fxx: self.xx.re / norm,
            fyy: self.yy.re / norm,
            fzz: self.zz.re / norm,
            fxy: self.xy.re / norm,
            fyz: self.yz.re / norm,
            fzx: self.zx.re / norm,
        }
    }
}

impl Add for Accumulator {
    type Output = Accumulator;

    fn add(self, rhs: Accumulator) -> Accumulator {
        Accumulator {
            xx: self.xx + rhs.xx,
            yy: self.yy + rhs.yy,
            zz: self.zz + rhs.zz,
            xy: self.xy + rhs.xy,
            yz: self.yz + rhs.yz,
            zx: self.zx + rhs.zx,
        }
    }
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

/// Spectrum row at a single momentum index `k`, `0 <= k < N`.
pub fn reduce(dataset: &ConnectedCorrelationSet, k: usize) -> Result<SpectrumRow> {
    reduce_with_basis(dataset, &CosineBasis::new(dataset.sites()), k)
}

/// Like [`reduce`] but reusing a precomputed basis.
pub fn reduce_with_basis(
    dataset: &ConnectedCorrelationSet,
    basis: &CosineBasis,
    k: usize,
) -> Result<SpectrumRow> {
    let sites = dataset.sites();
    if k >= sites {
        return Err(SpectrumError::out_of_range("momentum index", k, sites));
    }
    if basis.sites() != sites {
        return Err(SpectrumError::InvalidTable(format!(
            "cosine basis has {} sites, dataset has {sites}",
            basis.sites()
        )));
    }
    Ok(reduce_unchecked(dataset, basis, k))
}

/// Sequential fold over distances keeps the summation order fixed.
fn reduce_unchecked(
    dataset: &ConnectedCorrelationSet,
    basis: &CosineBasis,
    k: usize,
) -> SpectrumRow {
    let weights = basis.weights(k);
    dataset
        .tensors()
        .iter()
        .zip(&weights)
        .fold(Accumulator::default(), |acc, (tensor, &w_r)| {
            acc + Accumulator::over_targets(tensor, &weights).scale(w_r)
        })
        .finish(k, dataset.sites())
}

/// Every momentum index `0..N`, computed in parallel.
pub fn spectrum(dataset: &ConnectedCorrelationSet) -> Vec<SpectrumRow> {
    let sites = dataset.sites();
    let basis = CosineBasis::new(sites);
    let rows: Vec<SpectrumRow> = (0..sites)
        .into_par_iter()
        .map(|k| reduce_unchecked(dataset, &basis, k))
        .collect();
    info!("computed spectrum for {sites} momentum indices");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::AXIS_PAIRS;

    const TOL: f64 = 1e-9;

    /// Deterministic but irregular complex values.
    fn value(r: usize, i: usize, c: usize) -> Complex64 {
        let s = (r * 31 + i * 7 + c * 3) as f64;
        Complex64::new((s * 0.37).sin() + 0.1 * c as f64, (s * 0.11).cos())
    }

    fn dataset(sites: usize) -> ConnectedCorrelationSet {
        let mut builder = ConnectedCorrelationSet::builder(sites);
        for r in 0..sites {
            let components =
                std::array::from_fn(|c| (0..sites).map(|i| value(r, i, c)).collect());
            builder.insert(r, CorrelationTensor::new(components)).unwrap();
        }
        builder.finish().unwrap()
    }

    /// Straight double sum with the kernel evaluated per pair.
    fn reference(set: &ConnectedCorrelationSet, k: usize) -> [f64; 6] {
        let n = set.sites();
        let mut sums = [Complex64::default(); 6];
        for r in 0..n {
            let t = set.tensor(r).unwrap();
            for i in 0..n {
                let chi = (2.0 * PI * (k * r) as f64 / n as f64).cos()
                    * (2.0 * PI * (k * i) as f64 / n as f64).cos();
                sums[0] += t.get(XX)[i] * chi;
                sums[1] += t.get(YY)[i] * chi;
                sums[2] += t.get(ZZ)[i] * chi;
                sums[3] += (t.get(XY)[i] + t.get(YX)[i]) * chi;
                sums[4] += (t.get(YZ)[i] + t.get(ZY)[i]) * chi;
                sums[5] += (t.get(ZX)[i] + t.get(XZ)[i]) * chi;
            }
        }
        sums.map(|s| s.re / (3.0 * n as f64))
    }

    fn assert_close(actual: [f64; 6], expected: [f64; 6]) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOL, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn basis_uses_periodicity() {
        let basis = CosineBasis::new(8);
        for k in 0..8 {
            for r in 0..8 {
                let direct = (2.0 * PI * (k * r) as f64 / 8.0).cos();
                assert!((basis.weight(k, r) - direct).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn matches_direct_double_sum() {
        let set = dataset(7);
        for k in 0..7 {
            assert_close(reduce(&set, k).unwrap().components(), reference(&set, k));
        }
    }

    #[test]
    fn zero_momentum_is_a_plain_sum() {
        let set = dataset(5);
        let total: f64 = set
            .tensors()
            .iter()
            .flat_map(|t| t.get(XX).iter())
            .map(|z| z.re)
            .sum();
        let row = reduce(&set, 0).unwrap();
        assert!((row.fxx - total / 15.0).abs() < TOL);
    }

    #[test]
    fn off_diagonal_components_are_symmetrised() {
        let sites = 3;
        let mut builder = ConnectedCorrelationSet::builder(sites);
        for r in 0..sites {
            let components = std::array::from_fn(|c| {
                let v = if AXIS_PAIRS[c] == XY { 1.0 } else { 0.0 };
                vec![Complex64::new(v, 5.0); sites]
            });
            builder.insert(r, CorrelationTensor::new(components)).unwrap();
        }
        let row = reduce(&builder.finish().unwrap(), 0).unwrap();
        // Only XY is non-zero in the real part: fxy = 9 / 9.
        assert!((row.fxy - 1.0).abs() < TOL);
        assert!(row.fxx.abs() < TOL && row.fyz.abs() < TOL && row.fzx.abs() < TOL);
    }

    #[test]
    fn momentum_out_of_range_is_rejected() {
        let set = dataset(4);
        assert!(matches!(
            reduce(&set, 4),
            Err(SpectrumError::OutOfRange { index: 4, bound: 4, .. })
        ));
    }

    #[test]
    fn parallel_spectrum_matches_single_rows() {
        let set = dataset(6);
        let rows = spectrum(&set);
        assert_eq!(rows.len(), 6);
        for (k, row) in rows.iter().enumerate() {
            assert_eq!(row.k, k);
            assert_eq!(*row, reduce(&set, k).unwrap());
        }
    }

    #[test]
    fn empty_dataset_has_empty_spectrum() {
        let set = ConnectedCorrelationSet::builder(0).finish().unwrap();
        assert!(spectrum(&set).is_empty());
        assert!(reduce(&set, 0).is_err());
    }
}
