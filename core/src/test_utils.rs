//! Shared test utilities for the reference implementation and the kernels.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::volume::CorrDims;

/// Raw input data for one correlation problem.
#[derive(Debug, Clone)]
pub struct CorrInputs {
    pub fmap1: Vec<f32>,
    pub fmap2: Vec<f32>,
    pub coords: Vec<f32>,
}

/// Uniform random values in `start..end`.
pub fn random_vec(rng: &mut StdRng, len: usize, start: f32, end: f32) -> Vec<f32> {
    (0..len).map(|_| rng.random_range(start..end)).collect()
}

/// Random feature grids plus sample coordinates for `dims`.
///
/// Coordinates land in `[-1, extent]` so the borders and the zero-padding
/// region are exercised alongside interior samples.
#[must_use]
pub fn generate_inputs(dims: &CorrDims, seed: u64) -> CorrInputs {
    let mut rng = StdRng::seed_from_u64(seed);

    let fmap1 = random_vec(&mut rng, dims.fmap1_len(), -1.0, 1.0);
    let fmap2 = random_vec(&mut rng, dims.fmap2_len(), -1.0, 1.0);

    let mut coords = Vec::with_capacity(dims.coords_len());
    for _ in 0..dims.coords_len() / 2 {
        coords.push(rng.random_range(-1.0..dims.w2 as f32));
        coords.push(rng.random_range(-1.0..dims.h2 as f32));
    }

    CorrInputs {
        fmap1,
        fmap2,
        coords,
    }
}

/// Assert two f32 slices are close within relative and absolute tolerance.
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_data_close(a: &[f32], b: &[f32], rtol: f32, atol: f32, name: &str) {
    assert_eq!(
        a.len(),
        b.len(),
        "{name}: Data sizes don't match: {} vs {}",
        a.len(),
        b.len()
    );

    let mut max_diff = 0.0f32;
    let mut max_idx = 0;
    let mut max_av = 0.0f32;
    let mut max_bv = 0.0f32;

    for (i, (&av, &bv)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (av - bv).abs();
        if diff > max_diff {
            max_diff = diff;
            max_idx = i;
            max_av = av;
            max_bv = bv;
        }
    }

    let tolerance = atol + rtol * max_bv.abs();
    assert!(
        max_diff <= tolerance,
        "{name}: max_diff={max_diff:.6} exceeds tolerance={tolerance:.6} at idx {max_idx}: tested={max_av:.6} ref={max_bv:.6}",
    );
}

/// Centered finite-difference gradient of `sum(f(x) * upstream)` at `x`.
///
/// `f` must be a pure function of `x`; every element is perturbed by
/// `+/- eps` independently.
pub fn finite_diff_grad(
    f: impl Fn(&[f32]) -> Vec<f32>,
    x: &[f32],
    upstream: &[f32],
    eps: f32,
) -> Vec<f32> {
    let mut grad = vec![0.0f32; x.len()];
    let mut probe = x.to_vec();

    for i in 0..x.len() {
        probe[i] = x[i] + eps;
        let plus: f32 = f(&probe)
            .iter()
            .zip(upstream)
            .map(|(v, u)| v * u)
            .sum();

        probe[i] = x[i] - eps;
        let minus: f32 = f(&probe)
            .iter()
            .zip(upstream)
            .map(|(v, u)| v * u)
            .sum();

        probe[i] = x[i];
        grad[i] = (plus - minus) / (2.0 * eps);
    }
    grad
}
