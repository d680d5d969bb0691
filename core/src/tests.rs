//! Property tests for the scalar reference implementation.

use rand::{SeedableRng, rngs::StdRng};
use test_case::test_case;

use crate::{
    reference::{corr_backward_ref, corr_forward_ref},
    test_utils::{assert_data_close, finite_diff_grad, generate_inputs},
    volume::CorrDims,
};

// Finite differences on f32 inputs in [-1, 1]
const GRAD_RTOL: f32 = 2e-2;
const GRAD_ATOL: f32 = 2e-3;

#[test_case(0 ; "radius0")]
#[test_case(1 ; "radius1")]
#[test_case(3 ; "radius3")]
fn volume_channel_count_is_window_squared(radius: usize) {
    let dims = CorrDims::new(1, 3, 3, 2, radius);
    let inputs = generate_inputs(&dims, 11);
    let volume = corr_forward_ref(&inputs.fmap1, &inputs.fmap2, &inputs.coords, &dims);

    let side = 2 * radius + 1;
    assert_eq!(dims.volume_channels(), side * side);
    assert_eq!(volume.len(), dims.volume_len());
}

#[test]
fn zero_radius_integer_coords_is_exact_dot_product() {
    let dims = CorrDims::new(1, 3, 4, 5, 0);
    let inputs = generate_inputs(&dims, 7);

    // Every pixel samples its own integer position in the target grid.
    let mut coords = vec![0.0f32; dims.coords_len()];
    for h in 0..dims.h1 {
        for w in 0..dims.w1 {
            let ci = dims.coords_index(0, 0, h, w);
            coords[ci] = w as f32;
            coords[ci + 1] = h as f32;
        }
    }

    let volume = corr_forward_ref(&inputs.fmap1, &inputs.fmap2, &coords, &dims);

    for h in 0..dims.h1 {
        for w in 0..dims.w1 {
            let expected: f32 = (0..dims.channels)
                .map(|c| {
                    inputs.fmap1[dims.fmap1_index(0, h, w, c)]
                        * inputs.fmap2[dims.fmap2_index(0, h, w, c)]
                })
                .sum();
            let got = volume[dims.volume_index(0, 0, 0, 0, h, w)];
            assert!(
                (got - expected).abs() <= 1e-6,
                "pixel ({h},{w}): got {got}, expected {expected}"
            );
        }
    }
}

#[test]
fn splat_weights_sum_to_one_in_the_interior() {
    // Unit grids with a single channel make every in-bounds corner dot
    // product exactly 1, so each cell reads back its total bilinear weight.
    let dims = CorrDims::new(1, 1, 1, 1, 1).with_target(4, 4);
    let fmap1 = vec![1.0f32];
    let fmap2 = vec![1.0f32; dims.fmap2_len()];
    let coords = vec![1.3f32, 1.6];

    let volume = corr_forward_ref(&fmap1, &fmap2, &coords, &dims);

    for (i, v) in volume.iter().enumerate() {
        assert!((v - 1.0).abs() <= 1e-6, "cell {i}: weight sum {v} != 1");
    }
}

#[test]
fn border_cells_drop_weight_without_renormalising() {
    let dims = CorrDims::new(1, 1, 1, 1, 1).with_target(4, 4);
    let fmap1 = vec![1.0f32];
    let fmap2 = vec![1.0f32; dims.fmap2_len()];
    // dx = 0.25, dy = 0.5; the window's first row/column reach outside the
    // target grid, so those cells keep only the in-bounds corner weights.
    let coords = vec![0.25f32, 0.5];

    let volume = corr_forward_ref(&fmap1, &fmap2, &coords, &dims);

    let expected = [
        [0.125, 0.5, 0.5],
        [0.25, 1.0, 1.0],
        [0.25, 1.0, 1.0],
    ];
    for cy in 0..3 {
        for cx in 0..3 {
            let got = volume[dims.volume_index(0, 0, cx, cy, 0, 0)];
            assert!(
                (got - expected[cy][cx]).abs() <= 1e-6,
                "cell ({cx},{cy}): got {got}, expected {}",
                expected[cy][cx]
            );
        }
    }
}

#[test]
fn fully_out_of_range_coords_give_zero() {
    let dims = CorrDims::new(1, 2, 2, 4, 2);
    let inputs = generate_inputs(&dims, 3);

    // Neighbourhoods entirely outside the target grid on all four sides.
    let far = [
        (-100.0f32, -100.0f32),
        (100.0, 100.0),
        (-100.0, 100.0),
        (100.0, -100.0),
    ];
    let mut coords = vec![0.0f32; dims.coords_len()];
    for (i, (x, y)) in far.iter().enumerate() {
        let (h, w) = (i / dims.w1, i % dims.w1);
        let ci = dims.coords_index(0, 0, h, w);
        coords[ci] = *x;
        coords[ci + 1] = *y;
    }

    let volume = corr_forward_ref(&inputs.fmap1, &inputs.fmap2, &coords, &dims);
    assert!(volume.iter().all(|v| *v == 0.0));
}

#[test_case(0 ; "radius0")]
#[test_case(1 ; "radius1")]
#[test_case(3 ; "radius3")]
fn backward_matches_finite_differences(radius: usize) {
    let dims = CorrDims::new(1, 3, 3, 2, radius)
        .with_target(4, 4)
        .with_groups(2);
    let inputs = generate_inputs(&dims, 17);
    let upstream = crate::test_utils::random_vec(
        &mut StdRng::seed_from_u64(23),
        dims.volume_len(),
        -1.0,
        1.0,
    );

    let grads = corr_backward_ref(
        &inputs.fmap1,
        &inputs.fmap2,
        &inputs.coords,
        &upstream,
        &dims,
    );

    let fd1 = finite_diff_grad(
        |x| corr_forward_ref(x, &inputs.fmap2, &inputs.coords, &dims),
        &inputs.fmap1,
        &upstream,
        1e-2,
    );
    assert_data_close(&grads.fmap1, &fd1, GRAD_RTOL, GRAD_ATOL, "grad_fmap1");

    let fd2 = finite_diff_grad(
        |x| corr_forward_ref(&inputs.fmap1, x, &inputs.coords, &dims),
        &inputs.fmap2,
        &upstream,
        1e-2,
    );
    assert_data_close(&grads.fmap2, &fd2, GRAD_RTOL, GRAD_ATOL, "grad_fmap2");

    // The coordinate gradient is declared but never computed.
    assert!(grads.coords.iter().all(|v| *v == 0.0));
}
