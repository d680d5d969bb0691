//! Launch functions for the forward correlation kernel.

use burn::tensor::Element;
use burn_cubecl::{
    CubeRuntime, FloatElement, kernel::into_contiguous, ops::numeric::zeros_client,
    tensor::CubeTensor,
};
use cubecl::prelude::*;

use super::kernel::corr_forward_kernel;
use crate::{
    CorrConfig,
    tiling::{CHANNEL_GROUP, output_tile_grid},
};

/// Launch the forward kernel on raw tensor handles.
///
/// `corr` must be zero-initialised; the kernel accumulates into it.
pub fn launch_corr_forward<R: Runtime, F: Float + CubeElement>(
    client: &ComputeClient<R>,
    fmap1: TensorHandleRef<R>,
    fmap2: TensorHandleRef<R>,
    coords: TensorHandleRef<R>,
    corr: TensorHandleRef<R>,
    config: CorrConfig,
) {
    let (cube_count, cube_dim) = output_tile_grid(fmap1.shape[0], fmap1.shape[1], fmap1.shape[2]);

    unsafe {
        cube_launch!(corr_forward_kernel::<F, R>(
            client,
            cube_count,
            cube_dim,
            TensorArg::from_raw_parts::<F>(fmap1.handle, fmap1.strides, fmap1.shape, 1),
            TensorArg::from_raw_parts::<F>(fmap2.handle, fmap2.strides, fmap2.shape, 1),
            TensorArg::from_raw_parts::<F>(coords.handle, coords.strides, coords.shape, 1),
            TensorArg::from_raw_parts::<F>(corr.handle, corr.strides, corr.shape, 1),
            config,
        ));
    }
}

/// Correlation volume of `fmap1` against `fmap2` at `coords`.
///
/// Allocates and returns the zero-initialised volume
/// `[batch, groups, (2 * radius + 1)^2, h1, w1]`.
pub fn forward<R: CubeRuntime, F: FloatElement>(
    fmap1: CubeTensor<R>,
    fmap2: CubeTensor<R>,
    coords: CubeTensor<R>,
    radius: usize,
) -> CubeTensor<R> {
    let fmap1 = into_contiguous(fmap1);
    let fmap2 = into_contiguous(fmap2);
    let coords = into_contiguous(coords);

    let [batch, h1, w1, channels] = fmap1.shape.dims();
    let [batch2, _, _, channels2] = fmap2.shape.dims();
    let [batch_c, groups, h1_c, w1_c, two] = coords.shape.dims();

    assert_eq!(batch, batch2, "feature grids must share the batch dimension");
    assert_eq!(batch, batch_c, "coords batch must match the feature grids");
    assert_eq!(
        channels, channels2,
        "feature grids must share the channel dimension"
    );
    assert_eq!(
        channels % CHANNEL_GROUP,
        0,
        "channel count ({channels}) must be a multiple of {CHANNEL_GROUP}"
    );
    assert_eq!(
        (h1_c, w1_c),
        (h1, w1),
        "coords plane must match the source grid"
    );
    assert_eq!(two, 2, "coords must carry (x, y) pairs innermost");

    let config = CorrConfig::new(radius);

    // The kernel accumulates across channel groups, so the volume starts zeroed.
    let volume = zeros_client::<R>(
        fmap1.client.clone(),
        fmap1.device.clone(),
        [batch, groups, config.volume_channels(), h1, w1].into(),
        F::dtype(),
    );

    launch_corr_forward::<R, F>(
        &fmap1.client,
        fmap1.as_handle_ref(),
        fmap2.as_handle_ref(),
        coords.as_handle_ref(),
        volume.as_handle_ref(),
        config,
    );

    volume
}
