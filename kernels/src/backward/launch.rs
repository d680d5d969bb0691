//! Launch functions for the backward correlation kernel.

use burn::tensor::Element;
use burn_cubecl::{
    CubeRuntime, FloatElement,
    kernel::{cast, into_contiguous},
    ops::numeric::zeros_client,
    tensor::CubeTensor,
};
use cubecl::prelude::*;

use super::kernel::corr_backward_kernel;
use crate::{
    CorrConfig,
    tiling::{CHANNEL_GROUP, output_tile_grid},
    types::{CorrGradOutputsLaunch, CorrInputsLaunch},
};

/// Gradients produced by [`backward`].
#[derive(Debug, Clone)]
pub struct CorrGradTensors<T> {
    pub fmap1: T,
    pub fmap2: T,
    /// Allocated for the operation's declared signature but never written;
    /// always zero.
    pub coords: T,
}

/// Launch the backward kernel on raw tensor handles.
///
/// All three gradient buffers must be zero-initialised; the kernel
/// accumulates into them. `grad_fmap2` is an f32 buffer regardless of `F`
/// because it is accumulated with atomic adds.
pub fn launch_corr_backward<R: Runtime, F: Float + CubeElement>(
    client: &ComputeClient<R>,
    fmap1: TensorHandleRef<R>,
    fmap2: TensorHandleRef<R>,
    coords: TensorHandleRef<R>,
    corr_grad: TensorHandleRef<R>,
    grad_fmap1: TensorHandleRef<R>,
    grad_fmap2: TensorHandleRef<R>,
    grad_coords: TensorHandleRef<R>,
    config: CorrConfig,
) {
    let (cube_count, cube_dim) = output_tile_grid(fmap1.shape[0], fmap1.shape[1], fmap1.shape[2]);

    unsafe {
        cube_launch!(corr_backward_kernel::<F, R>(
            client,
            cube_count,
            cube_dim,
            CorrInputsLaunch::new(
                TensorArg::from_raw_parts::<F>(fmap1.handle, fmap1.strides, fmap1.shape, 1),
                TensorArg::from_raw_parts::<F>(fmap2.handle, fmap2.strides, fmap2.shape, 1),
                TensorArg::from_raw_parts::<F>(coords.handle, coords.strides, coords.shape, 1),
            ),
            TensorArg::from_raw_parts::<F>(
                corr_grad.handle,
                corr_grad.strides,
                corr_grad.shape,
                1
            ),
            CorrGradOutputsLaunch::new(
                TensorArg::from_raw_parts::<F>(
                    grad_fmap1.handle,
                    grad_fmap1.strides,
                    grad_fmap1.shape,
                    1
                ),
                // Atomic tensor is always f32
                TensorArg::from_raw_parts::<f32>(
                    grad_fmap2.handle,
                    grad_fmap2.strides,
                    grad_fmap2.shape,
                    1
                ),
                TensorArg::from_raw_parts::<F>(
                    grad_coords.handle,
                    grad_coords.strides,
                    grad_coords.shape,
                    1
                ),
            ),
            config,
        ));
    }
}

/// Gradients of the correlation volume with respect to both feature grids.
///
/// `corr_grad` is the upstream gradient of the forward output. The returned
/// coordinate gradient is allocated but stays zero: the operation declares
/// it without computing it.
pub fn backward<R: CubeRuntime, F: FloatElement>(
    fmap1: CubeTensor<R>,
    fmap2: CubeTensor<R>,
    coords: CubeTensor<R>,
    corr_grad: CubeTensor<R>,
    radius: usize,
) -> CorrGradTensors<CubeTensor<R>> {
    let fmap1 = into_contiguous(fmap1);
    let fmap2 = into_contiguous(fmap2);
    let coords = into_contiguous(coords);
    let corr_grad = into_contiguous(corr_grad);

    let [batch, h1, w1, channels] = fmap1.shape.dims();
    let [batch2, _, _, channels2] = fmap2.shape.dims();
    let [batch_c, groups, h1_c, w1_c, two] = coords.shape.dims();
    let [batch_g, groups_g, vol_channels, h1_g, w1_g] = corr_grad.shape.dims();

    let config = CorrConfig::new(radius);

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
    assert_eq!(
        (batch_g, groups_g, vol_channels, h1_g, w1_g),
        (batch, groups, config.volume_channels(), h1, w1),
        "volume gradient shape must match the forward output"
    );

    // All gradients accumulate additively, so they start zeroed. The
    // target-grid gradient is f32 for the atomic adds and cast back below.
    let grad_fmap1 = zeros_client::<R>(
        fmap1.client.clone(),
        fmap1.device.clone(),
        fmap1.shape.clone(),
        F::dtype(),
    );
    let grad_fmap2 = zeros_client::<R>(
        fmap2.client.clone(),
        fmap2.device.clone(),
        fmap2.shape.clone(),
        f32::dtype(),
    );
    let grad_coords = zeros_client::<R>(
        coords.client.clone(),
        coords.device.clone(),
        coords.shape.clone(),
        F::dtype(),
    );

    launch_corr_backward::<R, F>(
        &fmap1.client,
        fmap1.as_handle_ref(),
        fmap2.as_handle_ref(),
        coords.as_handle_ref(),
        corr_grad.as_handle_ref(),
        grad_fmap1.as_handle_ref(),
        grad_fmap2.as_handle_ref(),
        grad_coords.as_handle_ref(),
        config,
    );

    let grad_fmap2 = cast(grad_fmap2, F::dtype());

    CorrGradTensors {
        fmap1: grad_fmap1,
        fmap2: grad_fmap2,
        coords: grad_coords,
    }
}
