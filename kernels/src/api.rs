//! Tensor-level entry points.
//!
//! Thin wrappers over the `CubeTensor` launch layer for callers holding
//! burn tensors on a cube backend. No autodiff registration happens here;
//! gradient plumbing stays with the caller.

use burn::tensor::{Tensor, TensorPrimitive};
use burn_cubecl::{BoolElement, CubeBackend, CubeRuntime, FloatElement, IntElement};

use crate::{backward::backward, forward::forward};

/// Correlation volume of `fmap1` against `fmap2` at `coords`.
///
/// Returns `[batch, groups, (2 * radius + 1)^2, h1, w1]`.
pub fn corr_forward<R: CubeRuntime, F: FloatElement, I: IntElement, BT: BoolElement>(
    fmap1: Tensor<CubeBackend<R, F, I, BT>, 4>,
    fmap2: Tensor<CubeBackend<R, F, I, BT>, 4>,
    coords: Tensor<CubeBackend<R, F, I, BT>, 5>,
    radius: usize,
) -> Tensor<CubeBackend<R, F, I, BT>, 5> {
    let volume = forward::<R, F>(
        fmap1.into_primitive().tensor(),
        fmap2.into_primitive().tensor(),
        coords.into_primitive().tensor(),
        radius,
    );
    Tensor::from_primitive(TensorPrimitive::Float(volume))
}

/// Gradients of [`corr_forward`] with respect to both feature grids.
///
/// Returns `(grad_fmap1, grad_fmap2, grad_coords)`; the coordinate gradient
/// is allocated but always zero (declared by the operation, not computed).
pub fn corr_backward<R: CubeRuntime, F: FloatElement, I: IntElement, BT: BoolElement>(
    fmap1: Tensor<CubeBackend<R, F, I, BT>, 4>,
    fmap2: Tensor<CubeBackend<R, F, I, BT>, 4>,
    coords: Tensor<CubeBackend<R, F, I, BT>, 5>,
    corr_grad: Tensor<CubeBackend<R, F, I, BT>, 5>,
    radius: usize,
) -> (
    Tensor<CubeBackend<R, F, I, BT>, 4>,
    Tensor<CubeBackend<R, F, I, BT>, 4>,
    Tensor<CubeBackend<R, F, I, BT>, 5>,
) {
    let grads = backward::<R, F>(
        fmap1.into_primitive().tensor(),
        fmap2.into_primitive().tensor(),
        coords.into_primitive().tensor(),
        corr_grad.into_primitive().tensor(),
        radius,
    );
    (
        Tensor::from_primitive(TensorPrimitive::Float(grads.fmap1)),
        Tensor::from_primitive(TensorPrimitive::Float(grads.fmap2)),
        Tensor::from_primitive(TensorPrimitive::Float(grads.coords)),
    )
}
