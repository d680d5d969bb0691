use cubecl::prelude::*;

/// Forward-pass input tensors grouped into a struct.
#[derive(CubeType, CubeLaunch)]
pub struct CorrInputs<F: Float> {
    /// Source grid `[batch, h1, w1, channels]`.
    pub fmap1: Tensor<F>,
    /// Target grid `[batch, h2, w2, channels]`.
    pub fmap2: Tensor<F>,
    /// Sample coordinates `[batch, groups, h1, w1, 2]`, `(x, y)` innermost.
    pub coords: Tensor<F>,
}

/// Gradient output tensors grouped into a struct.
#[derive(CubeType, CubeLaunch)]
pub struct CorrGradOutputs<F: Float> {
    /// Source-grid gradient; each cell is owned by exactly one tile.
    pub fmap1: Tensor<F>,
    /// Target-grid gradient. Atomic because sample neighbourhoods from many
    /// tiles may alias the same cell. Always f32 - HIP/ROCm doesn't support
    /// bf16 atomics.
    pub fmap2: Tensor<Atomic<f32>>,
    /// Coordinate gradient `[batch, groups, h1, w1, 2]`. Declared by the
    /// operation but never written; stays zero.
    pub coords: Tensor<F>,
}
