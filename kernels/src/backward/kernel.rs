use cubecl::prelude::*;

use crate::{
    CorrConfig,
    splat::{grid_contains, splat_target},
    tiling::{CHANNEL_GROUP, STAGE_STRIDE, TILE_AREA, TILE_H, TILE_W},
    types::{CorrGradOutputs, CorrInputs},
};

/// Backward correlation kernel.
///
/// Mirrors the forward tiling and loop structure exactly: the same channel
/// groups, the same corner enumeration and the same quadrant formula, so
/// every gradient lands where the forward pass contributed.
///
/// Per corner, the four upstream cell gradients are recombined into the
/// scalar `g` (the gradient of that corner's dot product), then
/// `g * staged_target` accumulates into the shared source-gradient buffer
/// and `g * staged_source` into the shared target-gradient buffer. The
/// target buffer is flushed per corner with atomic adds (neighbourhoods of
/// many tiles may alias one target cell); the source buffer is flushed once
/// per channel group, non-atomically, since each tile owns its own pixels.
///
/// The coordinate gradient output is never written.
///
/// Shared memory layout:
/// - f1, f2: `[CHANNEL_GROUP][TILE_AREA + 1]` staged feature columns
/// - df1, df2: same layout, gradient accumulators
/// - x2s, y2s: `[TILE_AREA]` per-pixel sample coordinates
#[cube(launch, launch_unchecked)]
pub fn corr_backward_kernel<F: Float>(
    inputs: &CorrInputs<F>,
    corr_grad: &Tensor<F>,
    grads: &mut CorrGradOutputs<F>,
    #[comptime] config: CorrConfig,
) {
    let batch_idx = CUBE_POS_X as usize;
    let tile_row = CUBE_POS_Y as usize;
    let tile_col = CUBE_POS_Z as usize;

    let h1 = inputs.fmap1.shape(1);
    let w1 = inputs.fmap1.shape(2);
    let h2 = inputs.fmap2.shape(1);
    let w2 = inputs.fmap2.shape(2);
    let channels = inputs.fmap1.shape(3);
    let groups = inputs.coords.shape(1);

    let radius = comptime!(config.radius);
    let side = comptime!(config.window_side());

    let num_lanes = CUBE_DIM as usize;
    let lane = UNIT_POS_Y as usize * TILE_W + UNIT_POS_X as usize;

    let out_h = tile_row * TILE_H + UNIT_POS_Y as usize;
    let out_w = tile_col * TILE_W + UNIT_POS_X as usize;
    let in_plane = out_h < h1 && out_w < w1;

    let mut f1 = SharedMemory::<F>::new(comptime!(CHANNEL_GROUP * STAGE_STRIDE));
    let mut f2 = SharedMemory::<F>::new(comptime!(CHANNEL_GROUP * STAGE_STRIDE));
    let mut df1 = SharedMemory::<F>::new(comptime!(CHANNEL_GROUP * STAGE_STRIDE));
    let mut df2 = SharedMemory::<F>::new(comptime!(CHANNEL_GROUP * STAGE_STRIDE));
    let mut x2s = SharedMemory::<F>::new(comptime!(TILE_AREA));
    let mut y2s = SharedMemory::<F>::new(comptime!(TILE_AREA));

    for c0 in range_stepped(0, channels, CHANNEL_GROUP) {
        // Stage the tile's source channel group and clear its gradient
        // accumulator, both striped over the flat buffer.
        for p in range_stepped(lane, TILE_AREA, num_lanes) {
            let ph = tile_row * TILE_H + p / TILE_W;
            let pw = tile_col * TILE_W + p % TILE_W;
            if ph < h1 && pw < w1 {
                let base = ((batch_idx * h1 + ph) * w1 + pw) * channels + c0;
                for k in 0..CHANNEL_GROUP {
                    f1[k * STAGE_STRIDE + p] = inputs.fmap1[base + k];
                }
            } else {
                for k in 0..CHANNEL_GROUP {
                    f1[k * STAGE_STRIDE + p] = F::new(0.0);
                }
            }
            for k in 0..CHANNEL_GROUP {
                df1[k * STAGE_STRIDE + p] = F::new(0.0);
            }
        }
        sync_cube();

        for n in 0..groups {
            let mut cx = F::new(0.0);
            let mut cy = F::new(0.0);
            if in_plane {
                let base = (((batch_idx * groups + n) * h1 + out_h) * w1 + out_w) * 2;
                cx = inputs.coords[base];
                cy = inputs.coords[base + 1];
            }
            x2s[lane] = cx;
            y2s[lane] = cy;
            sync_cube();

            let x = x2s[lane];
            let y = y2s[lane];
            let dx = x - F::floor(x);
            let dy = y - F::floor(y);

            for iy in 0..side + 1 {
                for ix in 0..side + 1 {
                    // Stage the target channels at each pixel's own corner
                    // position; clear this corner's target-gradient columns.
                    for p in range_stepped(lane, TILE_AREA, num_lanes) {
                        let corner_x =
                            F::floor(x2s[p]) - F::cast_from(radius) + F::cast_from(ix);
                        let corner_y =
                            F::floor(y2s[p]) - F::cast_from(radius) + F::cast_from(iy);
                        if grid_contains::<F>(corner_x, corner_y, h2, w2) {
                            let th = u32::cast_from(corner_y) as usize;
                            let tw = u32::cast_from(corner_x) as usize;
                            let base = ((batch_idx * h2 + th) * w2 + tw) * channels + c0;
                            for k in 0..CHANNEL_GROUP {
                                f2[k * STAGE_STRIDE + p] = inputs.fmap2[base + k];
                            }
                        } else {
                            for k in 0..CHANNEL_GROUP {
                                f2[k * STAGE_STRIDE + p] = F::new(0.0);
                            }
                        }
                        for k in 0..CHANNEL_GROUP {
                            df2[k * STAGE_STRIDE + p] = F::new(0.0);
                        }
                    }
                    sync_cube();

                    // Upstream gradient of this corner's dot product: the
                    // same four cells and weights the forward splat used.
                    let mut g = F::new(0.0);
                    if in_plane {
                        let vol_base = (batch_idx * groups + n) * (side * side);
                        for q in 0..4 {
                            let (hit, ch, wgt) = splat_target::<F>(ix, iy, q, dx, dy, side);
                            if hit {
                                let idx = ((vol_base + ch) * h1 + out_h) * w1 + out_w;
                                g += wgt * corr_grad[idx];
                            }
                        }
                    }

                    // Adjoint of the dot product on this lane's columns.
                    for k in 0..CHANNEL_GROUP {
                        let col = k * STAGE_STRIDE + lane;
                        df1[col] += g * f2[col];
                        df2[col] += g * f1[col];
                    }
                    sync_cube();

                    // Flush this corner's target gradient; cells can be
                    // aliased by other tiles, hence the atomic add.
                    for p in range_stepped(lane, TILE_AREA, num_lanes) {
                        let ph = tile_row * TILE_H + p / TILE_W;
                        let pw = tile_col * TILE_W + p % TILE_W;
                        let corner_x =
                            F::floor(x2s[p]) - F::cast_from(radius) + F::cast_from(ix);
                        let corner_y =
                            F::floor(y2s[p]) - F::cast_from(radius) + F::cast_from(iy);
                        if ph < h1 && pw < w1 && grid_contains::<F>(corner_x, corner_y, h2, w2) {
                            let th = u32::cast_from(corner_y) as usize;
                            let tw = u32::cast_from(corner_x) as usize;
                            let base = ((batch_idx * h2 + th) * w2 + tw) * channels + c0;
                            for k in 0..CHANNEL_GROUP {
                                let v = df2[k * STAGE_STRIDE + p];
                                grads.fmap2[base + k].fetch_add(f32::cast_from(v));
                            }
                        }
                    }
                    sync_cube();
                }
            }
        }

        // Flush the source gradient for this channel group. No aliasing:
        // each output pixel belongs to exactly one tile.
        for p in range_stepped(lane, TILE_AREA, num_lanes) {
            let ph = tile_row * TILE_H + p / TILE_W;
            let pw = tile_col * TILE_W + p % TILE_W;
            if ph < h1 && pw < w1 {
                let base = ((batch_idx * h1 + ph) * w1 + pw) * channels + c0;
                for k in 0..CHANNEL_GROUP {
                    grads.fmap1[base + k] += df1[k * STAGE_STRIDE + p];
                }
            }
        }
        sync_cube();
    }
}
