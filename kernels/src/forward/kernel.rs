use cubecl::prelude::*;

use crate::{
    CorrConfig,
    splat::{grid_contains, splat_target},
    tiling::{CHANNEL_GROUP, STAGE_STRIDE, TILE_AREA, TILE_H, TILE_W},
};

/// Forward correlation kernel.
///
/// Each CUBE handles one (batch, tile) pair of the output plane; one lane
/// per tile pixel (UNIT_POS_X: tile column, UNIT_POS_Y: tile row).
///
/// For every channel group the tile's source channels are staged once; for
/// every corner of the `(side+1)^2` corner grid the target channels at each
/// pixel's own corner position are staged, every lane computes the partial
/// dot product between its two staged columns, and the scalar is
/// bilinearly splatted into up to four window cells of the volume.
/// Contributions accumulate across channel groups, so `corr` must arrive
/// zero-initialised.
///
/// Shared memory layout:
/// - f1, f2: `[CHANNEL_GROUP][TILE_AREA + 1]` staged feature columns
///   (padding column avoids bank conflicts)
/// - x2s, y2s: `[TILE_AREA]` per-pixel sample coordinates
///
/// Input shapes:
/// - fmap1: `[batch, h1, w1, channels]`
/// - fmap2: `[batch, h2, w2, channels]`
/// - coords: `[batch, groups, h1, w1, 2]`
///
/// Output:
/// - corr: `[batch, groups, side^2, h1, w1]`, pre-zeroed
#[cube(launch, launch_unchecked)]
pub fn corr_forward_kernel<F: Float>(
    fmap1: &Tensor<F>,
    fmap2: &Tensor<F>,
    coords: &Tensor<F>,
    corr: &mut Tensor<F>,
    #[comptime] config: CorrConfig,
) {
    let batch_idx = CUBE_POS_X as usize;
    let tile_row = CUBE_POS_Y as usize;
    let tile_col = CUBE_POS_Z as usize;

    let h1 = fmap1.shape(1);
    let w1 = fmap1.shape(2);
    let h2 = fmap2.shape(1);
    let w2 = fmap2.shape(2);
    let channels = fmap1.shape(3);
    let groups = coords.shape(1);

    let radius = comptime!(config.radius);
    let side = comptime!(config.window_side());

    let num_lanes = CUBE_DIM as usize;
    let lane = UNIT_POS_Y as usize * TILE_W + UNIT_POS_X as usize;

    // This lane's output pixel; tiles may overrun the plane at the borders.
    let out_h = tile_row * TILE_H + UNIT_POS_Y as usize;
    let out_w = tile_col * TILE_W + UNIT_POS_X as usize;
    let in_plane = out_h < h1 && out_w < w1;

    let mut f1 = SharedMemory::<F>::new(comptime!(CHANNEL_GROUP * STAGE_STRIDE));
    let mut f2 = SharedMemory::<F>::new(comptime!(CHANNEL_GROUP * STAGE_STRIDE));
    let mut x2s = SharedMemory::<F>::new(comptime!(TILE_AREA));
    let mut y2s = SharedMemory::<F>::new(comptime!(TILE_AREA));

    for c0 in range_stepped(0, channels, CHANNEL_GROUP) {
        // Stage the tile's source channel group, striped over tile pixels.
        // Pixels past the plane border stage zeros.
        for p in range_stepped(lane, TILE_AREA, num_lanes) {
            let ph = tile_row * TILE_H + p / TILE_W;
            let pw = tile_col * TILE_W + p % TILE_W;
            if ph < h1 && pw < w1 {
                let base = ((batch_idx * h1 + ph) * w1 + pw) * channels + c0;
                for k in 0..CHANNEL_GROUP {
                    f1[k * STAGE_STRIDE + p] = fmap1[base + k];
                }
            } else {
                for k in 0..CHANNEL_GROUP {
                    f1[k * STAGE_STRIDE + p] = F::new(0.0);
                }
            }
        }
        sync_cube();

        for n in 0..groups {
            // Stage this group's sample coordinates for the whole tile.
            let mut cx = F::new(0.0);
            let mut cy = F::new(0.0);
            if in_plane {
                let base = (((batch_idx * groups + n) * h1 + out_h) * w1 + out_w) * 2;
                cx = coords[base];
                cy = coords[base + 1];
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
                    // position, zero-padded outside the target grid.
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
                                f2[k * STAGE_STRIDE + p] = fmap2[base + k];
                            }
                        } else {
                            for k in 0..CHANNEL_GROUP {
                                f2[k * STAGE_STRIDE + p] = F::new(0.0);
                            }
                        }
                    }
                    sync_cube();

                    // Partial dot product of this lane's staged columns.
                    let mut s = F::new(0.0);
                    for k in 0..CHANNEL_GROUP {
                        s += f1[k * STAGE_STRIDE + lane] * f2[k * STAGE_STRIDE + lane];
                    }

                    // Splat into the adjacent window cells.
                    if in_plane {
                        let vol_base = (batch_idx * groups + n) * (side * side);
                        for q in 0..4 {
                            let (hit, ch, wgt) = splat_target::<F>(ix, iy, q, dx, dy, side);
                            if hit {
                                let idx = ((vol_base + ch) * h1 + out_h) * w1 + out_w;
                                corr[idx] += wgt * s;
                            }
                        }
                    }
                    sync_cube();
                }
            }
        }
    }
}
