//! Output-plane tiling and launch geometry.
//!
//! The output spatial plane is partitioned into fixed `TILE_H x TILE_W`
//! tiles; one cube processes one (batch, tile) pair with one lane per tile
//! pixel. Channels are staged in groups of [`CHANNEL_GROUP`] to bound
//! shared-memory usage. Both kernels consume this geometry.

use cubecl::prelude::{CubeCount, CubeDim};

/// Tile height in output pixels.
pub const TILE_H: usize = 4;
/// Tile width in output pixels.
pub const TILE_W: usize = 8;
/// Pixels (and lanes) per tile.
pub const TILE_AREA: usize = TILE_H * TILE_W;
/// Channels staged per iteration of the channel loop.
pub const CHANNEL_GROUP: usize = 32;
/// Row stride of the staging buffers; the extra column keeps the lanes of
/// one staged channel row in distinct shared-memory banks.
pub const STAGE_STRIDE: usize = TILE_AREA + 1;

/// Cube grid and per-cube lane geometry covering a `h1 x w1` output plane.
///
/// One cube per (batch, tile row, tile column); `CubeDim` is `TILE_W` lanes
/// in x by `TILE_H` lanes in y, one lane per tile pixel. Partial tiles at
/// the bottom/right borders are covered by lane guards inside the kernels.
#[must_use]
pub fn output_tile_grid(batch: usize, h1: usize, w1: usize) -> (CubeCount, CubeDim) {
    let tiles_h = h1.div_ceil(TILE_H) as u32;
    let tiles_w = w1.div_ceil(TILE_W) as u32;
    (
        CubeCount::Static(batch as u32, tiles_h, tiles_w),
        CubeDim::new_2d(TILE_W as u32, TILE_H as u32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_count_matches_tile_area() {
        let (_, cube_dim) = output_tile_grid(1, 16, 16);
        assert_eq!(cube_dim.num_elems() as usize, TILE_AREA);
    }

    #[test]
    fn grid_covers_the_output_plane() {
        let (cube_count, _) = output_tile_grid(3, 10, 17);
        let CubeCount::Static(b, th, tw) = cube_count else {
            panic!("tile grid must be static");
        };
        assert_eq!(b, 3);
        assert_eq!(th as usize * TILE_H, 12);
        assert_eq!(tw as usize * TILE_W, 24);
        assert!(th as usize * TILE_H >= 10);
        assert!(tw as usize * TILE_W >= 17);
    }

    #[test]
    fn exact_multiples_add_no_extra_tiles() {
        let (cube_count, _) = output_tile_grid(1, 8, 16);
        let CubeCount::Static(_, th, tw) = cube_count else {
            panic!("tile grid must be static");
        };
        assert_eq!(th, 2);
        assert_eq!(tw, 2);
    }
}
