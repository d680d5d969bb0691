//! Single-source corner-to-cell mapping for the bilinear splat.
//!
//! The forward kernel computes exact dot products on the `(side+1)^2` grid
//! of integer corners and distributes each one into up to four adjacent
//! window cells; the backward kernel replays the same mapping to recombine
//! upstream cell gradients into per-corner scalars. Both iterate the four
//! quadrants through [`splat_target`] so the two directions cannot disagree
//! on cell indices or weights.
//!
//! Volume channel layout: cell `(cell_x, cell_y)` with
//! `cell_x, cell_y in [0, side)` lives at channel `cell_y * side + cell_x`
//! and holds the correlation for the relative target offset
//! `(cell_x - radius, cell_y - radius)`.

use cubecl::prelude::*;

/// Cell reached from corner `(ix, iy)` through quadrant `q in [0, 4)`.
///
/// `q & 1` selects the cell left of (0) or at (1) the corner along x,
/// `q >> 1` the same along y. Returns whether that cell exists inside the
/// `side x side` window, its channel in the flattened volume, and the
/// bilinear weight the corner carries into it given the fractional
/// remainders `(dx, dy)`.
#[cube]
pub fn splat_target<F: Float>(
    ix: usize,
    iy: usize,
    q: usize,
    dx: F,
    dy: F,
    #[comptime] side: usize,
) -> (bool, usize, F) {
    let qx = q % 2;
    let qy = q / 2;

    // Cell (ix + qx - 1, iy + qy - 1); corners on the outer border of the
    // corner grid reach cells outside the window in 1 or 2 quadrants.
    let hit = ix + qx >= 1 && ix + qx <= side && iy + qy >= 1 && iy + qy <= side;

    let mut cell_x = 0;
    let mut cell_y = 0;
    if hit {
        cell_x = ix + qx - 1;
        cell_y = iy + qy - 1;
    }

    let mut wx = F::new(1.0) - dx;
    if qx == 0 {
        wx = dx;
    }
    let mut wy = F::new(1.0) - dy;
    if qy == 0 {
        wy = dy;
    }

    (hit, cell_y * side + cell_x, wx * wy)
}

/// Whether the integer position `(x, y)`, carried as floats, lies inside a
/// `height x width` grid. Positions are validated in float space before any
/// cast to an index, so negative floors never wrap.
#[cube]
pub fn grid_contains<F: Float>(x: F, y: F, height: usize, width: usize) -> bool {
    x >= F::new(0.0) && x < F::cast_from(width) && y >= F::new(0.0) && y < F::cast_from(height)
}
