//! Shape model for one correlation problem.
//!
//! All buffers are contiguous row-major with the documented axis order:
//! - feature grids: `[batch, height, width, channels]`
//! - coordinates: `[batch, groups, h1, w1, 2]` with `(x, y)` innermost
//! - correlation volume: `[batch, groups, side * side, h1, w1]`
//!
//! Volume channel `cy * side + cx` holds the correlation for the relative
//! target-grid offset `(cx - radius, cy - radius)`.

/// Dimensions of one correlation problem.
///
/// `h1`/`w1` are the source-grid (and output) spatial extents, `h2`/`w2`
/// the target-grid extents. `groups` is the number of independent
/// coordinate sets sharing the output plane.
#[derive(Debug, Clone, Copy)]
pub struct CorrDims {
    pub batch: usize,
    pub groups: usize,
    pub h1: usize,
    pub w1: usize,
    pub h2: usize,
    pub w2: usize,
    pub channels: usize,
    pub radius: usize,
}

impl CorrDims {
    /// Dimensions with identical source/target extents (the common case).
    #[must_use]
    pub fn new(batch: usize, height: usize, width: usize, channels: usize, radius: usize) -> Self {
        Self {
            batch,
            groups: 1,
            h1: height,
            w1: width,
            h2: height,
            w2: width,
            channels,
            radius,
        }
    }

    /// Set the target-grid extents.
    #[must_use]
    pub fn with_target(mut self, h2: usize, w2: usize) -> Self {
        self.h2 = h2;
        self.w2 = w2;
        self
    }

    /// Set the number of coordinate groups.
    #[must_use]
    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }

    /// Side length of the search window: `2 * radius + 1`.
    #[must_use]
    pub fn window_side(&self) -> usize {
        2 * self.radius + 1
    }

    /// Number of channels in the correlation volume: `window_side()^2`.
    #[must_use]
    pub fn volume_channels(&self) -> usize {
        self.window_side() * self.window_side()
    }

    #[must_use]
    pub fn fmap1_shape(&self) -> [usize; 4] {
        [self.batch, self.h1, self.w1, self.channels]
    }

    #[must_use]
    pub fn fmap2_shape(&self) -> [usize; 4] {
        [self.batch, self.h2, self.w2, self.channels]
    }

    #[must_use]
    pub fn coords_shape(&self) -> [usize; 5] {
        [self.batch, self.groups, self.h1, self.w1, 2]
    }

    #[must_use]
    pub fn volume_shape(&self) -> [usize; 5] {
        [
            self.batch,
            self.groups,
            self.volume_channels(),
            self.h1,
            self.w1,
        ]
    }

    #[must_use]
    pub fn fmap1_len(&self) -> usize {
        self.fmap1_shape().iter().product()
    }

    #[must_use]
    pub fn fmap2_len(&self) -> usize {
        self.fmap2_shape().iter().product()
    }

    #[must_use]
    pub fn coords_len(&self) -> usize {
        self.coords_shape().iter().product()
    }

    #[must_use]
    pub fn volume_len(&self) -> usize {
        self.volume_shape().iter().product()
    }

    /// Flat index into the source grid.
    #[must_use]
    pub fn fmap1_index(&self, b: usize, h: usize, w: usize, c: usize) -> usize {
        ((b * self.h1 + h) * self.w1 + w) * self.channels + c
    }

    /// Flat index into the target grid.
    #[must_use]
    pub fn fmap2_index(&self, b: usize, h: usize, w: usize, c: usize) -> usize {
        ((b * self.h2 + h) * self.w2 + w) * self.channels + c
    }

    /// Flat index of the `x` component of one sample coordinate; the `y`
    /// component follows at `+ 1`.
    #[must_use]
    pub fn coords_index(&self, b: usize, n: usize, h: usize, w: usize) -> usize {
        (((b * self.groups + n) * self.h1 + h) * self.w1 + w) * 2
    }

    /// Flat index into the correlation volume for window cell `(cx, cy)`.
    #[must_use]
    pub fn volume_index(&self, b: usize, n: usize, cx: usize, cy: usize, h: usize, w: usize) -> usize {
        let ch = cy * self.window_side() + cx;
        (((b * self.groups + n) * self.volume_channels() + ch) * self.h1 + h) * self.w1 + w
    }
}
