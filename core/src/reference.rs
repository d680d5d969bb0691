//! Scalar CPU reference implementation of the correlation volume.
//!
//! This is the oracle the GPU kernels are validated against. It is written
//! in gather form: every volume cell bilinearly interpolates the dot
//! products at its four surrounding integer target positions. The kernels
//! compute the same quantity in splat form (each corner dot product is
//! distributed into up to four cells); the two forms are algebraically
//! identical, so this implementation stays independent of the kernels'
//! tiling and corner enumeration.
//!
//! Positions outside the target grid contribute a dot product of zero.
//! Weights of in-bounds positions are not renormalised near borders.

use crate::volume::CorrDims;

/// Gradients produced by [`corr_backward_ref`].
///
/// `coords` is always all-zero: the gradient with respect to the sample
/// coordinates is declared by the operation but not computed.
#[derive(Debug, Clone)]
pub struct CorrGrads {
    pub fmap1: Vec<f32>,
    pub fmap2: Vec<f32>,
    pub coords: Vec<f32>,
}

/// Dot product between grid A at `(h1, w1)` and grid B at the integer
/// position `(x2, y2)`, zero when the position lies outside grid B.
fn corner_dot(
    fmap1: &[f32],
    fmap2: &[f32],
    dims: &CorrDims,
    b: usize,
    h1: usize,
    w1: usize,
    x2: isize,
    y2: isize,
) -> f32 {
    if x2 < 0 || y2 < 0 || x2 >= dims.w2 as isize || y2 >= dims.h2 as isize {
        return 0.0;
    }
    let a = dims.fmap1_index(b, h1, w1, 0);
    let t = dims.fmap2_index(b, y2 as usize, x2 as usize, 0);
    (0..dims.channels)
        .map(|c| fmap1[a + c] * fmap2[t + c])
        .sum()
}

/// Correlation volume of `fmap1` against `fmap2` at `coords`.
///
/// Shapes follow [`CorrDims`]; the result has `dims.volume_shape()`.
#[must_use]
pub fn corr_forward_ref(fmap1: &[f32], fmap2: &[f32], coords: &[f32], dims: &CorrDims) -> Vec<f32> {
    assert_eq!(fmap1.len(), dims.fmap1_len());
    assert_eq!(fmap2.len(), dims.fmap2_len());
    assert_eq!(coords.len(), dims.coords_len());

    let side = dims.window_side();
    let r = dims.radius as isize;
    let mut volume = vec![0.0f32; dims.volume_len()];

    for b in 0..dims.batch {
        for n in 0..dims.groups {
            for h in 0..dims.h1 {
                for w in 0..dims.w1 {
                    let ci = dims.coords_index(b, n, h, w);
                    let x = coords[ci];
                    let y = coords[ci + 1];
                    let x0 = x.floor();
                    let y0 = y.floor();
                    let dx = x - x0;
                    let dy = y - y0;
                    let x0 = x0 as isize;
                    let y0 = y0 as isize;

                    for cy in 0..side {
                        for cx in 0..side {
                            let mut acc = 0.0f32;
                            for qy in 0..2usize {
                                for qx in 0..2usize {
                                    let wx = if qx == 0 { 1.0 - dx } else { dx };
                                    let wy = if qy == 0 { 1.0 - dy } else { dy };
                                    let x2 = x0 - r + (cx + qx) as isize;
                                    let y2 = y0 - r + (cy + qy) as isize;
                                    acc += wx
                                        * wy
                                        * corner_dot(fmap1, fmap2, dims, b, h, w, x2, y2);
                                }
                            }
                            volume[dims.volume_index(b, n, cx, cy, h, w)] = acc;
                        }
                    }
                }
            }
        }
    }
    volume
}

/// Gradients of [`corr_forward_ref`] with respect to both feature grids.
///
/// `volume_grad` is the upstream gradient of the correlation volume. The
/// coordinate gradient in the result is allocated but stays zero.
#[must_use]
pub fn corr_backward_ref(
    fmap1: &[f32],
    fmap2: &[f32],
    coords: &[f32],
    volume_grad: &[f32],
    dims: &CorrDims,
) -> CorrGrads {
    assert_eq!(fmap1.len(), dims.fmap1_len());
    assert_eq!(fmap2.len(), dims.fmap2_len());
    assert_eq!(coords.len(), dims.coords_len());
    assert_eq!(volume_grad.len(), dims.volume_len());

    let side = dims.window_side();
    let r = dims.radius as isize;
    let mut grad1 = vec![0.0f32; dims.fmap1_len()];
    let mut grad2 = vec![0.0f32; dims.fmap2_len()];

    for b in 0..dims.batch {
        for n in 0..dims.groups {
            for h in 0..dims.h1 {
                for w in 0..dims.w1 {
                    let ci = dims.coords_index(b, n, h, w);
                    let x = coords[ci];
                    let y = coords[ci + 1];
                    let x0 = x.floor();
                    let y0 = y.floor();
                    let dx = x - x0;
                    let dy = y - y0;
                    let x0 = x0 as isize;
                    let y0 = y0 as isize;

                    for cy in 0..side {
                        for cx in 0..side {
                            let g = volume_grad[dims.volume_index(b, n, cx, cy, h, w)];
                            if g == 0.0 {
                                continue;
                            }
                            for qy in 0..2usize {
                                for qx in 0..2usize {
                                    let wx = if qx == 0 { 1.0 - dx } else { dx };
                                    let wy = if qy == 0 { 1.0 - dy } else { dy };
                                    let x2 = x0 - r + (cx + qx) as isize;
                                    let y2 = y0 - r + (cy + qy) as isize;
                                    if x2 < 0
                                        || y2 < 0
                                        || x2 >= dims.w2 as isize
                                        || y2 >= dims.h2 as isize
                                    {
                                        continue;
                                    }
                                    let gs = wx * wy * g;
                                    let a = dims.fmap1_index(b, h, w, 0);
                                    let t = dims.fmap2_index(b, y2 as usize, x2 as usize, 0);
                                    for c in 0..dims.channels {
                                        grad1[a + c] += gs * fmap2[t + c];
                                        grad2[t + c] += gs * fmap1[a + c];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    CorrGrads {
        fmap1: grad1,
        fmap2: grad2,
        coords: vec![0.0f32; dims.coords_len()],
    }
}
