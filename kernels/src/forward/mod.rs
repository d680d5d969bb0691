//! Forward correlation volume kernel.
//!
//! Computes dense correlation scores between the source grid and a square
//! neighbourhood of the target grid centered at each fractional sample
//! coordinate, bilinearly splatted over the window cells.

mod kernel;
mod launch;

pub use kernel::corr_forward_kernel;
pub use launch::{forward, launch_corr_forward};
