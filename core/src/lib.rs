#![warn(clippy::pedantic)]
#![allow(
    clippy::similar_names,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    //
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    //
    clippy::too_many_lines,
    clippy::many_single_char_names
)]

//! corrvol core
//!
//! This crate provides:
//! - `GpuBackend` / `DType` - feature-selected compute backend and element type
//! - `CorrDims` - shape model for one correlation problem
//! - `reference` - scalar CPU implementation of the correlation volume and
//!   its gradients, used as the oracle for the GPU kernels
//! - `test_utils` - shared data generation and comparison helpers

pub mod config;
pub mod reference;
pub mod test_utils;
pub mod volume;

#[cfg(test)]
mod tests;

pub use config::{DType, GpuBackend};
pub use reference::{CorrGrads, corr_backward_ref, corr_forward_ref};
pub use volume::CorrDims;
