//! Alignment pyramids for raw `u16` captures.
//!
//! `hs-pyr` uses a fixed 2x2 box filter with floor division.
//!
//! Drop-odd policy:
//! - Output size is `(src.width() / 2, src.height() / 2)`.
//! - If source width or height is odd, the last column/row is dropped.
//!
//! Saturation policy:
//! - [`PyramidU16`] is built with the capture's saturation threshold. Any 2x2
//!   block touching a saturated sample is emitted as saturated, so clipped
//!   highlights never leak into coarse-level comparisons as plausible values.
//!
//! Rows are processed in parallel with rayon for large levels; every output
//! sample depends only on its own 2x2 block, so results do not depend on the
//! thread count.

mod downsample;
mod pyramid;

pub use downsample::{downsample2x2_mean_u16, downsample2x2_saturating_u16};
pub use pyramid::PyramidU16;
