//! Alignment and relative exposure of bracketed raw captures.
//!
//! A [`Capture`] owns a black-subtracted sensor buffer and, until released,
//! a [`PyramidU16`](hs_pyr::PyramidU16) used only for registration.
//!
//! ## Registration
//! [`Capture::align_with`] searches the integer displacement of one capture
//! against a reference from the coarsest pyramid level down to the full
//! buffer, testing the neighbourhood of the running estimate (`3x3` by
//! default) at every stage. Saturated samples never contribute to a score.
//!
//! ## Exposure
//! [`Capture::compute_relative_exposure`] compares the half-light
//! percentiles of two aligned captures over their shared unclipped samples
//! and stores the ratio that maps the darker one onto the brighter one's
//! scale.
//!
//! ## Sequences
//! [`ExposureStack`] sorts captures brightest-first, chains alignment and
//! exposure estimation through neighbouring pairs and releases pyramids as
//! soon as they are no longer needed.

mod align;
mod capture;
mod config;
mod decode;
mod exposure;
mod stack;

pub use align::{
    AlignInput, AlignReport, CandidateScore, Dissimilarity, SamplePlane, StageTrace,
    dissimilarity, register,
};
pub use capture::Capture;
pub use config::{AlignConfig, CaptureConfig, ExposureConfig, StackConfig};
#[cfg(feature = "image-io")]
pub use decode::ImageFileDecoder;
pub use decode::{RawDecoder, RawFrame};
pub use exposure::{ExposureEstimate, Histogram};
pub use stack::{ExposureStack, StackEntry, StackReport};
