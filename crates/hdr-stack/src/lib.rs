//! Umbrella crate for the `hdr-stack` workspace.
//!
//! Re-exports the image primitives, the alignment pyramid and the capture,
//! alignment and exposure machinery for bracketed raw sequences.
//!
//! ```
//! use hdr_stack::{AlignConfig, Capture, ExposureConfig, ExposureStack, SensorMeta};
//!
//! let meta = SensorMeta::mono(4, 4, 0, 4095);
//! let bright = Capture::new(vec![800; 16], meta.clone())?;
//! let dark = Capture::new(vec![400; 16], meta)?;
//!
//! let mut stack = ExposureStack::from_captures(vec![dark, bright]);
//! let report = stack.align_and_expose(&AlignConfig::default(), &ExposureConfig::default())?;
//! assert_eq!(report.entries[1].relative_exposure, 2.0);
//! # Ok::<(), hdr_stack::Error>(())
//! ```

pub use hs_align::*;
pub use hs_core::*;
pub use hs_pyr::*;
