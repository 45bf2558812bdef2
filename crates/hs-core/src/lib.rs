//! Foundational primitives for exposure-stack alignment.
//!
//! ## Images
//! [`Image`] owns a row-major buffer with `stride == width`. [`ImageView`]
//! borrows a window of one and uses element stride, so overlapping regions of
//! two images can be compared row by row without copying.
//!
//! ## Sensor Metadata
//! [`SensorMeta`] describes a raw capture: dimensions, black and white levels
//! and the dcraw-style CFA layout. Two captures can only be registered against
//! each other when their [`SensorFormat`]s match.
//!
//! ## Geometry
//! [`Displacement`] is an integer pixel offset. Aligned position `p` of a
//! capture displaced by `d` reads raw position `p - d`.

mod error;
mod geom;
mod image;
mod meta;

pub use error::Error;
pub use geom::{Displacement, Rect};
pub use image::{Image, ImageView};
pub use meta::{SensorFormat, SensorMeta};
