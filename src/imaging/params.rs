//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. The geometry in
//! [`calculations`](super::calculations) produces them and every
//! [`backend`](super::backend) consumes the same values, so the arithmetic
//! lives in one place and backends only translate it into pixel calls.
//!
//! ## Types
//!
//! - [`Quality`]: Encoder quality (0–100, default 100). Clamped on construction.
//! - [`FlipAxis`]: Horizontal (1), vertical (2) or both (3).
//! - [`ResampleFilter`]: Sharp filter for plain downscales, softer one for square reframes.
//! - [`ResizePlan`]: Source window, intermediate scale size and final crop of a resize.

use super::dimension::Dimension;
use serde::{Deserialize, Serialize};

/// Rotate a quarter turn clockwise.
pub const ROTATE_CW: i32 = 90;
/// Rotate a quarter turn counter-clockwise.
pub const ROTATE_CCW: i32 = -90;

/// Quality setting passed through to the encoder (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Mirror axis. `Both` is horizontal followed by vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    Horizontal = 1,
    Vertical = 2,
    Both = 3,
}

impl TryFrom<u8> for FlipAxis {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FlipAxis::Horizontal),
            2 => Ok(FlipAxis::Vertical),
            3 => Ok(FlipAxis::Both),
            other => Err(other),
        }
    }
}

/// Resampling kernel requested by the geometry engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Sharp, high-quality downscale.
    Lanczos3,
    /// Softer kernel used after a square reframe.
    CatmullRom,
}

/// Everything a backend needs to execute a cover-fit resize.
///
/// Execution order: crop `window` out of the source (skipped when it covers
/// the whole source), resample it to `scale_width × scale_height` with
/// `filter`, then crop `crop` out of the scaled intermediate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizePlan {
    /// Region of the source that is sampled. Its axis is the top-left origin.
    pub window: Dimension,
    pub scale_width: u32,
    pub scale_height: u32,
    /// Final region cut from the scaled intermediate.
    pub crop: Dimension,
    pub filter: ResampleFilter,
}

impl ResizePlan {
    /// Whether the source window is a strict sub-region of a `width × height` source.
    pub fn reframes(&self, width: u32, height: u32) -> bool {
        self.window.size() != (width, height)
    }
}
