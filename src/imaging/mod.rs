//! Image geometry and backends.
//!
//! | Operation | Where the decision is made | Who executes it |
//! |---|---|---|
//! | **Resize** | [`calculations::plan_resize`] (window, scale, crop) | [`ImageBackend::resize`] |
//! | **Scale** | [`Dimension::with_scale`] | [`ImageBackend::scale`] |
//! | **Crop anchor** | [`calculations::crop_axis`] | [`ImageBackend::crop`] |
//! | **Watermark placement** | [`calculations::watermark_axis`], [`calculations::overlay_auto_scale`] | [`ImageBackend::composite`] |
//! | **Rotate / flip** | n/a | [`ImageBackend::rotate`], [`ImageBackend::flip`] |
//!
//! The module is split into:
//! - **Dimension**: Value types for size, orientation, focus and offset
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait, registry and the concrete backends
//! - **Session**: [`Manipulation`], which drives one image through a backend

pub mod backend;
pub mod calculations;
mod codec;
pub mod dimension;
pub mod fast_backend;
pub mod netpbm_backend;
mod params;
mod pixels;
pub mod rust_backend;
pub mod session;
pub mod source;
pub mod watermark;

pub use backend::{BackendError, BackendKind, ImageBackend, select_backend};
pub use dimension::{Axis, Dimension, Focus, Orientation, ParseNameError, resolve_orientation};
pub use fast_backend::FastBackend;
pub use netpbm_backend::NetpbmBackend;
pub use params::{FlipAxis, Quality, ROTATE_CCW, ROTATE_CW, ResampleFilter, ResizePlan};
pub use rust_backend::RasterBackend;
pub use session::{Displayed, Manipulation};
pub use source::{ImageFile, ImageSource};
pub use watermark::{Mark, Overlay, Position, Text, Watermark, parse_hex_color};
