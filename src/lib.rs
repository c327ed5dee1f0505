//! # Reframe
//!
//! Image geometry engine: resize-and-crop to exact target sizes, proportional
//! scaling, rotation, flips and watermarking, executed by interchangeable
//! backends.
//!
//! # Architecture
//!
//! Geometry is decided once, as pure arithmetic, and handed to a backend as
//! a plan. Backends never compute crop windows or anchors themselves.
//!
//! ```text
//! Dimension (source) ──► plan_resize ──► ResizePlan ──► ImageBackend::resize
//!                              ▲
//! Dimension (target) ──────────┘   focus + orientation pick the crop anchor
//! ```
//!
//! A [`Manipulation`](imaging::Manipulation) session owns the decoded source
//! and a separate result that forks off the first time a step changes the
//! image. Resize and scale always start from the pristine source, so they can
//! be repeated freely; rotate, flip and watermark build on the current result.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Value types, geometry, backends and the manipulation session |
//! | [`config`] | `reframe.toml` loading: stock defaults, sparse overlay, validation |
//! | [`pipeline`] | Serializable step lists and the cache-aware `process_file` |
//! | [`cache`] | Content-addressed output cache keyed by source and recipe hashes |
//!
//! # Design Decisions
//!
//! ## Format Preservation
//!
//! Output is encoded in the source's format. A JPEG in is a JPEG out; there
//! is no renegotiation along the pipeline. Quality (0-100) maps to each
//! encoder's native parameter in the shared codec.
//!
//! ## Backend Registry
//!
//! Backends are picked by name from config, case-insensitively. `raster`
//! (the default, also reachable as `gd`) uses `image::imageops`; `fast` runs
//! resampling through `fast_image_resize`; `netpbm` is registered but every
//! capability fails with `NotImplemented` instead of silently doing nothing.
//!
//! ## Strict Config, Lenient Setters
//!
//! Unknown keys and unknown enum values in `reframe.toml` are errors. The
//! named builder setters (`with_focus_named` and friends) leave the value
//! unchanged on bad input and log a warning instead.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod pipeline;
