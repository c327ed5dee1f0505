//! Pure Rust raster backend on the `image` crate's own operations.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP, TIFF, BMP, PNM) | `image` crate decoders, format sniffed from content |
//! | Resample | `DynamicImage::resize_exact` with `Lanczos3` / `CatmullRom` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Rotate | `rotate90/180/270`, expanded nearest-neighbour rotation otherwise |
//! | Flip | `fliph` / `flipv` |
//! | Composite | `image::imageops::overlay` |
//! | Encode | [`codec::encode`](super::codec::encode), same format as the source |

use super::backend::{BackendError, ImageBackend};
use super::codec;
use super::dimension::{Axis, Dimension};
use super::params::ResampleFilter;
use super::pixels::rotate_clockwise;
use crate::config::BackendOptions;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba};
use std::path::Path;

const NAME: &str = "raster";

/// Raster backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RasterBackend {
    background: Rgba<u8>,
}

impl RasterBackend {
    pub fn new() -> Self {
        Self::from_config(&BackendOptions::default())
    }

    pub fn from_config(options: &BackendOptions) -> Self {
        Self {
            background: options.background_color(),
        }
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_type(filter: ResampleFilter) -> FilterType {
    match filter {
        ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        ResampleFilter::CatmullRom => FilterType::CatmullRom,
    }
}

/// Reject crop regions that leave the image instead of silently shrinking them.
pub(crate) fn check_region(
    backend: &str,
    image: &DynamicImage,
    region: &Dimension,
) -> Result<(u32, u32), BackendError> {
    let Axis { x, y } = region.axis();
    let fits = x >= 0
        && y >= 0
        && region.width() > 0
        && region.height() > 0
        && x as u64 + region.width() as u64 <= image.width() as u64
        && y as u64 + region.height() as u64 <= image.height() as u64;
    if !fits {
        return Err(BackendError::operation(
            backend,
            "crop",
            format!(
                "region {region} outside {}x{} image",
                image.width(),
                image.height()
            ),
        ));
    }
    Ok((x as u32, y as u32))
}

impl ImageBackend for RasterBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load_path(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        codec::decode_path(NAME, path)
    }

    fn load_bytes(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        codec::decode_bytes(NAME, bytes)
    }

    fn rotate(&self, image: &DynamicImage, degrees: i32) -> Result<DynamicImage, BackendError> {
        Ok(rotate_clockwise(image, degrees, self.background))
    }

    fn flip_horizontal(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        Ok(image.fliph())
    }

    fn flip_vertical(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        Ok(image.flipv())
    }

    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<DynamicImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::operation(
                NAME,
                "resample",
                format!("target {width}x{height} is empty"),
            ));
        }
        Ok(image.resize_exact(width, height, filter_type(filter)))
    }

    fn crop(&self, image: &DynamicImage, region: &Dimension) -> Result<DynamicImage, BackendError> {
        let (x, y) = check_region(NAME, image, region)?;
        Ok(image.crop_imm(x, y, region.width(), region.height()))
    }

    fn composite(
        &self,
        canvas: &mut DynamicImage,
        overlay: &DynamicImage,
        at: Axis,
    ) -> Result<(), BackendError> {
        imageops::overlay(canvas, overlay, at.x as i64, at.y as i64);
        Ok(())
    }
}
