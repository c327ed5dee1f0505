//! Convolution backend built on `fast_image_resize`.
//!
//! Works on RGBA8 buffers throughout. Resampling runs through
//! `fast_image_resize`'s SIMD convolution; crop, flip and rotation reuse
//! the `image` buffer operations, and compositing is a manual Porter-Duff
//! blend over the canvas pixels.

use super::backend::{BackendError, ImageBackend};
use super::codec;
use super::dimension::{Axis, Dimension};
use super::params::ResampleFilter;
use super::pixels::{composite_over, rotate_clockwise};
use super::rust_backend::check_region;
use crate::config::BackendOptions;
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{DynamicImage, Rgba, RgbaImage};
use std::num::NonZeroU32;
use std::path::Path;

const NAME: &str = "fast";

pub struct FastBackend {
    background: Rgba<u8>,
}

impl FastBackend {
    pub fn new() -> Self {
        Self {
            background: Rgba([0, 0, 0, 255]),
        }
    }

    pub fn from_config(options: &BackendOptions) -> Self {
        Self {
            background: options.background_color(),
        }
    }
}

impl Default for FastBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn non_zero(value: u32, what: &str) -> Result<NonZeroU32, BackendError> {
    NonZeroU32::new(value)
        .ok_or_else(|| BackendError::operation(NAME, "resample", format!("{what} is 0")))
}

impl ImageBackend for FastBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load_path(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        codec::decode_path(NAME, path).map(|img| DynamicImage::ImageRgba8(img.to_rgba8()))
    }

    fn load_bytes(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        codec::decode_bytes(NAME, bytes).map(|img| DynamicImage::ImageRgba8(img.to_rgba8()))
    }

    fn rotate(&self, image: &DynamicImage, degrees: i32) -> Result<DynamicImage, BackendError> {
        Ok(rotate_clockwise(image, degrees, self.background))
    }

    fn flip_horizontal(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        Ok(DynamicImage::ImageRgba8(image::imageops::flip_horizontal(
            &image.to_rgba8(),
        )))
    }

    fn flip_vertical(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        Ok(DynamicImage::ImageRgba8(image::imageops::flip_vertical(
            &image.to_rgba8(),
        )))
    }

    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<DynamicImage, BackendError> {
        let src_w = non_zero(image.width(), "source width")?;
        let src_h = non_zero(image.height(), "source height")?;
        let dst_w = non_zero(width, "target width")?;
        let dst_h = non_zero(height, "target height")?;

        let src = Image::from_vec_u8(src_w, src_h, image.to_rgba8().into_raw(), PixelType::U8x4)
            .map_err(|e| BackendError::operation(NAME, "resample", format!("{e:?}")))?;
        let mut dst = Image::new(dst_w, dst_h, PixelType::U8x4);

        let kernel = match filter {
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
        };
        let mut resizer = Resizer::new(ResizeAlg::Convolution(kernel));
        resizer
            .resize(&src.view(), &mut dst.view_mut())
            .map_err(|e| BackendError::operation(NAME, "resample", format!("{e:?}")))?;

        let out = RgbaImage::from_raw(width, height, dst.into_vec()).ok_or_else(|| {
            BackendError::operation(NAME, "resample", "output buffer size mismatch")
        })?;
        Ok(DynamicImage::ImageRgba8(out))
    }

    fn crop(&self, image: &DynamicImage, region: &Dimension) -> Result<DynamicImage, BackendError> {
        let (x, y) = check_region(NAME, image, region)?;
        let rgba = image.to_rgba8();
        let view = image::imageops::crop_imm(&rgba, x, y, region.width(), region.height());
        Ok(DynamicImage::ImageRgba8(view.to_image()))
    }

    fn composite(
        &self,
        canvas: &mut DynamicImage,
        overlay: &DynamicImage,
        at: Axis,
    ) -> Result<(), BackendError> {
        let mut target = canvas.to_rgba8();
        composite_over(&mut target, &overlay.to_rgba8(), at);
        *canvas = DynamicImage::ImageRgba8(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::calculations::plan_resize;
    use crate::imaging::params::FlipAxis;
    use image::GenericImageView;

    fn checker(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }))
    }

    #[test]
    fn resample_produces_exact_size() {
        let out = FastBackend::new()
            .resample(&checker(64, 48), 20, 15, ResampleFilter::Lanczos3)
            .unwrap();
        assert_eq!(out.dimensions(), (20, 15));
    }

    #[test]
    fn resample_zero_target_is_error() {
        let result = FastBackend::new().resample(&checker(8, 8), 8, 0, ResampleFilter::CatmullRom);
        assert!(matches!(result, Err(BackendError::Operation { code: "resample", .. })));
    }

    #[test]
    fn resize_plan_matches_raster_geometry() {
        let backend = FastBackend::new();
        let source = Dimension::new(1200, 800);
        let target = source.with_size(400, 400);
        let out = backend
            .resize(&checker(1200, 800), &plan_resize(&source, &target))
            .unwrap();
        assert_eq!(out.dimensions(), (400, 400));
    }

    #[test]
    fn flip_both_equals_horizontal_then_vertical() {
        let backend = FastBackend::new();
        let mut img = RgbaImage::from_pixel(6, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let img = DynamicImage::ImageRgba8(img);

        let both = backend.flip(&img, FlipAxis::Both).unwrap();
        let h = backend.flip(&img, FlipAxis::Horizontal).unwrap();
        let hv = backend.flip(&h, FlipAxis::Vertical).unwrap();
        assert_eq!(both, hv);
        assert_eq!(both.get_pixel(5, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn rotate_odd_angle_fills_black() {
        let rotated = FastBackend::new().rotate(&checker(32, 32), 30).unwrap();
        assert_eq!(rotated.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn configured_background_is_used() {
        let backend = FastBackend::from_config(&BackendOptions {
            background: "#ff0000".into(),
        });
        let rotated = backend.rotate(&checker(32, 32), 30).unwrap();
        assert_eq!(rotated.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn composite_half_transparent_overlay() {
        let backend = FastBackend::new();
        let mut canvas = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let overlay = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 128])));
        backend.composite(&mut canvas, &overlay, Axis::new(1, 1)).unwrap();

        let blended = canvas.get_pixel(1, 1).0;
        assert!((126..=130).contains(&blended[0]));
        assert_eq!(blended[3], 255);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn crop_returns_region() {
        let out = FastBackend::new()
            .crop(&checker(32, 32), &Dimension::at(8, 8, 8, 0))
            .unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }
}
