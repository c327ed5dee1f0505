//! Pixel helpers shared by backends that lack a native primitive.
//!
//! - [`rotate_clockwise`]: lossless quarter turns, expanded canvas otherwise
//! - [`rotate_expanded`]: arbitrary-angle rotation onto an enlarged canvas
//! - [`composite_over`]: Porter-Duff "over" of a layer at an offset
//! - [`blend_pixels`]: single-pixel "over" with anti-aliasing support

use super::dimension::Axis;
use image::{DynamicImage, Rgba, RgbaImage};

/// Rotate clockwise by whole degrees.
///
/// Multiples of 90 use the lossless built-in rotations; anything else goes
/// through [`rotate_expanded`] with `fill` in the uncovered corners.
pub fn rotate_clockwise(image: &DynamicImage, degrees: i32, fill: Rgba<u8>) -> DynamicImage {
    match degrees.rem_euclid(360) {
        0 => image.clone(),
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        other => DynamicImage::ImageRgba8(rotate_expanded(&image.to_rgba8(), other as f32, fill)),
    }
}

/// Rotate clockwise by `degrees` around the center.
///
/// The canvas grows to the rotated bounding box; uncovered corners are
/// filled with `fill`. Sampling is nearest-neighbour.
pub fn rotate_expanded(image: &RgbaImage, degrees: f32, fill: Rgba<u8>) -> RgbaImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (src_w, src_h) = (image.width() as f32, image.height() as f32);

    let out_w = (src_w * cos.abs() + src_h * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (src_w * sin.abs() + src_h * cos.abs()).ceil().max(1.0) as u32;

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let out_cx = out_w as f32 / 2.0;
    let out_cy = out_h as f32 / 2.0;

    RgbaImage::from_fn(out_w, out_h, |x, y| {
        // Inverse mapping: rotate the destination point counter-clockwise.
        let dx = x as f32 + 0.5 - out_cx;
        let dy = y as f32 + 0.5 - out_cy;
        let sx = dx * cos + dy * sin + src_cx;
        let sy = -dx * sin + dy * cos + src_cy;

        if sx >= 0.0 && sy >= 0.0 && sx < src_w && sy < src_h {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            fill
        }
    })
}

/// Blend `layer` onto `target` with its top-left at `at`.
///
/// Parts of the layer outside the target are skipped, so negative offsets
/// and oversized layers are fine.
pub fn composite_over(target: &mut RgbaImage, layer: &RgbaImage, at: Axis) {
    let target_w = target.width() as i64;
    let target_h = target.height() as i64;
    let (ox, oy) = (at.x as i64, at.y as i64);

    let x_start = ox.max(0);
    let y_start = oy.max(0);
    let x_end = (ox + layer.width() as i64).min(target_w);
    let y_end = (oy + layer.height() as i64).min(target_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let fg = *layer.get_pixel((tx - ox) as u32, (ty - oy) as u32);
            let bg = target.get_pixel_mut(tx as u32, ty as u32);
            *bg = blend_pixels(*bg, fg);
        }
    }
}

/// Porter-Duff "over": `top` composited onto `bottom`.
pub fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
