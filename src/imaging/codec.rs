//! Decoding and format-preserving encoding shared by all backends.
//!
//! Decoding sniffs the format from content, never from the file name.
//! Output always uses the source's format. Quality reaches the encoder as
//! follows:
//!
//! | Format | Quality handling |
//! |---|---|
//! | JPEG | Passed straight through (`0` is raised to `1`) |
//! | PNG | `< 34` fast, `< 67` default, otherwise best compression |
//! | GIF, BMP, TIFF, WebP, PNM | Ignored: lossless or fixed encoders |

use super::backend::BackendError;
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Decode an image file. An unreadable path is [`BackendError::SourceNotFound`].
pub fn decode_path(backend: &str, path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path)
        .map_err(|_| BackendError::SourceNotFound(path.display().to_string()))?
        .with_guessed_format()?;
    if reader.format().is_none() {
        return Err(BackendError::operation(
            backend,
            "decode",
            format!("unrecognized image format: {}", path.display()),
        ));
    }
    reader
        .decode()
        .map_err(|e| BackendError::operation(backend, "decode", format!("{}: {e}", path.display())))
}

/// Decode an in-memory payload. Bytes that are not an image at all are
/// [`BackendError::InvalidEncoding`]; a recognized but broken image is a
/// `decode` failure.
pub fn decode_bytes(backend: &str, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(BackendError::InvalidEncoding(
            "unrecognized image format".to_string(),
        ));
    }
    reader
        .decode()
        .map_err(|e| BackendError::operation(backend, "decode", e))
}

/// Encode `image` as `format`. `backend` only labels errors.
pub fn encode(
    backend: &str,
    image: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut out = Cursor::new(Vec::new());
    let encode_err = |e: image::ImageError| BackendError::operation(backend, "encode", e);

    match format {
        ImageFormat::Jpeg => {
            let q = quality.value().clamp(1, 100) as u8;
            let encoder = JpegEncoder::new_with_quality(&mut out, q);
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(encode_err)?;
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut out,
                png_compression(quality),
                PngFilter::Adaptive,
            );
            image.write_with_encoder(encoder).map_err(encode_err)?;
        }
        ImageFormat::Pnm => {
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut out, format)
                .map_err(encode_err)?;
        }
        other => {
            DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut out, other)
                .map_err(encode_err)?;
        }
    }

    let bytes = out.into_inner();
    tracing::debug!(backend, ?format, quality = quality.value(), len = bytes.len(), "encoded");
    Ok(bytes)
}

fn png_compression(quality: Quality) -> CompressionType {
    match quality.value() {
        0..34 => CompressionType::Fast,
        34..67 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, 64])
        }))
    }

    #[test]
    fn jpeg_keeps_format_and_size() {
        let bytes = encode("test", &gradient(32, 24), ImageFormat::Jpeg, Quality::new(80)).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 24));
    }

    #[test]
    fn jpeg_lower_quality_is_smaller() {
        let img = gradient(64, 64);
        let high = encode("test", &img, ImageFormat::Jpeg, Quality::new(95)).unwrap();
        let low = encode("test", &img, ImageFormat::Jpeg, Quality::new(10)).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn jpeg_quality_zero_still_encodes() {
        assert!(encode("test", &gradient(8, 8), ImageFormat::Jpeg, Quality::new(0)).is_ok());
    }

    #[test]
    fn png_is_lossless_at_any_quality() {
        let img = gradient(16, 16);
        for q in [0, 50, 100] {
            let bytes = encode("test", &img, ImageFormat::Png, Quality::new(q)).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.to_rgb8(), img.to_rgb8());
        }
    }

    #[test]
    fn png_compression_bands() {
        assert!(matches!(png_compression(Quality::new(0)), CompressionType::Fast));
        assert!(matches!(png_compression(Quality::new(50)), CompressionType::Default));
        assert!(matches!(png_compression(Quality::new(67)), CompressionType::Best));
    }

    #[test]
    fn other_formats_round_trip() {
        for format in [ImageFormat::Bmp, ImageFormat::Gif, ImageFormat::Tiff, ImageFormat::Pnm] {
            let bytes = encode("test", &gradient(10, 6), format, Quality::default()).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), format, "{format:?}");
        }
    }

    #[test]
    fn decode_bytes_rejects_non_images() {
        let err = decode_bytes("test", b"plain text, no magic").unwrap_err();
        assert!(matches!(err, BackendError::InvalidEncoding(_)));
    }

    #[test]
    fn decode_bytes_truncated_image_is_decode_error() {
        let bytes = encode("test", &gradient(32, 32), ImageFormat::Png, Quality::default()).unwrap();
        let err = decode_bytes("test", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, BackendError::Operation { code: "decode", .. }));
    }

    #[test]
    fn decode_path_missing_file_is_source_not_found() {
        let err = decode_path("test", Path::new("/nonexistent/a.png")).unwrap_err();
        assert!(matches!(err, BackendError::SourceNotFound(_)));
    }

    #[test]
    fn decode_path_ignores_misleading_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually_png.jpg");
        let bytes = encode("test", &gradient(6, 4), ImageFormat::Png, Quality::default()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(decode_path("test", &path).unwrap().dimensions(), (6, 4));
    }

    #[test]
    fn unsupported_format_is_encode_error() {
        let err = encode("test", &gradient(4, 4), ImageFormat::Avif, Quality::default()).unwrap_err();
        assert!(matches!(err, BackendError::Operation { code: "encode", .. }));
    }
}
