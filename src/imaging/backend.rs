//! Image processing backend trait, error taxonomy and registry.
//!
//! The [`ImageBackend`] trait is the narrow contract the session drives.
//! Every geometric decision is made beforehand by
//! [`calculations`](super::calculations); backends receive finished
//! [`ResizePlan`]s, crop regions and overlay origins and only translate
//! them into pixel calls.
//!
//! ## Registered backends
//!
//! | Name | Implementation | Notes |
//! |---|---|---|
//! | `raster` (alias `gd`) | [`RasterBackend`](super::rust_backend::RasterBackend) | `image::imageops` throughout. Default. |
//! | `fast` | [`FastBackend`](super::fast_backend::FastBackend) | `fast_image_resize` convolution, manual alpha blending |
//! | `netpbm` | [`NetpbmBackend`](super::netpbm_backend::NetpbmBackend) | Registered but unimplemented; every call fails |
//!
//! Unknown names fail with [`BackendError::UnsupportedBackend`].

use super::codec;
use super::dimension::{Axis, Dimension};
use super::fast_backend::FastBackend;
use super::netpbm_backend::NetpbmBackend;
use super::params::{FlipAxis, Quality, ResampleFilter, ResizePlan};
use super::rust_backend::RasterBackend;
use super::watermark::{self, Text};
use crate::config::ManipulationConfig;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source not found: {0}")]
    SourceNotFound(String),
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("unsupported backend '{0}'")]
    UnsupportedBackend(String),
    /// A backend-native failure. `code` is one of `decode`, `encode`,
    /// `write`, `resample`, `crop`, `composite` or `render`.
    #[error("{backend} {code} failed: {message}")]
    Operation {
        backend: String,
        code: &'static str,
        message: String,
    },
    #[error("{backend} backend does not implement {capability}")]
    NotImplemented {
        backend: String,
        capability: &'static str,
    },
}

impl BackendError {
    pub(crate) fn operation(backend: &str, code: &'static str, message: impl fmt::Display) -> Self {
        BackendError::Operation {
            backend: backend.to_string(),
            code,
            message: message.to_string(),
        }
    }
}

/// Trait for image processing backends.
///
/// Images are passed by reference and results returned as new values, so a
/// failed call never leaves a half-processed image behind. Only
/// [`composite`](Self::composite) works in place, on a canvas the caller
/// already owns.
pub trait ImageBackend: Sync {
    /// Registry name, used in logs and error messages.
    fn name(&self) -> &'static str;

    fn load_path(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    fn load_bytes(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Rotate clockwise by `degrees`. Multiples of 90 are lossless; other
    /// angles grow the canvas and fill the corners.
    fn rotate(&self, image: &DynamicImage, degrees: i32) -> Result<DynamicImage, BackendError>;

    fn flip_horizontal(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError>;

    fn flip_vertical(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError>;

    /// Mirror along `axis`. `Both` is horizontal then vertical.
    fn flip(&self, image: &DynamicImage, axis: FlipAxis) -> Result<DynamicImage, BackendError> {
        match axis {
            FlipAxis::Horizontal => self.flip_horizontal(image),
            FlipAxis::Vertical => self.flip_vertical(image),
            FlipAxis::Both => {
                let mirrored = self.flip_horizontal(image)?;
                self.flip_vertical(&mirrored)
            }
        }
    }

    /// Resample to exactly `width × height`.
    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<DynamicImage, BackendError>;

    /// Cut `region` (size plus top-left axis) out of `image`.
    fn crop(&self, image: &DynamicImage, region: &Dimension) -> Result<DynamicImage, BackendError>;

    /// Execute a cover-fit resize plan: window, resample, crop.
    fn resize(&self, image: &DynamicImage, plan: &ResizePlan) -> Result<DynamicImage, BackendError> {
        let windowed;
        let source = if plan.reframes(image.width(), image.height()) {
            windowed = self.crop(image, &plan.window)?;
            &windowed
        } else {
            image
        };
        let scaled = self.resample(source, plan.scale_width, plan.scale_height, plan.filter)?;
        if scaled.width() == plan.crop.width()
            && scaled.height() == plan.crop.height()
            && plan.crop.axis() == Axis::ORIGIN
        {
            return Ok(scaled);
        }
        self.crop(&scaled, &plan.crop)
    }

    /// Proportional scale to the size of `target`. No crop.
    fn scale(&self, image: &DynamicImage, target: &Dimension) -> Result<DynamicImage, BackendError> {
        self.resample(
            image,
            target.width(),
            target.height(),
            ResampleFilter::Lanczos3,
        )
    }

    /// Blend `overlay` onto `canvas` with its top-left at `at`. Parts that
    /// fall outside the canvas are clipped.
    fn composite(
        &self,
        canvas: &mut DynamicImage,
        overlay: &DynamicImage,
        at: Axis,
    ) -> Result<(), BackendError>;

    /// Rasterize a text mark.
    fn render_text(&self, text: &Text) -> Result<RgbaImage, BackendError> {
        watermark::render_text(text)
    }

    /// Encode in `format`. See [`codec::encode`] for how quality maps to
    /// each encoder.
    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        codec::encode(self.name(), image, format, quality)
    }

    /// Encode fully in memory, then write. A failed encode never touches `path`.
    fn save(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<(), BackendError> {
        let bytes = self.encode(image, format, quality)?;
        std::fs::write(path, bytes)
            .map_err(|e| BackendError::operation(self.name(), "write", format!("{}: {e}", path.display())))
    }
}

/// Closed registry of backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Raster,
    Fast,
    Netpbm,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Raster, BackendKind::Fast, BackendKind::Netpbm];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Raster => "raster",
            BackendKind::Fast => "fast",
            BackendKind::Netpbm => "netpbm",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" | "gd" => Ok(BackendKind::Raster),
            "fast" => Ok(BackendKind::Fast),
            "netpbm" => Ok(BackendKind::Netpbm),
            _ => Err(BackendError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Resolve `name` to a backend configured from `config`'s sub-table.
pub fn select_backend(
    name: &str,
    config: &ManipulationConfig,
) -> Result<Box<dyn ImageBackend>, BackendError> {
    let kind: BackendKind = name.parse()?;
    tracing::debug!(backend = %kind, "selected backend");
    Ok(match kind {
        BackendKind::Raster => Box::new(RasterBackend::from_config(&config.raster)),
        BackendKind::Fast => Box::new(FastBackend::from_config(&config.fast)),
        BackendKind::Netpbm => Box::new(NetpbmBackend),
    })
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::{Arc, Mutex};

    /// Shared handle to a mock's operation log, kept by tests after the
    /// backend itself has been moved into a session.
    pub type OperationLog = Arc<Mutex<Vec<RecordedOp>>>;

    /// Mock backend that records operations and returns blank images of
    /// the requested size. Uses Mutex (not RefCell) to stay Sync.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: OperationLog,
        /// Size of the image returned by `load_path`/`load_bytes`.
        pub load_size: (u32, u32),
        /// When set, every resample fails with this message.
        pub fail_resample: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Load(String),
        Rotate(i32),
        FlipHorizontal,
        FlipVertical,
        Resample {
            width: u32,
            height: u32,
            filter: ResampleFilter,
        },
        Crop {
            width: u32,
            height: u32,
            x: i32,
            y: i32,
        },
        Composite {
            width: u32,
            height: u32,
            x: i32,
            y: i32,
        },
        Encode {
            format: ImageFormat,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                load_size: (width, height),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn log(&self) -> OperationLog {
            Arc::clone(&self.operations)
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }

        fn blank(width: u32, height: u32) -> DynamicImage {
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
        }
    }

    impl ImageBackend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn load_path(&self, path: &Path) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Load(path.to_string_lossy().to_string()));
            Ok(Self::blank(self.load_size.0, self.load_size.1))
        }

        fn load_bytes(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Load(format!("{} bytes", bytes.len())));
            Ok(Self::blank(self.load_size.0, self.load_size.1))
        }

        fn rotate(&self, image: &DynamicImage, degrees: i32) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Rotate(degrees));
            Ok(if degrees.rem_euclid(180) == 90 {
                Self::blank(image.height(), image.width())
            } else {
                image.clone()
            })
        }

        fn flip_horizontal(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::FlipHorizontal);
            Ok(image.clone())
        }

        fn flip_vertical(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::FlipVertical);
            Ok(image.clone())
        }

        fn resample(
            &self,
            _image: &DynamicImage,
            width: u32,
            height: u32,
            filter: ResampleFilter,
        ) -> Result<DynamicImage, BackendError> {
            if let Some(message) = &self.fail_resample {
                return Err(BackendError::operation("mock", "resample", message));
            }
            self.record(RecordedOp::Resample {
                width,
                height,
                filter,
            });
            Ok(Self::blank(width, height))
        }

        fn crop(&self, _image: &DynamicImage, region: &Dimension) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Crop {
                width: region.width(),
                height: region.height(),
                x: region.axis().x,
                y: region.axis().y,
            });
            Ok(Self::blank(region.width(), region.height()))
        }

        fn composite(
            &self,
            _canvas: &mut DynamicImage,
            overlay: &DynamicImage,
            at: Axis,
        ) -> Result<(), BackendError> {
            self.record(RecordedOp::Composite {
                width: overlay.width(),
                height: overlay.height(),
                x: at.x,
                y: at.y,
            });
            Ok(())
        }

        fn encode(
            &self,
            image: &DynamicImage,
            format: ImageFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::Encode {
                format,
                quality: quality.value(),
            });
            codec::encode("mock", image, format, quality)
        }
    }

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("RASTER".parse::<BackendKind>().unwrap(), BackendKind::Raster);
        assert_eq!("Gd".parse::<BackendKind>().unwrap(), BackendKind::Raster);
        assert_eq!(" fast ".parse::<BackendKind>().unwrap(), BackendKind::Fast);
        assert_eq!("netpbm".parse::<BackendKind>().unwrap(), BackendKind::Netpbm);
    }

    #[test]
    fn unknown_backend_is_unsupported() {
        let err = select_backend("vips", &ManipulationConfig::default()).err().unwrap();
        assert!(matches!(err, BackendError::UnsupportedBackend(name) if name == "vips"));
    }

    #[test]
    fn every_registered_backend_is_selectable() {
        let config = ManipulationConfig::default();
        for kind in BackendKind::ALL {
            let backend = select_backend(kind.as_str(), &config).unwrap();
            assert_eq!(backend.name(), kind.as_str());
        }
    }

    #[test]
    fn flip_both_is_horizontal_then_vertical() {
        let backend = MockBackend::new(4, 4);
        let img = MockBackend::blank(4, 4);
        backend.flip(&img, FlipAxis::Both).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::FlipHorizontal, RecordedOp::FlipVertical]
        );
    }

    #[test]
    fn resize_skips_window_when_plan_covers_source() {
        let backend = MockBackend::new(1200, 800);
        let img = MockBackend::blank(1200, 800);
        let source = Dimension::new(1200, 800);
        let target = source.with_size(600, 400);
        let plan = crate::imaging::calculations::plan_resize(&source, &target);

        let out = backend.resize(&img, &plan).unwrap();
        assert_eq!((out.width(), out.height()), (600, 400));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resample {
                width: 600,
                height: 400,
                filter: ResampleFilter::Lanczos3
            }]
        );
    }

    #[test]
    fn resize_square_target_windows_then_scales() {
        let backend = MockBackend::new(1200, 800);
        let img = MockBackend::blank(1200, 800);
        let source = Dimension::new(1200, 800);
        let target = source.with_size(400, 400);
        let plan = crate::imaging::calculations::plan_resize(&source, &target);

        let out = backend.resize(&img, &plan).unwrap();
        assert_eq!((out.width(), out.height()), (400, 400));
        let ops = backend.get_operations();
        assert_eq!(
            ops[0],
            RecordedOp::Crop {
                width: 800,
                height: 800,
                x: 200,
                y: 0
            }
        );
        assert!(matches!(
            ops[1],
            RecordedOp::Resample {
                width: 400,
                height: 400,
                filter: ResampleFilter::CatmullRom
            }
        ));
        assert_eq!(ops.len(), 2);
    }
}
