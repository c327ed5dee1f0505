//! Manipulation session: one source image, one evolving result.
//!
//! A [`Manipulation`] owns the decoded source and, once something has
//! changed it, a separate resampled image. Until the first edit the result
//! *is* the source; there is no copy.
//!
//! | Step | Reads | Result |
//! |---|---|---|
//! | [`resize`](Manipulation::resize) | source | replaces the result |
//! | [`scale`](Manipulation::scale) | source | replaces the result |
//! | [`rotate`](Manipulation::rotate) | current result | new result |
//! | [`flip`](Manipulation::flip) | current result | new result |
//! | [`watermark`](Manipulation::watermark) | current result | forked copy with the mark composited |
//!
//! Every step computes its output completely before committing it, so a
//! failing backend call leaves the session exactly as it was. Decoded
//! buffers are released when the session is dropped.

use super::backend::{BackendError, ImageBackend, select_backend};
use super::calculations::{overlay_auto_scale, plan_resize, resize_target};
use super::dimension::Dimension;
use super::params::{FlipAxis, Quality};
use super::source::{ImageFile, ImageSource};
use super::watermark::{Mark, Watermark};
use crate::config::ManipulationConfig;
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info};

/// Result image plus its descriptor.
struct Resampled {
    image: DynamicImage,
    file: ImageFile,
}

/// Encoded output ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displayed {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

pub struct Manipulation {
    config: ManipulationConfig,
    backend: Box<dyn ImageBackend>,
    source_file: ImageFile,
    source: DynamicImage,
    /// `None` while the result still aliases the source.
    resample: Option<Resampled>,
}

impl Manipulation {
    /// Open `source` with the backend named in `config`.
    pub fn open(config: &ManipulationConfig, source: ImageSource) -> Result<Self, BackendError> {
        let backend = select_backend(&config.backend, config)?;
        Self::with_backend(config, backend, source)
    }

    /// Open `source` with an already constructed backend.
    pub fn with_backend(
        config: &ManipulationConfig,
        backend: Box<dyn ImageBackend>,
        source: ImageSource,
    ) -> Result<Self, BackendError> {
        let (file, image) = match source {
            ImageSource::Path(path) => {
                let file = ImageFile::probe(&path)?;
                let image = backend.load_path(&path)?;
                (file, image)
            }
            other => {
                let bytes = other.into_bytes()?;
                let file = ImageFile::probe_bytes(&bytes)?;
                let image = backend.load_bytes(&bytes)?;
                (file, image)
            }
        };

        let dimension = Dimension::new(image.width(), image.height())
            .with_maintain_aspect_ratio(config.maintain_aspect_ratio);
        info!(
            backend = backend.name(),
            source = %file.basename(),
            size = %dimension,
            "opened image"
        );

        Ok(Self {
            config: config.clone(),
            backend,
            source_file: file.with_dimension(dimension),
            source: image,
            resample: None,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn config(&self) -> &ManipulationConfig {
        &self.config
    }

    pub fn source_file(&self) -> &ImageFile {
        &self.source_file
    }

    /// Descriptor of the current result. Same as the source until the first edit.
    pub fn resample_file(&self) -> &ImageFile {
        match &self.resample {
            Some(r) => &r.file,
            None => &self.source_file,
        }
    }

    /// Whether an edit has produced an image separate from the source.
    pub fn is_forked(&self) -> bool {
        self.resample.is_some()
    }

    /// The current result image.
    pub fn image(&self) -> &DynamicImage {
        match &self.resample {
            Some(r) => &r.image,
            None => &self.source,
        }
    }

    fn commit(&mut self, image: DynamicImage, dimension: Dimension) {
        if self.resample.is_none() {
            debug!("result forked from source");
        }
        let file = self.source_file.with_dimension(dimension);
        self.resample = Some(Resampled { image, file });
    }

    /// Size of `image` carrying the current result's focus and clamp policy.
    fn dimension_of(&self, image: &DynamicImage) -> Dimension {
        Dimension::new(image.width(), image.height())
            .with_focus(self.resample_file().dimension.focus())
            .with_maintain_aspect_ratio(self.config.maintain_aspect_ratio)
    }

    /// Cover-fit the source into `width × height`, then crop.
    ///
    /// Equal edges crop a centered square. Otherwise the configured
    /// orientation and focus decide the crop anchor.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<&mut Self, BackendError> {
        let source = &self.source_file.dimension;
        let target = resize_target(
            source,
            width,
            height,
            self.config.orientation,
            self.config.focus,
        );

        let plan = plan_resize(source, &target);
        debug!(
            window = %plan.window,
            scale = %format!("{}x{}", plan.scale_width, plan.scale_height),
            crop = %plan.crop,
            filter = ?plan.filter,
            "resize plan"
        );

        let image = self.backend.resize(&self.source, &plan)?;
        let dimension = Dimension::new(image.width(), image.height())
            .with_orientation(target.orientation())
            .with_focus(target.focus())
            .with_maintain_aspect_ratio(self.config.maintain_aspect_ratio);
        info!(requested = %format!("{width}x{height}"), result = %dimension, "resized");
        self.commit(image, dimension);
        Ok(self)
    }

    /// Proportionally scale the source by `percent`. No crop.
    pub fn scale(&mut self, percent: u32) -> Result<&mut Self, BackendError> {
        let target = self.source_file.dimension.with_scale(percent);
        let image = self.backend.scale(&self.source, &target)?;
        let dimension = self.dimension_of(&image);
        info!(percent, result = %dimension, "scaled");
        self.commit(image, dimension);
        Ok(self)
    }

    /// Rotate the current result clockwise by `degrees`.
    pub fn rotate(&mut self, degrees: i32) -> Result<&mut Self, BackendError> {
        let image = self.backend.rotate(self.image(), degrees)?;
        let dimension = self.dimension_of(&image);
        info!(degrees, result = %dimension, "rotated");
        self.commit(image, dimension);
        Ok(self)
    }

    pub fn flip(&mut self, axis: FlipAxis) -> Result<&mut Self, BackendError> {
        let image = self.backend.flip(self.image(), axis)?;
        let dimension = self.dimension_of(&image);
        info!(?axis, "flipped");
        self.commit(image, dimension);
        Ok(self)
    }

    /// Composite a text or overlay mark onto the current result.
    pub fn watermark(&mut self, watermark: &Watermark) -> Result<&mut Self, BackendError> {
        let canvas_size = (self.image().width(), self.image().height());

        let mark = match &watermark.mark {
            Mark::Text(text) => DynamicImage::ImageRgba8(self.backend.render_text(text)?),
            Mark::Overlay(overlay) => {
                let image = self.backend.load_path(&overlay.path)?;
                let size = (image.width(), image.height());
                let percent = overlay
                    .scale
                    .unwrap_or_else(|| overlay_auto_scale(canvas_size, size));
                let scaled = Dimension::new(size.0, size.1)
                    .with_maintain_aspect_ratio(false)
                    .with_scale(percent);
                debug!(percent, overlay = %scaled, "overlay scale");
                if scaled.size() == size {
                    image
                } else {
                    self.backend.scale(&image, &scaled)?
                }
            }
        };

        let at = watermark.place(canvas_size, (mark.width(), mark.height()));
        debug!(position = %watermark.position, x = at.x, y = at.y, "watermark placement");

        let mut canvas = self.image().clone();
        self.backend.composite(&mut canvas, &mark, at)?;
        let dimension = self.dimension_of(&canvas);
        info!(position = %watermark.position, "watermarked");
        self.commit(canvas, dimension);
        Ok(self)
    }

    /// Encoded result in the source's format.
    pub fn blob(&self, quality: Quality) -> Result<Vec<u8>, BackendError> {
        self.backend
            .encode(self.image(), self.source_file.format, quality)
    }

    /// Encoded result at the configured quality, plus its MIME type.
    pub fn display(&self) -> Result<Displayed, BackendError> {
        Ok(Displayed {
            bytes: self.blob(self.config.quality())?,
            mime: self.source_file.mime(),
        })
    }

    /// Encode and write the result to `path`, keeping the source's format.
    ///
    /// Nothing is written if encoding fails.
    pub fn save(&mut self, path: &Path, quality: Quality) -> Result<ImageFile, BackendError> {
        self.backend
            .save(self.image(), path, self.source_file.format, quality)?;
        let saved = self.resample_file().with_path(path);
        if let Some(r) = &mut self.resample {
            r.file = saved.clone();
        }
        info!(path = %path.display(), quality = quality.value(), "saved");
        Ok(saved)
    }
}
