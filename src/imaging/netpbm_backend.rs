//! Placeholder for a netpbm command-line backend.
//!
//! The name is registered so configs that select it load, but every
//! operation fails with [`BackendError::NotImplemented`]. Nothing is ever
//! silently skipped.

use super::backend::{BackendError, ImageBackend};
use super::dimension::{Axis, Dimension};
use super::params::{Quality, ResampleFilter};
use super::watermark::Text;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

const NAME: &str = "netpbm";

pub struct NetpbmBackend;

fn unsupported<T>(capability: &'static str) -> Result<T, BackendError> {
    Err(BackendError::NotImplemented {
        backend: NAME.to_string(),
        capability,
    })
}

impl ImageBackend for NetpbmBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load_path(&self, _path: &Path) -> Result<DynamicImage, BackendError> {
        unsupported("load")
    }

    fn load_bytes(&self, _bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        unsupported("load")
    }

    fn rotate(&self, _image: &DynamicImage, _degrees: i32) -> Result<DynamicImage, BackendError> {
        unsupported("rotate")
    }

    fn flip_horizontal(&self, _image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        unsupported("flip")
    }

    fn flip_vertical(&self, _image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        unsupported("flip")
    }

    fn resample(
        &self,
        _image: &DynamicImage,
        _width: u32,
        _height: u32,
        _filter: ResampleFilter,
    ) -> Result<DynamicImage, BackendError> {
        unsupported("resample")
    }

    fn crop(&self, _image: &DynamicImage, _region: &Dimension) -> Result<DynamicImage, BackendError> {
        unsupported("crop")
    }

    fn composite(
        &self,
        _canvas: &mut DynamicImage,
        _overlay: &DynamicImage,
        _at: Axis,
    ) -> Result<(), BackendError> {
        unsupported("composite")
    }

    fn render_text(&self, _text: &Text) -> Result<RgbaImage, BackendError> {
        unsupported("text rendering")
    }

    fn encode(
        &self,
        _image: &DynamicImage,
        _format: ImageFormat,
        _quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        unsupported("encode")
    }
}
