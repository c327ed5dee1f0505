//! Image sources and the file descriptor handed to the geometry engine.
//!
//! An [`ImageSource`] says where pixels come from. Paths are decoded by the
//! backend directly; URLs are fetched once into memory and base64 payloads
//! are decoded up front, so everything that is not a path reaches the
//! backend as raw bytes.
//!
//! [`ImageFile`] is the read-only descriptor the session keeps for the
//! source and for each result: format, MIME type, optional path and the
//! current [`Dimension`].

use super::backend::BackendError;
use super::dimension::Dimension;
use base64::Engine;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for fetching a remote source.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a session's source image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    /// `http://` or `https://` URL, fetched once without retry.
    Url(String),
    Bytes(Vec<u8>),
    /// Base64 text, optionally wrapped in a `data:<mime>;base64,` prefix.
    Base64(String),
}

impl ImageSource {
    /// Classify a CLI-style argument: URLs by scheme, data URLs as base64,
    /// everything else as a path.
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            ImageSource::Url(arg.to_string())
        } else if arg.starts_with("data:") {
            ImageSource::Base64(arg.to_string())
        } else {
            ImageSource::Path(PathBuf::from(arg))
        }
    }

    /// Raw bytes of the source. Paths are read from disk, URLs fetched and
    /// base64 decoded.
    pub fn into_bytes(self) -> Result<Vec<u8>, BackendError> {
        match self {
            ImageSource::Path(path) => std::fs::read(&path)
                .map_err(|_| BackendError::SourceNotFound(path.display().to_string())),
            ImageSource::Url(url) => fetch_url(&url),
            ImageSource::Bytes(bytes) => Ok(bytes),
            ImageSource::Base64(text) => decode_base64(&text),
        }
    }
}

fn fetch_url(url: &str) -> Result<Vec<u8>, BackendError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| BackendError::SourceNotFound(format!("{url}: {e}")))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| BackendError::SourceNotFound(format!("{url}: {e}")))?;

    let bytes = response
        .bytes()
        .map_err(|e| BackendError::SourceNotFound(format!("{url}: {e}")))?;
    tracing::debug!(url, len = bytes.len(), "fetched remote source");
    Ok(bytes.to_vec())
}

/// Decode base64 text, accepting both `data:` URLs and bare payloads.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, BackendError> {
    let payload = match text.find(',') {
        Some(idx) if text.starts_with("data:") => &text[idx + 1..],
        _ => text,
    };
    let compact: String = payload.split_whitespace().collect();

    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| BackendError::InvalidEncoding(format!("base64 decode failed: {e}")))
}

/// Descriptor of an image: where it lives, what it is and how big it is.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub path: Option<PathBuf>,
    pub format: ImageFormat,
    pub dimension: Dimension,
}

impl ImageFile {
    /// Read format and size from the file header without decoding pixels.
    pub fn probe(path: &Path) -> Result<Self, BackendError> {
        let reader = ImageReader::open(path)
            .map_err(|_| BackendError::SourceNotFound(path.display().to_string()))?
            .with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            BackendError::InvalidEncoding(format!("unrecognized image format: {}", path.display()))
        })?;
        let (width, height) = reader.into_dimensions().map_err(|e| BackendError::Operation {
            backend: "probe".to_string(),
            code: "decode",
            message: format!("{}: {e}", path.display()),
        })?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            format,
            dimension: Dimension::new(width, height),
        })
    }

    /// Same as [`probe`](Self::probe) for an in-memory payload.
    pub fn probe_bytes(bytes: &[u8]) -> Result<Self, BackendError> {
        let format = image::guess_format(bytes)
            .map_err(|_| BackendError::InvalidEncoding("unrecognized image format".to_string()))?;
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| BackendError::InvalidEncoding(e.to_string()))?;

        Ok(Self {
            path: None,
            format,
            dimension: Dimension::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.dimension.width()
    }

    pub fn height(&self) -> u32 {
        self.dimension.height()
    }

    /// Canonical MIME type of the format, e.g. `image/jpeg`.
    pub fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// File name of the path, or `image.<ext>` for in-memory sources.
    pub fn basename(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("image.{}", self.extension()))
    }

    /// Preferred file extension of the format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }

    /// Same file with a new size, e.g. after a resize.
    pub fn with_dimension(&self, dimension: Dimension) -> Self {
        Self {
            dimension,
            ..self.clone()
        }
    }

    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..self.clone()
        }
    }
}
