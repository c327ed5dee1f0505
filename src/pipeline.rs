//! Step lists and the cache-aware file processor.
//!
//! A [`Step`] is one serializable session call. The CLI builds a single
//! step per invocation; library users can chain as many as they like and
//! run them with [`apply`] or [`process_file`].
//!
//! ```text
//! source ──► Manipulation::open ──► apply(steps) ──► save(output)
//!    │                                                   ▲
//!    └── cache = true: sha256(source) + sha256(recipe) ──┘ hit: reuse or copy
//! ```

use crate::cache::{self, CacheManifest, CacheOutcome};
use crate::config::ManipulationConfig;
use crate::imaging::{BackendError, FlipAxis, ImageFile, ImageSource, Manipulation, Watermark};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Output path has no file name: {0}")]
    InvalidOutput(PathBuf),
}

/// One session operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    Resize { width: u32, height: u32 },
    Scale { percent: u32 },
    Rotate { degrees: i32 },
    Flip { axis: FlipAxis },
    Watermark(Watermark),
}

/// Run `steps` in order against `session`, stopping at the first failure.
pub fn apply(session: &mut Manipulation, steps: &[Step]) -> Result<(), BackendError> {
    for step in steps {
        match step {
            Step::Resize { width, height } => session.resize(*width, *height)?,
            Step::Scale { percent } => session.scale(*percent)?,
            Step::Rotate { degrees } => session.rotate(*degrees)?,
            Step::Flip { axis } => session.flip(*axis)?,
            Step::Watermark(watermark) => session.watermark(watermark)?,
        };
    }
    Ok(())
}

/// What [`process_file`] produced.
#[derive(Debug, Clone)]
pub struct Processed {
    pub outcome: CacheOutcome,
    pub file: ImageFile,
}

/// Everything that influences the output bytes besides the source.
#[derive(Serialize)]
struct Recipe<'a> {
    config: &'a ManipulationConfig,
    steps: &'a [Step],
}

/// Open `source`, apply `steps` and save the result to `output`.
///
/// With `config.cache` set, an identical earlier output (same source bytes,
/// same recipe) is reused in place or copied to `output` instead of being
/// re-encoded. The manifest lives in `output`'s directory.
pub fn process_file(
    config: &ManipulationConfig,
    source: ImageSource,
    output: &Path,
    steps: &[Step],
) -> Result<Processed, PipelineError> {
    let output_dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&output_dir)?;

    if !config.cache {
        let file = run(config, source, output, steps)?;
        return Ok(Processed {
            outcome: CacheOutcome::Encoded,
            file,
        });
    }

    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::InvalidOutput(output.to_path_buf()))?;
    let bytes = source.into_bytes()?;
    let source_hash = cache::hash_bytes(&bytes);
    let params_hash = cache::hash_params(&Recipe { config, steps })?;

    let mut manifest = CacheManifest::load(&output_dir);
    let outcome = match manifest.find_cached(&source_hash, &params_hash, &output_dir) {
        Some(stored) if stored == name => CacheOutcome::Hit,
        Some(stored) => {
            std::fs::copy(output_dir.join(&stored), output)?;
            CacheOutcome::Copied
        }
        None => {
            run(config, ImageSource::Bytes(bytes), output, steps)?;
            CacheOutcome::Encoded
        }
    };

    if outcome != CacheOutcome::Hit {
        manifest.insert(name, source_hash, params_hash);
        manifest.save(&output_dir)?;
    }
    info!(output = %output.display(), %outcome, "processed");

    Ok(Processed {
        outcome,
        file: ImageFile::probe(output)?,
    })
}

fn run(
    config: &ManipulationConfig,
    source: ImageSource,
    output: &Path,
    steps: &[Step],
) -> Result<ImageFile, BackendError> {
    let mut session = Manipulation::open(config, source)?;
    apply(&mut session, steps)?;
    session.save(output, config.quality())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{Position, Text};
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 64]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, png_bytes(width, height)).unwrap();
        path
    }

    fn cached_config() -> ManipulationConfig {
        ManipulationConfig {
            cache: true,
            ..ManipulationConfig::default()
        }
    }

    // =========================================================================
    // Step decoding and application
    // =========================================================================

    #[test]
    fn steps_decode_from_tagged_json() {
        let json = r#"[
            {"op": "resize", "width": 200, "height": 100},
            {"op": "flip", "axis": "both"},
            {"op": "watermark", "mark": {"kind": "overlay", "path": "logo.png"}, "position": "TOP_RIGHT"}
        ]"#;
        let steps: Vec<Step> = serde_json::from_str(json).unwrap();

        assert_eq!(steps[0], Step::Resize { width: 200, height: 100 });
        assert_eq!(steps[1], Step::Flip { axis: FlipAxis::Both });
        match &steps[2] {
            Step::Watermark(w) => {
                assert_eq!(w.position, Position::TopRight);
                assert_eq!(w.padding, 25);
            }
            other => panic!("expected watermark, got {other:?}"),
        }
    }

    #[test]
    fn apply_runs_steps_in_order() {
        let backend = MockBackend::new(100, 100);
        let log = backend.log();
        let mut session = Manipulation::with_backend(
            &ManipulationConfig::default(),
            Box::new(backend),
            ImageSource::Bytes(png_bytes(4, 4)),
        )
        .unwrap();

        apply(
            &mut session,
            &[
                Step::Rotate { degrees: 90 },
                Step::Flip { axis: FlipAxis::Vertical },
            ],
        )
        .unwrap();

        let ops = log.lock().unwrap().clone();
        assert_eq!(
            &ops[1..],
            &[RecordedOp::Rotate(90), RecordedOp::FlipVertical]
        );
    }

    #[test]
    fn apply_stops_at_first_failure() {
        let backend = MockBackend::new(100, 100);
        let log = backend.log();
        let mut session = Manipulation::with_backend(
            &ManipulationConfig::default(),
            Box::new(backend),
            ImageSource::Bytes(png_bytes(4, 4)),
        )
        .unwrap();

        let missing_font = Watermark::text(Text::new("/nonexistent/font.ttf", "x"));
        let result = apply(
            &mut session,
            &[
                Step::Watermark(missing_font),
                Step::Rotate { degrees: 90 },
            ],
        );

        assert!(matches!(result, Err(BackendError::SourceNotFound(_))));
        assert!(!log.lock().unwrap().contains(&RecordedOp::Rotate(90)));
        assert!(!session.is_forked());
    }

    // =========================================================================
    // process_file
    // =========================================================================

    #[test]
    fn process_without_cache_always_encodes() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "src.png", 60, 40);
        let out = tmp.path().join("out/thumb.png");
        let steps = [Step::Resize { width: 20, height: 20 }];
        let config = ManipulationConfig::default();

        for _ in 0..2 {
            let done = process_file(&config, ImageSource::Path(src.clone()), &out, &steps).unwrap();
            assert_eq!(done.outcome, CacheOutcome::Encoded);
            assert_eq!((done.file.width(), done.file.height()), (20, 20));
        }
        assert!(!cache::manifest_path(&tmp.path().join("out")).exists());
    }

    #[test]
    fn process_reuses_identical_output() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "src.png", 60, 40);
        let out = tmp.path().join("scaled.png");
        let steps = [Step::Scale { percent: 50 }];
        let config = cached_config();

        let first = process_file(&config, ImageSource::Path(src.clone()), &out, &steps).unwrap();
        assert_eq!(first.outcome, CacheOutcome::Encoded);
        assert_eq!((first.file.width(), first.file.height()), (30, 20));

        let second = process_file(&config, ImageSource::Path(src), &out, &steps).unwrap();
        assert_eq!(second.outcome, CacheOutcome::Hit);
        assert_eq!((second.file.width(), second.file.height()), (30, 20));
    }

    #[test]
    fn process_copies_cached_output_to_new_name() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "src.png", 50, 50);
        let steps = [Step::Rotate { degrees: 90 }];
        let config = cached_config();

        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        process_file(&config, ImageSource::Path(src.clone()), &a, &steps).unwrap();
        let copied = process_file(&config, ImageSource::Path(src), &b, &steps).unwrap();

        assert_eq!(copied.outcome, CacheOutcome::Copied);
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn changed_recipe_misses_cache() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "src.png", 40, 40);
        let out = tmp.path().join("out.png");
        let config = cached_config();

        process_file(&config, ImageSource::Path(src.clone()), &out, &[Step::Scale { percent: 50 }])
            .unwrap();
        let other_quality = ManipulationConfig {
            quality: 80,
            ..cached_config()
        };
        let again = process_file(
            &other_quality,
            ImageSource::Path(src),
            &out,
            &[Step::Scale { percent: 50 }],
        )
        .unwrap();
        assert_eq!(again.outcome, CacheOutcome::Encoded);
    }

    #[test]
    fn missing_source_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = process_file(
            &cached_config(),
            ImageSource::Path(tmp.path().join("nope.png")),
            &tmp.path().join("out.png"),
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Imaging(BackendError::SourceNotFound(_))
        ));
    }
}
