//! Watermark descriptions and text rasterization.
//!
//! A [`Watermark`] pairs a [`Mark`] (rendered text or an overlay image)
//! with the placement fields every mark shares: a [`Position`] from the
//! anchor table, an edge padding and an optional explicit [`Axis`] that
//! bypasses the table altogether.
//!
//! Text marks are rasterized here with `ab_glyph` into an RGBA bitmap, so
//! backends only ever composite bitmaps. Placement arithmetic lives in
//! [`calculations::watermark_axis`](super::calculations::watermark_axis).

use super::backend::BackendError;
use super::calculations::watermark_axis;
use super::dimension::{Axis, ParseNameError};
use super::pixels::{blend_pixels, rotate_expanded};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default distance between a mark and the canvas edge, in pixels.
pub const DEFAULT_PADDING: i32 = 25;

/// Watermark anchor. `Auto` places like `Center`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    #[default]
    Auto,
    Center,
    Middle,
    MiddleMiddle,
    MiddleLeft,
    MiddleRight,
    MiddleTop,
    MiddleBottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub const ALL: [Position; 12] = [
        Position::Auto,
        Position::Center,
        Position::Middle,
        Position::MiddleMiddle,
        Position::MiddleLeft,
        Position::MiddleRight,
        Position::MiddleTop,
        Position::MiddleBottom,
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Auto => "AUTO",
            Position::Center => "CENTER",
            Position::Middle => "MIDDLE",
            Position::MiddleMiddle => "MIDDLE_MIDDLE",
            Position::MiddleLeft => "MIDDLE_LEFT",
            Position::MiddleRight => "MIDDLE_RIGHT",
            Position::MiddleTop => "MIDDLE_TOP",
            Position::MiddleBottom => "MIDDLE_BOTTOM",
            Position::TopLeft => "TOP_LEFT",
            Position::TopRight => "TOP_RIGHT",
            Position::BottomLeft => "BOTTOM_LEFT",
            Position::BottomRight => "BOTTOM_RIGHT",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = ParseNameError;

    /// Case-insensitive; `-` is accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_uppercase().replace('-', "_");
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParseNameError::new("position", s))
    }
}

/// Text mark: a string drawn with a TrueType/OpenType font.
///
/// Deserialization goes through [`Text::new`], so recipes may omit size,
/// color and angle, and the string is trimmed either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TextFields")]
pub struct Text {
    pub font_path: PathBuf,
    /// Pixel height of the rendered line.
    pub size: u32,
    /// Hex color without the leading `#`, e.g. `ffffff`.
    pub color: String,
    /// Clockwise rotation of the rendered text, in degrees.
    pub angle: f32,
    pub string: String,
}

const DEFAULT_TEXT_SIZE: u32 = 25;
const DEFAULT_TEXT_COLOR: &str = "ffffff";

#[derive(Deserialize)]
struct TextFields {
    font_path: PathBuf,
    #[serde(default = "default_text_size")]
    size: u32,
    #[serde(default = "default_text_color")]
    color: String,
    #[serde(default)]
    angle: f32,
    string: String,
}

fn default_text_size() -> u32 {
    DEFAULT_TEXT_SIZE
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

impl From<TextFields> for Text {
    fn from(fields: TextFields) -> Self {
        Text::new(fields.font_path, &fields.string)
            .with_size(fields.size)
            .with_color(&fields.color)
            .with_angle(fields.angle)
    }
}

impl Text {
    pub fn new(font_path: impl Into<PathBuf>, string: &str) -> Self {
        Self {
            font_path: font_path.into(),
            size: DEFAULT_TEXT_SIZE,
            color: DEFAULT_TEXT_COLOR.to_string(),
            angle: 0.0,
            string: string.trim().to_string(),
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Accepts `ffffff` or `#ffffff`.
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.trim().trim_start_matches('#').to_ascii_lowercase();
        self
    }

    pub fn with_angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }
}

/// Image mark: another picture composited onto the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub path: PathBuf,
    /// Percentage applied to the overlay before placement. `None` picks the
    /// largest scale that keeps it within half the canvas on both edges.
    pub scale: Option<u32>,
}

impl Overlay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scale: None,
        }
    }

    pub fn with_scale(mut self, percent: u32) -> Self {
        self.scale = Some(percent);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mark {
    Text(Text),
    Overlay(Overlay),
}

/// A mark plus its placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub mark: Mark,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_padding")]
    pub padding: i32,
    /// Explicit top-left origin; overrides `position` and `padding`.
    #[serde(default)]
    pub axis: Option<Axis>,
}

fn default_padding() -> i32 {
    DEFAULT_PADDING
}

impl Watermark {
    fn from_mark(mark: Mark) -> Self {
        Self {
            mark,
            position: Position::Auto,
            padding: DEFAULT_PADDING,
            axis: None,
        }
    }

    pub fn text(text: Text) -> Self {
        Self::from_mark(Mark::Text(text))
    }

    pub fn overlay(overlay: Overlay) -> Self {
        Self::from_mark(Mark::Overlay(overlay))
    }

    /// Large centered signature: 25px white text.
    pub fn signature(font_path: impl Into<PathBuf>, string: &str) -> Self {
        Self::text(Text::new(font_path, string).with_size(25))
            .with_default_position(Position::Center)
    }

    /// Small copyright line: 8px white text in the bottom-left corner.
    pub fn copyright(font_path: impl Into<PathBuf>, string: &str) -> Self {
        Self::text(Text::new(font_path, string).with_size(8))
            .with_default_position(Position::BottomLeft)
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets `position` only while it is still [`Position::Auto`].
    pub fn with_default_position(mut self, position: Position) -> Self {
        if self.position == Position::Auto {
            self.position = position;
        }
        self
    }

    /// Lenient variant of [`with_position`](Self::with_position):
    /// an unknown name leaves the position unchanged.
    pub fn with_position_named(self, name: &str) -> Self {
        match name.parse() {
            Ok(position) => self.with_position(position),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring watermark position");
                self
            }
        }
    }

    pub fn with_padding(mut self, padding: i32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Top-left origin of a `content`-sized mark on a `canvas`-sized image.
    pub fn place(&self, canvas: (u32, u32), content: (u32, u32)) -> Axis {
        self.axis
            .unwrap_or_else(|| watermark_axis(self.position, canvas, content, self.padding))
    }
}

/// Parse `rrggbb` or `rrggbbaa`, with or without a leading `#`.
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() || !matches!(hex.len(), 6 | 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Rasterize a text mark onto a transparent bitmap sized to the line.
pub fn render_text(text: &Text) -> Result<RgbaImage, BackendError> {
    let render_err = |message: String| BackendError::Operation {
        backend: "text".to_string(),
        code: "render",
        message,
    };

    if text.string.is_empty() {
        return Err(render_err("watermark text is empty".to_string()));
    }
    let color = parse_hex_color(&text.color)
        .ok_or_else(|| render_err(format!("invalid font color '{}'", text.color)))?;

    let bytes = std::fs::read(&text.font_path)
        .map_err(|_| BackendError::SourceNotFound(text.font_path.display().to_string()))?;
    let font = FontVec::try_from_vec(bytes).map_err(|e| {
        render_err(format!("failed to parse font {}: {e}", text.font_path.display()))
    })?;

    let scale = PxScale::from(text.size.max(1) as f32);
    let scaled = font.as_scaled(scale);

    let mut glyphs = Vec::with_capacity(text.string.len());
    let mut caret = 0.0f32;
    let mut previous = None;
    for c in text.string.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        glyphs.push(id.with_scale_and_position(scale, point(caret, scaled.ascent())));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    let width = (caret.ceil() as u32).max(1);
    let height = (scaled.height().ceil() as u32).max(1);
    let mut canvas = RgbaImage::new(width, height);

    for glyph in glyphs {
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            *pixel = blend_pixels(*pixel, Rgba([color[0], color[1], color[2], alpha]));
        });
    }

    tracing::debug!(width, height, string = %text.string, "rendered text mark");

    if text.angle.rem_euclid(360.0) == 0.0 {
        Ok(canvas)
    } else {
        Ok(rotate_expanded(&canvas, text.angle, Rgba([0, 0, 0, 0])))
    }
}
