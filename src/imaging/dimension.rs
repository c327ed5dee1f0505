//! Dimension and axis value types.
//!
//! A [`Dimension`] is an immutable width × height pair annotated with an
//! [`Orientation`], a [`Focus`] quadrant and an [`Axis`] offset. Every
//! `with_*` method returns a new value and leaves the receiver untouched,
//! so a source dimension can be shared freely while targets are derived
//! from it.
//!
//! ```text
//! +----+----+----+
//! | NW | N  | NE |
//! +----+----+----+
//! | W  | C  | E  |
//! +----+----+----+
//! | SW | S  | SE |
//! +----+----+----+
//! ```
//!
//! ## Derivation rules
//!
//! | Method | Result |
//! |---|---|
//! | [`with_size`](Dimension::with_size) | Clamped to the current size when `maintain_aspect_ratio`, exact otherwise |
//! | [`with_width`](Dimension::with_width) | Height = `ceil(w × height / width)` of *this* instance |
//! | [`with_height`](Dimension::with_height) | Width = `ceil(width × h / height)` of *this* instance |
//! | [`with_scale`](Dimension::with_scale) | `round(size × pct / 100)` on both edges, then `with_size` |
//!
//! Width/height derivation is always relative to the instance it is called
//! on. Chaining `with_width(..).with_height(..)` compounds rounding from the
//! intermediate value rather than from an original ratio.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an orientation, focus or position name is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseNameError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Integer pixel offset. May be negative while geometry is being computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Axis {
    pub x: i32,
    pub y: i32,
}

impl Axis {
    pub const ORIGIN: Axis = Axis { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates to zero or above, for use as a crop origin.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.max(0),
            y: self.y.max(0),
        }
    }
}

/// Shape classification of a rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Orientation {
    /// Resolved from the width/height on first read.
    #[default]
    Auto,
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Auto => "AUTO",
            Orientation::Landscape => "LANDSCAPE",
            Orientation::Portrait => "PORTRAIT",
            Orientation::Square => "SQUARE",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Orientation::Auto),
            "LANDSCAPE" => Ok(Orientation::Landscape),
            "PORTRAIT" => Ok(Orientation::Portrait),
            "SQUARE" => Ok(Orientation::Square),
            _ => Err(ParseNameError::new("orientation", s)),
        }
    }
}

/// Classify a width × height pair. Equal edges are [`Orientation::Square`].
pub fn resolve_orientation(width: u32, height: u32) -> Orientation {
    match width.cmp(&height) {
        std::cmp::Ordering::Greater => Orientation::Landscape,
        std::cmp::Ordering::Less => Orientation::Portrait,
        std::cmp::Ordering::Equal => Orientation::Square,
    }
}

/// Crop anchor quadrant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Focus {
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Focus {
    pub const ALL: [Focus; 9] = [
        Focus::Center,
        Focus::North,
        Focus::NorthEast,
        Focus::East,
        Focus::SouthEast,
        Focus::South,
        Focus::SouthWest,
        Focus::West,
        Focus::NorthWest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Focus::Center => "CENTER",
            Focus::North => "NORTH",
            Focus::NorthEast => "NORTHEAST",
            Focus::East => "EAST",
            Focus::SouthEast => "SOUTHEAST",
            Focus::South => "SOUTH",
            Focus::SouthWest => "SOUTHWEST",
            Focus::West => "WEST",
            Focus::NorthWest => "NORTHWEST",
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Focus {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Focus::ALL
            .into_iter()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| ParseNameError::new("focus", s))
    }
}

/// Immutable image geometry: size, orientation, focus and axis.
///
/// `Auto` orientation is resolved lazily from the size and memoized on the
/// instance. Derivations that change the size start with a fresh memo;
/// derivations that only touch focus or axis carry it over.
#[derive(Debug, Clone)]
pub struct Dimension {
    width: u32,
    height: u32,
    orientation: Orientation,
    resolved: OnceCell<Orientation>,
    focus: Focus,
    axis: Axis,
    /// When set, [`with_size`](Self::with_size) never grows past the current edges.
    pub maintain_aspect_ratio: bool,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            orientation: Orientation::Auto,
            resolved: OnceCell::new(),
            focus: Focus::Center,
            axis: Axis::ORIGIN,
            maintain_aspect_ratio: true,
        }
    }

    /// A dimension positioned at `(x, y)`, e.g. a crop window.
    pub fn at(width: u32, height: u32, x: i32, y: i32) -> Self {
        Self::new(width, height).with_axis(Axis::new(x, y))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Resolved orientation. Never returns [`Orientation::Auto`].
    pub fn orientation(&self) -> Orientation {
        match self.orientation {
            Orientation::Auto => *self
                .resolved
                .get_or_init(|| resolve_orientation(self.width, self.height)),
            explicit => explicit,
        }
    }

    /// Coarse `round(width / height)` classification; 0 when height is 0.
    pub fn ratio(&self) -> u32 {
        if self.height == 0 {
            return 0;
        }
        (self.width as f64 / self.height as f64).round() as u32
    }

    pub fn with_orientation(&self, orientation: Orientation) -> Self {
        Self {
            orientation,
            resolved: OnceCell::new(),
            ..self.clone()
        }
    }

    /// Lenient variant of [`with_orientation`](Self::with_orientation):
    /// an unknown name leaves the orientation unchanged.
    pub fn with_orientation_named(&self, name: &str) -> Self {
        match name.parse() {
            Ok(orientation) => self.with_orientation(orientation),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring orientation");
                self.clone()
            }
        }
    }

    pub fn with_focus(&self, focus: Focus) -> Self {
        Self {
            focus,
            ..self.clone()
        }
    }

    /// Lenient variant of [`with_focus`](Self::with_focus):
    /// an unknown name leaves the focus unchanged.
    pub fn with_focus_named(&self, name: &str) -> Self {
        match name.parse() {
            Ok(focus) => self.with_focus(focus),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring focus");
                self.clone()
            }
        }
    }

    pub fn with_axis(&self, axis: Axis) -> Self {
        Self {
            axis,
            ..self.clone()
        }
    }

    pub fn with_maintain_aspect_ratio(&self, maintain: bool) -> Self {
        Self {
            maintain_aspect_ratio: maintain,
            ..self.clone()
        }
    }

    /// New width; height follows this instance's proportions, rounded up.
    pub fn with_width(&self, width: u32) -> Self {
        let height = if self.width == 0 {
            0
        } else {
            (width as f64 * self.height as f64 / self.width as f64).ceil() as u32
        };
        self.with_size(width, height)
    }

    /// New height; width follows this instance's proportions, rounded up.
    pub fn with_height(&self, height: u32) -> Self {
        let width = if self.height == 0 {
            0
        } else {
            (self.width as f64 * height as f64 / self.height as f64).ceil() as u32
        };
        self.with_size(width, height)
    }

    pub fn with_size(&self, width: u32, height: u32) -> Self {
        let (width, height) = if self.maintain_aspect_ratio {
            (width.min(self.width), height.min(self.height))
        } else {
            (width, height)
        };
        Self {
            width,
            height,
            resolved: OnceCell::new(),
            ..self.clone()
        }
    }

    /// Scale both edges by `percent`, then apply [`with_size`](Self::with_size).
    pub fn with_scale(&self, percent: u32) -> Self {
        let factor = percent as f64 / 100.0;
        self.with_size(
            (self.width as f64 * factor).round() as u32,
            (self.height as f64 * factor).round() as u32,
        )
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.orientation() == other.orientation()
            && self.focus == other.focus
            && self.axis == other.axis
            && self.maintain_aspect_ratio == other.maintain_aspect_ratio
    }
}

impl Eq for Dimension {}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.axis != Axis::ORIGIN {
            write!(f, "+{}+{}", self.axis.x, self.axis.y)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Orientation
    // =========================================================================

    #[test]
    fn orientation_resolves_from_size() {
        assert_eq!(Dimension::new(300, 200).orientation(), Orientation::Landscape);
        assert_eq!(Dimension::new(200, 300).orientation(), Orientation::Portrait);
        assert_eq!(Dimension::new(250, 250).orientation(), Orientation::Square);
    }

    #[test]
    fn derived_orientation_does_not_touch_original() {
        let original = Dimension::new(300, 200);
        assert_eq!(original.orientation(), Orientation::Landscape);

        let derived = original.with_orientation(Orientation::Portrait);
        assert_eq!(derived.orientation(), Orientation::Portrait);
        assert_eq!(original.orientation(), Orientation::Landscape);
    }

    #[test]
    fn explicit_orientation_overrides_size() {
        let d = Dimension::new(300, 200).with_orientation(Orientation::Square);
        assert_eq!(d.orientation(), Orientation::Square);
    }

    #[test]
    fn resize_resolves_orientation_from_new_size() {
        let d = Dimension::new(300, 200).with_maintain_aspect_ratio(false);
        assert_eq!(d.orientation(), Orientation::Landscape);
        assert_eq!(d.with_size(100, 400).orientation(), Orientation::Portrait);
    }

    #[test]
    fn unknown_orientation_name_is_ignored() {
        let d = Dimension::new(10, 10).with_orientation(Orientation::Landscape);
        let same = d.with_orientation_named("DIAGONAL");
        assert_eq!(same.orientation(), Orientation::Landscape);
        let changed = d.with_orientation_named("portrait");
        assert_eq!(changed.orientation(), Orientation::Portrait);
    }

    #[test]
    fn unknown_focus_name_is_ignored() {
        let d = Dimension::new(10, 10).with_focus(Focus::North);
        assert_eq!(d.with_focus_named("UP").focus(), Focus::North);
        assert_eq!(d.with_focus_named("SOUTHWEST").focus(), Focus::SouthWest);
    }

    #[test]
    fn focus_names_round_trip_through_display() {
        for focus in Focus::ALL {
            assert_eq!(focus.to_string().parse::<Focus>().unwrap(), focus);
        }
    }

    // =========================================================================
    // Size derivation
    // =========================================================================

    #[test]
    fn with_width_rounds_height_up() {
        let d = Dimension::new(200, 100);
        let w = d.with_width(75);
        assert_eq!(w.size(), (75, 38)); // ceil(75 * 100 / 200) = ceil(37.5)
    }

    #[test]
    fn with_height_rounds_width_up() {
        let d = Dimension::new(200, 150);
        assert_eq!(d.with_height(100).size(), (134, 100)); // ceil(133.33)
    }

    #[test]
    fn chained_width_height_compounds_from_intermediate() {
        // 333x100 → with_width(100) = 100x31 (ceil 30.03)
        // then with_height(30) uses 100x31: ceil(100*30/31) = ceil(96.77) = 97
        let d = Dimension::new(333, 100);
        let chained = d.with_width(100).with_height(30);
        assert_eq!(chained.size(), (97, 30));

        // Deriving from the original would give ceil(333*30/100) = 100
        assert_eq!(d.with_height(30).size(), (100, 30));
    }

    #[test]
    fn with_size_clamps_when_maintaining_aspect_ratio() {
        let d = Dimension::new(800, 600);
        assert_eq!(d.with_size(1000, 400).size(), (800, 400));
        assert_eq!(d.with_size(400, 900).size(), (400, 600));
    }

    #[test]
    fn with_size_exact_when_not_maintaining() {
        let d = Dimension::new(800, 600).with_maintain_aspect_ratio(false);
        assert_eq!(d.with_size(1000, 400).size(), (1000, 400));
    }

    #[test]
    fn with_size_is_idempotent() {
        let d = Dimension::new(640, 480);
        let once = d.with_size(700, 300);
        let twice = once.with_size(700, 300);
        assert_eq!(once.size(), twice.size());
    }

    #[test]
    fn clamp_never_exceeds_source() {
        let sources = [(1, 1), (800, 600), (600, 800), (1920, 1080), (17, 3)];
        let targets = [(0, 0), (1, 5000), (5000, 1), (400, 400), (10_000, 10_000)];
        for (sw, sh) in sources {
            let d = Dimension::new(sw, sh);
            for (tw, th) in targets {
                let r = d.with_size(tw, th);
                assert!(r.width() <= sw && r.height() <= sh, "{sw}x{sh} -> {tw}x{th}");
            }
        }
    }

    #[test]
    fn with_scale_rounds_then_clamps() {
        let d = Dimension::new(333, 201);
        assert_eq!(d.with_scale(50).size(), (167, 101)); // 166.5 → 167, 100.5 → 101
        assert_eq!(d.with_scale(200).size(), (333, 201));

        let free = d.with_maintain_aspect_ratio(false);
        assert_eq!(free.with_scale(200).size(), (666, 402));
    }

    #[test]
    fn ratio_is_coarse() {
        assert_eq!(Dimension::new(1920, 1080).ratio(), 2);
        assert_eq!(Dimension::new(1000, 800).ratio(), 1);
        assert_eq!(Dimension::new(10, 0).ratio(), 0);
    }

    #[test]
    fn derivation_keeps_focus_and_axis() {
        let d = Dimension::at(800, 600, 5, 7).with_focus(Focus::SouthEast);
        let r = d.with_size(400, 300);
        assert_eq!(r.focus(), Focus::SouthEast);
        assert_eq!(r.axis(), Axis::new(5, 7));
        assert_eq!(d.size(), (800, 600));
    }

    #[test]
    fn axis_clamped_drops_negatives() {
        assert_eq!(Axis::new(-3, 4).clamped(), Axis::new(0, 4));
    }
}
