//! Pure geometry for resize, crop and overlay placement.
//!
//! All functions here are pure and testable without any I/O or images.
//! Backends never repeat this arithmetic; they receive a finished
//! [`ResizePlan`] or [`Axis`] and only execute it.

use super::dimension::{Axis, Dimension, Focus, Orientation, resolve_orientation};
use super::params::{ResampleFilter, ResizePlan};
use super::watermark::Position;

/// Centered square window of a source, used when the target is square.
///
/// The side is the source's short edge. Wide sources are offset
/// horizontally, tall sources vertically. The offset follows the actual
/// edges, not an orientation set on `source`.
pub fn square_window(source: &Dimension) -> Dimension {
    let (w, h) = source.size();
    let side = w.min(h);
    let offset = (w.abs_diff(h) / 2) as i32;
    match resolve_orientation(w, h) {
        Orientation::Landscape => Dimension::at(side, side, offset, 0),
        Orientation::Portrait => Dimension::at(side, side, 0, offset),
        _ => Dimension::new(side, side),
    }
}

/// Scale size for a cover-fit resize of `window` into `target`.
///
/// Landscape windows are scaled by height, portrait windows by width. When
/// the driving edge leaves the other edge short of the target, the other
/// edge drives instead. Square windows go straight to
/// [`calculate_fill_dimensions`], which for a square target no larger than
/// the window is just `min(target, window)` per edge.
pub fn calculate_cover_dimensions(window: &Dimension, target: (u32, u32)) -> (u32, u32) {
    let (win_w, win_h) = window.size();
    let (tgt_w, tgt_h) = target;

    if win_w == 0 || win_h == 0 {
        return (tgt_w.min(win_w), tgt_h.min(win_h));
    }

    let scaled = match window.orientation() {
        Orientation::Landscape => (
            (win_w as f64 * tgt_h as f64 / win_h as f64).round() as u32,
            tgt_h,
        ),
        Orientation::Portrait => (
            tgt_w,
            (win_h as f64 * tgt_w as f64 / win_w as f64).round() as u32,
        ),
        _ => return calculate_fill_dimensions((win_w, win_h), target),
    };

    if scaled.0 >= tgt_w && scaled.1 >= tgt_h {
        scaled
    } else {
        calculate_fill_dimensions((win_w, win_h), target)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h)
    }
}

/// Top-left origin of `content` inside `container` for a crop anchored at `focus`.
///
/// Centered edges use truncating integer division.
pub fn crop_axis(focus: Focus, container: (u32, u32), content: (u32, u32)) -> Axis {
    let (cw, ch) = (container.0 as i32, container.1 as i32);
    let (w, h) = (content.0 as i32, content.1 as i32);
    let center_x = (cw - w) / 2;
    let center_y = (ch - h) / 2;
    let right = cw - w;
    let bottom = ch - h;

    match focus {
        Focus::Center => Axis::new(center_x, center_y),
        Focus::North => Axis::new(center_x, 0),
        Focus::South => Axis::new(center_x, bottom),
        Focus::West => Axis::new(0, center_y),
        Focus::East => Axis::new(right, center_y),
        Focus::NorthWest => Axis::new(0, 0),
        Focus::NorthEast => Axis::new(right, 0),
        Focus::SouthWest => Axis::new(0, bottom),
        Focus::SouthEast => Axis::new(right, bottom),
    }
}

/// Overlay origin of `content` inside `container` for a watermark `position`.
///
/// Edge positions sit `padding` pixels in from the border. Top positions
/// are offset down by the content height plus padding, and `BottomLeft`
/// adds the padding below the content rather than above it.
pub fn watermark_axis(
    position: Position,
    container: (u32, u32),
    content: (u32, u32),
    padding: i32,
) -> Axis {
    let (cw, ch) = (container.0 as i32, container.1 as i32);
    let (w, h) = (content.0 as i32, content.1 as i32);
    let p = padding;
    let center_x = (cw - w) / 2;
    let center_y = (ch - h) / 2;
    let right = cw - (w + p);
    let top = h + p;
    let bottom = ch - (h + p);

    match position {
        Position::Auto | Position::Center | Position::Middle | Position::MiddleMiddle => {
            Axis::new(center_x, center_y)
        }
        Position::MiddleTop => Axis::new(center_x, top),
        Position::MiddleBottom => Axis::new(center_x, bottom),
        Position::MiddleLeft => Axis::new(p, center_y),
        Position::MiddleRight => Axis::new(right, center_y),
        Position::TopLeft => Axis::new(p, top),
        Position::TopRight => Axis::new(right, top),
        Position::BottomLeft => Axis::new(p, ch - h + p),
        Position::BottomRight => Axis::new(right, bottom),
    }
}

/// Overlay scale (percent) that keeps it within half the container on both edges.
///
/// `min(round((cw / 2) / w × 100), round((ch / 2) / h × 100))`; 0 for an
/// empty overlay.
pub fn overlay_auto_scale(container: (u32, u32), overlay: (u32, u32)) -> u32 {
    let (cw, ch) = container;
    let (w, h) = overlay;
    if w == 0 || h == 0 {
        return 0;
    }
    let by_width = ((cw as f64 / 2.0) / w as f64 * 100.0).round() as u32;
    let by_height = ((ch as f64 / 2.0) / h as f64 * 100.0).round() as u32;
    by_width.min(by_height)
}

/// Target dimension for a `width × height` resize of `source`.
///
/// Equal edges always mean a centered square. Otherwise `orientation` and
/// `focus` are applied before sizing, so the crop anchor follows them.
pub fn resize_target(
    source: &Dimension,
    width: u32,
    height: u32,
    orientation: Orientation,
    focus: Focus,
) -> Dimension {
    let shaped = if width == height {
        source
            .with_orientation(Orientation::Square)
            .with_focus(Focus::Center)
    } else {
        source.with_orientation(orientation).with_focus(focus)
    };
    shaped.with_size(width, height)
}

/// Build the full resize plan for scaling `source` into `target`.
///
/// A square target first reframes the source to its centered square
/// window and resamples with the softer filter. The crop axis is anchored
/// at `target.focus()` against the scaled intermediate, then clamped so
/// the crop origin is never negative and the region stays in bounds.
pub fn plan_resize(source: &Dimension, target: &Dimension) -> ResizePlan {
    let (window, filter) = if target.orientation() == Orientation::Square {
        (square_window(source), ResampleFilter::CatmullRom)
    } else {
        (
            Dimension::new(source.width(), source.height()),
            ResampleFilter::Lanczos3,
        )
    };

    let (scale_width, scale_height) = calculate_cover_dimensions(&window, target.size());
    let axis = crop_axis(target.focus(), (scale_width, scale_height), target.size()).clamped();
    let crop_width = target.width().min(scale_width.saturating_sub(axis.x as u32));
    let crop_height = target.height().min(scale_height.saturating_sub(axis.y as u32));

    ResizePlan {
        window,
        scale_width,
        scale_height,
        crop: Dimension::at(crop_width, crop_height, axis.x, axis.y),
        filter,
    }
}
