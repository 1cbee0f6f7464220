/// Geometry and the shrink-to-fit text layout used for participant names

use super::paint::Color;
use super::Surface;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The rect shrunk by `by` on every side.
    pub fn inset(&self, by: u32) -> Rect {
        Rect {
            x: self.x + by as i32,
            y: self.y + by as i32,
            width: self.width.saturating_sub(by * 2),
            height: self.height.saturating_sub(by * 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bounds for fitting a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFit {
    /// Widest the text may render, in pixels
    pub max_width: u32,
    /// Size tried first
    pub max_font_size: u32,
    /// Size never gone below, even if the text still overflows
    pub min_font_size: u32,
    /// Decrement between attempts
    pub step: u32,
}

impl Default for TextFit {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_font_size: 36,
            min_font_size: 16,
            step: 2,
        }
    }
}

/// Pick the font size for `text`.
///
/// Starting at `max_font_size`, shrink by `step` while the measured width
/// exceeds `max_width` and the size is still above `min_font_size`. The
/// result is the first size that fits, or the floor. A zero `step` could
/// never reach the floor and is rejected.
pub fn fit_font_size<F>(mut measure: F, fit: &TextFit) -> Result<u32>
where
    F: FnMut(u32) -> Result<f32>,
{
    if fit.step == 0 {
        return Err(Error::RenderError("text fit step must be at least 1".into()));
    }
    let mut size = fit.max_font_size;
    while measure(size)? > fit.max_width as f32 && size > fit.min_font_size {
        size = size.saturating_sub(fit.step).max(fit.min_font_size);
    }
    Ok(size)
}

/// Draw `text` centered on `anchor` (baseline at `anchor.y`) at the largest
/// size that fits. Returns the size used.
pub fn draw_auto_sized_text(
    surface: &mut dyn Surface,
    text: &str,
    anchor: Point,
    fit: &TextFit,
    color: Color,
) -> Result<u32> {
    let size = fit_font_size(|px| surface.measure_text(text, px), fit)?;
    surface.draw_text(text, anchor, size, color)?;
    Ok(size)
}
