/// Paint primitives shared by every surface, and a surface that only records them

use super::layout::{Point, Rect};
use super::Surface;
use crate::{Error, Result};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An RGBA color, written in config files as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches('#');
        let bytes = hex::decode(digits).map_err(|_| Error::ConfigError(format!("invalid color: {s}")))?;
        match bytes.as_slice() {
            [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
            [r, g, b, a] => Ok(Self { r: *r, g: *g, b: *b, a: *a }),
            _ => Err(Error::ConfigError(format!("invalid color: {s}"))),
        }
    }

    /// Linear interpolation between two colors, `t` in `0.0..=1.0`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Color::from_hex(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

/// Two-stop gradient running diagonally from the top-left to the
/// bottom-right corner of the filled rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearGradient {
    pub from: Color,
    pub to: Color,
}

impl LinearGradient {
    pub fn new(from: Color, to: Color) -> Self {
        Self { from, to }
    }

    /// Color at offset (`dx`, `dy`) inside a `width` x `height` box.
    pub fn color_at(&self, dx: u32, dy: u32, width: u32, height: u32) -> Color {
        let (w, h) = (width as f32, height as f32);
        let len_sq = w * w + h * h;
        if len_sq == 0.0 {
            return self.from;
        }
        let t = (dx as f32 * w + dy as f32 * h) / len_sq;
        self.from.lerp(self.to, t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintCommand {
    Clear {
        width: u32,
        height: u32,
    },
    Image {
        dest: Rect,
        source_width: u32,
        source_height: u32,
    },
    GradientRect {
        rect: Rect,
        from: Color,
        to: Color,
    },
    StrokeRect {
        rect: Rect,
        line_width: u32,
        color: Color,
    },
    Text {
        anchor: Point,
        font_size: u32,
        color: Color,
        text: String,
    },
}

/// A surface that records paint commands instead of rasterizing them.
///
/// Text is measured with a fixed advance of `advance_ratio * font_size` per
/// character, which keeps layout deterministic without any font files.
/// `encode` returns the JSON transcript of the recorded commands.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    advance_ratio: f32,
    commands: Vec<PaintCommand>,
    fail_encode: bool,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            advance_ratio: 0.6,
            commands: Vec::new(),
            fail_encode: false,
        }
    }

    pub fn with_advance_ratio(mut self, ratio: f32) -> Self {
        self.advance_ratio = ratio;
        self
    }

    /// Make every `encode` call fail, to exercise export error paths.
    pub fn failing_encode(mut self) -> Self {
        self.fail_encode = true;
        self
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    /// Text of every `Text` command, in draw order.
    pub fn drawn_text(&self) -> Vec<(String, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, font_size, .. } => Some((text.clone(), *font_size)),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(PaintCommand::Clear {
            width: self.width,
            height: self.height,
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) -> Result<()> {
        self.commands.push(PaintCommand::Image {
            dest,
            source_width: image.width(),
            source_height: image.height(),
        });
        Ok(())
    }

    fn fill_gradient_rect(&mut self, rect: Rect, gradient: &LinearGradient) {
        self.commands.push(PaintCommand::GradientRect {
            rect,
            from: gradient.from,
            to: gradient.to,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, line_width: u32, color: Color) {
        self.commands.push(PaintCommand::StrokeRect { rect, line_width, color });
    }

    fn measure_text(&self, text: &str, font_size: u32) -> Result<f32> {
        Ok(text.chars().count() as f32 * font_size as f32 * self.advance_ratio)
    }

    fn draw_text(&mut self, text: &str, anchor: Point, font_size: u32, color: Color) -> Result<()> {
        self.commands.push(PaintCommand::Text {
            anchor,
            font_size,
            color,
            text: text.to_string(),
        });
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>> {
        if self.fail_encode {
            return Err(Error::ExportError("recording surface configured to fail".into()));
        }
        serde_json::to_vec(&self.commands).map_err(|e| Error::ExportError(e.to_string()))
    }
}
