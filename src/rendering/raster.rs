//! Pixel surface backed by an `image` RGBA buffer with `rusttype` glyphs

use super::layout::{Point, Rect};
use super::paint::{Color, LinearGradient};
use super::Surface;
use crate::{Error, Result};
use image::{imageops, ImageFormat, Pixel, Rgba, RgbaImage};
use log::debug;
use rusttype::{point, Font, Scale};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Common system font locations, bold sans faces first.
const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
    "C:\\Windows\\Fonts",
];

const FONT_FILES: &[&str] = &[
    "LiberationSans-Bold.ttf",
    "DejaVuSans-Bold.ttf",
    "Arial Bold.ttf",
    "arialbd.ttf",
    "LiberationSans-Regular.ttf",
    "DejaVuSans.ttf",
    "Arial.ttf",
    "arial.ttf",
];

/// Load a TrueType/OpenType font from disk.
pub fn load_font(path: &Path) -> Result<Font<'static>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read font {}: {}", path.display(), e)))?;
    Font::try_from_vec(bytes)
        .ok_or_else(|| Error::ConfigError(format!("{} is not a usable font", path.display())))
}

/// Find a bold sans font in the usual system directories.
pub fn discover_font() -> Option<(PathBuf, Font<'static>)> {
    FONT_FILES.iter().find_map(|name| {
        FONT_DIRS.iter().find_map(|dir| {
            let path = Path::new(dir).join(name);
            if !path.exists() {
                return None;
            }
            match load_font(&path) {
                Ok(font) => Some((path, font)),
                Err(e) => {
                    debug!("Skipping font candidate: {}", e);
                    None
                }
            }
        })
    })
}

/// Sum of glyph advances plus pair kerning, like a canvas `measureText`.
fn advance_width(font: &Font<'static>, scale: Scale, text: &str) -> f32 {
    let mut width = 0.0;
    let mut prev = None;
    for ch in text.chars() {
        let glyph = font.glyph(ch).scaled(scale);
        if let Some(prev) = prev {
            width += font.pair_kerning(scale, prev, glyph.id());
        }
        width += glyph.h_metrics().advance_width;
        prev = Some(glyph.id());
    }
    width
}

/// An RGBA pixel buffer. Text operations need a font; without one they fail
/// with [`Error::RenderError`].
pub struct RasterSurface {
    canvas: RgbaImage,
    font: Option<Arc<Font<'static>>>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            font: None,
        }
    }

    pub fn with_font(mut self, font: Arc<Font<'static>>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    fn font(&self) -> Result<&Font<'static>> {
        self.font
            .as_deref()
            .ok_or_else(|| Error::RenderError("no font available for text rendering".into()))
    }

    // Blend `color` over the half-open span [x0, x1) x [y0, y1), clipped.
    fn fill_span(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
        let (w, h) = (self.canvas.width() as i64, self.canvas.height() as i64);
        let (x0, x1) = (x0.clamp(0, w), x1.clamp(0, w));
        let (y0, y1) = (y0.clamp(0, h), y1.clamp(0, h));
        for y in y0..y1 {
            for x in x0..x1 {
                self.canvas.get_pixel_mut(x as u32, y as u32).blend(&color);
            }
        }
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn clear(&mut self) {
        for px in self.canvas.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) -> Result<()> {
        if dest.width == 0 || dest.height == 0 {
            return Err(Error::RenderError("cannot draw into an empty rect".into()));
        }
        if image.dimensions() == (dest.width, dest.height) {
            imageops::overlay(&mut self.canvas, image, dest.x as i64, dest.y as i64);
        } else {
            let scaled = imageops::resize(image, dest.width, dest.height, imageops::FilterType::Triangle);
            imageops::overlay(&mut self.canvas, &scaled, dest.x as i64, dest.y as i64);
        }
        Ok(())
    }

    fn fill_gradient_rect(&mut self, rect: Rect, gradient: &LinearGradient) {
        let (cw, ch) = (self.canvas.width() as i64, self.canvas.height() as i64);
        for dy in 0..rect.height {
            let y = rect.y as i64 + dy as i64;
            if y < 0 || y >= ch {
                continue;
            }
            for dx in 0..rect.width {
                let x = rect.x as i64 + dx as i64;
                if x < 0 || x >= cw {
                    continue;
                }
                let c: Rgba<u8> = gradient.color_at(dx, dy, rect.width, rect.height).into();
                self.canvas.get_pixel_mut(x as u32, y as u32).blend(&c);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, line_width: u32, color: Color) {
        // The stroke straddles the rect outline, half inside and half outside.
        let lw = line_width as i64;
        let half = lw / 2;
        let (x, y) = (rect.x as i64, rect.y as i64);
        let (w, h) = (rect.width as i64, rect.height as i64);
        let (ox0, oy0, ox1, oy1) = (x - half, y - half, x + w + (lw - half), y + h + (lw - half));
        let (ix0, iy0, ix1, iy1) = (x + (lw - half), y + (lw - half), x + w - half, y + h - half);
        let c: Rgba<u8> = color.into();

        self.fill_span(ox0, oy0, ox1, iy0, c);
        self.fill_span(ox0, iy1.max(iy0), ox1, oy1, c);
        self.fill_span(ox0, iy0, ix0, iy1, c);
        self.fill_span(ix1.max(ix0), iy0, ox1, iy1, c);
    }

    fn measure_text(&self, text: &str, font_size: u32) -> Result<f32> {
        let font = self.font()?;
        Ok(advance_width(font, Scale::uniform(font_size as f32), text))
    }

    fn draw_text(&mut self, text: &str, anchor: Point, font_size: u32, color: Color) -> Result<()> {
        let font = Arc::clone(
            self.font
                .as_ref()
                .ok_or_else(|| Error::RenderError("no font available for text rendering".into()))?,
        );
        let scale = Scale::uniform(font_size as f32);
        let start_x = anchor.x - advance_width(&font, scale, text) / 2.0;
        let (cw, ch) = (self.canvas.width() as i32, self.canvas.height() as i32);

        for glyph in font.layout(text, scale, point(start_x, anchor.y)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            let canvas = &mut self.canvas;
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || px >= cw || py >= ch {
                    return;
                }
                let alpha = (coverage * color.a as f32).round() as u8;
                if alpha == 0 {
                    return;
                }
                canvas
                    .get_pixel_mut(px as u32, py as u32)
                    .blend(&Rgba([color.r, color.g, color.b, alpha]));
            });
        }
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.canvas
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| Error::ExportError(format!("PNG encoding failed: {}", e)))?;
        Ok(buf)
    }
}
