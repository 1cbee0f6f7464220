//! Certificate rendering: surfaces, layout, background resolution and export

pub mod background;
pub mod export;
pub mod layout;
pub mod paint;
pub mod raster;
pub mod renderer;

pub use background::{AssetLoader, BackgroundKind, NoAsset, SourceAssetLoader};
pub use export::{Exporter, FileExporter, MemoryExporter};
pub use layout::{Point, Rect, TextFit};
pub use paint::{Color, LinearGradient, PaintCommand, RecordingSurface};
pub use raster::RasterSurface;
pub use renderer::{CertificateRenderer, NameStyle, RenderPhase};

use crate::directory::ParticipantRecord;
use crate::Result;
use image::RgbaImage;
use sha2::{Digest, Sha256};

/// Drawing capability the renderer needs from the host.
///
/// Text is horizontally centered on the anchor with its baseline at
/// `anchor.y`. `encode` produces a lossless encoding of the current pixels.
pub trait Surface: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn clear(&mut self);
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) -> Result<()>;
    fn fill_gradient_rect(&mut self, rect: Rect, gradient: &LinearGradient);
    fn stroke_rect(&mut self, rect: Rect, line_width: u32, color: Color);
    fn measure_text(&self, text: &str, font_size: u32) -> Result<f32>;
    fn draw_text(&mut self, text: &str, anchor: Point, font_size: u32, color: Color) -> Result<()>;
    fn encode(&self) -> Result<Vec<u8>>;
}

/// A participant to render and the target dimensions.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub participant: ParticipantRecord,
    pub width: u32,
    pub height: u32,
}

impl RenderRequest {
    pub fn new(participant: ParticipantRecord, width: u32, height: u32) -> Self {
        Self { participant, width, height }
    }
}

/// A finished, exported certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub identifier: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
    pub background: BackgroundKind,
    pub font_size: u32,
    /// Location reported by the exporter
    pub saved_to: String,
}

impl Certificate {
    /// Hex SHA-256 of the encoded image.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.png_data))
    }

    pub fn data_url(&self) -> String {
        export::png_data_url(&self.png_data)
    }
}
