//! Certificate renderer: background, name layout and export for one request.

use super::background::{paint_background, resolve_background, AssetLoader, FallbackStyle};
use super::export::{certificate_filename, Exporter};
use super::layout::{draw_auto_sized_text, Point, TextFit};
use super::paint::Color;
use super::{Certificate, RenderRequest, Surface};
use crate::{CertConfig, Error, Result};
use log::{debug, info};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Where and how the participant's name is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct NameStyle {
    /// Baseline of the name; it is always centered horizontally
    pub anchor_y: f32,
    pub fit: TextFit,
    pub color: Color,
}

impl Default for NameStyle {
    fn default() -> Self {
        Self {
            anchor_y: 465.0,
            fit: TextFit::default(),
            color: Color::rgb(0x1f, 0x29, 0x37),
        }
    }
}

/// Stages a render request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    BackgroundResolving,
    TextLayout,
    Exported,
    Failed,
}

struct PhaseTrace<'a> {
    identifier: &'a str,
    phase: RenderPhase,
}

impl<'a> PhaseTrace<'a> {
    fn new(identifier: &'a str) -> Self {
        Self { identifier, phase: RenderPhase::Idle }
    }

    fn enter(&mut self, next: RenderPhase) {
        debug!("certificate {}: {:?} -> {:?}", self.identifier, self.phase, next);
        self.phase = next;
    }
}

pub struct CertificateRenderer {
    event_label: String,
    background_timeout: Duration,
    name: NameStyle,
    fallback: FallbackStyle,
    assets: Arc<dyn AssetLoader>,
    exporter: Arc<dyn Exporter>,
}

impl CertificateRenderer {
    /// Fails with `ConfigError` when `config` does not pass [`CertConfig::validate`].
    pub fn new(
        config: &CertConfig,
        assets: Arc<dyn AssetLoader>,
        exporter: Arc<dyn Exporter>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            event_label: config.event_label.clone(),
            background_timeout: Duration::from_millis(config.background_timeout_ms),
            name: config.name,
            fallback: config.fallback,
            assets,
            exporter,
        })
    }

    /// Draw and export a certificate for `request` onto `surface`.
    pub async fn render(&self, surface: &mut dyn Surface, request: &RenderRequest) -> Result<Certificate> {
        let mut trace = PhaseTrace::new(&request.participant.identifier);
        let result = self.run(surface, request, &mut trace).await;
        if result.is_err() {
            trace.enter(RenderPhase::Failed);
        }
        result
    }

    async fn run(
        &self,
        surface: &mut dyn Surface,
        request: &RenderRequest,
        trace: &mut PhaseTrace<'_>,
    ) -> Result<Certificate> {
        if (surface.width(), surface.height()) != (request.width, request.height) {
            return Err(Error::RenderError(format!(
                "surface is {}x{} but the request targets {}x{}",
                surface.width(),
                surface.height(),
                request.width,
                request.height
            )));
        }
        surface.clear();

        trace.enter(RenderPhase::BackgroundResolving);
        let background = resolve_background(Arc::clone(&self.assets), self.background_timeout).await;

        trace.enter(RenderPhase::TextLayout);
        paint_background(surface, &background, &self.fallback)?;
        let anchor = Point::new(request.width as f32 / 2.0, self.name.anchor_y);
        let font_size = draw_auto_sized_text(
            surface,
            &request.participant.display_name,
            anchor,
            &self.name.fit,
            self.name.color,
        )?;

        let png_data = surface.encode()?;
        let filename = certificate_filename(&self.event_label, &request.participant.identifier);
        let saved_to = self.exporter.save(&png_data, &filename)?;
        trace.enter(RenderPhase::Exported);

        let certificate = Certificate {
            identifier: request.participant.identifier.clone(),
            filename,
            width: request.width,
            height: request.height,
            png_data,
            background: background.kind(),
            font_size,
            saved_to,
        };
        info!(
            "Exported {} to {} (sha256 {})",
            certificate.filename,
            certificate.saved_to,
            certificate.digest()
        );
        Ok(certificate)
    }
}
