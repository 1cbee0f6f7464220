//! Rendering pipeline smoke tests: real background assets and the pixel surface

use bibcert::directory::ParticipantRecord;
use bibcert::rendering::raster::discover_font;
use bibcert::rendering::{
    BackgroundKind, CertificateRenderer, MemoryExporter, PaintCommand, RasterSurface,
    RecordingSurface, RenderRequest, SourceAssetLoader, Surface,
};
use bibcert::{CertConfig, Source};
use image::{Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

fn background_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(60, 40, Rgba([200, 180, 120, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode background");
    buf
}

#[tokio::test]
async fn background_file_is_drawn_full_size() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("certificate-bg.png");
    std::fs::write(&path, background_png()).unwrap();

    let config = CertConfig::default();
    let loader = SourceAssetLoader::new(Source::Path(path), config.fetch_timeout_ms);
    let exporter = Arc::new(MemoryExporter::new());
    let renderer = CertificateRenderer::new(&config, Arc::new(loader), exporter.clone()).unwrap();

    let mut surface = RecordingSurface::new(1200, 850);
    let req = RenderRequest::new(ParticipantRecord::new("001", "Jane Doe"), 1200, 850);
    let cert = renderer.render(&mut surface, &req).await.unwrap();

    assert_eq!(cert.background, BackgroundKind::Asset);
    assert!(matches!(
        surface.commands()[1],
        PaintCommand::Image { source_width: 60, source_height: 40, .. }
    ));
    assert!(!surface
        .commands()
        .iter()
        .any(|c| matches!(c, PaintCommand::StrokeRect { .. })));
}

#[cfg(feature = "http")]
#[tokio::test]
async fn background_over_http_is_used() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let png = background_png();
    std::thread::spawn(move || {
        if let Ok(req) = server.recv() {
            let _ = req.respond(tiny_http::Response::from_data(png));
        }
    });

    let config = CertConfig::default();
    let src = Source::parse(&format!("http://{}/certificate-bg.png", addr)).unwrap();
    let loader = SourceAssetLoader::new(src, config.fetch_timeout_ms);
    let renderer = CertificateRenderer::new(&config, Arc::new(loader), Arc::new(MemoryExporter::new())).unwrap();

    let mut surface = RecordingSurface::new(1200, 850);
    let req = RenderRequest::new(ParticipantRecord::new("7", "Sam"), 1200, 850);
    let cert = renderer.render(&mut surface, &req).await.unwrap();
    assert_eq!(cert.background, BackgroundKind::Asset);
}

#[tokio::test]
async fn raster_certificate_end_to_end() {
    let Some((_, font)) = discover_font() else {
        println!("No system font found; skipping");
        return;
    };

    let mut config = CertConfig::default();
    config.background = None;
    let exporter = Arc::new(MemoryExporter::new());
    let renderer = CertificateRenderer::new(
        &config,
        Arc::new(bibcert::rendering::NoAsset),
        exporter.clone(),
    )
    .unwrap();

    let mut surface = RasterSurface::new(1200, 850).with_font(Arc::new(font));
    let req = RenderRequest::new(ParticipantRecord::new("001", "Jane Doe"), surface.width(), surface.height());
    let cert = renderer.render(&mut surface, &req).await.unwrap();

    assert_eq!(cert.background, BackgroundKind::Fallback);
    let decoded = image::load_from_memory(&cert.png_data).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (1200, 850));
    // Border stroke straddles the 20px inset outline.
    assert_eq!(decoded.get_pixel(20, 425).0, [0x0d, 0x94, 0x88, 255]);
    assert!(cert.data_url().starts_with("data:image/png;base64,"));
    assert_eq!(cert.digest().len(), 64);

    let (name, bytes) = exporter.last().unwrap();
    assert_eq!(name, "Sadri-Marathon-2025-Certificate-Bib-001.png");
    assert_eq!(bytes, cert.png_data);
}
