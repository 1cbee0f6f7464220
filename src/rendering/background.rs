//! Background resolution for certificates.
//!
//! The background asset is loaded asynchronously and raced against a fixed
//! timeout. Both contenders report into a [`Latch`]; whichever commits first
//! decides the background and the other one's result is dropped.

use super::layout::Rect;
use super::paint::{Color, LinearGradient};
use super::Surface;
use crate::source::Source;
use crate::{Error, Result};
use futures::future::{self, BoxFuture, FutureExt};
use image::RgbaImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// A single-resolution gate: the first `commit` wins, later ones are no-ops.
pub struct Latch<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Latch<T> {
    fn clone(&self) -> Self {
        Self { tx: Arc::clone(&self.tx) }
    }
}

impl<T> Latch<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Arc::new(Mutex::new(Some(tx))) }, rx)
    }

    /// Offer a value. Returns `true` only for the commit that resolved the latch.
    pub fn commit(&self, value: T) -> bool {
        let sender = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

/// Why the synthesized background was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The asset failed to load or decode
    LoadFailed(String),
    /// The asset did not arrive before the timeout
    TimedOut,
}

pub enum Background {
    Asset(RgbaImage),
    Fallback(FallbackReason),
}

impl Background {
    pub fn kind(&self) -> BackgroundKind {
        match self {
            Background::Asset(_) => BackgroundKind::Asset,
            Background::Fallback(_) => BackgroundKind::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    Asset,
    Fallback,
}

/// Produces the background asset image.
pub trait AssetLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'static, Result<RgbaImage>>;
}

/// Decode PNG/JPEG bytes into an RGBA buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::AssetError(format!("undecodable background image: {}", e)))
}

/// Loads the background from a [`Source`].
pub struct SourceAssetLoader {
    source: Source,
    fetch_timeout_ms: u64,
}

impl SourceAssetLoader {
    pub fn new(source: Source, fetch_timeout_ms: u64) -> Self {
        Self { source, fetch_timeout_ms }
    }
}

impl AssetLoader for SourceAssetLoader {
    fn load(&self) -> BoxFuture<'static, Result<RgbaImage>> {
        let source = self.source.clone();
        let timeout_ms = self.fetch_timeout_ms;
        async move {
            let bytes = source
                .fetch(timeout_ms)
                .await
                .map_err(|e| Error::AssetError(format!("{}: {}", source, e)))?;
            decode_image(&bytes)
        }
        .boxed()
    }
}

/// No background configured; every load fails straight away.
pub struct NoAsset;

impl AssetLoader for NoAsset {
    fn load(&self) -> BoxFuture<'static, Result<RgbaImage>> {
        future::ready(Err(Error::AssetError("no background asset configured".into()))).boxed()
    }
}

/// Race the asset load against `timeout`.
pub async fn resolve_background(loader: Arc<dyn AssetLoader>, timeout: Duration) -> Background {
    let (latch, rx) = Latch::new();

    let load = loader.load();
    let asset_latch = latch.clone();
    tokio::spawn(async move {
        let outcome = match load.await {
            Ok(img) => Background::Asset(img),
            Err(e) => Background::Fallback(FallbackReason::LoadFailed(e.to_string())),
        };
        if !asset_latch.commit(outcome) {
            debug!("Background asset settled after the timeout; ignoring it");
        }
    });

    let timer_latch = latch;
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if timer_latch.commit(Background::Fallback(FallbackReason::TimedOut)) {
            debug!("Background timeout fired after {}ms", timeout.as_millis());
        }
    });

    let background = rx.await.unwrap_or_else(|_| {
        Background::Fallback(FallbackReason::LoadFailed("background resolution abandoned".into()))
    });
    timer.abort();
    if let Background::Fallback(reason) = &background {
        warn!("Background image not available ({:?}), using default background", reason);
    }
    background
}

/// Look of the synthesized background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FallbackStyle {
    pub gradient_from: Color,
    pub gradient_to: Color,
    pub border_color: Color,
    pub border_width: u32,
    pub border_inset: u32,
}

impl Default for FallbackStyle {
    fn default() -> Self {
        Self {
            gradient_from: Color::rgb(0xf8, 0xfa, 0xfc),
            gradient_to: Color::rgb(0xe2, 0xe8, 0xf0),
            border_color: Color::rgb(0x0d, 0x94, 0x88),
            border_width: 8,
            border_inset: 20,
        }
    }
}

/// Paint the resolved background over the whole surface.
pub fn paint_background(surface: &mut dyn Surface, background: &Background, style: &FallbackStyle) -> Result<()> {
    let full = Rect::new(0, 0, surface.width(), surface.height());
    match background {
        Background::Asset(img) => surface.draw_image(img, full),
        Background::Fallback(_) => {
            surface.fill_gradient_rect(full, &LinearGradient::new(style.gradient_from, style.gradient_to));
            surface.stroke_rect(full.inset(style.border_inset), style.border_width, style.border_color);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::paint::{PaintCommand, RecordingSurface};
    use image::Rgba;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SlowAsset {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    impl AssetLoader for SlowAsset {
        fn load(&self) -> BoxFuture<'static, Result<RgbaImage>> {
            let delay = self.delay;
            let finished = Arc::clone(&self.finished);
            async move {
                tokio::time::sleep(delay).await;
                finished.store(true, Ordering::SeqCst);
                Ok(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])))
            }
            .boxed()
        }
    }

    fn slow(ms: u64) -> (Arc<dyn AssetLoader>, Arc<AtomicBool>) {
        let finished = Arc::new(AtomicBool::new(false));
        let loader = SlowAsset { delay: Duration::from_millis(ms), finished: Arc::clone(&finished) };
        (Arc::new(loader), finished)
    }

    #[test]
    fn latch_resolves_once() {
        let (latch, mut rx) = Latch::new();
        let other = latch.clone();
        assert!(!latch.is_committed());
        assert!(latch.commit(1));
        assert!(!other.commit(2));
        assert!(other.is_committed());
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn asset_before_timeout_wins() {
        let (loader, _) = slow(100);
        let bg = resolve_background(loader, Duration::from_millis(3000)).await;
        assert_eq!(bg.kind(), BackgroundKind::Asset);
    }

    #[tokio::test]
    async fn settled_race_does_not_leave_the_timer_running() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let (loader, _) = slow(0);
        let bg = resolve_background(loader, Duration::from_secs(60)).await;
        assert_eq!(bg.kind(), BackgroundKind::Asset);

        for _ in 0..10 {
            if metrics.num_alive_tasks() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(metrics.num_alive_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_and_late_asset_is_ignored() {
        let (loader, finished) = slow(5000);
        let bg = resolve_background(loader, Duration::from_millis(3000)).await;
        assert!(matches!(bg, Background::Fallback(FallbackReason::TimedOut)));
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(bg.kind(), BackgroundKind::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_falls_back_without_waiting_for_timeout() {
        let start = tokio::time::Instant::now();
        let bg = resolve_background(Arc::new(NoAsset), Duration::from_millis(3000)).await;
        assert!(matches!(bg, Background::Fallback(FallbackReason::LoadFailed(_))));
        assert!(start.elapsed() < Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn undecodable_bytes_fall_back() {
        let loader = SourceAssetLoader::new(Source::Inline(b"not an image".to_vec()), 1000);
        let bg = resolve_background(Arc::new(loader), Duration::from_millis(3000)).await;
        assert!(matches!(bg, Background::Fallback(FallbackReason::LoadFailed(_))));
    }

    #[test]
    fn fallback_paints_gradient_and_inset_border() {
        let mut s = RecordingSurface::new(200, 100);
        paint_background(&mut s, &Background::Fallback(FallbackReason::TimedOut), &FallbackStyle::default())
            .unwrap();
        assert_eq!(
            s.commands()[1],
            PaintCommand::StrokeRect {
                rect: Rect::new(20, 20, 160, 60),
                line_width: 8,
                color: Color::rgb(0x0d, 0x94, 0x88),
            }
        );
        assert!(matches!(s.commands()[0], PaintCommand::GradientRect { .. }));
    }

    #[test]
    fn asset_covers_the_whole_surface() {
        let mut s = RecordingSurface::new(200, 100);
        let img = RgbaImage::new(10, 5);
        paint_background(&mut s, &Background::Asset(img), &FallbackStyle::default()).unwrap();
        assert_eq!(
            s.commands(),
            &[PaintCommand::Image { dest: Rect::new(0, 0, 200, 100), source_width: 10, source_height: 5 }]
        );
    }
}
