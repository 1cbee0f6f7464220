//! bibcert
//!
//! Look up a race participant by Bib Number and render a personalized
//! certificate image for download.
//!
//! # Overview
//!
//! - **[`directory`]**: the participant dataset, loaded once and searched
//!   case-insensitively
//! - **[`rendering`]**: background resolution (asset raced against a
//!   timeout), shrink-to-fit name layout and PNG export through injected
//!   [`rendering::Surface`] and [`rendering::Exporter`] capabilities
//! - **[`controller`]**: the search flow with its busy state and status
//!   notifications
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bibcert::controller::{Controller, NullPresenter};
//! use bibcert::directory::{Directory, ParticipantRecord};
//! use bibcert::rendering::{CertificateRenderer, FileExporter, NoAsset, RecordingSurface};
//! use bibcert::CertConfig;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = CertConfig::default();
//! let directory = Directory::with_records(vec![ParticipantRecord::new("001", "Jane Doe")]);
//! let renderer = CertificateRenderer::new(&config, Arc::new(NoAsset), Arc::new(FileExporter::new("out"))).unwrap();
//! let controller = Controller::new(
//!     Arc::new(directory),
//!     renderer,
//!     Box::new(RecordingSurface::new(config.canvas.width, config.canvas.height)),
//!     Arc::new(NullPresenter),
//!     Duration::from_millis(config.pacing_delay_ms),
//! );
//! let outcome = controller.search("001").await;
//! assert!(outcome.is_success());
//! # }
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub mod error;
pub use error::{Error, Result};

pub mod controller;
pub mod directory;
pub mod rendering;
pub mod source;

pub use controller::{Controller, Notification, NotificationKind, Presenter, SearchOutcome};
pub use directory::{Directory, ParticipantRecord};
pub use rendering::{Certificate, CertificateRenderer, Surface};
pub use source::Source;

use rendering::background::FallbackStyle;
use rendering::NameStyle;

/// Application configuration
///
/// Defaults reproduce the stock certificate: a 1200x850 canvas, the name at
/// baseline 465 shrinking from 36px to at most 16px to fit 300px, a
/// 3 second background timeout and an 800ms pacing delay before lookups.
///
/// Every field may be omitted from a JSON config file.
///
/// # Examples
///
/// ```
/// let cfg = bibcert::CertConfig::default();
/// assert_eq!(cfg.pacing_delay_ms, 800);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CertConfig {
    /// Event label embedded in exported filenames
    pub event_label: String,
    /// Certificate dimensions
    pub canvas: CanvasSize,
    /// Participant dataset location (path or URL)
    pub participants: String,
    /// Background image location (path or URL); `None` always uses the fallback
    pub background: Option<String>,
    /// How long to wait for the background before falling back
    pub background_timeout_ms: u64,
    /// Artificial delay before each lookup
    pub pacing_delay_ms: u64,
    /// Timeout for HTTP fetches of the dataset and background
    pub fetch_timeout_ms: u64,
    /// Placement and sizing of the participant name
    pub name: NameStyle,
    /// Look of the synthesized background
    pub fallback: FallbackStyle,
    /// Font file for names; system fonts are searched when unset
    pub font_path: Option<PathBuf>,
    /// Directory certificates are written to
    pub output_dir: PathBuf,
}

impl Default for CertConfig {
    fn default() -> Self {
        Self {
            event_label: "Sadri-Marathon-2025".to_string(),
            canvas: CanvasSize::default(),
            participants: "participants.json".to_string(),
            background: Some("certificate-bg.png".to_string()),
            background_timeout_ms: 3000,
            pacing_delay_ms: 800,
            fetch_timeout_ms: 10000,
            name: NameStyle::default(),
            fallback: FallbackStyle::default(),
            font_path: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl CertConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: CertConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(Error::ConfigError("canvas dimensions must be non-zero".into()));
        }
        let fit = &self.name.fit;
        if fit.step == 0 {
            return Err(Error::ConfigError("name.fit.step must be at least 1".into()));
        }
        if fit.min_font_size == 0 || fit.min_font_size > fit.max_font_size {
            return Err(Error::ConfigError(format!(
                "name.fit font sizes must satisfy 0 < min ({}) <= max ({})",
                fit.min_font_size, fit.max_font_size
            )));
        }
        if self.event_label.trim().is_empty() {
            return Err(Error::ConfigError("event_label must not be empty".into()));
        }
        Ok(())
    }
}

/// Certificate canvas dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 850,
        }
    }
}
