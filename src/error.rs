//! Error types for certificate lookup and rendering

use thiserror::Error;

/// Result type alias for bibcert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading participants or producing a certificate
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load or parse the participant dataset
    #[error("Failed to load participants: {0}")]
    LoadError(String),

    /// Failed to fetch or decode the background asset
    #[error("Background asset unavailable: {0}")]
    AssetError(String),

    /// Failed to draw onto the surface
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to encode or save the finished certificate
    #[error("Export failed: {0}")]
    ExportError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let e = Error::ExportError("disk full".into());
        assert_eq!(e.to_string(), "Export failed: disk full");
        assert_eq!(Error::Timeout(3000).to_string(), "Operation timed out after 3000ms");
    }
}
