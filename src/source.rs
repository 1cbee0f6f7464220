//! Static resources read by the application: the participant dataset and the
//! optional certificate background.
//!
//! A [`Source`] is either a local path, an `http(s)://` URL (with the `http`
//! feature) or bytes handed over in-process.

use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A file on the local filesystem
    Path(PathBuf),
    /// A remote resource fetched with a single GET
    #[cfg(feature = "http")]
    Url(url::Url),
    /// Bytes already in memory
    Inline(Vec<u8>),
}

impl Source {
    /// Interpret a user-supplied location. Anything with an `http://` or
    /// `https://` prefix is a URL, everything else a path.
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(Error::ConfigError("empty source location".into()));
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return remote(location);
        }
        Ok(Source::Path(PathBuf::from(location)))
    }

    /// Read the whole resource. `timeout_ms` bounds remote fetches only.
    #[cfg_attr(not(feature = "http"), allow(unused_variables))]
    pub async fn fetch(&self, timeout_ms: u64) -> Result<Vec<u8>> {
        match self {
            Source::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| Error::Other(format!("Failed to read {}: {}", path.display(), e))),
            #[cfg(feature = "http")]
            Source::Url(url) => fetch_url(url, timeout_ms).await,
            Source::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => write!(f, "{}", p.display()),
            #[cfg(feature = "http")]
            Source::Url(u) => write!(f, "{}", u),
            Source::Inline(b) => write!(f, "<inline {} bytes>", b.len()),
        }
    }
}

#[cfg(feature = "http")]
fn remote(location: &str) -> Result<Source> {
    url::Url::parse(location)
        .map(Source::Url)
        .map_err(|e| Error::ConfigError(format!("Invalid URL {}: {}", location, e)))
}

#[cfg(not(feature = "http"))]
fn remote(location: &str) -> Result<Source> {
    Err(Error::ConfigError(format!(
        "{} is a URL but bibcert was built without the `http` feature",
        location
    )))
}

#[cfg(feature = "http")]
async fn fetch_url(url: &url::Url, timeout_ms: u64) -> Result<Vec<u8>> {
    use std::time::Duration;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

    let resp = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout(timeout_ms)
        } else {
            Error::NetworkError(format!("Failed to fetch {}: {}", url, e))
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::NetworkError(format!("{} returned HTTP {}", url, status)));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| Error::NetworkError(format!("Failed to read response body: {}", e)))?;
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_paths_and_urls() {
        assert_eq!(
            Source::parse(" participants.json ").unwrap(),
            Source::Path(PathBuf::from("participants.json"))
        );
        #[cfg(feature = "http")]
        assert!(matches!(
            Source::parse("https://example.com/participants.json").unwrap(),
            Source::Url(_)
        ));
        assert!(matches!(Source::parse("   "), Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let src = Source::Path(PathBuf::from("/definitely/not/here.json"));
        assert!(src.fetch(1000).await.is_err());
    }

    #[tokio::test]
    async fn inline_returns_bytes() {
        let src = Source::Inline(b"[]".to_vec());
        assert_eq!(src.fetch(1000).await.unwrap(), b"[]".to_vec());
        assert_eq!(src.to_string(), "<inline 2 bytes>");
    }

    #[tokio::test]
    async fn local_sources_ignore_fetch_timeout() {
        let src = Source::Inline(b"{}".to_vec());
        assert_eq!(src.fetch(0).await.unwrap(), b"{}".to_vec());

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("p.json");
        std::fs::write(&path, "[]").unwrap();
        assert_eq!(Source::Path(path).fetch(0).await.unwrap(), b"[]".to_vec());
    }
}
