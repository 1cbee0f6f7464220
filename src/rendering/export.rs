/// Handing finished certificates to the host for saving

use crate::{Error, Result};
use base64::Engine as _;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Saves encoded certificate bytes under a filename.
pub trait Exporter: Send + Sync {
    /// Returns a human-readable description of where the bytes went.
    fn save(&self, bytes: &[u8], filename: &str) -> Result<String>;
}

/// `<label>-Certificate-Bib-<identifier>.png`.
///
/// Path separators in either part become `_` and leading dots are dropped,
/// so any dataset identifier yields a plain file name.
pub fn certificate_filename(event_label: &str, identifier: &str) -> String {
    format!(
        "{}-Certificate-Bib-{}.png",
        filename_component(event_label),
        filename_component(identifier)
    )
}

fn filename_component(raw: &str) -> String {
    raw.trim_start_matches('.').replace(['/', '\\'], "_")
}

/// `data:image/png;base64,...` form of an encoded PNG.
pub fn png_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Writes certificates into a directory.
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Exporter for FileExporter {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<String> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(Error::ExportError(format!("refusing unsafe filename {:?}", filename)));
        }
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::ExportError(format!("Failed to create {}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)
            .map_err(|e| Error::ExportError(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(path.display().to_string())
    }
}

/// Keeps saved certificates in memory.
#[derive(Debug, Default)]
pub struct MemoryExporter {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn last(&self) -> Option<(String, Vec<u8>)> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Exporter for MemoryExporter {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<String> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((filename.to_string(), bytes.to_vec()));
        Ok(format!("memory:{}", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_embeds_label_and_identifier() {
        assert_eq!(
            certificate_filename("Sadri-Marathon-2025", "a12"),
            "Sadri-Marathon-2025-Certificate-Bib-a12.png"
        );
    }

    #[test]
    fn separators_in_identifiers_are_replaced() {
        assert_eq!(
            certificate_filename("Sadri-Marathon-2025", "10K/42"),
            "Sadri-Marathon-2025-Certificate-Bib-10K_42.png"
        );
        assert_eq!(
            certificate_filename(".hidden", "..\\x"),
            "hidden-Certificate-Bib-_x.png"
        );
    }

    #[test]
    fn sanitized_names_pass_the_file_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileExporter::new(dir.path());
        let name = certificate_filename("Run", "../../etc/passwd");
        exporter.save(b"png", &name).unwrap();
        assert!(dir.path().join(&name).is_file());
    }

    #[test]
    fn data_url_is_base64_png() {
        assert_eq!(png_data_url(b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn file_exporter_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileExporter::new(dir.path().join("out"));
        let location = exporter.save(b"png", "cert-001.png").unwrap();
        assert!(location.ends_with("cert-001.png"));
        assert_eq!(std::fs::read(dir.path().join("out/cert-001.png")).unwrap(), b"png");
    }

    #[test]
    fn file_exporter_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileExporter::new(dir.path());
        assert!(matches!(exporter.save(b"x", "../evil.png"), Err(Error::ExportError(_))));
        assert!(matches!(exporter.save(b"x", "a/b.png"), Err(Error::ExportError(_))));
    }

    #[test]
    fn memory_exporter_keeps_order() {
        let m = MemoryExporter::new();
        m.save(b"1", "one.png").unwrap();
        m.save(b"2", "two.png").unwrap();
        assert_eq!(m.filenames(), vec!["one.png", "two.png"]);
        assert_eq!(m.last().unwrap().1, b"2".to_vec());
    }
}
