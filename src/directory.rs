//! Participant directory: the dataset loaded once at startup and looked up by
//! Bib Number.

use crate::source::Source;
use crate::{Error, Result};
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// One participant as listed in the dataset.
///
/// The dataset uses `bib` / `name` / `category`; `identifier` and
/// `displayName` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    #[serde(rename = "bib", alias = "identifier", deserialize_with = "string_or_number")]
    pub identifier: String,
    #[serde(rename = "name", alias = "displayName")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ParticipantRecord {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

// Bib numbers are sometimes written as bare JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

/// Trim and uppercase an identifier for comparison.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Parse a JSON array of participant records.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<ParticipantRecord>> {
    let records: Vec<ParticipantRecord> = serde_json::from_slice(bytes)
        .map_err(|e| Error::LoadError(format!("Malformed participant dataset: {}", e)))?;

    let mut seen = HashSet::new();
    for r in &records {
        if !seen.insert(normalize_identifier(&r.identifier)) {
            warn!(
                "Duplicate Bib Number {:?} in dataset; lookups return the first entry",
                r.identifier
            );
        }
    }
    Ok(records)
}

/// The loaded dataset plus its readiness.
///
/// The directory starts out loading. It becomes ready exactly once, either
/// with the parsed records or, when the source is missing or malformed, with
/// no records at all. It never goes back to loading.
#[derive(Debug, Default)]
pub struct Directory {
    records: OnceLock<Vec<ParticipantRecord>>,
}

impl Directory {
    /// A directory that is still waiting for its dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory that is ready with the given records.
    pub fn with_records(records: Vec<ParticipantRecord>) -> Self {
        let dir = Self::new();
        let _ = dir.records.set(records);
        dir
    }

    /// Fetch and install the dataset.
    ///
    /// Failure is fail-open: the directory still becomes ready (empty) and the
    /// cause is logged and returned for diagnostics.
    pub async fn load(&self, source: &Source, timeout_ms: u64) -> Result<usize> {
        if self.is_ready() {
            return Err(Error::LoadError("participant dataset already loaded".into()));
        }

        let loaded = match source.fetch(timeout_ms).await {
            Ok(bytes) => parse_records(&bytes),
            Err(e) => Err(Error::LoadError(format!("{}: {}", source, e))),
        };

        match loaded {
            Ok(records) => {
                let count = records.len();
                self.install(records);
                info!("Loaded {} participants from {}", count, source);
                Ok(count)
            }
            Err(e) => {
                warn!("{}; continuing with an empty participant list", e);
                warn!(r#"Expected format: [{{"name":"John Doe","bib":"001","category":"5K"}}]"#);
                self.install(Vec::new());
                Err(e)
            }
        }
    }

    fn install(&self, records: Vec<ParticipantRecord>) {
        if self.records.set(records).is_err() {
            warn!("Participant dataset was installed concurrently; keeping the first copy");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.records.get().is_some()
    }

    /// Number of records (zero while loading).
    pub fn len(&self) -> usize {
        self.records.get().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive lookup; first match wins. Always `None` while the
    /// directory is loading, so callers check [`Directory::is_ready`] first.
    pub fn find_by_identifier(&self, id: &str) -> Option<ParticipantRecord> {
        let wanted = normalize_identifier(id);
        self.records
            .get()?
            .iter()
            .find(|r| normalize_identifier(&r.identifier) == wanted)
            .cloned()
    }
}
