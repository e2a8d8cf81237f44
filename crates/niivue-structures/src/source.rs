//! Data sources for volumes, meshes and mesh layers.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use niivue_core::Result;

/// Where the frontend fetches an image or mesh from.
///
/// A URL (or any string) is passed through for the frontend to fetch. A
/// local file is read when its state is synchronized and shipped inline as
/// `{name, data}` with base64-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    /// Creates a URL source.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Creates a local file source.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Returns true for the empty-URL sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Url(url) if url.is_empty())
    }

    /// Returns the display name the frontend uses for this source.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => file_name(path),
        }
    }

    /// Builds the wire form, reading local files.
    pub fn to_wire(&self) -> Result<Value> {
        match self {
            Self::Url(url) => Ok(Value::String(url.clone())),
            Self::File(path) => {
                let bytes = std::fs::read(path)?;
                log::debug!("read {} bytes from {}", bytes.len(), path.display());
                Ok(json!({
                    "name": file_name(path),
                    "data": STANDARD.encode(bytes),
                }))
            }
        }
    }

    /// Returns true if `wire` is how the frontend reports this source.
    #[must_use]
    pub fn matches_wire(&self, wire: &Value) -> bool {
        match (self, wire) {
            (Self::Url(url), Value::String(s)) => url == s,
            (Self::File(path), Value::Object(map)) => {
                map.get("name").and_then(Value::as_str) == Some(file_name(path).as_str())
            }
            _ => false,
        }
    }

    /// Parses a source reported by the frontend.
    ///
    /// Inline file payloads cannot be mapped back to a host path and are
    /// not accepted.
    #[must_use]
    pub fn from_wire(wire: &Value) -> Option<Self> {
        match wire {
            Value::String(url) => Some(Self::Url(url.clone())),
            _ => None,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&str> for DataSource {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for DataSource {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for DataSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

/// Accepts a plain string (URL) or `{"file": "<local path>"}`.
impl<'de> Deserialize<'de> for DataSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Url(String),
            File { file: PathBuf },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Url(url) => Self::Url(url),
            Repr::File { file } => Self::File(file),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_deserialize_forms() {
        let url: DataSource = serde_json::from_value(json!("https://x/mni152.nii.gz")).unwrap();
        assert_eq!(url, DataSource::url("https://x/mni152.nii.gz"));

        let file: DataSource = serde_json::from_value(json!({"file": "/tmp/a.nii"})).unwrap();
        assert_eq!(file, DataSource::file("/tmp/a.nii"));

        assert!(serde_json::from_value::<DataSource>(json!(3)).is_err());
    }

    #[test]
    fn test_file_wire_form() {
        let path = std::env::temp_dir().join(format!("niivue-source-{}.nii", std::process::id()));
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(b"abc"))
            .unwrap();

        let source = DataSource::file(&path);
        let wire = source.to_wire().unwrap();
        assert_eq!(wire["data"], json!("YWJj"));
        assert!(source.matches_wire(&wire));
        assert!(!source.matches_wire(&json!("abc")));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = DataSource::file("/definitely/not/here.nii");
        assert!(source.to_wire().is_err());
    }

    #[test]
    fn test_empty_sentinel() {
        assert!(DataSource::url("").is_empty());
        assert!(!DataSource::url("a").is_empty());
        assert!(!DataSource::file("").is_empty());
    }
}
