//! Structured document loading for plans and parameter files
//!
//! The decoder is picked from the file extension: `.yaml`/`.yml`, `.toml` or
//! `.json`. Every format decodes into any serde type, so the same loader reads
//! both the typed [`GenerationPlan`](crate::plan::GenerationPlan) and the
//! free-form parameter document.

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Generic decoded document value; templates render against this
pub type Params = serde_json::Value;

/// Errors that can occur when reading or decoding a document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported document format {extension:?} (expected .yaml, .yml, .toml or .json)")]
    UnsupportedFormat { extension: String },
}

impl DocumentError {
    /// Whether the underlying failure is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Serialization formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Select the format from a file path's extension
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            other => Err(DocumentError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Decode raw bytes in this format
    pub fn deserialize<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, DocumentError> {
        match self {
            Format::Yaml => Ok(serde_yaml::from_slice(bytes)?),
            Format::Toml => Ok(toml::from_str(std::str::from_utf8(bytes)?)?),
            Format::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// Read a file's raw bytes without decoding
pub fn load_bytes(path: &Path) -> Result<Vec<u8>, DocumentError> {
    Ok(std::fs::read(path)?)
}

/// Decode bytes using the format implied by `path`
pub fn from_bytes<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, DocumentError> {
    Format::from_path(path)?.deserialize(bytes)
}

/// Read and decode a document
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    // Reject unknown formats before touching the filesystem
    let format = Format::from_path(path)?;
    let bytes = load_bytes(path)?;
    format.deserialize(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/plan.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("plan.yml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("plan.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::from_path(Path::new("params.json")).unwrap(), Format::Json);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = Format::from_path(Path::new("params.hjson")).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat { ref extension } if extension == "hjson"));
        assert!(Format::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn test_same_document_in_every_format() {
        let expected = json!({"ProjectName": "demo", "Nested": {"Value": 5}});

        let yaml: Params = Format::Yaml
            .deserialize(b"ProjectName: demo\nNested:\n  Value: 5\n")
            .unwrap();
        let toml: Params = Format::Toml
            .deserialize(b"ProjectName = \"demo\"\n[Nested]\nValue = 5\n")
            .unwrap();
        let json: Params = Format::Json
            .deserialize(br#"{"ProjectName": "demo", "Nested": {"Value": 5}}"#)
            .unwrap();

        assert_eq!(yaml, expected);
        assert_eq!(toml, expected);
        assert_eq!(json, expected);
    }

    #[test]
    fn test_invalid_toml_error() {
        let result: Result<Params, _> = Format::Toml.deserialize(b"this is not valid toml {{{{");
        assert!(matches!(result, Err(DocumentError::Toml(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load::<Params>(Path::new("/definitely/not/here/params.yaml")).unwrap_err();
        assert!(err.is_not_found());
    }
}
