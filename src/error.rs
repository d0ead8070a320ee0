//! Error types for plan loading, template rendering and output commits

use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;

/// Errors that can occur anywhere in the generation pipeline
///
/// Setup failures (`ConfigLoad`, `UnrecognizedEngine`) abort a run before any
/// filesystem mutation. Everything else is collected per file so that one run
/// reports every independent problem.
#[derive(Debug, Error)]
pub enum SproutError {
    /// The plan or parameter document could not be read or decoded
    #[error("error loading {}: {source}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// No engine factory is registered for the plan's template extension
    #[error("unrecognized template type {extension:?} in config")]
    UnrecognizedEngine { extension: String },

    /// A template body failed to parse
    #[error("error parsing template {name:?}: {message}")]
    TemplateParse { name: String, message: String },

    /// A template failed while rendering (missing key, type mismatch, ...)
    #[error("error executing template {name:?}: {message}")]
    TemplateExecution { name: String, message: String },

    /// Render was requested for a name that was never registered
    #[error("template {name:?} was rendered before being registered")]
    TemplateNotRegistered { name: String },

    /// Two sources resolved to the same output path
    #[error("at least two template files map to the same output location: {}", path.display())]
    OutputCollision { path: PathBuf },

    /// An output path that resolves outside the output root
    #[error("output path {} escapes the output root", path.display())]
    OutsideOutputRoot { path: PathBuf },

    /// An input directory yielded no files
    #[error("no input files found in {}", dir.display())]
    NoInputFiles { dir: PathBuf },

    /// A create, read, write or remove failed
    #[error("failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A digest line pointing outside the output root
    #[error("refusing to remove digest entry {entry:?}: {reason}")]
    UnsafeDigestEntry { entry: String, reason: String },
}

impl SproutError {
    /// Create a filesystem error for the given action and path
    pub fn filesystem(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    /// Create a template parse error
    pub fn parse(name: impl Into<String>, message: impl ToString) -> Self {
        Self::TemplateParse {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a template execution error
    pub fn execution(name: impl Into<String>, message: impl ToString) -> Self {
        Self::TemplateExecution {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// One `Error: ...` line per error
pub fn format_errors(errors: &[SproutError]) -> String {
    errors
        .iter()
        .map(|e| format!("Error: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_message_names_path() {
        let err = SproutError::OutputCollision {
            path: PathBuf::from("out/src/main.rs"),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"at least two template files map to the same output location: out/src/main.rs"
        );
    }

    #[test]
    fn test_filesystem_message() {
        let err = SproutError::filesystem(
            "write",
            "out/a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to write out/a.txt: denied");
    }

    #[test]
    fn test_format_errors_one_per_line() {
        let errors = vec![
            SproutError::parse("a.hbs", "unclosed block"),
            SproutError::execution("b.hbs", "missing field"),
        ];
        let text = format_errors(&errors);
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|line| line.starts_with("Error: ")));
        assert!(text.contains("\"a.hbs\""));
    }
}
