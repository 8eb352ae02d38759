//! Unified error types for edmkey
//!
//! Error strategy:
//! - Per-file errors (decode, analysis): recoverable in batch mode, skip and continue
//! - Configuration and input errors: fatal, abort the run before any processing
//! - Classifier errors (dataset, dimensionality, lifecycle): fatal, abort prediction
//!
//! Silence is not an error. It is a regular [`crate::types::KeyOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "WAV, MP3, FLAC, AIFF, OGG";

/// Top-level error type for edmkey operations
#[derive(Debug, Error)]
pub enum EdmkeyError {
    // =========================================================================
    // Recoverable errors - skip file, continue batch
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Analysis failed for '{path}': {reason}")]
    AnalysisError { path: PathBuf, reason: String },

    // =========================================================================
    // Input errors - reported before anything is processed
    // =========================================================================
    #[error("Could not find '{0}'\n  Tip: Check the path is a valid filename")]
    FileNotFound(PathBuf),

    #[error("Output '{0}' is an existing file\n  Tip: In batch mode the output argument must be a directory")]
    OutputIsFile(PathBuf),

    #[error("'{0}' is not a directory\n  Tip: Batch input and classifier output paths must be existing directories")]
    NotADirectory(PathBuf),

    // =========================================================================
    // Configuration errors - fatal
    // =========================================================================
    #[error("Invalid output path '{0}': not an absolute path name")]
    InvalidOutputPath(PathBuf),

    #[error("Unknown key profile '{name}'\n  Available profiles: {available}")]
    UnknownProfile { name: String, available: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    // =========================================================================
    // Classifier errors - fatal
    // =========================================================================
    #[error("Failed to load dataset '{path}': {reason}")]
    DatasetError { path: PathBuf, reason: String },

    #[error("Feature dimensionality mismatch: classifier expects {expected} values per row, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Classifier has not been trained\n  Tip: Call fit() with a labeled dataset before predicting")]
    NotTrained,

    // =========================================================================
    // Output errors - fatal
    // =========================================================================
    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for edmkey operations
pub type Result<T> = std::result::Result<T, EdmkeyError>;

impl EdmkeyError {
    /// Returns true if this error is recoverable (should skip file, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EdmkeyError::DecodeError { .. } | EdmkeyError::AnalysisError { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EdmkeyError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a dataset error for a tabular input file
    pub fn dataset_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EdmkeyError::DatasetError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        EdmkeyError::OutputError { path, reason }
    }
}

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error about which file was being processed
    fn with_file_context(self, path: &std::path::Path) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn with_file_context(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| match e {
            EdmkeyError::AnalysisError { reason, .. } => EdmkeyError::AnalysisError {
                path: path.to_path_buf(),
                reason,
            },
            EdmkeyError::DecodeError { reason, .. } => EdmkeyError::DecodeError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_recoverable_classification() {
        assert!(EdmkeyError::decode_error("a.wav", "bad header").is_recoverable());
        assert!(!EdmkeyError::OutputIsFile(PathBuf::from("/tmp/out")).is_recoverable());
        assert!(!EdmkeyError::ConfigError("scope".into()).is_recoverable());
        assert!(!EdmkeyError::NotTrained.is_recoverable());
    }

    #[test]
    fn test_file_context_rewrites_path() {
        let result: Result<()> = Err(EdmkeyError::AnalysisError {
            path: PathBuf::new(),
            reason: "frame size".into(),
        });
        match result.with_file_context(Path::new("/music/a.wav")) {
            Err(EdmkeyError::AnalysisError { path, reason }) => {
                assert_eq!(path, PathBuf::from("/music/a.wav"));
                assert_eq!(reason, "frame size");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
