//! Error types for tfinspect.
//!
//! Only conditions that stop a load outright are modelled here. Problems
//! found *inside* configuration files are never errors of this type: they are
//! recorded as [`Diagnostic`](crate::diagnostics::Diagnostic)s on the loaded
//! module so that one bad file never hides the rest of a directory.
//!
//! # Error Categories
//!
//! - **Directory errors**: the directory to load is missing or unreadable
//! - **Config errors**: invalid `tfinspect.yaml`
//! - **Report errors**: a renderer failed to produce output
//!
//! # Example
//!
//! ```rust
//! use tfinspect::error::{TfInspectError, Result};
//!
//! fn read(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .map_err(|e| TfInspectError::Io {
//!             path: path.into(),
//!             source: e,
//!             src_path: file!(),
//!             src_line: line!(),
//!         })
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Usage:
/// ```ignore
/// return Err(err!(DirectoryNotFound { path: path.to_path_buf() }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident: $value:expr),* $(,)? }) => {
        $crate::error::TfInspectError::$variant {
            $($field: $value,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for tfinspect operations.
pub type Result<T> = std::result::Result<T, TfInspectError>;

/// The main error type for tfinspect.
#[derive(Error, Debug)]
pub enum TfInspectError {
    // =========================================================================
    // I/O and File System Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Directory not found.
    #[error("Directory not found: {path} ({src_path}:{src_line})")]
    DirectoryNotFound {
        /// The missing directory path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// The path exists but is not a directory.
    #[error("Not a directory: {path} ({src_path}:{src_line})")]
    NotADirectory {
        /// The offending path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Report Errors
    // =========================================================================
    /// Report generation error.
    #[error("Failed to generate report ({src_path}:{src_line}): {message}")]
    ReportGeneration {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },
}

impl TfInspectError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
        src_path: &'static str,
        src_line: u32,
    ) -> Self {
        Self::Io {
            path: path.into(),
            source,
            src_path,
            src_line,
        }
    }

    /// Creates a `ConfigParse` error.
    #[must_use]
    pub fn config_parse(
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        src_path: &'static str,
        src_line: u32,
    ) -> Self {
        Self::ConfigParse {
            message,
            source,
            src_path,
            src_line,
        }
    }

    /// Whether this error means the module directory itself could not be read.
    #[must_use]
    pub fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::DirectoryNotFound { .. } | Self::NotADirectory { .. }
        )
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ReportGeneration { .. } => 2,
            _ => 1,
        }
    }
}

/// Extension trait for `Result` to add context to errors.
pub trait ResultExt<T> {
    /// Adds a file path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| TfInspectError::io(path, e, file!(), line!()))
    }
}

impl From<serde_json::Error> for TfInspectError {
    fn from(source: serde_json::Error) -> Self {
        Self::ReportGeneration {
            message: format!("JSON serialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_err_macro_records_location() {
        let error = crate::err!(DirectoryNotFound {
            path: PathBuf::from("/nope"),
        });
        let message = error.to_string();
        assert!(message.contains("/nope"));
        assert!(message.contains("error.rs"));
    }

    #[test]
    fn test_directory_errors() {
        let missing = crate::err!(DirectoryNotFound {
            path: PathBuf::from("a"),
        });
        let not_dir = crate::err!(NotADirectory {
            path: PathBuf::from("a.tf"),
        });
        let report = crate::err!(ReportGeneration {
            message: "boom".to_string(),
        });

        assert!(missing.is_directory_error());
        assert!(not_dir.is_directory_error());
        assert!(!report.is_directory_error());
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_serialization_failure_is_a_report_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = TfInspectError::from(source);
        assert!(matches!(error, TfInspectError::ReportGeneration { .. }));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_with_path() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let error = result.with_path("main.tf").unwrap_err();
        assert!(matches!(error, TfInspectError::Io { .. }));
        assert!(error.to_string().contains("main.tf"));
    }
}
