//! # tfinspect
//!
//! A static inspector for Terraform/OpenTofu configuration directories.
//!
//! tfinspect reads every configuration file of one directory, in either the
//! native block syntax or the JSON syntax, and builds a summary of what it
//! declares without evaluating any expression.
//!
//! ## Features
//!
//! - **Both syntaxes**: `*.tf` and `*.tf.json` files produce the same model
//! - **Best-effort loading**: malformed blocks and files become diagnostics,
//!   the rest of the directory is still reported
//! - **Override files**: `override.tf` and `*_override.tf` are merged
//!   attribute by attribute
//! - **Deterministic output**: the same directory always yields the same
//!   module, whether files are parsed in parallel or not
//! - **Multiple output formats**: Markdown, JSON and plain text reports
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfinspect::{Config, Loader, ReportFormat};
//! use tfinspect::reporter::Reporter;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let module = Loader::new(&config).load("./infra")?;
//!
//!     let report = Reporter::new(&config).generate(&module, ReportFormat::Markdown)?;
//!     println!("{report}");
//!
//!     if module.has_errors() {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all, missing_docs, rust_2018_idioms)]

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod reporter;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Result, TfInspectError};
pub use types::{
    Module, ModuleCall, Output, ProviderRef, ReportFormat, Resource, ResourceMode, SourcePos,
    Variable, VariableDefault,
};

use aggregator::ModuleBuilder;
use parser::FileUnit;
use rayon::prelude::*;
use std::path::Path;

/// Loads configuration directories into [`Module`]s.
///
/// The `Loader` is the primary entry point for using tfinspect as a library.
/// It handles:
/// - Selecting the configuration files of a directory
/// - Parsing them, in parallel when configured
/// - Aggregating the results in a fixed order
///
/// # Example
///
/// ```rust,no_run
/// use tfinspect::{Config, Loader};
///
/// let loader = Loader::new(&Config::default());
/// let module = loader.load("./infra")?;
/// println!("{} variables", module.variables.len());
/// # Ok::<(), tfinspect::TfInspectError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Loader {
    config: Config,
}

impl Loader {
    /// Create a new loader with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Load one configuration directory.
    ///
    /// Problems in the files themselves are recorded in
    /// [`Module::diagnostics`]; they never make this call fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist, is not a directory,
    /// or cannot be listed.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Module> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading configuration directory");

        let classified = parser::classify_directory(path, &self.config.scan)?;

        let units: Vec<FileUnit> = if self.config.scan.parallel {
            classified.files.par_iter().map(parser::parse_file).collect()
        } else {
            classified.files.iter().map(parser::parse_file).collect()
        };

        let mut builder = ModuleBuilder::new(path.display().to_string());
        builder.add_diagnostics(classified.diagnostics);
        for unit in units {
            builder.add_file(unit);
        }
        let module = builder.finish();

        tracing::info!(
            files = classified.files.len(),
            declarations = module.declaration_count(),
            diagnostics = module.diagnostics.len(),
            errors = module.diagnostics.error_count(),
            "Loaded configuration directory"
        );

        Ok(module)
    }
}

/// Load a directory with the default configuration.
///
/// Always returns a module: when the directory itself cannot be read, the
/// module is empty and the status carries the error.
///
/// # Example
///
/// ```rust,no_run
/// let (module, status) = tfinspect::load_module("./does-not-exist");
/// assert!(status.is_err());
/// assert!(module.variables.is_empty());
/// ```
pub fn load_module<P: AsRef<Path>>(path: P) -> (Module, Result<()>) {
    let path = path.as_ref();
    match Loader::new(&Config::default()).load(path) {
        Ok(module) => (module, Ok(())),
        Err(e) => (Module::new(path.display().to_string()), Err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parallel_and_sequential_agree() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            fs::write(
                dir.path().join(format!("file{i}.tf")),
                format!("variable \"v{i}\" {{}}\nvariable \"shared\" {{\n  default = {i}\n}}\n"),
            )
            .unwrap();
        }

        let mut config = Config::default();
        let parallel = Loader::new(&config).load(dir.path()).unwrap();
        config.scan.parallel = false;
        let sequential = Loader::new(&config).load(dir.path()).unwrap();

        assert_eq!(
            serde_json::to_string(&parallel).unwrap(),
            serde_json::to_string(&sequential).unwrap()
        );
        assert_eq!(parallel.variables.len(), 9);
        assert_eq!(parallel.diagnostics.len(), 7);
    }

    #[test]
    fn test_load_module_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (module, status) = load_module(dir.path().join("missing"));
        assert!(status.unwrap_err().is_directory_error());
        assert_eq!(module.declaration_count(), 0);
        assert!(module.diagnostics.is_empty());
    }
}
