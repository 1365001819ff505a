//! Report generation module.
//!
//! This module renders a loaded [`Module`] in multiple formats:
//! - Markdown: Inputs/Outputs tables and resource lists for documentation
//! - JSON: Machine-readable structured output with a fixed schema
//! - Text: Human-readable CLI output
//!
//! # Example
//!
//! ```rust,no_run
//! use tfinspect::reporter::Reporter;
//! use tfinspect::{Config, Loader, ReportFormat};
//!
//! let config = Config::default();
//! let module = Loader::new(&config).load("./infra")?;
//! let reporter = Reporter::new(&config);
//!
//! let markdown = reporter.generate(&module, ReportFormat::Markdown)?;
//! let json = reporter.generate(&module, ReportFormat::Json)?;
//! # Ok::<(), tfinspect::TfInspectError>(())
//! ```

mod json;
mod markdown;
mod text;

use crate::config::Config;
use crate::error::Result;
use crate::types::{Module, ReportFormat, VariableDefault};

pub use json::JsonReporter;
pub use markdown::MarkdownReporter;
pub use text::TextReporter;

/// Report generator that supports multiple output formats.
pub struct Reporter {
    config: Config,
}

impl Reporter {
    /// Create a new reporter with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Generate a report in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    pub fn generate(&self, module: &Module, format: ReportFormat) -> Result<String> {
        tracing::debug!(format = ?format, "Generating report");
        match format {
            ReportFormat::Markdown => MarkdownReporter::new(&self.config).generate(module),
            ReportFormat::Json => JsonReporter::new(&self.config).generate(module),
            ReportFormat::Text => TextReporter::new(&self.config).generate(module),
        }
    }
}

/// Trait for report generators.
pub trait ReportGenerator {
    /// Render a loaded module.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    fn generate(&self, module: &Module) -> Result<String>;
}

/// Display form of a variable default: strings bare, other literals as
/// compact JSON, empty when absent or unknown.
pub(crate) fn default_text(default: Option<&VariableDefault>) -> String {
    match default.and_then(VariableDefault::as_known) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(None, "" ; "absent")]
    #[test_case(Some(VariableDefault::Known(json!(null))), "" ; "null")]
    #[test_case(Some(VariableDefault::Known(json!("eu-west-1"))), "eu-west-1" ; "string")]
    #[test_case(Some(VariableDefault::Known(json!(3))), "3" ; "number")]
    #[test_case(Some(VariableDefault::Known(json!(["a", "b"]))), "[\"a\",\"b\"]" ; "list")]
    #[test_case(Some(VariableDefault::Unknown("var.x".to_string())), "" ; "unknown")]
    fn test_default_text(default: Option<VariableDefault>, expected: &str) {
        assert_eq!(default_text(default.as_ref()), expected);
    }
}
