//! Configuration module for tfinspect.
//!
//! This module handles loading configuration from:
//! - YAML configuration files (`tfinspect.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # tfinspect.yaml
//!
//! # Scanning options
//! scan:
//!   exclude_patterns:
//!     - "generated_*.tf"
//!   parallel: true
//!
//! # Output options
//! output:
//!   format: markdown
//!   colored: true
//!   pretty: true
//!
//! # Report options
//! report:
//!   hidden_variable_files:
//!     - environment.tf.json
//!     - ${EXTRA_HIDDEN_FILE}  # Environment variable expansion
//! ```

use crate::error::{Result, TfInspectError};
use crate::types::ReportFormat;
use serde::{Deserialize, Serialize};

/// Scanning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// File name patterns to leave out (glob patterns).
    pub exclude_patterns: Vec<String>,

    /// Parse files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            parallel: true,
        }
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Report format.
    pub format: ReportFormat,

    /// Use colored output.
    pub colored: bool,

    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            colored: true,
            pretty: true,
        }
    }
}

/// Report content options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// File name suffixes whose variables are left out of the markdown
    /// inputs table. These files hold values injected by the deployment
    /// environment rather than real inputs.
    pub hidden_variable_files: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            hidden_variable_files: vec![
                "environment.tf.json".to_string(),
                "global-variables.tf.json".to_string(),
                "account-variables.tf.json".to_string(),
            ],
        }
    }
}

impl ReportOptions {
    /// Whether variables declared in `filename` are left out of the inputs table.
    #[must_use]
    pub fn hides_variables_from(&self, filename: &str) -> bool {
        self.hidden_variable_files
            .iter()
            .any(|suffix| filename.ends_with(suffix.as_str()))
    }
}

/// Main configuration structure with nested sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanning options
    pub scan: ScanOptions,

    /// Output options
    pub output: OutputOptions,

    /// Report options
    pub report: ReportOptions,
}

impl Config {
    /// File names looked up in the working directory when no explicit
    /// configuration file is given.
    pub const DEFAULT_FILES: [&'static str; 3] =
        ["tfinspect.yaml", "tfinspect.yml", ".tfinspect.yaml"];

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content);

        // An empty or comment-only file is the default configuration.
        if expanded.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&expanded).map_err(|e| {
            TfInspectError::config_parse(e.to_string(), Some(Box::new(e)), file!(), line!())
        })?;

        tracing::debug!(
            exclude_patterns = config.scan.exclude_patterns.len(),
            parallel = config.scan.parallel,
            format = ?config.output.format,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::Cli) {
        if let Some(format) = args.effective_format() {
            self.output.format = format;
        }
        if args.no_color {
            self.output.colored = false;
        }
        if !args.exclude_patterns.is_empty() {
            self.scan
                .exclude_patterns
                .extend(args.exclude_patterns.iter().cloned());
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let Ok(pattern) = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
    else {
        return content.to_string();
    };

    pattern
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.scan.parallel);
        assert!(config.scan.exclude_patterns.is_empty());
        assert_eq!(config.output.format, ReportFormat::Markdown);
        assert!(config.output.colored);
        assert_eq!(config.report.hidden_variable_files.len(), 3);
    }

    #[test]
    fn test_config_from_yaml_nested() {
        let yaml = r#"
scan:
  exclude_patterns:
    - "generated_*"
  parallel: false
output:
  format: json
  colored: false
report:
  hidden_variable_files: []
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.scan.exclude_patterns, vec!["generated_*"]);
        assert!(!config.scan.parallel);
        assert_eq!(config.output.format, ReportFormat::Json);
        assert!(!config.output.colored);
        assert!(config.output.pretty);
        assert!(config.report.hidden_variable_files.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("output:\n  pretty: false\n").unwrap();
        assert!(!config.output.pretty);
        assert!(config.output.colored);
        assert!(config.scan.parallel);
        assert_eq!(config.report.hidden_variable_files.len(), 3);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("# nothing configured\n\n").unwrap();
        assert!(config.scan.parallel);
    }

    #[test]
    fn test_invalid_yaml() {
        let error = Config::from_yaml("scan: [unclosed").unwrap_err();
        assert!(matches!(error, TfInspectError::ConfigParse { .. }));

        let error = Config::from_yaml("output:\n  format: html\n").unwrap_err();
        assert!(matches!(error, TfInspectError::ConfigParse { .. }));
    }

    #[test]
    fn test_env_var_expansion() {
        // PATH is set in any test environment; the unset name stays as written.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("a: ${PATH}"), format!("a: {path}"));
        assert_eq!(expand_env_vars("a: $PATH"), format!("a: {path}"));
        assert_eq!(
            expand_env_vars("a: ${TFINSPECT_SURELY_UNSET_VARIABLE}"),
            "a: ${TFINSPECT_SURELY_UNSET_VARIABLE}"
        );
        assert_eq!(expand_env_vars("no vars here"), "no vars here");
    }

    #[test]
    fn test_hidden_variable_files() {
        let report = ReportOptions::default();
        assert!(report.hides_variables_from("environment.tf.json"));
        assert!(report.hides_variables_from("prod-account-variables.tf.json"));
        assert!(!report.hides_variables_from("variables.tf"));
    }
}
