//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap.
//!
//! # Example Usage
//!
//! ```bash
//! # Markdown summary of the current directory
//! tfinspect
//!
//! # JSON document for another directory
//! tfinspect --json ./infra
//!
//! # Text tables written to a file, skipping generated files
//! tfinspect ./infra --format text --exclude 'generated_*' --output report.txt
//! ```

use crate::types::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

/// tfinspect - summarize the declarations of a Terraform/OpenTofu module.
#[derive(Parser, Debug)]
#[command(
    name = "tfinspect",
    author,
    version,
    about = "Summarize the variables, outputs, resources and module calls of a Terraform/OpenTofu module",
    long_about = "tfinspect reads the configuration files of one directory, in the native or \
                  JSON syntax, without evaluating expressions, and reports what they declare \
                  along with any problems found. The exit status is 1 when any error-severity \
                  problem was found."
)]
pub struct Cli {
    /// Directory containing the configuration files
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Produce JSON output (shorthand for --format json)
    #[arg(long, conflicts_with = "format")]
    pub json: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// File name patterns to skip (glob patterns)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Path to configuration file
    #[arg(short, long, env = "TFINSPECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// The format requested on the command line, if any.
    #[must_use]
    pub fn effective_format(&self) -> Option<ReportFormat> {
        if self.json {
            Some(ReportFormat::Json)
        } else {
            self.format
        }
    }
}
