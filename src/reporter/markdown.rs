//! Markdown report generator.
//!
//! Produces an "Inputs" table (always present, possibly empty), followed by
//! the outputs, resources, child modules and problems sections when they
//! have content.

use crate::config::{Config, ReportOptions};
use crate::diagnostics::Severity;
use crate::error::Result;
use crate::reporter::{default_text, ReportGenerator};
use crate::types::Module;
use regex::Regex;

/// Markdown report generator.
pub struct MarkdownReporter {
    report: ReportOptions,
}

impl MarkdownReporter {
    /// Create a new markdown reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            report: config.report.clone(),
        }
    }
}

impl ReportGenerator for MarkdownReporter {
    fn generate(&self, module: &Module) -> Result<String> {
        let newlines = Regex::new(r"\r?\n").map_err(|e| {
            crate::err!(ReportGeneration {
                message: format!("Failed to build markdown renderer: {e}"),
            })
        })?;
        let one_line = |text: &str| newlines.replace_all(text, "<br />").into_owned();

        let mut output = String::new();

        output.push_str("\n## Inputs\n");
        output.push_str("| Name | Description | Type | Default | Required |\n");
        output.push_str("|------|-------------|:----:|:-----:|:-----:|\n");
        for variable in module.variables.values() {
            if self.report.hides_variables_from(&variable.pos.filename) {
                continue;
            }
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                tt(&variable.name),
                variable.description.as_deref().map(one_line).unwrap_or_default(),
                variable.type_expr.as_deref().unwrap_or_default(),
                tt(&default_text(variable.default.as_ref())),
                if variable.required { "yes" } else { "no" },
            ));
        }

        if !module.outputs.is_empty() {
            output.push_str("\n## Outputs\n");
            output.push_str("| Name | Description |\n");
            output.push_str("|------|-------------|\n");
            for out in module.outputs.values() {
                output.push_str(&format!(
                    "| {} | {} |\n",
                    tt(&out.name),
                    out.description.as_deref().map(one_line).unwrap_or_default(),
                ));
            }
        }

        if !module.managed_resources.is_empty() {
            output.push_str(&heading("Managed Resources"));
            for resource in module.managed_resources.values() {
                output.push_str(&format!("* {}\n", tt(&resource.address())));
            }
        }

        if !module.data_resources.is_empty() {
            output.push_str(&heading("Data Resources"));
            for resource in module.data_resources.values() {
                output.push_str(&format!("* {}\n", tt(&resource.address())));
            }
        }

        if !module.module_calls.is_empty() {
            output.push_str(&heading("Child Modules"));
            for call in module.module_calls.values() {
                output.push_str(&format!("* {} from {}", tt(&call.name), tt(&call.source)));
                if let Some(version) = &call.version {
                    output.push_str(&format!(" ({})", tt(version)));
                }
                output.push('\n');
            }
        }

        if !module.diagnostics.is_empty() {
            output.push_str(&format!("\nProblems\n{RULE}\n"));
            for diag in &module.diagnostics {
                let label = match diag.severity {
                    Severity::Error => "Error: ",
                    Severity::Warning => "Warning: ",
                };
                output.push_str(&format!("\n{label}{}\n", diag.summary));
                if let Some(pos) = &diag.pos {
                    output.push_str(&format!(
                        "{RULE}\n\n(at {} line {})\n",
                        tt(&pos.filename),
                        pos.line
                    ));
                }
                if let Some(detail) = &diag.detail {
                    output.push_str(&format!("\n{detail}\n"));
                }
            }
        }

        Ok(output)
    }
}

/// Underline for the problems section and each problem summary.
const RULE: &str = "-------------";

/// Inline code span.
fn tt(text: &str) -> String {
    format!("`{text}`")
}

/// Setext-style heading preceded by a blank line.
fn heading(title: &str) -> String {
    format!("\n{title}\n{}\n", "-".repeat(title.len()))
}
