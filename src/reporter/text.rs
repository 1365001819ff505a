//! Plain text report generator.

use crate::config::Config;
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::Result;
use crate::reporter::{default_text, ReportGenerator};
use crate::types::{Module, Resource};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::collections::BTreeMap;

/// Text report generator for CLI output.
pub struct TextReporter {
    /// Whether to use colors
    use_colors: bool,
}

impl TextReporter {
    /// Create a new text reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            use_colors: config.output.colored,
        }
    }
}

impl ReportGenerator for TextReporter {
    fn generate(&self, module: &Module) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header(module));
        output.push_str(&self.format_summary(module));

        if !module.variables.is_empty() {
            output.push_str(&self.format_variables(module));
        }
        if !module.outputs.is_empty() {
            output.push_str(&self.format_outputs(module));
        }
        if !module.managed_resources.is_empty() {
            output.push_str(&self.format_resources("Managed Resources", &module.managed_resources));
        }
        if !module.data_resources.is_empty() {
            output.push_str(&self.format_resources("Data Resources", &module.data_resources));
        }
        if !module.module_calls.is_empty() {
            output.push_str(&self.format_module_calls(module));
        }
        if !module.diagnostics.is_empty() {
            output.push_str(&self.format_diagnostics(module));
        }

        output.push_str(&self.format_footer(module));

        Ok(output)
    }
}

impl TextReporter {
    /// Format the report header.
    fn format_header(&self, module: &Module) -> String {
        let title = "tfinspect";
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));

        if self.use_colors {
            format!(
                "\n{} {} {}\n{}\n",
                title.bright_white().bold(),
                version.dimmed(),
                module.path.dimmed(),
                "=".repeat(80).bright_blue(),
            )
        } else {
            format!("\n{title} {version} {}\n{}\n", module.path, "=".repeat(80))
        }
    }

    fn section_title(&self, title: &str) -> String {
        let title = if self.use_colors {
            title.bright_cyan().bold().to_string()
        } else {
            title.to_string()
        };
        format!("\n{title}\n{}\n", "-".repeat(80))
    }

    /// Format the summary section.
    fn format_summary(&self, module: &Module) -> String {
        let mut output = self.section_title("Summary");

        let errors = module.diagnostics.error_count();
        let warnings = module.diagnostics.len() - errors;

        if self.use_colors {
            output.push_str(&format!(
                "  {} {} | {} {}\n",
                errors.to_string().red().bold(),
                if errors == 1 { "Error" } else { "Errors" },
                warnings.to_string().yellow().bold(),
                if warnings == 1 { "Warning" } else { "Warnings" },
            ));
        } else {
            output.push_str(&format!(
                "  {errors} {} | {warnings} {}\n",
                if errors == 1 { "Error" } else { "Errors" },
                if warnings == 1 { "Warning" } else { "Warnings" },
            ));
        }

        output.push_str(&format!(
            "  {} variables | {} outputs | {} resources | {} data resources | {} modules\n",
            module.variables.len(),
            module.outputs.len(),
            module.managed_resources.len(),
            module.data_resources.len(),
            module.module_calls.len(),
        ));

        output
    }

    fn table(header: Vec<&str>) -> Table {
        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);
        table
    }

    fn format_variables(&self, module: &Module) -> String {
        let mut output = self.section_title("Inputs");
        let mut table = Self::table(vec!["Name", "Type", "Default", "Required", "Location"]);

        for variable in module.variables.values() {
            let required = if variable.required { "yes" } else { "no" };
            let required_cell = if self.use_colors && variable.required {
                Cell::new(required).fg(Color::Yellow)
            } else {
                Cell::new(required)
            };
            table.add_row(vec![
                Cell::new(&variable.name),
                Cell::new(variable.type_expr.as_deref().unwrap_or("-")),
                Cell::new(truncate(&default_text(variable.default.as_ref()), 40)),
                required_cell,
                Cell::new(variable.pos.to_string()),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_outputs(&self, module: &Module) -> String {
        let mut output = self.section_title("Outputs");
        let mut table = Self::table(vec!["Name", "Description", "Sensitive", "Location"]);

        for out in module.outputs.values() {
            table.add_row(vec![
                Cell::new(&out.name),
                Cell::new(truncate(out.description.as_deref().unwrap_or("-"), 50)),
                Cell::new(if out.sensitive { "yes" } else { "no" }),
                Cell::new(out.pos.to_string()),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_resources(&self, title: &str, resources: &BTreeMap<String, Resource>) -> String {
        let mut output = self.section_title(title);
        let mut table = Self::table(vec!["Address", "Provider", "Location"]);

        for resource in resources.values() {
            let provider = match &resource.provider.alias {
                Some(alias) => format!("{}.{alias}", resource.provider.name),
                None => resource.provider.name.clone(),
            };
            table.add_row(vec![
                Cell::new(resource.address()),
                Cell::new(provider),
                Cell::new(resource.pos.to_string()),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_module_calls(&self, module: &Module) -> String {
        let mut output = self.section_title("Child Modules");
        let mut table = Self::table(vec!["Name", "Source", "Version", "Location"]);

        for call in module.module_calls.values() {
            let version_cell = match (&call.version, self.use_colors) {
                (Some(version), true) => Cell::new(version).fg(Color::Green),
                (Some(version), false) => Cell::new(version),
                (None, true) => Cell::new("-").fg(Color::DarkGrey),
                (None, false) => Cell::new("-"),
            };
            table.add_row(vec![
                Cell::new(&call.name),
                Cell::new(truncate(&call.source, 50)),
                version_cell,
                Cell::new(call.pos.to_string()),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_diagnostics(&self, module: &Module) -> String {
        let mut output = self.section_title("Problems");
        for diag in &module.diagnostics {
            output.push_str(&self.format_diagnostic(diag));
        }
        output
    }

    /// Format a single diagnostic.
    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let severity = match (diag.severity, self.use_colors) {
            (Severity::Error, true) => "ERROR".red().bold().to_string(),
            (Severity::Error, false) => "ERROR".to_string(),
            (Severity::Warning, true) => "WARNING".yellow().to_string(),
            (Severity::Warning, false) => "WARNING".to_string(),
        };

        let mut output = format!("\n  [{severity}] {}\n", diag.summary);

        if let Some(pos) = &diag.pos {
            let location = format!("    at {pos}");
            if self.use_colors {
                output.push_str(&location.dimmed().to_string());
            } else {
                output.push_str(&location);
            }
            output.push('\n');
        }

        if let Some(detail) = &diag.detail {
            for line in detail.lines() {
                output.push_str(&format!("    {line}\n"));
            }
        }

        output
    }

    /// Format the report footer.
    fn format_footer(&self, module: &Module) -> String {
        let status = if module.has_errors() {
            if self.use_colors {
                "FAILED - Errors found".red().bold().to_string()
            } else {
                "FAILED - Errors found".to_string()
            }
        } else if !module.diagnostics.is_empty() {
            if self.use_colors {
                "PASSED with warnings".yellow().to_string()
            } else {
                "PASSED with warnings".to_string()
            }
        } else {
            "PASSED - No issues found".to_string()
        };

        format!("\n{status}\n\n")
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModuleCall, SourcePos, Variable};

    fn create_test_module() -> Module {
        let mut module = Module::new("./infra");
        module.variables.insert(
            "region".to_string(),
            Variable {
                name: "region".to_string(),
                type_expr: Some("string".to_string()),
                description: None,
                default: None,
                required: true,
                sensitive: false,
                pos: SourcePos::new("variables.tf", 1),
            },
        );
        module.module_calls.insert(
            "vpc".to_string(),
            ModuleCall {
                name: "vpc".to_string(),
                source: "./modules/vpc".to_string(),
                version: None,
                pos: SourcePos::new("main.tf", 3),
            },
        );
        module.diagnostics.push(
            Diagnostic::warning("Quoted type constraints are deprecated")
                .with_detail("Remove the quotes.")
                .at(SourcePos::new("variables.tf", 2)),
        );
        module
    }

    fn plain() -> TextReporter {
        let mut config = Config::default();
        config.output.colored = false;
        TextReporter::new(&config)
    }

    #[test]
    fn test_text_report_generation() {
        let output = plain().generate(&create_test_module()).unwrap();

        assert!(output.contains("tfinspect"));
        assert!(output.contains("./infra"));
        assert!(output.contains("0 Errors | 1 Warning"));
        assert!(output.contains("region"));
        assert!(output.contains("./modules/vpc"));
        assert!(output.contains("[WARNING] Quoted type constraints are deprecated"));
        assert!(output.contains("at variables.tf:2"));
        assert!(output.contains("PASSED with warnings"));
        assert!(!output.contains("Outputs"));
    }

    #[test]
    fn test_footer_reports_errors() {
        let mut module = create_test_module();
        module.diagnostics.push(Diagnostic::error("Failed to read file"));
        let output = plain().generate(&module).unwrap();
        assert!(output.contains("FAILED - Errors found"));
        assert!(output.contains("1 Error | 1 Warning"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long string here", 10), "a very ...");
    }
}
