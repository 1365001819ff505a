//! JSON report generator.
//!
//! The document is the [`Module`] itself: field names are fixed, absent
//! optional values are `null`, and maps iterate in name order, so the same
//! directory always serializes to the same bytes.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::Module;

/// JSON report generator.
pub struct JsonReporter {
    /// Whether to pretty-print the output
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            pretty: config.output.pretty,
        }
    }
}

impl ReportGenerator for JsonReporter {
    fn generate(&self, module: &Module) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(module)
        } else {
            serde_json::to_string(module)
        };

        let mut json = json?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::types::{SourcePos, Variable, VariableDefault};
    use serde_json::{json, Value};

    fn create_test_module() -> Module {
        let mut module = Module::new("./infra");
        module.variables.insert(
            "region".to_string(),
            Variable {
                name: "region".to_string(),
                type_expr: Some("string".to_string()),
                description: None,
                default: Some(VariableDefault::Known(json!("eu-west-1"))),
                required: false,
                sensitive: false,
                pos: SourcePos::new("variables.tf", 1),
            },
        );
        module
            .diagnostics
            .push(Diagnostic::warning("Quoted type constraints are deprecated"));
        module
    }

    #[test]
    fn test_json_report_generation() {
        let reporter = JsonReporter::new(&Config::default());
        let output = reporter.generate(&create_test_module()).unwrap();

        assert!(output.ends_with("}\n"));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["path"], "./infra");
        assert_eq!(parsed["variables"]["region"]["default"], "eu-west-1");
        assert_eq!(parsed["variables"]["region"]["type"], "string");
        assert!(parsed["variables"]["region"]["description"].is_null());
        assert_eq!(parsed["diagnostics"][0]["severity"], "warning");
        assert!(parsed["diagnostics"][0]["pos"].is_null());
        assert_eq!(parsed["outputs"], json!({}));
    }

    #[test]
    fn test_compact_output() {
        let mut config = Config::default();
        config.output.pretty = false;
        let output = JsonReporter::new(&config)
            .generate(&create_test_module())
            .unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_output_is_stable() {
        let reporter = JsonReporter::new(&Config::default());
        let module = create_test_module();
        assert_eq!(
            reporter.generate(&module).unwrap(),
            reporter.generate(&module.clone()).unwrap()
        );
    }
}
