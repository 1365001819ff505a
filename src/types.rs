//! Core data types used throughout tfinspect.
//!
//! This module defines the in-memory representation handed to renderers:
//! - the aggregated [`Module`] for one configuration directory
//! - its declarations (variables, outputs, resources, module calls, providers)
//! - source positions and report formats
//!
//! Every entity is created once during a load and never mutated afterwards.
//! Field names are part of the machine-readable output and stay stable;
//! optional fields serialize as `null` rather than being omitted.

use crate::diagnostics::Diagnostics;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A position in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    /// File name relative to the loaded directory
    pub filename: String,
    /// 1-based line number
    pub line: usize,
}

impl SourcePos {
    /// Create a position.
    pub fn new(filename: impl Into<String>, line: usize) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

/// The aggregated result of loading one configuration directory.
///
/// Maps are keyed by declaration name (`type.name` for resources) and iterate
/// in name order, so renderers can walk them deterministically.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Module {
    /// The directory as given to the loader
    pub path: String,
    /// Input variables
    pub variables: BTreeMap<String, Variable>,
    /// Output values
    pub outputs: BTreeMap<String, Output>,
    /// `terraform { required_version }` constraints in processing order
    pub required_core: Vec<String>,
    /// `terraform { required_providers }` entries merged across files
    pub required_providers: BTreeMap<String, RequiredProvider>,
    /// `provider` blocks, keyed by `name` or `name.alias`
    pub provider_configs: BTreeMap<String, ProviderConfig>,
    /// `resource` blocks
    pub managed_resources: BTreeMap<String, Resource>,
    /// `data` blocks
    pub data_resources: BTreeMap<String, Resource>,
    /// `module` blocks
    pub module_calls: BTreeMap<String, ModuleCall>,
    /// Everything that went wrong, in processing order
    pub diagnostics: Diagnostics,
}

impl Module {
    /// Create an empty module for the given directory.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// True iff any diagnostic has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Total number of declarations across all kinds.
    #[must_use]
    pub fn declaration_count(&self) -> usize {
        self.variables.len()
            + self.outputs.len()
            + self.managed_resources.len()
            + self.data_resources.len()
            + self.module_calls.len()
            + self.provider_configs.len()
    }
}

/// An input variable declaration.
///
/// # Example HCL
///
/// ```hcl
/// variable "region" {
///   type        = string
///   description = "AWS region"
///   default     = "eu-west-1"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    /// The variable name (block label)
    pub name: String,
    /// Type constraint as written, not evaluated
    #[serde(rename = "type")]
    pub type_expr: Option<String>,
    /// Human-readable description
    pub description: Option<String>,
    /// Default value; `None` when the `default` argument is absent
    pub default: Option<VariableDefault>,
    /// True iff no `default` argument is present
    pub required: bool,
    /// Whether the value is marked sensitive
    pub sensitive: bool,
    /// Where the block starts
    pub pos: SourcePos,
}

/// The value of a `default` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableDefault {
    /// A literal value decoded into canonical form.
    Known(serde_json::Value),
    /// An expression that was present but not evaluated; holds its source text.
    Unknown(String),
}

impl VariableDefault {
    /// The decoded literal, if the default was a literal.
    #[must_use]
    pub fn as_known(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown(_) => None,
        }
    }
}

impl Serialize for VariableDefault {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unknown(_) => serializer.serialize_none(),
        }
    }
}

/// An output value declaration. The value expression is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    /// The output name (block label)
    pub name: String,
    /// Human-readable description
    pub description: Option<String>,
    /// Whether the value is marked sensitive
    pub sensitive: bool,
    /// Where the block starts
    pub pos: SourcePos,
}

/// Whether a resource block is `resource` or `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// `resource` block
    Managed,
    /// `data` block
    Data,
}

/// A managed or data resource declaration. Provider-specific arguments are
/// not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Managed or data
    pub mode: ResourceMode,
    /// Resource type (first label)
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name (second label)
    pub name: String,
    /// Provider configuration the resource belongs to
    pub provider: ProviderRef,
    /// Where the block starts
    pub pos: SourcePos,
}

impl Resource {
    /// Map key used in [`Module`]: `type.name`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Address as written in references: `type.name` or `data.type.name`.
    #[must_use]
    pub fn address(&self) -> String {
        match self.mode {
            ResourceMode::Managed => self.key(),
            ResourceMode::Data => format!("data.{}", self.key()),
        }
    }
}

/// Reference to a provider configuration (`aws` or `aws.west`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRef {
    /// Provider local name
    pub name: String,
    /// Configuration alias
    pub alias: Option<String>,
}

impl ProviderRef {
    /// Parse `name` or `name.alias`.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        match reference.split_once('.') {
            Some((name, alias)) => Self {
                name: name.to_string(),
                alias: Some(alias.to_string()),
            },
            None => Self {
                name: reference.to_string(),
                alias: None,
            },
        }
    }

    /// Provider implied by a resource type: the prefix before the first `_`.
    #[must_use]
    pub fn implied_by(resource_type: &str) -> Self {
        let name = resource_type
            .split_once('_')
            .map_or(resource_type, |(prefix, _)| prefix);
        Self {
            name: name.to_string(),
            alias: None,
        }
    }
}

/// A nested module call.
///
/// # Example HCL
///
/// ```hcl
/// module "vpc" {
///   source  = "terraform-aws-modules/vpc/aws"
///   version = "~> 5.0"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleCall {
    /// The module call's local name (block label)
    pub name: String,
    /// The `source` argument, as written
    pub source: String,
    /// The `version` constraint, as written
    pub version: Option<String>,
    /// Where the block starts
    pub pos: SourcePos,
}

/// A `provider` configuration block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    /// Provider local name
    pub name: String,
    /// The `alias` argument
    pub alias: Option<String>,
    /// Where the block starts
    pub pos: SourcePos,
}

impl ProviderConfig {
    /// Map key used in [`Module`]: `name` or `name.alias`.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{alias}", self.name),
            None => self.name.clone(),
        }
    }
}

/// One entry of `terraform { required_providers { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredProvider {
    /// Registry source address (e.g. `hashicorp/aws`)
    pub source: Option<String>,
    /// Version constraints, one per declaring block
    pub version_constraints: Vec<String>,
}

/// Report output format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown tables
    #[default]
    Markdown,
    /// JSON document
    Json,
    /// Plain text tables
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("aws", "aws", None ; "bare name")]
    #[test_case("aws.west", "aws", Some("west") ; "with alias")]
    fn test_provider_ref_parse(input: &str, name: &str, alias: Option<&str>) {
        let reference = ProviderRef::parse(input);
        assert_eq!(reference.name, name);
        assert_eq!(reference.alias.as_deref(), alias);
    }

    #[test_case("aws_instance", "aws" ; "prefixed type")]
    #[test_case("null_resource", "null" ; "null provider")]
    #[test_case("terraform", "terraform" ; "no underscore")]
    fn test_implied_provider(resource_type: &str, expected: &str) {
        assert_eq!(ProviderRef::implied_by(resource_type).name, expected);
    }

    #[test]
    fn test_resource_address() {
        let resource = Resource {
            mode: ResourceMode::Data,
            resource_type: "aws_ami".to_string(),
            name: "ubuntu".to_string(),
            provider: ProviderRef::implied_by("aws_ami"),
            pos: SourcePos::new("main.tf", 1),
        };
        assert_eq!(resource.key(), "aws_ami.ubuntu");
        assert_eq!(resource.address(), "data.aws_ami.ubuntu");
    }

    #[test]
    fn test_unknown_default_serializes_as_null() {
        let variable = Variable {
            name: "region".to_string(),
            type_expr: None,
            description: None,
            default: Some(VariableDefault::Unknown("var.other".to_string())),
            required: false,
            sensitive: false,
            pos: SourcePos::new("main.tf", 1),
        };
        let json = serde_json::to_value(&variable).unwrap();
        assert!(json["default"].is_null());
        assert_eq!(json["required"], false);
        assert!(json["type"].is_null());
    }

    #[test]
    fn test_empty_module_serializes_every_field() {
        let json = serde_json::to_value(Module::new("./infra")).unwrap();
        for field in [
            "path",
            "variables",
            "outputs",
            "required_core",
            "required_providers",
            "provider_configs",
            "managed_resources",
            "data_resources",
            "module_calls",
            "diagnostics",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }
}
