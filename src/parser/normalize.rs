//! Extraction of the fixed attribute set of each declaration kind.
//!
//! Values are decoded only as far as they are literals. Anything else is kept
//! as source text (`type`, `description`, `source`, ...) or treated as present
//! but unknown (`default`), never rejected for being an expression.

use crate::diagnostics::Diagnostic;
use crate::parser::schema::DeclKind;
use crate::parser::{AttrValue, RawAttribute, RawBlock};
use crate::types::{
    ModuleCall, Output, ProviderConfig, ProviderRef, RequiredProvider, Resource, ResourceMode,
    SourcePos, Variable, VariableDefault,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Names of the arguments written in a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet(BTreeSet<String>);

impl AttributeSet {
    /// Whether the argument was written.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    fn insert(&mut self, name: &str) -> bool {
        self.0.insert(name.to_string())
    }
}

/// `terraform` block settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The `required_version` constraint
    pub required_core: Option<String>,
    /// Entries of nested `required_providers` blocks
    pub required_providers: BTreeMap<String, RequiredProvider>,
    /// Where the block starts
    pub pos: SourcePos,
}

/// One normalized declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Variable(Variable),
    Output(Output),
    ManagedResource(Resource),
    DataResource(Resource),
    ModuleCall(ModuleCall),
    ProviderConfig(ProviderConfig),
    Settings(Settings),
}

impl Declaration {
    /// Where the declaring block starts.
    #[must_use]
    pub fn pos(&self) -> &SourcePos {
        match self {
            Self::Variable(v) => &v.pos,
            Self::Output(o) => &o.pos,
            Self::ManagedResource(r) | Self::DataResource(r) => &r.pos,
            Self::ModuleCall(m) => &m.pos,
            Self::ProviderConfig(p) => &p.pos,
            Self::Settings(s) => &s.pos,
        }
    }
}

/// A declaration together with the arguments its block wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The extracted declaration
    pub declaration: Declaration,
    /// Arguments present in the block, used for attribute-wise overrides
    pub present: AttributeSet,
    /// A required argument is missing. Override blocks may omit it, so the
    /// aggregator decides whether this is reported.
    pub incomplete: Option<Diagnostic>,
}

/// Normalize a block already matched to `kind`.
///
/// Returns the declaration, if the block was usable, and the diagnostics it
/// produced. An error diagnostic always means the declaration is `None`.
#[must_use]
pub fn normalize(kind: DeclKind, block: &RawBlock) -> (Option<Normalized>, Vec<Diagnostic>) {
    let mut reader = BodyReader::new(block);
    let present = match reader.check_unique() {
        Ok(present) => present,
        Err(problem) => return (None, vec![problem]),
    };

    let declaration = match kind {
        DeclKind::Variable => reader.variable().map(Declaration::Variable),
        DeclKind::Output => reader.output().map(Declaration::Output),
        DeclKind::ManagedResource => reader
            .resource(ResourceMode::Managed)
            .map(Declaration::ManagedResource),
        DeclKind::DataResource => reader
            .resource(ResourceMode::Data)
            .map(Declaration::DataResource),
        DeclKind::ModuleCall => reader.module_call().map(Declaration::ModuleCall),
        DeclKind::Provider => reader.provider().map(Declaration::ProviderConfig),
        DeclKind::Terraform => reader.settings().map(Declaration::Settings),
        DeclKind::Locals => return (None, Vec::new()),
    };

    let mut diagnostics = reader.warnings;
    match declaration {
        Ok(declaration) => {
            let normalized = Normalized {
                declaration,
                present,
                incomplete: reader.incomplete,
            };
            (Some(normalized), diagnostics)
        }
        Err(problem) => {
            tracing::debug!(pos = %block.pos, summary = %problem.summary, "Dropping block");
            diagnostics.push(problem);
            (None, diagnostics)
        }
    }
}

type Extract<T> = std::result::Result<T, Diagnostic>;

struct BodyReader<'a> {
    block: &'a RawBlock,
    warnings: Vec<Diagnostic>,
    incomplete: Option<Diagnostic>,
}

impl<'a> BodyReader<'a> {
    fn new(block: &'a RawBlock) -> Self {
        Self {
            block,
            warnings: Vec::new(),
            incomplete: None,
        }
    }

    fn label(&self, index: usize) -> String {
        self.block.labels.get(index).cloned().unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<&'a RawAttribute> {
        self.block.body.attribute(name)
    }

    fn check_unique(&self) -> Extract<AttributeSet> {
        let mut present = AttributeSet::default();
        for attr in &self.block.body.attributes {
            if !present.insert(&attr.name) {
                let first = self.attr(&attr.name).map_or(&self.block.pos, |a| &a.pos);
                return Err(Diagnostic::error("Attribute redefined")
                    .with_detail(format!(
                        "The argument \"{}\" was already set at {first}. Each argument may be set only once.",
                        attr.name
                    ))
                    .at(attr.pos.clone()));
            }
        }
        Ok(present)
    }

    /// A string-like argument: literal scalars as text, expressions as written.
    fn text(&self, name: &str) -> Extract<Option<String>> {
        let Some(attr) = self.attr(name) else {
            return Ok(None);
        };
        match &attr.value {
            AttrValue::Literal(Value::Null) => Ok(None),
            AttrValue::Literal(Value::String(s)) => Ok(Some(s.clone())),
            AttrValue::Literal(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
            AttrValue::Literal(_) => Err(wrong_type(attr, "string")),
            AttrValue::Expression(text) => Ok(Some(text.clone())),
        }
    }

    fn sensitive(&mut self) -> Extract<bool> {
        let Some(attr) = self.attr("sensitive") else {
            return Ok(false);
        };
        match &attr.value {
            AttrValue::Literal(Value::Bool(b)) => Ok(*b),
            AttrValue::Literal(Value::Null) => Ok(false),
            AttrValue::Literal(Value::String(s)) if s == "true" || s == "false" => Ok(s == "true"),
            AttrValue::Literal(_) => Err(wrong_type(attr, "bool")),
            AttrValue::Expression(text) => {
                self.warnings.push(
                    Diagnostic::warning("Non-literal sensitive flag")
                        .with_detail(format!(
                            "The expression `{text}` was not evaluated; the value is treated as not sensitive."
                        ))
                        .at(attr.pos.clone()),
                );
                Ok(false)
            }
        }
    }

    fn variable(&mut self) -> Extract<Variable> {
        let name = self.label(0);
        let description = self.text("description")?;
        let sensitive = self.sensitive()?;

        let type_expr = match self.attr("type") {
            None => None,
            Some(attr) => match &attr.value {
                AttrValue::Expression(text) => Some(text.clone()),
                AttrValue::Literal(Value::String(quoted)) => {
                    self.warnings.push(
                        Diagnostic::warning("Quoted type constraints are deprecated")
                            .with_detail(format!(
                                "Terraform 0.11 and earlier required type constraints to be given in quotes, \
                                 but that form is now deprecated. Remove the quotes around \"{quoted}\"."
                            ))
                            .at(attr.pos.clone()),
                    );
                    Some(quoted.clone())
                }
                AttrValue::Literal(_) => {
                    return Err(Diagnostic::error("Invalid type specification")
                        .with_detail(format!(
                            "The type constraint of variable \"{name}\" must be a type expression."
                        ))
                        .at(attr.pos.clone()));
                }
            },
        };

        let default = self.attr("default").map(|attr| match &attr.value {
            AttrValue::Literal(value) => VariableDefault::Known(value.clone()),
            AttrValue::Expression(text) => {
                self.warnings.push(
                    Diagnostic::warning("Non-literal default value")
                        .with_detail(format!(
                            "The default for variable \"{name}\" is the expression `{text}`, which was not evaluated. \
                             It is reported as unknown."
                        ))
                        .at(attr.pos.clone()),
                );
                VariableDefault::Unknown(text.clone())
            }
        });

        Ok(Variable {
            required: default.is_none(),
            name,
            type_expr,
            description,
            default,
            sensitive,
            pos: self.block.pos.clone(),
        })
    }

    fn output(&mut self) -> Extract<Output> {
        Ok(Output {
            name: self.label(0),
            description: self.text("description")?,
            sensitive: self.sensitive()?,
            pos: self.block.pos.clone(),
        })
    }

    fn resource(&mut self, mode: ResourceMode) -> Extract<Resource> {
        let resource_type = self.label(0);
        let provider = match self.text("provider")? {
            Some(reference) => ProviderRef::parse(reference.trim()),
            None => ProviderRef::implied_by(&resource_type),
        };
        Ok(Resource {
            mode,
            name: self.label(1),
            resource_type,
            provider,
            pos: self.block.pos.clone(),
        })
    }

    fn module_call(&mut self) -> Extract<ModuleCall> {
        let name = self.label(0);
        let source = self.text("source")?;
        if source.is_none() {
            self.incomplete = Some(
                Diagnostic::error("Missing required argument")
                    .with_detail(format!(
                        "The argument \"source\" is required in module \"{name}\", but no definition was found."
                    ))
                    .at(self.block.pos.clone()),
            );
        }
        Ok(ModuleCall {
            name,
            source: source.unwrap_or_default(),
            version: self.text("version")?,
            pos: self.block.pos.clone(),
        })
    }

    fn provider(&mut self) -> Extract<ProviderConfig> {
        Ok(ProviderConfig {
            name: self.label(0),
            alias: self.text("alias")?,
            pos: self.block.pos.clone(),
        })
    }

    fn settings(&mut self) -> Extract<Settings> {
        let block = self.block;
        let mut settings = Settings {
            required_core: self.text("required_version")?,
            required_providers: BTreeMap::new(),
            pos: self.block.pos.clone(),
        };

        for nested in block.body.blocks_of("required_providers") {
            for attr in &nested.body.attributes {
                let requirement = match &attr.value {
                    AttrValue::Literal(Value::String(version)) => RequiredProvider {
                        source: None,
                        version_constraints: vec![version.clone()],
                    },
                    AttrValue::Literal(Value::Object(fields)) => RequiredProvider {
                        source: object_text(attr, fields, "source")?,
                        version_constraints: object_text(attr, fields, "version")?
                            .into_iter()
                            .collect(),
                    },
                    AttrValue::Literal(_) => return Err(wrong_type(attr, "object")),
                    AttrValue::Expression(text) => {
                        self.warnings.push(
                            Diagnostic::warning("Non-literal provider requirement")
                                .with_detail(format!(
                                    "The requirement for provider \"{}\" is the expression `{text}`, \
                                     which was not evaluated.",
                                    attr.name
                                ))
                                .at(attr.pos.clone()),
                        );
                        RequiredProvider::default()
                    }
                };
                let entry = settings
                    .required_providers
                    .entry(attr.name.clone())
                    .or_default();
                if entry.source.is_none() {
                    entry.source = requirement.source;
                }
                entry
                    .version_constraints
                    .extend(requirement.version_constraints);
            }
        }

        Ok(settings)
    }
}

fn object_text(
    attr: &RawAttribute,
    fields: &serde_json::Map<String, Value>,
    key: &str,
) -> Extract<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Diagnostic::error("Incorrect attribute value type")
            .with_detail(format!(
                "Inappropriate value for attribute \"{}\": the \"{key}\" field must be a string.",
                attr.name
            ))
            .at(attr.pos.clone())),
    }
}

fn wrong_type(attr: &RawAttribute, expected: &str) -> Diagnostic {
    Diagnostic::error("Incorrect attribute value type")
        .with_detail(format!(
            "Inappropriate value for attribute \"{}\": {expected} required.",
            attr.name
        ))
        .at(attr.pos.clone())
}
