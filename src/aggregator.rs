//! Merging of per-file results into one [`Module`].
//!
//! Files are fed to a [`ModuleBuilder`] in processing order (primary files by
//! name, then override files by name). Within ordinary files the first
//! declaration of a name wins and every later one becomes a duplicate
//! diagnostic. Declarations from override files are merged attribute by
//! attribute into the declaration they name.

use crate::diagnostics::Diagnostic;
use crate::parser::normalize::Settings;
use crate::parser::{AttributeSet, Declaration, FileItem, FileUnit, Normalized};
use crate::types::{
    Module, ModuleCall, Output, ProviderConfig, Resource, ResourceMode, SourcePos, Variable,
};
use std::collections::BTreeMap;

/// A declaration kind stored in one of the module's maps.
pub trait Declared: Sized {
    /// Map key: the name, `type.name` or `name.alias`.
    fn key(&self) -> String;

    /// Where the declaring block starts.
    fn pos(&self) -> &SourcePos;

    /// Kind of declaration as used in messages (`variable`, `data resource`).
    fn noun(&self) -> &'static str;

    /// Replace the attributes the override block wrote.
    fn apply_override(&mut self, over: Self, present: &AttributeSet);

    /// The error raised for a second declaration of the same key.
    fn duplicate_of(&self, first: &SourcePos) -> Diagnostic {
        let noun = self.noun();
        Diagnostic::error(format!("Duplicate {noun} declaration"))
            .with_detail(format!(
                "A {noun} named \"{}\" was already declared at {first}. \
                 Names must be unique within a module.",
                self.key()
            ))
            .at(self.pos().clone())
    }
}

impl Declared for Variable {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn pos(&self) -> &SourcePos {
        &self.pos
    }

    fn noun(&self) -> &'static str {
        "variable"
    }

    fn apply_override(&mut self, over: Self, present: &AttributeSet) {
        if present.contains("description") {
            self.description = over.description;
        }
        if present.contains("type") {
            self.type_expr = over.type_expr;
        }
        if present.contains("default") {
            self.default = over.default;
            self.required = self.default.is_none();
        }
        if present.contains("sensitive") {
            self.sensitive = over.sensitive;
        }
    }
}

impl Declared for Output {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn pos(&self) -> &SourcePos {
        &self.pos
    }

    fn noun(&self) -> &'static str {
        "output"
    }

    fn apply_override(&mut self, over: Self, present: &AttributeSet) {
        if present.contains("description") {
            self.description = over.description;
        }
        if present.contains("sensitive") {
            self.sensitive = over.sensitive;
        }
    }
}

impl Declared for Resource {
    fn key(&self) -> String {
        Self::key(self)
    }

    fn pos(&self) -> &SourcePos {
        &self.pos
    }

    fn noun(&self) -> &'static str {
        match self.mode {
            ResourceMode::Managed => "resource",
            ResourceMode::Data => "data resource",
        }
    }

    fn apply_override(&mut self, over: Self, present: &AttributeSet) {
        if present.contains("provider") {
            self.provider = over.provider;
        }
    }
}

impl Declared for ModuleCall {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn pos(&self) -> &SourcePos {
        &self.pos
    }

    fn noun(&self) -> &'static str {
        "module call"
    }

    fn apply_override(&mut self, over: Self, present: &AttributeSet) {
        if present.contains("source") {
            self.source = over.source;
        }
        if present.contains("version") {
            self.version = over.version;
        }
    }
}

impl Declared for ProviderConfig {
    fn key(&self) -> String {
        Self::key(self)
    }

    fn pos(&self) -> &SourcePos {
        &self.pos
    }

    fn noun(&self) -> &'static str {
        "provider configuration"
    }

    // The alias is part of the key; nothing else is retained.
    fn apply_override(&mut self, _over: Self, _present: &AttributeSet) {}
}

/// Accumulates file results into a [`Module`].
#[derive(Debug)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    /// Start an empty module for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            module: Module::new(path),
        }
    }

    /// Record problems that are not tied to a file's contents.
    pub fn add_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.module.diagnostics.extend(diagnostics);
    }

    /// Add everything one file contributed. Must be called in processing
    /// order.
    pub fn add_file(&mut self, unit: FileUnit) {
        tracing::trace!(file = %unit.file.name, items = unit.items.len(), "Aggregating file");
        for item in unit.items {
            match item {
                FileItem::Problem(problem) => self.module.diagnostics.push(problem),
                FileItem::Declaration(normalized) if unit.file.is_override => {
                    self.add_override(normalized);
                }
                FileItem::Declaration(normalized) => self.add_primary(normalized),
            }
        }
    }

    /// The finished module.
    #[must_use]
    pub fn finish(self) -> Module {
        self.module
    }

    fn add_primary(&mut self, normalized: Normalized) {
        if let Some(problem) = normalized.incomplete {
            self.module.diagnostics.push(problem);
            return;
        }

        let module = &mut self.module;
        let diagnostics = &mut module.diagnostics;
        match normalized.declaration {
            Declaration::Variable(v) => insert_first(&mut module.variables, v, diagnostics),
            Declaration::Output(o) => insert_first(&mut module.outputs, o, diagnostics),
            Declaration::ManagedResource(r) => {
                insert_first(&mut module.managed_resources, r, diagnostics);
            }
            Declaration::DataResource(r) => insert_first(&mut module.data_resources, r, diagnostics),
            Declaration::ModuleCall(m) => insert_first(&mut module.module_calls, m, diagnostics),
            Declaration::ProviderConfig(p) => {
                insert_first(&mut module.provider_configs, p, diagnostics);
            }
            Declaration::Settings(s) => self.add_settings(s),
        }
    }

    fn add_override(&mut self, normalized: Normalized) {
        let present = &normalized.present;
        let module = &mut self.module;
        let diagnostics = &mut module.diagnostics;
        match normalized.declaration {
            Declaration::Variable(v) => merge_into(&mut module.variables, v, present, diagnostics),
            Declaration::Output(o) => merge_into(&mut module.outputs, o, present, diagnostics),
            Declaration::ManagedResource(r) => {
                merge_into(&mut module.managed_resources, r, present, diagnostics);
            }
            Declaration::DataResource(r) => {
                merge_into(&mut module.data_resources, r, present, diagnostics);
            }
            Declaration::ModuleCall(m) => merge_into(&mut module.module_calls, m, present, diagnostics),
            Declaration::ProviderConfig(p) => {
                merge_into(&mut module.provider_configs, p, present, diagnostics);
            }
            Declaration::Settings(s) => self.add_settings(s),
        }
    }

    fn add_settings(&mut self, settings: Settings) {
        self.module.required_core.extend(settings.required_core);
        for (name, requirement) in settings.required_providers {
            let entry = self.module.required_providers.entry(name).or_default();
            if entry.source.is_none() {
                entry.source = requirement.source;
            }
            entry
                .version_constraints
                .extend(requirement.version_constraints);
        }
    }
}

fn insert_first<T: Declared>(
    map: &mut BTreeMap<String, T>,
    declaration: T,
    diagnostics: &mut crate::diagnostics::Diagnostics,
) {
    let key = declaration.key();
    if let Some(first) = map.get(&key) {
        tracing::debug!(key = %key, first = %first.pos(), again = %declaration.pos(), "Duplicate declaration");
        diagnostics.push(declaration.duplicate_of(first.pos()));
        return;
    }
    map.insert(key, declaration);
}

fn merge_into<T: Declared>(
    map: &mut BTreeMap<String, T>,
    over: T,
    present: &AttributeSet,
    diagnostics: &mut crate::diagnostics::Diagnostics,
) {
    let key = over.key();
    match map.get_mut(&key) {
        Some(base) => {
            tracing::debug!(key = %key, from = %over.pos(), "Applying override");
            base.apply_override(over, present);
        }
        None => {
            let noun = over.noun();
            diagnostics.push(
                Diagnostic::error(format!("Missing base {noun} to override"))
                    .with_detail(format!(
                        "There is no {noun} named \"{key}\". An override file can only override \
                         a {noun} that was already defined in a primary configuration file."
                    ))
                    .at(over.pos().clone()),
            );
        }
    }
}
