//! Diagnostics produced while loading a configuration directory.
//!
//! A [`Diagnostic`] is a structured record of a problem found in the input:
//! malformed syntax, a block with the wrong shape, a duplicate declaration, or
//! an advisory notice. Diagnostics are accumulated in [`Diagnostics`] for the
//! duration of one load and handed to the caller with the module.

use crate::types::SourcePos;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A definite problem; the affected unit was skipped.
    Error,
    /// An advisory notice; loading was not affected.
    Warning,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single problem found while loading.
///
/// # Example
///
/// ```
/// use tfinspect::diagnostics::Diagnostic;
/// use tfinspect::types::SourcePos;
///
/// let diag = Diagnostic::error("Duplicate variable declaration")
///     .with_detail("A variable named \"region\" was already declared at main.tf:1.")
///     .at(SourcePos::new("variables.tf", 4));
///
/// assert!(diag.severity.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,
    /// Short, one-line description
    pub summary: String,
    /// Long-form explanation
    pub detail: Option<String>,
    /// Where the problem was found, when it relates to a place in a file
    pub pos: Option<SourcePos>,
}

impl Diagnostic {
    /// Create an error diagnostic with the given summary.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary)
    }

    /// Create a warning diagnostic with the given summary.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary)
    }

    fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            pos: None,
        }
    }

    /// Attach a long-form detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach a source position.
    #[must_use]
    pub fn at(mut self, pos: SourcePos) -> Self {
        self.pos = Some(pos);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(pos) = &self.pos {
            write!(f, " (at {pos})")?;
        }
        Ok(())
    }
}

/// Append-only collection of diagnostics for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// True iff at least one diagnostic has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity.is_error())
    }

    /// Number of error-severity diagnostics.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.severity.is_error()).count()
    }

    /// Number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no diagnostics were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in recording order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
