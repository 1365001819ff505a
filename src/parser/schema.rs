//! Mapping of extracted blocks to declaration kinds.

use crate::diagnostics::Diagnostic;
use crate::parser::RawBlock;
use std::fmt;

/// The declaration kinds the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Variable,
    Output,
    ManagedResource,
    DataResource,
    ModuleCall,
    Provider,
    Locals,
    Terraform,
}

impl DeclKind {
    /// Look up the kind for a top-level block type keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "variable" => Self::Variable,
            "output" => Self::Output,
            "resource" => Self::ManagedResource,
            "data" => Self::DataResource,
            "module" => Self::ModuleCall,
            "provider" => Self::Provider,
            "locals" => Self::Locals,
            "terraform" => Self::Terraform,
            _ => return None,
        })
    }

    /// The block type keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Output => "output",
            Self::ManagedResource => "resource",
            Self::DataResource => "data",
            Self::ModuleCall => "module",
            Self::Provider => "provider",
            Self::Locals => "locals",
            Self::Terraform => "terraform",
        }
    }

    /// Names of the labels a block of this kind takes, in order.
    #[must_use]
    pub const fn label_names(self) -> &'static [&'static str] {
        match self {
            Self::Variable | Self::Output | Self::ModuleCall | Self::Provider => &["name"],
            Self::ManagedResource | Self::DataResource => &["type", "name"],
            Self::Locals | Self::Terraform => &[],
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Outcome of matching one block.
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// A known kind with well-formed labels
    Recognized(DeclKind),
    /// A block type outside the known set
    Ignored,
    /// A known kind whose labels are wrong; the block is dropped
    Invalid(Diagnostic),
}

/// Classify a block and check its labels.
#[must_use]
pub fn match_block(block: &RawBlock) -> Match {
    let Some(kind) = DeclKind::from_keyword(&block.kind) else {
        return Match::Ignored;
    };

    let expected = kind.label_names();
    let found = block.labels.len();

    if found < expected.len() {
        let missing = expected[found];
        return Match::Invalid(
            Diagnostic::error(format!("Missing {missing} for {kind}"))
                .with_detail(format!(
                    "All {kind} blocks must have {} labels ({}).",
                    expected.len(),
                    expected.join(", ")
                ))
                .at(block.pos.clone()),
        );
    }

    if found > expected.len() {
        let detail = if expected.is_empty() {
            format!("No labels are expected for {kind} blocks.")
        } else {
            format!(
                "Only {} labels ({}) are expected for {kind} blocks.",
                expected.len(),
                expected.join(", ")
            )
        };
        return Match::Invalid(
            Diagnostic::error(format!("Extraneous label for {kind}"))
                .with_detail(detail)
                .at(block.pos.clone()),
        );
    }

    for (label, role) in block.labels.iter().zip(expected) {
        if !is_valid_identifier(label) {
            let what = if *role == "name" {
                format!("{kind} name")
            } else {
                format!("{kind} {role} name")
            };
            return Match::Invalid(
                Diagnostic::error(format!("Invalid {what}"))
                    .with_detail(format!(
                        "\"{label}\" is not a valid {what}. A name must start with a letter or \
                         underscore and may contain only letters, digits, underscores, and dashes."
                    ))
                    .at(block.pos.clone()),
            );
        }
    }

    Match::Recognized(kind)
}

/// Identifier rule for declaration labels.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawBody;
    use crate::types::SourcePos;
    use test_case::test_case;

    fn block(kind: &str, labels: &[&str]) -> RawBlock {
        RawBlock {
            kind: kind.to_string(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            body: RawBody::default(),
            pos: SourcePos::new("main.tf", 3),
        }
    }

    #[test_case("variable", &["region"], DeclKind::Variable ; "variable")]
    #[test_case("output", &["id"], DeclKind::Output ; "output")]
    #[test_case("resource", &["aws_instance", "web"], DeclKind::ManagedResource ; "resource")]
    #[test_case("data", &["aws_ami", "ubuntu"], DeclKind::DataResource ; "data")]
    #[test_case("module", &["vpc"], DeclKind::ModuleCall ; "module")]
    #[test_case("provider", &["aws"], DeclKind::Provider ; "provider")]
    #[test_case("locals", &[], DeclKind::Locals ; "locals")]
    #[test_case("terraform", &[], DeclKind::Terraform ; "terraform")]
    fn test_recognized(kind: &str, labels: &[&str], expected: DeclKind) {
        assert_eq!(match_block(&block(kind, labels)), Match::Recognized(expected));
    }

    #[test_case("moved" ; "moved")]
    #[test_case("import" ; "import")]
    #[test_case("check" ; "check")]
    fn test_unknown_kinds_are_ignored(kind: &str) {
        assert_eq!(match_block(&block(kind, &["x"])), Match::Ignored);
    }

    #[test]
    fn test_missing_label() {
        let Match::Invalid(diag) = match_block(&block("resource", &["aws_instance"])) else {
            panic!("Expected an invalid match");
        };
        assert_eq!(diag.summary, "Missing name for resource");
        assert_eq!(diag.detail.as_deref(), Some("All resource blocks must have 2 labels (type, name)."));
        assert_eq!(diag.pos, Some(SourcePos::new("main.tf", 3)));
    }

    #[test]
    fn test_extraneous_label() {
        let Match::Invalid(diag) = match_block(&block("variable", &["a", "b"])) else {
            panic!("Expected an invalid match");
        };
        assert_eq!(diag.summary, "Extraneous label for variable");

        let Match::Invalid(diag) = match_block(&block("locals", &["x"])) else {
            panic!("Expected an invalid match");
        };
        assert_eq!(diag.detail.as_deref(), Some("No labels are expected for locals blocks."));
    }

    #[test]
    fn test_invalid_label() {
        let Match::Invalid(diag) = match_block(&block("variable", &["1st"])) else {
            panic!("Expected an invalid match");
        };
        assert_eq!(diag.summary, "Invalid variable name");

        let Match::Invalid(diag) = match_block(&block("resource", &["aws instance", "x"])) else {
            panic!("Expected an invalid match");
        };
        assert_eq!(diag.summary, "Invalid resource type name");
    }

    #[test_case("region", true ; "simple")]
    #[test_case("_private", true ; "leading underscore")]
    #[test_case("with-dash_and_1", true ; "dash and digit")]
    #[test_case("", false ; "empty")]
    #[test_case("1abc", false ; "leading digit")]
    #[test_case("a.b", false ; "dot")]
    fn test_identifier(name: &str, expected: bool) {
        assert_eq!(is_valid_identifier(name), expected);
    }
}
