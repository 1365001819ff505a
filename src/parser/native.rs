//! Native syntax (`*.tf`) block extraction.
//!
//! The file is first split into top-level items with a lexical scan that
//! understands strings, template interpolations, heredocs, comments and
//! bracket nesting. Each item is then parsed on its own with the `hcl-edit`
//! parser re-exported by `hcl-rs`, so a syntax error inside one block costs
//! only that block. When the scan cannot find where an item ends (an unclosed
//! brace, string, heredoc or comment), extraction of the file stops after
//! reporting it.

use crate::diagnostics::Diagnostic;
use crate::parser::{AttrValue, BlockExtractor, Extracted, LineIndex, RawAttribute, RawBlock, RawBody};
use crate::types::SourcePos;

use hcl::edit::parser::parse_body;
use hcl::edit::structure as ast;
use hcl::edit::Span;
use hcl::expr::{Operation, TemplateExpr, UnaryOperator};
use hcl::{Expression, ObjectKey};
use serde_json::Value;

/// Extractor for the native block syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExtractor;

impl BlockExtractor for NativeExtractor {
    fn extract(&self, content: &str, filename: &str) -> Vec<Extracted> {
        let lines = LineIndex::new(content);
        let mut scanner = Scanner::new(content);
        let mut extracted = Vec::new();

        loop {
            match scanner.next_item() {
                Ok(None) => break,
                Ok(Some(span)) => {
                    let item = Item {
                        text: &content[span.start..span.end],
                        start: span.start,
                        filename,
                        lines: &lines,
                    };
                    extracted.extend(parse_item(&item));
                }
                Err(unclosed) => {
                    let pos = SourcePos::new(filename, lines.line_of(unclosed.item_start));
                    tracing::debug!(pos = %pos, what = unclosed.what, "Unterminated item, skipping rest of file");
                    extracted.push(Extracted::Problem(
                        Diagnostic::error(format!("Unclosed {}", unclosed.what))
                            .with_detail(format!(
                                "There is no closing delimiter for the {} starting on line {}. \
                                 The rest of this file was not read.",
                                unclosed.what,
                                lines.line_of(unclosed.opened_at)
                            ))
                            .at(pos),
                    ));
                    break;
                }
            }
        }

        extracted
    }
}

/// One top-level item and where it sits in its file.
struct Item<'a> {
    text: &'a str,
    start: usize,
    filename: &'a str,
    lines: &'a LineIndex,
}

impl Item<'_> {
    /// Position of a byte offset within the item.
    fn pos_at(&self, offset: usize) -> SourcePos {
        SourcePos::new(self.filename, self.lines.line_of(self.start + offset))
    }

    /// Position of a parsed node, falling back to the item start.
    fn pos_of(&self, node: &impl Span) -> SourcePos {
        self.pos_at(node.span().map_or(0, |span| span.start))
    }
}

/// Parse one top-level item and convert its blocks.
fn parse_item(item: &Item<'_>) -> Vec<Extracted> {
    let body = match parse_body(item.text) {
        Ok(body) => body,
        Err(e) => {
            let pos = item.pos_at(0);
            // Parser locations count from the start of the item.
            let line = pos.line + e.location().line() - 1;
            tracing::debug!(pos = %pos, line, error = %e.message(), "Failed to parse block");
            return vec![Extracted::Problem(
                Diagnostic::error("Invalid block definition")
                    .with_detail(format!(
                        "{} (line {line}, column {}).",
                        e.message(),
                        e.location().column()
                    ))
                    .at(pos),
            )];
        }
    };

    body.iter()
        .filter_map(|structure| match structure {
            ast::Structure::Block(block) => Some(Extracted::Block(convert_block(block, item))),
            ast::Structure::Attribute(attr) => {
                tracing::debug!(pos = %item.pos_of(attr), key = %attr.key.as_str(), "Ignoring top-level argument");
                None
            }
        })
        .collect()
}

/// Convert a parsed block into the dialect-neutral form.
fn convert_block(block: &ast::Block, item: &Item<'_>) -> RawBlock {
    let mut body = RawBody::default();
    for structure in block.body.iter() {
        match structure {
            ast::Structure::Attribute(attr) => body.attributes.push(RawAttribute {
                name: attr.key.as_str().to_string(),
                value: convert_expression(&Expression::from(attr.value.clone())),
                pos: item.pos_of(attr),
            }),
            ast::Structure::Block(nested) => body.blocks.push(convert_block(nested, item)),
        }
    }

    RawBlock {
        kind: block.ident.as_str().to_string(),
        labels: block.labels.iter().map(|l| l.as_str().to_string()).collect(),
        body,
        pos: item.pos_of(block),
    }
}

/// Decode an expression as a literal, or keep its source text.
fn convert_expression(expr: &Expression) -> AttrValue {
    match literal_value(expr) {
        Some(value) => AttrValue::Literal(value),
        None => AttrValue::Expression(expression_source(expr)),
    }
}

/// Canonical form of a literal expression; `None` for anything that would
/// need evaluation.
fn literal_value(expr: &Expression) -> Option<Value> {
    match expr {
        Expression::Null => Some(Value::Null),
        Expression::Bool(b) => Some(Value::Bool(*b)),
        Expression::Number(n) => number_value(n, false),
        Expression::String(s) => Some(Value::String(s.clone())),
        Expression::Array(items) => items
            .iter()
            .map(literal_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Expression::Object(object) => {
            let mut map = serde_json::Map::new();
            for (key, value) in object {
                map.insert(object_key_literal(key)?, literal_value(value)?);
            }
            Some(Value::Object(map))
        }
        Expression::TemplateExpr(template) => template_literal(template).map(Value::String),
        Expression::Parenthesis(inner) => literal_value(inner),
        Expression::Operation(operation) => match operation.as_ref() {
            Operation::Unary(unary) if matches!(unary.operator, UnaryOperator::Neg) => {
                match &unary.expr {
                    Expression::Number(n) => number_value(n, true),
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

fn number_value(n: &hcl::Number, negate: bool) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(if negate { -i } else { i }));
    }
    if !negate {
        if let Some(u) = n.as_u64() {
            return Some(Value::from(u));
        }
    }
    let f = n.as_f64()?;
    serde_json::Number::from_f64(if negate { -f } else { f }).map(Value::Number)
}

fn object_key_literal(key: &ObjectKey) -> Option<String> {
    match key {
        ObjectKey::Identifier(id) => Some(id.as_str().to_string()),
        ObjectKey::Expression(expr) => match literal_value(expr)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// A template is literal when it contains no interpolation or directive.
/// Heredoc indentation is already stripped by the parser.
fn template_literal(template: &TemplateExpr) -> Option<String> {
    let text = template_source(template);
    (!has_template_sequence(&text)).then_some(text)
}

/// Template text without quotes or heredoc delimiters.
fn template_source(template: &TemplateExpr) -> String {
    match template {
        TemplateExpr::QuotedString(s) => s.clone(),
        TemplateExpr::Heredoc(heredoc) => heredoc.template.clone(),
    }
}

pub(crate) fn has_template_sequence(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.windows(2).enumerate().any(|(i, pair)| {
        matches!(pair, [b'$' | b'%', b'{']) && (i == 0 || bytes[i - 1] != pair[0])
    })
}

/// Source text of a non-literal expression. Templates keep their text as
/// written between the quotes, the same as a JSON string would hold it.
fn expression_source(expr: &Expression) -> String {
    if let Expression::TemplateExpr(template) = expr {
        return template_source(template);
    }
    hcl::format::to_string(expr).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Failed to format expression");
        format!("{expr:?}")
    })
}

// ---------------------------------------------------------------------------
// Top-level item scanner
// ---------------------------------------------------------------------------

/// Byte range of one top-level item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ItemSpan {
    start: usize,
    end: usize,
}

/// The scan hit end of input inside an open construct.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unclosed {
    item_start: usize,
    opened_at: usize,
    what: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Group { close: u8, opened_at: usize },
    Quoted { opened_at: usize },
    Interpolation { opened_at: usize },
}

impl Frame {
    fn opened_at(self) -> usize {
        match self {
            Self::Group { opened_at, .. }
            | Self::Quoted { opened_at }
            | Self::Interpolation { opened_at } => opened_at,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Group { close: b'}', .. } => "configuration block",
            Self::Group { close: b']', .. } => "list",
            Self::Group { .. } => "parenthesis",
            Self::Quoted { .. } => "string",
            Self::Interpolation { .. } => "template interpolation",
        }
    }
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    /// Find the next top-level item; `Ok(None)` at end of input.
    fn next_item(&mut self) -> Result<Option<ItemSpan>, Unclosed> {
        self.skip_trivia()?;
        if self.pos >= self.src.len() {
            return Ok(None);
        }

        let start = self.pos;
        let mut stack: Vec<Frame> = Vec::new();

        while let Some(b) = self.peek(0) {
            if let Some(Frame::Quoted { .. }) = stack.last() {
                match b {
                    b'\\' => self.pos += 2,
                    b'"' => {
                        stack.pop();
                        self.pos += 1;
                    }
                    b'$' | b'%' if self.peek(1) == Some(b) && self.peek(2) == Some(b'{') => {
                        self.pos += 3;
                    }
                    b'$' | b'%' if self.peek(1) == Some(b'{') => {
                        stack.push(Frame::Interpolation { opened_at: self.pos });
                        self.pos += 2;
                    }
                    // Quoted strings cannot span lines; let the parser report it.
                    b'\n' => {
                        stack.pop();
                    }
                    _ => self.pos += 1,
                }
                continue;
            }

            match b {
                b'#' => self.skip_line(),
                b'/' if self.peek(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(start)?,
                b'"' => {
                    stack.push(Frame::Quoted { opened_at: self.pos });
                    self.pos += 1;
                }
                b'<' if self.peek(1) == Some(b'<') => self.skip_heredoc(start)?,
                b'{' | b'[' | b'(' => {
                    let close = match b {
                        b'{' => b'}',
                        b'[' => b']',
                        _ => b')',
                    };
                    stack.push(Frame::Group {
                        close,
                        opened_at: self.pos,
                    });
                    self.pos += 1;
                }
                b'}' | b']' | b')' => {
                    if matches!(
                        stack.last(),
                        Some(Frame::Group { .. } | Frame::Interpolation { .. })
                    ) {
                        stack.pop();
                    }
                    self.pos += 1;
                }
                b'\n' if stack.is_empty() => {
                    return Ok(Some(ItemSpan {
                        start,
                        end: self.pos,
                    }));
                }
                _ => self.pos += 1,
            }
        }

        match stack.first() {
            Some(frame) => Err(Unclosed {
                item_start: start,
                opened_at: frame.opened_at(),
                what: frame.describe(),
            }),
            None => Ok(Some(ItemSpan {
                start,
                end: self.src.len(),
            })),
        }
    }

    /// Skip whitespace and comments between items.
    fn skip_trivia(&mut self) -> Result<(), Unclosed> {
        while let Some(b) = self.peek(0) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'#' => self.skip_line(),
                b'/' if self.peek(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(self.pos)?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Advance to the next newline without consuming it.
    fn skip_line(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self, item_start: usize) -> Result<(), Unclosed> {
        let opened_at = self.pos;
        self.pos += 2;
        while self.pos < self.src.len() {
            if self.peek(0) == Some(b'*') && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(Unclosed {
            item_start,
            opened_at,
            what: "comment",
        })
    }

    /// Skip `<<EOT` / `<<-EOT` through its closing delimiter line. Anything
    /// else starting with `<<` is left to the parser.
    fn skip_heredoc(&mut self, item_start: usize) -> Result<(), Unclosed> {
        let opened_at = self.pos;
        let mut cursor = self.pos + 2;
        if self.src.get(cursor) == Some(&b'-') {
            cursor += 1;
        }
        let ident_start = cursor;
        while self
            .src
            .get(cursor)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_' || *c == b'-')
        {
            cursor += 1;
        }
        let delimiter = &self.src[ident_start..cursor];
        let header_ends_line = self.src[cursor..]
            .iter()
            .take_while(|c| **c != b'\n')
            .all(|c| *c == b' ' || *c == b'\t' || *c == b'\r');
        if delimiter.is_empty() || !header_ends_line {
            self.pos += 2;
            return Ok(());
        }

        // Walk body lines until one is exactly the delimiter.
        let Some(newline) = self.src[cursor..].iter().position(|c| *c == b'\n') else {
            return Err(Unclosed {
                item_start,
                opened_at,
                what: "heredoc",
            });
        };
        let mut line_start = cursor + newline + 1;
        while line_start < self.src.len() {
            let line_end = self.src[line_start..]
                .iter()
                .position(|c| *c == b'\n')
                .map_or(self.src.len(), |n| line_start + n);
            let line = trim_ascii(&self.src[line_start..line_end]);
            if line == delimiter {
                self.pos = line_end;
                return Ok(());
            }
            line_start = line_end + 1;
        }
        Err(Unclosed {
            item_start,
            opened_at,
            what: "heredoc",
        })
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|c| !c.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn blocks(content: &str) -> Vec<RawBlock> {
        NativeExtractor
            .extract(content, "main.tf")
            .into_iter()
            .filter_map(|e| match e {
                Extracted::Block(b) => Some(b),
                Extracted::Problem(_) => None,
            })
            .collect()
    }

    fn problems(content: &str) -> Vec<Diagnostic> {
        NativeExtractor
            .extract(content, "main.tf")
            .into_iter()
            .filter_map(|e| match e {
                Extracted::Problem(p) => Some(p),
                Extracted::Block(_) => None,
            })
            .collect()
    }

    fn spans(content: &str) -> Vec<&str> {
        let mut scanner = Scanner::new(content);
        let mut out = Vec::new();
        while let Some(span) = scanner.next_item().unwrap() {
            out.push(&content[span.start..span.end]);
        }
        out
    }

    #[test]
    fn test_scanner_splits_top_level_items() {
        let content = r#"
# leading comment
variable "a" {
  default = "}"
}
/* block
   comment */ variable "b" { default = "${jsonencode({ x = "}" })}" }

locals {
  doc = <<-EOT
    }
    EOT
}
"#;
        let items = spans(content);
        assert_eq!(items.len(), 3);
        assert!(items[0].starts_with("variable \"a\""));
        assert!(items[0].ends_with('}'));
        assert!(items[1].starts_with("variable \"b\""));
        assert!(items[2].starts_with("locals"));
        assert!(items[2].ends_with('}'));
    }

    #[test]
    fn test_scanner_escaped_interpolation() {
        let items = spans("output \"x\" {\n  value = \"$${not_open\"\n}\n");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_scanner_reports_unclosed_block() {
        let mut scanner = Scanner::new("variable \"a\" {}\nresource \"x\" \"y\" {\n  a = 1\n");
        assert!(scanner.next_item().unwrap().is_some());
        let unclosed = scanner.next_item().unwrap_err();
        assert_eq!(unclosed.what, "configuration block");
    }

    #[test]
    fn test_extract_labels_and_attributes() {
        let content = r#"
resource "aws_instance" "web" {
  ami      = "ami-123"
  provider = aws.west

  lifecycle {
    create_before_destroy = true
  }
}
"#;
        let blocks = blocks(content);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.kind, "resource");
        assert_eq!(block.labels, vec!["aws_instance", "web"]);
        assert_eq!(block.pos, SourcePos::new("main.tf", 2));
        assert_eq!(
            block.body.attribute("ami").unwrap().value,
            AttrValue::Literal(json!("ami-123"))
        );
        assert!(matches!(
            block.body.attribute("provider").unwrap().value,
            AttrValue::Expression(ref s) if s == "aws.west"
        ));
        assert_eq!(block.body.blocks_of("lifecycle").count(), 1);
    }

    #[test]
    fn test_literal_decoding() {
        let content = r#"
variable "complex" {
  default = {
    name    = "app"
    count   = 3
    ratio   = 0.5
    offset  = -2
    enabled = true
    nothing = null
    tags    = ["a", "b"]
    "quoted key" = 1
  }
}
"#;
        let blocks = blocks(content);
        let default = &blocks[0].body.attribute("default").unwrap().value;
        assert_eq!(
            default,
            &AttrValue::Literal(json!({
                "name": "app",
                "count": 3,
                "ratio": 0.5,
                "offset": -2,
                "enabled": true,
                "nothing": null,
                "tags": ["a", "b"],
                "quoted key": 1
            }))
        );
    }

    #[test]
    fn test_non_literal_values_keep_source() {
        let content = r#"
variable "x" {
  type    = list(string)
  default = "${var.prefix}-name"
}
"#;
        let blocks = blocks(content);
        let body = &blocks[0].body;
        assert_eq!(
            body.attribute("type").unwrap().value,
            AttrValue::Expression("list(string)".to_string())
        );
        assert_eq!(
            body.attribute("default").unwrap().value,
            AttrValue::Expression("${var.prefix}-name".to_string())
        );
    }

    #[test]
    fn test_heredoc_description_is_literal() {
        let content = "output \"x\" {\n  description = <<-EOT\n    first\n      second\n  EOT\n  value = 1\n}\n";
        let blocks = blocks(content);
        assert_eq!(
            blocks[0].body.attribute("description").unwrap().value.as_str(),
            Some("first\n  second\n")
        );
    }

    #[test]
    fn test_broken_block_between_valid_blocks() {
        let content = r#"
variable "a" {}

resource "aws_instance" "broken" {
  ami = = "x"
}

variable "b" {}
"#;
        let extracted = NativeExtractor.extract(content, "main.tf");
        assert_eq!(extracted.len(), 3);
        assert!(matches!(&extracted[0], Extracted::Block(b) if b.labels == vec!["a"]));
        match &extracted[1] {
            Extracted::Problem(p) => {
                assert!(p.severity.is_error());
                assert_eq!(p.pos, Some(SourcePos::new("main.tf", 4)));
            }
            Extracted::Block(_) => panic!("Expected a problem for the broken block"),
        }
        assert!(matches!(&extracted[2], Extracted::Block(b) if b.labels == vec!["b"]));
    }

    #[test]
    fn test_unclosed_block_stops_file_but_keeps_earlier_blocks() {
        let content = "variable \"a\" {}\n\nvariable \"b\" {\n  default = 1\n";
        let extracted = NativeExtractor.extract(content, "main.tf");
        assert_eq!(extracted.len(), 2);
        assert!(matches!(extracted[0], Extracted::Block(_)));
        let problems = problems(content);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].summary, "Unclosed configuration block");
        assert_eq!(problems[0].pos, Some(SourcePos::new("main.tf", 3)));
    }

    #[test]
    fn test_top_level_attribute_is_ignored() {
        let extracted = NativeExtractor.extract("foo = 1\nvariable \"a\" {}\n", "main.tf");
        assert_eq!(extracted.len(), 1);
    }

    #[test]
    fn test_attributes_carry_their_own_lines() {
        let content = "\n\nvariable \"a\" {\n  type = string\n\n  default = 1\n}\n";
        let blocks = blocks(content);
        assert_eq!(blocks[0].pos.line, 3);
        assert_eq!(blocks[0].body.attribute("type").unwrap().pos.line, 4);
        assert_eq!(blocks[0].body.attribute("default").unwrap().pos.line, 6);
    }

    #[test]
    fn test_parse_error_detail_uses_file_lines() {
        let content = "variable \"a\" {}\n\n\nresource \"x\" \"y\" {\n  a = 1\n  b = = 2\n}\n";
        let problems = problems(content);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].pos, Some(SourcePos::new("main.tf", 4)));
        assert!(
            problems[0].detail.as_deref().unwrap().contains("(line 6,"),
            "{:?}",
            problems[0].detail
        );
    }

    #[test]
    fn test_redefined_attribute_is_invalid_block() {
        let content = "variable \"a\" {\n  default = 1\n  default = 2\n}\n";
        let extracted = NativeExtractor.extract(content, "main.tf");
        assert!(matches!(
            &extracted[..],
            [Extracted::Problem(p)] if p.summary == "Invalid block definition"
        ));
    }

    #[test]
    fn test_template_strings_keep_text_without_quotes() {
        let content = "output \"x\" {\n  description = \"Cost ${var.x}\"\n  value = \"Lit $${x}\"\n}\n";
        let blocks = blocks(content);
        let body = &blocks[0].body;
        assert_eq!(
            body.attribute("description").unwrap().value,
            AttrValue::Expression("Cost ${var.x}".to_string())
        );
        assert_eq!(body.attribute("value").unwrap().value.as_str(), Some("Lit ${x}"));
    }

    #[test]
    fn test_has_template_sequence() {
        assert!(has_template_sequence("${var.x}"));
        assert!(has_template_sequence("a %{ if x }b%{ endif }"));
        assert!(!has_template_sequence("$${literal}"));
        assert!(!has_template_sequence("plain $ sign"));
    }
}
