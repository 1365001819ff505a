//! JSON syntax (`*.tf.json`) block extraction.
//!
//! The root object maps block type keywords to nested objects whose keys are
//! the block labels, one level per label; the innermost value is the block
//! body, either an object or an array of objects (one block each).
//!
//! The document is decoded with `serde_json` into a [`Node`] tree that keeps
//! object members in document order, repeated keys included, so a repeated
//! declaration or argument reaches the later stages instead of silently
//! replacing the earlier one. `serde_json` does not keep positions, so a
//! second pass over the raw text records where each member starts.

use crate::diagnostics::Diagnostic;
use crate::parser::native::has_template_sequence;
use crate::parser::{AttrValue, BlockExtractor, Extracted, LineIndex, RawAttribute, RawBlock, RawBody};
use crate::types::SourcePos;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};
use std::fmt;

/// Object keys reserved for comments.
const COMMENT_KEY: &str = "//";

/// Arguments whose JSON string values hold an expression rather than a
/// template.
const EXPRESSION_KEYS: &[&str] = &["type", "provider"];

/// Extractor for the JSON syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExtractor;

impl BlockExtractor for JsonExtractor {
    fn extract(&self, content: &str, filename: &str) -> Vec<Extracted> {
        let mut root: Node = match serde_json::from_str(content) {
            Ok(root) => root,
            Err(e) => {
                tracing::debug!(file = %filename, error = %e, "Invalid JSON");
                return vec![Extracted::Problem(
                    Diagnostic::error("Invalid JSON syntax")
                        .with_detail(e.to_string())
                        .at(SourcePos::new(filename, e.line().max(1))),
                )];
            }
        };
        root.attach_offsets(&mut member_offsets(content).into_iter());

        let Node::Object(root) = root else {
            return vec![Extracted::Problem(
                Diagnostic::error("Incorrect JSON value type")
                    .with_detail("The root of a JSON configuration file must be an object.")
                    .at(SourcePos::new(filename, 1)),
            )];
        };

        let walker = Walker {
            filename,
            lines: LineIndex::new(content),
        };

        let mut extracted = Vec::new();
        for member in &root {
            if member.key == COMMENT_KEY {
                continue;
            }
            let Some(label_count) = label_count(&member.key) else {
                tracing::trace!(kind = %member.key, "Ignoring unrecognized block type");
                continue;
            };
            walker.labels(&member.key, member, label_count, &mut Vec::new(), &mut extracted);
        }

        // Stable: repeated keys on one line keep document order.
        extracted.sort_by_key(|e| match e {
            Extracted::Block(block) => block.pos.line,
            Extracted::Problem(problem) => problem.pos.as_ref().map_or(0, |pos| pos.line),
        });
        extracted
    }
}

/// Number of labels each top-level block type takes in the JSON layout.
fn label_count(kind: &str) -> Option<usize> {
    match kind {
        "variable" | "output" | "module" | "provider" => Some(1),
        "resource" | "data" => Some(2),
        "locals" | "terraform" => Some(0),
        _ => None,
    }
}

/// A JSON value that keeps repeated object keys and member positions.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Scalar(Value),
    Array(Vec<Member>),
    Object(Vec<Member>),
}

/// An object member or array element with the byte offset where it starts.
/// Array elements have an empty key.
#[derive(Debug, Clone, PartialEq)]
struct Member {
    key: String,
    offset: usize,
    value: Node,
}

impl Member {
    fn new(key: String, value: Node) -> Self {
        Self {
            key,
            offset: 0,
            value,
        }
    }
}

impl Node {
    /// Fill in member offsets from a pre-order listing of the document.
    fn attach_offsets(&mut self, offsets: &mut impl Iterator<Item = usize>) {
        if let Self::Array(members) | Self::Object(members) = self {
            for member in members {
                member.offset = offsets.next().unwrap_or_default();
                member.value.attach_offsets(offsets);
            }
        }
    }

    /// Canonical value; a repeated key inside a literal map keeps its last
    /// value, as it would in any JSON decoder.
    fn to_value(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Array(items) => Value::Array(items.iter().map(|m| m.value.to_value()).collect()),
            Self::Object(members) => Value::Object(
                members
                    .iter()
                    .map(|m| (m.key.clone(), m.value.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v.to_string())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Null))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(Member::new(String::new(), item));
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut members = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Node>()? {
            members.push(Member::new(key, value));
        }
        Ok(Node::Object(members))
    }
}

struct Walker<'a> {
    filename: &'a str,
    lines: LineIndex,
}

impl Walker<'_> {
    fn pos(&self, member: &Member) -> SourcePos {
        SourcePos::new(self.filename, self.lines.line_of(member.offset))
    }

    /// Descend one object level per remaining label, then emit the bodies.
    fn labels(
        &self,
        kind: &str,
        member: &Member,
        remaining: usize,
        labels: &mut Vec<String>,
        out: &mut Vec<Extracted>,
    ) {
        if remaining == 0 {
            self.bodies(kind, member, labels, out);
            return;
        }

        let Node::Object(nested) = &member.value else {
            out.push(Extracted::Problem(
                Diagnostic::error("Incorrect JSON value type")
                    .with_detail(format!(
                        "A JSON object is required here, with keys giving the labels of \"{kind}\" blocks."
                    ))
                    .at(self.pos(member)),
            ));
            return;
        };

        for label in nested {
            if label.key == COMMENT_KEY {
                continue;
            }
            labels.push(label.key.clone());
            self.labels(kind, label, remaining - 1, labels, out);
            labels.pop();
        }
    }

    fn bodies(&self, kind: &str, member: &Member, labels: &[String], out: &mut Vec<Extracted>) {
        match &member.value {
            Node::Object(body) => out.push(Extracted::Block(self.block(kind, labels, body, member))),
            Node::Array(items) if items.iter().all(|item| matches!(item.value, Node::Object(_))) => {
                for item in items {
                    if let Node::Object(body) = &item.value {
                        out.push(Extracted::Block(self.block(kind, labels, body, item)));
                    }
                }
            }
            _ => out.push(Extracted::Problem(
                Diagnostic::error("Incorrect JSON value type")
                    .with_detail(format!(
                        "Either a JSON object or a JSON array of objects is required to define a \"{kind}\" block body."
                    ))
                    .at(self.pos(member)),
            )),
        }
    }

    fn block(&self, kind: &str, labels: &[String], body: &[Member], at: &Member) -> RawBlock {
        let mut raw = RawBody::default();

        for member in body {
            if member.key == COMMENT_KEY {
                continue;
            }
            if kind == "terraform" && member.key == "required_providers" {
                self.nested_blocks(member, &mut raw);
            } else {
                raw.attributes.push(RawAttribute {
                    name: member.key.clone(),
                    value: attribute_value(&member.key, &member.value),
                    pos: self.pos(member),
                });
            }
        }

        RawBlock {
            kind: kind.to_string(),
            labels: labels.to_vec(),
            body: raw,
            pos: self.pos(at),
        }
    }

    /// A nested block with no labels: an object, or an array of objects.
    fn nested_blocks(&self, member: &Member, into: &mut RawBody) {
        match &member.value {
            Node::Object(body) => into.blocks.push(self.block(&member.key, &[], body, member)),
            Node::Array(items) => {
                for item in items {
                    if let Node::Object(body) = &item.value {
                        into.blocks.push(self.block(&member.key, &[], body, item));
                    }
                }
            }
            other => into.attributes.push(RawAttribute {
                name: member.key.clone(),
                value: AttrValue::Literal(other.to_value()),
                pos: self.pos(member),
            }),
        }
    }
}

/// Strings with template sequences are expressions, as are the string values
/// of arguments that take an expression directly. Literal strings have their
/// template escapes (`$${`, `%%{`) decoded, as the native syntax does.
fn attribute_value(key: &str, node: &Node) -> AttrValue {
    let value = node.to_value();
    match value {
        Value::String(s) if EXPRESSION_KEYS.contains(&key) => AttrValue::Expression(s),
        Value::String(s) if has_template_sequence(&s) => AttrValue::Expression(s),
        other if contains_template(&other) => AttrValue::Expression(other.to_string()),
        other => AttrValue::Literal(unescape_templates(other)),
    }
}

fn contains_template(value: &Value) -> bool {
    match value {
        Value::String(s) => has_template_sequence(s),
        Value::Array(items) => items.iter().any(contains_template),
        Value::Object(map) => map.iter().any(|(k, v)| has_template_sequence(k) || contains_template(v)),
        _ => false,
    }
}

fn unescape_templates(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace("$${", "${").replace("%%{", "%{")),
        Value::Array(items) => Value::Array(items.into_iter().map(unescape_templates).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.replace("$${", "${").replace("%%{", "%{"), unescape_templates(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Start offset of every object member (its key) and array element, in
/// document pre-order. Only run on text `serde_json` already accepted.
fn member_offsets(text: &str) -> Vec<usize> {
    let mut scan = OffsetScan {
        bytes: text.as_bytes(),
        pos: 0,
        offsets: Vec::new(),
    };
    scan.value();
    scan.offsets
}

struct OffsetScan<'a> {
    bytes: &'a [u8],
    pos: usize,
    offsets: Vec<usize>,
}

impl OffsetScan<'_> {
    fn skip_whitespace(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) {
        self.skip_whitespace();
        match self.bytes.get(self.pos) {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => self.string(),
            Some(_) => {
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|b| !matches!(b, b',' | b']' | b'}') && !b.is_ascii_whitespace())
                {
                    self.pos += 1;
                }
            }
            None => {}
        }
    }

    fn object(&mut self) {
        self.pos += 1;
        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => return,
                Some(b'}') => {
                    self.pos += 1;
                    return;
                }
                Some(b',') => self.pos += 1,
                Some(b'"') => {
                    self.offsets.push(self.pos);
                    self.string();
                    self.skip_whitespace();
                    if self.bytes.get(self.pos) == Some(&b':') {
                        self.pos += 1;
                    }
                    self.value();
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn array(&mut self) {
        self.pos += 1;
        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => return,
                Some(b']') => {
                    self.pos += 1;
                    return;
                }
                Some(b',') => self.pos += 1,
                Some(_) => {
                    self.offsets.push(self.pos);
                    self.value();
                }
            }
        }
    }

    fn string(&mut self) {
        self.pos += 1;
        while let Some(b) = self.bytes.get(self.pos) {
            match b {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }
}
