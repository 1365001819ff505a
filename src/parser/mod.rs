//! Configuration file parsing.
//!
//! Files flow through four stages, each in its own module:
//!
//! 1. [`classify`] picks the files of a directory and tags each with a
//!    [`Dialect`].
//! 2. A dialect-specific [`BlockExtractor`] ([`native`] or [`json`]) turns the
//!    file's top level into [`RawBlock`]s. Both produce the same
//!    representation, so later stages never look at the dialect.
//! 3. [`schema`] maps each block to a declaration kind and checks its labels.
//! 4. [`normalize`] pulls the fixed attribute set out of the block body.
//!
//! Every stage reports problems as diagnostics instead of failing, and
//! [`parse_file`] bundles one file's results into a [`FileUnit`] that the
//! aggregator consumes.
//!
//! # Example
//!
//! ```rust,ignore
//! use tfinspect::parser::{classify, parse_file};
//! use tfinspect::Config;
//!
//! let config = Config::default();
//! let classified = classify::classify_directory("./infra".as_ref(), &config.scan)?;
//! for file in &classified.files {
//!     let unit = parse_file(file);
//!     println!("{}: {} items", file.name, unit.items.len());
//! }
//! ```

pub mod classify;
pub mod json;
pub mod native;
pub mod normalize;
pub mod schema;

pub use classify::{classify_directory, Classified, ConfigFile};
pub use normalize::{AttributeSet, Declaration, Normalized};

use crate::diagnostics::Diagnostic;
use crate::types::SourcePos;
use schema::Match;

/// File suffix of the native syntax.
pub const NATIVE_SUFFIX: &str = ".tf";

/// File suffix of the JSON syntax.
pub const JSON_SUFFIX: &str = ".tf.json";

/// The concrete syntax a configuration file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Native block syntax (`*.tf`)
    Native,
    /// JSON syntax (`*.tf.json`)
    Json,
}

impl Dialect {
    /// Detect the dialect from a file name, if it is a configuration file.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(JSON_SUFFIX) {
            Some(Self::Json)
        } else if name.ends_with(NATIVE_SUFFIX) {
            Some(Self::Native)
        } else {
            None
        }
    }

    /// The extractor for this dialect.
    #[must_use]
    pub fn extractor(self) -> &'static dyn BlockExtractor {
        match self {
            Self::Native => &native::NativeExtractor,
            Self::Json => &json::JsonExtractor,
        }
    }

    /// File name without the dialect suffix.
    #[must_use]
    pub fn strip_suffix(self, name: &str) -> &str {
        let suffix = match self {
            Self::Native => NATIVE_SUFFIX,
            Self::Json => JSON_SUFFIX,
        };
        name.strip_suffix(suffix).unwrap_or(name)
    }
}

/// Turns one file's contents into a sequence of blocks and problems.
///
/// Implementations must keep going after a locally malformed block whenever
/// the syntax allows finding the start of the next one.
pub trait BlockExtractor: Send + Sync {
    /// Extract the top-level blocks of `content`, in source order.
    fn extract(&self, content: &str, filename: &str) -> Vec<Extracted>;
}

/// One unit of extraction output.
#[derive(Debug, Clone)]
pub enum Extracted {
    /// A well-formed block
    Block(RawBlock),
    /// A problem that replaced a block (or the rest of the file)
    Problem(Diagnostic),
}

/// A block as written: type keyword, labels and body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    /// Block type keyword (`variable`, `resource`, ...)
    pub kind: String,
    /// Block labels in order
    pub labels: Vec<String>,
    /// Block contents
    pub body: RawBody,
    /// Where the block starts
    pub pos: SourcePos,
}

/// Attributes and nested blocks of a block, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBody {
    /// Arguments (`name = value`)
    pub attributes: Vec<RawAttribute>,
    /// Nested blocks
    pub blocks: Vec<RawBlock>,
}

impl RawBody {
    /// First attribute with the given name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&RawAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Nested blocks of the given type.
    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a RawBlock> + 'a {
        self.blocks.iter().filter(move |block| block.kind == kind)
    }
}

/// One argument of a block body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    /// Argument name
    pub name: String,
    /// Argument value
    pub value: AttrValue,
    /// Where the argument appears
    pub pos: SourcePos,
}

/// An argument value, decoded only as far as it is a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A literal (string, number, bool, null, list, map) in canonical form
    Literal(serde_json::Value),
    /// Anything else, kept as uninterpreted source text
    Expression(String),
}

impl AttrValue {
    /// The value as a string if it is a literal string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Literal(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Source-like text of the value: literal strings as-is, other literals
    /// in compact JSON, expressions as written.
    #[must_use]
    pub fn to_source_text(&self) -> String {
        match self {
            Self::Literal(serde_json::Value::String(s)) => s.clone(),
            Self::Literal(value) => value.to_string(),
            Self::Expression(text) => text.clone(),
        }
    }
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// 1-based line containing `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

/// Everything one file contributed, in source order.
#[derive(Debug, Clone)]
pub struct FileUnit {
    /// The file the items came from
    pub file: ConfigFile,
    /// Declarations and problems, in source order
    pub items: Vec<FileItem>,
}

/// A normalized declaration or a problem from one file.
#[derive(Debug, Clone)]
pub enum FileItem {
    /// A declaration ready for aggregation
    Declaration(Normalized),
    /// A problem to record as-is
    Problem(Diagnostic),
}

/// Read, extract, match and normalize one file.
///
/// Never fails: an unreadable file becomes a single error diagnostic without
/// a position.
#[must_use]
pub fn parse_file(file: &ConfigFile) -> FileUnit {
    let content = match std::fs::read_to_string(&file.path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(file = %file.path.display(), error = %e, "Failed to read file");
            let problem = Diagnostic::error("Failed to read file").with_detail(format!(
                "The configuration file \"{}\" could not be read: {e}.",
                file.name
            ));
            return FileUnit {
                file: file.clone(),
                items: vec![FileItem::Problem(problem)],
            };
        }
    };

    tracing::debug!(file = %file.path.display(), dialect = ?file.dialect, "Parsing file");
    let items = parse_content(&content, &file.name, file.dialect);
    FileUnit {
        file: file.clone(),
        items,
    }
}

/// Extract, match and normalize already-read file contents.
#[must_use]
pub fn parse_content(content: &str, filename: &str, dialect: Dialect) -> Vec<FileItem> {
    let mut items = Vec::new();

    for extracted in dialect.extractor().extract(content, filename) {
        let block = match extracted {
            Extracted::Block(block) => block,
            Extracted::Problem(problem) => {
                items.push(FileItem::Problem(problem));
                continue;
            }
        };

        let kind = match schema::match_block(&block) {
            Match::Recognized(kind) => kind,
            Match::Ignored => {
                tracing::trace!(kind = %block.kind, pos = %block.pos, "Ignoring unrecognized block");
                continue;
            }
            Match::Invalid(problem) => {
                items.push(FileItem::Problem(problem));
                continue;
            }
        };

        let (normalized, problems) = normalize::normalize(kind, &block);
        items.extend(problems.into_iter().map(FileItem::Problem));
        if let Some(normalized) = normalized {
            items.push(FileItem::Declaration(normalized));
        }
    }

    items
}
