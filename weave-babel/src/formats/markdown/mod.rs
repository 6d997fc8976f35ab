//! Markdown format implementation
//!
//! This module implements bidirectional conversion between the document tree
//! and Markdown as the editor reads and writes it: CommonMark plus tables,
//! task lists, strikethrough, math, subscript/superscript and an alignment
//! pseudo-fence.
//!
//! # Library Choice
//!
//! We use the `comrak` crate for the structural parse and for writing
//! CommonMark. Everything comrak cannot express is layered around it as
//! pipeline stages rather than patched into its AST.
//!
//! # Element Mapping Table
//!
//! | Tree element       | Markdown                      | Carried by                      |
//! |--------------------|-------------------------------|---------------------------------|
//! | paragraph/heading  | paragraph, `#` heading        | comrak                          |
//! | textAlign          | `:::{align=X}` ... `:::`      | [`codecs::text_align`]          |
//! | orderedList.start  | first item number             | [`codecs::ordered_list`]        |
//! | bulletList/task    | `-` / `- [x]`                 | comrak                          |
//! | table              | pipe table                    | comrak + [`normalize`]          |
//! | blockMath          | `$$ ... $$`                   | [`codecs::math`]                |
//! | inlineMath         | `$ ... $`                     | [`codecs::math`]                |
//! | subscript mark     | `~x~`                         | [`codecs::script`]              |
//! | superscript mark   | `^x^`                         | [`codecs::script`]              |
//! | highlight mark     | `<mark>x</mark>`              | inline HTML                     |
//! | link around marks  | `[**x**](u)`                  | serializer + [`normalize`]      |
//! | htmlBlock          | raw HTML block                | comrak                          |
//!
//! # Lossy Conversions
//!
//! - Soft line breaks are kept as `\n` inside text, hard breaks as `hardBreak`.
//! - The first table row is always written as the header row.
//! - Table cells with several blocks are joined with `<br>`.
//! - A literal delimiter inside a subscript or superscript span cannot be
//!   written; it ends the span early on the next parse.
//! - Ordered item markers are written with one space (`1. item`) whatever
//!   padding the source used.
//!
//! # Architecture
//!
//! [`pipeline::Pipeline`] is the entry point. It owns the stages and the
//! [`engine::MarkdownEngine`] (lexer + comrak + tree builder + serializer).

pub mod codecs;
pub mod engine;
pub(crate) mod fence;
pub mod lexer;
pub(crate) mod markers;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod serializer;

pub use engine::{MarkdownEngine, ParserConfig};
pub use pipeline::{Pipeline, PipelineOptions, Stage};
pub use serializer::{BlockSpan, Rendered};

use crate::error::FormatError;
use crate::format::Format;
use crate::tree::Document;

/// Format implementation for Markdown
#[derive(Debug, Default)]
pub struct MarkdownFormat {
    pipeline: Pipeline,
}

impl MarkdownFormat {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            pipeline: Pipeline::new(options),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "Markdown with math, scripts, task lists and alignment fences"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        Ok(self.pipeline.parse(source))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        crate::tree::validate(doc)?;
        Ok(self.pipeline.serialize(doc))
    }
}
