//! The core structural parser and serializer, built on comrak.
//!
//! The engine knows nothing about stages. It lowers the inline token stream,
//! hands the result to comrak, and converts between comrak's AST and the
//! document tree.

use super::lexer::{InlineLexer, Token};
use super::parser;
use super::pipeline::MarkdownStorage;
use super::serializer::{self, Rendered};
use crate::error::FormatError;
use crate::tree::{validate, Document};
use comrak::ComrakOptions;

/// Global options of the structural parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Keep raw HTML blocks. When off they are read as literal text.
    pub html: bool,
    /// Read a single newline inside a paragraph as a hard break.
    pub breaks: bool,
    /// Turn bare URLs into links.
    pub linkify: bool,
    /// Smart quotes and dashes.
    pub typographer: bool,
    pub tables: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            html: true,
            breaks: false,
            linkify: true,
            typographer: false,
            tables: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct MarkdownEngine {
    storage: MarkdownStorage,
}

impl MarkdownEngine {
    pub fn new(storage: MarkdownStorage) -> Self {
        Self { storage }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.storage.parser
    }

    pub fn lexer(&self) -> &InlineLexer {
        &self.storage.lexer
    }

    pub(crate) fn comrak_options(&self) -> ComrakOptions<'static> {
        let config = &self.storage.parser;
        let mut options = ComrakOptions::default();
        options.extension.table = config.tables;
        options.extension.strikethrough = true;
        options.extension.autolink = config.linkify;
        options.extension.tasklist = true;
        options.extension.math_dollars = true;
        options.parse.smart = config.typographer;
        // lowered sub/sup/mark tags are inline HTML
        options.render.unsafe_ = true;
        options
    }

    /// The inline token stream of a Markdown snippet.
    pub fn tokens(&self, markdown: &str) -> Vec<Token> {
        self.storage.lexer.inline_tokens(markdown)
    }

    /// The text handed to comrak after every tokenizer has been lowered.
    pub fn lower(&self, markdown: &str) -> String {
        self.storage.lexer.lower_document(markdown)
    }

    pub fn parse(&self, markdown: &str) -> Result<Document, FormatError> {
        let lowered = self.lower(markdown);
        let document =
            parser::build_document(&lowered, &self.comrak_options(), &self.storage.parser)?;
        validate(&document)?;
        Ok(document)
    }

    pub fn serialize(&self, document: &Document) -> Result<Rendered, FormatError> {
        validate(document)?;
        serializer::render_blocks(document, &self.comrak_options())
    }

    /// Renders a Markdown snippet straight to HTML, math as comrak's
    /// `data-math-style` spans.
    pub fn render_html(&self, markdown: &str) -> String {
        comrak::markdown_to_html(&self.lower(markdown), &self.comrak_options())
    }
}
