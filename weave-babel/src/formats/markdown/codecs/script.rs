//! `~subscript~` and `^superscript^`.
//!
//! Both tokenizers sit below the math tokenizers so `$x^2$` is claimed whole
//! before `^` can fire. The captured text is lexed again, so emphasis, links
//! and code still work inside a span. Tokens lower to `<sub>`/`<sup>` inline
//! HTML, which the tree builder turns into marks; the serializer writes the
//! marks back with the single-character delimiters.
//!
//! There is no escape inside a span. A literal `~` or `^` in text is written
//! as `\~` / `\^` by the serializer and the escape tokenizer claims it before
//! these tokenizers see it.

use super::super::lexer::{anchored, InlineLexer, InlineTokenizer, Token};
use super::super::pipeline::{MarkdownStorage, Stage};
use once_cell::sync::Lazy;
use regex::Regex;

pub const SCRIPT_PRIORITY: i32 = 50;

static SUBSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^~([^~]+)~").unwrap());
static SUPERSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\^([^^]+)\^").unwrap());

/// A single-delimiter span lowered to an HTML element.
pub struct ScriptTokenizer {
    name: &'static str,
    trigger: char,
    tag: &'static str,
    pattern: &'static Lazy<Regex>,
}

impl ScriptTokenizer {
    pub fn subscript() -> Self {
        Self {
            name: "subscript",
            trigger: '~',
            tag: "sub",
            pattern: &SUBSCRIPT,
        }
    }

    pub fn superscript() -> Self {
        Self {
            name: "superscript",
            trigger: '^',
            tag: "sup",
            pattern: &SUPERSCRIPT,
        }
    }
}

impl InlineTokenizer for ScriptTokenizer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        SCRIPT_PRIORITY
    }

    fn start(&self, src: &str) -> Option<usize> {
        src.find(self.trigger)
    }

    fn tokenize(&self, src: &str, lexer: &InlineLexer) -> Option<Token> {
        let caps = anchored(self.pattern, src)?;
        let inner = &caps[1];
        Some(Token {
            kind: self.name,
            raw: caps[0].to_string(),
            text: inner.to_string(),
            children: lexer.inline_tokens(inner),
        })
    }

    fn lower(&self, token: &Token, lexer: &InlineLexer, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        out.push('>');
        out.push_str(&lexer.lower_tokens(&token.children));
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

/// Registers the subscript tokenizer.
pub struct Subscript;

impl Stage for Subscript {
    fn name(&self) -> &'static str {
        "subscript"
    }

    fn setup(&self, storage: &mut MarkdownStorage) {
        storage.lexer.register(ScriptTokenizer::subscript());
    }
}

/// Registers the superscript tokenizer.
pub struct Superscript;

impl Stage for Superscript {
    fn name(&self) -> &'static str {
        "superscript"
    }

    fn setup(&self, storage: &mut MarkdownStorage) {
        storage.lexer.register(ScriptTokenizer::superscript());
    }
}
