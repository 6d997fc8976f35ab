//! `$$block$$` and `$inline$` math.
//!
//! The tokenizers only claim the spans so nothing of lower priority can touch
//! the LaTeX; comrak's dollar-math extension then builds the math nodes. The
//! source is stored verbatim and never validated here.

use super::super::lexer::{anchored, InlineLexer, InlineTokenizer, Token};
use super::super::pipeline::{MarkdownStorage, Stage};
use once_cell::sync::Lazy;
use regex::Regex;

pub const BLOCK_MATH_PRIORITY: i32 = 110;
pub const INLINE_MATH_PRIORITY: i32 = 100;

static BLOCK_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\$\$\n?(.+?)\n?\$\$").unwrap());
static INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$([^$\n]+?)\$").unwrap());

pub struct MathTokenizer {
    display: bool,
}

impl MathTokenizer {
    pub fn block() -> Self {
        Self { display: true }
    }

    pub fn inline() -> Self {
        Self { display: false }
    }
}

impl InlineTokenizer for MathTokenizer {
    fn name(&self) -> &'static str {
        if self.display {
            "blockMath"
        } else {
            "inlineMath"
        }
    }

    fn priority(&self) -> i32 {
        if self.display {
            BLOCK_MATH_PRIORITY
        } else {
            INLINE_MATH_PRIORITY
        }
    }

    fn start(&self, src: &str) -> Option<usize> {
        if self.display {
            src.find("$$")
        } else {
            src.find('$')
        }
    }

    fn tokenize(&self, src: &str, _lexer: &InlineLexer) -> Option<Token> {
        if self.display {
            let caps = anchored(&BLOCK_MATH, src)?;
            return Some(Token {
                kind: self.name(),
                raw: caps[0].to_string(),
                text: caps[1].to_string(),
                children: Vec::new(),
            });
        }
        let caps = anchored(&INLINE_MATH, src)?;
        let whole = caps.get(0)?;
        // `$a$$` is not inline math followed by a dollar
        if src[whole.end()..].starts_with('$') {
            return None;
        }
        Some(Token {
            kind: self.name(),
            raw: whole.as_str().to_string(),
            text: caps[1].to_string(),
            children: Vec::new(),
        })
    }
}

/// Registers both math tokenizers.
pub struct Mathematics;

impl Stage for Mathematics {
    fn name(&self) -> &'static str {
        "mathematics"
    }

    fn setup(&self, storage: &mut MarkdownStorage) {
        storage.lexer.register(MathTokenizer::block());
        storage.lexer.register(MathTokenizer::inline());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer() -> InlineLexer {
        let mut lexer = InlineLexer::empty();
        lexer.register(MathTokenizer::block());
        lexer.register(MathTokenizer::inline());
        lexer
    }

    #[test]
    fn block_math_is_multiline_and_minimal() {
        let tokens = lexer().inline_tokens("$$\na\\\\\nb\n$$ then $$c$$");
        assert_eq!(tokens[0].kind, "blockMath");
        assert_eq!(tokens[0].text, "a\\\\\nb");
        assert_eq!(tokens[2].text, "c");
    }

    #[test]
    fn inline_math_captures_source_verbatim() {
        let tokens = lexer().inline_tokens("let $x_1 + y$ be");
        assert_eq!(tokens[1].kind, "inlineMath");
        assert_eq!(tokens[1].text, "x_1 + y");
    }

    #[test]
    fn inline_math_does_not_cross_lines() {
        let tokens = lexer().inline_tokens("$a\nb$");
        assert!(tokens.iter().all(|t| t.kind == Token::TEXT));
    }

    #[test]
    fn double_dollar_is_never_two_inline_delimiters() {
        let tokens = lexer().inline_tokens("$a$$");
        assert!(tokens.iter().all(|t| t.kind != "inlineMath"));
        let tokens = lexer().inline_tokens("$$ unclosed");
        assert!(tokens.iter().all(|t| t.kind == Token::TEXT));
    }

    #[test]
    fn lowering_keeps_source() {
        assert_eq!(lexer().lower_inline("$x^2$"), "$x^2$");
    }
}
