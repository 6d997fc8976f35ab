//! Inline token stream and the tokenizer registration seam.
//!
//! comrak owns block structure and the standard inline grammar. Extensions
//! that add inline syntax of their own (`~sub~`, `^sup^`) hook in here: the
//! lexer scans the inline text of every block, lets registered tokenizers
//! claim spans in priority order, and lowers the resulting stream back to
//! text comrak understands (`<sub>..</sub>`). The stream is discarded once the
//! lowered text has been handed to the structural parser.
//!
//! Built-in tokenizers exist only to protect constructs whose bytes must not
//! be touched: escapes, code spans, HTML and autolinks, link destinations,
//! bare URLs and `~~strike~~`.

use super::fence::FenceTracker;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// One lexed span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: &'static str,
    /// Exactly the source bytes the token consumed.
    pub raw: String,
    /// The token's payload (inner text for containers, raw for leaves).
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
}

impl Token {
    pub const TEXT: &'static str = "text";

    pub fn text(raw: &str) -> Self {
        Self::leaf(Self::TEXT, raw)
    }

    pub fn leaf(kind: &'static str, raw: &str) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
            text: raw.to_string(),
            children: Vec::new(),
        }
    }
}

/// An inline syntax extension.
///
/// `tokenize` is anchored: it either claims a prefix of `src` or returns
/// `None` and consumes nothing. `start` is a scan hint giving the byte offset
/// of the first place the tokenizer could possibly match.
pub trait InlineTokenizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher priorities are tried first.
    fn priority(&self) -> i32;

    fn start(&self, src: &str) -> Option<usize>;

    fn tokenize(&self, src: &str, lexer: &InlineLexer) -> Option<Token>;

    /// Writes the text handed to the structural parser for `token`.
    fn lower(&self, token: &Token, _lexer: &InlineLexer, out: &mut String) {
        out.push_str(&token.raw);
    }
}

/// Registered tokenizers in descending priority; ties keep registration
/// order.
pub struct InlineLexer {
    tokenizers: Vec<Box<dyn InlineTokenizer>>,
}

impl std::fmt::Debug for InlineLexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tokenizer_names()).finish()
    }
}

impl Default for InlineLexer {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl InlineLexer {
    /// A lexer with no tokenizers at all. Everything lexes as text.
    pub fn empty() -> Self {
        Self {
            tokenizers: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut lexer = Self::empty();
        lexer.register(EscapeTokenizer);
        lexer.register(CodeSpanTokenizer);
        lexer.register(HtmlTokenizer);
        lexer.register(LinkDestinationTokenizer);
        lexer.register(UrlTokenizer);
        lexer.register(StrikeTokenizer);
        lexer
    }

    pub fn register(&mut self, tokenizer: impl InlineTokenizer + 'static) {
        let priority = tokenizer.priority();
        let at = self
            .tokenizers
            .iter()
            .position(|t| t.priority() < priority)
            .unwrap_or(self.tokenizers.len());
        self.tokenizers.insert(at, Box::new(tokenizer));
    }

    pub fn tokenizer_names(&self) -> Vec<&'static str> {
        self.tokenizers.iter().map(|t| t.name()).collect()
    }

    pub fn has_tokenizer(&self, name: &str) -> bool {
        self.tokenizers.iter().any(|t| t.name() == name)
    }

    /// Lexes inline source into a flat token stream; container tokens carry
    /// their own nested stream.
    pub fn inline_tokens(&self, src: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pos = 0;
        let mut text_start = 0;

        while pos < src.len() {
            let rest = &src[pos..];
            let claimed = self
                .tokenizers
                .iter()
                .filter_map(|t| t.tokenize(rest, self))
                .find(|token| !token.raw.is_empty() && rest.starts_with(&token.raw));

            match claimed {
                Some(token) => {
                    if text_start < pos {
                        tokens.push(Token::text(&src[text_start..pos]));
                    }
                    pos += token.raw.len();
                    text_start = pos;
                    tokens.push(token);
                }
                None => pos += self.next_candidate(rest),
            }
        }

        if text_start < src.len() {
            tokens.push(Token::text(&src[text_start..]));
        }
        tokens
    }

    /// Bytes to skip from the start of `rest` to the next position any
    /// tokenizer could claim. Always at least one character.
    fn next_candidate(&self, rest: &str) -> usize {
        let step = rest.chars().next().map_or(1, char::len_utf8);
        let tail = &rest[step..];
        let hint = self
            .tokenizers
            .iter()
            .filter_map(|t| t.start(tail))
            .min()
            .unwrap_or(tail.len());
        step + hint
    }

    pub fn lower_tokens(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for token in tokens {
            self.lower_token(token, &mut out);
        }
        out
    }

    fn lower_token(&self, token: &Token, out: &mut String) {
        match self.tokenizers.iter().find(|t| t.name() == token.kind) {
            Some(tokenizer) => tokenizer.lower(token, self, out),
            None => out.push_str(&token.raw),
        }
    }

    /// Lexes and lowers one run of inline source.
    pub fn lower_inline(&self, src: &str) -> String {
        self.lower_tokens(&self.inline_tokens(src))
    }

    /// Lowers the inline text of every block in a Markdown document.
    ///
    /// Code (fenced or indented) and raw HTML blocks pass through untouched.
    /// Blank lines, headings, list items and table rows start new chunks, so
    /// no span ever crosses a block boundary, and table cells are lexed one at
    /// a time.
    pub fn lower_document(&self, markdown: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut chunk: Vec<&str> = Vec::new();
        let mut fences = FenceTracker::new();
        let mut in_html = false;
        let mut in_list = false;
        let mut previous_blank = true;

        for line in markdown.split('\n') {
            let trimmed = line.trim();
            let blank = trimmed.is_empty();

            let verbatim = if fences.is_code(line) {
                true
            } else if in_html {
                in_html = !blank;
                !blank
            } else if blank {
                false
            } else if previous_blank && chunk.is_empty() && HTML_BLOCK_START.is_match(line) {
                in_html = true;
                true
            } else {
                previous_blank && !in_list && indent_width(line) >= 4
            };

            if verbatim || blank {
                self.flush_chunk(&mut chunk, &mut out);
                out.push(line.to_string());
                previous_blank = blank;
                continue;
            }

            if LIST_MARKER.is_match(line) {
                in_list = true;
                self.flush_chunk(&mut chunk, &mut out);
            } else if indent_width(line) == 0 && previous_blank {
                in_list = false;
            }

            if is_table_row(trimmed) {
                self.flush_chunk(&mut chunk, &mut out);
                out.push(self.lower_table_row(line));
            } else if HEADING.is_match(line) {
                self.flush_chunk(&mut chunk, &mut out);
                out.push(self.lower_inline(line));
            } else {
                chunk.push(line);
            }
            previous_blank = false;
        }
        self.flush_chunk(&mut chunk, &mut out);
        out.join("\n")
    }

    fn flush_chunk(&self, chunk: &mut Vec<&str>, out: &mut Vec<String>) {
        if chunk.is_empty() {
            return;
        }
        let lowered = self.lower_inline(&chunk.join("\n"));
        out.extend(lowered.split('\n').map(str::to_string));
        chunk.clear();
    }

    fn lower_table_row(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut cell_start = 0;
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'|' => {
                    out.push_str(&self.lower_inline(&line[cell_start..i]));
                    out.push('|');
                    i += 1;
                    cell_start = i;
                }
                _ => i += 1,
            }
        }
        if cell_start < line.len() {
            out.push_str(&self.lower_inline(&line[cell_start..]));
        }
        out
    }
}

static HTML_BLOCK_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^ {0,3}(?:<(?:script|pre|style|textarea)(?:[\s>]|$)|<!--|<\?|<![A-Z]|<!\[CDATA\[|</?(?:address|article|aside|blockquote|body|caption|center|dd|details|dialog|div|dl|dt|fieldset|figcaption|figure|footer|form|h[1-6]|header|hr|html|li|main|nav|ol|p|section|summary|table|tbody|td|tfoot|th|thead|tr|ul)(?:[\s/>]|$))",
    )
    .unwrap()
});
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ *(?:[-*+]|\d{1,9}[.)])(?:[ \t]|$)").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}#{1,6}(?:[ \t]|$)").unwrap());

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Offset of the first occurrence of any of `needles`.
pub fn find_any(src: &str, needles: &[&str]) -> Option<usize> {
    needles.iter().filter_map(|n| src.find(n)).min()
}

/// Anchored regex match helper for tokenizers.
pub fn anchored<'s>(re: &Regex, src: &'s str) -> Option<regex::Captures<'s>> {
    re.captures(src).filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
}

struct EscapeTokenizer;

static ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\[!-/:-@\[-`{-~]").unwrap());

impl InlineTokenizer for EscapeTokenizer {
    fn name(&self) -> &'static str {
        "escape"
    }
    fn priority(&self) -> i32 {
        1000
    }
    fn start(&self, src: &str) -> Option<usize> {
        src.find('\\')
    }
    fn tokenize(&self, src: &str, _lexer: &InlineLexer) -> Option<Token> {
        let caps = anchored(&ESCAPE, src)?;
        Some(Token::leaf(self.name(), &caps[0]))
    }
}

/// Claims a whole code span, or a lone backtick run that has no closer.
struct CodeSpanTokenizer;

impl InlineTokenizer for CodeSpanTokenizer {
    fn name(&self) -> &'static str {
        "codespan"
    }
    fn priority(&self) -> i32 {
        900
    }
    fn start(&self, src: &str) -> Option<usize> {
        src.find('`')
    }
    fn tokenize(&self, src: &str, _lexer: &InlineLexer) -> Option<Token> {
        let run = src.len() - src.trim_start_matches('`').len();
        if run == 0 {
            return None;
        }
        let mut search = run;
        while let Some(offset) = src[search..].find('`') {
            let at = search + offset;
            let closing = src[at..].len() - src[at..].trim_start_matches('`').len();
            if closing == run {
                return Some(Token::leaf(self.name(), &src[..at + closing]));
            }
            search = at + closing;
        }
        Some(Token::leaf(self.name(), &src[..run]))
    }
}

/// Autolinks, inline tags and comments.
struct HtmlTokenizer;

static INLINE_HTML: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^<(?:[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>]*|[A-Za-z0-9.!#$%&'*+/=?^_`{|}~\-]+@[A-Za-z0-9.\-]+|/?[A-Za-z][A-Za-z0-9\-]*(?:\s[^<>]*)?/?|!--.*?--)>",
    )
    .unwrap()
});

impl InlineTokenizer for HtmlTokenizer {
    fn name(&self) -> &'static str {
        "html"
    }
    fn priority(&self) -> i32 {
        800
    }
    fn start(&self, src: &str) -> Option<usize> {
        src.find('<')
    }
    fn tokenize(&self, src: &str, _lexer: &InlineLexer) -> Option<Token> {
        let caps = anchored(&INLINE_HTML, src)?;
        Some(Token::leaf(self.name(), &caps[0]))
    }
}

/// The `](destination "title")` tail of a link or image. The label before it
/// is ordinary inline text and stays open to every tokenizer.
struct LinkDestinationTokenizer;

static LINK_DESTINATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\]\((?:<[^>\n]*>|[^\s()]*(?:\([^\s()]*\)[^\s()]*)*)(?:\s+(?:"[^"]*"|'[^']*'|\([^)]*\)))?\s*\)"#,
    )
    .unwrap()
});

impl InlineTokenizer for LinkDestinationTokenizer {
    fn name(&self) -> &'static str {
        "linkDestination"
    }
    fn priority(&self) -> i32 {
        700
    }
    fn start(&self, src: &str) -> Option<usize> {
        src.find("](")
    }
    fn tokenize(&self, src: &str, _lexer: &InlineLexer) -> Option<Token> {
        let caps = anchored(&LINK_DESTINATION, src)?;
        Some(Token::leaf(self.name(), &caps[0]))
    }
}

/// Bare URLs that the autolinker will turn into links.
struct UrlTokenizer;

static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:https?|ftp)://[^\s<]+").unwrap());

impl InlineTokenizer for UrlTokenizer {
    fn name(&self) -> &'static str {
        "url"
    }
    fn priority(&self) -> i32 {
        600
    }
    fn start(&self, src: &str) -> Option<usize> {
        find_any(src, &["http://", "https://", "ftp://"])
    }
    fn tokenize(&self, src: &str, _lexer: &InlineLexer) -> Option<Token> {
        let caps = anchored(&BARE_URL, src)?;
        Some(Token::leaf(self.name(), &caps[0]))
    }
}

/// `~~strike~~`, claimed before the single-tilde subscript can split it.
struct StrikeTokenizer;

static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^~~(.+?)~~").unwrap());

impl InlineTokenizer for StrikeTokenizer {
    fn name(&self) -> &'static str {
        "strike"
    }
    fn priority(&self) -> i32 {
        60
    }
    fn start(&self, src: &str) -> Option<usize> {
        src.find("~~")
    }
    fn tokenize(&self, src: &str, lexer: &InlineLexer) -> Option<Token> {
        let caps = anchored(&STRIKE, src)?;
        Some(Token {
            kind: self.name(),
            raw: caps[0].to_string(),
            text: caps[1].to_string(),
            children: lexer.inline_tokens(&caps[1]),
        })
    }
    fn lower(&self, token: &Token, lexer: &InlineLexer, out: &mut String) {
        out.push_str("~~");
        out.push_str(&lexer.lower_tokens(&token.children));
        out.push_str("~~");
    }
}
