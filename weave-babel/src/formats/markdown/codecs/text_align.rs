//! Paragraph and heading alignment through the `:::{align=X}` pseudo-fence.
//!
//! Markdown has no alignment syntax. On serialize, every top-level paragraph
//! or heading whose alignment differs from the default has its line span
//! wrapped in `:::{align=X}` / `:::`. On parse, each fence is rendered to an
//! HTML block with a `text-align` style, which the HTML importer maps back to
//! the alignment attribute.

use super::super::fence::FenceTracker;
use super::super::pipeline::{ParseContext, SerializeContext, Stage};
use crate::error::StageError;
use crate::tree::{walk, TextAlign};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:::\{align=(\w+)\}\s*$").unwrap());
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(p|h[1-6])>").unwrap());

const FENCE_CLOSE: &str = ":::";

/// Which blocks may carry an alignment and which values are recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAlignOptions {
    pub types: Vec<String>,
    pub alignments: Vec<TextAlign>,
    pub default_alignment: TextAlign,
}

impl Default for TextAlignOptions {
    fn default() -> Self {
        Self {
            types: vec!["heading".to_string(), "paragraph".to_string()],
            alignments: vec![
                TextAlign::Left,
                TextAlign::Center,
                TextAlign::Right,
                TextAlign::Justify,
            ],
            default_alignment: TextAlign::Left,
        }
    }
}

#[derive(Debug, Default)]
pub struct TextAlignFence {
    options: TextAlignOptions,
}

impl TextAlignFence {
    pub fn new(options: TextAlignOptions) -> Self {
        Self { options }
    }

    fn recognised(&self, value: &str) -> Option<TextAlign> {
        TextAlign::parse(value).filter(|align| self.options.alignments.contains(align))
    }
}

impl Stage for TextAlignFence {
    fn name(&self) -> &'static str {
        "textAlign"
    }

    fn preprocess<'a>(
        &self,
        markdown: &'a str,
        ctx: &ParseContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        if !markdown.contains(":::{align=") {
            return Ok(Cow::Borrowed(markdown));
        }

        let lines: Vec<&str> = markdown.split('\n').collect();
        let mut out: Vec<String> = Vec::with_capacity(lines.len());
        let mut fences = FenceTracker::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let in_code = fences.is_code(line);
            let caps = match FENCE_OPEN.captures(line) {
                Some(caps) if !in_code => caps,
                _ => {
                    out.push(line.to_string());
                    i += 1;
                    continue;
                }
            };
            let Some(close) = (i + 1..lines.len()).find(|j| lines[*j].trim() == FENCE_CLOSE) else {
                // unterminated fence stays literal text
                out.push(line.to_string());
                i += 1;
                continue;
            };

            let content = lines[i + 1..close].join("\n");
            let replacement = match self.recognised(&caps[1]) {
                Some(align) => {
                    let html = ctx.engine.render_html(&content);
                    aligned_html(html.trim_end(), align)
                }
                None => content,
            };

            if out.last().is_some_and(|l| !l.trim().is_empty()) {
                out.push(String::new());
            }
            out.extend(replacement.split('\n').map(str::to_string));
            if lines.get(close + 1).is_some_and(|l| !l.trim().is_empty()) {
                out.push(String::new());
            }
            i = close + 1;
        }

        Ok(Cow::Owned(out.join("\n")))
    }

    fn postprocess<'a>(
        &self,
        markdown: &'a str,
        ctx: &SerializeContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        let targets: Vec<(usize, TextAlign)> =
            walk::aligned_blocks(ctx.document, self.options.default_alignment)
                .into_iter()
                .filter(|(index, align)| {
                    let type_name = ctx.document.content[*index].type_name();
                    self.options.types.iter().any(|t| t == type_name)
                        && self.options.alignments.contains(align)
                })
                .collect();
        if targets.is_empty() {
            return Ok(Cow::Borrowed(markdown));
        }

        let mut lines: Vec<String> = markdown.split('\n').map(str::to_string).collect();
        for (index, align) in targets.iter().rev() {
            let span = ctx
                .blocks
                .iter()
                .find(|span| span.index == *index)
                .ok_or_else(|| StageError::new(self.name(), format!("no span for block {index}")))?;
            if span.lines.end > lines.len() {
                return Err(StageError::new(
                    self.name(),
                    format!("span {:?} is outside the output", span.lines),
                ));
            }
            if span.lines.is_empty() {
                // nothing was written for an empty block
                continue;
            }
            lines.insert(span.lines.end, FENCE_CLOSE.to_string());
            lines.insert(span.lines.start, format!(":::{{align={}}}", align.as_str()));
        }
        Ok(Cow::Owned(lines.join("\n")))
    }
}

/// Adds the alignment style to every paragraph and heading opening tag.
fn aligned_html(html: &str, align: TextAlign) -> String {
    let style = format!(r#"<$1 style="text-align: {}">"#, align.as_str());
    BLOCK_TAG.replace_all(html, style.as_str()).into_owned()
}
