//! Markdown parsing (Markdown → document tree)
//!
//! Builds the tree from comrak's AST. The input has already been lowered by
//! the inline lexer, so subscript and superscript arrive as `<sub>`/`<sup>`
//! inline HTML and are turned into marks here.
//!
//! Mapping notes:
//! - a paragraph holding nothing but `$$..$$` becomes a `blockMath` node, as
//!   does a fenced block with the `math` info string;
//! - lists whose items carry task markers become task lists;
//! - table cells get the column alignment and their inline content wrapped
//!   in a paragraph;
//! - HTML blocks that start with `<table`, `<p` or `<h1`..`<h6` go through the
//!   HTML importer (this is how aligned paragraphs come back); other HTML
//!   blocks are kept raw, or read as text when HTML is disabled;
//! - the `<!-- end list -->` separator is dropped.

use super::engine::ParserConfig;
use super::serializer::END_LIST_COMMENT;
use crate::error::FormatError;
use crate::formats::html::parser::import_blocks;
use crate::tree::{
    nodes::add_mark, CellAttrs, CodeBlock, CodeBlockAttrs, Container, Document, Image, ImageAttrs,
    Mark, MarkKind, Node, TableCell, TaskItem, TaskItemAttrs, TextAlign,
};
use comrak::nodes::{AstNode, ListType, NodeCodeBlock, NodeList, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, ComrakOptions};
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORTABLE_HTML: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<(?:table|p|h[1-6])(?:[\s/>]|$)").unwrap());

/// Parses lowered Markdown into a document tree.
pub fn build_document(
    markdown: &str,
    options: &ComrakOptions,
    config: &ParserConfig,
) -> Result<Document, FormatError> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, options);
    let builder = TreeBuilder { config };
    Ok(Document::new(builder.blocks(root)?))
}

struct TreeBuilder<'c> {
    config: &'c ParserConfig,
}

impl TreeBuilder<'_> {
    fn blocks<'a>(&self, parent: &'a AstNode<'a>) -> Result<Vec<Node>, FormatError> {
        let mut out = Vec::new();
        for child in parent.children() {
            self.block(child, &mut out)?;
        }
        Ok(out)
    }

    fn block<'a>(&self, node: &'a AstNode<'a>, out: &mut Vec<Node>) -> Result<(), FormatError> {
        let node_data = node.data.borrow();

        match &node_data.value {
            NodeValue::Paragraph => match display_math(node) {
                Some(latex) => out.push(Node::block_math(latex)),
                None => out.push(Node::paragraph(self.inlines(node))),
            },

            NodeValue::Heading(heading) => {
                out.push(Node::heading(heading.level, self.inlines(node)));
            }

            NodeValue::BlockQuote => {
                out.push(Node::Blockquote(Container {
                    content: self.blocks(node)?,
                }));
            }

            NodeValue::List(list) => out.push(self.list(node, list)?),

            NodeValue::CodeBlock(code) => out.push(code_block(code)),

            NodeValue::ThematicBreak => out.push(Node::HorizontalRule),

            NodeValue::HtmlBlock(html) => self.html_block(&html.literal, out),

            NodeValue::Table(_) => out.push(self.table(node)?),

            other => {
                tracing::debug!(node = ?other, "dropping unsupported Markdown block");
            }
        }

        Ok(())
    }

    fn list<'a>(&self, node: &'a AstNode<'a>, list: &NodeList) -> Result<Node, FormatError> {
        let is_task_list = node
            .children()
            .any(|item| matches!(item.data.borrow().value, NodeValue::TaskItem(_)));

        let mut items = Vec::new();
        for item in node.children() {
            let checked = match &item.data.borrow().value {
                NodeValue::TaskItem(symbol) => symbol.is_some(),
                _ => false,
            };
            let content = self.blocks(item)?;
            items.push(if is_task_list {
                Node::TaskItem(TaskItem {
                    attrs: TaskItemAttrs { checked },
                    content,
                })
            } else {
                Node::list_item(content)
            });
        }

        Ok(if is_task_list {
            Node::TaskList(Container { content: items })
        } else if list.list_type == ListType::Ordered {
            Node::ordered_list(u32::try_from(list.start).unwrap_or(u32::MAX), items)
        } else {
            Node::bullet_list(items)
        })
    }

    fn html_block(&self, literal: &str, out: &mut Vec<Node>) {
        let html = literal.trim();
        if html.is_empty() || html == END_LIST_COMMENT {
            return;
        }
        if !self.config.html {
            out.push(Node::paragraph(vec![Node::text(html)]));
        } else if IMPORTABLE_HTML.is_match(html) {
            out.extend(import_blocks(html));
        } else {
            out.push(Node::HtmlBlock(crate::tree::HtmlBlock {
                attrs: crate::tree::HtmlAttrs {
                    html: html.to_string(),
                },
            }));
        }
    }

    fn table<'a>(&self, node: &'a AstNode<'a>) -> Result<Node, FormatError> {
        let alignments = match &node.data.borrow().value {
            NodeValue::Table(table) => table.alignments.clone(),
            _ => Vec::new(),
        };

        let mut rows = Vec::new();
        for row in node.children() {
            let header = if let NodeValue::TableRow(header) = &row.data.borrow().value {
                *header
            } else {
                return Err(FormatError::ParseError(
                    "table contains a node that is not a row".to_string(),
                ));
            };

            let mut cells = Vec::new();
            for (column, cell) in row.children().enumerate() {
                let attrs = CellAttrs {
                    align: alignments.get(column).copied().and_then(cell_align),
                    ..CellAttrs::default()
                };
                let cell = TableCell {
                    attrs,
                    content: vec![Node::paragraph(self.inlines(cell))],
                };
                cells.push(if header {
                    Node::TableHeader(cell)
                } else {
                    Node::TableCell(cell)
                });
            }
            rows.push(Node::TableRow(Container { content: cells }));
        }
        Ok(Node::Table(Container { content: rows }))
    }

    fn inlines<'a>(&self, node: &'a AstNode<'a>) -> Vec<Node> {
        let mut builder = InlineBuilder {
            breaks: self.config.breaks,
            marks: Vec::new(),
            out: Vec::new(),
        };
        for child in node.children() {
            builder.visit(child);
        }
        builder.out
    }
}

fn cell_align(align: TableAlignment) -> Option<TextAlign> {
    match align {
        TableAlignment::Left => Some(TextAlign::Left),
        TableAlignment::Center => Some(TextAlign::Center),
        TableAlignment::Right => Some(TextAlign::Right),
        TableAlignment::None => None,
    }
}

fn code_block(code: &NodeCodeBlock) -> Node {
    let language = code.info.split_whitespace().next().map(str::to_string);
    let literal = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
    if language.as_deref() == Some("math") {
        return Node::block_math(literal);
    }
    let content = if literal.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(literal)]
    };
    Node::CodeBlock(CodeBlock {
        attrs: CodeBlockAttrs { language },
        content,
    })
}

/// The LaTeX of a paragraph whose only content is display math.
fn display_math<'a>(paragraph: &'a AstNode<'a>) -> Option<String> {
    let mut content = paragraph.children().filter(|child| !is_blank_inline(child));
    let only = content.next()?;
    if content.next().is_some() {
        return None;
    }
    match &only.data.borrow().value {
        NodeValue::Math(math) if math.display_math => {
            Some(math.literal.trim_matches('\n').to_string())
        }
        _ => None,
    }
}

fn is_blank_inline(node: &AstNode<'_>) -> bool {
    match &node.data.borrow().value {
        NodeValue::SoftBreak | NodeValue::LineBreak => true,
        NodeValue::Text(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => out.push_str(text),
        NodeValue::Code(code) => out.push_str(&code.literal),
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Flattens comrak's nested inline nodes into marked text runs.
struct InlineBuilder {
    breaks: bool,
    /// Marks currently open, outermost first.
    marks: Vec<Mark>,
    out: Vec<Node>,
}

impl InlineBuilder {
    fn visit<'a>(&mut self, node: &'a AstNode<'a>) {
        let node_data = node.data.borrow();

        match &node_data.value {
            NodeValue::Text(text) => self.push_text(text, None),
            NodeValue::Code(code) => self.push_text(&code.literal, Some(Mark::Code)),
            NodeValue::SoftBreak if self.breaks => self.out.push(Node::HardBreak),
            NodeValue::SoftBreak => self.push_text("\n", None),
            NodeValue::LineBreak => self.out.push(Node::HardBreak),
            NodeValue::Emph => self.with_mark(Mark::Italic, node),
            NodeValue::Strong => self.with_mark(Mark::Bold, node),
            NodeValue::Strikethrough => self.with_mark(Mark::Strike, node),
            NodeValue::Superscript => self.with_mark(Mark::Superscript, node),
            NodeValue::Link(link) => {
                self.with_mark(Mark::link(link.url.clone(), non_empty(&link.title)), node);
            }
            NodeValue::Image(link) => {
                let mut alt = String::new();
                collect_text(node, &mut alt);
                self.out.push(Node::Image(Image {
                    attrs: ImageAttrs {
                        src: link.url.clone(),
                        alt: non_empty(&alt),
                        title: non_empty(&link.title),
                    },
                }));
            }
            NodeValue::Math(math) => {
                self.out
                    .push(Node::inline_math(math.literal.trim_matches('\n')));
            }
            NodeValue::HtmlInline(html) => self.html_inline(html),
            _ => {
                for child in node.children() {
                    self.visit(child);
                }
            }
        }
    }

    fn with_mark<'a>(&mut self, mark: Mark, node: &'a AstNode<'a>) {
        let depth = self.marks.len();
        self.marks.push(mark);
        for child in node.children() {
            self.visit(child);
        }
        // also closes inline tags left open inside this node
        self.marks.truncate(depth);
    }

    fn html_inline(&mut self, html: &str) {
        let tag = html.trim().to_ascii_lowercase();
        match tag.as_str() {
            "<sub>" => self.marks.push(Mark::Subscript),
            "</sub>" => self.close(MarkKind::Subscript),
            "<sup>" => self.marks.push(Mark::Superscript),
            "</sup>" => self.close(MarkKind::Superscript),
            "<mark>" => self.marks.push(Mark::Highlight),
            "</mark>" => self.close(MarkKind::Highlight),
            "<br>" | "<br/>" | "<br />" => self.out.push(Node::HardBreak),
            _ => tracing::debug!(html, "dropping inline HTML"),
        }
    }

    fn close(&mut self, kind: MarkKind) {
        if let Some(index) = self.marks.iter().rposition(|m| m.kind() == kind) {
            self.marks.remove(index);
        }
    }

    fn push_text(&mut self, text: &str, extra: Option<Mark>) {
        if text.is_empty() {
            return;
        }
        let mut marks = Vec::new();
        for mark in self.marks.iter().cloned().chain(extra) {
            add_mark(&mut marks, mark);
        }

        if let Some(Node::Text(last)) = self.out.last_mut() {
            if last.marks == marks {
                last.text.push_str(text);
                return;
            }
        }
        self.out.push(Node::marked_text(text, marks));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Mark, TextAlign};

    fn parse(markdown: &str) -> Document {
        let mut options = ComrakOptions::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.tasklist = true;
        options.extension.math_dollars = true;
        build_document(markdown, &options, &ParserConfig::default()).unwrap()
    }

    fn texts(node: &Node) -> Vec<(String, Vec<Mark>)> {
        node.content()
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some((t.text.clone(), t.marks.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn heading_and_paragraph() {
        let doc = parse("## Title\n\nHello *world*");
        assert!(matches!(&doc.content[0], Node::Heading(h) if h.attrs.level == 2));
        assert_eq!(
            texts(&doc.content[1]),
            vec![
                ("Hello ".to_string(), vec![]),
                ("world".to_string(), vec![Mark::Italic])
            ]
        );
    }

    #[test]
    fn lowered_script_tags_become_marks() {
        let doc = parse("H<sub>2</sub>O and x<sup>**b**</sup>");
        let runs = texts(&doc.content[0]);
        assert_eq!(runs[1], ("2".to_string(), vec![Mark::Subscript]));
        assert_eq!(
            runs[3],
            ("b".to_string(), vec![Mark::Bold, Mark::Superscript])
        );
    }

    #[test]
    fn ordered_list_keeps_start() {
        let doc = parse("5. a\n6. b");
        assert!(matches!(&doc.content[0], Node::OrderedList(l) if l.attrs.start == 5));
    }

    #[test]
    fn task_lists() {
        let doc = parse("- [x] done\n- [ ] todo");
        let Node::TaskList(list) = &doc.content[0] else {
            panic!("expected a task list");
        };
        let checked: Vec<bool> = list
            .content
            .iter()
            .map(|item| matches!(item, Node::TaskItem(t) if t.attrs.checked))
            .collect();
        assert_eq!(checked, vec![true, false]);
    }

    #[test]
    fn display_math_paragraph_becomes_block_math() {
        let doc = parse("$$\nx^2\n$$");
        assert_eq!(doc.content, vec![Node::block_math("x^2")]);
        let doc = parse("```math\na+b\n```");
        assert_eq!(doc.content, vec![Node::block_math("a+b")]);
    }

    #[test]
    fn inline_math_keeps_source() {
        let doc = parse("area $\\pi r^2$ here");
        assert!(doc.content[0].content().contains(&Node::inline_math("\\pi r^2")));
    }

    #[test]
    fn table_cells_carry_alignment() {
        let doc = parse("| a | b |\n|:-:|---|\n| 1 | 2 |");
        let Node::Table(table) = &doc.content[0] else {
            panic!("expected a table");
        };
        let Node::TableHeader(first) = &table.content[0].content()[0] else {
            panic!("expected a header cell");
        };
        assert_eq!(first.attrs.align, Some(TextAlign::Center));
        assert!(matches!(&table.content[1].content()[1], Node::TableCell(c) if c.attrs.align.is_none()));
    }

    #[test]
    fn end_list_comment_is_dropped() {
        let doc = parse("- a\n\n<!-- end list -->\n\n- b");
        assert_eq!(doc.content.len(), 2);
        assert!(doc.content.iter().all(|n| matches!(n, Node::BulletList(_))));
    }

    #[test]
    fn other_html_blocks_stay_raw() {
        let doc = parse("<div>\nraw\n</div>");
        assert!(matches!(&doc.content[0], Node::HtmlBlock(h) if h.attrs.html == "<div>\nraw\n</div>"));
    }

    #[test]
    fn code_block_language() {
        let doc = parse("```rust\nfn main() {}\n```");
        assert_eq!(
            doc.content[0],
            Node::CodeBlock(CodeBlock {
                attrs: CodeBlockAttrs {
                    language: Some("rust".to_string())
                },
                content: vec![Node::text("fn main() {}")],
            })
        );
    }
}
