//! Markdown serialization (document tree → Markdown)
//!
//! Pipeline: tree → one comrak AST per top-level block → CommonMark text.
//!
//! Every top-level block is rendered on its own and the results are joined
//! with a single blank line. While joining, the serializer records which
//! output lines each block produced ([`BlockSpan`]). Codecs that patch the
//! text afterwards (list starts, alignment fences) address blocks through
//! these spans instead of re-scanning the output.
//!
//! The serializer deliberately numbers every ordered list from 1 and knows
//! nothing about alignment; both are restored by pipeline stages. comrak pads
//! single-digit ordered markers to four columns; that padding is tightened to
//! one space before the block is joined.
//!
//! Constructs comrak has no node for are written as raw inline HTML, which
//! comrak emits verbatim:
//! - subscript, superscript and highlight delimiters;
//! - inline math (`$..$`);
//! - backslash escapes for literal `~`, `^` and `$`, so the tokenizers never
//!   read plain text as a delimiter.

use super::markers::tighten_markers;
use crate::error::FormatError;
use crate::tree::{Document, Mark, MarkKind, Node, TextAlign};
use comrak::nodes::{
    Ast, AstNode, ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeLink, NodeList, NodeTable, NodeValue, TableAlignment,
};
use comrak::{format_commonmark, Arena, ComrakOptions};
use serde::Serialize;
use std::cell::RefCell;
use std::ops::Range;

/// Separates adjacent top-level lists that would otherwise merge on reparse.
pub const END_LIST_COMMENT: &str = "<!-- end list -->";

/// The output lines one top-level block occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSpan {
    /// Index of the block in `Document::content`.
    pub index: usize,
    /// Half-open range of line indices. Empty when the block rendered to
    /// nothing.
    pub lines: Range<usize>,
}

/// Core serializer output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub markdown: String,
    pub blocks: Vec<BlockSpan>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum InlineContext {
    Flow,
    TableCell,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

/// Renders `doc` block by block, recording each block's span.
pub fn render_blocks(doc: &Document, options: &ComrakOptions) -> Result<Rendered, FormatError> {
    let mut lines: Vec<String> = Vec::new();
    let mut blocks = Vec::with_capacity(doc.content.len());
    let mut previous_list: Option<ListKind> = None;

    for (index, block) in doc.content.iter().enumerate() {
        let text = render_block(block, options)?;
        if text.is_empty() {
            blocks.push(BlockSpan {
                index,
                lines: lines.len()..lines.len(),
            });
            continue;
        }

        let list = list_kind(block);
        if !lines.is_empty() {
            lines.push(String::new());
            if list.is_some() && list == previous_list {
                lines.push(END_LIST_COMMENT.to_string());
                lines.push(String::new());
            }
        }
        let start = lines.len();
        lines.extend(text.split('\n').map(str::to_string));
        blocks.push(BlockSpan {
            index,
            lines: start..lines.len(),
        });
        previous_list = list;
    }

    Ok(Rendered {
        markdown: lines.join("\n"),
        blocks,
    })
}

fn list_kind(block: &Node) -> Option<ListKind> {
    match block {
        Node::BulletList(_) | Node::TaskList(_) => Some(ListKind::Bullet),
        Node::OrderedList(_) => Some(ListKind::Ordered),
        _ => None,
    }
}

/// Renders one top-level block without a trailing newline.
fn render_block(block: &Node, options: &ComrakOptions) -> Result<String, FormatError> {
    match block {
        Node::BlockMath(math) => return Ok(format!("$$\n{}\n$$", math.attrs.latex.trim())),
        Node::HtmlBlock(html) => return Ok(html.attrs.html.trim_end().to_string()),
        _ => {}
    }

    let arena = Arena::new();
    let root = alloc(&arena, NodeValue::Document);
    append_block(&arena, root, block)?;

    let mut output = Vec::new();
    format_commonmark(root, options, &mut output).map_err(|e| {
        FormatError::SerializationError(format!("Comrak serialization failed: {e}"))
    })?;
    let markdown = String::from_utf8(output)
        .map_err(|e| FormatError::SerializationError(format!("UTF-8 conversion failed: {e}")))?;
    let lines: Vec<&str> = markdown.trim_end_matches('\n').split('\n').collect();
    Ok(tighten_markers(&lines).join("\n"))
}

fn alloc<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(RefCell::new(Ast::new(value, (0, 0).into()))))
}

fn raw_inline<'a>(arena: &'a Arena<AstNode<'a>>, html: impl Into<String>) -> &'a AstNode<'a> {
    alloc(arena, NodeValue::HtmlInline(html.into()))
}

fn append_block<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    block: &Node,
) -> Result<(), FormatError> {
    match block {
        Node::Paragraph(p) => {
            let paragraph = alloc(arena, NodeValue::Paragraph);
            parent.append(paragraph);
            append_inlines(arena, paragraph, &p.content, &[], InlineContext::Flow);
        }

        Node::Heading(h) => {
            let heading = alloc(
                arena,
                NodeValue::Heading(NodeHeading {
                    level: h.attrs.level,
                    setext: false,
                }),
            );
            parent.append(heading);
            append_inlines(arena, heading, &h.content, &[], InlineContext::Flow);
        }

        Node::Blockquote(quote) => {
            let node = alloc(arena, NodeValue::BlockQuote);
            parent.append(node);
            for child in &quote.content {
                append_block(arena, node, child)?;
            }
        }

        Node::BulletList(list) | Node::TaskList(list) => {
            append_list(arena, parent, ListType::Bullet, &list.content)?;
        }

        Node::OrderedList(list) => {
            append_list(arena, parent, ListType::Ordered, &list.content)?;
        }

        Node::CodeBlock(code) => {
            let mut literal: String = code.content.iter().map(text_of).collect();
            if !literal.is_empty() && !literal.ends_with('\n') {
                literal.push('\n');
            }
            let node = alloc(
                arena,
                NodeValue::CodeBlock(NodeCodeBlock {
                    fenced: true,
                    fence_char: b'`',
                    fence_length: 3,
                    fence_offset: 0,
                    info: code.attrs.language.clone().unwrap_or_default(),
                    literal,
                }),
            );
            parent.append(node);
        }

        Node::HorizontalRule => {
            parent.append(alloc(arena, NodeValue::ThematicBreak));
        }

        Node::Table(table) => append_table(arena, parent, &table.content),

        Node::BlockMath(math) => {
            parent.append(html_block(
                arena,
                format!("$$\n{}\n$$\n", math.attrs.latex.trim()),
            ));
        }

        Node::HtmlBlock(html) => {
            parent.append(html_block(
                arena,
                format!("{}\n", html.attrs.html.trim_end()),
            ));
        }

        other => {
            return Err(FormatError::SerializationError(format!(
                "'{}' cannot be written as a block",
                other.type_name()
            )))
        }
    }
    Ok(())
}

fn html_block<'a>(arena: &'a Arena<AstNode<'a>>, literal: String) -> &'a AstNode<'a> {
    alloc(
        arena,
        NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 6,
            literal,
        }),
    )
}

fn list_attrs(list_type: ListType, start: usize, tight: bool) -> NodeList {
    NodeList {
        list_type,
        marker_offset: 0,
        padding: 0,
        start,
        delimiter: ListDelimType::Period,
        bullet_char: b'-',
        tight,
    }
}

fn append_list<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    list_type: ListType,
    items: &[Node],
) -> Result<(), FormatError> {
    // A list stays tight while no item has a second block other than a
    // nested list; a loose list puts blank lines between item paragraphs.
    let tight = items.iter().all(|item| {
        item.content().iter().skip(1).all(|block| {
            matches!(
                block,
                Node::BulletList(_) | Node::OrderedList(_) | Node::TaskList(_)
            )
        })
    });

    let list = alloc(arena, NodeValue::List(list_attrs(list_type, 1, tight)));
    parent.append(list);

    for (ordinal, item) in items.iter().enumerate() {
        let value = match item {
            Node::TaskItem(task) => NodeValue::TaskItem(task.attrs.checked.then_some('x')),
            Node::ListItem(_) => NodeValue::Item(list_attrs(list_type, ordinal + 1, tight)),
            other => {
                return Err(FormatError::SerializationError(format!(
                    "'{}' cannot be a list item",
                    other.type_name()
                )))
            }
        };
        let node = alloc(arena, value);
        list.append(node);
        for block in item.content() {
            append_block(arena, node, block)?;
        }
    }
    Ok(())
}

fn cell_alignment(cell: &Node) -> TableAlignment {
    let align = match cell {
        Node::TableHeader(c) | Node::TableCell(c) => c.attrs.align,
        _ => None,
    };
    match align {
        Some(TextAlign::Left) => TableAlignment::Left,
        Some(TextAlign::Center) => TableAlignment::Center,
        Some(TextAlign::Right) => TableAlignment::Right,
        Some(TextAlign::Justify) | None => TableAlignment::None,
    }
}

/// Pipe tables always have a header row, so the first row is written as the
/// header whatever its cell types. Rows are padded to the first row's width;
/// extra cells are dropped.
fn append_table<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, rows: &[Node]) {
    let Some(first) = rows.first().map(Node::content).filter(|cells| !cells.is_empty()) else {
        tracing::debug!("skipping table without cells");
        return;
    };
    let alignments: Vec<TableAlignment> = first.iter().map(cell_alignment).collect();
    let columns = alignments.len();

    let table = alloc(
        arena,
        NodeValue::Table(NodeTable {
            alignments,
            num_columns: columns,
            num_rows: rows.len(),
            num_nonempty_cells: 0,
        }),
    );
    parent.append(table);

    for (index, row) in rows.iter().enumerate() {
        let row_node = alloc(arena, NodeValue::TableRow(index == 0));
        table.append(row_node);
        if row.content().len() > columns {
            tracing::debug!(row = index, columns, "dropping cells past the header width");
        }
        for column in 0..columns {
            let cell_node = alloc(arena, NodeValue::TableCell);
            row_node.append(cell_node);
            if let Some(cell) = row.content().get(column) {
                append_cell(arena, cell_node, cell.content());
            }
        }
    }
}

/// A pipe-table cell holds one line of inline content; separate blocks are
/// joined with `<br>`.
fn append_cell<'a>(arena: &'a Arena<AstNode<'a>>, cell: &'a AstNode<'a>, blocks: &[Node]) {
    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            cell.append(raw_inline(arena, "<br>"));
        }
        if block.is_textblock() {
            append_inlines(arena, cell, block.content(), &[], InlineContext::TableCell);
        } else {
            append_text(arena, cell, &text_of(block), InlineContext::TableCell);
        }
    }
}

enum Wrapper {
    Node(NodeValue),
    Delimiters(&'static str, &'static str),
    /// Code is written by the leaf itself.
    Leaf,
}

fn wrapper(mark: &Mark) -> Wrapper {
    match mark {
        Mark::Link(link) => Wrapper::Node(NodeValue::Link(NodeLink {
            url: link.attrs.href.clone(),
            title: link.attrs.title.clone().unwrap_or_default(),
        })),
        Mark::Bold => Wrapper::Node(NodeValue::Strong),
        Mark::Italic => Wrapper::Node(NodeValue::Emph),
        Mark::Strike => Wrapper::Node(NodeValue::Strikethrough),
        Mark::Subscript => Wrapper::Delimiters("~", "~"),
        Mark::Superscript => Wrapper::Delimiters("^", "^"),
        Mark::Highlight => Wrapper::Delimiters("<mark>", "</mark>"),
        Mark::Code => Wrapper::Leaf,
    }
}

/// The outermost mark of `node` that is not already open.
fn next_mark(node: &Node, open: &[Mark]) -> Option<Mark> {
    let Node::Text(text) = node else {
        return None;
    };
    text.marks
        .iter()
        .filter(|mark| mark.kind() != MarkKind::Code && !open.contains(mark))
        .min_by_key(|mark| mark.kind())
        .cloned()
}

fn has_mark(node: &Node, mark: &Mark) -> bool {
    matches!(node, Node::Text(text) if text.marks.contains(mark))
}

/// Appends inline content, grouping consecutive runs that share a mark
/// under one wrapper so marks nest outermost-first in `MarkKind` order.
fn append_inlines<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    nodes: &[Node],
    open: &[Mark],
    ctx: InlineContext,
) {
    let mut i = 0;
    while i < nodes.len() {
        let Some(mark) = next_mark(&nodes[i], open) else {
            append_leaf(arena, parent, &nodes[i], ctx);
            i += 1;
            continue;
        };
        let end = nodes[i..]
            .iter()
            .position(|node| !has_mark(node, &mark))
            .map_or(nodes.len(), |offset| i + offset);
        let group = &nodes[i..end];
        let mut inner = open.to_vec();
        inner.push(mark.clone());

        match wrapper(&mark) {
            Wrapper::Node(value) => {
                let container = alloc(arena, value);
                parent.append(container);
                append_inlines(arena, container, group, &inner, ctx);
            }
            Wrapper::Delimiters(before, after) => {
                parent.append(raw_inline(arena, before));
                append_inlines(arena, parent, group, &inner, ctx);
                parent.append(raw_inline(arena, after));
            }
            Wrapper::Leaf => append_inlines(arena, parent, group, &inner, ctx),
        }
        i = end;
    }
}

fn append_leaf<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    node: &Node,
    ctx: InlineContext,
) {
    match node {
        Node::Text(text) if text.marks.iter().any(|m| m.kind() == MarkKind::Code) => {
            parent.append(alloc(
                arena,
                NodeValue::Code(NodeCode {
                    num_backticks: 1,
                    literal: text.text.clone(),
                }),
            ));
        }
        Node::Text(text) => append_text(arena, parent, &text.text, ctx),
        Node::InlineMath(math) => {
            parent.append(raw_inline(arena, format!("${}$", math.attrs.latex)));
        }
        Node::Image(image) => {
            let node = alloc(
                arena,
                NodeValue::Image(NodeLink {
                    url: image.attrs.src.clone(),
                    title: image.attrs.title.clone().unwrap_or_default(),
                }),
            );
            if let Some(alt) = image.attrs.alt.as_deref().filter(|a| !a.is_empty()) {
                node.append(alloc(arena, NodeValue::Text(alt.to_string())));
            }
            parent.append(node);
        }
        Node::HardBreak => match ctx {
            InlineContext::Flow => parent.append(alloc(arena, NodeValue::LineBreak)),
            InlineContext::TableCell => parent.append(raw_inline(arena, "<br>")),
        },
        other => tracing::debug!(node = other.type_name(), "skipping block in inline position"),
    }
}

/// Appends plain text, turning newlines into soft breaks and escaping the
/// characters comrak would leave for the tokenizers to misread.
fn append_text<'a>(
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    text: &str,
    ctx: InlineContext,
) {
    let mut plain = String::new();
    let flush = |plain: &mut String| {
        if !plain.is_empty() {
            parent.append(alloc(arena, NodeValue::Text(std::mem::take(plain))));
        }
    };

    for ch in text.chars() {
        match ch {
            '\n' => {
                flush(&mut plain);
                parent.append(alloc(arena, NodeValue::SoftBreak));
            }
            '~' | '^' | '$' => {
                flush(&mut plain);
                parent.append(raw_inline(arena, format!("\\{ch}")));
            }
            '|' if ctx == InlineContext::TableCell => {
                flush(&mut plain);
                parent.append(raw_inline(arena, "\\|"));
            }
            _ => plain.push(ch),
        }
    }
    flush(&mut plain);
}

fn text_of(node: &Node) -> String {
    match node {
        Node::Text(text) => text.text.clone(),
        Node::InlineMath(math) | Node::BlockMath(math) => math.attrs.latex.clone(),
        _ => node.content().iter().map(text_of).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Mark;

    fn options() -> ComrakOptions<'static> {
        let mut options = ComrakOptions::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.tasklist = true;
        options.render.unsafe_ = true;
        options
    }

    fn render(content: Vec<Node>) -> Rendered {
        render_blocks(&Document::new(content), &options()).unwrap()
    }

    fn para(content: Vec<Node>) -> Node {
        Node::paragraph(content)
    }

    #[test]
    fn simple_paragraph() {
        let out = render(vec![para(vec![
            Node::text("Hello "),
            Node::marked_text("world", vec![Mark::Bold]),
        ])]);
        assert_eq!(out.markdown, "Hello **world**");
    }

    #[test]
    fn blocks_are_joined_by_one_blank_line_and_spanned() {
        let out = render(vec![
            Node::heading(2, vec![Node::text("Title")]),
            para(vec![Node::text("one\ntwo")]),
            Node::block_math("x^2"),
        ]);
        assert_eq!(out.markdown, "## Title\n\none\ntwo\n\n$$\nx^2\n$$");
        let spans: Vec<Range<usize>> = out.blocks.iter().map(|b| b.lines.clone()).collect();
        assert_eq!(spans, vec![0..1, 2..4, 5..8]);
    }

    #[test]
    fn ordered_lists_are_numbered_from_one() {
        let out = render(vec![Node::ordered_list(
            5,
            vec![
                Node::list_item(vec![para(vec![Node::text("a")])]),
                Node::list_item(vec![para(vec![Node::text("b")])]),
            ],
        )]);
        assert_eq!(out.markdown, "1. a\n2. b");
    }

    #[test]
    fn loose_items_keep_code_inside_the_item() {
        let code = Node::CodeBlock(crate::tree::CodeBlock {
            attrs: Default::default(),
            content: vec![Node::text("1. step")],
        });
        let out = render(vec![Node::ordered_list(
            1,
            vec![
                Node::list_item(vec![para(vec![Node::text("a")]), code]),
                Node::list_item(vec![para(vec![Node::text("b")])]),
            ],
        )]);
        assert!(out.markdown.starts_with("1. a\n"), "got {:?}", out.markdown);
        assert!(out.markdown.ends_with("\n2. b"), "got {:?}", out.markdown);
        assert!(
            out.markdown.lines().all(|line| line.is_empty() || !line.trim().is_empty()),
            "whitespace-only line in {:?}",
            out.markdown
        );
    }

    #[test]
    fn adjacent_lists_get_a_separator_outside_any_span() {
        let item = || Node::list_item(vec![para(vec![Node::text("x")])]);
        let out = render(vec![Node::bullet_list(vec![item()]), Node::bullet_list(vec![item()])]);
        assert_eq!(out.markdown, "- x\n\n<!-- end list -->\n\n- x");
        assert_eq!(out.blocks[0].lines, 0..1);
        assert_eq!(out.blocks[1].lines, 4..5);
    }

    #[test]
    fn delimiter_characters_in_text_are_escaped() {
        let out = render(vec![para(vec![Node::text("H~2~O costs $5 ^^")])]);
        assert_eq!(out.markdown, r"H\~2\~O costs \$5 \^\^");
    }

    #[test]
    fn script_and_highlight_marks_use_their_delimiters() {
        let out = render(vec![para(vec![
            Node::text("H"),
            Node::marked_text("2", vec![Mark::Subscript]),
            Node::text("O "),
            Node::marked_text("hot", vec![Mark::Highlight]),
            Node::text(" x"),
            Node::marked_text("bold", vec![Mark::Bold, Mark::Superscript]),
        ])]);
        assert_eq!(out.markdown, "H~2~O <mark>hot</mark> x**^bold^**");
    }

    #[test]
    fn links_wrap_other_marks() {
        let out = render(vec![para(vec![Node::marked_text(
            "click",
            vec![Mark::Bold, Mark::link("http://x", None)],
        )])]);
        assert_eq!(out.markdown, "[**click**](http://x)");
    }

    #[test]
    fn inline_math_is_written_verbatim() {
        let out = render(vec![para(vec![
            Node::text("area "),
            Node::inline_math("\\pi r^2"),
        ])]);
        assert_eq!(out.markdown, "area $\\pi r^2$");
    }

    #[test]
    fn empty_paragraph_has_an_empty_span() {
        let out = render(vec![para(vec![]), para(vec![Node::text("x")])]);
        assert_eq!(out.markdown, "x");
        assert_eq!(out.blocks[0].lines, 0..0);
        assert_eq!(out.blocks[1].lines, 0..1);
    }

    #[test]
    fn inline_nodes_cannot_be_blocks() {
        let doc = Document::new(vec![Node::text("loose")]);
        assert!(render_blocks(&doc, &options()).is_err());
    }
}
