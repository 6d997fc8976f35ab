//! HTML import (HTML → tree)
//!
//! The source is parsed with html5ever into an RcDom and walked once. Block
//! elements map onto block nodes, formatting elements become marks on the
//! text runs beneath them and anything unknown contributes its children.
//! Inline content found directly at block level is gathered into a
//! paragraph.

use crate::tree::{
    add_mark, AlignAttrs, CellAttrs, CodeBlock, CodeBlockAttrs, Container, Document, Heading,
    HeadingAttrs, Image, ImageAttrs, Mark, Node, Paragraph, TableCell, TaskItem, TaskItemAttrs,
    Text, TextAlign,
};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;

static TEXT_ALIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)text-align\s*:\s*(left|center|right|justify)").unwrap());

/// Parses an HTML document or fragment into a tree.
pub fn parse_html(html: &str) -> Document {
    Document::new(import_blocks(html))
}

/// Block nodes for an HTML snippet, e.g. a raw HTML block from Markdown.
pub fn import_blocks(html: &str) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pending = Vec::new();
    for child in body_children(html) {
        walk_block(&child, &mut out, &mut pending);
    }
    flush_paragraph(&mut out, &mut pending);
    out
}

/// The top-level nodes of `<body>` after parsing `html`, detached from the
/// DOM so they outlive it.
pub(crate) fn body_children(html: &str) -> Vec<Handle> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    match find_element(&dom.document, "body") {
        Some(body) => std::mem::take(&mut *body.children.borrow_mut()),
        None => Vec::new(),
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if tag_name(handle).as_deref() == Some(tag) {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr(handle: &Handle, key: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|c| matches!(c.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

fn text_of(handle: &Handle) -> String {
    let mut out = String::new();
    collect_text(handle, &mut out);
    out
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

fn text_align(handle: &Handle) -> Option<TextAlign> {
    if let Some(style) = attr(handle, "style") {
        if let Some(caps) = TEXT_ALIGN.captures(&style) {
            return TextAlign::parse(&caps[1]);
        }
    }
    attr(handle, "align").and_then(|a| TextAlign::parse(&a))
}

/// LaTeX of a math wrapper, and whether it is display math.
fn math_wrapper(handle: &Handle) -> Option<(String, bool)> {
    let display = match attr(handle, "data-type").as_deref() {
        Some("block-math") => true,
        Some("inline-math") => false,
        _ => match attr(handle, "data-math-style").as_deref() {
            Some("display") => true,
            Some("inline") => false,
            _ => return None,
        },
    };
    let latex = attr(handle, "data-latex").unwrap_or_else(|| text_of(handle));
    Some((latex, display))
}

fn walk_block(handle: &Handle, out: &mut Vec<Node>, pending: &mut Vec<Node>) {
    let tag = match &handle.data {
        NodeData::Text { contents } => {
            let text = contents.borrow();
            if !text.trim().is_empty() || !pending.is_empty() {
                push_inline_text(pending, &text, &[]);
            }
            return;
        }
        NodeData::Element { name, .. } => name.local.to_string(),
        _ => return,
    };

    if let Some((latex, display)) = math_wrapper(handle) {
        if display {
            flush_paragraph(out, pending);
            out.push(Node::block_math(latex));
        } else {
            pending.push(Node::inline_math(latex));
        }
        return;
    }

    let block = match tag.as_str() {
        "p" => {
            if let Some(latex) = sole_display_math(handle) {
                Node::block_math(latex)
            } else {
                Node::Paragraph(Paragraph {
                    attrs: AlignAttrs {
                        text_align: text_align(handle),
                    },
                    content: inline_content(handle),
                })
            }
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Node::Heading(Heading {
            attrs: HeadingAttrs {
                level: tag[1..].parse().unwrap_or(1),
                text_align: text_align(handle),
            },
            content: inline_content(handle),
        }),
        "blockquote" => Node::Blockquote(Container {
            content: flow_content(handle),
        }),
        "ul" | "ol" => list(handle, &tag),
        "li" => Node::list_item(flow_content(handle)),
        "pre" => code_block(handle),
        "hr" => Node::HorizontalRule,
        "table" => table(handle),
        "head" | "script" | "style" | "template" | "input" => return,
        "br" | "img" | "strong" | "b" | "em" | "i" | "s" | "del" | "strike" | "code" | "sub"
        | "sup" | "mark" | "a" | "span" | "u" => {
            walk_inline(handle, &[], pending);
            return;
        }
        _ => {
            for child in handle.children.borrow().iter() {
                walk_block(child, out, pending);
            }
            return;
        }
    };
    flush_paragraph(out, pending);
    out.push(block);
}

fn flush_paragraph(out: &mut Vec<Node>, pending: &mut Vec<Node>) {
    let content = finish_inlines(std::mem::take(pending));
    if !content.is_empty() {
        out.push(Node::paragraph(content));
    }
}

/// Block children of a container; an empty container gets an empty
/// paragraph.
fn flow_content(handle: &Handle) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pending = Vec::new();
    for child in handle.children.borrow().iter() {
        walk_block(child, &mut out, &mut pending);
    }
    flush_paragraph(&mut out, &mut pending);
    if out.is_empty() {
        out.push(Node::paragraph(Vec::new()));
    }
    out
}

fn inline_content(handle: &Handle) -> Vec<Node> {
    let mut out = Vec::new();
    for child in handle.children.borrow().iter() {
        walk_inline(child, &[], &mut out);
    }
    finish_inlines(out)
}

fn sole_display_math(handle: &Handle) -> Option<String> {
    let mut found = None;
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } if contents.borrow().trim().is_empty() => {}
            NodeData::Element { .. } if found.is_none() => match math_wrapper(child) {
                Some((latex, true)) => found = Some(latex),
                _ => return None,
            },
            _ => return None,
        }
    }
    found
}

fn list(handle: &Handle, tag: &str) -> Node {
    let items = element_children(handle)
        .into_iter()
        .filter(|c| tag_name(c).as_deref() == Some("li"))
        .collect::<Vec<_>>();

    let is_task_list = attr(handle, "data-type").as_deref() == Some("taskList")
        || items.iter().any(|item| task_state(item).is_some());

    if is_task_list {
        let content = items
            .iter()
            .map(|item| {
                Node::TaskItem(TaskItem {
                    attrs: TaskItemAttrs {
                        checked: task_state(item).unwrap_or(false),
                    },
                    content: flow_content(item),
                })
            })
            .collect();
        return Node::TaskList(Container { content });
    }

    let content = items
        .iter()
        .map(|item| Node::list_item(flow_content(item)))
        .collect();
    if tag == "ol" {
        let start = attr(handle, "start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        Node::ordered_list(start, content)
    } else {
        Node::bullet_list(content)
    }
}

/// `Some(checked)` for task items, either the editor's `data-type` form or a
/// leading checkbox as rendered by Markdown converters.
fn task_state(item: &Handle) -> Option<bool> {
    if attr(item, "data-type").as_deref() == Some("taskItem") {
        return Some(attr(item, "data-checked").as_deref() == Some("true"));
    }
    let first = element_children(item).into_iter().next()?;
    if tag_name(&first).as_deref() == Some("input")
        && attr(&first, "type").as_deref() == Some("checkbox")
    {
        return Some(attr(&first, "checked").is_some());
    }
    None
}

fn code_block(handle: &Handle) -> Node {
    let language = element_children(handle)
        .into_iter()
        .find(|c| tag_name(c).as_deref() == Some("code"))
        .and_then(|code| attr(&code, "class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-").map(str::to_string))
        });

    let mut text = text_of(handle);
    if text.ends_with('\n') {
        text.pop();
    }
    let content = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    Node::CodeBlock(CodeBlock {
        attrs: CodeBlockAttrs { language },
        content,
    })
}

fn table(handle: &Handle) -> Node {
    let mut rows = Vec::new();
    collect_rows(handle, &mut rows);
    let content = rows
        .iter()
        .map(|row| {
            let cells = element_children(row)
                .into_iter()
                .filter_map(|cell| {
                    let header = match tag_name(&cell).as_deref() {
                        Some("th") => true,
                        Some("td") => false,
                        _ => return None,
                    };
                    let span = |key| {
                        attr(&cell, key)
                            .and_then(|v| v.trim().parse().ok())
                            .filter(|v: &u32| *v > 0)
                            .unwrap_or(1)
                    };
                    let cell_node = TableCell {
                        attrs: CellAttrs {
                            colspan: span("colspan"),
                            rowspan: span("rowspan"),
                            align: text_align(&cell),
                        },
                        content: flow_content(&cell),
                    };
                    Some(if header {
                        Node::TableHeader(cell_node)
                    } else {
                        Node::TableCell(cell_node)
                    })
                })
                .collect();
            Node::TableRow(Container { content: cells })
        })
        .collect();
    Node::Table(Container { content })
}

fn collect_rows(handle: &Handle, rows: &mut Vec<Handle>) {
    for child in element_children(handle) {
        match tag_name(&child).as_deref() {
            Some("tr") => rows.push(child),
            Some("thead" | "tbody" | "tfoot") => collect_rows(&child, rows),
            _ => {}
        }
    }
}

fn walk_inline(handle: &Handle, marks: &[Mark], out: &mut Vec<Node>) {
    let tag = match &handle.data {
        NodeData::Text { contents } => {
            push_inline_text(out, &contents.borrow(), marks);
            return;
        }
        NodeData::Element { name, .. } => name.local.to_string(),
        _ => return,
    };

    if let Some((latex, _)) = math_wrapper(handle) {
        out.push(Node::inline_math(latex));
        return;
    }

    let mark = match tag.as_str() {
        "br" => {
            out.push(Node::HardBreak);
            return;
        }
        "img" => {
            if let Some(src) = attr(handle, "src") {
                out.push(Node::Image(Image {
                    attrs: ImageAttrs {
                        src,
                        alt: attr(handle, "alt"),
                        title: attr(handle, "title"),
                    },
                }));
            }
            return;
        }
        "script" | "style" | "input" => return,
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "s" | "del" | "strike" => Some(Mark::Strike),
        "code" => Some(Mark::Code),
        "sub" => Some(Mark::Subscript),
        "sup" => Some(Mark::Superscript),
        "mark" => Some(Mark::Highlight),
        "a" => attr(handle, "href").map(|href| Mark::link(href, attr(handle, "title"))),
        _ => None,
    };

    let mut inner = marks.to_vec();
    if let Some(mark) = mark {
        add_mark(&mut inner, mark);
    }
    for child in handle.children.borrow().iter() {
        walk_inline(child, &inner, out);
    }
}

/// Appends text with HTML whitespace collapsing, merging into the previous
/// run when the marks agree.
fn push_inline_text(out: &mut Vec<Node>, text: &str, marks: &[Mark]) {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = matches!(out.last(), Some(Node::Text(t)) if t.text.ends_with(' '));
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    if collapsed.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = out.last_mut() {
        if last.marks == marks {
            last.text.push_str(&collapsed);
            return;
        }
    }
    out.push(Node::Text(Text {
        text: collapsed,
        marks: marks.to_vec(),
    }));
}

/// Trims whitespace at the block edges and around hard breaks, dropping
/// runs left empty.
fn finish_inlines(mut nodes: Vec<Node>) -> Vec<Node> {
    for i in 0..nodes.len() {
        let trim_start = i == 0 || matches!(nodes[i - 1], Node::HardBreak);
        let trim_end = i + 1 == nodes.len() || matches!(nodes[i + 1], Node::HardBreak);
        if let Node::Text(t) = &mut nodes[i] {
            if trim_start {
                t.text = t.text.trim_start().to_string();
            }
            if trim_end {
                t.text = t.text.trim_end().to_string();
            }
        }
    }
    nodes.retain(|n| !matches!(n, Node::Text(t) if t.text.is_empty()));
    nodes
}
