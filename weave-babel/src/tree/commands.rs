//! Mark and alignment commands applied to a range inside one text block.
//!
//! Positions count one per text character and one per other inline leaf
//! (math, image, hard break). A range never crosses a block boundary.

use super::nodes::{add_mark, remove_mark, Document, Mark, MarkKind, Node, Text, TextAlign};
use crate::error::CommandError;

/// A range of inline positions inside the text block at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    pub path: Vec<usize>,
    pub from: usize,
    pub to: usize,
}

impl TextRange {
    pub fn new(path: Vec<usize>, from: usize, to: usize) -> Self {
        Self { path, from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

pub fn set_mark(doc: &mut Document, range: &TextRange, mark: Mark) -> Result<(), CommandError> {
    let content = range_content(doc, range)?;
    for_each_in_range(content, range.from, range.to, |text| {
        add_mark(&mut text.marks, mark.clone())
    });
    Ok(())
}

pub fn unset_mark(
    doc: &mut Document,
    range: &TextRange,
    kind: MarkKind,
) -> Result<(), CommandError> {
    let content = range_content(doc, range)?;
    for_each_in_range(content, range.from, range.to, |text| {
        remove_mark(&mut text.marks, kind)
    });
    Ok(())
}

/// Removes `mark`'s kind when every text run in the range already carries
/// it, otherwise sets it on the whole range.
pub fn toggle_mark(doc: &mut Document, range: &TextRange, mark: Mark) -> Result<(), CommandError> {
    if range_has_mark(doc, range, mark.kind())? {
        unset_mark(doc, range, mark.kind())
    } else {
        set_mark(doc, range, mark)
    }
}

pub fn range_has_mark(
    doc: &Document,
    range: &TextRange,
    kind: MarkKind,
) -> Result<bool, CommandError> {
    let content = textblock_content(doc, &range.path)?;
    check_range(content, range)?;
    if range.is_empty() {
        return Ok(false);
    }
    let mut pos = 0;
    let mut any = false;
    for node in content {
        let width = node.inline_width();
        let overlaps = pos < range.to && pos + width > range.from;
        if overlaps {
            if let Node::Text(text) = node {
                if !text.marks.iter().any(|m| m.kind() == kind) {
                    return Ok(false);
                }
                any = true;
            }
        }
        pos += width;
    }
    Ok(any)
}

pub fn set_text_align(
    doc: &mut Document,
    path: &[usize],
    align: Option<TextAlign>,
) -> Result<(), CommandError> {
    let node = doc
        .node_at_mut(path)
        .ok_or_else(|| CommandError::InvalidPath(path.to_vec()))?;
    let name = node.type_name();
    if node.set_text_align(align) {
        Ok(())
    } else {
        Err(CommandError::AlignmentNotSupported(name))
    }
}

/// Inserts `text` at `pos`, inheriting the marks of the text before it.
pub fn insert_text(
    doc: &mut Document,
    path: &[usize],
    pos: usize,
    text: &str,
) -> Result<(), CommandError> {
    let range = TextRange::new(path.to_vec(), pos, pos);
    let content = range_content(doc, &range)?;
    if text.is_empty() {
        return Ok(());
    }
    let index = split_at(content, pos);
    let marks = match index.checked_sub(1).and_then(|i| content.get(i)) {
        Some(Node::Text(prev)) => prev.marks.clone(),
        _ => Vec::new(),
    };
    content.insert(index, Node::marked_text(text, marks));
    normalize(content);
    Ok(())
}

/// Removes the inline content inside `range`.
pub fn delete_range(doc: &mut Document, range: &TextRange) -> Result<(), CommandError> {
    let content = range_content(doc, range)?;
    if range.is_empty() {
        return Ok(());
    }
    let start = split_at(content, range.from);
    let end = split_at(content, range.to);
    content.drain(start..end);
    normalize(content);
    Ok(())
}

/// Replaces `range` with `text`. The new text takes the marks of the run
/// before the range.
pub fn replace_text(doc: &mut Document, range: &TextRange, text: &str) -> Result<(), CommandError> {
    delete_range(doc, range)?;
    insert_text(doc, &range.path, range.from, text)
}

fn textblock_content<'a>(doc: &'a Document, path: &[usize]) -> Result<&'a [Node], CommandError> {
    let node = doc
        .node_at(path)
        .ok_or_else(|| CommandError::InvalidPath(path.to_vec()))?;
    if !node.is_textblock() {
        return Err(CommandError::NotTextBlock(path.to_vec()));
    }
    Ok(node.content())
}

fn range_content<'a>(
    doc: &'a mut Document,
    range: &TextRange,
) -> Result<&'a mut Vec<Node>, CommandError> {
    check_range(textblock_content(doc, &range.path)?, range)?;
    doc.node_at_mut(&range.path)
        .and_then(Node::content_mut)
        .ok_or_else(|| CommandError::InvalidPath(range.path.clone()))
}

fn check_range(content: &[Node], range: &TextRange) -> Result<(), CommandError> {
    let len: usize = content.iter().map(Node::inline_width).sum();
    if range.from > range.to || range.to > len {
        return Err(CommandError::InvalidRange {
            from: range.from,
            to: range.to,
            len,
        });
    }
    Ok(())
}

fn for_each_in_range(
    content: &mut Vec<Node>,
    from: usize,
    to: usize,
    mut apply: impl FnMut(&mut Text),
) {
    if from >= to {
        return;
    }
    let start = split_at(content, from);
    let end = split_at(content, to);
    for node in &mut content[start..end] {
        if let Node::Text(text) = node {
            apply(text);
        }
    }
    normalize(content);
}

/// Ensures a node boundary at `pos` and returns the index of the first node
/// at or after it.
fn split_at(content: &mut Vec<Node>, pos: usize) -> usize {
    let mut offset = 0;
    for index in 0..content.len() {
        let width = content[index].inline_width();
        if pos == offset {
            return index;
        }
        if pos < offset + width {
            if let Node::Text(text) = &mut content[index] {
                let byte = text
                    .text
                    .char_indices()
                    .nth(pos - offset)
                    .map(|(b, _)| b)
                    .unwrap_or(text.text.len());
                let tail = text.text.split_off(byte);
                let marks = text.marks.clone();
                content.insert(index + 1, Node::marked_text(tail, marks));
            }
            return index + 1;
        }
        offset += width;
    }
    content.len()
}

/// Merges adjacent text runs with identical marks and drops empty runs.
fn normalize(content: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for node in content.drain(..) {
        match (merged.last_mut(), node) {
            (_, Node::Text(text)) if text.text.is_empty() => {}
            (Some(Node::Text(prev)), Node::Text(text)) if prev.marks == text.marks => {
                prev.text.push_str(&text.text);
            }
            (_, node) => merged.push(node),
        }
    }
    *content = merged;
}
