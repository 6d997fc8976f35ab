//! List item markers in serialized Markdown.
//!
//! The serializer and the ordered-list codec both patch item markers in
//! comrak's output after the fact. They share the scan here: find every
//! ordered item outside code, work out which list it belongs to, and move an
//! item's continuation lines when its marker changes width.

use super::fence::code_lines;
use once_cell::sync::Lazy;
use regex::Regex;

static ORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((?: {0,3}>[ ]?)*)( *)(\d{1,9})([.)])( *)").unwrap());
static BULLET_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((?: {0,3}>[ ]?)*)( *)[-*+]( *)").unwrap());
static LINE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^((?: {0,3}>[ ]?)*)( *)").unwrap());

#[derive(Debug)]
pub(crate) struct Item {
    pub line: usize,
    /// Width of the quote prefix and indentation before the number.
    pub column: usize,
    pub list: usize,
    pub digits: usize,
    /// Spaces between the delimiter and the item's text.
    pub padding: usize,
}

/// Column where a line's text starts, after any quote markers and indentation.
pub(crate) fn content_column(line: &str) -> usize {
    LINE_PREFIX
        .captures(line)
        .map_or(0, |caps| caps[1].len() + caps[2].len())
}

/// Offset from the marker column to the item's content column when `line`
/// opens a list item.
pub(crate) fn marker_width(line: &str) -> Option<usize> {
    let (marker, spaces, rest) = if let Some(caps) = ORDERED_ITEM.captures(line) {
        (caps[3].len() + 1, caps[5].len(), &line[caps[0].len()..])
    } else {
        let caps = BULLET_ITEM.captures(line)?;
        (1, caps[3].len(), &line[caps[0].len()..])
    };
    if !rest.is_empty() && spaces == 0 {
        return None;
    }
    if rest.is_empty() || spaces > 4 {
        Some(marker + 1)
    } else {
        Some(marker + spaces)
    }
}

fn ordered_item(line: &str) -> Option<(usize, usize, usize)> {
    let caps = ORDERED_ITEM.captures(line)?;
    let rest = &line[caps[0].len()..];
    if !rest.is_empty() && caps[5].is_empty() {
        return None;
    }
    Some((caps[1].len() + caps[2].len(), caps[3].len(), caps[5].len()))
}

fn bullet_item(line: &str) -> Option<usize> {
    let caps = BULLET_ITEM.captures(line)?;
    let rest = &line[caps[0].len()..];
    if !rest.is_empty() && caps[3].is_empty() {
        return None;
    }
    Some(caps[1].len() + caps[2].len())
}

/// Locates every ordered item outside code and assigns it to a list in order
/// of first appearance. Returns `None` if a line cannot be sliced at its
/// marker.
pub(crate) fn find_items<S: AsRef<str>>(lines: &[S]) -> Option<Vec<Item>> {
    // (column, list id) of the ordered lists currently open
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut items = Vec::new();
    let mut next_list = 0;
    let code = code_lines(lines);

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if code[index] {
            continue;
        }
        let content_column = content_column(line);
        let content = line.get(content_column..)?;
        if content.trim().is_empty() {
            continue;
        }

        if let Some((column, digits, padding)) = ordered_item(line) {
            open.retain(|(c, _)| *c <= column);
            let list = match open.last() {
                Some((c, id)) if *c == column => *id,
                _ => {
                    let id = next_list;
                    next_list += 1;
                    open.push((column, id));
                    id
                }
            };
            items.push(Item {
                line: index,
                column,
                list,
                digits,
                padding,
            });
        } else if let Some(column) = bullet_item(line) {
            open.retain(|(c, _)| *c < column);
        } else {
            open.retain(|(c, _)| *c < content_column);
        }
    }
    Some(items)
}

/// Line indices belonging to `item` after its marker line: every following
/// line that is blank or whose content starts right of the marker column.
pub(crate) fn item_body<S: AsRef<str>>(lines: &[S], item: &Item) -> Vec<usize> {
    let mut body = Vec::new();
    for (index, line) in lines.iter().enumerate().skip(item.line + 1) {
        let line = line.as_ref();
        let column = content_column(line);
        if line.get(column..).is_some_and(|c| c.trim().is_empty()) {
            continue;
        }
        if column <= item.column {
            break;
        }
        body.push(index);
    }
    body
}

/// Inserts or removes `delta` spaces at `column`. Removal only happens when
/// the spaces are there.
pub(crate) fn shift(line: &mut String, column: usize, delta: isize) {
    if column > line.len() || !line.is_char_boundary(column) {
        return;
    }
    if delta > 0 {
        line.insert_str(column, &" ".repeat(delta as usize));
    } else {
        let remove = delta.unsigned_abs();
        if line[column..].starts_with(&" ".repeat(remove)) {
            line.replace_range(column..column + remove, "");
        }
    }
}

/// Rewrites comrak's `1.  item` markers to `1. item` and empties the
/// whitespace-only lines it leaves inside loose items. Every item's
/// continuation lines move left with its marker. Line count is unchanged.
pub(crate) fn tighten_markers<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let code = code_lines(lines);
    let mut out: Vec<String> = lines
        .iter()
        .zip(&code)
        .map(|(line, is_code)| {
            let line = line.as_ref();
            if !is_code && line.trim().is_empty() {
                String::new()
            } else {
                line.to_string()
            }
        })
        .collect();

    let Some(items) = find_items(&out) else {
        return out;
    };
    let original = out.clone();
    // Back to front: an item's shift only touches columns at or right of its
    // own marker, and any nested item comes later in the text.
    for item in items.iter().rev().filter(|item| item.padding == 2) {
        let marker_end = item.column + item.digits + 1;
        out[item.line].replace_range(marker_end..marker_end + 1, "");
        for body in item_body(&original, item) {
            shift(&mut out[body], item.column, -1);
        }
    }
    out
}
