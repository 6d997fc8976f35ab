//! Text normalization passes around the structural parser and serializer.
//!
//! [`preprocess`] reshapes hand-written Markdown into the stricter layout the
//! block parser expects (tables kept contiguous, list continuations indented
//! far enough). [`postprocess`] repairs links that the serializer nests inside
//! emphasis or code instead of the other way round.
//!
//! All passes are plain `&str -> String` functions. Fenced code is never
//! rewritten, and link repair also leaves indented code alone.

use super::fence::{code_lines, FenceTracker};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HTML_TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<table.*?</table>").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[-*+]\s+|\d+[.)]\s+)").unwrap());
static INDENTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^( {2,})(\S.*)$").unwrap());
static CODE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"`\[([^\]]+)\]\(([^)]+)\)`").unwrap());
static BOLD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*\[([^\]]+)\]\(([^)]+)\)\*\*").unwrap());
static ITALIC_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\[([^\]]+)\]\(([^)]+)\)\*").unwrap());

const STANDARD_INDENT: &str = "    ";

/// Runs every pre-parse pass in order.
pub fn preprocess(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }
    let processed = isolate_html_tables(markdown);
    let processed = join_table_rows(&processed);
    normalize_list_indentation(&processed)
}

/// Runs every post-serialize pass in order.
pub fn postprocess(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }
    repair_links(markdown)
}

/// Surrounds every `<table>...</table>` block with blank lines so the block
/// scanner treats it as its own HTML block, then collapses the newline runs
/// that padding produced.
pub fn isolate_html_tables(markdown: &str) -> String {
    if !HTML_TABLE.is_match(markdown) {
        return markdown.to_string();
    }
    let padded = HTML_TABLE.replace_all(markdown, "\n\n$0\n\n");
    EXCESS_NEWLINES.replace_all(&padded, "\n\n").into_owned()
}

fn is_table_row(trimmed: &str) -> bool {
    !trimmed.is_empty() && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Keeps pipe-table rows contiguous.
///
/// A blank line inside a run of table rows is dropped when another row
/// follows it (skipping further blanks); otherwise the table ends there. A
/// blank line is forced before and after each table when its neighbour is
/// not already blank.
pub fn join_table_rows(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut result: Vec<&str> = Vec::with_capacity(lines.len());
    let mut fences = FenceTracker::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if fences.is_code(line) || !is_table_row(line.trim()) {
            result.push(line);
            i += 1;
            continue;
        }

        let mut rows = Vec::new();
        while i < lines.len() {
            let current = lines[i].trim();
            if current.is_empty() {
                let more_rows = lines[i + 1..]
                    .iter()
                    .map(|l| l.trim())
                    .find(|l| !l.is_empty())
                    .is_some_and(is_table_row);
                if more_rows {
                    i += 1;
                    continue;
                }
                break;
            } else if is_table_row(current) {
                rows.push(lines[i]);
                i += 1;
            } else {
                break;
            }
        }

        if result.last().is_some_and(|l| !l.trim().is_empty()) {
            result.push("");
        }
        result.extend(rows);
        if lines.get(i).is_some_and(|l| !l.trim().is_empty()) {
            result.push("");
        }
    }

    result.join("\n")
}

/// Keeps list items and their continuation lines together.
///
/// Inside a list item, continuation lines indented by two or three spaces
/// are re-indented to four, and a blank line directly followed by such a
/// continuation is removed. Lines indented four or more spaces pass through.
pub fn normalize_list_indentation(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut result: Vec<String> = Vec::with_capacity(lines.len());
    let mut fences = FenceTracker::new();
    let mut in_list_item = false;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if fences.is_code(line) {
            result.push(line.to_string());
            continue;
        }

        if LIST_ITEM.is_match(trimmed) {
            in_list_item = true;
            result.push(line.to_string());
            continue;
        }

        if in_list_item {
            if trimmed.is_empty() {
                if is_list_continuation(&lines, i) {
                    continue;
                }
                result.push(line.to_string());
                in_list_item = false;
                continue;
            }

            if let Some(caps) = INDENTED.captures(line) {
                let indent = &caps[1];
                let content = &caps[2];
                if !LIST_ITEM.is_match(content) {
                    if indent.len() < STANDARD_INDENT.len() {
                        result.push(format!("{STANDARD_INDENT}{content}"));
                    } else {
                        result.push(line.to_string());
                    }
                    continue;
                }
            }

            in_list_item = false;
        }

        result.push(line.to_string());
    }

    result.join("\n")
}

fn is_list_continuation(lines: &[&str], index: usize) -> bool {
    let Some(next) = lines.get(index + 1) else {
        return false;
    };
    let trimmed = next.trim();
    INDENTED.is_match(next) && !trimmed.is_empty() && !LIST_ITEM.is_match(trimmed)
}

/// Moves emphasis and code from around a link to inside its label:
/// `` `[t](u)` `` becomes `` [`t`](u) ``, `**[t](u)**` becomes `[**t**](u)`
/// and a single-asterisk wrapper becomes `[*t*](u)`. Lines inside code
/// blocks are kept as they are.
pub fn repair_links(markdown: &str) -> String {
    if !markdown.contains('[') {
        return markdown.to_string();
    }
    let lines: Vec<&str> = markdown.split('\n').collect();
    let code = code_lines(&lines);
    lines
        .iter()
        .zip(code)
        .map(|(line, is_code)| {
            if is_code || !line.contains('[') {
                return line.to_string();
            }
            let repaired = CODE_LINK.replace_all(line, "[`$1`]($2)");
            let repaired = BOLD_LINK.replace_all(&repaired, "[**$1**]($2)");
            repair_italic_links(&repaired)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The single-asterisk form must not fire on `**`, so every match is checked
/// against its neighbouring bytes. A rejected match is retried one byte
/// further on, since a valid link may start inside it.
fn repair_italic_links(markdown: &str) -> String {
    let bytes = markdown.as_bytes();
    let mut out = String::with_capacity(markdown.len());
    let mut last = 0;
    let mut pos = 0;
    while let Some(caps) = ITALIC_LINK.captures_at(markdown, pos) {
        let Some(whole) = caps.get(0) else { break };
        let preceded = whole.start() > 0 && bytes[whole.start() - 1] == b'*';
        let followed = bytes.get(whole.end()) == Some(&b'*');
        if preceded || followed {
            pos = whole.start() + 1;
            continue;
        }
        out.push_str(&markdown[last..whole.start()]);
        out.push_str(&italic_replacement(&caps));
        last = whole.end();
        pos = whole.end();
    }
    out.push_str(&markdown[last..]);
    out
}

fn italic_replacement(caps: &Captures<'_>) -> String {
    format!("[*{}*]({})", &caps[1], &caps[2])
}
