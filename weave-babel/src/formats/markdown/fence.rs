//! Code block tracking for the line-based passes.
//!
//! Every text pass in this crate works line by line and must leave code
//! untouched, so they share this small state machine. [`code_lines`] adds
//! indented code on top of it for passes over serialized output, where code
//! blocks without a language are written indented.

use super::markers::{content_column, marker_width};

#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feeds the next line. Returns true when the line is a fence delimiter
    /// or lies inside a fenced block.
    pub(crate) fn is_code(&mut self, line: &str) -> bool {
        let stripped = strip_fence_indent(line);
        match self.open {
            Some((ch, len)) => {
                if let Some(s) = stripped {
                    if let Some(run) = fence_run(s, ch) {
                        if run >= len && s[run..].trim().is_empty() {
                            self.open = None;
                        }
                    }
                }
                true
            }
            None => {
                let opened = stripped.and_then(|s| {
                    let ch = s.chars().next()?;
                    if ch != '`' && ch != '~' {
                        return None;
                    }
                    let run = fence_run(s, ch)?;
                    if ch == '`' && s[run..].contains('`') {
                        return None;
                    }
                    Some((ch, run))
                });
                if opened.is_some() {
                    self.open = opened;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub(crate) fn inside(&self) -> bool {
        self.open.is_some()
    }
}

/// Flags every line that belongs to a fenced or indented code block.
///
/// Indented code is recognised relative to the innermost list item that
/// contains the line: four or more columns past the item's content column,
/// after a blank line or more indented code.
pub(crate) fn code_lines<S: AsRef<str>>(lines: &[S]) -> Vec<bool> {
    let mut flags = Vec::with_capacity(lines.len());
    let mut fences = FenceTracker::new();
    // content columns of the list items currently open
    let mut items: Vec<usize> = Vec::new();
    let mut after_blank = true;
    let mut in_indented = false;

    for line in lines {
        let line = line.as_ref();
        let column = content_column(line);
        let content = line.get(column..).unwrap_or("");
        if fences.inside() {
            flags.push(fences.is_code(content));
            continue;
        }
        if content.trim().is_empty() {
            after_blank = true;
            flags.push(false);
            continue;
        }

        let base = items.iter().rev().copied().find(|c| *c <= column).unwrap_or(0);
        if (after_blank || in_indented) && column >= base + 4 {
            in_indented = true;
            after_blank = false;
            flags.push(true);
            continue;
        }
        in_indented = false;
        after_blank = false;

        if fences.is_code(content) {
            flags.push(true);
            continue;
        }
        items.retain(|c| *c <= column);
        if let Some(width) = marker_width(line) {
            items.push(column + width);
        }
        flags.push(false);
    }
    flags
}

/// Up to three spaces of indentation may precede a fence.
fn strip_fence_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        None
    } else {
        Some(&line[indent..])
    }
}

/// Length of a run of at least three `ch` at the start of `s`.
fn fence_run(s: &str, ch: char) -> Option<usize> {
    let run = s.len() - s.trim_start_matches(ch).len();
    (run >= 3).then_some(run)
}
