//! Ordered lists that start past 1.
//!
//! The core serializer numbers every ordered list from 1. After it runs, this
//! stage renumbers the lists of each top-level block using the block's line
//! span: it walks the block's subtree for the `start` of every ordered list in
//! pre-order, finds where each list begins in the block's lines, and rewrites
//! the item markers. When a marker changes width, the item's continuation
//! lines are re-indented so nested content stays inside the item.
//!
//! If the lists found in the text do not match the tree one to one, the
//! block is left as the serializer wrote it and a warning is logged.

use super::super::markers::{find_items, item_body, shift};
use super::super::pipeline::{SerializeContext, Stage};
use crate::error::StageError;
use crate::tree::walk;
use std::borrow::Cow;

pub struct OrderedListStart;

impl Stage for OrderedListStart {
    fn name(&self) -> &'static str {
        "orderedListStart"
    }

    fn postprocess<'a>(
        &self,
        markdown: &'a str,
        ctx: &SerializeContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        if !walk::has_custom_list_start(ctx.document) {
            return Ok(Cow::Borrowed(markdown));
        }

        let mut lines: Vec<String> = markdown.split('\n').map(str::to_string).collect();
        for span in ctx.blocks {
            let block = ctx.document.content.get(span.index).ok_or_else(|| {
                StageError::new(self.name(), format!("no block at index {}", span.index))
            })?;
            let starts = walk::ordered_list_starts_in(block);
            if starts.iter().all(|start| *start == 1) {
                continue;
            }
            let Some(block_lines) = lines.get(span.lines.clone()) else {
                return Err(StageError::new(
                    self.name(),
                    format!("span {:?} is outside the output", span.lines),
                ));
            };
            match renumber(block_lines, &starts) {
                Some(renumbered) => lines[span.lines.clone()].clone_from_slice(&renumbered),
                None => tracing::warn!(
                    stage = self.name(),
                    block = span.index,
                    lists = starts.len(),
                    "ordered lists in the text do not match the tree, leaving block unchanged"
                ),
            }
        }
        Ok(Cow::Owned(lines.join("\n")))
    }
}

/// Renumbers the ordered lists of one block. `starts` lists the `start` of
/// each ordered list in the block in pre-order. Returns `None` when the
/// number of lists found in `lines` differs from `starts.len()`.
pub fn renumber(lines: &[String], starts: &[u32]) -> Option<Vec<String>> {
    let items = find_items(lines)?;
    let list_count = items.iter().map(|i| i.list + 1).max().unwrap_or(0);
    if list_count != starts.len() {
        return None;
    }

    let mut ordinals = vec![0u32; starts.len()];
    let mut numbered = Vec::with_capacity(items.len());
    for item in &items {
        let number = starts[item.list].saturating_add(ordinals[item.list]);
        ordinals[item.list] += 1;
        numbered.push((item, number.to_string()));
    }

    let mut out: Vec<String> = lines.to_vec();
    // Back to front: an item's shift only touches columns at or right of its
    // own marker, and any nested item comes later in the text.
    for (item, number) in numbered.iter().rev() {
        let line = &mut out[item.line];
        line.replace_range(item.column..item.column + item.digits, number);

        let delta = number.len() as isize - item.digits as isize;
        if delta == 0 {
            continue;
        }
        for body in item_body(lines, item) {
            shift(&mut out[body], item.column, delta);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(str::to_string).collect()
    }

    fn run(text: &str, starts: &[u32]) -> Option<String> {
        renumber(&lines(text), starts).map(|l| l.join("\n"))
    }

    #[test]
    fn renumbers_from_start() {
        assert_eq!(run("1. a\n2. b\n3. c", &[5]).unwrap(), "5. a\n6. b\n7. c");
    }

    #[test]
    fn renumbers_nested_lists_in_pre_order() {
        let text = "1. a\n   1. x\n   2. y\n2. b";
        assert_eq!(
            run(text, &[3, 7]).unwrap(),
            "3. a\n   7. x\n   8. y\n4. b"
        );
    }

    #[test]
    fn wider_markers_reindent_their_items() {
        let text = "1. a\n   continued\n\n   - nested\n2. b";
        assert_eq!(
            run(text, &[9]).unwrap(),
            "9. a\n   continued\n\n   - nested\n10. b"
        );
        let text = "1. a\n   - nested\n2. b\n   more";
        assert_eq!(
            run(text, &[99]).unwrap(),
            "99. a\n    - nested\n100. b\n     more"
        );
    }

    #[test]
    fn lists_inside_quotes_are_found() {
        assert_eq!(run("> 1. a\n> 2. b", &[4]).unwrap(), "> 4. a\n> 5. b");
    }

    #[test]
    fn ordered_list_nested_in_bullets() {
        let text = "- a\n  1. x\n- b\n  1. y";
        assert_eq!(run(text, &[2, 6]).unwrap(), "- a\n  2. x\n- b\n  6. y");
    }

    #[test]
    fn end_list_comment_separates_lists() {
        let text = "- a\n  1. x\n\n  <!-- end list -->\n\n  1. y";
        assert_eq!(
            run(text, &[2, 6]).unwrap(),
            "- a\n  2. x\n\n  <!-- end list -->\n\n  6. y"
        );
    }

    #[test]
    fn numbers_inside_code_are_ignored() {
        let text = "1. a\n\n   ```\n   1. not a list\n   ```";
        assert_eq!(
            run(text, &[3]).unwrap(),
            "3. a\n\n   ```\n   1. not a list\n   ```"
        );
    }

    #[test]
    fn numbers_inside_indented_code_are_ignored() {
        let text = "1. a\n\n       1. step\n\n2. b";
        assert_eq!(
            run(text, &[5]).unwrap(),
            "5. a\n\n       1. step\n\n6. b"
        );
    }

    #[test]
    fn count_mismatch_skips_the_block() {
        assert_eq!(run("1. a\n2. b", &[5, 9]), None);
        assert_eq!(run("plain", &[5]), None);
    }
}
