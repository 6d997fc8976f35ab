//! Tree walkers that extract the structural metadata the Markdown codecs need
//! after the generic serializer has discarded it.

use super::nodes::{Document, Node, TextAlign};

/// Pre-order iterator over a node and all of its descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.content().iter().rev());
        Some(node)
    }
}

pub fn descendants(node: &Node) -> Descendants<'_> {
    Descendants { stack: vec![node] }
}

/// `start` of every ordered list in `node`'s subtree, `node` included, in
/// pre-order. Pre-order is the order in which the lists' first items appear
/// in serialized text.
pub fn ordered_list_starts_in(node: &Node) -> Vec<u32> {
    descendants(node)
        .filter_map(|n| match n {
            Node::OrderedList(list) => Some(list.attrs.start),
            _ => None,
        })
        .collect()
}

/// True when any ordered list anywhere in the document starts past 1.
pub fn has_custom_list_start(doc: &Document) -> bool {
    doc.content
        .iter()
        .any(|block| ordered_list_starts_in(block).iter().any(|start| *start > 1))
}

/// Top-level paragraphs and headings whose alignment differs from
/// `default_align`, as `(block index, alignment)` pairs in document order.
pub fn aligned_blocks(doc: &Document, default_align: TextAlign) -> Vec<(usize, TextAlign)> {
    doc.content
        .iter()
        .enumerate()
        .filter(|(_, node)| node.is_textblock())
        .filter_map(|(index, node)| match node.text_align() {
            Some(align) if align != default_align => Some((index, align)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::nodes::{AlignAttrs, Paragraph};

    fn item(text: &str) -> Node {
        Node::list_item(vec![Node::paragraph(vec![Node::text(text)])])
    }

    #[test]
    fn custom_start_is_found_at_any_depth() {
        let doc = Document::new(vec![
            Node::ordered_list(5, vec![item("a")]),
            Node::paragraph(vec![Node::text("p")]),
            Node::bullet_list(vec![Node::list_item(vec![Node::ordered_list(9, vec![item("x")])])]),
            Node::ordered_list(1, vec![item("b")]),
        ]);
        assert!(has_custom_list_start(&doc));
        let nested = Document::new(vec![doc.content[2].clone()]);
        assert!(has_custom_list_start(&nested));
        let plain = Document::new(vec![doc.content[3].clone()]);
        assert!(!has_custom_list_start(&plain));
    }

    #[test]
    fn nested_starts_follow_pre_order() {
        let list = Node::ordered_list(
            2,
            vec![
                Node::list_item(vec![
                    Node::paragraph(vec![Node::text("a")]),
                    Node::ordered_list(7, vec![item("a1")]),
                ]),
                Node::list_item(vec![Node::ordered_list(4, vec![item("b1")])]),
            ],
        );
        assert_eq!(ordered_list_starts_in(&list), vec![2, 7, 4]);
    }

    #[test]
    fn default_starts_are_not_custom() {
        let doc = Document::new(vec![Node::ordered_list(1, vec![item("a")])]);
        assert!(!has_custom_list_start(&doc));
    }

    #[test]
    fn aligned_blocks_skip_default_alignment() {
        let aligned = |align| {
            Node::Paragraph(Paragraph {
                attrs: AlignAttrs {
                    text_align: Some(align),
                },
                content: vec![Node::text("t")],
            })
        };
        let doc = Document::new(vec![
            aligned(TextAlign::Left),
            aligned(TextAlign::Center),
            Node::paragraph(vec![]),
            aligned(TextAlign::Justify),
        ]);
        assert_eq!(
            aligned_blocks(&doc, TextAlign::Left),
            vec![(1, TextAlign::Center), (3, TextAlign::Justify)]
        );
    }
}
