//! Placement rules for the node vocabulary.
//!
//! The enum makes attributes well-typed, but JSON input can still put a
//! paragraph inside a paragraph. [`validate`] rejects such trees before they
//! reach a serializer.

use super::nodes::{Document, Node};
use crate::error::SchemaError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Allowed {
    Blocks,
    Inline,
    ListItems,
    TaskItems,
    Rows,
    Cells,
    PlainText,
    Nothing,
}

fn allowed_children(node: &Node) -> Allowed {
    match node {
        Node::Paragraph(_) | Node::Heading(_) => Allowed::Inline,
        Node::Blockquote(_) | Node::ListItem(_) | Node::TaskItem(_) => Allowed::Blocks,
        Node::TableHeader(_) | Node::TableCell(_) => Allowed::Blocks,
        Node::BulletList(_) | Node::OrderedList(_) => Allowed::ListItems,
        Node::TaskList(_) => Allowed::TaskItems,
        Node::Table(_) => Allowed::Rows,
        Node::TableRow(_) => Allowed::Cells,
        Node::CodeBlock(_) => Allowed::PlainText,
        _ => Allowed::Nothing,
    }
}

fn accepts(allowed: Allowed, child: &Node) -> bool {
    match allowed {
        Allowed::Blocks => !child.is_inline() && is_flow_block(child),
        Allowed::Inline => child.is_inline(),
        Allowed::ListItems => matches!(child, Node::ListItem(_)),
        Allowed::TaskItems => matches!(child, Node::TaskItem(_)),
        Allowed::Rows => matches!(child, Node::TableRow(_)),
        Allowed::Cells => matches!(child, Node::TableHeader(_) | Node::TableCell(_)),
        Allowed::PlainText => matches!(child, Node::Text(t) if t.marks.is_empty()),
        Allowed::Nothing => false,
    }
}

/// Blocks that may appear directly in the document, a list item, a quote or
/// a cell.
fn is_flow_block(node: &Node) -> bool {
    !matches!(
        node,
        Node::ListItem(_)
            | Node::TaskItem(_)
            | Node::TableRow(_)
            | Node::TableHeader(_)
            | Node::TableCell(_)
    )
}

/// Checks every node of `doc` against the placement rules.
pub fn validate(doc: &Document) -> Result<(), SchemaError> {
    let mut path = Vec::new();
    for (index, node) in doc.content.iter().enumerate() {
        path.push(index);
        if node.is_inline() || !is_flow_block(node) {
            return Err(error(node, &path, "not allowed at document level"));
        }
        validate_node(node, &mut path)?;
        path.pop();
    }
    Ok(())
}

fn validate_node(node: &Node, path: &mut Vec<usize>) -> Result<(), SchemaError> {
    match node {
        Node::Heading(h) if !(1..=6).contains(&h.attrs.level) => {
            return Err(error(node, path, "heading level must be between 1 and 6"));
        }
        Node::Text(t) if t.text.is_empty() => {
            return Err(error(node, path, "text nodes must not be empty"));
        }
        _ => {}
    }

    let allowed = allowed_children(node);
    for (index, child) in node.content().iter().enumerate() {
        path.push(index);
        if !accepts(allowed, child) {
            let message = format!("'{}' cannot contain '{}'", node.type_name(), child.type_name());
            return Err(error(child, path, message));
        }
        validate_node(child, path)?;
        path.pop();
    }
    Ok(())
}

fn error(node: &Node, path: &[usize], message: impl Into<String>) -> SchemaError {
    SchemaError {
        node: node.type_name(),
        path: path.to_vec(),
        message: message.into(),
    }
}
