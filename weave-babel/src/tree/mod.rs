//! The document tree: the system of record while a document is being edited.
//!
//! A tree is created fresh by every parse and mutated in place by editor
//! commands afterwards. Serializers only read it.

pub mod commands;
pub mod nodes;
pub mod schema;
pub mod walk;

pub use nodes::{
    add_mark, remove_mark, AlignAttrs, CellAttrs, CodeBlock, CodeBlockAttrs, Container, Document,
    Heading, HeadingAttrs, HtmlAttrs, HtmlBlock, Image, ImageAttrs, Link, LinkAttrs, Mark,
    MarkKind, Math, MathAttrs, Node, OrderedList, OrderedListAttrs, Paragraph, TableCell,
    TaskItem, TaskItemAttrs, Text, TextAlign,
};
pub use schema::validate;
