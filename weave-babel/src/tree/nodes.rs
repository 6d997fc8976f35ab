//! Core data structures for the document tree.
//!
//! The serde layout is the editor's document JSON: every node is an object
//! tagged by `type`, attributes live under `attrs` and children under
//! `content`. Text runs carry their marks directly.

use serde::{Deserialize, Serialize};

/// The root of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "doc")]
pub struct Document {
    #[serde(default)]
    pub content: Vec<Node>,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Paragraph(Paragraph),
    Heading(Heading),
    Blockquote(Container),
    BulletList(Container),
    OrderedList(OrderedList),
    ListItem(Container),
    TaskList(Container),
    TaskItem(TaskItem),
    CodeBlock(CodeBlock),
    HorizontalRule,
    Table(Container),
    TableRow(Container),
    TableHeader(TableCell),
    TableCell(TableCell),
    BlockMath(Math),
    InlineMath(Math),
    Image(Image),
    HardBreak,
    HtmlBlock(HtmlBlock),
    Text(Text),
}

/// A node whose only property is its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "AlignAttrs::is_empty")]
    pub attrs: AlignAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub attrs: HeadingAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
}

impl AlignAttrs {
    pub fn is_empty(&self) -> bool {
        self.text_align.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingAttrs {
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedList {
    #[serde(default)]
    pub attrs: OrderedListAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    #[serde(default = "default_start")]
    pub start: u32,
}

impl Default for OrderedListAttrs {
    fn default() -> Self {
        Self { start: 1 }
    }
}

fn default_start() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(default)]
    pub attrs: TaskItemAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItemAttrs {
    #[serde(default)]
    pub checked: bool,
}

/// A code block. Its content is a single unmarked text run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub attrs: CodeBlockAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockAttrs {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub attrs: CellAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAttrs {
    #[serde(default = "default_span")]
    pub colspan: u32,
    #[serde(default = "default_span")]
    pub rowspan: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

impl Default for CellAttrs {
    fn default() -> Self {
        Self {
            colspan: 1,
            rowspan: 1,
            align: None,
        }
    }
}

fn default_span() -> u32 {
    1
}

/// LaTeX source of a block or inline formula, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Math {
    pub attrs: MathAttrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathAttrs {
    pub latex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub attrs: ImageAttrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Raw HTML that has no mapping into the node vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlBlock {
    pub attrs: HtmlAttrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlAttrs {
    pub html: String,
}

/// A run of text with its marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// Inline annotation attached to a text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Subscript,
    Superscript,
    Highlight,
    Link(Link),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub attrs: LinkAttrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Mark identity without attributes.
///
/// The declaration order is the nesting order used when marks are rendered:
/// earlier kinds wrap later ones, so a link always encloses its emphasis and
/// code is always innermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkKind {
    Link,
    Bold,
    Italic,
    Strike,
    Subscript,
    Superscript,
    Highlight,
    Code,
}

impl MarkKind {
    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Link => "link",
            MarkKind::Bold => "bold",
            MarkKind::Italic => "italic",
            MarkKind::Strike => "strike",
            MarkKind::Subscript => "subscript",
            MarkKind::Superscript => "superscript",
            MarkKind::Highlight => "highlight",
            MarkKind::Code => "code",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "link" => MarkKind::Link,
            "bold" => MarkKind::Bold,
            "italic" => MarkKind::Italic,
            "strike" => MarkKind::Strike,
            "subscript" => MarkKind::Subscript,
            "superscript" => MarkKind::Superscript,
            "highlight" => MarkKind::Highlight,
            "code" => MarkKind::Code,
            _ => return None,
        })
    }
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Strike => MarkKind::Strike,
            Mark::Code => MarkKind::Code,
            Mark::Subscript => MarkKind::Subscript,
            Mark::Superscript => MarkKind::Superscript,
            Mark::Highlight => MarkKind::Highlight,
            Mark::Link(_) => MarkKind::Link,
        }
    }

    pub fn link(href: impl Into<String>, title: Option<String>) -> Self {
        Mark::Link(Link {
            attrs: LinkAttrs {
                href: href.into(),
                title,
            },
        })
    }
}

/// Adds `mark` to a mark set, replacing any mark of the same kind, and keeps
/// the set in nesting order.
pub fn add_mark(marks: &mut Vec<Mark>, mark: Mark) {
    marks.retain(|m| m.kind() != mark.kind());
    marks.push(mark);
    marks.sort_by_key(Mark::kind);
}

pub fn remove_mark(marks: &mut Vec<Mark>, kind: MarkKind) {
    marks.retain(|m| m.kind() != kind);
}

/// Paragraph and heading alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Concatenated text of every text run, without block separators.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.content {
            node.collect_text(&mut out);
        }
        out
    }

    /// Character count as reported to `on_change` listeners.
    pub fn character_count(&self) -> usize {
        self.content.iter().map(Node::character_count).sum()
    }

    /// Node at a child-index path from the root.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.content.get(*first)?;
        for index in rest {
            node = node.content().get(*index)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.content.get_mut(*first)?;
        for index in rest {
            node = node.content_mut()?.get_mut(*index)?;
        }
        Some(node)
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks,
        })
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph(Paragraph {
            attrs: AlignAttrs::default(),
            content,
        })
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Node::Heading(Heading {
            attrs: HeadingAttrs {
                level,
                text_align: None,
            },
            content,
        })
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::BulletList(Container { content: items })
    }

    pub fn ordered_list(start: u32, items: Vec<Node>) -> Self {
        Node::OrderedList(OrderedList {
            attrs: OrderedListAttrs { start },
            content: items,
        })
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Node::ListItem(Container { content })
    }

    pub fn block_math(latex: impl Into<String>) -> Self {
        Node::BlockMath(Math {
            attrs: MathAttrs {
                latex: latex.into(),
            },
        })
    }

    pub fn inline_math(latex: impl Into<String>) -> Self {
        Node::InlineMath(Math {
            attrs: MathAttrs {
                latex: latex.into(),
            },
        })
    }

    /// The node's type name as it appears in document JSON.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Paragraph(_) => "paragraph",
            Node::Heading(_) => "heading",
            Node::Blockquote(_) => "blockquote",
            Node::BulletList(_) => "bulletList",
            Node::OrderedList(_) => "orderedList",
            Node::ListItem(_) => "listItem",
            Node::TaskList(_) => "taskList",
            Node::TaskItem(_) => "taskItem",
            Node::CodeBlock(_) => "codeBlock",
            Node::HorizontalRule => "horizontalRule",
            Node::Table(_) => "table",
            Node::TableRow(_) => "tableRow",
            Node::TableHeader(_) => "tableHeader",
            Node::TableCell(_) => "tableCell",
            Node::BlockMath(_) => "blockMath",
            Node::InlineMath(_) => "inlineMath",
            Node::Image(_) => "image",
            Node::HardBreak => "hardBreak",
            Node::HtmlBlock(_) => "htmlBlock",
            Node::Text(_) => "text",
        }
    }

    /// Ordered children. Leaves have none.
    pub fn content(&self) -> &[Node] {
        match self {
            Node::Paragraph(p) => &p.content,
            Node::Heading(h) => &h.content,
            Node::Blockquote(c)
            | Node::BulletList(c)
            | Node::ListItem(c)
            | Node::TaskList(c)
            | Node::Table(c)
            | Node::TableRow(c) => &c.content,
            Node::OrderedList(l) => &l.content,
            Node::TaskItem(t) => &t.content,
            Node::CodeBlock(c) => &c.content,
            Node::TableHeader(c) | Node::TableCell(c) => &c.content,
            Node::HorizontalRule
            | Node::BlockMath(_)
            | Node::InlineMath(_)
            | Node::Image(_)
            | Node::HardBreak
            | Node::HtmlBlock(_)
            | Node::Text(_) => &[],
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Paragraph(p) => Some(&mut p.content),
            Node::Heading(h) => Some(&mut h.content),
            Node::Blockquote(c)
            | Node::BulletList(c)
            | Node::ListItem(c)
            | Node::TaskList(c)
            | Node::Table(c)
            | Node::TableRow(c) => Some(&mut c.content),
            Node::OrderedList(l) => Some(&mut l.content),
            Node::TaskItem(t) => Some(&mut t.content),
            Node::CodeBlock(c) => Some(&mut c.content),
            Node::TableHeader(c) | Node::TableCell(c) => Some(&mut c.content),
            _ => None,
        }
    }

    /// Inline nodes live inside text blocks.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Node::Text(_) | Node::InlineMath(_) | Node::Image(_) | Node::HardBreak
        )
    }

    /// Blocks whose children are inline content.
    pub fn is_textblock(&self) -> bool {
        matches!(self, Node::Paragraph(_) | Node::Heading(_))
    }

    pub fn text_align(&self) -> Option<TextAlign> {
        match self {
            Node::Paragraph(p) => p.attrs.text_align,
            Node::Heading(h) => h.attrs.text_align,
            _ => None,
        }
    }

    /// Sets alignment on paragraphs and headings. Returns false for any
    /// other node type.
    pub fn set_text_align(&mut self, align: Option<TextAlign>) -> bool {
        match self {
            Node::Paragraph(p) => {
                p.attrs.text_align = align;
                true
            }
            Node::Heading(h) => {
                h.attrs.text_align = align;
                true
            }
            _ => false,
        }
    }

    /// Width of an inline node in editor positions: one per text char, one
    /// for every other inline leaf.
    pub fn inline_width(&self) -> usize {
        match self {
            Node::Text(t) => t.text.chars().count(),
            _ => 1,
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            _ => {
                for child in self.content() {
                    child.collect_text(out);
                }
            }
        }
    }

    fn character_count(&self) -> usize {
        match self {
            Node::Text(t) => t.text.chars().count(),
            _ => self.content().iter().map(Node::character_count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_editor_json() {
        let doc = Document::new(vec![Node::Paragraph(Paragraph {
            attrs: AlignAttrs {
                text_align: Some(TextAlign::Center),
            },
            content: vec![Node::marked_text("hi", vec![Mark::Bold])],
        })]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "doc",
                "content": [{
                    "type": "paragraph",
                    "attrs": { "textAlign": "center" },
                    "content": [{ "type": "text", "text": "hi", "marks": [{ "type": "bold" }] }]
                }]
            })
        );
    }

    #[test]
    fn ordered_list_start_defaults_to_one() {
        let json = r#"{"type":"doc","content":[{"type":"orderedList","content":[]}]}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        match &doc.content[0] {
            Node::OrderedList(list) => assert_eq!(list.attrs.start, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn add_mark_keeps_nesting_order_and_replaces_same_kind() {
        let mut marks = vec![Mark::Code, Mark::link("a", None)];
        add_mark(&mut marks, Mark::Bold);
        add_mark(&mut marks, Mark::link("b", None));
        assert_eq!(marks, vec![Mark::link("b", None), Mark::Bold, Mark::Code]);
    }

    #[test]
    fn character_count_ignores_block_boundaries() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("ab")]),
            Node::paragraph(vec![Node::text("cé"), Node::HardBreak]),
        ]);
        assert_eq!(doc.character_count(), 4);
        assert_eq!(doc.text_content(), "abcé");
    }

    #[test]
    fn node_at_follows_child_indices() {
        let doc = Document::new(vec![Node::bullet_list(vec![Node::list_item(vec![
            Node::paragraph(vec![Node::text("x")]),
        ])])]);
        assert_eq!(doc.node_at(&[0, 0, 0]).map(Node::type_name), Some("paragraph"));
        assert!(doc.node_at(&[0, 1]).is_none());
        assert!(doc.node_at(&[]).is_none());
    }
}
