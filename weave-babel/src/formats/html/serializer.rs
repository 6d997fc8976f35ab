//! HTML serialization (tree → HTML export)
//!
//! Pipeline: document tree → RcDom → HTML string, optionally wrapped in a
//! standalone page.

use super::parser::body_children;
use crate::error::FormatError;
use crate::math::{render_math, DefaultMathRenderer, MathOptions, MathRenderer};
use crate::tree::{CellAttrs, Document, Mark, Node, TextAlign};
use html5ever::{
    ns, serialize, serialize::SerializeOpts, serialize::TraversalScope, Attribute, LocalName,
    QualName,
};
use markup5ever_rcdom::{Handle, Node as DomNode, NodeData, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::default::Default;
use std::rc::Rc;

/// Options for HTML serialization
#[derive(Debug, Clone, Default)]
pub struct HtmlOptions {
    /// Wrap the fragment in a complete HTML5 page
    pub standalone: bool,
    /// Page title for standalone output. Defaults to the first heading.
    pub title: Option<String>,
    /// Optional CSS appended after the built-in stylesheet
    pub custom_css: Option<String>,
    pub math: MathOptions,
}

impl HtmlOptions {
    pub fn standalone() -> Self {
        Self {
            standalone: true,
            ..Self::default()
        }
    }

    pub fn with_custom_css(mut self, css: String) -> Self {
        self.custom_css = Some(css);
        self
    }
}

/// Serialize a document to HTML with the given options
pub fn serialize_to_html(doc: &Document, options: &HtmlOptions) -> Result<String, FormatError> {
    let renderer = DefaultMathRenderer::new(options.math.clone());
    serialize_with_renderer(doc, options, &renderer)
}

/// Serialize a document to HTML, rendering formulas with `renderer`
pub fn serialize_with_renderer(
    doc: &Document,
    options: &HtmlOptions,
    renderer: &dyn MathRenderer,
) -> Result<String, FormatError> {
    let builder = DomBuilder { renderer };
    let container = create_element("div", vec![]);
    for block in &doc.content {
        builder.append_block(&container, block);
    }

    let body = serialize_children(&container)?;
    if !options.standalone {
        return Ok(body);
    }

    let title = options
        .title
        .clone()
        .or_else(|| first_heading(doc))
        .unwrap_or_else(|| "Document".to_string());
    Ok(wrap_in_document(&body, &title, options))
}

struct DomBuilder<'r> {
    renderer: &'r dyn MathRenderer,
}

impl DomBuilder<'_> {
    fn append_block(&self, parent: &Handle, node: &Node) {
        let element = match node {
            Node::Paragraph(p) => {
                let style = align_style(p.attrs.text_align);
                let el = create_element("p", style_attr(&style));
                self.append_inlines(&el, &p.content, &[]);
                el
            }
            Node::Heading(h) => {
                let style = align_style(h.attrs.text_align);
                let tag = format!("h{}", h.attrs.level.clamp(1, 6));
                let el = create_element(&tag, style_attr(&style));
                self.append_inlines(&el, &h.content, &[]);
                el
            }
            Node::Blockquote(c) => self.container("blockquote", vec![], &c.content),
            Node::BulletList(c) => self.container("ul", vec![], &c.content),
            Node::OrderedList(list) => {
                let start = list.attrs.start.to_string();
                let attrs = if list.attrs.start == 1 {
                    vec![]
                } else {
                    vec![("start", start.as_str())]
                };
                self.container("ol", attrs, &list.content)
            }
            Node::ListItem(c) => self.container("li", vec![], &c.content),
            Node::TaskList(c) => self.container("ul", vec![("data-type", "taskList")], &c.content),
            Node::TaskItem(item) => {
                let checked = if item.attrs.checked { "true" } else { "false" };
                self.container(
                    "li",
                    vec![("data-type", "taskItem"), ("data-checked", checked)],
                    &item.content,
                )
            }
            Node::CodeBlock(block) => {
                let pre = create_element("pre", vec![]);
                let class = block
                    .attrs
                    .language
                    .as_ref()
                    .map(|language| format!("language-{language}"));
                let attrs = match &class {
                    Some(class) => vec![("class", class.as_str())],
                    None => vec![],
                };
                let code = create_element("code", attrs);
                let mut text = String::new();
                for child in &block.content {
                    if let Node::Text(t) = child {
                        text.push_str(&t.text);
                    }
                }
                text.push('\n');
                append(&code, create_text(&text));
                append(&pre, code);
                pre
            }
            Node::HorizontalRule => create_element("hr", vec![]),
            Node::Table(table) => {
                let el = create_element("table", vec![]);
                let body = create_element("tbody", vec![]);
                for row in &table.content {
                    self.append_block(&body, row);
                }
                append(&el, body);
                el
            }
            Node::TableRow(c) => self.container("tr", vec![], &c.content),
            Node::TableHeader(cell) => self.cell("th", &cell.attrs, &cell.content),
            Node::TableCell(cell) => self.cell("td", &cell.attrs, &cell.content),
            Node::BlockMath(math) => self.math("div", &math.attrs.latex, true),
            Node::HtmlBlock(block) => {
                for child in body_children(&block.attrs.html) {
                    append(parent, child);
                }
                return;
            }
            inline => {
                // stray inline content at block level gets its own paragraph
                let el = create_element("p", vec![]);
                self.append_inlines(&el, std::slice::from_ref(inline), &[]);
                el
            }
        };
        append(parent, element);
    }

    fn container(&self, tag: &str, attrs: Vec<(&str, &str)>, children: &[Node]) -> Handle {
        let el = create_element(tag, attrs);
        for child in children {
            self.append_block(&el, child);
        }
        el
    }

    fn cell(&self, tag: &str, attrs: &CellAttrs, children: &[Node]) -> Handle {
        let colspan = attrs.colspan.to_string();
        let rowspan = attrs.rowspan.to_string();
        let style = align_style(attrs.align);
        let mut list = style_attr(&style);
        if attrs.colspan != 1 {
            list.push(("colspan", colspan.as_str()));
        }
        if attrs.rowspan != 1 {
            list.push(("rowspan", rowspan.as_str()));
        }

        let el = create_element(tag, list);
        // a lone paragraph is unwrapped, as editors render cells
        match children {
            [Node::Paragraph(p)] if p.attrs.text_align.is_none() => {
                self.append_inlines(&el, &p.content, &[]);
            }
            _ => {
                for child in children {
                    self.append_block(&el, child);
                }
            }
        }
        el
    }

    fn math(&self, tag: &str, latex: &str, display: bool) -> Handle {
        let output = render_math(self.renderer, latex, display);
        let data_type = if display { "block-math" } else { "inline-math" };
        let mut attrs = vec![
            ("data-type", data_type),
            ("data-latex", latex),
            ("class", output.class),
        ];
        if let Some(style) = &output.style {
            attrs.push(("style", style.as_str()));
        }
        if let Some(title) = &output.title {
            attrs.push(("title", title.as_str()));
        }
        let el = create_element(tag, attrs);
        append(&el, create_text(&output.text));
        el
    }

    /// Writes inline content, opening each mark once for the longest run of
    /// siblings that carry it.
    fn append_inlines(&self, parent: &Handle, nodes: &[Node], open: &[Mark]) {
        let mut i = 0;
        while i < nodes.len() {
            let Some(mark) = next_mark(&nodes[i], open) else {
                self.append_inline(parent, &nodes[i]);
                i += 1;
                continue;
            };

            let mut end = i + 1;
            while end < nodes.len() && has_mark(&nodes[end], mark) {
                end += 1;
            }
            let el = mark_element(mark);
            let mut inner = open.to_vec();
            inner.push(mark.clone());
            self.append_inlines(&el, &nodes[i..end], &inner);
            append(parent, el);
            i = end;
        }
    }

    fn append_inline(&self, parent: &Handle, node: &Node) {
        match node {
            Node::Text(t) => append(parent, create_text(&t.text)),
            Node::HardBreak => append(parent, create_element("br", vec![])),
            Node::InlineMath(math) => append(parent, self.math("span", &math.attrs.latex, false)),
            Node::Image(image) => {
                let mut attrs = vec![("src", image.attrs.src.as_str())];
                if let Some(alt) = &image.attrs.alt {
                    attrs.push(("alt", alt.as_str()));
                }
                if let Some(title) = &image.attrs.title {
                    attrs.push(("title", title.as_str()));
                }
                append(parent, create_element("img", attrs));
            }
            block => self.append_block(parent, block),
        }
    }
}

fn next_mark<'n>(node: &'n Node, open: &[Mark]) -> Option<&'n Mark> {
    match node {
        Node::Text(t) => t.marks.iter().find(|mark| !open.contains(mark)),
        _ => None,
    }
}

fn has_mark(node: &Node, mark: &Mark) -> bool {
    matches!(node, Node::Text(t) if t.marks.contains(mark))
}

fn mark_element(mark: &Mark) -> Handle {
    match mark {
        Mark::Bold => create_element("strong", vec![]),
        Mark::Italic => create_element("em", vec![]),
        Mark::Strike => create_element("s", vec![]),
        Mark::Code => create_element("code", vec![]),
        Mark::Subscript => create_element("sub", vec![]),
        Mark::Superscript => create_element("sup", vec![]),
        Mark::Highlight => create_element("mark", vec![]),
        Mark::Link(link) => {
            let mut attrs = vec![("href", link.attrs.href.as_str())];
            if let Some(title) = &link.attrs.title {
                attrs.push(("title", title.as_str()));
            }
            create_element("a", attrs)
        }
    }
}

fn align_style(align: Option<TextAlign>) -> Option<String> {
    align.map(|align| format!("text-align: {}", align.as_str()))
}

fn style_attr(style: &Option<String>) -> Vec<(&str, &str)> {
    match style {
        Some(style) => vec![("style", style.as_str())],
        None => vec![],
    }
}

fn first_heading(doc: &Document) -> Option<String> {
    doc.content.iter().find_map(|node| match node {
        Node::Heading(h) => {
            let mut title = String::new();
            for child in &h.content {
                if let Node::Text(t) = child {
                    title.push_str(&t.text);
                }
            }
            Some(title).filter(|t| !t.trim().is_empty())
        }
        _ => None,
    })
}

fn append(parent: &Handle, child: Handle) {
    parent.children.borrow_mut().push(child);
}

/// Create an HTML element with attributes
fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(DomNode {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
fn create_text(text: &str) -> Handle {
    Rc::new(DomNode {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// Serialize the children of `container`, one top-level block per line
fn serialize_children(container: &Handle) -> Result<String, FormatError> {
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    let mut blocks = Vec::new();
    for child in container.children.borrow().iter() {
        let mut output = Vec::new();
        let serializable = SerializableHandle::from(child.clone());
        serialize(&mut output, &serializable, opts.clone()).map_err(|e| {
            FormatError::SerializationError(format!("HTML serialization failed: {e}"))
        })?;
        blocks.push(String::from_utf8(output).map_err(|e| {
            FormatError::SerializationError(format!("UTF-8 conversion failed: {e}"))
        })?);
    }
    Ok(blocks.join("\n"))
}

const BASE_CSS: &str = "body { max-width: 46rem; margin: 2rem auto; padding: 0 1rem; font-family: system-ui, sans-serif; line-height: 1.6; }
pre { background: #f6f8fa; padding: 0.75rem; overflow-x: auto; }
table { border-collapse: collapse; }
th, td { border: 1px solid #d0d7de; padding: 0.25rem 0.5rem; }
blockquote { border-left: 3px solid #d0d7de; margin-left: 0; padding-left: 1rem; color: #57606a; }
mark { background: #fff3a3; }
ul[data-type=\"taskList\"] { list-style: none; padding-left: 1.25rem; }
li[data-type=\"taskItem\"][data-checked=\"true\"] { text-decoration: line-through; }
.block-math-error, .inline-math-error { color: #cc0000; font-family: monospace; }
div[data-type=\"block-math\"] { text-align: center; margin: 1rem 0; }";

/// Wrap the content in a complete HTML document with embedded CSS
fn wrap_in_document(body_html: &str, title: &str, options: &HtmlOptions) -> String {
    let custom_css = options.custom_css.as_deref().unwrap_or("");
    let escaped_title = html_escape(title);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="generator" content="weave-babel">
  <title>{escaped_title}</title>
  <style>
{BASE_CSS}
{custom_css}
  </style>
</head>
<body>
{body_html}
</body>
</html>
"#
    )
}

/// Escape HTML special characters in text
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
