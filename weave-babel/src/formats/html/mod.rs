//! HTML format implementation
//!
//! This module implements bidirectional conversion between the document tree
//! and HTML5.
//!
//! # Library Choice
//!
//! We use the `html5ever` + `markup5ever_rcdom` ecosystem for both directions:
//! - `html5ever`: browser-grade HTML5 parser and serializer from Servo
//! - `markup5ever_rcdom`: reference-counted DOM the exporter builds and the
//!   importer walks
//!
//! Malformed input is repaired by the parser the same way a browser would,
//! so import never fails.
//!
//! # Element Mapping Table
//!
//! | Node            | HTML                                                  | Import also accepts                      |
//! |-----------------|-------------------------------------------------------|------------------------------------------|
//! | paragraph       | `<p style="text-align: X">`                           | `align` attribute                        |
//! | heading         | `<hN style="text-align: X">`                          |                                          |
//! | blockquote      | `<blockquote>`                                        |                                          |
//! | bulletList      | `<ul>`                                                |                                          |
//! | orderedList     | `<ol start="N">` (`start` omitted when 1)             |                                          |
//! | taskList/Item   | `<ul data-type="taskList">` `<li data-type="taskItem" data-checked>` | `<li><input type="checkbox" checked>` |
//! | codeBlock       | `<pre><code class="language-x">`                      |                                          |
//! | horizontalRule  | `<hr>`                                                |                                          |
//! | table parts     | `<table><tbody><tr><th>/<td>` with colspan/rowspan    | `thead`/`tfoot` groups                   |
//! | blockMath       | `<div data-type="block-math" data-latex>`             | `<span data-math-style="display">`       |
//! | inlineMath      | `<span data-type="inline-math" data-latex>`           | `<span data-math-style="inline">`        |
//! | image           | `<img src alt title>`                                 |                                          |
//! | hardBreak       | `<br>`                                                |                                          |
//! | htmlBlock       | emitted verbatim                                      | (never produced)                         |
//! | marks           | `strong em s code sub sup mark a`                     | `b i del strike`                         |
//!
//! Math wrappers carry the LaTeX source in `data-latex`; their text is the
//! output of the configured [`MathRenderer`](crate::math::MathRenderer).
//!
//! # Lossy Conversions
//!
//! - Unknown elements are unwrapped: their children are imported in place.
//! - Whitespace is collapsed the way a browser renders it.
//! - Raw HTML blocks export verbatim but import as regular nodes.
//!
//! # Output Format
//!
//! By default a fragment is produced, one top-level block per line. The
//! `standalone` option wraps it in a complete HTML5 page with an embedded
//! stylesheet.

pub mod parser;
mod serializer;

pub use parser::{import_blocks, parse_html};
pub use serializer::{serialize_to_html, serialize_with_renderer, HtmlOptions};

use crate::error::FormatError;
use crate::format::Format;
use crate::math::MathOptions;
use crate::tree::{validate, Document};
use std::collections::HashMap;

/// Format implementation for HTML
#[derive(Debug, Clone, Default)]
pub struct HtmlFormat {
    options: HtmlOptions,
}

impl HtmlFormat {
    pub fn new(options: HtmlOptions) -> Self {
        Self { options }
    }

    /// HTML format producing complete pages
    pub fn standalone() -> Self {
        Self::new(HtmlOptions::standalone())
    }

    pub fn with_math(math: MathOptions) -> Self {
        Self::new(HtmlOptions {
            math,
            ..HtmlOptions::default()
        })
    }
}

impl Format for HtmlFormat {
    fn name(&self) -> &str {
        "html"
    }

    fn description(&self) -> &str {
        "HTML5 fragment or standalone page"
    }

    fn file_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        let doc = parse_html(source);
        validate(&doc)?;
        Ok(doc)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        validate(doc)?;
        serialize_to_html(doc, &self.options)
    }

    /// Accepts `standalone` (`true`/`false`), `title` and `css`.
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let mut html_options = self.options.clone();
        for (key, value) in options {
            match key.as_str() {
                "standalone" => {
                    html_options.standalone = match value.as_str() {
                        "true" | "1" | "yes" => true,
                        "false" | "0" | "no" => false,
                        other => {
                            return Err(FormatError::SerializationError(format!(
                                "invalid value '{other}' for option 'standalone'"
                            )))
                        }
                    }
                }
                "title" => html_options.title = Some(value.clone()),
                "css" => html_options.custom_css = Some(value.clone()),
                other => {
                    return Err(FormatError::NotSupported(format!(
                        "Format 'html' does not support option '{other}'"
                    )))
                }
            }
        }
        validate(doc)?;
        serialize_to_html(doc, &html_options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    #[test]
    fn test_parse_then_serialize() {
        let format = HtmlFormat::default();
        let doc = format.parse("<p>a<b>b</b></p>").unwrap();
        assert_eq!(format.serialize(&doc).unwrap(), "<p>a<strong>b</strong></p>");
    }

    #[test]
    fn test_standalone_option() {
        let format = HtmlFormat::default();
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("x")])]);
        let mut options = HashMap::new();
        options.insert("standalone".to_string(), "true".to_string());
        options.insert("title".to_string(), "Doc".to_string());
        let html = format.serialize_with_options(&doc, &options).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Doc</title>"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let format = HtmlFormat::default();
        let mut options = HashMap::new();
        options.insert("theme".to_string(), "fancy".to_string());
        assert!(matches!(
            format.serialize_with_options(&Document::default(), &options),
            Err(FormatError::NotSupported(_))
        ));
    }
}
