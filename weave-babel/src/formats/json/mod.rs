//! The document tree as JSON.
//!
//! This is the editor's native document JSON (`{"type": "doc", "content": [...]}`),
//! handy for inspecting what a Markdown or HTML import produced.

use crate::error::FormatError;
use crate::format::Format;
use crate::tree::{validate, Document};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat {
    compact: bool,
}

impl JsonFormat {
    /// Single-line output instead of pretty-printed.
    pub fn compact() -> Self {
        Self { compact: true }
    }

    fn write(&self, doc: &Document, compact: bool) -> Result<String, FormatError> {
        let result = if compact {
            serde_json::to_string(doc)
        } else {
            serde_json::to_string_pretty(doc)
        };
        result.map_err(|e| FormatError::SerializationError(e.to_string()))
    }
}

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        let doc: Document =
            serde_json::from_str(source).map_err(|e| FormatError::ParseError(e.to_string()))?;
        validate(&doc)?;
        Ok(doc)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        self.write(doc, self.compact)
    }

    /// Accepts `compact` (`true`/`false`).
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let mut compact = self.compact;
        for (key, value) in options {
            match (key.as_str(), value.as_str()) {
                ("compact", "true") => compact = true,
                ("compact", "false") => compact = false,
                _ => {
                    return Err(FormatError::NotSupported(format!(
                        "Format 'json' does not support option '{key}={value}'"
                    )))
                }
            }
        }
        self.write(doc, compact)
    }
}
