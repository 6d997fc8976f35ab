//! HTML format tests
//!
//! Import of pasted or stored HTML and export of the tree, including the
//! Markdown ↔ HTML path through the registry.

mod export;
mod import;
