//! Markdown and HTML conversion for the weave rich-text editor
//!
//! ```text
//!     This crate converts between the editor's document tree and its text representations
//!     (Markdown, HTML and the tree's own JSON). It is the layer between the editing surface and
//!     whatever stores the document: the surface works on the tree, storage works on text.
//!
//!     TLDR: For format authors:
//!         - The tree (./tree) is the system of record. Formats only read it to serialize and
//!           build a fresh one to parse.
//!         - Markdown is parsed and serialized by comrak. We never hand-write a CommonMark parser;
//!           our job is the extensions comrak does not know and the mapping to and from the tree.
//!         - HTML is parsed and serialized by html5ever.
//!         - Every format validates the tree against the schema (./tree/schema.rs) before writing.
//! ```
//!
//! Architecture
//!
//! ```text
//!     Markdown conversion is a pipeline of stages around a core engine:
//!
//!         text ─▶ preprocess (each stage in order) ─▶ engine.parse ─▶ tree
//!         tree ─▶ engine.serialize ─▶ postprocess (each stage in order) ─▶ text
//!
//!     Stages carry the features plain Markdown cannot express (subscript, superscript, math,
//!     ordered-list starts, text alignment) and the clean-up passes that make pasted Markdown
//!     parse the way its author meant. A failing stage is logged and skipped: conversion never
//!     surfaces an error to the editing surface.
//!
//!     The engine serializes one tree block at a time and reports the line span each block
//!     occupies. Stages that re-annotate output use those spans instead of re-scanning text.
//!
//!     This is a pure lib, that is, it powers the weave CLI but is shell agnostic: no code here
//!     prints, reads environment variables or touches files.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── math.rs                 # LaTeX normalization and rendering
//!     ├── tree                    # Document tree, schema, walks and editor commands
//!     ├── session                 # Editing session and keymap
//!     ├── formats
//!     │   ├── markdown
//!     │   │   ├── pipeline.rs     # Stage trait and orchestrator
//!     │   │   ├── engine.rs       # comrak wrapper
//!     │   │   ├── lexer.rs        # Inline tokenizer registry
//!     │   │   ├── normalize.rs    # Text clean-up passes
//!     │   │   ├── codecs          # One module per extension
//!     │   │   ├── parser.rs       # comrak AST → tree
//!     │   │   └── serializer.rs   # tree → comrak AST → text
//!     │   ├── html
//!     │   └── json
//!     └── lib.rs
//! ```
//!
//! Testing
//! ```text
//!     tests
//!     └── <format>
//!         ├── <testname>.rs
//!         └── fixtures
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include
//!     these in the mod.
//! ```
//!
//! Formats
//!
//! ```text
//!     Format specific capabilities are implemented with the Format trait. Formats have a name,
//!     file extensions and parse() / serialize() methods. See the trait def [./format.rs]
//!     - Format trait: Uniform interface for all formats (parsing and/or serialization)
//!     - FormatRegistry: Centralized discovery and selection of formats
//!
//!     Markdown is the storage format and round-trips everything the editor can produce. HTML is
//!     for display and paste; its import is forgiving and lossy. JSON is the tree as-is.
//! ```
//!
pub mod error;
pub mod format;
pub mod formats;
pub mod math;
pub mod registry;
pub mod session;
pub mod tree;

pub use error::FormatError;
pub use format::Format;
pub use formats::markdown::{Pipeline, PipelineOptions};
pub use registry::FormatRegistry;
pub use session::{EditorSession, SessionOptions};
pub use tree::{Document, Node};
