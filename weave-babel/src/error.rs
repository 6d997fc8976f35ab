//! Error types for format, pipeline and editor operations

use thiserror::Error;

/// Errors that can occur during format operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Error during parsing
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Format does not support the requested direction
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    /// The document violates the node vocabulary
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] SchemaError),
}

/// A pipeline stage failed to transform its input.
///
/// Stages never propagate this past the pipeline; the orchestrator logs it and
/// keeps the stage's input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage '{stage}' failed: {message}")]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

impl StageError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// A tree that does not respect the block/inline placement rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node '{node}' at {path:?}: {message}")]
pub struct SchemaError {
    pub node: &'static str,
    pub path: Vec<usize>,
    pub message: String,
}

/// LaTeX rejected by the math renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("unbalanced braces in '{0}'")]
    UnbalancedBraces(String),
    #[error("\\left without matching \\right")]
    UnmatchedDelimiter,
    #[error("environment '{0}' is not closed")]
    UnclosedEnvironment(String),
    #[error("\\end{{{found}}} does not close \\begin{{{expected}}}")]
    MismatchedEnvironment { expected: String, found: String },
    #[error("\\end{{{0}}} without \\begin")]
    UnexpectedEnd(String),
    #[error("\\begin or \\end without an environment name")]
    MissingEnvironmentName,
    #[error("trailing backslash")]
    TrailingBackslash,
    #[error("\\tag is only allowed in display math")]
    TagOutsideDisplay,
    #[error("command \\{0} needs trust")]
    Untrusted(String),
    #[error("character '{0}' in math mode (strict)")]
    NonAscii(char),
}

/// Editor commands addressing something that is not there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no node at path {0:?}")]
    InvalidPath(Vec<usize>),
    #[error("node at path {0:?} is not a text block")]
    NotTextBlock(Vec<usize>),
    #[error("range {from}..{to} is outside a block of length {len}")]
    InvalidRange { from: usize, to: usize, len: usize },
    #[error("node type '{0}' does not accept text alignment")]
    AlignmentNotSupported(&'static str),
    #[error("editor is read-only")]
    ReadOnly,
}
