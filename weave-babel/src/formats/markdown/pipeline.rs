//! Fixed-order middleware around one core parse and one core serialize.
//!
//! A [`Pipeline`] owns an ordered list of [`Stage`]s. Construction runs every
//! stage's `setup` against a shared [`MarkdownStorage`], which becomes the
//! core [`MarkdownEngine`]. `parse` then threads the input through every
//! stage's `preprocess` in list order before the core parse; `serialize` runs
//! the core serializer and threads its output through every `postprocess` in
//! list order.
//!
//! Stages are isolated from each other: a stage that returns an error is
//! logged and skipped, and the next stage receives the text the failing stage
//! was given. Neither `parse` nor `serialize` can fail.
//!
//! Postprocessors receive the core serializer's [`BlockSpan`]s. Any stage
//! that runs before another span consumer must keep the line count intact.

use super::codecs::{
    Mathematics, OrderedListStart, Subscript, Superscript, TextAlignFence, TextAlignOptions,
};
use super::engine::{MarkdownEngine, ParserConfig};
use super::lexer::InlineLexer;
use super::normalize;
use super::serializer::BlockSpan;
use crate::error::StageError;
use crate::tree::Document;
use std::borrow::Cow;

/// Typed slots shared by all stages during setup.
#[derive(Debug, Default)]
pub struct MarkdownStorage {
    pub parser: ParserConfig,
    pub lexer: InlineLexer,
}

/// What a stage sees while the input is being prepared for the core parse.
pub struct ParseContext<'a> {
    pub engine: &'a MarkdownEngine,
}

/// What a stage sees after the core serializer has run.
pub struct SerializeContext<'a> {
    pub document: &'a Document,
    /// Line span of every top-level block in the core serializer's output.
    pub blocks: &'a [BlockSpan],
    pub engine: &'a MarkdownEngine,
}

/// One extension of the Markdown pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registers tokenizers or adjusts parser configuration.
    fn setup(&self, _storage: &mut MarkdownStorage) {}

    fn preprocess<'a>(
        &self,
        markdown: &'a str,
        _ctx: &ParseContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        Ok(Cow::Borrowed(markdown))
    }

    fn postprocess<'a>(
        &self,
        markdown: &'a str,
        _ctx: &SerializeContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        Ok(Cow::Borrowed(markdown))
    }
}

/// Options for the standard stage list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub markdown: ParserConfig,
    pub text_align: TextAlignOptions,
}

/// Parser configuration, text normalization and link repair.
///
/// Sits last so its preprocess sees alignment fences already lowered and its
/// postprocess sees the output of every codec.
#[derive(Debug, Default)]
pub struct EnhancedMarkdown {
    config: ParserConfig,
}

impl EnhancedMarkdown {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl Stage for EnhancedMarkdown {
    fn name(&self) -> &'static str {
        "enhancedMarkdown"
    }

    fn setup(&self, storage: &mut MarkdownStorage) {
        storage.parser = self.config.clone();
    }

    fn preprocess<'a>(
        &self,
        markdown: &'a str,
        _ctx: &ParseContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        Ok(Cow::Owned(normalize::preprocess(markdown)))
    }

    fn postprocess<'a>(
        &self,
        markdown: &'a str,
        _ctx: &SerializeContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        Ok(Cow::Owned(normalize::postprocess(markdown)))
    }
}

pub struct Pipeline {
    engine: MarkdownEngine,
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("engine", &self.engine)
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// The standard stages with default options.
    pub fn standard() -> Self {
        Self::new(PipelineOptions::default())
    }

    /// The standard stages: math, subscript, superscript, ordered-list
    /// start, text alignment, then normalization.
    pub fn new(options: PipelineOptions) -> Self {
        Self::with_stages(vec![
            Box::new(Mathematics),
            Box::new(Subscript),
            Box::new(Superscript),
            Box::new(OrderedListStart),
            Box::new(TextAlignFence::new(options.text_align)),
            Box::new(EnhancedMarkdown::new(options.markdown)),
        ])
    }

    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        let mut storage = MarkdownStorage::default();
        for stage in &stages {
            stage.setup(&mut storage);
        }
        Self {
            engine: MarkdownEngine::new(storage),
            stages,
        }
    }

    pub fn engine(&self) -> &MarkdownEngine {
        &self.engine
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every preprocess hook without parsing.
    pub fn preprocess(&self, markdown: &str) -> String {
        let ctx = ParseContext {
            engine: &self.engine,
        };
        let mut text = Cow::Borrowed(markdown);
        for stage in &self.stages {
            let next = match stage.preprocess(&text, &ctx) {
                Ok(Cow::Owned(processed)) => Some(processed),
                Ok(Cow::Borrowed(_)) => None,
                Err(error) => {
                    tracing::warn!(
                        stage = stage.name(),
                        %error,
                        "preprocess failed, keeping its input"
                    );
                    None
                }
            };
            if let Some(processed) = next {
                text = Cow::Owned(processed);
            }
        }
        text.into_owned()
    }

    /// Parses Markdown into a fresh document tree.
    ///
    /// If the preprocessed text cannot be parsed, the raw input is parsed
    /// instead; if that fails too, the result is an empty document.
    pub fn parse(&self, markdown: &str) -> Document {
        if markdown.trim().is_empty() {
            return Document::default();
        }
        let processed = self.preprocess(markdown);
        match self.engine.parse(&processed) {
            Ok(document) => document,
            Err(error) => {
                tracing::error!(%error, "parse of preprocessed input failed, parsing raw input");
                self.engine.parse(markdown).unwrap_or_else(|error| {
                    tracing::error!(%error, "parse of raw input failed");
                    Document::default()
                })
            }
        }
    }

    /// Serializes a document tree to Markdown.
    pub fn serialize(&self, document: &Document) -> String {
        if document.is_empty() {
            return String::new();
        }
        let rendered = match self.engine.serialize(document) {
            Ok(rendered) => rendered,
            Err(error) => {
                tracing::error!(%error, "core serialize failed");
                return String::new();
            }
        };

        let ctx = SerializeContext {
            document,
            blocks: &rendered.blocks,
            engine: &self.engine,
        };
        let mut text = Cow::Borrowed(rendered.markdown.as_str());
        for stage in &self.stages {
            let next = match stage.postprocess(&text, &ctx) {
                Ok(Cow::Owned(processed)) => Some(processed),
                Ok(Cow::Borrowed(_)) => None,
                Err(error) => {
                    tracing::warn!(
                        stage = stage.name(),
                        %error,
                        "postprocess failed, keeping its input"
                    );
                    None
                }
            };
            if let Some(processed) = next {
                text = Cow::Owned(processed);
            }
        }
        text.into_owned()
    }
}
