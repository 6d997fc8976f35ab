//! Shared configuration loader for the weave toolchain.
//!
//! `defaults/weave.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`WeaveConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use weave_babel::formats::html::HtmlOptions;
use weave_babel::formats::markdown::codecs::TextAlignOptions;
use weave_babel::formats::markdown::{ParserConfig, PipelineOptions};
use weave_babel::math::MathOptions;
use weave_babel::session::{ContentType, SessionOptions};
use weave_babel::tree::TextAlign;

const DEFAULT_TOML: &str = include_str!("../defaults/weave.default.toml");

/// Top-level configuration consumed by weave applications.
#[derive(Debug, Clone, Deserialize)]
pub struct WeaveConfig {
    pub markdown: MarkdownConfig,
    pub math: MathConfig,
    pub text_align: TextAlignConfig,
    pub editor: EditorConfig,
}

impl WeaveConfig {
    /// Options for the standard Markdown pipeline.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            markdown: (&self.markdown).into(),
            text_align: (&self.text_align).into(),
        }
    }

    /// HTML export options using the configured math renderer.
    pub fn html_options(&self) -> HtmlOptions {
        HtmlOptions {
            math: (&self.math).into(),
            ..HtmlOptions::default()
        }
    }
}

/// Mirrors the structural parser options.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub html: bool,
    pub breaks: bool,
    pub linkify: bool,
    pub typographer: bool,
    pub tables: bool,
}

impl From<&MarkdownConfig> for ParserConfig {
    fn from(config: &MarkdownConfig) -> Self {
        ParserConfig {
            html: config.html,
            breaks: config.breaks,
            linkify: config.linkify,
            typographer: config.typographer,
            tables: config.tables,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MathConfig {
    pub throw_on_error: bool,
    pub error_color: String,
    pub strict: bool,
    pub trust: bool,
}

impl From<&MathConfig> for MathOptions {
    fn from(config: &MathConfig) -> Self {
        MathOptions {
            throw_on_error: config.throw_on_error,
            error_color: config.error_color.clone(),
            strict: config.strict,
            trust: config.trust,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextAlignConfig {
    pub types: Vec<String>,
    pub alignments: Vec<TextAlign>,
    pub default_alignment: TextAlign,
}

impl From<&TextAlignConfig> for TextAlignOptions {
    fn from(config: &TextAlignConfig) -> Self {
        TextAlignOptions {
            types: config.types.clone(),
            alignments: config.alignments.clone(),
            default_alignment: config.default_alignment,
        }
    }
}

/// Editing session props.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    pub content_type: ContentType,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// 0 means unlimited.
    pub max_length: usize,
    pub read_only: bool,
    pub dual_view: bool,
}

impl From<&EditorConfig> for SessionOptions {
    fn from(config: &EditorConfig) -> Self {
        SessionOptions {
            content_type: config.content_type,
            read_only: config.read_only,
            max_length: (config.max_length > 0).then_some(config.max_length),
            placeholder: config.placeholder.clone(),
            dual_view: config.dual_view,
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<WeaveConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<WeaveConfig, ConfigError> {
    Loader::new().build()
}
