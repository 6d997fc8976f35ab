//! One editing session: a document tree plus the props and events the
//! editing surface sees.
//!
//! The session owns its tree exclusively. Content enters through
//! [`EditorSession::set_content`] (or [`EditorSession::set_value`] for the
//! externally controlled value) and leaves through the change listener, which
//! receives the document serialized in the session's content type.

pub mod keymap;

use crate::error::CommandError;
use crate::formats::html::{parse_html, serialize_to_html, HtmlOptions};
use crate::formats::markdown::Pipeline;
use crate::tree::commands::{self, TextRange};
use crate::tree::{Document, Mark, MarkKind, TextAlign};
use keymap::{KeyAction, Keymap};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialization used for the session's value and change events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Markdown,
    Html,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentType::Markdown => "markdown",
            ContentType::Html => "html",
        })
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ContentType::Markdown),
            "html" => Ok(ContentType::Html),
            other => Err(format!("unknown content type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Rich,
    Source,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub read_only: bool,
    /// Limit on [`Document::character_count`].
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Rich and source views side by side. Switching views fires a change
    /// event only in this mode.
    #[serde(default)]
    pub dual_view: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetContentOptions {
    pub emit_update: bool,
    /// How to read the new content. HTML when unset.
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub content: String,
    pub content_type: ContentType,
    /// Present for edits, absent for view switches.
    pub character_count: Option<usize>,
}

pub type ChangeListener = Box<dyn FnMut(&ChangeEvent) + Send>;

pub struct EditorSession {
    pipeline: Pipeline,
    html: HtmlOptions,
    keymap: Keymap,
    options: SessionOptions,
    document: Document,
    view: ViewMode,
    listener: Option<ChangeListener>,
}

impl EditorSession {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_pipeline(Pipeline::standard(), options)
    }

    pub fn with_pipeline(pipeline: Pipeline, options: SessionOptions) -> Self {
        Self {
            pipeline,
            html: HtmlOptions::default(),
            keymap: Keymap::standard(),
            options,
            document: Document::default(),
            view: ViewMode::default(),
            listener: None,
        }
    }

    pub fn with_html_options(mut self, html: HtmlOptions) -> Self {
        self.html = html;
        self
    }

    pub fn on_change(&mut self, listener: impl FnMut(&ChangeEvent) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn keymap_mut(&mut self) -> &mut Keymap {
        &mut self.keymap
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn character_count(&self) -> usize {
        self.document.character_count()
    }

    /// The placeholder to show, if the document is empty.
    pub fn placeholder(&self) -> Option<&str> {
        if self.document.text_content().is_empty() {
            self.options.placeholder.as_deref()
        } else {
            None
        }
    }

    /// The document serialized in the session's content type.
    pub fn content(&self) -> String {
        match self.options.content_type {
            ContentType::Markdown => self.pipeline.serialize(&self.document),
            ContentType::Html => serialize_to_html(&self.document, &self.html).unwrap_or_else(
                |error| {
                    tracing::error!(%error, "HTML serialization failed");
                    String::new()
                },
            ),
        }
    }

    /// Replaces the document.
    pub fn set_content(&mut self, content: &str, options: SetContentOptions) {
        self.document = match options.content_type.unwrap_or(ContentType::Html) {
            ContentType::Markdown => self.pipeline.parse(content),
            ContentType::Html => parse_html(content),
        };
        if options.emit_update {
            self.emit(true);
        }
    }

    /// Applies an externally controlled value. The document is only replaced
    /// when the value differs from the current content, and no change event
    /// is fired. Returns whether the document was replaced.
    pub fn set_value(&mut self, value: &str) -> bool {
        if value == self.content() {
            return false;
        }
        let content_type = match self.options.content_type {
            ContentType::Markdown => Some(ContentType::Markdown),
            ContentType::Html => None,
        };
        self.set_content(
            value,
            SetContentOptions {
                emit_update: false,
                content_type,
            },
        );
        true
    }

    /// An edit made in the source view.
    pub fn edit_source(&mut self, source: &str) -> Result<(), CommandError> {
        self.ensure_writable()?;
        self.set_content(
            source,
            SetContentOptions {
                emit_update: true,
                content_type: Some(self.options.content_type),
            },
        );
        Ok(())
    }

    pub fn switch_view(&mut self, mode: ViewMode) {
        self.view = mode;
        if self.options.dual_view {
            self.emit(false);
        }
    }

    pub fn set_mark(&mut self, range: &TextRange, mark: Mark) -> Result<(), CommandError> {
        self.ensure_writable()?;
        commands::set_mark(&mut self.document, range, mark)?;
        self.emit(true);
        Ok(())
    }

    pub fn unset_mark(&mut self, range: &TextRange, kind: MarkKind) -> Result<(), CommandError> {
        self.ensure_writable()?;
        commands::unset_mark(&mut self.document, range, kind)?;
        self.emit(true);
        Ok(())
    }

    pub fn toggle_mark(&mut self, range: &TextRange, mark: Mark) -> Result<(), CommandError> {
        self.ensure_writable()?;
        commands::toggle_mark(&mut self.document, range, mark)?;
        self.emit(true);
        Ok(())
    }

    pub fn set_text_align(&mut self, path: &[usize], align: TextAlign) -> Result<(), CommandError> {
        self.ensure_writable()?;
        commands::set_text_align(&mut self.document, path, Some(align))?;
        self.emit(true);
        Ok(())
    }

    pub fn unset_text_align(&mut self, path: &[usize]) -> Result<(), CommandError> {
        self.ensure_writable()?;
        commands::set_text_align(&mut self.document, path, None)?;
        self.emit(true);
        Ok(())
    }

    /// Typed input replacing `range`. Input that would exceed `max_length`
    /// is refused. Returns the number of characters inserted.
    pub fn insert_text(&mut self, range: &TextRange, text: &str) -> Result<usize, CommandError> {
        self.ensure_writable()?;
        let len = text.chars().count();
        if let Some(remaining) = self.remaining(range) {
            if len > remaining {
                tracing::debug!(len, remaining, "input refused at max length");
                return Ok(0);
            }
        }
        self.replace(range, text)?;
        Ok(len)
    }

    /// Pasted text replacing `range`, truncated to fit `max_length`.
    /// Returns the number of characters inserted.
    pub fn paste_text(&mut self, range: &TextRange, text: &str) -> Result<usize, CommandError> {
        self.ensure_writable()?;
        let text: String = match self.remaining(range) {
            Some(0) => return Ok(0),
            Some(remaining) => text.chars().take(remaining).collect(),
            None => text.to_string(),
        };
        self.replace(range, &text)?;
        Ok(text.chars().count())
    }

    /// Runs the action bound to `binding` on `range`. Returns false when
    /// nothing is bound.
    pub fn handle_key(&mut self, binding: &str, range: &TextRange) -> Result<bool, CommandError> {
        let Some(action) = self.keymap.lookup(binding) else {
            return Ok(false);
        };
        match action {
            KeyAction::ToggleMark(_) => match action.mark() {
                Some(mark) => self.toggle_mark(range, mark)?,
                None => return Ok(false),
            },
            KeyAction::Align(align) => self.set_text_align(&range.path, align)?,
        }
        Ok(true)
    }

    fn replace(&mut self, range: &TextRange, text: &str) -> Result<(), CommandError> {
        commands::replace_text(&mut self.document, range, text)?;
        self.emit(true);
        Ok(())
    }

    /// Characters still allowed once `range` is replaced.
    fn remaining(&self, range: &TextRange) -> Option<usize> {
        let max = self.options.max_length?;
        let selected = range.to.saturating_sub(range.from);
        let kept = self.character_count().saturating_sub(selected);
        Some(max.saturating_sub(kept))
    }

    fn ensure_writable(&self) -> Result<(), CommandError> {
        if self.options.read_only {
            Err(CommandError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn emit(&mut self, with_count: bool) {
        if self.listener.is_none() {
            return;
        }
        let event = ChangeEvent {
            content: self.content(),
            content_type: self.options.content_type,
            character_count: with_count.then(|| self.character_count()),
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }
}

impl fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("options", &self.options)
            .field("view", &self.view)
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(session: &mut EditorSession) -> Arc<Mutex<Vec<ChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        session.on_change(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    fn markdown_session(text: &str) -> EditorSession {
        let mut session = EditorSession::new(SessionOptions::default());
        session.set_content(
            text,
            SetContentOptions {
                emit_update: false,
                content_type: Some(ContentType::Markdown),
            },
        );
        session
    }

    #[test]
    fn set_content_emits_only_when_asked() {
        let mut session = EditorSession::new(SessionOptions::default());
        let events = recording(&mut session);
        session.set_content(
            "hello",
            SetContentOptions {
                emit_update: false,
                content_type: Some(ContentType::Markdown),
            },
        );
        assert!(events.lock().unwrap().is_empty());

        session.set_content(
            "<p>hi <b>there</b></p>",
            SetContentOptions {
                emit_update: true,
                content_type: None,
            },
        );
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content, "hi **there**");
        assert_eq!(events[0].character_count, Some(8));
    }

    #[test]
    fn set_value_skips_identical_content() {
        let mut session = markdown_session("same");
        let events = recording(&mut session);
        assert!(!session.set_value("same"));
        assert!(session.set_value("different"));
        assert_eq!(session.document().text_content(), "different");
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn toggle_mark_fires_change_with_count() {
        let mut session = markdown_session("H2O");
        let events = recording(&mut session);
        session
            .toggle_mark(&TextRange::new(vec![0], 1, 2), Mark::Subscript)
            .unwrap();
        let events = events.lock().unwrap();
        assert_eq!(events[0].content, "H~2~O");
        assert_eq!(events[0].content_type, ContentType::Markdown);
        assert_eq!(events[0].character_count, Some(3));
    }

    #[test]
    fn keymap_dispatch() {
        let mut session = markdown_session("x2");
        let range = TextRange::new(vec![0], 1, 2);
        assert!(session.handle_key("Mod-.", &range).unwrap());
        assert_eq!(session.content(), "x^2^");
        assert!(session.handle_key("Mod-Shift-e", &range).unwrap());
        assert_eq!(
            session.document().content[0].text_align(),
            Some(TextAlign::Center)
        );
        assert!(!session.handle_key("Mod-q", &range).unwrap());
    }

    #[test]
    fn read_only_rejects_commands() {
        let mut session = EditorSession::new(SessionOptions {
            read_only: true,
            ..SessionOptions::default()
        });
        session.set_value("text");
        assert_eq!(
            session.set_mark(&TextRange::new(vec![0], 0, 1), Mark::Bold),
            Err(CommandError::ReadOnly)
        );
        assert_eq!(
            session.insert_text(&TextRange::new(vec![0], 0, 0), "a"),
            Err(CommandError::ReadOnly)
        );
    }

    #[test]
    fn max_length_refuses_typing_and_truncates_paste() {
        let mut session = EditorSession::new(SessionOptions {
            max_length: Some(5),
            ..SessionOptions::default()
        });
        session.set_value("abc");
        let end = TextRange::new(vec![0], 3, 3);
        assert_eq!(session.insert_text(&end, "xyz").unwrap(), 0);
        assert_eq!(session.paste_text(&end, "xyz").unwrap(), 2);
        assert_eq!(session.document().text_content(), "abcxy");
        assert_eq!(session.paste_text(&end, "q").unwrap(), 0);

        // replacing a selection frees its characters
        let selection = TextRange::new(vec![0], 0, 2);
        assert_eq!(session.insert_text(&selection, "12").unwrap(), 2);
        assert_eq!(session.document().text_content(), "12cxy");
    }

    #[test]
    fn switch_view_emits_without_count_in_dual_view() {
        let mut session = EditorSession::new(SessionOptions {
            dual_view: true,
            content_type: ContentType::Html,
            ..SessionOptions::default()
        });
        session.set_value("<p>a</p>");
        let events = recording(&mut session);
        session.switch_view(ViewMode::Source);
        assert_eq!(session.view(), ViewMode::Source);
        let events = events.lock().unwrap();
        assert_eq!(
            events[0],
            ChangeEvent {
                content: "<p>a</p>".to_string(),
                content_type: ContentType::Html,
                character_count: None,
            }
        );
    }

    #[test]
    fn placeholder_only_when_empty() {
        let mut session = EditorSession::new(SessionOptions {
            placeholder: Some("Write…".to_string()),
            ..SessionOptions::default()
        });
        assert_eq!(session.placeholder(), Some("Write…"));
        session.set_value("x");
        assert_eq!(session.placeholder(), None);
    }

    #[test]
    fn content_type_from_str() {
        assert_eq!("HTML".parse::<ContentType>(), Ok(ContentType::Html));
        assert_eq!("md".parse::<ContentType>(), Ok(ContentType::Markdown));
        assert!("rtf".parse::<ContentType>().is_err());
    }
}
