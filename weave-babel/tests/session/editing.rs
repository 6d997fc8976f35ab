use std::sync::{Arc, Mutex};
use weave_babel::session::{ChangeEvent, ContentType, SetContentOptions};
use weave_babel::tree::commands::TextRange;
use weave_babel::tree::TextAlign;
use weave_babel::{EditorSession, SessionOptions};

fn markdown_session() -> EditorSession {
    EditorSession::new(SessionOptions::default())
}

fn load(session: &mut EditorSession, markdown: &str) {
    session.set_content(
        markdown,
        SetContentOptions {
            emit_update: false,
            content_type: Some(ContentType::Markdown),
        },
    );
}

#[test]
fn test_html_paste_is_stored_as_markdown() {
    let mut session = markdown_session();
    session.set_content(
        r#"<p style="text-align: center">Hello</p><p>x<sup>2</sup></p>"#,
        SetContentOptions::default(),
    );

    assert_eq!(session.content(), ":::{align=center}\nHello\n:::\n\nx^2^");
}

#[test]
fn test_commands_reach_the_stored_markdown() {
    let mut session = markdown_session();
    load(&mut session, "H2O\n\nTitle");

    let events: Arc<Mutex<Vec<ChangeEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.on_change(move |event| sink.lock().unwrap().push(event.clone()));

    assert!(session
        .handle_key("Mod-,", &TextRange::new(vec![0], 1, 2))
        .unwrap());
    session.set_text_align(&[1], TextAlign::Right).unwrap();

    assert_eq!(session.content(), "H~2~O\n\n:::{align=right}\nTitle\n:::");
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].content, session.content());
}

#[test]
fn test_set_value_with_same_content_is_a_no_op() {
    let mut session = markdown_session();
    load(&mut session, "Same **text**");

    assert!(!session.set_value("Same **text**"));
    assert!(session.set_value("Other"));
    assert_eq!(session.content(), "Other");
}
