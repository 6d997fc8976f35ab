use weave_babel::format::Format;
use weave_babel::formats::HtmlFormat;
use weave_babel::tree::{Mark, Node, TextAlign};
use weave_babel::{FormatRegistry, Pipeline};

#[test]
fn test_pasted_html_becomes_markdown() {
    let registry = FormatRegistry::default();
    let doc = registry
        .parse("<h2>Notes</h2><p>H<sub>2</sub>O is <b>wet</b></p>", "html")
        .expect("html parses");

    let md = Pipeline::standard().serialize(&doc);

    assert_eq!(md, "## Notes\n\nH~2~O is **wet**");
}

#[test]
fn test_aligned_paragraph_imports_alignment() {
    let doc = HtmlFormat::default()
        .parse(r#"<p style="text-align: right">Signed</p><p align="center">Mid</p>"#)
        .expect("html parses");

    assert_eq!(doc.content[0].text_align(), Some(TextAlign::Right));
    assert_eq!(doc.content[1].text_align(), Some(TextAlign::Center));
}

#[test]
fn test_marks_are_imported() {
    let doc = HtmlFormat::default()
        .parse(r#"<p><a href="http://x"><em>go</em></a></p>"#)
        .expect("html parses");

    let Node::Text(run) = &doc.content[0].content()[0] else {
        panic!("expected a text run");
    };
    assert_eq!(run.text, "go");
    assert!(run.marks.contains(&Mark::Italic));
    assert!(run.marks.contains(&Mark::link("http://x", None)));
}

#[test]
fn test_malformed_html_still_imports() {
    let doc = HtmlFormat::default()
        .parse("<p>unclosed <strong>bold")
        .expect("html parses");
    assert_eq!(doc.text_content(), "unclosed bold");
}
