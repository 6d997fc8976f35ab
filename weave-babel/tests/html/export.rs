use insta::assert_snapshot;
use std::collections::HashMap;
use weave_babel::format::Format;
use weave_babel::formats::HtmlFormat;
use weave_babel::FormatRegistry;

#[test]
fn test_markdown_to_html_through_registry() {
    let registry = FormatRegistry::default();
    let doc = registry
        .parse("# Title\n\nx^2^ and more", "markdown")
        .expect("markdown parses");

    let html = registry.serialize(&doc, "html").expect("html serializes");

    assert!(html.starts_with("<h1>Title</h1>\n<p>"));
    assert!(html.contains("x<sup>2</sup>"));
}

#[test]
fn test_scripts_export_as_tags() {
    let registry = FormatRegistry::default();
    let doc = registry
        .parse("# Title\n\nH~2~O", "markdown")
        .expect("markdown parses");

    let html = registry.serialize(&doc, "html").expect("html serializes");

    assert_snapshot!(html, @r"
    <h1>Title</h1>
    <p>H<sub>2</sub>O</p>
    ");
}

#[test]
fn test_html_round_trip_is_stable() {
    let format = HtmlFormat::default();
    let html = "<h2>Heading</h2>\n<ul><li><p>one</p></li><li><p>two</p></li></ul>";

    let doc = format.parse(html).expect("html parses");
    let once = format.serialize(&doc).expect("html serializes");
    let twice = format
        .serialize(&format.parse(&once).expect("html parses"))
        .expect("html serializes");

    assert_eq!(once, twice);
    assert!(once.contains("<li><p>one</p></li>"));
}

#[test]
fn test_standalone_page_via_options() {
    let registry = FormatRegistry::default();
    let doc = registry.parse("hello", "markdown").expect("markdown parses");
    let mut options = HashMap::new();
    options.insert("standalone".to_string(), "true".to_string());
    options.insert("css".to_string(), "p { color: red; }".to_string());

    let html = registry
        .serialize_with_options(&doc, "html", &options)
        .expect("html serializes");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("p { color: red; }"));
    assert!(html.contains("<p>hello</p>"));
}

#[test]
fn test_math_export_carries_latex() {
    let registry = FormatRegistry::default();
    let doc = registry
        .parse("Area $\\pi r^2$", "markdown")
        .expect("markdown parses");

    let html = registry.serialize(&doc, "html").expect("html serializes");

    assert!(html.contains(r#"data-type="inline-math""#));
    assert!(html.contains(r#"data-latex="\pi r^2""#));
}
