use weave_babel::formats::markdown::normalize;
use weave_babel::tree::Node;
use weave_babel::Pipeline;

#[test]
fn test_html_table_next_to_text_is_isolated() {
    let md = "Intro\n<table><tr><td>cell</td></tr></table>\nOutro";
    let processed = Pipeline::standard().preprocess(md);
    assert!(processed.contains("Intro\n\n<table>"));
    assert!(processed.contains("</table>\n\nOutro"));
}

#[test]
fn test_pipe_table_blank_row_is_joined() {
    let md = "| a | b |\n|---|---|\n| 1 | 2 |\n\n| 3 | 4 |";
    let processed = normalize::preprocess(md);
    assert_eq!(processed, "| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |");

    let doc = Pipeline::standard().parse(md);
    assert_eq!(doc.content.len(), 1);
    let Node::Table(table) = &doc.content[0] else {
        panic!("expected a table, got {:?}", doc.content[0]);
    };
    assert_eq!(table.content.len(), 3);
}

#[test]
fn test_pipe_table_followed_by_paragraph_keeps_blank_line() {
    let md = "| a |\n|---|\n| 1 |\n\nAfter";
    assert_eq!(normalize::preprocess(md), md);
}

#[test]
fn test_list_continuation_indentation() {
    assert_eq!(
        normalize::preprocess("- item\n  continued"),
        "- item\n    continued"
    );
    let deep = "- item\n     five";
    assert_eq!(normalize::preprocess(deep), deep);
}

#[test]
fn test_link_inside_emphasis_is_repaired() {
    assert_eq!(
        normalize::postprocess("**[click](http://x)**"),
        "[**click**](http://x)"
    );
}
