use weave_babel::tree::{CodeBlock, Mark, Node, TextAlign};
use weave_babel::{Document, Pipeline};

/// Item numbers and texts, ignoring the marker padding.
fn numbered_items(markdown: &str) -> Vec<(String, String)> {
    markdown
        .lines()
        .filter_map(|line| line.split_once(". "))
        .map(|(number, text)| (number.to_string(), text.trim_start().to_string()))
        .collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(n, t)| (n.to_string(), t.to_string()))
        .collect()
}

fn first_paragraph_runs(doc: &Document) -> Vec<(String, Vec<Mark>)> {
    doc.content[0]
        .content()
        .iter()
        .filter_map(|node| match node {
            Node::Text(text) => Some((text.text.clone(), text.marks.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_subscript_survives_round_trip() {
    let pipeline = Pipeline::standard();
    let output = pipeline.serialize(&pipeline.parse("H~2~O"));
    assert!(output.contains("~2~"), "got {output:?}");
}

#[test]
fn test_superscript_keeps_inner_bold() {
    let pipeline = Pipeline::standard();
    let doc = pipeline.parse("x^**bold**^");

    let runs = first_paragraph_runs(&doc);
    let (_, marks) = runs
        .iter()
        .find(|(text, _)| text == "bold")
        .expect("bold run");
    assert!(marks.contains(&Mark::Bold));
    assert!(marks.contains(&Mark::Superscript));

    let output = pipeline.serialize(&doc);
    assert!(output.contains("bold"));
    assert!(output.contains("**"));
    assert!(output.contains('^'));
}

#[test]
fn test_ordered_list_start_is_written() {
    let items = ["a", "b", "c"]
        .iter()
        .map(|t| Node::list_item(vec![Node::paragraph(vec![Node::text(*t)])]))
        .collect();
    let doc = Document::new(vec![Node::ordered_list(5, items)]);

    let output = Pipeline::standard().serialize(&doc);

    assert_eq!(
        numbered_items(&output),
        pairs(&[("5", "a"), ("6", "b"), ("7", "c")])
    );
    assert_eq!(output.lines().count(), 3);
}

#[test]
fn test_ordered_list_default_start_is_unchanged() {
    let items = ["a", "b"]
        .iter()
        .map(|t| Node::list_item(vec![Node::paragraph(vec![Node::text(*t)])]))
        .collect();
    let doc = Document::new(vec![Node::ordered_list(1, items)]);

    let output = Pipeline::standard().serialize(&doc);

    assert_eq!(numbered_items(&output), pairs(&[("1", "a"), ("2", "b")]));
}

#[test]
fn test_ordered_list_start_is_parsed() {
    let doc = Pipeline::standard().parse("3. a\n4. b");
    match &doc.content[0] {
        Node::OrderedList(list) => assert_eq!(list.attrs.start, 3),
        other => panic!("expected ordered list, got {other:?}"),
    }
}

#[test]
fn test_ordered_list_start_survives_code_inside_an_item() {
    let pipeline = Pipeline::standard();
    let code = Node::CodeBlock(CodeBlock {
        attrs: Default::default(),
        content: vec![Node::text("1. step")],
    });
    let doc = Document::new(vec![Node::ordered_list(
        5,
        vec![
            Node::list_item(vec![Node::paragraph(vec![Node::text("a")]), code]),
            Node::list_item(vec![Node::paragraph(vec![Node::text("b")])]),
        ],
    )]);

    let output = pipeline.serialize(&doc);
    assert!(output.starts_with("5. a\n"), "got {output:?}");
    assert!(output.contains("1. step"), "got {output:?}");

    let reparsed = pipeline.parse(&output);
    match &reparsed.content[0] {
        Node::OrderedList(list) => {
            assert_eq!(list.attrs.start, 5);
            assert_eq!(list.content.len(), 2);
            assert!(matches!(list.content[0].content()[1], Node::CodeBlock(_)));
        }
        other => panic!("expected ordered list, got {other:?}"),
    }
}

#[test]
fn test_hand_written_ordered_list_is_written_back_unchanged() {
    let pipeline = Pipeline::standard();
    let md = "3. a\n4. b\n   1. nested\n5. c";
    assert_eq!(pipeline.serialize(&pipeline.parse(md)), md);
}

#[test]
fn test_alignment_round_trip() {
    let pipeline = Pipeline::standard();
    let mut centered = Node::paragraph(vec![Node::text("Centered")]);
    centered.set_text_align(Some(TextAlign::Center));
    let doc = Document::new(vec![
        Node::paragraph(vec![Node::text("Before")]),
        centered,
    ]);

    let output = pipeline.serialize(&doc);
    assert_eq!(output, "Before\n\n:::{align=center}\nCentered\n:::");

    let reparsed = pipeline.parse(&output);
    assert_eq!(reparsed.content.len(), 2);
    assert_eq!(reparsed.content[0].text_align(), None);
    assert_eq!(reparsed.content[1].text_align(), Some(TextAlign::Center));
    assert_eq!(reparsed.text_content(), doc.text_content());
}

#[test]
fn test_default_alignment_is_not_fenced() {
    let mut left = Node::paragraph(vec![Node::text("Left")]);
    left.set_text_align(Some(TextAlign::Left));
    let doc = Document::new(vec![left]);

    assert_eq!(Pipeline::standard().serialize(&doc), "Left");
}

#[test]
fn test_block_math_round_trip() {
    let pipeline = Pipeline::standard();
    let doc = pipeline.parse("$$\nx^2\n$$");
    assert_eq!(doc.content, vec![Node::block_math("x^2")]);
    assert_eq!(pipeline.serialize(&doc), "$$\nx^2\n$$");
}
