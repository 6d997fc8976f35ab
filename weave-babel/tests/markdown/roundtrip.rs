use proptest::prelude::*;
use std::path::PathBuf;
use weave_babel::format::Format;
use weave_babel::formats::MarkdownFormat;
use weave_babel::Pipeline;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("markdown")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("fixture exists")
}

#[test]
fn test_basic_fixture_round_trips() {
    let md = fixture("basic.md");
    let format = MarkdownFormat::default();

    let doc = format.parse(&md).expect("Failed to parse markdown");
    let output = format.serialize(&doc).expect("Failed to serialize markdown");

    assert_eq!(output.trim_end(), md.trim_end());
}

#[test]
fn test_second_pass_is_stable() {
    let pipeline = Pipeline::standard();
    let md = "Water is H~2~O and x^2^ grows.\n\n1. one\n2. two";

    let first = pipeline.serialize(&pipeline.parse(md));
    let second = pipeline.serialize(&pipeline.parse(&first));

    assert_eq!(first, second);
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..6).prop_map(|words| words.join(" "))
}

/// A paragraph, a heading, or a paragraph with a bold or linked phrase.
fn block() -> impl Strategy<Value = String> {
    prop_oneof![
        sentence(),
        (1usize..4, sentence()).prop_map(|(level, text)| format!("{} {text}", "#".repeat(level))),
        (sentence(), word()).prop_map(|(text, strong)| format!("{text} **{strong}**")),
        (word(), sentence())
            .prop_map(|(label, text)| format!("[{label}](https://example.com) {text}")),
    ]
}

proptest! {
    #[test]
    fn simple_documents_round_trip(blocks in prop::collection::vec(block(), 1..5)) {
        let md = blocks.join("\n\n");
        let pipeline = Pipeline::standard();
        let output = pipeline.serialize(&pipeline.parse(&md));
        prop_assert_eq!(output.trim_end(), md.as_str());
    }
}
