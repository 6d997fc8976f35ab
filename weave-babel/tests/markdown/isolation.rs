//! A failing stage must not stop the rest of the chain.

use std::borrow::Cow;
use weave_babel::error::StageError;
use weave_babel::formats::markdown::codecs::OrderedListStart;
use weave_babel::formats::markdown::pipeline::{
    EnhancedMarkdown, ParseContext, SerializeContext, Stage,
};
use weave_babel::tree::{Mark, Node};
use weave_babel::{Document, Pipeline};

/// Stands in for an alignment stage that chokes on its input.
struct MalformedAlign;

impl Stage for MalformedAlign {
    fn name(&self) -> &'static str {
        "textAlign"
    }

    fn preprocess<'a>(
        &self,
        _markdown: &'a str,
        _ctx: &ParseContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        Err(StageError::new("textAlign", "malformed fence"))
    }

    fn postprocess<'a>(
        &self,
        _markdown: &'a str,
        _ctx: &SerializeContext<'_>,
    ) -> Result<Cow<'a, str>, StageError> {
        Err(StageError::new("textAlign", "malformed span"))
    }
}

fn pipeline() -> Pipeline {
    Pipeline::with_stages(vec![
        Box::new(OrderedListStart),
        Box::new(MalformedAlign),
        Box::new(EnhancedMarkdown::default()),
    ])
}

#[test]
fn test_serialize_survives_failing_stage() {
    let items = ["a", "b", "c"]
        .iter()
        .map(|t| Node::list_item(vec![Node::paragraph(vec![Node::text(*t)])]))
        .collect();
    let link = Mark::link("http://x", None);
    let doc = Document::new(vec![
        Node::ordered_list(5, items),
        Node::paragraph(vec![Node::marked_text("click", vec![link, Mark::Bold])]),
    ]);

    let output = pipeline().serialize(&doc);

    let markers: Vec<&str> = output
        .lines()
        .take(3)
        .filter_map(|line| line.split_once(". ").map(|(number, _)| number))
        .collect();
    assert_eq!(markers, vec!["5", "6", "7"], "got {output:?}");
    assert!(output.ends_with("[**click**](http://x)"), "got {output:?}");
}

#[test]
fn test_parse_survives_failing_stage() {
    let doc = pipeline().parse("2. a\n3. b\n\nplain text");
    assert_eq!(doc.content.len(), 2);
    assert!(matches!(&doc.content[0], Node::OrderedList(l) if l.attrs.start == 2));
    assert_eq!(doc.content[1].content(), &[Node::text("plain text")]);
}
