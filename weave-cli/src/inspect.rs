//! Debug views of the Markdown pipeline's intermediate stages.
//!
//! Each view runs the configured pipeline up to one point and prints what it
//! sees there. These are development aids, their output is not stable.

use serde::Serialize;
use weave_babel::Pipeline;

pub const AVAILABLE_VIEWS: &[&str] = &["tokens", "lowered", "tree", "blocks"];

pub const DEFAULT_VIEW: &str = "tree";

/// Renders one view of `source`.
///
/// - `tokens`: the inline token stream of the preprocessed input, as JSON
/// - `lowered`: the text handed to comrak after every tokenizer is lowered
/// - `tree`: the parsed document tree, as JSON
/// - `blocks`: the line span of each top-level block in the core
///   serializer's output, as JSON
pub fn execute_view(pipeline: &Pipeline, source: &str, view: &str) -> Result<String, String> {
    match view {
        "tokens" => {
            let prepared = pipeline.preprocess(source);
            to_json(&pipeline.engine().tokens(&prepared))
        }
        "lowered" => {
            let prepared = pipeline.preprocess(source);
            Ok(pipeline.engine().lower(&prepared))
        }
        "tree" => to_json(&pipeline.parse(source)),
        "blocks" => {
            let doc = pipeline.parse(source);
            let rendered = pipeline
                .engine()
                .serialize(&doc)
                .map_err(|e| format!("Serialization failed: {e}"))?;
            to_json(&rendered.blocks)
        }
        other => Err(format!(
            "Unknown view '{other}'. Available views: {}",
            AVAILABLE_VIEWS.join(", ")
        )),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| format!("JSON serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowered_view_rewrites_scripts() {
        let lowered = execute_view(&Pipeline::standard(), "H~2~O", "lowered").unwrap();
        assert!(lowered.contains("<sub>2</sub>"));
    }

    #[test]
    fn test_tree_view_is_json() {
        let json = execute_view(&Pipeline::standard(), "# Title", "tree").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "doc");
    }

    #[test]
    fn test_blocks_view_lists_spans() {
        let json = execute_view(&Pipeline::standard(), "a\n\nb", "blocks").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[1]["index"], 1);
    }

    #[test]
    fn test_unknown_view() {
        assert!(execute_view(&Pipeline::standard(), "", "ast").is_err());
    }
}
