//! Feature codecs: each pairs a recognizer (Markdown to tree) with a renderer
//! (tree to Markdown) for one construct plain CommonMark cannot carry.

pub mod math;
pub mod ordered_list;
pub mod script;
pub mod text_align;

pub use math::{MathTokenizer, Mathematics};
pub use ordered_list::OrderedListStart;
pub use script::{ScriptTokenizer, Subscript, Superscript};
pub use text_align::{TextAlignFence, TextAlignOptions};
