//! Markdown format tests
//!
//! Tests for bidirectional Markdown ↔ tree conversion through the full pipeline.

mod codecs;
mod isolation;
mod normalize;
mod roundtrip;
