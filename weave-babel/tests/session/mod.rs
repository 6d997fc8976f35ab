//! Editing session tests
//!
//! A session as the editor drives it: content in, commands applied, content
//! and change events out.

mod editing;
