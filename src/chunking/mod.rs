//! Character-window splitting of page documents.
//!
//! One splitter, deterministic for fixed parameters:
//!
//! ```text
//! PageDocument text ──► RecursiveCharacterSplitter ──► bounded Chunk windows
//! ```
//!
//! Windows never exceed the configured size, consecutive windows from one
//! page share exactly the configured overlap, and cut positions prefer
//! natural boundaries over hard cuts.

mod splitter;

pub use splitter::{Chunk, RecursiveCharacterSplitter};
