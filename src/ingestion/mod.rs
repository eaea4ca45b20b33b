//! Uploaded-file ingestion.
//!
//! Turns raw PDF uploads into page-level [`PageDocument`] records:
//!
//! ```text
//! UploadedPdf bytes ──► staging TempDir ──► pdf text extraction ──► PageDocument per page
//! ```
//!
//! Staging is private to one ingestion call; the directory is removed when
//! the call returns. A single unwritable or unparsable file aborts the whole
//! batch.

mod pdf;

pub use pdf::{PageDocument, UploadedPdf, extract_documents};
