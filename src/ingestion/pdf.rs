//! PDF staging and page-level text extraction.

use std::path::Path;

use tokio::fs;

use crate::types::RagError;

/// One uploaded file: the client-supplied name plus the raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedPdf {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// One extracted page of text with its origin.
///
/// Pages are numbered from zero within their source file. A page without
/// extractable text yields an empty `content`; downstream chunking drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub source: String,
    pub page: usize,
    pub content: String,
}

/// Stages each upload in a private temporary directory, extracts text page
/// by page, and returns the pages of all files in upload order. Page text is
/// trimmed of surrounding whitespace.
///
/// The staging directory is deleted when this function returns, success or
/// not. The first file that cannot be written or parsed aborts the batch;
/// nothing extracted so far is returned.
pub async fn extract_documents(files: &[UploadedPdf]) -> Result<Vec<PageDocument>, RagError> {
    let staging = tempfile::tempdir()?;
    let mut documents = Vec::new();

    for file in files {
        let staged = staging.path().join(sanitize_file_name(&file.file_name));
        fs::write(&staged, &file.bytes).await?;

        let pages = extract_pages(&staged, &file.file_name).await?;
        tracing::debug!(file = %file.file_name, pages = pages.len(), "extracted pdf");
        documents.extend(
            pages
                .into_iter()
                .enumerate()
                .map(|(page, content)| PageDocument {
                    source: file.file_name.clone(),
                    page,
                    content: content.trim().to_string(),
                }),
        );
    }

    Ok(documents)
}

async fn extract_pages(staged: &Path, original_name: &str) -> Result<Vec<String>, RagError> {
    let path = staged.to_path_buf();
    let file = original_name.to_string();
    // pdf parsing is CPU-bound and must not block the runtime.
    let outcome =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&path)).await;
    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(err)) => Err(RagError::PdfExtraction {
            file,
            reason: err.to_string(),
        }),
        Err(err) => Err(RagError::PdfExtraction {
            file,
            reason: format!("extraction task aborted: {err}"),
        }),
    }
}

/// Keeps staged names filesystem-safe regardless of what the client sent.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostile_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("report v2.pdf"), "report_v2.pdf");
        assert_eq!(sanitize_file_name(""), "upload.pdf");
    }

    #[tokio::test]
    async fn unparsable_bytes_abort_the_batch() {
        let files = vec![UploadedPdf::new("broken.pdf", b"not a pdf".to_vec())];
        let err = extract_documents(&files).await.unwrap_err();
        assert!(
            matches!(err, RagError::PdfExtraction { ref file, .. } if file == "broken.pdf"),
            "expected PdfExtraction for broken.pdf, got {err:?}"
        );
    }

    #[tokio::test]
    async fn empty_batch_extracts_nothing() {
        let documents = extract_documents(&[]).await.unwrap();
        assert!(documents.is_empty());
    }
}
