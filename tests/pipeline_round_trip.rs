//! Integration tests for the full document-question pipeline with mock
//! providers.
//!
//! PDFs are generated inside the tests, pushed through ingestion, chunking,
//! embedding and the session index, and questions are answered with an
//! echoing completion mock so the assembled prompt is visible to asserts.

mod common;

use std::sync::Arc;

use ragshelf::chunking::RecursiveCharacterSplitter;
use ragshelf::config::AppConfig;
use ragshelf::embeddings::MockEmbeddingProvider;
use ragshelf::generation::MockCompletionProvider;
use ragshelf::ingestion::{UploadedPdf, extract_documents};
use ragshelf::service::ShelfService;
use ragshelf::session::SessionContext;

use common::minimal_pdf;

const CITY_PAGES: [&str; 5] = [
    "The Eiffel Tower is located in Paris. It was completed in 1889.",
    "The Colosseum is located in Rome. Gladiators fought there.",
    "Big Ben is located in London. The clock tower rings hourly.",
    "The Brandenburg Gate is located in Berlin. It once marked a border.",
    "The Sagrada Familia is located in Barcelona. It is still unfinished.",
];

fn make_service(config: AppConfig) -> ShelfService {
    ShelfService::builder(config)
        .with_embedder(Arc::new(MockEmbeddingProvider::new()))
        .with_generator(Arc::new(MockCompletionProvider::new()))
        .try_build()
        .unwrap()
}

/// Runs the same extraction and chunking the service runs, so tests can ask
/// questions with the exact text of a known chunk.
async fn expected_chunks(
    config: &AppConfig,
    files: &[UploadedPdf],
) -> Vec<ragshelf::chunking::Chunk> {
    let documents = extract_documents(files).await.unwrap();
    let splitter = RecursiveCharacterSplitter::new(&config.chunking).unwrap();
    splitter.split_documents(&documents)
}

#[tokio::test]
async fn ingest_reports_files_pages_and_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new("ingest", dir.path());
    let service = make_service(AppConfig::default());

    let files = vec![
        UploadedPdf::new("cities-a.pdf", minimal_pdf(&CITY_PAGES[..2])),
        UploadedPdf::new("cities-b.pdf", minimal_pdf(&CITY_PAGES[2..])),
    ];
    let summary = service.index_documents(&session, files).await.unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.pages, 5);
    // Every page is short, so each becomes exactly one chunk.
    assert_eq!(summary.chunks, 5);
    assert!(session.index_db_path.exists());
}

#[tokio::test]
async fn question_pulls_the_matching_chunks_into_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new("ask", dir.path());
    let config = AppConfig::default();
    let service = make_service(config.clone());

    let files = vec![UploadedPdf::new("cities.pdf", minimal_pdf(&CITY_PAGES))];
    let chunks = expected_chunks(&config, &files).await;
    assert_eq!(chunks.len(), 5);

    service
        .index_documents(&session, files)
        .await
        .unwrap();

    // The mock embedder only matches identical text, so ask with the exact
    // content of the Paris chunk.
    let question = chunks[0].content.clone();
    let answer = service.answer(&session, &question).await.unwrap();

    // The echoing generator returns the assembled prompt as the answer.
    assert!(answer.text.starts_with("Answer the question as detailed as possible"));
    assert!(answer.text.contains(&chunks[0].content));
    assert!(answer.text.contains(&format!("Question:\n{question}")));

    // Five chunks are indexed but only the configured top-k come back.
    assert_eq!(answer.sources.len(), config.retrieval.top_k);
    assert_eq!(answer.sources[0].file, "cities.pdf");
    assert_eq!(answer.sources[0].page, 0);
    assert!((answer.sources[0].similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn sources_identify_the_originating_file() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new("multi", dir.path());
    let config = AppConfig::default();
    let service = make_service(config.clone());

    let files = vec![
        UploadedPdf::new("a.pdf", minimal_pdf(&[CITY_PAGES[0]])),
        UploadedPdf::new("b.pdf", minimal_pdf(&[CITY_PAGES[1]])),
    ];
    let chunks = expected_chunks(&config, &files).await;
    let rome = chunks
        .iter()
        .find(|chunk| chunk.source == "b.pdf")
        .unwrap()
        .content
        .clone();

    service.index_documents(&session, files).await.unwrap();
    let answer = service.answer(&session, &rome).await.unwrap();

    assert_eq!(answer.sources[0].file, "b.pdf");
    assert_eq!(answer.sources[0].page, 0);
}

#[tokio::test]
async fn long_pages_split_with_exact_overlap_through_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new("long", dir.path());
    let mut config = AppConfig::default();
    config.chunking.chunk_size = 200;
    config.chunking.chunk_overlap = 40;
    let service = make_service(config.clone());

    let long_text: String = (0..12)
        .map(|i| format!("Sentence number {i} talks about the same topic in a long page."))
        .collect::<Vec<_>>()
        .join("\n");
    let files = vec![UploadedPdf::new("long.pdf", minimal_pdf(&[&long_text]))];

    let chunks = expected_chunks(&config, &files).await;
    assert!(chunks.len() > 1, "page should split into several chunks");

    let summary = service.index_documents(&session, files.clone()).await.unwrap();
    assert_eq!(summary.chunks, chunks.len());

    // Dropping the first `overlap` characters of every later chunk must
    // reproduce the extracted page exactly.
    let documents = extract_documents(&files).await.unwrap();
    let mut reassembled = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            reassembled.push_str(&chunk.content);
        } else {
            reassembled.extend(chunk.content.chars().skip(config.chunking.chunk_overlap));
        }
    }
    assert_eq!(reassembled, documents[0].content);
}

#[tokio::test]
async fn reuploading_rebuilds_the_session_index() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new("rebuild", dir.path());
    let config = AppConfig::default();
    let service = make_service(config.clone());

    let first = vec![UploadedPdf::new("first.pdf", minimal_pdf(&[CITY_PAGES[0]]))];
    let paris = expected_chunks(&config, &first).await[0].content.clone();
    service.index_documents(&session, first).await.unwrap();

    let second = vec![UploadedPdf::new("second.pdf", minimal_pdf(&CITY_PAGES[1..3]))];
    service.index_documents(&session, second).await.unwrap();

    // The Paris chunk is gone; everything retrievable now comes from the
    // second upload.
    let answer = service.answer(&session, &paris).await.unwrap();
    assert!(!answer.sources.is_empty());
    assert!(answer.sources.iter().all(|s| s.file == "second.pdf"));
}

#[tokio::test]
async fn canned_replies_flow_back_with_their_sources() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new("canned", dir.path());
    let config = AppConfig::default();
    let service = ShelfService::builder(config.clone())
        .with_embedder(Arc::new(MockEmbeddingProvider::new()))
        .with_generator(Arc::new(
            MockCompletionProvider::new().with_reply("answer is not available in the context"),
        ))
        .try_build()
        .unwrap();

    let files = vec![UploadedPdf::new("cities.pdf", minimal_pdf(&CITY_PAGES[..2]))];
    let chunks = expected_chunks(&config, &files).await;
    service.index_documents(&session, files).await.unwrap();

    let answer = service.answer(&session, &chunks[1].content).await.unwrap();
    assert_eq!(answer.text, "answer is not available in the context");
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0].page, 1);
}
