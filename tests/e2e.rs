//! End-to-end tests for invoice2xlsx.
//!
//! These use real invoices in `./test_cases/` and make live model calls.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 OPENAI_API_KEY=sk-... cargo test --test e2e -- --nocapture

use invoice2xlsx::pipeline::input::resolve_input;
use invoice2xlsx::{
    count_pages, extract_path, extract_to_dir, ApiConfig, ExtractionConfig, ResponsesClient, OUTPUT_FILE_NAME,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no sample file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn live_client() -> ResponsesClient {
    let api = ApiConfig::from_env().expect("OPENAI_API_KEY must be set for e2e tests");
    ResponsesClient::new(&api).expect("client")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdf_invoice_to_workbook() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice.pdf"));
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::default();

    let doc = resolve_input(path.to_str().unwrap(), None, config.download_timeout_secs)
        .await
        .unwrap();
    let pages = count_pages(&doc, &config).await.unwrap();

    let saved = extract_to_dir(doc, &live_client(), &config, dir.path())
        .await
        .unwrap();

    println!("{} page(s), stats: {:?}", pages, saved.output.stats);
    for diag in &saved.output.diagnostics {
        println!("diagnostic: {diag}");
    }
    assert_eq!(saved.output.stats.total_pages, pages);
    assert!(!saved.output.is_empty(), "expected at least one line item");
    assert_eq!(saved.path, Some(dir.path().join(OUTPUT_FILE_NAME)));
}

#[tokio::test]
async fn test_receipt_image() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("receipt.jpg"));
    let output = extract_path(path.to_str().unwrap(), None, &live_client(), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(output.stats.total_pages, 1);
    for item in &output.table.items {
        println!("{:?}", item.cells());
    }
    assert!(output.stats.total_input_tokens > 0);
}

#[tokio::test]
async fn test_blank_page_writes_file_only_with_items() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("blank.png"));
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::default();
    let doc = resolve_input(path.to_str().unwrap(), None, config.download_timeout_secs)
        .await
        .unwrap();

    let saved = extract_to_dir(doc, &live_client(), &config, dir.path())
        .await
        .unwrap();

    println!("items: {}", saved.output.table.len());
    assert_eq!(saved.path.is_none(), saved.output.is_empty());
}
