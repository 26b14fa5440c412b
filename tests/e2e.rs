//! End-to-end tests against real external tools.
//!
//! These need a local LibreOffice (or Chromium) install and, for generation,
//! a reachable SOW API. They are gated behind `E2E_ENABLED` so they do not
//! run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Generation additionally needs `SOW_API_ENDPOINT` (and `SOW_API_KEY` if the
//! service requires one).

mod common;

use std::time::Duration;

use sow_wizard::{
    convert, AppConfig, ContractType, ConverterKind, Converters, DocumentStore,
    NoopProgressCallback, PdfMethod, SowApiClient,
};

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

fn workspace() -> (tempfile::TempDir, AppConfig) {
    let root = tempfile::tempdir().unwrap();
    let config = AppConfig::builder()
        .documents_root(root.path())
        .conversion_timeout_secs(120)
        .build()
        .unwrap();
    (root, config)
}

#[tokio::test]
async fn test_detect_installed_converters() {
    e2e_skip_unless_enabled!();
    let (_root, config) = workspace();
    let converters = Converters::from_config(&config);

    for kind in [ConverterKind::LibreOffice, ConverterKind::Chromium] {
        let info = convert::converter_status(&converters, kind, &NoopProgressCallback)
            .await
            .unwrap();
        println!("{}: available={} path={} version={:?}", kind.display_name(), info.available, info.path, info.version);
        if info.available {
            assert!(!info.path.is_empty());
        }
    }
}

#[tokio::test]
async fn test_real_pdf_conversion() {
    e2e_skip_unless_enabled!();
    let (root, config) = workspace();
    let store = DocumentStore::new(&config).unwrap();
    let converters = Converters::from_config(&config);
    store.write_generated("sample.docx", &common::sample_sow_docx()).await.unwrap();

    let out = match convert::convert_to_pdf(&store, &converters, "sample.docx", &NoopProgressCallback).await {
        Ok(out) => out,
        Err(e) => {
            println!("SKIP: no usable converter ({e})");
            return;
        }
    };
    println!("converted with {:?} -> {} ({} bytes)", out.method.map(PdfMethod::label), out.pdf_path, out.size);

    let pdf = std::fs::read(root.path().join("converted_to_pdf").join(&out.pdf_path)).unwrap();
    assert!(pdf.starts_with(b"%PDF"), "output is not a PDF");
    assert!(!out.already_existed);

    let again = convert::convert_to_pdf(&store, &converters, "sample.docx", &NoopProgressCallback)
        .await
        .unwrap();
    assert!(again.already_existed);
}

#[tokio::test]
async fn test_real_sow_generation() {
    e2e_skip_unless_enabled!();
    let Ok(endpoint) = std::env::var("SOW_API_ENDPOINT") else {
        println!("SKIP: set SOW_API_ENDPOINT to test generation");
        return;
    };
    let key = std::env::var("SOW_API_KEY").ok();

    let (_root, config) = workspace();
    let store = DocumentStore::new(&config).unwrap();
    store.save_upload("proposal.pptx", &common::sample_sow_docx()).await.unwrap();
    let client = SowApiClient::new(&endpoint, key, Duration::from_secs(300)).unwrap();

    let generated = convert::generate_sow(
        &store,
        Some(&client),
        ContractType::FixedPrice,
        &["proposal.pptx".to_string()],
        &NoopProgressCallback,
    )
    .await
    .unwrap();
    println!("generated: {:?} ({:?} bytes)", generated.filename, generated.file_size);
    assert!(generated.filename.is_some() || generated.sow_text.is_some());

    if let Some(name) = generated.filename {
        let md = convert::docx_to_markdown(&store, &name).await.unwrap();
        assert!(!md.markdown.trim().is_empty());
    }
}
