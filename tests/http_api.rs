//! HTTP API tests against a live router on an ephemeral port.

mod common;

use axum::http::StatusCode;
use base64::Engine;
use common::{sample_sow_docx, spawn_app, spawn_sow_api};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

fn upload_form(name: &str, bytes: Vec<u8>) -> Form {
    Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()))
}

async fn json_of(resp: reqwest::Response) -> Value {
    resp.json().await.unwrap()
}

// ── Health & metadata ────────────────────────────────────────────────────────

#[tokio::test]
async fn healthz_answers_ok() {
    let app = spawn_app(|b| b).await;
    let resp = app.client.get(app.url("/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = spawn_app(|b| b).await;

    let resp = app
        .client
        .get(app.url("/healthz"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-42");

    let resp = app.client.get(app.url("/healthz")).send().await.unwrap();
    let generated = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(generated.starts_with("req-"), "got {generated}");
}

#[tokio::test]
async fn contract_types_lists_three_models() {
    let app = spawn_app(|b| b).await;
    let body = json_of(app.client.get(app.url("/api/contract-types")).send().await.unwrap()).await;
    let types = body["contractTypes"].as_array().unwrap();
    let ids: Vec<&str> = types.iter().map(|t| t["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["fixed-price", "time-and-materials", "staff-augmentation"]);
    assert!(types.iter().all(|t| t["label"].is_string() && t["description"].is_string()));
}

#[tokio::test]
async fn libreoffice_status_reports_missing_converter() {
    let app = spawn_app(|b| b).await;
    let resp = app
        .client
        .get(app.url("/api/libreoffice-status"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["libreOffice"]["available"], false);
    assert_eq!(body["message"], "LibreOffice is not available");
    assert!(body["platform"].is_string());
}

// ── Upload / list / delete ───────────────────────────────────────────────────

#[tokio::test]
async fn upload_stores_file_and_lists_it() {
    let app = spawn_app(|b| b).await;
    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(upload_form("proposal.pptx", vec![7u8; 2048]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["file"]["name"], "proposal.pptx");
    assert_eq!(body["file"]["path"], "/input/proposal.pptx");
    assert_eq!(body["file"]["size"], "2 KB");
    assert_eq!(body["file"]["type"], "presentation");
    assert!(app.docs().join("input/proposal.pptx").is_file());

    let body = json_of(app.client.get(app.url("/api/files")).send().await.unwrap()).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "proposal.pptx");
}

#[tokio::test]
async fn duplicate_upload_gets_numbered_name() {
    let app = spawn_app(|b| b).await;
    for _ in 0..2 {
        app.client
            .post(app.url("/api/upload"))
            .multipart(upload_form("deck.pptx", b"one".to_vec()))
            .send()
            .await
            .unwrap();
    }
    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(upload_form("deck.pptx", b"three".to_vec()))
        .send()
        .await
        .unwrap();
    let body = json_of(resp).await;
    assert_eq!(body["file"]["name"], "deck_2.pptx");
    assert!(app.docs().join("input/deck_1.pptx").is_file());
}

#[tokio::test]
async fn concurrent_uploads_of_one_name_never_collide() {
    let app = spawn_app(|b| b).await;
    let uploads = (0..8u8).map(|i| {
        app.client
            .post(app.url("/api/upload"))
            .multipart(upload_form("deck.pptx", vec![i; 16]))
            .send()
    });
    let responses = futures::future::join_all(uploads).await;

    let mut names = std::collections::BTreeSet::new();
    for resp in responses {
        let resp = resp.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_of(resp).await;
        names.insert(body["file"]["name"].as_str().unwrap().to_string());
    }
    assert_eq!(names.len(), 8);
    assert!(names.contains("deck.pptx"));

    let stored = std::fs::read_dir(app.docs().join("input")).unwrap().count();
    assert_eq!(stored, 8);
    for name in &names {
        let bytes = std::fs::read(app.docs().join("input").join(name)).unwrap();
        assert_eq!(bytes.len(), 16);
        assert!(bytes.iter().all(|b| *b == bytes[0]));
    }
}

#[tokio::test]
async fn upload_rejects_disallowed_extension() {
    let app = spawn_app(|b| b).await;
    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(upload_form("notes.txt", b"hello".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Only PPTX, DOCX files are allowed");
    assert!(!app.docs().join("input/notes.txt").exists());
}

#[tokio::test]
async fn upload_rejects_oversized_file() {
    let app = spawn_app(|b| b).await;
    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(upload_form("big.pptx", vec![0u8; 1024 * 1024 + 10]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["message"], "File size exceeds the maximum limit of 1 MB");
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let app = spawn_app(|b| b).await;
    let form = Form::new().text("comment", "nothing attached");
    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["message"], "No file received");
}

#[tokio::test]
async fn delete_requires_name_and_existing_file() {
    let app = spawn_app(|b| b).await;

    let resp = app.client.delete(app.url("/api/delete")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["message"], "Filename is required");

    let resp = app
        .client
        .delete(app.url("/api/delete?filename=ghost.pptx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    app.put("input", "old.pptx", b"x");
    let resp = app
        .client
        .delete(app.url("/api/delete?filename=old.pptx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_of(resp).await["message"], "File deleted successfully");
    assert!(!app.docs().join("input/old.pptx").exists());
}

#[tokio::test]
async fn traversal_names_are_rejected() {
    let app = spawn_app(|b| b).await;
    app.put("", "secret.pptx", b"x");

    let resp = app
        .client
        .delete(app.url("/api/delete?filename=..%2Fsecret.pptx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["message"], "Invalid file path");
    assert!(app.docs().join("secret.pptx").exists());

    let resp = app
        .client
        .get(app.url("/api/download-docx?file=..%2F..%2Fetc%2Fpasswd"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Serving generated files ──────────────────────────────────────────────────

#[tokio::test]
async fn pdf_is_served_inline() {
    let app = spawn_app(|b| b).await;
    app.put("converted_to_pdf", "sow.pdf", b"%PDF-1.4 test");

    let resp = app.client.get(app.url("/api/pdf?file=sow.pdf")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(
        resp.headers()["content-disposition"],
        "inline; filename=\"sow.pdf\""
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4 test");

    let resp = app.client.get(app.url("/api/pdf")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["message"], "File name is required");
}

#[tokio::test]
async fn docx_download_is_an_uncached_attachment() {
    let app = spawn_app(|b| b).await;
    app.put("generated_sows", "sow.docx", b"PK fake");

    let resp = app
        .client
        .get(app.url("/api/download-docx?file=sow.docx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"sow.docx\""
    );
    assert_eq!(resp.headers()["cache-control"], "no-cache");

    let resp = app
        .client
        .get(app.url("/api/download-docx?file=missing.docx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── SOW generation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_stores_docx_from_api() {
    let docx = sample_sow_docx();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&docx);
    let (endpoint, captured) = spawn_sow_api(
        StatusCode::OK,
        json!({
            "docx_content": encoded,
            "filename": "SOW_Acme.docx",
            "sow_text": "Statement of Work for Acme",
            "cot_text": "reasoning",
        }),
    )
    .await;
    let app = spawn_app(|b| b.sow_api_endpoint(endpoint).sow_api_key("k-123")).await;
    app.put("input", "acme.pptx", b"deck");

    let resp = app
        .client
        .post(app.url("/api/generate-sow"))
        .json(&json!({
            "contractType": "fixed-price",
            "selectedDocuments": [{ "name": "acme.pptx", "path": "/input/acme.pptx" }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "SOW generated successfully");
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("SOW_Acme_") && filename.ends_with("Z.docx"), "{filename}");
    assert_eq!(body["debug"]["originalFilename"], "SOW_Acme.docx");
    assert_eq!(body["sowText"], "Statement of Work for Acme");
    assert_eq!(body["cotText"], "reasoning");
    assert_eq!(body["debug"]["documentsCount"], 1);
    assert_eq!(body["debug"]["regenerated"], false);

    let stored = std::fs::read(app.docs().join("generated_sows").join(filename)).unwrap();
    assert_eq!(stored, docx);

    let seen = captured.lock().unwrap().clone();
    assert_eq!(
        seen.bodies,
        vec![json!({ "contract_type": "fixed-price", "filenames": ["acme.pptx"] })]
    );
    assert_eq!(seen.authorization, vec![Some("Bearer k-123".to_string())]);
}

#[tokio::test]
async fn generate_can_reference_existing_sow_file() {
    let (endpoint, _) =
        spawn_sow_api(StatusCode::OK, json!({ "sow_file": "prepared.docx" })).await;
    let app = spawn_app(|b| b.sow_api_endpoint(endpoint)).await;
    app.put("input", "acme.pptx", b"deck");
    app.put("generated_sows", "prepared.docx", b"PK prepared");

    let body = json_of(
        app.client
            .post(app.url("/api/generate-sow"))
            .json(&json!({ "contractType": "Fixed Price", "selectedDocuments": ["acme.pptx"] }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "SOW generated successfully");
    assert_eq!(body["filename"], "prepared.docx");
    assert_eq!(body["debug"]["fileSize"], 11);
}

#[tokio::test]
async fn generate_with_text_only_response() {
    let (endpoint, captured) =
        spawn_sow_api(StatusCode::OK, json!({ "sow_text": "Plain SOW text" })).await;
    let app = spawn_app(|b| b.sow_api_endpoint(endpoint)).await;
    app.put("input", "a.pptx", b"a");

    let body = json_of(
        app.client
            .post(app.url("/api/generate-sow"))
            .json(&json!({ "contractType": "staff-augmentation", "selectedDocuments": ["a.pptx"] }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "SOW text generated successfully");
    assert_eq!(body["sowText"], "Plain SOW text");
    assert!(body["filename"].is_null());
    assert_eq!(captured.lock().unwrap().authorization, vec![None]);
}

#[tokio::test]
async fn upstream_error_status_passes_through() {
    let (endpoint, _) = spawn_sow_api(
        StatusCode::UNAUTHORIZED,
        json!({ "detail": "Invalid or missing API Key" }),
    )
    .await;
    let app = spawn_app(|b| b.sow_api_endpoint(endpoint)).await;
    app.put("input", "a.pptx", b"a");

    let resp = app
        .client
        .post(app.url("/api/generate-sow"))
        .json(&json!({ "contractType": "fixed-price", "selectedDocuments": ["a.pptx"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = json_of(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "API Error: 401 Unauthorized");
    assert!(body["details"].as_str().unwrap().contains("Invalid or missing API Key"));
}

#[tokio::test]
async fn unusable_api_body_is_reported() {
    let (endpoint, _) = spawn_sow_api(StatusCode::OK, json!({ "status": "queued" })).await;
    let app = spawn_app(|b| b.sow_api_endpoint(endpoint)).await;
    app.put("input", "a.pptx", b"a");

    let resp = app
        .client
        .post(app.url("/api/generate-sow"))
        .json(&json!({ "contractType": "fixed-price", "selectedDocuments": ["a.pptx"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_of(resp).await["message"],
        "Invalid API response: missing docx_content or filename"
    );
}

#[tokio::test]
async fn generate_validates_request() {
    let app = spawn_app(|b| b).await;
    app.put("input", "a.pptx", b"a");

    let cases = [
        (
            json!({ "selectedDocuments": ["a.pptx"] }),
            StatusCode::BAD_REQUEST,
            "Contract type and selected documents are required",
        ),
        (
            json!({ "contractType": "fixed-price", "selectedDocuments": [] }),
            StatusCode::BAD_REQUEST,
            "Contract type and selected documents are required",
        ),
        (
            json!({ "contractType": "barter", "selectedDocuments": ["a.pptx"] }),
            StatusCode::BAD_REQUEST,
            "Unknown contract type: 'barter'",
        ),
        (
            json!({ "contractType": "fixed-price", "selectedDocuments": ["gone.pptx"] }),
            StatusCode::NOT_FOUND,
            "File not found: gone.pptx",
        ),
        (
            json!({ "contractType": "fixed-price", "selectedDocuments": ["a.pptx"] }),
            StatusCode::INTERNAL_SERVER_ERROR,
            "SOW API endpoint not configured",
        ),
    ];
    for (request, status, message) in cases {
        let resp = app
            .client
            .post(app.url("/api/generate-sow"))
            .json(&request)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), status, "{request}");
        assert_eq!(json_of(resp).await["message"], message, "{request}");
    }
}

// ── Markdown preview ─────────────────────────────────────────────────────────

#[tokio::test]
async fn process_docx_returns_markdown_and_html() {
    let app = spawn_app(|b| b).await;
    app.put("generated_sows", "sow.docx", &sample_sow_docx());

    let resp = app
        .client
        .post(app.url("/api/process-docx"))
        .json(&json!({ "filePath": "sow.docx" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["success"], true);
    let markdown = body["markdown"].as_str().unwrap();
    assert!(markdown.contains("# Statement of Work"), "{markdown}");
    assert!(markdown.contains("**Fixed Price**"), "{markdown}");
    assert!(markdown.contains("| Design | 3 |"), "{markdown}");
    assert!(body["html"].as_str().unwrap().contains("<h1>"));
    assert!(body["messages"].is_array());
}

#[tokio::test]
async fn process_docx_requires_path_and_file() {
    let app = spawn_app(|b| b).await;

    let resp = app
        .client
        .post(app.url("/api/process-docx"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["message"], "File path is required");

    let resp = app
        .client
        .post(app.url("/api/process-docx"))
        .json(&json!({ "filePath": "missing.docx" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── PDF conversion ───────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_without_converter_returns_install_help() {
    let app = spawn_app(|b| b).await;
    app.put("generated_sows", "sow.docx", &sample_sow_docx());

    let resp = app
        .client
        .post(app.url("/api/convert-to-pdf"))
        .json(&json!({ "filePath": "sow.docx" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_of(resp).await;
    assert_eq!(body["message"], "LibreOffice is not installed or not found");
    assert_eq!(body["error"], "LibreOffice not available");
    assert!(body["help"]["linux"].is_string());
}

#[cfg(unix)]
#[tokio::test]
async fn convert_with_libreoffice_then_reuse() {
    let bin = tempfile::tempdir().unwrap();
    let soffice = common::fake_soffice(bin.path());
    let app = spawn_app(|b| b.libreoffice_path(&soffice)).await;
    app.put("generated_sows", "sow.docx", &sample_sow_docx());
    let request = json!({ "filePath": "sow.docx" });

    let resp = app
        .client
        .post(app.url("/api/convert-to-pdf"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["pdfPath"], "sow.pdf");
    assert_eq!(body["message"], "PDF converted successfully with LibreOffice");
    assert_eq!(body["debug"]["method"], "LibreOffice");
    assert_eq!(body["debug"]["alreadyExisted"], false);
    assert!(app.docs().join("converted_to_pdf/sow.pdf").is_file());

    let body = json_of(
        app.client
            .post(app.url("/api/convert-to-pdf"))
            .json(&request)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["message"], "PDF already exists");
    assert_eq!(body["debug"]["alreadyExisted"], true);

    let resp = app.client.get(app.url("/api/pdf?file=sow.pdf")).send().await.unwrap();
    assert!(resp.bytes().await.unwrap().starts_with(b"%PDF"));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_libreoffice_surfaces_conversion_error() {
    let bin = tempfile::tempdir().unwrap();
    let soffice = common::broken_soffice(bin.path());
    let app = spawn_app(|b| b.libreoffice_path(&soffice)).await;
    app.put("generated_sows", "sow.docx", &sample_sow_docx());

    let resp = app
        .client
        .post(app.url("/api/convert-to-pdf"))
        .json(&json!({ "filePath": "sow.docx" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_of(resp).await;
    assert_eq!(body["message"], "Error executing LibreOffice conversion");
    assert!(body["error"].is_string());
    assert!(!app.docs().join("converted_to_pdf/sow.pdf").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn failed_conversion_forces_fresh_detection() {
    let bin = tempfile::tempdir().unwrap();
    let soffice = common::broken_soffice(bin.path());
    let app = spawn_app(|b| b.libreoffice_path(&soffice)).await;
    app.put("generated_sows", "sow.docx", &sample_sow_docx());
    let request = json!({ "filePath": "sow.docx" });

    let resp = app
        .client
        .post(app.url("/api/convert-to-pdf"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Swap in a working binary at the same path with a different version.
    let replacement = common::soffice_reporting(bin.path(), "soffice-next", "LibreOffice 24.2.0 (fake)");
    std::fs::rename(&replacement, &soffice).unwrap();

    let resp = app
        .client
        .post(app.url("/api/convert-to-pdf"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["debug"]["method"], "LibreOffice");
    assert_eq!(body["debug"]["version"], "LibreOffice 24.2.0 (fake)");
    assert!(app.docs().join("converted_to_pdf/sow.pdf").is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn falls_back_to_chromium_when_libreoffice_missing() {
    let bin = tempfile::tempdir().unwrap();
    let chromium = common::fake_chromium(bin.path());
    let app = spawn_app(|b| b.chromium_path(&chromium).chrome_fallback(true)).await;
    app.put("generated_sows", "sow.docx", &sample_sow_docx());

    let resp = app
        .client
        .post(app.url("/api/convert-to-pdf"))
        .json(&json!({ "filePath": "sow.docx" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["message"], "PDF converted successfully with Headless Chrome");
    assert_eq!(body["debug"]["method"], "Headless Chrome");
    assert!(app.docs().join("converted_to_pdf/sow.pdf").is_file());
}
