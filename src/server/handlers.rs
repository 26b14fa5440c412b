//! Route handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use converter_locate::ConverterKind;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::AppState;
use crate::convert;
use crate::documents::Folder;
use crate::error::SowError;
use crate::model::{ContractType, ContractTypeInfo};
use crate::progress::NoopProgressCallback;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Treat an absent or blank parameter as missing.
fn required(value: Option<String>, message: &str) -> Result<String, SowError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SowError::InvalidRequest(message.to_string()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, SowError> {
    body.map(|Json(v)| v)
        .map_err(|e| SowError::InvalidRequest(format!("Invalid request body: {}", e.body_text())))
}

pub async fn healthz() -> &'static str {
    "ok"
}

// ── Files ────────────────────────────────────────────────────────────────────

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, SowError> {
    let mut multipart = multipart.map_err(|_| SowError::InvalidRequest("No file received".into()))?;
    let too_large = || SowError::FileTooLarge {
        limit_mb: state.config.max_upload_mb,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => return Err(too_large()),
            Err(e) => return Err(SowError::InvalidRequest(e.body_text())),
        };
        if field.name() != Some("file") {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large()
            } else {
                SowError::InvalidRequest(e.body_text())
            }
        })?;

        let file = state.store.save_upload(&file_name, &bytes).await?;
        return Ok(Json(json!({
            "success": true,
            "message": "File uploaded successfully",
            "file": file,
        })));
    }

    Err(SowError::InvalidRequest("No file received".into()))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub filename: Option<String>,
}

pub async fn delete_file(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, SowError> {
    let name = required(params.filename, "Filename is required")?;
    state.store.delete_input(&name).await?;
    Ok(Json(json!({
        "success": true,
        "message": "File deleted successfully",
    })))
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<Value>, SowError> {
    let files = state.store.list_inputs().await?;
    Ok(Json(json!({ "files": files })))
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub file: Option<String>,
}

fn binary_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    disposition: &str,
    name: &str,
) -> Response {
    let name = name.replace('"', "");
    let disposition = HeaderValue::from_str(&format!("{disposition}; filename=\"{name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

pub async fn serve_pdf(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> Result<Response, SowError> {
    let name = required(params.file, "File name is required")?;
    let bytes = state.store.read(Folder::ConvertedPdf, &name).await?;
    debug!("Serving PDF {name} ({} bytes)", bytes.len());
    Ok(binary_response(bytes, "application/pdf", "inline", &name))
}

pub async fn download_docx(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> Result<Response, SowError> {
    let name = required(params.file, "File name is required")?;
    let bytes = state.store.read(Folder::GeneratedSows, &name).await?;
    let mut resp = binary_response(bytes, DOCX_CONTENT_TYPE, "attachment", &name);
    resp.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(resp)
}

// ── Generation & conversion ──────────────────────────────────────────────────

/// A selected document: a bare file name or a `FileData` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DocumentRef {
    Name(String),
    File { name: String },
}

impl DocumentRef {
    fn into_name(self) -> String {
        match self {
            DocumentRef::Name(name) | DocumentRef::File { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contract_type: Option<String>,
    #[serde(default)]
    pub selected_documents: Vec<DocumentRef>,
}

pub async fn generate_sow(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Value>, SowError> {
    let req = json_body(body)?;
    let contract: ContractType = required(
        req.contract_type,
        "Contract type and selected documents are required",
    )?
    .parse()?;
    let documents: Vec<String> = req
        .selected_documents
        .into_iter()
        .map(DocumentRef::into_name)
        .collect();

    let generated = convert::generate_sow(
        &state.store,
        state.api.as_deref(),
        contract,
        &documents,
        &NoopProgressCallback,
    )
    .await?;

    let message = match (&generated.filename, generated.regenerated) {
        (Some(_), true) => "SOW generated successfully (regenerated)",
        (Some(_), false) => "SOW generated successfully",
        (None, _) => "SOW text generated successfully",
    };
    info!("{message}");

    Ok(Json(json!({
        "success": true,
        "filename": generated.filename,
        "sowText": generated.sow_text,
        "cotText": generated.cot_text,
        "message": message,
        "debug": {
            "originalFilename": generated.original_filename,
            "generatedFilename": generated.filename,
            "fileSize": generated.file_size,
            "contractType": generated.contract_type,
            "documentsCount": generated.documents_count,
            "regenerated": generated.regenerated,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePathRequest {
    pub file_path: Option<String>,
}

pub async fn convert_to_pdf(
    State(state): State<AppState>,
    body: Result<Json<FilePathRequest>, JsonRejection>,
) -> Result<Json<Value>, SowError> {
    let name = required(json_body(body)?.file_path, "File path is required")?;
    let out = convert::convert_to_pdf(
        &state.store,
        &state.converters,
        &name,
        &NoopProgressCallback,
    )
    .await?;

    let message = match out.method {
        Some(method) if !out.already_existed => {
            format!("PDF converted successfully with {}", method.label())
        }
        _ => "PDF already exists".to_string(),
    };

    Ok(Json(json!({
        "success": true,
        "pdfPath": out.pdf_path,
        "message": message,
        "debug": {
            "pdfSize": out.size,
            "method": out.method,
            "alreadyExisted": out.already_existed,
            "converterPath": out.converter_path,
            "version": out.converter_version,
        },
    })))
}

pub async fn process_docx(
    State(state): State<AppState>,
    body: Result<Json<FilePathRequest>, JsonRejection>,
) -> Result<Json<Value>, SowError> {
    let name = required(json_body(body)?.file_path, "File path is required")?;
    let out = convert::docx_to_markdown(&state.store, &name).await?;
    Ok(Json(json!({
        "success": true,
        "markdown": out.markdown,
        "html": out.html,
        "messages": out.messages,
    })))
}

// ── Status ───────────────────────────────────────────────────────────────────

/// `process.platform`-style name for the host OS.
fn platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

pub async fn libreoffice_status(State(state): State<AppState>) -> Result<Json<Value>, SowError> {
    let info = convert::converter_status(
        &state.converters,
        ConverterKind::LibreOffice,
        &NoopProgressCallback,
    )
    .await?;
    let message = if info.available {
        "LibreOffice is available and ready"
    } else {
        "LibreOffice is not available"
    };
    Ok(Json(json!({
        "success": true,
        "libreOffice": info,
        "platform": platform(),
        "message": message,
    })))
}

pub async fn contract_types() -> Json<Value> {
    let types: Vec<ContractTypeInfo> = ContractType::ALL.into_iter().map(Into::into).collect();
    Json(json!({ "contractTypes": types }))
}
