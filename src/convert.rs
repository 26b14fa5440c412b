//! Conversion entry points.
//!
//! Each function here is one user-visible operation: generate a SOW through
//! the external API, turn a generated DOCX into a PDF, or render it as
//! Markdown. The HTTP handlers and the CLI both call these; neither talks to
//! the pipeline stages directly.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use chrono::Utc;
use converter_locate::{install_hints, ConverterInfo, ConverterKind, DetectionCache};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::documents::{validate_file_name, DocumentStore, Folder};
use crate::error::{ConversionMessage, SowError};
use crate::model::{ContractType, GeneratedSow, MarkdownConversion, PdfConversion};
use crate::pipeline::sow_api::{SowApiClient, SowPayload};
use crate::pipeline::{docx, markdown, pdf, pdf::PdfMethod};
use crate::progress::ConversionProgressCallback;

/// The external converters and how to run them.
///
/// Detection results are shared by every request; a failed run invalidates
/// the matching cache so the next request looks again.
#[derive(Debug, Clone)]
pub struct Converters {
    pub libreoffice: Arc<DetectionCache>,
    pub chromium: Arc<DetectionCache>,
    pub chrome_fallback: bool,
    pub timeout: Duration,
}

impl Converters {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            libreoffice: Arc::new(DetectionCache::with_override(
                ConverterKind::LibreOffice,
                config.libreoffice_path.clone(),
            )),
            chromium: Arc::new(DetectionCache::with_override(
                ConverterKind::Chromium,
                config.chromium_path.clone(),
            )),
            chrome_fallback: config.chrome_fallback,
            timeout: config.conversion_timeout(),
        }
    }

    pub fn cache(&self, kind: ConverterKind) -> &Arc<DetectionCache> {
        match kind {
            ConverterKind::LibreOffice => &self.libreoffice,
            ConverterKind::Chromium => &self.chromium,
        }
    }
}

/// Look a converter up, from the cache unless `force` is set.
///
/// Probing runs `--version` on candidate binaries, so it goes to the
/// blocking pool.
async fn detect(
    cache: &Arc<DetectionCache>,
    force: bool,
    progress: &dyn ConversionProgressCallback,
) -> Result<ConverterInfo, SowError> {
    if !force {
        if let Some(info) = cache.cached() {
            return Ok(info);
        }
    }

    let kind = cache.kind();
    info!("Detecting {} installation...", kind.display_name());
    progress.on_detect_start(kind);

    let worker = Arc::clone(cache);
    let info = tokio::task::spawn_blocking(move || {
        if force {
            worker.refresh()
        } else {
            worker.get_or_detect()
        }
    })
    .await
    .map_err(|e| SowError::Internal(format!("Detection task failed: {e}")))?;

    if info.available {
        info!(
            "Using {} at: {} ({})",
            kind.display_name(),
            info.path,
            info.version.as_deref().unwrap_or("unknown version")
        );
    } else {
        warn!("{} not found on system", kind.display_name());
    }
    progress.on_detect_complete(kind, &info);
    Ok(info)
}

/// Fresh detection of `kind`, replacing the cached result.
pub async fn converter_status(
    converters: &Converters,
    kind: ConverterKind,
    progress: &dyn ConversionProgressCallback,
) -> Result<ConverterInfo, SowError> {
    detect(converters.cache(kind), true, progress).await
}

// ── Generate ─────────────────────────────────────────────────────────────────

/// `<base>_<UTC ISO-8601 with ':' and '.' replaced by '-'>.docx`
fn timestamped_docx_name(api_filename: &str) -> String {
    let base = strip_docx_extension(api_filename);
    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    format!("{base}_{stamp}.docx")
}

fn strip_docx_extension(name: &str) -> &str {
    let len = name.len();
    if len >= 5 && name.is_char_boundary(len - 5) && name[len - 5..].eq_ignore_ascii_case(".docx")
    {
        &name[..len - 5]
    } else {
        name
    }
}

/// Ask the external API for a SOW and store the DOCX it returns.
///
/// # Arguments
/// * `client`   : `None` when no endpoint is configured
/// * `documents`: file names in the input folder; each must exist
///
/// # Errors
/// * `InvalidRequest`: no documents
/// * `FileNotFound`  : a selected document is missing
/// * `ApiNotConfigured`, `ApiStatus`, `ApiRequest`, `InvalidApiResponse`
pub async fn generate_sow(
    store: &DocumentStore,
    client: Option<&SowApiClient>,
    contract_type: ContractType,
    documents: &[String],
    progress: &dyn ConversionProgressCallback,
) -> Result<GeneratedSow, SowError> {
    let start = Instant::now();

    // ── Step 1: Validate selection ───────────────────────────────────────
    if documents.is_empty() {
        return Err(SowError::InvalidRequest(
            "Contract type and selected documents are required".to_string(),
        ));
    }
    for name in documents {
        store.resolve_existing(Folder::Input, name).await?;
    }
    let client = client.ok_or(SowError::ApiNotConfigured)?;
    store.ensure_directories().await?;
    info!(
        "Generating SOW: contract type {}, {} document(s)",
        contract_type.label(),
        documents.len()
    );

    // ── Step 2: Call the external API ────────────────────────────────────
    progress.on_api_request_start(client.endpoint(), documents.len());
    let response = client.request_sow(contract_type.id(), documents).await;
    progress.on_api_response(response.is_ok());
    let response = response?;
    let cot_text = response.cot().map(str::to_string);

    let mut generated = GeneratedSow {
        filename: None,
        sow_text: response.sow_text.clone().filter(|t| !t.trim().is_empty()),
        cot_text,
        original_filename: None,
        file_size: 0,
        contract_type,
        documents_count: documents.len(),
        regenerated: false,
    };

    // ── Step 3: Store or locate the document ─────────────────────────────
    match response.payload()? {
        SowPayload::Docx { base64: encoded, filename } => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| {
                    SowError::InvalidApiResponse(format!("docx_content is not valid base64: {e}"))
                })?;
            let original = validate_file_name(filename)
                .map_err(|_| SowError::InvalidApiResponse(format!("unusable filename '{filename}'")))?;
            let name = timestamped_docx_name(original);
            let (path, replaced) = store.write_generated(&name, &bytes).await?;
            info!("Saved DOCX file: {} ({} bytes)", path.display(), bytes.len());

            generated.filename = Some(name);
            generated.original_filename = Some(original.to_string());
            generated.file_size = bytes.len() as u64;
            generated.regenerated = replaced;
        }
        SowPayload::ExistingFile(name) => {
            let path = store.resolve_existing(Folder::GeneratedSows, name).await?;
            let size = tokio::fs::metadata(&path)
                .await
                .map_err(|e| SowError::io(format!("Failed to stat {}", path.display()), e))?
                .len();
            debug!("API referenced existing file {}", path.display());
            generated.filename = Some(name.to_string());
            generated.original_filename = Some(name.to_string());
            generated.file_size = size;
        }
        SowPayload::TextOnly(_) => {
            debug!("API returned text only");
        }
    }

    info!(
        "SOW generated in {}ms{}",
        start.elapsed().as_millis(),
        generated
            .filename
            .as_deref()
            .map(|f| format!(": {f}"))
            .unwrap_or_default()
    );
    Ok(generated)
}

// ── DOCX → PDF ───────────────────────────────────────────────────────────────

/// Convert a generated DOCX into `converted_to_pdf/<stem>.pdf`.
///
/// An existing PDF is returned as is. LibreOffice is preferred; headless
/// Chromium printing the HTML rendition is used only when LibreOffice is
/// missing and the fallback is enabled.
///
/// # Errors
/// * `InvalidFileName`, `FileNotFound`: bad or missing DOCX
/// * `ConverterUnavailable`: no usable converter (carries install hints)
/// * `ConversionFailed`, `ConversionTimeout`, `PdfNotCreated`
pub async fn convert_to_pdf(
    store: &DocumentStore,
    converters: &Converters,
    file_name: &str,
    progress: &dyn ConversionProgressCallback,
) -> Result<PdfConversion, SowError> {
    // ── Step 1: Resolve paths ────────────────────────────────────────────
    let docx_path = store.resolve_existing(Folder::GeneratedSows, file_name).await?;
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let pdf_name = format!("{stem}.pdf");
    let pdf_path = store.path_of(Folder::ConvertedPdf, &pdf_name)?;
    store.ensure_directories().await?;

    // ── Step 2: Reuse an earlier conversion ──────────────────────────────
    if let Ok(meta) = tokio::fs::metadata(&pdf_path).await {
        if meta.is_file() {
            info!("PDF already exists, returning existing file");
            return Ok(PdfConversion {
                pdf_path: pdf_name,
                method: None,
                already_existed: true,
                size: meta.len(),
                converter_path: None,
                converter_version: None,
            });
        }
    }

    // ── Step 3: Find a converter ─────────────────────────────────────────
    let libreoffice = detect(&converters.libreoffice, false, progress).await?;
    let (method, info) = if libreoffice.available {
        (PdfMethod::LibreOffice, libreoffice)
    } else if converters.chrome_fallback {
        let chromium = detect(&converters.chromium, false, progress).await?;
        if !chromium.available {
            return Err(SowError::ConverterUnavailable {
                help: install_hints(ConverterKind::LibreOffice),
            });
        }
        warn!("LibreOffice unavailable, falling back to headless Chrome");
        (PdfMethod::HeadlessChrome, chromium)
    } else {
        return Err(SowError::ConverterUnavailable {
            help: install_hints(ConverterKind::LibreOffice),
        });
    };

    // ── Step 4: Convert ──────────────────────────────────────────────────
    progress.on_conversion_start(method, file_name);
    let temp = store.dir(Folder::Temp);
    let result = match method {
        PdfMethod::LibreOffice => pdf::libreoffice_to_pdf(
            &info.path,
            &docx_path,
            temp,
            store.dir(Folder::ConvertedPdf),
            converters.timeout,
        )
        .await
        .map(|_| ()),
        PdfMethod::HeadlessChrome => {
            print_with_chromium(&info.path, &docx_path, &stem, temp, &pdf_path, converters.timeout)
                .await
        }
    };
    if let Err(e) = result {
        warn!("{} conversion failed: {}", method.label(), e);
        match method {
            PdfMethod::LibreOffice => converters.libreoffice.invalidate(),
            PdfMethod::HeadlessChrome => converters.chromium.invalidate(),
        }
        progress.on_conversion_error(method, &e.to_string());
        return Err(e);
    }

    // ── Step 5: Verify the output ────────────────────────────────────────
    let size = match tokio::fs::metadata(&pdf_path).await {
        Ok(meta) => meta.len(),
        Err(_) => {
            let e = SowError::PdfNotCreated { expected: pdf_path };
            progress.on_conversion_error(method, &e.to_string());
            return Err(e);
        }
    };
    info!("PDF created successfully, size: {size} bytes");
    progress.on_conversion_complete(method, &store.relative_path(&pdf_path));

    Ok(PdfConversion {
        pdf_path: pdf_name,
        method: Some(method),
        already_existed: false,
        size,
        converter_path: Some(info.path),
        converter_version: info.version,
    })
}

async fn print_with_chromium(
    chrome: &str,
    docx_path: &Path,
    title: &str,
    staging_root: &Path,
    target: &Path,
    timeout: Duration,
) -> Result<(), SowError> {
    let bytes = tokio::fs::read(docx_path)
        .await
        .map_err(|e| SowError::io(format!("Failed to read {}", docx_path.display()), e))?;
    let converted = tokio::task::spawn_blocking(move || docx::docx_to_html(&bytes))
        .await
        .map_err(|e| SowError::Internal(format!("DOCX task failed: {e}")))??;
    for m in &converted.messages {
        debug!("DOCX → HTML: {}", m.message);
    }
    let page = pdf::printable_page(title, &converted.html);
    pdf::html_to_pdf_with_chromium(chrome, &page, staging_root, target, timeout).await
}

// ── DOCX → Markdown ──────────────────────────────────────────────────────────

/// Render a generated DOCX as HTML and Markdown.
pub async fn docx_to_markdown(
    store: &DocumentStore,
    file_name: &str,
) -> Result<MarkdownConversion, SowError> {
    let bytes = store.read(Folder::GeneratedSows, file_name).await?;
    let name = file_name.to_string();

    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let converted = docx::docx_to_html(&bytes)?;
        let md = markdown::html_to_markdown(&converted.html);
        let mut messages = converted.messages;
        if md.is_empty() {
            messages.push(ConversionMessage::error("The document contains no text"));
        }
        debug!(
            "Converted {} to Markdown in {}ms ({} bytes, {} messages)",
            name,
            start.elapsed().as_millis(),
            md.len(),
            messages.len()
        );
        Ok(MarkdownConversion {
            markdown: md,
            html: converted.html,
            messages,
        })
    })
    .await
    .map_err(|e| SowError::Internal(format!("DOCX task failed: {e}")))?
}
