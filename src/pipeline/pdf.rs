//! DOCX → PDF through an external converter process.
//!
//! Two back-ends:
//!
//! * [`libreoffice_to_pdf`]: `soffice --headless --convert-to pdf`. The
//!   preferred path; keeps the document's own layout.
//! * [`html_to_pdf_with_chromium`]: prints the HTML from
//!   [`crate::pipeline::docx`] with headless Chromium. Used only when
//!   LibreOffice is missing.
//!
//! Both write into a private staging directory under the temp folder and
//! move the finished PDF into place, so a half-written file is never visible
//! in the output folder. Every child process is bounded by a timeout and
//! killed when the timeout fires.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::SowError;

/// Which back-end produced a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PdfMethod {
    #[serde(rename = "LibreOffice")]
    LibreOffice,
    #[serde(rename = "Headless Chrome")]
    HeadlessChrome,
}

impl PdfMethod {
    pub fn label(self) -> &'static str {
        match self {
            PdfMethod::LibreOffice => "LibreOffice",
            PdfMethod::HeadlessChrome => "Headless Chrome",
        }
    }
}

/// Percent-encoded `file://` URL for a local path.
fn file_url(path: &Path) -> Result<String, SowError> {
    let absolute = std::path::absolute(path)
        .map_err(|e| SowError::io(format!("Failed to resolve {}", path.display()), e))?;
    reqwest::Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| SowError::Internal(format!("No file URL for {}", absolute.display())))
}

async fn staging_dir(staging_root: &Path, prefix: &'static str) -> Result<TempDir, SowError> {
    tokio::fs::create_dir_all(staging_root).await.map_err(|e| {
        SowError::io(format!("Failed to create {}", staging_root.display()), e)
    })?;
    let root = staging_root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&root)
            .map_err(|e| SowError::io(format!("Failed to create staging dir in {}", root.display()), e))
    })
    .await
    .map_err(|e| SowError::Internal(format!("Staging task failed: {e}")))?
}

/// Run `cmd` to completion or kill it after `timeout`.
async fn run_bounded(
    tool: &'static str,
    mut cmd: Command,
    timeout: Duration,
) -> Result<Output, SowError> {
    cmd.kill_on_drop(true)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let start = Instant::now();
    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Err(_) => {
            warn!("{tool} did not finish within {}s; killed", timeout.as_secs());
            return Err(SowError::ConversionTimeout {
                secs: timeout.as_secs(),
            });
        }
        Ok(Err(e)) => {
            return Err(SowError::ConversionFailed {
                tool,
                detail: e.to_string(),
            });
        }
        Ok(Ok(output)) => output,
    };
    debug!(
        "{tool} exited with {} after {}ms",
        output.status,
        start.elapsed().as_millis()
    );

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => format!("exited with {}", output.status),
            msg => msg.chars().take(500).collect(),
        };
        return Err(SowError::ConversionFailed { tool, detail });
    }
    Ok(output)
}

/// Move `from` onto `to`, copying when a rename is not possible.
async fn move_into_place(from: &Path, to: &Path) -> Result<(), SowError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| SowError::io(format!("Failed to write {}", to.display()), e))?;
    let _ = tokio::fs::remove_file(from).await;
    Ok(())
}

// ── LibreOffice ──────────────────────────────────────────────────────────

/// Convert `docx` with LibreOffice; the PDF lands in `out_dir/<stem>.pdf`.
///
/// A fresh user profile is used per run so concurrent conversions do not
/// contend for LibreOffice's profile lock.
pub async fn libreoffice_to_pdf(
    soffice: &str,
    docx: &Path,
    staging_root: &Path,
    out_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf, SowError> {
    let stem = docx
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| SowError::InvalidRequest(format!("No file name in {}", docx.display())))?;
    let pdf_name = format!("{stem}.pdf");
    let target = out_dir.join(&pdf_name);

    let staging = staging_dir(staging_root, "soffice-").await?;
    let profile = staging.path().join("profile");

    let mut cmd = Command::new(soffice);
    cmd.arg("--headless")
        .arg("--norestore")
        .arg(format!("-env:UserInstallation={}", file_url(&profile)?))
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(staging.path())
        .arg(docx);

    info!("Starting LibreOffice conversion of {}", docx.display());
    run_bounded("LibreOffice", cmd, timeout).await?;

    let produced = staging.path().join(&pdf_name);
    if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
        warn!("LibreOffice finished but {} was not created", produced.display());
        return Err(SowError::PdfNotCreated { expected: target });
    }

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| SowError::io(format!("Failed to create {}", out_dir.display()), e))?;
    move_into_place(&produced, &target).await?;
    info!("LibreOffice conversion completed: {}", target.display());
    Ok(target)
}

// ── Headless Chromium ────────────────────────────────────────────────────

/// Wrap converted HTML in a standalone page with print styles.
pub fn printable_page(title: &str, body_html: &str) -> String {
    let title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  @page {{ size: A4; margin: 20mm; }}
  body {{ font-family: "Segoe UI", Arial, sans-serif; font-size: 11pt; line-height: 1.5; color: #222; }}
  h1, h2, h3 {{ color: #111; page-break-after: avoid; }}
  table {{ border-collapse: collapse; width: 100%; margin: 1em 0; }}
  th, td {{ border: 1px solid #999; padding: 4px 8px; text-align: left; vertical-align: top; }}
  th {{ background: #eee; }}
</style>
</head>
<body>
{body_html}
</body>
</html>
"#
    )
}

/// Print `page_html` (a full document, see [`printable_page`]) to `target`.
pub async fn html_to_pdf_with_chromium(
    chrome: &str,
    page_html: &str,
    staging_root: &Path,
    target: &Path,
    timeout: Duration,
) -> Result<(), SowError> {
    let staging = staging_dir(staging_root, "chromium-").await?;
    let page = staging.path().join("page.html");
    let printed = staging.path().join("page.pdf");
    tokio::fs::write(&page, page_html)
        .await
        .map_err(|e| SowError::io(format!("Failed to write {}", page.display()), e))?;

    let mut cmd = Command::new(chrome);
    cmd.arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--no-pdf-header-footer")
        .arg(format!("--user-data-dir={}", staging.path().join("profile").display()))
        .arg(format!("--print-to-pdf={}", printed.display()))
        .arg(file_url(&page)?);

    info!("Printing HTML fallback with headless Chromium");
    run_bounded("Headless Chrome", cmd, timeout).await?;

    if !tokio::fs::try_exists(&printed).await.unwrap_or(false) {
        return Err(SowError::PdfNotCreated {
            expected: target.to_path_buf(),
        });
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SowError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    move_into_place(&printed, target).await
}
