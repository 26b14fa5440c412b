//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use sow_wizard::{build_router, AppConfig, AppConfigBuilder, AppState};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

// ── DOCX fixtures ────────────────────────────────────────────────────────────

/// A minimal DOCX whose body is `body_xml`.
pub fn docx_with_body(body_xml: &str) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
        ),
        (
            "word/document.xml",
            format!(r#"<?xml version="1.0"?><w:document {W_NS}><w:body>{body_xml}</w:body></w:document>"#),
        ),
    ];
    for (name, body) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A short SOW: a heading, a paragraph with bold text, and a two-row table.
pub fn sample_sow_docx() -> Vec<u8> {
    docx_with_body(
        r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Statement of Work</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Contract: </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Fixed Price</w:t></w:r></w:p>
<w:tbl>
  <w:tr><w:tc><w:p><w:r><w:t>Phase</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Weeks</w:t></w:r></w:p></w:tc></w:tr>
  <w:tr><w:tc><w:p><w:r><w:t>Design</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>3</w:t></w:r></w:p></w:tc></w:tr>
</w:tbl>"#,
    )
}

// ── Fake converters (unix) ───────────────────────────────────────────────────

/// Write an executable shell script.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A `soffice` stand-in: answers `--version` and writes `<outdir>/<stem>.pdf`.
#[cfg(unix)]
pub fn fake_soffice(dir: &Path) -> PathBuf {
    soffice_reporting(dir, "soffice", "LibreOffice 7.6.4.1 (fake)")
}

/// A working `soffice` stand-in named `name` whose `--version` prints `version`.
#[cfg(unix)]
pub fn soffice_reporting(dir: &Path, name: &str, version: &str) -> PathBuf {
    script(
        dir,
        name,
        &format!(
            r#"if [ "$1" = "--version" ]; then echo "{version}"; exit 0; fi
outdir=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--outdir" ]; then outdir="$arg"; fi
  prev="$arg"
  last="$arg"
done
name=$(basename "$last")
printf '%%PDF-1.4 soffice\n' > "$outdir/${{name%.*}}.pdf""#
        ),
    )
}

/// A `soffice` stand-in that identifies itself but always fails to convert.
#[cfg(unix)]
pub fn broken_soffice(dir: &Path) -> PathBuf {
    script(
        dir,
        "soffice-broken",
        r#"if [ "$1" = "--version" ]; then echo "LibreOffice 7.6.4.1 (fake)"; exit 0; fi
echo "source file could not be loaded" >&2
exit 1"#,
    )
}

/// A Chromium stand-in: answers `--version` and honours `--print-to-pdf=`.
#[cfg(unix)]
pub fn fake_chromium(dir: &Path) -> PathBuf {
    script(
        dir,
        "chromium",
        r#"if [ "$1" = "--version" ]; then echo "Chromium 120.0.6099.109"; exit 0; fi
out=""
for arg in "$@"; do
  case "$arg" in --print-to-pdf=*) out="${arg#--print-to-pdf=}";; esac
done
printf '%%PDF-1.4 chromium\n' > "$out""#,
    )
}

// ── App under test ───────────────────────────────────────────────────────────

pub struct TestApp {
    pub addr: SocketAddr,
    pub root: TempDir,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn docs(&self) -> &Path {
        self.root.path()
    }

    /// Place a file directly in a documents subfolder.
    pub fn put(&self, folder: &str, name: &str, bytes: &[u8]) {
        let dir = self.root.path().join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), bytes).unwrap();
    }
}

/// Serve the router on an ephemeral port over a fresh documents root.
///
/// Converter paths default to a location that does not exist so tests never
/// pick up a real installation; override them in `configure`.
pub async fn spawn_app(configure: impl FnOnce(AppConfigBuilder) -> AppConfigBuilder) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("no-such-binary");
    let builder = AppConfig::builder()
        .documents_root(root.path())
        .allowed_extensions(["pptx", "docx"])
        .max_upload_mb(1)
        .conversion_timeout_secs(10)
        .libreoffice_path(&missing)
        .chromium_path(&missing)
        .chrome_fallback(false);
    let config = configure(builder).build().unwrap();

    let state = AppState::new(config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        addr,
        root,
        client: reqwest::Client::new(),
    }
}

// ── Fake SOW API ─────────────────────────────────────────────────────────────

/// What the fake API saw.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub bodies: Vec<Value>,
    pub authorization: Vec<Option<String>>,
}

#[derive(Clone)]
struct FakeApi {
    status: StatusCode,
    reply: Value,
    captured: Arc<Mutex<Captured>>,
}

async fn fake_generate(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    {
        let mut c = api.captured.lock().unwrap();
        c.bodies.push(body);
        c.authorization.push(
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
    }
    (api.status, Json(api.reply.clone()))
}

/// Start a fake SOW API answering every request with `status` and `reply`.
/// Returns its endpoint URL and a handle on captured requests.
pub async fn spawn_sow_api(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Captured>>) {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let api = FakeApi {
        status,
        reply,
        captured: Arc::clone(&captured),
    };
    let app = Router::new()
        .route("/generate_sow", post(fake_generate))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/generate_sow"), captured)
}
