//! Configuration types for the SOW wizard service.
//!
//! Every knob lives in [`AppConfig`], built via [`AppConfigBuilder`]. The
//! binary maps its clap arguments (each backed by an environment variable)
//! onto the builder; tests construct configs directly.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SowError;

/// Configuration for the SOW wizard service.
///
/// # Example
/// ```rust
/// use sow_wizard::AppConfig;
///
/// let config = AppConfig::builder()
///     .documents_root("/srv/sow/docs")
///     .allowed_extensions(["pptx", "docx"])
///     .max_upload_mb(25)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_upload_bytes(), 25 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct AppConfig {
    /// Root of the document tree. Relative paths resolve against the current
    /// directory. Default: `./docs`.
    pub documents_root: PathBuf,

    /// Proposal uploads. Default: `input`.
    pub input_folder: String,

    /// DOCX files written by SOW generation. Default: `generated_sows`.
    pub generated_sows_folder: String,

    /// PDFs produced by conversion. Default: `converted_to_pdf`.
    pub converted_pdf_folder: String,

    /// Reserved for DOCX re-exports. Default: `converted_to_docx`.
    pub converted_docx_folder: String,

    /// Staging area for converter output. Default: `temp`.
    pub temp_folder: String,

    /// Lower-case extensions (no dot) accepted by upload and listing.
    /// Default: `["pptx"]`.
    pub allowed_extensions: Vec<String>,

    /// Upload size cap in MiB. Default: 50.
    pub max_upload_mb: u64,

    /// External SOW generation endpoint. Generation is refused when unset.
    pub sow_api_endpoint: Option<String>,

    /// Bearer token for the SOW API.
    pub sow_api_key: Option<String>,

    /// SOW API timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Per-conversion process timeout in seconds. Default: 30.
    pub conversion_timeout_secs: u64,

    /// Pin LibreOffice to this binary instead of detecting it.
    pub libreoffice_path: Option<PathBuf>,

    /// Pin Chromium to this binary instead of detecting it.
    pub chromium_path: Option<PathBuf>,

    /// Print through headless Chromium when LibreOffice is missing. Default: true.
    pub chrome_fallback: bool,

    /// HTTP listen address. Default: `127.0.0.1:3000`.
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            documents_root: PathBuf::from("./docs"),
            input_folder: "input".into(),
            generated_sows_folder: "generated_sows".into(),
            converted_pdf_folder: "converted_to_pdf".into(),
            converted_docx_folder: "converted_to_docx".into(),
            temp_folder: "temp".into(),
            allowed_extensions: vec!["pptx".into()],
            max_upload_mb: 50,
            sow_api_endpoint: None,
            sow_api_key: None,
            api_timeout_secs: 120,
            conversion_timeout_secs: 30,
            libreoffice_path: None,
            chromium_path: None,
            chrome_fallback: true,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("documents_root", &self.documents_root)
            .field("input_folder", &self.input_folder)
            .field("generated_sows_folder", &self.generated_sows_folder)
            .field("converted_pdf_folder", &self.converted_pdf_folder)
            .field("temp_folder", &self.temp_folder)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("max_upload_mb", &self.max_upload_mb)
            .field("sow_api_endpoint", &self.sow_api_endpoint)
            .field("sow_api_key", &self.sow_api_key.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("conversion_timeout_secs", &self.conversion_timeout_secs)
            .field("libreoffice_path", &self.libreoffice_path)
            .field("chromium_path", &self.chromium_path)
            .field("chrome_fallback", &self.chrome_fallback)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl AppConfig {
    /// Create a new builder for `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    /// `true` when `ext` (any case, with or without a dot) is allowed.
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.iter().any(|a| *a == ext)
    }

    /// "PPTX, DOCX" style list for error messages.
    pub fn allowed_extensions_label(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| e.to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Largest accepted `max_upload_mb`; uploads are buffered in memory.
pub const MAX_UPLOAD_MB: u64 = 4096;

/// Builder for [`AppConfig`].
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn documents_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.documents_root = path.into();
        self
    }

    pub fn input_folder(mut self, name: impl Into<String>) -> Self {
        self.config.input_folder = name.into();
        self
    }

    pub fn generated_sows_folder(mut self, name: impl Into<String>) -> Self {
        self.config.generated_sows_folder = name.into();
        self
    }

    pub fn converted_pdf_folder(mut self, name: impl Into<String>) -> Self {
        self.config.converted_pdf_folder = name.into();
        self
    }

    pub fn converted_docx_folder(mut self, name: impl Into<String>) -> Self {
        self.config.converted_docx_folder = name.into();
        self
    }

    pub fn temp_folder(mut self, name: impl Into<String>) -> Self {
        self.config.temp_folder = name.into();
        self
    }

    pub fn allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = exts
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.config.allowed_extensions = parse_extension_list(&joined);
        self
    }

    pub fn max_upload_mb(mut self, mb: u64) -> Self {
        self.config.max_upload_mb = mb;
        self
    }

    pub fn sow_api_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.sow_api_endpoint = Some(url.into());
        self
    }

    pub fn sow_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.sow_api_key = Some(key.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.conversion_timeout_secs = secs;
        self
    }

    pub fn libreoffice_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.libreoffice_path = Some(path.into());
        self
    }

    pub fn chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chromium_path = Some(path.into());
        self
    }

    pub fn chrome_fallback(mut self, v: bool) -> Self {
        self.config.chrome_fallback = v;
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppConfig, SowError> {
        let c = &self.config;
        if c.max_upload_mb == 0 || c.max_upload_mb > MAX_UPLOAD_MB {
            return Err(SowError::InvalidConfig(format!(
                "Maximum upload size must be between 1 and {MAX_UPLOAD_MB} MB"
            )));
        }
        if c.allowed_extensions.is_empty() {
            return Err(SowError::InvalidConfig(
                "At least one allowed file extension is required".into(),
            ));
        }
        if c.conversion_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(SowError::InvalidConfig("Timeouts must be ≥ 1 second".into()));
        }
        for (label, folder) in [
            ("input", &c.input_folder),
            ("generated SOWs", &c.generated_sows_folder),
            ("converted PDF", &c.converted_pdf_folder),
            ("converted DOCX", &c.converted_docx_folder),
            ("temp", &c.temp_folder),
        ] {
            if !is_plain_folder_name(folder) {
                return Err(SowError::InvalidConfig(format!(
                    "The {label} folder must be a single relative directory name, got '{folder}'"
                )));
            }
        }
        if let Some(endpoint) = &c.sow_api_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(SowError::InvalidConfig(format!(
                    "SOW API endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }
        Ok(self.config)
    }
}

fn is_plain_folder_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Parse a comma-separated extension list: trimmed, lower-cased, leading dot
/// stripped, empties and duplicates dropped.
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let ext = part.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

// ── Resolved paths ───────────────────────────────────────────────────────

/// Absolute locations of every folder the service touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub base: PathBuf,
    pub input: PathBuf,
    pub generated_sows: PathBuf,
    pub converted_pdf: PathBuf,
    pub converted_docx: PathBuf,
    pub temp: PathBuf,
}

impl DocumentPaths {
    /// Resolve `config`'s folders; a relative root is joined onto the current
    /// directory.
    pub fn resolve(config: &AppConfig) -> Result<Self, SowError> {
        let base = if config.documents_root.is_absolute() {
            config.documents_root.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| SowError::io("Failed to read current directory", e))?
                .join(&config.documents_root)
        };
        Ok(Self::under(&base, config))
    }

    fn under(base: &Path, config: &AppConfig) -> Self {
        Self {
            base: base.to_path_buf(),
            input: base.join(&config.input_folder),
            generated_sows: base.join(&config.generated_sows_folder),
            converted_pdf: base.join(&config.converted_pdf_folder),
            converted_docx: base.join(&config.converted_docx_folder),
            temp: base.join(&config.temp_folder),
        }
    }

    /// Every directory, base first.
    pub fn all(&self) -> [&Path; 6] {
        [
            &self.base,
            &self.input,
            &self.generated_sows,
            &self.converted_pdf,
            &self.converted_docx,
            &self.temp,
        ]
    }
}
