//! # converter-locate
//!
//! Find the document converters a SOW pipeline shells out to on macOS, Linux
//! and Windows, and remember the answer. LibreOffice (`soffice`) handles
//! DOCX → PDF; a headless Chromium handles the HTML → PDF fallback.
//!
//! ## How it works
//!
//! [`detect`] walks a fixed resolution order and stops at the first binary
//! whose `--version` output names the expected product:
//!
//! 1. The environment override (`LIBREOFFICE_PATH` / `CHROMIUM_PATH`).
//! 2. Well-known command names on `PATH` (`libreoffice`, `soffice`, …).
//! 3. Platform-specific install locations.
//!
//! Running a binary is the only reliable availability check: a stale symlink
//! or a half-removed install passes an existence test and then fails on every
//! conversion.
//!
//! [`DetectionCache`] wraps detection in a lazily-filled slot. Callers read it
//! on every request and [`DetectionCache::invalidate`] it when the cached
//! binary fails to execute, so the next request re-detects.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use converter_locate::{ConverterKind, DetectionCache};
//!
//! let cache = DetectionCache::new(ConverterKind::LibreOffice);
//! let info = cache.get_or_detect();
//! if info.available {
//!     println!("using {} ({})", info.path, info.version.unwrap_or_default());
//! }
//! ```
//!
//! All functions here are blocking (they spawn `--version` probes). Call them
//! from `spawn_blocking` inside async code.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::RwLock;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned when probing a specific binary.
#[derive(Error, Debug)]
pub enum LocateError {
    /// Nothing exists at the given path.
    #[error("{kind} binary not found at '{path}'")]
    NotFound { kind: &'static str, path: PathBuf },

    /// The binary exists but could not be executed.
    #[error("Failed to execute '{path}': {reason}")]
    NotRunnable { path: PathBuf, reason: String },

    /// The binary ran but does not identify itself as the expected product.
    #[error("'{path}' does not look like {kind} (--version printed {output:?})")]
    UnexpectedVersion {
        kind: &'static str,
        path: PathBuf,
        output: String,
    },

    /// `--version` did not finish in time; the process was killed.
    #[error("'{path}' did not answer --version within {secs}s")]
    TimedOut { path: PathBuf, secs: u64 },
}

/// Upper bound on a `--version` probe. A cold LibreOffice start can take a
/// few seconds; a hung one must not pin a blocking worker.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

const PROBE_POLL: Duration = Duration::from_millis(50);

// ── Converter kinds ──────────────────────────────────────────────────────────

/// The external converters the pipeline knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// LibreOffice headless (`soffice --convert-to pdf`).
    LibreOffice,
    /// Chromium / Chrome / Edge headless (`--print-to-pdf`).
    Chromium,
}

impl ConverterKind {
    /// Human-readable product name.
    pub fn display_name(self) -> &'static str {
        match self {
            ConverterKind::LibreOffice => "LibreOffice",
            ConverterKind::Chromium => "Chromium",
        }
    }

    /// Environment variable that points at an explicit binary.
    pub fn env_var(self) -> &'static str {
        match self {
            ConverterKind::LibreOffice => "LIBREOFFICE_PATH",
            ConverterKind::Chromium => "CHROMIUM_PATH",
        }
    }

    fn path_commands(self) -> &'static [&'static str] {
        match self {
            ConverterKind::LibreOffice => &["libreoffice", "soffice"],
            ConverterKind::Chromium => &[
                "chromium",
                "chromium-browser",
                "google-chrome",
                "google-chrome-stable",
            ],
        }
    }

    fn matches_version(self, output: &str) -> bool {
        match self {
            ConverterKind::LibreOffice => output.contains("LibreOffice"),
            ConverterKind::Chromium => {
                output.contains("Chrom") || output.contains("Microsoft Edge")
            }
        }
    }
}

// ── Detection result ─────────────────────────────────────────────────────────

/// Result of a detection run.
///
/// `path` is either an absolute path or a bare command name resolved through
/// `PATH`; either form can be handed straight to `Command::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterInfo {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub available: bool,
}

impl ConverterInfo {
    /// The "nothing found" value.
    pub fn unavailable() -> Self {
        Self {
            path: String::new(),
            version: None,
            available: false,
        }
    }
}

/// Install instructions shown when a converter is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallHints {
    #[serde(rename = "macOS")]
    pub mac_os: &'static str,
    pub linux: &'static str,
    pub windows: &'static str,
}

/// Platform install hints for `kind`.
pub fn install_hints(kind: ConverterKind) -> InstallHints {
    match kind {
        ConverterKind::LibreOffice => InstallHints {
            mac_os: "Install with: brew install --cask libreoffice",
            linux: "Install with: sudo apt install libreoffice",
            windows: "Download from: https://www.libreoffice.org/download/",
        },
        ConverterKind::Chromium => InstallHints {
            mac_os: "Install with: brew install --cask chromium",
            linux: "Install with: sudo apt install chromium",
            windows: "Download from: https://www.google.com/chrome/",
        },
    }
}

// ── Platform install locations ───────────────────────────────────────────────

/// Well-known install locations for `kind` on the current OS.
pub fn candidate_paths(kind: ConverterKind) -> Vec<PathBuf> {
    let os = std::env::consts::OS;
    let mut paths: Vec<PathBuf> = match (kind, os) {
        (ConverterKind::LibreOffice, "macos") => vec![
            "/Applications/LibreOffice.app/Contents/MacOS/soffice".into(),
            "/usr/local/bin/libreoffice".into(),
            "/opt/homebrew/bin/libreoffice".into(),
            "/usr/bin/libreoffice".into(),
        ],
        (ConverterKind::LibreOffice, "linux") => vec![
            "/usr/bin/libreoffice".into(),
            "/usr/local/bin/libreoffice".into(),
            "/opt/libreoffice/program/soffice".into(),
            "/snap/bin/libreoffice".into(),
        ],
        (ConverterKind::LibreOffice, "windows") => vec![
            r"C:\Program Files\LibreOffice\program\soffice.exe".into(),
            r"C:\Program Files (x86)\LibreOffice\program\soffice.exe".into(),
        ],
        (ConverterKind::Chromium, "macos") => vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into(),
            "/Applications/Chromium.app/Contents/MacOS/Chromium".into(),
            "/opt/homebrew/bin/chromium".into(),
        ],
        (ConverterKind::Chromium, "linux") => vec![
            "/usr/bin/chromium".into(),
            "/usr/bin/chromium-browser".into(),
            "/usr/bin/google-chrome".into(),
            "/snap/bin/chromium".into(),
        ],
        (ConverterKind::Chromium, "windows") => vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe".into(),
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe".into(),
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe".into(),
        ],
        _ => {
            warn!("Unsupported platform for {} detection: {os}", kind.display_name());
            Vec::new()
        }
    };

    // Per-user installs.
    if let Some(home) = dirs::home_dir() {
        match (kind, os) {
            (ConverterKind::LibreOffice, "windows") => paths.push(
                home.join(r"AppData\Local\Programs\LibreOffice\program\soffice.exe"),
            ),
            (ConverterKind::LibreOffice, "macos") => {
                paths.push(home.join("Applications/LibreOffice.app/Contents/MacOS/soffice"))
            }
            (ConverterKind::Chromium, "windows") => paths.push(
                home.join(r"AppData\Local\Google\Chrome\Application\chrome.exe"),
            ),
            _ => {}
        }
    }

    paths
}

// ── Probing ──────────────────────────────────────────────────────────────────

/// Run `<path> --version` and check that the output names `kind`.
///
/// `path` may be a bare command name, in which case `PATH` is searched.
/// Bounded by [`PROBE_TIMEOUT`].
pub fn probe(kind: ConverterKind, path: &Path) -> Result<ConverterInfo, LocateError> {
    probe_with_timeout(kind, path, PROBE_TIMEOUT)
}

/// [`probe`] with an explicit time limit.
pub fn probe_with_timeout(
    kind: ConverterKind,
    path: &Path,
    timeout: Duration,
) -> Result<ConverterInfo, LocateError> {
    let is_bare_command = path.components().count() == 1 && !path.is_absolute();
    if !is_bare_command && !path.exists() {
        return Err(LocateError::NotFound {
            kind: kind.display_name(),
            path: path.to_path_buf(),
        });
    }

    let not_runnable = |e: std::io::Error| LocateError::NotRunnable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut child = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(not_runnable)?;

    let started = Instant::now();
    loop {
        match child.try_wait().map_err(not_runnable)? {
            Some(_) => break,
            None if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                warn!("{} --version timed out after {:?}", path.display(), timeout);
                return Err(LocateError::TimedOut {
                    path: path.to_path_buf(),
                    secs: timeout.as_secs(),
                });
            }
            None => thread::sleep(PROBE_POLL),
        }
    }
    let output = child.wait_with_output().map_err(not_runnable)?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    if !kind.matches_version(&text) {
        return Err(LocateError::UnexpectedVersion {
            kind: kind.display_name(),
            path: path.to_path_buf(),
            output: text.trim().chars().take(120).collect(),
        });
    }

    let version = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string);

    Ok(ConverterInfo {
        path: path.to_string_lossy().into_owned(),
        version,
        available: true,
    })
}

/// Detect `kind` using the full resolution order (env → PATH → install dirs).
///
/// Never fails: a miss is reported as [`ConverterInfo::unavailable`].
pub fn detect(kind: ConverterKind) -> ConverterInfo {
    let name = kind.display_name();

    // 1. Environment variable override.
    if let Ok(env_path) = std::env::var(kind.env_var()) {
        if !env_path.trim().is_empty() {
            match probe(kind, Path::new(env_path.trim())) {
                Ok(found) => return found,
                // Fall through: a broken override should not hide a working install.
                Err(e) => warn!("{} is set but unusable: {e}", kind.env_var()),
            }
        }
    }

    // 2. Commands on PATH.
    for cmd in kind.path_commands() {
        match probe(kind, Path::new(cmd)) {
            Ok(found) => {
                info!("Found {name} on PATH: {cmd}");
                return found;
            }
            Err(e) => debug!("{name} not usable via '{cmd}': {e}"),
        }
    }
    debug!("{name} not found in PATH, checking specific locations...");

    // 3. Platform install locations.
    for candidate in candidate_paths(kind) {
        if !candidate.exists() {
            continue;
        }
        match probe(kind, &candidate) {
            Ok(found) => {
                info!("Found {name} at {}", candidate.display());
                return found;
            }
            Err(e) => debug!("Failed to execute {name} at {}: {e}", candidate.display()),
        }
    }

    ConverterInfo::unavailable()
}

// ── Detection cache ──────────────────────────────────────────────────────────

/// A lazily-populated, invalidatable detection slot.
///
/// Only successful detections are kept; a miss is re-detected on the next
/// call so installing the converter does not require a restart.
///
/// When constructed with an override path the cache probes that path only.
#[derive(Debug)]
pub struct DetectionCache {
    kind: ConverterKind,
    override_path: Option<PathBuf>,
    slot: RwLock<Option<ConverterInfo>>,
}

impl DetectionCache {
    /// A cache that uses [`detect`].
    pub fn new(kind: ConverterKind) -> Self {
        Self::with_override(kind, None)
    }

    /// A cache pinned to `override_path` when it is `Some`.
    pub fn with_override(kind: ConverterKind, override_path: Option<PathBuf>) -> Self {
        Self {
            kind,
            override_path,
            slot: RwLock::new(None),
        }
    }

    pub fn kind(&self) -> ConverterKind {
        self.kind
    }

    /// The cached result, if any, without triggering detection.
    pub fn cached(&self) -> Option<ConverterInfo> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Return the cached result or run detection and cache a hit.
    pub fn get_or_detect(&self) -> ConverterInfo {
        if let Some(info) = self.cached() {
            return info;
        }
        self.refresh()
    }

    /// Run detection now, replacing whatever was cached.
    pub fn refresh(&self) -> ConverterInfo {
        let info = self.detect_now();
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = info.available.then(|| info.clone());
        info
    }

    /// Forget the cached result.
    pub fn invalidate(&self) {
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.take().is_some() {
            debug!("{} detection cache cleared", self.kind.display_name());
        }
    }

    fn detect_now(&self) -> ConverterInfo {
        match &self.override_path {
            Some(path) => probe(self.kind, path).unwrap_or_else(|e| {
                warn!("{e}");
                ConverterInfo::unavailable()
            }),
            None => detect(self.kind),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
