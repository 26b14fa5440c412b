//! Error types for the sow-wizard library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SowError`]: **Fatal**: the request cannot be served at all (bad file
//!   name, missing document, converter not installed, upstream API failure).
//!   Returned as `Err(SowError)` from every library operation and rendered as
//!   a JSON error body by the HTTP layer.
//!
//! * [`ConversionMessage`]: **Non-fatal**: something in a DOCX could not be
//!   represented faithfully (unknown paragraph style, embedded image) but the
//!   conversion still produced output. Collected into
//!   [`crate::model::MarkdownConversion::messages`].

use std::path::PathBuf;

use axum::http::StatusCode;
use converter_locate::InstallHints;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All fatal errors returned by the sow-wizard library.
#[derive(Debug, Error)]
pub enum SowError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A required field is missing or malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// A user-supplied file name contains path components.
    #[error("Invalid file path")]
    InvalidFileName { name: String },

    /// The named document does not exist.
    #[error("{label} not found: {name}")]
    FileNotFound { label: &'static str, name: String },

    /// Upload exceeds `max_upload_mb`.
    #[error("File size exceeds the maximum limit of {limit_mb} MB")]
    FileTooLarge { limit_mb: u64 },

    /// Upload extension is not in the allow-list.
    #[error("Only {allowed} files are allowed")]
    ExtensionNotAllowed { allowed: String },

    /// Contract type id/label is not one of the known models.
    #[error("Unknown contract type: '{0}'")]
    UnknownContractType(String),

    // ── Conversion errors ─────────────────────────────────────────────────
    /// No LibreOffice (and no usable fallback) on this machine.
    #[error("LibreOffice is not installed or not found")]
    ConverterUnavailable { help: InstallHints },

    /// The converter process ran but failed.
    #[error("Error executing {tool} conversion: {detail}")]
    ConversionFailed { tool: &'static str, detail: String },

    /// The converter process exceeded the conversion timeout and was killed.
    #[error("Conversion timed out after {secs}s")]
    ConversionTimeout { secs: u64 },

    /// The converter exited cleanly but produced no PDF.
    #[error("PDF conversion failed - file was not created")]
    PdfNotCreated { expected: PathBuf },

    /// The DOCX package could not be read.
    #[error("Could not read DOCX: {0}")]
    Docx(String),

    // ── External API errors ───────────────────────────────────────────────
    /// No SOW API endpoint is configured.
    #[error("SOW API endpoint not configured")]
    ApiNotConfigured,

    /// The SOW API answered with a non-2xx status.
    #[error("API Error: {status} {reason}")]
    ApiStatus {
        status: u16,
        reason: String,
        body: String,
    },

    /// The SOW API could not be reached.
    #[error("Failed to reach SOW API: {0}")]
    ApiRequest(String),

    /// The SOW API answered 2xx with an unusable body.
    #[error("Invalid API response: {0}")]
    InvalidApiResponse(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A file system operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SowError {
    /// Shorthand for [`SowError::Io`].
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SowError::Io {
            context: context.into(),
            source,
        }
    }

    /// HTTP status this error maps to.
    ///
    /// `ApiStatus` passes the upstream status through; an out-of-range code
    /// degrades to 502.
    pub fn status(&self) -> StatusCode {
        match self {
            SowError::InvalidRequest(_)
            | SowError::InvalidFileName { .. }
            | SowError::FileTooLarge { .. }
            | SowError::ExtensionNotAllowed { .. }
            | SowError::UnknownContractType(_) => StatusCode::BAD_REQUEST,
            SowError::FileNotFound { .. } => StatusCode::NOT_FOUND,
            SowError::ApiStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            SowError::ConversionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message safe to show to a client.
    ///
    /// I/O and internal errors carry host paths in their `Display`; those are
    /// replaced by a generic message and only logged server-side.
    pub fn public_message(&self) -> String {
        match self {
            SowError::Io { .. } | SowError::Internal(_) => "Internal server error".to_string(),
            SowError::ConversionFailed { tool, .. } => format!("Error executing {tool} conversion"),
            SowError::InvalidApiResponse(_) => {
                "Invalid API response: missing docx_content or filename".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for SowError {
    fn from(e: zip::result::ZipError) -> Self {
        SowError::Docx(e.to_string())
    }
}

impl From<quick_xml::Error> for SowError {
    fn from(e: quick_xml::Error) -> Self {
        SowError::Docx(format!("XML parse error: {e}"))
    }
}

/// Severity of a [`ConversionMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Warning,
    Error,
}

/// A non-fatal problem found while converting a DOCX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
}

impl ConversionMessage {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            message: message.into(),
        }
    }
}
