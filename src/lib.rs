//! # sow-wizard
//!
//! Backend for a three-step Statement of Work (SOW) wizard: pick a contract
//! type, pick or upload proposal documents, have an external service generate
//! the SOW, then view it as PDF or Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! proposals (input/)
//!  │
//!  ├─ 1. Upload    validated, stored under a unique name
//!  ├─ 2. Generate  external SOW API → DOCX in generated_sows/
//!  ├─ 3. PDF       LibreOffice headless (or headless Chromium fallback)
//!  └─ 4. Markdown  DOCX → HTML → Markdown for in-browser preview
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sow_wizard::{convert, AppConfig, DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::builder().documents_root("./docs").build()?;
//!     let store = DocumentStore::new(&config)?;
//!     let out = convert::docx_to_markdown(&store, "SOW_2026-01-05T10-00-00-000Z.docx").await?;
//!     println!("{}", out.markdown);
//!     Ok(())
//! }
//! ```
//!
//! Or serve the HTTP API:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), sow_wizard::SowError> {
//! let config = sow_wizard::AppConfig::builder().build()?;
//! sow_wizard::server::serve(config).await
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sow-wizard` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External tools
//!
//! PDF conversion shells out to LibreOffice (`soffice`). When it is missing
//! and the fallback is enabled, headless Chromium prints an HTML rendition
//! instead. Neither is needed for upload, generation, or Markdown preview.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod documents;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod server;
pub mod templates;
pub mod wizard;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AppConfig, AppConfigBuilder, DocumentPaths};
pub use convert::{converter_status, convert_to_pdf, docx_to_markdown, generate_sow, Converters};
pub use converter_locate::{install_hints, ConverterInfo, ConverterKind, InstallHints};
pub use documents::{DocumentStore, Folder};
pub use error::{ConversionMessage, MessageKind, SowError};
pub use model::{
    ContractType, FileCategory, FileData, GeneratedSow, MarkdownConversion, PdfConversion,
    WizardData,
};
pub use pipeline::pdf::PdfMethod;
pub use pipeline::sow_api::SowApiClient;
pub use progress::{ConversionProgressCallback, NoopProgressCallback};
pub use server::{build_router, AppState};
pub use wizard::{render_sow_draft, Wizard, WizardStep};
