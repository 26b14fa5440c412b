//! Pipeline stages for turning generated SOW documents into something a
//! browser can show.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//!                      ┌──▶ pdf (LibreOffice) ───────────────────▶ PDF
//! sow_api ──▶ DOCX ────┤
//! (HTTP)               ├──▶ docx ──▶ pdf (headless Chromium) ───▶ PDF
//!                      │
//!                      └──▶ docx ──▶ markdown ──────────────────▶ Markdown
//! ```
//!
//! 1. [`sow_api`]: call the external generation service; the only stage
//!    with network I/O
//! 2. [`pdf`]: drive an external converter process under a timeout
//! 3. [`docx`]: read the WordprocessingML package into semantic HTML;
//!    pure CPU, run inside `spawn_blocking`
//! 4. [`markdown`]: deterministic HTML→Markdown rules plus cleanup

pub mod docx;
pub mod markdown;
pub mod pdf;
pub mod sow_api;
