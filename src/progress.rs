//! Progress-callback trait for long-running operations.
//!
//! Converter detection, PDF conversion and the external SOW API call can each
//! take several seconds. Pass a `&dyn ConversionProgressCallback` to the
//! [`crate::convert`] operations to observe them; the CLI drives an
//! `indicatif` spinner from these events and the HTTP server uses
//! [`NoopProgressCallback`].
//!
//! # Example
//!
//! ```rust
//! use sow_wizard::{ConversionProgressCallback, PdfMethod};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     conversions: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_conversion_complete(&self, method: PdfMethod, output: &str) {
//!         self.conversions.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} wrote {}", method.label(), output);
//!     }
//! }
//!
//! let cb: Arc<dyn ConversionProgressCallback> = Arc::new(CountingCallback {
//!     conversions: AtomicUsize::new(0),
//! });
//! cb.on_conversion_complete(PdfMethod::LibreOffice, "converted_to_pdf/sow.pdf");
//! ```

use converter_locate::{ConverterInfo, ConverterKind};

use crate::pipeline::pdf::PdfMethod;

/// Events emitted by [`crate::convert`] operations.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; events may
/// arrive from a blocking worker thread.
pub trait ConversionProgressCallback: Send + Sync {
    /// A converter lookup is about to run (cache miss or forced refresh).
    fn on_detect_start(&self, kind: ConverterKind) {
        let _ = kind;
    }

    /// A converter lookup finished; `info.available` tells whether it was
    /// found.
    fn on_detect_complete(&self, kind: ConverterKind, info: &ConverterInfo) {
        let _ = (kind, info);
    }

    /// An external converter process is about to be launched.
    ///
    /// # Arguments
    /// * `method`: which converter will run
    /// * `input` : the DOCX file name
    fn on_conversion_start(&self, method: PdfMethod, input: &str) {
        let _ = (method, input);
    }

    /// The converter produced a PDF at `output` (relative web path).
    fn on_conversion_complete(&self, method: PdfMethod, output: &str) {
        let _ = (method, output);
    }

    /// The converter failed; `error` is human-readable.
    fn on_conversion_error(&self, method: PdfMethod, error: &str) {
        let _ = (method, error);
    }

    /// The SOW API request is about to be sent.
    fn on_api_request_start(&self, endpoint: &str, documents: usize) {
        let _ = (endpoint, documents);
    }

    /// The SOW API answered (or the request failed).
    fn on_api_response(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}
