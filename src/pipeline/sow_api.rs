//! Client for the external SOW-generation API.
//!
//! The API receives the contract type and the names of the selected proposal
//! documents and answers with one of three shapes:
//!
//! * `{docx_content, filename}`: a base64-encoded DOCX to store locally
//! * `{sow_file}`: the name of a DOCX the service already wrote into the
//!   shared `generated_sows` folder
//! * `{sow_text}`: Markdown only, no document
//!
//! `cot_text` (the model's reasoning trace) may accompany any of them.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SowError;

/// Largest slice of an error body kept in [`SowError::ApiStatus`].
const MAX_ERROR_BODY: usize = 2000;

/// Request body sent to the SOW API.
#[derive(Debug, Clone, Serialize)]
pub struct SowApiRequest<'a> {
    pub contract_type: &'a str,
    pub filenames: &'a [String],
}

/// Raw response body. Every field is optional; [`SowApiResponse::payload`]
/// decides which shape was returned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SowApiResponse {
    #[serde(default)]
    pub docx_content: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub sow_file: Option<String>,
    #[serde(default)]
    pub sow_text: Option<String>,
    #[serde(default)]
    pub cot_text: Option<String>,
}

/// The usable part of a [`SowApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SowPayload<'a> {
    Docx {
        base64: &'a str,
        filename: &'a str,
    },
    ExistingFile(&'a str),
    TextOnly(&'a str),
}

impl SowApiResponse {
    /// Pick the response shape, preferring an inline DOCX over a file
    /// reference over bare text. Empty strings count as absent.
    pub fn payload(&self) -> Result<SowPayload<'_>, SowError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }

        if let (Some(base64), Some(filename)) =
            (present(&self.docx_content), present(&self.filename))
        {
            return Ok(SowPayload::Docx { base64, filename });
        }
        if let Some(file) = present(&self.sow_file) {
            return Ok(SowPayload::ExistingFile(file));
        }
        if let Some(text) = present(&self.sow_text) {
            return Ok(SowPayload::TextOnly(text));
        }
        Err(SowError::InvalidApiResponse(
            "missing docx_content or filename".to_string(),
        ))
    }

    /// Reasoning trace, if the service sent a non-empty one.
    pub fn cot(&self) -> Option<&str> {
        self.cot_text.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// HTTP client bound to one SOW API endpoint.
#[derive(Clone)]
pub struct SowApiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for SowApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SowApiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SowApiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SowError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SowError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service to generate a SOW.
    pub async fn request_sow(
        &self,
        contract_type: &str,
        filenames: &[String],
    ) -> Result<SowApiResponse, SowError> {
        info!("Calling SOW API: {}", self.endpoint);
        debug!(contract_type, documents = filenames.len(), "SOW API request");

        let mut request = self.http.post(&self.endpoint).json(&SowApiRequest {
            contract_type,
            filenames,
        });
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SowError::ApiRequest(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                SowError::ApiRequest(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            warn!("SOW API error: {} {}", status.as_u16(), body);
            return Err(SowError::ApiStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        let parsed: SowApiResponse = response
            .json()
            .await
            .map_err(|e| SowError::InvalidApiResponse(format!("body is not valid JSON: {e}")))?;

        debug!(
            has_docx_content = parsed.docx_content.is_some(),
            filename = parsed.filename.as_deref().unwrap_or(""),
            has_sow_text = parsed.sow_text.is_some(),
            "SOW API response received"
        );
        Ok(parsed)
    }
}
