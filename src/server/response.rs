use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::error::SowError;

impl IntoResponse for SowError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let message = self.public_message();
        let mut body = json!({ "success": false, "message": message });

        match &self {
            SowError::ConverterUnavailable { help } => {
                body["error"] = json!("LibreOffice not available");
                body["help"] = json!(help);
            }
            SowError::ConversionFailed { detail, .. } => {
                body["error"] = json!(detail);
            }
            SowError::ApiStatus { body: details, .. } => {
                body["details"] = json!(details);
            }
            SowError::InvalidApiResponse(detail) => {
                body["error"] = json!(detail);
            }
            _ => {
                body["error"] = json!(message);
            }
        }

        (status, Json(body)).into_response()
    }
}
