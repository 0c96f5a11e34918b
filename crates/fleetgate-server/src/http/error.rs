use axum::Json;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::error::Error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "Request failed");
        }

        // Store and internal variants display a generic message only.
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
