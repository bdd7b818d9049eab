//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quin_tree::TreeError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Leaf {0} not found")]
    LeafNotFound(usize),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::LeafNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Tree(err) => match err {
                TreeError::IndexOutOfRange { .. } | TreeError::TreeNumberOutOfRange { .. } => {
                    StatusCode::NOT_FOUND
                }
                TreeError::InvalidSubrootRange { .. }
                | TreeError::MalformedProof(_)
                | TreeError::Encoding(_) => StatusCode::BAD_REQUEST,
                TreeError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
