use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deployment::DeploymentError;
use services::services::{
    clients::ClientServiceError, sales::SalesServiceError, sales_export::ExportError,
    sales_import::ImportError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Client(#[from] ClientServiceError),
    #[error(transparent)]
    Sales(#[from] SalesServiceError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Client(err) => match err {
                ClientServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                ClientServiceError::NotFound => (StatusCode::NOT_FOUND, "Rate not found".into()),
                ClientServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                ClientServiceError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process client".into())
                }
            },
            ApiError::Sales(err) => match err {
                SalesServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                SalesServiceError::NotFound => (StatusCode::NOT_FOUND, "Sale not found".into()),
                SalesServiceError::AmountOverflow => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Sales total is too large to compute".into(),
                ),
                SalesServiceError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process sale".into())
                }
            },
            ApiError::Import(err) => match err {
                ImportError::Parse(_) | ImportError::MissingColumns(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                ImportError::Database(_) | ImportError::BatchFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
            ApiError::Export(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to export sales".into(),
            ),
            ApiError::Deployment(_) | ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            ),
            ApiError::Multipart(err) => (StatusCode::BAD_REQUEST, err.body_text()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
