//! CSV upload, export and template download for sales.

use axum::{
    Router,
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
};
use chrono::Utc;
use deployment::Deployment;
use serde::Deserialize;
use services::services::{
    sales_export::{self, TEMPLATE_FILENAME},
    sales_import::{ImportPreview, ImportSummary},
};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    /// Operator approval to create clients the file names but the database lacks
    #[serde(default)]
    pub create_clients: bool,
}

async fn read_upload(mut multipart: Multipart) -> Result<String, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await?;
            return String::from_utf8(bytes.to_vec()).map_err(|_| {
                ApiError::BadRequest("Uploaded file is not valid UTF-8 text".to_string())
            });
        }
    }
    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// POST /api/sales/upload/preview
/// Dry run: what the upload would insert, skip, and which clients it would need
pub async fn preview_upload(
    State(deployment): State<DeploymentImpl>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<ImportPreview>>, ApiError> {
    let text = read_upload(multipart).await?;
    let plan = deployment.sales_importer().plan(&text).await?;
    Ok(ResponseJson(ApiResponse::success(plan.preview())))
}

/// POST /api/sales/upload?createClients=true
pub async fn upload_sales(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<ImportSummary>>, ApiError> {
    let text = read_upload(multipart).await?;
    let summary = deployment
        .sales_importer()
        .import(&text, query.create_clients)
        .await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// GET /api/sales/export
pub async fn export_sales(
    State(deployment): State<DeploymentImpl>,
) -> Result<Response, ApiError> {
    let csv = sales_export::export_sales(&deployment.db().pool).await?;
    let filename = sales_export::export_filename(Utc::now().date_naive());
    Ok(csv_attachment(&filename, csv))
}

/// GET /api/sales/template
pub async fn download_template() -> Result<Response, ApiError> {
    let csv = sales_export::render_template_csv(Utc::now().date_naive())?;
    Ok(csv_attachment(TEMPLATE_FILENAME, csv))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/sales/upload", post(upload_sales))
        .route("/sales/upload/preview", post(preview_upload))
        .route("/sales/export", get(export_sales))
        .route("/sales/template", get(download_template))
}
