use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::sale::SaleWithClient;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::sales::{BulkDeleteSales, SaleForm, SalesStats};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BulkDeleteResponse {
    pub deleted: u32,
}

/// GET /api/sales
pub async fn get_sales(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<SaleWithClient>>>, ApiError> {
    let sales = deployment.sales_service().list_sales().await?;
    Ok(ResponseJson(ApiResponse::success(sales)))
}

/// POST /api/sales
pub async fn create_sale(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<SaleForm>,
) -> Result<ResponseJson<ApiResponse<SaleWithClient>>, ApiError> {
    let sale = deployment.sales_service().create_sale(payload).await?;
    Ok(ResponseJson(ApiResponse::success(sale)))
}

/// GET /api/sales/stats
pub async fn get_sales_stats(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<SalesStats>>, ApiError> {
    let stats = deployment.sales_service().sales_stats().await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// GET /api/sales/{id}
pub async fn get_sale(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SaleWithClient>>, ApiError> {
    let sale = deployment.sales_service().get_sale(id).await?;
    Ok(ResponseJson(ApiResponse::success(sale)))
}

/// PUT /api/sales/{id}
pub async fn update_sale(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SaleForm>,
) -> Result<ResponseJson<ApiResponse<SaleWithClient>>, ApiError> {
    let sale = deployment.sales_service().update_sale(id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(sale)))
}

/// DELETE /api/sales/{id}
pub async fn delete_sale(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.sales_service().delete_sale(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/sales/bulk-delete
pub async fn bulk_delete_sales(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<BulkDeleteSales>,
) -> Result<ResponseJson<ApiResponse<BulkDeleteResponse>>, ApiError> {
    let deleted = deployment.sales_service().delete_sales(&payload.ids).await?;
    Ok(ResponseJson(ApiResponse::success(BulkDeleteResponse {
        deleted: deleted as u32,
    })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/sales",
        Router::new()
            .route("/", get(get_sales).post(create_sale))
            .route("/stats", get(get_sales_stats))
            .route("/bulk-delete", post(bulk_delete_sales))
            .route("/{id}", get(get_sale).put(update_sale).delete(delete_sale)),
    )
}
