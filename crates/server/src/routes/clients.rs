//! Client quick-add and client pickers.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::client::{Client, ClientOption, CreateClient};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// GET /api/clients
pub async fn get_clients(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Client>>>, ApiError> {
    let clients = deployment.client_service().list_clients().await?;
    Ok(ResponseJson(ApiResponse::success(clients)))
}

/// POST /api/clients
pub async fn create_client(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateClient>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let client = deployment.client_service().add_client(payload).await?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

/// GET /api/get-clients
/// Id and name only, for select boxes
pub async fn get_client_options(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ClientOption>>>, ApiError> {
    let options = deployment.client_service().list_client_options().await?;
    Ok(ResponseJson(ApiResponse::success(options)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/clients", get(get_clients).post(create_client))
        .route("/get-clients", get(get_client_options))
}
