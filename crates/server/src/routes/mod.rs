use axum::{Router, response::Json as ResponseJson, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utils::response::ApiResponse;

use crate::DeploymentImpl;

pub mod clients;
pub mod rates;
pub mod sales;
pub mod sales_transfer;

pub async fn health_check() -> ResponseJson<ApiResponse<String>> {
    ResponseJson(ApiResponse::success("OK".to_string()))
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .merge(clients::router(&deployment))
        .merge(rates::router(&deployment))
        .merge(sales::router(&deployment))
        .merge(sales_transfer::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

#[cfg(test)]
pub(crate) mod test_support {
    use db::DBService;
    use deployment::DeploymentConfig;

    use crate::DeploymentImpl;

    pub async fn test_deployment() -> DeploymentImpl {
        let db = DBService::new_in_memory().await.unwrap();
        DeploymentImpl::from_parts(DeploymentConfig::default(), db)
    }
}
