use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::client::Client;
use deployment::Deployment;
use services::services::clients::{RateForm, RateStats};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// GET /api/rates
pub async fn get_rates(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Client>>>, ApiError> {
    let rates = deployment.client_service().list_rates().await?;
    Ok(ResponseJson(ApiResponse::success(rates)))
}

/// POST /api/rates
pub async fn create_rate(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<RateForm>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Client>>), ApiError> {
    let rate = deployment.client_service().add_rate(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(rate))))
}

/// GET /api/rates/stats
pub async fn get_rate_stats(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<RateStats>>, ApiError> {
    let stats = deployment.client_service().rate_stats().await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// GET /api/rates/{id}
pub async fn get_rate(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let rate = deployment.client_service().get_rate(id).await?;
    Ok(ResponseJson(ApiResponse::success(rate)))
}

/// PUT /api/rates/{id}
pub async fn update_rate(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<RateForm>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let rate = deployment.client_service().update_rate(id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(rate)))
}

/// DELETE /api/rates/{id}
pub async fn delete_rate(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.client_service().delete_rate(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/rates",
        Router::new()
            .route("/", get(get_rates).post(create_rate))
            .route("/stats", get(get_rate_stats))
            .route("/{id}", get(get_rate).put(update_rate).delete(delete_rate)),
    )
}

#[cfg(test)]
mod tests {
    use axum::{Json, response::IntoResponse};

    use super::*;
    use crate::routes::test_support::test_deployment;

    fn form(name: &str, rate: f64) -> RateForm {
        RateForm {
            client_name: name.to_string(),
            rate: Some(rate),
            no_of_staff: None,
            date: Some("2024-02-29".to_string()),
        }
    }

    #[tokio::test]
    async fn create_returns_201_and_record() {
        let deployment = test_deployment().await;
        let (status, body) = create_rate(State(deployment.clone()), Json(form("Acme", 35.0)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let rate = body.0.into_data().unwrap();
        let fetched = get_rate(State(deployment), Path(rate.id))
            .await
            .unwrap()
            .0
            .into_data()
            .unwrap();
        assert_eq!(fetched, rate);
        assert_eq!(fetched.rate, 35.0);
    }

    #[tokio::test]
    async fn deleted_rate_is_404() {
        let deployment = test_deployment().await;
        let (_, body) = create_rate(State(deployment.clone()), Json(form("Acme", 1.0)))
            .await
            .unwrap();
        let id = body.0.into_data().unwrap().id;

        let deleted = delete_rate(State(deployment.clone()), Path(id)).await.unwrap();
        assert!(deleted.is_success());

        let err = get_rate(State(deployment), Path(id)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_reflect_rates() {
        let deployment = test_deployment().await;
        for (name, rate) in [("Acme", 10.0), ("Globex", 50.0)] {
            create_rate(State(deployment.clone()), Json(form(name, rate)))
                .await
                .unwrap();
        }

        let stats = get_rate_stats(State(deployment))
            .await
            .unwrap()
            .0
            .into_data()
            .unwrap();
        assert_eq!(stats.total_clients, 2);
        assert_eq!(stats.average_rate, 30.0);
        assert_eq!(stats.highest_rate, 50.0);
        assert_eq!(stats.total_staff, 2);
    }
}
