//! Client (rate) management.

use std::collections::HashSet;

use db::models::client::{
    Client, ClientOption, CreateClient, DEFAULT_NO_OF_STAFF, DEFAULT_RATE, UpdateClient,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::date_normalizer::normalize_date;

#[derive(Debug, Error)]
pub enum ClientServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("client not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
}

/// Body of the rate form: a client with an optional effective date
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RateForm {
    pub client_name: String,
    pub rate: Option<f64>,
    pub no_of_staff: Option<i32>,
    pub date: Option<String>,
}

/// Figures shown above the rates table
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateStats {
    pub total_clients: usize,
    pub average_rate: f64,
    pub highest_rate: f64,
    pub total_staff: i64,
}

pub fn compute_rate_stats(clients: &[Client]) -> RateStats {
    if clients.is_empty() {
        return RateStats {
            total_clients: 0,
            average_rate: 0.0,
            highest_rate: 0.0,
            total_staff: 0,
        };
    }

    let distinct: HashSet<&str> = clients.iter().map(|c| c.client_name.as_str()).collect();
    let total_rate: f64 = clients.iter().map(|c| c.rate).sum();
    RateStats {
        total_clients: distinct.len(),
        average_rate: total_rate / clients.len() as f64,
        highest_rate: clients.iter().map(|c| c.rate).fold(f64::MIN, f64::max),
        total_staff: clients.iter().map(|c| i64::from(c.no_of_staff)).sum(),
    }
}

fn require_name(client_name: &str) -> Result<String, ClientServiceError> {
    let trimmed = client_name.trim();
    if trimmed.is_empty() {
        return Err(ClientServiceError::Validation(
            "Client name is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn check_rate(rate: Option<f64>) -> Result<f64, ClientServiceError> {
    match rate {
        Some(r) if !r.is_finite() || r < 0.0 => Err(ClientServiceError::Validation(
            "Rate must be a non-negative number".to_string(),
        )),
        Some(r) => Ok(r),
        None => Ok(DEFAULT_RATE),
    }
}

fn check_staff(no_of_staff: Option<i32>) -> Result<i32, ClientServiceError> {
    match no_of_staff {
        Some(n) if n < 0 => Err(ClientServiceError::Validation(
            "Number of staff cannot be negative".to_string(),
        )),
        Some(n) => Ok(n),
        None => Ok(DEFAULT_NO_OF_STAFF),
    }
}

impl RateForm {
    fn validate(&self) -> Result<UpdateClient, ClientServiceError> {
        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => Some(
                normalize_date(raw).map_err(|e| ClientServiceError::Validation(e.to_string()))?,
            ),
            None => None,
        };
        Ok(UpdateClient {
            client_name: require_name(&self.client_name)?,
            rate: check_rate(self.rate)?,
            no_of_staff: check_staff(self.no_of_staff)?,
            date,
        })
    }
}

pub struct ClientService {
    pool: SqlitePool,
}

impl ClientService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Quick-add from the sales screen: only the name is required.
    pub async fn add_client(&self, data: CreateClient) -> Result<Client, ClientServiceError> {
        let data = CreateClient {
            client_name: require_name(&data.client_name)?,
            rate: Some(check_rate(data.rate)?),
            no_of_staff: Some(check_staff(data.no_of_staff)?),
            date: data.date,
        };
        let client = Client::create(&self.pool, Uuid::new_v4(), &data).await?;
        info!(client_id = %client.id, client_name = %client.client_name, "Created client");
        Ok(client)
    }

    pub async fn add_rate(&self, form: RateForm) -> Result<Client, ClientServiceError> {
        let valid = form.validate()?;
        let data = CreateClient {
            client_name: valid.client_name,
            rate: Some(valid.rate),
            no_of_staff: Some(valid.no_of_staff),
            date: valid.date,
        };
        let client = Client::create(&self.pool, Uuid::new_v4(), &data).await?;
        info!(client_id = %client.id, rate = client.rate, "Created rate");
        Ok(client)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, ClientServiceError> {
        Ok(Client::find_all_by_name(&self.pool).await?)
    }

    pub async fn list_client_options(&self) -> Result<Vec<ClientOption>, ClientServiceError> {
        Ok(Client::find_options(&self.pool).await?)
    }

    pub async fn list_rates(&self) -> Result<Vec<Client>, ClientServiceError> {
        Ok(Client::find_all_by_date_desc(&self.pool).await?)
    }

    pub async fn get_rate(&self, id: Uuid) -> Result<Client, ClientServiceError> {
        Client::find_by_id(&self.pool, id)
            .await?
            .ok_or(ClientServiceError::NotFound)
    }

    pub async fn update_rate(&self, id: Uuid, form: RateForm) -> Result<Client, ClientServiceError> {
        let data = form.validate()?;
        Client::update(&self.pool, id, &data)
            .await?
            .ok_or(ClientServiceError::NotFound)
    }

    /// Clients still referenced by sales are kept.
    pub async fn delete_rate(&self, id: Uuid) -> Result<(), ClientServiceError> {
        let sales = Client::count_sales(&self.pool, id).await?;
        if sales > 0 {
            return Err(ClientServiceError::Conflict(format!(
                "Client has {sales} sales and cannot be deleted"
            )));
        }

        match Client::delete(&self.pool, id).await? {
            0 => Err(ClientServiceError::NotFound),
            _ => {
                info!(client_id = %id, "Deleted client");
                Ok(())
            }
        }
    }

    pub async fn rate_stats(&self) -> Result<RateStats, ClientServiceError> {
        let clients = Client::find_all_by_date_desc(&self.pool).await?;
        Ok(compute_rate_stats(&clients))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::{
        DBService,
        models::sale::{CreateSale, Sale},
    };
    use rust_decimal::Decimal;

    use super::*;

    async fn service() -> ClientService {
        let db = DBService::new_in_memory().await.unwrap();
        ClientService::new(db.pool)
    }

    fn form(name: &str, rate: Option<f64>, date: Option<&str>) -> RateForm {
        RateForm {
            client_name: name.to_string(),
            rate,
            no_of_staff: Some(4),
            date: date.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn add_client_requires_a_name() {
        let service = service().await;
        let err = service
            .add_client(CreateClient::named("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn add_client_defaults_rate_and_staff() {
        let service = service().await;
        let client = service.add_client(CreateClient::named("Acme")).await.unwrap();
        assert_eq!(client.client_name, "Acme");
        assert_eq!(client.rate, 1.0);
        assert_eq!(client.no_of_staff, 1);
    }

    #[tokio::test]
    async fn rate_round_trips_through_create_and_get() {
        let service = service().await;
        let created = service
            .add_rate(form("Acme", Some(42.5), Some("03/15/2024")))
            .await
            .unwrap();

        assert_eq!(created.client_name, "Acme");
        assert_eq!(created.rate, 42.5);
        assert_eq!(created.no_of_staff, 4);
        assert_eq!(created.date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(service.get_rate(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn invalid_rate_date_is_a_validation_error() {
        let service = service().await;
        let err = service
            .add_rate(form("Acme", Some(1.0), Some("02/30/2024")))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_replaces_every_field() {
        let service = service().await;
        let created = service.add_rate(form("Acme", Some(10.0), None)).await.unwrap();

        let updated = service
            .update_rate(created.id, form("Acme Ltd", Some(12.0), Some("2024-01-31")))
            .await
            .unwrap();
        assert_eq!(updated.client_name, "Acme Ltd");
        assert_eq!(updated.rate, 12.0);
        assert_eq!(updated.date, NaiveDate::from_ymd_opt(2024, 1, 31));

        let missing = service
            .update_rate(Uuid::new_v4(), form("X", None, None))
            .await
            .unwrap_err();
        assert!(matches!(missing, ClientServiceError::NotFound));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let service = service().await;
        let created = service.add_client(CreateClient::named("Acme")).await.unwrap();

        service.delete_rate(created.id).await.unwrap();
        assert!(matches!(
            service.get_rate(created.id).await.unwrap_err(),
            ClientServiceError::NotFound
        ));
        assert!(matches!(
            service.delete_rate(created.id).await.unwrap_err(),
            ClientServiceError::NotFound
        ));
    }

    #[tokio::test]
    async fn client_with_sales_cannot_be_deleted() {
        let service = service().await;
        let client = service.add_client(CreateClient::named("Acme")).await.unwrap();
        let sale = CreateSale {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            client_id: client.id,
            amount: Decimal::TEN,
            method: "Cash".to_string(),
            note: None,
        };
        Sale::create(&service.pool, Uuid::new_v4(), &sale).await.unwrap();

        assert!(matches!(
            service.delete_rate(client.id).await.unwrap_err(),
            ClientServiceError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn stats_count_distinct_names() {
        let service = service().await;
        service.add_rate(form("Acme", Some(10.0), None)).await.unwrap();
        service.add_rate(form("Acme", Some(30.0), None)).await.unwrap();
        service.add_rate(form("Globex", Some(20.0), None)).await.unwrap();

        let stats = service.rate_stats().await.unwrap();
        assert_eq!(stats.total_clients, 2);
        assert_eq!(stats.average_rate, 20.0);
        assert_eq!(stats.highest_rate, 30.0);
        assert_eq!(stats.total_staff, 12);
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        let stats = compute_rate_stats(&[]);
        assert_eq!(stats.total_clients, 0);
        assert_eq!(stats.average_rate, 0.0);
        assert_eq!(stats.highest_rate, 0.0);
    }
}
