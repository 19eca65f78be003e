//! Single-record sales management and sales reporting.

use std::collections::BTreeMap;

use db::models::{
    client::Client,
    sale::{CreateSale, Sale, SaleWithClient},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::date_normalizer::normalize_date;

#[derive(Debug, Error)]
pub enum SalesServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("sale not found")]
    NotFound,
    #[error("sales total exceeds the representable amount")]
    AmountOverflow,
}

/// Body of the sale form. The date arrives as typed by the user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SaleForm {
    pub date: String,
    pub client_id: Option<Uuid>,
    #[ts(type = "string | number")]
    pub amount: Decimal,
    pub method: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteSales {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodTotal {
    pub method: String,
    pub count: usize,
    #[ts(type = "string")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_sales: usize,
    #[ts(type = "string")]
    pub total_amount: Decimal,
    #[ts(type = "string")]
    pub average_amount: Decimal,
    pub by_method: Vec<MethodTotal>,
}

/// Totals overall and per payment method (methods in name order).
pub fn compute_sales_stats(sales: &[SaleWithClient]) -> Result<SalesStats, SalesServiceError> {
    let mut by_method: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
    let mut total_amount = Decimal::ZERO;

    for sale in sales {
        total_amount = total_amount
            .checked_add(sale.amount)
            .ok_or(SalesServiceError::AmountOverflow)?;
        let entry = by_method.entry(sale.method.as_str()).or_default();
        entry.0 += 1;
        entry.1 = entry
            .1
            .checked_add(sale.amount)
            .ok_or(SalesServiceError::AmountOverflow)?;
    }

    let average_amount = if sales.is_empty() {
        Decimal::ZERO
    } else {
        (total_amount / Decimal::from(sales.len())).round_dp(2)
    };

    Ok(SalesStats {
        total_sales: sales.len(),
        total_amount,
        average_amount,
        by_method: by_method
            .into_iter()
            .map(|(method, (count, total))| MethodTotal {
                method: method.to_string(),
                count,
                total,
            })
            .collect(),
    })
}

pub struct SalesService {
    pool: SqlitePool,
}

impl SalesService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check the form and make sure the referenced client exists.
    async fn validate(&self, form: SaleForm) -> Result<CreateSale, SalesServiceError> {
        let client_id = form
            .client_id
            .ok_or_else(|| SalesServiceError::Validation("Client is required".to_string()))?;
        let method = form.method.trim();
        if method.is_empty() {
            return Err(SalesServiceError::Validation(
                "Payment method is required".to_string(),
            ));
        }
        let date = normalize_date(&form.date)
            .map_err(|e| SalesServiceError::Validation(e.to_string()))?;

        if Client::find_by_id(&self.pool, client_id).await?.is_none() {
            return Err(SalesServiceError::Validation(format!(
                "Client {client_id} does not exist"
            )));
        }

        Ok(CreateSale {
            date,
            client_id,
            amount: form.amount,
            method: method.to_string(),
            note: form
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }

    pub async fn list_sales(&self) -> Result<Vec<SaleWithClient>, SalesServiceError> {
        Ok(Sale::find_all_with_client(&self.pool).await?)
    }

    pub async fn get_sale(&self, id: Uuid) -> Result<SaleWithClient, SalesServiceError> {
        Sale::find_by_id_with_client(&self.pool, id)
            .await?
            .ok_or(SalesServiceError::NotFound)
    }

    pub async fn create_sale(&self, form: SaleForm) -> Result<SaleWithClient, SalesServiceError> {
        let data = self.validate(form).await?;
        let sale = Sale::create(&self.pool, Uuid::new_v4(), &data).await?;
        info!(sale_id = %sale.id, client_id = %sale.client_id, amount = %sale.amount, "Created sale");
        self.get_sale(sale.id).await
    }

    pub async fn update_sale(
        &self,
        id: Uuid,
        form: SaleForm,
    ) -> Result<SaleWithClient, SalesServiceError> {
        let data = self.validate(form).await?;
        let sale = Sale::update(&self.pool, id, &data)
            .await?
            .ok_or(SalesServiceError::NotFound)?;
        self.get_sale(sale.id).await
    }

    pub async fn delete_sale(&self, id: Uuid) -> Result<(), SalesServiceError> {
        match Sale::delete(&self.pool, id).await? {
            0 => Err(SalesServiceError::NotFound),
            _ => {
                info!(sale_id = %id, "Deleted sale");
                Ok(())
            }
        }
    }

    /// Delete every listed sale; unknown ids are ignored. Returns how many rows went away.
    pub async fn delete_sales(&self, ids: &[Uuid]) -> Result<u64, SalesServiceError> {
        if ids.is_empty() {
            return Err(SalesServiceError::Validation(
                "No sale ids given".to_string(),
            ));
        }
        let deleted = Sale::delete_many(&self.pool, ids).await?;
        info!(requested = ids.len(), deleted, "Bulk deleted sales");
        Ok(deleted)
    }

    pub async fn sales_stats(&self) -> Result<SalesStats, SalesServiceError> {
        let sales = Sale::find_all_with_client(&self.pool).await?;
        compute_sales_stats(&sales)
    }
}
