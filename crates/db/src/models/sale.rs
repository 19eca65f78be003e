use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};
use ts_rs::TS;
use uuid::Uuid;

use crate::SQLITE_MAX_VARIABLES;

/// Most sales `create_batch` can insert in one statement (6 binds each).
pub const MAX_SALES_PER_INSERT: usize = SQLITE_MAX_VARIABLES / 6;

/// A dated payment received from a client
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub date: NaiveDate,
    pub client_id: Uuid, // Foreign key to Client
    #[ts(type = "string")]
    pub amount: Decimal,
    pub method: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sale joined with the owning client's name, as shown in listings and exports
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleWithClient {
    #[serde(flatten)]
    #[ts(flatten)]
    pub sale: Sale,
    pub client_name: String,
}

impl std::ops::Deref for SaleWithClient {
    type Target = Sale;
    fn deref(&self) -> &Self::Target {
        &self.sale
    }
}

/// Column values for a sale insert or a full-record update
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSale {
    pub date: NaiveDate,
    pub client_id: Uuid,
    #[ts(type = "string")]
    pub amount: Decimal,
    pub method: String,
    pub note: Option<String>,
}

// Amounts are stored as TEXT so the exact decimal survives the round trip.
fn decode_amount(row: &SqliteRow) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get("amount")?;
    raw.parse::<Decimal>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })
}

impl<'r> FromRow<'r, SqliteRow> for Sale {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Sale {
            id: row.try_get("id")?,
            date: row.try_get("date")?,
            client_id: row.try_get("client_id")?,
            amount: decode_amount(row)?,
            method: row.try_get("method")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for SaleWithClient {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(SaleWithClient {
            sale: Sale::from_row(row)?,
            client_name: row.try_get("client_name")?,
        })
    }
}

impl Sale {
    pub async fn find_all_with_client(
        pool: &SqlitePool,
    ) -> Result<Vec<SaleWithClient>, sqlx::Error> {
        sqlx::query_as::<_, SaleWithClient>(
            r#"SELECT s.id, s.date, s.client_id, s.amount, s.method, s.note,
                      s.created_at, s.updated_at, c.client_name
               FROM sales s
               JOIN clients c ON c.id = s.client_id
               ORDER BY s.date DESC, s.created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id_with_client(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<SaleWithClient>, sqlx::Error> {
        sqlx::query_as::<_, SaleWithClient>(
            r#"SELECT s.id, s.date, s.client_id, s.amount, s.method, s.note,
                      s.created_at, s.updated_at, c.client_name
               FROM sales s
               JOIN clients c ON c.id = s.client_id
               WHERE s.id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sale>(
            r#"SELECT id, date, client_id, amount, method, note, created_at, updated_at
               FROM sales
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateSale,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Sale>(
            r#"INSERT INTO sales (id, date, client_id, amount, method, note)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, date, client_id, amount, method, note, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.date)
        .bind(data.client_id)
        .bind(data.amount.to_string())
        .bind(&data.method)
        .bind(&data.note)
        .fetch_one(pool)
        .await
    }

    /// Insert all records with one multi-row statement. Returns the number of rows written.
    pub async fn create_batch(pool: &SqlitePool, records: &[CreateSale]) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO sales (id, date, client_id, amount, method, note) ",
        );
        builder.push_values(records, |mut row, record| {
            row.push_bind(Uuid::new_v4())
                .push_bind(record.date)
                .push_bind(record.client_id)
                .push_bind(record.amount.to_string())
                .push_bind(&record.method)
                .push_bind(&record.note);
        });

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateSale,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sale>(
            r#"UPDATE sales
               SET date = $2,
                   client_id = $3,
                   amount = $4,
                   method = $5,
                   note = $6,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, date, client_id, amount, method, note, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.date)
        .bind(data.client_id)
        .bind(data.amount.to_string())
        .bind(&data.method)
        .bind(&data.note)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Deletes in chunks of at most `SQLITE_MAX_VARIABLES` ids, all inside one transaction.
    pub async fn delete_many(pool: &SqlitePool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut deleted = 0;
        for chunk in ids.chunks(SQLITE_MAX_VARIABLES) {
            let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM sales WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            deleted += builder.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales")
            .fetch_one(pool)
            .await
    }
}
