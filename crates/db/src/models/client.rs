use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::SQLITE_MAX_VARIABLES;

/// Rate applied to clients created without an explicit one.
pub const DEFAULT_RATE: f64 = 1.0;
/// Staff count applied to clients created without an explicit one.
pub const DEFAULT_NO_OF_STAFF: i32 = 1;
/// Most clients `create_many_with_defaults` can insert in one statement (4 binds each).
pub const MAX_CLIENTS_PER_INSERT: usize = SQLITE_MAX_VARIABLES / 4;

/// A billable customer. The front end calls these "rates" as well.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub client_name: String,
    pub rate: f64,
    pub no_of_staff: i32,
    pub date: Option<NaiveDate>, // Only set by the rate form
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal projection used to populate client pickers
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientOption {
    pub id: Uuid,
    pub client_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateClient {
    pub client_name: String,
    pub rate: Option<f64>,
    pub no_of_staff: Option<i32>,
    pub date: Option<NaiveDate>,
}

impl CreateClient {
    pub fn named(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            rate: None,
            no_of_staff: None,
            date: None,
        }
    }
}

/// Full-record replacement; every column is overwritten.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClient {
    pub client_name: String,
    pub rate: f64,
    pub no_of_staff: i32,
    pub date: Option<NaiveDate>,
}

impl Client {
    pub async fn find_all_by_name(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"SELECT id, client_name, rate, no_of_staff, date, created_at, updated_at
               FROM clients
               ORDER BY client_name COLLATE NOCASE ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    /// Rates listing order: newest rate date first, undated clients last
    pub async fn find_all_by_date_desc(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"SELECT id, client_name, rate, no_of_staff, date, created_at, updated_at
               FROM clients
               ORDER BY date IS NULL, date DESC, created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_options(pool: &SqlitePool) -> Result<Vec<ClientOption>, sqlx::Error> {
        sqlx::query_as::<_, ClientOption>(
            r#"SELECT id, client_name
               FROM clients
               ORDER BY client_name COLLATE NOCASE ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"SELECT id, client_name, rate, no_of_staff, date, created_at, updated_at
               FROM clients
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateClient,
    ) -> Result<Self, sqlx::Error> {
        let rate = data.rate.unwrap_or(DEFAULT_RATE);
        let no_of_staff = data.no_of_staff.unwrap_or(DEFAULT_NO_OF_STAFF);
        sqlx::query_as::<_, Client>(
            r#"INSERT INTO clients (id, client_name, rate, no_of_staff, date)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, client_name, rate, no_of_staff, date, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.client_name)
        .bind(rate)
        .bind(no_of_staff)
        .bind(data.date)
        .fetch_one(pool)
        .await
    }

    /// Insert one client per name with default rate and staff count, in a single statement.
    pub async fn create_many_with_defaults(
        pool: &SqlitePool,
        names: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("INSERT INTO clients (id, client_name, rate, no_of_staff) ");
        builder.push_values(names, |mut row, name| {
            row.push_bind(Uuid::new_v4())
                .push_bind(name)
                .push_bind(DEFAULT_RATE)
                .push_bind(DEFAULT_NO_OF_STAFF);
        });
        builder.push(" RETURNING id, client_name, rate, no_of_staff, date, created_at, updated_at");

        builder.build_query_as::<Client>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateClient,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"UPDATE clients
               SET client_name = $2,
                   rate = $3,
                   no_of_staff = $4,
                   date = $5,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, client_name, rate, no_of_staff, date, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.client_name)
        .bind(data.rate)
        .bind(data.no_of_staff)
        .bind(data.date)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_sales(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE client_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
