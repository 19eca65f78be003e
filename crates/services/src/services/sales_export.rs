//! CSV export of all sales and the blank import template.

use chrono::NaiveDate;
use csv::WriterBuilder;
use db::models::sale::{Sale, SaleWithClient};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const EXPORT_HEADERS: [&str; 7] = [
    "Sale ID",
    "Date",
    "Client ID",
    "Client Name",
    "Amount",
    "Payment Method",
    "Note",
];

pub const TEMPLATE_HEADERS: [&str; 5] = ["date", "client", "amount", "method", "note"];

pub const TEMPLATE_FILENAME: &str = "sales-import-template.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: Uuid,
    date: String,
    client_id: Uuid,
    client_name: &'a str,
    amount: String,
    method: &'a str,
    note: Option<&'a str>,
}

impl<'a> From<&'a SaleWithClient> for ExportRow<'a> {
    fn from(sale: &'a SaleWithClient) -> Self {
        Self {
            id: sale.id,
            date: sale.date.format("%Y-%m-%d").to_string(),
            client_id: sale.client_id,
            client_name: &sale.client_name,
            amount: sale.amount.to_string(),
            method: &sale.method,
            note: sale.note.as_deref(),
        }
    }
}

pub fn export_filename(today: NaiveDate) -> String {
    format!("sales-export-{}.csv", today.format("%Y-%m-%d"))
}

/// Render sales in export column order. The header is written even when there are no sales.
pub fn render_sales_csv(sales: &[SaleWithClient]) -> Result<String, ExportError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(EXPORT_HEADERS)?;
    for sale in sales {
        wtr.serialize(ExportRow::from(sale))?;
    }
    let bytes = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Two example rows showing both accepted date styles.
pub fn render_template_csv(today: NaiveDate) -> Result<String, ExportError> {
    let today = today.format("%Y-%m-%d").to_string();
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(TEMPLATE_HEADERS)?;
    wtr.write_record([
        today.as_str(),
        "Client Name",
        "100.00",
        "Cash",
        "Optional note about the sale",
    ])?;
    wtr.write_record([
        "MM/DD/YYYY",
        "Another Client",
        "250.50",
        "Credit Card",
        "Second example row",
    ])?;
    let bytes = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Load every sale (newest first) and render it as CSV.
pub async fn export_sales(pool: &SqlitePool) -> Result<String, ExportError> {
    let sales = Sale::find_all_with_client(pool).await?;
    let csv = render_sales_csv(&sales)?;
    info!(rows = sales.len(), "Exported sales");
    Ok(csv)
}
