//! CSV sales import: reconciles uploaded rows against existing clients and
//! writes the accepted ones in batches.
//!
//! The import runs in two phases so that the decision to create unknown
//! clients stays with the caller:
//! 1. [`SalesImporter::plan`] parses the file, resolves clients and dates, and
//!    reports which client names are unknown.
//! 2. [`SalesImporter::commit`] creates the approved clients, retries the rows
//!    that were waiting on them, and inserts everything that resolved.

use std::str::FromStr;

use chrono::NaiveDate;
use db::models::{
    client::{Client, MAX_CLIENTS_PER_INSERT},
    sale::{CreateSale, MAX_SALES_PER_INSERT, Sale},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    client_resolver::{
        CLIENT_COLUMNS, ClientMatch, ClientSnapshot, NewClientCandidates, resolve_client,
    },
    csv_records::{CsvRow, CsvTable, RecordParseError, field},
    date_normalizer::normalize_date,
};

/// Rows per INSERT statement when writing sales
pub const DEFAULT_SALE_BATCH_SIZE: usize = 10;
/// Clients per INSERT statement when creating missing clients
pub const DEFAULT_CLIENT_BATCH_SIZE: usize = 10;

/// Keeps a sale batch between one row and what a single INSERT can bind.
pub fn clamp_sale_batch_size(size: usize) -> usize {
    size.clamp(1, MAX_SALES_PER_INSERT)
}

pub fn clamp_client_batch_size(size: usize) -> usize {
    size.clamp(1, MAX_CLIENTS_PER_INSERT)
}

/// Row number reported for the first data row (the header is row 1)
const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] RecordParseError),
    #[error("CSV is missing required fields: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("batch {batch} failed after {inserted} rows were written: {source}")]
    BatchFailed {
        batch: usize,
        inserted: u64,
        #[source]
        source: sqlx::Error,
    },
}

/// A row whose client name was unknown during the first pass
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredRow {
    pub row_number: usize,
    pub client_name: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub method: String,
    pub note: Option<String>,
}

impl DeferredRow {
    fn into_record(self, client_id: Uuid) -> CreateSale {
        CreateSale {
            date: self.date,
            client_id,
            amount: self.amount,
            method: self.method,
            note: self.note,
        }
    }
}

/// Outcome of the first pass. Holds everything `commit` needs, so nothing
/// about an import lives outside this value.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub total_rows: usize,
    pub write_ready: Vec<CreateSale>,
    pub deferred: Vec<DeferredRow>,
    /// Every row not (yet) write-ready, deferred rows included
    pub skipped_rows: Vec<usize>,
    pub pending_new_clients: Vec<String>,
    snapshot: ClientSnapshot,
}

impl ImportPlan {
    pub fn preview(&self) -> ImportPreview {
        ImportPreview {
            total_rows: self.total_rows,
            write_ready: self.write_ready.len(),
            skipped_rows: self.skipped_rows.clone(),
            pending_new_clients: self.pending_new_clients.clone(),
        }
    }
}

/// What an upload would do, shown to the operator before committing
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub total_rows: usize,
    pub write_ready: usize,
    pub skipped_rows: Vec<usize>,
    pub pending_new_clients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewClientStats {
    pub total: usize,
    pub added: usize,
}

/// Result of a committed import
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success: bool,
    pub count: usize,
    pub skipped_rows: Vec<usize>,
    pub new_clients: Option<NewClientStats>,
    pub batches: usize,
}

/// Fail unless the header names a client column plus `date`, `amount` and `method`.
pub fn check_required_columns(table: &CsvTable) -> Result<(), ImportError> {
    let mut missing = Vec::new();
    if !CLIENT_COLUMNS.iter().any(|c| table.has_column(c)) {
        missing.push(CLIENT_COLUMNS.join(" or "));
    }
    for column in ["date", "amount", "method"] {
        if !table.has_column(column) {
            missing.push(column.to_string());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingColumns(missing))
    }
}

/// Unparseable amounts are recorded as zero.
fn parse_amount(raw: Option<&str>) -> Decimal {
    raw.and_then(|value| {
        Decimal::from_str(value)
            .or_else(|_| Decimal::from_scientific(value))
            .ok()
    })
    .unwrap_or(Decimal::ZERO)
}

/// First pass over every row: resolve client and date, sort rows into
/// write-ready, deferred or skipped.
pub fn build_plan(table: &CsvTable, snapshot: ClientSnapshot) -> ImportPlan {
    let mut write_ready = Vec::new();
    let mut deferred = Vec::new();
    let mut skipped_rows = Vec::new();
    let mut candidates = NewClientCandidates::default();

    for (index, row) in table.rows.iter().enumerate() {
        let row_number = index + FIRST_DATA_ROW;

        match resolve_client(row, &snapshot) {
            ClientMatch::Missing => {
                debug!(row = row_number, "Import: row has no client reference");
                skipped_rows.push(row_number);
            }
            ClientMatch::Resolved(client_id) => match row_date(row, row_number) {
                Some(date) => {
                    let (amount, method, note) = row_values(row);
                    write_ready.push(CreateSale {
                        date,
                        client_id,
                        amount,
                        method,
                        note,
                    });
                }
                None => skipped_rows.push(row_number),
            },
            ClientMatch::NewClient(client_name) => {
                skipped_rows.push(row_number);
                if let Some(date) = row_date(row, row_number) {
                    let (amount, method, note) = row_values(row);
                    candidates.record(&client_name);
                    deferred.push(DeferredRow {
                        row_number,
                        client_name,
                        date,
                        amount,
                        method,
                        note,
                    });
                }
            }
        }
    }

    ImportPlan {
        total_rows: table.rows.len(),
        write_ready,
        deferred,
        skipped_rows,
        pending_new_clients: candidates.into_names(),
        snapshot,
    }
}

fn row_date(row: &CsvRow, row_number: usize) -> Option<NaiveDate> {
    match field(row, "date").map(normalize_date) {
        Some(Ok(date)) => Some(date),
        Some(Err(e)) => {
            debug!(row = row_number, error = %e, "Import: skipping row");
            None
        }
        None => {
            debug!(row = row_number, "Import: row has no date");
            None
        }
    }
}

fn row_values(row: &CsvRow) -> (Decimal, String, Option<String>) {
    (
        parse_amount(field(row, "amount")),
        field(row, "method").unwrap_or_default().to_string(),
        field(row, "note").map(str::to_string),
    )
}

/// Sizes of the chunks `records` rows are written in.
pub fn batch_sizes(records: usize, batch_size: usize) -> Vec<usize> {
    let batch_size = batch_size.max(1);
    (0..records)
        .step_by(batch_size)
        .map(|start| batch_size.min(records - start))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: u64,
    pub batches: usize,
}

/// Writes sales sequentially in fixed-size chunks. Each chunk is one
/// statement; nothing spans chunks, so earlier chunks stay written when a
/// later one fails.
pub struct BatchWriter<'a> {
    pool: &'a SqlitePool,
    batch_size: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(pool: &'a SqlitePool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: clamp_sale_batch_size(batch_size),
        }
    }

    pub async fn write(&self, records: &[CreateSale]) -> Result<BatchOutcome, ImportError> {
        let mut outcome = BatchOutcome::default();

        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let batch = index + 1;
            match Sale::create_batch(self.pool, chunk).await {
                Ok(written) => {
                    outcome.inserted += written;
                    outcome.batches = batch;
                    debug!(batch, rows = written, total = outcome.inserted, "Import: batch written");
                }
                Err(source) => {
                    error!(
                        batch,
                        inserted = outcome.inserted,
                        error = %source,
                        "Import: batch failed, remaining batches abandoned"
                    );
                    return Err(ImportError::BatchFailed {
                        batch,
                        inserted: outcome.inserted,
                        source,
                    });
                }
            }
        }

        Ok(outcome)
    }
}

/// Service running sales CSV imports against the database
#[derive(Debug, Clone)]
pub struct SalesImporter {
    pool: SqlitePool,
    sale_batch_size: usize,
    client_batch_size: usize,
}

impl SalesImporter {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_batch_sizes(pool, DEFAULT_SALE_BATCH_SIZE, DEFAULT_CLIENT_BATCH_SIZE)
    }

    pub fn with_batch_sizes(pool: SqlitePool, sale_batch_size: usize, client_batch_size: usize) -> Self {
        Self {
            pool,
            sale_batch_size: clamp_sale_batch_size(sale_batch_size),
            client_batch_size: clamp_client_batch_size(client_batch_size),
        }
    }

    /// Phase one. Validates the header before reading any client, so a
    /// structurally broken file never touches storage.
    pub async fn plan(&self, text: &str) -> Result<ImportPlan, ImportError> {
        let table = CsvTable::parse(text)?;
        check_required_columns(&table)?;

        let snapshot = ClientSnapshot::from_options(Client::find_options(&self.pool).await?);
        let plan = build_plan(&table, snapshot);

        info!(
            rows = plan.total_rows,
            write_ready = plan.write_ready.len(),
            deferred = plan.deferred.len(),
            skipped = plan.skipped_rows.len() - plan.deferred.len(),
            new_clients = plan.pending_new_clients.len(),
            "Import: planned"
        );
        Ok(plan)
    }

    /// Phase two. Only names both pending and in `approved_new_clients`
    /// (compared case-insensitively) are created.
    pub async fn commit(
        &self,
        plan: ImportPlan,
        approved_new_clients: &[String],
    ) -> Result<ImportSummary, ImportError> {
        let ImportPlan {
            mut write_ready,
            deferred,
            mut skipped_rows,
            pending_new_clients,
            mut snapshot,
            ..
        } = plan;

        let approved: Vec<String> = approved_new_clients
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        let to_create: Vec<String> = pending_new_clients
            .iter()
            .filter(|name| approved.contains(&name.to_lowercase()))
            .cloned()
            .collect();

        let mut added = 0;
        for chunk in to_create.chunks(self.client_batch_size) {
            let created = Client::create_many_with_defaults(&self.pool, chunk).await?;
            added += created.len();
            for client in created {
                info!(client_id = %client.id, client_name = %client.client_name, "Import: created client");
                snapshot.insert(client.id, client.client_name);
            }
        }

        // Second pass: rows whose client now exists leave the skip list.
        for row in deferred {
            match snapshot.resolve_name(&row.client_name) {
                Some(client_id) => {
                    skipped_rows.retain(|n| *n != row.row_number);
                    write_ready.push(row.into_record(client_id));
                }
                None => debug!(
                    row = row.row_number,
                    client_name = %row.client_name,
                    "Import: client not created, row stays skipped"
                ),
            }
        }
        skipped_rows.sort_unstable();

        let outcome = BatchWriter::new(&self.pool, self.sale_batch_size)
            .write(&write_ready)
            .await?;

        let new_clients = (!pending_new_clients.is_empty()).then(|| NewClientStats {
            total: pending_new_clients.len(),
            added,
        });

        info!(
            inserted = outcome.inserted,
            batches = outcome.batches,
            skipped = skipped_rows.len(),
            clients_added = added,
            "Import: committed"
        );

        Ok(ImportSummary {
            success: true,
            count: outcome.inserted as usize,
            skipped_rows,
            new_clients,
            batches: outcome.batches,
        })
    }

    /// Plan and commit in one call; `create_clients` approves every pending name.
    pub async fn import(&self, text: &str, create_clients: bool) -> Result<ImportSummary, ImportError> {
        let plan = self.plan(text).await?;
        let approved = if create_clients {
            plan.pending_new_clients.clone()
        } else {
            Vec::new()
        };
        self.commit(plan, &approved).await
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::client::{ClientOption, CreateClient},
    };

    use super::*;

    async fn setup() -> (DBService, Client) {
        let db = DBService::new_in_memory().await.unwrap();
        let client = Client::create(&db.pool, Uuid::new_v4(), &CreateClient::named("Acme"))
            .await
            .unwrap();
        (db, client)
    }

    fn snapshot_of(client: &Client) -> ClientSnapshot {
        ClientSnapshot::from_options([ClientOption {
            id: client.id,
            client_name: client.client_name.clone(),
        }])
    }

    #[test]
    fn batch_sizes_split_evenly_with_remainder() {
        assert_eq!(batch_sizes(25, 10), vec![10, 10, 5]);
        assert_eq!(batch_sizes(20, 10), vec![10, 10]);
        assert_eq!(batch_sizes(0, 10), Vec::<usize>::new());
        assert_eq!(batch_sizes(3, 0), vec![1, 1, 1]);
    }

    #[test]
    fn missing_amount_column_is_reported() {
        let table = CsvTable::parse("date,client,method\n").unwrap();
        match check_required_columns(&table) {
            Err(ImportError::MissingColumns(missing)) => assert_eq!(missing, vec!["amount"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn any_client_column_satisfies_the_header() {
        for header in ["clientId,date,amount,method", "clientName,date,amount,method", "client,date,amount,method"] {
            let table = CsvTable::parse(header).unwrap();
            assert!(check_required_columns(&table).is_ok(), "{header}");
        }
        let table = CsvTable::parse("date,amount,method").unwrap();
        assert!(check_required_columns(&table).is_err());
    }

    #[test]
    fn amounts_default_to_zero() {
        assert_eq!(parse_amount(Some("12.50")).to_string(), "12.50");
        assert_eq!(parse_amount(Some("abc")), Decimal::ZERO);
        assert_eq!(parse_amount(None), Decimal::ZERO);
    }

    #[tokio::test]
    async fn first_pass_sorts_rows() {
        let (_db, client) = setup().await;
        let csv = "date,client,amount,method,note\n\
                   2024-01-05,acme,10.00,Cash,\n\
                   02/30/2024,Acme,5,Cash,bad date\n\
                   01/06/2024,Globex,7.5,Card,new client\n\
                   2024-01-07,,3,Cash,no client\n";
        let table = CsvTable::parse(csv).unwrap();
        let plan = build_plan(&table, snapshot_of(&client));

        assert_eq!(plan.total_rows, 4);
        assert_eq!(plan.write_ready.len(), 1);
        assert_eq!(plan.write_ready[0].client_id, client.id);
        assert_eq!(plan.write_ready[0].note, None);
        assert_eq!(plan.skipped_rows, vec![3, 4, 5]);
        assert_eq!(plan.deferred.len(), 1);
        assert_eq!(plan.deferred[0].row_number, 4);
        assert_eq!(plan.deferred[0].date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(plan.pending_new_clients, vec!["Globex"]);
    }

    #[tokio::test]
    async fn all_valid_rows_are_inserted() {
        let (db, client) = setup().await;
        let csv = format!(
            "clientId,date,amount,method\n{id},2024-02-01,10,Cash\n{id},2024-02-02,20,Card\n{id},02/03/2024,30,Cash\n",
            id = client.id
        );

        let summary = SalesImporter::new(db.pool.clone()).import(&csv, false).await.unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                success: true,
                count: 3,
                skipped_rows: vec![],
                new_clients: None,
                batches: 1,
            }
        );
        assert_eq!(Sale::count(&db.pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn impossible_date_is_skipped_not_fatal() {
        let (db, _) = setup().await;
        let csv = "date,client,amount,method\n2024-02-01,Acme,10,Cash\n02/30/2024,Acme,20,Cash\n";

        let summary = SalesImporter::new(db.pool.clone()).import(csv, false).await.unwrap();

        assert_eq!(summary.count, 1);
        assert_eq!(summary.skipped_rows, vec![3]);
    }

    #[tokio::test]
    async fn confirmed_new_client_is_created_once() {
        let (db, _) = setup().await;
        let csv = "date,client,amount,method\n\
                   2024-02-01,Globex,10,Cash\n\
                   2024-02-02,GLOBEX,15,Cash\n";
        let importer = SalesImporter::new(db.pool.clone());

        let plan = importer.plan(csv).await.unwrap();
        assert_eq!(plan.skipped_rows, vec![2, 3]);
        assert_eq!(plan.pending_new_clients, vec!["Globex"]);

        let summary = importer
            .commit(plan, &["globex".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.count, 2);
        assert!(summary.skipped_rows.is_empty());
        assert_eq!(summary.new_clients, Some(NewClientStats { total: 1, added: 1 }));

        let globex: Vec<Client> = Client::find_all_by_name(&db.pool)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.client_name.eq_ignore_ascii_case("globex"))
            .collect();
        assert_eq!(globex.len(), 1);
        assert_eq!(globex[0].rate, 1.0);
        assert_eq!(globex[0].no_of_staff, 1);
    }

    #[tokio::test]
    async fn declined_new_client_leaves_rows_skipped() {
        let (db, _) = setup().await;
        let csv = "date,client,amount,method\n2024-02-01,Globex,10,Cash\n2024-02-02,Acme,5,Cash\n";

        let summary = SalesImporter::new(db.pool.clone()).import(csv, false).await.unwrap();

        assert_eq!(summary.count, 1);
        assert_eq!(summary.skipped_rows, vec![2]);
        assert_eq!(summary.new_clients, Some(NewClientStats { total: 1, added: 0 }));
        assert_eq!(Client::find_all_by_name(&db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_amount_column_writes_nothing() {
        let (db, _) = setup().await;
        let csv = "date,client,method\n2024-02-01,Acme,Cash\n2024-02-01,Globex,Cash\n";

        let err = SalesImporter::new(db.pool.clone()).import(csv, true).await.unwrap_err();

        assert!(matches!(err, ImportError::MissingColumns(_)));
        assert_eq!(Sale::count(&db.pool).await.unwrap(), 0);
        assert_eq!(Client::find_all_by_name(&db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn twenty_five_rows_take_three_batches() {
        let (db, client) = setup().await;
        let mut csv = String::from("clientName,date,amount,method\n");
        for day in 1..=25 {
            csv.push_str(&format!("{},2024-03-{:02},{}.00,Cash\n", client.client_name, day, day));
        }

        let importer = SalesImporter::with_batch_sizes(db.pool.clone(), 10, 10);
        let summary = importer.import(&csv, false).await.unwrap();

        assert_eq!(summary.count, 25);
        assert_eq!(summary.batches, 3);
        assert_eq!(Sale::count(&db.pool).await.unwrap(), 25);
    }

    #[test]
    fn batch_sizes_are_clamped_to_statement_limits() {
        assert_eq!(clamp_sale_batch_size(0), 1);
        assert_eq!(clamp_sale_batch_size(6000), MAX_SALES_PER_INSERT);
        assert_eq!(clamp_client_batch_size(usize::MAX), MAX_CLIENTS_PER_INSERT);
        assert_eq!(clamp_client_batch_size(10), 10);
    }

    #[tokio::test]
    async fn oversized_batch_setting_still_imports() {
        let (db, client) = setup().await;
        let mut csv = String::from("clientId,date,amount,method\n");
        for _ in 0..6000 {
            csv.push_str(&format!("{},2024-03-01,1,Cash\n", client.id));
        }

        let importer = SalesImporter::with_batch_sizes(db.pool.clone(), 6000, 10);
        let summary = importer.import(&csv, false).await.unwrap();

        assert_eq!(summary.count, 6000);
        assert_eq!(summary.batches, 2);
        assert_eq!(Sale::count(&db.pool).await.unwrap(), 6000);
    }

    #[tokio::test]
    async fn failed_batch_keeps_earlier_batches() {
        let (db, client) = setup().await;
        let good = CreateSale {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            client_id: client.id,
            amount: Decimal::ONE,
            method: "Cash".to_string(),
            note: None,
        };
        let orphan = CreateSale {
            client_id: Uuid::new_v4(),
            ..good.clone()
        };
        let records = vec![good.clone(), good.clone(), orphan, good];

        let err = BatchWriter::new(&db.pool, 2).write(&records).await.unwrap_err();

        match err {
            ImportError::BatchFailed { batch, inserted, .. } => {
                assert_eq!(batch, 2);
                assert_eq!(inserted, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Sale::count(&db.pool).await.unwrap(), 2);
    }
}
