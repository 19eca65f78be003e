pub mod client_resolver;
pub mod clients;
pub mod csv_records;
pub mod date_normalizer;
pub mod sales;
pub mod sales_export;
pub mod sales_import;
