//! Reads uploaded CSV text into header-keyed rows.

use std::{collections::HashMap, io::Read};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

/// Header labels written by the sales export, mapped to the import column they feed.
/// Lets an export be uploaded again without editing its header.
const EXPORT_HEADER_ALIASES: &[(&str, &str)] = &[
    ("Sale ID", "id"),
    ("Date", "date"),
    ("Client ID", "clientId"),
    ("Client Name", "clientName"),
    ("Amount", "amount"),
    ("Payment Method", "method"),
    ("Note", "note"),
];

#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV file has no header row")]
    MissingHeader,
}

/// One data row, keyed by (canonical) column name
pub type CsvRow = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

fn canonical_header(raw: &str) -> String {
    EXPORT_HEADER_ALIASES
        .iter()
        .find(|(label, _)| *label == raw)
        .map(|(_, column)| (*column).to_string())
        .unwrap_or_else(|| raw.to_string())
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self, RecordParseError> {
        Self::from_reader(text.as_bytes())
    }

    /// Parse comma-separated data with a header row. Values are trimmed and
    /// rows whose every field is empty are dropped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RecordParseError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(canonical_header).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(RecordParseError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let row: CsvRow = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Fetch a non-empty value from a row.
pub fn field<'a>(row: &'a CsvRow, column: &str) -> Option<&'a str> {
    row.get(column).map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_trims_values() {
        let table = CsvTable::parse("date, client ,amount\n 2024-01-02 , Acme ,  5 \n").unwrap();
        assert_eq!(table.headers, vec!["date", "client", "amount"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["client"], "Acme");
        assert_eq!(table.rows[0]["amount"], "5");
    }

    #[test]
    fn skips_blank_lines() {
        let table = CsvTable::parse("date,amount\n\n2024-01-02,5\n,\n\n2024-01-03,6\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["date"], "2024-01-03");
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let err = CsvTable::parse("date,amount\n2024-01-02,5,extra\n").unwrap_err();
        assert!(matches!(err, RecordParseError::Csv(_)));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(
            CsvTable::parse("").unwrap_err(),
            RecordParseError::MissingHeader
        ));
    }

    #[test]
    fn export_labels_map_to_import_columns() {
        let table =
            CsvTable::parse("Sale ID,Date,Client ID,Client Name,Amount,Payment Method,Note\n")
                .unwrap();
        assert_eq!(
            table.headers,
            vec!["id", "date", "clientId", "clientName", "amount", "method", "note"]
        );
        assert!(table.rows.is_empty());
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let table = CsvTable::parse("DATE,amount\n").unwrap();
        assert!(!table.has_column("date"));
        assert!(table.has_column("amount"));
    }

    #[test]
    fn field_ignores_empty_values() {
        let table = CsvTable::parse("note,method\n,Cash\n").unwrap();
        assert_eq!(field(&table.rows[0], "note"), None);
        assert_eq!(field(&table.rows[0], "method"), Some("Cash"));
        assert_eq!(field(&table.rows[0], "missing"), None);
    }
}
