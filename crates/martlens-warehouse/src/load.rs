//! Schema & load stage: truncate-then-load of the star tables from injected
//! data sources.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::duckdb::AccessMode;
use crate::records::{CustomerRecord, ProductRecord, SaleRecord, StarRecord};
use crate::schema::StarTable;
use crate::{finalize_transaction, Warehouse};

/// Errors raised while loading one star table. Every variant names the table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be opened or read.
    #[error("{table}: cannot read source '{origin}': {error}")]
    SourceUnavailable {
        table: StarTable,
        origin: String,
        #[source]
        error: std::io::Error,
    },

    /// A row has the wrong column count or a value of the wrong type.
    #[error("{table}: malformed row at line {line} of '{origin}': {message}")]
    MalformedRow {
        table: StarTable,
        origin: String,
        line: u64,
        message: String,
    },

    /// The database rejected a row.
    #[error("{table}: insert failed: {error}")]
    Insert {
        table: StarTable,
        #[source]
        error: ::duckdb::Error,
    },

    /// Truncating or committing the table failed.
    #[error("{table}: {error}")]
    Database {
        table: StarTable,
        #[source]
        error: ::duckdb::Error,
    },
}

impl LoadError {
    /// The table whose load was aborted.
    #[must_use]
    pub fn table(&self) -> StarTable {
        match self {
            Self::SourceUnavailable { table, .. }
            | Self::MalformedRow { table, .. }
            | Self::Insert { table, .. }
            | Self::Database { table, .. } => *table,
        }
    }
}

/// A delimited text source with a header row.
pub trait DataSource: Send + Sync {
    /// Human-readable origin (path, label) used in errors and reports.
    fn origin(&self) -> String;

    /// Open a fresh reader over the whole source.
    ///
    /// # Errors
    /// Returns an error if the source cannot be opened.
    fn open(&self) -> std::io::Result<Box<dyn Read + '_>>;
}

/// A CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for CsvFile {
    fn origin(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// CSV text held in memory.
#[derive(Debug, Clone)]
pub struct CsvText {
    label: String,
    text: String,
}

impl CsvText {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl DataSource for CsvText {
    fn origin(&self) -> String {
        self.label.clone()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.text.as_bytes())))
    }
}

/// A one-shot CSV stream (stdin, a socket, a decompressor).
///
/// The stream is consumed by the first [`DataSource::open`]; later opens
/// yield an empty reader.
pub struct CsvStream {
    label: String,
    reader: Mutex<Option<Box<dyn Read + Send>>>,
}

impl CsvStream {
    pub fn new(label: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            label: label.into(),
            reader: Mutex::new(Some(Box::new(reader))),
        }
    }
}

impl DataSource for CsvStream {
    fn origin(&self) -> String {
        self.label.clone()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        let mut slot = self
            .reader
            .lock()
            .map_err(|_| std::io::Error::other("csv stream mutex poisoned"))?;
        match slot.take() {
            Some(reader) => Ok(reader),
            None => Ok(Box::new(std::io::empty())),
        }
    }
}

/// The three sources of one load run.
pub struct LoadSources {
    pub customers: Box<dyn DataSource>,
    pub products: Box<dyn DataSource>,
    pub sales: Box<dyn DataSource>,
}

impl LoadSources {
    /// Sources backed by three CSV files.
    pub fn from_paths(
        customers: impl Into<PathBuf>,
        products: impl Into<PathBuf>,
        sales: impl Into<PathBuf>,
    ) -> Self {
        Self {
            customers: Box::new(CsvFile::new(customers)),
            products: Box::new(CsvFile::new(products)),
            sales: Box::new(CsvFile::new(sales)),
        }
    }
}

/// Outcome of loading one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableLoadOutcome {
    pub table: StarTable,
    pub origin: String,
    pub rows_loaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report from one run of the load stage.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub tables: Vec<TableLoadOutcome>,
}

impl LoadReport {
    /// Whether every table loaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tables.iter().all(|outcome| outcome.error.is_none())
    }

    /// Tables whose load was aborted.
    #[must_use]
    pub fn failed_tables(&self) -> Vec<StarTable> {
        self.tables
            .iter()
            .filter(|outcome| outcome.error.is_some())
            .map(|outcome| outcome.table)
            .collect()
    }

    /// Total rows loaded across all tables.
    #[must_use]
    pub fn rows_loaded(&self) -> usize {
        self.tables.iter().map(|outcome| outcome.rows_loaded).sum()
    }
}

impl Warehouse {
    /// Run the load stage for all three tables.
    ///
    /// Tables load independently: a failed table is left empty and recorded
    /// in the report while the others still load.
    pub fn load_star(&self, sources: &LoadSources) -> LoadReport {
        let mut tables = Vec::with_capacity(StarTable::ALL.len());
        tables.push(self.load_outcome::<CustomerRecord>(sources.customers.as_ref()));
        tables.push(self.load_outcome::<ProductRecord>(sources.products.as_ref()));
        tables.push(self.load_outcome::<SaleRecord>(sources.sales.as_ref()));

        let report = LoadReport { tables };
        info!(
            rows = report.rows_loaded(),
            complete = report.is_complete(),
            "load stage finished"
        );
        report
    }

    /// Truncate one table and load every row of `source` into it.
    ///
    /// # Errors
    /// Returns a [`LoadError`] naming the table if the source is missing or
    /// malformed, or if a row is rejected. The table is left empty.
    pub fn load_table<R: StarRecord>(&self, source: &dyn DataSource) -> Result<usize, LoadError> {
        let origin = source.origin();
        debug!(table = %R::TABLE, origin = %origin, "reading source");
        match read_records::<R>(source) {
            Ok(records) => self.load_records(&records),
            Err(error) => {
                self.truncate(R::TABLE)?;
                Err(error)
            }
        }
    }

    /// Truncate one table and insert `records` in a single transaction.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if a record is rejected; the table is left
    /// empty.
    pub fn load_records<R: StarRecord>(&self, records: &[R]) -> Result<usize, LoadError> {
        let table = R::TABLE;
        let database = |error: ::duckdb::Error| LoadError::Database { table, error };

        self.truncate(table)?;

        let connection = self
            .manager
            .acquire(AccessMode::ReadWrite)
            .map_err(database)?;
        connection.execute_batch("BEGIN TRANSACTION").map_err(database)?;
        let result = (|| -> Result<usize, ::duckdb::Error> {
            let mut statement = connection.prepare(R::INSERT_SQL)?;
            for record in records {
                record.insert(&mut statement)?;
            }
            Ok(records.len())
        })();

        let rows = finalize_transaction(&connection, result)
            .map_err(|error| LoadError::Insert { table, error })?;
        info!(table = %table, rows, "table loaded");
        Ok(rows)
    }

    fn load_outcome<R: StarRecord>(&self, source: &dyn DataSource) -> TableLoadOutcome {
        let origin = source.origin();
        match self.load_table::<R>(source) {
            Ok(rows_loaded) => TableLoadOutcome {
                table: R::TABLE,
                origin,
                rows_loaded,
                error: None,
            },
            Err(error) => {
                warn!(table = %R::TABLE, %error, "table load aborted");
                TableLoadOutcome {
                    table: R::TABLE,
                    origin,
                    rows_loaded: 0,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    fn truncate(&self, table: StarTable) -> Result<(), LoadError> {
        let database = |error: ::duckdb::Error| LoadError::Database { table, error };
        let connection = self
            .manager
            .acquire(AccessMode::ReadWrite)
            .map_err(database)?;
        let sql = format!("TRUNCATE {}", table.qualified_name());
        connection.execute_batch(sql.as_str()).map_err(database)
    }
}

/// Parse every row of `source` into records, positionally.
///
/// # Errors
/// Returns a [`LoadError`] on a missing source, a header with the wrong
/// column count, or any row that does not deserialize.
pub fn read_records<R: StarRecord>(source: &dyn DataSource) -> Result<Vec<R>, LoadError> {
    let table = R::TABLE;
    let origin = source.origin();
    let reader = source
        .open()
        .map_err(|error| LoadError::SourceUnavailable {
            table,
            origin: origin.clone(),
            error,
        })?;

    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let malformed = |line: u64, message: String| LoadError::MalformedRow {
        table,
        origin: origin.clone(),
        line,
        message,
    };

    let header_len = csv
        .headers()
        .map_err(|error| classify_csv_error(error, &malformed, table, &origin))?
        .len();
    let expected = table.columns().len();
    if header_len != expected {
        return Err(malformed(
            1,
            format!("expected {expected} columns, found {header_len}"),
        ));
    }

    let mut records = Vec::new();
    for row in csv.records() {
        let row = row.map_err(|error| classify_csv_error(error, &malformed, table, &origin))?;
        let line = row.position().map_or(0, csv::Position::line);
        let record = row
            .deserialize::<R>(None)
            .map_err(|error| malformed(line, error.to_string()))?;
        records.push(record);
    }

    Ok(records)
}

fn classify_csv_error(
    error: csv::Error,
    malformed: &dyn Fn(u64, String) -> LoadError,
    table: StarTable,
    origin: &str,
) -> LoadError {
    let line = error.position().map_or(0, csv::Position::line);
    if error.is_io_error() {
        if let csv::ErrorKind::Io(io) = error.into_kind() {
            return LoadError::SourceUnavailable {
                table,
                origin: origin.to_string(),
                error: io,
            };
        }
        return malformed(line, String::from("i/o error"));
    }
    malformed(line, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WarehouseConfig;

    const CUSTOMERS: &str = "\
customer_key,customer_id,customer_number,first_name,last_name,country,marital_status,gender,birthdate,create_date
1,11000,AW00011000,Jon,Yang,Australia,Married,Male,1971-10-06,2025-10-06
2,11001,AW00011001,Eugene,Huang,Australia,Single,Male,,2025-10-06
";

    fn warehouse() -> Warehouse {
        Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open")
    }

    #[test]
    fn reads_records_positionally_with_empty_fields_as_null() {
        let source = CsvText::new("customers.csv", CUSTOMERS);
        let records = read_records::<CustomerRecord>(&source).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first_name.as_deref(), Some("Jon"));
        assert_eq!(records[1].birthdate, None);
    }

    #[test]
    fn header_with_wrong_column_count_is_malformed() {
        let source = CsvText::new("customers.csv", "customer_key,customer_id\n1,2\n");
        let error = read_records::<CustomerRecord>(&source).expect_err("malformed");
        assert!(matches!(
            error,
            LoadError::MalformedRow { table: StarTable::DimCustomers, line: 1, .. }
        ));
    }

    #[test]
    fn type_mismatch_reports_the_line() {
        let text = format!("{CUSTOMERS}three,11002,AW00011002,Ruben,Torres,Australia,Married,Male,1971-02-09,2025-10-06\n");
        let source = CsvText::new("customers.csv", text);
        let error = read_records::<CustomerRecord>(&source).expect_err("type mismatch");
        match error {
            LoadError::MalformedRow { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let source = CsvFile::new("/definitely/not/here/customers.csv");
        let error = read_records::<CustomerRecord>(&source).expect_err("missing");
        assert!(matches!(error, LoadError::SourceUnavailable { .. }));
        assert_eq!(error.table(), StarTable::DimCustomers);
    }

    #[test]
    fn stream_source_is_consumed_once() {
        let stream = CsvStream::new("stdin", Cursor::new(CUSTOMERS.as_bytes().to_vec()));
        let first = read_records::<CustomerRecord>(&stream).expect("first read");
        assert_eq!(first.len(), 2);
        let second = read_records::<CustomerRecord>(&stream).expect_err("drained");
        assert!(matches!(second, LoadError::MalformedRow { .. }));
    }

    #[test]
    fn failed_load_leaves_table_empty() {
        let warehouse = warehouse();
        let good = CsvText::new("customers.csv", CUSTOMERS);
        assert_eq!(warehouse.load_table::<CustomerRecord>(&good).expect("load"), 2);

        let bad = CsvText::new("customers.csv", "customer_key\n1\n");
        warehouse
            .load_table::<CustomerRecord>(&bad)
            .expect_err("malformed source");
        assert_eq!(
            warehouse.count_rows(StarTable::DimCustomers).expect("count"),
            0
        );
    }

    #[test]
    fn out_of_range_value_is_an_insert_error() {
        let warehouse = warehouse();
        let sales = vec![SaleRecord {
            order_number: Some(String::from("SO43697")),
            product_key: Some(20),
            customer_key: Some(10769),
            order_date: None,
            shipping_date: None,
            due_date: None,
            sales_amount: Some(3578),
            quantity: Some(1_000),
            price: Some(3578),
        }];

        let error = warehouse.load_records(&sales).expect_err("tinyint overflow");
        assert!(matches!(error, LoadError::Insert { table: StarTable::FactSales, .. }));
        assert_eq!(warehouse.count_rows(StarTable::FactSales).expect("count"), 0);
    }
}
