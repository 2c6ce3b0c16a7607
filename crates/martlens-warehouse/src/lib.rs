//! # martlens Warehouse
//!
//! DuckDB-based star-schema warehouse for martlens.
//!
//! ## Overview
//!
//! This crate owns the storage side of martlens: the `gold` star schema,
//! the truncate-then-load stage that fills it from CSV sources, and guarded
//! query execution used by the reporting catalogue.
//!
//! ### Features
//!
//! - **Star schema**: `dim_customers`, `dim_products`, `fact_sales`
//! - **Injected sources**: load from files, in-memory text or any stream
//! - **Shared connections**: pooled connections over one database instance
//! - **Query guardrails**: row caps and timeouts on every read
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use martlens_warehouse::{LoadSources, QueryGuardrails, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!
//!     let report = warehouse.load_star(&LoadSources::from_paths(
//!         "gold.dim_customers.csv",
//!         "gold.dim_products.csv",
//!         "gold.fact_sales.csv",
//!     ));
//!     println!("loaded {} rows", report.rows_loaded());
//!
//!     let result = warehouse.execute_query(
//!         "SELECT COUNT(*) FROM gold.fact_sales",
//!         QueryGuardrails::default(),
//!         false, // read-only mode
//!     )?;
//!     println!("{:?}", result.rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `gold.dim_customers` | Customer dimension |
//! | `gold.dim_products` | Product dimension |
//! | `gold.fact_sales` | Sales transactions |

pub mod duckdb;
pub mod load;
pub mod records;
pub mod schema;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ::duckdb::types::{TimeUnit, Value as DuckValue};
use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tracing::debug;

pub use crate::duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection, Storage};
pub use crate::load::{
    CsvFile, CsvStream, CsvText, DataSource, LoadError, LoadReport, LoadSources,
    TableLoadOutcome,
};
pub use crate::records::{CalendarDate, CustomerRecord, ProductRecord, SaleRecord, StarRecord};
pub use crate::schema::{StarTable, SCHEMA};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Load stage error for one table.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Query was rejected due to policy violation.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Query execution timed out.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for martlens data.
    pub martlens_home: PathBuf,
    /// Database file or in-memory database.
    pub storage: Storage,
    /// Maximum number of idle connections in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let martlens_home = resolve_martlens_home();
        let storage = Storage::File(martlens_home.join("warehouse.duckdb"));
        Self {
            martlens_home,
            storage,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Configuration for a database file at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::File(db_path.into()),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            storage: Storage::InMemory,
            ..Self::default()
        }
    }
}

/// Guardrails for query execution to prevent resource exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    /// Maximum number of rows to return.
    pub max_rows: usize,
    /// Query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    /// Guardrails that return every row, bounded only by time.
    #[must_use]
    pub fn uncapped(query_timeout_ms: u64) -> Self {
        Self {
            max_rows: usize::MAX,
            query_timeout_ms,
        }
    }

    /// Convert to Duration for timeout enforcement.
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    /// Validate that guardrails are within acceptable bounds.
    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Column metadata for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlColumn {
    /// Column name.
    pub name: String,
    /// Column data type.
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a SQL query execution.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Column definitions.
    pub columns: Vec<SqlColumn>,
    /// Row data as JSON values, aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
    /// Number of rows returned.
    pub row_count: usize,
    /// Whether results were truncated due to max_rows limit.
    pub truncated: bool,
}

impl QueryResult {
    /// Index of the column called `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

/// The star-schema warehouse.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration and apply the schema.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.storage.path().and_then(|path| path.parent()) {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.storage.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Create the `gold` schema and any missing table.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        schema::apply_schema(&connection)?;
        Ok(())
    }

    /// Drop and recreate every star table.
    pub fn reset_schema(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        schema::recreate_schema(&connection)?;
        debug!(storage = %self.config.storage.label(), "star schema recreated");
        Ok(())
    }

    /// Storage backing this warehouse.
    pub fn storage(&self) -> &Storage {
        self.manager.storage()
    }

    /// Number of rows currently in `table`.
    pub fn count_rows(&self, table: StarTable) -> Result<i64, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let sql = format!("SELECT COUNT(*) FROM {}", table.qualified_name());
        let count = connection.query_row(sql.as_str(), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether `schema.table` exists in the catalog.
    pub fn table_exists(&self, schema: &str, table: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let params: [&dyn ToSql; 2] = [&schema, &table];
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Execute a SQL query with guardrails.
    ///
    /// # Arguments
    /// * `sql` - The SQL query to execute
    /// * `guardrails` - Query execution limits
    /// * `allow_write` - Whether to allow write operations
    ///
    /// # Security
    /// This method enforces read-only statements unless `allow_write` is true.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let connection = self.manager.acquire(mode)?;
        execute_with_guardrails(&connection, sql, &[], guardrails, allow_write)
    }

    /// Execute a read-only parameterized query with guardrails.
    ///
    /// # Security
    /// All caller-provided values are passed as parameters, never interpolated.
    pub fn select(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        guardrails: QueryGuardrails,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;
        enforce_read_only_query(sql)?;

        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        execute_with_guardrails(&connection, sql, params, guardrails, false)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
pub(crate) fn finalize_transaction<T, E>(
    connection: &Connection,
    result: Result<T, E>,
) -> Result<T, E>
where
    E: From<::duckdb::Error>,
{
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Execute a query with guardrails (timeout, row limits).
fn execute_with_guardrails(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
    guardrails: QueryGuardrails,
    allow_write: bool,
) -> Result<QueryResult, WarehouseError> {
    let started = Instant::now();
    if is_select_like(sql) {
        execute_select_query(connection, sql, params, guardrails, started)
    } else if allow_write {
        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        })
    } else {
        Err(WarehouseError::QueryRejected(String::from(
            "only SELECT/CTE queries are allowed unless --write is provided",
        )))
    }
}

/// Execute a SELECT query and collect results.
fn execute_select_query(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let _ = statement.query(params)?;

    // Column metadata is only available once the statement has executed.
    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement
            .column_name(index)
            .map_or_else(|_| format!("column{index}"), ToString::to_string);
        let dtype = statement.column_type(index);
        columns.push(SqlColumn {
            name,
            r#type: dtype.to_string(),
        });
    }

    let mut rows_cursor = statement.query(params)?;
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows_cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }

        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

/// Read a single row from the result set.
fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

/// Convert a DuckDB value to a JSON value.
fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::HugeInt(value) => match i64::try_from(value) {
            Ok(value) => Value::Number(Number::from(value)),
            Err(_) => Value::String(value.to_string()),
        },
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Decimal(value) => value
            .to_string()
            .parse::<f64>()
            .map_or(Value::Null, number_from_f64),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        DuckValue::Date32(days) => date_from_epoch_days(days)
            .map_or(Value::Null, |date| {
                Value::String(CalendarDate::from(date).to_string())
            }),
        DuckValue::Timestamp(unit, value) => timestamp_to_string(unit, value)
            .map_or(Value::Null, Value::String),
        other => Value::String(format!("{other:?}")),
    }
}

/// Convert an f64 to a JSON number, returning Null for NaN/Inf.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn date_from_epoch_days(days: i32) -> Option<Date> {
    Date::from_julian_day(EPOCH_JULIAN_DAY.checked_add(days)?).ok()
}

const EPOCH_JULIAN_DAY: i32 = 2_440_588;

fn timestamp_to_string(unit: TimeUnit, value: i64) -> Option<String> {
    let nanos = match unit {
        TimeUnit::Second => i128::from(value) * 1_000_000_000,
        TimeUnit::Millisecond => i128::from(value) * 1_000_000,
        TimeUnit::Microsecond => i128::from(value) * 1_000,
        TimeUnit::Nanosecond => i128::from(value),
    };
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

/// Normalize a SQL query string.
fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

/// Enforce that a query is read-only (SELECT/CTE only).
fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    Ok(())
}

/// Check if a SQL query starts with a SELECT-like keyword.
fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

/// Check if a SQL string contains multiple statements.
fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

/// Ensure that the query has not exceeded the timeout.
fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}

/// Resolve the martlens home directory from environment or default.
fn resolve_martlens_home() -> PathBuf {
    if let Some(path) = env::var_os("MARTLENS_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".martlens");
    }

    PathBuf::from(".martlens")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn in_memory() -> Warehouse {
        Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open")
    }

    #[test]
    fn initializes_star_tables() {
        let warehouse = in_memory();

        let query = warehouse
            .execute_query(
                "SELECT COUNT(*) AS c FROM information_schema.tables WHERE table_schema = 'gold'",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(query.row_count, 1);
        assert_eq!(query.rows[0][0], Value::from(3));
        assert!(warehouse.table_exists("gold", "fact_sales").expect("exists"));
        assert!(!warehouse.table_exists("gold", "fact_returns").expect("exists"));
    }

    #[test]
    fn opens_file_backed_database_and_creates_parent_dirs() {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("nested").join("warehouse.duckdb");

        let warehouse = Warehouse::open(WarehouseConfig::with_db_path(&db_path)).expect("open");
        assert_eq!(warehouse.storage().path(), Some(db_path.as_path()));
        assert!(db_path.exists());
    }

    #[test]
    fn read_only_mode_rejects_write_query() {
        let warehouse = in_memory();

        let error = warehouse
            .execute_query(
                "DELETE FROM gold.fact_sales",
                QueryGuardrails::default(),
                false,
            )
            .expect_err("should reject");

        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn read_only_mode_rejects_stacked_statements() {
        let warehouse = in_memory();

        let error = warehouse
            .execute_query(
                "SELECT 1; DROP TABLE gold.fact_sales",
                QueryGuardrails::default(),
                false,
            )
            .expect_err("should reject");

        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn guardrails_reject_zero_limits() {
        let warehouse = in_memory();
        let error = warehouse
            .execute_query(
                "SELECT 1",
                QueryGuardrails {
                    max_rows: 0,
                    query_timeout_ms: 100,
                },
                false,
            )
            .expect_err("zero rows");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn select_binds_parameters_and_truncates() {
        let warehouse = in_memory();
        let limit = 3_i64;
        let params: [&dyn ToSql; 1] = [&limit];

        let result = warehouse
            .select(
                "SELECT i AS n FROM range(10) t(i) WHERE i >= ? ORDER BY i",
                params.as_slice(),
                QueryGuardrails {
                    max_rows: 4,
                    query_timeout_ms: 5_000,
                },
            )
            .expect("select");

        assert_eq!(result.columns[0].name, "n");
        assert_eq!(result.row_count, 4);
        assert!(result.truncated);
        assert_eq!(result.rows[0][0], Value::from(3));
    }

    #[test]
    fn uncapped_guardrails_return_every_row() {
        let warehouse = in_memory();
        let result = warehouse
            .select(
                "SELECT i FROM range(20000) t(i)",
                &[],
                QueryGuardrails::uncapped(30_000),
            )
            .expect("select");

        assert_eq!(result.row_count, 20_000);
        assert!(!result.truncated);
    }

    #[test]
    fn empty_result_still_reports_columns() {
        let warehouse = in_memory();
        let result = warehouse
            .select(
                "SELECT customer_key, country FROM gold.dim_customers",
                &[],
                QueryGuardrails::default(),
            )
            .expect("select");

        assert_eq!(result.row_count, 0);
        assert_eq!(result.column_index("country"), Some(1));
    }

    #[test]
    fn converts_dates_and_hugeint_sums() {
        let warehouse = in_memory();
        let result = warehouse
            .execute_query(
                "SELECT DATE '2010-12-29' AS d, SUM(x) AS s FROM (VALUES (1), (2)) t(x)",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");

        assert_eq!(result.rows[0][0], Value::String(String::from("2010-12-29")));
        assert_eq!(result.rows[0][1], Value::from(3));
    }

    #[test]
    fn write_mode_executes_statements() {
        let warehouse = in_memory();
        warehouse
            .execute_query(
                "INSERT INTO gold.dim_products (product_key, product_name) VALUES (1, 'Road-150')",
                QueryGuardrails::default(),
                true,
            )
            .expect("insert");

        assert_eq!(warehouse.count_rows(StarTable::DimProducts).expect("count"), 1);

        warehouse.reset_schema().expect("reset");
        assert_eq!(warehouse.count_rows(StarTable::DimProducts).expect("count"), 0);
    }
}
