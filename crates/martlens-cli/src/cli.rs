//! CLI argument definitions for martlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `load` | Load the star schema from three CSV files |
//! | `report` | Run all or selected catalogue entries |
//! | `catalogue` | List catalogue entries |
//! | `describe` | Show the columns of a table |
//! | `sql` | Query the warehouse directly |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db-path` | `$MARTLENS_HOME/warehouse.duckdb` | Database file |
//! | `--format` | `table` | Output format (table, json, ndjson) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--stream` | `false` | Enable NDJSON event streaming |
//! | `--max-rows` | none for reports, `10000` for `sql` | Row cap per query |
//! | `--query-timeout-ms` | `5000` | Time budget per query |
//! | `--log-level` | `warn` | Log filter when `RUST_LOG` is unset |
//!
//! # Examples
//!
//! ```bash
//! martlens load --customers gold.dim_customers.csv \
//!     --products gold.dim_products.csv --sales gold.fact_sales.csv
//! martlens report --entry top-products --entry key-metrics
//! martlens --format json --pretty report --as-of 2024-06-30
//! martlens describe gold.fact_sales
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use martlens_warehouse::{CalendarDate, QueryGuardrails};

/// Row cap for `sql` when `--max-rows` is not given.
pub const SQL_MAX_ROWS: usize = 10_000;

/// Sales warehouse loader and report catalogue.
#[derive(Debug, Parser)]
#[command(
    name = "martlens",
    author,
    version,
    about = "Star-schema sales warehouse and exploratory report catalogue",
    long_about = "martlens loads customer, product and sales CSV extracts into a DuckDB star \
schema and runs a fixed catalogue of titled exploratory reports over it.\n\
\n\
Use 'martlens <command> --help' for command-specific help."
)]
pub struct Cli {
    /// DuckDB database file. Defaults to `$MARTLENS_HOME/warehouse.duckdb`.
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Emit start, per-result, failure and end events as newline-delimited JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub stream: bool,

    /// Maximum rows returned per query. Catalogue entries are uncapped unless
    /// set; `sql` defaults to 10000.
    #[arg(long, global = true, value_name = "ROWS")]
    pub max_rows: Option<usize>,

    /// Time budget per query in milliseconds.
    #[arg(long, global = true, default_value_t = 5_000)]
    pub query_timeout_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Guardrails for catalogue entries and `describe`.
    pub fn report_guardrails(&self) -> QueryGuardrails {
        match self.max_rows {
            Some(max_rows) => QueryGuardrails {
                max_rows,
                query_timeout_ms: self.query_timeout_ms,
            },
            None => QueryGuardrails::uncapped(self.query_timeout_ms),
        }
    }

    /// Guardrails for ad hoc `sql` queries.
    pub fn sql_guardrails(&self) -> QueryGuardrails {
        QueryGuardrails {
            max_rows: self.max_rows.unwrap_or(SQL_MAX_ROWS),
            query_timeout_ms: self.query_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Truncate and reload the three star tables from CSV files.
    Load(LoadArgs),
    /// Run catalogue entries and print their titled results.
    Report(ReportArgs),
    /// List catalogue entries in execution order.
    Catalogue,
    /// Show column metadata for a table.
    Describe(DescribeArgs),
    /// Execute a guarded SQL query against the warehouse.
    Sql(SqlArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Customer dimension CSV.
    #[arg(long, value_name = "PATH")]
    pub customers: PathBuf,

    /// Product dimension CSV.
    #[arg(long, value_name = "PATH")]
    pub products: PathBuf,

    /// Sales fact CSV.
    #[arg(long, value_name = "PATH")]
    pub sales: PathBuf,

    /// Drop and recreate the star tables before loading.
    #[arg(long, default_value_t = false)]
    pub recreate: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Entry name or title to run; repeatable. Runs every entry when omitted.
    #[arg(long = "entry", value_name = "NAME")]
    pub entries: Vec<String>,

    /// Reference date for age calculations (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long, value_name = "DATE", value_parser = parse_as_of)]
    pub as_of: Option<CalendarDate>,

    /// Run entries concurrently.
    #[arg(long, default_value_t = false)]
    pub parallel: bool,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Table name, optionally schema-qualified (defaults to `gold`).
    pub table: String,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write statements.
    #[arg(long, default_value_t = false)]
    pub write: bool,
}

fn parse_as_of(value: &str) -> Result<CalendarDate, String> {
    CalendarDate::parse(value).map_err(|error| format!("expected YYYY-MM-DD: {error}"))
}
