//! # martlens Reports
//!
//! The reporting stage of martlens: a fixed catalogue of independent
//! analytical queries over the `gold` star schema, each returning a
//! [`TitledResult`].
//!
//! ## Categories
//!
//! | Module | Entries |
//! |--------|---------|
//! | [`metadata`] | tables, columns of a table |
//! | [`profiling`] | distinct dimension values |
//! | [`dates`] | order date range, customer ages |
//! | [`measures`] | totals, averages, counts, key metrics |
//! | [`magnitude`] | grouped counts and sums |
//! | [`ranking`] | top-N / bottom-N |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use martlens_reports::{Catalogue, ReportContext};
//! use martlens_warehouse::Warehouse;
//!
//! let context = ReportContext::new(Warehouse::open_default()?);
//! for outcome in Catalogue::standard().run(&context) {
//!     match outcome.result {
//!         Ok(result) => println!("{}: {} rows", result.title, result.row_count),
//!         Err(error) => eprintln!("{}: {error}", outcome.title),
//!     }
//! }
//! # Ok::<(), martlens_warehouse::WarehouseError>(())
//! ```

pub mod catalogue;
pub mod dates;
pub mod magnitude;
pub mod measures;
pub mod metadata;
pub mod profiling;
pub mod ranking;

#[cfg(test)]
mod test_support;

use ::duckdb::ToSql;
use martlens_warehouse::{
    CalendarDate, QueryGuardrails, QueryResult, SqlColumn, Warehouse, WarehouseError,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

pub use catalogue::{run_entries, run_entries_parallel, Catalogue, ReportOutcome};
pub use metadata::TableColumns;

/// Errors raised by a single catalogue entry.
#[derive(Debug, Error)]
pub enum ReportError {
    /// No catalogue entry has this name or title.
    #[error("unknown catalogue entry '{0}'")]
    UnknownEntry(String),

    /// The entry references a table that does not exist.
    #[error("table '{schema}.{table}' does not exist")]
    UnknownTable { schema: String, table: String },

    /// The query failed in the warehouse.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// A parallel report task panicked or was cancelled.
    #[error("report task failed: {0}")]
    Task(String),
}

/// Analytical category of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Metadata,
    Profiling,
    DateRange,
    Measures,
    Magnitude,
    Ranking,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Profiling => "profiling",
            Self::DateRange => "date_range",
            Self::Measures => "measures",
            Self::Magnitude => "magnitude",
            Self::Ranking => "ranking",
        }
    }
}

/// The result shape every catalogue entry returns: a title plus uniformly
/// shaped rows.
#[derive(Debug, Clone, Serialize)]
pub struct TitledResult {
    /// Stable entry name.
    pub name: String,
    /// Human-readable heading.
    pub title: String,
    pub category: Category,
    pub columns: Vec<SqlColumn>,
    /// Rows aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub truncated: bool,
}

impl TitledResult {
    /// Label a query result with the identity of `report`.
    pub fn from_query(report: &dyn Report, result: QueryResult) -> Self {
        Self {
            name: report.name().to_string(),
            title: report.title().to_string(),
            category: report.category(),
            columns: result.columns,
            rows: result.rows,
            row_count: result.row_count,
            truncated: result.truncated,
        }
    }

    /// Index of the column called `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Value at `row` in the column called `column`.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// All values of the column called `column`, in row order.
    #[must_use]
    pub fn column_values(&self, column: &str) -> Vec<Value> {
        let Some(index) = self.column_index(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Rows as records keyed by column name.
    #[must_use]
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Everything a catalogue entry needs to run: the warehouse handle, query
/// limits and the reference date for age calculations.
#[derive(Clone)]
pub struct ReportContext {
    pub warehouse: Warehouse,
    pub guardrails: QueryGuardrails,
    /// "Now" for age calculations.
    pub as_of: CalendarDate,
}

impl ReportContext {
    /// Context without a row cap, dated today (UTC).
    pub fn new(warehouse: Warehouse) -> Self {
        Self {
            warehouse,
            guardrails: QueryGuardrails::uncapped(QueryGuardrails::default().query_timeout_ms),
            as_of: CalendarDate::from(OffsetDateTime::now_utc().date()),
        }
    }

    #[must_use]
    pub fn with_guardrails(mut self, guardrails: QueryGuardrails) -> Self {
        self.guardrails = guardrails;
        self
    }

    #[must_use]
    pub fn with_as_of(mut self, as_of: CalendarDate) -> Self {
        self.as_of = as_of;
        self
    }
}

/// A named, independently runnable catalogue entry.
pub trait Report: Send + Sync {
    /// Stable slug used to select the entry.
    fn name(&self) -> &str;

    /// Heading displayed above the result.
    fn title(&self) -> &str;

    fn category(&self) -> Category;

    /// Run the entry against the context's warehouse.
    ///
    /// # Errors
    /// Returns a [`ReportError`] if the query fails; an empty result is not
    /// an error.
    fn run(&self, context: &ReportContext) -> Result<TitledResult, ReportError>;
}

/// Value bound to a `?` placeholder of a [`SqlReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bind {
    /// The context's `as_of` date, as `YYYY-MM-DD` text.
    AsOf,
}

/// A catalogue entry backed by one read-only SQL statement.
#[derive(Debug, Clone, Copy)]
pub struct SqlReport {
    pub name: &'static str,
    pub title: &'static str,
    pub category: Category,
    pub sql: &'static str,
    pub binds: &'static [Bind],
}

impl Report for SqlReport {
    fn name(&self) -> &str {
        self.name
    }

    fn title(&self) -> &str {
        self.title
    }

    fn category(&self) -> Category {
        self.category
    }

    fn run(&self, context: &ReportContext) -> Result<TitledResult, ReportError> {
        let params = self
            .binds
            .iter()
            .map(|bind| match bind {
                Bind::AsOf => &context.as_of as &dyn ToSql,
            })
            .collect::<Vec<_>>();
        let result = context
            .warehouse
            .select(self.sql, params.as_slice(), context.guardrails)?;
        Ok(TitledResult::from_query(self, result))
    }
}
