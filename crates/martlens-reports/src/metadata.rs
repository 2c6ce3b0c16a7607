//! Database metadata: objects in the catalog and columns of a table.

use std::sync::Arc;

use ::duckdb::ToSql;
use martlens_warehouse::{StarTable, SCHEMA};

use crate::{Category, Report, ReportContext, ReportError, SqlReport, TitledResult};

pub const TABLES: SqlReport = SqlReport {
    name: "tables",
    title: "Explore All Objects in the Database",
    category: Category::Metadata,
    sql: "SELECT table_catalog, table_schema, table_name, table_type \
          FROM information_schema.tables \
          ORDER BY table_schema, table_name",
    binds: &[],
};

const COLUMNS_SQL: &str = "SELECT column_name, data_type, is_nullable, character_maximum_length \
     FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? \
     ORDER BY ordinal_position";

/// Column listing for one table. Fails with [`ReportError::UnknownTable`]
/// when the table does not exist.
#[derive(Debug, Clone)]
pub struct TableColumns {
    name: String,
    title: String,
    schema: String,
    table: String,
}

impl TableColumns {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        let schema = schema.into();
        let table = table.into();
        Self {
            name: format!("{table}-columns"),
            title: format!("Explore All Columns of {table}"),
            schema,
            table,
        }
    }

    /// Columns of a star table under its catalogue name.
    #[must_use]
    pub fn star(table: StarTable, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::new(SCHEMA, table.name())
        }
    }

    /// Columns of `schema.table` or `table` (defaulting to the `gold` schema).
    /// Star table names resolve case-insensitively.
    #[must_use]
    pub fn parse(qualified: &str) -> Self {
        let qualified = qualified.trim();
        if let Some(table) = StarTable::parse(qualified) {
            return Self::new(SCHEMA, table.name());
        }
        match qualified.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::new(SCHEMA, qualified),
        }
    }
}

impl Report for TableColumns {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category(&self) -> Category {
        Category::Metadata
    }

    fn run(&self, context: &ReportContext) -> Result<TitledResult, ReportError> {
        if !context.warehouse.table_exists(&self.schema, &self.table)? {
            return Err(ReportError::UnknownTable {
                schema: self.schema.clone(),
                table: self.table.clone(),
            });
        }

        let params: [&dyn ToSql; 2] = [&self.schema, &self.table];
        let result = context
            .warehouse
            .select(COLUMNS_SQL, params.as_slice(), context.guardrails)?;
        Ok(TitledResult::from_query(self, result))
    }
}

/// Customer dimension column listing.
#[must_use]
pub fn customer_columns() -> TableColumns {
    TableColumns::star(StarTable::DimCustomers, "customer-columns")
}

pub(crate) fn entries() -> Vec<Arc<dyn Report>> {
    vec![Arc::new(TABLES), Arc::new(customer_columns())]
}
