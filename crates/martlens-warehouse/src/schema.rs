//! Star schema definition: one fact table and two dimension tables in the
//! `gold` schema.

use std::fmt::{Display, Formatter};

use ::duckdb::Connection;
use serde::Serialize;

/// Schema holding every warehouse table.
pub const SCHEMA: &str = "gold";

/// The three tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StarTable {
    /// Customer dimension.
    DimCustomers,
    /// Product dimension.
    DimProducts,
    /// Sales fact table.
    FactSales,
}

impl StarTable {
    /// All tables in load order.
    pub const ALL: [StarTable; 3] = [Self::DimCustomers, Self::DimProducts, Self::FactSales];

    /// Unqualified table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DimCustomers => "dim_customers",
            Self::DimProducts => "dim_products",
            Self::FactSales => "fact_sales",
        }
    }

    /// Schema-qualified table name.
    #[must_use]
    pub const fn qualified_name(self) -> &'static str {
        match self {
            Self::DimCustomers => "gold.dim_customers",
            Self::DimProducts => "gold.dim_products",
            Self::FactSales => "gold.fact_sales",
        }
    }

    /// Column names in positional (CSV) order.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::DimCustomers => &[
                "customer_key",
                "customer_id",
                "customer_number",
                "first_name",
                "last_name",
                "country",
                "marital_status",
                "gender",
                "birthdate",
                "create_date",
            ],
            Self::DimProducts => &[
                "product_key",
                "product_id",
                "product_number",
                "product_name",
                "category_id",
                "category",
                "subcategory",
                "maintenance",
                "cost",
                "product_line",
                "start_date",
            ],
            Self::FactSales => &[
                "order_number",
                "product_key",
                "customer_key",
                "order_date",
                "shipping_date",
                "due_date",
                "sales_amount",
                "quantity",
                "price",
            ],
        }
    }

    /// Resolve a table from its plain or `gold.`-qualified name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name
            .strip_prefix("gold.")
            .unwrap_or(name)
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|table| table.name() == name)
    }

    fn ddl(self) -> &'static str {
        match self {
            Self::DimCustomers => {
                r"
CREATE TABLE IF NOT EXISTS gold.dim_customers (
    customer_key INTEGER,
    customer_id INTEGER,
    customer_number VARCHAR(50),
    first_name VARCHAR(50),
    last_name VARCHAR(50),
    country VARCHAR(50),
    marital_status VARCHAR(50),
    gender VARCHAR(50),
    birthdate DATE,
    create_date DATE
);
"
            }
            Self::DimProducts => {
                r"
CREATE TABLE IF NOT EXISTS gold.dim_products (
    product_key INTEGER,
    product_id INTEGER,
    product_number VARCHAR(50),
    product_name VARCHAR(50),
    category_id VARCHAR(50),
    category VARCHAR(50),
    subcategory VARCHAR(50),
    maintenance VARCHAR(50),
    cost INTEGER,
    product_line VARCHAR(50),
    start_date DATE
);
"
            }
            Self::FactSales => {
                r"
CREATE TABLE IF NOT EXISTS gold.fact_sales (
    order_number VARCHAR(50),
    product_key INTEGER,
    customer_key INTEGER,
    order_date DATE,
    shipping_date DATE,
    due_date DATE,
    sales_amount INTEGER,
    quantity TINYINT,
    price INTEGER
);
"
            }
        }
    }
}

impl Display for StarTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.qualified_name())
    }
}

/// Create the `gold` schema and any missing table.
///
/// # Errors
/// Returns an error if a DDL statement fails.
pub fn apply_schema(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("CREATE SCHEMA IF NOT EXISTS gold;")?;
    for table in StarTable::ALL {
        connection.execute_batch(table.ddl())?;
    }
    Ok(())
}

/// Drop every star table and create them again, empty.
///
/// # Errors
/// Returns an error if a DDL statement fails.
pub fn recreate_schema(connection: &Connection) -> Result<(), ::duckdb::Error> {
    for table in StarTable::ALL.into_iter().rev() {
        let drop = format!("DROP TABLE IF EXISTS {}", table.qualified_name());
        connection.execute_batch(drop.as_str())?;
    }
    apply_schema(connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_qualified_names() {
        assert_eq!(StarTable::parse("fact_sales"), Some(StarTable::FactSales));
        assert_eq!(
            StarTable::parse("gold.DIM_CUSTOMERS"),
            Some(StarTable::DimCustomers)
        );
        assert_eq!(StarTable::parse("dim_orders"), None);
    }

    #[test]
    fn creates_tables_with_expected_column_counts() {
        let connection = Connection::open_in_memory().expect("connection");
        apply_schema(&connection).expect("schema");
        apply_schema(&connection).expect("schema is idempotent");

        for table in StarTable::ALL {
            let count: i64 = connection
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.columns \
                     WHERE table_schema = 'gold' AND table_name = ?",
                    [table.name()],
                    |row| row.get(0),
                )
                .expect("column count");
            assert_eq!(count as usize, table.columns().len(), "{table}");
        }
    }

    #[test]
    fn recreate_discards_rows() {
        let connection = Connection::open_in_memory().expect("connection");
        apply_schema(&connection).expect("schema");
        connection
            .execute_batch("INSERT INTO gold.dim_products (product_key) VALUES (1)")
            .expect("insert");

        recreate_schema(&connection).expect("recreate");

        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM gold.dim_products", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }
}
