//! Row types of the star schema, deserialized positionally from CSV.

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use ::duckdb::types::{ToSqlOutput, Value as DuckValue};
use ::duckdb::{Statement, ToSql};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use time::format_description::{self, BorrowedFormatItem};
use time::Date;

use crate::schema::StarTable;

static DATE_FORMAT: LazyLock<Vec<BorrowedFormatItem<'static>>> = LazyLock::new(|| {
    format_description::parse("[year]-[month]-[day]").expect("static date format is valid")
});

/// A calendar date as written in source files (`YYYY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(Date);

impl CalendarDate {
    /// Parse an ISO `YYYY-MM-DD` date.
    ///
    /// # Errors
    /// Returns an error if the text is not a valid calendar date.
    pub fn parse(text: &str) -> Result<Self, time::error::Parse> {
        Date::parse(text, DATE_FORMAT.as_slice()).map(Self)
    }

    /// The underlying date.
    #[must_use]
    pub fn into_inner(self) -> Date {
        self.0
    }
}

impl From<Date> for CalendarDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl Display for CalendarDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(text.as_str())
            .map_err(|error| de::Error::custom(format!("invalid date '{text}': {error}")))
    }
}

impl Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl ToSql for CalendarDate {
    fn to_sql(&self) -> ::duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(DuckValue::Text(self.to_string())))
    }
}

/// A row type that can be bulk-loaded into one star table.
pub trait StarRecord: for<'de> Deserialize<'de> + Send + Sync {
    /// Target table.
    const TABLE: StarTable;

    /// Parameterized insert statement; date columns are cast from text.
    const INSERT_SQL: &'static str;

    /// Bind this record to a prepared [`Self::INSERT_SQL`] and execute it.
    ///
    /// # Errors
    /// Returns an error if a value does not fit its column type.
    fn insert(&self, statement: &mut Statement<'_>) -> ::duckdb::Result<usize>;
}

/// One row of `gold.dim_customers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_key: Option<i64>,
    pub customer_id: Option<i64>,
    pub customer_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub marital_status: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<CalendarDate>,
    pub create_date: Option<CalendarDate>,
}

impl StarRecord for CustomerRecord {
    const TABLE: StarTable = StarTable::DimCustomers;
    const INSERT_SQL: &'static str = "INSERT INTO gold.dim_customers \
         (customer_key, customer_id, customer_number, first_name, last_name, country, \
          marital_status, gender, birthdate, create_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS DATE), CAST(? AS DATE))";

    fn insert(&self, statement: &mut Statement<'_>) -> ::duckdb::Result<usize> {
        let params: [&dyn ToSql; 10] = [
            &self.customer_key,
            &self.customer_id,
            &self.customer_number,
            &self.first_name,
            &self.last_name,
            &self.country,
            &self.marital_status,
            &self.gender,
            &self.birthdate,
            &self.create_date,
        ];
        statement.execute(params.as_slice())
    }
}

/// One row of `gold.dim_products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_key: Option<i64>,
    pub product_id: Option<i64>,
    pub product_number: Option<String>,
    pub product_name: Option<String>,
    pub category_id: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub maintenance: Option<String>,
    pub cost: Option<i64>,
    pub product_line: Option<String>,
    pub start_date: Option<CalendarDate>,
}

impl StarRecord for ProductRecord {
    const TABLE: StarTable = StarTable::DimProducts;
    const INSERT_SQL: &'static str = "INSERT INTO gold.dim_products \
         (product_key, product_id, product_number, product_name, category_id, category, \
          subcategory, maintenance, cost, product_line, start_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS DATE))";

    fn insert(&self, statement: &mut Statement<'_>) -> ::duckdb::Result<usize> {
        let params: [&dyn ToSql; 11] = [
            &self.product_key,
            &self.product_id,
            &self.product_number,
            &self.product_name,
            &self.category_id,
            &self.category,
            &self.subcategory,
            &self.maintenance,
            &self.cost,
            &self.product_line,
            &self.start_date,
        ];
        statement.execute(params.as_slice())
    }
}

/// One row of `gold.fact_sales`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub order_number: Option<String>,
    pub product_key: Option<i64>,
    pub customer_key: Option<i64>,
    pub order_date: Option<CalendarDate>,
    pub shipping_date: Option<CalendarDate>,
    pub due_date: Option<CalendarDate>,
    pub sales_amount: Option<i64>,
    pub quantity: Option<i64>,
    pub price: Option<i64>,
}

impl StarRecord for SaleRecord {
    const TABLE: StarTable = StarTable::FactSales;
    const INSERT_SQL: &'static str = "INSERT INTO gold.fact_sales \
         (order_number, product_key, customer_key, order_date, shipping_date, due_date, \
          sales_amount, quantity, price) \
         VALUES (?, ?, ?, CAST(? AS DATE), CAST(? AS DATE), CAST(? AS DATE), ?, ?, ?)";

    fn insert(&self, statement: &mut Statement<'_>) -> ::duckdb::Result<usize> {
        let params: [&dyn ToSql; 9] = [
            &self.order_number,
            &self.product_key,
            &self.customer_key,
            &self.order_date,
            &self.shipping_date,
            &self.due_date,
            &self.sales_amount,
            &self.quantity,
            &self.price,
        ];
        statement.execute(params.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_date_round_trips_through_display() {
        let date = CalendarDate::parse("1971-10-06").expect("date");
        assert_eq!(date.to_string(), "1971-10-06");
        assert_eq!(date.into_inner().year(), 1971);
    }

    #[test]
    fn calendar_date_rejects_garbage() {
        assert!(CalendarDate::parse("06/10/1971").is_err());
        assert!(CalendarDate::parse("2021-02-30").is_err());
    }

    #[test]
    fn insert_statements_bind_one_parameter_per_column() {
        for (table, sql) in [
            (CustomerRecord::TABLE, CustomerRecord::INSERT_SQL),
            (ProductRecord::TABLE, ProductRecord::INSERT_SQL),
            (SaleRecord::TABLE, SaleRecord::INSERT_SQL),
        ] {
            let placeholders = sql.matches('?').count();
            assert_eq!(placeholders, table.columns().len(), "{table}");
        }
    }
}
