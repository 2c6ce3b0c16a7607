//! Date boundaries of the fact table and the customer age range.
//!
//! Differences count calendar boundaries crossed (`date_diff`), so an
//! age is the difference of years regardless of the day within the year.

use std::sync::Arc;

use crate::{Bind, Category, Report, SqlReport};

pub const ORDER_DATE_RANGE: SqlReport = SqlReport {
    name: "order-date-range",
    title: "Find the Date of the First and Last Order",
    category: Category::DateRange,
    sql: "SELECT \
              MIN(order_date) AS first_order_date, \
              MAX(order_date) AS last_order_date, \
              date_diff('month', MIN(order_date), MAX(order_date)) AS order_range_months \
          FROM gold.fact_sales",
    binds: &[],
};

pub const CUSTOMER_AGE_RANGE: SqlReport = SqlReport {
    name: "customer-age-range",
    title: "Find the Youngest and the Oldest Customer",
    category: Category::DateRange,
    sql: "SELECT \
              MIN(birthdate) AS oldest_birthdate, \
              date_diff('year', MIN(birthdate), CAST(? AS DATE)) AS oldest_age, \
              MAX(birthdate) AS youngest_birthdate, \
              date_diff('year', MAX(birthdate), CAST(? AS DATE)) AS youngest_age \
          FROM gold.dim_customers",
    binds: &[Bind::AsOf, Bind::AsOf],
};

pub(crate) fn entries() -> Vec<Arc<dyn Report>> {
    vec![Arc::new(ORDER_DATE_RANGE), Arc::new(CUSTOMER_AGE_RANGE)]
}
