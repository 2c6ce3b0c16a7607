//! Single-value business measures and the combined key-metrics report.

use std::sync::Arc;

use crate::{Category, Report, SqlReport};

pub const TOTAL_SALES: SqlReport = SqlReport {
    name: "total-sales",
    title: "Find the Total Sales",
    category: Category::Measures,
    sql: "SELECT SUM(sales_amount) AS total_sales FROM gold.fact_sales",
    binds: &[],
};

pub const TOTAL_QUANTITY: SqlReport = SqlReport {
    name: "total-quantity",
    title: "Find How Many Items Are Sold",
    category: Category::Measures,
    sql: "SELECT SUM(quantity) AS total_quantity FROM gold.fact_sales",
    binds: &[],
};

pub const AVERAGE_PRICE: SqlReport = SqlReport {
    name: "average-price",
    title: "Find the Average Selling Price",
    category: Category::Measures,
    sql: "SELECT AVG(price) AS avg_price FROM gold.fact_sales",
    binds: &[],
};

/// Counts fact rows, so an order with several lines counts once per line.
pub const TOTAL_ORDERS: SqlReport = SqlReport {
    name: "total-orders",
    title: "Find the Total Number of Orders",
    category: Category::Measures,
    sql: "SELECT COUNT(*) AS total_orders FROM gold.fact_sales",
    binds: &[],
};

pub const DISTINCT_ORDERS: SqlReport = SqlReport {
    name: "distinct-orders",
    title: "Find the Number of Distinct Orders",
    category: Category::Measures,
    sql: "SELECT COUNT(DISTINCT order_number) AS distinct_orders FROM gold.fact_sales",
    binds: &[],
};

pub const TOTAL_PRODUCTS: SqlReport = SqlReport {
    name: "total-products",
    title: "Find the Total Number of Products",
    category: Category::Measures,
    sql: "SELECT COUNT(product_key) AS total_products FROM gold.dim_products",
    binds: &[],
};

pub const TOTAL_CUSTOMERS: SqlReport = SqlReport {
    name: "total-customers",
    title: "Find the Total Number of Customers",
    category: Category::Measures,
    sql: "SELECT COUNT(customer_key) AS total_customers FROM gold.dim_customers",
    binds: &[],
};

pub const ORDERING_CUSTOMERS: SqlReport = SqlReport {
    name: "ordering-customers",
    title: "Find the Total Number of Customers That Have Placed an Order",
    category: Category::Measures,
    sql: "SELECT COUNT(DISTINCT customer_key) AS ordering_customers FROM gold.fact_sales",
    binds: &[],
};

/// Six headline measures as `(metric_name, metric_value)` rows in fixed order.
pub const KEY_METRICS: SqlReport = SqlReport {
    name: "key-metrics",
    title: "Generate a Report That Shows All Key Metrics of the Business",
    category: Category::Measures,
    sql: "SELECT metric_name, metric_value FROM ( \
              SELECT 1 AS position, 'Total Sales' AS metric_name, \
                     CAST(SUM(sales_amount) AS DOUBLE) AS metric_value \
              FROM gold.fact_sales \
              UNION ALL \
              SELECT 2, 'Total Quantity', CAST(SUM(quantity) AS DOUBLE) FROM gold.fact_sales \
              UNION ALL \
              SELECT 3, 'Average Price', CAST(AVG(price) AS DOUBLE) FROM gold.fact_sales \
              UNION ALL \
              SELECT 4, 'Total Orders', CAST(COUNT(DISTINCT order_number) AS DOUBLE) \
              FROM gold.fact_sales \
              UNION ALL \
              SELECT 5, 'Total Products', CAST(COUNT(DISTINCT product_name) AS DOUBLE) \
              FROM gold.dim_products \
              UNION ALL \
              SELECT 6, 'Total Customers', CAST(COUNT(customer_key) AS DOUBLE) \
              FROM gold.dim_customers \
          ) AS metrics \
          ORDER BY position",
    binds: &[],
};

pub(crate) fn entries() -> Vec<Arc<dyn Report>> {
    vec![
        Arc::new(TOTAL_SALES),
        Arc::new(TOTAL_QUANTITY),
        Arc::new(AVERAGE_PRICE),
        Arc::new(TOTAL_ORDERS),
        Arc::new(DISTINCT_ORDERS),
        Arc::new(TOTAL_PRODUCTS),
        Arc::new(TOTAL_CUSTOMERS),
        Arc::new(ORDERING_CUSTOMERS),
        Arc::new(KEY_METRICS),
    ]
}
