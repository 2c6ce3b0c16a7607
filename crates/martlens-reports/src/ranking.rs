//! Top-N and bottom-N rankings of products and customers.

use std::sync::Arc;

use crate::{Category, Report, SqlReport};

pub const TOP_PRODUCTS: SqlReport = SqlReport {
    name: "top-products",
    title: "Which 5 Products Generate the Highest Revenue?",
    category: Category::Ranking,
    sql: "SELECT p.product_name, SUM(f.sales_amount) AS total_revenue \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_products p ON p.product_key = f.product_key \
          GROUP BY p.product_name \
          ORDER BY total_revenue DESC NULLS LAST, p.product_name ASC NULLS LAST \
          LIMIT 5",
    binds: &[],
};

/// Window-function variant of [`TOP_PRODUCTS`]. Tied revenues share a rank,
/// so a tie at the boundary returns more than five rows.
pub const TOP_PRODUCTS_RANKED: SqlReport = SqlReport {
    name: "top-products-ranked",
    title: "Which 5 Products Generate the Highest Revenue? (Ranked)",
    category: Category::Ranking,
    sql: "SELECT product_name, total_revenue, rank_products FROM ( \
              SELECT p.product_name, \
                     SUM(f.sales_amount) AS total_revenue, \
                     RANK() OVER (ORDER BY SUM(f.sales_amount) DESC NULLS LAST) AS rank_products \
              FROM gold.fact_sales f \
              LEFT JOIN gold.dim_products p ON p.product_key = f.product_key \
              GROUP BY p.product_name \
          ) AS ranked \
          WHERE rank_products <= 5 \
          ORDER BY rank_products, product_name ASC NULLS LAST",
    binds: &[],
};

pub const BOTTOM_PRODUCTS: SqlReport = SqlReport {
    name: "bottom-products",
    title: "What Are the 5 Worst-Performing Products in Terms of Sales?",
    category: Category::Ranking,
    sql: "SELECT p.product_name, SUM(f.sales_amount) AS total_revenue \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_products p ON p.product_key = f.product_key \
          GROUP BY p.product_name \
          ORDER BY total_revenue ASC NULLS LAST, p.product_name ASC NULLS LAST \
          LIMIT 5",
    binds: &[],
};

pub const TOP_CUSTOMERS: SqlReport = SqlReport {
    name: "top-customers",
    title: "Find the Top 10 Customers Who Have Generated the Highest Revenue",
    category: Category::Ranking,
    sql: "SELECT c.customer_key, c.first_name, c.last_name, \
                 SUM(f.sales_amount) AS total_revenue \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_customers c ON c.customer_key = f.customer_key \
          GROUP BY c.customer_key, c.first_name, c.last_name \
          ORDER BY total_revenue DESC NULLS LAST, c.customer_key ASC NULLS LAST \
          LIMIT 10",
    binds: &[],
};

pub const BOTTOM_CUSTOMERS_BY_ORDERS: SqlReport = SqlReport {
    name: "bottom-customers-by-orders",
    title: "The 3 Customers with the Fewest Orders Placed",
    category: Category::Ranking,
    sql: "SELECT c.customer_key, c.first_name, c.last_name, \
                 COUNT(DISTINCT f.order_number) AS total_orders \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_customers c ON c.customer_key = f.customer_key \
          GROUP BY c.customer_key, c.first_name, c.last_name \
          ORDER BY total_orders ASC, c.customer_key ASC NULLS LAST \
          LIMIT 3",
    binds: &[],
};

pub(crate) fn entries() -> Vec<Arc<dyn Report>> {
    vec![
        Arc::new(TOP_PRODUCTS),
        Arc::new(TOP_PRODUCTS_RANKED),
        Arc::new(BOTTOM_PRODUCTS),
        Arc::new(TOP_CUSTOMERS),
        Arc::new(BOTTOM_CUSTOMERS_BY_ORDERS),
    ]
}
