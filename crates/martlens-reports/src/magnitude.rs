//! Measures grouped by a dimension attribute, largest first.
//!
//! Fact rows are left-joined to their dimensions: sales whose key has no
//! dimension row are kept and land in the NULL group. Equal measures are
//! ordered by the group key ascending, nulls last.

use std::sync::Arc;

use crate::{Category, Report, SqlReport};

pub const CUSTOMERS_BY_COUNTRY: SqlReport = SqlReport {
    name: "customers-by-country",
    title: "Find Total Customers by Countries",
    category: Category::Magnitude,
    sql: "SELECT country, COUNT(customer_key) AS total_customers \
          FROM gold.dim_customers \
          GROUP BY country \
          ORDER BY total_customers DESC, country ASC NULLS LAST",
    binds: &[],
};

pub const CUSTOMERS_BY_GENDER: SqlReport = SqlReport {
    name: "customers-by-gender",
    title: "Find Total Customers by Gender",
    category: Category::Magnitude,
    sql: "SELECT gender, COUNT(customer_key) AS total_customers \
          FROM gold.dim_customers \
          GROUP BY gender \
          ORDER BY total_customers DESC, gender ASC NULLS LAST",
    binds: &[],
};

pub const PRODUCTS_BY_CATEGORY: SqlReport = SqlReport {
    name: "products-by-category",
    title: "Find Total Products by Category",
    category: Category::Magnitude,
    sql: "SELECT category, COUNT(product_key) AS total_products \
          FROM gold.dim_products \
          GROUP BY category \
          ORDER BY total_products DESC, category ASC NULLS LAST",
    binds: &[],
};

pub const AVERAGE_COST_BY_CATEGORY: SqlReport = SqlReport {
    name: "average-cost-by-category",
    title: "What Is the Average Cost in Each Category?",
    category: Category::Magnitude,
    sql: "SELECT category, AVG(cost) AS avg_cost \
          FROM gold.dim_products \
          GROUP BY category \
          ORDER BY avg_cost DESC NULLS LAST, category ASC NULLS LAST",
    binds: &[],
};

pub const REVENUE_BY_CATEGORY: SqlReport = SqlReport {
    name: "revenue-by-category",
    title: "What Is the Total Revenue Generated for Each Category?",
    category: Category::Magnitude,
    sql: "SELECT p.category, SUM(f.sales_amount) AS total_revenue \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_products p ON p.product_key = f.product_key \
          GROUP BY p.category \
          ORDER BY total_revenue DESC NULLS LAST, p.category ASC NULLS LAST",
    binds: &[],
};

pub const REVENUE_BY_CUSTOMER: SqlReport = SqlReport {
    name: "revenue-by-customer",
    title: "Find Total Revenue Generated by Each Customer",
    category: Category::Magnitude,
    sql: "SELECT c.customer_key, c.first_name, c.last_name, \
                 SUM(f.sales_amount) AS total_revenue \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_customers c ON c.customer_key = f.customer_key \
          GROUP BY c.customer_key, c.first_name, c.last_name \
          ORDER BY total_revenue DESC NULLS LAST, c.customer_key ASC NULLS LAST",
    binds: &[],
};

pub const SOLD_ITEMS_BY_COUNTRY: SqlReport = SqlReport {
    name: "sold-items-by-country",
    title: "Sold Items Distribution Across Countries",
    category: Category::Magnitude,
    sql: "SELECT c.country, SUM(f.quantity) AS total_sold_items \
          FROM gold.fact_sales f \
          LEFT JOIN gold.dim_customers c ON c.customer_key = f.customer_key \
          GROUP BY c.country \
          ORDER BY total_sold_items DESC NULLS LAST, c.country ASC NULLS LAST",
    binds: &[],
};

pub(crate) fn entries() -> Vec<Arc<dyn Report>> {
    vec![
        Arc::new(CUSTOMERS_BY_COUNTRY),
        Arc::new(CUSTOMERS_BY_GENDER),
        Arc::new(PRODUCTS_BY_CATEGORY),
        Arc::new(AVERAGE_COST_BY_CATEGORY),
        Arc::new(REVENUE_BY_CATEGORY),
        Arc::new(REVENUE_BY_CUSTOMER),
        Arc::new(SOLD_ITEMS_BY_COUNTRY),
    ]
}
