//! Distinct values of the dimension attributes.

use std::sync::Arc;

use crate::{Category, Report, SqlReport};

pub const CUSTOMER_COUNTRIES: SqlReport = SqlReport {
    name: "customer-countries",
    title: "Explore All Countries Our Customers Come From",
    category: Category::Profiling,
    sql: "SELECT DISTINCT country \
          FROM gold.dim_customers \
          ORDER BY country ASC NULLS LAST",
    binds: &[],
};

pub const PRODUCT_CATEGORIES: SqlReport = SqlReport {
    name: "product-categories",
    title: "Explore All Categories: The Major Divisions",
    category: Category::Profiling,
    sql: "SELECT DISTINCT category, subcategory, product_name \
          FROM gold.dim_products \
          ORDER BY category ASC NULLS LAST, subcategory ASC NULLS LAST, product_name ASC NULLS LAST",
    binds: &[],
};

pub(crate) fn entries() -> Vec<Arc<dyn Report>> {
    vec![Arc::new(CUSTOMER_COUNTRIES), Arc::new(PRODUCT_CATEGORIES)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::loaded_context;
    use serde_json::Value;

    #[test]
    fn countries_are_distinct_and_sorted_with_null_last() {
        let result = CUSTOMER_COUNTRIES.run(&loaded_context()).expect("countries");

        assert_eq!(
            result.column_values("country"),
            vec![
                Value::from("Australia"),
                Value::from("Germany"),
                Value::from("United States"),
                Value::Null,
            ]
        );
    }

    #[test]
    fn categories_list_every_product_once() {
        let result = PRODUCT_CATEGORIES.run(&loaded_context()).expect("categories");

        assert_eq!(result.row_count, 7);
        assert_eq!(result.value(0, "category"), Some(&Value::from("Accessories")));
        assert_eq!(result.value(0, "product_name"), Some(&Value::from("Sport Helmet")));
        assert_eq!(result.value(6, "category"), Some(&Value::Null));
    }
}
