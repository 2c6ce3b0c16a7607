//! Behavior-driven tests for the load stage
//!
//! These tests verify what a user sees after loading the star schema:
//! row counts, NULL handling, per-table failure isolation and reruns.

use martlens_tests::*;
use martlens_warehouse::{CsvStream, LoadError, QueryGuardrails};
use std::io::Cursor;
use tempfile::tempdir;

fn count(warehouse: &Warehouse, table: StarTable) -> i64 {
    warehouse.count_rows(table).expect("count rows")
}

// =============================================================================
// Load: Happy Path
// =============================================================================

#[test]
fn when_user_loads_three_files_every_row_lands_in_its_table() {
    // Given: Three CSV files on disk and a file-backed warehouse
    let temp = tempdir().expect("tempdir");
    let sources = LoadSources::from_paths(
        write_file(temp.path(), "customers.csv", &csv(CUSTOMER_HEADER, CUSTOMERS)),
        write_file(temp.path(), "products.csv", &csv(PRODUCT_HEADER, PRODUCTS)),
        write_file(temp.path(), "sales.csv", &csv(SALES_HEADER, SALES)),
    );
    let warehouse = file_warehouse(temp.path());

    // When: User loads the star schema
    let report = warehouse.load_star(&sources);

    // Then: Each table holds exactly the rows of its file
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(count(&warehouse, StarTable::DimCustomers), CUSTOMERS.len() as i64);
    assert_eq!(count(&warehouse, StarTable::DimProducts), PRODUCTS.len() as i64);
    assert_eq!(count(&warehouse, StarTable::FactSales), SALES.len() as i64);
    assert_eq!(
        report.rows_loaded(),
        CUSTOMERS.len() + PRODUCTS.len() + SALES.len()
    );
}

#[test]
fn when_warehouse_is_reopened_loaded_rows_persist() {
    // Given: A file-backed warehouse that was loaded and closed
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = file_warehouse(temp.path());
        assert!(warehouse.load_star(&standard_sources()).is_complete());
    }

    // When: User opens the same database again
    let reopened = file_warehouse(temp.path());

    // Then: The loaded rows are still there
    assert_eq!(count(&reopened, StarTable::FactSales), SALES.len() as i64);
}

/// Every row of `table`, sorted on all columns.
fn snapshot(warehouse: &Warehouse, table: StarTable) -> Vec<Vec<Value>> {
    let sql = format!("SELECT * FROM {} ORDER BY ALL", table.qualified_name());
    warehouse
        .execute_query(&sql, QueryGuardrails::default(), false)
        .expect("snapshot")
        .rows
}

#[test]
fn when_user_loads_twice_the_tables_hold_identical_rows() {
    // Given: A warehouse loaded once
    let warehouse = in_memory_warehouse();
    assert!(warehouse.load_star(&standard_sources()).is_complete());
    let first = StarTable::ALL.map(|table| snapshot(&warehouse, table));

    // When: The same sources are loaded again
    let second = warehouse.load_star(&standard_sources());

    // Then: Every table holds the same rows, value for value
    assert!(second.is_complete());
    for (table, before) in StarTable::ALL.into_iter().zip(first) {
        let after = snapshot(&warehouse, table);
        assert!(!after.is_empty(), "{table}");
        assert_eq!(before, after, "{table}");
    }
    assert_eq!(count(&warehouse, StarTable::FactSales), SALES.len() as i64);
}

#[test]
fn when_a_field_is_empty_it_is_stored_as_null() {
    // Given: A customer row with empty country and birthdate
    let warehouse = in_memory_warehouse();

    // When: The star schema is loaded
    assert!(warehouse.load_star(&standard_sources()).is_complete());

    // Then: The empty fields are NULL, not empty strings
    let result = warehouse
        .execute_query(
            "SELECT country IS NULL AS no_country, birthdate IS NULL AS no_birthdate \
             FROM gold.dim_customers WHERE customer_key = 6",
            QueryGuardrails::default(),
            false,
        )
        .expect("query");
    assert_eq!(result.rows, vec![vec![Value::Bool(true), Value::Bool(true)]]);
}

#[test]
fn when_sales_come_from_a_stream_they_load_like_a_file() {
    // Given: Sales provided as an in-memory byte stream
    let warehouse = in_memory_warehouse();
    let sales = csv(SALES_HEADER, SALES).into_bytes();
    let sources = LoadSources {
        customers: Box::new(CsvText::new("customers", csv(CUSTOMER_HEADER, CUSTOMERS))),
        products: Box::new(CsvText::new("products", csv(PRODUCT_HEADER, PRODUCTS))),
        sales: Box::new(CsvStream::new("stdin", Cursor::new(sales))),
    };

    // When: The star schema is loaded
    let report = warehouse.load_star(&sources);

    // Then: The stream's rows are loaded and its origin is reported
    assert!(report.is_complete(), "{report:?}");
    let sales_outcome = report
        .tables
        .iter()
        .find(|outcome| outcome.table == StarTable::FactSales)
        .expect("sales outcome");
    assert_eq!(sales_outcome.origin, "stdin");
    assert_eq!(sales_outcome.rows_loaded, SALES.len());
}

// =============================================================================
// Load: Failure Isolation
// =============================================================================

#[test]
fn when_one_file_is_malformed_that_table_is_named_and_left_empty() {
    // Given: A previously loaded warehouse and a sales file with a bad date
    let warehouse = in_memory_warehouse();
    assert!(warehouse.load_star(&standard_sources()).is_complete());
    let mut bad_sales = SALES.to_vec();
    bad_sales.push("SO9,1,1,2013-13-45,2013-01-08,2013-01-13,10,1,10");

    // When: User reloads with the malformed sales file
    let report = warehouse.load_star(&sources(
        csv(CUSTOMER_HEADER, CUSTOMERS),
        csv(PRODUCT_HEADER, PRODUCTS),
        csv(SALES_HEADER, &bad_sales),
    ));

    // Then: Only the sales table failed, and it holds no partial rows
    assert!(!report.is_complete());
    assert_eq!(report.failed_tables(), vec![StarTable::FactSales]);
    assert_eq!(count(&warehouse, StarTable::FactSales), 0);

    // And: The dimensions loaded normally
    assert_eq!(count(&warehouse, StarTable::DimCustomers), CUSTOMERS.len() as i64);
    assert_eq!(count(&warehouse, StarTable::DimProducts), PRODUCTS.len() as i64);
}

#[test]
fn when_a_source_file_is_missing_the_error_names_the_table() {
    // Given: A path that does not exist
    let temp = tempdir().expect("tempdir");
    let warehouse = in_memory_warehouse();
    let missing = martlens_warehouse::CsvFile::new(temp.path().join("nope.csv"));

    // When: The product table is loaded from it
    let error = warehouse
        .load_table::<martlens_warehouse::ProductRecord>(&missing)
        .expect_err("missing file");

    // Then: The error identifies the table and is a source error
    assert_eq!(error.table(), StarTable::DimProducts);
    assert!(matches!(error, LoadError::SourceUnavailable { .. }));
}

#[test]
fn when_a_header_has_the_wrong_width_the_load_is_rejected() {
    // Given: A customer file missing its last column
    let warehouse = in_memory_warehouse();
    let narrow = "customer_key,customer_id\n1,11000\n";

    // When: The customer table is loaded
    let error = warehouse
        .load_table::<martlens_warehouse::CustomerRecord>(&CsvText::new("narrow", narrow))
        .expect_err("column count mismatch");

    // Then: The header line is reported as malformed
    assert!(matches!(error, LoadError::MalformedRow { line: 1, .. }));
    assert_eq!(count(&warehouse, StarTable::DimCustomers), 0);
}

#[test]
fn when_user_recreates_the_schema_tables_are_empty_again() {
    // Given: A loaded warehouse
    let warehouse = in_memory_warehouse();
    assert!(warehouse.load_star(&standard_sources()).is_complete());

    // When: The schema is recreated
    warehouse.reset_schema().expect("reset");

    // Then: All three tables exist and are empty
    for table in StarTable::ALL {
        assert_eq!(count(&warehouse, table), 0, "{table}");
    }
}
