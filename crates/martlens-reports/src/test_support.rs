//! Small star dataset shared by the entry tests.
//!
//! Includes a customer without country or birthdate, a product without
//! category or cost, and a sale whose product and customer keys have no
//! dimension row.

use martlens_warehouse::{CalendarDate, CsvText, LoadSources, Warehouse, WarehouseConfig};

use crate::ReportContext;

pub(crate) const CUSTOMERS: &str = "\
customer_key,customer_id,customer_number,first_name,last_name,country,marital_status,gender,birthdate,create_date
1,11000,AW00011000,Jon,Yang,Australia,M,Male,1971-10-06,2025-10-06
2,11001,AW00011001,Eugene,Huang,Australia,S,Male,1976-05-10,2025-10-06
3,11002,AW00011002,Ruben,Torres,United States,M,Male,1971-02-09,2025-10-06
4,11003,AW00011003,Christy,Zhu,Germany,S,Female,1973-08-14,2025-10-06
5,11004,AW00011004,Elizabeth,Johnson,,S,Female,,2025-10-06
";

pub(crate) const PRODUCTS: &str = "\
product_key,product_id,product_number,product_name,category_id,category,subcategory,maintenance,cost,product_line,start_date
1,210,FR-R92B-58,HL Road Frame,CO_RF,Components,Road Frames,No,100,Road,2003-07-01
2,211,BK-R93R-62,Road-150 Red,BI_RB,Bikes,Road Bikes,Yes,2000,Road,2011-07-01
3,212,BK-M82S-38,Mountain-100,BI_MB,Bikes,Mountain Bikes,Yes,1900,Mountain,2011-07-01
4,213,HL-U509,Sport Helmet,AC_HE,Accessories,Helmets,No,13,Other,2012-07-01
5,214,SO-B909,Mountain Socks,CL_SO,Clothing,Socks,No,3,Mountain,2012-07-01
6,215,CA-1098,Cap,CL_CA,Clothing,Caps,No,6,Other,2012-07-01
7,216,XX-0000,Mystery,,,,,,,
";

pub(crate) const SALES: &str = "\
order_number,product_key,customer_key,order_date,shipping_date,due_date,sales_amount,quantity,price
SO1,2,1,2010-12-29,2011-01-05,2011-01-10,3000,1,3000
SO1,4,1,2010-12-29,2011-01-05,2011-01-10,35,1,35
SO2,3,2,2011-03-15,2011-03-22,2011-03-27,2000,1,2000
SO3,1,3,2012-06-01,2012-06-08,2012-06-13,200,2,100
SO4,5,4,2013-01-20,2013-01-27,2013-02-01,9,1,9
SO5,6,4,2013-02-11,2013-02-18,2013-02-23,9,3,3
SO6,7,5,2014-01-28,2014-02-04,2014-02-09,50,1,50
SO7,99,99,2014-01-28,,,20,2,10
";

pub(crate) fn empty_context() -> ReportContext {
    let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse");
    ReportContext::new(warehouse).with_as_of(CalendarDate::parse("2024-06-30").expect("as-of"))
}

pub(crate) fn loaded_context() -> ReportContext {
    let context = empty_context();
    let report = context.warehouse.load_star(&LoadSources {
        customers: Box::new(CsvText::new("customers", CUSTOMERS)),
        products: Box::new(CsvText::new("products", PRODUCTS)),
        sales: Box::new(CsvText::new("sales", SALES)),
    });
    assert!(report.is_complete(), "{report:?}");
    context
}
