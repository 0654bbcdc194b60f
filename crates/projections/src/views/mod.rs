//! Query models built by projections.

pub mod sales_report;

pub use sales_report::{DEFAULT_TOP_PRODUCTS, ProductSales, SalesReportView, SalesSummary};
