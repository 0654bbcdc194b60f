//! Read side of the café workflow engine.
//!
//! Projections fold committed events into query models. The
//! [`ProjectionProcessor`] catches registered projections up on demand, and
//! [`SalesReportView`] answers the daily, range, and top-product reports over
//! paid orders.

pub mod error;
pub mod period;
pub mod processor;
pub mod projection;
pub mod views;

pub use error::{ProjectionError, Result};
pub use period::ReportPeriod;
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use views::{ProductSales, SalesReportView, SalesSummary};
