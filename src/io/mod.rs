//! Input/output helpers.
//!
//! - CSV ingest + cleaning (`ingest`)
//! - cleaned / simulated CSV export (`export`)
//! - report JSON read/write (`report`)

pub mod export;
pub mod ingest;
pub mod report;

pub use export::*;
pub use ingest::*;
pub use report::*;
