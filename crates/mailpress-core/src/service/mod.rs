//! Pipeline orchestration.

mod ingest;

pub use ingest::{IngestReceipt, Pipeline};
