//! Agent pipeline for the menu assistant
//!
//! - `ingestion` - Replace the index contents from a menu document
//! - `reply` - Retrieve menu context and stream an answer
//! - `export` - Dump every stored record's metadata

pub mod export;
pub mod ingestion;
pub mod reply;

pub use export::{DataExporter, FETCH_BATCH_SIZE};
pub use ingestion::{replace_all, IngestionAgent, IngestionReport, ReplaceOutcome};
pub use reply::{ReplyAgent, ReplyStream, StreamEnd};
