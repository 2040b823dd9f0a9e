//! BioWatch core: the detection-history store, the aggregation engine and
//! the export formatter.
//!
//! Everything here is synchronous, single-writer and backed by one flat
//! JSON document. Presentation surfaces (dashboard, reports, maps) consume
//! the aggregation output verbatim and do no grouping of their own.

pub mod aggregate;
pub mod export;
pub mod history;

pub use history::HistoryStore;
