//! Shared types for the BioWatch camera-trap monitoring platform.

pub mod config;
pub mod event;
pub mod locations;
pub mod protocol;

/// Timestamp format used throughout the history store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sentinel species value recorded when an analysed image contains no
/// wildlife. Participates in aggregation like any other species label.
pub const NO_WILDLIFE: &str = "No wildlife detected";
