//! Detection collaborators for the BioWatch core.
//!
//! The core treats detection as a black box: given a normalized image it
//! receives a list of [`DetectionRecord`]s plus an annotated image. There
//! is no real computer-vision model here — the shipped strategy samples a
//! fixed species lookup table — but the interface is a pluggable, seedable
//! trait so tests can inject deterministic detection sequences.

pub mod annotate;
pub mod detect;
pub mod ingest;
mod species;

pub use detect::{Detector, RandomDetector, ScriptedDetector};
