//! Detection event and detector-contract types.
//!
//! A `DetectionEvent` is one row of the history store: a single species
//! observation (or its absence) tied to an image and a monitoring location.
//! A `DetectionRecord` is what a detection strategy produces for one image;
//! the two are linked by [`DetectionEvent::from_record`].

use serde::{Deserialize, Serialize};

use crate::locations::Location;

/// Pixel-space bounding box `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One detection produced by a strategy for a single image.
///
/// Only `species` and `confidence` are guaranteed; everything else is
/// optional and must be tolerated as absent downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub species: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub habitat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conservation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<String>,
}

impl DetectionRecord {
    /// A bare record carrying only the mandatory fields.
    pub fn new(species: &str, confidence: f64) -> Self {
        DetectionRecord {
            species: species.to_string(),
            confidence,
            count: None,
            bounding_box: None,
            scientific_name: None,
            weight_range: None,
            height_range: None,
            habitat: None,
            conservation_status: None,
            description: None,
            detected_at: None,
        }
    }

    /// The "nothing found" sentinel record: zero confidence, zero count,
    /// no bounding box.
    pub fn no_wildlife(detected_at: &str) -> Self {
        DetectionRecord {
            count: Some(0),
            detected_at: Some(detected_at.to_string()),
            ..DetectionRecord::new(crate::NO_WILDLIFE, 0.0)
        }
    }
}

/// A single row of the detection history.
///
/// Multiple events may share a `detection_id` — one analysis run yields one
/// event per detected species. Optional fields are omitted from the stored
/// document when absent, never null-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub detection_id: String,
    /// Event creation time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Source image filename (may repeat across runs).
    pub image_name: String,
    pub species: String,
    pub confidence: f64,
    /// Individuals of this species in the image.
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default = "default_location_name")]
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habitat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conservation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<String>,
}

fn default_count() -> u32 {
    1
}

fn default_location_name() -> String {
    "Unknown".to_string()
}

impl DetectionEvent {
    /// Build a history event from one detector record.
    ///
    /// `detection_id` and `timestamp` are shared by all records of the same
    /// analysis run. A missing `count` defaults to 1.
    pub fn from_record(
        detection_id: &str,
        timestamp: &str,
        image_name: &str,
        location: Option<&Location>,
        record: &DetectionRecord,
    ) -> Self {
        DetectionEvent {
            detection_id: detection_id.to_string(),
            timestamp: timestamp.to_string(),
            image_name: image_name.to_string(),
            species: record.species.clone(),
            confidence: record.confidence,
            count: record.count.unwrap_or(1),
            latitude: location.map(|l| l.latitude),
            longitude: location.map(|l| l.longitude),
            location_name: location
                .map(|l| l.location_name.clone())
                .unwrap_or_else(default_location_name),
            scientific_name: record.scientific_name.clone(),
            weight_range: record.weight_range.clone(),
            height_range: record.height_range.clone(),
            habitat: record.habitat.clone(),
            conservation_status: record.conservation_status.clone(),
            description: record.description.clone(),
            detected_at: record.detected_at.clone(),
        }
    }

    /// Calendar date prefix of `timestamp` (`YYYY-MM-DD`), if well-formed.
    pub fn date(&self) -> Option<&str> {
        let prefix = self.timestamp.get(..10)?;
        chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()?;
        Some(prefix)
    }

    /// Whether this row is the "no wildlife" sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.species.eq_ignore_ascii_case(crate::NO_WILDLIFE)
    }
}

impl std::fmt::Display for DetectionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DetectionEvent({}, {}, {:.4}, count={}, {})",
            self.species, self.image_name, self.confidence, self.count, self.timestamp
        )
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
