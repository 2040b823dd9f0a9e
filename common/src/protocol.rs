//! Shared HTTP protocol types for the BioWatch API server.

use serde::{Deserialize, Serialize};

use crate::event::DetectionEvent;

/// Health-check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// Metadata extracted from an uploaded image.
///
/// Camera/GPS fields are part of the ingestion contract but optional;
/// they are omitted when the source image carries no such data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_kb: f64,
    pub color_mode: String,
    pub aspect_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
}

/// Result of one upload-and-detect request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Identifier shared by all events of this analysis run.
    pub detection_id: String,
    pub timestamp: String,
    pub image_name: String,
    pub events: Vec<DetectionEvent>,
    pub metadata: ImageMetadata,
    /// Where the annotated copy of the image was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_path: Option<String>,
}

/// Result of an export request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub path: String,
}

/// Result of a clear-history request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: bool,
}
