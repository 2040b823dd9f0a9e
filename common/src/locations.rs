//! Monitoring-location registry.
//!
//! A fixed set of named camera-trap sites ships built in; deployments can
//! override it with a TOML file:
//!
//! ```toml
//! [locations."Cloud Forest East"]
//! latitude = 9.4175
//! longitude = -83.8111
//! ```
//!
//! The `location_name` of each entry defaults to its registry key.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Coordinates and display label of one monitoring site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub location_name: String,
}

/// Ordered map from display name to site coordinates.
pub type Registry = BTreeMap<String, Location>;

#[derive(Debug, Deserialize)]
struct RegistryFile {
    locations: BTreeMap<String, LocationEntry>,
}

#[derive(Debug, Deserialize)]
struct LocationEntry {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    location_name: Option<String>,
}

/// The built-in sample registry.
pub fn sample_locations() -> Registry {
    const SITES: &[(&str, f64, f64)] = &[
        ("Yellowstone North", 44.9631, -110.5989),
        ("Yellowstone Central", 44.4280, -110.5885),
        ("Yellowstone South", 44.1350, -110.6663),
        ("Grand Teton", 43.7904, -110.6818),
        ("Olympic National Forest", 47.8021, -123.6044),
        ("Yosemite Valley", 37.7456, -119.5936),
        ("Glacier National Park", 48.7596, -113.7870),
        ("Everglades", 25.2866, -80.8987),
        ("Great Smoky Mountains", 35.6131, -83.5532),
    ];

    SITES
        .iter()
        .map(|&(name, lat, lon)| {
            (
                name.to_string(),
                Location {
                    latitude: lat,
                    longitude: lon,
                    location_name: name.to_string(),
                },
            )
        })
        .collect()
}

/// Load a registry override from a TOML file.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read locations file: {}", path.display()))?;
    let file: RegistryFile =
        toml::from_str(&text).with_context(|| format!("Bad locations file: {}", path.display()))?;

    let registry: Registry = file
        .locations
        .into_iter()
        .map(|(name, entry)| {
            let location_name = entry.location_name.unwrap_or_else(|| name.clone());
            (
                name,
                Location {
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                    location_name,
                },
            )
        })
        .collect();

    info!("Loaded {} locations from {}", registry.len(), path.display());
    Ok(registry)
}

/// Registry from config: the override file when configured, otherwise the
/// built-in sites.
pub fn registry_from_config(config: &crate::config::Config) -> Result<Registry> {
    match &config.locations_file {
        Some(path) => load_registry(path),
        None => Ok(sample_locations()),
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
