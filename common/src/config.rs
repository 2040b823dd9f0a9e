//! Configuration parsing – reads a KEY=VALUE file (`biowatch.conf`).
//!
//! Lines starting with `#` are comments, values may be optionally
//! double-quoted, unknown keys are silently ignored and every key has a
//! default so the server runs with no config file at all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Application configuration shared by the server binary and tools.
#[derive(Debug, Clone)]
pub struct Config {
    // ── storage ──────────────────────────────────────────────────────
    /// Directory for the history store and export artifacts.
    pub data_dir: PathBuf,
    /// History store document (defaults to `<data_dir>/detection_history.json`).
    pub history_file: PathBuf,
    /// Directory export files are written to.
    pub export_dir: PathBuf,
    /// Directory annotated images are written to.
    pub annotated_dir: PathBuf,

    // ── detection ────────────────────────────────────────────────────
    /// Minimum confidence the stub detector will emit.
    pub confidence_threshold: f64,
    /// Fixed RNG seed for the stub detector (reproducible runs).
    pub detector_seed: Option<u64>,

    // ── images ───────────────────────────────────────────────────────
    /// Uploads larger than this (either dimension) are downscaled.
    pub max_image_dim: u32,

    // ── network ──────────────────────────────────────────────────────
    /// Address the HTTP API listens on.
    pub listen_addr: String,

    // ── locations ────────────────────────────────────────────────────
    /// Optional TOML file overriding the built-in location registry.
    pub locations_file: Option<PathBuf>,
}

impl Config {
    /// Default config path.
    pub fn default_path() -> &'static str {
        "/etc/biowatch/biowatch.conf"
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Config> {
        if path.exists() {
            load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(from_map(&HashMap::new()))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        from_map(&HashMap::new())
    }
}

/// Parse a `KEY=VALUE` configuration file.
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let map = parse_conf(&text);
    info!("Loaded config from {}", path.display());
    Ok(from_map(&map))
}

fn from_map(map: &HashMap<String, String>) -> Config {
    let get = |key: &str| -> Option<String> { map.get(key).cloned() };
    let get_f64 = |key: &str, default: f64| -> f64 {
        get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let get_u32 = |key: &str, default: u32| -> u32 {
        get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    };

    let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "data".into()));
    let history_file = get("HISTORY_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("detection_history.json"));
    let export_dir = get("EXPORT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.clone());
    let annotated_dir = get("ANNOTATED_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("annotated"));

    Config {
        data_dir,
        history_file,
        export_dir,
        annotated_dir,
        confidence_threshold: get_f64("CONFIDENCE_THRESHOLD", 0.5),
        detector_seed: get("DETECTOR_SEED").and_then(|v| v.parse().ok()),
        max_image_dim: get_u32("MAX_IMAGE_DIM", 1200),
        listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8090".into()),
        locations_file: get("LOCATIONS_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
    }
}

/// Parse `KEY=VALUE` lines into a map, stripping optional double-quotes.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            map.insert(key.to_string(), val.to_string());
        }
    }
    map
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conf() {
        let text = r#"
# comment
DATA_DIR=/var/lib/biowatch
LISTEN_ADDR="0.0.0.0:9090"
CONFIDENCE_THRESHOLD=0.6
DETECTOR_SEED=42
"#;
        let map = parse_conf(text);
        assert_eq!(map["DATA_DIR"], "/var/lib/biowatch");
        assert_eq!(map["LISTEN_ADDR"], "0.0.0.0:9090");

        let config = from_map(&map);
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.detector_seed, Some(42));
        assert_eq!(
            config.history_file,
            PathBuf::from("/var/lib/biowatch/detection_history.json")
        );
        assert_eq!(config.annotated_dir, PathBuf::from("/var/lib/biowatch/annotated"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.history_file, PathBuf::from("data/detection_history.json"));
        assert_eq!(config.max_image_dim, 1200);
        assert!(config.detector_seed.is_none());
        assert!(config.locations_file.is_none());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/biowatch.conf")).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8090");
    }
}
