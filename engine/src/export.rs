//! Export formatter – serialises the raw history or an aggregation result
//! to a downloadable artifact.
//!
//! Tabular exports are comma-delimited with a fixed header in display
//! order; optional fields become empty cells. Structured exports are the
//! full-fidelity JSON array (optional keys omitted). Export filenames embed
//! the generation time to the second, so successive exports never collide.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use biowatch_common::event::DetectionEvent;

use crate::aggregate::{LocationSummary, SpeciesSummary, TimelineSummary};
use crate::history::HistoryStore;

/// Output shape of a history export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => anyhow::bail!("Unknown export format: {other}"),
        }
    }
}

/// Export the history log, optionally filtered to events whose calendar
/// date falls within `[start, end]` inclusive (open-ended when a bound is
/// omitted). Returns the written path, or `None` when the filtered set is
/// empty.
pub fn export_history(
    store: &HistoryStore,
    out_dir: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    format: ExportFormat,
) -> Result<Option<PathBuf>> {
    let events = filter_by_date(store.load(), start, end);
    if events.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create export directory: {}", out_dir.display()))?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = out_dir.join(format!("detection_export_{stamp}.{}", format.extension()));

    let body = match format {
        ExportFormat::Csv => history_csv(&events),
        ExportFormat::Json => serde_json::to_string_pretty(&events)?,
    };
    std::fs::write(&path, body)
        .with_context(|| format!("Cannot write export: {}", path.display()))?;

    info!("Exported {} events to {}", events.len(), path.display());
    Ok(Some(path))
}

/// Keep events whose date lies within the given bounds. With no bounds the
/// log passes through unfiltered; with a bound present, rows whose
/// timestamp has no valid date prefix are dropped (they cannot be placed).
fn filter_by_date(
    events: Vec<DetectionEvent>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<DetectionEvent> {
    if start.is_none() && end.is_none() {
        return events;
    }

    events
        .into_iter()
        .filter(|event| {
            let Some(date) = event.date().and_then(|d| d.parse::<NaiveDate>().ok()) else {
                warn!("Skipping event with malformed timestamp: {}", event.timestamp);
                return false;
            };
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        })
        .collect()
}

// ─── raw history CSV ─────────────────────────────────────────────────────

const HISTORY_HEADER: &[&str] = &[
    "detection_id",
    "timestamp",
    "image_name",
    "species",
    "confidence",
    "count",
    "latitude",
    "longitude",
    "location_name",
    "scientific_name",
    "weight_range",
    "height_range",
    "habitat",
    "conservation_status",
    "description",
    "detected_at",
];

fn history_csv(events: &[DetectionEvent]) -> String {
    let mut out = String::new();
    out.push_str(&HISTORY_HEADER.join(","));
    out.push('\n');

    for e in events {
        let opt_f64 = |v: Option<f64>| v.map(|f| f.to_string()).unwrap_or_default();
        let opt_str = |v: &Option<String>| v.clone().unwrap_or_default();
        let row = [
            e.detection_id.clone(),
            e.timestamp.clone(),
            e.image_name.clone(),
            e.species.clone(),
            e.confidence.to_string(),
            e.count.to_string(),
            opt_f64(e.latitude),
            opt_f64(e.longitude),
            e.location_name.clone(),
            opt_str(&e.scientific_name),
            opt_str(&e.weight_range),
            opt_str(&e.height_range),
            opt_str(&e.habitat),
            opt_str(&e.conservation_status),
            opt_str(&e.description),
            opt_str(&e.detected_at),
        ];
        push_row(&mut out, &row);
    }
    out
}

// ─── report CSVs ─────────────────────────────────────────────────────────

/// Species summary report, confidence as a display percentage.
pub fn species_report_csv(summary: &[SpeciesSummary]) -> String {
    let mut out = String::from("Species,Total Count,Avg. Confidence,Detection Events\n");
    for s in summary {
        push_row(
            &mut out,
            &[
                s.species.clone(),
                s.total_count.to_string(),
                s.avg_confidence_pct(),
                s.detection_events.to_string(),
            ],
        );
    }
    out
}

/// Location analysis report.
pub fn location_report_csv(summary: &[LocationSummary]) -> String {
    let mut out =
        String::from("Location,Latitude,Longitude,Unique Species,Total Detections,Images Analyzed\n");
    for s in summary {
        push_row(
            &mut out,
            &[
                s.location_name.clone(),
                s.latitude.map(|v| v.to_string()).unwrap_or_default(),
                s.longitude.map(|v| v.to_string()).unwrap_or_default(),
                s.unique_species.to_string(),
                s.total_detections.to_string(),
                s.images_analyzed.to_string(),
            ],
        );
    }
    out
}

/// Daily timeline report.
pub fn timeline_report_csv(summary: &[TimelineSummary]) -> String {
    let mut out = String::from("Date,Species Count,Total Detections,Images Analyzed\n");
    for s in summary {
        push_row(
            &mut out,
            &[
                s.date.clone(),
                s.species_count.to_string(),
                s.total_detections.to_string(),
                s.images.to_string(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: &[String]) {
    let escaped: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use biowatch_common::event::DetectionRecord;

    fn event(species: &str, timestamp: &str) -> DetectionEvent {
        DetectionEvent::from_record(
            "run-1",
            timestamp,
            "trap_001.jpg",
            None,
            &DetectionRecord::new(species, 0.8),
        )
    }

    fn fresh_store(name: &str) -> HistoryStore {
        let dir = std::env::temp_dir().join("biowatch_export_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{name}.json"));
        std::fs::remove_file(&path).ok();
        HistoryStore::new(path)
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_filter_by_date_inclusive_bounds() {
        let events = vec![
            event("red fox", "2025-01-01 08:00:00"),
            event("coyote", "2025-01-15 09:00:00"),
            event("bobcat", "2025-02-01 10:00:00"),
        ];
        let kept = filter_by_date(events, Some(date("2025-01-10")), Some(date("2025-01-31")));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].species, "coyote");
    }

    #[test]
    fn test_filter_open_ended() {
        let events = vec![
            event("red fox", "2025-01-01 08:00:00"),
            event("coyote", "2025-02-01 09:00:00"),
        ];
        let kept = filter_by_date(events.clone(), Some(date("2025-01-15")), None);
        assert_eq!(kept.len(), 1);
        let kept = filter_by_date(events, None, Some(date("2025-01-15")));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].species, "red fox");
    }

    #[test]
    fn test_export_empty_set_returns_none() {
        let store = fresh_store("empty");
        let out_dir = std::env::temp_dir().join("biowatch_export_test/out");
        let path =
            export_history(&store, &out_dir, None, None, ExportFormat::Csv).unwrap();
        assert!(path.is_none());
    }

    #[test]
    fn test_export_csv_file() {
        let store = fresh_store("csv");
        store
            .append(&[
                event("red fox", "2025-01-01 08:00:00"),
                event("coyote", "2025-01-15 09:00:00"),
            ])
            .unwrap();

        let out_dir = std::env::temp_dir().join("biowatch_export_test/out");
        let path = export_history(&store, &out_dir, None, None, ExportFormat::Csv)
            .unwrap()
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("detection_export_"));
        assert!(name.ends_with(".csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), HISTORY_HEADER.join(","));
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("red fox"));
    }

    #[test]
    fn test_export_json_round_trips() {
        let store = fresh_store("json");
        store.append(&[event("bobcat", "2025-01-02 07:00:00")]).unwrap();

        let out_dir = std::env::temp_dir().join("biowatch_export_test/out");
        let path = export_history(&store, &out_dir, None, None, ExportFormat::Json)
            .unwrap()
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<DetectionEvent> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].species, "bobcat");
        // Optional fields stay absent in the structured export too.
        assert!(!text.contains("scientific_name"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_species_report_csv_percentages() {
        let summary = vec![SpeciesSummary {
            species: "red fox".to_string(),
            total_count: 3,
            avg_confidence: 0.825,
            detection_events: 2,
        }];
        let csv = species_report_csv(&summary);
        assert!(csv.starts_with("Species,Total Count,Avg. Confidence,Detection Events\n"));
        assert!(csv.contains("red fox,3,82.5%,2"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
