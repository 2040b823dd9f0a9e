//! Aggregation engine – pure group-by summaries over a loaded event log.
//!
//! All functions are side-effect free, tolerate missing optional fields and
//! return deterministically ordered results regardless of storage order.
//! The "No wildlife detected" sentinel participates in every grouping like
//! any other species label (it marks an analysed image, not missing data).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use biowatch_common::event::DetectionEvent;

// ─── species ─────────────────────────────────────────────────────────────

/// Per-species roll-up, ordered by species name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub species: String,
    /// Sum of `count` across all events of this species.
    pub total_count: u64,
    /// Unweighted mean of event confidences.
    pub avg_confidence: f64,
    /// Number of events (rows) — not distinct detection IDs.
    pub detection_events: u64,
}

impl SpeciesSummary {
    /// Mean confidence as a display percentage, one decimal ("82.5%").
    pub fn avg_confidence_pct(&self) -> String {
        format!("{:.1}%", self.avg_confidence * 100.0)
    }
}

/// Group by species: total individuals, mean confidence, event count.
pub fn species_summary(log: &[DetectionEvent]) -> Vec<SpeciesSummary> {
    struct Acc {
        total_count: u64,
        confidence_sum: f64,
        events: u64,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for event in log {
        let acc = groups.entry(event.species.as_str()).or_insert(Acc {
            total_count: 0,
            confidence_sum: 0.0,
            events: 0,
        });
        acc.total_count += u64::from(event.count);
        acc.confidence_sum += event.confidence;
        acc.events += 1;
    }

    groups
        .into_iter()
        .map(|(species, acc)| SpeciesSummary {
            species: species.to_string(),
            total_count: acc.total_count,
            avg_confidence: acc.confidence_sum / acc.events as f64,
            detection_events: acc.events,
        })
        .collect()
}

/// One bar of the species-distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub species: String,
    pub total_count: u64,
}

/// Species totals sorted by count descending (ties broken by name), ready
/// for the distribution chart.
pub fn species_distribution(log: &[DetectionEvent]) -> Vec<SpeciesCount> {
    let mut counts: Vec<SpeciesCount> = species_summary(log)
        .into_iter()
        .map(|s| SpeciesCount {
            species: s.species,
            total_count: s.total_count,
        })
        .collect();
    counts.sort_by(|a, b| b.total_count.cmp(&a.total_count).then(a.species.cmp(&b.species)));
    counts
}

// ─── locations ───────────────────────────────────────────────────────────

/// Per-site roll-up. The grouping key is the full triple
/// (location_name, latitude, longitude): the same name at different
/// coordinates forms distinct groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub unique_species: u64,
    pub total_detections: u64,
    pub images_analyzed: u64,
}

pub fn location_summary(log: &[DetectionEvent]) -> Vec<LocationSummary> {
    struct Group<'a> {
        location_name: &'a str,
        latitude: Option<f64>,
        longitude: Option<f64>,
        species: BTreeSet<&'a str>,
        total_detections: u64,
        images: BTreeSet<&'a str>,
    }

    let mut groups: Vec<Group> = Vec::new();
    for event in log {
        let idx = groups
            .iter()
            .position(|g| {
                g.location_name == event.location_name
                    && g.latitude == event.latitude
                    && g.longitude == event.longitude
            })
            .unwrap_or_else(|| {
                groups.push(Group {
                    location_name: &event.location_name,
                    latitude: event.latitude,
                    longitude: event.longitude,
                    species: BTreeSet::new(),
                    total_detections: 0,
                    images: BTreeSet::new(),
                });
                groups.len() - 1
            });
        let group = &mut groups[idx];
        group.species.insert(&event.species);
        group.total_detections += u64::from(event.count);
        group.images.insert(&event.image_name);
    }

    let mut summaries: Vec<LocationSummary> = groups
        .into_iter()
        .map(|g| LocationSummary {
            location_name: g.location_name.to_string(),
            latitude: g.latitude,
            longitude: g.longitude,
            unique_species: g.species.len() as u64,
            total_detections: g.total_detections,
            images_analyzed: g.images.len() as u64,
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.location_name
            .cmp(&b.location_name)
            .then(a.latitude.partial_cmp(&b.latitude).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.longitude.partial_cmp(&b.longitude).unwrap_or(std::cmp::Ordering::Equal))
    });
    summaries
}

// ─── timeline ────────────────────────────────────────────────────────────

/// Per-day roll-up, ordered ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSummary {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub species_count: u64,
    pub total_detections: u64,
    pub images: u64,
}

/// Group by the calendar date of `timestamp` (timezone-naive truncation).
/// Rows without a well-formed date prefix are skipped.
pub fn timeline_summary(log: &[DetectionEvent]) -> Vec<TimelineSummary> {
    struct Acc<'a> {
        species: BTreeSet<&'a str>,
        total_detections: u64,
        images: BTreeSet<&'a str>,
    }

    let mut days: BTreeMap<&str, Acc> = BTreeMap::new();
    for event in log {
        let Some(date) = event.date() else { continue };
        let acc = days.entry(date).or_insert(Acc {
            species: BTreeSet::new(),
            total_detections: 0,
            images: BTreeSet::new(),
        });
        acc.species.insert(&event.species);
        acc.total_detections += u64::from(event.count);
        acc.images.insert(&event.image_name);
    }

    days.into_iter()
        .map(|(date, acc)| TimelineSummary {
            date: date.to_string(),
            species_count: acc.species.len() as u64,
            total_detections: acc.total_detections,
            images: acc.images.len() as u64,
        })
        .collect()
}

// ─── dashboard metrics ───────────────────────────────────────────────────

/// The dashboard's headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_species: u64,
    pub total_detections: u64,
    pub images_analyzed: u64,
}

pub fn dashboard_metrics(log: &[DetectionEvent]) -> DashboardMetrics {
    let species: BTreeSet<&str> = log.iter().map(|e| e.species.as_str()).collect();
    let images: BTreeSet<&str> = log.iter().map(|e| e.image_name.as_str()).collect();
    DashboardMetrics {
        total_species: species.len() as u64,
        total_detections: log.iter().map(|e| u64::from(e.count)).sum(),
        images_analyzed: images.len() as u64,
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use biowatch_common::event::DetectionRecord;
    use biowatch_common::locations::Location;
    use biowatch_common::NO_WILDLIFE;

    fn event(
        species: &str,
        count: u32,
        confidence: f64,
        timestamp: &str,
        image: &str,
        location: Option<&Location>,
    ) -> DetectionEvent {
        let mut record = DetectionRecord::new(species, confidence);
        record.count = Some(count);
        DetectionEvent::from_record("run", timestamp, image, location, &record)
    }

    fn site(name: &str, lat: f64, lon: f64) -> Location {
        Location {
            latitude: lat,
            longitude: lon,
            location_name: name.to_string(),
        }
    }

    #[test]
    fn test_species_summary_numbers() {
        let log = vec![
            event("red fox", 2, 0.9, "2025-01-01 08:00:00", "a.jpg", None),
            event("red fox", 1, 0.7, "2025-01-01 09:00:00", "b.jpg", None),
            event("coyote", 1, 0.6, "2025-01-02 10:00:00", "c.jpg", None),
        ];

        let summary = species_summary(&log);
        assert_eq!(summary.len(), 2);

        // BTreeMap grouping: coyote sorts before red fox.
        assert_eq!(summary[0].species, "coyote");
        assert_eq!(summary[0].total_count, 1);
        assert_eq!(summary[0].detection_events, 1);
        assert!((summary[0].avg_confidence - 0.6).abs() < 1e-9);

        assert_eq!(summary[1].species, "red fox");
        assert_eq!(summary[1].total_count, 3);
        assert_eq!(summary[1].detection_events, 2);
        assert!((summary[1].avg_confidence - 0.8).abs() < 1e-9);
        assert_eq!(summary[1].avg_confidence_pct(), "80.0%");
    }

    #[test]
    fn test_species_summary_rows_not_distinct_ids() {
        // Two rows sharing one detection_id still count as two events.
        let log = vec![
            event("black bear", 1, 0.8, "2025-01-01 08:00:00", "a.jpg", None),
            event("black bear", 1, 0.6, "2025-01-01 08:00:00", "a.jpg", None),
        ];
        let summary = species_summary(&log);
        assert_eq!(summary[0].detection_events, 2);
    }

    #[test]
    fn test_empty_log_empty_summaries() {
        assert!(species_summary(&[]).is_empty());
        assert!(location_summary(&[]).is_empty());
        assert!(timeline_summary(&[]).is_empty());
        let metrics = dashboard_metrics(&[]);
        assert_eq!(metrics.total_detections, 0);
    }

    #[test]
    fn test_location_composite_key_distinct_groups() {
        // Same name, different latitude: two groups.
        let north = site("Ridge Camera", 44.0, -110.0);
        let south = site("Ridge Camera", 43.5, -110.0);
        let log = vec![
            event("red fox", 1, 0.8, "2025-01-01 08:00:00", "a.jpg", Some(&north)),
            event("red fox", 2, 0.7, "2025-01-01 09:00:00", "b.jpg", Some(&south)),
        ];

        let summary = location_summary(&log);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].latitude, Some(43.5));
        assert_eq!(summary[1].latitude, Some(44.0));
    }

    #[test]
    fn test_location_summary_counts() {
        let yosemite = site("Yosemite Valley", 37.7456, -119.5936);
        let log = vec![
            event("bobcat", 1, 0.8, "2025-01-01 08:00:00", "a.jpg", Some(&yosemite)),
            event("coyote", 2, 0.7, "2025-01-01 09:00:00", "a.jpg", Some(&yosemite)),
            event("bobcat", 1, 0.9, "2025-01-02 07:00:00", "b.jpg", Some(&yosemite)),
        ];

        let summary = location_summary(&log);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].unique_species, 2);
        assert_eq!(summary[0].total_detections, 4);
        assert_eq!(summary[0].images_analyzed, 2);
    }

    #[test]
    fn test_sentinel_participates_in_grouping() {
        let everglades = site("Everglades", 25.2866, -80.8987);
        let log = vec![
            event("raccoon", 1, 0.8, "2025-01-01 08:00:00", "a.jpg", Some(&everglades)),
            event(NO_WILDLIFE, 0, 0.0, "2025-01-01 09:00:00", "b.jpg", Some(&everglades)),
        ];

        let species = species_summary(&log);
        assert_eq!(species.len(), 2);
        assert!(species.iter().any(|s| s.species == NO_WILDLIFE));

        let locations = location_summary(&log);
        assert_eq!(locations[0].unique_species, 2);
        assert_eq!(locations[0].total_detections, 1);
        assert_eq!(locations[0].images_analyzed, 2);
    }

    #[test]
    fn test_timeline_sorted_ascending() {
        // Insertion order deliberately reversed.
        let log = vec![
            event("red fox", 1, 0.8, "2025-01-02 08:00:00", "b.jpg", None),
            event("coyote", 1, 0.7, "2025-01-01 09:00:00", "a.jpg", None),
            event("bobcat", 2, 0.9, "2025-01-02 10:00:00", "c.jpg", None),
        ];

        let timeline = timeline_summary(&log);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].date, "2025-01-01");
        assert_eq!(timeline[1].date, "2025-01-02");
        assert_eq!(timeline[1].species_count, 2);
        assert_eq!(timeline[1].total_detections, 3);
        assert_eq!(timeline[1].images, 2);
    }

    #[test]
    fn test_timeline_skips_malformed_timestamps() {
        let mut bad = event("red fox", 1, 0.8, "2025-01-01 08:00:00", "a.jpg", None);
        bad.timestamp = "not a timestamp".to_string();
        let good = event("coyote", 1, 0.7, "2025-01-02 09:00:00", "b.jpg", None);

        let timeline = timeline_summary(&[bad, good]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].date, "2025-01-02");
    }

    #[test]
    fn test_species_distribution_sorted_by_count() {
        let log = vec![
            event("coyote", 1, 0.7, "2025-01-01 08:00:00", "a.jpg", None),
            event("red fox", 3, 0.8, "2025-01-01 09:00:00", "b.jpg", None),
            event("bobcat", 1, 0.9, "2025-01-01 10:00:00", "c.jpg", None),
        ];
        let distribution = species_distribution(&log);
        assert_eq!(distribution[0].species, "red fox");
        assert_eq!(distribution[0].total_count, 3);
        // Tie between bobcat and coyote broken alphabetically.
        assert_eq!(distribution[1].species, "bobcat");
        assert_eq!(distribution[2].species, "coyote");
    }

    #[test]
    fn test_dashboard_metrics() {
        let log = vec![
            event("red fox", 2, 0.9, "2025-01-01 08:00:00", "a.jpg", None),
            event("coyote", 1, 0.6, "2025-01-01 09:00:00", "a.jpg", None),
            event("red fox", 1, 0.7, "2025-01-02 10:00:00", "b.jpg", None),
        ];
        let metrics = dashboard_metrics(&log);
        assert_eq!(metrics.total_species, 2);
        assert_eq!(metrics.total_detections, 4);
        assert_eq!(metrics.images_analyzed, 2);
    }
}
