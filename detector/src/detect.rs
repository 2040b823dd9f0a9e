//! Pluggable detection strategies.
//!
//! [`RandomDetector`] is the shipped placeholder strategy: 1 to 3 distinct
//! species per image with plausible confidences and bounding boxes. It is
//! seedable so tests can run against a reproducible event stream.
//! [`ScriptedDetector`] replays canned results.

use std::collections::VecDeque;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use biowatch_common::event::{BoundingBox, DetectionRecord};
use biowatch_common::TIMESTAMP_FORMAT;

use crate::species::{SpeciesProfile, PROFILES};

/// Maximum confidence the stub detector will report.
const MAX_CONFIDENCE: f64 = 0.95;

/// Highest usable confidence threshold. Thresholds come from the config
/// file unvalidated; anything above this would collapse the sampling range.
const MAX_THRESHOLD: f64 = 0.9;

/// Images smaller than this (either dimension) get no bounding boxes.
const MIN_BOX_DIM: u32 = 64;

/// A detection strategy: image in, detection records out.
///
/// Implementations take `&mut self` so stateful strategies (an RNG, a
/// scripted queue) fit behind the same interface.
pub trait Detector: Send {
    fn detect(&mut self, image: &RgbImage) -> Vec<DetectionRecord>;
}

// ─── random strategy ─────────────────────────────────────────────────────

/// The placeholder "model": randomized sampling over the species table.
pub struct RandomDetector {
    rng: StdRng,
    confidence_threshold: f64,
}

impl RandomDetector {
    pub fn new(confidence_threshold: f64) -> Self {
        RandomDetector {
            rng: StdRng::from_entropy(),
            confidence_threshold: confidence_threshold.clamp(0.0, MAX_THRESHOLD),
        }
    }

    /// Deterministic variant for reproducible runs and tests.
    pub fn with_seed(confidence_threshold: f64, seed: u64) -> Self {
        RandomDetector {
            rng: StdRng::seed_from_u64(seed),
            confidence_threshold: confidence_threshold.clamp(0.0, MAX_THRESHOLD),
        }
    }

    fn record_for(&mut self, profile: &SpeciesProfile, width: u32, height: u32) -> DetectionRecord {
        let confidence = self.rng.gen_range(self.confidence_threshold..MAX_CONFIDENCE);
        let bounding_box = self.sample_box(width, height);

        DetectionRecord {
            count: Some(1),
            bounding_box,
            scientific_name: Some(profile.scientific_name.to_string()),
            weight_range: Some(profile.weight_range.to_string()),
            height_range: Some(profile.height_range.to_string()),
            habitat: Some(profile.habitat.to_string()),
            conservation_status: Some(profile.conservation_status.to_string()),
            description: Some(profile.description.to_string()),
            detected_at: Some(now_timestamp()),
            ..DetectionRecord::new(profile.name, confidence)
        }
    }

    /// A plausible box in the upper-left-ish half, clamped to stay inside
    /// the image with a small margin.
    fn sample_box(&mut self, width: u32, height: u32) -> Option<BoundingBox> {
        if width < MIN_BOX_DIM || height < MIN_BOX_DIM {
            return None;
        }

        let box_w = self.rng.gen_range(width / 8..=width / 3);
        let box_h = self.rng.gen_range(height / 8..=height / 3);
        let x = self.rng.gen_range(10..=width / 2).min(width.saturating_sub(box_w + 5));
        let y = self.rng.gen_range(10..=height / 2).min(height.saturating_sub(box_h + 5));

        Some(BoundingBox {
            x,
            y,
            width: box_w,
            height: box_h,
        })
    }
}

impl Detector for RandomDetector {
    fn detect(&mut self, image: &RgbImage) -> Vec<DetectionRecord> {
        let (width, height) = image.dimensions();
        let num_detections = self.rng.gen_range(1..=3usize);

        // Sample without replacement so one image never reports a species twice.
        let mut available: Vec<&SpeciesProfile> = PROFILES.iter().collect();
        let mut records = Vec::with_capacity(num_detections);
        for _ in 0..num_detections {
            if available.is_empty() {
                break;
            }
            let idx = self.rng.gen_range(0..available.len());
            let profile = available.swap_remove(idx);
            records.push(self.record_for(profile, width, height));
        }

        if records.is_empty() {
            records.push(DetectionRecord::no_wildlife(&now_timestamp()));
        }
        records
    }
}

// ─── scripted strategy ───────────────────────────────────────────────────

/// Replays pre-queued record lists, one per `detect` call; an exhausted
/// queue yields the sentinel.
#[derive(Default)]
pub struct ScriptedDetector {
    queue: VecDeque<Vec<DetectionRecord>>,
}

impl ScriptedDetector {
    pub fn new(runs: impl IntoIterator<Item = Vec<DetectionRecord>>) -> Self {
        ScriptedDetector {
            queue: runs.into_iter().collect(),
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, _image: &RgbImage) -> Vec<DetectionRecord> {
        self.queue
            .pop_front()
            .unwrap_or_else(|| vec![DetectionRecord::no_wildlife(&now_timestamp())])
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

// ─── tests ───────────────────────────────────────────────────────────────
