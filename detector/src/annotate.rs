//! Bounding-box annotation for detection result images.

use image::{Rgb, RgbImage};

use biowatch_common::event::{BoundingBox, DetectionRecord};

const HIGH_CONF: Rgb<u8> = Rgb([0, 200, 0]);
const MEDIUM_CONF: Rgb<u8> = Rgb([255, 165, 0]);
const LOW_CONF: Rgb<u8> = Rgb([255, 0, 0]);

const LINE_THICKNESS: u32 = 3;

/// Copy the image and draw each record's bounding box, coloured by
/// confidence band (green > 0.8, orange > 0.65, red below).
pub fn annotate(image: &RgbImage, records: &[DetectionRecord]) -> RgbImage {
    let mut out = image.clone();
    for record in records {
        if let Some(bbox) = record.bounding_box {
            draw_rect(&mut out, bbox, color_for(record.confidence));
        }
    }
    out
}

fn color_for(confidence: f64) -> Rgb<u8> {
    if confidence > 0.8 {
        HIGH_CONF
    } else if confidence > 0.65 {
        MEDIUM_CONF
    } else {
        LOW_CONF
    }
}

/// Rectangle outline, `LINE_THICKNESS` pixels thick, grown inward and
/// clamped to the image bounds.
fn draw_rect(image: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>) {
    let (img_w, img_h) = image.dimensions();
    let x1 = bbox.x.min(img_w.saturating_sub(1));
    let y1 = bbox.y.min(img_h.saturating_sub(1));
    let x2 = (bbox.x + bbox.width).min(img_w.saturating_sub(1));
    let y2 = (bbox.y + bbox.height).min(img_h.saturating_sub(1));

    for t in 0..LINE_THICKNESS {
        let top = (y1 + t).min(y2);
        let bottom = y2.saturating_sub(t).max(y1);
        for x in x1..=x2 {
            image.put_pixel(x, top, color);
            image.put_pixel(x, bottom, color);
        }

        let left = (x1 + t).min(x2);
        let right = x2.saturating_sub(t).max(x1);
        for y in y1..=y2 {
            image.put_pixel(left, y, color);
            image.put_pixel(right, y, color);
        }
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use biowatch_common::event::DetectionRecord;

    fn record_with_box(confidence: f64) -> DetectionRecord {
        let mut record = DetectionRecord::new("red fox", confidence);
        record.bounding_box = Some(BoundingBox {
            x: 10,
            y: 10,
            width: 40,
            height: 30,
        });
        record
    }

    #[test]
    fn test_annotate_draws_box() {
        let image = RgbImage::new(100, 100);
        let annotated = annotate(&image, &[record_with_box(0.9)]);

        assert_eq!(annotated.dimensions(), (100, 100));
        // Corner of the box is painted green (high confidence).
        assert_eq!(*annotated.get_pixel(10, 10), HIGH_CONF);
        // A pixel well inside the box stays untouched.
        assert_eq!(*annotated.get_pixel(30, 25), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(color_for(0.9), HIGH_CONF);
        assert_eq!(color_for(0.7), MEDIUM_CONF);
        assert_eq!(color_for(0.5), LOW_CONF);
    }

    #[test]
    fn test_boxless_record_changes_nothing() {
        let image = RgbImage::new(50, 50);
        let annotated = annotate(&image, &[DetectionRecord::new("coyote", 0.6)]);
        assert_eq!(image, annotated);
    }

    #[test]
    fn test_out_of_bounds_box_is_clamped() {
        let image = RgbImage::new(40, 40);
        let mut record = DetectionRecord::new("bobcat", 0.9);
        record.bounding_box = Some(BoundingBox {
            x: 30,
            y: 30,
            width: 50,
            height: 50,
        });
        // Must not panic.
        let annotated = annotate(&image, &[record]);
        assert_eq!(annotated.dimensions(), (40, 40));
    }
}
