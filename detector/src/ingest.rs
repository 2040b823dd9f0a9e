//! Image ingestion – decode an upload, normalize it for detection and
//! extract display metadata.
//!
//! Metadata is computed from the image as uploaded; normalization
//! (RGB conversion, downscaling of very large images) happens afterwards
//! so detection always sees a bounded working size.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};
use tracing::debug;

use biowatch_common::protocol::ImageMetadata;

/// Decode `bytes`, extract metadata and return the normalized RGB image.
///
/// Images whose larger dimension exceeds `max_dim` are downscaled with a
/// Lanczos filter, preserving aspect ratio.
pub fn load_image(bytes: &[u8], max_dim: u32) -> Result<(RgbImage, ImageMetadata)> {
    let format = image::guess_format(bytes)
        .map(|f| format!("{f:?}").to_uppercase())
        .unwrap_or_else(|_| "UNKNOWN".to_string());

    let decoded = image::load_from_memory(bytes).context("Cannot decode image")?;
    let (width, height) = decoded.dimensions();

    let metadata = ImageMetadata {
        width,
        height,
        format,
        size_kb: bytes.len() as f64 / 1024.0,
        color_mode: format!("{:?}", decoded.color()),
        aspect_ratio: width as f64 / height as f64,
        camera_make: None,
        camera_model: None,
        gps_latitude: None,
        gps_longitude: None,
    };

    let normalized = if width.max(height) > max_dim {
        debug!("Downscaling {width}x{height} image to fit {max_dim}px");
        decoded.resize(max_dim, max_dim, FilterType::Lanczos3)
    } else {
        decoded
    };

    Ok((normalized.to_rgb8(), metadata))
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_load_image_metadata() {
        let bytes = png_bytes(400, 300);
        let (image, metadata) = load_image(&bytes, 1200).unwrap();

        assert_eq!(image.dimensions(), (400, 300));
        assert_eq!(metadata.width, 400);
        assert_eq!(metadata.height, 300);
        assert_eq!(metadata.format, "PNG");
        assert!((metadata.aspect_ratio - 4.0 / 3.0).abs() < 1e-9);
        assert!(metadata.size_kb > 0.0);
        assert!(metadata.camera_make.is_none());
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let bytes = png_bytes(2400, 1200);
        let (image, metadata) = load_image(&bytes, 1200).unwrap();

        // Normalized copy fits the bound, aspect preserved.
        assert_eq!(image.dimensions(), (1200, 600));
        // Metadata reflects the upload, not the normalized copy.
        assert_eq!(metadata.width, 2400);
        assert_eq!(metadata.height, 1200);
    }

    #[test]
    fn test_garbage_bytes_error() {
        assert!(load_image(b"not an image", 1200).is_err());
    }
}
