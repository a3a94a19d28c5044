//! Thumbnail rendering for video previews.
//!
//! Frames come out of the introspector as encoded image bytes; this module
//! bounds them to a square box while keeping the aspect ratio and re-encodes
//! them as PNG.

use std::io::Cursor;

use {
    image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, imageops::FilterType},
    tracing::debug,
};

use crate::error::{Context, Result};

/// Largest bounding box edge for video thumbnails. Requests above it are
/// clamped.
pub const MAX_THUMBNAIL_DIMENSION: u32 = 360;

/// A rendered thumbnail.
#[derive(Debug)]
pub struct Thumbnail {
    /// PNG-encoded image data.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Dimensions of a `width`×`height` image scaled down to fit inside a
/// `max`×`max` box. Images already inside the box keep their size.
#[must_use]
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let ratio = (f64::from(max) / f64::from(width)).min(f64::from(max) / f64::from(height));
    let new_width = ((f64::from(width) * ratio).round() as u32).clamp(1, max);
    let new_height = ((f64::from(height) * ratio).round() as u32).clamp(1, max);
    (new_width, new_height)
}

/// Decode a frame, bound it to `max_dimension` (at most
/// [`MAX_THUMBNAIL_DIMENSION`]), and encode it as PNG.
pub fn render_thumbnail(frame: &[u8], max_dimension: u32) -> Result<Thumbnail> {
    if max_dimension == 0 {
        return Err(crate::Error::invalid_input(
            "thumbnail dimension must be greater than zero",
        ));
    }

    let img = ImageReader::new(Cursor::new(frame))
        .with_guessed_format()
        .context("failed to guess frame format")?
        .decode()
        .context("failed to decode frame")?;

    let resized = resize_to_fit(img, max_dimension.min(MAX_THUMBNAIL_DIMENSION));
    let (width, height) = resized.dimensions();

    let mut output = Cursor::new(Vec::new());
    resized
        .write_to(&mut output, ImageFormat::Png)
        .context("failed to encode thumbnail as PNG")?;

    debug!(width, height, bytes = output.get_ref().len(), "rendered thumbnail");
    Ok(Thumbnail {
        data: output.into_inner(),
        width,
        height,
    })
}

fn resize_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_within(width, height, max_dimension);
    if (new_width, new_height) == (width, height) {
        return img;
    }
    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}
