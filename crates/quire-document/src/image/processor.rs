// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — rotate rendered pages, measure their ink coverage, and
// encode them as PDF image payloads. Operates on in-memory images using the
// `image` and `flate2` crates.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use quire_core::error::{QuireError, Result};
use quire_core::types::{RasterFormat, Rotation};
use tracing::{debug, instrument};

/// JPEG quality used when a preset asks for JPEG without naming one.
const DEFAULT_JPEG_QUALITY: f32 = 0.85;

/// PDF stream filter an encoded payload must be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// Baseline JPEG (`/DCTDecode`).
    Dct,
    /// zlib-compressed 8-bit RGB samples (`/FlateDecode`).
    Flate,
}

/// An image ready to be embedded as a PDF image XObject.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub filter: ImageFilter,
    pub width: u32,
    pub height: u32,
}

/// Image processing pipeline operating on a single rendered page.
///
/// Transformations consume `self` and return a new processor so calls chain:
///
/// ```ignore
/// let encoded = ImageProcessor::from_rgba(bitmap)
///     .rotate(Rotation::Deg90)
///     .encode_for_pdf(RasterFormat::Jpeg, Some(0.7))?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the image as RGBA.
    pub fn into_rgba(self) -> RgbaImage {
        self.image.into_rgba8()
    }

    // -- Transformations ------------------------------------------------------

    /// Rotate clockwise by a quarter-turn multiple. Lossless.
    pub fn rotate(self, rotation: Rotation) -> Self {
        let image = match rotation {
            Rotation::Deg0 => self.image,
            Rotation::Deg90 => self.image.rotate90(),
            Rotation::Deg180 => self.image.rotate180(),
            Rotation::Deg270 => self.image.rotate270(),
        };
        Self { image }
    }

    // -- Analysis -------------------------------------------------------------

    /// Fraction of pixels carrying ink: not fully transparent, and with at
    /// least one channel darker than `near_white`.
    pub fn ink_coverage(&self, near_white: u8) -> f32 {
        let rgba = self.image.to_rgba8();
        let total = u64::from(rgba.width()) * u64::from(rgba.height());
        if total == 0 {
            return 0.0;
        }
        let inked = rgba
            .pixels()
            .filter(|pixel| {
                let [r, g, b, a] = pixel.0;
                a > 0 && (r < near_white || g < near_white || b < near_white)
            })
            .count() as u64;
        (inked as f64 / total as f64) as f32
    }

    // -- Output ---------------------------------------------------------------

    /// Encode for embedding in a PDF.
    ///
    /// Transparent regions are flattened onto white first; PDF image
    /// XObjects here carry no soft mask. `quality` is in `0.0..=1.0` and only
    /// affects JPEG.
    #[instrument(skip(self), fields(width = self.width(), height = self.height()))]
    pub fn encode_for_pdf(&self, format: RasterFormat, quality: Option<f32>) -> Result<EncodedImage> {
        let rgb = flatten_onto_white(&self.image.to_rgba8());
        let (width, height) = rgb.dimensions();

        let (data, filter) = match format {
            RasterFormat::Jpeg => {
                let quality = jpeg_quality(quality.unwrap_or(DEFAULT_JPEG_QUALITY));
                let mut buffer = Vec::new();
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
                rgb.write_with_encoder(encoder).map_err(|err| {
                    QuireError::Render(format!("JPEG encoding failed: {}", err))
                })?;
                (buffer, ImageFilter::Dct)
            }
            RasterFormat::Png => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
                encoder
                    .write_all(rgb.as_raw())
                    .and_then(|()| encoder.flush())
                    .map_err(|err| QuireError::Render(format!("Flate encoding failed: {}", err)))?;
                let buffer = encoder
                    .finish()
                    .map_err(|err| QuireError::Render(format!("Flate encoding failed: {}", err)))?;
                (buffer, ImageFilter::Flate)
            }
        };

        debug!(bytes = data.len(), ?filter, "Image encoded");
        Ok(EncodedImage {
            data,
            filter,
            width,
            height,
        })
    }
}

/// Map a `0.0..=1.0` quality onto the JPEG encoder's `1..=100` scale.
fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |channel: u8| -> u8 {
            ((u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::Rgba;
    use std::io::Read;

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn blank_page_has_no_ink() {
        let processor = ImageProcessor::from_rgba(white(40, 52));
        assert_eq!(processor.ink_coverage(250), 0.0);
    }

    #[test]
    fn transparent_pixels_are_not_ink() {
        let image = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        assert_eq!(ImageProcessor::from_rgba(image).ink_coverage(250), 0.0);
    }

    #[test]
    fn ink_coverage_counts_dark_pixels() {
        let mut image = white(10, 10);
        for x in 0..10 {
            image.put_pixel(x, 0, Rgba([0, 0, 0, 255]));
        }
        // Near-white but under the threshold in one channel.
        image.put_pixel(0, 1, Rgba([255, 249, 255, 255]));
        let coverage = ImageProcessor::from_rgba(image).ink_coverage(250);
        assert!((coverage - 0.11).abs() < 1e-6, "got {coverage}");
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let rotated = ImageProcessor::from_rgba(white(30, 10)).rotate(Rotation::Deg90);
        assert_eq!((rotated.width(), rotated.height()), (10, 30));
        let upright = rotated.rotate(Rotation::Deg180);
        assert_eq!((upright.width(), upright.height()), (10, 30));
    }

    #[test]
    fn png_payload_is_raw_rgb_under_zlib() {
        let encoded = ImageProcessor::from_rgba(white(4, 3))
            .encode_for_pdf(RasterFormat::Png, None)
            .expect("encode");
        assert_eq!(encoded.filter, ImageFilter::Flate);

        let mut raw = Vec::new();
        ZlibDecoder::new(encoded.data.as_slice())
            .read_to_end(&mut raw)
            .expect("inflate");
        assert_eq!(raw.len(), 4 * 3 * 3);
        assert!(raw.iter().all(|&byte| byte == 255));
    }

    #[test]
    fn jpeg_quality_changes_payload_size() {
        let mut image = white(64, 64);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255]);
        }
        let processor = ImageProcessor::from_rgba(image);
        let high = processor.encode_for_pdf(RasterFormat::Jpeg, Some(0.95)).expect("high");
        let low = processor.encode_for_pdf(RasterFormat::Jpeg, Some(0.3)).expect("low");
        assert_eq!(high.filter, ImageFilter::Dct);
        assert!(low.data.len() < high.data.len());
    }

    #[test]
    fn transparency_flattens_to_white() {
        let flattened = flatten_onto_white(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flattened.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn quality_maps_onto_encoder_scale() {
        assert_eq!(jpeg_quality(0.7), 70);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(2.0), 100);
    }
}
