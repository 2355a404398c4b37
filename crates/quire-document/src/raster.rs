// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster provider boundary.
//
// Rendering and text extraction are delegated to an external backend (pdfium
// behind the `pdfium` feature, or anything else implementing the trait). The
// assembly and text engines only ever see bitmaps, sizes, and strings.

use image::RgbaImage;
use quire_core::error::Result;
use quire_core::types::{PageSize, Rotation};

/// What the backend learned from opening a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub is_encrypted: bool,
}

/// How large the rendered bitmap should be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderTarget {
    /// Render at this resolution; pixel size is `floor(points / 72 * dpi)`.
    Dpi(f32),
    /// Render to this width, height following the aspect ratio.
    Width(u32),
}

/// A single page render request.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// 0-based page index.
    pub page_index: usize,
    pub target: RenderTarget,
    /// Extra clockwise rotation applied on top of the page's own `/Rotate`.
    pub rotation: Rotation,
    pub password: Option<&'a str>,
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub image: RgbaImage,
    /// Rendered size in points: intrinsic and requested rotation applied.
    pub width_pt: f32,
    pub height_pt: f32,
}

/// One positioned run of text on a page, in unrotated PDF space.
///
/// `transform` is the text matrix `[a, b, c, d, e, f]`; `e`/`f` locate the
/// item's baseline origin with a bottom-left page origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub transform: [f32; 6],
    pub width: f32,
    pub height: f32,
    pub font_name: Option<String>,
}

impl TextItem {
    /// Glyph height: the explicit height, or the scale of the text matrix.
    pub fn glyph_height(&self) -> f32 {
        if self.height > 0.0 {
            self.height
        } else {
            let [_, _, c, d, _, _] = self.transform;
            c.hypot(d)
        }
    }
}

/// The positioned text of a page plus the viewport it was measured against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTextContent {
    pub items: Vec<TextItem>,
    pub viewport: Option<PageSize>,
}

/// Backend that opens, measures, renders, and extracts text from PDF pages.
///
/// Implementations must be callable from several threads at once: assembly
/// renders pages in parallel.
pub trait RasterProvider: Send + Sync {
    /// Open the document, returning its page count.
    ///
    /// Fails with `PasswordRequired` when the document needs a password and
    /// none was given, `PasswordIncorrect` when the given one is wrong, and
    /// `Load` for anything that is not a readable PDF.
    fn open(&self, bytes: &[u8], password: Option<&str>) -> Result<DocumentInfo>;

    /// Page size in points as displayed (intrinsic rotation applied).
    fn page_size(&self, bytes: &[u8], page_index: usize, password: Option<&str>)
    -> Result<PageSize>;

    fn render(&self, bytes: &[u8], request: &RenderRequest<'_>) -> Result<Bitmap>;

    /// Plain text of the page's native text layer.
    fn extract_text(&self, bytes: &[u8], page_index: usize, password: Option<&str>)
    -> Result<String>;

    /// Positioned text items; backends without layout information return none.
    fn text_items(
        &self,
        _bytes: &[u8],
        _page_index: usize,
        _password: Option<&str>,
    ) -> Result<PageTextContent> {
        Ok(PageTextContent::default())
    }
}

/// Measures rendered text widths using real font metrics.
///
/// When no measurer is available highlight widths fall back to a uniform
/// per-character split.
pub trait TextMeasurer {
    /// Width of `text` set in `item`'s font, in the same units as `item.width`.
    fn measure(&self, item: &TextItem, text: &str) -> Option<f32>;
}

/// Pixel dimensions of a page rendered at `dpi`.
pub fn pixel_dimensions(size: PageSize, dpi: f32) -> (u32, u32) {
    let width = (size.width_pt / 72.0 * dpi).floor().max(1.0) as u32;
    let height = (size.height_pt / 72.0 * dpi).floor().max(1.0) as u32;
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_at_72_dpi_is_point_sized() {
        assert_eq!(pixel_dimensions(PageSize::LETTER, 72.0), (612, 792));
        assert_eq!(pixel_dimensions(PageSize::LETTER, 144.0), (1224, 1584));
    }

    #[test]
    fn tiny_pages_never_reach_zero_pixels() {
        assert_eq!(pixel_dimensions(PageSize::new(0.1, 0.1), 10.0), (1, 1));
    }

    #[test]
    fn glyph_height_falls_back_to_matrix_scale() {
        let item = TextItem {
            text: "x".into(),
            transform: [12.0, 0.0, 0.0, 12.0, 0.0, 0.0],
            width: 6.0,
            height: 0.0,
            font_name: None,
        };
        assert!((item.glyph_height() - 12.0).abs() < 1e-6);
    }
}
