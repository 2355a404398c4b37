// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster provider backed by Pdfium through `pdfium-render`.
//
// Only available with the `pdfium` feature. The library is bound once per
// provider, either from an explicit path or from the system library search
// path, and shared by every call (`pdfium-render`'s `sync` feature).

use std::path::Path;

use pdfium_render::prelude::*;
use quire_core::error::{QuireError, Result};
use quire_core::types::PageSize;
use tracing::debug;

use crate::image::processor::ImageProcessor;
use crate::pdf::reader::PdfReader;
use crate::raster::{
    Bitmap, DocumentInfo, PageTextContent, RasterProvider, RenderRequest, RenderTarget, TextItem,
    pixel_dimensions,
};

/// Renders and extracts text with Pdfium.
pub struct PdfiumRasterProvider {
    pdfium: Pdfium,
}

impl PdfiumRasterProvider {
    /// Bind the Pdfium shared library at `library_path`, or the system
    /// library when `None`.
    pub fn new(library_path: Option<&Path>) -> Result<Self> {
        let bindings = match library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|err| QuireError::Render(format!("failed to load pdfium library: {}", err)))?;
        debug!(explicit = library_path.is_some(), "Pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

/// Map a Pdfium load failure onto the error taxonomy.
fn load_error(err: PdfiumError, password: Option<&str>) -> QuireError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            match password {
                Some(_) => QuireError::PasswordIncorrect {
                    document: String::new(),
                },
                None => QuireError::PasswordRequired {
                    document: String::new(),
                },
            }
        }
        other => QuireError::Load(other.to_string()),
    }
}

fn page_error(err: PdfiumError) -> QuireError {
    QuireError::Render(err.to_string())
}

/// Whether the file declares an `/Encrypt` dictionary.
fn has_encrypt_marker(bytes: &[u8]) -> bool {
    bytes.windows(8).any(|window| window == b"/Encrypt")
}

fn page_number(page_index: usize) -> Result<u16> {
    u16::try_from(page_index)
        .map_err(|_| QuireError::Render(format!("page index {} out of range", page_index)))
}

impl RasterProvider for PdfiumRasterProvider {
    fn open(&self, bytes: &[u8], password: Option<&str>) -> Result<DocumentInfo> {
        let pdfium = &self.pdfium;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|err| load_error(err, password))?;
        let page_count = usize::from(document.pages().len());
        Ok(DocumentInfo {
            page_count,
            is_encrypted: password.is_some() || has_encrypt_marker(bytes),
        })
    }

    fn page_size(&self, bytes: &[u8], page_index: usize, password: Option<&str>) -> Result<PageSize> {
        let pdfium = &self.pdfium;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|err| load_error(err, password))?;
        let page = document.pages().get(page_number(page_index)?).map_err(page_error)?;
        Ok(PageSize::new(page.width().value, page.height().value))
    }

    fn render(&self, bytes: &[u8], request: &RenderRequest<'_>) -> Result<Bitmap> {
        let pdfium = &self.pdfium;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, request.password)
            .map_err(|err| load_error(err, request.password))?;
        let page = document
            .pages()
            .get(page_number(request.page_index)?)
            .map_err(page_error)?;
        let size = PageSize::new(page.width().value, page.height().value);

        let target_width = match request.target {
            RenderTarget::Dpi(dpi) => pixel_dimensions(size, dpi).0,
            RenderTarget::Width(width) => width.max(1),
        };
        let config = PdfRenderConfig::new()
            .set_target_width(i32::try_from(target_width).unwrap_or(i32::MAX))
            .render_form_data(true);
        let image = page
            .render_with_config(&config)
            .map_err(page_error)?
            .as_image();

        let image = ImageProcessor::from_dynamic(image)
            .rotate(request.rotation)
            .into_rgba();
        let size = size.rotated(request.rotation);
        debug!(
            page = request.page_index,
            width = image.width(),
            height = image.height(),
            "Page rendered"
        );
        Ok(Bitmap {
            image,
            width_pt: size.width_pt,
            height_pt: size.height_pt,
        })
    }

    fn extract_text(&self, bytes: &[u8], page_index: usize, password: Option<&str>) -> Result<String> {
        let pdfium = &self.pdfium;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|err| load_error(err, password))?;
        let page = document.pages().get(page_number(page_index)?).map_err(page_error)?;
        Ok(page.text().map_err(page_error)?.all())
    }

    fn text_items(&self, bytes: &[u8], page_index: usize, password: Option<&str>) -> Result<PageTextContent> {
        let pdfium = &self.pdfium;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|err| load_error(err, password))?;
        let page = document.pages().get(page_number(page_index)?).map_err(page_error)?;

        // Segment boxes are in unrotated page space; undo the page's own
        // rotation on the displayed size when the file parses locally.
        let displayed = PageSize::new(page.width().value, page.height().value);
        let viewport = PdfReader::from_bytes(bytes)
            .ok()
            .and_then(|reader| {
                let rotation = reader.intrinsic_rotation(page_index).ok()?;
                Some(reader.page_sizes().get(page_index)?.rotated(rotation))
            })
            .unwrap_or(displayed);

        let text = page.text().map_err(page_error)?;
        let items = text
            .segments()
            .iter()
            .map(|segment| {
                let bounds = segment.bounds();
                TextItem {
                    text: segment.text(),
                    transform: [1.0, 0.0, 0.0, 1.0, bounds.left().value, bounds.bottom().value],
                    width: bounds.width().value,
                    height: bounds.height().value,
                    font_name: None,
                }
            })
            .collect();
        Ok(PageTextContent {
            items,
            viewport: Some(viewport),
        })
    }
}
