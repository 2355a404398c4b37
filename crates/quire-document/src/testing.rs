// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test support — lopdf-built fixture documents and an in-process raster
// provider that draws synthetic bitmaps instead of rendering.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use image::{Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use quire_core::error::{QuireError, Result};
use quire_core::types::{PageSize, Rotation};

use crate::pdf::reader::PdfReader;
use crate::raster::{
    Bitmap, DocumentInfo, PageTextContent, RasterProvider, RenderRequest, RenderTarget,
    pixel_dimensions,
};

/// One page of a fixture document.
#[derive(Debug, Clone)]
pub(crate) struct FixturePage {
    text: Option<String>,
    size: PageSize,
    rotate: Option<i64>,
    inherited_media_box: bool,
}

impl FixturePage {
    /// A Letter page showing `text` in Courier.
    pub(crate) fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            size: PageSize::LETTER,
            rotate: None,
            inherited_media_box: false,
        }
    }

    /// A Letter page with an empty content stream.
    pub(crate) fn blank() -> Self {
        Self {
            text: None,
            ..Self::text("")
        }
    }

    pub(crate) fn with_size(mut self, width_pt: f32, height_pt: f32) -> Self {
        self.size = PageSize::new(width_pt, height_pt);
        self
    }

    pub(crate) fn with_rotate(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Leave `/MediaBox` off the page so it inherits the page tree's.
    pub(crate) fn with_inherited_media_box(mut self) -> Self {
        self.inherited_media_box = true;
        self
    }
}

fn media_box(size: PageSize) -> Vec<Object> {
    vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()]
}

/// Serialise a small PDF with one page per entry.
pub(crate) fn fixture_pdf(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for page in pages {
        let operations = match &page.text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations }
            .encode()
            .expect("fixture content encodes");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if !page.inherited_media_box {
            page_dict.set("MediaBox", media_box(page.size));
        }
        if let Some(degrees) = page.rotate {
            page_dict.set("Rotate", degrees);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let count = kids.len() as i64;
    let mut pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
    };
    if pages.iter().any(|page| page.inherited_media_box) {
        pages_dict.set("MediaBox", media_box(PageSize::LETTER));
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture serialises");
    bytes
}

/// Shorthand for a document whose pages each show one of `texts`.
pub(crate) fn text_pdf(texts: &[&str]) -> Vec<u8> {
    let pages: Vec<_> = texts.iter().map(|text| FixturePage::text(text)).collect();
    fixture_pdf(&pages)
}

/// A render the fake provider was asked for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RecordedRender {
    pub page_index: usize,
    pub target: RenderTarget,
    pub rotation: Rotation,
}

/// Raster provider backed by lopdf.
///
/// Pages whose content has extractable text render with a dark block in the
/// middle; pages without text render white. Documents can be "locked" behind
/// a password, and renders of chosen pages can be made to fail.
#[derive(Default)]
pub(crate) struct FakeProvider {
    locks: HashMap<Vec<u8>, String>,
    failing_pages: HashSet<usize>,
    text_items: HashMap<usize, PageTextContent>,
    renders: Mutex<Vec<RecordedRender>>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Require `password` for `bytes`; such documents report as encrypted.
    pub(crate) fn lock(mut self, bytes: &[u8], password: &str) -> Self {
        self.locks.insert(bytes.to_vec(), password.to_string());
        self
    }

    pub(crate) fn fail_render(mut self, page_index: usize) -> Self {
        self.failing_pages.insert(page_index);
        self
    }

    pub(crate) fn with_text_items(mut self, page_index: usize, content: PageTextContent) -> Self {
        self.text_items.insert(page_index, content);
        self
    }

    pub(crate) fn renders(&self) -> Vec<RecordedRender> {
        self.renders.lock().map(|renders| renders.clone()).unwrap_or_default()
    }

    fn check_password(&self, bytes: &[u8], password: Option<&str>) -> Result<()> {
        match (self.locks.get(bytes), password) {
            (None, _) => Ok(()),
            (Some(_), None) => Err(QuireError::PasswordRequired {
                document: "fixture".into(),
            }),
            (Some(expected), Some(given)) if expected == given => Ok(()),
            (Some(_), Some(_)) => Err(QuireError::PasswordIncorrect {
                document: "fixture".into(),
            }),
        }
    }

    fn reader(&self, bytes: &[u8], password: Option<&str>) -> Result<PdfReader> {
        self.check_password(bytes, password)?;
        PdfReader::from_bytes(bytes)
    }
}

impl RasterProvider for FakeProvider {
    fn open(&self, bytes: &[u8], password: Option<&str>) -> Result<DocumentInfo> {
        let reader = self.reader(bytes, password)?;
        Ok(DocumentInfo {
            page_count: reader.page_count(),
            is_encrypted: self.locks.contains_key(bytes),
        })
    }

    fn page_size(&self, bytes: &[u8], page_index: usize, password: Option<&str>) -> Result<PageSize> {
        self.reader(bytes, password)?
            .page_sizes()
            .get(page_index)
            .copied()
            .ok_or_else(|| QuireError::Render(format!("no page {}", page_index)))
    }

    fn render(&self, bytes: &[u8], request: &RenderRequest<'_>) -> Result<Bitmap> {
        if let Ok(mut renders) = self.renders.lock() {
            renders.push(RecordedRender {
                page_index: request.page_index,
                target: request.target,
                rotation: request.rotation,
            });
        }
        if self.failing_pages.contains(&request.page_index) {
            return Err(QuireError::Render("synthetic render failure".into()));
        }

        let size = self
            .page_size(bytes, request.page_index, request.password)?
            .rotated(request.rotation);
        let (width, height) = match request.target {
            RenderTarget::Dpi(dpi) => pixel_dimensions(size, dpi),
            RenderTarget::Width(width) => {
                let height = (width as f32 * size.height_pt / size.width_pt).round().max(1.0);
                (width, height as u32)
            }
        };

        let inked = self
            .extract_text(bytes, request.page_index, request.password)
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false);
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        if inked {
            for y in height / 4..(height * 3 / 4).max(height / 4 + 1) {
                for x in width / 4..(width * 3 / 4).max(width / 4 + 1) {
                    image.put_pixel(x.min(width - 1), y.min(height - 1), Rgba([0, 0, 0, 255]));
                }
            }
        }

        Ok(Bitmap {
            image,
            width_pt: size.width_pt,
            height_pt: size.height_pt,
        })
    }

    fn extract_text(&self, bytes: &[u8], page_index: usize, password: Option<&str>) -> Result<String> {
        let reader = self.reader(bytes, password)?;
        let number = u32::try_from(page_index + 1)
            .map_err(|_| QuireError::Render("page index overflow".into()))?;
        reader
            .document()
            .extract_text(&[number])
            .map_err(|err| QuireError::Render(err.to_string()))
    }

    fn text_items(&self, bytes: &[u8], page_index: usize, password: Option<&str>) -> Result<PageTextContent> {
        self.check_password(bytes, password)?;
        Ok(self.text_items.get(&page_index).cloned().unwrap_or_default())
    }
}
