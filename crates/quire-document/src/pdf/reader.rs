// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open and inspect existing PDF documents, and carve page ranges
// out of them, using the `lopdf` crate.

use lopdf::{Document, Object, ObjectId};
use quire_core::error::{QuireError, Result};
use quire_core::types::{PageSize, Rotation};
use tracing::{debug, instrument};

use super::writer::PdfWriter;

/// Page attributes a page may inherit from its ancestors in the page tree.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and exposes page geometry and range extraction
/// using 0-based page indices.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| QuireError::Load(format!("failed to parse PDF: {}", err)))?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }

    /// Object id of the page at `index` (0-based).
    pub fn page_object_id(&self, index: usize) -> Result<ObjectId> {
        page_object_id(&self.document, index)
    }

    /// The page's own `/Rotate`, inherited from the page tree if needed.
    pub fn intrinsic_rotation(&self, index: usize) -> Result<Rotation> {
        let page_id = self.page_object_id(index)?;
        Ok(intrinsic_rotation(&self.document, page_id))
    }

    /// Displayed size of every page, in page order.
    ///
    /// Uses the CropBox when present, else the MediaBox, and swaps width and
    /// height for pages whose intrinsic rotation is a quarter turn.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.document
            .get_pages()
            .values()
            .map(|&page_id| {
                let size = inherited_attribute(&self.document, page_id, b"CropBox")
                    .or_else(|| inherited_attribute(&self.document, page_id, b"MediaBox"))
                    .and_then(|object| box_size(&self.document, &object))
                    .unwrap_or(PageSize::LETTER);
                size.rotated(intrinsic_rotation(&self.document, page_id))
            })
            .collect()
    }

    // -- Extraction -----------------------------------------------------------

    /// Copy pages `[start..=end]` (0-based) into a new standalone PDF.
    pub fn extract_page_range(&self, start: usize, end: usize, compact: bool) -> Result<Vec<u8>> {
        let mut writer = PdfWriter::new();
        for index in start..=end {
            let page_id = self.page_object_id(index)?;
            writer.append_page(&self.document, page_id, None)?;
        }
        writer.finish(compact)
    }
}

/// Object id of the page at `index` (0-based) in `document`.
pub(crate) fn page_object_id(document: &Document, index: usize) -> Result<ObjectId> {
    let pages = document.get_pages();
    let number = u32::try_from(index + 1)
        .map_err(|_| QuireError::Workspace(format!("page index {} is too large", index)))?;
    pages.get(&number).copied().ok_or_else(|| {
        QuireError::Workspace(format!(
            "page {} out of range (document has {} pages)",
            index + 1,
            pages.len()
        ))
    })
}

/// The page's `/Rotate`, normalised to a quarter turn.
pub(crate) fn intrinsic_rotation(document: &Document, page_id: ObjectId) -> Rotation {
    inherited_attribute(document, page_id, b"Rotate")
        .and_then(|object| object.as_i64().ok())
        .map(Rotation::from_degrees)
        .unwrap_or_default()
}

/// Look `key` up on the page, then on each `/Parent` in turn.
pub(crate) fn inherited_attribute(
    document: &Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut current = Some(page_id);
    // Page trees are shallow; the bound only guards against /Parent cycles.
    for _ in 0..64 {
        let dict = document.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn box_size(document: &Document, object: &Object) -> Option<PageSize> {
    let array = match object {
        Object::Reference(id) => document.get_object(*id).ok()?.as_array().ok()?,
        other => other.as_array().ok()?,
    };
    if array.len() != 4 {
        return None;
    }
    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;
    let size = PageSize::new((x1 - x0).abs(), (y1 - y0).abs());
    (size.width_pt > 0.0 && size.height_pt > 0.0).then_some(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixturePage, fixture_pdf};

    #[test]
    fn garbage_is_a_load_error() {
        let err = PdfReader::from_bytes(b"definitely not a pdf").err().expect("should fail");
        assert!(matches!(err, QuireError::Load(_)));
    }

    #[test]
    fn page_sizes_follow_intrinsic_rotation() {
        let bytes = fixture_pdf(&[
            FixturePage::text("upright"),
            FixturePage::text("sideways").with_rotate(90),
        ]);
        let reader = PdfReader::from_bytes(&bytes).expect("fixture loads");
        let sizes = reader.page_sizes();
        assert_eq!(sizes[0], PageSize::new(612.0, 792.0));
        assert_eq!(sizes[1], PageSize::new(792.0, 612.0));
        assert_eq!(reader.intrinsic_rotation(1).expect("page 2"), Rotation::Deg90);
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let bytes = fixture_pdf(&[FixturePage::text("inherits").with_inherited_media_box()]);
        let reader = PdfReader::from_bytes(&bytes).expect("fixture loads");
        assert_eq!(reader.page_sizes()[0], PageSize::new(612.0, 792.0));
    }

    #[test]
    fn extract_range_keeps_requested_pages() {
        let bytes = fixture_pdf(&[
            FixturePage::text("one"),
            FixturePage::text("two"),
            FixturePage::text("three"),
        ]);
        let reader = PdfReader::from_bytes(&bytes).expect("fixture loads");
        let part = reader.extract_page_range(1, 2, true).expect("extract");
        let part = PdfReader::from_bytes(&part).expect("extracted part loads");
        assert_eq!(part.page_count(), 2);
        let text = part.document().extract_text(&[1]).expect("text");
        assert!(text.contains("two"), "got {text:?}");
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let bytes = fixture_pdf(&[FixturePage::text("only")]);
        let reader = PdfReader::from_bytes(&bytes).expect("fixture loads");
        assert!(reader.page_object_id(1).is_err());
    }
}
