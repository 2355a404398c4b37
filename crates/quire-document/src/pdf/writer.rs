// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — build output documents page by page, either by copying page
// objects out of a source document or by placing a raster image full-bleed on
// a fresh page.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use quire_core::error::{QuireError, Result};
use quire_core::types::{PageSize, Rotation};
use tracing::{debug, warn};

use super::reader::{INHERITABLE_KEYS, inherited_attribute};
use crate::image::processor::{EncodedImage, ImageFilter};

/// Incrementally builds a PDF.
///
/// Holds a page tree root and a catalog from the start, so every append
/// leaves the document structurally complete.
pub struct PdfWriter {
    document: Document,
    /// The `/Pages` root all appended pages hang off.
    pages_id: ObjectId,
}

impl PdfWriter {
    /// Create an empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        Self { document, pages_id }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Structural copies ----------------------------------------------------

    /// Copy a page (and everything it references) from `source`, appending it
    /// as the last page. Inherited attributes are materialised on the copy.
    /// `rotation`, when given, replaces the copy's `/Rotate`.
    pub fn append_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        rotation: Option<Rotation>,
    ) -> Result<ObjectId> {
        let mut page = source
            .get_dictionary(page_id)
            .map_err(|err| {
                QuireError::Serialization(format!("cannot read page object {:?}: {}", page_id, err))
            })?
            .clone();

        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Some(value) = inherited_attribute(source, page_id, key)
            {
                page.set(key.to_vec(), value);
            }
        }
        if let Some(rotation) = rotation {
            page.set("Rotate", i64::from(rotation.degrees()));
        }

        // Reserve the page's id first so back-references (e.g. an annotation's
        // /P) resolve to the copy instead of cloning the page twice.
        let new_page_id = self.document.new_object_id();
        let mut copied = BTreeMap::new();
        copied.insert(page_id, new_page_id);

        let Object::Dictionary(mut cloned) =
            deep_clone(source, &mut self.document, &mut copied, &Object::Dictionary(page))
        else {
            return Err(QuireError::Serialization("page did not clone to a dictionary".into()));
        };
        cloned.set("Parent", self.pages_id);
        self.document.objects.insert(new_page_id, Object::Dictionary(cloned));
        self.push_kid(new_page_id)?;

        debug!(?page_id, ?new_page_id, objects = copied.len(), "Page copied");
        Ok(new_page_id)
    }

    // -- Raster pages ---------------------------------------------------------

    /// Append a page of `size` points whose only content is `image`, scaled
    /// to cover the whole page.
    pub fn append_image_page(&mut self, image: EncodedImage, size: PageSize) -> Result<ObjectId> {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        image_dict.set("Filter", Object::Name(image.filter.pdf_name().to_vec()));
        let mut image_stream = Stream::new(image_dict, image.data);
        // The payload is already encoded; a second Flate pass would only grow it.
        image_stream.allows_compression = false;
        let image_id = self.document.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        size.width_pt.into(),
                        0.into(),
                        0.into(),
                        size.height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content.encode().map_err(|err| {
            QuireError::Serialization(format!("failed to encode image page content: {}", err))
        })?;
        let content_id = self.document.add_object(Stream::new(Dictionary::new(), content_bytes));

        self.append_page_dictionary(
            dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im0" => image_id },
                },
                "Contents" => content_id,
            },
        )
    }

    /// Append an empty page of `size` points.
    pub fn append_blank_page(&mut self, size: PageSize) -> Result<ObjectId> {
        let content_id = self.document.add_object(Stream::new(Dictionary::new(), Vec::new()));
        self.append_page_dictionary(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()],
            "Resources" => Dictionary::new(),
            "Contents" => content_id,
        })
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the document.
    ///
    /// With `compact`, unreachable objects are dropped, ids renumbered, and
    /// streams Flate-compressed. Without it the objects are written as built,
    /// which older viewers handle best.
    pub fn finish(mut self, compact: bool) -> Result<Vec<u8>> {
        if compact {
            self.document.prune_objects();
            self.document.renumber_objects();
            self.document.compress();
        }

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            QuireError::Serialization(format!("failed to serialise PDF: {}", err))
        })?;
        debug!(output_bytes = output.len(), compact, "PDF serialised");
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn append_page_dictionary(&mut self, mut page: Dictionary) -> Result<ObjectId> {
        page.set("Parent", self.pages_id);
        let page_id = self.document.add_object(page);
        self.push_kid(page_id)?;
        Ok(page_id)
    }

    /// Add `page_id` to the root's `/Kids` and bump `/Count`.
    fn push_kid(&mut self, page_id: ObjectId) -> Result<()> {
        let pages = self
            .document
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| QuireError::Serialization(format!("no page tree root: {}", err)))?;

        if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
            kids.push(Object::Reference(page_id));
        }
        if let Ok(Object::Integer(count)) = pages.get_mut(b"Count") {
            *count += 1;
        }
        Ok(())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-clone `object` from `source` into `target`, following references.
///
/// `copied` maps source ids to their copies, so shared resources (fonts,
/// images) are copied once and reference cycles terminate. `/Parent` keys are
/// dropped; the caller re-links the page into the target tree.
fn deep_clone(
    source: &Document,
    target: &mut Document,
    copied: &mut BTreeMap<ObjectId, ObjectId>,
    object: &Object,
) -> Object {
    match object {
        Object::Dictionary(dict) => Object::Dictionary(clone_dictionary(source, target, copied, dict)),
        Object::Array(items) => Object::Array(
            items
                .iter()
                .map(|item| deep_clone(source, target, copied, item))
                .collect(),
        ),
        Object::Stream(stream) => {
            let dict = clone_dictionary(source, target, copied, &stream.dict);
            let mut cloned = Stream::new(dict, stream.content.clone());
            cloned.allows_compression = stream.allows_compression;
            Object::Stream(cloned)
        }
        Object::Reference(ref_id) => {
            if let Some(new_id) = copied.get(ref_id) {
                return Object::Reference(*new_id);
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    copied.insert(*ref_id, new_id);
                    let cloned = deep_clone(source, target, copied, referenced);
                    target.objects.insert(new_id, cloned);
                    Object::Reference(new_id)
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Object::Null
                }
            }
        }
        // All other object types (Boolean, Integer, Real, String, Name, Null)
        // are trivially cloneable.
        other => other.clone(),
    }
}

fn clone_dictionary(
    source: &Document,
    target: &mut Document,
    copied: &mut BTreeMap<ObjectId, ObjectId>,
    dict: &Dictionary,
) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), deep_clone(source, target, copied, value));
    }
    new_dict
}

impl ImageFilter {
    fn pdf_name(self) -> &'static [u8] {
        match self {
            ImageFilter::Dct => b"DCTDecode",
            ImageFilter::Flate => b"FlateDecode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::processor::ImageProcessor;
    use crate::pdf::reader::PdfReader;
    use crate::testing::{FixturePage, fixture_pdf};
    use image::{DynamicImage, Rgba, RgbaImage};
    use quire_core::types::RasterFormat;

    #[test]
    fn empty_writer_is_a_valid_document() {
        let bytes = PdfWriter::new().finish(true).expect("serialise");
        let reader = PdfReader::from_bytes(&bytes).expect("reload");
        assert_eq!(reader.page_count(), 0);
    }

    #[test]
    fn copied_pages_keep_text_and_order() {
        let source = fixture_pdf(&[FixturePage::text("alpha"), FixturePage::text("beta")]);
        let reader = PdfReader::from_bytes(&source).expect("fixture loads");

        let mut writer = PdfWriter::new();
        writer
            .append_page(reader.document(), reader.page_object_id(1).expect("p2"), None)
            .expect("copy p2");
        writer
            .append_page(reader.document(), reader.page_object_id(0).expect("p1"), None)
            .expect("copy p1");
        let out = PdfReader::from_bytes(&writer.finish(true).expect("serialise")).expect("reload");

        assert_eq!(out.page_count(), 2);
        assert!(out.document().extract_text(&[1]).expect("text").contains("beta"));
        assert!(out.document().extract_text(&[2]).expect("text").contains("alpha"));
    }

    #[test]
    fn rotation_override_replaces_rotate() {
        let source = fixture_pdf(&[FixturePage::text("turned").with_rotate(90)]);
        let reader = PdfReader::from_bytes(&source).expect("fixture loads");

        let mut writer = PdfWriter::new();
        writer
            .append_page(
                reader.document(),
                reader.page_object_id(0).expect("p1"),
                Some(Rotation::Deg180),
            )
            .expect("copy");
        let out = PdfReader::from_bytes(&writer.finish(false).expect("serialise")).expect("reload");
        assert_eq!(out.intrinsic_rotation(0).expect("p1"), Rotation::Deg180);
    }

    #[test]
    fn inherited_resources_are_materialised() {
        let source = fixture_pdf(&[FixturePage::text("inherits").with_inherited_media_box()]);
        let reader = PdfReader::from_bytes(&source).expect("fixture loads");

        let mut writer = PdfWriter::new();
        let new_id = writer
            .append_page(reader.document(), reader.page_object_id(0).expect("p1"), None)
            .expect("copy");
        let page = writer.document().get_dictionary(new_id).expect("page dict");
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn image_page_is_sized_in_points() {
        let bitmap = RgbaImage::from_pixel(20, 10, Rgba([10, 20, 30, 255]));
        let encoded = ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(bitmap))
            .encode_for_pdf(RasterFormat::Jpeg, Some(0.8))
            .expect("encode");

        let mut writer = PdfWriter::new();
        writer
            .append_image_page(encoded, PageSize::new(144.0, 72.0))
            .expect("append");
        let out = PdfReader::from_bytes(&writer.finish(true).expect("serialise")).expect("reload");
        assert_eq!(out.page_sizes(), vec![PageSize::new(144.0, 72.0)]);
    }
}
