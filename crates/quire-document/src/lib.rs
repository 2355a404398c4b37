// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quire-document — Page assembly, splitting, and text location for Quire.
//
// Assembles a working set of PDF pages drawn from several source documents
// into one output (structural copy where it is safe, rasterized otherwise),
// splits outputs by page range, and locates query matches as highlight
// rectangles from native text or OCR word boxes. Rendering is delegated to a
// `RasterProvider`; the `pdfium` feature supplies one.

pub mod editor;
pub mod image;
pub mod ocr;
pub mod pdf;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod raster;
pub mod text;
pub mod workspace;

#[cfg(test)]
mod testing;

// Re-export the primary types so callers can use `quire_document::Editor` etc.
pub use editor::{Editor, LoadReport, LoadedDocument, SkippedDocument};
pub use image::processor::ImageProcessor;
pub use ocr::{OcrResult, parse_tesseract_tsv, tesseract_image_size};
pub use pdf::{
    AssemblyEngine, AssemblyOutput, AssemblyRequest, PageMode, PageOutcome, PdfReader, PdfWriter,
    RasterReason, parse_ranges, split,
};
pub use raster::{
    Bitmap, DocumentInfo, PageTextContent, RasterProvider, RenderRequest, RenderTarget, TextItem,
    TextMeasurer,
};
pub use text::{HighlightSet, HighlightSpace, SearchOutcome};
pub use workspace::{
    ChannelCredentials, CredentialRequest, CredentialResponder, CredentialSource, FixedCredentials,
    NoCredentials, Workspace,
};

#[cfg(feature = "ocr")]
pub use ocr::engine::{OcrEngine, OcrModels};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterProvider;
