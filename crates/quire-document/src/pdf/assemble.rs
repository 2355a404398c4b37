// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assembly engine — turn an ordered page list into one output PDF, choosing
// per page between a structural copy and a rasterized image page.

use std::collections::HashMap;
use std::fmt;

use lopdf::ObjectId;
use quire_core::config::AssemblyConfig;
use quire_core::error::{QuireError, Result};
use quire_core::types::{CompressionPreset, DocumentId, PageId, PageSize, RasterFormat, Rotation};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::reader::PdfReader;
use super::writer::PdfWriter;
use crate::image::processor::{EncodedImage, ImageProcessor};
use crate::raster::{RasterProvider, RenderRequest, RenderTarget, pixel_dimensions};
use crate::workspace::model::{DocumentArena, PageInstance, SourceDocument};

/// What to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyRequest {
    pub preset: CompressionPreset,
    /// Apply each page's UI rotation permanently to the output.
    pub bake_rotation: bool,
    /// Skip object pruning, renumbering, and stream compression.
    pub vector_compatibility: bool,
}

impl Default for AssemblyRequest {
    fn default() -> Self {
        Self {
            preset: CompressionPreset::None,
            bake_rotation: true,
            vector_compatibility: false,
        }
    }
}

/// Why a page ended up as an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterReason {
    /// The preset rasterizes everything.
    Preset,
    /// A source document in the batch is encrypted.
    EncryptedSource,
    /// Baked rotation on a page that carries a rotation.
    RotatedPage,
    /// The structural copy rendered (almost) nothing.
    FailedValidation,
    /// The structural copy could not be built.
    CopyFailed,
}

impl fmt::Display for RasterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Preset => "compression preset",
            Self::EncryptedSource => "encrypted source",
            Self::RotatedPage => "baked rotation",
            Self::FailedValidation => "structural copy failed validation",
            Self::CopyFailed => "structural copy failed",
        };
        f.write_str(text)
    }
}

/// How a page was written.
#[derive(Debug, Clone, PartialEq)]
pub enum PageMode {
    Structural,
    Rasterized { dpi: f32, reason: RasterReason },
    /// Rendering failed; an empty page of the right size stands in.
    Blank { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub page_id: PageId,
    pub mode: PageMode,
}

#[derive(Debug, Clone)]
pub struct AssemblyOutput {
    pub bytes: Vec<u8>,
    /// One entry per input page, in input order.
    pub report: Vec<PageOutcome>,
}

impl AssemblyOutput {
    pub fn rasterized_count(&self) -> usize {
        self.report
            .iter()
            .filter(|outcome| !matches!(outcome.mode, PageMode::Structural))
            .count()
    }
}

/// Resolution to render a page of `size` at, starting from `target_dpi`.
///
/// When the naive pixel count exceeds `budget` the resolution is scaled by
/// `sqrt(budget / pixels)` so the render fits, but never below `min_dpi`.
pub fn effective_dpi(size: PageSize, target_dpi: f32, budget: u64, min_dpi: f32) -> f32 {
    let pixel_count = |dpi: f32| {
        let (width, height) = pixel_dimensions(size, dpi);
        u64::from(width) * u64::from(height)
    };
    if pixel_count(target_dpi) <= budget {
        return target_dpi;
    }

    let exact = f64::from(size.width_pt) / 72.0 * f64::from(target_dpi)
        * (f64::from(size.height_pt) / 72.0 * f64::from(target_dpi));
    let scale = (budget as f64 / exact).sqrt();
    let mut dpi = ((f64::from(target_dpi) * scale * 1000.0).floor() / 1000.0) as f32;
    // f32 rounding can land a pixel over the budget.
    for _ in 0..100 {
        if dpi <= min_dpi || pixel_count(dpi) <= budget {
            break;
        }
        dpi -= 0.001;
    }
    dpi.max(min_dpi)
}

/// Raster parameters for one batch.
#[derive(Debug, Clone, Copy)]
struct RasterSpec {
    dpi: f32,
    format: RasterFormat,
    quality: Option<f32>,
}

/// Per-page work result, produced in parallel and placed in order.
enum PagePlan {
    Structural { document_id: DocumentId, rotation: Option<Rotation> },
    Image { image: EncodedImage, size: PageSize, dpi: f32, reason: RasterReason },
    Blank { size: PageSize, reason: String },
}

/// A page on its way to the output, before validation.
enum Candidate {
    Copied { bytes: Vec<u8>, rotation: Option<Rotation> },
    Raster(RasterReason),
}

/// Result of rendering a structural copy for validation.
enum Validation {
    Inked,
    Blank,
    /// The provider could not render the copy; says nothing about the copy.
    RenderFailed,
}

/// Builds output documents from pages of the workspace's sources.
pub struct AssemblyEngine<'a, P: RasterProvider> {
    provider: &'a P,
    config: &'a AssemblyConfig,
}

impl<'a, P: RasterProvider> AssemblyEngine<'a, P> {
    pub fn new(provider: &'a P, config: &'a AssemblyConfig) -> Self {
        Self { provider, config }
    }

    /// Assemble `pages` (in order) into a single PDF.
    ///
    /// Fails only when there is nothing to assemble, a page references a
    /// document that is not in `documents`, or the output cannot be
    /// serialised. Per-page problems fall back to rasterizing, then to a
    /// blank page, and are listed in the report. A structural copy is never
    /// replaced by a blank page.
    #[instrument(skip_all, fields(pages = pages.len(), preset = request.preset.name()))]
    pub fn assemble(
        &self,
        documents: &DocumentArena,
        pages: &[PageInstance],
        request: &AssemblyRequest,
    ) -> Result<AssemblyOutput> {
        if pages.is_empty() {
            return Err(QuireError::Assembly("no pages to assemble".into()));
        }

        let mut sources: HashMap<DocumentId, &SourceDocument> = HashMap::new();
        for page in pages {
            let document = documents.get(page.document_id).map_err(|_| {
                QuireError::Assembly(format!(
                    "page {} references missing document {}",
                    page.id, page.document_id
                ))
            })?;
            sources.insert(page.document_id, document);
        }

        let encrypted = sources.values().any(|document| document.is_encrypted);
        let global_raster = request.preset.forces_raster() || encrypted;
        let settings = request.preset.settings();
        let raster = RasterSpec {
            dpi: settings.target_dpi.unwrap_or(self.config.default_raster_dpi),
            format: settings.raster_format,
            quality: settings.target_quality,
        };
        let sizes: HashMap<DocumentId, Vec<PageSize>> = sources
            .iter()
            .map(|(&id, document)| (id, self.native_sizes(document)))
            .collect();

        info!(global_raster, encrypted, "Assembling");

        // Parsing and single-page copies stay on this thread; the renders
        // they feed are the expensive part.
        let mut readers: HashMap<DocumentId, PdfReader> = HashMap::new();
        let candidates: Vec<Candidate> = if global_raster {
            let reason = if request.preset.forces_raster() {
                RasterReason::Preset
            } else {
                RasterReason::EncryptedSource
            };
            pages.iter().map(|_| Candidate::Raster(reason)).collect()
        } else {
            for (&id, document) in &sources {
                match PdfReader::from_bytes(&document.bytes) {
                    Ok(reader) => {
                        readers.insert(id, reader);
                    }
                    Err(err) => warn!(document = %document.display_name, %err, "Source not parseable, rasterizing its pages"),
                }
            }
            pages
                .iter()
                .map(|page| self.structural_candidate(readers.get(&page.document_id), page, request))
                .collect()
        };

        let budget = if global_raster {
            self.config.primary_pixel_budget
        } else {
            self.config.fallback_pixel_budget
        };
        let plans: Vec<PagePlan> = candidates
            .into_par_iter()
            .zip(pages.par_iter())
            .map(|(candidate, page)| {
                let document = sources[&page.document_id];
                let size = page_size(&sizes, page);
                match candidate {
                    Candidate::Copied { bytes, rotation } => {
                        let structural = PagePlan::Structural {
                            document_id: page.document_id,
                            rotation,
                        };
                        match self.validate(&bytes) {
                            Validation::Inked => structural,
                            Validation::RenderFailed => {
                                warn!(page = %page.id, "Validation render failed, keeping structural copy");
                                structural
                            }
                            Validation::Blank => {
                                debug!(page = %page.id, "Structural copy failed validation");
                                match self.rasterize(document, page, size, raster, budget, RasterReason::FailedValidation, request) {
                                    PagePlan::Blank { reason, .. } => {
                                        warn!(page = %page.id, %reason, "Fallback render failed, keeping structural copy");
                                        structural
                                    }
                                    plan => plan,
                                }
                            }
                        }
                    }
                    Candidate::Raster(reason) => {
                        self.rasterize(document, page, size, raster, budget, reason, request)
                    }
                }
            })
            .collect();

        let mut writer = PdfWriter::new();
        let mut report = Vec::with_capacity(pages.len());
        for (plan, page) in plans.into_iter().zip(pages) {
            let plan = match plan {
                PagePlan::Structural { document_id, rotation } => {
                    match self.copy_page(&mut writer, readers.get(&document_id), page, rotation) {
                        Ok(()) => {
                            report.push(PageOutcome {
                                page_id: page.id,
                                mode: PageMode::Structural,
                            });
                            continue;
                        }
                        Err(err) => {
                            warn!(page = %page.id, %err, "Structural placement failed, rasterizing");
                            let document = sources[&page.document_id];
                            let size = page_size(&sizes, page);
                            self.rasterize(document, page, size, raster, budget, RasterReason::CopyFailed, request)
                        }
                    }
                }
                other => other,
            };

            let mode = match plan {
                PagePlan::Image { image, size, dpi, reason } => {
                    writer.append_image_page(image, size)?;
                    PageMode::Rasterized { dpi, reason }
                }
                PagePlan::Blank { size, reason } => {
                    writer.append_blank_page(size)?;
                    PageMode::Blank { reason }
                }
                PagePlan::Structural { .. } => PageMode::Structural,
            };
            report.push(PageOutcome {
                page_id: page.id,
                mode,
            });
        }

        let compact = !(request.vector_compatibility || self.config.vector_compatibility);
        let bytes = writer.finish(compact)?;
        let output = AssemblyOutput { bytes, report };
        info!(
            bytes = output.bytes.len(),
            rasterized = output.rasterized_count(),
            "Assembly complete"
        );
        Ok(output)
    }

    // -- Structural path ------------------------------------------------------

    fn structural_candidate(
        &self,
        reader: Option<&PdfReader>,
        page: &PageInstance,
        request: &AssemblyRequest,
    ) -> Candidate {
        let Some(reader) = reader else {
            return Candidate::Raster(RasterReason::CopyFailed);
        };
        let intrinsic = match reader.intrinsic_rotation(page.source_page_index) {
            Ok(rotation) => rotation,
            Err(err) => {
                warn!(page = %page.id, %err, "Cannot read source page");
                return Candidate::Raster(RasterReason::CopyFailed);
            }
        };

        if request.bake_rotation
            && self.config.rasterize_rotated_pages
            && !(intrinsic.is_upright() && page.rotation.is_upright())
        {
            debug!(page = %page.id, ?intrinsic, rotation = ?page.rotation, "Rotated page, rasterizing");
            return Candidate::Raster(RasterReason::RotatedPage);
        }

        let rotation = request.bake_rotation.then(|| intrinsic.add(page.rotation));
        let single = reader
            .page_object_id(page.source_page_index)
            .and_then(|page_id| {
                let mut writer = PdfWriter::new();
                writer.append_page(reader.document(), page_id, rotation)?;
                writer.finish(false)
            });
        match single {
            Ok(bytes) => Candidate::Copied { bytes, rotation },
            Err(err) => {
                warn!(page = %page.id, %err, "Structural copy failed, rasterizing");
                Candidate::Raster(RasterReason::CopyFailed)
            }
        }
    }

    /// Render a thumbnail of a single-page document and check it shows ink.
    ///
    /// A heuristic against structurally broken copies: a genuinely blank page
    /// fails it too and simply gets rasterized.
    fn validate(&self, bytes: &[u8]) -> Validation {
        let request = RenderRequest {
            page_index: 0,
            target: RenderTarget::Width(self.config.probe_width_px),
            rotation: Rotation::Deg0,
            password: None,
        };
        match self.provider.render(bytes, &request) {
            Ok(bitmap) => {
                let coverage = ImageProcessor::from_rgba(bitmap.image)
                    .ink_coverage(self.config.near_white_threshold);
                if coverage >= self.config.min_ink_ratio {
                    Validation::Inked
                } else {
                    Validation::Blank
                }
            }
            Err(err) => {
                debug!(%err, "Validation render failed");
                Validation::RenderFailed
            }
        }
    }

    fn copy_page(
        &self,
        writer: &mut PdfWriter,
        reader: Option<&PdfReader>,
        page: &PageInstance,
        rotation: Option<Rotation>,
    ) -> Result<()> {
        let reader = reader.ok_or_else(|| QuireError::Assembly("source was not parsed".into()))?;
        let page_id: ObjectId = reader.page_object_id(page.source_page_index)?;
        writer.append_page(reader.document(), page_id, rotation)?;
        Ok(())
    }

    // -- Raster path ----------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn rasterize(
        &self,
        document: &SourceDocument,
        page: &PageInstance,
        size: PageSize,
        raster: RasterSpec,
        budget: u64,
        reason: RasterReason,
        request: &AssemblyRequest,
    ) -> PagePlan {
        let rotation = if request.bake_rotation {
            page.rotation
        } else {
            Rotation::Deg0
        };
        let output_size = size.rotated(rotation);
        let dpi = effective_dpi(size, raster.dpi, budget, self.config.min_dpi);
        let render = RenderRequest {
            page_index: page.source_page_index,
            target: RenderTarget::Dpi(dpi),
            rotation,
            password: document.password.as_deref(),
        };

        let encoded = self
            .provider
            .render(&document.bytes, &render)
            .and_then(|bitmap| {
                ImageProcessor::from_rgba(bitmap.image).encode_for_pdf(raster.format, raster.quality)
            });
        match encoded {
            Ok(image) => {
                debug!(page = %page.id, dpi, %reason, "Page rasterized");
                PagePlan::Image {
                    image,
                    size: output_size,
                    dpi,
                    reason,
                }
            }
            Err(err) => {
                warn!(page = %page.id, %err, "Render failed, writing blank page");
                PagePlan::Blank {
                    size: output_size,
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Displayed size of every page of `document`, parsed locally when
    /// possible and asked of the provider otherwise.
    fn native_sizes(&self, document: &SourceDocument) -> Vec<PageSize> {
        if let Ok(reader) = PdfReader::from_bytes(&document.bytes) {
            let sizes = reader.page_sizes();
            if sizes.len() == document.page_count {
                return sizes;
            }
        }
        (0..document.page_count)
            .map(|index| {
                self.provider
                    .page_size(&document.bytes, index, document.password.as_deref())
                    .unwrap_or_else(|err| {
                        warn!(document = %document.display_name, index, %err, "Page size unknown, assuming Letter");
                        PageSize::LETTER
                    })
            })
            .collect()
    }
}

fn page_size(sizes: &HashMap<DocumentId, Vec<PageSize>>, page: &PageInstance) -> PageSize {
    sizes
        .get(&page.document_id)
        .and_then(|sizes| sizes.get(page.source_page_index))
        .copied()
        .unwrap_or(PageSize::LETTER)
}
