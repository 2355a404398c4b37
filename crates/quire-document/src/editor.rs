// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor session — owns the workspace, its undo history, the highlight cache,
// the configuration, and the raster provider.
//
// Every mutation goes through `&mut Editor`, so operations are serialised by
// the borrow checker. Each one copies the workspace first and pushes the copy
// onto the history only once the mutation has succeeded.

use std::sync::Arc;

use quire_core::config::QuireConfig;
use quire_core::error::{QuireError, Result};
use quire_core::types::{
    DocumentId, PageId, PageRange, PageSize, RotateDirection, Rotation, TextSource,
};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::ocr::OcrResult;
use crate::pdf::assemble::{AssemblyEngine, AssemblyOutput, AssemblyRequest};
use crate::pdf::reader::PdfReader;
use crate::pdf::split::{parse_ranges, split};
use crate::raster::{RasterProvider, TextMeasurer};
use crate::text::highlight::{HighlightSet, native_highlights, ocr_highlights};
use crate::text::index::native_text_source;
use crate::text::search::{SearchOutcome, search};
use crate::workspace::{
    CredentialRequest, CredentialSource, HighlightCache, HighlightKey, History, PageInstance,
    SourceDocument, Workspace,
};

/// A document that made it into the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub id: DocumentId,
    pub name: String,
    pub page_count: usize,
    pub fingerprint: String,
}

/// A document that was left out, and why.
#[derive(Debug)]
pub struct SkippedDocument {
    pub name: String,
    pub error: QuireError,
}

/// Outcome of loading a batch of files.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<LoadedDocument>,
    pub skipped: Vec<SkippedDocument>,
}

/// A document opened and indexed, not yet in the workspace.
struct Opened {
    document: SourceDocument,
    texts: Vec<TextSource>,
}

/// Where the pages of a regenerated document came from.
struct Regenerated {
    name: String,
    bytes: Vec<u8>,
    /// The previous page behind each output page, in output order.
    origins: Vec<PageInstance>,
}

pub struct Editor<P: RasterProvider> {
    provider: P,
    config: QuireConfig,
    workspace: Workspace,
    history: History,
    highlights: HighlightCache,
}

impl<P: RasterProvider> Editor<P> {
    pub fn new(provider: P, config: QuireConfig) -> Self {
        let history = History::new(config.history.capacity);
        Self {
            provider,
            config,
            workspace: Workspace::new(),
            history,
            highlights: HighlightCache::default(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn pages(&self) -> &[PageInstance] {
        self.workspace.pages()
    }

    pub fn config(&self) -> &QuireConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    // -- Loading --------------------------------------------------------------

    /// Load one document and append its pages.
    ///
    /// Password prompts go to `credentials`, at most
    /// `load.max_password_attempts` times.
    #[instrument(skip_all, fields(name = %name))]
    pub fn load(
        &mut self,
        name: &str,
        bytes: impl Into<Arc<[u8]>>,
        credentials: &dyn CredentialSource,
    ) -> Result<DocumentId> {
        let opened = self.open(name, bytes.into(), credentials)?;
        let loaded = self.admit(vec![opened]);
        loaded
            .into_iter()
            .next()
            .map(|document| document.id)
            .ok_or_else(|| QuireError::Workspace("loaded document vanished".into()))
    }

    /// Load several documents. A document that cannot be opened is skipped
    /// and reported; the rest still load, in order, as one undo step.
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn load_many(
        &mut self,
        files: Vec<(String, Vec<u8>)>,
        credentials: &dyn CredentialSource,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        let mut opened = Vec::new();
        for (name, bytes) in files {
            match self.open(&name, Arc::from(bytes), credentials) {
                Ok(document) => opened.push(document),
                Err(error) => {
                    warn!(%name, %error, "Skipping document");
                    report.skipped.push(SkippedDocument { name, error });
                }
            }
        }
        report.loaded = self.admit(opened);
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Load finished"
        );
        report
    }

    fn open(
        &self,
        name: &str,
        bytes: Arc<[u8]>,
        credentials: &dyn CredentialSource,
    ) -> Result<Opened> {
        let max_attempts = self.config.load.max_password_attempts;
        let mut password: Option<String> = None;
        let mut attempt = 0;
        let info = loop {
            match self.provider.open(&bytes, password.as_deref()) {
                Ok(info) => break info,
                Err(err) if err.is_retryable() => {
                    let previous_failed = matches!(err, QuireError::PasswordIncorrect { .. });
                    attempt += 1;
                    if attempt > max_attempts {
                        return Err(named(err, name));
                    }
                    let request = CredentialRequest {
                        document: name.to_string(),
                        attempt,
                        previous_failed,
                    };
                    match credentials.request(&request) {
                        Some(next) => password = Some(next),
                        None => return Err(named(err, name)),
                    }
                }
                Err(err) => return Err(err),
            }
        };

        let texts = self.acquire_texts(&bytes, password.as_deref(), info.page_count);
        let is_encrypted = info.is_encrypted || password.is_some();
        let document = SourceDocument::new(name, bytes, info.page_count, is_encrypted, password);
        debug!(
            name,
            pages = document.page_count,
            encrypted = is_encrypted,
            fingerprint = %document.fingerprint,
            "Document opened"
        );
        Ok(Opened { document, texts })
    }

    /// Native text of every page. A failed extraction leaves that page
    /// without a text source.
    fn acquire_texts(&self, bytes: &[u8], password: Option<&str>, pages: usize) -> Vec<TextSource> {
        (0..pages)
            .into_par_iter()
            .map(|index| match self.provider.extract_text(bytes, index, password) {
                Ok(text) => native_text_source(&text),
                Err(err) => {
                    warn!(page = index, %err, "Text extraction failed");
                    TextSource::None
                }
            })
            .collect()
    }

    fn admit(&mut self, opened: Vec<Opened>) -> Vec<LoadedDocument> {
        if opened.is_empty() {
            return Vec::new();
        }
        // The first load into an empty workspace is not undoable.
        if !self.workspace.is_empty() {
            self.history.snapshot(&self.workspace);
        }
        opened
            .into_iter()
            .map(|Opened { document, texts }| {
                let name = document.display_name.clone();
                let page_count = document.page_count;
                let fingerprint = document.fingerprint.clone();
                let id = self.workspace.add_document(document, texts);
                LoadedDocument {
                    id,
                    name,
                    page_count,
                    fingerprint,
                }
            })
            .collect()
    }

    // -- Page edits -----------------------------------------------------------

    /// Run `edit` on the workspace, recording an undo step if it succeeds.
    fn mutate<T>(&mut self, edit: impl FnOnce(&mut Workspace) -> Result<T>) -> Result<T> {
        let before = self.workspace.clone();
        let value = edit(&mut self.workspace)?;
        self.history.push(before);
        Ok(value)
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        self.mutate(|workspace| workspace.move_page(from, to))
    }

    pub fn reorder(&mut self, order: &[PageId]) -> Result<()> {
        self.mutate(|workspace| workspace.reorder(order))
    }

    pub fn rotate(&mut self, page_id: PageId, direction: RotateDirection) -> Result<Rotation> {
        self.mutate(|workspace| workspace.rotate(page_id, direction))
    }

    /// Remove a page; its document goes too once nothing references it.
    pub fn delete(&mut self, page_id: PageId) -> Result<()> {
        self.mutate(|workspace| workspace.remove_page(page_id).map(|_| ()))
    }

    /// Replace a page's text with OCR output.
    pub fn apply_ocr(&mut self, page_id: PageId, result: OcrResult) -> Result<()> {
        let page = self.workspace.page(page_id)?;
        let (document, source_page) = (page.document_id, page.source_page_index);
        self.mutate(|workspace| {
            workspace.page_mut(page_id)?.text_source = result.into_text_source();
            Ok(())
        })?;
        self.highlights.invalidate_page(document, source_page);
        debug!(page = %page_id, "OCR text applied");
        Ok(())
    }

    /// Drop every page and document. Undoable.
    pub fn reset(&mut self) {
        if self.workspace.is_empty() {
            return;
        }
        self.history.snapshot(&self.workspace);
        self.workspace.clear();
        self.highlights.clear();
        info!("Workspace reset");
    }

    /// Restore the state before the last mutation. `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        let restored = self.history.undo(&mut self.workspace);
        if restored {
            self.highlights.clear();
        }
        restored
    }

    // -- Assembly -------------------------------------------------------------

    /// Assemble the working set without touching it.
    pub fn export(&self, request: &AssemblyRequest) -> Result<AssemblyOutput> {
        AssemblyEngine::new(&self.provider, &self.config.assembly).assemble(
            self.workspace.documents(),
            self.workspace.pages(),
            request,
        )
    }

    /// Assemble the working set and continue from the result as a single
    /// document.
    #[instrument(skip_all, fields(pages = self.workspace.pages().len()))]
    pub fn merge(&mut self, request: &AssemblyRequest) -> Result<AssemblyOutput> {
        let output = self.export(request)?;
        let part = Regenerated {
            name: "merged.pdf".into(),
            bytes: output.bytes.clone(),
            origins: self.workspace.pages().to_vec(),
        };
        self.regenerate(vec![part], request.bake_rotation)?;
        info!(pages = output.report.len(), "Working set merged");
        Ok(output)
    }

    /// Assemble the working set, cut it by `ranges` (see
    /// [`parse_ranges`]), and continue with one document per part.
    #[instrument(skip_all, fields(ranges = %ranges))]
    pub fn split(&mut self, ranges: &str, request: &AssemblyRequest) -> Result<Vec<Vec<u8>>> {
        let output = self.export(request)?;
        let total = u32::try_from(output.report.len()).unwrap_or(u32::MAX);
        let ranges = parse_ranges(ranges, total)?;
        let parts = split(&output.bytes, &ranges)?;

        let pages = self.workspace.pages();
        let regenerated = parts
            .iter()
            .zip(&ranges)
            .enumerate()
            .map(|(index, (bytes, range))| Regenerated {
                name: format!("part-{}.pdf", index + 1),
                bytes: bytes.clone(),
                origins: origins(pages, *range),
            })
            .collect();
        self.regenerate(regenerated, request.bake_rotation)?;
        info!(parts = parts.len(), "Working set split");
        Ok(parts)
    }

    /// Replace the workspace with freshly assembled documents.
    ///
    /// Text is re-extracted from the new bytes. A page whose new text layer is
    /// empty (it was rasterized) keeps its previous text, unless its OCR boxes
    /// were laid out for a rotation that has since been baked in.
    fn regenerate(&mut self, parts: Vec<Regenerated>, baked: bool) -> Result<()> {
        let mut opened = Vec::with_capacity(parts.len());
        for part in parts {
            let bytes: Arc<[u8]> = Arc::from(part.bytes);
            let info = self.provider.open(&bytes, None)?;
            let texts = self
                .acquire_texts(&bytes, None, info.page_count)
                .into_iter()
                .zip(&part.origins)
                .map(|(fresh, origin)| carried_text(fresh, origin, baked))
                .collect();
            let document = SourceDocument::new(part.name, bytes, info.page_count, false, None);
            let rotations: Vec<Rotation> = part
                .origins
                .iter()
                .map(|origin| if baked { Rotation::Deg0 } else { origin.rotation })
                .collect();
            opened.push((Opened { document, texts }, rotations));
        }

        self.history.snapshot(&self.workspace);
        self.workspace.clear();
        self.highlights.clear();
        for (opened, rotations) in opened {
            let id = self.workspace.add_document(opened.document, opened.texts);
            for (page, rotation) in self.workspace.pages_of_mut(id).zip(rotations) {
                page.rotation = rotation;
            }
        }
        self.workspace.check_invariants()
    }

    // -- Text location --------------------------------------------------------

    /// Every occurrence of `query` across the working set.
    pub fn search(&self, query: &str) -> SearchOutcome {
        search(
            self.workspace.pages(),
            query,
            self.config.search.snippet_context,
        )
    }

    /// Highlight rectangles for `query` on one page.
    ///
    /// OCR pages answer in OCR image pixels; other pages in points on the
    /// page as displayed, with its own and the UI rotation applied. Results
    /// are cached per page, rotation, and query; the cache assumes one
    /// `measurer` for the whole session.
    pub fn highlight_rects(
        &mut self,
        page_id: PageId,
        query: &str,
        measurer: Option<&dyn TextMeasurer>,
    ) -> Result<HighlightSet> {
        let page = self.workspace.page(page_id)?;
        let key = HighlightKey::new(page.document_id, page.source_page_index, page.rotation, query);
        if let Some(cached) = self.highlights.get(&key) {
            return Ok(cached.clone());
        }

        let set = match &page.text_source {
            TextSource::Ocr {
                words, image_size, ..
            } => ocr_highlights(words, *image_size, query),
            TextSource::Native { .. } | TextSource::None => {
                let document = self.workspace.document(page.document_id)?;
                self.native_highlight_set(document, page, query, measurer)
            }
        };
        debug!(page = %page_id, groups = set.groups.len(), "Highlights computed");
        self.highlights.insert(key, set.clone());
        Ok(set)
    }

    fn native_highlight_set(
        &self,
        document: &SourceDocument,
        page: &PageInstance,
        query: &str,
        measurer: Option<&dyn TextMeasurer>,
    ) -> HighlightSet {
        let index = page.source_page_index;
        let password = document.password.as_deref();
        let intrinsic = PdfReader::from_bytes(&document.bytes)
            .and_then(|reader| reader.intrinsic_rotation(index))
            .unwrap_or_default();
        let unrotated = self
            .provider
            .page_size(&document.bytes, index, password)
            .map(|displayed| displayed.rotated(intrinsic))
            .unwrap_or(PageSize::LETTER);
        let content = self
            .provider
            .text_items(&document.bytes, index, password)
            .unwrap_or_else(|err| {
                warn!(page = %page.id, %err, "Text items unavailable");
                Default::default()
            });
        native_highlights(
            &content,
            unrotated,
            intrinsic.add(page.rotation),
            query,
            measurer,
        )
    }
}

/// Put the document's display name into a password error.
fn named(err: QuireError, name: &str) -> QuireError {
    match err {
        QuireError::PasswordRequired { .. } => QuireError::PasswordRequired {
            document: name.to_string(),
        },
        QuireError::PasswordIncorrect { .. } => QuireError::PasswordIncorrect {
            document: name.to_string(),
        },
        other => other,
    }
}

/// Pages behind the 1-based inclusive `range` of an assembly of `pages`.
fn origins(pages: &[PageInstance], range: PageRange) -> Vec<PageInstance> {
    let start = range.start.saturating_sub(1) as usize;
    let end = (range.end as usize).min(pages.len());
    pages.get(start..end).map(<[_]>::to_vec).unwrap_or_default()
}

fn carried_text(fresh: TextSource, origin: &PageInstance, baked: bool) -> TextSource {
    if !matches!(fresh, TextSource::None) {
        return fresh;
    }
    match &origin.text_source {
        TextSource::Ocr { .. } if baked && !origin.rotation.is_upright() => TextSource::None,
        previous => previous.clone(),
    }
}
