// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Workspace — the ordered working page list plus the source documents its
// pages reference.

pub mod cache;
pub mod credentials;
pub mod history;
pub mod model;

use std::collections::HashSet;

use quire_core::error::{QuireError, Result};
use quire_core::types::{DocumentId, PageId, RotateDirection, Rotation, TextSource};
use tracing::debug;

pub use cache::{HighlightCache, HighlightKey};
pub use credentials::{
    ChannelCredentials, CredentialRequest, CredentialResponder, CredentialSource, FixedCredentials,
    NoCredentials,
};
pub use history::History;
pub use model::{DocumentArena, PageInstance, SourceDocument};

/// The working set.
///
/// Every page resolves to a live document and every document is referenced
/// by at least one page. Cloning takes a snapshot: the collections are
/// copied, document bytes are shared.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    documents: DocumentArena,
    pages: Vec<PageInstance>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.documents.is_empty()
    }

    pub fn documents(&self) -> &DocumentArena {
        &self.documents
    }

    pub fn pages(&self) -> &[PageInstance] {
        &self.pages
    }

    pub fn document(&self, id: DocumentId) -> Result<&SourceDocument> {
        self.documents.get(id)
    }

    pub fn position(&self, page_id: PageId) -> Result<usize> {
        self.pages
            .iter()
            .position(|page| page.id == page_id)
            .ok_or_else(|| QuireError::Workspace(format!("unknown page {}", page_id)))
    }

    pub fn page(&self, page_id: PageId) -> Result<&PageInstance> {
        Ok(&self.pages[self.position(page_id)?])
    }

    pub(crate) fn page_mut(&mut self, page_id: PageId) -> Result<&mut PageInstance> {
        let index = self.position(page_id)?;
        Ok(&mut self.pages[index])
    }

    /// Pages of one document, for fixing up freshly added instances.
    pub(crate) fn pages_of_mut(
        &mut self,
        document_id: DocumentId,
    ) -> impl Iterator<Item = &mut PageInstance> {
        self.pages
            .iter_mut()
            .filter(move |page| page.document_id == document_id)
    }

    // -- Mutation -------------------------------------------------------------

    /// Add a document and append one page per source page.
    ///
    /// `texts` supplies each page's text source in page order; missing
    /// entries become `TextSource::None`.
    pub fn add_document(&mut self, document: SourceDocument, texts: Vec<TextSource>) -> DocumentId {
        let page_count = document.page_count;
        let id = self.documents.insert(document);
        let mut texts = texts.into_iter();
        self.pages.extend(
            (0..page_count)
                .map(|index| PageInstance::new(id, index, texts.next().unwrap_or_default())),
        );
        debug!(%id, page_count, "Document added to workspace");
        id
    }

    /// Move the page at `from` so it ends up at `to`.
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.pages.len();
        if from >= len || to >= len {
            return Err(QuireError::Workspace(format!(
                "cannot move page {} to {} in a {}-page workspace",
                from, to, len
            )));
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        Ok(())
    }

    /// Put the pages in exactly the order given. `order` must be a
    /// permutation of the current page ids.
    pub fn reorder(&mut self, order: &[PageId]) -> Result<()> {
        if order.len() != self.pages.len() {
            return Err(QuireError::Workspace(format!(
                "new order lists {} pages, workspace has {}",
                order.len(),
                self.pages.len()
            )));
        }
        let mut seen = HashSet::with_capacity(order.len());
        for id in order {
            if !seen.insert(*id) || !self.pages.iter().any(|page| page.id == *id) {
                return Err(QuireError::Workspace(format!(
                    "page {} is not in the workspace, or listed twice",
                    id
                )));
            }
        }
        let mut remaining = std::mem::take(&mut self.pages);
        for id in order {
            if let Some(index) = remaining.iter().position(|page| page.id == *id) {
                self.pages.push(remaining.swap_remove(index));
            }
        }
        Ok(())
    }

    /// Turn a page a quarter turn, returning its new rotation.
    pub fn rotate(&mut self, page_id: PageId, direction: RotateDirection) -> Result<Rotation> {
        let page = self.page_mut(page_id)?;
        page.rotation = page.rotation.turn(direction);
        Ok(page.rotation)
    }

    /// Remove a page, dropping its document if nothing else references it.
    pub fn remove_page(&mut self, page_id: PageId) -> Result<PageInstance> {
        let index = self.position(page_id)?;
        let page = self.pages.remove(index);
        self.prune_orphans();
        Ok(page)
    }

    /// Drop documents no page references. Returns how many were dropped.
    pub fn prune_orphans(&mut self) -> usize {
        let orphans: Vec<DocumentId> = self
            .documents
            .ids()
            .into_iter()
            .filter(|id| !self.pages.iter().any(|page| page.document_id == *id))
            .collect();
        for id in &orphans {
            if let Some(document) = self.documents.remove(*id) {
                debug!(%id, name = %document.display_name, "Orphaned document pruned");
            }
        }
        orphans.len()
    }

    /// Remove every page and document. Freed slots keep their generations,
    /// so handles from before the clear stay stale.
    pub fn clear(&mut self) {
        self.pages.clear();
        for id in self.documents.ids() {
            self.documents.remove(id);
        }
    }

    /// Verify page/document referential integrity.
    pub fn check_invariants(&self) -> Result<()> {
        for page in &self.pages {
            let document = self.documents.get(page.document_id)?;
            if page.source_page_index >= document.page_count {
                return Err(QuireError::Workspace(format!(
                    "page {} points past the end of {}",
                    page.id, document.display_name
                )));
            }
        }
        for id in self.documents.ids() {
            if !self.pages.iter().any(|page| page.document_id == id) {
                return Err(QuireError::Workspace(format!("document {} is unreferenced", id)));
            }
        }
        Ok(())
    }
}
