// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Workspace records — loaded source documents, the page instances that
// reference them, and the generational arena that owns the documents.

use std::sync::Arc;

use quire_core::error::{QuireError, Result};
use quire_core::types::{DocumentId, PageId, Rotation, TextSource};
use sha2::{Digest, Sha256};

/// A loaded PDF. Its bytes are immutable and shared between snapshots.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Assigned by [`DocumentArena::insert`].
    pub id: DocumentId,
    pub display_name: String,
    pub bytes: Arc<[u8]>,
    pub page_count: usize,
    pub is_encrypted: bool,
    /// The password that opened it, passed through to every render.
    pub password: Option<String>,
    /// Hex SHA-256 of `bytes`.
    pub fingerprint: String,
}

impl SourceDocument {
    pub fn new(
        display_name: impl Into<String>,
        bytes: Arc<[u8]>,
        page_count: usize,
        is_encrypted: bool,
        password: Option<String>,
    ) -> Self {
        let fingerprint = fingerprint(&bytes);
        Self {
            id: DocumentId::default(),
            display_name: display_name.into(),
            bytes,
            page_count,
            is_encrypted,
            password,
            fingerprint,
        }
    }
}

/// Hex-encoded SHA-256 digest.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// One page of the working set.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInstance {
    pub id: PageId,
    pub document_id: DocumentId,
    /// 0-based index into the source document.
    pub source_page_index: usize,
    pub rotation: Rotation,
    pub text_source: TextSource,
}

impl PageInstance {
    pub fn new(document_id: DocumentId, source_page_index: usize, text_source: TextSource) -> Self {
        Self {
            id: PageId::new(),
            document_id,
            source_page_index,
            rotation: Rotation::Deg0,
            text_source,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    document: Option<SourceDocument>,
}

/// Owns the source documents. Handles are `(slot, generation)`; freeing a
/// slot bumps its generation, so old handles stop resolving.
#[derive(Debug, Clone, Default)]
pub struct DocumentArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl DocumentArena {
    /// Store `document`, assigning and returning its id.
    pub fn insert(&mut self, mut document: SourceDocument) -> DocumentId {
        let id = match self.free.pop() {
            Some(slot) => DocumentId {
                slot,
                generation: self.slots[slot as usize].generation,
            },
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    document: None,
                });
                DocumentId {
                    slot: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        document.id = id;
        self.slots[id.slot as usize].document = Some(document);
        id
    }

    pub fn get(&self, id: DocumentId) -> Result<&SourceDocument> {
        self.slots
            .get(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.document.as_ref())
            .ok_or_else(|| QuireError::Workspace(format!("stale or unknown document handle {}", id)))
    }

    /// Free the slot. Returns the document if the handle was live.
    pub fn remove(&mut self, id: DocumentId) -> Option<SourceDocument> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let document = slot.document.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);
        Some(document)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDocument> {
        self.slots.iter().filter_map(|slot| slot.document.as_ref())
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.iter().map(|document| document.id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
