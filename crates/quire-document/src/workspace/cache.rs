// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Highlight cache — memoised highlight rectangles per page, rotation, and
// query.

use std::collections::HashMap;

use quire_core::types::{DocumentId, Rotation};

use crate::text::highlight::HighlightSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightKey {
    pub document: DocumentId,
    pub source_page: usize,
    pub rotation: Rotation,
    /// Trimmed, lowercased query.
    pub query: String,
}

impl HighlightKey {
    pub fn new(document: DocumentId, source_page: usize, rotation: Rotation, query: &str) -> Self {
        Self {
            document,
            source_page,
            rotation,
            query: query.trim().to_lowercase(),
        }
    }
}

/// Owned by the editor. Entries for a page are invalidated when its text
/// changes; everything is dropped when page instances are regenerated.
#[derive(Debug, Default)]
pub struct HighlightCache {
    entries: HashMap<HighlightKey, HighlightSet>,
}

impl HighlightCache {
    pub fn get(&self, key: &HighlightKey) -> Option<&HighlightSet> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: HighlightKey, set: HighlightSet) {
        self.entries.insert(key, set);
    }

    /// Drop every entry for one source page.
    pub fn invalidate_page(&mut self, document: DocumentId, source_page: usize) {
        self.entries
            .retain(|key, _| !(key.document == document && key.source_page == source_page));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::highlight::HighlightSpace;
    use quire_core::types::PixelSize;

    fn empty_set() -> HighlightSet {
        HighlightSet {
            space: HighlightSpace::ImagePixels {
                image: PixelSize {
                    width: 1,
                    height: 1,
                },
            },
            groups: vec![],
        }
    }

    #[test]
    fn queries_differing_in_case_share_an_entry() {
        let doc = DocumentId::default();
        let mut cache = HighlightCache::default();
        cache.insert(HighlightKey::new(doc, 0, Rotation::Deg0, "Total"), empty_set());
        assert!(cache.get(&HighlightKey::new(doc, 0, Rotation::Deg0, " total ")).is_some());
        assert!(cache.get(&HighlightKey::new(doc, 0, Rotation::Deg90, "total")).is_none());
    }

    #[test]
    fn invalidation_is_per_page() {
        let doc = DocumentId::default();
        let mut cache = HighlightCache::default();
        cache.insert(HighlightKey::new(doc, 0, Rotation::Deg0, "a"), empty_set());
        cache.insert(HighlightKey::new(doc, 0, Rotation::Deg90, "a"), empty_set());
        cache.insert(HighlightKey::new(doc, 1, Rotation::Deg0, "a"), empty_set());

        cache.invalidate_page(doc, 0);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
