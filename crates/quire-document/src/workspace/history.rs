// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Undo history — a LIFO stack of workspace snapshots.

use std::collections::VecDeque;

use tracing::debug;

use super::Workspace;

/// Snapshots taken before each mutation, most recent last.
///
/// With a capacity, pushing onto a full stack drops the oldest snapshot.
#[derive(Debug, Default)]
pub struct History {
    snapshots: VecDeque<Workspace>,
    capacity: Option<usize>,
}

impl History {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            snapshots: VecDeque::new(),
            capacity,
        }
    }

    pub fn snapshot(&mut self, workspace: &Workspace) {
        self.push(workspace.clone());
    }

    /// Push a copy taken earlier, e.g. before a mutation that might fail.
    pub fn push(&mut self, snapshot: Workspace) {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.snapshots.len() >= capacity {
                self.snapshots.pop_front();
            }
        }
        self.snapshots.push_back(snapshot);
        debug!(depth = self.snapshots.len(), "Snapshot taken");
    }

    /// Restore the most recent snapshot into `workspace`.
    ///
    /// Returns `false`, leaving `workspace` untouched, when there is nothing
    /// to undo.
    pub fn undo(&mut self, workspace: &mut Workspace) -> bool {
        match self.snapshots.pop_back() {
            Some(previous) => {
                *workspace = previous;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::SourceDocument;
    use quire_core::types::{PageId, RotateDirection, Rotation};
    use std::sync::Arc;

    fn workspace(pages: usize) -> Workspace {
        let mut workspace = Workspace::new();
        workspace.add_document(
            SourceDocument::new("a.pdf", Arc::from(&b"a"[..]), pages, false, None),
            vec![],
        );
        workspace
    }

    fn order(workspace: &Workspace) -> Vec<(PageId, Rotation)> {
        workspace
            .pages()
            .iter()
            .map(|page| (page.id, page.rotation))
            .collect()
    }

    #[test]
    fn undo_restores_order_rotation_and_documents() {
        let mut live = workspace(3);
        let mut history = History::default();
        let before = order(&live);

        history.snapshot(&live);
        let first = live.pages()[0].id;
        live.rotate(first, RotateDirection::Clockwise).expect("rotate");
        live.move_page(0, 2).expect("move");
        live.remove_page(live.pages()[1].id).expect("remove");

        assert!(history.undo(&mut live));
        assert_eq!(order(&live), before);
        assert_eq!(live.documents().len(), 1);
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let mut live = workspace(2);
        let before = order(&live);
        assert!(!History::default().undo(&mut live));
        assert_eq!(order(&live), before);
    }

    #[test]
    fn capacity_drops_oldest_snapshots() {
        let mut history = History::new(Some(2));
        for pages in 1..=3 {
            history.snapshot(&workspace(pages));
        }
        assert_eq!(history.len(), 2);

        let mut live = Workspace::new();
        assert!(history.undo(&mut live));
        assert_eq!(live.pages().len(), 3);
        assert!(history.undo(&mut live));
        assert_eq!(live.pages().len(), 2);
        assert!(!history.undo(&mut live));
    }
}
