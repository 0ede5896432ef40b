//! Per-document undo/redo history of byte-buffer snapshots.

use crate::document::{DocBytes, DocumentId};
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct Timeline {
    /// Older states, most recent last.
    past: Vec<DocBytes>,
    /// Undone states, most recent first.
    future: VecDeque<DocBytes>,
}

/// Undo/redo stacks keyed by document identity. Never shared across
/// documents; removing a document discards its timeline.
#[derive(Default)]
pub struct EditHistory {
    timelines: HashMap<DocumentId, Timeline>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the buffer that a transform is about to replace. Starting a
    /// new branch invalidates anything that was undone.
    pub fn record(&mut self, id: DocumentId, prior: DocBytes) {
        let timeline = self.timelines.entry(id).or_default();
        timeline.past.push(prior);
        timeline.future.clear();
    }

    /// Step back one state. `current` is the active buffer, which becomes
    /// redoable. Returns the restored buffer, or `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self, id: DocumentId, current: DocBytes) -> Option<DocBytes> {
        let timeline = self.timelines.get_mut(&id)?;
        let restored = timeline.past.pop()?;
        timeline.future.push_front(current);
        Some(restored)
    }

    /// Mirror of [`EditHistory::undo`] over the future list.
    pub fn redo(&mut self, id: DocumentId, current: DocBytes) -> Option<DocBytes> {
        let timeline = self.timelines.get_mut(&id)?;
        let restored = timeline.future.pop_front()?;
        timeline.past.push(current);
        Some(restored)
    }

    pub fn can_undo(&self, id: DocumentId) -> bool {
        self.timelines.get(&id).is_some_and(|t| !t.past.is_empty())
    }

    pub fn can_redo(&self, id: DocumentId) -> bool {
        self.timelines
            .get(&id)
            .is_some_and(|t| !t.future.is_empty())
    }

    /// Drop the timeline for a removed document.
    pub fn forget(&mut self, id: DocumentId) {
        self.timelines.remove(&id);
    }
}
