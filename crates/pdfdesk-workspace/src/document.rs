//! Open documents and their preview handles.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Shared, immutable document bytes. Transforms replace the whole buffer,
/// so history snapshots are held by reference.
pub type DocBytes = Arc<Vec<u8>>;

/// Stable identity of an open document for the lifetime of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        DocumentId(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An opaque display-preview handle (an object URL in the browser shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle(pub String);

/// Browser blob-URL primitives: create an object URL over a byte buffer and
/// revoke it when the document goes away.
pub trait PreviewStore: Send + Sync {
    fn create(&self, bytes: &[u8]) -> PreviewHandle;
    fn revoke(&self, handle: &PreviewHandle);
}

/// One open document in the workspace.
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    bytes: DocBytes,
    preview: Option<PreviewHandle>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Document {
            id: DocumentId::new(),
            name: name.into(),
            bytes: Arc::new(bytes),
            preview: None,
        }
    }

    pub fn bytes(&self) -> &DocBytes {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    /// Replace the content buffer wholesale and refresh the preview handle,
    /// returning the prior buffer for the history.
    pub(crate) fn replace_bytes(
        &mut self,
        bytes: Vec<u8>,
        previews: &dyn PreviewStore,
    ) -> DocBytes {
        let prior = std::mem::replace(&mut self.bytes, Arc::new(bytes));
        self.refresh_preview(previews);
        prior
    }

    /// Swap in an existing snapshot (undo/redo path).
    pub(crate) fn restore_bytes(&mut self, bytes: DocBytes, previews: &dyn PreviewStore) {
        self.bytes = bytes;
        self.refresh_preview(previews);
    }

    pub(crate) fn refresh_preview(&mut self, previews: &dyn PreviewStore) {
        if let Some(old) = self.preview.take() {
            previews.revoke(&old);
        }
        self.preview = Some(previews.create(&self.bytes));
    }

    pub(crate) fn release_preview(&mut self, previews: &dyn PreviewStore) {
        if let Some(old) = self.preview.take() {
            previews.revoke(&old);
        }
    }
}
