//! Document re-encoding with a denser object layout.

use crate::error::TransformError;
use lopdf::Document;

/// Re-encode a document with stream compression applied.
///
/// Layout density is delegated to the codec; the output is not guaranteed to
/// be smaller for every input (already-compressed documents can grow
/// slightly).
pub fn compress_document(bytes: &[u8]) -> Result<Vec<u8>, TransformError> {
    let mut doc = Document::load_mem(bytes).map_err(TransformError::decode)?;

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(TransformError::operation)?;
    Ok(buffer)
}
