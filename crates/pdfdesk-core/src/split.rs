//! Page extraction.
//!
//! Produces a new document containing only the selected pages, by deleting
//! every unselected page and pruning the objects that become unreachable.

use crate::error::TransformError;
use lopdf::Document;
use std::collections::BTreeSet;

/// Extract the selected pages (zero-indexed) into a new document.
///
/// The selection must be non-empty, in range, and free of duplicates.
/// Callers pass the selection sorted ascending; output pages keep the
/// source document's order.
pub fn extract_pages(bytes: &[u8], selection: &[u32]) -> Result<Vec<u8>, TransformError> {
    if selection.is_empty() {
        return Err(TransformError::InvalidSelection(
            "no pages selected".into(),
        ));
    }

    let doc = Document::load_mem(bytes).map_err(TransformError::decode)?;
    let page_count = doc.get_pages().len() as u32;

    let mut keep = BTreeSet::new();
    for &index in selection {
        if index >= page_count {
            return Err(TransformError::InvalidSelection(format!(
                "page index {} out of range (document has {} pages)",
                index, page_count
            )));
        }
        // lopdf numbers pages from 1.
        if !keep.insert(index + 1) {
            return Err(TransformError::InvalidSelection(format!(
                "page index {} selected twice",
                index
            )));
        }
    }

    let mut out = doc.clone();

    // Delete in descending order so earlier deletions do not shift the
    // numbering of the remaining pages.
    let doomed: Vec<u32> = (1..=page_count).rev().filter(|p| !keep.contains(p)).collect();
    for page_num in doomed {
        out.delete_pages(&[page_num]);
    }

    out.prune_objects();
    out.compress();

    let mut buffer = Vec::new();
    out.save_to(&mut buffer)
        .map_err(TransformError::operation)?;
    Ok(buffer)
}
