//! Whole-document page rotation.

use crate::error::TransformError;
use crate::pages::page_rotation;
use lopdf::{Document, Object};

/// Rotate every page by a relative angle (a multiple of 90 degrees).
///
/// The angle is added to each page's current effective rotation and
/// normalized into `0..360`, so four successive 90-degree turns are the
/// identity.
pub fn rotate_pages(bytes: &[u8], degrees: i64) -> Result<Vec<u8>, TransformError> {
    if degrees % 90 != 0 {
        return Err(TransformError::InvalidSelection(format!(
            "rotation must be a multiple of 90 degrees, got {}",
            degrees
        )));
    }

    let mut doc = Document::load_mem(bytes).map_err(TransformError::decode)?;

    let page_ids: Vec<_> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let current = page_rotation(&doc, page_id);
        let next = (current + degrees).rem_euclid(360);
        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(TransformError::operation)?;
        page.set("Rotate", Object::Integer(next));
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(TransformError::operation)?;
    Ok(buffer)
}
