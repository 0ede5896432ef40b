//! Page-tree attribute lookup helpers.
//!
//! `MediaBox` and `Rotate` are inheritable: a page that does not carry the
//! key resolves it from its nearest ancestor in the page tree.

use crate::error::TransformError;
use lopdf::{Document, Object, ObjectId};

// Parent chains in real documents are shallow; the cap only guards against
// cyclic trees in corrupt files.
const MAX_TREE_DEPTH: usize = 64;

/// Resolve an inheritable attribute for a page, walking the Parent chain.
pub fn inherited_attr<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(node).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        node = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Follow a reference one level if the value is indirect.
fn resolve<'a>(doc: &'a Document, value: &'a Object) -> &'a Object {
    match value {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(value),
        other => other,
    }
}

/// The page's effective rotation in degrees, defaulting to 0.
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attr(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0)
}

/// The page height in page-space units, taken from the MediaBox.
pub fn page_height(doc: &Document, page_id: ObjectId) -> Result<f64, TransformError> {
    let media_box = inherited_attr(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .ok_or_else(|| TransformError::Operation("page has no MediaBox".into()))?;
    if media_box.len() != 4 {
        return Err(TransformError::Operation("malformed MediaBox".into()));
    }
    let y0 = number(&media_box[1])?;
    let y1 = number(&media_box[3])?;
    Ok(y1 - y0)
}

fn number(obj: &Object) -> Result<f64, TransformError> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(r) => Ok(*r as f64),
        _ => Err(TransformError::Operation(
            "non-numeric MediaBox entry".into(),
        )),
    }
}
