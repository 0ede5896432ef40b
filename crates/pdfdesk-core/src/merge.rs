//! PDF merge.
//!
//! Combines an ordered sequence of documents into one, keeping each source
//! document's page order and the sequence order of the inputs.

use crate::error::TransformError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Merge documents in input order into a single buffer.
///
/// The first document becomes the destination; every later document has its
/// object IDs shifted past the destination's current maximum so the two
/// object spaces cannot collide, then its pages are appended to the
/// destination page tree.
pub fn merge_documents(mut documents: Vec<Vec<u8>>) -> Result<Vec<u8>, TransformError> {
    if documents.is_empty() {
        return Err(TransformError::EmptyInput);
    }
    if documents.len() == 1 {
        // Nothing to combine; hand the buffer back untouched.
        return Ok(documents.remove(0));
    }

    let mut sources = Vec::with_capacity(documents.len());
    for (index, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            TransformError::Decode(format!("document {} failed to load: {}", index + 1, e))
        })?;
        sources.push(doc);
    }

    let mut dest = sources.remove(0);
    let mut page_refs = ordered_page_refs(&dest);

    for source in sources {
        let offset = dest.max_id;
        let source_pages = ordered_page_refs(&source);
        let source_max = source.max_id;

        let mut shifted: BTreeMap<ObjectId, Object> = BTreeMap::new();
        for (id, object) in source.objects {
            shifted.insert((id.0 + offset, id.1), shift_refs(object, offset));
        }
        dest.objects.extend(shifted);

        page_refs.extend(
            source_pages
                .into_iter()
                .map(|id| (id.0 + offset, id.1)),
        );
        dest.max_id = (source_max + offset).max(dest.max_id);
    }

    rebuild_page_tree(&mut dest, &page_refs)?;
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(TransformError::operation)?;
    Ok(buffer)
}

/// Page object IDs in document page order.
fn ordered_page_refs(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Shift every indirect reference inside `object` by `offset`.
fn shift_refs(object: Object, offset: u32) -> Object {
    match object {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => {
            Object::Array(items.into_iter().map(|o| shift_refs(o, offset)).collect())
        }
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = shift_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = shift_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination's root Pages node at the combined page list and fix
/// every page's Parent link.
fn rebuild_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), TransformError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| TransformError::Operation("trailer has no Root reference".into()))?;

    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| TransformError::Operation("catalog has no Pages reference".into()))?;

    for &page_id in page_refs {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    match doc.get_object_mut(pages_id) {
        Ok(Object::Dictionary(pages)) => {
            pages.set(
                "Kids",
                Object::Array(page_refs.iter().map(|&id| Object::Reference(id)).collect()),
            );
            pages.set("Count", Object::Integer(page_refs.len() as i64));
            Ok(())
        }
        _ => Err(TransformError::Operation(
            "root Pages node is not a dictionary".into(),
        )),
    }
}
