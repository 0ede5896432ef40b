//! Stateless PDF transform operations
//!
//! This crate provides the document mutation pipeline of the pdfdesk
//! workspace: merge, rotate, split, compress, rasterize-to-images and
//! signature stamping, all as pure functions over PDF byte buffers using
//! lopdf. None of the operations mutate their input; every success produces
//! a fresh buffer, which keeps undo/redo snapshots cheap to hold by
//! reference.

pub mod compress;
pub mod error;
pub mod merge;
pub(crate) mod pages;
pub mod rasterize;
pub mod rotate;
pub mod signature;
pub mod split;

pub use compress::compress_document;
pub use error::TransformError;
pub use merge::merge_documents;
pub use rasterize::{rasterize_document, RenderedPage, Rasterizer, JPEG_QUALITY, RASTER_SCALE};
pub use rotate::rotate_pages;
pub use signature::{apply_signature, SignatureImage};
pub use split::extract_pages;

/// What a transform produced: either a replacement document buffer or a set
/// of per-page image buffers. Callers dispatch on the variant instead of
/// inspecting the runtime shape of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    Document(Vec<u8>),
    ImageSet(Vec<Vec<u8>>),
}

/// Parse PDF bytes and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<u32, TransformError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(TransformError::decode)?;
    Ok(doc.get_pages().len() as u32)
}
