//! Signature stamping.
//!
//! Embeds a PNG or JPEG payload as an image XObject on one page, scaled to
//! fit a target width and centered on a page-space anchor. Anchor
//! coordinates arrive in screen orientation (top-down); the drawing position
//! flips them into document space (bottom-up).

use crate::error::TransformError;
use crate::pages::{inherited_attr, page_height};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ColorType, DynamicImage, ImageFormat};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use tracing::debug;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    Png,
    Jpeg,
}

/// A decoded signature image payload, ready to embed.
pub struct SignatureImage {
    kind: PayloadKind,
    bytes: Vec<u8>,
    decoded: DynamicImage,
}

impl SignatureImage {
    /// Sniff and decode a PNG or JPEG payload.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, TransformError> {
        let (kind, format) = if bytes.starts_with(&PNG_MAGIC) {
            (PayloadKind::Png, ImageFormat::Png)
        } else if bytes.starts_with(&JPEG_MAGIC) {
            (PayloadKind::Jpeg, ImageFormat::Jpeg)
        } else {
            return Err(TransformError::ImageDecode(
                "payload is neither PNG nor JPEG".into(),
            ));
        };

        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| TransformError::ImageDecode(e.to_string()))?;

        Ok(SignatureImage {
            kind,
            bytes,
            decoded,
        })
    }

    pub fn width(&self) -> u32 {
        self.decoded.width()
    }

    pub fn height(&self) -> u32 {
        self.decoded.height()
    }

    /// Dimensions after scaling to fit a `max × max` box, aspect preserved.
    /// Mirrors the codec's scale-to-fit: small images are scaled up.
    fn scale_to_fit(&self, max: f64) -> (f64, f64) {
        let w = self.width() as f64;
        let h = self.height() as f64;
        let factor = (max / w).min(max / h);
        (w * factor, h * factor)
    }
}

/// Stamp a signature image onto one page (1-indexed).
///
/// The image is scaled to fit `target_width`, drawn centered on the anchor:
/// the draw origin is offset by minus half the scaled size, and the vertical
/// axis flips from screen space into document space
/// (`doc_y = page_height - y - h/2`).
pub fn apply_signature(
    bytes: &[u8],
    image: &SignatureImage,
    page_num: u32,
    x: f64,
    y: f64,
    target_width: f64,
) -> Result<Vec<u8>, TransformError> {
    let mut doc = Document::load_mem(bytes).map_err(TransformError::decode)?;

    let pages = doc.get_pages();
    let &page_id = pages.get(&page_num).ok_or_else(|| {
        TransformError::InvalidSelection(format!(
            "page {} does not exist (document has {} pages)",
            page_num,
            pages.len()
        ))
    })?;

    let height = page_height(&doc, page_id)?;
    let (w, h) = image.scale_to_fit(target_width);
    let draw_x = x - w / 2.0;
    let draw_y = height - y - h / 2.0;
    debug!(page = page_num, draw_x, draw_y, w, h, "stamping signature");

    let xobject_id = embed_image(&mut doc, image)?;
    let name = format!("Sg{}", xobject_id.0);
    attach_xobject(&mut doc, page_id, &name, xobject_id)?;
    append_draw_ops(&mut doc, page_id, &name, w, h, draw_x, draw_y)?;

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(TransformError::operation)?;
    Ok(buffer)
}

/// Add the payload as an image XObject and return its object id.
///
/// JPEG data rides through as a DCTDecode stream; PNG (and any payload the
/// passthrough cannot represent) is flattened to raw RGB behind FlateDecode,
/// with the alpha channel preserved as an SMask.
fn embed_image(doc: &mut Document, image: &SignatureImage) -> Result<ObjectId, TransformError> {
    if image.kind == PayloadKind::Jpeg {
        let color_space: &[u8] = match image.decoded.color() {
            ColorType::L8 => b"DeviceGray",
            ColorType::Rgb8 => b"DeviceRGB",
            // Unusual JPEG color layout: fall back to re-encoding.
            _ => return embed_flate(doc, image),
        };
        let dict = dictionary! {
            "Type" => Object::Name(b"XObject".to_vec()),
            "Subtype" => Object::Name(b"Image".to_vec()),
            "Width" => Object::Integer(image.width() as i64),
            "Height" => Object::Integer(image.height() as i64),
            "ColorSpace" => Object::Name(color_space.to_vec()),
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => Object::Name(b"DCTDecode".to_vec()),
        };
        return Ok(doc.add_object(Stream::new(dict, image.bytes.clone())));
    }

    embed_flate(doc, image)
}

fn embed_flate(doc: &mut Document, image: &SignatureImage) -> Result<ObjectId, TransformError> {
    let rgba = image.decoded.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => Object::Name(b"XObject".to_vec()),
        "Subtype" => Object::Name(b"Image".to_vec()),
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "ColorSpace" => Object::Name(b"DeviceRGB".to_vec()),
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => Object::Name(b"FlateDecode".to_vec()),
    };

    if alpha.iter().any(|&a| a != 0xFF) {
        let smask = dictionary! {
            "Type" => Object::Name(b"XObject".to_vec()),
            "Subtype" => Object::Name(b"Image".to_vec()),
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => Object::Name(b"DeviceGray".to_vec()),
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => Object::Name(b"FlateDecode".to_vec()),
        };
        let smask_id = doc.add_object(Stream::new(smask, deflate(&alpha)?));
        dict.set("SMask", Object::Reference(smask_id));
    }

    Ok(doc.add_object(Stream::new(dict, deflate(&rgb)?)))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, TransformError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(TransformError::operation)?;
    encoder.finish().map_err(TransformError::operation)
}

/// Register the XObject under `name` in the page's Resources, materializing
/// inherited resources onto the page so nothing already referenced is lost.
fn attach_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    xobject_id: ObjectId,
) -> Result<(), TransformError> {
    let mut resources = match inherited_attr(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    match resources.get_mut(b"XObject") {
        Ok(Object::Dictionary(xobjects)) => {
            xobjects.set(name, Object::Reference(xobject_id));
        }
        Ok(Object::Reference(sub_id)) => {
            let sub_id = *sub_id;
            if let Ok(Object::Dictionary(xobjects)) = doc.get_object_mut(sub_id) {
                xobjects.set(name, Object::Reference(xobject_id));
            } else {
                return Err(TransformError::Operation(
                    "XObject resource entry is not a dictionary".into(),
                ));
            }
        }
        _ => {
            let mut xobjects = Dictionary::new();
            xobjects.set(name, Object::Reference(xobject_id));
            resources.set("XObject", Object::Dictionary(xobjects));
        }
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(TransformError::operation)?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Append a content stream drawing the named XObject at the given placement.
fn append_draw_ops(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    w: f64,
    h: f64,
    x: f64,
    y: f64,
) -> Result<(), TransformError> {
    let ops = format!("q\n{w:.2} 0 0 {h:.2} {x:.2} {y:.2} cm\n/{name} Do\nQ\n");
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(TransformError::operation)?;

    let current = page.get(b"Contents").ok().cloned();
    match current {
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(stream_id));
            page.set("Contents", Object::Array(streams));
        }
        Some(Object::Reference(existing)) => {
            page.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(existing),
                    Object::Reference(stream_id),
                ]),
            );
        }
        _ => page.set("Contents", Object::Reference(stream_id)),
    }
    Ok(())
}
