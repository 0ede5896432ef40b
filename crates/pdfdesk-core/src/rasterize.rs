//! Page rasterization to JPEG images.
//!
//! The actual pixel production is delegated to a [`Rasterizer`]
//! collaborator; this module drives it page by page and JPEG-encodes the
//! results.

use crate::error::TransformError;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tracing::warn;

/// Fixed raster scale relative to the page's base size.
pub const RASTER_SCALE: f64 = 2.0;

/// Fixed JPEG quality (maps the original 0.9 encoder quality).
pub const JPEG_QUALITY: u8 = 90;

/// One rendered page as tightly-packed 8-bit RGB.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderedPage {
    fn pixel_len_matches(&self) -> bool {
        self.pixels.len() == (self.width as usize) * (self.height as usize) * 3
    }
}

/// Opaque rasterization capability: parse bytes, report the page count and
/// render a single page (1-indexed) at a scale factor.
pub trait Rasterizer: Send + Sync {
    fn page_count(&self, bytes: &[u8]) -> Result<u32, TransformError>;

    fn render_page(
        &self,
        bytes: &[u8],
        page: u32,
        scale: f64,
    ) -> Result<RenderedPage, TransformError>;
}

/// Rasterize every page of a document to JPEG at [`RASTER_SCALE`].
///
/// A page that fails to render or encode is dropped from the output and the
/// remaining pages continue; only a completely unreadable document is an
/// error.
pub fn rasterize_document(
    bytes: &[u8],
    rasterizer: &dyn Rasterizer,
) -> Result<Vec<Vec<u8>>, TransformError> {
    let page_count = rasterizer.page_count(bytes)?;

    let mut images = Vec::with_capacity(page_count as usize);
    for page in 1..=page_count {
        match rasterizer.render_page(bytes, page, RASTER_SCALE) {
            Ok(rendered) => match encode_jpeg(&rendered) {
                Ok(jpeg) => images.push(jpeg),
                Err(e) => warn!(page, error = %e, "dropping page that failed to encode"),
            },
            Err(e) => warn!(page, error = %e, "dropping page that failed to render"),
        }
    }
    Ok(images)
}

fn encode_jpeg(page: &RenderedPage) -> Result<Vec<u8>, TransformError> {
    if !page.pixel_len_matches() {
        return Err(TransformError::Operation(format!(
            "rendered surface is {} bytes, expected {}",
            page.pixels.len(),
            (page.width as usize) * (page.height as usize) * 3
        )));
    }

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
        .encode(
            &page.pixels,
            page.width,
            page.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(TransformError::operation)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders solid-gray pages, optionally failing specific page numbers.
    struct FakeRasterizer {
        pages: u32,
        failing: Vec<u32>,
    }

    impl Rasterizer for FakeRasterizer {
        fn page_count(&self, bytes: &[u8]) -> Result<u32, TransformError> {
            if bytes.is_empty() {
                return Err(TransformError::Decode("empty input".into()));
            }
            Ok(self.pages)
        }

        fn render_page(
            &self,
            _bytes: &[u8],
            page: u32,
            scale: f64,
        ) -> Result<RenderedPage, TransformError> {
            if self.failing.contains(&page) {
                return Err(TransformError::Operation(format!("page {} broke", page)));
            }
            let width = (10.0 * scale) as u32;
            let height = (14.0 * scale) as u32;
            Ok(RenderedPage {
                width,
                height,
                pixels: vec![128; (width * height * 3) as usize],
            })
        }
    }

    #[test]
    fn one_jpeg_per_page() {
        let rasterizer = FakeRasterizer {
            pages: 3,
            failing: vec![],
        };
        let images = rasterize_document(b"pdf", &rasterizer).unwrap();
        assert_eq!(images.len(), 3);
        for jpeg in &images {
            assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "JPEG SOI marker expected");
        }
    }

    #[test]
    fn failed_page_is_dropped_not_fatal() {
        let rasterizer = FakeRasterizer {
            pages: 4,
            failing: vec![2],
        };
        let images = rasterize_document(b"pdf", &rasterizer).unwrap();
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn unreadable_document_is_an_error() {
        let rasterizer = FakeRasterizer {
            pages: 0,
            failing: vec![],
        };
        assert!(matches!(
            rasterize_document(b"", &rasterizer),
            Err(TransformError::Decode(_))
        ));
    }

    #[test]
    fn surfaces_honor_the_fixed_scale() {
        let rasterizer = FakeRasterizer {
            pages: 1,
            failing: vec![],
        };
        let rendered = rasterizer.render_page(b"pdf", 1, RASTER_SCALE).unwrap();
        assert_eq!(rendered.width, 20);
        assert_eq!(rendered.height, 28);
    }
}
