//! The workspace: open documents, the active selection, and the dispatch of
//! transforms onto the blocking pool.

use crate::document::{DocBytes, Document, DocumentId, PreviewStore};
use crate::history::EditHistory;
use crate::mode::InteractionMode;
use crate::render::RenderLoop;
use crate::staging::SignatureStaging;
use pdfdesk_core::{
    apply_signature, compress_document, extract_pages, merge_documents, rasterize_document,
    rotate_pages, Rasterizer, SignatureImage, TransformError, TransformOutput,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Zoom clamps, as a fraction of the page's base size.
pub const MIN_SCALE: f64 = 0.3;
pub const MAX_SCALE: f64 = 2.5;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("another operation is still running")]
    Busy,
    #[error("no document is active")]
    NoActiveDocument,
    #[error("unknown document")]
    UnknownDocument,
    #[error("merging needs at least two open documents")]
    MergeNeedsTwoDocuments,
    #[error("no signature is staged")]
    NoStagedSignature,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("background task failed: {0}")]
    TaskFailed(String),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Which transform to run against the workspace. Tagged so a web bridge
/// can post requests as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformRequest {
    /// Combine every open document, in list order, into the active one.
    Merge,
    /// Rotate every page of the active document by a relative angle.
    Rotate { degrees: i64 },
    /// Reduce the active document to the selected pages.
    Split,
    /// Rewrite the active document with compressed streams.
    Compress,
    /// Rasterize the active document to one JPEG per page.
    Convert,
    /// Bake the staged signature into its target page.
    Sign,
}

/// What a successful transform did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The document's buffer was replaced in place (undoable).
    DocumentUpdated(DocumentId),
    /// Per-page JPEG buffers, handed to the caller for download.
    Images(Vec<Vec<u8>>),
}

pub struct Workspace {
    documents: Vec<Document>,
    active: Option<DocumentId>,
    history: EditHistory,
    mode: InteractionMode,
    staging: SignatureStaging,
    /// Zero-indexed pages picked for extraction, kept sorted.
    selected_pages: BTreeSet<u32>,
    scale: f64,
    device_pixel_ratio: f64,
    processing: Arc<AtomicBool>,
    previews: Arc<dyn PreviewStore>,
    rasterizer: Arc<dyn Rasterizer>,
    render: RenderLoop,
}

impl Workspace {
    pub fn new(previews: Arc<dyn PreviewStore>, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Workspace {
            documents: Vec::new(),
            active: None,
            history: EditHistory::new(),
            mode: InteractionMode::View,
            staging: SignatureStaging::new(),
            selected_pages: BTreeSet::new(),
            scale: 1.0,
            device_pixel_ratio: 1.0,
            processing: Arc::new(AtomicBool::new(false)),
            previews,
            rasterizer: Arc::clone(&rasterizer),
            render: RenderLoop::new(rasterizer),
        }
    }

    // -- document roster ---------------------------------------------------

    /// Add an uploaded file. The first upload becomes the active document.
    pub async fn upload(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> DocumentId {
        let mut document = Document::new(name, bytes);
        document.refresh_preview(self.previews.as_ref());
        let id = document.id;
        info!(%id, name = %document.name, size = document.size(), "document opened");
        self.documents.push(document);

        if self.active.is_none() {
            self.active = Some(id);
            self.restart_render().await;
        }
        id
    }

    /// Close a document, dropping its preview and history. If it was active,
    /// activation falls to the first remaining document.
    pub async fn remove(&mut self, id: DocumentId) -> Result<(), WorkspaceError> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or(WorkspaceError::UnknownDocument)?;

        let mut document = self.documents.remove(index);
        document.release_preview(self.previews.as_ref());
        self.history.forget(id);

        if self.active == Some(id) {
            self.active = self.documents.first().map(|d| d.id);
            self.restart_render().await;
        }
        Ok(())
    }

    /// Rename a document, keeping the `.pdf` suffix.
    pub fn rename(&mut self, id: DocumentId, name: &str) -> Result<(), WorkspaceError> {
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(WorkspaceError::UnknownDocument)?;
        let mut name = name.trim().to_string();
        if !name.to_ascii_lowercase().ends_with(".pdf") {
            name.push_str(".pdf");
        }
        document.name = name;
        Ok(())
    }

    pub async fn set_active(&mut self, id: DocumentId) -> Result<(), WorkspaceError> {
        if !self.documents.iter().any(|d| d.id == id) {
            return Err(WorkspaceError::UnknownDocument);
        }
        if self.active != Some(id) {
            self.active = Some(id);
            self.selected_pages.clear();
            self.restart_render().await;
        }
        Ok(())
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn active_document(&self) -> Option<&Document> {
        let id = self.active?;
        self.documents.iter().find(|d| d.id == id)
    }

    // -- interaction state -------------------------------------------------

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch interaction mode. Leaving split mode drops the page selection;
    /// a staged signature survives mode switches.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode == InteractionMode::Split && mode != InteractionMode::Split {
            self.selected_pages.clear();
        }
        self.mode = mode;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the zoom scale, clamped to [`MIN_SCALE`]..=[`MAX_SCALE`], and
    /// re-render at the new size.
    pub async fn set_scale(&mut self, scale: f64) {
        let clamped = scale.clamp(MIN_SCALE, MAX_SCALE);
        if (clamped - self.scale).abs() > f64::EPSILON {
            self.scale = clamped;
            self.restart_render().await;
        }
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Set the display's device pixel ratio. Surfaces render at
    /// `zoom × device_pixel_ratio`; the ratio is not subject to the zoom
    /// clamp. Non-positive ratios are ignored.
    pub async fn set_device_pixel_ratio(&mut self, ratio: f64) {
        if ratio > 0.0 && (ratio - self.device_pixel_ratio).abs() > f64::EPSILON {
            self.device_pixel_ratio = ratio;
            self.restart_render().await;
        }
    }

    /// A click on a page surface, in screen pixels. The meaning depends on
    /// the current mode.
    pub fn page_clicked(&mut self, page_index: u32, screen_x: f64, screen_y: f64) {
        match self.mode {
            InteractionMode::Split => {
                if !self.selected_pages.remove(&page_index) {
                    self.selected_pages.insert(page_index);
                }
            }
            InteractionMode::Sign => {
                // Staging stores 1-indexed target pages.
                self.staging
                    .place(page_index + 1, screen_x, screen_y, self.scale);
            }
            _ => {}
        }
    }

    pub fn selected_pages(&self) -> &BTreeSet<u32> {
        &self.selected_pages
    }

    pub fn staging(&self) -> &SignatureStaging {
        &self.staging
    }

    pub fn staging_mut(&mut self) -> &mut SignatureStaging {
        &mut self.staging
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn render(&self) -> &RenderLoop {
        &self.render
    }

    /// Wait for the current render pass to finish. Test and shutdown hook.
    pub async fn wait_for_render(&mut self) {
        self.render.wait_idle().await;
    }

    // -- transforms --------------------------------------------------------

    /// Run one transform. Rejected with [`WorkspaceError::Busy`] while a
    /// previous transform is still in flight; the heavy work runs on the
    /// blocking pool. The busy flag clears on every outcome, including a
    /// dropped (canceled) call.
    pub async fn apply(
        &mut self,
        request: TransformRequest,
    ) -> Result<TransformOutcome, WorkspaceError> {
        let _guard = self.acquire_busy()?;
        self.run(request).await
    }

    fn acquire_busy(&self) -> Result<ProcessingGuard, WorkspaceError> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(WorkspaceError::Busy);
        }
        Ok(ProcessingGuard(Arc::clone(&self.processing)))
    }

    async fn run(
        &mut self,
        request: TransformRequest,
    ) -> Result<TransformOutcome, WorkspaceError> {
        match request {
            TransformRequest::Merge => self.run_merge().await,
            TransformRequest::Rotate { degrees } => {
                let bytes = self.active_bytes()?;
                let output = run_blocking(move || {
                    rotate_pages(&bytes, degrees).map(TransformOutput::Document)
                })
                .await?;
                self.finish(output).await
            }
            TransformRequest::Split => self.run_split().await,
            TransformRequest::Compress => {
                let bytes = self.active_bytes()?;
                let before = bytes.len();
                let compressed = run_blocking(move || compress_document(&bytes)).await?;
                info!(before, after = compressed.len(), "document compressed");
                self.finish(TransformOutput::Document(compressed)).await
            }
            TransformRequest::Convert => {
                let bytes = self.active_bytes()?;
                let rasterizer = Arc::clone(&self.rasterizer);
                let output = run_blocking(move || {
                    rasterize_document(&bytes, rasterizer.as_ref()).map(TransformOutput::ImageSet)
                })
                .await?;
                self.finish(output).await
            }
            TransformRequest::Sign => self.run_sign().await,
        }
    }

    /// Dispatch a transform result on its variant: a document buffer replaces
    /// the active document (undoably), an image set goes back to the caller.
    async fn finish(
        &mut self,
        output: TransformOutput,
    ) -> Result<TransformOutcome, WorkspaceError> {
        match output {
            TransformOutput::Document(bytes) => self
                .replace_active(bytes)
                .await
                .map(TransformOutcome::DocumentUpdated),
            TransformOutput::ImageSet(images) => Ok(TransformOutcome::Images(images)),
        }
    }

    /// Merge every open document, in list order, into the active document's
    /// buffer. The prior buffer is recorded for undo; the other documents
    /// keep their own buffers and histories.
    async fn run_merge(&mut self) -> Result<TransformOutcome, WorkspaceError> {
        if self.documents.len() < 2 {
            return Err(WorkspaceError::MergeNeedsTwoDocuments);
        }
        self.require_active()?;
        let inputs: Vec<Vec<u8>> = self
            .documents
            .iter()
            .map(|d| d.bytes().as_ref().clone())
            .collect();

        let output =
            run_blocking(move || merge_documents(inputs).map(TransformOutput::Document)).await?;
        self.finish(output).await
    }

    /// Replace the active document with the selected pages, undoably, and
    /// clear the selection (the old indices refer to the replaced buffer).
    async fn run_split(&mut self) -> Result<TransformOutcome, WorkspaceError> {
        let bytes = self.active_bytes()?;
        let selection: Vec<u32> = self.selected_pages.iter().copied().collect();

        let output =
            run_blocking(move || extract_pages(&bytes, &selection).map(TransformOutput::Document))
                .await?;
        let outcome = self.finish(output).await?;
        self.selected_pages.clear();
        Ok(outcome)
    }

    async fn run_sign(&mut self) -> Result<TransformOutcome, WorkspaceError> {
        let request = self
            .staging
            .commit_request()
            .ok_or(WorkspaceError::NoStagedSignature)?;
        let bytes = self.active_bytes()?;

        let output = run_blocking(move || {
            let image = SignatureImage::decode(request.image)?;
            apply_signature(
                &bytes,
                &image,
                request.page,
                request.x,
                request.y,
                request.width,
            )
            .map(TransformOutput::Document)
        })
        .await?;

        let outcome = self.finish(output).await?;
        self.staging.complete();
        Ok(outcome)
    }

    // -- history -----------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.active.is_some_and(|id| self.history.can_undo(id))
    }

    pub fn can_redo(&self) -> bool {
        self.active.is_some_and(|id| self.history.can_redo(id))
    }

    pub async fn undo(&mut self) -> Result<(), WorkspaceError> {
        let id = self.require_active()?;
        let current = self.current_bytes(id)?;
        let restored = self
            .history
            .undo(id, current)
            .ok_or(WorkspaceError::NothingToUndo)?;
        self.restore(id, restored).await
    }

    pub async fn redo(&mut self) -> Result<(), WorkspaceError> {
        let id = self.require_active()?;
        let current = self.current_bytes(id)?;
        let restored = self
            .history
            .redo(id, current)
            .ok_or(WorkspaceError::NothingToRedo)?;
        self.restore(id, restored).await
    }

    // -- internals ---------------------------------------------------------

    fn require_active(&self) -> Result<DocumentId, WorkspaceError> {
        self.active.ok_or(WorkspaceError::NoActiveDocument)
    }

    fn active_bytes(&self) -> Result<DocBytes, WorkspaceError> {
        self.active_document()
            .map(|d| Arc::clone(d.bytes()))
            .ok_or(WorkspaceError::NoActiveDocument)
    }

    fn current_bytes(&self, id: DocumentId) -> Result<DocBytes, WorkspaceError> {
        self.documents
            .iter()
            .find(|d| d.id == id)
            .map(|d| Arc::clone(d.bytes()))
            .ok_or(WorkspaceError::UnknownDocument)
    }

    /// Swap the active document's buffer for a transform result, recording
    /// the prior buffer for undo.
    async fn replace_active(&mut self, bytes: Vec<u8>) -> Result<DocumentId, WorkspaceError> {
        let id = self.require_active()?;
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(WorkspaceError::UnknownDocument)?;
        let prior = document.replace_bytes(bytes, self.previews.as_ref());
        self.history.record(id, prior);
        self.restart_render().await;
        Ok(id)
    }

    async fn restore(&mut self, id: DocumentId, bytes: DocBytes) -> Result<(), WorkspaceError> {
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(WorkspaceError::UnknownDocument)?;
        document.restore_bytes(bytes, self.previews.as_ref());
        self.restart_render().await;
        Ok(())
    }

    async fn restart_render(&mut self) {
        match self.active_bytes() {
            Ok(bytes) => {
                let scale = self.scale * self.device_pixel_ratio;
                if let Err(e) = self.render.begin(bytes, scale).await {
                    warn!(error = %e, "render pass failed to start");
                }
            }
            Err(_) => self.render.cancel().await,
        }
    }
}

/// Clears the busy flag when the transform finishes, errors, or is dropped.
struct ProcessingGuard(Arc<AtomicBool>);

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, WorkspaceError>
where
    F: FnOnce() -> Result<T, TransformError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| WorkspaceError::TaskFailed(e.to_string()))?
        .map_err(WorkspaceError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PreviewHandle, PreviewStore};
    use crate::staging::StagingState;
    use pdfdesk_core::{page_count, RenderedPage};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Counts created and revoked handles.
    #[derive(Default)]
    struct FakePreviews {
        created: AtomicUsize,
        revoked: Mutex<Vec<String>>,
    }

    impl PreviewStore for FakePreviews {
        fn create(&self, _bytes: &[u8]) -> PreviewHandle {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            PreviewHandle(format!("blob:{}", n))
        }

        fn revoke(&self, handle: &PreviewHandle) {
            self.revoked.lock().unwrap().push(handle.0.clone());
        }
    }

    struct FakeRasterizer;

    impl Rasterizer for FakeRasterizer {
        fn page_count(&self, bytes: &[u8]) -> Result<u32, TransformError> {
            page_count(bytes)
        }

        fn render_page(
            &self,
            _bytes: &[u8],
            _page: u32,
            scale: f64,
        ) -> Result<RenderedPage, TransformError> {
            let width = (10.0 * scale) as u32;
            Ok(RenderedPage {
                width,
                height: 10,
                pixels: vec![255; (width * 10 * 3) as usize],
            })
        }
    }

    fn workspace() -> (Workspace, Arc<FakePreviews>) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let previews = Arc::new(FakePreviews::default());
        let ws = Workspace::new(previews.clone(), Arc::new(FakeRasterizer));
        (ws, previews)
    }

    /// A minimal but valid PDF with `num_pages` pages.
    fn test_pdf(num_pages: u32) -> Vec<u8> {
        use lopdf::{dictionary, Dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for i in 0..num_pages {
            let content = Stream::new(
                Dictionary::new(),
                format!("BT /F1 12 Tf 100 700 Td (Page {}) Tj ET", i + 1).into_bytes(),
            );
            let content_id = doc.add_object(content);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => Object::Reference(content_id),
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => num_pages as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// A tiny opaque PNG for signature payloads.
    fn signature_png() -> Vec<u8> {
        use image::{ImageFormat, Rgba, RgbaImage};
        let img = RgbaImage::from_pixel(4, 4, Rgba([20, 30, 40, 255]));
        let mut buffer = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn first_upload_becomes_active_with_a_preview() {
        let (mut ws, previews) = workspace();
        let id = ws.upload("a.pdf", test_pdf(1)).await;

        assert_eq!(ws.active_document().unwrap().id, id);
        assert!(ws.active_document().unwrap().preview().is_some());
        assert_eq!(previews.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rotate_is_undoable_and_redoable() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(2)).await;
        let before = Arc::clone(ws.active_document().unwrap().bytes());

        let outcome = ws.apply(TransformRequest::Rotate { degrees: 90 }).await.unwrap();
        assert!(matches!(outcome, TransformOutcome::DocumentUpdated(_)));
        let after = Arc::clone(ws.active_document().unwrap().bytes());
        assert_ne!(before, after);
        assert!(ws.can_undo());

        ws.undo().await.unwrap();
        assert_eq!(ws.active_document().unwrap().bytes(), &before);
        assert!(ws.can_redo());

        ws.redo().await.unwrap();
        assert_eq!(ws.active_document().unwrap().bytes(), &after);
    }

    #[tokio::test]
    async fn undo_with_no_history_errors() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(1)).await;
        assert!(matches!(
            ws.undo().await,
            Err(WorkspaceError::NothingToUndo)
        ));
    }

    #[tokio::test]
    async fn merge_needs_two_documents() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(1)).await;
        assert!(matches!(
            ws.apply(TransformRequest::Merge).await,
            Err(WorkspaceError::MergeNeedsTwoDocuments)
        ));
    }

    #[tokio::test]
    async fn merge_replaces_the_active_document_undoably() {
        let (mut ws, _) = workspace();
        let a = ws.upload("a.pdf", test_pdf(2)).await;
        ws.upload("b.pdf", test_pdf(3)).await;

        let outcome = ws.apply(TransformRequest::Merge).await.unwrap();
        assert_eq!(outcome, TransformOutcome::DocumentUpdated(a));

        // The merged buffer lands in the active document; the roster and
        // the other document's buffer are untouched.
        assert_eq!(ws.active_document().unwrap().id, a);
        assert_eq!(ws.documents().len(), 2);
        assert_eq!(
            page_count(ws.active_document().unwrap().bytes()).unwrap(),
            5
        );
        assert_eq!(page_count(ws.documents()[1].bytes()).unwrap(), 3);

        ws.undo().await.unwrap();
        assert_eq!(
            page_count(ws.active_document().unwrap().bytes()).unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn split_replaces_the_active_document_and_clears_the_selection() {
        let (mut ws, _) = workspace();
        let id = ws.upload("report.pdf", test_pdf(3)).await;
        ws.set_mode(InteractionMode::Split);
        ws.page_clicked(0, 0.0, 0.0);
        ws.page_clicked(2, 0.0, 0.0);

        let outcome = ws.apply(TransformRequest::Split).await.unwrap();
        assert_eq!(outcome, TransformOutcome::DocumentUpdated(id));

        let active = ws.active_document().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.name, "report.pdf");
        assert_eq!(page_count(active.bytes()).unwrap(), 2);
        assert!(ws.selected_pages().is_empty());
        assert_eq!(ws.documents().len(), 1);

        // Undo brings the full document back.
        ws.undo().await.unwrap();
        assert_eq!(
            page_count(ws.active_document().unwrap().bytes()).unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn split_with_no_selection_is_rejected() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(3)).await;
        assert!(matches!(
            ws.apply(TransformRequest::Split).await,
            Err(WorkspaceError::Transform(
                TransformError::InvalidSelection(_)
            ))
        ));
    }

    #[tokio::test]
    async fn clicks_toggle_page_selection_in_split_mode() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(3)).await;
        ws.set_mode(InteractionMode::Split);
        ws.page_clicked(1, 0.0, 0.0);
        ws.page_clicked(1, 0.0, 0.0);
        assert!(ws.selected_pages().is_empty());

        ws.page_clicked(2, 0.0, 0.0);
        ws.set_mode(InteractionMode::View);
        assert!(ws.selected_pages().is_empty(), "leaving split drops selection");
    }

    #[tokio::test]
    async fn convert_returns_one_image_per_page() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(3)).await;
        let outcome = ws.apply(TransformRequest::Convert).await.unwrap();
        let TransformOutcome::Images(images) = outcome else {
            panic!("expected images");
        };
        assert_eq!(images.len(), 3);
        // Conversion does not touch the document or its history.
        assert!(!ws.can_undo());
    }

    #[tokio::test]
    async fn sign_bakes_the_staged_signature() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(1)).await;
        ws.set_mode(InteractionMode::Sign);
        ws.page_clicked(0, 200.0, 300.0);
        ws.staging_mut().attach_image(signature_png());

        let outcome = ws.apply(TransformRequest::Sign).await.unwrap();
        assert!(matches!(outcome, TransformOutcome::DocumentUpdated(_)));
        assert_eq!(ws.staging().state(), StagingState::Idle);
        assert!(ws.can_undo());
    }

    #[tokio::test]
    async fn sign_without_a_ready_signature_errors() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(1)).await;
        ws.set_mode(InteractionMode::Sign);
        ws.page_clicked(0, 200.0, 300.0);
        // Placed but no image yet.
        assert!(matches!(
            ws.apply(TransformRequest::Sign).await,
            Err(WorkspaceError::NoStagedSignature)
        ));
    }

    #[tokio::test]
    async fn failed_transform_clears_the_busy_flag() {
        let (mut ws, _) = workspace();
        assert!(matches!(
            ws.apply(TransformRequest::Compress).await,
            Err(WorkspaceError::NoActiveDocument)
        ));
        assert!(!ws.is_processing());

        ws.upload("a.pdf", test_pdf(1)).await;
        assert!(ws.apply(TransformRequest::Compress).await.is_ok());
        assert!(!ws.is_processing());
    }

    #[tokio::test]
    async fn submission_while_busy_is_rejected() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(1)).await;

        // Simulate an outstanding transform holding the flag.
        ws.processing.store(true, Ordering::SeqCst);
        assert!(ws.is_processing());
        assert!(matches!(
            ws.apply(TransformRequest::Compress).await,
            Err(WorkspaceError::Busy)
        ));

        ws.processing.store(false, Ordering::SeqCst);
        assert!(ws.apply(TransformRequest::Compress).await.is_ok());
    }

    #[tokio::test]
    async fn canceled_transform_releases_the_busy_flag() {
        let (mut ws, _) = workspace();
        ws.upload("a.pdf", test_pdf(1)).await;

        // A zero timeout polls the transform once (far enough to take the
        // busy flag) and then drops it mid-flight.
        let result = tokio::time::timeout(
            std::time::Duration::ZERO,
            ws.apply(TransformRequest::Compress),
        )
        .await;
        assert!(result.is_err(), "transform should still be in flight");

        assert!(!ws.is_processing());
        assert!(ws.apply(TransformRequest::Compress).await.is_ok());
    }

    #[test]
    fn requests_round_trip_through_json() {
        let json = serde_json::to_string(&TransformRequest::Rotate { degrees: 90 }).unwrap();
        assert_eq!(json, r#"{"type":"rotate","degrees":90}"#);
        let back: TransformRequest = serde_json::from_str(r#"{"type":"merge"}"#).unwrap();
        assert_eq!(back, TransformRequest::Merge);
    }

    #[tokio::test]
    async fn rename_keeps_the_pdf_suffix() {
        let (mut ws, _) = workspace();
        let id = ws.upload("a.pdf", test_pdf(1)).await;
        ws.rename(id, "quarterly report").unwrap();
        assert_eq!(ws.documents()[0].name, "quarterly report.pdf");

        ws.rename(id, "Final.PDF").unwrap();
        assert_eq!(ws.documents()[0].name, "Final.PDF");
    }

    #[tokio::test]
    async fn scale_is_clamped() {
        let (mut ws, _) = workspace();
        ws.set_scale(10.0).await;
        assert_eq!(ws.scale(), MAX_SCALE);
        ws.set_scale(0.01).await;
        assert_eq!(ws.scale(), MIN_SCALE);
    }

    #[tokio::test]
    async fn device_pixel_ratio_multiplies_the_render_scale() {
        let (mut ws, _) = workspace();
        ws.set_device_pixel_ratio(2.0).await;
        ws.upload("a.pdf", test_pdf(1)).await;
        ws.wait_for_render().await;
        // FakeRasterizer surfaces are 10 × effective scale wide.
        assert_eq!(ws.render().surface(1).await.unwrap().width, 20);

        ws.set_scale(0.5).await;
        ws.wait_for_render().await;
        assert_eq!(ws.render().surface(1).await.unwrap().width, 10);
        assert_eq!(ws.scale(), 0.5, "zoom clamp does not absorb the ratio");

        // The ratio itself is outside the zoom clamp.
        ws.set_device_pixel_ratio(3.0).await;
        ws.set_scale(10.0).await;
        ws.wait_for_render().await;
        assert_eq!(ws.render().surface(1).await.unwrap().width, 75);
    }

    #[tokio::test]
    async fn removing_the_active_document_revokes_its_preview() {
        let (mut ws, previews) = workspace();
        let a = ws.upload("a.pdf", test_pdf(1)).await;
        let b = ws.upload("b.pdf", test_pdf(1)).await;

        ws.remove(a).await.unwrap();
        assert_eq!(ws.active_document().unwrap().id, b);
        assert_eq!(previews.revoked.lock().unwrap().as_slice(), &["blob:0"]);

        ws.remove(b).await.unwrap();
        assert!(ws.active_document().is_none());
        assert!(matches!(
            ws.remove(b).await,
            Err(WorkspaceError::UnknownDocument)
        ));
    }
}
