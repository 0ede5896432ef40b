//! Cancelable page render loop.
//!
//! Each call to [`RenderLoop::begin`] starts a fresh render pass over every
//! page of a document and cancels whatever pass was running before it. Passes
//! are identified by a generation counter; a surface produced by a superseded
//! pass is discarded instead of being published, so a slow page from an old
//! document can never overwrite a page of the current one.

use crate::document::DocBytes;
use pdfdesk_core::{Rasterizer, RenderedPage, TransformError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type SurfaceMap = HashMap<u32, RenderedPage>;

pub struct RenderLoop {
    rasterizer: Arc<dyn Rasterizer>,
    /// Bumped by every `begin` and `cancel`; publication is gated on it.
    generation: Arc<AtomicU64>,
    surfaces: Arc<Mutex<SurfaceMap>>,
    tasks: Vec<JoinHandle<()>>,
}

impl RenderLoop {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        RenderLoop {
            rasterizer,
            generation: Arc::new(AtomicU64::new(0)),
            surfaces: Arc::new(Mutex::new(HashMap::new())),
            tasks: Vec::new(),
        }
    }

    /// Start rendering every page of `bytes` at `scale`. Supersedes and
    /// aborts any pass still in flight and clears previously published
    /// surfaces. Returns the page count of the new pass.
    pub async fn begin(&mut self, bytes: DocBytes, scale: f64) -> Result<u32, TransformError> {
        let generation = self.supersede();
        self.surfaces.lock().await.clear();

        let page_count = {
            let rasterizer = Arc::clone(&self.rasterizer);
            let bytes = Arc::clone(&bytes);
            tokio::task::spawn_blocking(move || rasterizer.page_count(&bytes))
                .await
                .map_err(|e| TransformError::Operation(e.to_string()))??
        };
        debug!(generation, page_count, scale, "starting render pass");

        for page in 1..=page_count {
            let rasterizer = Arc::clone(&self.rasterizer);
            let bytes = Arc::clone(&bytes);
            let surfaces = Arc::clone(&self.surfaces);
            let counter = Arc::clone(&self.generation);

            self.tasks.push(tokio::spawn(async move {
                let rendered = tokio::task::spawn_blocking(move || {
                    rasterizer.render_page(&bytes, page, scale)
                })
                .await;
                let rendered = match rendered {
                    Ok(Ok(surface)) => surface,
                    Ok(Err(e)) => {
                        warn!(page, error = %e, "page failed to render");
                        return;
                    }
                    // The blocking task was torn down with the pass.
                    Err(_) => return,
                };

                // Publish under the lock, but only if this pass is still the
                // current one.
                let mut surfaces = surfaces.lock().await;
                if counter.load(Ordering::SeqCst) == generation {
                    surfaces.insert(page, rendered);
                }
            }));
        }

        Ok(page_count)
    }

    /// Stop the in-flight pass without starting a new one.
    pub async fn cancel(&mut self) {
        self.supersede();
        self.surfaces.lock().await.clear();
    }

    fn supersede(&mut self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        generation
    }

    /// Wait for every task of the current pass to finish or abort.
    pub async fn wait_idle(&mut self) {
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }

    pub async fn surface(&self, page: u32) -> Option<RenderedPage> {
        self.surfaces.lock().await.get(&page).cloned()
    }

    pub async fn rendered_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.surfaces.lock().await.keys().copied().collect();
        pages.sort_unstable();
        pages
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.supersede();
    }
}
