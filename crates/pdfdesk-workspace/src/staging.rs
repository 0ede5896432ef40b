//! Signature staging: an interactive state machine for placing, dragging
//! and resizing a pending signature before it is baked into the document.
//!
//! All stored coordinates are page-space units; screen-space deltas are
//! divided by the zoom scale on the way in.

use serde::Serialize;
use tracing::debug;

/// Default staged size in page-space units.
pub const DEFAULT_WIDTH: f64 = 140.0;
pub const DEFAULT_HEIGHT: f64 = 50.0;

/// Resize clamps.
pub const MIN_WIDTH: f64 = 40.0;
pub const MIN_HEIGHT: f64 = 20.0;

/// Observable state of the staging machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StagingState {
    Idle,
    /// A signature box is placed but has no image yet.
    Placed,
    /// Image acquired; the signature can be committed.
    ImageReady,
}

/// The pending signature: target page (1-indexed), anchor and size in
/// page-space units, and the image payload once acquired.
#[derive(Debug, Clone)]
pub struct StagedSignature {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    image: Option<Vec<u8>>,
}

impl StagedSignature {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Everything `apply_signature` needs, extracted at commit time.
#[derive(Debug, Clone)]
pub struct SignatureRequest {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragKind {
    Move,
    Resize,
}

/// One pointer gesture. Position is recomputed fresh from the gesture's
/// start reference on every move, never accumulated, so repeated move
/// events cannot drift.
#[derive(Debug, Clone, Copy)]
struct DragSession {
    kind: DragKind,
    start_x: f64,
    start_y: f64,
    /// Anchor (move) or size (resize) captured when the gesture began.
    origin: (f64, f64),
}

/// The staging machine. At most one signature is staged at a time.
#[derive(Default)]
pub struct SignatureStaging {
    staged: Option<StagedSignature>,
    drag: Option<DragSession>,
}

impl SignatureStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StagingState {
        match &self.staged {
            None => StagingState::Idle,
            Some(sig) if sig.has_image() => StagingState::ImageReady,
            Some(_) => StagingState::Placed,
        }
    }

    pub fn staged(&self) -> Option<&StagedSignature> {
        self.staged.as_ref()
    }

    /// Place a signature box at a page click. The click arrives in screen
    /// pixels and is converted to page-space via the zoom scale. A no-op
    /// while another signature is pending.
    pub fn place(&mut self, page: u32, screen_x: f64, screen_y: f64, scale: f64) -> bool {
        if self.staged.is_some() {
            return false;
        }
        let (x, y) = (screen_x / scale, screen_y / scale);
        debug!(page, x, y, "staging signature");
        self.staged = Some(StagedSignature {
            page,
            x,
            y,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            image: None,
        });
        true
    }

    /// Attach the drawn or uploaded image payload. Placed -> ImageReady.
    pub fn attach_image(&mut self, image: Vec<u8>) -> bool {
        match &mut self.staged {
            Some(sig) => {
                sig.image = Some(image);
                true
            }
            None => false,
        }
    }

    /// Begin a move gesture at a screen position.
    pub fn begin_move(&mut self, screen_x: f64, screen_y: f64) -> bool {
        self.begin_drag(DragKind::Move, screen_x, screen_y)
    }

    /// Begin a resize gesture at a screen position.
    pub fn begin_resize(&mut self, screen_x: f64, screen_y: f64) -> bool {
        self.begin_drag(DragKind::Resize, screen_x, screen_y)
    }

    fn begin_drag(&mut self, kind: DragKind, screen_x: f64, screen_y: f64) -> bool {
        let Some(sig) = &self.staged else {
            return false;
        };
        let origin = match kind {
            DragKind::Move => (sig.x, sig.y),
            DragKind::Resize => (sig.width, sig.height),
        };
        self.drag = Some(DragSession {
            kind,
            start_x: screen_x,
            start_y: screen_y,
            origin,
        });
        true
    }

    /// Handle a pointer-move event during an active gesture.
    pub fn drag_to(&mut self, screen_x: f64, screen_y: f64, scale: f64) {
        let (Some(drag), Some(sig)) = (self.drag, self.staged.as_mut()) else {
            return;
        };
        let dx = (screen_x - drag.start_x) / scale;
        let dy = (screen_y - drag.start_y) / scale;
        match drag.kind {
            DragKind::Move => {
                sig.x = drag.origin.0 + dx;
                sig.y = drag.origin.1 + dy;
            }
            DragKind::Resize => {
                sig.width = (drag.origin.0 + dx).max(MIN_WIDTH);
                sig.height = (drag.origin.1 + dy).max(MIN_HEIGHT);
            }
        }
    }

    /// End the gesture; the session is torn down and cannot leak into the
    /// next drag.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Discard the pending signature.
    pub fn cancel(&mut self) {
        self.staged = None;
        self.drag = None;
    }

    /// Extract the transform parameters. Only available once an image is
    /// attached; the staging stays pending until [`SignatureStaging::complete`]
    /// confirms the transform succeeded.
    pub fn commit_request(&self) -> Option<SignatureRequest> {
        let sig = self.staged.as_ref()?;
        let image = sig.image.clone()?;
        Some(SignatureRequest {
            page: sig.page,
            x: sig.x,
            y: sig.y,
            width: sig.width,
            image,
        })
    }

    /// Called after the commit transform succeeded; returns to Idle.
    pub fn complete(&mut self) {
        self.staged = None;
        self.drag = None;
    }
}
