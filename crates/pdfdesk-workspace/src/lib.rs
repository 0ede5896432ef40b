//! Workspace state for a PDF editing session
//!
//! This crate holds everything around the pure transforms of
//! `pdfdesk-core`: the roster of open documents and their preview handles,
//! per-document undo/redo snapshots, the interaction mode, the signature
//! staging state machine, and a cancelable render loop that keeps page
//! surfaces current as documents and zoom change. [`Workspace`] ties these
//! together and dispatches transforms onto tokio's blocking pool.

pub mod document;
pub mod history;
pub mod mode;
pub mod render;
pub mod staging;
pub mod workspace;

pub use document::{DocBytes, Document, DocumentId, PreviewHandle, PreviewStore};
pub use history::EditHistory;
pub use mode::InteractionMode;
pub use render::RenderLoop;
pub use staging::{SignatureRequest, SignatureStaging, StagedSignature, StagingState};
pub use workspace::{
    TransformOutcome, TransformRequest, Workspace, WorkspaceError, MAX_SCALE, MIN_SCALE,
};
