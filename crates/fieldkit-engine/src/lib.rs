#![forbid(unsafe_code)]

//! Deterministic placement and interaction engine for document field
//! overlays.
//!
//! The engine is a pure state machine layered over an externally rendered
//! document viewer it does not control. Hosts feed it semantic events
//! (ticks, pointer input, menu and dialog actions, persistence resolutions)
//! and drain [`HostCommand`] values describing the DOM and backend effects
//! to apply. Nothing in this crate performs I/O, reads a clock, or touches
//! a DOM, which is what makes every flow unit-testable.
//!
//! Components:
//! - [`readiness`]: polls the viewer's DOM shape until the document is
//!   renderable, then watches for silent re-renders that wipe the overlay.
//! - [`reconcile`]: plans idempotent mount/remove passes that keep overlay
//!   nodes matching the authoritative item list.
//! - [`interaction`]: the single-session drag/resize gesture machine.
//! - [`menu`]: context-menu placement and single-flight field creation.
//! - [`dialog`]: modal metadata editing with validation.
//! - [`persist`]: the request/outcome contract for backend calls.
//! - [`engine`]: the orchestrator tying the components together.

pub mod dialog;
pub mod engine;
pub mod interaction;
pub mod menu;
pub mod persist;
pub mod readiness;
pub mod reconcile;

pub use dialog::{
    DialogController, DialogError, DialogSaveError, EditForm, ValidationError,
};
pub use engine::{Engine, HandleKind, HostCommand};
pub use interaction::{
    GestureCommit, GestureFrame, InteractionController, InteractionError, InteractionMode,
    InteractionSession, ResizeAnchors,
};
pub use menu::{ContextMenu, MenuController, MenuOpened};
pub use persist::{
    PersistenceCall, PersistenceError, PersistenceOutcome, PersistenceRequest, RequestId,
    SignOutcome,
};
pub use readiness::{
    POLL_INTERVAL, ReadinessConfig, ReadinessEffect, ReadinessMonitor, ReadinessState,
    ViewerAdapter,
};
pub use reconcile::{OverlayNode, OverlayReconciler, ReconcileOp};
