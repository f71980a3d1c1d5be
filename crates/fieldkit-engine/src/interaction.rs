#![forbid(unsafe_code)]

//! Per-item drag/resize gesture lifecycle.
//!
//! At most one [`InteractionSession`] exists system-wide. While a session is
//! active, pointer moves produce visual frames only; the single persistence
//! update happens on release, exactly once per gesture. Mouse and touch are
//! already unified into [`PointerInput`] before they reach this module.
//!
//! A failed persistence call after release does not roll the local geometry
//! back; the orchestrator logs the drift instead (see
//! [`crate::engine::Engine::persistence_resolved`]).

use fieldkit_core::{
    FieldItem, HandleFootprint, ItemId, ItemPatch, PageBox, PercentRect, PointerInput,
    PointerPhase, PointerPoint, resize_to_percent, to_percent,
};
use serde::{Deserialize, Serialize};

/// Gesture mode of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Dragging,
    Resizing,
}

/// Pixel anchors captured at resize start: the handle's own footprint and
/// the item's top-left corner in viewer space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeAnchors {
    pub footprint: HandleFootprint,
    pub item_origin: PointerPoint,
}

/// Transient record of an in-progress gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSession {
    pub item_id: ItemId,
    pub mode: InteractionMode,
    pub page_box: PageBox,
    /// Item rectangle at gesture start; moves replace one half of it and
    /// cancellation restores it.
    pub base_rect: PercentRect,
    resize: Option<ResizeAnchors>,
}

/// Visual-only geometry update for the overlay node of the active item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureFrame {
    pub item_id: ItemId,
    pub rect: PercentRect,
}

/// Final result of a completed gesture: the patch to persist (position
/// fields for a drag, size fields for a resize) and the committed rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureCommit {
    pub item_id: ItemId,
    pub mode: InteractionMode,
    pub patch: ItemPatch,
    pub rect: PercentRect,
}

/// Gesture lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionError {
    /// A session is already active for `active`; only one may exist.
    SessionActive { active: ItemId },
    /// Release or cancel without an active session.
    NoActiveSession,
}

impl core::fmt::Display for InteractionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SessionActive { active } => {
                write!(f, "an interaction session is already active for {active}")
            }
            Self::NoActiveSession => write!(f, "no active interaction session"),
        }
    }
}

impl std::error::Error for InteractionError {}

/// Drag/resize state machine over the unified pointer abstraction.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    active: Option<InteractionSession>,
}

impl InteractionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Item of the active session, if any.
    #[must_use]
    pub fn active_item(&self) -> Option<ItemId> {
        self.active.as_ref().map(|session| session.item_id)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a drag on pointer-down over the item's drag handle.
    pub fn begin_drag(&mut self, item: &FieldItem, page_box: PageBox) -> Result<(), InteractionError> {
        self.begin(item, page_box, InteractionMode::Dragging, None)
    }

    /// Begin a resize on pointer-down over the item's resize handle.
    pub fn begin_resize(
        &mut self,
        item: &FieldItem,
        page_box: PageBox,
        anchors: ResizeAnchors,
    ) -> Result<(), InteractionError> {
        self.begin(item, page_box, InteractionMode::Resizing, Some(anchors))
    }

    fn begin(
        &mut self,
        item: &FieldItem,
        page_box: PageBox,
        mode: InteractionMode,
        resize: Option<ResizeAnchors>,
    ) -> Result<(), InteractionError> {
        if let Some(session) = &self.active {
            return Err(InteractionError::SessionActive {
                active: session.item_id,
            });
        }
        self.active = Some(InteractionSession {
            item_id: item.id,
            mode,
            page_box,
            base_rect: item.rect(),
            resize,
        });
        tracing::debug!(item = %item.id, ?mode, "interaction session started");
        Ok(())
    }

    /// Update the visual geometry for a pointer move.
    ///
    /// Returns `None` when no session is active or the input is not a move;
    /// stray moves after release are ignored (single-shot detach).
    pub fn pointer_moved(&mut self, input: PointerInput) -> Option<GestureFrame> {
        if input.phase != PointerPhase::Move {
            return None;
        }
        let session = self.active.as_ref()?;
        Some(GestureFrame {
            item_id: session.item_id,
            rect: Self::project(session, input.point()),
        })
    }

    /// Commit the gesture on pointer-up (mouse and touch symmetric).
    ///
    /// Computes the final geometry, ends the session, and returns the single
    /// persistence patch for it.
    pub fn pointer_released(
        &mut self,
        input: PointerInput,
    ) -> Result<GestureCommit, InteractionError> {
        let session = self.active.take().ok_or(InteractionError::NoActiveSession)?;
        let rect = Self::project(&session, input.point());
        let patch = match session.mode {
            InteractionMode::Dragging => ItemPatch::position(to_percent(
                input.point(),
                &session.page_box,
            )),
            InteractionMode::Resizing => ItemPatch::size(rect.width, rect.height),
        };
        tracing::debug!(item = %session.item_id, mode = ?session.mode, "gesture committed");
        Ok(GestureCommit {
            item_id: session.item_id,
            mode: session.mode,
            patch,
            rect,
        })
    }

    /// Abort the active gesture, restoring the base rectangle visually.
    pub fn cancel(&mut self) -> Option<GestureFrame> {
        let session = self.active.take()?;
        tracing::debug!(item = %session.item_id, "interaction session canceled");
        Some(GestureFrame {
            item_id: session.item_id,
            rect: session.base_rect,
        })
    }

    fn project(session: &InteractionSession, point: PointerPoint) -> PercentRect {
        match (session.mode, session.resize) {
            (InteractionMode::Resizing, Some(anchors)) => session.base_rect.sized(
                resize_to_percent(point, anchors.footprint, anchors.item_origin, &session.page_box),
            ),
            _ => session
                .base_rect
                .at(to_percent(point, &session.page_box)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_core::{FieldTypeId, RoleId};
    use pretty_assertions::assert_eq;

    fn item(id: u64) -> FieldItem {
        FieldItem {
            id: ItemId(id),
            page: 1,
            position_x: 10.0,
            position_y: 12.5,
            width: 20.0,
            height: 1.5,
            field_type: FieldTypeId(1),
            role: RoleId(1),
            required: false,
            placeholder: String::new(),
            name: String::new(),
        }
    }

    fn page_box(width: f64, height: f64) -> PageBox {
        PageBox::new(0.0, 0.0, width, height).expect("valid page box")
    }

    fn input(x: f64, y: f64, phase: PointerPhase) -> PointerInput {
        PointerInput::new(x, y, phase)
    }

    #[test]
    fn drag_commits_midpoint_position_patch() {
        // Page box 1000x800 at origin; down at (100,100), up at (500,400).
        let mut controller = InteractionController::new();
        controller
            .begin_drag(&item(1), page_box(1000.0, 800.0))
            .expect("drag begins");
        let commit = controller
            .pointer_released(input(500.0, 400.0, PointerPhase::Up))
            .expect("commit");
        assert_eq!(commit.patch.position_x, Some(50.0));
        assert_eq!(commit.patch.position_y, Some(50.0));
        assert_eq!(commit.patch.width, None);
        assert_eq!(commit.patch.height, None);
        assert!(!controller.is_active());
    }

    #[test]
    fn resize_commits_size_patch_with_handle_footprint() {
        let mut controller = InteractionController::new();
        controller
            .begin_resize(
                &item(1),
                page_box(1000.0, 1000.0),
                ResizeAnchors {
                    footprint: HandleFootprint::new(10.0, 10.0),
                    item_origin: PointerPoint::new(100.0, 100.0),
                },
            )
            .expect("resize begins");
        let commit = controller
            .pointer_released(input(300.0, 300.0, PointerPhase::Up))
            .expect("commit");
        assert_eq!(commit.patch.width, Some(21.0));
        assert_eq!(commit.patch.height, Some(21.0));
        assert_eq!(commit.patch.position_x, None);
        // Position is untouched by a resize.
        assert_eq!(commit.rect.x, 10.0);
        assert_eq!(commit.rect.y, 12.5);
    }

    #[test]
    fn only_one_session_may_be_active() {
        let mut controller = InteractionController::new();
        controller
            .begin_drag(&item(1), page_box(1000.0, 800.0))
            .expect("first session");
        assert_eq!(
            controller.begin_drag(&item(2), page_box(1000.0, 800.0)),
            Err(InteractionError::SessionActive { active: ItemId(1) })
        );
        assert_eq!(controller.active_item(), Some(ItemId(1)));
    }

    #[test]
    fn moves_produce_frames_without_committing() {
        let mut controller = InteractionController::new();
        controller
            .begin_drag(&item(1), page_box(1000.0, 800.0))
            .expect("drag begins");
        let frame = controller
            .pointer_moved(input(250.0, 200.0, PointerPhase::Move))
            .expect("frame");
        assert_eq!(frame.rect.x, 25.0);
        assert_eq!(frame.rect.y, 25.0);
        // Size carried from the base rect.
        assert_eq!(frame.rect.width, 20.0);
        assert!(controller.is_active());
    }

    #[test]
    fn moves_after_release_are_ignored() {
        let mut controller = InteractionController::new();
        controller
            .begin_drag(&item(1), page_box(1000.0, 800.0))
            .expect("drag begins");
        controller
            .pointer_released(input(500.0, 400.0, PointerPhase::Up))
            .expect("commit");
        assert_eq!(
            controller.pointer_moved(input(600.0, 600.0, PointerPhase::Move)),
            None
        );
        assert_eq!(
            controller.pointer_released(input(600.0, 600.0, PointerPhase::Up)),
            Err(InteractionError::NoActiveSession)
        );
    }

    #[test]
    fn release_outside_page_clamps_into_bounds() {
        let mut controller = InteractionController::new();
        controller
            .begin_drag(&item(1), page_box(1000.0, 800.0))
            .expect("drag begins");
        let commit = controller
            .pointer_released(input(-50.0, 900.0, PointerPhase::Up))
            .expect("commit");
        assert_eq!(commit.patch.position_x, Some(0.0));
        assert_eq!(commit.patch.position_y, Some(100.0));
    }

    #[test]
    fn cancel_restores_base_rect() {
        let mut controller = InteractionController::new();
        let target = item(1);
        controller
            .begin_drag(&target, page_box(1000.0, 800.0))
            .expect("drag begins");
        let frame = controller.cancel().expect("cancel frame");
        assert_eq!(frame.rect, target.rect());
        assert!(!controller.is_active());
        assert_eq!(controller.cancel(), None);
    }
}
