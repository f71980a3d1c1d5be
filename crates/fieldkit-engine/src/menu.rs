#![forbid(unsafe_code)]

//! Context-menu placement and single-flight field creation.
//!
//! A right-click on a page surface opens exactly one menu, anchored at the
//! pointer's page-relative percent position. A new right-click (or an
//! outside left-click while open) first removes any existing menu. Entry
//! selection is guarded by a creation-in-progress flag: while a create
//! request is in flight every click is ignored, so rapid input cannot
//! produce duplicate items.

use fieldkit_core::{FieldTypeId, ItemDraft, PercentPoint};
use serde::{Deserialize, Serialize};

/// An open context menu: the page it belongs to and its anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextMenu {
    pub page: u32,
    pub anchor: PercentPoint,
}

/// Result of opening a menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuOpened {
    pub menu: ContextMenu,
    /// Whether a previously open menu was dismissed first.
    pub replaced: bool,
}

/// Transient menu state plus the single-flight creation flag.
#[derive(Debug, Clone, Default)]
pub struct MenuController {
    open: Option<ContextMenu>,
    creating: bool,
}

impl MenuController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn open_menu(&self) -> Option<ContextMenu> {
        self.open
    }

    #[must_use]
    pub const fn is_creating(&self) -> bool {
        self.creating
    }

    /// Open a menu at the anchor, dismissing any existing one first.
    pub fn open(&mut self, page: u32, anchor: PercentPoint) -> MenuOpened {
        let replaced = self.open.take().is_some();
        let menu = ContextMenu { page, anchor };
        self.open = Some(menu);
        MenuOpened { menu, replaced }
    }

    /// Handle a click on a menu entry.
    ///
    /// Returns the creation draft when the menu is open and no creation is
    /// in flight; otherwise the click is ignored.
    pub fn entry_clicked(&mut self, field_type: FieldTypeId) -> Option<ItemDraft> {
        if self.creating {
            tracing::debug!("field creation already in flight; click ignored");
            return None;
        }
        let menu = self.open?;
        self.creating = true;
        Some(ItemDraft::at(field_type, menu.page, menu.anchor))
    }

    /// Handle a click outside the menu.
    ///
    /// Dismisses the menu unless a creation is in flight (the menu stays up
    /// until the request resolves). Returns `true` when the menu was closed.
    pub fn outside_click(&mut self) -> bool {
        if self.creating {
            return false;
        }
        self.open.take().is_some()
    }

    /// Resolve the in-flight creation. On success the menu is dismissed; on
    /// failure it stays open so the author can retry by hand.
    pub fn creation_resolved(&mut self, success: bool) {
        self.creating = false;
        if success {
            self.open = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_core::{DEFAULT_FIELD_HEIGHT_PCT, DEFAULT_FIELD_WIDTH_PCT};
    use pretty_assertions::assert_eq;

    fn anchor(x: f64, y: f64) -> PercentPoint {
        PercentPoint { x, y }
    }

    #[test]
    fn opening_twice_replaces_the_first_menu() {
        let mut controller = MenuController::new();
        let first = controller.open(1, anchor(10.0, 20.0));
        assert!(!first.replaced);
        let second = controller.open(2, anchor(30.0, 40.0));
        assert!(second.replaced);
        assert_eq!(controller.open_menu(), Some(second.menu));
    }

    #[test]
    fn entry_click_drafts_a_default_sized_item_at_the_anchor() {
        let mut controller = MenuController::new();
        controller.open(3, anchor(25.0, 75.0));
        let draft = controller
            .entry_clicked(FieldTypeId(7))
            .expect("draft created");
        assert_eq!(draft.page, 3);
        assert_eq!(draft.position_x, 25.0);
        assert_eq!(draft.position_y, 75.0);
        assert_eq!(draft.width, DEFAULT_FIELD_WIDTH_PCT);
        assert_eq!(draft.height, DEFAULT_FIELD_HEIGHT_PCT);
    }

    #[test]
    fn two_selections_before_resolution_yield_one_draft() {
        let mut controller = MenuController::new();
        controller.open(1, anchor(10.0, 10.0));
        assert!(controller.entry_clicked(FieldTypeId(1)).is_some());
        assert_eq!(controller.entry_clicked(FieldTypeId(1)), None);
        assert_eq!(controller.entry_clicked(FieldTypeId(2)), None);
        controller.creation_resolved(true);
        assert_eq!(controller.open_menu(), None);
    }

    #[test]
    fn outside_click_dismisses_unless_creating() {
        let mut controller = MenuController::new();
        controller.open(1, anchor(10.0, 10.0));
        assert!(controller.entry_clicked(FieldTypeId(1)).is_some());
        // Creation in flight: clicks are ignored entirely.
        assert!(!controller.outside_click());
        assert!(controller.open_menu().is_some());
        controller.creation_resolved(false);
        // Failed creation leaves the menu; a later outside click closes it.
        assert!(controller.outside_click());
        assert_eq!(controller.open_menu(), None);
    }

    #[test]
    fn entry_click_without_menu_is_ignored() {
        let mut controller = MenuController::new();
        assert_eq!(controller.entry_clicked(FieldTypeId(1)), None);
        assert!(!controller.is_creating());
    }
}
