#![forbid(unsafe_code)]

//! Field-item data model.
//!
//! The canonical copy of every [`FieldItem`] is owned by the backend; the
//! engine holds a cache keyed by [`ItemId`] and mirrors backend responses
//! into it. Geometry fields are percentages of the page box (see
//! [`crate::geometry`]).

use serde::{Deserialize, Serialize};

use crate::geometry::{PercentPoint, PercentRect};

/// Backend-assigned identifier of one placed field item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Identifier of a field definition (signature, initials, text, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTypeId(pub u32);

/// Identifier of a signer role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u32);

/// Default width of a newly created field, in percent of the page box.
pub const DEFAULT_FIELD_WIDTH_PCT: f64 = 20.0;
/// Default height of a newly created field, in percent of the page box.
pub const DEFAULT_FIELD_HEIGHT_PCT: f64 = 1.5;

/// A placed, persisted field marker with position, size, and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldItem {
    pub id: ItemId,
    /// 1-indexed page number.
    pub page: u32,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
    pub field_type: FieldTypeId,
    pub role: RoleId,
    pub required: bool,
    #[serde(default)]
    pub placeholder: String,
    /// Display name of the assigned field definition.
    #[serde(default)]
    pub name: String,
}

impl FieldItem {
    /// Check structural invariants on a backend-provided item.
    pub fn validate(&self) -> Result<(), ItemError> {
        if self.page == 0 {
            return Err(ItemError::ZeroPage { id: self.id });
        }
        for (field, value) in [
            ("position_x", self.position_x),
            ("position_y", self.position_y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !value.is_finite() {
                return Err(ItemError::NonFiniteGeometry {
                    id: self.id,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Clamp the position into `[0, 100]` on both axes.
    pub fn clamp_position(&mut self) {
        self.position_x = self.position_x.clamp(0.0, 100.0);
        self.position_y = self.position_y.clamp(0.0, 100.0);
    }

    /// The item's percent rectangle on its page.
    #[must_use]
    pub const fn rect(&self) -> PercentRect {
        PercentRect::new(self.position_x, self.position_y, self.width, self.height)
    }
}

/// Item validation errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemError {
    /// Pages are 1-indexed; page 0 cannot host an overlay node.
    ZeroPage { id: ItemId },
    NonFiniteGeometry {
        id: ItemId,
        field: &'static str,
        value: f64,
    },
}

impl core::fmt::Display for ItemError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroPage { id } => write!(f, "{id} has page 0 (pages are 1-indexed)"),
            Self::NonFiniteGeometry { id, field, value } => {
                write!(f, "{id} has non-finite {field}={value}")
            }
        }
    }
}

impl std::error::Error for ItemError {}

/// Creation payload for a new field item; the backend assigns the id and
/// returns the canonical [`FieldItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub field_type: FieldTypeId,
    pub page: u32,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ItemDraft {
    /// Draft a field of the default size at a menu anchor position.
    #[must_use]
    pub const fn at(field_type: FieldTypeId, page: u32, anchor: PercentPoint) -> Self {
        Self {
            field_type,
            page,
            position_x: anchor.x,
            position_y: anchor.y,
            width: DEFAULT_FIELD_WIDTH_PCT,
            height: DEFAULT_FIELD_HEIGHT_PCT,
        }
    }
}

/// Partial update payload for an existing item.
///
/// A drag commit carries position fields only, a resize commit size fields
/// only, and a dialog save the metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl ItemPatch {
    /// Position-only patch (drag commit).
    #[must_use]
    pub fn position(point: PercentPoint) -> Self {
        Self {
            position_x: Some(point.x),
            position_y: Some(point.y),
            ..Self::default()
        }
    }

    /// Size-only patch (resize commit).
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Metadata patch (edit dialog save).
    #[must_use]
    pub fn metadata(
        field_type: FieldTypeId,
        role: RoleId,
        required: bool,
        placeholder: String,
    ) -> Self {
        Self {
            field_type: Some(field_type),
            role: Some(role),
            required: Some(required),
            placeholder: Some(placeholder),
            ..Self::default()
        }
    }

    /// Apply the patch to a cached item in place.
    pub fn apply_to(&self, item: &mut FieldItem) {
        if let Some(x) = self.position_x {
            item.position_x = x;
        }
        if let Some(y) = self.position_y {
            item.position_y = y;
        }
        if let Some(width) = self.width {
            item.width = width;
        }
        if let Some(height) = self.height {
            item.height = height;
        }
        if let Some(field_type) = self.field_type {
            item.field_type = field_type;
        }
        if let Some(role) = self.role {
            item.role = role;
        }
        if let Some(required) = self.required {
            item.required = required;
        }
        if let Some(placeholder) = &self.placeholder {
            item.placeholder.clone_from(placeholder);
        }
    }
}

/// Identity of the target document, immutable for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentContext {
    /// Authoring mode: a backend resource addressed by model and record id.
    Resource { model: String, resource_id: u64 },
    /// Consumption mode: a token-scoped signer identity.
    Signer { signer_id: u64, access_token: String },
}

impl DocumentContext {
    /// Whether this session can finalize with a sign request.
    #[must_use]
    pub const fn can_sign(&self) -> bool {
        matches!(self, Self::Signer { .. })
    }
}

/// One selectable field definition exposed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldTypeId,
    pub name: String,
}

/// One signer role exposed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// The `get_info` payload: authoritative items plus the selectable
/// definitions and roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub items: Vec<FieldItem>,
    pub field_definitions: Vec<FieldDefinition>,
    pub roles: Vec<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item() -> FieldItem {
        FieldItem {
            id: ItemId(7),
            page: 1,
            position_x: 10.0,
            position_y: 20.0,
            width: 20.0,
            height: 1.5,
            field_type: FieldTypeId(1),
            role: RoleId(1),
            required: false,
            placeholder: String::new(),
            name: "Signature".to_owned(),
        }
    }

    #[test]
    fn draft_uses_default_size() {
        let draft = ItemDraft::at(FieldTypeId(3), 2, PercentPoint { x: 40.0, y: 60.0 });
        assert_eq!(draft.width, DEFAULT_FIELD_WIDTH_PCT);
        assert_eq!(draft.height, DEFAULT_FIELD_HEIGHT_PCT);
        assert_eq!(draft.page, 2);
    }

    #[test]
    fn position_patch_leaves_size_untouched() {
        let mut target = item();
        ItemPatch::position(PercentPoint { x: 50.0, y: 55.0 }).apply_to(&mut target);
        assert_eq!(target.position_x, 50.0);
        assert_eq!(target.position_y, 55.0);
        assert_eq!(target.width, 20.0);
        assert_eq!(target.height, 1.5);
    }

    #[test]
    fn metadata_patch_applies_all_fields() {
        let mut target = item();
        ItemPatch::metadata(FieldTypeId(9), RoleId(4), true, "sign here".to_owned())
            .apply_to(&mut target);
        assert_eq!(target.field_type, FieldTypeId(9));
        assert_eq!(target.role, RoleId(4));
        assert!(target.required);
        assert_eq!(target.placeholder, "sign here");
    }

    #[test]
    fn zero_page_is_rejected() {
        let mut bad = item();
        bad.page = 0;
        assert!(matches!(bad.validate(), Err(ItemError::ZeroPage { .. })));
    }

    #[test]
    fn clamp_position_bounds_both_axes() {
        let mut target = item();
        target.position_x = -3.0;
        target.position_y = 140.0;
        target.clamp_position();
        assert_eq!(target.position_x, 0.0);
        assert_eq!(target.position_y, 100.0);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let json = serde_json::to_value(ItemPatch::size(21.0, 21.0)).expect("serializable patch");
        assert_eq!(json, serde_json::json!({"width": 21.0, "height": 21.0}));
    }
}
