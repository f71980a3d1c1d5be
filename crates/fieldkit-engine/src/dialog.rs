#![forbid(unsafe_code)]

//! Modal metadata editing for an existing field item.
//!
//! The dialog snapshots the item's current values into an [`EditForm`]; on
//! save the form is validated (missing required selections block submission)
//! and turned into a metadata patch. Delete goes through the same controller
//! so only one dialog operation can be pending at a time.

use fieldkit_core::{FieldItem, FieldTypeId, ItemId, ItemPatch, RoleId};
use serde::{Deserialize, Serialize};

/// Editable metadata of one field item as presented by the dialog form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditForm {
    pub field_type: Option<FieldTypeId>,
    pub role: Option<RoleId>,
    pub required: bool,
    #[serde(default)]
    pub placeholder: String,
}

impl EditForm {
    /// Pre-fill the form from the cached item.
    #[must_use]
    pub fn from_item(item: &FieldItem) -> Self {
        Self {
            field_type: Some(item.field_type),
            role: Some(item.role),
            required: item.required,
            placeholder: item.placeholder.clone(),
        }
    }

    /// Validate selections and build the metadata patch.
    pub fn into_patch(self) -> Result<ItemPatch, ValidationError> {
        let field_type = self.field_type.ok_or(ValidationError::MissingFieldType)?;
        let role = self.role.ok_or(ValidationError::MissingRole)?;
        Ok(ItemPatch::metadata(
            field_type,
            role,
            self.required,
            self.placeholder,
        ))
    }
}

/// Form validation failures; these block submission at the dialog layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingFieldType,
    MissingRole,
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingFieldType => write!(f, "a field type must be selected"),
            Self::MissingRole => write!(f, "a role must be selected"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Dialog lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogError {
    NotOpen,
    /// A save or delete for this dialog is already in flight.
    OperationPending,
}

impl core::fmt::Display for DialogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotOpen => write!(f, "no edit dialog is open"),
            Self::OperationPending => write!(f, "a dialog operation is already pending"),
        }
    }
}

impl std::error::Error for DialogError {}

/// Tracks which item the dialog edits and whether an operation is pending.
#[derive(Debug, Clone, Default)]
pub struct DialogController {
    open: Option<ItemId>,
    pending: bool,
}

impl DialogController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn open_item(&self) -> Option<ItemId> {
        self.open
    }

    /// Open the dialog for `item`, returning the pre-filled form.
    pub fn open(&mut self, item: &FieldItem) -> EditForm {
        self.open = Some(item.id);
        self.pending = false;
        EditForm::from_item(item)
    }

    /// Validate the form and stage the save; the caller persists the patch.
    pub fn save(&mut self, form: EditForm) -> Result<(ItemId, ItemPatch), DialogSaveError> {
        let item_id = self.target()?;
        let patch = form.into_patch().map_err(DialogSaveError::Validation)?;
        self.pending = true;
        Ok((item_id, patch))
    }

    /// Stage the delete; the caller persists it.
    pub fn delete(&mut self) -> Result<ItemId, DialogError> {
        let item_id = self.target()?;
        self.pending = true;
        Ok(item_id)
    }

    fn target(&self) -> Result<ItemId, DialogError> {
        if self.pending {
            return Err(DialogError::OperationPending);
        }
        self.open.ok_or(DialogError::NotOpen)
    }

    /// Close without persisting.
    pub fn cancel(&mut self) -> bool {
        self.pending = false;
        self.open.take().is_some()
    }

    /// The staged operation resolved; close on success, re-enable the form
    /// on failure.
    pub fn operation_resolved(&mut self, success: bool) {
        self.pending = false;
        if success {
            self.open = None;
        }
    }
}

/// Errors from staging a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogSaveError {
    Dialog(DialogError),
    Validation(ValidationError),
}

impl From<DialogError> for DialogSaveError {
    fn from(err: DialogError) -> Self {
        Self::Dialog(err)
    }
}

impl core::fmt::Display for DialogSaveError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dialog(err) => err.fmt(f),
            Self::Validation(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DialogSaveError {}
