#![forbid(unsafe_code)]

//! JSON input parser converting wrapper-encoded browser events into
//! [`HostInput`] values.
//!
//! The JS wrapper serializes each DOM event it captures into a small flat
//! JSON object with a `kind` discriminator; [`parse_encoded_input`] turns it
//! into the semantic input the engine consumes. Kinds without an engine
//! mapping return `Ok(None)` so the wrapper can forward everything it sees
//! without filtering first.

use fieldkit_core::{
    FieldTypeId, HandleFootprint, ItemId, PageBox, PointerButton, PointerPoint, RawPointer, RoleId,
    TouchPoint,
};
use fieldkit_engine::dialog::EditForm;
use fieldkit_engine::engine::HandleKind;
use fieldkit_engine::interaction::ResizeAnchors;
use serde::Deserialize;

/// Errors from parsing encoded input JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
    /// Unknown handle discriminator on a pointer-down.
    UnknownHandle(String),
    /// The enclosing page box was degenerate or non-finite.
    PageBox(String),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownHandle(handle) => write!(f, "unknown handle: {handle}"),
            Self::PageBox(msg) => write!(f, "invalid page box: {msg}"),
        }
    }
}

impl std::error::Error for InputParseError {}

/// One semantic input for the engine, parsed from a wrapper event.
#[derive(Debug, Clone, PartialEq)]
pub enum HostInput {
    PointerDown {
        item_id: ItemId,
        handle: HandleKind,
        pointer: RawPointer,
        page_box: PageBox,
    },
    PointerMove { pointer: RawPointer },
    PointerUp { pointer: RawPointer },
    PointerCancel,
    ContextMenu {
        page: u32,
        pointer: RawPointer,
        page_box: PageBox,
    },
    MenuEntry { field_type: FieldTypeId },
    OutsideClick,
    ItemClick { item_id: ItemId },
    DialogSave { form: EditForm },
    DialogDelete,
    DialogCancel,
    Sign,
}

/// Internal deserialization target matching the wrapper's JSON schema.
#[derive(Debug, Deserialize)]
struct RawInput {
    kind: String,
    #[serde(default)]
    item_id: Option<u64>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    button: Option<i32>,
    #[serde(default)]
    touches: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    page_left: Option<f64>,
    #[serde(default)]
    page_top: Option<f64>,
    #[serde(default)]
    page_width: Option<f64>,
    #[serde(default)]
    page_height: Option<f64>,
    #[serde(default)]
    handle_width: Option<f64>,
    #[serde(default)]
    handle_height: Option<f64>,
    #[serde(default)]
    origin_x: Option<f64>,
    #[serde(default)]
    origin_y: Option<f64>,
    #[serde(default)]
    field_type: Option<u32>,
    #[serde(default)]
    role: Option<u32>,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    placeholder: Option<String>,
}

/// Parse one JSON-encoded wrapper event into a [`HostInput`].
///
/// Returns `Ok(None)` for event kinds with no engine mapping (scroll,
/// keyboard, and anything the wrapper adds later).
///
/// Returns `Err` for malformed JSON or missing required fields.
pub fn parse_encoded_input(json: &str) -> Result<Option<HostInput>, InputParseError> {
    let raw: RawInput =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;

    match raw.kind.as_str() {
        "pointer_down" => parse_pointer_down(&raw).map(Some),
        "pointer_move" => Ok(Some(HostInput::PointerMove {
            pointer: parse_pointer(&raw)?,
        })),
        "pointer_up" => Ok(Some(HostInput::PointerUp {
            pointer: parse_pointer(&raw)?,
        })),
        "pointer_cancel" => Ok(Some(HostInput::PointerCancel)),
        "context_menu" => parse_context_menu(&raw).map(Some),
        "menu_entry" => Ok(Some(HostInput::MenuEntry {
            field_type: FieldTypeId(require(raw.field_type, "field_type")?),
        })),
        "outside_click" => Ok(Some(HostInput::OutsideClick)),
        "item_click" => Ok(Some(HostInput::ItemClick {
            item_id: ItemId(require(raw.item_id, "item_id")?),
        })),
        "dialog_save" => Ok(Some(HostInput::DialogSave {
            form: EditForm {
                field_type: raw.field_type.map(FieldTypeId),
                role: raw.role.map(RoleId),
                required: raw.required.unwrap_or(false),
                placeholder: raw.placeholder.clone().unwrap_or_default(),
            },
        })),
        "dialog_delete" => Ok(Some(HostInput::DialogDelete)),
        "dialog_cancel" => Ok(Some(HostInput::DialogCancel)),
        "sign" => Ok(Some(HostInput::Sign)),
        _ => Ok(None),
    }
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, InputParseError> {
    value.ok_or(InputParseError::MissingField(field))
}

fn parse_pointer(raw: &RawInput) -> Result<RawPointer, InputParseError> {
    if let Some(touches) = &raw.touches {
        return Ok(RawPointer::Touch {
            changed: touches
                .iter()
                .map(|&[x, y]| TouchPoint { x, y })
                .collect(),
        });
    }
    Ok(RawPointer::Mouse {
        x: require(raw.x, "x")?,
        y: require(raw.y, "y")?,
        button: parse_button(raw.button),
    })
}

fn parse_button(button: Option<i32>) -> PointerButton {
    // DOM MouseEvent.button numbering.
    match button {
        Some(1) => PointerButton::Middle,
        Some(2) => PointerButton::Secondary,
        _ => PointerButton::Primary,
    }
}

fn parse_page_box(raw: &RawInput) -> Result<PageBox, InputParseError> {
    PageBox::new(
        require(raw.page_left, "page_left")?,
        require(raw.page_top, "page_top")?,
        require(raw.page_width, "page_width")?,
        require(raw.page_height, "page_height")?,
    )
    .map_err(|e| InputParseError::PageBox(e.to_string()))
}

fn parse_handle(raw: &RawInput) -> Result<HandleKind, InputParseError> {
    let handle = require(raw.handle.as_deref(), "handle")?;
    match handle {
        "drag" => Ok(HandleKind::Drag),
        "resize" => Ok(HandleKind::Resize {
            anchors: ResizeAnchors {
                footprint: HandleFootprint::new(
                    require(raw.handle_width, "handle_width")?,
                    require(raw.handle_height, "handle_height")?,
                ),
                item_origin: PointerPoint::new(
                    require(raw.origin_x, "origin_x")?,
                    require(raw.origin_y, "origin_y")?,
                ),
            },
        }),
        other => Err(InputParseError::UnknownHandle(other.to_owned())),
    }
}

fn parse_pointer_down(raw: &RawInput) -> Result<HostInput, InputParseError> {
    Ok(HostInput::PointerDown {
        item_id: ItemId(require(raw.item_id, "item_id")?),
        handle: parse_handle(raw)?,
        pointer: parse_pointer(raw)?,
        page_box: parse_page_box(raw)?,
    })
}

fn parse_context_menu(raw: &RawInput) -> Result<HostInput, InputParseError> {
    Ok(HostInput::ContextMenu {
        page: require(raw.page, "page")?,
        pointer: parse_pointer(raw)?,
        page_box: parse_page_box(raw)?,
    })
}
