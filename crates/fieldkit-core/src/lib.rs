#![forbid(unsafe_code)]

//! `fieldkit-core` provides the pure building blocks of the FieldKit
//! placement engine: percentage coordinate mapping, the unified pointer
//! abstraction, the field-item data model, and the adapter registry.
//!
//! Everything here is deterministic and host-agnostic. No module in this
//! crate touches the DOM, the network, or a clock; those concerns live in
//! host adapter crates.

pub mod geometry;
pub mod item;
pub mod pointer;
pub mod registry;

pub use geometry::{
    GeometryError, HandleFootprint, PageBox, PercentPoint, PercentRect, PercentSize, PointerPoint,
    menu_anchor_percent, resize_to_percent, to_percent,
};
pub use item::{
    DEFAULT_FIELD_HEIGHT_PCT, DEFAULT_FIELD_WIDTH_PCT, DocumentContext, DocumentInfo,
    FieldDefinition, FieldItem, FieldTypeId, ItemDraft, ItemError, ItemId, ItemPatch, Role, RoleId,
};
pub use pointer::{PointerButton, PointerInput, PointerPhase, RawPointer, TouchPoint};
pub use registry::{AdapterRegistry, RegisterMode, RegistryError};
