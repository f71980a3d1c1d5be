#![forbid(unsafe_code)]

//! Percentage coordinate mapping between viewer pixel space and page-relative
//! geometry.
//!
//! Every placed field stores its position and size as percentages of the page
//! bounding box, so the overlay survives zoom and reflow in the embedded
//! viewer. The mapping functions here are the single source of numeric truth
//! for drag, resize, and context-menu anchoring:
//!
//! - [`to_percent`] clamps into the page box on both axes, so a drag released
//!   outside the page lands on the nearest edge.
//! - [`resize_to_percent`] clamps at zero only. The resize handle follows the
//!   pointer minus its own footprint, and a pull past the far page edge may
//!   yield a value above 100. That is the documented source behavior, not
//!   corrected here.
//! - [`menu_anchor_percent`] is the unclamped raw ratio used for menu
//!   anchoring.

use serde::{Deserialize, Serialize};

/// Bounding rectangle of one rendered document page, in viewer pixels.
///
/// This is the coordinate reference frame for all percentage geometry.
/// Construction validates the extents, so the mapping functions can stay
/// infallible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// Build a page box, rejecting non-finite or non-positive extents.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        for (field, value) in [
            ("left", left),
            ("top", top),
            ("width", width),
            ("height", height),
        ] {
            if !value.is_finite() {
                return Err(GeometryError::NonFinite { field, value });
            }
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(GeometryError::DegeneratePageBox { width, height });
        }
        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }
}

/// A pointer position in viewer pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerPoint {
    pub x: f64,
    pub y: f64,
}

impl PointerPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixel footprint of a resize handle.
///
/// Resize geometry follows the pointer plus this footprint so the handle
/// stays visually attached to the pointer rather than to the item edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandleFootprint {
    pub width: f64,
    pub height: f64,
}

impl HandleFootprint {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A page-relative position, both axes in percent of the page box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

/// A page-relative size, both axes in percent of the page box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentSize {
    pub width: f64,
    pub height: f64,
}

/// A page-relative rectangle: position plus size, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Replace the position, keeping the size.
    #[must_use]
    pub const fn at(self, position: PercentPoint) -> Self {
        Self {
            x: position.x,
            y: position.y,
            ..self
        }
    }

    /// Replace the size, keeping the position.
    #[must_use]
    pub const fn sized(self, size: PercentSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            ..self
        }
    }
}

/// Geometry validation errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    /// Page box width or height is zero or negative.
    DegeneratePageBox { width: f64, height: f64 },
    /// A coordinate was NaN or infinite.
    NonFinite { field: &'static str, value: f64 },
}

impl core::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DegeneratePageBox { width, height } => {
                write!(f, "degenerate page box {width}x{height}")
            }
            Self::NonFinite { field, value } => {
                write!(f, "non-finite page box field {field}={value}")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// Map a pointer position to page-relative percent coordinates, clamped into
/// the page box on both axes.
///
/// A pointer left of `page.left` maps to `x = 0`; one right of the page's far
/// edge maps to `x = 100`. Output is therefore always in `[0, 100]`.
#[must_use]
pub fn to_percent(pointer: PointerPoint, page: &PageBox) -> PercentPoint {
    let x = (pointer.x - page.left).clamp(0.0, page.width) * 100.0 / page.width;
    let y = (pointer.y - page.top).clamp(0.0, page.height) * 100.0 / page.height;
    PercentPoint { x, y }
}

/// Compute a resize gesture's resulting size in percent.
///
/// The new extent runs from the item origin to the pointer plus the handle
/// footprint. Clamped at zero only; the width or height may exceed 100 when
/// the pointer is pulled past the far page edge.
#[must_use]
pub fn resize_to_percent(
    pointer: PointerPoint,
    footprint: HandleFootprint,
    item_origin: PointerPoint,
    page: &PageBox,
) -> PercentSize {
    let width = (pointer.x + footprint.width - item_origin.x).max(0.0) * 100.0 / page.width;
    let height = (pointer.y + footprint.height - item_origin.y).max(0.0) * 100.0 / page.height;
    PercentSize { width, height }
}

/// Raw, unclamped percent position used to anchor the context menu.
#[must_use]
pub fn menu_anchor_percent(pointer: PointerPoint, page: &PageBox) -> PercentPoint {
    PercentPoint {
        x: (pointer.x - page.left) * 100.0 / page.width,
        y: (pointer.y - page.top) * 100.0 / page.height,
    }
}
