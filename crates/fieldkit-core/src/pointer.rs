#![forbid(unsafe_code)]

//! Unified pointer abstraction over mouse and touch input.
//!
//! The engine never branches on input device. Host adapters normalize a raw
//! mouse event or the first changed touch point into one [`PointerInput`]
//! carrying `{x, y, phase}` before it reaches any state machine.

use serde::{Deserialize, Serialize};

use crate::geometry::PointerPoint;

/// Lifecycle phase of one pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Pointer button for interaction events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Device-neutral pointer input in viewer pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub x: f64,
    pub y: f64,
    pub phase: PointerPhase,
}

impl PointerInput {
    #[must_use]
    pub const fn new(x: f64, y: f64, phase: PointerPhase) -> Self {
        Self { x, y, phase }
    }

    /// The input position as a geometry point.
    #[must_use]
    pub const fn point(&self) -> PointerPoint {
        PointerPoint::new(self.x, self.y)
    }
}

/// One touch contact point as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

/// Raw device event as delivered by a host adapter, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "device", rename_all = "snake_case")]
pub enum RawPointer {
    Mouse {
        x: f64,
        y: f64,
        button: PointerButton,
    },
    /// Touch lifecycle events carry the changed contact points; the first one
    /// drives the gesture.
    Touch { changed: Vec<TouchPoint> },
}

impl RawPointer {
    /// Normalize into a device-neutral input for the given phase.
    ///
    /// Returns `None` for a touch event without changed contact points.
    #[must_use]
    pub fn normalize(&self, phase: PointerPhase) -> Option<PointerInput> {
        match self {
            Self::Mouse { x, y, .. } => Some(PointerInput::new(*x, *y, phase)),
            Self::Touch { changed } => changed
                .first()
                .map(|touch| PointerInput::new(touch.x, touch.y, phase)),
        }
    }

    /// Effective button. Touch contacts act as the primary button.
    #[must_use]
    pub fn button(&self) -> PointerButton {
        match self {
            Self::Mouse { button, .. } => *button,
            Self::Touch { .. } => PointerButton::Primary,
        }
    }
}
