#![forbid(unsafe_code)]

//! `fieldkit-web` provides the browser-facing host layer for FieldKit.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) pushes DOM
//!   snapshots and input events; the engine never touches a DOM.
//! - **Deterministic time**: the host advances a monotonic clock explicitly
//!   and poll deadlines are computed against it.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! This crate intentionally does not bind to `wasm-bindgen`. It provides the
//! building blocks a thin JS wrapper drives: [`WebHost`] owns the engine,
//! the clock, and the poll scheduler; [`ViewerSnapshot`] is the measured DOM
//! shape; [`ViewerProfile`] carries the selectors the wrapper measures with;
//! [`input_parser`] converts JSON-encoded input events into engine calls.

pub mod input_parser;

use core::time::Duration;

use fieldkit_core::{AdapterRegistry, DocumentContext, RegisterMode};
use fieldkit_engine::dialog::DialogSaveError;
use fieldkit_engine::engine::{Engine, HostCommand};
use fieldkit_engine::readiness::ViewerAdapter;
use serde::{Deserialize, Serialize};

use crate::input_parser::HostInput;

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

/// Tracks the single outstanding poll deadline requested by the engine.
///
/// The engine asks for one poll at a time; a new request replaces the
/// previous deadline.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollScheduler {
    due_at: Option<Duration>,
}

impl PollScheduler {
    #[must_use]
    pub const fn new() -> Self {
        Self { due_at: None }
    }

    /// Arm the deadline `after_ms` from the clock's current time.
    pub fn schedule(&mut self, clock: &DeterministicClock, after_ms: u64) {
        self.due_at = Some(clock.now().saturating_add(Duration::from_millis(after_ms)));
    }

    /// Whether a poll is armed and its deadline has passed.
    #[must_use]
    pub fn is_due(&self, clock: &DeterministicClock) -> bool {
        self.due_at.is_some_and(|due| clock.now() >= due)
    }

    /// Disarm and report whether the deadline had passed.
    pub fn take_due(&mut self, clock: &DeterministicClock) -> bool {
        if self.is_due(clock) {
            self.due_at = None;
            true
        } else {
            false
        }
    }
}

/// DOM selectors a JS wrapper measures a specific viewer with.
///
/// The engine only ever sees the resulting [`ViewerSnapshot`]; profiles keep
/// the selector knowledge per target viewer instead of hard-coding it in the
/// wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewerProfile {
    /// Container the overlay assets are injected into.
    pub container_selector: &'static str,
    /// Rendered page container elements.
    pub page_selector: &'static str,
    /// Per-page content-end marker elements.
    pub content_ready_selector: &'static str,
    /// The viewer's own error indicator element.
    pub error_indicator_selector: &'static str,
    /// Class the overlay-ready marker node carries; its survival is the
    /// drift check.
    pub overlay_ready_class: &'static str,
}

/// Selector profile for the stock PDF.js viewer embed.
#[must_use]
pub const fn pdfjs_profile() -> ViewerProfile {
    ViewerProfile {
        container_selector: "#viewerContainer",
        page_selector: ".page",
        content_ready_selector: ".endOfContent",
        error_indicator_selector: "#errorWrapper",
        overlay_ready_class: "fieldkit-overlay-ready",
    }
}

/// Registry pre-loaded with the built-in viewer profiles.
#[must_use]
pub fn builtin_profiles() -> AdapterRegistry<ViewerProfile> {
    let mut registry = AdapterRegistry::new();
    // A fresh registry cannot hold the key yet.
    let _ = registry.register("pdfjs", pdfjs_profile(), RegisterMode::Reject);
    registry
}

/// The measured DOM shape of the viewer at one instant, pushed by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub page_count: usize,
    pub content_ready_markers: usize,
    pub error_visible: bool,
    pub overlay_marker_present: bool,
}

impl ViewerAdapter for ViewerSnapshot {
    fn rendered_page_count(&self) -> usize {
        self.page_count
    }

    fn content_ready_marker_count(&self) -> usize {
        self.content_ready_markers
    }

    fn error_indicator_visible(&self) -> bool {
        self.error_visible
    }

    fn overlay_ready_marker_present(&self) -> bool {
        self.overlay_marker_present
    }
}

/// Failures dispatching a parsed host input into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDispatchError {
    /// The edit-dialog form failed validation; the wrapper surfaces the
    /// message and keeps the dialog open.
    Validation(DialogSaveError),
}

impl core::fmt::Display for HostDispatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Validation(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for HostDispatchError {}

/// Errors encoding a command for the JS boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    Json(String),
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON encode error: {msg}"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encode one host command as the JSON the JS wrapper consumes.
pub fn encode_command(command: &HostCommand) -> Result<String, EncodeError> {
    serde_json::to_string(command).map_err(|e| EncodeError::Json(e.to_string()))
}

/// A minimal, host-driven browser session.
///
/// Intended to be driven by a JS host:
/// - push measured DOM shapes via [`Self::set_snapshot`]
/// - advance time via [`Self::advance`]
/// - feed parsed inputs via [`Self::apply`]
/// - drain and apply effects via [`Self::drain_effects`]
///
/// [`HostCommand::SchedulePoll`] never escapes to the wrapper; the session
/// intercepts it and arms its own [`PollScheduler`], so the wrapper needs no
/// timer plumbing beyond calling [`Self::advance`] on its frame callback.
#[derive(Debug)]
pub struct WebHost {
    engine: Engine,
    clock: DeterministicClock,
    scheduler: PollScheduler,
    snapshot: ViewerSnapshot,
}

impl WebHost {
    #[must_use]
    pub fn new(context: DocumentContext) -> Self {
        Self {
            engine: Engine::new(context),
            clock: DeterministicClock::new(),
            scheduler: PollScheduler::new(),
            snapshot: ViewerSnapshot::default(),
        }
    }

    /// Begin the session: the engine requests the document info and its
    /// first readiness poll.
    pub fn start(&mut self) {
        self.engine.start();
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    pub const fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    #[must_use]
    pub const fn clock(&self) -> &DeterministicClock {
        &self.clock
    }

    /// Replace the last measured DOM shape.
    pub fn set_snapshot(&mut self, snapshot: ViewerSnapshot) {
        self.snapshot = snapshot;
    }

    /// Advance the clock and run a readiness/drift poll if one came due.
    pub fn advance(&mut self, dt: Duration) {
        self.clock.advance(dt);
        if self.scheduler.take_due(&self.clock) {
            tracing::trace!(now_ms = self.clock.now().as_millis() as u64, "poll due");
            let snapshot = self.snapshot;
            self.engine.tick(&snapshot);
        }
    }

    /// Dispatch one parsed host input into the engine.
    pub fn apply(&mut self, input: HostInput) -> Result<(), HostDispatchError> {
        match input {
            HostInput::PointerDown {
                item_id,
                handle,
                pointer,
                page_box,
            } => self
                .engine
                .handle_pointer_down(item_id, handle, &pointer, page_box),
            HostInput::PointerMove { pointer } => self.engine.pointer_moved(&pointer),
            HostInput::PointerUp { pointer } => self.engine.pointer_released(&pointer),
            HostInput::PointerCancel => self.engine.pointer_canceled(),
            HostInput::ContextMenu {
                page,
                pointer,
                page_box,
            } => self.engine.page_context_menu(page, &pointer, page_box),
            HostInput::MenuEntry { field_type } => self.engine.menu_entry_clicked(field_type),
            HostInput::OutsideClick => self.engine.outside_click(),
            HostInput::ItemClick { item_id } => self.engine.item_clicked(item_id),
            HostInput::DialogSave { form } => {
                return self
                    .engine
                    .dialog_save(form)
                    .map_err(HostDispatchError::Validation);
            }
            HostInput::DialogDelete => self.engine.dialog_delete(),
            HostInput::DialogCancel => self.engine.dialog_cancel(),
            HostInput::Sign => self.engine.sign_requested(),
        }
        Ok(())
    }

    /// Drain the engine's command queue for the wrapper to apply, arming the
    /// poll scheduler from any `SchedulePoll` along the way.
    pub fn drain_effects(&mut self) -> Vec<HostCommand> {
        let mut effects = Vec::new();
        while let Some(command) = self.engine.pop_command() {
            if let HostCommand::SchedulePoll { after_ms } = command {
                self.scheduler.schedule(&self.clock, after_ms);
            } else {
                effects.push(command);
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_engine::persist::{PersistenceOutcome, PersistenceRequest, RequestId};
    use pretty_assertions::assert_eq;

    fn ready_snapshot() -> ViewerSnapshot {
        ViewerSnapshot {
            page_count: 1,
            content_ready_markers: 1,
            error_visible: false,
            overlay_marker_present: true,
        }
    }

    #[test]
    fn scheduler_fires_once_per_deadline() {
        let mut clock = DeterministicClock::new();
        let mut scheduler = PollScheduler::new();
        scheduler.schedule(&clock, 1000);
        assert!(!scheduler.is_due(&clock));

        clock.advance(Duration::from_millis(999));
        assert!(!scheduler.take_due(&clock));
        clock.advance(Duration::from_millis(1));
        assert!(scheduler.take_due(&clock));
        // Disarmed until the next schedule call.
        assert!(!scheduler.take_due(&clock));
    }

    #[test]
    fn rescheduling_replaces_the_deadline() {
        let mut clock = DeterministicClock::new();
        let mut scheduler = PollScheduler::new();
        scheduler.schedule(&clock, 100);
        scheduler.schedule(&clock, 1000);
        clock.advance(Duration::from_millis(500));
        assert!(!scheduler.is_due(&clock));
        clock.advance(Duration::from_millis(500));
        assert!(scheduler.is_due(&clock));
    }

    #[test]
    fn builtin_registry_carries_the_pdfjs_profile() {
        let registry = builtin_profiles();
        let profile = registry.get("pdfjs").expect("pdfjs profile");
        assert_eq!(profile.page_selector, ".page");
        assert_eq!(profile.error_indicator_selector, "#errorWrapper");
        assert_eq!(registry.names(), vec!["pdfjs"]);
    }

    #[test]
    fn host_ticks_only_when_a_poll_is_due() {
        let mut host = WebHost::new(DocumentContext::Resource {
            model: "sign.template".to_owned(),
            resource_id: 1,
        });
        host.start();

        // The immediate first poll is intercepted, not surfaced.
        let effects = host.drain_effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            HostCommand::Persist { call } if call.request == PersistenceRequest::FetchInfo
        ));

        host.set_snapshot(ready_snapshot());
        host.advance(Duration::ZERO);
        let effects = host.drain_effects();
        assert_eq!(effects[0], HostCommand::InjectAssets);
        assert_eq!(effects[1], HostCommand::MarkOverlayReady);

        // The follow-up poll was armed 1000ms out; advancing less does
        // nothing, crossing the deadline runs the drift check.
        host.advance(Duration::from_millis(500));
        assert_eq!(host.drain_effects(), Vec::new());
        host.advance(Duration::from_millis(500));
        host.drain_effects();
    }

    #[test]
    fn commands_encode_with_a_stable_tag() {
        let json = encode_command(&HostCommand::SchedulePoll { after_ms: 1000 })
            .expect("encodable command");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value["command"], "schedule_poll");
        assert_eq!(value["after_ms"], 1000);
    }

    #[test]
    fn unknown_resolution_round_trips_through_the_host() {
        let mut host = WebHost::new(DocumentContext::Resource {
            model: "sign.template".to_owned(),
            resource_id: 1,
        });
        host.engine_mut()
            .persistence_resolved(RequestId(404), PersistenceOutcome::Updated);
        assert_eq!(host.drain_effects(), Vec::new());
    }
}
