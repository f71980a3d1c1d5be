#![forbid(unsafe_code)]

//! Viewer readiness monitoring.
//!
//! The embedded viewer exposes no load event, so the only way to know the
//! document is actually renderable is to poll its DOM shape through a
//! [`ViewerAdapter`]. The monitor is a small state machine driven by host
//! ticks:
//!
//! ```text
//! NotReady -> Polling -> { Ready | Failed }
//! ```
//!
//! Ready requires rendered pages AND content-end markers in the same check;
//! the transition fires exactly once. After Ready the same tick runs the
//! drift check for the component's lifetime: when the overlay-ready marker
//! has vanished (the viewer silently re-rendered and wiped injected nodes),
//! the monitor asks for a full re-injection.
//!
//! Polling is unbounded by default, matching the source behavior. An
//! embedder may set [`ReadinessConfig::max_polls`] to bound it; the trip is
//! a terminal failure distinct from an unrenderable document.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed poll interval between readiness and drift checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Abstraction over the rendered DOM shape of the embedded viewer.
///
/// Concrete adapters implement this per target viewer; the monitor never
/// sees a DOM.
pub trait ViewerAdapter {
    /// Number of rendered page container elements.
    fn rendered_page_count(&self) -> usize;
    /// Number of per-page content-end marker elements.
    fn content_ready_marker_count(&self) -> usize;
    /// Whether the viewer's error indicator element is present and visible.
    fn error_indicator_visible(&self) -> bool;
    /// Whether the engine's overlay-ready marker survived in the DOM.
    fn overlay_ready_marker_present(&self) -> bool;
}

/// Monitor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReadinessState {
    NotReady,
    Polling { polls: u32 },
    Ready,
    Failed,
}

/// Effect of one tick, applied by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ReadinessEffect {
    /// Not ready yet; schedule another poll in [`POLL_INTERVAL`].
    ScheduleNext,
    /// Pages and content markers both present; run the initial injection and
    /// keep ticking for drift checks.
    BecameReady,
    /// Drift check found the overlay marker intact; keep ticking.
    OverlayIntact,
    /// Drift check found the overlay marker gone; re-run full injection and
    /// keep ticking.
    DriftDetected,
    /// Terminal failure; surface a blocking alert and stop ticking.
    Failed { message: String },
    /// Tick received after a terminal failure; nothing to do.
    Halted,
}

/// Monitor tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessConfig {
    /// Upper bound on readiness polls before giving up. `None` reproduces
    /// the source behavior of polling forever.
    pub max_polls: Option<u32>,
}

/// Polling state machine detecting when the externally rendered document is
/// usable, and afterwards whether injected overlay nodes survived.
#[derive(Debug, Clone)]
pub struct ReadinessMonitor {
    state: ReadinessState,
    config: ReadinessConfig,
}

impl Default for ReadinessMonitor {
    fn default() -> Self {
        Self::new(ReadinessConfig::default())
    }
}

impl ReadinessMonitor {
    #[must_use]
    pub const fn new(config: ReadinessConfig) -> Self {
        Self {
            state: ReadinessState::NotReady,
            config,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ReadinessState {
        self.state
    }

    /// Whether the Ready transition has already fired.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, ReadinessState::Ready)
    }

    /// Run one poll against the viewer and report the resulting effect.
    pub fn tick(&mut self, viewer: &dyn ViewerAdapter) -> ReadinessEffect {
        match self.state {
            ReadinessState::Failed => ReadinessEffect::Halted,
            ReadinessState::Ready => {
                if viewer.overlay_ready_marker_present() {
                    ReadinessEffect::OverlayIntact
                } else {
                    tracing::warn!("overlay marker missing, viewer re-rendered; re-injecting");
                    ReadinessEffect::DriftDetected
                }
            }
            ReadinessState::NotReady | ReadinessState::Polling { .. } => self.poll(viewer),
        }
    }

    fn poll(&mut self, viewer: &dyn ViewerAdapter) -> ReadinessEffect {
        if viewer.error_indicator_visible() {
            self.state = ReadinessState::Failed;
            tracing::warn!("viewer error indicator visible; document unrenderable");
            return ReadinessEffect::Failed {
                message: "A renderable document is needed to place fields.".to_owned(),
            };
        }

        let pages = viewer.rendered_page_count();
        let markers = viewer.content_ready_marker_count();
        if pages > 0 && markers > 0 {
            self.state = ReadinessState::Ready;
            tracing::debug!(pages, markers, "viewer ready");
            return ReadinessEffect::BecameReady;
        }

        let polls = match self.state {
            ReadinessState::Polling { polls } => polls.saturating_add(1),
            _ => 1,
        };
        if let Some(max) = self.config.max_polls
            && polls >= max
        {
            self.state = ReadinessState::Failed;
            return ReadinessEffect::Failed {
                message: format!("Viewer did not finish rendering after {max} checks."),
            };
        }
        self.state = ReadinessState::Polling { polls };
        ReadinessEffect::ScheduleNext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeViewer {
        pages: usize,
        markers: usize,
        error: bool,
        overlay_marker: bool,
    }

    impl ViewerAdapter for FakeViewer {
        fn rendered_page_count(&self) -> usize {
            self.pages
        }
        fn content_ready_marker_count(&self) -> usize {
            self.markers
        }
        fn error_indicator_visible(&self) -> bool {
            self.error
        }
        fn overlay_ready_marker_present(&self) -> bool {
            self.overlay_marker
        }
    }

    #[test]
    fn zero_pages_never_transitions_to_ready() {
        let mut monitor = ReadinessMonitor::default();
        let viewer = FakeViewer::default();
        for _ in 0..5 {
            assert_eq!(monitor.tick(&viewer), ReadinessEffect::ScheduleNext);
        }
        assert!(!monitor.is_ready());
    }

    #[test]
    fn pages_without_content_markers_keeps_polling() {
        let mut monitor = ReadinessMonitor::default();
        let viewer = FakeViewer {
            pages: 3,
            ..FakeViewer::default()
        };
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::ScheduleNext);
        assert!(!monitor.is_ready());
    }

    #[test]
    fn ready_fires_exactly_once() {
        let mut monitor = ReadinessMonitor::default();
        let viewer = FakeViewer {
            pages: 2,
            markers: 2,
            overlay_marker: true,
            ..FakeViewer::default()
        };
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::BecameReady);
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::OverlayIntact);
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::OverlayIntact);
    }

    #[test]
    fn error_indicator_is_terminal() {
        let mut monitor = ReadinessMonitor::default();
        let viewer = FakeViewer {
            error: true,
            ..FakeViewer::default()
        };
        assert!(matches!(
            monitor.tick(&viewer),
            ReadinessEffect::Failed { .. }
        ));
        assert_eq!(monitor.state(), ReadinessState::Failed);
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::Halted);
    }

    #[test]
    fn drift_detected_when_overlay_marker_vanishes() {
        let mut monitor = ReadinessMonitor::default();
        let mut viewer = FakeViewer {
            pages: 1,
            markers: 1,
            overlay_marker: true,
            ..FakeViewer::default()
        };
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::BecameReady);
        viewer.overlay_marker = false;
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::DriftDetected);
        viewer.overlay_marker = true;
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::OverlayIntact);
    }

    #[test]
    fn poll_budget_trips_into_failure() {
        let mut monitor = ReadinessMonitor::new(ReadinessConfig { max_polls: Some(3) });
        let viewer = FakeViewer::default();
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::ScheduleNext);
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::ScheduleNext);
        assert!(matches!(
            monitor.tick(&viewer),
            ReadinessEffect::Failed { .. }
        ));
        assert_eq!(monitor.tick(&viewer), ReadinessEffect::Halted);
    }
}
