//! Live display state derived from a window and the wall clock.
//!
//! Both projections are re-derived from scratch on every tick. Nothing carries
//! over between ticks, so a missed tick corrects itself on the next one.

use serde::Serialize;

use super::parse::AnchoredInstant;
use super::window::NightWindow;

/// Whole hours, minutes and seconds until the window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    fn from_millis(total_ms: i64) -> Self {
        Self {
            hours: total_ms / 3_600_000,
            minutes: (total_ms % 3_600_000) / 60_000,
            seconds: (total_ms % 60_000) / 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum WindowState {
    Pending { countdown: Countdown },
    Active,
    Ended,
}

impl WindowState {
    pub fn name(&self) -> &'static str {
        match self {
            WindowState::Pending { .. } => "PENDING",
            WindowState::Active => "ACTIVE",
            WindowState::Ended => "ENDED",
        }
    }

    /// Same state ignoring the countdown value.
    pub fn same_phase(&self, other: &WindowState) -> bool {
        self.name() == other.name()
    }
}

/// State of the last-third window at `now`.
pub fn project_state(window: &NightWindow, now: AnchoredInstant) -> WindowState {
    if now >= window.end {
        WindowState::Ended
    } else if now >= window.start {
        WindowState::Active
    } else {
        WindowState::Pending {
            countdown: Countdown::from_millis((window.start - now).num_milliseconds()),
        }
    }
}

/// Elapsed fraction of the whole night (night start → Fajr), clamped to `[0, 1]`.
///
/// This spans the full night, not the last third the state machine uses.
pub fn progress_ratio(window: &NightWindow, now: AnchoredInstant) -> f64 {
    if now <= window.night_start {
        return 0.0;
    }
    if now >= window.end {
        return 1.0;
    }

    let total = (window.end - window.night_start).num_milliseconds() as f64;
    let elapsed = (now - window.night_start).num_milliseconds() as f64;
    (elapsed / total).clamp(0.0, 1.0)
}
