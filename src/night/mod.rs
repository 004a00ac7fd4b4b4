//! The night-window engine.
//!
//! Raw provider timings flow through four stages:
//!
//! - [`parse`]: `"HH:MM[ annotation]"` + calendar date → anchored instant
//! - [`resolver`]: picks today's or yesterday's timings depending on whether
//!   today's Fajr has passed
//! - [`window`]: Maghrib/Isha/Fajr + convention → last-third window, duration, midpoint
//! - [`projector`]: window + wall clock → PENDING / ACTIVE / ENDED and night progress
//!
//! Anchored instants carry the location's timezone, so comparisons across
//! midnight and DST changes are plain instant comparisons.

pub mod parse;
pub mod projector;
pub mod resolver;
pub mod window;

pub use parse::{AnchoredInstant, parse_time_of_day};
pub use projector::{Countdown, WindowState, progress_ratio, project_state};
pub use resolver::{DayAnchoringResolver, ResolvedNight, ScheduleEntry};
pub use window::{
    Convention, NightWindow, WindowValidation, WindowWarning, compute_window, validate_window,
};
