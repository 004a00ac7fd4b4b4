//! Cooperative scheduler for the watch loop.
//!
//! Periodic tasks reschedule from the instant they ran, so a loop that was
//! suspended or starved fires each task once when it wakes rather than once
//! per missed period. One-shot deadlines fire once and are removed.

use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Redraw the countdown and window state
    Countdown,
    /// Recompute night progress and evict unused cache entries
    Progress,
    /// Retry a failed fetch after backoff
    Retry,
}

#[derive(Debug)]
struct Periodic {
    task: Task,
    interval: ChronoDuration,
    next: DateTime<Local>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    periodic: Vec<Periodic>,
    deadlines: Vec<(Task, DateTime<Local>)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `interval`, starting at `now`.
    pub fn every(&mut self, task: Task, interval: Duration, now: DateTime<Local>) {
        let interval = ChronoDuration::from_std(interval).unwrap_or(ChronoDuration::MAX);
        self.periodic.retain(|p| p.task != task);
        self.periodic.push(Periodic {
            task,
            interval,
            next: now,
        });
    }

    /// Run `task` once at `when`, replacing any pending deadline for it.
    pub fn at(&mut self, task: Task, when: DateTime<Local>) {
        self.deadlines.retain(|(t, _)| *t != task);
        self.deadlines.push((task, when));
    }

    pub fn cancel(&mut self, task: Task) {
        self.periodic.retain(|p| p.task != task);
        self.deadlines.retain(|(t, _)| *t != task);
    }

    pub fn cancel_all(&mut self) {
        self.periodic.clear();
        self.deadlines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.periodic.is_empty() && self.deadlines.is_empty()
    }

    pub fn is_scheduled(&self, task: Task) -> bool {
        self.periodic.iter().any(|p| p.task == task) || self.deadlines.iter().any(|(t, _)| *t == task)
    }

    /// Tasks due at `now`. Periodic tasks move to `now + interval`.
    pub fn due(&mut self, now: DateTime<Local>) -> Vec<Task> {
        let mut due = Vec::new();

        for periodic in &mut self.periodic {
            if periodic.next <= now {
                due.push(periodic.task);
                periodic.next = now + periodic.interval;
            }
        }

        self.deadlines.retain(|(task, when)| {
            if *when <= now {
                due.push(*task);
                false
            } else {
                true
            }
        });

        due
    }

    pub fn next_deadline(&self) -> Option<DateTime<Local>> {
        self.periodic
            .iter()
            .map(|p| p.next)
            .chain(self.deadlines.iter().map(|(_, when)| *when))
            .min()
    }

    /// Wall time until the next task is due; zero when one is already due.
    pub fn time_until_next(&self, now: DateTime<Local>) -> Option<Duration> {
        self.next_deadline()
            .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO))
    }
}
