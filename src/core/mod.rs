//! The live watch loop.
//!
//! `Core` ties the pieces together: settings decide the fetch key, the fetch
//! cache decides when to hit the provider, the resolver and calculator turn
//! the cached timings into tonight's window, and the projector turns the
//! window plus the clock into what the user sees.
//!
//! The loop is single threaded. Fetches run on short-lived worker threads that
//! report back over the same channel as signals and settings reloads, so all
//! state changes happen here, in order.

pub mod status;

use anyhow::Result;
use chrono::{DateTime, Local};
use chrono_tz::Tz;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use crate::config::{self, SettingsStore};
use crate::constants::{COUNTDOWN_INTERVAL, PROGRESS_INTERVAL};
use crate::display::{format_duration, format_time, status_line};
use crate::error::QiyamError;
use crate::logger::Log;
use crate::night::{NightWindow, WindowState, progress_ratio, project_state, validate_window};
use crate::provider::fetch::{
    CompletionOutcome, FetchAction, FetchCache, FetchCompletion, FetchKey, FetchState, run_fetch,
};
use crate::provider::{TimingsProvider, geocoding::coordinate_label};
use crate::scheduler::{Scheduler, Task};
use crate::signals::{LoopMessage, SignalState};
use status::StatusLine;

/// Everything a [`Core`] needs to run.
pub struct CoreParams {
    pub provider: Arc<dyn TimingsProvider>,
    pub store: SettingsStore,
    pub signal_state: SignalState,
    pub debug_enabled: bool,
}

/// What happened during a run, for the caller's final message and for tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WatchReport {
    /// Window phases in the order they were entered
    pub phases: Vec<&'static str>,
    pub fetches_started: u32,
    pub fetches_stored: u32,
    pub discarded: u32,
    pub last_error: Option<QiyamError>,
}

pub struct Core {
    provider: Arc<dyn TimingsProvider>,
    store: SettingsStore,
    signal_state: SignalState,
    debug_enabled: bool,
    tz: Tz,
    cache: FetchCache,
    scheduler: Scheduler,
    status: StatusLine,
    window: Option<NightWindow>,
    phase: Option<WindowState>,
    progress: f64,
    report: WatchReport,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        let tz = params.store.get().timezone();
        Self {
            provider: params.provider,
            store: params.store,
            signal_state: params.signal_state,
            debug_enabled: params.debug_enabled,
            tz,
            cache: FetchCache::new(),
            scheduler: Scheduler::new(),
            status: StatusLine::for_terminal(),
            window: None,
            phase: None,
            progress: 0.0,
            report: WatchReport::default(),
        }
    }

    /// Run until shutdown or, under a simulated clock, until the simulation ends.
    pub fn execute(mut self) -> Result<WatchReport> {
        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!("Base directory: {}", custom_dir.display());
        }
        self.store.get().log_settings();
        log_indented!("Timezone: {}", self.tz.name());
        Log::set_location_timezone(self.tz);

        let now = crate::time_source::now();
        self.scheduler.every(Task::Countdown, COUNTDOWN_INTERVAL, now);
        self.scheduler.every(Task::Progress, PROGRESS_INTERVAL, now);
        self.cache.select(self.store.get().fetch_key(), now);
        self.request_fetch(now);

        let result = self.main_loop();

        self.scheduler.cancel_all();
        self.status.clear();
        if let Err(e) = &result {
            log_pipe!();
            log_error!("Watch loop failed: {e}");
        }
        log_block_start!("Stopped watching");
        log_end!();

        result.map(|_| self.report)
    }

    fn main_loop(&mut self) -> Result<()> {
        while self.signal_state.is_running() && !crate::time_source::simulation_ended() {
            let now = crate::time_source::now();
            for task in self.scheduler.due(now) {
                self.run_task(task, now);
            }

            let wait = self
                .scheduler
                .time_until_next(now)
                .unwrap_or(COUNTDOWN_INTERVAL);

            match self.wait_for_message(wait) {
                Ok(LoopMessage::FetchCompleted(completion)) => {
                    self.handle_completion(completion, crate::time_source::now());
                }
                Ok(LoopMessage::SettingsChanged) => {
                    self.handle_settings_change(crate::time_source::now());
                }
                Ok(LoopMessage::Shutdown) => self.signal_state.stop(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    anyhow::bail!("message channel disconnected")
                }
            }
        }
        Ok(())
    }

    /// Block until a message arrives or `wait` has passed on the active clock.
    fn wait_for_message(&self, wait: Duration) -> Result<LoopMessage, RecvTimeoutError> {
        if !crate::time_source::is_simulated() {
            return self.signal_state.receiver.recv_timeout(wait);
        }

        // The simulated clock must not run ahead of a fetch the loop is waiting on
        if matches!(self.cache.state(), Some(FetchState::InFlight { .. })) {
            return self
                .signal_state
                .receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected);
        }

        match self.signal_state.receiver.try_recv() {
            Ok(message) => Ok(message),
            Err(_) => {
                crate::time_source::sleep(wait);
                Err(RecvTimeoutError::Timeout)
            }
        }
    }

    fn run_task(&mut self, task: Task, now: DateTime<Local>) {
        match task {
            Task::Countdown => self.tick(now),
            Task::Progress => {
                self.update_progress(now);
                let evicted = self.cache.evict(now);
                if evicted > 0 {
                    log_debug!("Evicted {} unused cache entries", evicted);
                }
            }
            Task::Retry => self.request_fetch(now),
        }
    }

    /// Start a fetch if the cache wants one, or arm the retry deadline.
    fn request_fetch(&mut self, now: DateTime<Local>) {
        match self.cache.next_action(now) {
            FetchAction::Start {
                generation,
                attempt,
            } => {
                if let Some(key) = self.cache.current() {
                    self.spawn_fetch(key, generation, attempt, now);
                }
            }
            FetchAction::WaitUntil(at) => self.scheduler.at(Task::Retry, at),
            FetchAction::None => {}
        }
    }

    fn spawn_fetch(&mut self, key: FetchKey, generation: u64, attempt: u32, now: DateTime<Local>) {
        log_debug!(
            "Fetching prayer times for {} (method {}, attempt {}, generation {})",
            coordinate_label(key.latitude(), key.longitude()),
            key.method_id,
            attempt + 1,
            generation
        );
        self.report.fetches_started += 1;

        let provider = Arc::clone(&self.provider);
        let sender = self.signal_state.sender.clone();
        let tz = self.tz;
        thread::spawn(move || {
            let result = run_fetch(provider.as_ref(), key, tz, now);
            let _ = sender.send(LoopMessage::FetchCompleted(FetchCompletion {
                key,
                generation,
                result,
            }));
        });
    }

    fn handle_completion(&mut self, completion: FetchCompletion, now: DateTime<Local>) {
        let generation = completion.generation;
        match self.cache.complete(completion, now) {
            CompletionOutcome::Stored => {
                self.report.fetches_stored += 1;
                self.report.last_error = None;
                self.load_window(now);
            }
            CompletionOutcome::RetryAt(at) => {
                log_debug!(
                    "Fetch failed, retrying at {}",
                    at.with_timezone(&self.tz).format("%H:%M:%S")
                );
                self.scheduler.at(Task::Retry, at);
            }
            CompletionOutcome::GaveUp(error) => {
                self.status.clear();
                log_pipe!();
                log_error!("{}", error.user_message());
                log_indented!("{}", error);
                if self.cache.cached().is_some() {
                    log_indented!("Showing the last loaded times");
                }
                self.report.last_error = Some(error);
            }
            CompletionOutcome::Discarded => {
                self.report.discarded += 1;
                log_debug!("Discarded stale response (generation {})", generation);
            }
        }
    }

    /// Recompute the window from cached timings and log it.
    fn load_window(&mut self, now: DateTime<Local>) {
        let convention = self.store.get().convention;
        let Some(cached) = self.cache.cached() else {
            return;
        };

        match cached.night.window(convention) {
            Ok(window) => {
                self.status.clear();
                self.log_window(&window, cached.night.timings.method_name.as_deref());
                self.window = Some(window);
                self.update_progress(now);
                self.tick(now);
            }
            Err(error) => {
                self.status.clear();
                log_pipe!();
                log_error!("{}", error.user_message());
                log_indented!("{}", error);
                self.window = None;
                self.report.last_error = Some(error);
            }
        }
    }

    fn log_window(&self, window: &NightWindow, method_name: Option<&str>) {
        let format = self.store.get().time_format;
        log_block_start!("Qiyam window for {}", self.store.get().location_label());
        log_indented!("Starts: {}", format_time(&window.start, format));
        log_indented!("Ends (Fajr): {}", format_time(&window.end, format));
        log_indented!(
            "Night Duration: {} (from {})",
            format_duration(window.night_duration_minutes),
            window.convention.night_start_label()
        );
        log_indented!(
            "Middle of Night: {}",
            format_time(&window.middle_of_night, format)
        );
        if let Some(name) = method_name {
            log_indented!("Method: {}", name);
        }

        let validation = validate_window(window);
        if let Some(warning) = validation.warning {
            log_pipe!();
            log_warning!("{}", warning);
        }
    }

    fn update_progress(&mut self, now: DateTime<Local>) {
        if let Some(window) = &self.window {
            self.progress = progress_ratio(window, now.with_timezone(&self.tz));
        }
    }

    /// One-second tick: project the state, log phase changes, redraw the status line.
    fn tick(&mut self, now: DateTime<Local>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let state = project_state(&window, now.with_timezone(&self.tz));

        let changed = self.phase.is_none_or(|previous| !previous.same_phase(&state));
        if changed {
            self.status.clear();
            self.log_phase(&window, &state);
            self.report.phases.push(state.name());
            self.phase = Some(state);
        }

        if state == WindowState::Ended && self.needs_next_night(&window) {
            log_debug!("Window ended, loading the next night");
            self.cache.invalidate();
            self.request_fetch(now);
        }

        let format = self.store.get().time_format;
        self.status
            .draw(&status_line(&window, &state, self.progress, format));
    }

    /// Only refetch once per ended night: data fetched after Fajr already describes the next one.
    fn needs_next_night(&self, window: &NightWindow) -> bool {
        matches!(self.cache.state(), Some(FetchState::Success { .. }))
            && self
                .cache
                .cached()
                .is_some_and(|cached| cached.fetched_at < window.end)
    }

    fn log_phase(&self, window: &NightWindow, state: &WindowState) {
        let format = self.store.get().time_format;
        match state {
            WindowState::Pending { .. } => {
                log_block_start!(
                    "Waiting for the last third of the night ({})",
                    format_time(&window.start, format)
                );
            }
            WindowState::Active => {
                log_block_start!("The last third of the night has begun");
                log_indented!("Fajr at {}", format_time(&window.end, format));
            }
            WindowState::Ended => {
                log_block_start!("Fajr has arrived, tonight's window has ended");
            }
        }
    }

    fn handle_settings_change(&mut self, now: DateTime<Local>) {
        let changed = match self.store.reload() {
            Ok(changed) => changed,
            Err(e) => {
                self.status.clear();
                log_pipe!();
                log_warning!("Failed to reload settings: {e}");
                return;
            }
        };
        if !changed {
            return;
        }

        self.status.clear();
        log_block_start!("Settings reloaded");
        if self.debug_enabled {
            self.store.get().log_settings();
        }

        let key = self.store.get().fetch_key();
        if self.cache.current() != Some(key) {
            self.tz = self.store.get().timezone();
            log_indented!("Location or method changed, reloading prayer times");
            self.cache.select(key, now);
            self.scheduler.cancel(Task::Retry);
            self.window = None;
            self.phase = None;
            self.progress = 0.0;
            // Show whatever this key last loaded, stale or not, while it revalidates
            if self.cache.cached().is_some() {
                self.load_window(now);
            }
            self.request_fetch(now);
        } else {
            // Convention or format only: recompute from what we have
            self.phase = None;
            self.load_window(now);
        }
    }
}

#[cfg(test)]
mod tests;
