//! Wall-clock abstraction supporting real and simulated time.
//!
//! Everything that asks "what time is it" goes through [`now`], so the
//! `simulate` command can replay a whole night in seconds and the projector,
//! resolver and scheduler see one consistent clock.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Sleep for the duration, or advance the simulated clock by it.
    fn sleep(&self, duration: StdDuration);

    fn is_simulated(&self) -> bool;

    /// Whether a simulation has reached its end (always false for real time).
    fn is_ended(&self) -> bool {
        false
    }
}

pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated clock running from `start_time` to `end_time`.
///
/// With a positive multiplier, simulated time advances `multiplier` times faster
/// than real time while sleeping. A multiplier of `0.0` is fast-forward: each
/// sleep jumps the clock instantly.
pub struct SimulatedTimeSource {
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    time_multiplier: f64,
    elapsed: Mutex<ChronoDuration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedTimeSource {
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>, multiplier: f64) -> Self {
        Self {
            start_time,
            end_time,
            time_multiplier: if multiplier < 0.0 { 3600.0 } else { multiplier },
            elapsed: Mutex::new(ChronoDuration::zero()),
        }
    }

    fn current_time(&self) -> DateTime<Local> {
        let simulated = self.start_time + *lock(&self.elapsed);
        simulated.min(self.end_time)
    }

    fn is_fast_forward(&self) -> bool {
        self.time_multiplier == 0.0
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        self.current_time()
    }

    fn sleep(&self, duration: StdDuration) {
        let remaining = self.end_time - self.current_time();
        let requested = ChronoDuration::from_std(duration).unwrap_or(remaining);
        let step = requested.min(remaining).max(ChronoDuration::zero());

        if self.is_fast_forward() {
            // Yield so other threads (fetch worker, log writer) make progress
            std::thread::sleep(StdDuration::from_millis(1));
        } else if let Ok(real) = step.to_std() {
            std::thread::sleep(real.div_f64(self.time_multiplier));
        }

        *lock(&self.elapsed) += step;
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

/// Install the process-wide time source. Only the first call has an effect.
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

pub fn now() -> DateTime<Local> {
    source().now()
}

pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

pub fn is_simulated() -> bool {
    source().is_simulated()
}

pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse `"YYYY-MM-DD HH:MM:SS"` as a wall-clock time in `tz`.
pub fn parse_datetime_in_tz(s: &str, tz: chrono_tz::Tz) -> Result<DateTime<chrono_tz::Tz>, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("Time {s} does not exist in timezone {tz}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(s: &str) -> DateTime<Local> {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    #[test]
    fn test_fast_forward_advances_by_sleep_duration() {
        let source = SimulatedTimeSource::new(
            local("2025-03-01 20:00:00"),
            local("2025-03-01 23:00:00"),
            0.0,
        );
        source.sleep(StdDuration::from_secs(3600));
        assert_eq!(source.now(), local("2025-03-01 21:00:00"));
        assert!(!source.is_ended());
    }

    #[test]
    fn test_simulation_caps_at_end_time() {
        let source = SimulatedTimeSource::new(
            local("2025-03-01 20:00:00"),
            local("2025-03-01 20:30:00"),
            0.0,
        );
        source.sleep(StdDuration::from_secs(7200));
        assert_eq!(source.now(), local("2025-03-01 20:30:00"));
        assert!(source.is_ended());
    }

    #[test]
    fn test_parse_datetime_in_tz() {
        let parsed = parse_datetime_in_tz("2025-03-01 03:00:00", chrono_tz::Europe::London).unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "03:00");
        assert!(parse_datetime_in_tz("03:00", chrono_tz::UTC).is_err());
    }
}
