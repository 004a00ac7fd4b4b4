//! Text formatting for times, durations, the countdown and the shareable summary.

use chrono::{Datelike, NaiveDate, Timelike};

use crate::config::TimeFormat;
use crate::night::{Countdown, NightWindow, ScheduleEntry, WindowState};

/// `HH:MM` in 24h mode, `h:MM AM/PM` in 12h mode.
pub fn format_time<T: Timelike>(time: &T, format: TimeFormat) -> String {
    let hours = time.hour();
    let minutes = time.minute();

    match format {
        TimeFormat::TwentyFourHour => format!("{hours:02}:{minutes:02}"),
        TimeFormat::TwelveHour => {
            let period = if hours >= 12 { "PM" } else { "AM" };
            let display_hours = match hours % 12 {
                0 => 12,
                h => h,
            };
            format!("{display_hours}:{minutes:02} {period}")
        }
    }
}

/// `45m`, `7h 30m` or `8h`.
pub fn format_duration(minutes: i64) -> String {
    let hours = minutes.div_euclid(60);
    let mins = minutes.rem_euclid(60);

    if hours == 0 {
        format!("{mins}m")
    } else if mins > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{hours}h")
    }
}

/// `01h:12m:09s`
pub fn format_countdown(countdown: &Countdown) -> String {
    format!(
        "{:02}h:{:02}m:{:02}s",
        countdown.hours, countdown.minutes, countdown.seconds
    )
}

/// Whole-percent night progress.
pub fn format_progress(ratio: f64) -> String {
    format!("{}%", (ratio.clamp(0.0, 1.0) * 100.0).round() as u32)
}

/// Plain-text export of the window, ready to paste.
pub fn summary_text(window: &NightWindow, address: Option<&str>, format: TimeFormat) -> String {
    let title = match address {
        Some(address) => format!("Qiyam Window for {address}:"),
        None => "Qiyam Window:".to_string(),
    };

    [
        title,
        format!("• Starts: {}", format_time(&window.start, format)),
        format!("• Ends (Fajr): {}", format_time(&window.end, format)),
        format!(
            "• Night Duration: {}",
            format_duration(window.night_duration_minutes)
        ),
        format!(
            "• Middle of Night: {}",
            format_time(&window.middle_of_night, format)
        ),
    ]
    .join("\n")
}

/// One-line live status, e.g. `Starts in 01h:12m:09s | night 43%`.
pub fn status_line(
    window: &NightWindow,
    state: &WindowState,
    progress: f64,
    format: TimeFormat,
) -> String {
    let head = match state {
        WindowState::Pending { countdown } => format!("Starts in {}", format_countdown(countdown)),
        WindowState::Active => format!("Qiyam time, ends at {}", format_time(&window.end, format)),
        WindowState::Ended => "Window ended".to_string(),
    };
    format!("{head} | night {}", format_progress(progress))
}

/// `Label  time` rows for the anchored schedule.
pub fn schedule_lines(entries: &[ScheduleEntry], format: TimeFormat) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{:<9}{}",
                entry.label.as_str(),
                format_time(&entry.at, format)
            )
        })
        .collect()
}

/// A saying about the night prayer, with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Virtue {
    pub text: &'static str,
    pub source: &'static str,
}

const VIRTUES: [Virtue; 4] = [
    Virtue {
        text: "The best prayer after the obligatory prayers is the night prayer.",
        source: "Sahih Muslim",
    },
    Virtue {
        text: "Our Lord descends every night to the lowest heaven when the last third of the night remains...",
        source: "Bukhari & Muslim",
    },
    Virtue {
        text: "You should pray at night, for it was the habit of the righteous people before you.",
        source: "At-Tirmidhi",
    },
    Virtue {
        text: "The closest a servant is to his Lord is in the middle of the last part of the night.",
        source: "At-Tirmidhi",
    },
];

/// The saying for a given night; stable for the whole night.
pub fn virtue_for(date: NaiveDate) -> Virtue {
    VIRTUES[date.ordinal0() as usize % VIRTUES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::night::compute_window;
    use crate::night::Convention;
    use crate::provider::PrayerLabel;
    use chrono::{NaiveTime, TimeZone};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window() -> NightWindow {
        compute_window(
            "18:00",
            "19:30",
            "05:00",
            Convention::Standard,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            chrono_tz::UTC,
        )
        .unwrap()
    }

    #[test]
    fn test_format_time_24h() {
        assert_eq!(format_time(&hm(5, 7), TimeFormat::TwentyFourHour), "05:07");
        assert_eq!(format_time(&hm(0, 0), TimeFormat::TwentyFourHour), "00:00");
        assert_eq!(format_time(&hm(23, 59), TimeFormat::TwentyFourHour), "23:59");
    }

    #[test]
    fn test_format_time_12h() {
        assert_eq!(format_time(&hm(0, 5), TimeFormat::TwelveHour), "12:05 AM");
        assert_eq!(format_time(&hm(1, 40), TimeFormat::TwelveHour), "1:40 AM");
        assert_eq!(format_time(&hm(12, 0), TimeFormat::TwelveHour), "12:00 PM");
        assert_eq!(format_time(&hm(18, 9), TimeFormat::TwelveHour), "6:09 PM");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(450), "7h 30m");
        assert_eq!(format_duration(660), "11h");
    }

    #[test]
    fn test_format_countdown_pads() {
        let countdown = Countdown {
            hours: 1,
            minutes: 2,
            seconds: 9,
        };
        assert_eq!(format_countdown(&countdown), "01h:02m:09s");
    }

    #[test]
    fn test_summary_text_with_address() {
        let text = summary_text(&window(), Some("Cairo, Egypt"), TimeFormat::TwelveHour);
        assert_eq!(
            text,
            "Qiyam Window for Cairo, Egypt:\n\
             • Starts: 1:20 AM\n\
             • Ends (Fajr): 5:00 AM\n\
             • Night Duration: 11h\n\
             • Middle of Night: 11:30 PM"
        );
    }

    #[test]
    fn test_summary_text_without_address() {
        let text = summary_text(&window(), None, TimeFormat::TwentyFourHour);
        assert!(text.starts_with("Qiyam Window:\n• Starts: 01:20\n"));
    }

    #[test]
    fn test_status_line_variants() {
        let w = window();
        let pending = WindowState::Pending {
            countdown: Countdown {
                hours: 1,
                minutes: 12,
                seconds: 9,
            },
        };
        assert_eq!(
            status_line(&w, &pending, 0.434, TimeFormat::TwelveHour),
            "Starts in 01h:12m:09s | night 43%"
        );
        assert_eq!(
            status_line(&w, &WindowState::Active, 0.9, TimeFormat::TwentyFourHour),
            "Qiyam time, ends at 05:00 | night 90%"
        );
        assert_eq!(
            status_line(&w, &WindowState::Ended, 1.0, TimeFormat::TwelveHour),
            "Window ended | night 100%"
        );
    }

    #[test]
    fn test_schedule_lines_align_labels() {
        let entries = vec![ScheduleEntry {
            label: PrayerLabel::Fajr,
            at: chrono_tz::UTC.with_ymd_and_hms(2025, 3, 2, 5, 0, 0).unwrap(),
        }];
        assert_eq!(
            schedule_lines(&entries, TimeFormat::TwentyFourHour),
            vec!["Fajr     05:00".to_string()]
        );
    }

    #[test]
    fn test_virtue_is_stable_per_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(virtue_for(date), virtue_for(date));
        assert_ne!(virtue_for(date), virtue_for(date.succ_opt().unwrap()));
    }
}
