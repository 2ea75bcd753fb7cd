//! Wall clock and calendar helpers.
//!
//! "Today" always means the calendar date in the configured timezone, never
//! the host's local zone and never plain UTC.

use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|g| *g).unwrap_or_else(|p| *p.into_inner())
    }
}

/// `YYYYMMDD` of `now` in `tz`. Used for every date-scoped store key.
pub fn date_key(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y%m%d").to_string()
}

/// Digest header timestamp, e.g. `16.10.2026 Cuma 08:00`.
pub fn header_timestamp(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    format!(
        "{} {} {}",
        local.format("%d.%m.%Y"),
        weekday_tr(local.weekday()),
        local.format("%H:%M")
    )
}

/// Kickoff style `HH:MM` in `tz`.
pub fn clock_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%H:%M").to_string()
}

fn weekday_tr(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Pazartesi",
        Weekday::Tue => "Salı",
        Weekday::Wed => "Çarşamba",
        Weekday::Thu => "Perşembe",
        Weekday::Fri => "Cuma",
        Weekday::Sat => "Cumartesi",
        Weekday::Sun => "Pazar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_key_uses_configured_zone() {
        // 22:30 UTC on the 15th is already the 16th in Istanbul (UTC+3).
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 22, 30, 0).unwrap();
        assert_eq!(date_key(now, chrono_tz::Europe::Istanbul), "20261016");
        assert_eq!(date_key(now, chrono_tz::UTC), "20261015");
    }

    #[test]
    fn test_header_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 5, 0, 0).unwrap();
        assert_eq!(
            header_timestamp(now, chrono_tz::Europe::Istanbul),
            "16.10.2026 Cuma 08:00"
        );
    }

    #[test]
    fn test_fixed_clock_moves_only_when_set() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        let later = start + chrono::Duration::days(1);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
