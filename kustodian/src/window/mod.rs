//! Recurring maintenance time window
//!
//! A window is a set of weekdays plus a `[start, end)` time-of-day range
//! interpreted in a named timezone. Windows do not wrap past midnight: an
//! end earlier than the start never matches.
//!
//! ```ignore
//! let window = TimeWindow::new(&["mon", "thu"], "22:00", "23:59:59", "Europe/Berlin")?;
//! if window.contains(&Utc::now()) {
//!     // maintenance may start
//! }
//! ```

pub mod weekdays;

pub use weekdays::{Weekdays, EVERY_DAY};

use chrono::{DateTime, Datelike, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::fmt;

use crate::errors::ConfigError;

const TIME_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M%p", "%I:%M %p"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    days: Weekdays,
    location: Tz,
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    pub fn new<S: AsRef<str>>(
        days: &[S],
        start: &str,
        end: &str,
        timezone: &str,
    ) -> Result<Self, ConfigError> {
        let days = Weekdays::parse(days)?;
        let location: Tz = timezone.trim().parse().map_err(|e| ConfigError::InvalidValue {
            field: "time_zone".to_string(),
            reason: format!("unknown timezone '{}': {}", timezone, e),
        })?;

        Ok(Self {
            days,
            location,
            start: parse_time("start_time", start)?,
            end: parse_time("end_time", end)?,
        })
    }

    /// Whether `instant` falls inside the window. Pure and allocation free.
    pub fn contains<T: TimeZone>(&self, instant: &DateTime<T>) -> bool {
        let local = instant.with_timezone(&self.location);
        if !self.days.contains(local.weekday()) {
            return false;
        }

        let time = local.time();
        time >= self.start && time < self.end
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("unparseable time of day '{}'", value),
        })
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} between {} and {} {}",
            self.days,
            self.start.format("%H:%M:%S"),
            self.end.format("%H:%M:%S"),
            self.location.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[rstest]
    #[case("2024-01-01T11:00:00Z", true)] // Monday
    #[case("2024-01-02T11:00:00Z", false)] // Tuesday
    #[case("2024-01-01T13:00:00Z", false)]
    #[case("2024-01-01T10:00:00Z", true)]
    #[case("2024-01-01T12:00:00Z", false)]
    #[case("2024-01-01T09:59:59Z", false)]
    fn monday_morning_window(#[case] instant: &str, #[case] expected: bool) {
        let window = TimeWindow::new(&["mon"], "10:00", "12:00", "UTC").unwrap();
        assert_eq!(window.contains(&utc(instant)), expected);
    }

    #[test]
    fn converts_to_configured_timezone() {
        // 23:30 UTC on a Sunday is 00:30 Monday in Berlin (winter, UTC+1)
        let window = TimeWindow::new(&["mo"], "00:00", "01:00", "Europe/Berlin").unwrap();
        assert!(window.contains(&utc("2024-01-07T23:30:00Z")));
        assert!(!window.contains(&utc("2024-01-08T23:30:00Z")));
    }

    #[test]
    fn defaults_cover_whole_day() {
        let window = TimeWindow::new(&EVERY_DAY, "0:00", "23:59:59", "UTC").unwrap();
        assert!(window.contains(&utc("2024-03-05T00:00:00Z")));
        assert!(window.contains(&utc("2024-03-09T23:59:58Z")));
    }

    #[test]
    fn end_before_start_never_matches() {
        let window = TimeWindow::new(&EVERY_DAY, "22:00", "02:00", "UTC").unwrap();
        assert!(!window.contains(&utc("2024-01-01T23:00:00Z")));
        assert!(!window.contains(&utc("2024-01-01T01:00:00Z")));
    }

    #[test]
    fn accepts_twelve_hour_times() {
        let window = TimeWindow::new(&EVERY_DAY, "09:30pm", "11:00 PM", "UTC").unwrap();
        assert!(window.contains(&utc("2024-01-01T22:00:00Z")));
        assert!(!window.contains(&utc("2024-01-01T10:00:00Z")));
    }

    #[rstest]
    #[case(&["mon"], "25:00", "12:00", "UTC")]
    #[case(&["mon"], "10:00", "noon", "UTC")]
    #[case(&["mon"], "10:00", "12:00", "Mars/Olympus_Mons")]
    #[case(&["moonday"], "10:00", "12:00", "UTC")]
    fn rejects_bad_input(
        #[case] days: &[&str],
        #[case] start: &str,
        #[case] end: &str,
        #[case] zone: &str,
    ) {
        assert!(TimeWindow::new(days, start, end, zone).is_err());
    }

    #[test]
    fn describes_itself() {
        let window = TimeWindow::new(&["mon"], "10:00", "12:00", "UTC").unwrap();
        assert_eq!(window.to_string(), "Mon between 10:00:00 and 12:00:00 UTC");
    }
}
