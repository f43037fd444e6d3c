use chrono::Weekday;
use std::fmt;

use crate::errors::ConfigError;

/// Day names used when no weekdays are configured
pub const EVERY_DAY: [&str; 7] = ["su", "mo", "tu", "we", "th", "fr", "sa"];

/// Set of weekdays, indexed from Sunday = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weekdays(u8);

impl Weekdays {
    pub fn every_day() -> Self {
        Weekdays(0b0111_1111)
    }

    /// Parses day names (`su`, `sun`, `sunday`, any case) or numbers `0`-`6`.
    /// An empty list means every day.
    pub fn parse<S: AsRef<str>>(days: &[S]) -> Result<Self, ConfigError> {
        if days.is_empty() {
            return Ok(Self::every_day());
        }

        let mut set = Weekdays::default();
        for day in days {
            set.insert(parse_weekday(day.as_ref())?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }
}

fn parse_weekday(day: &str) -> Result<Weekday, ConfigError> {
    let day = day.trim();
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: "maintenance_days".to_string(),
        reason: format!("{}: '{}'", reason, day),
    };

    if let Ok(n) = day.parse::<u8>() {
        return match n {
            0 => Ok(Weekday::Sun),
            1 => Ok(Weekday::Mon),
            2 => Ok(Weekday::Tue),
            3 => Ok(Weekday::Wed),
            4 => Ok(Weekday::Thu),
            5 => Ok(Weekday::Fri),
            6 => Ok(Weekday::Sat),
            _ => Err(invalid("weekday number out of range")),
        };
    }

    match day.to_ascii_lowercase().as_str() {
        "su" | "sun" | "sunday" => Ok(Weekday::Sun),
        "mo" | "mon" | "monday" => Ok(Weekday::Mon),
        "tu" | "tue" | "tuesday" => Ok(Weekday::Tue),
        "we" | "wed" | "wednesday" => Ok(Weekday::Wed),
        "th" | "thu" | "thursday" => Ok(Weekday::Thu),
        "fr" | "fri" | "friday" => Ok(Weekday::Fri),
        "sa" | "sat" | "saturday" => Ok(Weekday::Sat),
        _ => Err(invalid("invalid weekday")),
    }
}

impl fmt::Display for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ORDER: [Weekday; 7] = [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ];

        let names: Vec<String> = ORDER
            .iter()
            .filter(|day| self.contains(**day))
            .map(|day| day.to_string())
            .collect();
        write!(f, "{}", names.join(","))
    }
}
