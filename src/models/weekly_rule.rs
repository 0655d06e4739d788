//! Weekly opening-hours rule value object

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])$").expect("valid regex"));

/// Day names, Sunday first (index = `day_of_week`)
const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Recurring open/close window for one day of the week.
///
/// `day_of_week` is 0 (Sunday) through 6 (Saturday). Times are kept as
/// minutes since midnight and rendered back as zero-padded `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWeeklyRule", into = "RawWeeklyRule")]
pub struct WeeklyRule {
    day_of_week: u8,
    start_minutes: u16,
    end_minutes: u16,
    is_active: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeeklyRule {
    day_of_week: u8,
    start_time: String,
    end_time: String,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<RawWeeklyRule> for WeeklyRule {
    type Error = AppError;

    fn try_from(raw: RawWeeklyRule) -> Result<Self, Self::Error> {
        WeeklyRule::new(raw.day_of_week, &raw.start_time, &raw.end_time, raw.is_active)
    }
}

impl From<WeeklyRule> for RawWeeklyRule {
    fn from(rule: WeeklyRule) -> Self {
        Self {
            day_of_week: rule.day_of_week,
            start_time: rule.start_time(),
            end_time: rule.end_time(),
            is_active: rule.is_active,
        }
    }
}

impl WeeklyRule {
    pub fn new(day_of_week: u8, start_time: &str, end_time: &str, is_active: bool) -> AppResult<Self> {
        if day_of_week > 6 {
            return Err(AppError::InvalidRule(
                "day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        let start_minutes = parse_minutes(start_time, "start time")?;
        let end_minutes = parse_minutes(end_time, "end time")?;
        if start_minutes >= end_minutes {
            return Err(AppError::InvalidRule(format!(
                "start time {} must be before end time {}",
                start_time, end_time
            )));
        }

        Ok(Self {
            day_of_week,
            start_minutes,
            end_minutes,
            is_active,
        })
    }

    /// Active rule, the usual case when an owner creates one
    pub fn active(day_of_week: u8, start_time: &str, end_time: &str) -> AppResult<Self> {
        Self::new(day_of_week, start_time, end_time, true)
    }

    pub fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    pub fn weekday(&self) -> Weekday {
        match self.day_of_week {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }

    pub fn start_time(&self) -> String {
        format_minutes(self.start_minutes)
    }

    pub fn end_time(&self) -> String {
        format_minutes(self.end_minutes)
    }

    pub fn start_minutes(&self) -> u16 {
        self.start_minutes
    }

    pub fn end_minutes(&self) -> u16 {
        self.end_minutes
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[usize::from(self.day_of_week)]
    }

    /// e.g. `"09:00 - 18:00"`
    pub fn formatted_time(&self) -> String {
        format!("{} - {}", self.start_time(), self.end_time())
    }

    /// Whether `minute_of_day` falls inside `[start, end)`
    pub fn covers_minute(&self, minute_of_day: u16) -> bool {
        minute_of_day >= self.start_minutes && minute_of_day < self.end_minutes
    }

    /// Same day and intersecting minute ranges; rules that only touch
    /// (one ends at 17:00, the other starts at 17:00) do not overlap.
    pub fn overlaps(&self, other: &WeeklyRule) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_minutes < other.end_minutes
            && self.end_minutes > other.start_minutes
    }

    pub fn activate(&self) -> WeeklyRule {
        WeeklyRule {
            is_active: true,
            ..self.clone()
        }
    }

    pub fn deactivate(&self) -> WeeklyRule {
        WeeklyRule {
            is_active: false,
            ..self.clone()
        }
    }

    pub fn update_times(&self, start_time: &str, end_time: &str) -> AppResult<WeeklyRule> {
        WeeklyRule::new(self.day_of_week, start_time, end_time, self.is_active)
    }
}

/// Day-of-week index (0 = Sunday) for a chrono weekday
pub fn day_index(weekday: Weekday) -> u8 {
    // num_days_from_sunday is always in 0..=6
    weekday.num_days_from_sunday() as u8
}

fn parse_minutes(value: &str, field: &str) -> AppResult<u16> {
    let caps = TIME_RE.captures(value).ok_or_else(|| {
        AppError::InvalidRule(format!("{} must use the HH:MM (24h) format, got '{}'", field, value))
    })?;
    // Both groups are guaranteed to be short digit strings by the regex
    let hours: u16 = caps[1]
        .parse()
        .map_err(|_| AppError::InvalidRule(format!("invalid hour in {}", field)))?;
    let minutes: u16 = caps[2]
        .parse()
        .map_err(|_| AppError::InvalidRule(format!("invalid minute in {}", field)))?;
    Ok(hours * 60 + minutes)
}

fn format_minutes(total: u16) -> String {
    format!("{:02}:{:02}", total / 60, total % 60)
}
