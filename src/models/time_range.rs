//! Time range value object (absolute UTC instants)

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Immutable half-open window `[start, end)` between two UTC instants.
///
/// Construction always enforces `start < end`, so a `TimeRange` in hand is
/// never empty or inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = AppError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::InvalidRange(format!(
                "start ({}) must be before end ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `minutes` starting at `start`
    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> AppResult<Self> {
        Self::new(start, add_minutes(start, minutes)?)
    }

    /// Parse a range from two RFC 3339 timestamps
    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        let start = parse_instant(start)?;
        let end = parse_instant(end)?;
        Self::new(start, end)
    }

    /// Build a range on a UTC calendar day from two `HH:MM` strings
    pub fn on_date(date: NaiveDate, start_time: &str, end_time: &str) -> AppResult<Self> {
        let start = parse_clock(start_time)?;
        let end = parse_clock(end_time)?;
        Self::new(
            date.and_time(start).and_utc(),
            date.and_time(end).and_utc(),
        )
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whole minutes between start and end; any trailing seconds are dropped
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Open-interval intersection; ranges that only touch do not overlap
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// `start <= instant < end`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// `HH:MM` wall-clock start and end in the given timezone
    pub fn format(&self, timezone: Tz) -> (String, String) {
        (
            self.start.with_timezone(&timezone).format("%H:%M").to_string(),
            self.end.with_timezone(&timezone).format("%H:%M").to_string(),
        )
    }
}

/// `instant + minutes`, `InvalidRange` when the result leaves the supported calendar
pub fn add_minutes(instant: DateTime<Utc>, minutes: i64) -> AppResult<DateTime<Utc>> {
    instant
        .checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| {
            AppError::InvalidRange(format!(
                "{} plus {} minutes is out of range",
                instant.to_rfc3339(),
                minutes
            ))
        })
}

fn parse_instant(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidRange(format!("'{}' is not a valid RFC 3339 instant", value)))
}

fn parse_clock(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::InvalidRange(format!("'{}' is not a valid HH:MM time", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
        TimeRange::new(at(sh, sm), at(eh, em)).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted() {
        assert!(matches!(
            TimeRange::new(at(10, 0), at(10, 0)),
            Err(AppError::InvalidRange(_))
        ));
        assert!(matches!(
            TimeRange::new(at(11, 0), at(10, 0)),
            Err(AppError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_duration_truncates_partial_minutes() {
        let r = TimeRange::new(at(10, 0), at(10, 30) + Duration::seconds(59)).unwrap();
        assert_eq!(r.duration_minutes(), 30);
        assert_eq!(range(9, 0, 18, 0).duration_minutes(), 540);
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let a = range(10, 0, 11, 0);
        let b = range(11, 0, 12, 0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let cases = [
            (range(10, 0, 11, 0), range(10, 30, 11, 30)),
            (range(10, 0, 12, 0), range(10, 30, 11, 0)),
            (range(9, 0, 9, 30), range(9, 30, 10, 0)),
            (range(8, 0, 9, 0), range(13, 0, 14, 0)),
            (range(10, 0, 11, 0), range(10, 0, 11, 0)),
        ];
        for (a, b) in cases {
            assert_eq!(a.overlaps(&b), b.overlaps(&a), "{:?} vs {:?}", a, b);
        }
        assert!(cases[0].0.overlaps(&cases[0].1));
        assert!(cases[1].0.overlaps(&cases[1].1));
        assert!(cases[4].0.overlaps(&cases[4].1));
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = range(10, 0, 11, 0);
        assert!(r.contains(at(10, 0)));
        assert!(r.contains(at(10, 59)));
        assert!(!r.contains(at(11, 0)));
        assert!(!r.contains(at(9, 59)));
    }

    #[test]
    fn test_parse_and_on_date() {
        let parsed = TimeRange::parse("2025-03-10T10:00:00Z", "2025-03-10T10:30:00-00:00").unwrap();
        assert_eq!(parsed, range(10, 0, 10, 30));
        assert!(matches!(
            TimeRange::parse("not a date", "2025-03-10T10:30:00Z"),
            Err(AppError::InvalidRange(_))
        ));

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(TimeRange::on_date(date, "09:00", "09:30").unwrap(), range(9, 0, 9, 30));
        assert!(TimeRange::on_date(date, "9h", "09:30").is_err());
    }

    #[test]
    fn test_starting_at_checks_calendar_bounds() {
        assert_eq!(TimeRange::starting_at(at(10, 0), 45).unwrap(), range(10, 0, 10, 45));
        assert!(TimeRange::starting_at(at(10, 0), 0).is_err());

        let last_day: DateTime<Utc> = "+262142-12-31T23:50:00Z".parse().unwrap();
        assert!(matches!(
            TimeRange::starting_at(last_day, 30),
            Err(AppError::InvalidRange(_))
        ));
        assert!(add_minutes(DateTime::<Utc>::MAX_UTC, 1).is_err());
        assert_eq!(
            add_minutes(at(23, 30), 60).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 11, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_format_in_shop_timezone() {
        let r = range(12, 0, 12, 45);
        let (start, end) = r.format(chrono_tz::America::Sao_Paulo);
        assert_eq!(start, "09:00");
        assert_eq!(end, "09:45");
    }

    #[test]
    fn test_deserialize_enforces_invariant() {
        let bad = r#"{"start":"2025-03-10T11:00:00Z","end":"2025-03-10T10:00:00Z"}"#;
        assert!(serde_json::from_str::<TimeRange>(bad).is_err());

        let good = r#"{"start":"2025-03-10T10:00:00Z","end":"2025-03-10T11:00:00Z"}"#;
        let r: TimeRange = serde_json::from_str(good).unwrap();
        assert_eq!(r, range(10, 0, 11, 0));
    }
}
