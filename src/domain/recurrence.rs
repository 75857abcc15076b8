//! Recurring study-session expansion.
//!
//! A weekly pattern (weekdays, a time-of-day range, a number of weeks) is
//! turned into concrete, dated sessions relative to a reference instant.
//! Everything here is pure; the reference instant and its time zone are
//! supplied by the caller.

use crate::domain::error::ValidationError;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use serde::Serialize;

pub const MIN_SESSION_MINUTES: i64 = 30;
pub const MAX_REPEAT_WEEKS: u32 = 52;

const WEEKDAYS_FROM_SUNDAY: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Maps a Sunday-based index (0 = Sunday .. 6 = Saturday) to a weekday.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    WEEKDAYS_FROM_SUNDAY.get(usize::from(index)).copied()
}

pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Set of selected weekdays, iterated Sunday first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekdaySelection(u8);

impl WeekdaySelection {
    pub fn from_indices<I>(indices: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut selection = Self::default();
        for index in indices {
            let weekday =
                weekday_from_index(index).ok_or(ValidationError::WeekdayOutOfRange(u32::from(index)))?;
            selection.insert(weekday);
        }
        Ok(selection)
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= 1 << weekday_index(weekday);
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday_index(weekday)) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEKDAYS_FROM_SUNDAY
            .into_iter()
            .filter(|weekday| self.contains(*weekday))
    }
}

/// A validated start/end time-of-day pair at least [`MIN_SESSION_MINUTES`] long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_time_of_day(start, "start time")?;
        let end = parse_time_of_day(end, "end time")?;
        Self::new(start, end)
    }

    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EndNotAfterStart);
        }
        let minutes = minutes_since_midnight(end) - minutes_since_midnight(start);
        if minutes < MIN_SESSION_MINUTES {
            return Err(ValidationError::IntervalTooShort {
                minutes,
                minimum: MIN_SESSION_MINUTES,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn start_offset_minutes(&self) -> i64 {
        minutes_since_midnight(self.start)
    }

    pub fn end_offset_minutes(&self) -> i64 {
        minutes_since_midnight(self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        self.end_offset_minutes() - self.start_offset_minutes()
    }
}

fn parse_time_of_day(value: &str, field: &'static str) -> Result<NaiveTime, ValidationError> {
    let malformed = || ValidationError::MalformedTime {
        field,
        value: value.to_string(),
    };
    let (hour, minute) = value.trim().split_once(':').ok_or_else(malformed)?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return Err(malformed());
    }
    if !hour.bytes().chain(minute.bytes()).all(|byte| byte.is_ascii_digit()) {
        return Err(malformed());
    }
    let hour = hour.parse::<u32>().map_err(|_| malformed())?;
    let minute = minute.parse::<u32>().map_err(|_| malformed())?;
    if hour > 23 || minute > 59 {
        return Err(malformed());
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)
}

fn minutes_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Next date falling on `target`, strictly after `reference`.
///
/// A reference that already falls on `target` yields the date one week later.
pub fn next_weekly_occurrence(target: Weekday, reference: NaiveDate) -> NaiveDate {
    let reference_index = i64::from(weekday_index(reference.weekday()));
    let target_index = i64::from(weekday_index(target));
    let mut distance = (target_index - reference_index + 7) % 7;
    if distance == 0 {
        distance = 7;
    }
    reference + Duration::days(distance)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub weekdays: WeekdaySelection,
    pub time_range: TimeRange,
    /// Callers keep this within `1..=MAX_REPEAT_WEEKS`; it is not re-checked here.
    pub repeat_weeks: u32,
}

impl ExpansionRequest {
    /// Validated constructor used at submission time.
    pub fn new(
        weekdays: WeekdaySelection,
        time_range: TimeRange,
        repeat_weeks: u32,
    ) -> Result<Self, ValidationError> {
        if weekdays.is_empty() {
            return Err(ValidationError::NoWeekdaysSelected);
        }
        if !(1..=MAX_REPEAT_WEEKS).contains(&repeat_weeks) {
            return Err(ValidationError::RepeatWeeksOutOfRange {
                value: repeat_weeks,
                maximum: MAX_REPEAT_WEEKS,
            });
        }
        Ok(Self {
            weekdays,
            time_range,
            repeat_weeks,
        })
    }

    pub fn session_count(&self) -> usize {
        self.weekdays.len() * self.repeat_weeks as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDescriptor {
    pub weekday: Weekday,
    pub week_index: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SessionDescriptor {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Expands a weekly pattern into dated sessions sorted by start instant.
///
/// Dates are computed on the calendar of `reference`'s time zone, so two
/// sessions on the same weekday are always exactly `7 * k` calendar days apart.
pub fn expand_recurring_sessions<Tz>(
    request: &ExpansionRequest,
    reference: &DateTime<Tz>,
) -> Result<Vec<SessionDescriptor>, ValidationError>
where
    Tz: TimeZone,
{
    let time_zone = reference.timezone();
    let reference_date = reference.date_naive();
    let duration = Duration::minutes(request.time_range.duration_minutes());
    let mut sessions = Vec::with_capacity(request.session_count());

    for week_index in 0..request.repeat_weeks {
        for weekday in request.weekdays.iter() {
            let anchor = next_weekly_occurrence(weekday, reference_date);
            let date = anchor + Duration::days(7 * i64::from(week_index));
            let start = resolve_local(&time_zone, date.and_time(request.time_range.start()))?;
            sessions.push(SessionDescriptor {
                weekday,
                week_index,
                start,
                end: start + duration,
            });
        }
    }

    sessions.sort_by_key(|session| session.start);
    Ok(sessions)
}

/// Ambiguous local times take the earlier instant; times inside a DST gap
/// move forward by one hour.
fn resolve_local<Tz>(time_zone: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, ValidationError>
where
    Tz: TimeZone,
{
    time_zone
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            time_zone
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
        })
        .map(|resolved| resolved.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::LocalTimeUnavailable(local.to_string()))
}
