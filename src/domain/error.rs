use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be HH:MM (got '{value}')")]
    MalformedTime { field: &'static str, value: String },
    #[error("end time must be after start time")]
    EndNotAfterStart,
    #[error("minimum interval {minimum} minutes (got {minutes})")]
    IntervalTooShort { minutes: i64, minimum: i64 },
    #[error("select at least one weekday")]
    NoWeekdaysSelected,
    #[error("weekday index must be 0-6 (got {0})")]
    WeekdayOutOfRange(u32),
    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),
    #[error("repeat weeks must be between 1 and {maximum} (got {value})")]
    RepeatWeeksOutOfRange { value: u32, maximum: u32 },
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("local time {0} does not exist in the configured time zone")]
    LocalTimeUnavailable(String),
}
