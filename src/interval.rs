use thiserror::Error;
use time::{
    Date, PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

pub type Timestamp = PrimitiveDateTime;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not an ISO-8601 date or date-time")]
pub struct TimestampError(pub String);

const DATE_TIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]"),
    format_description!("[year]-[month]-[day]T[hour]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses `2020-11-28`, `2020-11-28T06`, `2020-11-28 06:53`, `2020-11-28T06:53[:ss[.fff]]`.
/// A bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, TimestampError> {
    let s = raw.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(s, *fmt).ok())
        .or_else(|| Date::parse(s, DATE_FORMAT).ok().map(Date::midnight))
        .ok_or_else(|| TimestampError(raw.to_string()))
}

/// Inclusive `[start, finish]`. `start > finish` is allowed and contains nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub start: Timestamp,
    pub finish: Timestamp,
}

impl Interval {
    pub fn parse(start: &str, finish: &str) -> Result<Self, TimestampError> {
        Ok(Self {
            start: parse_timestamp(start)?,
            finish: parse_timestamp(finish)?,
        })
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t <= self.finish
    }
}
