//! Wall-clock rules shared by the ballot and the ledger.
//!
//! The ballot offers, for every business day of a poll, the same two fixed
//! blocks. A submitted selection is only accepted if this module would have
//! offered it, so both sides go through [`business_days`] and [`TimeRange`].

use crate::error::PollError;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// UTC+07:00. Every clock time in a poll is read in this offset.
pub const CIVIL_OFFSET_SECS: i32 = 7 * 3600;

pub fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn to_civil(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&civil_offset())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Morning,
    Afternoon,
}

impl TimeRange {
    pub const ALL: [TimeRange; 2] = [TimeRange::Morning, TimeRange::Afternoon];

    pub fn name(self) -> &'static str {
        match self {
            TimeRange::Morning => "morning",
            TimeRange::Afternoon => "afternoon",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::Morning => "09:00 - 12:00",
            TimeRange::Afternoon => "13:00 - 16:00",
        }
    }

    /// (hour, minute) of the block's start and end.
    fn clock(self) -> ((u32, u32), (u32, u32)) {
        match self {
            TimeRange::Morning => ((9, 0), (12, 0)),
            TimeRange::Afternoon => ((13, 0), (16, 0)),
        }
    }

    /// Accepts either the block name or its label text.
    pub fn parse(raw: &str) -> Result<Self, PollError> {
        let wanted = raw.trim();
        TimeRange::ALL
            .into_iter()
            .find(|range| range.name().eq_ignore_ascii_case(wanted) || range.label() == wanted)
            .ok_or_else(|| PollError::InvalidRange(format!("unknown time range '{wanted}'")))
    }

    /// The block's (start, end) on `date`, in UTC.
    pub fn resolve(self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), PollError> {
        let ((start_h, start_m), (end_h, end_m)) = self.clock();
        let start = civil_instant(date, start_h, start_m)?;
        let end = civil_instant(date, end_h, end_m)?;
        if start >= end {
            return Err(PollError::InvalidRange(format!(
                "{} on {date} does not end after it starts",
                self.label()
            )));
        }
        Ok((start, end))
    }
}

fn civil_instant(date: NaiveDate, hour: u32, minute: u32) -> Result<DateTime<Utc>, PollError> {
    date.and_hms_opt(hour, minute, 0)
        .and_then(|local| local.and_local_timezone(civil_offset()).single())
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| PollError::InvalidRange(format!("{date} {hour:02}:{minute:02} is not a valid time")))
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday to Friday dates between `start` and `end`, both inclusive.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| is_business_day(*day))
        .collect()
}

/// The single string a ballot checkbox carries, e.g. `2024-01-02#09:00 - 12:00`.
pub fn choice_value(date: NaiveDate, range: TimeRange) -> String {
    format!("{}#{}", date.format("%Y-%m-%d"), range.label())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, PollError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| PollError::InvalidRange(format!("'{}' is not a YYYY-MM-DD date", raw.trim())))
}

pub fn parse_choice_value(raw: &str) -> Result<(NaiveDate, TimeRange), PollError> {
    let (date, range) = raw
        .split_once('#')
        .ok_or_else(|| PollError::InvalidRange(format!("'{raw}' is not a slot choice")))?;
    Ok((parse_date(date)?, TimeRange::parse(range)?))
}
