//! Calendar date/time values with optional date and time parts.

use std::fmt;

use crate::error::SpearalError;

const NANOS_PER_SECOND: u32 = 1_000_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// A proleptic Gregorian calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date {
    pub year: i32,
    /// 1..=12
    pub month: u8,
    /// 1..=31, bounded by the month length.
    pub day: u8,
}

/// A wall-clock time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Time {
    /// 0..=23
    pub hour: u8,
    /// 0..=59
    pub minute: u8,
    /// 0..=59
    pub second: u8,
    /// 0..1_000_000_000
    pub nanosecond: u32,
}

/// A date/time value. Either part may be absent, matching the two presence
/// flags of the `DATE_TIME` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateTime {
    pub date: Option<Date>,
    pub time: Option<Time>,
}

impl Date {
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, SpearalError> {
        let date = Self { year, month, day };
        date.validate()?;
        Ok(date)
    }

    pub fn validate(&self) -> Result<(), SpearalError> {
        if !(1..=12).contains(&self.month) {
            return Err(SpearalError::InvalidDateTime(format!("month {}", self.month)));
        }
        if self.day == 0 || self.day > days_in_month(self.year, self.month) {
            return Err(SpearalError::InvalidDateTime(format!(
                "day {} of {}-{:02}",
                self.day, self.year, self.month
            )));
        }
        Ok(())
    }

    /// Days since 1970-01-01.
    pub fn days_since_epoch(&self) -> i64 {
        let month = i64::from(self.month);
        let year = i64::from(self.year) - i64::from(month <= 2);
        let era = year.div_euclid(400);
        let year_of_era = year.rem_euclid(400);
        let day_of_year = (153 * ((month + 9) % 12) + 2) / 5 + i64::from(self.day) - 1;
        let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
        era * 146_097 + day_of_era - 719_468
    }

    /// Inverse of [`Date::days_since_epoch`].
    pub fn from_days_since_epoch(days: i64) -> Result<Self, SpearalError> {
        let z = days.checked_add(719_468).ok_or_else(|| {
            SpearalError::InvalidDateTime(format!("day {days} out of range"))
        })?;
        let era = z.div_euclid(146_097);
        let day_of_era = z.rem_euclid(146_097);
        let year_of_era =
            (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
        let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
        let mp = (5 * day_of_year + 2) / 153;
        let day = day_of_year - (153 * mp + 2) / 5 + 1;
        let month = if mp < 10 { mp + 3 } else { mp - 9 };
        let year = year_of_era + era * 400 + i64::from(month <= 2);
        let year = i32::try_from(year)
            .map_err(|_| SpearalError::InvalidDateTime(format!("year {year} out of range")))?;
        Ok(Self {
            year,
            month: month as u8,
            day: day as u8,
        })
    }
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8, nanosecond: u32) -> Result<Self, SpearalError> {
        let time = Self {
            hour,
            minute,
            second,
            nanosecond,
        };
        time.validate()?;
        Ok(time)
    }

    pub fn validate(&self) -> Result<(), SpearalError> {
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(SpearalError::InvalidDateTime(format!(
                "time {:02}:{:02}:{:02}",
                self.hour, self.minute, self.second
            )));
        }
        if self.nanosecond >= NANOS_PER_SECOND {
            return Err(SpearalError::InvalidDateTime(format!(
                "nanosecond {}",
                self.nanosecond
            )));
        }
        Ok(())
    }

    fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }
}

impl DateTime {
    pub fn new(date: Date, time: Time) -> Self {
        Self {
            date: Some(date),
            time: Some(time),
        }
    }

    pub fn date_only(date: Date) -> Self {
        Self {
            date: Some(date),
            time: None,
        }
    }

    pub fn time_only(time: Time) -> Self {
        Self {
            date: None,
            time: Some(time),
        }
    }

    pub fn validate(&self) -> Result<(), SpearalError> {
        if let Some(date) = &self.date {
            date.validate()?;
        }
        if let Some(time) = &self.time {
            time.validate()?;
        }
        Ok(())
    }

    /// Builds a UTC date/time from seconds and nanoseconds since the Unix epoch.
    pub fn from_unix_timestamp(seconds: i64, nanosecond: u32) -> Result<Self, SpearalError> {
        if nanosecond >= NANOS_PER_SECOND {
            return Err(SpearalError::InvalidDateTime(format!("nanosecond {nanosecond}")));
        }
        let date = Date::from_days_since_epoch(seconds.div_euclid(SECONDS_PER_DAY))?;
        let secs = seconds.rem_euclid(SECONDS_PER_DAY);
        let time = Time {
            hour: (secs / 3600) as u8,
            minute: (secs % 3600 / 60) as u8,
            second: (secs % 60) as u8,
            nanosecond,
        };
        Ok(Self::new(date, time))
    }

    /// Seconds and nanoseconds since the Unix epoch, reading the value as UTC.
    /// A missing time part means midnight; a missing date part yields `None`.
    pub fn unix_timestamp(&self) -> Option<(i64, u32)> {
        let date = self.date?;
        let (secs, nanos) = self
            .time
            .map(|t| (t.seconds_of_day(), t.nanosecond))
            .unwrap_or((0, 0));
        Some((date.days_since_epoch() * SECONDS_PER_DAY + secs, nanos))
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.nanosecond != 0 {
            write!(f, ".{:09}", self.nanosecond)?;
        }
        Ok(())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.date, &self.time) {
            (Some(d), Some(t)) => write!(f, "{d}T{t}"),
            (Some(d), None) => write!(f, "{d}"),
            (None, Some(t)) => write!(f, "{t}"),
            (None, None) => write!(f, "<empty date/time>"),
        }
    }
}
