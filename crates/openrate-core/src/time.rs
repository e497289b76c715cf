//! Send-time model and injectable clocks (no chrono dependency).
//!
//! A [`SendTime`] is a Unix instant plus the recipient's UTC offset; the
//! weekday and hour used for scoring are read in that local time. Calendar
//! conversion uses Howard Hinnant's days/civil algorithms.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;

/// Offsets beyond ±18h are not used anywhere on Earth.
const MAX_OFFSET_SECS: u32 = 18 * 3_600;

/// Years outside this range are rejected before any arithmetic.
const MAX_ABS_YEAR: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday of a day counted from 1970-01-01 (a Thursday).
    pub fn from_days_since_epoch(days: i64) -> Self {
        // 0 = Monday
        Self::ALL[(days + 3).rem_euclid(7) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instant at which a message is (or would be) delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireSendTime")]
pub struct SendTime {
    pub unix_secs: i64,
    pub utc_offset_secs: i32,
}

/// Unchecked shape of a deserialized [`SendTime`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSendTime {
    unix_secs: i64,
    #[serde(default)]
    utc_offset_secs: i32,
}

impl TryFrom<WireSendTime> for SendTime {
    type Error = Error;

    fn try_from(wire: WireSendTime) -> Result<Self> {
        if wire.utc_offset_secs.unsigned_abs() > MAX_OFFSET_SECS {
            return Err(Error::InvalidTimestamp(format!(
                "offset of {}s is out of range",
                wire.utc_offset_secs
            )));
        }
        Ok(Self {
            unix_secs: wire.unix_secs,
            utc_offset_secs: wire.utc_offset_secs,
        })
    }
}

impl SendTime {
    pub fn utc(unix_secs: i64) -> Self {
        Self {
            unix_secs,
            utc_offset_secs: 0,
        }
    }

    /// Same instant, read in another local offset.
    pub fn with_offset(self, utc_offset_secs: i32) -> Self {
        Self {
            unix_secs: self.unix_secs,
            utc_offset_secs,
        }
    }

    /// Build from local civil time. Fails on an impossible date or clock time.
    pub fn from_civil(
        year: i64,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        utc_offset_secs: i32,
    ) -> Result<Self> {
        if year.unsigned_abs() > MAX_ABS_YEAR
            || !(1..=12).contains(&month)
            || day == 0
            || day > 31
        {
            return Err(Error::InvalidTimestamp(format!(
                "no such date {year:04}-{month:02}-{day:02}"
            )));
        }
        let days = days_from_civil(year, month, day);
        if civil_from_days(days) != (year, month, day) {
            return Err(Error::InvalidTimestamp(format!(
                "no such date {year:04}-{month:02}-{day:02}"
            )));
        }
        if hour > 23 || minute > 59 || second > 59 {
            return Err(Error::InvalidTimestamp(format!(
                "no such time {hour:02}:{minute:02}:{second:02}"
            )));
        }
        if utc_offset_secs.unsigned_abs() > MAX_OFFSET_SECS {
            return Err(Error::InvalidTimestamp(format!(
                "offset of {utc_offset_secs}s is out of range"
            )));
        }
        let local = days * SECS_PER_DAY
            + i64::from(hour) * SECS_PER_HOUR
            + i64::from(minute) * 60
            + i64::from(second);
        Ok(Self {
            unix_secs: local - i64::from(utc_offset_secs),
            utc_offset_secs,
        })
    }

    /// Parse `YYYY-MM-DDTHH:MM[:SS][Z|±HH:MM]`. A space may replace the `T`.
    /// Without a suffix the time is read in `default_offset_secs`.
    pub fn parse_iso8601(input: &str, default_offset_secs: i32) -> Result<Self> {
        let bad = || Error::InvalidTimestamp(format!("'{input}' is not YYYY-MM-DDTHH:MM[:SS]"));
        let s = input.trim();
        let (date, time) = s.split_once(['T', ' ']).ok_or_else(bad)?;

        let mut date_parts = date.split('-');
        let year: i64 = parse_field(date_parts.next(), 4).ok_or_else(bad)?;
        let month: u32 = parse_field(date_parts.next(), 2).ok_or_else(bad)?;
        let day: u32 = parse_field(date_parts.next(), 2).ok_or_else(bad)?;
        if date_parts.next().is_some() {
            return Err(bad());
        }

        let (clock, offset) = if let Some(clock) = time.strip_suffix(['Z', 'z']) {
            (clock, 0)
        } else if let Some(idx) = time.find(['+', '-']) {
            (&time[..idx], parse_utc_offset(&time[idx..])?)
        } else {
            (time, default_offset_secs)
        };

        let mut clock_parts = clock.split(':');
        let hour: u32 = parse_field(clock_parts.next(), 2).ok_or_else(bad)?;
        let minute: u32 = parse_field(clock_parts.next(), 2).ok_or_else(bad)?;
        let second: u32 = match clock_parts.next() {
            Some(sec) => parse_field(Some(sec), 2).ok_or_else(bad)?,
            None => 0,
        };
        if clock_parts.next().is_some() {
            return Err(bad());
        }

        Self::from_civil(year, month, day, hour, minute, second, offset)
    }

    fn local_secs(self) -> i64 {
        self.unix_secs.saturating_add(i64::from(self.utc_offset_secs))
    }

    pub fn weekday(self) -> Weekday {
        Weekday::from_days_since_epoch(self.local_secs().div_euclid(SECS_PER_DAY))
    }

    /// Local hour of day, 0..=23.
    pub fn hour(self) -> u32 {
        (self.local_secs().rem_euclid(SECS_PER_DAY) / SECS_PER_HOUR) as u32
    }

    /// Local time in ISO-8601 with its offset.
    pub fn to_iso8601(self) -> String {
        let local = self.local_secs();
        let (y, m, d) = civil_from_days(local.div_euclid(SECS_PER_DAY));
        let time_of_day = local.rem_euclid(SECS_PER_DAY);
        let hours = time_of_day / SECS_PER_HOUR;
        let minutes = (time_of_day % SECS_PER_HOUR) / 60;
        let seconds = time_of_day % 60;
        format!(
            "{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}{}",
            format_utc_offset(self.utc_offset_secs)
        )
    }
}

impl fmt::Display for SendTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl FromStr for SendTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_iso8601(s, 0)
    }
}

fn parse_field<T: FromStr>(field: Option<&str>, width: usize) -> Option<T> {
    let field = field?;
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Parse `Z`, `±HH:MM` or `±HHMM` into seconds east of UTC.
pub fn parse_utc_offset(input: &str) -> Result<i32> {
    let bad = || Error::InvalidTimestamp(format!("'{input}' is not a UTC offset like +02:00"));
    let s = input.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(0);
    }
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(bad()),
    };
    if !rest.is_ascii() {
        return Err(bad());
    }
    let (hh, mm) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None => return Err(bad()),
    };
    let hours: i32 = parse_field(Some(hh), 2).ok_or_else(bad)?;
    let minutes: i32 = parse_field(Some(mm), 2).ok_or_else(bad)?;
    if minutes > 59 {
        return Err(bad());
    }
    let secs = sign * (hours * 3_600 + minutes * 60);
    if secs.unsigned_abs() > MAX_OFFSET_SECS {
        return Err(bad());
    }
    Ok(secs)
}

fn format_utc_offset(secs: i32) -> String {
    if secs == 0 {
        return "Z".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 3_600, (abs % 3_600) / 60)
}

/// Howard Hinnant's days_from_civil: (year, month, day) → Unix epoch days.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let m = u64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + u64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i64 - 719_468
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Source of "now" for predictions that omit a send time.
pub trait Clock {
    fn now(&self) -> SendTime;
}

/// Wall clock, read in a fixed UTC offset.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock {
    pub utc_offset_secs: i32,
}

impl SystemClock {
    pub fn with_offset(utc_offset_secs: i32) -> Self {
        Self { utc_offset_secs }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> SendTime {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        SendTime {
            unix_secs: i64::try_from(secs).unwrap_or(i64::MAX),
            utc_offset_secs: self.utc_offset_secs,
        }
    }
}

/// Clock frozen at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub SendTime);

impl Clock for FixedClock {
    fn now(&self) -> SendTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> SendTime {
        (**self).now()
    }
}
