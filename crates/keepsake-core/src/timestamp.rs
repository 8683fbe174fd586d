//! Relative-timestamp resolution.
//!
//! The answer listing is captured from a page that renders authoring dates as
//! short labels relative to the moment of viewing: `Fri`, `Yesterday`,
//! `3h ago`, `31 Jan`. A [`ReferenceInstant`] pins that moment down so each
//! label can be mapped back onto an absolute calendar date.
//!
//! All arithmetic happens in the viewer's *local* calendar. The platform
//! renders labels from the viewer's perspective, so an answer written at
//! 23:30 local time is "Yesterday" the next morning even when UTC disagrees.
//!
//! ## Timezone offset convention
//!
//! `timezone_offset_minutes` uses the convention of JavaScript's
//! `Date.prototype.getTimezoneOffset()`: the number of minutes to add to local
//! time to obtain UTC. A viewer in UTC+10 reports `-600`; a viewer in UTC-5
//! reports `300`. The local wall clock is therefore
//! `epoch_seconds - timezone_offset_minutes * 60`.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use keepsake_core::timestamp::{ReferenceInstant, resolve};
//!
//! // Friday 2024-01-05 10:00 UTC, viewed from UTC.
//! let reference = ReferenceInstant::new(1_704_448_800, 0);
//! assert_eq!(resolve("Fri", &reference)?, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
//! assert_eq!(resolve("Mon", &reference)?, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
//! # Ok::<(), keepsake_core::Error>(())
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, Utc, Weekday};
use regex::Regex;
use std::sync::LazyLock;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Longest look-back for a day-and-month label without a year.
const DAY_MONTH_LOOKBACK_DAYS: u64 = 366;

/// `31 Jan 2015`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}) (Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) (\d{4})$").unwrap()
});

/// `Jan 31, 2015`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static MONTH_DAY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) (\d{1,2}), (\d{4})$").unwrap()
});

/// `2015-01-31`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

/// `31 Jan`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}) (Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)$").unwrap()
});

/// `Jan 31`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) (\d{1,2})$").unwrap()
});

/// `15m ago`, `3h ago`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static AGO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)([mh]) ago$").unwrap());

/// `9am`, `11:30pm`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}(:\d{2})? ?[ap]m$").unwrap());

/// The instant at which the answer listing was captured.
///
/// Supplied once per run and read-only afterwards. It must be taken at
/// (approximately) the same moment the listing was captured, otherwise every
/// relative label may resolve one day off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceInstant {
    /// Seconds since the Unix epoch (UTC).
    pub epoch_seconds: i64,
    /// Minutes to add to local time to obtain UTC (JavaScript convention).
    pub timezone_offset_minutes: i32,
}

impl ReferenceInstant {
    /// Create a reference instant from epoch seconds and a JS-style offset.
    #[must_use]
    pub const fn new(epoch_seconds: i64, timezone_offset_minutes: i32) -> Self {
        Self {
            epoch_seconds,
            timezone_offset_minutes,
        }
    }

    /// Create a reference instant from a JavaScript `Date.now()` value.
    #[must_use]
    pub const fn from_js_millis(epoch_millis: i64, timezone_offset_minutes: i32) -> Self {
        Self::new(epoch_millis.div_euclid(1000), timezone_offset_minutes)
    }

    /// The current instant, observed from the system's local timezone.
    #[must_use]
    pub fn now() -> Self {
        let now = Local::now();
        Self::new(now.timestamp(), -(now.offset().local_minus_utc() / 60))
    }

    /// Seconds since the epoch on the viewer's local wall clock.
    fn local_epoch_seconds(&self) -> i64 {
        self.epoch_seconds - i64::from(self.timezone_offset_minutes) * 60
    }

    /// The viewer's local calendar date at this instant.
    pub fn local_date(&self) -> Result<NaiveDate> {
        local_date_at(self.local_epoch_seconds())
    }
}

/// A label classified into one of the recognized token forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateToken {
    /// A full calendar date; the reference instant is ignored.
    Absolute(NaiveDate),
    /// Most recent occurrence of this weekday, on or before the reference date.
    Weekday(Weekday),
    /// Whole days before the reference date (`Today` = 0, `Yesterday` = 1).
    DaysAgo(u64),
    /// Seconds before the reference instant (`3h ago`).
    SecondsAgo(i64),
    /// Day and month without a year.
    DayMonth {
        /// Day of month (1-31).
        day: u32,
        /// Month (1-12).
        month: u32,
    },
}

/// Classify a label (decorator already stripped) into a [`DateToken`].
///
/// Forms are tried in priority order: absolute dates, weekday names,
/// relative-day keywords, then the finer relative forms.
pub fn classify(token: &str) -> Result<DateToken> {
    let token = token.trim();
    let unrecognized = || Error::UnrecognizedToken(token.to_string());

    if let Some(date) = parse_absolute(token) {
        return Ok(DateToken::Absolute(date));
    }
    if DAY_MONTH_YEAR_RE.is_match(token)
        || MONTH_DAY_YEAR_RE.is_match(token)
        || ISO_DATE_RE.is_match(token)
    {
        // Shaped like a date, but not a real one (31 Feb 2015).
        return Err(unrecognized());
    }

    if let Ok(weekday) = token.parse::<Weekday>() {
        return Ok(DateToken::Weekday(weekday));
    }

    let lowered = token.to_ascii_lowercase();
    match lowered.as_str() {
        "yesterday" => return Ok(DateToken::DaysAgo(1)),
        "today" | "just now" => return Ok(DateToken::DaysAgo(0)),
        _ => {},
    }

    if CLOCK_RE.is_match(&lowered) {
        return Ok(DateToken::DaysAgo(0));
    }

    if let Some(caps) = AGO_RE.captures(token) {
        let amount: i64 = caps[1].parse().map_err(|_| unrecognized())?;
        let unit = if &caps[2] == "h" { 3600 } else { 60 };
        let seconds = amount.checked_mul(unit).ok_or_else(unrecognized)?;
        return Ok(DateToken::SecondsAgo(seconds));
    }

    if let Some(caps) = DAY_MONTH_RE.captures(token) {
        let day: u32 = caps[1].parse().map_err(|_| unrecognized())?;
        let month = month_number(&caps[2]).ok_or_else(unrecognized)?;
        return Ok(DateToken::DayMonth { day, month });
    }

    if let Some(caps) = MONTH_DAY_RE.captures(token) {
        let month = month_number(&caps[1]).ok_or_else(unrecognized)?;
        let day: u32 = caps[2].parse().map_err(|_| unrecognized())?;
        return Ok(DateToken::DayMonth { day, month });
    }

    Err(unrecognized())
}

/// Resolve a relative date label against a reference instant.
///
/// Fails with [`Error::UnrecognizedToken`] when the label matches none of the
/// known forms. Callers report that as a per-item warning and leave the date
/// unset; it never aborts a run.
pub fn resolve(token: &str, reference: &ReferenceInstant) -> Result<NaiveDate> {
    let unrecognized = || Error::UnrecognizedToken(token.trim().to_string());

    match classify(token)? {
        DateToken::Absolute(date) => Ok(date),
        DateToken::Weekday(weekday) => {
            let today = reference.local_date()?;
            let back = (7 + today.weekday().num_days_from_monday()
                - weekday.num_days_from_monday())
                % 7;
            today
                .checked_sub_days(Days::new(u64::from(back)))
                .ok_or_else(unrecognized)
        },
        DateToken::DaysAgo(days) => reference
            .local_date()?
            .checked_sub_days(Days::new(days))
            .ok_or_else(unrecognized),
        DateToken::SecondsAgo(seconds) => {
            let local = reference
                .local_epoch_seconds()
                .checked_sub(seconds)
                .ok_or_else(unrecognized)?;
            local_date_at(local)
        },
        DateToken::DayMonth { day, month } => {
            let today = reference.local_date()?;
            (0..=DAY_MONTH_LOOKBACK_DAYS)
                .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
                .find(|date| date.month() == month && date.day() == day)
                .ok_or_else(unrecognized)
        },
    }
}

fn parse_absolute(token: &str) -> Option<NaiveDate> {
    if let Some(caps) = DAY_MONTH_YEAR_RE.captures(token) {
        let day = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = MONTH_DAY_YEAR_RE.captures(token) {
        let month = month_number(&caps[1])?;
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = ISO_DATE_RE.captures(token) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

fn local_date_at(local_epoch_seconds: i64) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp(local_epoch_seconds, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| Error::Other(format!("timestamp {local_epoch_seconds} is out of range")))
}
