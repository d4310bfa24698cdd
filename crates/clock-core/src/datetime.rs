//! Immutable date-time values with a display offset and millisecond
//! precision.
//!
//! A [`DateTime`] is a whole-second absolute instant plus the UTC offset
//! used for rendering calendar fields. The millisecond is stored separately
//! (the host primitive the original surface wrapped had no sub-second
//! precision) and is deliberately excluded from comparison.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::clock::{Clock, SystemClock};
use crate::error::{ClockError, ClockResult};
use crate::interval::Interval;
use crate::parse;

/// An immutable point in time.
///
/// Every mutating-looking operation (`add`, `sub`, `modify`, `set_*`)
/// returns a new value; the receiver is never altered. Out-of-range
/// components normalize silently the way the host calendar does: hour 25
/// rolls into the next day, month 13 into the next year, day 32 into the
/// next month.
#[derive(Debug, Clone, Copy)]
pub struct DateTime {
    /// Whole-second absolute instant plus display offset.
    instant: chrono::DateTime<FixedOffset>,
    /// Sub-second part, 0–999, kept outside the instant.
    millisecond: u16,
}

/// Accepted inputs for [`DateTime::new`] and the [`clock`](crate::clock())
/// entry point.
///
/// The closed enum is the typed rendering of a union-typed constructor:
/// an input of any other kind is unrepresentable rather than a runtime
/// `InvalidArgument`.
#[derive(Debug, Clone)]
pub enum DateTimeLike {
    /// The current instant.
    Now,
    /// An ISO-8601 date-time string.
    Text(String),
    /// A Unix timestamp in whole seconds.
    Timestamp(i64),
    /// A Unix timestamp with a fractional millisecond part.
    FractionalTimestamp(f64),
    /// An existing value, taken as-is (timezone included).
    Value(DateTime),
}

impl From<&str> for DateTimeLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DateTimeLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DateTimeLike {
    fn from(timestamp: i64) -> Self {
        Self::Timestamp(timestamp)
    }
}

impl From<f64> for DateTimeLike {
    fn from(timestamp: f64) -> Self {
        Self::FractionalTimestamp(timestamp)
    }
}

impl From<DateTime> for DateTimeLike {
    fn from(value: DateTime) -> Self {
        Self::Value(value)
    }
}

impl DateTime {
    /// Builds a value from any date-time-like input.
    ///
    /// For a string input, the offset embedded in the string fixes the
    /// absolute instant; the explicit `timezone` argument then changes only
    /// the display zone. For an existing value without an explicit
    /// `timezone`, its own display zone is kept.
    ///
    /// ## Errors
    /// Propagates `InvalidFormat` from string parsing and `InvalidArgument`
    /// from timestamp conversion.
    pub fn new(input: impl Into<DateTimeLike>, timezone: Option<Tz>) -> ClockResult<Self> {
        let value = match input.into() {
            DateTimeLike::Now => Self::now(),
            DateTimeLike::Text(s) => Self::parse(&s)?,
            DateTimeLike::Timestamp(ts) => Self::from_timestamp(ts)?,
            DateTimeLike::FractionalTimestamp(ts) => Self::from_timestamp_f64(ts)?,
            DateTimeLike::Value(dt) => dt,
        };

        Ok(match timezone {
            Some(tz) => value.set_timezone(tz),
            None => value,
        })
    }

    /// The current instant, read from the system clock, displayed in UTC.
    ///
    /// The millisecond is derived from the sub-second clock reading.
    #[must_use]
    pub fn now() -> Self {
        Self::now_with(&SystemClock)
    }

    /// The current instant according to an explicit [`Clock`].
    #[must_use]
    pub fn now_with(clock: &impl Clock) -> Self {
        let now = clock.now();
        let millisecond = u16::try_from(now.timestamp_subsec_millis().min(999)).unwrap_or(999);
        let instant = now.with_nanosecond(0).unwrap_or(now).fixed_offset();
        Self {
            instant,
            millisecond,
        }
    }

    /// Parses an ISO-8601 date-time string:
    /// `YYYY-MM-DDTHH:MM:SS[.fff](Z|±HH:MM)`.
    ///
    /// A fractional-seconds suffix is extracted first and stored as the
    /// literal millisecond count (`.4` is 4 ms, `.400` is 400 ms), then a
    /// trailing `Z` is rewritten to `+00:00` before the host parser runs.
    ///
    /// ## Errors
    /// Returns `InvalidFormat` for anything the grammar does not cover.
    pub fn parse(s: &str) -> ClockResult<Self> {
        let (instant, millisecond) = parse::parse_datetime(s).inspect_err(|error| {
            tracing::debug!(%error, input = s, "rejected date-time string");
        })?;
        Ok(Self {
            instant,
            millisecond,
        })
    }

    /// Builds a value from a Unix timestamp in whole seconds, displayed in
    /// UTC.
    ///
    /// ## Errors
    /// Returns `InvalidArgument` when the timestamp falls outside the host
    /// calendar range.
    pub fn from_timestamp(timestamp: i64) -> ClockResult<Self> {
        let utc = chrono::DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
            ClockError::InvalidArgument(format!("timestamp {timestamp} is out of range"))
        })?;
        Ok(Self {
            instant: utc.fixed_offset(),
            millisecond: 0,
        })
    }

    /// Builds a value from a fractional Unix timestamp.
    ///
    /// The floor of the input is the timestamp in seconds; the fractional
    /// part becomes the millisecond (`floor(frac * 1000)`). This is a second
    /// path to set milliseconds, independent of string parsing.
    ///
    /// ## Errors
    /// Returns `InvalidArgument` for non-finite or out-of-range input.
    pub fn from_timestamp_f64(timestamp: f64) -> ClockResult<Self> {
        if !timestamp.is_finite() {
            return Err(ClockError::InvalidArgument(format!(
                "timestamp {timestamp} is not a finite number"
            )));
        }

        let seconds = timestamp.floor();
        let fraction = timestamp - seconds;

        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "The seconds cast saturates and is range-checked by from_timestamp; the fraction is in [0, 1)"
        )]
        let (seconds, millisecond) = (seconds as i64, (fraction * 1000.0).floor() as u16);

        let value = Self::from_timestamp(seconds)?;
        Ok(Self {
            millisecond: millisecond.min(999),
            ..value
        })
    }

    /// Midnight at the start of the given calendar date, displayed in UTC.
    ///
    /// Out-of-range components normalize silently, as with
    /// [`DateTime::set_date`].
    #[must_use]
    pub fn for_date(year: i32, month: i32, day: i32) -> Self {
        let epoch = Self {
            instant: chrono::DateTime::<Utc>::UNIX_EPOCH.fixed_offset(),
            millisecond: 0,
        };
        epoch.set_date(year, month, day)
    }

    /// Midnight at the start of the current day.
    #[must_use]
    pub fn for_today() -> Self {
        Self::for_today_with(&SystemClock)
    }

    /// Midnight at the start of the current day according to an explicit
    /// [`Clock`].
    #[must_use]
    pub fn for_today_with(clock: &impl Clock) -> Self {
        Self::now_with(clock).set_time(0, 0, 0).with_millisecond(0)
    }

    /// Advances by the interval's components (months first, then
    /// day-and-time), applying the host's overflow normalization:
    /// `2009-01-31 + P1M` is `2009-03-03`.
    ///
    /// An inverted interval moves backwards.
    ///
    /// ## Panics
    /// Panics when the result leaves the host calendar range, matching the
    /// host's own arithmetic.
    #[must_use]
    pub fn add(&self, interval: &Interval) -> Self {
        self.shifted(interval, 1)
    }

    /// Moves back by the interval's components; the mirror of
    /// [`DateTime::add`].
    ///
    /// ## Panics
    /// Panics when the result leaves the host calendar range.
    #[must_use]
    pub fn sub(&self, interval: &Interval) -> Self {
        self.shifted(interval, -1)
    }

    fn shifted(&self, interval: &Interval, direction: i64) -> Self {
        let direction = if interval.is_inverted() {
            -direction
        } else {
            direction
        };

        let local = self.instant.naive_local();
        let months =
            direction * (i64::from(interval.years()) * 12 + i64::from(interval.months()));
        let seconds = direction
            * (i64::from(interval.days_component()) * 86_400
                + i64::from(interval.hours()) * 3_600
                + i64::from(interval.minutes()) * 60
                + i64::from(interval.seconds()));

        let date = shift_months_overflowing(local.date(), months);
        let shifted = NaiveDateTime::new(date, local.time()) + Duration::seconds(seconds);
        self.with_naive_local(shifted)
    }

    /// Applies a relative modifier such as `+1 day`, `-3 months`, or
    /// `2 weeks`.
    ///
    /// ## Errors
    /// Returns `InvalidFormat` when the modifier does not match the
    /// `[+|-]n unit` grammar.
    pub fn modify(&self, modifier: &str) -> ClockResult<Self> {
        let (amount, unit) = parse::parse_modifier(modifier)?;
        let local = self.instant.naive_local();

        let shifted = match unit {
            parse::ModifyUnit::Second => local + Duration::seconds(amount),
            parse::ModifyUnit::Minute => local + Duration::minutes(amount),
            parse::ModifyUnit::Hour => local + Duration::hours(amount),
            parse::ModifyUnit::Day => local + Duration::days(amount),
            parse::ModifyUnit::Week => local + Duration::days(amount * 7),
            parse::ModifyUnit::Month => NaiveDateTime::new(
                shift_months_overflowing(local.date(), amount),
                local.time(),
            ),
            parse::ModifyUnit::Year => NaiveDateTime::new(
                shift_months_overflowing(local.date(), amount * 12),
                local.time(),
            ),
        };

        Ok(self.with_naive_local(shifted))
    }

    /// Replaces the wall-clock time, keeping the date, display zone, and
    /// millisecond.
    ///
    /// Out-of-range components roll over: `set_time(25, 0, 0)` lands on the
    /// next day at 01:00:00.
    #[must_use]
    pub fn set_time(&self, hour: i32, minute: i32, second: i32) -> Self {
        let local = self.instant.naive_local();
        let midnight = local.date().and_time(chrono::NaiveTime::MIN);
        let seconds =
            i64::from(hour) * 3_600 + i64::from(minute) * 60 + i64::from(second);
        self.with_naive_local(midnight + Duration::seconds(seconds))
    }

    /// Replaces the calendar date, keeping the time, display zone, and
    /// millisecond.
    ///
    /// Month 13 rolls into the next year, day 32 into the next month, and
    /// day 0 into the previous one.
    ///
    /// ## Panics
    /// Panics when the result leaves the host calendar range.
    #[must_use]
    pub fn set_date(&self, year: i32, month: i32, day: i32) -> Self {
        let months0 = i64::from(year) * 12 + i64::from(month) - 1;
        let first = first_of_month(months0);
        let date = first + Duration::days(i64::from(day) - 1);
        self.with_naive_local(NaiveDateTime::new(date, self.instant.naive_local().time()))
    }

    /// Replaces the date from ISO week-date components (week 1 is the week
    /// containing the year's first Thursday; day 1 is Monday).
    ///
    /// Out-of-range weeks and days roll over silently.
    ///
    /// ## Panics
    /// Panics when the result leaves the host calendar range.
    #[must_use]
    pub fn set_iso_date(&self, year: i32, week: i32, day: i32) -> Self {
        let base = NaiveDate::from_isoywd_opt(year, 1, Weekday::Mon)
            .unwrap_or_else(|| panic!("ISO year {year} is out of range"));
        let date = base + Duration::days(i64::from(week - 1) * 7 + i64::from(day) - 1);
        self.with_naive_local(NaiveDateTime::new(date, self.instant.naive_local().time()))
    }

    /// Replaces the absolute instant from a whole-second Unix timestamp,
    /// keeping the display zone and millisecond.
    ///
    /// ## Panics
    /// Panics when the timestamp falls outside the host calendar range.
    #[must_use]
    pub fn set_timestamp(&self, timestamp: i64) -> Self {
        let utc = chrono::DateTime::from_timestamp(timestamp, 0)
            .unwrap_or_else(|| panic!("timestamp {timestamp} is out of range"));
        Self {
            instant: utc.with_timezone(&self.offset()),
            millisecond: self.millisecond,
        }
    }

    /// Changes the display zone to an IANA timezone, resolved through the
    /// host's timezone database. The absolute instant is unchanged.
    #[must_use]
    pub fn set_timezone(&self, timezone: Tz) -> Self {
        Self {
            instant: self.instant.with_timezone(&timezone).fixed_offset(),
            millisecond: self.millisecond,
        }
    }

    /// Changes the display zone to a fixed UTC offset. The absolute instant
    /// is unchanged.
    #[must_use]
    pub fn set_offset(&self, offset: FixedOffset) -> Self {
        Self {
            instant: self.instant.with_timezone(&offset),
            millisecond: self.millisecond,
        }
    }

    /// Orders by the whole-second absolute instant.
    ///
    /// The millisecond field is not part of the comparison: two values with
    /// the same whole-second instant but different milliseconds compare
    /// equal. Display zones never affect ordering.
    #[must_use]
    pub fn compare_to(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }

    /// Same-instant equality, millisecond excluded; equivalent to `==`.
    #[must_use]
    pub fn is_equal_to(&self, other: &Self) -> bool {
        self == other
    }

    /// Whether this instant is strictly after the current one.
    #[must_use]
    pub fn is_in_the_future(&self) -> bool {
        self.is_in_the_future_with(&SystemClock)
    }

    /// Whether this instant is strictly after "now" according to an
    /// explicit [`Clock`].
    #[must_use]
    pub fn is_in_the_future_with(&self, clock: &impl Clock) -> bool {
        self.compare_to(&Self::now_with(clock)) == Ordering::Greater
    }

    /// Whether the display-zone calendar year is a proleptic-Gregorian leap
    /// year.
    #[must_use]
    pub fn is_leap_year(&self) -> bool {
        NaiveDate::from_ymd_opt(self.instant.year(), 2, 29).is_some()
    }

    /// Display-zone calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.instant.year()
    }

    /// Display-zone month, 1–12.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.instant.month()
    }

    /// Display-zone day of month, 1–31.
    #[must_use]
    pub fn day(&self) -> u32 {
        self.instant.day()
    }

    /// Display-zone day of year, 0-based (January 1st is 0).
    #[must_use]
    pub fn day_of_year(&self) -> u32 {
        self.instant.ordinal0()
    }

    /// Display-zone ISO weekday, 1 = Monday through 7 = Sunday.
    #[must_use]
    pub fn day_of_week(&self) -> u32 {
        self.instant.weekday().number_from_monday()
    }

    /// Display-zone hour, 0–23.
    #[must_use]
    pub fn hour(&self) -> u32 {
        self.instant.hour()
    }

    /// Display-zone minute, 0–59.
    #[must_use]
    pub fn minute(&self) -> u32 {
        self.instant.minute()
    }

    /// Display-zone second, 0–59.
    #[must_use]
    pub fn second(&self) -> u32 {
        self.instant.second()
    }

    /// Millisecond, 0–999. Not part of comparison.
    #[must_use]
    pub const fn millisecond(&self) -> u16 {
        self.millisecond
    }

    /// Unix timestamp in whole seconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.instant.timestamp()
    }

    /// The display offset.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        *self.instant.offset()
    }

    /// Elapsed calendar difference from this instant to `other`.
    ///
    /// Month stepping is clamped the way the host diffs dates: from January
    /// 31st to March 1st is one month and one day. The result's `inverted`
    /// flag is set when `other` is earlier, unless `absolute` suppresses it.
    #[must_use]
    pub fn diff(&self, other: &Self, absolute: bool) -> Interval {
        let (inverted, a, b) = if self.instant <= other.instant {
            (false, self.instant.naive_utc(), other.instant.naive_utc())
        } else {
            (true, other.instant.naive_utc(), self.instant.naive_utc())
        };

        let mut months =
            i64::from(b.year() - a.year()) * 12 + i64::from(b.month()) - i64::from(a.month());
        while shift_months_clamped(a, months) > b {
            months -= 1;
        }

        let rest = b - shift_months_clamped(a, months);
        let days = rest.num_days();
        let rest = rest - Duration::days(days);
        let hours = rest.num_hours();
        let rest = rest - Duration::hours(hours);
        let minutes = rest.num_minutes();
        let seconds = (rest - Duration::minutes(minutes)).num_seconds();

        Interval::from_parts(
            component(months / 12),
            component(months % 12),
            component(days),
            component(hours),
            component(minutes),
            component(seconds),
            inverted && !absolute,
        )
    }

    /// ISO-8601 string in UTC: `YYYY-MM-DDTHH:MM:SSZ`, with `.fff` spliced
    /// in before the `Z` when `with_milliseconds` is set.
    #[must_use]
    pub fn to_iso_string(&self, with_milliseconds: bool) -> String {
        let utc = self.instant.with_timezone(&Utc);
        if with_milliseconds {
            format!(
                "{}.{:03}Z",
                utc.format("%Y-%m-%dT%H:%M:%S"),
                self.millisecond
            )
        } else {
            format!("{}Z", utc.format("%Y-%m-%dT%H:%M:%S"))
        }
    }

    pub(crate) const fn with_millisecond(self, millisecond: u16) -> Self {
        Self {
            millisecond,
            ..self
        }
    }

    /// Rebuilds the instant from transformed display-zone wall-clock fields,
    /// keeping the offset and millisecond.
    fn with_naive_local(&self, local: NaiveDateTime) -> Self {
        let offset = self.offset();
        let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
        Self {
            instant: chrono::DateTime::from_naive_utc_and_offset(utc, offset),
            millisecond: self.millisecond,
        }
    }
}

impl fmt::Display for DateTime {
    /// Identical to [`DateTime::to_iso_string`] without milliseconds.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string(false))
    }
}

impl FromStr for DateTime {
    type Err = ClockError;

    fn from_str(s: &str) -> ClockResult<Self> {
        Self::parse(s)
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for DateTime {}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_to(other)
    }
}

impl Serialize for DateTime {
    /// Serializes as the ISO-8601 string form, not a fielded object.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Narrows a provably small non-negative component value.
fn component(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// First day of the month identified by a zero-based absolute month number.
fn first_of_month(months0: i64) -> NaiveDate {
    let year = months0.div_euclid(12);
    let month = months0.rem_euclid(12) + 1;
    let (Ok(year), Ok(month)) = (i32::try_from(year), u32::try_from(month)) else {
        panic!("date out of range")
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| panic!("date out of range"))
}

/// Month shift with day overflow rolling forward (January 31st plus one
/// month is March 2nd or 3rd), matching the host's normalization.
fn shift_months_overflowing(date: NaiveDate, months: i64) -> NaiveDate {
    let months0 = i64::from(date.year()) * 12 + i64::from(date.month0()) + months;
    first_of_month(months0) + Duration::days(i64::from(date.day()) - 1)
}

/// Month shift with the day clamped to the target month's length; used by
/// calendar diffing.
fn shift_months_clamped(datetime: NaiveDateTime, months: i64) -> NaiveDateTime {
    let months0 =
        i64::from(datetime.year()) * 12 + i64::from(datetime.month0()) + months;
    let first = first_of_month(months0);
    let day = datetime.day().min(days_in_month(first));
    let date = first + Duration::days(i64::from(day) - 1);
    NaiveDateTime::new(date, datetime.time())
}

/// Number of days in the month containing `first` (its first day).
fn days_in_month(first: NaiveDate) -> u32 {
    let next = first_of_month(i64::from(first.year()) * 12 + i64::from(first.month0()) + 1);
    component((next - first).num_days())
}
