//! ISO-8601 duration values.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{ClockError, ClockResult};
use crate::parse;

/// An immutable, calendar-relative duration.
///
/// Components are year/month/day/hour/minute/second magnitudes plus an
/// `inverted` sign flag (set by [`DateTime::diff`] when the other operand is
/// earlier). Months and years have variable length, so an `Interval` is not
/// a fixed count of seconds; see [`Interval::to_seconds`] for the documented
/// approximation.
///
/// [`DateTime::diff`]: crate::DateTime::diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    years: u32,
    months: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
    inverted: bool,
}

impl Interval {
    /// Builds an interval from explicit component magnitudes.
    #[must_use]
    pub const fn new(
        years: u32,
        months: u32,
        days: u32,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Self {
        Self {
            years,
            months,
            days,
            hours,
            minutes,
            seconds,
            inverted: false,
        }
    }

    /// A whole-day interval (`PnD`).
    #[must_use]
    pub const fn days(days: u32) -> Self {
        Self::new(0, 0, days, 0, 0, 0)
    }

    pub(crate) const fn from_parts(
        years: u32,
        months: u32,
        days: u32,
        hours: u32,
        minutes: u32,
        seconds: u32,
        inverted: bool,
    ) -> Self {
        Self {
            years,
            months,
            days,
            hours,
            minutes,
            seconds,
            inverted,
        }
    }

    /// Parses an ISO-8601 duration string, e.g. `P1Y2M10DT2H30M`.
    ///
    /// Each component is optional (defaulting to zero) but at least one is
    /// required; ordering is fixed and `T` must precede any time component.
    ///
    /// ## Errors
    /// Returns `InvalidFormat` when the string does not match the grammar.
    pub fn parse(s: &str) -> ClockResult<Self> {
        parse::parse_interval(s)
    }

    #[must_use]
    pub const fn years(&self) -> u32 {
        self.years
    }

    #[must_use]
    pub const fn months(&self) -> u32 {
        self.months
    }

    #[must_use]
    pub const fn days_component(&self) -> u32 {
        self.days
    }

    #[must_use]
    pub const fn hours(&self) -> u32 {
        self.hours
    }

    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.minutes
    }

    #[must_use]
    pub const fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Whether this interval points backwards in time.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Whether every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0
    }

    /// Approximate magnitude of this interval in seconds.
    ///
    /// Calendar-naive by contract: a year counts as 365 days and a month as
    /// 30 days, and the sign flag is ignored. Callers needing calendar-exact
    /// arithmetic must not use this for month- or year-scale intervals; use
    /// [`DateTime::add`] instead.
    ///
    /// [`DateTime::add`]: crate::DateTime::add
    #[must_use]
    pub fn to_seconds(&self) -> i64 {
        i64::from(self.years) * 365 * 86_400
            + i64::from(self.months) * 30 * 86_400
            + i64::from(self.days) * 86_400
            + i64::from(self.hours) * 3_600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds)
    }
}

impl fmt::Display for Interval {
    /// Formats as `P{y}Y{m}M{d}DT{h}H{i}M{s}S`, always emitting all six
    /// components. Deliberately verbose rather than ISO-minimal: `P1Y`
    /// round-trips as `P1Y0M0DT0H0M0S`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{}Y{}M{}DT{}H{}M{}S",
            self.years, self.months, self.days, self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for Interval {
    type Err = ClockError;

    fn from_str(s: &str) -> ClockResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for Interval {
    /// Serializes as the ISO-8601 duration string, not a fielded object.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_duration() {
        let interval = Interval::parse("P1Y2M10DT2H30M").unwrap();
        assert_eq!(interval.years(), 1);
        assert_eq!(interval.months(), 2);
        assert_eq!(interval.days_component(), 10);
        assert_eq!(interval.hours(), 2);
        assert_eq!(interval.minutes(), 30);
        assert_eq!(interval.seconds(), 0);
        assert!(!interval.is_inverted());
    }

    #[test]
    fn absent_components_default_to_zero() {
        let interval = Interval::parse("PT90S").unwrap();
        assert_eq!(interval.years(), 0);
        assert_eq!(interval.seconds(), 90);
    }

    #[test]
    fn formats_all_six_components() {
        assert_eq!(Interval::parse("P1Y").unwrap().to_string(), "P1Y0M0DT0H0M0S");
        assert_eq!(
            Interval::parse("P1Y2M10DT2H30M").unwrap().to_string(),
            "P1Y2M10DT2H30M0S"
        );
    }

    #[test]
    fn format_round_trips() {
        let interval = Interval::parse("P3Y6M4DT12H30M5S").unwrap();
        assert_eq!(Interval::parse(&interval.to_string()).unwrap(), interval);
    }

    #[test]
    fn to_seconds_is_a_fixed_approximation() {
        assert_eq!(Interval::parse("P1Y").unwrap().to_seconds(), 31_536_000);
        assert_eq!(Interval::parse("P1M").unwrap().to_seconds(), 2_592_000);
        assert_eq!(Interval::parse("P1D").unwrap().to_seconds(), 86_400);
        assert_eq!(Interval::parse("PT1H30M5S").unwrap().to_seconds(), 5_405);
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(Interval::parse("").is_err());
        assert!(Interval::parse("P").is_err());
        assert!(Interval::parse("1Y2M").is_err());
        assert!(Interval::parse("P1H").is_err());
        assert!(Interval::parse("P1Y2M3X").is_err());
    }

    #[test]
    fn from_str_matches_parse() {
        let parsed: Interval = "P1DT12H".parse().unwrap();
        assert_eq!(parsed, Interval::parse("P1DT12H").unwrap());
    }
}
