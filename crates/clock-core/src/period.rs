//! Iterable date ranges stepped by an interval.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Serialize, Serializer};

use crate::clock::Clock;
use crate::datetime::DateTime;
use crate::error::{ClockError, ClockResult};
use crate::interval::Interval;
use crate::parse::{self, PeriodSpec};

/// How a period's sequence terminates.
#[derive(Debug, Clone, Copy)]
enum Bound {
    /// Exclusive end instant: iteration stops strictly before it.
    Until(DateTime),
    /// Recurrence count: `n + 1` instants, counting the start.
    Count(u64),
}

/// An immutable, re-iterable range of [`DateTime`] instants stepped by an
/// [`Interval`].
///
/// Iterating yields `start, start + step, start + 2·step, …`, stopping
/// strictly before the exclusive end (range form) or after `count + 1`
/// terms (recurrence form). Iteration is lazy, finite, restartable, and
/// side-effect-free apart from the one-time memoization of the produced
/// first/last pair; that cache is a [`OnceLock`], so sharing a period
/// across threads is safe.
#[derive(Debug, Clone)]
pub struct Period {
    start: DateTime,
    interval: Interval,
    bound: Bound,
    /// First and last produced instants, materialized on demand.
    bounds: OnceLock<(DateTime, DateTime)>,
}

impl Period {
    /// Builds a period from explicit boundaries. The end is **exclusive**;
    /// the named factories ([`Period::for_month`], [`Period::for_week`])
    /// apply the extra-step fix-up that makes their nominal end dates
    /// reachable.
    ///
    /// ## Errors
    /// Returns `InvalidArgument` for a zero or inverted step, which could
    /// never reach the end.
    pub fn new(start: DateTime, interval: Interval, end: DateTime) -> ClockResult<Self> {
        Self::bounded(start, interval, Bound::Until(end))
    }

    /// Builds a counted period: `recurrences + 1` instants starting at
    /// `start`.
    ///
    /// ## Errors
    /// Returns `InvalidArgument` for a zero or inverted step.
    pub fn with_recurrences(
        start: DateTime,
        interval: Interval,
        recurrences: u64,
    ) -> ClockResult<Self> {
        Self::bounded(start, interval, Bound::Count(recurrences))
    }

    /// Parses an ISO-8601 repeating-interval string: `R{n}/{op}/{op}` or
    /// `{op}/{op}`, where exactly one operand is a duration.
    ///
    /// - `R{n}/start/duration` — `n` recurrences after the start.
    /// - `[R{n}/]duration/end` — the start is derived by stepping back from
    ///   the (exclusive) end: `n + 1` steps with the prefix, one without.
    ///
    /// ## Errors
    /// Returns `InvalidFormat` when the string does not split into exactly
    /// two operands (three with the `R` prefix), has no duration operand or
    /// two of them, or an operand fails its own grammar; `InvalidArgument`
    /// for a zero step.
    pub fn parse(s: &str) -> ClockResult<Self> {
        match parse::parse_period(s)? {
            PeriodSpec::StartDuration {
                recurrences,
                start,
                step,
            } => Self::bounded(start, step, Bound::Count(recurrences)),
            PeriodSpec::DurationEnd {
                recurrences,
                step,
                end,
            } => {
                let steps_back = recurrences.map_or(1, |n| n + 1);
                let mut start = end;
                for _ in 0..steps_back {
                    start = start.sub(&step);
                }
                Self::bounded(start, step, Bound::Until(end))
            }
        }
    }

    /// Daily period covering the reference's calendar month, both the first
    /// and the last day included. Defaults to the current month.
    #[must_use]
    pub fn for_month(reference: Option<&DateTime>) -> Self {
        let reference = reference
            .copied()
            .unwrap_or_else(DateTime::now)
            .set_time(0, 0, 0)
            .with_millisecond(0);

        let year = reference.year();
        let month = month_number(&reference);
        let start = reference.set_date(year, month, 1);
        // The last day of the month advanced by one: exactly the first of
        // the next month, so the exclusive end still includes it.
        let end = reference.set_date(year, month + 1, 1);

        Self {
            start,
            interval: Interval::days(1),
            bound: Bound::Until(end),
            bounds: OnceLock::new(),
        }
    }

    /// Like [`Period::for_month`], with "now" read from an explicit
    /// [`Clock`] when no reference is given.
    #[must_use]
    pub fn for_month_with(reference: Option<&DateTime>, clock: &impl Clock) -> Self {
        let now = DateTime::now_with(clock);
        Self::for_month(Some(reference.unwrap_or(&now)))
    }

    /// Daily period covering the reference's ISO week, Monday through
    /// Sunday included. Defaults to the current week.
    #[must_use]
    pub fn for_week(reference: Option<&DateTime>) -> Self {
        let reference = reference
            .copied()
            .unwrap_or_else(DateTime::now)
            .set_time(0, 0, 0)
            .with_millisecond(0);

        // Walk back to Monday, then one extra day past Sunday for the
        // exclusive end.
        let monday = reference.sub(&Interval::days(reference.day_of_week() - 1));
        let end = monday.add(&Interval::days(7));

        Self {
            start: monday,
            interval: Interval::days(1),
            bound: Bound::Until(end),
            bounds: OnceLock::new(),
        }
    }

    /// Like [`Period::for_week`], with "now" read from an explicit
    /// [`Clock`] when no reference is given.
    #[must_use]
    pub fn for_week_with(reference: Option<&DateTime>, clock: &impl Clock) -> Self {
        let now = DateTime::now_with(clock);
        Self::for_week(Some(reference.unwrap_or(&now)))
    }

    fn bounded(start: DateTime, interval: Interval, bound: Bound) -> ClockResult<Self> {
        if interval.is_zero() {
            return Err(ClockError::InvalidArgument(
                "period step must be a non-zero interval".to_string(),
            ));
        }
        if interval.is_inverted() {
            return Err(ClockError::InvalidArgument(
                "period step must not be inverted".to_string(),
            ));
        }
        Ok(Self {
            start,
            interval,
            bound,
            bounds: OnceLock::new(),
        })
    }

    /// The first produced instant.
    #[must_use]
    pub fn start(&self) -> DateTime {
        self.materialized().0
    }

    /// The last produced instant. For a range-form period this is the last
    /// instant strictly before the exclusive end, so membership checks are
    /// end-inclusive with respect to it.
    #[must_use]
    pub fn end(&self) -> DateTime {
        self.materialized().1
    }

    /// The step captured at construction.
    #[must_use]
    pub const fn interval(&self) -> Interval {
        self.interval
    }

    /// Whether `start() <= instant <= end()`, both boundaries inclusive.
    #[must_use]
    pub fn contains(&self, instant: &DateTime) -> bool {
        self.start() <= *instant && *instant <= self.end()
    }

    /// Restartable iteration over the produced instants.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            period: self,
            next: self.start,
            index: 0,
        }
    }

    fn materialized(&self) -> (DateTime, DateTime) {
        *self.bounds.get_or_init(|| {
            let mut iter = self.iter();
            let Some(first) = iter.next() else {
                // An empty sequence pins both boundaries to the nominal start.
                return (self.start, self.start);
            };
            let last = iter.last().unwrap_or(first);
            tracing::trace!(start = %first, end = %last, "materialized period bounds");
            (first, last)
        })
    }
}

/// Lazy iterator over a period's instants.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    period: &'a Period,
    next: DateTime,
    index: u64,
}

impl Iterator for Iter<'_> {
    type Item = DateTime;

    fn next(&mut self) -> Option<DateTime> {
        match self.period.bound {
            Bound::Count(recurrences) => {
                if self.index > recurrences {
                    return None;
                }
            }
            Bound::Until(end) => {
                if self.next.compare_to(&end) != Ordering::Less {
                    return None;
                }
            }
        }

        let current = self.next;
        self.next = current.add(&self.period.interval);
        self.index += 1;
        Some(current)
    }
}

impl<'a> IntoIterator for &'a Period {
    type Item = DateTime;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl fmt::Display for Period {
    /// Formats as `{start}/{interval}/{end}` with UTC offsets rendered as
    /// `Z`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.start(), self.interval, self.end())
    }
}

impl FromStr for Period {
    type Err = ClockError;

    fn from_str(s: &str) -> ClockResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for Period {
    /// Serializes as the repeating-interval string form.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The display-zone month as a signed number for `set_date` arithmetic.
fn month_number(value: &DateTime) -> i32 {
    i32::try_from(value.month()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    #[test]
    fn repeating_interval_iteration() {
        let period = Period::parse("R5/2008-03-01T13:00:00Z/P1Y2M10DT2H30M").unwrap();
        let instants: Vec<String> = period
            .iter()
            .map(|instant| instant.to_iso_string(false))
            .collect();
        assert_eq!(
            instants,
            [
                "2008-03-01T13:00:00Z",
                "2009-05-11T15:30:00Z",
                "2010-07-21T18:00:00Z",
                "2011-10-01T20:30:00Z",
                "2012-12-11T23:00:00Z",
                "2014-02-22T01:30:00Z",
            ]
        );
    }

    #[test]
    fn repeating_interval_string_form() {
        let period = Period::parse("R5/2008-03-01T13:00:00Z/P1Y2M10DT2H30M").unwrap();
        assert_eq!(
            period.to_string(),
            "2008-03-01T13:00:00Z/P1Y2M10DT2H30M0S/2014-02-22T01:30:00Z"
        );
    }

    #[test]
    fn iteration_is_restartable() {
        let period = Period::parse("R2/2008-03-01T13:00:00Z/P1D").unwrap();
        let first: Vec<DateTime> = period.iter().collect();
        let second: Vec<DateTime> = period.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn recurrence_count_yields_one_extra_instant() {
        let start = dt("2012-01-01T00:00:00Z");
        let period = Period::with_recurrences(start, Interval::days(1), 4).unwrap();
        assert_eq!(period.iter().count(), 5);
        assert_eq!(period.start(), start);
        assert_eq!(period.end().to_string(), "2012-01-05T00:00:00Z");
    }

    #[test]
    fn raw_range_end_is_exclusive() {
        let period = Period::new(
            dt("2012-01-01T00:00:00Z"),
            Interval::days(1),
            dt("2012-01-04T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(period.iter().count(), 3);
        assert_eq!(period.end().to_string(), "2012-01-03T00:00:00Z");
    }

    #[test]
    fn empty_range_pins_bounds_to_start() {
        let start = dt("2012-01-02T00:00:00Z");
        let period = Period::new(start, Interval::days(1), dt("2012-01-01T00:00:00Z")).unwrap();
        assert_eq!(period.iter().count(), 0);
        assert_eq!(period.start(), start);
        assert_eq!(period.end(), start);
    }

    #[test]
    fn duration_end_form_steps_back_from_the_end() {
        let period = Period::parse("R2/P1D/2020-01-10T00:00:00Z").unwrap();
        let instants: Vec<String> = period
            .iter()
            .map(|instant| instant.to_iso_string(false))
            .collect();
        assert_eq!(
            instants,
            [
                "2020-01-07T00:00:00Z",
                "2020-01-08T00:00:00Z",
                "2020-01-09T00:00:00Z",
            ]
        );

        let single = Period::parse("P1D/2020-01-10T00:00:00Z").unwrap();
        assert_eq!(single.iter().count(), 1);
        assert_eq!(single.start().to_string(), "2020-01-09T00:00:00Z");
    }

    #[test]
    fn malformed_period_strings() {
        // No duration operand.
        assert!(Period::parse("2008-03-01T13:00:00Z/2009-03-01T13:00:00Z").is_err());
        // Two duration operands.
        assert!(Period::parse("R5/P1D/P2D").is_err());
        // Wrong part count.
        assert!(Period::parse("P1D").is_err());
        assert!(Period::parse("R5/2008-03-01T13:00:00Z/P1D/extra").is_err());
        // start/duration without a recurrence prefix is unbounded.
        assert!(Period::parse("2008-03-01T13:00:00Z/P1D").is_err());
        // Malformed recurrence prefix.
        assert!(Period::parse("R/2008-03-01T13:00:00Z/P1D").is_err());
    }

    #[test]
    fn zero_or_inverted_steps_are_rejected() {
        let start = dt("2012-01-01T00:00:00Z");
        let end = dt("2012-02-01T00:00:00Z");
        assert!(Period::new(start, Interval::new(0, 0, 0, 0, 0, 0), end).is_err());

        let inverted = start.diff(&end, false); // fine: not inverted
        assert!(Period::new(start, inverted, end).is_ok());
        let inverted = end.diff(&start, false);
        assert!(Period::new(start, inverted, end).is_err());
    }

    #[test]
    fn february_month_boundary() {
        let period = Period::for_month(Some(&dt("2021-02-01T00:00:00Z")));
        assert_eq!(period.start().to_string(), "2021-02-01T00:00:00Z");
        assert_eq!(period.end().to_string(), "2021-02-28T00:00:00Z");
        assert!(period.contains(&dt("2021-02-28T00:00:00Z")));
        assert!(!period.contains(&dt("2021-03-01T00:00:00Z")));
        assert_eq!(period.iter().count(), 28);
    }

    #[test]
    fn december_month_rolls_into_the_next_year() {
        let period = Period::for_month(Some(&dt("2012-12-15T10:30:00Z")));
        assert_eq!(period.start().to_string(), "2012-12-01T00:00:00Z");
        assert_eq!(period.end().to_string(), "2012-12-31T00:00:00Z");
        assert_eq!(period.iter().count(), 31);
    }

    #[test]
    fn week_runs_monday_through_sunday() {
        // 2021-02-03 is a Wednesday.
        let period = Period::for_week(Some(&dt("2021-02-03T15:00:00Z")));
        assert_eq!(period.start().to_string(), "2021-02-01T00:00:00Z");
        assert_eq!(period.end().to_string(), "2021-02-07T00:00:00Z");
        assert_eq!(period.iter().count(), 7);
        assert!(period.contains(&dt("2021-02-07T00:00:00Z")));
        assert!(!period.contains(&dt("2021-02-08T00:00:00Z")));
    }

    #[test]
    fn interval_is_captured_at_construction() {
        let period = Period::parse("R5/2008-03-01T13:00:00Z/P1Y2M10DT2H30M").unwrap();
        assert_eq!(period.interval().to_string(), "P1Y2M10DT2H30M0S");
    }

    #[test]
    fn contains_uses_instant_comparison() {
        let period = Period::for_month(Some(&dt("2021-02-01T00:00:00Z")));
        // Same instant expressed in another display zone.
        assert!(period.contains(&dt("2021-02-28T04:00:00+04:00")));
    }
}
