//! Immutable, ISO-8601-aware date/time value types.
//!
//! Three cooperating value types built on top of [`chrono`]:
//! - [`Interval`]: an immutable calendar-relative duration with ISO-8601
//!   parsing, deliberately verbose formatting, and an approximate
//!   seconds conversion.
//! - [`DateTime`]: an immutable instant with a display offset and a
//!   separately stored millisecond; every mutating-looking operation
//!   returns a new value.
//! - [`Period`]: an immutable, re-iterable range of instants stepped by an
//!   interval, constructible from an ISO-8601 repeating-interval string.
//!
//! All types are plain values and safe to share across threads; the only
//! internal mutable state is `Period`'s one-time bounds memoization.
//!
//! ```
//! use clock_core::{DateTime, Period};
//!
//! let departure = DateTime::parse("2012-01-01T12:12:12+04:00")?;
//! assert_eq!(departure.to_string(), "2012-01-01T08:12:12Z");
//!
//! let schedule = Period::parse("R5/2008-03-01T13:00:00Z/P1Y2M10DT2H30M")?;
//! assert_eq!(schedule.iter().count(), 6);
//! # Ok::<(), clock_core::ClockError>(())
//! ```

pub mod clock;
pub mod datetime;
pub mod error;
pub mod interval;
mod parse;
pub mod period;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::datetime::{DateTime, DateTimeLike};
pub use crate::error::{ClockError, ClockResult};
pub use crate::interval::Interval;
pub use crate::period::Period;

/// Shortest way to build a [`DateTime`] from any date-time-like input: a
/// string, a timestamp (whole or fractional seconds), or an existing value.
///
/// ## Errors
/// Propagates `InvalidFormat` from string parsing and `InvalidArgument`
/// from timestamp conversion.
pub fn clock(input: impl Into<DateTimeLike>) -> ClockResult<DateTime> {
    DateTime::new(input, None)
}

/// The current instant, displayed in UTC; the absent-input counterpart of
/// [`clock()`].
#[must_use]
pub fn now() -> DateTime {
    DateTime::now()
}
