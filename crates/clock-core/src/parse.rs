//! ISO-8601 grammars shared by the value types.
//!
//! - Date-time: `YYYY-MM-DDTHH:MM:SS[.fff](Z|±HH:MM)` — the fractional
//!   suffix is extracted literally as a millisecond count before the host
//!   parser sees the string.
//! - Duration: `P[nY][nM][nD][T[nH][nM][nS]]`, fixed component ordering.
//! - Repeating interval: `[R{n}/]{op}/{op}` with exactly one duration
//!   operand.
//! - Modifier: `[+|-]n unit`, the small relative-shift grammar accepted by
//!   `DateTime::modify`.
#![expect(
    clippy::map_err_ignore,
    reason = "Host parser error sources are folded into InvalidFormat with the offending input attached"
)]

use chrono::FixedOffset;

use crate::datetime::DateTime;
use crate::error::{ClockError, ClockResult};
use crate::interval::Interval;

/// Parses a date-time string into a whole-second instant plus the literal
/// millisecond count carried by its fractional suffix.
///
/// A trailing `Z` is rewritten to `+00:00` before the remainder is handed to
/// the host parser. The digits after the dot are taken as a literal integer,
/// so `.4` means 4 ms while `.400` means 400 ms.
///
/// ## Errors
/// Returns `InvalidFormat` when the fractional suffix is empty or exceeds
/// 999, or when the remaining string is not a valid offset date-time.
pub(crate) fn parse_datetime(s: &str) -> ClockResult<(chrono::DateTime<FixedOffset>, u16)> {
    let (stripped, millisecond) = split_millisecond(s)?;

    let normalized = match stripped.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => stripped,
    };

    let instant = chrono::DateTime::parse_from_rfc3339(&normalized)
        .map_err(|_| ClockError::InvalidFormat(format!("unrecognized date-time string: {s}")))?;

    Ok((instant, millisecond))
}

/// Extracts the `.digits` fractional suffix, returning the string without it.
///
/// The digit run is not scaled decimally; it is parsed as-is. Runs above 999
/// are rejected since sub-millisecond precision is not supported.
fn split_millisecond(s: &str) -> ClockResult<(String, u16)> {
    let Some(dot) = s.find('.') else {
        return Ok((s.to_string(), 0));
    };

    let digits: &str = &s[dot + 1..];
    let len = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if len == 0 {
        return Err(ClockError::InvalidFormat(format!(
            "empty fractional seconds in date-time string: {s}"
        )));
    }

    let millisecond = digits[..len]
        .parse::<u16>()
        .ok()
        .filter(|ms| *ms <= 999)
        .ok_or_else(|| {
            ClockError::InvalidFormat(format!(
                "fractional seconds beyond millisecond precision: {s}"
            ))
        })?;

    Ok((format!("{}{}", &s[..dot], &digits[len..]), millisecond))
}

/// Component slots of a duration string, in their mandatory order.
const DESIGNATORS: [(char, bool); 6] = [
    ('Y', false),
    ('M', false),
    ('D', false),
    ('H', true),
    ('M', true),
    ('S', true),
];

/// Parses an ISO-8601 duration: `P[nY][nM][nD][T[nH][nM][nS]]`.
///
/// Each component is optional and defaults to zero, but at least one must be
/// present, the `Y M D / H M S` ordering is fixed, and `T` is required
/// before (and only before) time components.
///
/// ## Errors
/// Returns `InvalidFormat` when the string does not match the grammar.
pub(crate) fn parse_interval(s: &str) -> ClockResult<Interval> {
    let invalid = || ClockError::InvalidFormat(format!("unrecognized ISO-8601 duration: {s}"));

    let body = s.strip_prefix('P').ok_or_else(invalid)?;

    let mut fields = [0_u32; 6];
    let mut components = 0_usize;
    let mut in_time = false;
    let mut time_components = 0_usize;
    // Index of the last designator consumed; ordering is strictly increasing.
    let mut last_slot: Option<usize> = None;
    let mut num: Option<u32> = None;

    for c in body.chars() {
        if let Some(digit) = c.to_digit(10) {
            num = Some(
                num.unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(invalid)?,
            );
        } else if c == 'T' {
            if in_time || num.is_some() {
                return Err(invalid());
            }
            in_time = true;
        } else {
            let value = num.take().ok_or_else(invalid)?;
            let slot = DESIGNATORS
                .iter()
                .position(|&(designator, time)| designator == c && time == in_time)
                .ok_or_else(invalid)?;
            if last_slot.is_some_and(|last| slot <= last) {
                return Err(invalid());
            }
            fields[slot] = value;
            last_slot = Some(slot);
            components += 1;
            if in_time {
                time_components += 1;
            }
        }
    }

    // Trailing digits, an empty spec, or a dangling T are all malformed.
    if num.is_some() || components == 0 || (in_time && time_components == 0) {
        return Err(invalid());
    }

    Ok(Interval::new(
        fields[0], fields[1], fields[2], fields[3], fields[4], fields[5],
    ))
}

/// The two supported repeating-interval shapes.
pub(crate) enum PeriodSpec {
    /// `[R{n}/]start/duration` — the count prefix is mandatory here, since
    /// nothing else bounds the sequence.
    StartDuration {
        recurrences: u64,
        start: DateTime,
        step: Interval,
    },
    /// `[R{n}/]duration/end` — the start is derived by stepping back from
    /// the end.
    DurationEnd {
        recurrences: Option<u64>,
        step: Interval,
        end: DateTime,
    },
}

/// Parses a repeating-interval string: `R{n}/{op}/{op}` or `{op}/{op}`.
///
/// Exactly one operand must be a duration (begin with `P`); it becomes the
/// period's step, wherever it is positioned.
///
/// ## Errors
/// Returns `InvalidFormat` when the string does not split into exactly two
/// operands (three parts with the `R` prefix), when no operand or both
/// operands are durations, or when an operand fails its own grammar.
pub(crate) fn parse_period(s: &str) -> ClockResult<PeriodSpec> {
    let invalid = |why: &str| ClockError::InvalidFormat(format!("{why}: {s}"));

    let mut parts: Vec<&str> = s.split('/').collect();

    let recurrences = if parts.first().is_some_and(|p| p.starts_with('R')) {
        let count = parts[0][1..]
            .parse::<u64>()
            .map_err(|_| invalid("malformed recurrence prefix in period string"))?;
        parts.remove(0);
        Some(count)
    } else {
        None
    };

    if parts.len() != 2 {
        return Err(invalid("period string must have exactly two operands"));
    }
    let (a, b) = (parts[0], parts[1]);

    match (a.starts_with('P'), b.starts_with('P')) {
        (true, true) => Err(invalid("period string allows only one duration operand")),
        (false, false) => Err(invalid("no duration operand in period string")),
        (false, true) => {
            let recurrences = recurrences
                .ok_or_else(|| invalid("start/duration period requires a recurrence prefix"))?;
            Ok(PeriodSpec::StartDuration {
                recurrences,
                start: DateTime::parse(a)?,
                step: Interval::parse(b)?,
            })
        }
        (true, false) => Ok(PeriodSpec::DurationEnd {
            recurrences,
            step: Interval::parse(a)?,
            end: DateTime::parse(b)?,
        }),
    }
}

/// Units accepted by the modifier grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModifyUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Parses a relative modifier: `[+|-]n unit` (e.g. `+1 day`, `-3 months`).
///
/// ## Errors
/// Returns `InvalidFormat` for anything outside the single-clause grammar.
pub(crate) fn parse_modifier(s: &str) -> ClockResult<(i64, ModifyUnit)> {
    let invalid = || ClockError::InvalidFormat(format!("unrecognized modifier: {s}"));

    let trimmed = s.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1_i64, rest),
        None => (1_i64, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return Err(invalid());
    }
    let amount = rest[..digits_end].parse::<i64>().map_err(|_| invalid())?;

    let unit = match rest[digits_end..].trim().to_ascii_lowercase().as_str() {
        "second" | "seconds" | "sec" | "secs" => ModifyUnit::Second,
        "minute" | "minutes" | "min" | "mins" => ModifyUnit::Minute,
        "hour" | "hours" => ModifyUnit::Hour,
        "day" | "days" => ModifyUnit::Day,
        "week" | "weeks" => ModifyUnit::Week,
        "month" | "months" => ModifyUnit::Month,
        "year" | "years" => ModifyUnit::Year,
        _ => return Err(invalid()),
    };

    Ok((sign * amount, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_suffix_is_literal() {
        let (rest, ms) = split_millisecond("2012-08-16T09:38:14.451Z").unwrap();
        assert_eq!(rest, "2012-08-16T09:38:14Z");
        assert_eq!(ms, 451);

        // `.4` is four milliseconds, not four hundred.
        let (_, ms) = split_millisecond("2012-08-16T09:38:14.4Z").unwrap();
        assert_eq!(ms, 4);
        let (_, ms) = split_millisecond("2012-08-16T09:38:14.400Z").unwrap();
        assert_eq!(ms, 400);
    }

    #[test]
    fn millisecond_suffix_before_offset() {
        let (rest, ms) = split_millisecond("2012-08-16T09:38:14.451+04:00").unwrap();
        assert_eq!(rest, "2012-08-16T09:38:14+04:00");
        assert_eq!(ms, 451);
    }

    #[test]
    fn millisecond_suffix_rejections() {
        assert!(split_millisecond("2012-08-16T09:38:14.Z").is_err());
        assert!(split_millisecond("2012-08-16T09:38:14.4512Z").is_err());
    }

    #[test]
    fn datetime_requires_an_offset() {
        assert!(parse_datetime("2012-01-01T12:12:12Z").is_ok());
        assert!(parse_datetime("2012-01-01T12:12:12+04:00").is_ok());
        assert!(parse_datetime("2012-01-01T12:12:12").is_err());
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn interval_ordering_is_fixed() {
        assert!(parse_interval("P1Y2M10DT2H30M").is_ok());
        assert!(parse_interval("P1M2Y").is_err());
        assert!(parse_interval("PT1S1M").is_err());
        assert!(parse_interval("P1S").is_err()); // seconds only after T
        assert!(parse_interval("PT1D").is_err()); // days only before T
    }

    #[test]
    fn interval_requires_a_component() {
        assert!(parse_interval("P").is_err());
        assert!(parse_interval("PT").is_err());
        assert!(parse_interval("P1YT").is_err());
        assert!(parse_interval("1Y").is_err());
        assert!(parse_interval("P1").is_err());
    }

    #[test]
    fn modifier_grammar() {
        assert_eq!(
            parse_modifier("+1 day").unwrap(),
            (1, ModifyUnit::Day)
        );
        assert_eq!(parse_modifier("-3 days").unwrap(), (-3, ModifyUnit::Day));
        assert_eq!(parse_modifier("2 weeks").unwrap(), (2, ModifyUnit::Week));
        assert_eq!(
            parse_modifier("-1 month").unwrap(),
            (-1, ModifyUnit::Month)
        );
        assert!(parse_modifier("next tuesday").is_err());
        assert!(parse_modifier("+ day").is_err());
        assert!(parse_modifier("").is_err());
    }
}
