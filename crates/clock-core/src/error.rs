use thiserror::Error;

/// Construction errors for the clock value types.
///
/// Both kinds are unrecoverable at the point of construction: no partial
/// value is produced and the caller must handle or propagate the error.
/// Arithmetic on already-constructed values never fails; out-of-range
/// components normalize silently instead (day 32 rolls into the next month).
#[derive(Error, Debug)]
pub enum ClockError {
    /// Input of the right shape but an unusable value, e.g. a non-finite
    /// float timestamp or a timestamp outside the host calendar range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A string input that does not match the expected ISO-8601 date-time,
    /// duration, or repeating-interval grammar.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

pub type ClockResult<T> = std::result::Result<T, ClockError>;
