use core::fmt;

use crate::id::{MAX_DATACENTER_ID, MAX_TIMESTAMP, MAX_WORKER_ID, TIMESTAMP_BITS};

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `idworker` can produce.
///
/// Configuration errors ([`Error::InvalidDatacenterId`],
/// [`Error::InvalidWorkerId`]) only surface from constructors and should stop
/// the host from serving traffic. [`Error::ClockMovedBackwards`] and
/// [`Error::TimestampOverflow`] are per call: the ID was not produced and the
/// generator state is untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The datacenter ID is negative or wider than its 5-bit field.
    #[error("datacenter id {0} is out of range (expected 0..={max})", max = MAX_DATACENTER_ID)]
    InvalidDatacenterId(i64),

    /// The worker ID is negative or wider than its 5-bit field.
    #[error("worker id {0} is out of range (expected 0..={max})", max = MAX_WORKER_ID)]
    InvalidWorkerId(i64),

    /// The clock reported a time earlier than the last issued timestamp.
    #[error(transparent)]
    ClockMovedBackwards(#[from] ClockRegression),

    /// The clock reading no longer fits the timestamp field. Every later
    /// reading fails the same way; the epoch must be moved forward.
    #[error(
        "clock reads {timestamp}ms past the epoch, beyond the {bits}-bit timestamp limit of {max}ms",
        bits = TIMESTAMP_BITS,
        max = MAX_TIMESTAMP
    )]
    TimestampOverflow { timestamp: u64 },
}

impl Error {
    /// Returns `true` for errors raised while validating the node identity.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidDatacenterId(_) | Self::InvalidWorkerId(_)
        )
    }

    /// Returns the regression details if the clock moved backwards.
    pub const fn clock_regression(&self) -> Option<&ClockRegression> {
        match self {
            Self::ClockMovedBackwards(regression) => Some(regression),
            _ => None,
        }
    }
}

/// A backward step of the clock observed by a generator.
///
/// Both timestamps are milliseconds since the generator's epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClockRegression {
    /// Timestamp of the most recently issued ID.
    pub last_timestamp: u64,
    /// What the clock reported on the failed call.
    pub now: u64,
}

impl ClockRegression {
    /// How far the clock moved backwards, in milliseconds.
    pub const fn millis(&self) -> u64 {
        self.last_timestamp.saturating_sub(self.now)
    }
}

impl fmt::Display for ClockRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clock moved backwards by {}ms (last id at {}, clock reads {}); refusing to generate ids",
            self.millis(),
            self.last_timestamp,
            self.now
        )
    }
}

impl core::error::Error for ClockRegression {}

/// Errors from parsing a [`SnowflakeId`] out of text.
///
/// [`SnowflakeId`]: crate::SnowflakeId
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseIdError {
    /// The input is not a base-10 unsigned 64-bit integer.
    #[error("invalid id: {0}")]
    InvalidDigits(#[from] core::num::ParseIntError),

    /// The value sets the reserved high bit and cannot have been generated.
    #[error("invalid id {0}: reserved bit is set")]
    ReservedBitSet(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(Error::InvalidDatacenterId(32).is_configuration());
        assert!(Error::InvalidWorkerId(-1).is_configuration());

        let err = Error::from(ClockRegression {
            last_timestamp: 10,
            now: 5,
        });
        assert!(!err.is_configuration());
        assert_eq!(err.clock_regression().map(ClockRegression::millis), Some(5));
    }

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            Error::InvalidDatacenterId(32).to_string(),
            "datacenter id 32 is out of range (expected 0..=31)"
        );
        assert_eq!(
            Error::InvalidWorkerId(-1).to_string(),
            "worker id -1 is out of range (expected 0..=31)"
        );
        let err = Error::from(ClockRegression {
            last_timestamp: 1_000,
            now: 995,
        });
        assert!(err.to_string().starts_with("clock moved backwards by 5ms"));
    }

    #[test]
    fn timestamp_overflow_is_neither_configuration_nor_regression() {
        let err = Error::TimestampOverflow {
            timestamp: MAX_TIMESTAMP + 1,
        };
        assert!(!err.is_configuration());
        assert!(err.clock_regression().is_none());
        assert_eq!(
            err.to_string(),
            "clock reads 2199023255552ms past the epoch, beyond the 41-bit timestamp limit of 2199023255551ms"
        );
    }
}
