use crate::SnowflakeId;

/// Represents the result of a non-blocking generation attempt.
///
/// This type models the outcome of [`IdWorker::try_poll_id`]:
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means the sequence for the current millisecond is
///   exhausted and no ID can be produced until the clock reaches `yield_until`.
///
/// This allows async callers to back off (sleep or yield) instead of spinning
/// inside the generator.
///
/// # Example
///
/// ```
/// use idworker::{IdGenStatus, IdWorker, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let worker = IdWorker::with_clock(0, 1, FixedTime).unwrap();
/// match worker.try_poll_id().unwrap() {
///     IdGenStatus::Ready { id } => println!("ID: {}", id.timestamp()),
///     IdGenStatus::Pending { yield_until } => println!("Back off until: {yield_until}"),
/// }
/// ```
///
/// [`IdWorker::try_poll_id`]: crate::IdWorker::try_poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated because the sequence has been exhausted for the
    /// current millisecond.
    Pending {
        /// The first timestamp (inclusive, ms since the epoch) at which
        /// generation can resume.
        yield_until: u64,
    },
}
