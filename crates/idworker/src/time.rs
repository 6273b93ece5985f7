use core::time::Duration;
use std::{
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH_MILLIS: Duration = Duration::from_millis(0);

/// Epoch used by [`IdWorker::new`]. With 41 timestamp bits it lasts until
/// roughly 2094.
///
/// [`IdWorker::new`]: crate::IdWorker::new
pub const DEFAULT_EPOCH: Duration = CUSTOM_EPOCH;

/// A source of "current milliseconds since the epoch".
///
/// Generators never read the system clock directly; they go through this
/// trait so tests can simulate forward jumps, backward jumps and millisecond
/// boundaries.
///
/// # Example
///
/// ```
/// use idworker::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The wall clock, re-read on every call.
///
/// This clock follows every adjustment of the host clock, including NTP
/// steps backwards. Readings earlier than the epoch saturate to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch_millis: u64,
}

impl Default for SystemClock {
    /// Constructs a wall clock aligned to [`DEFAULT_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(DEFAULT_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a wall clock whose zero point is `epoch`, given as a
    /// [`Duration`] since 1970-01-01 UTC.
    pub const fn with_epoch(epoch: Duration) -> Self {
        Self {
            epoch_millis: epoch.as_millis() as u64,
        }
    }

    /// The configured epoch.
    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_millis)
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A host clock set before 1970 reads as the epoch itself.
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        unix_millis.saturating_sub(self.epoch_millis)
    }
}

/// A clock that samples the wall clock once and advances with [`Instant`]
/// afterwards.
///
/// It never moves backwards, so generators driven by it cannot observe a
/// clock regression. The trade-off is drift: host clock corrections made
/// after construction are ignored.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    offset_millis: u64,
    epoch_millis: u64,
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to [`DEFAULT_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(DEFAULT_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using `epoch` as the origin (t = 0),
    /// specified as a [`Duration`] since 1970-01-01 UTC.
    ///
    /// If the host clock is earlier than `epoch` the clock starts at zero.
    pub fn with_epoch(epoch: Duration) -> Self {
        let start = Instant::now();
        let offset_millis = SystemClock::with_epoch(epoch).current_millis();
        Self {
            start,
            offset_millis,
            epoch_millis: epoch.as_millis() as u64,
        }
    }

    /// The configured epoch.
    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_millis)
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.offset_millis + self.start.elapsed().as_millis() as u64
    }
}
