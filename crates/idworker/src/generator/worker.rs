use core::cmp::Ordering;

use parking_lot::Mutex;

use crate::{
    error::{ClockRegression, Error, Result},
    generator::NodeId,
    id::{MAX_SEQUENCE, MAX_TIMESTAMP, SnowflakeId},
    status::IdGenStatus,
    time::{SystemClock, TimeSource},
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The `(last_timestamp, sequence)` pair lives behind a single mutex. Every
/// call reads the clock and updates the pair inside one critical section that
/// does nothing but integer arithmetic, so concurrent callers are serialized
/// and each receives a distinct `(timestamp, sequence)` slot.
///
/// ## Clock handling
/// - Same millisecond: the sequence is incremented. Once all 4096 slots are
///   used, [`IdWorker::next_id`] spins on the clock until the next
///   millisecond.
/// - Later millisecond: the sequence restarts at zero.
/// - Earlier millisecond: the call fails with
///   [`Error::ClockMovedBackwards`] and the state is left untouched. This
///   includes a backward step observed while spinning for the next
///   millisecond; a regression is never waited out.
/// - A reading wider than the 41-bit timestamp field fails with
///   [`Error::TimestampOverflow`] instead of wrapping.
///
/// Share one instance across threads with an [`Arc`](std::sync::Arc).
/// Separate instances have separate state.
#[derive(Debug)]
pub struct IdWorker<T = SystemClock>
where
    T: TimeSource,
{
    node: NodeId,
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<State>,
    time: T,
}

impl IdWorker<SystemClock> {
    /// Creates a generator for the given node, driven by the wall clock
    /// anchored at [`DEFAULT_EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either ID is outside `0..=31`. See
    /// [`NodeId::new`].
    ///
    /// # Example
    ///
    /// ```
    /// use idworker::IdWorker;
    ///
    /// let worker = IdWorker::new(31, 31).unwrap();
    /// assert!(IdWorker::new(32, 0).unwrap_err().is_configuration());
    ///
    /// let a = worker.next_id().unwrap();
    /// let b = worker.next_id().unwrap();
    /// assert!(a < b);
    /// ```
    ///
    /// [`DEFAULT_EPOCH`]: crate::DEFAULT_EPOCH
    pub fn new(datacenter_id: i64, worker_id: i64) -> Result<Self> {
        Self::with_clock(datacenter_id, worker_id, SystemClock::default())
    }
}

impl<T> IdWorker<T>
where
    T: TimeSource,
{
    /// Creates a generator for the given node that reads time from `time`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either ID is outside `0..=31`.
    pub fn with_clock(datacenter_id: i64, worker_id: i64, time: T) -> Result<Self> {
        let node = NodeId::new(datacenter_id, worker_id)?;
        Ok(Self::from_node(node, time))
    }

    /// Creates a generator for an already validated node identity.
    pub fn from_node(node: NodeId, time: T) -> Self {
        Self::from_state(node, State::default(), time)
    }

    pub(crate) fn from_state(node: NodeId, state: State, time: T) -> Self {
        Self {
            node,
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            time,
        }
    }

    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.node.datacenter_id()
    }

    pub const fn worker_id(&self) -> u64 {
        self.node.worker_id()
    }

    /// The clock this generator reads.
    pub const fn clock(&self) -> &T {
        &self.time
    }

    /// Generates the next ID as a raw `u64`.
    ///
    /// Blocks (by spinning on the clock) only when 4096 IDs have already been
    /// issued in the current millisecond.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockMovedBackwards`] if the clock reads earlier than
    /// the timestamp of the last issued ID, whether on entry or while waiting
    /// for the next millisecond. No ID is consumed; retrying before the clock
    /// catches up fails the same way.
    ///
    /// Returns [`Error::TimestampOverflow`] once the clock passes
    /// [`MAX_TIMESTAMP`](crate::MAX_TIMESTAMP) milliseconds after the epoch.
    pub fn next_id(&self) -> Result<u64> {
        self.next_snowflake().map(|id| id.to_raw())
    }

    /// Generates the next ID as a [`SnowflakeId`].
    ///
    /// # Errors
    ///
    /// See [`IdWorker::next_id`].
    pub fn next_snowflake(&self) -> Result<SnowflakeId> {
        let outcome = {
            let mut state = self.state.lock();
            let mut now = self.time.current_millis();
            loop {
                match state.advance(now, self.node) {
                    Ok(Step::Issued(id)) => break Ok(id),
                    Ok(Step::Exhausted { yield_until }) => match self.spin_until(yield_until) {
                        Ok(later) => now = later,
                        Err(regression) => break Err(regression.into()),
                    },
                    Err(err) => break Err(err),
                }
            }
        };
        outcome.map_err(Self::cold_refused)
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// Returns [`IdGenStatus::Pending`] instead of spinning when the current
    /// millisecond is exhausted; the state is not modified in that case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockMovedBackwards`] on clock regression and
    /// [`Error::TimestampOverflow`] past the end of the timestamp range.
    ///
    /// # Example
    ///
    /// ```
    /// use idworker::{IdGenStatus, IdWorker};
    ///
    /// let worker = IdWorker::new(0, 1).unwrap();
    ///
    /// let id = loop {
    ///     match worker.try_poll_id() {
    ///         Ok(IdGenStatus::Ready { id }) => break id,
    ///         Ok(IdGenStatus::Pending { .. }) => std::thread::yield_now(),
    ///         Err(e) => panic!("Generator error: {e}"),
    ///     }
    /// };
    /// assert_eq!(id.worker_id(), 1);
    /// ```
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let step = {
            let mut state = self.state.lock();
            let now = self.time.current_millis();
            state.advance(now, self.node)
        };
        match step {
            Ok(Step::Issued(id)) => Ok(IdGenStatus::Ready { id }),
            Ok(Step::Exhausted { yield_until }) => Ok(IdGenStatus::Pending { yield_until }),
            Err(err) => Err(Self::cold_refused(err)),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> State {
        *self.state.lock()
    }

    /// Re-reads the clock until it reaches `yield_until`, the millisecond
    /// after the exhausted one. Bails out as soon as the clock reads earlier
    /// than the exhausted millisecond.
    fn spin_until(&self, yield_until: u64) -> core::result::Result<u64, ClockRegression> {
        let last_timestamp = yield_until - 1;
        loop {
            core::hint::spin_loop();
            let now = self.time.current_millis();
            if now >= yield_until {
                return Ok(now);
            }
            if now < last_timestamp {
                return Err(ClockRegression {
                    last_timestamp,
                    now,
                });
            }
        }
    }

    // Runs after the lock is released.
    #[cold]
    #[inline(never)]
    fn cold_refused(err: Error) -> Error {
        #[cfg(feature = "tracing")]
        {
            match &err {
                Error::ClockMovedBackwards(regression) => tracing::warn!(
                    last_timestamp = regression.last_timestamp,
                    now = regression.now,
                    regression_ms = regression.millis(),
                    "clock moved backwards; refusing to generate id"
                ),
                Error::TimestampOverflow { timestamp } => tracing::error!(
                    timestamp = *timestamp,
                    "clock is past the end of the timestamp range; refusing to generate id"
                ),
                _ => {}
            }
        }
        err
    }
}

/// Mutable generator state. `last_timestamp` is `None` until the first ID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct State {
    pub(crate) last_timestamp: Option<u64>,
    pub(crate) sequence: u64,
}

pub(crate) enum Step {
    Issued(SnowflakeId),
    Exhausted { yield_until: u64 },
}

impl State {
    /// Applies one clock reading. Only an issued ID modifies the state.
    fn advance(&mut self, now: u64, node: NodeId) -> Result<Step> {
        if now > MAX_TIMESTAMP {
            return Err(Error::TimestampOverflow { timestamp: now });
        }

        let Some(last_timestamp) = self.last_timestamp else {
            return Ok(self.rollover(now, node));
        };

        match now.cmp(&last_timestamp) {
            Ordering::Greater => Ok(self.rollover(now, node)),
            Ordering::Equal if self.sequence < MAX_SEQUENCE => {
                self.sequence += 1;
                Ok(Step::Issued(node.compose(now, self.sequence)))
            }
            Ordering::Equal => Ok(Step::Exhausted {
                yield_until: last_timestamp + 1,
            }),
            Ordering::Less => Err(ClockRegression {
                last_timestamp,
                now,
            }
            .into()),
        }
    }

    fn rollover(&mut self, now: u64, node: NodeId) -> Step {
        self.last_timestamp = Some(now);
        self.sequence = 0;
        Step::Issued(node.compose(now, 0))
    }
}
