use crate::{
    ClockRegression, Error, IdGenStatus, IdWorker, MAX_SEQUENCE, MAX_TIMESTAMP, MonotonicClock,
    NodeId, SnowflakeId, SystemClock, TimeSource, decode, generator::worker::State,
};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::scope;

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock the test moves by hand.
struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    fn at(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Reports `first` for the first `switch_after` reads and `then` afterwards.
struct SwitchAfterReads {
    first: u64,
    then: u64,
    switch_after: u64,
    reads: AtomicU64,
}

impl SwitchAfterReads {
    fn new(first: u64, then: u64, switch_after: u64) -> Self {
        Self {
            first,
            then,
            switch_after,
            reads: AtomicU64::new(0),
        }
    }

    fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl TimeSource for SwitchAfterReads {
    fn current_millis(&self) -> u64 {
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.switch_after {
            self.first
        } else {
            self.then
        }
    }
}

trait IdGenStatusExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl IdGenStatusExt for IdGenStatus {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_until } => {
                panic!("unexpected pending (yield until: {yield_until})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_until } => yield_until,
        }
    }
}

fn thread_count() -> usize {
    num_cpus::get().clamp(2, 8)
}

#[test]
fn construction_validates_node_identity() {
    assert_eq!(
        IdWorker::new(32, 0).unwrap_err(),
        Error::InvalidDatacenterId(32)
    );
    assert_eq!(IdWorker::new(0, 32).unwrap_err(), Error::InvalidWorkerId(32));
    assert_eq!(
        IdWorker::new(-1, 0).unwrap_err(),
        Error::InvalidDatacenterId(-1)
    );
    assert_eq!(IdWorker::new(0, -1).unwrap_err(), Error::InvalidWorkerId(-1));
    assert!(IdWorker::new(i64::MAX, 0).unwrap_err().is_configuration());
    assert!(IdWorker::new(i64::MIN, 0).unwrap_err().is_configuration());

    let worker = IdWorker::new(31, 31).unwrap();
    assert_eq!(worker.datacenter_id(), 31);
    assert_eq!(worker.worker_id(), 31);
    assert_eq!(worker.node(), NodeId::new(31, 31).unwrap());
}

#[test]
fn sequence_increments_within_same_tick() {
    let worker = IdWorker::with_clock(3, 7, MockTime { millis: 42 }).unwrap();

    let id1 = worker.next_snowflake().unwrap();
    let id2 = worker.next_snowflake().unwrap();
    let id3 = worker.next_snowflake().unwrap();

    for id in [id1, id2, id3] {
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.datacenter_id(), 3);
        assert_eq!(id.worker_id(), 7);
    }
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn first_id_at_time_zero_starts_sequence_at_zero() {
    let worker = IdWorker::with_clock(0, 0, MockTime { millis: 0 }).unwrap();
    assert_eq!(worker.next_id().unwrap(), 0);
    assert_eq!(worker.next_id().unwrap(), 1);
}

#[test]
fn id_matches_reference_composition() {
    let worker = IdWorker::with_clock(5, 9, MockTime { millis: 1_000 }).unwrap();
    let id = worker.next_id().unwrap();
    assert_eq!(id, (1_000 << 22) | (5 << 17) | (9 << 12));

    let parts = decode(id);
    assert_eq!(parts.timestamp, 1_000);
    assert_eq!(parts.datacenter_id, 5);
    assert_eq!(parts.worker_id, 9);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn exhausted_millisecond_spins_until_clock_advances() {
    let per_ms = MAX_SEQUENCE + 1;
    // Three extra reads at the old millisecond force the spin loop to re-read
    // the clock before it ticks.
    let clock = SwitchAfterReads::new(42, 43, per_ms + 3);
    let worker = IdWorker::with_clock(1, 1, &clock).unwrap();

    for expected in 0..per_ms {
        let id = worker.next_snowflake().unwrap();
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.sequence(), expected);
    }
    assert_eq!(clock.reads(), per_ms);

    let id = worker.next_snowflake().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
    assert_eq!(clock.reads(), per_ms + 4);
}

#[test]
fn backward_step_while_spinning_fails_instead_of_waiting() {
    let per_ms = MAX_SEQUENCE + 1;
    // The read that finds the millisecond exhausted still reports 100; the
    // first read inside the spin reports 95.
    let clock = SwitchAfterReads::new(100, 95, per_ms + 1);
    let worker = IdWorker::with_clock(1, 1, &clock).unwrap();

    for _ in 0..per_ms {
        worker.next_id().unwrap();
    }
    let exhausted = worker.state();
    assert_eq!(
        exhausted,
        State {
            last_timestamp: Some(100),
            sequence: MAX_SEQUENCE,
        }
    );

    let err = worker.next_snowflake().unwrap_err();
    assert_eq!(
        err,
        Error::ClockMovedBackwards(ClockRegression {
            last_timestamp: 100,
            now: 95,
        })
    );
    assert_eq!(err.clock_regression().map(ClockRegression::millis), Some(5));
    // One read to find the millisecond exhausted, one inside the spin.
    assert_eq!(clock.reads(), per_ms + 2);
    assert_eq!(worker.state(), exhausted);

    // The lock was released: the next caller sees the regression too.
    assert!(worker.next_id().unwrap_err().clock_regression().is_some());
    assert!(worker.try_poll_id().unwrap_err().clock_regression().is_some());
}

#[test]
fn last_representable_millisecond_is_issued() {
    let worker = IdWorker::with_clock(31, 31, MockTime {
        millis: MAX_TIMESTAMP,
    })
    .unwrap();
    let id = worker.next_snowflake().unwrap();
    assert_eq!(id.timestamp(), MAX_TIMESTAMP);
    assert_eq!((id.datacenter_id(), id.worker_id()), (31, 31));
    assert!(id.is_valid());
}

#[test]
fn timestamp_beyond_field_width_is_refused() {
    let worker = IdWorker::with_clock(0, 0, MockTime {
        millis: MAX_TIMESTAMP + 1,
    })
    .unwrap();

    let overflow = Error::TimestampOverflow {
        timestamp: MAX_TIMESTAMP + 1,
    };
    assert_eq!(worker.next_id().unwrap_err(), overflow);
    assert_eq!(worker.try_poll_id().unwrap_err(), overflow);
    assert_eq!(worker.state(), State::default());
}

#[test]
fn exhausting_the_last_millisecond_reports_overflow() {
    let per_ms = MAX_SEQUENCE + 1;
    let clock = SwitchAfterReads::new(MAX_TIMESTAMP, MAX_TIMESTAMP + 1, per_ms + 1);
    let worker = IdWorker::with_clock(2, 3, &clock).unwrap();

    let mut last = None;
    for _ in 0..per_ms {
        let id = worker.next_snowflake().unwrap();
        assert_eq!(id.timestamp(), MAX_TIMESTAMP);
        assert!(last < Some(id));
        last = Some(id);
    }

    assert_eq!(
        worker.next_id().unwrap_err(),
        Error::TimestampOverflow {
            timestamp: MAX_TIMESTAMP + 1,
        }
    );
    assert_eq!(
        worker.state(),
        State {
            last_timestamp: Some(MAX_TIMESTAMP),
            sequence: MAX_SEQUENCE,
        }
    );
}

#[test]
fn poll_returns_pending_when_sequence_exhausted() {
    let state = State {
        last_timestamp: Some(0),
        sequence: MAX_SEQUENCE,
    };
    let node = NodeId::new(0, 0).unwrap();
    let worker = IdWorker::from_state(node, state, MockTime { millis: 0 });

    assert_eq!(worker.try_poll_id().unwrap().unwrap_pending(), 1);
    // Still pending: the exhausted attempt did not consume anything.
    assert_eq!(worker.try_poll_id().unwrap().unwrap_pending(), 1);
    assert_eq!(worker.state(), state);
}

#[test]
fn poll_resumes_after_rollover() {
    let clock = ManualClock::at(42);
    let worker = IdWorker::with_clock(0, 2, &clock).unwrap();

    for i in 0..=MAX_SEQUENCE {
        let id = worker.try_poll_id().unwrap().unwrap_ready();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
    }
    assert_eq!(worker.try_poll_id().unwrap().unwrap_pending(), 43);

    clock.set(43);
    assert_eq!(worker.clock().current_millis(), 43);

    let id = worker.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn clock_regression_fails_without_touching_state() {
    let clock = ManualClock::at(100);
    let worker = IdWorker::with_clock(1, 1, &clock).unwrap();

    let first = worker.next_snowflake().unwrap();
    assert_eq!((first.timestamp(), first.sequence()), (100, 0));
    let before = worker.state();

    clock.set(95);
    let err = worker.next_id().unwrap_err();
    assert_eq!(
        err,
        Error::ClockMovedBackwards(ClockRegression {
            last_timestamp: 100,
            now: 95,
        })
    );
    assert_eq!(err.clock_regression().map(ClockRegression::millis), Some(5));
    assert!(worker.try_poll_id().unwrap_err().clock_regression().is_some());
    assert_eq!(worker.state(), before);

    // Once the clock recovers, output continues where it left off.
    clock.set(100);
    let second = worker.next_snowflake().unwrap();
    assert_eq!((second.timestamp(), second.sequence()), (100, 1));

    clock.set(101);
    let third = worker.next_snowflake().unwrap();
    assert_eq!((third.timestamp(), third.sequence()), (101, 0));
    assert!(first < second && second < third);
}

#[test]
fn forward_jump_resets_sequence() {
    let clock = ManualClock::at(10);
    let worker = IdWorker::with_clock(0, 0, &clock).unwrap();

    worker.next_id().unwrap();
    worker.next_id().unwrap();
    clock.set(5_000);
    let id = worker.next_snowflake().unwrap();
    assert_eq!((id.timestamp(), id.sequence()), (5_000, 0));
}

#[test]
fn instances_do_not_share_state() {
    let clock = ManualClock::at(7);
    let a = IdWorker::with_clock(0, 1, &clock).unwrap();
    let b = IdWorker::with_clock(0, 2, &clock).unwrap();

    for _ in 0..10 {
        a.next_id().unwrap();
    }
    let from_b = b.next_snowflake().unwrap();
    assert_eq!(from_b.sequence(), 0);

    let from_a = a.next_snowflake().unwrap();
    assert_eq!(from_a.sequence(), 10);
    assert_ne!(from_a.to_raw(), from_b.to_raw());
}

#[test]
fn five_thousand_rapid_calls_are_unique_and_sorted() {
    let worker = IdWorker::new(1, 1).unwrap();

    let ids: Vec<u64> = (0..5_000).map(|_| worker.next_id().unwrap()).collect();

    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());

    let slots: HashSet<(u64, u64)> = ids
        .iter()
        .map(|&id| {
            let parts = decode(id);
            assert_eq!(parts.datacenter_id, 1);
            assert_eq!(parts.worker_id, 1);
            (parts.timestamp, parts.sequence)
        })
        .collect();
    assert_eq!(slots.len(), ids.len());
}

fn run_generator_monotonic<T: TimeSource>(worker: &IdWorker<T>) {
    const TOTAL_IDS: usize = 4096 * 64;

    let mut last_timestamp = 0;
    let mut sequence = 0;
    let mut last_id = None;

    for _ in 0..TOTAL_IDS {
        let id = worker.next_snowflake().unwrap();
        let ts = id.timestamp();
        if ts > last_timestamp {
            sequence = 0;
        }

        assert!(ts >= last_timestamp);
        assert!(last_id < Some(id));
        assert_eq!(id.sequence(), sequence);

        last_timestamp = ts;
        last_id = Some(id);
        sequence += 1;
    }
}

#[test]
fn system_clock_generator_is_monotonic() {
    let worker = IdWorker::with_clock(2, 3, SystemClock::default()).unwrap();
    run_generator_monotonic(&worker);
}

#[test]
fn monotonic_clock_generator_is_monotonic() {
    let worker = IdWorker::with_clock(2, 3, MonotonicClock::default()).unwrap();
    run_generator_monotonic(&worker);
}

fn run_generator_unique_threaded<T: TimeSource + Sync>(worker: &IdWorker<T>) {
    const IDS_PER_THREAD: usize = 4096 * 16;
    let threads = thread_count();
    let total = IDS_PER_THREAD * threads;

    let seen_ids = Mutex::new(HashSet::with_capacity(total));

    scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let mut local = Vec::with_capacity(IDS_PER_THREAD);
                for _ in 0..IDS_PER_THREAD {
                    local.push(worker.next_id().unwrap());
                }
                // Each thread observes its own IDs in strictly increasing
                // order since every call is serialized by the lock.
                assert!(local.windows(2).all(|w| w[0] < w[1]));
                let mut seen = seen_ids.lock().unwrap();
                for id in local {
                    assert!(seen.insert(id), "duplicate id {id}");
                }
            });
        }
    });

    let final_count = seen_ids.lock().unwrap().len();
    assert_eq!(final_count, total, "Expected {total} unique IDs");
}

#[test]
fn system_clock_generator_threaded_unique() {
    let worker = IdWorker::new(4, 5).unwrap();
    run_generator_unique_threaded(&worker);
}

#[test]
fn monotonic_clock_generator_threaded_unique() {
    let worker = IdWorker::with_clock(4, 5, MonotonicClock::default()).unwrap();
    run_generator_unique_threaded(&worker);
}

#[test]
fn threaded_callers_share_one_millisecond_without_duplicates() {
    // A frozen clock caps output at one millisecond's worth of IDs.
    let worker = IdWorker::with_clock(0, 0, MockTime { millis: 9 }).unwrap();
    let threads = thread_count();
    let per_thread = (MAX_SEQUENCE as usize + 1) / threads;

    let seen = Mutex::new(HashSet::new());
    scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..per_thread {
                    let id = worker.next_snowflake().unwrap();
                    assert!(seen.lock().unwrap().insert(id.sequence()));
                }
            });
        }
    });
    assert_eq!(seen.lock().unwrap().len(), per_thread * threads);
}
