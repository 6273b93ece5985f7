use std::time::Duration;

use idworker::{IdWorker, MonotonicClock, SystemClock, TimeSource};

use crate::server::config::{ClockKind, ServerConfig};

/// Clock implementation selected at startup.
///
/// This controls how timestamps are embedded into generated IDs.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    System(SystemClock),
    Monotonic(MonotonicClock),
}

impl Clock {
    pub fn new(kind: ClockKind, epoch: Duration) -> Self {
        match kind {
            ClockKind::System => Self::System(SystemClock::with_epoch(epoch)),
            ClockKind::Monotonic => Self::Monotonic(MonotonicClock::with_epoch(epoch)),
        }
    }
}

impl TimeSource for Clock {
    fn current_millis(&self) -> u64 {
        match self {
            Self::System(clock) => clock.current_millis(),
            Self::Monotonic(clock) => clock.current_millis(),
        }
    }
}

/// The process-wide generator. One instance per process; request handlers
/// share it through an `Arc`.
pub type Generator = IdWorker<Clock>;

pub fn build_generator(config: &ServerConfig) -> Generator {
    IdWorker::from_node(config.node, Clock::new(config.clock, config.epoch))
}
