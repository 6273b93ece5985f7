use crate::{
    error::{Error, Result},
    id::{MAX_DATACENTER_ID, MAX_WORKER_ID, SnowflakeId},
};

/// The validated identity of a generating node: a datacenter ID and a worker
/// ID, each in `0..=31`.
///
/// Two generators with different `NodeId`s never produce the same ID, no
/// matter how their clocks line up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    datacenter_id: u64,
    worker_id: u64,
}

impl NodeId {
    /// Validates a datacenter/worker pair.
    ///
    /// Inputs are signed so that values read from configuration can be
    /// rejected rather than silently wrapped.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDatacenterId`] if `datacenter_id` is outside `0..=31`
    /// - [`Error::InvalidWorkerId`] if `worker_id` is outside `0..=31`
    ///
    /// # Example
    ///
    /// ```
    /// use idworker::{Error, NodeId};
    ///
    /// assert!(NodeId::new(31, 31).is_ok());
    /// assert_eq!(NodeId::new(32, 0), Err(Error::InvalidDatacenterId(32)));
    /// assert_eq!(NodeId::new(0, -1), Err(Error::InvalidWorkerId(-1)));
    /// ```
    pub fn new(datacenter_id: i64, worker_id: i64) -> Result<Self> {
        let datacenter_id = u64::try_from(datacenter_id)
            .ok()
            .filter(|&id| id <= MAX_DATACENTER_ID)
            .ok_or(Error::InvalidDatacenterId(datacenter_id))?;
        let worker_id = u64::try_from(worker_id)
            .ok()
            .filter(|&id| id <= MAX_WORKER_ID)
            .ok_or(Error::InvalidWorkerId(worker_id))?;
        Ok(Self {
            datacenter_id,
            worker_id,
        })
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub(crate) fn compose(&self, timestamp: u64, sequence: u64) -> SnowflakeId {
        SnowflakeId::from_components(timestamp, self.datacenter_id, self.worker_id, sequence)
    }
}

impl TryFrom<(i64, i64)> for NodeId {
    type Error = Error;

    fn try_from((datacenter_id, worker_id): (i64, i64)) -> Result<Self> {
        Self::new(datacenter_id, worker_id)
    }
}
