//! Snowflake-style unique ID generation for a single node.
//!
//! An [`IdWorker`] hands out 64-bit identifiers composed of a millisecond
//! timestamp, a fixed node identity ([`NodeId`]: datacenter + worker) and a
//! per-millisecond sequence:
//!
//! ```text
//!  Bit Index:  63           63 62            22 21               17 16           12 11             0
//!              +--------------+----------------+-------------------+---------------+---------------+
//!  Field:      | reserved (1) | timestamp (41) | datacenter ID (5) | worker ID (5) | sequence (12) |
//!              +--------------+----------------+-------------------+---------------+---------------+
//! ```
//!
//! ```
//! use idworker::{IdWorker, decode};
//!
//! let worker = IdWorker::new(1, 1).unwrap();
//! let id = worker.next_id().unwrap();
//!
//! let parts = decode(id);
//! assert_eq!(parts.datacenter_id, 1);
//! assert_eq!(parts.worker_id, 1);
//! ```
mod error;
mod generator;
mod id;
mod status;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::status::*;
pub use crate::time::*;
