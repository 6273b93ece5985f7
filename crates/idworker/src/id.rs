use core::{fmt, str::FromStr, time::Duration};

use crate::error::ParseIdError;

/// Width of the timestamp field in bits.
pub const TIMESTAMP_BITS: u32 = 41;
/// Width of the datacenter ID field in bits.
pub const DATACENTER_ID_BITS: u32 = 5;
/// Width of the worker ID field in bits.
pub const WORKER_ID_BITS: u32 = 5;
/// Width of the sequence field in bits.
pub const SEQUENCE_BITS: u32 = 12;

/// Largest timestamp (milliseconds since the epoch) an ID can carry.
pub const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;
/// Largest valid datacenter ID (31).
pub const MAX_DATACENTER_ID: u64 = (1 << DATACENTER_ID_BITS) - 1;
/// Largest valid worker ID (31).
pub const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;
/// Largest sequence value within a single millisecond (4095).
pub const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// A 64-bit Snowflake ID with a split node identity.
///
/// - 1 bit reserved (always zero)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21               17 16           12 11             0
///              +--------------+----------------+-------------------+---------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter ID (5) | worker ID (5) | sequence (12) |
///              +--------------+----------------+-------------------+---------------+---------------+
///              |<------------------------- MSB ------- 64 bits ------- LSB ------------------------>|
/// ```
///
/// Ordering of `SnowflakeId` values follows the raw integer, so IDs sort by
/// timestamp first and sequence last.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Bitmask for the 41-bit timestamp field. Occupies bits 22 through 62.
    pub const TIMESTAMP_MASK: u64 = MAX_TIMESTAMP;

    /// Bitmask for the 5-bit datacenter ID field. Occupies bits 17 through 21.
    pub const DATACENTER_ID_MASK: u64 = MAX_DATACENTER_ID;

    /// Bitmask for the 5-bit worker ID field. Occupies bits 12 through 16.
    pub const WORKER_ID_MASK: u64 = MAX_WORKER_ID;

    /// Bitmask for the 12-bit sequence field. Occupies bits 0 through 11.
    pub const SEQUENCE_MASK: u64 = MAX_SEQUENCE;

    /// Number of bits to shift the timestamp to its position (bit 22).
    pub const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

    /// Number of bits to shift the datacenter ID to its position (bit 17).
    pub const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;

    /// Number of bits to shift the worker ID to its position (bit 12).
    pub const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u32 = 0;

    /// Packs the four fields into an ID. Each value is masked to its field
    /// width, so out-of-range input never bleeds into a neighbouring field.
    pub const fn from(timestamp: u64, datacenter_id: u64, worker_id: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id = (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Same as [`SnowflakeId::from`], asserting in debug builds that every
    /// field fits its width.
    pub fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(
            datacenter_id <= Self::DATACENTER_ID_MASK,
            "datacenter_id overflow"
        );
        debug_assert!(worker_id <= Self::WORKER_ID_MASK, "worker_id overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from(timestamp, datacenter_id, worker_id, sequence)
    }

    /// Wraps a raw integer without validation.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the raw integer.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Extracts the timestamp from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns `true` if the reserved high bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >> 63 == 0
    }

    /// Splits the ID into its fields.
    pub const fn parts(&self) -> IdParts {
        IdParts {
            timestamp: self.timestamp(),
            datacenter_id: self.datacenter_id(),
            worker_id: self.worker_id(),
            sequence: self.sequence(),
        }
    }

    /// Converts the timestamp field back to milliseconds since the Unix epoch,
    /// given the epoch the generating clock was anchored to.
    pub const fn unix_millis(&self, epoch: Duration) -> u64 {
        epoch.as_millis() as u64 + self.timestamp()
    }

    /// Returns the ID as a zero-padded 20-digit string.
    ///
    /// Padded strings sort lexicographically in the same order as the IDs.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl FromStr for SnowflakeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s.parse()?;
        let id = Self::from_raw(raw);
        if !id.is_valid() {
            return Err(ParseIdError::ReservedBitSet(raw));
        }
        Ok(id)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("timestamp", TIMESTAMP_BITS, self.timestamp()),
            ("datacenter", DATACENTER_ID_BITS, self.datacenter_id()),
            ("worker", WORKER_ID_BITS, self.worker_id()),
            ("sequence", SEQUENCE_BITS, self.sequence()),
        ];

        writeln!(f, "SnowflakeId {{")?;
        writeln!(f, "    raw id     : 0x{:016x} ({})", self.id, self.id)?;
        for (name, bits, value) in fields {
            let label = format!("{name} ({bits})");
            writeln!(f, "    {label:<16}: {value:>13} (0x{value:x})")?;
        }
        write!(f, "}}")
    }
}

/// The decoded fields of a [`SnowflakeId`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdParts {
    /// Milliseconds since the generator's epoch.
    pub timestamp: u64,
    /// Datacenter half of the node identity.
    pub datacenter_id: u64,
    /// Worker half of the node identity.
    pub worker_id: u64,
    /// Position within the millisecond.
    pub sequence: u64,
}

/// Packs `parts` into a raw ID.
///
/// Fields wider than their bit allotment are masked; [`decode`] therefore
/// round-trips any `parts` whose fields are within range.
pub const fn encode(parts: IdParts) -> u64 {
    SnowflakeId::from(
        parts.timestamp,
        parts.datacenter_id,
        parts.worker_id,
        parts.sequence,
    )
    .to_raw()
}

/// Splits a raw ID into its fields. Pure; never fails.
pub const fn decode(id: u64) -> IdParts {
    SnowflakeId::from_raw(id).parts()
}
