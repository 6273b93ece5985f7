use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use idworker::{DEFAULT_EPOCH, MAX_SEQUENCE, NodeId};

/// Which clock drives the generator.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Wall clock, re-read on every call. Backward steps fail generation.
    System,
    /// Wall clock sampled once at startup, advanced monotonically afterwards.
    Monotonic,
}

/// Runtime configuration for the `idworker-server` binary.
///
/// The node identity is fixed for the lifetime of the process. Every replica
/// sharing an ID namespace must run with a distinct `(DATACENTER_ID,
/// WORKER_ID)` pair.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "idworker-server",
    version,
    about = "An HTTP service minting Snowflake IDs for a single node"
)]
pub struct CliArgs {
    /// Datacenter half of the node identity (0-31).
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(long, env = "DATACENTER_ID", default_value_t = 0, allow_negative_numbers = true)]
    pub datacenter_id: i64,

    /// Worker half of the node identity (0-31).
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", default_value_t = 0, allow_negative_numbers = true)]
    pub worker_id: i64,

    /// Zero point of the timestamp field, in milliseconds since the Unix
    /// epoch. Changing it for an existing ID namespace breaks ordering.
    ///
    /// Environment variable: `EPOCH_MILLIS`
    #[arg(long, env = "EPOCH_MILLIS", default_value_t = DEFAULT_EPOCH.as_millis() as u64)]
    pub epoch_millis: u64,

    /// Clock implementation.
    ///
    /// Environment variable: `CLOCK`
    #[arg(long, env = "CLOCK", value_enum, default_value_t = ClockKind::System)]
    pub clock: ClockKind,

    /// Maximum number of IDs a single batch request may ask for.
    ///
    /// Environment variable: `MAX_BATCH`
    #[arg(long, env = "MAX_BATCH", default_value_t = MAX_SEQUENCE as usize + 1)]
    pub max_batch: usize,

    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub node: NodeId,
    pub epoch: Duration,
    pub clock: ClockKind,
    pub max_batch: usize,
    pub server_addr: String,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let node = NodeId::new(args.datacenter_id, args.worker_id)
            .context("invalid node identity (DATACENTER_ID / WORKER_ID)")?;

        if args.max_batch == 0 {
            bail!("MAX_BATCH must be greater than 0");
        }

        let now_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the Unix epoch")?
            .as_millis();
        if u128::from(args.epoch_millis) > now_millis {
            bail!(
                "EPOCH_MILLIS ({}) is in the future (now = {})",
                args.epoch_millis,
                now_millis
            );
        }

        Ok(Self {
            node,
            epoch: Duration::from_millis(args.epoch_millis),
            clock: args.clock,
            max_batch: args.max_batch,
            server_addr: args.server_addr,
        })
    }
}
