//! # Logging
//!
//! Events and spans are written to stdout through `tracing_subscriber::fmt`.
//! Verbosity follows `RUST_LOG` and defaults to `info`.
//!
//! ```bash
//! RUST_LOG=idworker=debug,idworker_server=debug cargo run
//! ```
//!
//! Request handlers are instrumented at `debug`. Clock regressions surface
//! as `warn` events from both the generator and the HTTP layer.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
