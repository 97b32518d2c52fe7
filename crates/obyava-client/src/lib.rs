//! # obyava-client
//!
//! The sync engines of the listings dashboard: favorites reconciliation,
//! new-listing ingestion, employee presence, scraper status and the rent
//! projection, all writing into the shared query cache. [`SyncService`]
//! wires the engines to the two WebSocket channels and owns their
//! lifecycle.

pub mod config;
pub mod favorites;
pub mod ingest;
pub mod keys;
pub mod parser;
pub mod presence;
pub mod rent;
pub mod service;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::SyncConfig;
pub use service::SyncService;
pub use state::{shared_state, ClientState, SharedState};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide tracing subscriber.
///
/// Call once from the embedding application; library code only emits.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("obyava_client=debug,obyava_net=debug,obyava_cache=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
