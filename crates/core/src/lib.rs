#![deny(missing_docs)]
//! Module proxy fetch orchestration.
//!
//! Wires storage, upstream, the stasher chain and the protocol
//! orchestrator together, and provides the path filter consulted in
//! front of them.

use modproxy_api::{builder::Builder, config::Config};

/// Construct a default builder.
///
/// - `storage` - The default storage is [factories::MemStorageFactory].
/// - `upstream` - The default upstream is
///   [factories::OfflineUpstreamFactory], swap it for one that can reach
///   a real upstream.
/// - `stasher` - The default stasher is [factories::CoreStasherFactory].
/// - `protocol` - The default protocol is [factories::CoreProtocolFactory].
pub fn default_builder() -> Builder {
    Builder {
        config: Config::default(),
        storage: factories::MemStorageFactory::create(),
        upstream: factories::OfflineUpstreamFactory::create(),
        stasher: factories::CoreStasherFactory::create(),
        protocol: factories::CoreProtocolFactory::create(),
    }
}

pub mod factories;
pub mod filter;
pub mod worker_pool;
