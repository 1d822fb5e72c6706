//! Stash is the module proxy component that makes sure a module version is
//! in storage, fetching it from upstream if needed.
//!
//! It consists of three stashers, each wrapping the next:
//!
//! - [DedupStasher] collapses concurrent stashes of the same module version
//!   into a single call of the stasher it wraps, handing the one outcome
//!   to every caller.
//! - [PooledStasher] runs the stasher it wraps on a [WorkerPool], so only a
//!   bounded number of stashes hit upstream and storage at once.
//! - [BasicStasher] checks storage, fetches from upstream and saves.
//!
//! Deduplication sits outermost so that duplicate requests collapse before
//! they consume a pool slot.

use crate::worker_pool::WorkerPool;
use modproxy_api::*;
use std::sync::Arc;

mod basic;
pub use basic::*;

mod dedup;
pub use dedup::*;

mod pooled;
pub use pooled::*;

/// CoreStash configuration types.
pub mod config {
    /// Configuration parameters for [CoreStasherFactory](super::CoreStasherFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoreStashConfig {
        /// How many stashes may run at once. Zero disables the pool.
        /// Default: 10.
        #[serde(default = "default_pool_size")]
        pub pool_size: u32,

        /// How long a single stash may take, in seconds, before it is
        /// abandoned. This is independent of how long any caller waits.
        /// Default: 300.
        #[serde(default = "default_timeout_s")]
        pub timeout_s: u32,
    }

    fn default_pool_size() -> u32 {
        10
    }

    fn default_timeout_s() -> u32 {
        300
    }

    impl Default for CoreStashConfig {
        fn default() -> Self {
            Self {
                pool_size: default_pool_size(),
                timeout_s: default_timeout_s(),
            }
        }
    }

    impl CoreStashConfig {
        /// Get the stash timeout as a [std::time::Duration].
        pub fn timeout(&self) -> std::time::Duration {
            std::time::Duration::from_secs(self.timeout_s as u64)
        }
    }

    /// Module-level configuration for CoreStash.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoreStashModConfig {
        /// CoreStash configuration.
        #[serde(default)]
        pub core_stash: CoreStashConfig,
    }

    impl modproxy_api::config::ModConfig for CoreStashModConfig {}
}

pub use config::*;

/// The production stasher chain: deduplicated, pooled, basic.
#[derive(Debug)]
pub struct CoreStasherFactory {}

impl CoreStasherFactory {
    /// Construct a new CoreStasherFactory.
    pub fn create() -> DynStasherFactory {
        Arc::new(Self {})
    }
}

impl StasherFactory for CoreStasherFactory {
    fn default_config(&self, config: &mut Config) -> ProxyResult<()> {
        config.set_module_config(&CoreStashModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        storage: DynStorage,
        fetcher: DynFetcher,
    ) -> BoxFut<'static, ProxyResult<DynStasher>> {
        Box::pin(async move {
            let config: CoreStashModConfig =
                builder.config.get_module_config()?;
            Ok(stasher_chain(config.core_stash, storage, fetcher))
        })
    }
}

/// Assemble the stasher chain described by `config`.
/// Must be called within a tokio runtime.
pub fn stasher_chain(
    config: CoreStashConfig,
    storage: DynStorage,
    fetcher: DynFetcher,
) -> DynStasher {
    let mut out: DynStasher =
        Arc::new(BasicStasher::new(storage, fetcher, config.timeout()));

    if config.pool_size > 0 {
        let pool = Arc::new(WorkerPool::new(
            config.pool_size as usize,
            config.pool_size as usize * 16,
        ));
        out = Arc::new(PooledStasher::new(out, pool));
    }

    Arc::new(DedupStasher::new(out))
}
