//! Stasher related types.

use crate::*;
use std::sync::Arc;

#[cfg(feature = "mockall")]
use mockall::automock;

/// Ensures the artifacts of a module version exist in storage, fetching
/// them from upstream if necessary.
///
/// Stashers compose as decorators: a deduplicating stasher wraps a pooled
/// stasher, which wraps one that actually fetches and saves.
#[cfg_attr(feature = "mockall", automock)]
pub trait Stasher: 'static + Send + Sync + std::fmt::Debug {
    /// Stash a module version.
    ///
    /// On success, resolves to the semantic version the artifacts were
    /// saved under, and a storage read for that version is guaranteed
    /// to succeed.
    fn stash(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<String>>;
}

/// Trait-object [Stasher].
pub type DynStasher = Arc<dyn Stasher>;

/// A factory for constructing [Stasher] chains.
pub trait StasherFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> ProxyResult<()>;

    /// Construct a stasher saving into `storage` what `fetcher` retrieves.
    fn create(
        &self,
        builder: Arc<Builder>,
        storage: DynStorage,
        fetcher: DynFetcher,
    ) -> BoxFut<'static, ProxyResult<DynStasher>>;
}

/// Trait-object [StasherFactory].
pub type DynStasherFactory = Arc<dyn StasherFactory>;
