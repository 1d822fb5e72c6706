//! Upstream collaborator types: the fetcher and the version lister.

use crate::*;
use std::sync::Arc;

#[cfg(feature = "mockall")]
use mockall::automock;

/// Retrieves the artifacts of a module version from upstream.
///
/// Retrying and backing off, if desired, belong to the implementation;
/// callers never retry a fetch themselves.
#[cfg_attr(feature = "mockall", automock)]
pub trait Fetcher: 'static + Send + Sync + std::fmt::Debug {
    /// Fetch the `.info`, `.mod` and `.zip` of a module version.
    ///
    /// Fails with [ErrorKind::NotFound] if upstream does not know the
    /// module or version.
    fn fetch(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<VersionBundle>>;
}

/// Trait-object [Fetcher].
pub type DynFetcher = Arc<dyn Fetcher>;

/// The authoritative view of a module's versions upstream.
pub type UpstreamList = (Option<RevisionInfo>, Vec<String>);

/// Lists the versions of a module known to upstream.
#[cfg_attr(feature = "mockall", automock)]
pub trait VersionLister: 'static + Send + Sync + std::fmt::Debug {
    /// Get the latest revision and the full version list of a module.
    ///
    /// Fails with [ErrorKind::NotFound] if the repository backing the
    /// module does not exist upstream.
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<UpstreamList>>;
}

/// Trait-object [VersionLister].
pub type DynVersionLister = Arc<dyn VersionLister>;

/// A factory for constructing the upstream collaborators.
///
/// Both are created together because real implementations usually share
/// a connection or a tool invocation environment.
pub trait UpstreamFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> ProxyResult<()>;

    /// Construct the fetcher and version lister.
    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, ProxyResult<(DynFetcher, DynVersionLister)>>;
}

/// Trait-object [UpstreamFactory].
pub type DynUpstreamFactory = Arc<dyn UpstreamFactory>;
