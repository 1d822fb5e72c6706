//! Storage backend related types.

use crate::*;
use bytes::Bytes;
use std::sync::Arc;

#[cfg(feature = "mockall")]
use mockall::automock;

/// A durable cache of module artifacts, keyed by module and version.
///
/// Each key holds three artifacts: the `.info` metadata, the `.mod`
/// manifest and the `.zip` archive. Implementations must be safe for
/// concurrent reads and writes to different keys. Writes to the same key
/// are serialized by the stashing layer, so no per-key locking is needed.
///
/// Lookups of a missing module or version must fail with
/// [ErrorKind::NotFound].
#[cfg_attr(feature = "mockall", automock)]
pub trait Storage: 'static + Send + Sync + std::fmt::Debug {
    /// List all versions of a module held in storage.
    ///
    /// Fails with [ErrorKind::NotFound] if the module has never been saved.
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<Vec<String>>>;

    /// Get the `.info` metadata of a module version.
    fn info(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>>;

    /// Get the `.mod` manifest of a module version.
    fn go_mod(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>>;

    /// Open the `.zip` archive of a module version.
    fn zip(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<ZipStream>>;

    /// Check whether all artifacts of a module version are stored.
    fn exists(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<bool>>;

    /// Persist the artifacts of a module version. The archive stream is
    /// consumed (and released) by this call.
    fn save(
        &self,
        module: &str,
        version: &str,
        go_mod: Bytes,
        zip: ZipStream,
        info: Bytes,
    ) -> BoxFut<'_, ProxyResult<()>>;

    /// Remove a module version.
    ///
    /// Fails with [ErrorKind::NotFound] if it was not stored.
    fn delete(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<()>>;

    /// Enumerate stored (module, version) pairs a page at a time.
    ///
    /// Pass an empty token to start from the beginning. The returned
    /// page's `next` token is empty once the enumeration is complete.
    fn catalog(
        &self,
        token: &str,
        page_size: usize,
    ) -> BoxFut<'_, ProxyResult<CatalogPage>>;
}

/// Trait-object [Storage].
pub type DynStorage = Arc<dyn Storage>;

/// A factory for constructing [Storage] instances.
pub trait StorageFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> ProxyResult<()>;

    /// Construct a storage instance.
    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, ProxyResult<DynStorage>>;
}

/// Trait-object [StorageFactory].
pub type DynStorageFactory = Arc<dyn StorageFactory>;
