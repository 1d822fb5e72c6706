//! Module download protocol types.

use crate::*;
use bytes::Bytes;
use std::sync::Arc;

/// The module download protocol: the five queries a client may make
/// about a module.
pub trait Protocol: 'static + Send + Sync + std::fmt::Debug {
    /// All known versions of a module, without duplicates.
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<Vec<String>>>;

    /// The `.info` metadata of a module version.
    fn info(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>>;

    /// The latest upstream revision of a module.
    fn latest(&self, module: &str) -> BoxFut<'_, ProxyResult<RevisionInfo>>;

    /// The `.mod` manifest of a module version.
    fn go_mod(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>>;

    /// The `.zip` archive of a module version.
    fn zip(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<ZipStream>>;
}

/// Trait-object [Protocol].
pub type DynProtocol = Arc<dyn Protocol>;

/// A factory for constructing [Protocol] instances.
pub trait ProtocolFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> ProxyResult<()>;

    /// Construct a protocol instance from its collaborators.
    fn create(
        &self,
        builder: Arc<Builder>,
        storage: DynStorage,
        stasher: DynStasher,
        lister: DynVersionLister,
    ) -> BoxFut<'static, ProxyResult<DynProtocol>>;
}

/// Trait-object [ProtocolFactory].
pub type DynProtocolFactory = Arc<dyn ProtocolFactory>;
