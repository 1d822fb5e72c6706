//! The core protocol orchestrator.
//!
//! Answers the five module download queries by reading storage and, on a
//! cache miss, asking the stasher to bring the module version in before
//! reading again.
//!
//! ### Read-through
//!
//! `info`, `go_mod` and `zip` share one pattern:
//!
//! - Read the artifact from storage. Any failure other than
//!   [ErrorKind::NotFound] is returned with the operation as context.
//! - On NotFound, stash the module version. The stasher does not return
//!   until the artifacts are saved, so a successful stash guarantees the
//!   second read can find them.
//! - Read once more, at the version the stasher resolved. Whatever this
//!   read returns is the answer.
//!
//! How a cache miss is handled depends on the configured [DownloadMode].
//!
//! ### List and latest
//!
//! `list` merges the versions held in storage with the versions known
//! upstream, see [list_merge]. `latest` is an upstream concept only and
//! never consults storage.

use crate::worker_pool::WorkerPool;
use bytes::Bytes;
use modproxy_api::*;
use std::sync::Arc;

mod list_merge;
pub use list_merge::*;

mod pooled;
pub use pooled::*;

/// CoreProtocol configuration types.
pub mod config {
    /// How the protocol reacts to a module version missing from storage.
    #[derive(
        Debug,
        Default,
        Clone,
        Copy,
        PartialEq,
        Eq,
        serde::Serialize,
        serde::Deserialize,
    )]
    #[serde(rename_all = "lowercase")]
    pub enum DownloadMode {
        /// Stash the module version and answer once it is saved.
        #[default]
        Sync,

        /// Start stashing the module version in the background and answer
        /// not found right away.
        Async,

        /// Answer not found without fetching anything.
        None,
    }

    /// Configuration parameters for
    /// [CoreProtocolFactory](super::CoreProtocolFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoreProtocolConfig {
        /// The cache miss behavior. Default: sync.
        #[serde(default)]
        pub download_mode: DownloadMode,

        /// How many protocol calls may run at once. Zero disables the
        /// limit. Default: 30.
        #[serde(default = "default_pool_size")]
        pub pool_size: u32,
    }

    fn default_pool_size() -> u32 {
        30
    }

    impl Default for CoreProtocolConfig {
        fn default() -> Self {
            Self {
                download_mode: DownloadMode::default(),
                pool_size: default_pool_size(),
            }
        }
    }

    /// Module-level configuration for CoreProtocol.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoreProtocolModConfig {
        /// CoreProtocol configuration.
        #[serde(default)]
        pub core_protocol: CoreProtocolConfig,
    }

    impl modproxy_api::config::ModConfig for CoreProtocolModConfig {}
}

pub use config::*;

/// A production-ready protocol orchestrator.
#[derive(Debug)]
pub struct CoreProtocolFactory {}

impl CoreProtocolFactory {
    /// Construct a new CoreProtocolFactory.
    pub fn create() -> DynProtocolFactory {
        Arc::new(Self {})
    }
}

impl ProtocolFactory for CoreProtocolFactory {
    fn default_config(&self, config: &mut Config) -> ProxyResult<()> {
        config.set_module_config(&CoreProtocolModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        storage: DynStorage,
        stasher: DynStasher,
        lister: DynVersionLister,
    ) -> BoxFut<'static, ProxyResult<DynProtocol>> {
        Box::pin(async move {
            let config: CoreProtocolModConfig =
                builder.config.get_module_config()?;
            let config = config.core_protocol;

            let mut out: DynProtocol = Arc::new(CoreProtocol::new(
                storage,
                stasher,
                lister,
                config.download_mode,
            ));

            if config.pool_size > 0 {
                let pool = Arc::new(WorkerPool::new(
                    config.pool_size as usize,
                    config.pool_size as usize * 16,
                ));
                out = Arc::new(PooledProtocol::new(out, pool));
            }

            Ok(out)
        })
    }
}

/// The protocol orchestrator.
#[derive(Debug)]
pub struct CoreProtocol {
    storage: DynStorage,
    stasher: DynStasher,
    lister: DynVersionLister,
    download_mode: DownloadMode,
}

impl CoreProtocol {
    /// Construct a new CoreProtocol.
    pub fn new(
        storage: DynStorage,
        stasher: DynStasher,
        lister: DynVersionLister,
        download_mode: DownloadMode,
    ) -> Self {
        Self {
            storage,
            stasher,
            lister,
            download_mode,
        }
    }

    /// Handle a failed first read of `op` for a module version.
    ///
    /// Returns the version to read again, or the error to answer with.
    async fn on_miss(
        &self,
        op: &str,
        module: &str,
        version: &str,
        err: ProxyError,
    ) -> ProxyResult<String> {
        let ctx = || format!("{op}: {module}@{version}");

        if !err.is_not_found() {
            return Err(err.with_ctx(ctx()));
        }

        match self.download_mode {
            DownloadMode::Sync => self
                .stasher
                .stash(module, version)
                .await
                .map_err(|err| err.with_ctx(ctx())),
            DownloadMode::Async => {
                let stasher = self.stasher.clone();
                let key = ModuleKey::new(module, version);
                tokio::task::spawn(async move {
                    if let Err(err) =
                        stasher.stash(&key.module, &key.version).await
                    {
                        tracing::warn!(?err, %key, "background stash failed");
                    }
                });
                Err(err.with_ctx(format!("{} (fetching in background)", ctx())))
            }
            DownloadMode::None => Err(err.with_ctx(ctx())),
        }
    }
}

impl Protocol for CoreProtocol {
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<Vec<String>>> {
        let module = module.to_string();
        Box::pin(async move {
            list_merge(&*self.storage, &*self.lister, &module).await
        })
    }

    fn info(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            let err = match self.storage.info(&module, &version).await {
                Ok(info) => return Ok(info),
                Err(err) => err,
            };
            let semver = self.on_miss("info", &module, &version, err).await?;
            self.storage
                .info(&module, &semver)
                .await
                .map_err(|err| {
                    err.with_ctx(format!("info: {module}@{version}"))
                })
        })
    }

    fn latest(&self, module: &str) -> BoxFut<'_, ProxyResult<RevisionInfo>> {
        let module = module.to_string();
        Box::pin(async move {
            let (latest, _) = self
                .lister
                .list(&module)
                .await
                .map_err(|err| err.with_ctx(format!("latest: {module}")))?;
            latest.ok_or_else(|| {
                ProxyError::not_found(format!(
                    "latest: {module} has no versions"
                ))
            })
        })
    }

    fn go_mod(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            let err = match self.storage.go_mod(&module, &version).await {
                Ok(go_mod) => return Ok(go_mod),
                Err(err) => err,
            };
            let semver = self.on_miss("gomod", &module, &version, err).await?;
            self.storage
                .go_mod(&module, &semver)
                .await
                .map_err(|err| {
                    err.with_ctx(format!("gomod: {module}@{version}"))
                })
        })
    }

    fn zip(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<ZipStream>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            let err = match self.storage.zip(&module, &version).await {
                Ok(zip) => return Ok(zip),
                Err(err) => err,
            };
            let semver = self.on_miss("zip", &module, &version, err).await?;
            self.storage
                .zip(&module, &semver)
                .await
                .map_err(|err| {
                    err.with_ctx(format!("zip: {module}@{version}"))
                })
        })
    }
}

#[cfg(test)]
mod test;
