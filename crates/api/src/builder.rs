//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general module proxy builder.
/// This contains both configuration and factory instances,
/// allowing construction of runtime component instances.
#[derive(Debug)]
pub struct Builder {
    /// The component configuration to be used when building components.
    /// This can be loaded from disk or modified before building.
    pub config: crate::config::Config,

    /// The [storage::StorageFactory] to be used for creating
    /// the [storage::Storage] backend.
    pub storage: storage::DynStorageFactory,

    /// The [upstream::UpstreamFactory] to be used for creating the
    /// [upstream::Fetcher] and [upstream::VersionLister].
    pub upstream: upstream::DynUpstreamFactory,

    /// The [stash::StasherFactory] to be used for creating
    /// the [stash::Stasher] chain.
    pub stasher: stash::DynStasherFactory,

    /// The [protocol::ProtocolFactory] to be used for creating
    /// the [protocol::Protocol] instance.
    pub protocol: protocol::DynProtocolFactory,
}

impl Builder {
    /// Construct a default config given the configured component factories.
    /// Note, this should be called before [Builder::build].
    pub fn set_default_config(&mut self) -> ProxyResult<()> {
        let Self {
            config,
            storage,
            upstream,
            stasher,
            protocol,
        } = self;

        storage.default_config(config)?;
        upstream.default_config(config)?;
        stasher.default_config(config)?;
        protocol.default_config(config)?;

        Ok(())
    }

    /// Helper for chaining [Builder::set_default_config].
    pub fn with_default_config(mut self) -> ProxyResult<Self> {
        self.set_default_config()?;
        Ok(self)
    }

    /// Construct all components, wiring them together.
    pub async fn build(self) -> ProxyResult<Proxy> {
        let builder = Arc::new(self);

        let storage = builder.storage.create(builder.clone()).await?;
        let (fetcher, lister) =
            builder.upstream.create(builder.clone()).await?;
        let stasher = builder
            .stasher
            .create(builder.clone(), storage.clone(), fetcher)
            .await?;
        let protocol = builder
            .protocol
            .create(builder.clone(), storage.clone(), stasher, lister)
            .await?;

        Ok(Proxy { protocol, storage })
    }
}

/// A fully wired module proxy.
#[derive(Debug, Clone)]
pub struct Proxy {
    /// The protocol answering client queries.
    pub protocol: DynProtocol,

    /// The storage backend, for queries that bypass the protocol
    /// (such as the catalog).
    pub storage: DynStorage,
}
