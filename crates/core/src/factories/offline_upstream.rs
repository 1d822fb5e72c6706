use modproxy_api::*;
use std::sync::Arc;

/// A default upstream that knows no modules.
///
/// A proxy built with it serves only what is already in storage.
#[derive(Debug)]
pub struct OfflineUpstreamFactory {}

impl OfflineUpstreamFactory {
    /// Construct a new [`OfflineUpstreamFactory`]
    pub fn create() -> DynUpstreamFactory {
        let out: DynUpstreamFactory = Arc::new(Self {});
        out
    }
}

impl UpstreamFactory for OfflineUpstreamFactory {
    fn default_config(&self, _config: &mut Config) -> ProxyResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<Builder>,
    ) -> BoxFut<'static, ProxyResult<(DynFetcher, DynVersionLister)>> {
        Box::pin(async move {
            let upstream = Arc::new(OfflineUpstream);
            let fetcher: DynFetcher = upstream.clone();
            let lister: DynVersionLister = upstream;
            Ok((fetcher, lister))
        })
    }
}

#[derive(Debug)]
struct OfflineUpstream;

impl Fetcher for OfflineUpstream {
    fn fetch(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<VersionBundle>> {
        let err = ProxyError::not_found(format!("offline: {module}@{version}"));
        Box::pin(async move { Err(err) })
    }
}

impl VersionLister for OfflineUpstream {
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<UpstreamList>> {
        let err = ProxyError::not_found(format!("offline: {module}"));
        Box::pin(async move { Err(err) })
    }
}
