use crate::worker_pool::WorkerPool;
use bytes::Bytes;
use modproxy_api::*;
use std::sync::Arc;

/// Runs every call of the wrapped protocol on a [WorkerPool].
///
/// For `zip` the pool bounds opening the archive stream, not reading it.
#[derive(Debug)]
pub struct PooledProtocol {
    inner: DynProtocol,
    pool: Arc<WorkerPool>,
}

impl PooledProtocol {
    /// Wrap `inner` so that at most `pool.worker_count()` of its calls
    /// run at once.
    pub fn new(inner: DynProtocol, pool: Arc<WorkerPool>) -> Self {
        Self { inner, pool }
    }
}

impl Protocol for PooledProtocol {
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<Vec<String>>> {
        let inner = self.inner.clone();
        let module = module.to_string();
        Box::pin(async move {
            self.pool
                .run(async move { inner.list(&module).await })
                .await?
        })
    }

    fn info(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>> {
        let inner = self.inner.clone();
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            self.pool
                .run(async move { inner.info(&module, &version).await })
                .await?
        })
    }

    fn latest(&self, module: &str) -> BoxFut<'_, ProxyResult<RevisionInfo>> {
        let inner = self.inner.clone();
        let module = module.to_string();
        Box::pin(async move {
            self.pool
                .run(async move { inner.latest(&module).await })
                .await?
        })
    }

    fn go_mod(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>> {
        let inner = self.inner.clone();
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            self.pool
                .run(async move { inner.go_mod(&module, &version).await })
                .await?
        })
    }

    fn zip(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<ZipStream>> {
        let inner = self.inner.clone();
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            self.pool
                .run(async move { inner.zip(&module, &version).await })
                .await?
        })
    }
}
