use crate::worker_pool::WorkerPool;
use modproxy_api::*;
use std::sync::Arc;

/// Runs the wrapped stasher on a [WorkerPool].
#[derive(Debug)]
pub struct PooledStasher {
    inner: DynStasher,
    pool: Arc<WorkerPool>,
}

impl PooledStasher {
    /// Wrap `inner` so that at most `pool.worker_count()` of its stashes
    /// run at once.
    pub fn new(inner: DynStasher, pool: Arc<WorkerPool>) -> Self {
        Self { inner, pool }
    }
}

impl Stasher for PooledStasher {
    fn stash(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<String>> {
        let inner = self.inner.clone();
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            self.pool
                .run(async move { inner.stash(&module, &version).await })
                .await?
        })
    }
}
