use modproxy_api::*;
use std::time::Duration;

/// Fetches a module version from upstream and saves it to storage,
/// unless storage already has it.
#[derive(Debug)]
pub struct BasicStasher {
    storage: DynStorage,
    fetcher: DynFetcher,
    timeout: Duration,
}

impl BasicStasher {
    /// Construct a new BasicStasher. Each stash is abandoned with
    /// [ErrorKind::GatewayTimeout] if it takes longer than `timeout`.
    pub fn new(
        storage: DynStorage,
        fetcher: DynFetcher,
        timeout: Duration,
    ) -> Self {
        Self {
            storage,
            fetcher,
            timeout,
        }
    }

    async fn stash_inner(
        &self,
        module: &str,
        version: &str,
    ) -> ProxyResult<String> {
        if self.storage.exists(module, version).await? {
            tracing::debug!(module, version, "already stashed");
            return Ok(version.to_string());
        }

        let VersionBundle {
            info,
            go_mod,
            zip,
            semver,
        } = self.fetcher.fetch(module, version).await?;

        // the requested version may have been a branch or commit that
        // resolved to a version we already hold
        if semver != version && self.storage.exists(module, &semver).await? {
            tracing::debug!(
                module,
                version,
                %semver,
                "resolved version already stashed"
            );
            return Ok(semver);
        }

        self.storage.save(module, &semver, go_mod, zip, info).await?;

        tracing::info!(module, version = %semver, "stashed");

        Ok(semver)
    }
}

impl Stasher for BasicStasher {
    fn stash(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<String>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            match tokio::time::timeout(
                self.timeout,
                self.stash_inner(&module, &version),
            )
            .await
            {
                Ok(Ok(semver)) => Ok(semver),
                Ok(Err(err)) => {
                    Err(err.with_ctx(format!("stash {module}@{version}")))
                }
                Err(_) => Err(ProxyError::new(
                    ErrorKind::GatewayTimeout,
                    format!(
                        "stash {module}@{version} timed out after {:?}",
                        self.timeout
                    ),
                )),
            }
        })
    }
}
