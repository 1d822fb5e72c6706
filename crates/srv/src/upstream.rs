//! An upstream that resolves modules from another server speaking the
//! module download protocol.

use modproxy_api::*;
use std::io::Read;
use std::sync::Arc;
use url::Url;

/// UpstreamProxy configuration types.
pub mod config {
    /// Configuration parameters for
    /// [UpstreamProxyFactory](super::UpstreamProxyFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpstreamProxyConfig {
        /// Base url of the upstream server. Required.
        #[serde(default)]
        pub url: String,

        /// Timeout of a single http request, in seconds. Default: 60.
        #[serde(default = "default_timeout_s")]
        pub timeout_s: u32,
    }

    fn default_timeout_s() -> u32 {
        60
    }

    impl Default for UpstreamProxyConfig {
        fn default() -> Self {
            Self {
                url: String::new(),
                timeout_s: default_timeout_s(),
            }
        }
    }

    /// Module-level configuration for UpstreamProxy.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpstreamProxyModConfig {
        /// UpstreamProxy configuration.
        #[serde(default)]
        pub upstream_proxy: UpstreamProxyConfig,
    }

    impl modproxy_api::config::ModConfig for UpstreamProxyModConfig {}
}

use config::*;

/// A factory for the http upstream.
#[derive(Debug)]
pub struct UpstreamProxyFactory {}

impl UpstreamProxyFactory {
    /// Construct a new UpstreamProxyFactory.
    pub fn create() -> DynUpstreamFactory {
        let out: DynUpstreamFactory = Arc::new(UpstreamProxyFactory {});
        out
    }
}

impl UpstreamFactory for UpstreamProxyFactory {
    fn default_config(&self, config: &mut Config) -> ProxyResult<()> {
        config.set_module_config(&UpstreamProxyModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, ProxyResult<(DynFetcher, DynVersionLister)>> {
        Box::pin(async move {
            let config: UpstreamProxyModConfig =
                builder.config.get_module_config()?;
            let upstream =
                Arc::new(UpstreamProxy::new(config.upstream_proxy)?);
            let fetcher: DynFetcher = upstream.clone();
            let lister: DynVersionLister = upstream;
            Ok((fetcher, lister))
        })
    }
}

/// Fetches and lists modules over http.
///
/// Requests are made with a blocking client on tokio's blocking thread
/// pool.
#[derive(Debug)]
pub struct UpstreamProxy {
    base: Url,
    agent: ureq::Agent,
}

impl UpstreamProxy {
    /// Construct a new UpstreamProxy.
    pub fn new(config: UpstreamProxyConfig) -> ProxyResult<Self> {
        let base = Url::parse(&config.url).map_err(|err| {
            ProxyError::new_src(
                ErrorKind::BadRequest,
                format!("invalid upstream url {:?}", config.url),
                err,
            )
        })?;
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(config.timeout_s as u64))
            .build();
        Ok(Self { base, agent })
    }

    /// The url of `file` within the protocol tree of `module`.
    fn url(&self, module: &str, file: &str) -> ProxyResult<Url> {
        let mut url = self.base.clone();
        url.set_path(&format!(
            "{}/{}/{file}",
            self.base.path().trim_end_matches('/'),
            path::escape(module)?,
        ));
        Ok(url)
    }

    /// Run a blocking request on the blocking thread pool.
    async fn blocking<T, F>(&self, f: F) -> ProxyResult<T>
    where
        F: FnOnce(ureq::Agent) -> ProxyResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || f(agent))
            .await
            .map_err(|err| {
                ProxyError::other_src("upstream request task", err)
            })?
    }
}

fn request_err(url: &Url, err: ureq::Error) -> ProxyError {
    match err {
        ureq::Error::Status(status, _) => {
            let kind = match status {
                404 | 410 => ErrorKind::NotFound,
                429 => ErrorKind::RateLimited,
                504 => ErrorKind::GatewayTimeout,
                _ => ErrorKind::Unexpected,
            };
            ProxyError::new(kind, format!("GET {url}: status {status}"))
        }
        ureq::Error::Transport(err) => {
            ProxyError::other_src(format!("GET {url}"), err)
        }
    }
}

fn get_bytes(agent: &ureq::Agent, url: &Url) -> ProxyResult<bytes::Bytes> {
    let res = agent
        .get(url.as_str())
        .call()
        .map_err(|err| request_err(url, err))?;
    let mut out = Vec::new();
    res.into_reader()
        .read_to_end(&mut out)
        .map_err(|err| ProxyError::other_src(format!("read {url}"), err))?;
    Ok(out.into())
}

impl Fetcher for UpstreamProxy {
    fn fetch(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<VersionBundle>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            let info_url = self.url(
                &module,
                &format!("@v/{}.info", path::escape(&version)?),
            )?;
            let info = self
                .blocking(move |agent| get_bytes(&agent, &info_url))
                .await?;
            let revision: RevisionInfo = serde_json::from_slice(&info)
                .map_err(|err| {
                    ProxyError::other_src(
                        format!("decode info {module}@{version}"),
                        err,
                    )
                })?;
            let semver = revision.version;

            // the version may have been a branch or commit, everything
            // else is requested at the version it resolved to
            let escaped = path::escape(&semver)?;
            let mod_url = self.url(&module, &format!("@v/{escaped}.mod"))?;
            let zip_url = self.url(&module, &format!("@v/{escaped}.zip"))?;
            let (go_mod, zip) = self
                .blocking(move |agent| {
                    let go_mod = get_bytes(&agent, &mod_url)?;
                    let zip = get_bytes(&agent, &zip_url)?;
                    Ok((go_mod, zip))
                })
                .await?;

            tracing::debug!(
                %module,
                %version,
                %semver,
                "fetched from upstream"
            );

            Ok(VersionBundle {
                info,
                go_mod,
                zip: zip_from_bytes(zip),
                semver,
            })
        })
    }
}

impl VersionLister for UpstreamProxy {
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<UpstreamList>> {
        let module = module.to_string();
        Box::pin(async move {
            let list_url = self.url(&module, "@v/list")?;
            let latest_url = self.url(&module, "@latest")?;

            let (list, latest) = self
                .blocking(move |agent| {
                    let list = get_bytes(&agent, &list_url)?;
                    let latest = match get_bytes(&agent, &latest_url) {
                        Ok(latest) => Some(latest),
                        Err(err) if err.is_not_found() => None,
                        Err(err) => return Err(err),
                    };
                    Ok((list, latest))
                })
                .await?;

            let versions = String::from_utf8_lossy(&list)
                .lines()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();

            let latest = match latest {
                Some(latest) => {
                    Some(serde_json::from_slice(&latest).map_err(|err| {
                        ProxyError::other_src(
                            format!("decode latest {module}"),
                            err,
                        )
                    })?)
                }
                None => None,
            };

            Ok((latest, versions))
        })
    }
}
