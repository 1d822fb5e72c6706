//! An instrumented in-memory upstream for tests.
//!
//! Implements both [Fetcher] and [VersionLister] over a set of known
//! module versions, counts every call, and can be told to slow down or
//! fail.

use bytes::Bytes;
use modproxy_api::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The creation time reported for every test version.
pub const TEST_TIME: &str = "2019-01-01T00:00:00Z";

/// The `.info` document the test upstream serves for a version.
pub fn info_for(version: &str) -> Bytes {
    serde_json::to_vec(&RevisionInfo {
        version: version.to_string(),
        time: TEST_TIME.to_string(),
    })
    .expect("failed to encode revision info")
    .into()
}

/// The `.mod` manifest the test upstream serves for a module.
pub fn go_mod_for(module: &str) -> Bytes {
    format!("module {module}\n").into()
}

/// The `.zip` archive the test upstream serves for a module version.
pub fn zip_for(module: &str, version: &str) -> Bytes {
    format!("zip:{module}@{version}").into()
}

#[derive(Debug, Default)]
struct State {
    versions: HashMap<String, Vec<String>>,
    aliases: HashMap<ModuleKey, String>,
    fetch_delay: Duration,
    fetch_error: Option<ErrorKind>,
    list_error: Option<ErrorKind>,
}

/// An instrumented upstream.
#[derive(Debug, Default)]
pub struct TestUpstream {
    state: Mutex<State>,
    fetch_count: AtomicUsize,
    fetches_running: AtomicUsize,
    fetches_peak: AtomicUsize,
    list_count: AtomicUsize,
}

impl TestUpstream {
    /// Construct a new, empty test upstream.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a module version known upstream.
    pub fn add_version(&self, module: &str, version: &str) {
        self.state
            .lock()
            .unwrap()
            .versions
            .entry(module.to_string())
            .or_default()
            .push(version.to_string());
    }

    /// Make `alias` (e.g. a branch name) resolve to `version`.
    pub fn add_alias(&self, module: &str, alias: &str, version: &str) {
        self.state
            .lock()
            .unwrap()
            .aliases
            .insert(ModuleKey::new(module, alias), version.to_string());
    }

    /// Delay every fetch by `delay`.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.state.lock().unwrap().fetch_delay = delay;
    }

    /// Make every fetch fail with `kind`, or succeed again with `None`.
    pub fn set_fetch_error(&self, kind: Option<ErrorKind>) {
        self.state.lock().unwrap().fetch_error = kind;
    }

    /// Make every list fail with `kind`, or succeed again with `None`.
    pub fn set_list_error(&self, kind: Option<ErrorKind>) {
        self.state.lock().unwrap().list_error = kind;
    }

    /// How many times [Fetcher::fetch] has been called.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// The largest number of fetches that were running at the same time.
    pub fn fetch_peak(&self) -> usize {
        self.fetches_peak.load(Ordering::SeqCst)
    }

    /// How many times [VersionLister::list] has been called.
    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    /// An [UpstreamFactory] handing out this instance.
    pub fn factory(self: &Arc<Self>) -> DynUpstreamFactory {
        Arc::new(TestUpstreamFactory(self.clone()))
    }
}

impl Fetcher for TestUpstream {
    fn fetch(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<VersionBundle>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let key = ModuleKey::new(module, version);
        Box::pin(async move {
            let (delay, fail, semver) = {
                let lock = self.state.lock().unwrap();
                let semver = lock
                    .aliases
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| key.version.clone());
                let known = lock
                    .versions
                    .get(&key.module)
                    .map(|v| v.contains(&semver))
                    .unwrap_or(false);
                (lock.fetch_delay, lock.fetch_error, known.then_some(semver))
            };

            let running = self.fetches_running.fetch_add(1, Ordering::SeqCst);
            self.fetches_peak.fetch_max(running + 1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.fetches_running.fetch_sub(1, Ordering::SeqCst);

            if let Some(kind) = fail {
                return Err(ProxyError::new(kind, format!("fetch {key}")));
            }

            let semver = semver.ok_or_else(|| {
                ProxyError::not_found(format!("unknown revision {key}"))
            })?;

            Ok(VersionBundle {
                info: info_for(&semver),
                go_mod: go_mod_for(&key.module),
                zip: zip_from_bytes(zip_for(&key.module, &semver)),
                semver,
            })
        })
    }
}

impl VersionLister for TestUpstream {
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<UpstreamList>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        let module = module.to_string();
        Box::pin(async move {
            let lock = self.state.lock().unwrap();
            if let Some(kind) = lock.list_error {
                return Err(ProxyError::new(kind, format!("list {module}")));
            }
            let versions = lock.versions.get(&module).cloned().ok_or_else(
                || {
                    ProxyError::not_found(format!(
                        "repository not found: {module}"
                    ))
                },
            )?;
            let latest = versions.last().map(|v| RevisionInfo {
                version: v.clone(),
                time: TEST_TIME.to_string(),
            });
            Ok((latest, versions))
        })
    }
}

#[derive(Debug)]
struct TestUpstreamFactory(Arc<TestUpstream>);

impl UpstreamFactory for TestUpstreamFactory {
    fn default_config(&self, _config: &mut Config) -> ProxyResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<Builder>,
    ) -> BoxFut<'static, ProxyResult<(DynFetcher, DynVersionLister)>> {
        let upstream = self.0.clone();
        Box::pin(async move {
            let fetcher: DynFetcher = upstream.clone();
            let lister: DynVersionLister = upstream;
            Ok((fetcher, lister))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn resolves_aliases_and_counts_calls() {
        let up = TestUpstream::new();
        up.add_version("a/b", "v1.0.0");
        up.add_version("a/b", "v1.1.0");
        up.add_alias("a/b", "master", "v1.1.0");

        let bundle = up.fetch("a/b", "master").await.unwrap();
        assert_eq!("v1.1.0", bundle.semver);
        assert_eq!(go_mod_for("a/b"), bundle.go_mod);

        let err = up.fetch("a/b", "v9.9.9").await.unwrap_err();
        assert_eq!(ErrorKind::NotFound, err.kind);
        assert_eq!(2, up.fetch_count());

        let (latest, versions) =
            VersionLister::list(&*up, "a/b").await.unwrap();
        assert_eq!("v1.1.0", latest.unwrap().version);
        assert_eq!(vec!["v1.0.0", "v1.1.0"], versions);

        let err = VersionLister::list(&*up, "x/y").await.unwrap_err();
        assert_eq!(ErrorKind::NotFound, err.kind);
        assert_eq!(2, up.list_count());
    }
}
