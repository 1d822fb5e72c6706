//! The in-memory storage backend.
//!
//! Artifacts live in a map of module path to a map of version to the
//! three artifacts. Both levels are ordered, which gives the catalog a
//! stable enumeration order to page through.

use base64::prelude::*;
use bytes::Bytes;
use modproxy_api::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(test)]
mod test;

/// A factory for the in-memory storage backend.
#[derive(Debug)]
pub struct MemStorageFactory {}

impl MemStorageFactory {
    /// Construct a new MemStorageFactory.
    pub fn create() -> DynStorageFactory {
        let out: DynStorageFactory = Arc::new(MemStorageFactory {});
        out
    }
}

impl StorageFactory for MemStorageFactory {
    fn default_config(&self, _config: &mut Config) -> ProxyResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<Builder>,
    ) -> BoxFut<'static, ProxyResult<DynStorage>> {
        Box::pin(async move {
            let out: DynStorage = Arc::new(MemStorage::default());
            Ok(out)
        })
    }
}

#[derive(Debug, Clone)]
struct Record {
    info: Bytes,
    go_mod: Bytes,
    zip: Bytes,
}

type Modules = BTreeMap<String, BTreeMap<String, Record>>;

/// An in-memory [Storage] implementation.
#[derive(Debug, Default)]
pub struct MemStorage {
    modules: RwLock<Modules>,
}

impl MemStorage {
    async fn record(&self, module: &str, version: &str) -> ProxyResult<Record> {
        self.modules
            .read()
            .await
            .get(module)
            .and_then(|versions| versions.get(version))
            .cloned()
            .ok_or_else(|| {
                ProxyError::not_found(format!("{module}@{version}"))
            })
    }
}

fn encode_token(module: &str, version: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(format!("{module}@{version}"))
}

fn decode_token(token: &str) -> ProxyResult<(String, String)> {
    let invalid =
        || ProxyError::bad_request(format!("invalid token {token:?}"));
    let raw = BASE64_URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let raw = String::from_utf8(raw).map_err(|_| invalid())?;
    let (module, version) = raw.split_once('@').ok_or_else(invalid)?;
    Ok((module.to_string(), version.to_string()))
}

impl Storage for MemStorage {
    fn list(&self, module: &str) -> BoxFut<'_, ProxyResult<Vec<String>>> {
        let module = module.to_string();
        Box::pin(async move {
            self.modules
                .read()
                .await
                .get(&module)
                .map(|versions| versions.keys().cloned().collect())
                .ok_or_else(|| ProxyError::not_found(module))
        })
    }

    fn info(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move { Ok(self.record(&module, &version).await?.info) })
    }

    fn go_mod(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<Bytes>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(
            async move { Ok(self.record(&module, &version).await?.go_mod) },
        )
    }

    fn zip(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<ZipStream>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            let zip = self.record(&module, &version).await?.zip;
            Ok(zip_from_bytes(zip))
        })
    }

    fn exists(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<bool>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            Ok(self
                .modules
                .read()
                .await
                .get(&module)
                .map(|versions| versions.contains_key(&version))
                .unwrap_or(false))
        })
    }

    fn save(
        &self,
        module: &str,
        version: &str,
        go_mod: Bytes,
        zip: ZipStream,
        info: Bytes,
    ) -> BoxFut<'_, ProxyResult<()>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            // read the archive before taking the write lock
            let zip = collect_zip(zip).await.map_err(|err| {
                ProxyError::other_src(
                    format!("read zip {module}@{version}"),
                    err,
                )
            })?;

            self.modules
                .write()
                .await
                .entry(module)
                .or_default()
                .insert(version, Record { info, go_mod, zip });

            Ok(())
        })
    }

    fn delete(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<()>> {
        let (module, version) = (module.to_string(), version.to_string());
        Box::pin(async move {
            let mut lock = self.modules.write().await;
            let versions = lock.get_mut(&module).ok_or_else(|| {
                ProxyError::not_found(format!("{module}@{version}"))
            })?;
            if versions.remove(&version).is_none() {
                return Err(ProxyError::not_found(format!(
                    "{module}@{version}"
                )));
            }
            if versions.is_empty() {
                lock.remove(&module);
            }
            Ok(())
        })
    }

    fn catalog(
        &self,
        token: &str,
        page_size: usize,
    ) -> BoxFut<'_, ProxyResult<CatalogPage>> {
        let token = token.to_string();
        Box::pin(async move {
            if page_size == 0 {
                return Err(ProxyError::bad_request("page size must be > 0"));
            }
            let after = if token.is_empty() {
                None
            } else {
                Some(decode_token(&token)?)
            };

            let lock = self.modules.read().await;
            let mut modules = Vec::with_capacity(page_size);
            let mut more = false;
            let all = lock.iter().flat_map(|(module, versions)| {
                versions.keys().map(move |version| (module, version))
            });
            for (module, version) in all {
                if let Some((a_mod, a_ver)) = &after {
                    if (module, version) <= (a_mod, a_ver) {
                        continue;
                    }
                }
                if modules.len() == page_size {
                    more = true;
                    break;
                }
                modules.push(CatalogEntry {
                    module: module.clone(),
                    version: version.clone(),
                });
            }

            let next = match modules.last() {
                Some(last) if more => encode_token(&last.module, &last.version),
                _ => String::new(),
            };

            Ok(CatalogPage { modules, next })
        })
    }
}
