//! Types describing modules, versions and their artifacts.

use bytes::Bytes;

/// A streamed module source archive.
///
/// Whoever holds the stream owns it; dropping it releases any
/// underlying resources, whether or not it was read to the end.
pub type ZipStream =
    futures::stream::BoxStream<'static, std::io::Result<Bytes>>;

/// Build a [ZipStream] from an in-memory archive.
pub fn zip_from_bytes(zip: Bytes) -> ZipStream {
    Box::pin(futures::stream::once(futures::future::ready(Ok(zip))))
}

/// Read a [ZipStream] to the end, collecting it into a single buffer.
pub async fn collect_zip(mut zip: ZipStream) -> std::io::Result<Bytes> {
    use futures::StreamExt;
    let mut out = bytes::BytesMut::new();
    while let Some(chunk) = zip.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out.freeze())
}

/// Identifies a single version of a module.
///
/// Two keys are equal iff both the module path and the version match
/// exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    /// The module path, e.g. `github.com/a/b`.
    pub module: String,

    /// A semantic version or pseudo-version.
    pub version: String,
}

impl ModuleKey {
    /// Construct a new module key.
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.module, self.version)
    }
}

/// Everything a fetch of one module version produces.
pub struct VersionBundle {
    /// The `.info` metadata document.
    pub info: Bytes,

    /// The `.mod` dependency manifest.
    pub go_mod: Bytes,

    /// The `.zip` source archive.
    pub zip: ZipStream,

    /// The semantic version the requested version resolved to.
    pub semver: String,
}

impl std::fmt::Debug for VersionBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionBundle")
            .field("info_len", &self.info.len())
            .field("go_mod_len", &self.go_mod.len())
            .field("semver", &self.semver)
            .finish()
    }
}

/// A version and the time at which it was created upstream.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct RevisionInfo {
    /// The version string.
    #[serde(rename = "Version")]
    pub version: String,

    /// RFC 3339 creation time of the version.
    #[serde(rename = "Time")]
    pub time: String,
}

/// A single (module, version) pair known to storage.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct CatalogEntry {
    /// The module path.
    pub module: String,

    /// The version.
    pub version: String,
}

/// One page of the storage catalog.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct CatalogPage {
    /// The entries on this page.
    pub modules: Vec<CatalogEntry>,

    /// Opaque token to request the next page. Empty on the last page.
    pub next: String,
}
