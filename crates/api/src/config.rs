//! Types for use when configuring module proxy components.

use crate::*;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> ProxyResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| ProxyError::other_src("encode", e))?,
    )
    .map_err(|e| ProxyError::other_src("decode", e))
}

/// Denotes a type used to configure a specific proxy component.
///
/// A module config is a struct with a single top-level property named
/// after the component (e.g. `coreStash`) holding the component's
/// parameters. This lets every component share one flat json object,
/// the likes of which might be found in a configuration file.
///
/// It is highly recommended that you expose this struct in your component
/// docs to help operators understand how to configure it.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Module proxy configuration.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// When generating a default configuration, the builder passes a
    /// mutable reference of this config to each configured factory.
    /// Those factories call this function to add their default
    /// parameters. Top-level properties that already exist are
    /// refused so that two components can't claim the same name.
    pub fn set_module_config<M: ModConfig>(
        &mut self,
        config: &M,
    ) -> ProxyResult<()> {
        let map: serde_json::Map<String, serde_json::Value> = tc(config)?;
        for (key, value) in map {
            if self.0.contains_key(&key) {
                return Err(ProxyError::other(format!(
                    "Refusing to overwrite conflicting module name: {key}"
                )));
            }
            self.0.insert(key, value);
        }
        Ok(())
    }

    /// Overwrite the top-level properties of a module config, e.g. to apply
    /// command line overrides on top of a config loaded from disk.
    pub fn update_module_config<M: ModConfig>(
        &mut self,
        config: &M,
    ) -> ProxyResult<()> {
        let map: serde_json::Map<String, serde_json::Value> = tc(config)?;
        self.0.extend(map);
        Ok(())
    }

    /// Extract a module config. Note that this config may have been
    /// loaded from disk and edited by humans, so module configs should
    /// be tolerant to missing properties, setting sane defaults.
    /// Properties belonging to other components are ignored.
    pub fn get_module_config<M: ModConfig>(&self) -> ProxyResult<M> {
        tc(&self.0)
    }

    /// Returns true if no component has been configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load a config from a json string, as found in a config file.
    pub fn from_json(json: &str) -> ProxyResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ProxyError::new_src(ErrorKind::BadRequest, "config", e)
        })
    }
}
