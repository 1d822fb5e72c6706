#![deny(missing_docs)]
//! Module proxy API contains the component traits and the basic types
//! required to define the api of those traits.
//!
//! If you want a working proxy, please see the `modproxy_core` crate for
//! the orchestration layer and `modproxy_srv` for the http server.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod builder;
pub use builder::{Builder, Proxy};

pub mod config;
pub use config::Config;

mod error;
pub use error::*;

mod module;
pub use module::*;

pub mod path;

pub mod protocol;
pub use protocol::*;

pub mod stash;
pub use stash::*;

pub mod storage;
pub use storage::*;

pub mod upstream;
pub use upstream::*;
