#![deny(missing_docs)]
//! The module proxy server is an HTTP server answering the module download
//! protocol from a cache, fetching from an upstream server on a miss.
//!
//! #### Routes
//!
//! Module paths and versions are escaped: every upper-case letter is
//! written as `!` followed by its lower-case form.
//!
//! - `GET /<module>/@v/list` - newline terminated list of known versions.
//! - `GET /<module>/@latest` - `{"Version": string, "Time": string}`.
//! - `GET /<module>/@v/<version>.info` - version metadata (json).
//! - `GET /<module>/@v/<version>.mod` - the module manifest.
//! - `GET /<module>/@v/<version>.zip` - the module source archive.
//! - `GET /catalog?token=<token>&pagesize=<n>` -
//!   `{"modules": [{"module": string, "version": string}], "next": string}`
//!   listing everything in storage. Pass `next` as `token` to get the
//!   following page, it is empty on the last page.
//! - `GET /health` - `{}`.
//!
//! Errors are answered as `{"error": string}` with a status derived from
//! the error kind: 404 not found, 400 bad request, 429 rate limited,
//! 504 gateway timeout, 501 not implemented, 500 for anything else.
//!
//! #### Filtering
//!
//! A filter file decides, per module path, whether a module is served
//! (`+`), refused with 403 (`-`), or redirected with 303 to a direct
//! proxy (`D`). See `modproxy_core::filter::Filter::parse` for the format.

mod config;
pub use config::*;

mod http;

mod server;
pub use server::*;

pub mod upstream;
pub use upstream::{UpstreamProxy, UpstreamProxyFactory};
