//! Factories for generating instances of module proxy components.

pub mod core_protocol;
pub use core_protocol::CoreProtocolFactory;

pub mod core_stash;
pub use core_stash::*;

mod mem_storage;
pub use mem_storage::*;

mod offline_upstream;
pub use offline_upstream::*;
