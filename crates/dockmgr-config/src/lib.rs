//! Configuration for dockmgr
//!
//! Global configuration lives at `~/.config/dockmgr/config.toml`.

mod error;
mod global;

pub use error::*;
pub use global::*;
