//! Core logic for dockmgr
//!
//! This crate provides:
//! - Launch command reconstruction from inspection records
//! - The persistent command registry
//! - The refresh cycle that keeps the registry in step with the engine
//! - Container control, relaunch and external terminal sessions

mod command;
mod error;
mod launch;
mod manager;
mod process;
mod reconcile;
mod registry;
mod snapshot;
mod terminal;

pub use command::*;
pub use error::*;
pub use launch::*;
pub use manager::*;
pub use process::*;
pub use reconcile::*;
pub use registry::*;
pub use snapshot::*;
pub use terminal::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
