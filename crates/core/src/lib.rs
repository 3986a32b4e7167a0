//! Offline-first mirror of news and transfers: change-list sync, user overlay
//! and reactive repositories over pluggable storage and network ports.

pub mod config;
pub mod data;
pub mod errors;
pub mod preferences;
pub mod resources;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use errors::{Error, Result};
