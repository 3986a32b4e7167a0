//! HTTP client for the kickfeed backend: payloads and change lists for news
//! and transfers.

mod client;
mod config;
mod error;
mod types;

pub use client::KickfeedNetworkClient;
pub use config::NetworkConfig;
pub use error::{NetworkError, Result};
pub use types::{NetworkChangeList, NetworkNewsResource, NetworkTransferResource};
