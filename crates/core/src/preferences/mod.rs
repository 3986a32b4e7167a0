//! Durable user overlay state and change-list cursors.

mod backend;
mod preferences_model;
mod preferences_store;

pub use backend::*;
pub use preferences_model::*;
pub use preferences_store::*;
