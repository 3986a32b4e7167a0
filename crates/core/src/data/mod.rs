//! Repository layer: reactive user-facing projections over the local mirror.

mod dao;
mod resource_repository;
mod search_repository;
mod user_data_repository;

pub use dao::*;
pub use resource_repository::*;
pub use search_repository::*;
pub use user_data_repository::*;
