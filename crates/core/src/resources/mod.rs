//! Mirrored backend resources and their user-facing projections.

mod resources_model;
mod user_resource;

pub use resources_model::*;
pub use user_resource::*;
