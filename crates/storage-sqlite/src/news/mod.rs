mod model;
mod repository;

pub use model::NewsResourceDB;
pub use repository::NewsRepository;
