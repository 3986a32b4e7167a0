mod model;
mod repository;

pub use model::TransferResourceDB;
pub use repository::TransferRepository;
