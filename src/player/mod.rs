pub mod models;
pub mod repository;

pub use models::{PlayerId, PlayerRecord, UserRef};
pub use repository::{InMemoryPlayerRepository, PlayerRepository, StoreError};
