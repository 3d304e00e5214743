pub mod analytics;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::ShopDb;
pub use memory::MemoryStore;
pub use store::{CatalogStore, TicketStore};
