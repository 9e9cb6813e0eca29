pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryProfileStore;
pub use postgres::PgProfileStore;
pub use store::{ProfileStore, StoreError};
