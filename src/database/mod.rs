pub mod memory;
pub mod models;
pub mod paginate;
pub mod postgres;
pub mod seed;
pub mod store;

pub use memory::MemoryStore;
pub use paginate::{PageResult, PaginationLinks};
pub use postgres::PgStore;
pub use store::{Collection, Document, DocumentStore, FindOptions, StoreError};
