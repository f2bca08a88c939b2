pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::DatabaseError;
pub use memory::{MemoryStore, RowCounts};
pub use postgres::PgStore;
pub use store::{CertificateRepository, ContentReader, ProgressRepository, Store, UnitOfWork};
