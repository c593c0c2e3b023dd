pub mod catalog;
pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use catalog::Catalog;
pub use engine::StorageEngine;
pub use memory::InMemoryStorage;
pub use persistence::{
    DatabaseSnapshot, DurabilityMode, PersistenceManager, SnapshotManager, WalEntry, WalManager,
};
pub use table::{Table, TableSchema, TableStorageEstimate};
