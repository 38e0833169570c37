//! Save store adapters.

mod memory;
mod sqlite;

pub use memory::{InMemoryCounterStore, InMemoryStore};
pub use sqlite::SqliteStore;
