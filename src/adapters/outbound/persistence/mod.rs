mod in_memory_store;
mod sql_store;

pub use in_memory_store::{InMemoryStore, InMemoryTransaction};
pub use sql_store::{SqlStore, SqlTransaction};
