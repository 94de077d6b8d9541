//! Cache generation storage.
//!
//! The controller sees one shared key-value resource holding named cache
//! generations. Backends guarantee atomic per-key read/write; concurrent
//! writers for the same key resolve to last write wins, which the serving
//! policy tolerates.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CacheEntry, CacheStore};
