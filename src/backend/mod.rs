mod interface;
mod json_store;
mod memory_store;
mod preferences;

pub use interface::{LedgerStore, Result, Revision, Snapshot, StoreError};
pub use json_store::JsonStore;
pub use memory_store::MemoryStore;
pub use preferences::{PreferenceStore, Preferences};
