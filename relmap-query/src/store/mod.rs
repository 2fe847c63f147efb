//! Bundled query engines.

mod memory;

pub use memory::MemoryStore;
