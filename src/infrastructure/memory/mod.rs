pub mod in_memory_remote_store;

pub use in_memory_remote_store::InMemoryRemoteStore;
