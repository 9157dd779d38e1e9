pub mod postgres_remote_store;

pub use postgres_remote_store::PostgresRemoteStore;
