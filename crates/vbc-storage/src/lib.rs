//! vbc-storage
//!
//! Storage backends for the orchestrator: an S3 state store with ETag
//! optimistic locking, and a data source reading extracts from disk.

pub mod client;
pub mod error;
pub mod file_source;
pub mod objects;
pub mod s3_store;
pub mod state;

pub use crate::error::StorageError;
pub use crate::file_source::FileDataSource;
pub use crate::s3_store::S3StateStore;
