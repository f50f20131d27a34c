//! Durable, schema-versioned, partitioned storage
//!
//! - `schema`: partition declarations and additive migrations
//! - `engine`: the storage engine itself
//! - `error`: typed storage errors with quota classification

pub mod engine;
pub mod error;
pub mod schema;

pub use engine::{IndexRange, StorageEngine};
pub use error::{StorageError, StorageResult};
