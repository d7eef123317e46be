//! Storage backends for chunk files.
//!
//! A [`ChunkStore`] performs byte-level file operations and returns boxed
//! `Send` futures. The futures are not self-driving: the serializer spawns
//! them on its [`JobRunner`](crate::job::JobRunner) so sibling reads and
//! writes proceed concurrently.
//!
//! # Backends
//!
//! - [`FileSystemStore`]: native filesystem rooted at a directory
//! - [`MemoryStore`]: in-memory storage for tests and tools
//!
//! # Path contract
//!
//! Paths handed to a store are relative, forward-slash separated and already
//! normalized by [`path::normalize`]: no leading slash, no `.` or `..`
//! segments.

mod filesystem;
mod memory;
pub mod path;

pub use filesystem::FileSystemStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(err.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}

/// A boxed, `Send` future returning a store result.
pub type StoreFuture<T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send>>;

/// Byte-level storage used by the serializer.
pub trait ChunkStore: Send + Sync + 'static {
    /// Read the entire contents of a file.
    fn read(&self, path: &str) -> StoreFuture<Vec<u8>>;

    /// Names of the immediate children of a directory, sorted.
    ///
    /// A missing directory yields an empty list.
    fn list_dir(&self, path: &str) -> StoreFuture<Vec<String>>;

    /// Write a file, creating or truncating it. Takes ownership of `data`.
    fn write(&self, path: &str, data: Vec<u8>) -> StoreFuture<()>;

    /// Create a directory and any missing parents.
    fn create_dir(&self, path: &str) -> StoreFuture<()>;

    /// Remove a directory and everything below it. A missing directory is
    /// not an error.
    fn remove_dir_all(&self, path: &str) -> StoreFuture<()>;
}
