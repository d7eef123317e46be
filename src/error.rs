//! Error types for the mesh serializer.

use thiserror::Error;

use crate::chunk::ChunkError;
use crate::store::StoreError;

/// Errors surfaced by the serializer and its jobs.
#[derive(Error, Debug)]
pub enum SerializerError {
    /// A chunk failed validation during decode.
    #[error("malformed chunk {chunk}: {source}")]
    MalformedChunk {
        chunk: String,
        #[source]
        source: ChunkError,
    },
    /// A storage operation failed for the given path.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: StoreError,
    },
    /// Save or load requested through the localization collaborator while not localized.
    #[error("not localized into a space")]
    NotLocalized,
    /// The space identifier cannot be used as a directory name.
    #[error("invalid space id {0:?}")]
    InvalidSpaceId(String),
    /// The batch was cancelled before this item was issued.
    #[error("cancelled")]
    Cancelled,
    /// A job panicked or was dropped before delivering its result.
    #[error("job failed: {0}")]
    JobFailed(String),
    /// `complete_and_collect` was called before the job finished.
    #[error("job has not completed yet")]
    JobPending,
    /// The job runtime could not be started.
    #[error("failed to start job runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl SerializerError {
    pub(crate) fn io(path: impl Into<String>, source: StoreError) -> Self {
        SerializerError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(chunk: impl Into<String>, source: ChunkError) -> Self {
        SerializerError::MalformedChunk {
            chunk: chunk.into(),
            source,
        }
    }
}

pub type SerializerResult<T> = Result<T, SerializerError>;
