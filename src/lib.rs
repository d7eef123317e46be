//! Spatial Mesh Serializer - binary persistence for scanned surface meshes
//!
//! Meshes captured by a spatial-scanning device are packed into fixed-layout
//! binary chunks together with their placement pose, written one file per
//! chunk under a per-space directory, and loaded back into mesh handles.
//!
//! # Features
//! - Little-endian chunk codec with strict length validation on decode
//! - Encode and decode jobs on a thread pool with cooperative fan-in
//! - Concurrent chunk file I/O over filesystem or in-memory stores
//! - Full replace on save, per-chunk failure reports on load
//! - Localization and placement seams for engine integration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use spatial_mesh_serializer::{
//!     JobRunner, MeshSerializer, MemoryStore, Pose, generators::generate_grid,
//! };
//!
//! let runner = JobRunner::new(2, 4)?;
//! let serializer = MeshSerializer::new(runner.clone(), Arc::new(MemoryStore::new()), "meshes")?;
//!
//! runner.block_on(async {
//!     let chunks = serializer
//!         .serialize_meshes(&[generate_grid(8, 0.25, [0.0; 3])], Pose::IDENTITY)
//!         .await?;
//!     serializer.save("living-room", chunks).await?;
//!     let loaded = serializer.load("living-room").await?;
//!     assert_eq!(loaded.map(|r| r.meshes.len()), Some(1));
//!     Ok::<_, spatial_mesh_serializer::SerializerError>(())
//! })?;
//! # Ok::<_, spatial_mesh_serializer::SerializerError>(())
//! ```

pub mod buffer;
pub mod cancellation;
pub mod chunk;
pub mod codec_jobs;
pub mod config;
pub mod error;
pub mod generators;
pub mod job;
pub mod localization;
pub mod mesh;
pub mod placement;
pub mod pose;
pub mod serializer;
pub mod store;

pub use buffer::{ChunkBuffer, SourceMesh, Vertex};
pub use cancellation::CancellationToken;
pub use chunk::{ChunkError, DecodedChunk, decode_chunk, encode_chunk, encode_mesh};
pub use codec_jobs::{DecodeJob, EncodeJob};
pub use config::{SerializerConfig, load_config, load_or_default};
pub use error::{SerializerError, SerializerResult};
pub use job::{JobHandle, JobRunner, MeshJob, TaskHandle};
pub use localization::{Localizer, SpaceContext};
pub use mesh::{Aabb, MeshHandle};
pub use placement::{MeshInstantiator, instantiate};
pub use pose::Pose;
pub use serializer::{ChunkFailure, LoadReport, MeshSerializer, SaveReport};
pub use store::{ChunkStore, FileSystemStore, MemoryStore, StoreError};
