//! Mesh buffers and their ownership rules.
//!
//! Every byte buffer in a save or load batch has exactly one owner:
//!
//! - Encode jobs allocate a [`ChunkBuffer`] and hand it to the serializer,
//!   which moves it into a write task. The write task drops it whether the
//!   write succeeded or not.
//! - Read tasks produce a [`ChunkBuffer`], which is moved into a decode job
//!   and dropped once decoding has copied out what it needs.
//!
//! None of these types implement `Clone`. Transfers are moves.

use std::borrow::Cow;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::chunk::ChunkError;

/// Interleaved vertex record as stored on the wire: position then normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Size of one vertex record in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Size of one index in bytes.
pub const INDEX_SIZE: usize = std::mem::size_of::<u16>();

/// An owned, move-only byte buffer holding one encoded chunk.
#[derive(Debug, PartialEq, Eq)]
pub struct ChunkBuffer {
    bytes: Vec<u8>,
}

impl ChunkBuffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Transfer the storage to a new owner (typically a file writer).
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read-only source geometry for an encode job.
///
/// Vertex and index storage is shared with the caller through `Arc` so a job
/// can read it off-thread without copying. Jobs never write to it.
#[derive(Debug, Clone)]
pub struct SourceMesh {
    vertices: Arc<[Vertex]>,
    indices: Arc<[u16]>,
}

impl SourceMesh {
    /// Build a source mesh from typed buffers.
    ///
    /// Fails when the index count does not describe a triangle list.
    pub fn new(
        vertices: impl Into<Arc<[Vertex]>>,
        indices: impl Into<Arc<[u16]>>,
    ) -> Result<Self, ChunkError> {
        let vertices = vertices.into();
        let indices = indices.into();
        if indices.len() % 3 != 0 {
            return Err(ChunkError::NotTriangles {
                index_count: indices.len(),
            });
        }
        Ok(Self { vertices, indices })
    }

    /// Build from buffers already known to form a triangle list.
    pub(crate) fn from_triangles(vertices: Vec<Vertex>, indices: Vec<u16>) -> Self {
        debug_assert_eq!(indices.len() % 3, 0);
        Self {
            vertices: vertices.into(),
            indices: indices.into(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Vertex bytes in little-endian order.
    pub fn vertex_bytes(&self) -> Cow<'_, [u8]> {
        if cfg!(target_endian = "little") {
            Cow::Borrowed(bytemuck::cast_slice(&self.vertices))
        } else {
            Cow::Owned(
                self.vertices
                    .iter()
                    .flat_map(|v| v.position.iter().chain(v.normal.iter()))
                    .flat_map(|f| f.to_le_bytes())
                    .collect(),
            )
        }
    }

    /// Index bytes in little-endian order.
    pub fn index_bytes(&self) -> Vec<u8> {
        self.indices.iter().flat_map(|i| i.to_le_bytes()).collect()
    }
}
