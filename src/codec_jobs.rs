//! Encode and decode jobs for the [`JobRunner`](crate::job::JobRunner).

use crate::buffer::{ChunkBuffer, SourceMesh};
use crate::chunk::{ChunkError, DecodedChunk, decode_chunk, encode_mesh};
use crate::error::{SerializerError, SerializerResult};
use crate::job::MeshJob;
use crate::mesh::MeshHandle;
use crate::pose::Pose;

/// Pack one source mesh into a chunk.
pub struct EncodeJob {
    mesh: SourceMesh,
    pose: Pose,
}

impl EncodeJob {
    pub fn new(mesh: SourceMesh, pose: Pose) -> Self {
        Self { mesh, pose }
    }
}

impl MeshJob for EncodeJob {
    type Output = ChunkBuffer;
    type Finished = ChunkBuffer;

    fn execute(self) -> ChunkBuffer {
        encode_mesh(&self.mesh, &self.pose)
    }

    fn finalize(output: ChunkBuffer) -> SerializerResult<ChunkBuffer> {
        Ok(output)
    }
}

/// Unpack one chunk into a [`MeshHandle`].
///
/// Takes ownership of the input buffer; it is released as soon as decoding
/// has copied out the payload, before the result leaves the pool thread.
pub struct DecodeJob {
    chunk_id: String,
    buffer: ChunkBuffer,
}

impl DecodeJob {
    pub fn new(chunk_id: impl Into<String>, buffer: ChunkBuffer) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            buffer,
        }
    }
}

/// Off-thread result of a [`DecodeJob`].
pub struct DecodeOutput {
    chunk_id: String,
    result: Result<DecodedChunk, ChunkError>,
}

impl MeshJob for DecodeJob {
    type Output = DecodeOutput;
    type Finished = MeshHandle;

    fn execute(self) -> DecodeOutput {
        let result = decode_chunk(self.buffer.as_bytes());
        drop(self.buffer);
        DecodeOutput {
            chunk_id: self.chunk_id,
            result,
        }
    }

    fn finalize(output: DecodeOutput) -> SerializerResult<MeshHandle> {
        match output.result {
            Ok(decoded) => Ok(MeshHandle::from_decoded(output.chunk_id, decoded)),
            Err(source) => Err(SerializerError::malformed(output.chunk_id, source)),
        }
    }
}
