use super::{ChunkHeader, DATA_OFFSET, HEADER_SIZE, POSE_OFFSET, chunk_len};
use crate::buffer::{ChunkBuffer, INDEX_SIZE, SourceMesh, Vertex};
use crate::pose::Pose;

/// Pack one mesh into a newly allocated chunk.
///
/// `vertex_bytes` must hold exactly `vertex_count` interleaved [`Vertex`]
/// records and `index_bytes` exactly `index_count` little-endian `u16`
/// indices. A mismatch is a caller bug: debug builds panic, release builds
/// truncate both sections to the largest whole prefix the slices and counts
/// agree on, so the output is always a well-formed chunk.
///
/// Geometry content is not inspected.
pub fn encode_chunk(
    vertex_count: usize,
    vertex_bytes: &[u8],
    index_count: usize,
    index_bytes: &[u8],
    pose: &Pose,
) -> ChunkBuffer {
    debug_assert_eq!(
        vertex_bytes.len(),
        vertex_count * Vertex::SIZE,
        "vertex buffer does not match vertex count"
    );
    debug_assert_eq!(
        index_bytes.len(),
        index_count * INDEX_SIZE,
        "index buffer does not match index count"
    );

    let vertex_bytes = whole_prefix(
        vertex_bytes,
        vertex_count.saturating_mul(Vertex::SIZE),
        Vertex::SIZE,
    );
    // Whole triangles only.
    let index_bytes = whole_prefix(
        index_bytes,
        index_count.saturating_mul(INDEX_SIZE),
        INDEX_SIZE * 3,
    );

    let header = ChunkHeader {
        vertex_count: (vertex_bytes.len() / Vertex::SIZE) as i32,
        vertex_buffer_len: vertex_bytes.len() as i32,
        index_count: (index_bytes.len() / INDEX_SIZE) as i32,
        index_buffer_len: index_bytes.len() as i32,
    };

    let mut out = vec![0u8; chunk_len(vertex_bytes.len(), index_bytes.len())];
    header.write(&mut out[..HEADER_SIZE]);
    for (slot, value) in out[POSE_OFFSET..DATA_OFFSET]
        .chunks_exact_mut(4)
        .zip(pose.to_array())
    {
        slot.copy_from_slice(&value.to_le_bytes());
    }

    let index_start = DATA_OFFSET + vertex_bytes.len();
    out[DATA_OFFSET..index_start].copy_from_slice(vertex_bytes);
    out[index_start..].copy_from_slice(index_bytes);

    ChunkBuffer::from_bytes(out)
}

/// Encode a typed source mesh. Counts are derived from the buffers.
pub fn encode_mesh(mesh: &SourceMesh, pose: &Pose) -> ChunkBuffer {
    encode_chunk(
        mesh.vertex_count(),
        &mesh.vertex_bytes(),
        mesh.index_count(),
        &mesh.index_bytes(),
        pose,
    )
}

/// Longest prefix of whole `unit`-sized records that fits the slice, the
/// declared length and an `i32` length field.
fn whole_prefix(bytes: &[u8], declared_len: usize, unit: usize) -> &[u8] {
    let limit = bytes.len().min(declared_len).min(i32::MAX as usize);
    &bytes[..limit - limit % unit]
}
