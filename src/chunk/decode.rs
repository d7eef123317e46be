use super::{ChunkError, ChunkHeader, DATA_OFFSET, POSE_OFFSET};
use crate::buffer::{INDEX_SIZE, Vertex};
use crate::pose::Pose;

/// Contents of one decoded chunk.
///
/// All buffers are fresh allocations; nothing aliases the input bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub vertex_count: usize,
    pub index_count: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub pose: Pose,
}

/// Parse one chunk.
///
/// The header is validated against itself and against the input length
/// before any payload is sliced. Inputs shorter or longer than the header
/// declares are rejected.
pub fn decode_chunk(bytes: &[u8]) -> Result<DecodedChunk, ChunkError> {
    let header = ChunkHeader::read(bytes)?;
    let layout = header.validate()?;

    let expected = layout.total_len();
    if bytes.len() < expected {
        return Err(ChunkError::Truncated {
            needed: expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(ChunkError::TrailingBytes {
            expected,
            actual: bytes.len(),
        });
    }

    let pose = read_pose(&bytes[POSE_OFFSET..DATA_OFFSET]);
    let vertices = read_vertices(&bytes[layout.vertex_range()]);
    let indices = bytes[layout.index_range()]
        .chunks_exact(INDEX_SIZE)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();

    Ok(DecodedChunk {
        vertex_count: layout.vertex_count,
        index_count: layout.index_count,
        vertices,
        indices,
        pose,
    })
}

fn read_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_pose(bytes: &[u8]) -> Pose {
    let mut values = [0.0f32; Pose::FLOAT_COUNT];
    for (value, b) in values.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = read_f32(b);
    }
    Pose::from_array(values)
}

fn read_vertices(bytes: &[u8]) -> Vec<Vertex> {
    if cfg!(target_endian = "little") {
        // Input may sit at any alignment.
        return bytes
            .chunks_exact(Vertex::SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect();
    }
    bytes
        .chunks_exact(Vertex::SIZE)
        .map(|v| Vertex {
            position: [read_f32(&v[0..4]), read_f32(&v[4..8]), read_f32(&v[8..12])],
            normal: [read_f32(&v[12..16]), read_f32(&v[16..20]), read_f32(&v[20..24])],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SourceMesh;
    use crate::chunk::encode_mesh;
    use glam::{Quat, Vec3};

    fn two_triangles() -> SourceMesh {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([1.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            Vertex::new([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ];
        SourceMesh::new(vertices, vec![0u16, 1, 2, 2, 3, 0]).unwrap()
    }

    #[test]
    fn decode_known_chunk() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_xyzw(0.0, 0.0, 0.0, 1.0));
        let mesh = two_triangles();
        let chunk = encode_mesh(&mesh, &pose);
        assert_eq!(chunk.len(), 152);

        let decoded = decode_chunk(chunk.as_bytes()).unwrap();
        assert_eq!(decoded.vertex_count, 4);
        assert_eq!(decoded.index_count, 6);
        assert_eq!(decoded.pose, pose);
        assert_eq!(decoded.vertices, mesh.vertices());
        assert_eq!(decoded.indices, mesh.indices());
    }

    #[test]
    fn decoded_buffers_outlive_input() {
        let chunk = encode_mesh(&two_triangles(), &Pose::IDENTITY);
        let decoded = decode_chunk(chunk.as_bytes()).unwrap();
        drop(chunk);
        assert_eq!(decoded.vertices.len(), 4);
    }

    #[test]
    fn decodes_from_unaligned_input() {
        let mesh = two_triangles();
        let chunk = encode_mesh(&mesh, &Pose::IDENTITY);
        let mut padded = vec![0u8];
        padded.extend_from_slice(chunk.as_bytes());

        let decoded = decode_chunk(&padded[1..]).unwrap();
        assert_eq!(decoded.vertices, mesh.vertices());
        assert_eq!(decoded.indices, mesh.indices());
    }

    #[test]
    fn rejects_header_only_input() {
        assert_eq!(
            decode_chunk(&[0u8; 10]),
            Err(ChunkError::Truncated {
                needed: DATA_OFFSET,
                actual: 10
            })
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode_mesh(&two_triangles(), &Pose::IDENTITY).into_bytes();
        bytes.push(0);
        assert_eq!(
            decode_chunk(&bytes),
            Err(ChunkError::TrailingBytes {
                expected: 152,
                actual: 153
            })
        );
    }

    #[test]
    fn rejects_lying_header() {
        let mut bytes = encode_mesh(&two_triangles(), &Pose::IDENTITY).into_bytes();
        // Claim five vertices while keeping the buffer length.
        bytes[0..4].copy_from_slice(&5i32.to_le_bytes());
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkError::LengthMismatch { .. })
        ));
    }
}
