//! Binary layout of a mesh chunk.
//!
//! A chunk is a flat little-endian byte sequence with no padding:
//!
//! | offset | field                | type            |
//! |--------|----------------------|-----------------|
//! | 0      | vertex count         | `i32`           |
//! | 4      | vertex buffer length | `i32`           |
//! | 8      | index count          | `i32`           |
//! | 12     | index buffer length  | `i32`           |
//! | 16     | placement pose       | `7 × f32`       |
//! | 44     | vertex buffer        | `Vertex × n`    |
//! | 44 + v | index buffer         | `u16 × m`       |
//!
//! The pose is stored as position x, y, z followed by rotation x, y, z, w.

mod decode;
mod encode;

pub use decode::{DecodedChunk, decode_chunk};
pub use encode::{encode_chunk, encode_mesh};

use thiserror::Error;

use crate::buffer::{INDEX_SIZE, Vertex};
use crate::pose::Pose;

/// Size of the four leading length fields.
pub const HEADER_SIZE: usize = 4 * std::mem::size_of::<i32>();
/// Size of the placement pose block.
pub const POSE_SIZE: usize = Pose::FLOAT_COUNT * std::mem::size_of::<f32>();
/// Offset of the pose block.
pub const POSE_OFFSET: usize = HEADER_SIZE;
/// Offset of the vertex buffer.
pub const DATA_OFFSET: usize = HEADER_SIZE + POSE_SIZE;

/// Total encoded size for the given buffer lengths.
pub fn chunk_len(vertex_buffer_len: usize, index_buffer_len: usize) -> usize {
    DATA_OFFSET + vertex_buffer_len + index_buffer_len
}

/// Reasons a byte buffer is not a well-formed chunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk is {actual} bytes, need at least {needed}")]
    Truncated { needed: usize, actual: usize },
    #[error("chunk is {actual} bytes but its header declares {expected}")]
    TrailingBytes { expected: usize, actual: usize },
    #[error("header field {field} is negative ({value})")]
    NegativeField { field: &'static str, value: i32 },
    #[error("{field} declares {declared} bytes, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        expected: usize,
    },
    #[error("index count {index_count} is not a multiple of 3")]
    NotTriangles { index_count: usize },
}

/// The four length fields at the start of every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub vertex_count: i32,
    pub vertex_buffer_len: i32,
    pub index_count: i32,
    pub index_buffer_len: i32,
}

impl ChunkHeader {
    fn fields(&self) -> [i32; 4] {
        [
            self.vertex_count,
            self.vertex_buffer_len,
            self.index_count,
            self.index_buffer_len,
        ]
    }

    /// Write the header into the first [`HEADER_SIZE`] bytes of `out`.
    pub fn write(&self, out: &mut [u8]) {
        for (slot, value) in out[..HEADER_SIZE].chunks_exact_mut(4).zip(self.fields()) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Read a header from the start of `bytes`.
    pub fn read(bytes: &[u8]) -> Result<Self, ChunkError> {
        if bytes.len() < DATA_OFFSET {
            return Err(ChunkError::Truncated {
                needed: DATA_OFFSET,
                actual: bytes.len(),
            });
        }
        let field = |i: usize| {
            let start = i * 4;
            i32::from_le_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ])
        };
        Ok(Self {
            vertex_count: field(0),
            vertex_buffer_len: field(1),
            index_count: field(2),
            index_buffer_len: field(3),
        })
    }

    /// Check the header's internal consistency and return the layout it describes.
    pub fn validate(&self) -> Result<ChunkLayout, ChunkError> {
        let vertex_count = non_negative("vertex_count", self.vertex_count)?;
        let vertex_buffer_len = non_negative("vertex_buffer_len", self.vertex_buffer_len)?;
        let index_count = non_negative("index_count", self.index_count)?;
        let index_buffer_len = non_negative("index_buffer_len", self.index_buffer_len)?;

        let expected_vertex_len = vertex_count.saturating_mul(Vertex::SIZE);
        if vertex_buffer_len != expected_vertex_len {
            return Err(ChunkError::LengthMismatch {
                field: "vertex_buffer_len",
                declared: vertex_buffer_len,
                expected: expected_vertex_len,
            });
        }
        let expected_index_len = index_count.saturating_mul(INDEX_SIZE);
        if index_buffer_len != expected_index_len {
            return Err(ChunkError::LengthMismatch {
                field: "index_buffer_len",
                declared: index_buffer_len,
                expected: expected_index_len,
            });
        }
        if index_count % 3 != 0 {
            return Err(ChunkError::NotTriangles { index_count });
        }

        Ok(ChunkLayout {
            vertex_count,
            index_count,
            vertex_buffer_len,
            index_buffer_len,
        })
    }
}

fn non_negative(field: &'static str, value: i32) -> Result<usize, ChunkError> {
    usize::try_from(value).map_err(|_| ChunkError::NegativeField { field, value })
}

/// Validated sizes of a chunk's payload sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub vertex_count: usize,
    pub index_count: usize,
    pub vertex_buffer_len: usize,
    pub index_buffer_len: usize,
}

impl ChunkLayout {
    pub fn total_len(&self) -> usize {
        chunk_len(self.vertex_buffer_len, self.index_buffer_len)
    }

    pub fn vertex_range(&self) -> std::ops::Range<usize> {
        DATA_OFFSET..DATA_OFFSET + self.vertex_buffer_len
    }

    pub fn index_range(&self) -> std::ops::Range<usize> {
        let start = DATA_OFFSET + self.vertex_buffer_len;
        start..start + self.index_buffer_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_constants() {
        assert_eq!(HEADER_SIZE, 16);
        assert_eq!(POSE_SIZE, 28);
        assert_eq!(DATA_OFFSET, 44);
        assert_eq!(chunk_len(96, 12), 152);
    }

    #[test]
    fn header_write_then_read() {
        let header = ChunkHeader {
            vertex_count: 4,
            vertex_buffer_len: 96,
            index_count: 6,
            index_buffer_len: 12,
        };
        let mut bytes = vec![0u8; DATA_OFFSET];
        header.write(&mut bytes);
        assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &12i32.to_le_bytes());
        assert_eq!(ChunkHeader::read(&bytes).unwrap(), header);
    }

    #[test]
    fn validate_rejects_negative_counts() {
        let header = ChunkHeader {
            vertex_count: -1,
            vertex_buffer_len: 0,
            index_count: 0,
            index_buffer_len: 0,
        };
        assert!(matches!(
            header.validate(),
            Err(ChunkError::NegativeField {
                field: "vertex_count",
                value: -1
            })
        ));
    }

    #[test]
    fn validate_rejects_mismatched_lengths() {
        let header = ChunkHeader {
            vertex_count: 2,
            vertex_buffer_len: 47,
            index_count: 0,
            index_buffer_len: 0,
        };
        assert!(matches!(
            header.validate(),
            Err(ChunkError::LengthMismatch {
                field: "vertex_buffer_len",
                declared: 47,
                expected: 48
            })
        ));
    }

    #[test]
    fn validate_rejects_non_triangle_lists() {
        let header = ChunkHeader {
            vertex_count: 0,
            vertex_buffer_len: 0,
            index_count: 4,
            index_buffer_len: 8,
        };
        assert_eq!(
            header.validate(),
            Err(ChunkError::NotTriangles { index_count: 4 })
        );
    }

    #[test]
    fn layout_ranges_are_contiguous() {
        let layout = ChunkLayout {
            vertex_count: 4,
            index_count: 6,
            vertex_buffer_len: 96,
            index_buffer_len: 12,
        };
        assert_eq!(layout.vertex_range(), 44..140);
        assert_eq!(layout.index_range(), 140..152);
        assert_eq!(layout.total_len(), 152);
    }
}
