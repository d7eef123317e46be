//! Decoded mesh handles.

use glam::Vec3;

use crate::buffer::Vertex;
use crate::chunk::DecodedChunk;
use crate::pose::Pose;

/// Axis-aligned bounding box in the chunk's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tight bounds around the vertex positions, or `None` for no vertices.
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        let mut iter = vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |aabb, p| Self {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        }))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Bounds of all eight corners after placing the box at `pose`.
    pub fn transformed(&self, pose: &Pose) -> Aabb {
        let corner = |i: u8| {
            pose.transform_point(Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            ))
        };
        let first = corner(0);
        (1..8).map(corner).fold(Self::new(first, first), |aabb, p| Self {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        })
    }
}

/// One decoded chunk, ready for a renderer or collider.
///
/// Owns its vertex and index storage. Not `Clone`: the caller is the single
/// owner and gives the storage up with [`into_buffers`](Self::into_buffers).
#[derive(Debug, PartialEq)]
pub struct MeshHandle {
    vertex_count: usize,
    index_count: usize,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    pose: Pose,
    chunk_id: String,
    bounds: Option<Aabb>,
}

impl MeshHandle {
    /// Assemble a handle from decoded data, computing bounds.
    pub fn from_decoded(chunk_id: impl Into<String>, decoded: DecodedChunk) -> Self {
        let bounds = Aabb::from_vertices(&decoded.vertices);
        Self {
            vertex_count: decoded.vertex_count,
            index_count: decoded.index_count,
            vertices: decoded.vertices,
            indices: decoded.indices,
            pose: decoded.pose,
            chunk_id: chunk_id.into(),
            bounds,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Indices widened for consumers that require 32-bit index buffers.
    pub fn indices_u32(&self) -> Vec<u32> {
        self.indices.iter().map(|&i| u32::from(i)).collect()
    }

    /// Raw interleaved vertex bytes in native byte order.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Placement pose stored with this chunk.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// File stem the chunk was loaded from (`chunk-3`, for instance).
    pub fn chunk_id(&self) -> &str {
        &self.chunk_id
    }

    /// Bounds of the vertex positions, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Hand the vertex and index storage to a new owner.
    pub fn into_buffers(self) -> (Vec<Vertex>, Vec<u16>) {
        (self.vertices, self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(positions: &[[f32; 3]]) -> DecodedChunk {
        let vertices: Vec<Vertex> = positions
            .iter()
            .map(|&p| Vertex::new(p, [0.0, 1.0, 0.0]))
            .collect();
        DecodedChunk {
            vertex_count: vertices.len(),
            index_count: 3,
            vertices,
            indices: vec![0, 1, 65535],
            pose: Pose::from_translation(Vec3::X),
        }
    }

    #[test]
    fn bounds_are_recomputed() {
        let handle = MeshHandle::from_decoded(
            "chunk-0",
            decoded(&[[-1.0, 0.0, 2.0], [3.0, -4.0, 0.5], [0.0, 5.0, 1.0]]),
        );
        let bounds = handle.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -4.0, 0.5));
        assert_eq!(bounds.max, Vec3::new(3.0, 5.0, 2.0));
        assert_eq!(bounds.size(), Vec3::new(4.0, 9.0, 1.5));
    }

    #[test]
    fn transformed_bounds_cover_rotated_corners() {
        let unit = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let pose = Pose::new(
            Vec3::new(10.0, 0.0, 0.0),
            glam::Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        );
        let placed = unit.transformed(&pose);

        let half = 2.0f32.sqrt();
        assert!((placed.max.x - (10.0 + half)).abs() < 1e-5);
        assert!((placed.min.x - (10.0 - half)).abs() < 1e-5);
        assert!((placed.max.z - half).abs() < 1e-5);
        assert!((placed.max.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn transformed_by_identity_is_unchanged() {
        let aabb = Aabb::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(3.0, 4.0, 1.0));
        assert_eq!(aabb.transformed(&Pose::IDENTITY), aabb);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let handle = MeshHandle::from_decoded("chunk-0", decoded(&[]));
        assert_eq!(handle.bounds(), None);
    }

    #[test]
    fn indices_zero_extend() {
        let handle = MeshHandle::from_decoded("chunk-1", decoded(&[[0.0; 3]]));
        assert_eq!(handle.indices_u32(), vec![0, 1, 65535]);
    }

    #[test]
    fn into_buffers_transfers_storage() {
        let handle = MeshHandle::from_decoded("chunk-2", decoded(&[[1.0, 2.0, 3.0]]));
        assert_eq!(handle.chunk_id(), "chunk-2");
        assert_eq!(handle.vertex_bytes().len(), Vertex::SIZE);
        let (vertices, indices) = handle.into_buffers();
        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(indices.len(), 3);
    }
}
