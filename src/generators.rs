//! Mesh generators for common shapes.
//!
//! Scanned surfaces are the real input; these exist for demos and tests. All
//! generators produce [`SourceMesh`] values with 16-bit triangle-list indices.

use std::f32::consts::PI;

use crate::buffer::{SourceMesh, Vertex};

const MAX_VERTICES: u32 = u16::MAX as u32 + 1;

/// Generate a UV sphere mesh.
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Number of longitudinal segments (around the equator)
/// * `rings` - Number of latitudinal rings (from pole to pole)
///
/// # Panics
///
/// Panics if the sphere needs more vertices than 16-bit indices can address.
pub fn generate_sphere(radius: f32, segments: u32, rings: u32) -> SourceMesh {
    assert!(
        (rings + 1) * (segments + 1) <= MAX_VERTICES,
        "sphere {segments}x{rings} exceeds 16-bit index range"
    );
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let theta = ring as f32 * PI / rings as f32;
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for segment in 0..=segments {
            let phi = segment as f32 * 2.0 * PI / segments as f32;

            let x = sin_theta * phi.cos();
            let y = cos_theta;
            let z = sin_theta * phi.sin();

            vertices.push(Vertex::new([x * radius, y * radius, z * radius], [x, y, z]));
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = (ring * (segments + 1) + segment) as u16;
            let next = current + segments as u16 + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    SourceMesh::from_triangles(vertices, indices)
}

/// Generate a quad on the XY plane facing +Z, centered at the origin.
pub fn generate_quad(half_width: f32, half_height: f32) -> SourceMesh {
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-half_width, -half_height, 0.0], normal),
        Vertex::new([half_width, -half_height, 0.0], normal),
        Vertex::new([half_width, half_height, 0.0], normal),
        Vertex::new([-half_width, half_height, 0.0], normal),
    ];
    SourceMesh::from_triangles(vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Generate a flat grid on the XZ plane facing +Y, like a patch of scanned
/// floor.
///
/// `cells` squares of `cell_size` along each axis, with `origin` as the
/// minimum corner.
///
/// # Panics
///
/// Panics if the grid needs more vertices than 16-bit indices can address.
pub fn generate_grid(cells: u32, cell_size: f32, origin: [f32; 3]) -> SourceMesh {
    let side = cells + 1;
    assert!(
        side * side <= MAX_VERTICES,
        "grid of {cells} cells exceeds 16-bit index range"
    );
    let normal = [0.0, 1.0, 0.0];

    let mut vertices = Vec::with_capacity((side * side) as usize);
    for z in 0..side {
        for x in 0..side {
            vertices.push(Vertex::new(
                [
                    origin[0] + x as f32 * cell_size,
                    origin[1],
                    origin[2] + z as f32 * cell_size,
                ],
                normal,
            ));
        }
    }

    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for z in 0..cells {
        for x in 0..cells {
            let a = (z * side + x) as u16;
            let b = a + 1;
            let c = a + side as u16;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    SourceMesh::from_triangles(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sphere() {
        let mesh = generate_sphere(1.0, 8, 4);
        // (rings+1) * (segments+1) = 5 * 9 = 45 vertices
        assert_eq!(mesh.vertex_count(), 45);
        // rings * segments * 6 = 4 * 8 * 6 = 192 indices
        assert_eq!(mesh.index_count(), 192);
        assert!(mesh.indices().iter().all(|&i| (i as usize) < 45));
    }

    #[test]
    fn test_generate_quad() {
        let mesh = generate_quad(0.5, 0.5);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertex_bytes().len(), 4 * 24);
    }

    #[test]
    fn test_generate_grid() {
        let mesh = generate_grid(3, 0.5, [1.0, 0.0, 1.0]);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.index_count(), 54);
        let last = mesh.vertices().last().unwrap();
        assert_eq!(last.position, [2.5, 0.0, 2.5]);
    }

    #[test]
    fn largest_grid_fits_u16() {
        let mesh = generate_grid(255, 1.0, [0.0; 3]);
        assert_eq!(mesh.vertex_count(), 65536);
        assert_eq!(mesh.indices().iter().max(), Some(&u16::MAX));
    }

    #[test]
    #[should_panic(expected = "16-bit index range")]
    fn oversized_grid_panics() {
        generate_grid(256, 1.0, [0.0; 3]);
    }
}
