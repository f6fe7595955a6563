//! # Procedural Geometry
//!
//! The Mesh Factory: pure functions producing interleaved vertex data and
//! triangle-list indices for the canonical primitives, so simple scenes need
//! no model files.
//!
//! ## Supported Primitives
//!
//! - **Cube**: 24 vertices, per-face colors, UVs and normals
//! - **Diamond**: front/back quad pair joined by four side quads
//! - **Wall**: floor-anchored box of given footprint and height
//! - **Pyramid**: square base with an apex
//!
//! All triangles wind counter-clockwise when viewed from outside.
//!
//! ## Usage
//!
//! ```rust
//! use corral::gfx::geometry::{create_cube, create_wall};
//!
//! let cube = create_cube(1.0);
//! assert_eq!(cube.vertex_count(), 24);
//!
//! let wall = create_wall(2.0, 0.1, 6.0);
//! assert_eq!(wall.triangle_count(), 12);
//! ```

pub mod primitives;

pub use primitives::*;

use crate::gfx::scene::vertex::{VertexChannel, VertexLayout};

/// Vertex and index data ready to become a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Interleaved floats, `layout.stride()` per vertex
    pub vertices: Vec<f32>,
    /// Triangle list (counter-clockwise winding)
    pub indices: Vec<u32>,
    pub layout: VertexLayout,
}

impl MeshData {
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            layout,
        }
    }

    /// Get the number of vertices in this geometry
    pub fn vertex_count(&self) -> usize {
        self.layout.vertex_count(self.vertices.len())
    }

    /// Get the number of triangles in this geometry
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Position of vertex `index`
    pub fn position(&self, index: usize) -> [f32; 3] {
        let start = index * self.layout.stride();
        [
            self.vertices[start],
            self.vertices[start + 1],
            self.vertices[start + 2],
        ]
    }

    /// Iterates vertex positions in order
    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices
            .chunks_exact(self.layout.stride())
            .map(|v| [v[0], v[1], v[2]])
    }

    /// Reads one channel of vertex `index`, `None` if the layout lacks it
    pub fn channel(&self, index: usize, channel: VertexChannel) -> Option<&[f32]> {
        let offset = self.layout.offset(channel)?;
        let start = index * self.layout.stride() + offset;
        self.vertices.get(start..start + channel.components())
    }
}

impl Default for MeshData {
    fn default() -> Self {
        Self::new(VertexLayout::FULL)
    }
}

/// Smooth per-vertex normals: the averaged, normalized face normals of every
/// triangle touching the vertex. Vertices no triangle references get a zero
/// normal.
pub fn calculate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);
        let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

        let face_normal = [
            edge1[1] * edge2[2] - edge1[2] * edge2[1],
            edge1[2] * edge2[0] - edge1[0] * edge2[2],
            edge1[0] * edge2[1] - edge1[1] * edge2[0],
        ];

        for vertex in [i0, i1, i2] {
            for axis in 0..3 {
                normals[vertex][axis] += face_normal[axis];
            }
        }
    }

    for normal in &mut normals {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        if length > 0.0 {
            normal.iter_mut().for_each(|c| *c /= length);
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_quad_normals_point_up() {
        let positions = [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [5.0, 5.0, 5.0],
        ];
        let normals = calculate_vertex_normals(&positions, &[0, 1, 2, 0, 2, 3]);

        for normal in &normals[..4] {
            assert!((normal[1] - 1.0).abs() < 1e-6, "{:?}", normal);
        }
        assert_eq!(normals[4], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn channel_reads_respect_layout() {
        let cube = create_cube(2.0);
        assert_eq!(cube.channel(0, VertexChannel::Normal), Some(&[0.0, 0.0, 1.0][..]));

        let wall = create_wall(2.0, 0.1, 6.0);
        assert_eq!(wall.channel(0, VertexChannel::Normal), None);
        assert_eq!(wall.position(2), [1.0, 6.0, 0.05]);
    }
}
