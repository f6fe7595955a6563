//! # Primitive Shape Generation
//!
//! Cube vertices carry the full layout (position, color, uv, normal); the
//! diamond, wall and pyramid are position + color only.

use super::MeshData;
use crate::gfx::scene::vertex::VertexLayout;

pub const DEFAULT_CUBE_SIZE: f32 = 1.0;
pub const DEFAULT_DIAMOND_SIZE: f32 = 1.0;
pub const DEFAULT_PYRAMID_SIZE: f32 = 1.0;
pub const DEFAULT_WALL_LENGTH: f32 = 2.0;
pub const DEFAULT_WALL_WIDTH: f32 = 0.1;
pub const DEFAULT_WALL_HEIGHT: f32 = 6.0;

const CORNER_COLORS: [[f32; 3]; 4] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
];

const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

// (outward normal, tangent, bitangent) with tangent x bitangent = normal
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
];

/// Two counter-clockwise triangles covering the quad `a b c d`
fn quad(a: u32, b: u32, c: u32, d: u32) -> [u32; 6] {
    [a, b, c, a, c, d]
}

fn colored_vertices(positions: &[[f32; 3]], colors: &[[f32; 3]]) -> Vec<f32> {
    positions
        .iter()
        .zip(colors.iter().cycle())
        .flat_map(|(p, c)| p.iter().chain(c.iter()).copied())
        .collect()
}

/// Axis-aligned cube centered at the origin with edge length `size`.
///
/// Every face has its own four vertices so normals, UVs and corner colors
/// are per face: 24 vertices, 36 indices.
pub fn create_cube(size: f32) -> MeshData {
    let h = size / 2.0;
    let mut data = MeshData::new(VertexLayout::FULL);

    for (face, (n, u, v)) in CUBE_FACES.iter().enumerate() {
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        for (corner, (su, sv)) in corners.into_iter().enumerate() {
            for axis in 0..3 {
                data.vertices.push(h * (n[axis] + su * u[axis] + sv * v[axis]));
            }
            data.vertices.extend_from_slice(&CORNER_COLORS[corner]);
            data.vertices.extend_from_slice(&CORNER_UVS[corner]);
            data.vertices.extend_from_slice(n);
        }

        let base = (face * 4) as u32;
        data.indices
            .extend_from_slice(&quad(base, base + 1, base + 2, base + 3));
    }

    data
}

/// Diamond: a rhombus at `z = +size/2` and another at `z = -size/2`, joined
/// along their edges. 8 vertices, 36 indices.
pub fn create_diamond(size: f32) -> MeshData {
    let h = size / 2.0;
    let positions = [
        // front: left, top, right, bottom
        [-h, 0.0, h],
        [0.0, h, h],
        [h, 0.0, h],
        [0.0, -h, h],
        // back
        [-h, 0.0, -h],
        [0.0, h, -h],
        [h, 0.0, -h],
        [0.0, -h, -h],
    ];
    let colors = [
        [0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0],
        [0.0, 1.0, 1.0],
        [1.0, 0.0, 0.0],
        [1.0, 0.0, 1.0],
        [0.0, 1.0, 1.0],
        [1.0, 1.0, 0.0],
        [1.0, 1.0, 1.0],
    ];

    let faces = [
        quad(0, 3, 2, 1),
        quad(4, 5, 6, 7),
        quad(0, 1, 5, 4),
        quad(1, 2, 6, 5),
        quad(2, 3, 7, 6),
        quad(3, 0, 4, 7),
    ];

    MeshData {
        vertices: colored_vertices(&positions, &colors),
        indices: faces.concat(),
        layout: VertexLayout::EXTENDED,
    }
}

/// Floor-anchored box: `length` along x and `width` along z, both centered,
/// rising from `y = 0` to `y = height`. 8 vertices, 36 indices.
pub fn create_wall(length: f32, width: f32, height: f32) -> MeshData {
    let (x, z) = (length / 2.0, width / 2.0);
    let positions = [
        [-x, 0.0, z],
        [x, 0.0, z],
        [x, height, z],
        [-x, height, z],
        [-x, 0.0, -z],
        [x, 0.0, -z],
        [x, height, -z],
        [-x, height, -z],
    ];
    let colors = [[0.85, 0.85, 0.91], [0.85, 0.85, 0.85]];

    let faces = [
        quad(0, 1, 2, 3),
        quad(5, 4, 7, 6),
        quad(4, 0, 3, 7),
        quad(1, 5, 6, 2),
        quad(3, 2, 6, 7),
        quad(4, 5, 1, 0),
    ];

    MeshData {
        vertices: colored_vertices(&positions, &colors),
        indices: faces.concat(),
        layout: VertexLayout::EXTENDED,
    }
}

/// Square-based pyramid of base edge and height `size`, centered on the
/// origin. 5 vertices, 18 indices.
pub fn create_pyramid(size: f32) -> MeshData {
    let h = size / 2.0;
    let positions = [
        [-h, -h, h],
        [h, -h, h],
        [h, -h, -h],
        [-h, -h, -h],
        [0.0, h, 0.0],
    ];
    let colors = [
        [1.0, 0.5, 0.0],
        [1.0, 0.5, 0.0],
        [1.0, 0.5, 0.0],
        [1.0, 0.5, 0.0],
        [1.0, 1.0, 0.0],
    ];

    let indices = vec![
        0, 1, 4, //
        1, 2, 4, //
        2, 3, 4, //
        3, 0, 4, //
        0, 3, 2, //
        0, 2, 1,
    ];

    MeshData {
        vertices: colored_vertices(&positions, &colors),
        indices,
        layout: VertexLayout::EXTENDED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn assert_indices_in_range(data: &MeshData) {
        let count = data.vertex_count() as u32;
        assert!(data.indices.iter().all(|&i| i < count));
    }

    /// Every triangle's normal points away from the shape's vertex centroid
    fn assert_outward_winding(data: &MeshData) {
        let positions: Vec<Vector3<f32>> = data.positions().map(Vector3::from).collect();
        let center = positions.iter().sum::<Vector3<f32>>() / positions.len() as f32;

        for tri in data.indices.chunks_exact(3) {
            let [a, b, c] = [
                positions[tri[0] as usize],
                positions[tri[1] as usize],
                positions[tri[2] as usize],
            ];
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(
                normal.dot(centroid - center) > 0.0,
                "triangle {:?} winds inward",
                tri
            );
        }
    }

    #[test]
    fn test_cube_generation() {
        let cube = create_cube(DEFAULT_CUBE_SIZE);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.layout, VertexLayout::FULL);
        assert_indices_in_range(&cube);
        assert_outward_winding(&cube);
    }

    #[test]
    fn cube_vertices_lie_on_half_extent_box() {
        for size in [0.5, 1.0, 3.0] {
            let h = size / 2.0;
            let cube = create_cube(size);
            for p in cube.positions() {
                assert!(p.iter().all(|c| (c.abs() - h).abs() < 1e-6), "{:?}", p);
            }
        }
    }

    #[test]
    fn cube_normals_match_face_geometry() {
        let cube = create_cube(2.0);
        for vertex in 0..cube.vertex_count() {
            let p = cube.position(vertex);
            let n = cube
                .channel(vertex, crate::gfx::scene::vertex::VertexChannel::Normal)
                .unwrap();
            // the normal's axis is the one where the vertex sits on the face plane
            let axis = n.iter().position(|c| c.abs() == 1.0).unwrap();
            assert_eq!(p[axis], n[axis]);
        }
    }

    #[test]
    fn test_diamond_generation() {
        let diamond = create_diamond(DEFAULT_DIAMOND_SIZE);
        assert_eq!(diamond.vertex_count(), 8);
        assert_eq!(diamond.indices.len(), 36);
        assert_indices_in_range(&diamond);
        assert_outward_winding(&diamond);
    }

    #[test]
    fn test_wall_generation() {
        let wall = create_wall(DEFAULT_WALL_LENGTH, DEFAULT_WALL_WIDTH, DEFAULT_WALL_HEIGHT);
        assert_eq!(wall.vertex_count(), 8);
        assert_eq!(wall.indices.len(), 36);
        assert_indices_in_range(&wall);
        assert_outward_winding(&wall);

        let ys: Vec<f32> = wall.positions().map(|p| p[1]).collect();
        assert_eq!(ys.iter().cloned().fold(f32::INFINITY, f32::min), 0.0);
        assert_eq!(ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 6.0);
        assert!(wall.positions().all(|p| p[0].abs() == 1.0 && p[2].abs() == 0.05));
    }

    #[test]
    fn test_pyramid_generation() {
        let pyramid = create_pyramid(DEFAULT_PYRAMID_SIZE);
        assert_eq!(pyramid.vertex_count(), 5);
        assert_eq!(pyramid.triangle_count(), 6);
        assert_indices_in_range(&pyramid);
        assert_outward_winding(&pyramid);
    }
}
