//! Wavefront OBJ loading
//!
//! Every model in the file is merged into a single [`MeshData`] in the full
//! vertex layout. Missing channels are filled in: white (or the material's
//! diffuse color) for color, zero for texture coordinates, and smooth normals
//! computed from the faces when the file has none.

use std::path::Path;

use crate::error::Result;
use crate::gfx::geometry::{calculate_vertex_normals, MeshData};
use crate::gfx::scene::vertex::VertexLayout;

const DEFAULT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Loads an OBJ file (and its MTL, when present) into one mesh
pub fn load_model(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| {
        log::error!("failed to load model '{}': {}", path.display(), e);
        e
    })?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!(
            "no materials for '{}' ({}), using white",
            path.display(),
            e
        );
        Vec::new()
    });

    let mut data = MeshData::new(VertexLayout::FULL);

    for model in &models {
        let mesh = &model.mesh;
        let base = data.vertex_count() as u32;

        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();

        // Use normals from OBJ if available, otherwise calculate them
        let normals: Vec<[f32; 3]> = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        } else {
            calculate_vertex_normals(&positions, &mesh.indices)
        };

        let has_uvs = mesh.texcoords.len() / 2 == positions.len();
        let color = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .and_then(|material| material.diffuse)
            .unwrap_or(DEFAULT_COLOR);

        for (i, position) in positions.iter().enumerate() {
            let uv = if has_uvs {
                // OBJ puts v = 0 at the bottom of the image
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };

            data.vertices.extend_from_slice(position);
            data.vertices.extend_from_slice(&color);
            data.vertices.extend_from_slice(&uv);
            data.vertices.extend_from_slice(&normals[i]);
        }

        data.indices
            .extend(mesh.indices.iter().map(|index| base + index));
    }

    log::info!(
        "loaded model '{}': {} models, {} vertices, {} triangles",
        path.display(),
        models.len(),
        data.vertex_count(),
        data.triangle_count()
    );

    Ok(data)
}
