//! Vertex deduplication and raw corner expansion

use anyhow::{Result, bail};
use hashbrown::HashMap;
use mrf_format::MAX_VERTICES;

use super::types::{Corner, SourceMesh, UniqueMesh, UniqueVertex};

/// Key precision: attributes are compared after rounding to 1e-6
const KEY_SCALE: f64 = 1e6;

/// Hashable (position, normal, uv) rounded to 1e-6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey([i64; 8]);

impl VertexKey {
    fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        let q = |x: f32| (x as f64 * KEY_SCALE).round() as i64;
        Self([
            q(position[0]),
            q(position[1]),
            q(position[2]),
            q(normal[0]),
            q(normal[1]),
            q(normal[2]),
            q(uv[0]),
            q(uv[1]),
        ])
    }
}

/// Dedupe when `deduplicate_vertices` is set, otherwise expand every corner
pub fn build_unique_mesh(mesh: &SourceMesh, deduplicate_vertices: bool) -> Result<UniqueMesh> {
    let unique = if deduplicate_vertices {
        deduplicate(mesh)?
    } else {
        expand_raw(mesh)?
    };
    tracing::debug!(
        "{} source vertices -> {} unique ({} triangles, dedupe={})",
        mesh.vertex_count(),
        unique.vertices.len(),
        unique.faces.len(),
        deduplicate_vertices
    );
    Ok(unique)
}

/// Merge corners whose rounded (position, normal, uv) match.
///
/// Slots are assigned in first-seen corner order.
pub fn deduplicate(mesh: &SourceMesh) -> Result<UniqueMesh> {
    check_normals(mesh)?;
    let mut slots: HashMap<VertexKey, u16> = HashMap::new();
    let mut out = UniqueMesh {
        vertices: Vec::new(),
        faces: Vec::with_capacity(mesh.triangles.len()),
    };

    for triangle in &mesh.triangles {
        let mut face = [0u16; 3];
        for (slot, corner) in face.iter_mut().zip(triangle) {
            let vertex = unique_vertex(mesh, corner)?;
            let key = VertexKey::new(vertex.position, vertex.normal, vertex.uv);
            *slot = match slots.get(&key) {
                Some(&index) => index,
                None => {
                    let index = next_slot(&out)?;
                    out.vertices.push(vertex);
                    slots.insert(key, index);
                    index
                }
            };
        }
        out.faces.push(face);
    }

    Ok(out)
}

/// One slot per triangle corner, nothing merged
pub fn expand_raw(mesh: &SourceMesh) -> Result<UniqueMesh> {
    check_normals(mesh)?;
    let mut out = UniqueMesh {
        vertices: Vec::with_capacity(mesh.triangles.len() * 3),
        faces: Vec::with_capacity(mesh.triangles.len()),
    };

    for triangle in &mesh.triangles {
        let mut face = [0u16; 3];
        for (slot, corner) in face.iter_mut().zip(triangle) {
            *slot = next_slot(&out)?;
            out.vertices.push(unique_vertex(mesh, corner)?);
        }
        out.faces.push(face);
    }

    Ok(out)
}

/// Rest normals feed the dedupe key, so every vertex needs one
fn check_normals(mesh: &SourceMesh) -> Result<()> {
    if mesh.normals.len() != mesh.positions.len() {
        bail!(
            "Mesh has {} positions but {} normals",
            mesh.positions.len(),
            mesh.normals.len()
        );
    }
    Ok(())
}

fn unique_vertex(mesh: &SourceMesh, corner: &Corner) -> Result<UniqueVertex> {
    let index = corner.vertex as usize;
    let (Some(&position), Some(&normal)) = (mesh.positions.get(index), mesh.normals.get(index))
    else {
        bail!(
            "Corner references vertex {} but the mesh has {} vertices",
            corner.vertex,
            mesh.positions.len()
        );
    };
    Ok(UniqueVertex {
        source_index: corner.vertex,
        position,
        normal,
        uv: corner.uv,
    })
}

/// Index the next pushed vertex will get, if it still fits in a u16
fn next_slot(mesh: &UniqueMesh) -> Result<u16> {
    let count = mesh.vertices.len();
    if count >= MAX_VERTICES {
        bail!(
            "Mesh needs more than {} unique vertices, exceeds the u16 index range. \
            Split the mesh or enable deduplication.",
            MAX_VERTICES
        );
    }
    Ok(count as u16)
}
