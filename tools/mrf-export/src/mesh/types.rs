//! Types for mesh preprocessing

/// One triangle corner: which source vertex it uses and the UV of this corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Index into [`SourceMesh::positions`]
    pub vertex: u32,
    pub uv: [f32; 2],
}

impl Corner {
    pub fn new(vertex: u32, uv: [f32; 2]) -> Self {
        Self { vertex, uv }
    }
}

/// Triangulated mesh in its rest pose
///
/// Positions and normals are per source vertex; UVs live on corners, so one
/// source vertex can carry several UVs (seams).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub triangles: Vec<[Corner; 3]>,
}

impl SourceMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// One slot of the exported per-frame vertex arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniqueVertex {
    /// Source vertex sampled for this slot in every keyframe
    pub source_index: u32,
    /// Rest-pose position (unscaled)
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Deduplicated (or corner-expanded) mesh, ready for sampling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueMesh {
    pub vertices: Vec<UniqueVertex>,
    pub faces: Vec<[u16; 3]>,
}

impl UniqueMesh {
    pub fn uvs(&self) -> Vec<[f32; 2]> {
        self.vertices.iter().map(|v| v.uv).collect()
    }

    /// Rest-pose positions in slot order
    pub fn rest_positions(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| v.position).collect()
    }
}
