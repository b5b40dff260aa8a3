//! OBJ frame sequences as a mesh source
//!
//! The first OBJ of a sequence is the rest pose and defines the topology and
//! UVs; every file after it is one more frame of the same mesh with moved
//! vertices. Polygons are fan-triangulated and vertex normals are rebuilt from
//! the faces (area weighted), so `vn` records are not needed.

use anyhow::{Context, Result, bail};
use glam::Vec3;
use std::path::{Path, PathBuf};

use super::types::{Corner, SourceMesh};
use crate::sampling::{FrameSampler, SampledFrame};

/// Load and parse an OBJ file
pub fn load_obj(path: &Path) -> Result<SourceMesh> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open OBJ: {:?}", path))?;
    parse_obj(&text).with_context(|| format!("Failed to parse OBJ: {:?}", path))
}

/// Parse OBJ text into a triangulated [`SourceMesh`]
pub fn parse_obj(text: &str) -> Result<SourceMesh> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut triangles: Vec<[Corner; 3]> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" | "vt" if parts.len() < arity(parts[0]) + 1 => {
                bail!(
                    "{:?} record needs {} coordinates on line {}",
                    parts[0],
                    arity(parts[0]),
                    line_no + 1
                );
            }
            "v" => {
                positions.push([
                    parse_float(parts[1], line_no)?,
                    parse_float(parts[2], line_no)?,
                    parse_float(parts[3], line_no)?,
                ]);
            }
            "vt" => {
                tex_coords.push([parse_float(parts[1], line_no)?, parse_float(parts[2], line_no)?]);
            }
            "f" => {
                let corners = parts[1..]
                    .iter()
                    .map(|s| parse_corner(s, positions.len(), &tex_coords))
                    .collect::<Option<Vec<Corner>>>()
                    .with_context(|| format!("Bad face reference on line {}", line_no + 1))?;

                if corners.len() < 3 {
                    bail!("Face with {} corners on line {}", corners.len(), line_no + 1);
                }

                // Fan triangulation (convex polygons)
                for i in 1..corners.len() - 1 {
                    triangles.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if triangles.is_empty() {
        bail!("No faces found in OBJ file");
    }

    let normals = compute_vertex_normals(&positions, &triangles);
    Ok(SourceMesh {
        positions,
        normals,
        triangles,
    })
}

/// Normalised, area-weighted sum of the adjacent face normals
pub fn compute_vertex_normals(positions: &[[f32; 3]], triangles: &[[Corner; 3]]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];

    for triangle in triangles {
        let [a, b, c] = triangle.map(|corner| corner.vertex as usize);
        let (Some(pa), Some(pb), Some(pc)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let (pa, pb, pc) = (Vec3::from(*pa), Vec3::from(*pb), Vec3::from(*pc));
        // Cross product length is twice the triangle area
        let weighted = (pb - pa).cross(pc - pa);
        sums[a] += weighted;
        sums[b] += weighted;
        sums[c] += weighted;
    }

    sums.into_iter().map(|n| n.normalize_or_zero().to_array()).collect()
}

/// Coordinates a vertex record must carry
fn arity(record: &str) -> usize {
    if record == "vt" { 2 } else { 3 }
}

fn parse_float(s: &str, line_no: usize) -> Result<f32> {
    s.parse()
        .with_context(|| format!("Bad number {:?} on line {}", s, line_no + 1))
}

/// Parse a face corner: "v", "v/vt", "v/vt/vn" or "v//vn" (1-based or negative)
fn parse_corner(s: &str, vertex_count: usize, tex_coords: &[[f32; 2]]) -> Option<Corner> {
    let mut parts = s.split('/');

    let vertex = resolve_index(parts.next()?, vertex_count)?;
    let uv = match parts.next().filter(|s| !s.is_empty()) {
        Some(vt) => tex_coords[resolve_index(vt, tex_coords.len())?],
        None => [0.0, 0.0],
    };

    Some(Corner::new(u32::try_from(vertex).ok()?, uv))
}

/// OBJ indices are 1-based; negative ones count back from the latest element
fn resolve_index(s: &str, count: usize) -> Option<usize> {
    let index: i64 = s.parse().ok()?;
    let resolved = if index < 0 {
        count as i64 + index
    } else {
        index - 1
    };
    (0..count as i64)
        .contains(&resolved)
        .then_some(resolved as usize)
}

// ============================================================================
// Frame sequence sampler
// ============================================================================

/// Sampler over a list of OBJ files, one per frame starting at `first_frame`
#[derive(Debug, Clone)]
pub struct ObjSequence {
    paths: Vec<PathBuf>,
    first_frame: i32,
    last_frame: i32,
    vertex_count: usize,
}

impl ObjSequence {
    /// Open a sequence; returns the rest-pose mesh (first file) and the sampler
    pub fn open(paths: Vec<PathBuf>, first_frame: i32) -> Result<(SourceMesh, Self)> {
        let Some(first) = paths.first() else {
            bail!("OBJ sequence is empty");
        };
        let last_frame = i32::try_from(i64::from(first_frame) + paths.len() as i64 - 1)
            .with_context(|| {
                format!(
                    "{} files starting at frame {} run past the frame number range",
                    paths.len(),
                    first_frame
                )
            })?;
        let rest = load_obj(first)?;
        tracing::debug!(
            "Rest pose {:?}: {} vertices, {} triangles",
            first,
            rest.positions.len(),
            rest.triangles.len()
        );
        let sequence = Self {
            vertex_count: rest.positions.len(),
            paths,
            first_frame,
            last_frame,
        };
        Ok((rest, sequence))
    }

    /// Last frame that has a file
    pub fn last_frame(&self) -> i32 {
        self.last_frame
    }

    /// Fail unless every frame of `start..=end` has a file
    pub fn check_range(&self, start: i32, end: i32) -> Result<()> {
        if start < self.first_frame || end > self.last_frame {
            bail!(
                "Frame range {}..={} is not covered by the sequence ({}..={})",
                start,
                end,
                self.first_frame,
                self.last_frame
            );
        }
        Ok(())
    }

    fn path_for(&self, frame: i32) -> Option<&Path> {
        let index = usize::try_from(i64::from(frame) - i64::from(self.first_frame)).ok()?;
        self.paths.get(index).map(PathBuf::as_path)
    }
}

impl FrameSampler for ObjSequence {
    fn sample(&mut self, frame: i32) -> Result<SampledFrame> {
        let Some(path) = self.path_for(frame) else {
            bail!(
                "No OBJ for frame {} (sequence covers {}..={})",
                frame,
                self.first_frame,
                self.last_frame
            );
        };

        let mesh = load_obj(path)?;
        if mesh.positions.len() != self.vertex_count {
            bail!(
                "{:?} has {} vertices, rest pose has {}",
                path,
                mesh.positions.len(),
                self.vertex_count
            );
        }

        Ok(SampledFrame {
            positions: mesh.positions,
            normals: mesh.normals,
        })
    }
}
