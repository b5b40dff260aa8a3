//! MRF -> per-keyframe OBJ files
//!
//! Positions are divided by a display divisor (the inverse of the export
//! scale); UVs and normals are written as stored in the model.

use anyhow::{Context, Result, bail};
use mrf_format::ModelData;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Divisor matching the default export scale
pub const DEFAULT_DIVISOR: f32 = 50.0;

/// Render one keyframe as OBJ text
pub fn frame_to_obj(model: &ModelData, frame: usize, divisor: f32) -> Result<String> {
    if !(divisor > 0.0 && divisor.is_finite()) {
        bail!("Divisor must be > 0 (got {})", divisor);
    }
    let Some(vertices) = model.frames.get(frame) else {
        bail!("Frame {} out of range ({} frames)", frame, model.frames.len());
    };

    let mut obj = String::new();
    writeln!(obj, "# {} frame {}", model.texture_path, frame)?;
    for v in vertices {
        let [x, y, z] = v.position.map(|c| c / divisor);
        writeln!(obj, "v {} {} {}", x, y, z)?;
    }
    for [u, v] in &model.uvs {
        writeln!(obj, "vt {} {}", u, v)?;
    }
    for v in vertices {
        let [x, y, z] = v.normal;
        writeln!(obj, "vn {} {} {}", x, y, z)?;
    }
    for face in &model.faces {
        let [a, b, c] = face.map(|i| i as u32 + 1);
        writeln!(obj, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    }
    Ok(obj)
}

/// Write `<stem>_<frame>.obj` for every keyframe into `dir`
pub fn unpack_to_dir(
    model: &ModelData,
    dir: &Path,
    stem: &str,
    divisor: f32,
) -> Result<Vec<PathBuf>> {
    if model.frames.is_empty() {
        tracing::warn!("Model has no keyframes, nothing to unpack");
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let width = model.frames.len().to_string().len().max(3);
    let mut written = Vec::with_capacity(model.frames.len());
    for frame in 0..model.frames.len() {
        let path = dir.join(format!("{}_{:0width$}.obj", stem, frame, width = width));
        let obj = frame_to_obj(model, frame, divisor)?;
        std::fs::write(&path, obj).with_context(|| format!("Failed to write {:?}", path))?;
        written.push(path);
    }

    tracing::info!("Unpacked {} frames into {:?}", written.len(), dir);
    Ok(written)
}
