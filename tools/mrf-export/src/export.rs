//! Export pipeline: source mesh + frame sampler -> ModelData -> .mrf

use anyhow::{Context, Result, bail};
use mrf_format::{ModelData, WriteOptions, WriteReport, validate_model, write_mrf};
use serde::Deserialize;
use std::path::Path;

use crate::bounds::{Bounds, compute_bounds};
use crate::mesh::{SourceMesh, build_unique_mesh};
use crate::sampling::{FrameSampler, frame_sequence, sample_keyframes};
use crate::timing::{PlaybackTiming, frame_duration, resolve_elapsed_frame};

/// Texture used when an export names none
pub const DEFAULT_TEXTURE: &str = "Textures/white";

/// Export settings
///
/// Usable standalone or flattened into a manifest `[[model]]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportSettings {
    /// Texture path stored in the file (defaults to [`DEFAULT_TEXTURE`])
    #[serde(default)]
    pub texture: Option<String>,

    /// Uniform scale applied to sampled positions and to the bounds.
    /// Default: 50.0
    #[serde(default = "default_scale")]
    pub scale: f32,

    /// First frame of the inclusive range. Default: 0
    #[serde(default)]
    pub start_frame: i32,

    /// Last frame of the inclusive range. Default: 29
    #[serde(default = "default_end_frame")]
    pub end_frame: i32,

    /// Authoring frame rate; frame_duration = 1 / fps. Default: 30
    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Frame playback should already have reached at spawn.
    /// Ignored unless inside the range.
    #[serde(default)]
    pub elapsed_frame: Option<i32>,

    /// Explicit playback delay in seconds, overrides `elapsed_frame` when > 0
    #[serde(default)]
    pub playback_delay: f32,

    /// Merge identical corners. Default: true
    #[serde(default = "default_true")]
    pub deduplicate: bool,

    /// Sample from `end_frame` down to `start_frame`
    #[serde(default)]
    pub reverse: bool,

    /// Compute pivot and bounds radius from the rest pose
    #[serde(default)]
    pub auto_bounds: bool,

    /// Opaque header flag
    #[serde(default)]
    pub debug_flag: u32,

    /// Explicit reserved header words (beats the signature)
    #[serde(default)]
    pub reserved: Option<[u32; 6]>,

    #[serde(flatten)]
    pub write: WriteOptions,
}

fn default_scale() -> f32 {
    50.0
}

fn default_end_frame() -> i32 {
    29
}

fn default_fps() -> f32 {
    30.0
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            texture: None,
            scale: default_scale(),
            start_frame: 0,
            end_frame: default_end_frame(),
            fps: default_fps(),
            elapsed_frame: None,
            playback_delay: 0.0,
            deduplicate: true,
            reverse: false,
            auto_bounds: false,
            debug_flag: 0,
            reserved: None,
            write: WriteOptions::default(),
        }
    }
}

impl ExportSettings {
    /// Reject settings that cannot produce a valid model
    pub fn validate(&self) -> Result<()> {
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            bail!("Scale must be > 0 (got {})", self.scale);
        }
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            bail!("FPS must be > 0 (got {})", self.fps);
        }
        if self.start_frame > self.end_frame {
            bail!(
                "Frame range start {} is after end {}",
                self.start_frame,
                self.end_frame
            );
        }
        if self.frame_count() > u64::from(u32::MAX) {
            bail!(
                "Frame range {}..={} has more frames than a model can hold",
                self.start_frame,
                self.end_frame
            );
        }
        if self.playback_delay < 0.0 {
            bail!("Playback delay must be >= 0 (got {})", self.playback_delay);
        }
        if let Some(texture) = self.texture.as_deref().filter(|t| !t.is_ascii()) {
            bail!("Texture path {:?} is not ASCII", texture);
        }
        Ok(())
    }

    /// Texture path to store, falling back to [`DEFAULT_TEXTURE`]
    pub fn texture_path(&self) -> &str {
        match self.texture.as_deref() {
            Some(texture) => texture,
            None => {
                tracing::warn!("No texture path given, using {:?}", DEFAULT_TEXTURE);
                DEFAULT_TEXTURE
            }
        }
    }

    /// Frames in `start_frame..=end_frame`, 0 for an inverted range
    pub fn frame_count(&self) -> u64 {
        let count = i64::from(self.end_frame) - i64::from(self.start_frame) + 1;
        count.max(0) as u64
    }
}

/// Build a [`ModelData`] from a rest-pose mesh and a frame sampler
///
/// # Arguments
/// * `mesh` - Triangulated rest pose; UVs and topology come from here
/// * `sampler` - Evaluates the deformed mesh for each frame of the range
/// * `settings` - Scale, range, timing and dedupe options
///
/// # Example
/// ```ignore
/// let (rest, mut frames) = ObjSequence::open(paths, 0)?;
/// let model = export_model(&rest, &mut frames, &ExportSettings::default())?;
/// ```
pub fn export_model(
    mesh: &SourceMesh,
    sampler: &mut dyn FrameSampler,
    settings: &ExportSettings,
) -> Result<ModelData> {
    settings.validate()?;

    let unique = build_unique_mesh(mesh, settings.deduplicate)?;
    let duration = frame_duration(settings.fps);

    let order = frame_sequence(settings.start_frame, settings.end_frame, settings.reverse);
    let keyframes = sample_keyframes(sampler, &unique, order, settings.scale)?;

    let timing = PlaybackTiming {
        start: settings.start_frame,
        end: settings.end_frame,
        elapsed_frame: resolve_elapsed_frame(
            settings.elapsed_frame,
            settings.start_frame,
            settings.end_frame,
        ),
        reverse: settings.reverse,
        delay: settings.playback_delay,
        frame_duration: duration,
    };

    let bounds = if settings.auto_bounds {
        compute_bounds(&unique.rest_positions(), settings.scale)
    } else {
        Bounds::default()
    };

    let uvs = unique.uvs();
    let mut model = ModelData::new(settings.texture_path(), unique.faces, uvs, keyframes, duration);
    model.header.pivot = bounds.pivot;
    model.header.bounds_radius = bounds.radius;
    model.header.elapsed_time = timing.elapsed_time();
    model.header.debug_flag = settings.debug_flag;
    model.header.reserved = settings.reserved;

    validate_model(&model)?;

    tracing::debug!(
        pivot = ?model.header.pivot,
        radius = model.header.bounds_radius,
        elapsed = model.header.elapsed_time,
        "Derived header fields"
    );
    Ok(model)
}

/// Export and write to `output` (plus the mirror copy when enabled)
pub fn export_to_file(
    mesh: &SourceMesh,
    sampler: &mut dyn FrameSampler,
    settings: &ExportSettings,
    output: &Path,
) -> Result<WriteReport> {
    let model = export_model(mesh, sampler, settings)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let report = write_mrf(output, &model, settings.write)
        .with_context(|| format!("Failed to write MRF: {:?}", output))?;

    tracing::info!(
        "Exported {:?}: {} vertices, {} triangles, {} frames, {} bytes",
        output,
        model.vertex_count(),
        model.triangle_count(),
        model.frames.len(),
        report.size
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Corner;
    use crate::sampling::SampledFrame;
    use mrf_format::parse_mrf;

    fn triangle() -> SourceMesh {
        SourceMesh {
            positions: vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            triangles: vec![[
                Corner::new(0, [0.0, 0.0]),
                Corner::new(1, [1.0, 0.0]),
                Corner::new(2, [0.0, 1.0]),
            ]],
        }
    }

    /// Rest pose lifted by `frame` along Z
    fn lifted(frame: i32) -> Result<SampledFrame> {
        let mesh = triangle();
        Ok(SampledFrame {
            positions: mesh
                .positions
                .iter()
                .map(|&[x, y, _]| [x, y, frame as f32])
                .collect(),
            normals: mesh.normals,
        })
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            texture: Some("Textures/test".into()),
            scale: 1.0,
            start_frame: 0,
            end_frame: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let s = ExportSettings::default();
        assert_eq!(s.scale, 50.0);
        assert_eq!((s.start_frame, s.end_frame), (0, 29));
        assert_eq!(s.frame_count(), 30);
        assert_eq!(s.fps, 30.0);
        assert!(s.deduplicate);
        assert!(s.write.signature);
        assert!(!s.write.mirror_copy);
        assert_eq!(s.texture_path(), DEFAULT_TEXTURE);
    }

    #[test]
    fn test_validate() {
        assert!(settings().validate().is_ok());
        let rejected = [
            ExportSettings {
                scale: 0.0,
                ..settings()
            },
            ExportSettings {
                fps: -1.0,
                ..settings()
            },
            ExportSettings {
                start_frame: 5,
                end_frame: 4,
                ..settings()
            },
            ExportSettings {
                playback_delay: -0.5,
                ..settings()
            },
            ExportSettings {
                texture: Some("caf\u{e9}".into()),
                ..settings()
            },
            ExportSettings {
                start_frame: i32::MIN,
                end_frame: i32::MAX,
                ..settings()
            },
        ];
        for bad in rejected {
            assert!(bad.validate().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_extreme_frame_range() {
        let wide = ExportSettings {
            start_frame: -2_000_000_000,
            end_frame: 2_000_000_000,
            ..settings()
        };
        assert_eq!(wide.frame_count(), 4_000_000_001);
        assert!(wide.validate().is_ok());

        // Frames are sampled lazily: the first missing one fails fast
        let mut sampler = |frame: i32| -> Result<SampledFrame> {
            if frame < 0 {
                bail!("No frame {}", frame);
            }
            lifted(frame)
        };
        let err = export_model(&triangle(), &mut sampler, &wide).unwrap_err();
        assert_eq!(err.to_string(), "No frame -2000000000");

        let full = ExportSettings {
            start_frame: i32::MIN,
            end_frame: i32::MAX,
            ..settings()
        };
        assert_eq!(full.frame_count(), 1 << 32);
    }

    #[test]
    fn test_export_model() {
        let mut sampler = lifted;
        let model = export_model(&triangle(), &mut sampler, &settings()).unwrap();

        assert_eq!(model.texture_path, "Textures/test");
        assert_eq!(model.frames.len(), 4);
        assert_eq!(model.header.frame_count, 4);
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.frames[3][1].position, [2.0, 0.0, 3.0]);
        assert_eq!(model.header.elapsed_time, 0.0);
        assert_eq!(model.header.pivot, [0.0; 3]);
        assert_eq!(model.header.bounds_radius, 0.0);
        assert!((model.header.frame_duration - 1.0 / 30.0).abs() < 1e-7);
    }

    #[test]
    fn test_export_auto_bounds_and_elapsed() {
        let s = ExportSettings {
            auto_bounds: true,
            elapsed_frame: Some(2),
            reverse: true,
            ..settings()
        };
        let mut sampler = lifted;
        let model = export_model(&triangle(), &mut sampler, &s).unwrap();

        assert!((model.header.pivot[0] - 0.667).abs() < 1e-3);
        assert!((model.header.bounds_radius - 1.49).abs() < 1e-2);
        // Reversed: (end - elapsed) frames
        assert!((model.header.elapsed_time - 1.0 / 30.0).abs() < 1e-6);
        // First keyframe is the range end
        assert_eq!(model.frames[0][0].position[2], 3.0);
    }

    #[test]
    fn test_export_to_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("tri.mrf");
        let mut sampler = lifted;

        let report = export_to_file(&triangle(), &mut sampler, &settings(), &output).unwrap();
        assert!(report.mirror.is_none());

        let model = parse_mrf(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(model.faces, vec![[0, 1, 2]]);
        assert_eq!(model.uvs[1], [1.0, 0.0]);
        assert_eq!(model.header.signature().as_deref(), Some("Exported by Wiselen"));
    }
}
