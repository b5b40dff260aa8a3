//! mrf.toml manifest: batch export jobs
//!
//! ```toml
//! output_dir = "build"
//!
//! [[model]]
//! name = "illidan"
//! frames = ["frames/illidan_000.obj", "frames/illidan_001.obj"]
//! texture = "Textures/Illidan"
//! end_frame = 1
//! auto_bounds = true
//! mirror_copy = true
//! ```
//!
//! Every [`ExportSettings`] key may appear in a `[[model]]` table. Relative
//! paths resolve against the manifest's directory.

use anyhow::{Context, Result, bail};
use hashbrown::HashSet;
use mrf_format::{MRF_EXT, WriteReport};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::export::{ExportSettings, export_to_file};
use crate::mesh::obj::ObjSequence;

/// mrf.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct MrfManifest {
    /// Where `<name>.mrf` files go. Default: the manifest directory
    #[serde(default)]
    pub output_dir: Option<String>,

    #[serde(default, rename = "model")]
    pub models: Vec<ModelJob>,
}

/// One `[[model]]` entry
#[derive(Debug, Deserialize)]
pub struct ModelJob {
    /// Output file stem
    pub name: String,

    /// OBJ frame files; the first is the rest pose and frame `start_frame`
    pub frames: Vec<String>,

    #[serde(flatten)]
    pub settings: ExportSettings,
}

impl MrfManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mrf.toml")
    }

    /// Check every job without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            bail!("Manifest declares no [[model]] entries");
        }

        let mut names = HashSet::new();
        for job in &self.models {
            if job.name.is_empty() {
                bail!("Model with an empty name");
            }
            if !names.insert(job.name.as_str()) {
                bail!("Duplicate model name {:?}", job.name);
            }
            if job.frames.is_empty() {
                bail!("Model {:?} lists no frame files", job.name);
            }
            job.settings
                .validate()
                .with_context(|| format!("Invalid settings for model {:?}", job.name))?;
            if job.settings.frame_count() > job.frames.len() as u64 {
                bail!(
                    "Model {:?} samples {} frames ({}..={}) but lists {} files",
                    job.name,
                    job.settings.frame_count(),
                    job.settings.start_frame,
                    job.settings.end_frame,
                    job.frames.len()
                );
            }
        }
        Ok(())
    }

    /// Directory the outputs land in
    pub fn output_dir(&self, base_dir: &Path, override_dir: Option<&Path>) -> PathBuf {
        match (override_dir, &self.output_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => base_dir.join(dir),
            (None, None) => base_dir.to_path_buf(),
        }
    }
}

impl ModelJob {
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.{}", self.name, MRF_EXT))
    }

    pub fn frame_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.frames.iter().map(|f| base_dir.join(f)).collect()
    }
}

/// Load a manifest and validate it
pub fn load_manifest(path: &Path) -> Result<MrfManifest> {
    let manifest = MrfManifest::load(path)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Run every job of a manifest
///
/// `base_dir` is the manifest's directory; `output_override` replaces the
/// manifest's `output_dir`.
pub fn build_all(
    manifest: &MrfManifest,
    base_dir: &Path,
    output_override: Option<&Path>,
) -> Result<Vec<WriteReport>> {
    let output_dir = manifest.output_dir(base_dir, output_override);
    let mut reports = Vec::with_capacity(manifest.models.len());

    for job in &manifest.models {
        let output = job.output_path(&output_dir);
        tracing::info!("Building {:?} -> {:?}", job.name, output);

        let (rest, mut sequence) =
            ObjSequence::open(job.frame_paths(base_dir), job.settings.start_frame)?;
        sequence
            .check_range(job.settings.start_frame, job.settings.end_frame)
            .with_context(|| format!("Model {:?}", job.name))?;
        let report = export_to_file(&rest, &mut sequence, &job.settings, &output)
            .with_context(|| format!("Failed to build model {:?}", job.name))?;
        reports.push(report);
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
output_dir = "out"

[[model]]
name = "illidan"
frames = ["a.obj", "b.obj"]
texture = "Textures/Illidan"
end_frame = 1
scale = 10
auto_bounds = true
mirror_copy = true

[[model]]
name = "arthas"
frames = ["c.obj"]
end_frame = 0
signature = false
reserved = [1, 2, 3, 4, 5, 6]
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = MrfManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.models.len(), 2);

        let illidan = &manifest.models[0].settings;
        assert_eq!(illidan.texture.as_deref(), Some("Textures/Illidan"));
        assert_eq!(illidan.scale, 10.0);
        assert!(illidan.auto_bounds);
        assert!(illidan.write.mirror_copy);
        assert!(illidan.write.signature);

        let arthas = &manifest.models[1].settings;
        assert_eq!(arthas.scale, 50.0);
        assert_eq!(arthas.fps, 30.0);
        assert!(!arthas.write.signature);
        assert_eq!(arthas.reserved, Some([1, 2, 3, 4, 5, 6]));

        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_output_paths() {
        let manifest = MrfManifest::parse(MANIFEST).unwrap();
        let base = Path::new("assets");
        let dir = manifest.output_dir(base, None);
        assert_eq!(dir, Path::new("assets").join("out"));
        assert_eq!(
            manifest.models[0].output_path(&dir),
            Path::new("assets").join("out").join("illidan.mrf")
        );
        assert_eq!(
            manifest.output_dir(base, Some(Path::new("elsewhere"))),
            Path::new("elsewhere")
        );
        assert_eq!(
            manifest.models[1].frame_paths(base),
            vec![Path::new("assets").join("c.obj")]
        );
    }

    #[test]
    fn test_validate_rejects() {
        let cases = [
            ("", "no [[model]]"),
            (
                "[[model]]\nname = \"a\"\nframes = [\"a.obj\"]\n[[model]]\nname = \"a\"\nframes = [\"b.obj\"]\n",
                "Duplicate",
            ),
            ("[[model]]\nname = \"a\"\nframes = []\n", "no frame files"),
            ("[[model]]\nname = \"a\"\nframes = [\"a.obj\"]\n", "samples 30 frames"),
            (
                "[[model]]\nname = \"a\"\nframes = [\"a.obj\"]\nend_frame = 0\nscale = -1\n",
                "Invalid settings",
            ),
        ];
        for (content, expected) in cases {
            let err = MrfManifest::parse(content).unwrap().validate().unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{:?} should fail with {:?}, got {}",
                content,
                expected,
                err
            );
        }
    }

    #[test]
    fn test_extreme_frame_range() {
        let manifest = MrfManifest::parse(
            "[[model]]\nname = \"a\"\nframes = [\"a.obj\"]\n\
             start_frame = -2000000000\nend_frame = 2000000000\n",
        )
        .unwrap();
        assert_eq!(manifest.models[0].settings.frame_count(), 4_000_000_001);
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("samples 4000000001 frames"));
    }

    #[test]
    fn test_missing_required_field() {
        assert!(MrfManifest::parse("[[model]]\nframes = [\"a.obj\"]\n").is_err());
    }
}
