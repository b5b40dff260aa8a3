//! In-memory MRF model

use serde::Serialize;

use crate::header::MrfHeader;

/// One vertex of one keyframe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl FrameVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// All unique vertices at one sampled time step, in UV order
pub type Keyframe = Vec<FrameVertex>;

/// A complete MRF model
///
/// `uvs` are in source orientation (v not mirrored); the codec applies the
/// `1 - v` flip on the wire in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub header: MrfHeader,
    pub texture_path: String,
    pub faces: Vec<[u16; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub frames: Vec<Keyframe>,
}

impl ModelData {
    /// Build a model whose header counts are derived from the data
    pub fn new(
        texture_path: impl Into<String>,
        faces: Vec<[u16; 3]>,
        uvs: Vec<[f32; 2]>,
        frames: Vec<Keyframe>,
        frame_duration: f32,
    ) -> Self {
        let header = MrfHeader::new(
            frames.len() as u32,
            uvs.len() as u32,
            (faces.len() * 3) as u32,
            frame_duration,
        );
        Self {
            header,
            texture_path: texture_path.into(),
            faces,
            uvs,
            frames,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.uvs.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Header/geometry summary for tooling output
    pub fn summary(&self) -> ModelSummary {
        let h = &self.header;
        ModelSummary {
            texture_path: self.texture_path.clone(),
            frame_count: h.frame_count,
            vertex_count: h.vertex_count,
            triangle_count: h.index_count / 3,
            frame_duration: h.frame_duration,
            fps: playback_fps(h.frame_duration),
            pivot: h.pivot,
            bounds_radius: h.bounds_radius,
            elapsed_time: h.elapsed_time,
            debug_flag: h.debug_flag,
            reserved: h.reserved,
            signature: h.signature(),
        }
    }
}

/// Playback rate a reader should use: `round(1 / frame_duration)`, 0 when the
/// duration is not positive
pub fn playback_fps(frame_duration: f32) -> u32 {
    if frame_duration > 0.0 {
        (1.0 / frame_duration).round() as u32
    } else {
        0
    }
}

/// Flattened, serializable view of a model's header and sizes
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub texture_path: String,
    pub frame_count: u32,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub frame_duration: f32,
    pub fps: u32,
    pub pivot: [f32; 3],
    pub bounds_radius: f32,
    pub elapsed_time: f32,
    pub debug_flag: u32,
    pub reserved: Option<[u32; 6]>,
    pub signature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_counts() {
        let frame = vec![FrameVertex::default(); 3];
        let model = ModelData::new(
            "Textures/white",
            vec![[0, 1, 2]],
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            vec![frame.clone(), frame],
            0.05,
        );
        assert_eq!(model.header.frame_count, 2);
        assert_eq!(model.header.vertex_count, 3);
        assert_eq!(model.header.index_count, 3);
        assert_eq!(model.header.reserved, None);
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn test_summary_fps() {
        let model = ModelData::new("t", vec![], vec![], vec![], 1.0 / 30.0);
        let summary = model.summary();
        assert_eq!(summary.fps, 30);
        assert_eq!(summary.triangle_count, 0);

        let still = ModelData::new("t", vec![], vec![], vec![], 0.0);
        assert_eq!(still.summary().fps, 0);
    }

    #[test]
    fn test_playback_fps() {
        assert_eq!(playback_fps(1.0 / 24.0), 24);
        assert_eq!(playback_fps(0.0), 0);
        assert_eq!(playback_fps(-0.5), 0);
    }
}
