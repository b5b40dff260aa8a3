//! Keyframe sampling
//!
//! The deformed mesh is never read from global state: callers hand in a
//! [`FrameSampler`] that evaluates one frame on request.

use anyhow::{Result, bail};
use mrf_format::{FrameVertex, Keyframe};

use crate::mesh::UniqueMesh;

/// Evaluated mesh at one frame, indexed by source vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledFrame {
    /// World-space positions (unscaled)
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
}

/// Yields the deformed mesh for an integer frame number
pub trait FrameSampler {
    fn sample(&mut self, frame: i32) -> Result<SampledFrame>;
}

impl<F> FrameSampler for F
where
    F: FnMut(i32) -> Result<SampledFrame>,
{
    fn sample(&mut self, frame: i32) -> Result<SampledFrame> {
        self(frame)
    }
}

/// Frame numbers of an inclusive range, in sampling order
///
/// Lazy, so a huge range costs nothing until frames are actually sampled.
pub fn frame_sequence(start: i32, end: i32, reverse: bool) -> impl Iterator<Item = i32> {
    let frames = start..=end;
    let (forward, backward) = if reverse {
        (None, Some(frames.rev()))
    } else {
        (Some(frames), None)
    };
    forward.into_iter().flatten().chain(backward.into_iter().flatten())
}

/// Sample one keyframe per frame of `[start, end]`
///
/// Each unique vertex reads the position and normal of its source vertex.
/// Positions are multiplied by `scale`; normals are left as sampled.
pub fn sample_keyframes(
    sampler: &mut dyn FrameSampler,
    mesh: &UniqueMesh,
    frames: impl IntoIterator<Item = i32>,
    scale: f32,
) -> Result<Vec<Keyframe>> {
    let mut keyframes = Vec::new();

    for frame in frames {
        let sampled = sampler.sample(frame)?;
        if sampled.normals.len() != sampled.positions.len() {
            bail!(
                "Frame {} has {} positions but {} normals",
                frame,
                sampled.positions.len(),
                sampled.normals.len()
            );
        }

        let keyframe = mesh
            .vertices
            .iter()
            .map(|v| {
                let i = v.source_index as usize;
                match (sampled.positions.get(i), sampled.normals.get(i)) {
                    (Some(&[x, y, z]), Some(&normal)) => {
                        Ok(FrameVertex::new([x * scale, y * scale, z * scale], normal))
                    }
                    _ => bail!(
                        "Frame {} has {} vertices, source vertex {} is missing",
                        frame,
                        sampled.positions.len(),
                        i
                    ),
                }
            })
            .collect::<Result<Keyframe>>()?;

        keyframes.push(keyframe);
    }

    tracing::debug!("Sampled {} keyframes", keyframes.len());
    Ok(keyframes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::UniqueVertex;

    fn two_slot_mesh() -> UniqueMesh {
        let slot = |source_index| UniqueVertex {
            source_index,
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            uv: [0.0; 2],
        };
        UniqueMesh {
            vertices: vec![slot(1), slot(0)],
            faces: vec![],
        }
    }

    /// Vertex i sits at (i, frame, 0) with a +Y normal
    fn moving(frame: i32) -> Result<SampledFrame> {
        Ok(SampledFrame {
            positions: (0..2).map(|i| [i as f32, frame as f32, 0.0]).collect(),
            normals: vec![[0.0, 1.0, 0.0]; 2],
        })
    }

    #[test]
    fn test_frame_sequence() {
        let frames = |start, end, reverse| frame_sequence(start, end, reverse).collect::<Vec<_>>();
        assert_eq!(frames(2, 5, false), vec![2, 3, 4, 5]);
        assert_eq!(frames(2, 5, true), vec![5, 4, 3, 2]);
        assert_eq!(frames(7, 7, true), vec![7]);
        assert!(frames(3, 2, false).is_empty());

        // Range endpoints do not overflow
        let mut wide = frame_sequence(i32::MIN, i32::MAX, true);
        assert_eq!(wide.next(), Some(i32::MAX));
        assert_eq!(wide.next(), Some(i32::MAX - 1));
    }

    #[test]
    fn test_scale_applies_to_positions_only() {
        let mut sampler = moving;
        let frames = sample_keyframes(&mut sampler, &two_slot_mesh(), [3], 50.0).unwrap();
        assert_eq!(frames.len(), 1);
        // Slot 0 reads source vertex 1
        assert_eq!(frames[0][0].position, [50.0, 150.0, 0.0]);
        assert_eq!(frames[0][0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(frames[0][1].position, [0.0, 150.0, 0.0]);
    }

    #[test]
    fn test_reversed_order() {
        let mut sampler = moving;
        let order = frame_sequence(0, 2, true);
        let frames = sample_keyframes(&mut sampler, &two_slot_mesh(), order, 1.0).unwrap();
        let ys: Vec<f32> = frames.iter().map(|f| f[0].position[1]).collect();
        assert_eq!(ys, vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_source_vertex() {
        let mut sampler = |_frame: i32| -> Result<SampledFrame> {
            Ok(SampledFrame {
                positions: vec![[0.0; 3]],
                normals: vec![[0.0; 3]],
            })
        };
        let err = sample_keyframes(&mut sampler, &two_slot_mesh(), [0], 1.0).unwrap_err();
        assert!(err.to_string().contains("source vertex 1 is missing"));
    }

    #[test]
    fn test_sampler_error_propagates() {
        let mut sampler = |frame: i32| -> Result<SampledFrame> { bail!("frame {} unavailable", frame) };
        let err = sample_keyframes(&mut sampler, &two_slot_mesh(), [4], 1.0).unwrap_err();
        assert_eq!(err.to_string(), "frame 4 unavailable");
    }
}
