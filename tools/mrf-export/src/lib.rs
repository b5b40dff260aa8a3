//! mrf-export library
//!
//! Turns a triangulated source mesh plus per-frame deformed positions into an
//! MRF model: vertex deduplication, keyframe sampling, pivot/bounds and
//! playback timing. Also used by the `mrf-export` binary for manifest builds
//! and for unpacking MRF files back into OBJ frames.

pub mod bounds;
pub mod export;
pub mod manifest;
pub mod mesh;
pub mod sampling;
pub mod timing;
pub mod unpack;

// Re-export the format crate so callers need a single dependency
pub use mrf_format;

pub use bounds::{Bounds, compute_bounds};
pub use export::{ExportSettings, export_model, export_to_file};
pub use mesh::{Corner, SourceMesh, UniqueMesh, UniqueVertex, build_unique_mesh};
pub use sampling::{FrameSampler, SampledFrame, sample_keyframes};
pub use timing::{PlaybackTiming, playback_fps, playback_start_frame};
