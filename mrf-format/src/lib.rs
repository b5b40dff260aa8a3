//! MRF: morph-animated mesh container format ("Morf")
//!
//! This crate reads and writes the MRF binary format, which stores one
//! triangulated mesh together with a sequence of per-frame vertex snapshots
//! (positions + normals). Every frame holds the full unique-vertex array, so
//! playback is a plain interpolation between consecutive keyframes.
//!
//! # Layout
//!
//! ```text
//! 0x00: magic "Morf"
//! 0x04: frame_count u32
//! 0x08: vertex_count u32
//! 0x0C: index_count u32           (3 × triangle count)
//! 0x10: frame_duration f32        (seconds per frame)
//! 0x14: pivot [f32; 3]
//! 0x20: bounds_radius f32
//! 0x24: elapsed_time f32          (playback start delay, seconds)
//! 0x28: debug_flag u32
//! 0x2C: reserved [u32; 6]         (the last word doubles as table[0])
//! 0x44: texture_offset u32
//! 0x48: faces_offset u32
//! 0x4C: mapping_offset u32
//! 0x50: keyframe_offsets [u32; frame_count]
//! ....: zero padding to a multiple of 16
//!
//! texture chunk:   ASCII path, NUL padded
//! faces chunk:     [u16; 3] × (index_count / 3)
//! mapping chunk:   [f32; 2] × vertex_count   (v stored as 1 - v)
//! keyframe chunk:  ([f32; 3] position, [f32; 3] normal) × vertex_count
//! ```
//!
//! Every chunk starts on a 16-byte boundary and is zero padded to one. All
//! offsets are absolute from the start of the file; all scalars are
//! little-endian.
//!
//! # Usage
//!
//! ```ignore
//! use mrf_format::{parse_mrf, MrfWriter, WriteOptions};
//!
//! let data = std::fs::read("arthas.mrf")?;
//! let model = parse_mrf(&data)?;
//! println!("{} frames of {} vertices", model.frames.len(), model.uvs.len());
//!
//! let bytes = MrfWriter::new(&model, WriteOptions::default()).encode()?;
//! ```

mod error;
mod header;
pub mod io;
mod model;
mod parser;
mod validation;
mod writer;

pub use error::MrfError;
pub use header::{MrfHeader, OffsetTable};
pub use model::{FrameVertex, Keyframe, ModelData, ModelSummary, playback_fps};
pub use parser::{TextureDecoding, parse_mrf, parse_mrf_with, read_mrf, read_offset_table};
pub use validation::{ChunkLayout, ChunkSpan, inspect_layout, validate_model};
pub use writer::{MrfWriter, WriteOptions, WriteReport, mirror_path, write_mrf};

// =============================================================================
// Constants
// =============================================================================

/// MRF magic bytes
pub const MRF_MAGIC: &[u8; 4] = b"Morf";

/// Conventional file extension
pub const MRF_EXT: &str = "mrf";

/// Every chunk (and the header region) is padded to this many bytes
pub const CHUNK_ALIGNMENT: usize = 16;

/// Size of the reserved header block in bytes (6 × u32)
pub const RESERVED_SIZE: usize = 24;

/// Signature embedded in the reserved block when the caller supplies none
pub const DEFAULT_SIGNATURE: &[u8] = b"Exported by Wiselen";

/// Triangle indices are u16, so a model can address at most this many vertices
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// Bytes per UV pair in the mapping chunk
pub const UV_STRIDE: usize = 8;

/// Bytes per triangle in the faces chunk
pub const TRIANGLE_STRIDE: usize = 6;

/// Bytes per (position, normal) pair in a keyframe chunk
pub const FRAME_VERTEX_STRIDE: usize = 24;

/// Number of zero bytes needed to pad `len` up to the next chunk boundary.
///
/// Returns 0 (not 16) when `len` is already aligned.
#[inline]
pub const fn padding_for(len: usize) -> usize {
    (CHUNK_ALIGNMENT - len % CHUNK_ALIGNMENT) % CHUNK_ALIGNMENT
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MRF_MAGIC, b"Morf");
        assert_eq!(RESERVED_SIZE, 6 * 4);
        assert!(DEFAULT_SIGNATURE.len() <= RESERVED_SIZE);
        assert_eq!(MAX_VERTICES, 65536);
    }

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(1), 15);
        assert_eq!(padding_for(15), 1);
        assert_eq!(padding_for(16), 0);
        assert_eq!(padding_for(17), 15);
        assert_eq!(padding_for(80), 0);
    }
}
