//! MRF header and offset table

use std::io::Cursor;

use serde::Serialize;

use crate::error::MrfError;
use crate::io::{read_f32, read_u32, read_vec3, write_f32, write_u32, write_vec3};
use crate::{MRF_MAGIC, RESERVED_SIZE, padding_for};

/// MRF header scalars (magic, counts, timing, bounds, reserved block)
///
/// `reserved` is `None` when the producer has no explicit reserved words; the
/// writer then decides between the signature and zeros. A parsed header always
/// carries `Some` with the six words found in the file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MrfHeader {
    /// Number of keyframes
    pub frame_count: u32,
    /// Unique vertices per keyframe
    pub vertex_count: u32,
    /// 3 × triangle count
    pub index_count: u32,
    /// Seconds between keyframes (1 / fps)
    pub frame_duration: f32,
    /// Model-space pivot, in export units
    pub pivot: [f32; 3],
    /// Bounding sphere radius around the pivot, in export units
    pub bounds_radius: f32,
    /// Playback start delay in seconds
    pub elapsed_time: f32,
    /// Opaque flag, passed through unchanged
    pub debug_flag: u32,
    /// Six reserved words (24 bytes)
    pub reserved: Option<[u32; 6]>,
}

impl MrfHeader {
    /// Magic + scalar fields + reserved block
    pub const SIZE: usize = 0x44;

    /// Byte offset of the reserved block
    pub const RESERVED_OFFSET: usize = 0x2C;

    /// Byte offset where the offset table begins. The last reserved word sits
    /// here and plays the role of the table's leading placeholder entry.
    pub const TABLE_OFFSET: usize = 0x40;

    pub fn new(frame_count: u32, vertex_count: u32, index_count: u32, frame_duration: f32) -> Self {
        Self {
            frame_count,
            vertex_count,
            index_count,
            frame_duration,
            pivot: [0.0; 3],
            bounds_radius: 0.0,
            elapsed_time: 0.0,
            debug_flag: 0,
            reserved: None,
        }
    }

    /// Write the header with the given reserved block
    pub fn to_bytes(&self, reserved: &[u8; RESERVED_SIZE]) -> [u8; Self::SIZE] {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(MRF_MAGIC);
        write_u32(&mut out, self.frame_count);
        write_u32(&mut out, self.vertex_count);
        write_u32(&mut out, self.index_count);
        write_f32(&mut out, self.frame_duration);
        write_vec3(&mut out, self.pivot);
        write_f32(&mut out, self.bounds_radius);
        write_f32(&mut out, self.elapsed_time);
        write_u32(&mut out, self.debug_flag);
        out.extend_from_slice(reserved);

        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }

    /// Read the header from the start of an MRF buffer, checking the magic
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, MrfError> {
        let magic = crate::io::read_slice(cursor, MRF_MAGIC.len())?;
        if magic != MRF_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            return Err(MrfError::InvalidMagic(found));
        }

        let frame_count = read_u32(cursor)?;
        let vertex_count = read_u32(cursor)?;
        let index_count = read_u32(cursor)?;
        let frame_duration = read_f32(cursor)?;
        let pivot = read_vec3(cursor)?;
        let bounds_radius = read_f32(cursor)?;
        let elapsed_time = read_f32(cursor)?;
        let debug_flag = read_u32(cursor)?;

        let mut reserved = [0u32; 6];
        for word in reserved.iter_mut() {
            *word = read_u32(cursor)?;
        }

        Ok(Self {
            frame_count,
            vertex_count,
            index_count,
            frame_duration,
            pivot,
            bounds_radius,
            elapsed_time,
            debug_flag,
            reserved: Some(reserved),
        })
    }

    /// Reserved words as raw little-endian bytes (zeros when absent)
    pub fn reserved_bytes(&self) -> [u8; RESERVED_SIZE] {
        let mut bytes = [0u8; RESERVED_SIZE];
        if let Some(words) = self.reserved {
            for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
                chunk.copy_from_slice(&word.to_le_bytes());
            }
        }
        bytes
    }

    /// Printable ASCII signature stored in the reserved block, if any
    pub fn signature(&self) -> Option<String> {
        let bytes = self.reserved_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = &bytes[..end];
        let printable = !text.is_empty()
            && text.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
            && bytes[end..].iter().all(|&b| b == 0);
        printable.then(|| String::from_utf8_lossy(text).into_owned())
    }
}

/// Absolute chunk offsets stored right after the reserved block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OffsetTable {
    pub texture: u32,
    pub faces: u32,
    pub mapping: u32,
    pub keyframes: Vec<u32>,
}

impl OffsetTable {
    /// Entries in the table, counting the leading placeholder word
    pub fn entry_count(&self) -> usize {
        self.keyframes.len() + 4
    }

    /// Byte offset just past the last table entry, before padding
    pub fn end_offset(frame_count: usize) -> usize {
        MrfHeader::TABLE_OFFSET + (frame_count + 4) * 4
    }

    /// Size of the header + table region once padded to 16 bytes
    pub fn region_size(frame_count: usize) -> usize {
        let end = Self::end_offset(frame_count);
        end + padding_for(end)
    }

    /// Read `frame_count` keyframe offsets after the three fixed ones.
    ///
    /// Expects the cursor positioned right after the reserved block.
    pub fn read(cursor: &mut Cursor<&[u8]>, frame_count: u32) -> Result<Self, MrfError> {
        let texture = read_u32(cursor)?;
        let faces = read_u32(cursor)?;
        let mapping = read_u32(cursor)?;

        // Don't trust frame_count for the allocation, the buffer bounds it
        let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
        let mut keyframes = Vec::with_capacity((frame_count as usize).min(remaining / 4));
        for _ in 0..frame_count {
            keyframes.push(read_u32(cursor)?);
        }

        Ok(Self {
            texture,
            faces,
            mapping,
            keyframes,
        })
    }

    /// Write the three fixed offsets and the keyframe offsets
    pub fn write(&self, out: &mut Vec<u8>) {
        write_u32(out, self.texture);
        write_u32(out, self.faces);
        write_u32(out, self.mapping);
        for &offset in &self.keyframes {
            write_u32(out, offset);
        }
    }
}
