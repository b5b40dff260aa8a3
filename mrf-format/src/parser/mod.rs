//! MRF file parser

use std::io::Cursor;
use std::path::Path;

use crate::error::MrfError;
use crate::header::{MrfHeader, OffsetTable};
use crate::io::{read_slice, read_triangle, read_vec2, read_vec3, seek_to};
use crate::model::{FrameVertex, Keyframe, ModelData};
use crate::{FRAME_VERTEX_STRIDE, TRIANGLE_STRIDE, UV_STRIDE};

/// How to treat texture path bytes outside of ASCII
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureDecoding {
    /// Reject with [`MrfError::InvalidEncoding`]
    #[default]
    Strict,
    /// Replace offending bytes and log a warning
    Lossy,
}

/// Parse an MRF buffer into a [`ModelData`]
///
/// The whole file must be in memory. Chunks are located through the offset
/// table, so padding between chunks is never read.
///
/// # Arguments
/// * `data` - Raw MRF file bytes
///
/// # Returns
/// * `Ok(ModelData)` - Parsed model; `header.reserved` holds the six words found
/// * `Err(MrfError)` - Bad magic, truncated buffer, bad texture encoding, or an
///   offset table that cannot be followed
///
/// # Example
/// ```ignore
/// let data = std::fs::read("doodad.mrf")?;
/// let model = parse_mrf(&data)?;
/// println!("Texture: {}", model.texture_path);
/// ```
pub fn parse_mrf(data: &[u8]) -> Result<ModelData, MrfError> {
    parse_mrf_with(data, TextureDecoding::Strict)
}

/// Parse an MRF buffer, choosing how non-ASCII texture bytes are handled
pub fn parse_mrf_with(data: &[u8], decoding: TextureDecoding) -> Result<ModelData, MrfError> {
    let mut cursor = Cursor::new(data);

    let header = MrfHeader::read(&mut cursor)?;
    let table = OffsetTable::read(&mut cursor, header.frame_count)?;

    tracing::debug!(
        frames = header.frame_count,
        vertices = header.vertex_count,
        indices = header.index_count,
        "Parsing MRF"
    );

    let texture_path = read_texture(&mut cursor, table.texture, table.faces, decoding)?;

    if header.index_count % 3 != 0 {
        tracing::warn!(
            "index_count {} is not a multiple of 3, trailing indices ignored",
            header.index_count
        );
    }
    let faces = read_faces(&mut cursor, table.faces, header.index_count / 3)?;
    let uvs = read_uvs(&mut cursor, table.mapping, header.vertex_count)?;

    let mut frames = Vec::with_capacity(table.keyframes.len());
    for &offset in &table.keyframes {
        frames.push(read_keyframe(&mut cursor, offset, header.vertex_count)?);
    }

    Ok(ModelData {
        header,
        texture_path,
        faces,
        uvs,
        frames,
    })
}

/// Read an MRF file from disk and parse it
pub fn read_mrf(path: &Path) -> Result<ModelData, MrfError> {
    let data = std::fs::read(path)?;
    parse_mrf(&data)
}

/// Read only the header and offset table
pub fn read_offset_table(data: &[u8]) -> Result<(MrfHeader, OffsetTable), MrfError> {
    let mut cursor = Cursor::new(data);
    let header = MrfHeader::read(&mut cursor)?;
    let table = OffsetTable::read(&mut cursor, header.frame_count)?;
    Ok((header, table))
}

/// Capacity hint that never exceeds what the rest of the buffer can hold
fn bounded_capacity(cursor: &Cursor<&[u8]>, count: u32, stride: usize) -> usize {
    let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    (count as usize).min(remaining / stride)
}

/// Texture path occupies `[start, end)`; trailing NULs are padding
fn read_texture(
    cursor: &mut Cursor<&[u8]>,
    start: u32,
    end: u32,
    decoding: TextureDecoding,
) -> Result<String, MrfError> {
    if end < start {
        return Err(MrfError::layout(format!(
            "faces offset 0x{:X} precedes texture offset 0x{:X}",
            end, start
        )));
    }
    seek_to(cursor, start)?;
    let raw = read_slice(cursor, (end - start) as usize)?;

    let len = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let raw = &raw[..len];

    if let Some(pos) = raw.iter().position(|&b| b == 0) {
        return Err(MrfError::InvalidEncoding(format!(
            "embedded NUL at offset 0x{:X}",
            start as usize + pos
        )));
    }

    match raw.iter().position(|b| !b.is_ascii()) {
        None => Ok(raw.iter().map(|&b| b as char).collect()),
        Some(pos) => match decoding {
            TextureDecoding::Strict => Err(MrfError::InvalidEncoding(format!(
                "non-ASCII byte 0x{:02X} at offset 0x{:X}",
                raw[pos],
                start as usize + pos
            ))),
            TextureDecoding::Lossy => {
                let path = String::from_utf8_lossy(raw).into_owned();
                tracing::warn!("Texture path is not ASCII, decoded lossily as {:?}", path);
                Ok(path)
            }
        },
    }
}

fn read_faces(
    cursor: &mut Cursor<&[u8]>,
    offset: u32,
    triangle_count: u32,
) -> Result<Vec<[u16; 3]>, MrfError> {
    seek_to(cursor, offset)?;
    let mut faces = Vec::with_capacity(bounded_capacity(cursor, triangle_count, TRIANGLE_STRIDE));
    for _ in 0..triangle_count {
        faces.push(read_triangle(cursor)?);
    }
    Ok(faces)
}

fn read_uvs(
    cursor: &mut Cursor<&[u8]>,
    offset: u32,
    vertex_count: u32,
) -> Result<Vec<[f32; 2]>, MrfError> {
    seek_to(cursor, offset)?;
    let mut uvs = Vec::with_capacity(bounded_capacity(cursor, vertex_count, UV_STRIDE));
    for _ in 0..vertex_count {
        let [u, v] = read_vec2(cursor)?;
        uvs.push([u, 1.0 - v]);
    }
    Ok(uvs)
}

fn read_keyframe(
    cursor: &mut Cursor<&[u8]>,
    offset: u32,
    vertex_count: u32,
) -> Result<Keyframe, MrfError> {
    seek_to(cursor, offset)?;
    let mut frame = Vec::with_capacity(bounded_capacity(cursor, vertex_count, FRAME_VERTEX_STRIDE));
    for _ in 0..vertex_count {
        let position = read_vec3(cursor)?;
        let normal = read_vec3(cursor)?;
        frame.push(FrameVertex { position, normal });
    }
    Ok(frame)
}
