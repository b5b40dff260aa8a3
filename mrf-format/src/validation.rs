//! Model invariants and on-disk layout checks

use serde::Serialize;

use crate::error::MrfError;
use crate::header::{MrfHeader, OffsetTable};
use crate::model::ModelData;
use crate::parser::read_offset_table;
use crate::{CHUNK_ALIGNMENT, FRAME_VERTEX_STRIDE, MAX_VERTICES, TRIANGLE_STRIDE, UV_STRIDE};

/// Check every invariant the writer relies on
///
/// - header counts match the data (`frame_count`, `vertex_count`, `index_count`)
/// - every keyframe has exactly `vertex_count` vertices
/// - every triangle index is below `vertex_count`
/// - the texture path is ASCII without embedded NUL
pub fn validate_model(model: &ModelData) -> Result<(), MrfError> {
    let h = &model.header;
    let vertex_count = model.uvs.len();

    if vertex_count > MAX_VERTICES {
        return Err(MrfError::geometry(format!(
            "{} vertices exceed the u16 index limit of {}",
            vertex_count, MAX_VERTICES
        )));
    }
    if h.vertex_count as usize != vertex_count {
        return Err(MrfError::geometry(format!(
            "header vertex_count {} but {} UVs",
            h.vertex_count, vertex_count
        )));
    }
    if h.index_count as usize != model.faces.len() * 3 {
        return Err(MrfError::geometry(format!(
            "header index_count {} but {} triangles",
            h.index_count,
            model.faces.len()
        )));
    }
    if h.frame_count as usize != model.frames.len() {
        return Err(MrfError::geometry(format!(
            "header frame_count {} but {} keyframes",
            h.frame_count,
            model.frames.len()
        )));
    }

    for (i, frame) in model.frames.iter().enumerate() {
        if frame.len() != vertex_count {
            return Err(MrfError::geometry(format!(
                "keyframe {} has {} vertices, expected {}",
                i,
                frame.len(),
                vertex_count
            )));
        }
    }

    for (i, face) in model.faces.iter().enumerate() {
        if let Some(&index) = face.iter().find(|&&index| index as usize >= vertex_count) {
            return Err(MrfError::geometry(format!(
                "face {} references vertex {} (vertex_count {})",
                i, index, vertex_count
            )));
        }
    }

    validate_texture_path(&model.texture_path)
}

fn validate_texture_path(path: &str) -> Result<(), MrfError> {
    if let Some(c) = path.chars().find(|c| !c.is_ascii()) {
        return Err(MrfError::InvalidEncoding(format!(
            "non-ASCII character {:?} in {:?}",
            c, path
        )));
    }
    if path.contains('\0') {
        return Err(MrfError::InvalidEncoding(format!(
            "embedded NUL in {:?}",
            path
        )));
    }
    Ok(())
}

/// One chunk as located by the offset table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkSpan {
    /// Absolute start offset
    pub offset: u32,
    /// Bytes until the next table entry (or end of file), padding included
    pub len: u32,
    /// Bytes of payload the header counts require
    pub payload: u32,
}

/// Verified layout of an MRF buffer
#[derive(Debug, Clone, Serialize)]
pub struct ChunkLayout {
    pub header: MrfHeader,
    pub offsets: OffsetTable,
    /// Header + offset table, padded
    pub header_region: u32,
    pub texture: ChunkSpan,
    pub faces: ChunkSpan,
    pub mapping: ChunkSpan,
    pub keyframes: Vec<ChunkSpan>,
    pub file_len: u32,
}

impl ChunkLayout {
    /// Entries in the offset table, counting the leading placeholder word
    pub fn table_entries(&self) -> usize {
        self.offsets.entry_count()
    }
}

/// Check the magic, alignment and offset consistency of an MRF buffer
///
/// Chunks must start on 16-byte boundaries after the padded header region,
/// appear in table order (texture, faces, mapping, keyframes), stay inside
/// the buffer, and leave room for the payload the header counts imply.
/// Keyframes may share a chunk.
pub fn inspect_layout(data: &[u8]) -> Result<ChunkLayout, MrfError> {
    let (header, offsets) = read_offset_table(data)?;
    let file_len = u32::try_from(data.len())
        .map_err(|_| MrfError::layout(format!("file of {} bytes exceeds u32 range", data.len())))?;

    let header_region = OffsetTable::region_size(offsets.keyframes.len()) as u32;
    if file_len % CHUNK_ALIGNMENT as u32 != 0 {
        return Err(MrfError::layout(format!(
            "file length {} is not a multiple of {}",
            file_len, CHUNK_ALIGNMENT
        )));
    }

    let padding_start = OffsetTable::end_offset(offsets.keyframes.len());
    if data
        .get(padding_start..header_region as usize)
        .is_some_and(|pad| pad.iter().any(|&b| b != 0))
    {
        return Err(MrfError::layout("header padding is not zero"));
    }

    let mut ordered = vec![
        ("texture", offsets.texture),
        ("faces", offsets.faces),
        ("mapping", offsets.mapping),
    ];
    ordered.extend(offsets.keyframes.iter().map(|&o| ("keyframe", o)));

    let mut previous = header_region;
    for &(name, offset) in &ordered {
        if offset as usize % CHUNK_ALIGNMENT != 0 {
            return Err(MrfError::layout(format!(
                "{} chunk at 0x{:X} is not {}-byte aligned",
                name, offset, CHUNK_ALIGNMENT
            )));
        }
        if offset < previous {
            return Err(MrfError::layout(format!(
                "{} chunk at 0x{:X} precedes 0x{:X}",
                name, offset, previous
            )));
        }
        if offset > file_len {
            return Err(MrfError::UnexpectedEof {
                offset: offset as u64,
            });
        }
        previous = offset;
    }

    // A chunk ends where the next table entry starts. Keyframes sharing a
    // chunk run to the next distinct offset.
    let span = |index: usize, payload: usize| -> Result<ChunkSpan, MrfError> {
        let (name, offset) = ordered[index];
        let mut following = ordered[index + 1..].iter().map(|&(_, o)| o);
        let next = if name == "keyframe" {
            following.find(|&o| o > offset)
        } else {
            following.next()
        };
        let len = next.unwrap_or(file_len) - offset;
        if (len as usize) < payload {
            return Err(MrfError::layout(format!(
                "chunk at 0x{:X} holds {} bytes, header requires {}",
                offset, len, payload
            )));
        }
        Ok(ChunkSpan {
            offset,
            len,
            payload: payload as u32,
        })
    };

    let vertex_count = header.vertex_count as usize;
    let texture = span(0, 0)?;
    let faces = span(1, (header.index_count / 3) as usize * TRIANGLE_STRIDE)?;
    let mapping = span(2, vertex_count * UV_STRIDE)?;
    let keyframes = (3..ordered.len())
        .map(|index| span(index, vertex_count * FRAME_VERTEX_STRIDE))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChunkLayout {
        header,
        offsets,
        header_region,
        texture,
        faces,
        mapping,
        keyframes,
        file_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrameVertex;
    use crate::writer::{MrfWriter, WriteOptions};

    fn quad() -> ModelData {
        let frame: Vec<FrameVertex> = (0..4)
            .map(|i| FrameVertex::new([i as f32, 0.0, 0.0], [0.0, 0.0, 1.0]))
            .collect();
        ModelData::new(
            "Textures/quad",
            vec![[0, 1, 2], [2, 1, 3]],
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            vec![frame.clone(), frame.clone(), frame],
            1.0 / 30.0,
        )
    }

    #[test]
    fn test_valid_model_passes() {
        assert!(validate_model(&quad()).is_ok());
    }

    #[test]
    fn test_face_index_out_of_range() {
        let mut model = quad();
        model.faces[1] = [2, 1, 4];
        let err = validate_model(&model).unwrap_err();
        assert!(matches!(err, MrfError::InconsistentGeometry(_)));
        assert!(err.to_string().contains("face 1 references vertex 4"));
    }

    #[test]
    fn test_uv_count_mismatch() {
        let mut model = quad();
        model.uvs.pop();
        assert!(matches!(
            validate_model(&model),
            Err(MrfError::InconsistentGeometry(_))
        ));
    }

    #[test]
    fn test_short_keyframe() {
        let mut model = quad();
        model.frames[2].pop();
        let err = validate_model(&model).unwrap_err();
        assert!(err.to_string().contains("keyframe 2 has 3 vertices"));
    }

    #[test]
    fn test_frame_count_mismatch() {
        let mut model = quad();
        model.header.frame_count = 5;
        assert!(matches!(
            validate_model(&model),
            Err(MrfError::InconsistentGeometry(_))
        ));
    }

    #[test]
    fn test_texture_path_rules() {
        let mut model = quad();
        model.texture_path = "Textures/caf\u{e9}".to_string();
        assert!(matches!(
            validate_model(&model),
            Err(MrfError::InvalidEncoding(_))
        ));

        model.texture_path = "Textures/a\0b".to_string();
        assert!(matches!(
            validate_model(&model),
            Err(MrfError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_inspect_written_layout() {
        let model = quad();
        let bytes = MrfWriter::new(&model, WriteOptions::default())
            .encode()
            .unwrap();
        let layout = inspect_layout(&bytes).unwrap();

        assert_eq!(layout.table_entries(), 3 + 4);
        // 0x40 + 7 words = 0x5C -> 0x60
        assert_eq!(layout.header_region, 0x60);
        assert_eq!(layout.texture.offset, 0x60);
        assert_eq!(layout.texture.len, 16);
        assert_eq!(layout.faces.offset, 0x70);
        assert_eq!(layout.faces.len, 16);
        assert_eq!(layout.mapping.offset, 0x80);
        assert_eq!(layout.mapping.len, 32);
        assert_eq!(layout.keyframes.len(), 3);
        for span in &layout.keyframes {
            assert_eq!(span.offset % 16, 0);
            assert_eq!(span.len, 96);
            assert_eq!(span.payload, 96);
        }
        assert_eq!(layout.file_len as usize, bytes.len());
    }

    #[test]
    fn test_empty_texture_chunk_has_zero_length() {
        let mut model = quad();
        model.texture_path.clear();
        let bytes = MrfWriter::new(&model, WriteOptions::default())
            .encode()
            .unwrap();
        let layout = inspect_layout(&bytes).unwrap();

        assert_eq!(layout.texture.offset, layout.faces.offset);
        assert_eq!(layout.texture.len, 0);
        assert_eq!(layout.faces.len, 16);
    }

    #[test]
    fn test_shared_keyframe_chunk() {
        let bytes = MrfWriter::new(&quad(), WriteOptions::default())
            .encode()
            .unwrap();
        let mut shared = bytes.clone();
        // keyframe 1 points at keyframe 0's chunk
        let first = shared[0x50..0x54].to_vec();
        shared[0x54..0x58].copy_from_slice(&first);
        let layout = inspect_layout(&shared).unwrap();

        assert_eq!(layout.keyframes[0].offset, layout.keyframes[1].offset);
        // Both run up to keyframe 2
        assert_eq!(layout.keyframes[0].len, 192);
        assert_eq!(layout.keyframes[1].len, 192);
        assert_eq!(layout.keyframes[2].len, 96);
    }

    #[test]
    fn test_inspect_rejects_unaligned_offset() {
        let bytes = MrfWriter::new(&quad(), WriteOptions::default())
            .encode()
            .unwrap();
        let mut corrupt = bytes.clone();
        // faces offset lives at 0x48
        corrupt[0x48..0x4C].copy_from_slice(&0x74u32.to_le_bytes());
        let err = inspect_layout(&corrupt).unwrap_err();
        assert!(matches!(err, MrfError::InvalidLayout(_)));
        assert!(err.to_string().contains("not 16-byte aligned"));
    }

    #[test]
    fn test_inspect_rejects_out_of_order_chunks() {
        let bytes = MrfWriter::new(&quad(), WriteOptions::default())
            .encode()
            .unwrap();
        let mut corrupt = bytes.clone();
        // mapping before faces
        corrupt[0x4C..0x50].copy_from_slice(&0x60u32.to_le_bytes());
        assert!(matches!(
            inspect_layout(&corrupt),
            Err(MrfError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_inspect_rejects_truncated_keyframe() {
        let bytes = MrfWriter::new(&quad(), WriteOptions::default())
            .encode()
            .unwrap();
        let truncated = &bytes[..bytes.len() - 16];
        assert!(matches!(
            inspect_layout(truncated),
            Err(MrfError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_inspect_rejects_bad_magic() {
        let mut bytes = MrfWriter::new(&quad(), WriteOptions::default())
            .encode()
            .unwrap();
        bytes[..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            inspect_layout(&bytes),
            Err(MrfError::InvalidMagic(_))
        ));
    }
}
