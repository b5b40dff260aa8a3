//! MRF writer - encodes a ModelData into the exact MRF byte layout
//!
//! Encoding happens in three passes over one in-memory buffer:
//!
//! 1. Header stub: scalars, reserved block, and zeroed offset placeholders,
//!    padded to 16 bytes
//! 2. Chunks: texture, faces, mapping, then one chunk per keyframe, each
//!    starting on (and padded to) a 16-byte boundary
//! 3. Patch: the recorded chunk starts are written over the placeholders

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MrfError;
use crate::header::OffsetTable;
use crate::io::{align16, patch_u32, write_triangle, write_vec2, write_vec3};
use crate::model::ModelData;
use crate::validation::validate_model;
use crate::{DEFAULT_SIGNATURE, RESERVED_SIZE};

/// Directory (relative to the export directory) that receives the mirror copy
const MIRROR_DIR: [&str; 3] = ["doodads", "cinematic", "arthasillidanfight"];

/// File name prefix of the mirror copy
const MIRROR_PREFIX: &str = "arthascape";

/// Writer behaviour flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WriteOptions {
    /// Embed [`DEFAULT_SIGNATURE`] in the reserved block when the model has no
    /// explicit reserved words
    #[serde(default = "default_signature")]
    pub signature: bool,

    /// Also write a byte-identical copy under the game-ready cinematic path
    #[serde(default)]
    pub mirror_copy: bool,
}

fn default_signature() -> bool {
    true
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            signature: default_signature(),
            mirror_copy: false,
        }
    }
}

/// Outcome of a file write
#[derive(Debug, Clone)]
pub struct WriteReport {
    /// Bytes written to the primary path
    pub size: usize,
    /// Offset table as written
    pub offsets: OffsetTable,
    /// Where the mirror copy landed, if one was requested and succeeded
    pub mirror: Option<PathBuf>,
}

/// Encodes one model
pub struct MrfWriter<'a> {
    model: &'a ModelData,
    options: WriteOptions,
}

impl<'a> MrfWriter<'a> {
    pub fn new(model: &'a ModelData, options: WriteOptions) -> Self {
        Self { model, options }
    }

    /// Encode to bytes
    pub fn encode(&self) -> Result<Vec<u8>, MrfError> {
        self.encode_with_offsets().map(|(bytes, _)| bytes)
    }

    /// Encode to bytes, also returning the offset table that was patched in
    ///
    /// The model is validated first; an inconsistent model produces no bytes.
    pub fn encode_with_offsets(&self) -> Result<(Vec<u8>, OffsetTable), MrfError> {
        validate_model(self.model)?;

        let m = self.model;
        let frame_count = m.frames.len();
        let mut out = Vec::with_capacity(estimated_size(m));

        // ========== Header stub ==========
        out.extend_from_slice(&m.header.to_bytes(&self.reserved_block()));

        let table_pos = out.len();
        let placeholder = OffsetTable {
            keyframes: vec![0; frame_count],
            ..Default::default()
        };
        placeholder.write(&mut out);
        align16(&mut out);
        debug_assert_eq!(out.len(), OffsetTable::region_size(frame_count));

        // ========== Chunks ==========
        let mut table = OffsetTable {
            keyframes: Vec::with_capacity(frame_count),
            ..Default::default()
        };

        table.texture = chunk_start(&out)?;
        out.extend_from_slice(m.texture_path.as_bytes());
        align16(&mut out);

        table.faces = chunk_start(&out)?;
        for &tri in &m.faces {
            write_triangle(&mut out, tri);
        }
        align16(&mut out);

        table.mapping = chunk_start(&out)?;
        for &[u, v] in &m.uvs {
            write_vec2(&mut out, [u, 1.0 - v]);
        }
        align16(&mut out);

        for frame in &m.frames {
            table.keyframes.push(chunk_start(&out)?);
            for vertex in frame {
                write_vec3(&mut out, vertex.position);
                write_vec3(&mut out, vertex.normal);
            }
            align16(&mut out);
        }

        // ========== Patch offsets ==========
        patch_u32(&mut out, table_pos, table.texture);
        patch_u32(&mut out, table_pos + 4, table.faces);
        patch_u32(&mut out, table_pos + 8, table.mapping);
        for (i, &offset) in table.keyframes.iter().enumerate() {
            patch_u32(&mut out, table_pos + 12 + i * 4, offset);
        }

        tracing::debug!(
            texture = table.texture,
            faces = table.faces,
            mapping = table.mapping,
            keyframes = frame_count,
            size = out.len(),
            "Encoded MRF"
        );

        Ok((out, table))
    }

    /// Encode and write to `path`, plus the mirror copy when requested.
    ///
    /// A failed mirror write is logged and reported as `mirror: None`; it never
    /// fails the primary write.
    pub fn write(&self, path: &Path) -> Result<WriteReport, MrfError> {
        let (bytes, offsets) = self.encode_with_offsets()?;
        std::fs::write(path, &bytes)?;

        let mirror = if self.options.mirror_copy {
            match write_mirror(path, &bytes) {
                Ok(mirror) => {
                    tracing::info!("Wrote mirror copy {:?}", mirror);
                    Some(mirror)
                }
                Err(e) => {
                    tracing::warn!("Failed to write mirror copy of {:?}: {}", path, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(WriteReport {
            size: bytes.len(),
            offsets,
            mirror,
        })
    }

    /// Reserved block priority: explicit words > signature > zeros
    fn reserved_block(&self) -> [u8; RESERVED_SIZE] {
        if self.model.header.reserved.is_some() {
            return self.model.header.reserved_bytes();
        }

        let mut block = [0u8; RESERVED_SIZE];
        if self.options.signature {
            let len = DEFAULT_SIGNATURE.len().min(RESERVED_SIZE);
            block[..len].copy_from_slice(&DEFAULT_SIGNATURE[..len]);
        }
        block
    }
}

/// Encode and write a model in one call
pub fn write_mrf(
    path: &Path,
    model: &ModelData,
    options: WriteOptions,
) -> Result<WriteReport, MrfError> {
    MrfWriter::new(model, options).write(path)
}

/// Location of the game-ready mirror copy for an export path
///
/// `out/foo.mrf` maps to `out/doodads/cinematic/arthasillidanfight/arthascapefoo.mrf`.
pub fn mirror_path(path: &Path) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut mirror = dir.to_path_buf();
    for part in MIRROR_DIR {
        mirror.push(part);
    }
    mirror.push(format!("{}{}", MIRROR_PREFIX, name));
    mirror
}

fn write_mirror(path: &Path, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mirror = mirror_path(path);
    if let Some(dir) = mirror.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&mirror, bytes)?;
    Ok(mirror)
}

fn chunk_start(out: &[u8]) -> Result<u32, MrfError> {
    u32::try_from(out.len())
        .map_err(|_| MrfError::layout(format!("chunk offset {} exceeds u32 range", out.len())))
}

fn estimated_size(m: &ModelData) -> usize {
    let vertices = m.uvs.len();
    OffsetTable::region_size(m.frames.len())
        + m.texture_path.len()
        + m.faces.len() * crate::TRIANGLE_STRIDE
        + vertices * crate::UV_STRIDE
        + m.frames.len() * vertices * crate::FRAME_VERTEX_STRIDE
        + (3 + m.frames.len()) * crate::CHUNK_ALIGNMENT
}
