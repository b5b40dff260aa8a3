//! Little-endian read/write helpers and chunk alignment
//!
//! Readers pull from a `Cursor` over the whole file and report
//! [`MrfError::UnexpectedEof`] with the offending offset. Writers append to a
//! `Vec<u8>` and cannot fail.

use std::io::{Cursor, Read};

use crate::error::MrfError;
use crate::padding_for;

// =============================================================================
// Reading
// =============================================================================

fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], MrfError> {
    let offset = cursor.position();
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| MrfError::UnexpectedEof { offset })?;
    Ok(buf)
}

/// Read a single byte
pub fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, MrfError> {
    Ok(read_array::<1>(cursor)?[0])
}

/// Read a u16 in little-endian format
pub fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, MrfError> {
    Ok(u16::from_le_bytes(read_array(cursor)?))
}

/// Read a u32 in little-endian format
pub fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, MrfError> {
    Ok(u32::from_le_bytes(read_array(cursor)?))
}

/// Read an f32 in little-endian format
pub fn read_f32(cursor: &mut Cursor<&[u8]>) -> Result<f32, MrfError> {
    Ok(f32::from_le_bytes(read_array(cursor)?))
}

/// Read two consecutive f32 values
pub fn read_vec2(cursor: &mut Cursor<&[u8]>) -> Result<[f32; 2], MrfError> {
    Ok([read_f32(cursor)?, read_f32(cursor)?])
}

/// Read three consecutive f32 values
pub fn read_vec3(cursor: &mut Cursor<&[u8]>) -> Result<[f32; 3], MrfError> {
    Ok([read_f32(cursor)?, read_f32(cursor)?, read_f32(cursor)?])
}

/// Read a triangle as three u16 indices
pub fn read_triangle(cursor: &mut Cursor<&[u8]>) -> Result<[u16; 3], MrfError> {
    Ok([read_u16(cursor)?, read_u16(cursor)?, read_u16(cursor)?])
}

/// Borrow `len` bytes at the cursor and advance past them
pub fn read_slice<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8], MrfError> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position();
    let end = (start as usize)
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or(MrfError::UnexpectedEof { offset: start })?;
    cursor.set_position(end as u64);
    Ok(&data[start as usize..end])
}

/// Move the cursor to an absolute offset inside the buffer
pub fn seek_to(cursor: &mut Cursor<&[u8]>, offset: u32) -> Result<(), MrfError> {
    if offset as usize > cursor.get_ref().len() {
        return Err(MrfError::UnexpectedEof {
            offset: offset as u64,
        });
    }
    cursor.set_position(offset as u64);
    Ok(())
}

// =============================================================================
// Writing
// =============================================================================

/// Write a single byte
pub fn write_u8(out: &mut Vec<u8>, val: u8) {
    out.push(val);
}

/// Write a u16 in little-endian format
pub fn write_u16(out: &mut Vec<u8>, val: u16) {
    out.extend_from_slice(&val.to_le_bytes());
}

/// Write a u32 in little-endian format
pub fn write_u32(out: &mut Vec<u8>, val: u32) {
    out.extend_from_slice(&val.to_le_bytes());
}

/// Write an f32 in little-endian format
pub fn write_f32(out: &mut Vec<u8>, val: f32) {
    out.extend_from_slice(&val.to_le_bytes());
}

/// Write two consecutive f32 values
pub fn write_vec2(out: &mut Vec<u8>, v: [f32; 2]) {
    write_f32(out, v[0]);
    write_f32(out, v[1]);
}

/// Write three consecutive f32 values
pub fn write_vec3(out: &mut Vec<u8>, v: [f32; 3]) {
    write_f32(out, v[0]);
    write_f32(out, v[1]);
    write_f32(out, v[2]);
}

/// Write a triangle as three u16 indices
pub fn write_triangle(out: &mut Vec<u8>, tri: [u16; 3]) {
    write_u16(out, tri[0]);
    write_u16(out, tri[1]);
    write_u16(out, tri[2]);
}

/// Overwrite a u32 that was previously written at `pos`
pub fn patch_u32(out: &mut [u8], pos: usize, val: u32) {
    out[pos..pos + 4].copy_from_slice(&val.to_le_bytes());
}

/// Append zero bytes until `out.len()` is a multiple of 16.
///
/// No-op when the buffer is already aligned.
pub fn align16(out: &mut Vec<u8>) {
    let padding = padding_for(out.len());
    out.resize(out.len() + padding, 0);
}
