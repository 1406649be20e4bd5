//! NBIT coder (§4.E.3): a bit-packed projection. Each `nt`-sized big-endian
//! value contributes `bit_len` bits starting at `start_bit` (offset from the
//! low bit). On decode, bits outside that window are reconstructed: if
//! `sign_ext`, from the field's own sign bit; otherwise from `fill_one`.
//!
//! Round-tripping is only exact for values whose bits outside
//! `[start_bit, start_bit+bit_len)` already equal what reconstruction would
//! produce — callers are expected to honor that precondition (§8).

use super::bits::{BitReader, BitWriter};
use crate::error::{HdfError, Result};

pub mod numtype {
    pub const INT8: i32 = 20;
    pub const UINT8: i32 = 21;
    pub const INT16: i32 = 22;
    pub const UINT16: i32 = 23;
    pub const INT32: i32 = 24;
    pub const UINT32: i32 = 25;
    pub const FLOAT32: i32 = 5;
    pub const FLOAT64: i32 = 6;
}

pub fn nt_size(nt: i32) -> Result<usize> {
    use numtype::*;
    match nt {
        INT8 | UINT8 => Ok(1),
        INT16 | UINT16 => Ok(2),
        INT32 | UINT32 | FLOAT32 => Ok(4),
        FLOAT64 => Ok(8),
        other => Err(HdfError::BadNumType(other)),
    }
}

fn mask(bits: i32) -> u64 {
    if bits <= 0 {
        0
    } else if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Validates `start_bit`/`bit_len` against `nt`'s width. Every entry point
/// that trusts these values — including ones parsed straight off disk in
/// `CoderParams::from_trailer` — must run this first; `decode` shifts by
/// `bit_len - 1` and by `start_bit`, which panic on out-of-range input.
pub fn validate_params(nt: i32, start_bit: i32, bit_len: i32) -> Result<()> {
    let sz = nt_size(nt)?;
    let width_bits = (sz * 8) as i32;
    if !(1..=32).contains(&bit_len) {
        return Err(HdfError::BadFile("NBIT bit_len must be in 1..=32"));
    }
    if start_bit < 0 {
        return Err(HdfError::BadFile("NBIT start_bit must be non-negative"));
    }
    if start_bit + bit_len > width_bits {
        return Err(HdfError::BadFile("NBIT start_bit + bit_len exceeds the number-type width"));
    }
    Ok(())
}

pub fn encode(plain: &[u8], nt: i32, start_bit: i32, bit_len: i32) -> Result<Vec<u8>> {
    validate_params(nt, start_bit, bit_len)?;
    let sz = nt_size(nt)?;
    if plain.len() % sz != 0 {
        return Err(HdfError::Range("NBIT payload not a multiple of the number-type width".into()));
    }
    let mut writer = BitWriter::new();
    for chunk in plain.chunks(sz) {
        let mut raw: u64 = 0;
        for &byte in chunk {
            raw = (raw << 8) | byte as u64;
        }
        let field = (raw >> start_bit) & mask(bit_len);
        writer.push_bits(field as u32, bit_len as u8);
    }
    Ok(writer.finish())
}

pub fn decode(
    backing: &[u8],
    nt: i32,
    sign_ext: bool,
    fill_one: bool,
    start_bit: i32,
    bit_len: i32,
    logical_len: usize,
) -> Result<Vec<u8>> {
    validate_params(nt, start_bit, bit_len)?;
    let sz = nt_size(nt)?;
    let width_bits = (sz * 8) as i32;
    let count = logical_len / sz;
    let mut reader = BitReader::new(backing);
    let mut out = Vec::with_capacity(logical_len);

    for _ in 0..count {
        let field = reader.read_bits(bit_len as u8) as u64;
        let sign_bit_set = sign_ext && ((field >> (bit_len - 1)) & 1) == 1;
        let outside_high = !mask(start_bit + bit_len) & mask(width_bits);
        let outside_low = mask(start_bit);
        let high_fill = if sign_bit_set || (!sign_ext && fill_one) { u64::MAX } else { 0 };
        let low_fill = if fill_one { u64::MAX } else { 0 };

        let raw = (field << start_bit) | (high_fill & outside_high) | (low_fill & outside_low);
        let raw = raw & mask(width_bits);
        let bytes = raw.to_be_bytes();
        out.extend_from_slice(&bytes[8 - sz..]);
    }
    Ok(out)
}
