//! SKPHUFF coder (§4.E.3): de-interleaves the stream into `skip_size` lanes
//! (byte `i` belongs to lane `i % skip_size`, e.g. separating the
//! high-redundancy leading bytes of a word from the low-order bytes) and
//! drives one adaptive Huffman model per lane, emitting codes in original
//! stream order so decode can replay the same lane assignment.

use super::bits::{BitReader, BitWriter};
use super::huffman::AdaptiveHuffman;
use crate::error::{HdfError, Result};

pub fn encode(plain: &[u8], skip_size: u32) -> Result<Vec<u8>> {
    let lanes = lane_count(skip_size)?;
    let mut models: Vec<AdaptiveHuffman> = (0..lanes).map(|_| AdaptiveHuffman::new()).collect();
    let mut writer = BitWriter::new();
    for (i, &b) in plain.iter().enumerate() {
        models[i % lanes].encode_symbol(b, &mut writer);
    }
    Ok(writer.finish())
}

pub fn decode(backing: &[u8], skip_size: u32, logical_len: usize) -> Result<Vec<u8>> {
    let lanes = lane_count(skip_size)?;
    let mut models: Vec<AdaptiveHuffman> = (0..lanes).map(|_| AdaptiveHuffman::new()).collect();
    let mut reader = BitReader::new(backing);
    let mut out = Vec::with_capacity(logical_len);
    for i in 0..logical_len {
        out.push(models[i % lanes].decode_symbol(&mut reader));
    }
    Ok(out)
}

fn lane_count(skip_size: u32) -> Result<usize> {
    if skip_size == 0 {
        return Err(HdfError::Args("SKPHUFF skip_size must be nonzero"));
    }
    Ok(skip_size as usize)
}
