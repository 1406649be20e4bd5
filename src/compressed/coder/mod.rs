//! The coding layer (§4.E.3): transforms logical bytes to/from the backing
//! DD's raw bytes. A closed variant type stands in for the source's
//! per-coder function table (§9) — adding a variant is a new match arm here
//! plus a trailer (de)serialization pair.

pub mod bits;
pub mod huffman;
pub mod nbit;
pub mod none;
pub mod rle;
pub mod skphuff;

use deku::prelude::*;

use crate::error::{HdfError, Result};

pub mod variant_code {
    pub const NONE: u16 = 0;
    pub const RLE: u16 = 1;
    pub const SKPHUFF: u16 = 2;
    pub const NBIT: u16 = 3;
}

/// Parameters carried in the descriptor trailer (§4.E.1) and needed to
/// drive `encode`/`decode` for one coder variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderParams {
    None,
    Rle,
    Skphuff { skip_size: u32 },
    Nbit { nt: i32, sign_ext: bool, fill_one: bool, start_bit: i32, bit_len: i32 },
}

impl CoderParams {
    pub fn variant_code(&self) -> u16 {
        match self {
            CoderParams::None => variant_code::NONE,
            CoderParams::Rle => variant_code::RLE,
            CoderParams::Skphuff { .. } => variant_code::SKPHUFF,
            CoderParams::Nbit { .. } => variant_code::NBIT,
        }
    }

    pub fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        match self {
            CoderParams::None => Ok(none::encode(plain)),
            CoderParams::Rle => Ok(rle::encode(plain)),
            CoderParams::Skphuff { skip_size } => skphuff::encode(plain, *skip_size),
            CoderParams::Nbit { nt, start_bit, bit_len, .. } => {
                nbit::encode(plain, *nt, *start_bit, *bit_len)
            }
        }
    }

    pub fn decode(&self, backing: &[u8], logical_len: usize) -> Result<Vec<u8>> {
        match self {
            CoderParams::None => none::decode(backing, logical_len),
            CoderParams::Rle => rle::decode(backing),
            CoderParams::Skphuff { skip_size } => skphuff::decode(backing, *skip_size, logical_len),
            CoderParams::Nbit { nt, sign_ext, fill_one, start_bit, bit_len } => {
                nbit::decode(backing, *nt, *sign_ext, *fill_one, *start_bit, *bit_len, logical_len)
            }
        }
    }

    /// Trailer bytes following the fixed §4.E.1 header fields.
    pub fn trailer_bytes(&self) -> Result<Vec<u8>> {
        #[derive(DekuWrite)]
        #[deku(endian = "big")]
        struct NbitTrailer {
            nt: i32,
            sign_ext: u16,
            fill_one: u16,
            start_bit: i32,
            bit_len: i32,
        }
        #[derive(DekuWrite)]
        #[deku(endian = "big")]
        struct SkphuffTrailer {
            skip_size: u32,
            reserved: u32,
        }

        Ok(match self {
            CoderParams::None | CoderParams::Rle => Vec::new(),
            CoderParams::Nbit { nt, sign_ext, fill_one, start_bit, bit_len } => NbitTrailer {
                nt: *nt,
                sign_ext: *sign_ext as u16,
                fill_one: *fill_one as u16,
                start_bit: *start_bit,
                bit_len: *bit_len,
            }
            .to_bytes()?,
            CoderParams::Skphuff { skip_size } => {
                SkphuffTrailer { skip_size: *skip_size, reserved: 0 }.to_bytes()?
            }
        })
    }

    /// Parses the trailer for `code`, consuming exactly as many bytes as
    /// that variant carries.
    pub fn from_trailer(code: u16, trailer: &[u8]) -> Result<Self> {
        #[derive(DekuRead)]
        #[deku(endian = "big")]
        struct NbitTrailer {
            nt: i32,
            sign_ext: u16,
            fill_one: u16,
            start_bit: i32,
            bit_len: i32,
        }
        #[derive(DekuRead)]
        #[deku(endian = "big")]
        struct SkphuffTrailer {
            skip_size: u32,
            #[allow(dead_code)]
            reserved: u32,
        }

        Ok(match code {
            variant_code::NONE => CoderParams::None,
            variant_code::RLE => CoderParams::Rle,
            variant_code::SKPHUFF => {
                let (_, t) = SkphuffTrailer::from_bytes((trailer, 0))?;
                CoderParams::Skphuff { skip_size: t.skip_size }
            }
            variant_code::NBIT => {
                let (_, t) = NbitTrailer::from_bytes((trailer, 0))?;
                nbit::validate_params(t.nt, t.start_bit, t.bit_len)?;
                CoderParams::Nbit {
                    nt: t.nt,
                    sign_ext: t.sign_ext != 0,
                    fill_one: t.fill_one != 0,
                    start_bit: t.start_bit,
                    bit_len: t.bit_len,
                }
            }
            _ => return Err(HdfError::BadCoder("unknown coder variant code")),
        })
    }
}
