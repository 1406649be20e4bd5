//! On-disk Data Descriptor records (§3, §4.B, §6).
//!
//! A `Dd` is the 4-tuple `(tag, ref, offset, length)` that locates one data
//! object. `DdBlockHeader` is the 6-byte header in front of each run of
//! `ndds` slots. Both are fixed-width, big-endian, and parsed with `deku`
//! the same way the teacher parses `SuperBlock`/`Fragment`/`Id`.

use deku::prelude::*;

/// High bit of `tag`: distinguishes "special" (indirected) elements from
/// regular ones.
pub const SPECIAL_MASK: u16 = 0x8000;

/// Marks a DD slot as free (never a valid user tag).
pub const NULL_TAG: u16 = 0x0000;

/// `lookup` wildcard: matches the first live DD for a tag, any ref.
pub const WILDCARD_REF: u16 = 0xFFFF;

/// Hidden tag under which SPECIAL_COMP backing (raw compressed) bytes live.
/// Never returned from `lookup` by a regular `(tag, ref)` query issued by a
/// user, since users only ever address the visible, `SPECIAL`-tagged
/// descriptor DD.
pub const COMPRESSED_BACKING_TAG: u16 = 0xFFFE;

/// Special-descriptor codes (first `u16` of a special element's descriptor
/// block, §3).
pub mod special_code {
    pub const LINKED: u16 = 1;
    pub const EXT: u16 = 2;
    pub const COMP: u16 = 3;
}

#[inline]
pub fn is_special(tag: u16) -> bool {
    tag & SPECIAL_MASK != 0
}

#[inline]
pub fn make_special(tag: u16) -> u16 {
    tag | SPECIAL_MASK
}

#[inline]
pub fn strip_special(tag: u16) -> u16 {
    tag & !SPECIAL_MASK
}

/// One Data Descriptor slot: 12 bytes on disk, big-endian.
#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct Dd {
    pub tag: u16,
    pub r#ref: u16,
    pub offset: i32,
    pub length: i32,
}

impl Dd {
    pub const ON_DISK_SIZE: usize = 12;

    pub fn free() -> Self {
        Self { tag: NULL_TAG, r#ref: 0, offset: 0, length: 0 }
    }

    pub fn is_free(&self) -> bool {
        self.tag == NULL_TAG
    }
}

/// DD block header: 6 bytes on disk, big-endian.
#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct DdBlockHeader {
    /// Absolute file offset of the next DD block, or 0 to terminate the chain.
    pub next_block_offset: i32,
    pub ndds: u16,
}

impl DdBlockHeader {
    pub const ON_DISK_SIZE: usize = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dd_round_trips_big_endian() {
        let dd = Dd { tag: 0x1234, r#ref: 0x0001, offset: 0x1000, length: 256 };
        let bytes = dd.to_bytes().unwrap();
        assert_eq!(bytes.len(), Dd::ON_DISK_SIZE);
        assert_eq!(&bytes[0..2], &[0x12, 0x34]);
        let (_, back) = Dd::from_bytes((&bytes, 0)).unwrap();
        assert_eq!(back, dd);
    }

    #[test]
    fn special_bit_helpers() {
        assert!(is_special(make_special(720)));
        assert!(!is_special(720));
        assert_eq!(strip_special(make_special(720)), 720);
    }
}
