//! Compressed-element engine (component E, §4.E): composes the modeling
//! layer over the coding layer, (de)serializes the on-disk descriptor, and
//! rewrites the logical length on append.
//!
//! `CompressedShared` materializes the full logical payload in memory
//! (`plain`), lazily decoded from the backing DD on first touch and
//! re-encoded as a single blob on `flush`. That trades the source's
//! incremental bit-stream-against-disk plumbing for a simpler, still
//! round-trip-correct design — see DESIGN.md.

pub mod coder;
pub mod model;

use std::cell::RefCell;
use std::rc::Rc;

use deku::prelude::*;

use crate::error::{HdfError, Result};
use crate::store::dd::{self, Dd, COMPRESSED_BACKING_TAG};
use crate::store::hash::Location;
use crate::store::Store;

pub use coder::CoderParams;
pub use model::ModelParams;

/// First payload byte a freshly created backing element holds, before any
/// real data has been written.
const COMP_START_BLOCK: u64 = 1;
const DESCRIPTOR_VERSION: u16 = 0;

#[derive(Debug, DekuRead, DekuWrite)]
#[deku(endian = "big")]
struct DescriptorFixed {
    special_code: u16,
    version: u16,
    length: i32,
    comp_ref: u16,
    model_code: u16,
    coder_code: u16,
}

impl DescriptorFixed {
    const ON_DISK_SIZE: usize = 14;
}

/// State for one compressed element. Typed as `Rc<RefCell<..>>`
/// (`CompressedInfo`, below) so that access records sharing one instance
/// observe each other's buffered writes; `startaccess` currently builds a
/// fresh instance on every call rather than deduping by `(tag, ref)`, so
/// that sharing does not yet happen across independent `start_read`/
/// `start_write` calls against the same element (see DESIGN.md).
#[derive(Debug)]
pub struct CompressedShared {
    pub desc_loc: Location,
    pub tag: u16,
    pub r#ref: u16,
    pub comp_ref: u16,
    pub model: ModelParams,
    pub coder: CoderParams,
    length: i64,
    plain: Vec<u8>,
    loaded: bool,
    dirty: bool,
}

pub type CompressedInfo = Rc<RefCell<CompressedShared>>;

impl CompressedShared {
    pub fn length(&self) -> i64 {
        self.length
    }

    fn ensure_loaded(&mut self, store: &mut Store) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        let backing_loc = store.lookup(COMPRESSED_BACKING_TAG, self.comp_ref)?;
        let backing_dd = store.dd_at(backing_loc);
        let mut raw = vec![0u8; backing_dd.length as usize];
        store.read_at(backing_dd.offset as u64, &mut raw)?;
        self.plain = self.coder.decode(&raw, self.length as usize)?;
        self.loaded = true;
        Ok(())
    }

    /// §4.D `read`: `len == 0` reads to end-of-element.
    pub fn read(&mut self, store: &mut Store, posn: i64, len: i64) -> Result<Vec<u8>> {
        self.ensure_loaded(store)?;
        if posn < 0 {
            return Err(HdfError::Range("negative read position".into()));
        }
        let start = posn as usize;
        let want = if len == 0 {
            self.plain.len().saturating_sub(start)
        } else {
            len as usize
        };
        let end = start.checked_add(want).ok_or_else(|| HdfError::Range("read overflow".into()))?;
        if end > self.plain.len() {
            return Err(HdfError::Range(format!(
                "read [{start}, {end}) exceeds element length {}",
                self.plain.len()
            )));
        }
        Ok(self.plain[start..end].to_vec())
    }

    /// §4.D `write` / §4.E.2: only append (`posn == length`) is supported;
    /// any other position fails with `CannotRandomWrite`.
    pub fn write(&mut self, store: &mut Store, posn: i64, bytes: &[u8]) -> Result<usize> {
        self.ensure_loaded(store)?;
        if posn as usize != self.plain.len() {
            return Err(HdfError::CannotRandomWrite);
        }
        if bytes.is_empty() {
            return Ok(0);
        }
        self.plain.extend_from_slice(bytes);
        self.length = self.plain.len() as i64;
        self.dirty = true;
        Ok(bytes.len())
    }

    /// §4.E.4 "Extend on write": re-encodes the full logical buffer into a
    /// freshly allocated backing block and rewrites the descriptor's length
    /// field. The previous backing block's space is not reclaimed (same
    /// known limitation as `delete_dd`, §4.B).
    pub fn flush(&mut self, store: &mut Store) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let encoded = self.coder.encode(&self.plain)?;
        let block_len = encoded.len().max(1) as u64;
        let offset = store.get_disk_block(block_len, true)?;
        if !encoded.is_empty() {
            store.write_at(offset, &encoded)?;
        }

        let backing_loc = store.lookup(COMPRESSED_BACKING_TAG, self.comp_ref)?;
        store.set_dd(
            backing_loc,
            Dd { tag: COMPRESSED_BACKING_TAG, r#ref: self.comp_ref, offset: offset as i32, length: encoded.len() as i32 },
        )?;

        let desc_dd = store.dd_at(self.desc_loc);
        store.write_at(desc_dd.offset as u64 + 4, &(self.length as i32).to_be_bytes())?;
        self.dirty = false;
        Ok(())
    }
}

fn header_bytes(comp_ref: u16, length: i64, model: ModelParams, coder: CoderParams) -> Result<Vec<u8>> {
    let fixed = DescriptorFixed {
        special_code: dd::special_code::COMP,
        version: DESCRIPTOR_VERSION,
        length: length as i32,
        comp_ref,
        model_code: model.variant_code(),
        coder_code: coder.variant_code(),
    };
    let mut bytes = fixed.to_bytes()?;
    bytes.extend(coder.trailer_bytes()?);
    Ok(bytes)
}

struct ParsedHeader {
    length: i64,
    comp_ref: u16,
    model: ModelParams,
    coder: CoderParams,
}

fn parse_header(bytes: &[u8]) -> Result<ParsedHeader> {
    if bytes.len() < DescriptorFixed::ON_DISK_SIZE {
        return Err(HdfError::BadFile("truncated compressed-element descriptor"));
    }
    let (_, fixed) = DescriptorFixed::from_bytes((bytes, 0))?;
    if fixed.special_code != dd::special_code::COMP {
        return Err(HdfError::BadFile("descriptor is not SPECIAL_COMP"));
    }
    let model = ModelParams::from_code(fixed.model_code).ok_or(HdfError::BadModel("unknown model variant code"))?;
    let coder = CoderParams::from_trailer(fixed.coder_code, &bytes[DescriptorFixed::ON_DISK_SIZE..])?;
    Ok(ParsedHeader { length: fixed.length as i64, comp_ref: fixed.comp_ref, model, coder })
}

/// §4.E.4 "Create". `tag` is the plain (non-special) user tag.
pub fn create_compressed(
    store: &mut Store,
    tag: u16,
    r#ref: u16,
    model: ModelParams,
    coder: CoderParams,
) -> Result<CompressedInfo> {
    if dd::is_special(tag) {
        return Err(HdfError::Args("tag already carries the special bit"));
    }
    if !store.is_writable() {
        return Err(HdfError::Denied("create_compressed on a read-only file"));
    }
    let special_tag = dd::make_special(tag);
    if store.lookup(special_tag, r#ref).is_ok() {
        return Err(HdfError::CannotModify);
    }

    let migrate = match store.lookup(tag, r#ref) {
        Ok(loc) => {
            let old = store.dd_at(loc);
            let mut buf = vec![0u8; old.length as usize];
            store.read_at(old.offset as u64, &mut buf)?;
            Some(buf)
        }
        Err(HdfError::NotFound) => None,
        Err(e) => return Err(e),
    };

    let comp_ref = store.new_ref()?;
    let backing_loc = store.allocate_dd()?;
    let backing_offset = store.get_disk_block(COMP_START_BLOCK, true)?;
    store.write_at(backing_offset, &[0u8])?;
    store.set_dd(backing_loc, Dd { tag: COMPRESSED_BACKING_TAG, r#ref: comp_ref, offset: backing_offset as i32, length: 0 })?;

    let header = header_bytes(comp_ref, 0, model, coder)?;
    let desc_loc = store.allocate_dd()?;
    let desc_offset = store.get_disk_block(header.len() as u64, true)?;
    store.write_at(desc_offset, &header)?;
    store.set_dd(desc_loc, Dd { tag: special_tag, r#ref, offset: desc_offset as i32, length: header.len() as i32 })?;

    let shared = Rc::new(RefCell::new(CompressedShared {
        desc_loc,
        tag: special_tag,
        r#ref,
        comp_ref,
        model,
        coder,
        length: 0,
        plain: Vec::new(),
        loaded: true,
        dirty: false,
    }));

    if let Some(old_payload) = migrate {
        {
            let mut shared_mut = shared.borrow_mut();
            shared_mut.plain = old_payload;
            shared_mut.length = shared_mut.plain.len() as i64;
            shared_mut.dirty = true;
            shared_mut.flush(store)?;
        }
        store.delete_dd(tag, r#ref)?;
    }

    Ok(shared)
}

/// §4.E.4 "Attach". `special_tag` already carries the `SPECIAL` bit.
pub fn startaccess(store: &mut Store, special_tag: u16, r#ref: u16) -> Result<CompressedInfo> {
    let loc = store.lookup(special_tag, r#ref)?;
    let dd = store.dd_at(loc);
    let mut bytes = vec![0u8; dd.length as usize];
    store.read_at(dd.offset as u64, &mut bytes)?;
    let header = parse_header(&bytes)?;

    Ok(Rc::new(RefCell::new(CompressedShared {
        desc_loc: loc,
        tag: special_tag,
        r#ref,
        comp_ref: header.comp_ref,
        model: header.model,
        coder: header.coder,
        length: header.length,
        plain: Vec::new(),
        loaded: false,
        dirty: false,
    })))
}
