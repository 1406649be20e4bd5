//! Special-element dispatch (component D, §4.D): a closed variant type
//! standing in for the source's per-variant function-pointer table (§9).
//! Every element variant answers the same eight operations; dispatch is a
//! single match on [`crate::access::ElementInfo`].

pub mod compressed;
pub mod regular;

use tracing::instrument;

use crate::access::{AccessMode, AccessRecord, ElementInfo};
use crate::compressed::{self as compressed_engine, CoderParams, ModelParams};
use crate::error::{HdfError, Result};
use crate::store::dd::{self, COMPRESSED_BACKING_TAG};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Start,
    Current,
    End,
}

#[derive(Debug, Clone, Copy)]
pub struct Inquire {
    pub tag: u16,
    pub r#ref: u16,
    pub length: i64,
    pub posn: i64,
    pub mode: AccessMode,
    pub special_code: Option<u16>,
}

#[derive(Debug, Clone, Copy)]
pub enum Info {
    Regular { offset: i64, length: i64 },
    Compressed { length: i64, comp_ref: u16, model_code: u16, coder_code: u16 },
}

fn element_length(store: &Store, ar: &AccessRecord) -> i64 {
    match &ar.info {
        ElementInfo::Regular => regular::length(store, ar.dd_loc),
        ElementInfo::Compressed(info) => compressed::length(info),
    }
}

/// §4.D `startread`: attaches to an existing `(tag, ref)` for reading.
#[instrument(skip(store))]
pub fn start_read(store: &mut Store, tag: u16, r#ref: u16) -> Result<AccessRecord> {
    let loc = store.lookup(tag, r#ref)?;
    let dd = store.dd_at(loc);
    build_access_record(store, loc, dd.tag, dd.r#ref, AccessMode::Read)
}

/// §4.D `startwrite`: attaches to an existing `(tag, ref)` for writing.
#[instrument(skip(store))]
pub fn start_write(store: &mut Store, tag: u16, r#ref: u16) -> Result<AccessRecord> {
    if !store.is_writable() {
        return Err(HdfError::Denied("start_write on a read-only file"));
    }
    let loc = store.lookup(tag, r#ref)?;
    let dd = store.dd_at(loc);
    build_access_record(store, loc, dd.tag, dd.r#ref, AccessMode::Write)
}

fn build_access_record(store: &mut Store, loc: crate::store::hash::Location, dd_tag: u16, r#ref: u16, mode: AccessMode) -> Result<AccessRecord> {
    if dd::is_special(dd_tag) {
        let dd = store.dd_at(loc);
        let mut code_buf = [0u8; 2];
        store.read_at(dd.offset as u64, &mut code_buf)?;
        let code = u16::from_be_bytes(code_buf);
        match code {
            dd::special_code::COMP => {
                let info = compressed_engine::startaccess(store, dd_tag, r#ref)?;
                Ok(AccessRecord {
                    dd_loc: loc,
                    tag: dd_tag,
                    r#ref,
                    posn: 0,
                    mode,
                    special_code: Some(code),
                    flush: false,
                    appendable: false,
                    info: ElementInfo::Compressed(info),
                })
            }
            dd::special_code::LINKED | dd::special_code::EXT => {
                Err(HdfError::Denied("linked/external elements are not serviced by this core"))
            }
            _ => Err(HdfError::BadFile("unknown special code")),
        }
    } else {
        Ok(AccessRecord {
            dd_loc: loc,
            tag: dd_tag,
            r#ref,
            posn: 0,
            mode,
            special_code: None,
            flush: false,
            appendable: true,
            info: ElementInfo::Regular,
        })
    }
}

/// Top-level `new_element`: creates a fresh regular element.
pub fn new_element(store: &mut Store, tag: u16, r#ref: u16, length: i64) -> Result<AccessRecord> {
    if dd::is_special(tag) {
        return Err(HdfError::Args("tag must not carry the special bit"));
    }
    let loc = regular::create(store, tag, r#ref, length)?;
    Ok(AccessRecord {
        dd_loc: loc,
        tag,
        r#ref,
        posn: 0,
        mode: AccessMode::Write,
        special_code: None,
        flush: false,
        appendable: true,
        info: ElementInfo::Regular,
    })
}

/// §4.E.4 "Create": creates a compressed element, migrating existing
/// regular data at `(tag, ref)` if present.
pub fn create_compressed(
    store: &mut Store,
    tag: u16,
    r#ref: u16,
    model: ModelParams,
    coder: CoderParams,
) -> Result<AccessRecord> {
    let info = compressed_engine::create_compressed(store, tag, r#ref, model, coder)?;
    let desc_loc = info.borrow().desc_loc;
    let special_tag = info.borrow().tag;
    Ok(AccessRecord {
        dd_loc: desc_loc,
        tag: special_tag,
        r#ref,
        posn: 0,
        mode: AccessMode::Write,
        special_code: Some(dd::special_code::COMP),
        flush: false,
        appendable: false,
        info: ElementInfo::Compressed(info),
    })
}

pub fn delete_element(store: &mut Store, tag: u16, r#ref: u16) -> Result<()> {
    let loc = store.lookup(tag, r#ref)?;
    let dd = store.dd_at(loc);
    if dd::is_special(dd.tag) {
        let mut code_buf = [0u8; 2];
        store.read_at(dd.offset as u64, &mut code_buf)?;
        if u16::from_be_bytes(code_buf) == dd::special_code::COMP {
            let mut header = vec![0u8; dd.length as usize];
            store.read_at(dd.offset as u64, &mut header)?;
            if header.len() >= 10 {
                let comp_ref = u16::from_be_bytes([header[8], header[9]]);
                let _ = store.delete_dd(COMPRESSED_BACKING_TAG, comp_ref);
            }
        }
    }
    store.delete_dd(dd.tag, dd.r#ref)
}

/// §4.D `seek`. Negative resulting position fails with `Range`; past-end
/// seek is allowed only for appendable variants.
pub fn seek(store: &mut Store, ar: &mut AccessRecord, offset: i64, origin: Origin) -> Result<i64> {
    let length = element_length(store, ar);
    let base = match origin {
        Origin::Start => 0,
        Origin::Current => ar.posn,
        Origin::End => length,
    };
    let new_posn = base + offset;
    if new_posn < 0 {
        return Err(HdfError::Range("seek before start of element".into()));
    }
    if new_posn > length && !ar.appendable {
        return Err(HdfError::Range("seek past end of non-appendable element".into()));
    }
    if matches!(ar.info, ElementInfo::Compressed(_)) && ar.mode == AccessMode::Write && new_posn != length {
        return Err(HdfError::CannotRandomWrite);
    }
    ar.posn = new_posn;
    Ok(ar.posn)
}

/// §4.D `read`. `len == 0` reads to end-of-element.
pub fn read(store: &mut Store, ar: &mut AccessRecord, len: i64) -> Result<Vec<u8>> {
    if ar.mode != AccessMode::Read {
        return Err(HdfError::Denied("read on a write-mode access record"));
    }
    let length = element_length(store, ar);
    let want = if len == 0 { length - ar.posn } else { len };
    if want < 0 || ar.posn + want > length {
        return Err(HdfError::Range(format!("read [{}, {}) exceeds element length {length}", ar.posn, ar.posn + want)));
    }
    let bytes = match &ar.info {
        ElementInfo::Regular => regular::read(store, ar.dd_loc, ar.posn, want)?,
        ElementInfo::Compressed(info) => compressed::read(store, info, ar.posn, want)?,
    };
    ar.posn += want;
    Ok(bytes)
}

/// §4.D `write`. Negative `len` fails with `Range`; appending beyond the
/// element's length grows it.
pub fn write(store: &mut Store, ar: &mut AccessRecord, bytes: &[u8]) -> Result<usize> {
    if ar.mode != AccessMode::Write {
        return Err(HdfError::Denied("write on a read-mode access record"));
    }
    let n = match &ar.info {
        ElementInfo::Regular => regular::write(store, ar.dd_loc, ar.posn, bytes)?,
        ElementInfo::Compressed(info) => compressed::write(store, info, ar.posn, bytes)?,
    };
    ar.posn += n as i64;
    Ok(n)
}

pub fn inquire(store: &Store, ar: &AccessRecord) -> Inquire {
    Inquire {
        tag: ar.tag,
        r#ref: ar.r#ref,
        length: element_length(store, ar),
        posn: ar.posn,
        mode: ar.mode,
        special_code: ar.special_code,
    }
}

pub fn info(store: &Store, ar: &AccessRecord) -> Info {
    match &ar.info {
        ElementInfo::Regular => {
            let dd = store.dd_at(ar.dd_loc);
            Info::Regular { offset: dd.offset as i64, length: dd.length as i64 }
        }
        ElementInfo::Compressed(info) => {
            let shared = info.borrow();
            Info::Compressed {
                length: shared.length(),
                comp_ref: shared.comp_ref,
                model_code: shared.model.variant_code(),
                coder_code: shared.coder.variant_code(),
            }
        }
    }
}

/// §4.D `endaccess`: flushes variant-specific buffers. Releasing the access
/// record itself is the caller's (library-context) responsibility.
pub fn endaccess(store: &mut Store, ar: &AccessRecord) -> Result<()> {
    if let ElementInfo::Compressed(info) = &ar.info {
        compressed::endaccess(store, info)?;
    }
    Ok(())
}
