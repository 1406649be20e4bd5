//! The "null" function table (§4.D.1): a regular element's payload sits
//! directly at `DD.offset` for `DD.length` bytes. Every operation is a
//! straight positional read/write against the file store, with growth
//! handled by reallocating a fresh region (the freed region is not
//! reclaimed, same limitation as `delete_dd`).

use crate::error::{HdfError, Result};
use crate::store::dd::Dd;
use crate::store::hash::Location;
use crate::store::Store;

pub fn create(store: &mut Store, tag: u16, r#ref: u16, length: i64) -> Result<Location> {
    if length < 0 {
        return Err(HdfError::Range("negative element length".into()));
    }
    if !store.is_writable() {
        return Err(HdfError::Denied("new_element on a read-only file"));
    }
    let loc = store.allocate_dd()?;
    let offset = store.get_disk_block(length.max(0) as u64, true)?;
    if length > 0 {
        store.write_at(offset, &vec![0u8; length as usize])?;
    }
    store.set_dd(loc, Dd { tag, r#ref, offset: offset as i32, length: length as i32 })?;
    Ok(loc)
}

pub fn length(store: &Store, loc: Location) -> i64 {
    store.dd_at(loc).length as i64
}

pub fn read(store: &mut Store, loc: Location, posn: i64, len: i64) -> Result<Vec<u8>> {
    let dd = store.dd_at(loc);
    let mut buf = vec![0u8; len as usize];
    store.read_at(dd.offset as u64 + posn as u64, &mut buf)?;
    Ok(buf)
}

/// Writes `bytes` at `posn`, reallocating to a larger backing region first
/// if the write would extend past the DD's current length.
pub fn write(store: &mut Store, loc: Location, posn: i64, bytes: &[u8]) -> Result<usize> {
    let dd = store.dd_at(loc);
    let needed = posn + bytes.len() as i64;

    if needed <= dd.length as i64 {
        store.write_at(dd.offset as u64 + posn as u64, bytes)?;
        return Ok(bytes.len());
    }

    let mut grown = vec![0u8; needed as usize];
    if dd.length > 0 {
        store.read_at(dd.offset as u64, &mut grown[..dd.length as usize])?;
    }
    grown[posn as usize..posn as usize + bytes.len()].copy_from_slice(bytes);
    let new_offset = store.get_disk_block(grown.len() as u64, true)?;
    store.write_at(new_offset, &grown)?;
    store.set_dd(loc, Dd { tag: dd.tag, r#ref: dd.r#ref, offset: new_offset as i32, length: grown.len() as i32 })?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OpenMode, StoreConfig};

    fn fresh_store() -> (tempfile::NamedTempFile, Store) {
        let f = tempfile::NamedTempFile::new().unwrap();
        let store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        (f, store)
    }

    #[test]
    fn create_then_read_back() {
        let (_f, mut store) = fresh_store();
        let loc = create(&mut store, 1962, 1, 5).unwrap();
        write(&mut store, loc, 0, b"hello").unwrap();
        assert_eq!(read(&mut store, loc, 0, 5).unwrap(), b"hello");
    }

    #[test]
    fn write_past_end_grows_the_element() {
        let (_f, mut store) = fresh_store();
        let loc = create(&mut store, 1962, 1, 2).unwrap();
        write(&mut store, loc, 0, b"hi").unwrap();
        write(&mut store, loc, 2, b" there").unwrap();
        assert_eq!(length(&store, loc), 8);
        assert_eq!(read(&mut store, loc, 0, 8).unwrap(), b"hi there");
    }
}
