//! Core of an HDF4-style hierarchical container format: a random-access
//! file in which typed data objects are located by `(tag, ref)` pairs
//! recorded in a chain of Data Descriptor blocks, with selected objects
//! transparently compressed through a modeling layer over a coding layer.
//!
//! [`Hdf4File`] is the library context (§9's redesign note): it owns the
//! open file (via [`store::Store`]) and the pool of open access records
//! (via [`access::AccessTable`]) as plain owned fields, replacing the
//! source's global file-record and access-record tables.

pub mod access;
pub mod compressed;
pub mod error;
pub mod primitives;
pub mod special;
pub mod store;

use std::path::Path;

use tracing::instrument;

use access::{Aid, AccessTable};
use compressed::{CoderParams, ModelParams};
use error::{HdfError, Result};
use special::{Info, Inquire, Origin};
use store::{OpenMode, Store, StoreConfig};

/// An open container: the file store plus the pool of access records held
/// against it. Returned opaquely by [`Hdf4File::open`]; every other
/// operation in this crate's public surface is a method on it.
pub struct Hdf4File {
    store: Store,
    access: AccessTable,
}

impl Hdf4File {
    #[instrument(skip(path, config))]
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode, config: StoreConfig) -> Result<Self> {
        let max_access_records = config.max_access_records;
        let store = Store::open(path, mode, config)?;
        Ok(Self { store, access: AccessTable::new(max_access_records) })
    }

    /// Requires every access record to have been ended first.
    pub fn close(mut self) -> Result<()> {
        if self.access.open_count() > 0 {
            return Err(HdfError::Denied("close with open access records"));
        }
        self.store.flush()
    }

    pub fn new_element(&mut self, tag: u16, r#ref: u16, length: i64) -> Result<Aid> {
        let record = special::new_element(&mut self.store, tag, r#ref, length)?;
        self.access.acquire(record)
    }

    pub fn create_compressed(
        &mut self,
        tag: u16,
        r#ref: u16,
        model: ModelParams,
        coder: CoderParams,
    ) -> Result<Aid> {
        let record = special::create_compressed(&mut self.store, tag, r#ref, model, coder)?;
        self.access.acquire(record)
    }

    pub fn start_read(&mut self, tag: u16, r#ref: u16) -> Result<Aid> {
        let record = special::start_read(&mut self.store, tag, r#ref)?;
        self.access.acquire(record)
    }

    pub fn start_write(&mut self, tag: u16, r#ref: u16) -> Result<Aid> {
        let record = special::start_write(&mut self.store, tag, r#ref)?;
        self.access.acquire(record)
    }

    pub fn seek(&mut self, aid: Aid, offset: i64, origin: Origin) -> Result<i64> {
        let record = self.access.get_mut(aid)?;
        special::seek(&mut self.store, record, offset, origin)
    }

    pub fn read(&mut self, aid: Aid, len: i64) -> Result<Vec<u8>> {
        let record = self.access.get_mut(aid)?;
        special::read(&mut self.store, record, len)
    }

    pub fn write(&mut self, aid: Aid, bytes: &[u8]) -> Result<usize> {
        let record = self.access.get_mut(aid)?;
        special::write(&mut self.store, record, bytes)
    }

    pub fn inquire(&self, aid: Aid) -> Result<Inquire> {
        let record = self.access.get(aid)?;
        Ok(special::inquire(&self.store, record))
    }

    pub fn info(&self, aid: Aid) -> Result<Info> {
        let record = self.access.get(aid)?;
        Ok(special::info(&self.store, record))
    }

    pub fn endaccess(&mut self, aid: Aid) -> Result<()> {
        let record = self.access.get(aid)?;
        special::endaccess(&mut self.store, record)?;
        self.access.release(aid)?;
        Ok(())
    }

    pub fn delete(&mut self, tag: u16, r#ref: u16) -> Result<()> {
        special::delete_element(&mut self.store, tag, r#ref)
    }

    pub fn open_count(&self) -> usize {
        self.access.open_count()
    }
}

pub use access::AccessMode as Mode;
pub use store::dd::{is_special, make_special, strip_special};

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn create_read_regular_round_trip() {
        let f = scratch();
        {
            let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
            let aid = file.new_element(1962, 1, 5).unwrap();
            file.write(aid, b"hello").unwrap();
            file.endaccess(aid).unwrap();
            file.close().unwrap();
        }

        let mut file = Hdf4File::open(f.path(), OpenMode::Read, StoreConfig::default()).unwrap();
        let aid = file.start_read(1962, 1).unwrap();
        let bytes = file.read(aid, 5).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(file.inquire(aid).unwrap().length, 5);
        file.endaccess(aid).unwrap();
    }

    #[test]
    fn compress_on_create_migration_round_trip() {
        let f = scratch();
        let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let aid = file.new_element(720, 1, 256).unwrap();
        file.write(aid, &[0xAA; 256]).unwrap();
        file.endaccess(aid).unwrap();

        file.create_compressed(720, 1, ModelParams::Stdio, CoderParams::Rle).unwrap();

        let special_tag = make_special(720);
        let read_aid = file.start_read(special_tag, 1).unwrap();
        let bytes = file.read(read_aid, 0).unwrap();
        assert_eq!(bytes, vec![0xAAu8; 256]);
        assert_eq!(file.inquire(read_aid).unwrap().length, 256);
        file.endaccess(read_aid).unwrap();
    }

    #[test]
    fn endaccess_on_already_ended_aid_fails_with_args() {
        let f = scratch();
        let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let aid = file.new_element(1, 1, 1).unwrap();
        file.endaccess(aid).unwrap();
        assert!(matches!(file.endaccess(aid), Err(HdfError::Args(_))));
    }

    #[test]
    fn close_with_open_access_records_is_denied() {
        let f = scratch();
        let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let _aid = file.new_element(1, 1, 1).unwrap();
        assert!(matches!(file.close(), Err(HdfError::Denied(_))));
    }
}
