//! File store (component B, §4.B).
//!
//! Opens/creates the container, walks and extends the DD-block chain,
//! mediates all positional I/O, and keeps the `(tag, ref)` hash index
//! current. `Store` plays the role the teacher's `SquashfsReader` /
//! `Squashfs` play together: the thing that owns the open file handle and
//! knows how to walk its on-disk metadata chain.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use deku::prelude::*;
use tracing::{debug, instrument, trace};

use crate::error::{HdfError, Result};
use crate::store::config::{OpenMode, StoreConfig};
use crate::store::dd::{Dd, DdBlockHeader, WILDCARD_REF};
use crate::store::hash::{DdIndex, Location};

struct DdBlockMem {
    disk_offset: u64,
    next_block_offset: i64,
    dds: Vec<Dd>,
    dirty: bool,
}

/// An open container: file handle, DD-block chain, hash index, and the
/// bookkeeping (`max_ref`, free-slot hint) that `allocate_dd`/`new_ref` need.
pub struct Store {
    file: File,
    pub(crate) mode: OpenMode,
    pub(crate) config: StoreConfig,
    blocks: Vec<DdBlockMem>,
    index: DdIndex,
    max_ref: u16,
    free_hint: Option<Location>,
}

impl Store {
    #[instrument(skip(path, config))]
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        match mode {
            OpenMode::Create => Self::create(path, config),
            OpenMode::Read => Self::attach(path, false, config),
            OpenMode::ReadWrite => Self::attach(path, true, config),
        }
    }

    fn create(path: &Path, config: StoreConfig) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        file.write_all(&config.signature())?;

        let header = DdBlockHeader { next_block_offset: 0, ndds: config.dd_block_slots };
        let dds = vec![Dd::free(); config.dd_block_slots as usize];
        let mut bytes = header.to_bytes()?;
        for dd in &dds {
            bytes.extend(dd.to_bytes()?);
        }
        file.write_all(&bytes)?;
        file.flush()?;

        let block = DdBlockMem { disk_offset: 4, next_block_offset: 0, dds, dirty: false };

        Ok(Self {
            file,
            mode: OpenMode::Create,
            config,
            blocks: vec![block],
            index: DdIndex::new(),
            max_ref: 0,
            free_hint: None,
        })
    }

    #[instrument(skip(path, writable, config))]
    fn attach(path: &Path, writable: bool, config: StoreConfig) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(writable).open(path)?;

        let mut sig = [0u8; 4];
        file.read_exact(&mut sig).map_err(|_| HdfError::BadFile("short signature"))?;
        let expected = config.signature();
        if sig[0] != expected[0] || sig[1] != expected[1] {
            return Err(HdfError::BadFile("bad magic"));
        }
        let version = u16::from_be_bytes([sig[2], sig[3]]);
        if version != config.version {
            return Err(HdfError::BadFile("unsupported version"));
        }

        let mut blocks = Vec::new();
        let mut index = DdIndex::new();
        let mut max_ref: u16 = 0;
        let mut offset: u64 = 4;

        loop {
            file.seek(SeekFrom::Start(offset))?;
            let mut hdr_buf = [0u8; DdBlockHeader::ON_DISK_SIZE];
            file.read_exact(&mut hdr_buf).map_err(|_| HdfError::BadFile("truncated DD block header"))?;
            let (_, header) = DdBlockHeader::from_bytes((&hdr_buf, 0))?;

            let mut dds = Vec::with_capacity(header.ndds as usize);
            for slot in 0..header.ndds as usize {
                let mut buf = [0u8; Dd::ON_DISK_SIZE];
                file.read_exact(&mut buf).map_err(|_| HdfError::BadFile("truncated DD slot"))?;
                let (_, dd) = Dd::from_bytes((&buf, 0))?;
                if !dd.is_free() {
                    index.insert(dd.tag, dd.r#ref, Location { block: blocks.len(), slot });
                    max_ref = max_ref.max(dd.r#ref);
                }
                dds.push(dd);
            }

            blocks.push(DdBlockMem {
                disk_offset: offset,
                next_block_offset: header.next_block_offset as i64,
                dds,
                dirty: false,
            });

            if header.next_block_offset == 0 {
                break;
            }
            offset = header.next_block_offset as u64;
        }

        debug!(blocks = blocks.len(), max_ref, "attached to container");

        Ok(Self {
            file,
            mode: if writable { OpenMode::ReadWrite } else { OpenMode::Read },
            config,
            blocks,
            index,
            max_ref,
            free_hint: None,
        })
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.mode, OpenMode::ReadWrite | OpenMode::Create)
    }

    /// Flushes every dirty DD block to disk.
    #[instrument(skip_all)]
    pub fn flush(&mut self) -> Result<()> {
        for i in 0..self.blocks.len() {
            if self.blocks[i].dirty {
                self.write_block(i)?;
            }
        }
        self.file.flush()?;
        Ok(())
    }

    fn write_block(&mut self, block: usize) -> Result<()> {
        let b = &self.blocks[block];
        let header = DdBlockHeader {
            next_block_offset: b.next_block_offset as i32,
            ndds: b.dds.len() as u16,
        };
        let mut bytes = header.to_bytes()?;
        for dd in &b.dds {
            bytes.extend(dd.to_bytes()?);
        }
        self.file.seek(SeekFrom::Start(b.disk_offset))?;
        self.file.write_all(&bytes)?;
        self.blocks[block].dirty = false;
        trace!(block, "wrote DD block");
        Ok(())
    }

    /// §4.B `update_dd`: writes one block back to disk immediately.
    pub fn update_dd(&mut self, block: usize) -> Result<()> {
        self.write_block(block)
    }

    #[instrument(skip(self))]
    pub fn lookup(&self, tag: u16, r#ref: u16) -> Result<Location> {
        let loc = if r#ref == WILDCARD_REF {
            self.index.get_first_for_tag(tag)
        } else {
            self.index.get(tag, r#ref)
        };
        loc.ok_or(HdfError::NotFound)
    }

    pub fn dd_at(&self, loc: Location) -> Dd {
        self.blocks[loc.block].dds[loc.slot]
    }

    #[instrument(skip(self))]
    pub fn new_ref(&mut self) -> Result<u16> {
        if self.max_ref == WILDCARD_REF {
            return Err(HdfError::NoSpace);
        }
        self.max_ref += 1;
        Ok(self.max_ref)
    }

    fn note_ref(&mut self, r#ref: u16) {
        if r#ref != WILDCARD_REF {
            self.max_ref = self.max_ref.max(r#ref);
        }
    }

    /// §4.B `allocate_dd`: returns a free slot, extending the chain with a
    /// new block if none is free.
    #[instrument(skip(self))]
    pub fn allocate_dd(&mut self) -> Result<Location> {
        if let Some(loc) = self.free_hint {
            if self.blocks[loc.block].dds[loc.slot].is_free() {
                self.free_hint = None;
                return Ok(loc);
            }
        }
        for (bi, block) in self.blocks.iter().enumerate() {
            if let Some(si) = block.dds.iter().position(|dd| dd.is_free()) {
                return Ok(Location { block: bi, slot: si });
            }
        }
        self.extend_chain()
    }

    #[instrument(skip(self))]
    fn extend_chain(&mut self) -> Result<Location> {
        let slots = self.config.dd_block_slots;
        let block_size = DdBlockHeader::ON_DISK_SIZE as u64 + slots as u64 * Dd::ON_DISK_SIZE as u64;
        let offset = self.get_disk_block(block_size, true)?;

        let new_block = DdBlockMem {
            disk_offset: offset,
            next_block_offset: 0,
            dds: vec![Dd::free(); slots as usize],
            dirty: true,
        };
        let new_index = self.blocks.len();
        self.blocks.push(new_block);

        if let Some(last) = self.blocks.get_mut(new_index.wrapping_sub(1)) {
            last.next_block_offset = offset as i64;
            last.dirty = true;
        }
        if new_index > 0 {
            self.write_block(new_index - 1)?;
        }
        self.write_block(new_index)?;

        debug!(new_index, offset, "extended DD-block chain");
        Ok(Location { block: new_index, slot: 0 })
    }

    /// §4.B `get_disk_block`: allocates `length` bytes at end of file.
    /// `append_ok = false` requests reuse of previously freed space, which
    /// this engine never reclaims (§4.B known limitation) — such a call
    /// always fails with `NoSpace`.
    #[instrument(skip(self))]
    pub fn get_disk_block(&mut self, length: u64, append_ok: bool) -> Result<u64> {
        if !append_ok {
            return Err(HdfError::NoSpace);
        }
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.set_len(offset + length)?;
        Ok(offset)
    }

    #[instrument(skip(self, buf))]
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    #[instrument(skip(self, buf))]
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Writes `dd` into `loc`, updating the hash index and marking the
    /// owning block dirty, then flushes that block immediately.
    #[instrument(skip(self))]
    pub fn set_dd(&mut self, loc: Location, dd: Dd) -> Result<()> {
        self.note_ref(dd.r#ref);
        self.blocks[loc.block].dds[loc.slot] = dd;
        self.blocks[loc.block].dirty = true;
        if dd.is_free() {
            // caller already removed the old key from the index
        } else {
            self.index.insert(dd.tag, dd.r#ref, loc);
        }
        self.write_block(loc.block)
    }

    /// §4.B `delete_dd`: marks the slot free, removes it from the hash
    /// index, and marks the block dirty. Payload storage is not reclaimed.
    #[instrument(skip(self))]
    pub fn delete_dd(&mut self, tag: u16, r#ref: u16) -> Result<()> {
        let loc = self.lookup(tag, r#ref)?;
        self.index.remove(tag, r#ref);
        self.blocks[loc.block].dds[loc.slot] = Dd::free();
        self.blocks[loc.block].dirty = true;
        self.free_hint = Some(loc);
        self.write_block(loc.block)?;
        trace!(tag, r#ref, "deleted dd (space not reclaimed)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn create_then_reopen_preserves_signature_and_empty_chain() {
        let f = scratch();
        {
            let store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
            assert_eq!(store.blocks.len(), 1);
        }
        let store = Store::open(f.path(), OpenMode::Read, StoreConfig::default()).unwrap();
        assert_eq!(store.blocks.len(), 1);
        assert_eq!(store.max_ref, 0);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let f = scratch();
        std::fs::write(f.path(), [0xff, 0xff, 0xff, 0xff]).unwrap();
        let err = Store::open(f.path(), OpenMode::Read, StoreConfig::default()).unwrap_err();
        assert!(matches!(err, HdfError::BadFile(_)));
    }

    #[test]
    fn allocate_and_lookup_round_trip() {
        let f = scratch();
        let mut store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let loc = store.allocate_dd().unwrap();
        let r#ref = store.new_ref().unwrap();
        let dd = Dd { tag: 1962, r#ref, offset: 100, length: 5 };
        store.set_dd(loc, dd).unwrap();
        assert_eq!(store.lookup(1962, r#ref).unwrap(), loc);
    }

    #[test]
    fn extends_chain_once_block_is_full() {
        let f = scratch();
        let config = StoreConfig { dd_block_slots: 1, ..StoreConfig::default() };
        let mut store = Store::open(f.path(), OpenMode::Create, config).unwrap();
        let loc1 = store.allocate_dd().unwrap();
        let r1 = store.new_ref().unwrap();
        store.set_dd(loc1, Dd { tag: 1, r#ref: r1, offset: 4, length: 1 }).unwrap();

        let loc2 = store.allocate_dd().unwrap();
        assert_ne!(loc2.block, loc1.block);
        assert_eq!(store.blocks.len(), 2);
    }

    #[test]
    fn delete_removes_from_index_but_leaks_space() {
        let f = scratch();
        let mut store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let loc = store.allocate_dd().unwrap();
        let r#ref = store.new_ref().unwrap();
        store.set_dd(loc, Dd { tag: 5, r#ref, offset: 4, length: 10 }).unwrap();
        store.delete_dd(5, r#ref).unwrap();
        assert!(matches!(store.lookup(5, r#ref), Err(HdfError::NotFound)));
        // the slot is free and reusable
        let loc2 = store.allocate_dd().unwrap();
        assert_eq!(loc2, loc);
    }

    #[test]
    fn ref_exhaustion_reports_no_space() {
        let f = scratch();
        let mut store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        store.max_ref = WILDCARD_REF;
        assert!(matches!(store.new_ref(), Err(HdfError::NoSpace)));
    }

    #[test]
    fn read_write_at_is_positional() {
        let f = scratch();
        let mut store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let offset = store.get_disk_block(5, true).unwrap();
        store.write_at(offset, b"hello").unwrap();
        let mut buf = [0u8; 5];
        store.read_at(offset, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn no_space_when_reuse_requested_without_reclamation() {
        let f = scratch();
        let mut store = Store::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        assert!(matches!(store.get_disk_block(4, false), Err(HdfError::NoSpace)));
    }
}
