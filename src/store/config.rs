//! Library-context configuration (§3.3 of SPEC_FULL.md / §9 redesign note).
//!
//! Replaces the source's global mutable state (output-mode switch, hard-coded
//! block size) with a value threaded explicitly through `open`/`create`,
//! mirroring how the teacher threads a [`Kind`](crate) through its own
//! `from_reader`/`to_bytes` instead of relying on ambient globals.

/// Access mode requested at [`crate::Hdf4File::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
    /// Truncates (or creates) the file and writes a fresh signature and
    /// first DD block.
    Create,
}

/// Tunable parameters for a container, bundled into one value instead of
/// being process-wide constants.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// First two bytes of the on-disk signature.
    pub magic: [u8; 2],
    /// Format version, stored as the last two bytes of the signature.
    pub version: u16,
    /// Number of DD slots per freshly allocated DD block (§4.B default: 16).
    pub dd_block_slots: u16,
    /// Bound on concurrently open access records (§4.C).
    pub max_access_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            magic: [0x0e, 0x03],
            version: 4,
            dd_block_slots: 16,
            max_access_records: 512,
        }
    }
}

impl StoreConfig {
    pub(crate) fn signature(&self) -> [u8; 4] {
        let v = self.version.to_be_bytes();
        [self.magic[0], self.magic[1], v[0], v[1]]
    }
}
