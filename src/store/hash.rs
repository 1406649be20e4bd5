//! In-memory `(tag, ref) -> (block, slot)` hash index (§4.B).
//!
//! Separate chaining over a small mixing function of `(tag, ref)`, the same
//! shape of structure the teacher reaches for (`rustc_hash`) when it needs a
//! fast lookup keyed by small integer ids (inode numbers, fragment indices).
//! We use `rustc_hash`'s `FxHasher` as the mixing function and keep our own
//! bucket vector rather than a `HashMap` so the chaining is explicit and the
//! table can be rehashed wholesale when a DD block is reloaded from disk.

use rustc_hash::FxHasher;
use std::hash::Hasher;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub block: usize,
    pub slot: usize,
}

#[derive(Clone, Debug)]
struct Entry {
    tag: u16,
    r#ref: u16,
    loc: Location,
}

/// Separate-chaining table over `(tag, ref)`.
pub struct DdIndex {
    buckets: Vec<Vec<Entry>>,
}

impl DdIndex {
    pub fn new() -> Self {
        Self { buckets: vec![Vec::new(); 64] }
    }

    fn mix(tag: u16, r#ref: u16) -> u64 {
        let mut h = FxHasher::default();
        h.write_u16(tag);
        h.write_u16(r#ref);
        h.finish()
    }

    fn bucket_index(&self, tag: u16, r#ref: u16) -> usize {
        (Self::mix(tag, r#ref) as usize) % self.buckets.len()
    }

    pub fn clear(&mut self) {
        for b in &mut self.buckets {
            b.clear();
        }
    }

    pub fn insert(&mut self, tag: u16, r#ref: u16, loc: Location) {
        self.remove(tag, r#ref);
        let idx = self.bucket_index(tag, r#ref);
        self.buckets[idx].push(Entry { tag, r#ref, loc });
    }

    pub fn remove(&mut self, tag: u16, r#ref: u16) {
        let idx = self.bucket_index(tag, r#ref);
        self.buckets[idx].retain(|e| !(e.tag == tag && e.r#ref == r#ref));
    }

    /// Exact `(tag, ref)` lookup.
    pub fn get(&self, tag: u16, r#ref: u16) -> Option<Location> {
        let idx = self.bucket_index(tag, r#ref);
        self.buckets[idx]
            .iter()
            .find(|e| e.tag == tag && e.r#ref == r#ref)
            .map(|e| e.loc)
    }

    /// First live match for `tag`, any ref (the `WILDCARD_REF` lookup mode).
    pub fn get_first_for_tag(&self, tag: u16) -> Option<Location> {
        self.buckets
            .iter()
            .flatten()
            .find(|e| e.tag == tag)
            .map(|e| e.loc)
    }
}

impl Default for DdIndex {
    fn default() -> Self {
        Self::new()
    }
}
