//! The compressed-element function table (§4.D.2): every operation
//! delegates into the modeling layer (§4.E.2), which in turn drives the
//! coder (§4.E.3). This module just adapts `CompressedInfo`'s shape to the
//! same call pattern [`super::regular`] uses, so [`super`]'s dispatch can
//! treat both variants uniformly.

use crate::compressed::CompressedInfo;
use crate::error::Result;
use crate::store::Store;

pub fn length(info: &CompressedInfo) -> i64 {
    info.borrow().length()
}

pub fn read(store: &mut Store, info: &CompressedInfo, posn: i64, len: i64) -> Result<Vec<u8>> {
    info.borrow_mut().read(store, posn, len)
}

pub fn write(store: &mut Store, info: &CompressedInfo, posn: i64, bytes: &[u8]) -> Result<usize> {
    info.borrow_mut().write(store, posn, bytes)
}

pub fn endaccess(store: &mut Store, info: &CompressedInfo) -> Result<()> {
    info.borrow_mut().flush(store)
}
