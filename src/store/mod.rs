//! Component B: the file store — on-disk DD records, the in-memory hash
//! index over them, and the `Store` that ties file I/O to both.

pub mod config;
pub mod dd;
pub mod file;
pub mod hash;

pub use config::{OpenMode, StoreConfig};
pub use dd::Dd;
pub use file::Store;
pub use hash::Location;
