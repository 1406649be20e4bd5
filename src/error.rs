//! Errors
//!
//! One kind per failure mode named in the design's failure semantics: no
//! successful path ever surfaces a half-applied mutation, and no kind here
//! is retried internally.

use std::io;

use thiserror::Error;

/// Errors generated from the store, access, dispatch, and compressed-element
/// layers.
#[derive(Error, Debug)]
pub enum HdfError {
    #[error("std io error: {0}")]
    Io(#[from] io::Error),

    #[error("deku error: {0:?}")]
    Deku(#[from] deku::DekuError),

    #[error("invalid argument: {0}")]
    Args(&'static str),

    #[error("operation denied: {0}")]
    Denied(&'static str),

    #[error("access-record table exhausted")]
    TooMany,

    #[error("(tag, ref) not found")]
    NotFound,

    #[error("offset/length out of range: {0}")]
    Range(String),

    #[error("no space left to allocate")]
    NoSpace,

    #[error("bad file: {0}")]
    BadFile(&'static str),

    #[error("bad coder variant: {0}")]
    BadCoder(&'static str),

    #[error("bad model variant: {0}")]
    BadModel(&'static str),

    #[error("bad number-type code: {0}")]
    BadNumType(i32),

    #[error("cannot re-specialize an already special element")]
    CannotModify,

    #[error("cannot random-write a compressed element")]
    CannotRandomWrite,

    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

impl From<HdfError> for io::Error {
    fn from(value: HdfError) -> Self {
        use HdfError::*;
        match value {
            Io(io) => io,
            Deku(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            e @ (Args(_) | BadFile(_) | BadCoder(_) | BadModel(_) | BadNumType(_)) => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
            e @ Denied(_) => io::Error::new(io::ErrorKind::PermissionDenied, e),
            e @ TooMany => io::Error::new(io::ErrorKind::OutOfMemory, e),
            e @ NotFound => io::Error::new(io::ErrorKind::NotFound, e),
            e @ Range(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            e @ NoSpace => io::Error::new(io::ErrorKind::OutOfMemory, e),
            e @ CannotModify => io::Error::new(io::ErrorKind::AlreadyExists, e),
            e @ CannotRandomWrite => io::Error::new(io::ErrorKind::InvalidInput, e),
            e @ Internal(_) => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

pub type Result<T> = std::result::Result<T, HdfError>;
